// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! LNURL Test Server
//!
//! This crate provides a development/test server for the LNURL protocol
//! family (withdraw, pay, channel, auth and a raw bolt11 generator), backed
//! by an LND node over its REST API.
//!
//! ## Modules
//!
//! - `api` - HTTP API handlers (Axum)
//! - `issuer` - Challenge/config issuance (k1 generation)
//! - `settlement` - Withdrawal settlement state machine
//! - `lightning` - LND backend client
//! - `storage` - Embedded challenge store (redb)

pub mod amounts;
pub mod api;
pub mod config;
pub mod error;
pub mod issuer;
pub mod lightning;
pub mod lnurl;
pub mod models;
pub mod settlement;
pub mod state;
pub mod storage;
