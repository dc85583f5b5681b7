// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Challenge Store
//!
//! Persistent keyed storage for withdrawal challenges, auth sessions and
//! pay-flow configurations, backed by redb (pure Rust, ACID). The store is
//! the single source of truth for "has this challenge already been used":
//! settlement is a conditional write inside one write transaction, so two
//! racing callbacks cannot both settle the same challenge.

pub mod challenge_db;

pub use challenge_db::{
    ChallengeDatabase, ChallengeDbError, ChallengeDbResult, StoredAuthSession, StoredPayConfig,
    StoredWithdrawal, WithdrawalStatus,
};
