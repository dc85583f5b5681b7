// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # API Data Models
//!
//! Request and response structures for the LNURL endpoints. All types derive
//! `Serialize`/`Deserialize` and `ToSchema` for JSON handling and OpenAPI
//! documentation. Wire field names follow the LNURL conventions (camelCase,
//! msat-denominated bounds).

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Plain `{"status":"OK"}` acknowledgement.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct StatusResponse {
    pub status: String,
}

impl StatusResponse {
    pub fn ok() -> Self {
        Self {
            status: "OK".to_string(),
        }
    }
}

/// First-leg response of the withdraw flow (LUD-03 `withdrawRequest`).
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct WithdrawRequestResponse {
    /// Always `withdrawRequest`.
    pub tag: String,
    /// Callback URL the wallet presents the invoice to; carries the k1 and
    /// the resolved msat bounds.
    pub callback: String,
    pub k1: String,
    pub default_description: String,
    /// Lower bound in millisatoshi.
    pub min_withdrawable: u64,
    /// Upper bound in millisatoshi.
    pub max_withdrawable: u64,
}

/// First-leg response of the pay flow (LUD-06 `payRequest`).
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PayRequestResponse {
    /// Always `payRequest`.
    pub tag: String,
    pub callback: String,
    pub min_sendable: u64,
    pub max_sendable: u64,
    /// JSON-encoded metadata array, e.g. `[["text/plain","..."]]`.
    pub metadata: String,
    pub comment_allowed: u32,
}

/// Second-leg response of the pay flow: the invoice to pay.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PayInvoiceResponse {
    pub pr: String,
    /// Legacy field, always empty.
    pub routes: Vec<String>,
}

/// Response of the channel flow (LUD-02 `channelRequest`).
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChannelRequestResponse {
    /// Always `channelRequest`.
    pub tag: String,
    /// Target node as `pubkey@host:port`.
    pub uri: String,
    pub callback: String,
    pub k1: String,
}

/// Output of the generator API: the URL a wallet should fetch, both plain
/// and bech32-encoded, plus per-type detail.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(untagged)]
pub enum GenerateResponse {
    #[serde(rename_all = "camelCase")]
    Withdraw {
        url: String,
        lnurl: String,
        #[serde(rename = "type")]
        kind: String,
    },
    #[serde(rename_all = "camelCase")]
    Pay {
        url: String,
        lnurl: String,
        payment_id: String,
        #[serde(rename = "type")]
        kind: String,
        min_sendable: u64,
        max_sendable: u64,
        comment_allowed: u32,
    },
    #[serde(rename_all = "camelCase")]
    Channel {
        url: String,
        lnurl: String,
        #[serde(rename = "type")]
        kind: String,
    },
    #[serde(rename_all = "camelCase")]
    Auth {
        status: String,
        url: String,
        lnurl: String,
        #[serde(rename = "type")]
        kind: String,
        k1: String,
    },
    #[serde(rename_all = "camelCase")]
    Bolt11 {
        bolt11: String,
        #[serde(rename = "type")]
        kind: String,
        amount: u64,
        payment_hash: String,
    },
}
