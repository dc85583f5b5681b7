// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Lightning payment backend.
//!
//! The server treats the backend as a fallible, untrusted-latency
//! collaborator: every call is timeout-bounded and a timeout is an ambiguous
//! failure, never a success. [`PaymentBackend`] is the seam the settlement
//! coordinator and the generator endpoints depend on; [`lnd::LndClient`] is
//! the production implementation over LND's REST API.

pub mod lnd;

pub use lnd::LndClient;

use async_trait::async_trait;

#[derive(Debug, thiserror::Error)]
pub enum LightningError {
    #[error("invoice decode failed: {0}")]
    Decode(String),

    #[error("payment failed: {0}")]
    Payment(String),

    #[error("invoice creation failed: {0}")]
    CreateInvoice(String),

    #[error("backend request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("backend response was invalid: {0}")]
    InvalidResponse(String),
}

/// A decoded bolt11 invoice, reduced to what the server validates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedInvoice {
    /// Invoice amount in whole satoshi; zero for zero-amount invoices.
    pub amount_sat: u64,
    pub payment_hash: String,
}

/// A freshly created invoice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedInvoice {
    pub payment_request: String,
    pub payment_hash: String,
}

/// Contract the server depends on; implementations may block and may time
/// out, and are never retried automatically.
#[async_trait]
pub trait PaymentBackend: Send + Sync {
    /// Decode an invoice to learn its amount and payment hash.
    async fn decode_invoice(&self, invoice: &str) -> Result<DecodedInvoice, LightningError>;

    /// Pay an invoice. Side-effecting and hard to undo; callers must treat
    /// any failure as ambiguous rather than retry.
    async fn pay_invoice(&self, invoice: &str) -> Result<(), LightningError>;

    /// Create an invoice for the given amount (zero for a zero-amount
    /// invoice) with a memo and expiry.
    async fn create_invoice(
        &self,
        amount_sat: u64,
        memo: &str,
        expiry_secs: u64,
    ) -> Result<CreatedInvoice, LightningError>;
}
