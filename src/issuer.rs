// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Challenge and pay-config issuance.
//!
//! Every challenge is bound to a fresh 32-byte random token from the system
//! CSPRNG, hex-encoded. Tokens are unguessable by construction, so a store
//! conflict on create means something is deeply wrong; it is retried exactly
//! once with a fresh token and then surfaced as an internal failure.

use std::sync::Arc;

use chrono::{Duration, Utc};
use ring::rand::{SecureRandom, SystemRandom};
use uuid::Uuid;

use crate::amounts::{self, BoundsError};
use crate::config::Limits;
use crate::storage::{
    ChallengeDatabase, ChallengeDbError, StoredAuthSession, StoredPayConfig, StoredWithdrawal,
};

/// Auth actions a wallet may request, per LNURL-auth.
pub const AUTH_ACTIONS: [&str; 4] = ["login", "register", "link", "auth"];

const K1_BYTES: usize = 32;

#[derive(Debug, thiserror::Error)]
pub enum IssueError {
    #[error("{0}")]
    Validation(String),

    #[error("invalid bounds: {0}")]
    Bounds(#[from] BoundsError),

    #[error("system randomness unavailable")]
    TokenEntropy,

    #[error("challenge store rejected two fresh tokens in a row")]
    TokenCollision,

    #[error(transparent)]
    Store(#[from] ChallengeDbError),
}

/// A newly issued withdrawal challenge with its resolved bounds.
#[derive(Debug, Clone)]
pub struct IssuedWithdrawal {
    pub k1: String,
    pub min_msat: u64,
    pub max_msat: u64,
    pub min_sat: u64,
    pub max_sat: u64,
}

/// A newly issued auth challenge.
#[derive(Debug, Clone)]
pub struct IssuedAuth {
    pub k1: String,
    pub session_id: String,
    pub expires_at: chrono::DateTime<Utc>,
}

pub struct ChallengeIssuer {
    db: Arc<ChallengeDatabase>,
    limits: Limits,
    auth_ttl: Duration,
}

impl ChallengeIssuer {
    pub fn new(db: Arc<ChallengeDatabase>, limits: Limits, auth_ttl_secs: u64) -> Self {
        Self {
            db,
            limits,
            auth_ttl: Duration::seconds(auth_ttl_secs as i64),
        }
    }

    /// Issue a withdrawal challenge, applying configured defaults for
    /// omitted bounds. The challenge is persisted pending with no amount.
    pub fn issue_withdrawal(
        &self,
        min_msat: Option<u64>,
        max_msat: Option<u64>,
    ) -> Result<IssuedWithdrawal, IssueError> {
        let min_msat = min_msat.unwrap_or(self.limits.min_withdrawable_msat);
        let max_msat = max_msat.unwrap_or(self.limits.max_withdrawable_msat);
        let (min_sat, max_sat) = amounts::satoshi_bounds(min_msat, max_msat)?;

        retry_on_conflict(|| {
            let k1 = generate_k1()?;
            self.db.create_withdrawal(&StoredWithdrawal::new_pending(&k1))?;
            Ok(IssuedWithdrawal {
                k1,
                min_msat,
                max_msat,
                min_sat,
                max_sat,
            })
        })
    }

    /// Issue an auth challenge for an allow-listed action. Expiry is fixed
    /// at creation; it is checked lazily when the challenge is presented.
    pub fn issue_auth(&self, action: &str) -> Result<IssuedAuth, IssueError> {
        if !AUTH_ACTIONS.contains(&action) {
            return Err(IssueError::Validation("Invalid action parameter".to_string()));
        }

        retry_on_conflict(|| {
            let k1 = generate_k1()?;
            let now = Utc::now();
            let session = StoredAuthSession {
                k1: k1.clone(),
                session_id: Uuid::new_v4().to_string(),
                action: action.to_string(),
                created_at: now,
                expires_at: now + self.auth_ttl,
            };
            self.db.create_auth_session(&session)?;
            Ok(IssuedAuth {
                k1,
                session_id: session.session_id,
                expires_at: session.expires_at,
            })
        })
    }

    /// Persist an immutable pay configuration and return its id.
    pub fn issue_pay_config(
        &self,
        min_msat: Option<u64>,
        max_msat: Option<u64>,
        comment_allowed: Option<u32>,
    ) -> Result<StoredPayConfig, IssueError> {
        let min_msat = min_msat.unwrap_or(self.limits.min_sendable_msat);
        let max_msat = max_msat.unwrap_or(self.limits.max_sendable_msat);
        let comment_allowed = comment_allowed.unwrap_or(self.limits.comment_allowed);

        if min_msat == 0 {
            return Err(IssueError::Validation(
                "minSendable must be at least 1 msat".to_string(),
            ));
        }
        if min_msat > max_msat {
            return Err(IssueError::Validation(format!(
                "minSendable {min_msat} msat exceeds maxSendable {max_msat} msat"
            )));
        }

        retry_on_conflict(|| {
            let config = StoredPayConfig {
                payment_id: Uuid::new_v4().to_string(),
                min_sendable_msat: min_msat,
                max_sendable_msat: max_msat,
                comment_allowed,
                created_at: Utc::now(),
            };
            self.db.create_pay_config(&config)?;
            Ok(config)
        })
    }
}

/// Generate a fresh challenge token: 32 CSPRNG bytes, hex-encoded.
pub fn generate_k1() -> Result<String, IssueError> {
    let rng = SystemRandom::new();
    let mut bytes = [0u8; K1_BYTES];
    rng.fill(&mut bytes).map_err(|_| IssueError::TokenEntropy)?;
    Ok(hex::encode(bytes))
}

/// Run a create closure, retrying once with a fresh token when the store
/// reports a conflict. A second conflict is surfaced, not swallowed.
fn retry_on_conflict<T>(
    mut op: impl FnMut() -> Result<T, IssueError>,
) -> Result<T, IssueError> {
    match op() {
        Err(IssueError::Store(ChallengeDbError::AlreadyExists(what))) => {
            tracing::warn!(%what, "token conflict on create, retrying with a fresh token");
            op().map_err(|e| match e {
                IssueError::Store(ChallengeDbError::AlreadyExists(_)) => IssueError::TokenCollision,
                other => other,
            })
        }
        other => other,
    }
}
