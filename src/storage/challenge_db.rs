// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Embedded challenge database backed by redb (pure Rust, ACID).
//!
//! ## Table Layout
//!
//! - `withdrawals`: k1 → serialized StoredWithdrawal
//! - `auth_sessions`: k1 → serialized StoredAuthSession
//! - `pay_configs`: payment_id → serialized StoredPayConfig
//!
//! Values are JSON bytes. Creates never overwrite an existing key, and
//! settlement only succeeds while the row is still pending; both checks run
//! inside a single write transaction. redb serializes write transactions,
//! which makes the settle a compare-and-set even across processes sharing
//! the database file.

use std::path::Path;

use chrono::{DateTime, Utc};
use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};
use serde::{Deserialize, Serialize};

// =============================================================================
// Table Definitions
// =============================================================================

/// Withdrawal challenges: k1 → serialized StoredWithdrawal (JSON bytes).
const WITHDRAWALS: TableDefinition<&str, &[u8]> = TableDefinition::new("withdrawals");

/// Auth sessions: k1 → serialized StoredAuthSession (JSON bytes).
const AUTH_SESSIONS: TableDefinition<&str, &[u8]> = TableDefinition::new("auth_sessions");

/// Pay configurations: payment_id → serialized StoredPayConfig (JSON bytes).
const PAY_CONFIGS: TableDefinition<&str, &[u8]> = TableDefinition::new("pay_configs");

// =============================================================================
// Error Type
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum ChallengeDbError {
    #[error("redb error: {0}")]
    Redb(#[from] redb::Error),

    #[error("redb database error: {0}")]
    RedbDatabase(#[from] redb::DatabaseError),

    #[error("redb transaction error: {0}")]
    RedbTransaction(#[from] redb::TransactionError),

    #[error("redb table error: {0}")]
    RedbTable(#[from] redb::TableError),

    #[error("redb storage error: {0}")]
    RedbStorage(#[from] redb::StorageError),

    #[error("redb commit error: {0}")]
    RedbCommit(#[from] redb::CommitError),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("already exists: {0}")]
    AlreadyExists(String),

    #[error("withdrawal {0} is no longer pending")]
    NotPending(String),
}

pub type ChallengeDbResult<T> = Result<T, ChallengeDbError>;

// =============================================================================
// Stored Records
// =============================================================================

/// Lifecycle of a withdrawal challenge. Pending rows may settle exactly
/// once; there is no other transition and rows are never deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WithdrawalStatus {
    Pending,
    Settled,
}

/// A withdrawal challenge, keyed by its k1 token.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StoredWithdrawal {
    pub k1: String,
    pub status: WithdrawalStatus,
    /// Set only on the transition to settled.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub settled_amount_sat: Option<u64>,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub settled_at: Option<DateTime<Utc>>,
}

impl StoredWithdrawal {
    pub fn new_pending(k1: impl Into<String>) -> Self {
        Self {
            k1: k1.into(),
            status: WithdrawalStatus::Pending,
            settled_amount_sat: None,
            created_at: Utc::now(),
            settled_at: None,
        }
    }
}

/// An auth challenge bound to a session record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StoredAuthSession {
    pub k1: String,
    pub session_id: String,
    pub action: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl StoredAuthSession {
    /// Expiry is evaluated lazily at consumption time; nothing evicts rows.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// Immutable LNURL-pay configuration, keyed by payment_id.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StoredPayConfig {
    pub payment_id: String,
    pub min_sendable_msat: u64,
    pub max_sendable_msat: u64,
    pub comment_allowed: u32,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// ChallengeDatabase
// =============================================================================

/// Embedded ACID challenge database.
pub struct ChallengeDatabase {
    db: Database,
}

impl ChallengeDatabase {
    /// Open (or create) the database at the given path.
    pub fn open(path: &Path) -> ChallengeDbResult<Self> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).ok();
        }
        let db = Database::create(path)?;

        // Pre-create all tables so later read transactions don't fail
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(WITHDRAWALS)?;
            let _ = write_txn.open_table(AUTH_SESSIONS)?;
            let _ = write_txn.open_table(PAY_CONFIGS)?;
        }
        write_txn.commit()?;

        Ok(Self { db })
    }

    /// Cheap liveness probe used by the health endpoint.
    pub fn health_check(&self) -> ChallengeDbResult<()> {
        let read_txn = self.db.begin_read()?;
        let _ = read_txn.open_table(WITHDRAWALS)?;
        Ok(())
    }

    // =========================================================================
    // Withdrawals
    // =========================================================================

    /// Insert a fresh pending withdrawal. Fails with `AlreadyExists` if the
    /// k1 is taken; an existing challenge is never overwritten.
    pub fn create_withdrawal(&self, withdrawal: &StoredWithdrawal) -> ChallengeDbResult<()> {
        let json = serde_json::to_vec(withdrawal)?;
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(WITHDRAWALS)?;
            if table.get(withdrawal.k1.as_str())?.is_some() {
                return Err(ChallengeDbError::AlreadyExists(format!(
                    "withdrawal {}",
                    withdrawal.k1
                )));
            }
            table.insert(withdrawal.k1.as_str(), json.as_slice())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    /// Look up a withdrawal by k1. Absence is `Ok(None)`.
    pub fn get_withdrawal(&self, k1: &str) -> ChallengeDbResult<Option<StoredWithdrawal>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(WITHDRAWALS)?;
        match table.get(k1)? {
            Some(value) => {
                let withdrawal: StoredWithdrawal = serde_json::from_slice(value.value())?;
                Ok(Some(withdrawal))
            }
            None => Ok(None),
        }
    }

    /// Conditionally settle a withdrawal.
    ///
    /// Succeeds only while the row is still pending, and atomically sets the
    /// settled status together with the realized amount. Two racing settles
    /// on the same k1 see at most one success; the loser gets `NotPending`.
    pub fn settle_withdrawal(
        &self,
        k1: &str,
        amount_sat: u64,
    ) -> ChallengeDbResult<StoredWithdrawal> {
        let write_txn = self.db.begin_write()?;
        let settled = {
            let mut table = write_txn.open_table(WITHDRAWALS)?;

            // Read existing value and deserialize before mutating
            let existing_bytes = {
                let existing = table
                    .get(k1)?
                    .ok_or_else(|| ChallengeDbError::NotFound(format!("withdrawal {k1}")))?;
                existing.value().to_vec()
            };

            let mut withdrawal: StoredWithdrawal = serde_json::from_slice(&existing_bytes)?;
            if withdrawal.status != WithdrawalStatus::Pending {
                return Err(ChallengeDbError::NotPending(k1.to_string()));
            }

            withdrawal.status = WithdrawalStatus::Settled;
            withdrawal.settled_amount_sat = Some(amount_sat);
            withdrawal.settled_at = Some(Utc::now());

            let json = serde_json::to_vec(&withdrawal)?;
            table.insert(k1, json.as_slice())?;
            withdrawal
        };
        write_txn.commit()?;
        Ok(settled)
    }

    // =========================================================================
    // Auth sessions
    // =========================================================================

    pub fn create_auth_session(&self, session: &StoredAuthSession) -> ChallengeDbResult<()> {
        let json = serde_json::to_vec(session)?;
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(AUTH_SESSIONS)?;
            if table.get(session.k1.as_str())?.is_some() {
                return Err(ChallengeDbError::AlreadyExists(format!(
                    "auth session {}",
                    session.k1
                )));
            }
            table.insert(session.k1.as_str(), json.as_slice())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    pub fn get_auth_session(&self, k1: &str) -> ChallengeDbResult<Option<StoredAuthSession>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(AUTH_SESSIONS)?;
        match table.get(k1)? {
            Some(value) => {
                let session: StoredAuthSession = serde_json::from_slice(value.value())?;
                Ok(Some(session))
            }
            None => Ok(None),
        }
    }

    // =========================================================================
    // Pay configurations
    // =========================================================================

    pub fn create_pay_config(&self, config: &StoredPayConfig) -> ChallengeDbResult<()> {
        let json = serde_json::to_vec(config)?;
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(PAY_CONFIGS)?;
            if table.get(config.payment_id.as_str())?.is_some() {
                return Err(ChallengeDbError::AlreadyExists(format!(
                    "pay config {}",
                    config.payment_id
                )));
            }
            table.insert(config.payment_id.as_str(), json.as_slice())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    pub fn get_pay_config(&self, payment_id: &str) -> ChallengeDbResult<Option<StoredPayConfig>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(PAY_CONFIGS)?;
        match table.get(payment_id)? {
            Some(value) => {
                let config: StoredPayConfig = serde_json::from_slice(value.value())?;
                Ok(Some(config))
            }
            None => Ok(None),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
