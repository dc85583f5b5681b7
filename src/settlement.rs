// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Withdrawal settlement state machine.
//!
//! A challenge moves `pending → settled` exactly once, or stays pending when
//! an attempt is rejected. All validation happens before the payment call;
//! the conditional store write after payment is the single point of mutual
//! exclusion between racing callbacks.
//!
//! Because payment necessarily precedes the commit, two callers can both
//! pass validation and both reach the backend; the pre-check before paying
//! narrows that window but only the backend's own per-invoice idempotency
//! closes it. A lost commit after a successful payment is therefore reported
//! as a consistency error, never swallowed.

use std::sync::Arc;

use crate::amounts;
use crate::config::Limits;
use crate::lightning::{LightningError, PaymentBackend};
use crate::storage::{ChallengeDatabase, ChallengeDbError, WithdrawalStatus};

#[derive(Debug, thiserror::Error)]
pub enum SettleError {
    /// Absent and already-used tokens are deliberately indistinguishable.
    #[error("Invalid or used k1")]
    InvalidChallenge,

    #[error("{0}")]
    Validation(String),

    /// Backend decode/pay failure or timeout; the challenge stays pending
    /// and the caller may retry with a corrected invoice.
    #[error("payment backend failure: {0}")]
    Payment(#[from] LightningError),

    /// The invoice was paid but the settled state could not be recorded.
    /// Requires operator attention; not user-recoverable.
    #[error("settlement record inconsistent for {k1}: {detail}")]
    Consistency { k1: String, detail: String },

    #[error(transparent)]
    Store(#[from] ChallengeDbError),
}

pub struct SettlementCoordinator {
    db: Arc<ChallengeDatabase>,
    backend: Arc<dyn PaymentBackend>,
    limits: Limits,
}

impl SettlementCoordinator {
    pub fn new(
        db: Arc<ChallengeDatabase>,
        backend: Arc<dyn PaymentBackend>,
        limits: Limits,
    ) -> Self {
        Self {
            db,
            backend,
            limits,
        }
    }

    /// Settle a withdrawal challenge against a presented invoice.
    ///
    /// Order of operations: lookup, bounds resolution, decode, range check,
    /// pay, conditional commit. Nothing irreversible happens before every
    /// validation has passed, and the commit is conditional on the row still
    /// being pending.
    pub async fn settle(
        &self,
        k1: &str,
        invoice: &str,
        min_msat: Option<u64>,
        max_msat: Option<u64>,
    ) -> Result<u64, SettleError> {
        let challenge = self
            .db
            .get_withdrawal(k1)?
            .ok_or(SettleError::InvalidChallenge)?;
        if challenge.status != WithdrawalStatus::Pending {
            return Err(SettleError::InvalidChallenge);
        }

        let min_msat = min_msat.unwrap_or(self.limits.min_withdrawable_msat);
        let max_msat = max_msat.unwrap_or(self.limits.max_withdrawable_msat);
        let (min_sat, max_sat) = amounts::satoshi_bounds(min_msat, max_msat)
            .map_err(|e| SettleError::Validation(e.to_string()))?;

        let decoded = self.backend.decode_invoice(invoice).await?;
        tracing::info!(
            k1,
            amount_sat = decoded.amount_sat,
            min_sat,
            max_sat,
            "processing withdrawal"
        );

        if !amounts::in_range(decoded.amount_sat, min_sat, max_sat) {
            return Err(SettleError::Validation(format!(
                "Amount out of range ({min_sat} - {max_sat} sats)"
            )));
        }

        // Cheap pre-check right before the irreversible step. Not a
        // substitute for the conditional commit, only a race narrower.
        match self.db.get_withdrawal(k1)? {
            Some(current) if current.status == WithdrawalStatus::Pending => {}
            _ => return Err(SettleError::InvalidChallenge),
        }

        self.backend.pay_invoice(invoice).await?;

        match self.db.settle_withdrawal(k1, decoded.amount_sat) {
            Ok(_) => {
                tracing::info!(k1, amount_sat = decoded.amount_sat, "withdrawal settled");
                Ok(decoded.amount_sat)
            }
            Err(ChallengeDbError::NotPending(_)) | Err(ChallengeDbError::NotFound(_)) => {
                tracing::error!(
                    k1,
                    amount_sat = decoded.amount_sat,
                    payment_hash = %decoded.payment_hash,
                    "invoice paid but challenge was no longer pending; possible double payment"
                );
                Err(SettleError::Consistency {
                    k1: k1.to_string(),
                    detail: "challenge settled concurrently after payment".to_string(),
                })
            }
            Err(e) => {
                tracing::error!(
                    k1,
                    amount_sat = decoded.amount_sat,
                    payment_hash = %decoded.payment_hash,
                    error = %e,
                    "invoice paid but settlement commit failed; funds moved without a record"
                );
                Err(SettleError::Consistency {
                    k1: k1.to_string(),
                    detail: format!("commit failed after payment: {e}"),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lightning::{CreatedInvoice, DecodedInvoice};
    use crate::storage::StoredWithdrawal;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Programmable backend double counting decode/pay calls.
    struct MockBackend {
        decode_result: Box<dyn Fn() -> Result<DecodedInvoice, LightningError> + Send + Sync>,
        pay_result: Box<dyn Fn() -> Result<(), LightningError> + Send + Sync>,
        decode_calls: AtomicUsize,
        pay_calls: AtomicUsize,
    }

    impl MockBackend {
        fn paying(amount_sat: u64) -> Self {
            Self {
                decode_result: Box::new(move || {
                    Ok(DecodedInvoice {
                        amount_sat,
                        payment_hash: "hash".to_string(),
                    })
                }),
                pay_result: Box::new(|| Ok(())),
                decode_calls: AtomicUsize::new(0),
                pay_calls: AtomicUsize::new(0),
            }
        }

        fn decode_fails() -> Self {
            let mut mock = Self::paying(0);
            mock.decode_result =
                Box::new(|| Err(LightningError::Decode("malformed invoice".to_string())));
            mock
        }

        fn pay_fails(amount_sat: u64) -> Self {
            let mut mock = Self::paying(amount_sat);
            mock.pay_result =
                Box::new(|| Err(LightningError::Payment("insufficient balance".to_string())));
            mock
        }
    }

    #[async_trait]
    impl PaymentBackend for MockBackend {
        async fn decode_invoice(&self, _invoice: &str) -> Result<DecodedInvoice, LightningError> {
            self.decode_calls.fetch_add(1, Ordering::SeqCst);
            (self.decode_result)()
        }

        async fn pay_invoice(&self, _invoice: &str) -> Result<(), LightningError> {
            self.pay_calls.fetch_add(1, Ordering::SeqCst);
            (self.pay_result)()
        }

        async fn create_invoice(
            &self,
            _amount_sat: u64,
            _memo: &str,
            _expiry_secs: u64,
        ) -> Result<CreatedInvoice, LightningError> {
            Ok(CreatedInvoice {
                payment_request: "lnbc1...".to_string(),
                payment_hash: "hash".to_string(),
            })
        }
    }

    fn coordinator(
        backend: MockBackend,
    ) -> (
        SettlementCoordinator,
        Arc<ChallengeDatabase>,
        Arc<MockBackend>,
        tempfile::TempDir,
    ) {
        let dir = tempfile::tempdir().unwrap();
        let db = Arc::new(ChallengeDatabase::open(&dir.path().join("test.redb")).unwrap());
        let backend = Arc::new(backend);
        let coordinator =
            SettlementCoordinator::new(db.clone(), backend.clone(), Limits::default());
        (coordinator, db, backend, dir)
    }

    fn pending_challenge(db: &ChallengeDatabase, k1: &str) {
        db.create_withdrawal(&StoredWithdrawal::new_pending(k1))
            .unwrap();
    }

    #[tokio::test]
    async fn in_range_invoice_settles_with_realized_amount() {
        let (coordinator, db, backend, _dir) = coordinator(MockBackend::paying(250));
        pending_challenge(&db, "k1a");

        let amount = coordinator
            .settle("k1a", "lnbc250...", Some(1_000), Some(500_000))
            .await
            .unwrap();
        assert_eq!(amount, 250);
        assert_eq!(backend.pay_calls.load(Ordering::SeqCst), 1);

        let stored = db.get_withdrawal("k1a").unwrap().unwrap();
        assert_eq!(stored.status, WithdrawalStatus::Settled);
        assert_eq!(stored.settled_amount_sat, Some(250));
    }

    #[tokio::test]
    async fn out_of_range_invoice_is_rejected_and_challenge_stays_usable() {
        let (coordinator, db, backend, _dir) = coordinator(MockBackend::paying(600));
        pending_challenge(&db, "k1b");

        let result = coordinator
            .settle("k1b", "lnbc600...", Some(1_000), Some(500_000))
            .await;
        match result {
            Err(SettleError::Validation(reason)) => {
                assert_eq!(reason, "Amount out of range (1 - 500 sats)")
            }
            other => panic!("expected validation error, got {other:?}"),
        }

        // No payment attempted, challenge still pending and unset
        assert_eq!(backend.pay_calls.load(Ordering::SeqCst), 0);
        let stored = db.get_withdrawal("k1b").unwrap().unwrap();
        assert_eq!(stored.status, WithdrawalStatus::Pending);
        assert_eq!(stored.settled_amount_sat, None);
    }

    #[tokio::test]
    async fn unknown_and_used_tokens_get_the_same_error() {
        let (coordinator, db, backend, _dir) = coordinator(MockBackend::paying(100));
        pending_challenge(&db, "k1c");

        let missing = coordinator.settle("ghost", "lnbc100...", None, None).await;
        assert!(matches!(missing, Err(SettleError::InvalidChallenge)));

        coordinator
            .settle("k1c", "lnbc100...", None, None)
            .await
            .unwrap();
        let replay = coordinator.settle("k1c", "lnbc100...", None, None).await;
        assert!(matches!(replay, Err(SettleError::InvalidChallenge)));

        // Exactly one payment across both attempts
        assert_eq!(backend.pay_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn decode_failure_leaves_challenge_pending() {
        let (coordinator, db, backend, _dir) = coordinator(MockBackend::decode_fails());
        pending_challenge(&db, "k1d");

        let result = coordinator.settle("k1d", "garbage", None, None).await;
        assert!(matches!(result, Err(SettleError::Payment(_))));
        assert_eq!(backend.pay_calls.load(Ordering::SeqCst), 0);

        let stored = db.get_withdrawal("k1d").unwrap().unwrap();
        assert_eq!(stored.status, WithdrawalStatus::Pending);
        assert_eq!(stored.settled_amount_sat, None);
    }

    #[tokio::test]
    async fn pay_failure_leaves_challenge_pending_for_retry() {
        let (coordinator, db, backend, _dir) = coordinator(MockBackend::pay_fails(100));
        pending_challenge(&db, "k1e");

        let result = coordinator.settle("k1e", "lnbc100...", None, None).await;
        assert!(matches!(result, Err(SettleError::Payment(_))));
        assert_eq!(backend.pay_calls.load(Ordering::SeqCst), 1);

        let stored = db.get_withdrawal("k1e").unwrap().unwrap();
        assert_eq!(stored.status, WithdrawalStatus::Pending);
    }

    #[tokio::test]
    async fn pathological_override_bounds_are_rejected_before_decode() {
        let (coordinator, db, backend, _dir) = coordinator(MockBackend::paying(100));
        pending_challenge(&db, "k1f");

        let result = coordinator
            .settle("k1f", "lnbc100...", Some(2_000), Some(1_000))
            .await;
        assert!(matches!(result, Err(SettleError::Validation(_))));
        assert_eq!(backend.decode_calls.load(Ordering::SeqCst), 0);
        assert_eq!(backend.pay_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn already_settled_challenge_is_refused_before_paying() {
        let (coordinator, db, backend, _dir) = coordinator(MockBackend::paying(100));
        pending_challenge(&db, "k1g");

        db.settle_withdrawal("k1g", 100).unwrap();
        let result = coordinator.settle("k1g", "lnbc100...", None, None).await;
        assert!(matches!(result, Err(SettleError::InvalidChallenge)));
        assert_eq!(backend.pay_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn commit_lost_after_payment_is_a_consistency_error() {
        // A concurrent settle lands between the pre-check and the commit:
        // model it with a backend whose pay step settles the row underneath.
        let dir = tempfile::tempdir().unwrap();
        let db = Arc::new(ChallengeDatabase::open(&dir.path().join("test.redb")).unwrap());
        pending_challenge(&db, "k1h");

        let race_db = db.clone();
        let mut backend = MockBackend::paying(100);
        backend.pay_result = Box::new(move || {
            race_db.settle_withdrawal("k1h", 100).unwrap();
            Ok(())
        });
        let coordinator =
            SettlementCoordinator::new(db.clone(), Arc::new(backend), Limits::default());

        let result = coordinator.settle("k1h", "lnbc100...", None, None).await;
        assert!(matches!(result, Err(SettleError::Consistency { .. })));

        // The concurrent winner's amount is what survives
        let stored = db.get_withdrawal("k1h").unwrap().unwrap();
        assert_eq!(stored.status, WithdrawalStatus::Settled);
        assert_eq!(stored.settled_amount_sat, Some(100));
    }

    #[tokio::test]
    async fn concurrent_settles_pay_out_at_most_once_per_commit() {
        let (coordinator, db, _backend, _dir) = coordinator(MockBackend::paying(100));
        pending_challenge(&db, "k1race");

        let coordinator = Arc::new(coordinator);
        let mut handles = Vec::new();
        for _ in 0..4 {
            let coordinator = coordinator.clone();
            handles.push(tokio::spawn(async move {
                coordinator.settle("k1race", "lnbc100...", None, None).await
            }));
        }

        let mut successes = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(amount) => {
                    assert_eq!(amount, 100);
                    successes += 1;
                }
                Err(SettleError::InvalidChallenge) | Err(SettleError::Consistency { .. }) => {}
                Err(other) => panic!("unexpected error: {other:?}"),
            }
        }
        assert_eq!(successes, 1);

        let stored = db.get_withdrawal("k1race").unwrap().unwrap();
        assert_eq!(stored.status, WithdrawalStatus::Settled);
        assert_eq!(stored.settled_amount_sat, Some(100));
    }
}
