// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;

use crate::config::AppConfig;
use crate::issuer::ChallengeIssuer;
use crate::lightning::PaymentBackend;
use crate::settlement::SettlementCoordinator;
use crate::storage::ChallengeDatabase;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub db: Arc<ChallengeDatabase>,
    pub issuer: Arc<ChallengeIssuer>,
    pub settlement: Arc<SettlementCoordinator>,
    pub backend: Arc<dyn PaymentBackend>,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        db: ChallengeDatabase,
        backend: Arc<dyn PaymentBackend>,
    ) -> Self {
        let db = Arc::new(db);
        let issuer = Arc::new(ChallengeIssuer::new(
            db.clone(),
            config.limits,
            config.auth_session_ttl_secs,
        ));
        let settlement = Arc::new(SettlementCoordinator::new(
            db.clone(),
            backend.clone(),
            config.limits,
        ));

        Self {
            config: Arc::new(config),
            db,
            issuer,
            settlement,
            backend,
        }
    }
}
