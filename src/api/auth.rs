// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    extract::{Query, State},
    Json,
};
use chrono::Utc;
use serde::Deserialize;
use utoipa::IntoParams;

use crate::{error::ApiError, lnurl, models::StatusResponse, state::AppState};

#[derive(Deserialize, IntoParams)]
pub struct AuthCallbackQuery {
    pub k1: Option<String>,
    /// DER-encoded secp256k1 signature over k1, hex.
    pub sig: Option<String>,
    /// SEC1 linking public key, hex.
    pub key: Option<String>,
}

/// LNURL-auth callback: check the challenge is known and unexpired, then
/// verify the wallet's linking-key signature over it.
///
/// Expiry is evaluated here, against the expiry stamped at issuance; expired
/// sessions are never evicted, only refused.
#[utoipa::path(
    get,
    path = "/auth",
    params(AuthCallbackQuery),
    tag = "Auth",
    responses((status = 200, body = StatusResponse))
)]
pub async fn auth_callback(
    State(state): State<AppState>,
    Query(params): Query<AuthCallbackQuery>,
) -> Result<Json<StatusResponse>, ApiError> {
    let k1 = params
        .k1
        .as_deref()
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ApiError::bad_request("missing k1 parameter"))?;

    let session = state
        .db
        .get_auth_session(k1)
        .map_err(|e| {
            tracing::error!(error = %e, "challenge store failure");
            ApiError::internal("Internal error")
        })?
        .ok_or_else(|| ApiError::bad_request("Invalid or unknown k1"))?;

    if session.is_expired(Utc::now()) {
        return Err(ApiError::bad_request("Session expired"));
    }

    let sig = params
        .sig
        .as_deref()
        .ok_or_else(|| ApiError::bad_request("missing sig parameter"))?;
    let key = params
        .key
        .as_deref()
        .ok_or_else(|| ApiError::bad_request("missing key parameter"))?;

    lnurl::verify_auth_signature(k1, sig, key)
        .map_err(|e| ApiError::bad_request(e.to_string()))?;

    tracing::info!(
        k1,
        session_id = %session.session_id,
        action = %session.action,
        key,
        "auth challenge verified"
    );

    Ok(Json(StatusResponse::ok()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::test_support::{test_config, test_state};
    use crate::state::AppState;
    use crate::storage::{ChallengeDatabase, StoredAuthSession};
    use axum::http::StatusCode;
    use chrono::Duration;
    use k256::ecdsa::signature::hazmat::PrehashSigner;
    use k256::ecdsa::{Signature, SigningKey};
    use std::sync::Arc;

    fn query(k1: Option<&str>, sig: Option<&str>, key: Option<&str>) -> AuthCallbackQuery {
        AuthCallbackQuery {
            k1: k1.map(str::to_string),
            sig: sig.map(str::to_string),
            key: key.map(str::to_string),
        }
    }

    /// Sign a hex k1 the way a wallet would.
    fn wallet_signature(k1_hex: &str) -> (String, String) {
        let signing_key = SigningKey::from_slice(&[0x11u8; 32]).unwrap();
        let k1 = hex::decode(k1_hex).unwrap();
        let sig: Signature = signing_key.sign_prehash(&k1).unwrap();
        (
            hex::encode(sig.to_der().as_bytes()),
            hex::encode(signing_key.verifying_key().to_sec1_bytes()),
        )
    }

    #[tokio::test]
    async fn fresh_challenge_with_valid_signature_is_accepted() {
        let (state, _dir) = test_state(100);
        let issued = state.issuer.issue_auth("login").unwrap();
        let (sig, key) = wallet_signature(&issued.k1);

        let Json(response) = auth_callback(
            State(state),
            Query(query(Some(&issued.k1), Some(&sig), Some(&key))),
        )
        .await
        .expect("auth callback succeeds");
        assert_eq!(response, StatusResponse::ok());
    }

    #[tokio::test]
    async fn unknown_k1_is_rejected() {
        let (state, _dir) = test_state(100);
        let err = auth_callback(
            State(state),
            Query(query(Some("ffff"), Some("aa"), Some("bb"))),
        )
        .await
        .unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert_eq!(err.reason, "Invalid or unknown k1");
    }

    #[tokio::test]
    async fn expiry_is_checked_at_consumption_time() {
        // Build a session whose clock can be controlled, bypassing the issuer.
        let dir = tempfile::tempdir().unwrap();
        let db = ChallengeDatabase::open(&dir.path().join("test.redb")).unwrap();

        let now = Utc::now();
        let ttl = Duration::seconds(300);
        let k1 = hex::encode([0x5au8; 32]);
        db.create_auth_session(&StoredAuthSession {
            k1: k1.clone(),
            session_id: "session-exp".to_string(),
            action: "login".to_string(),
            // Issued just over the TTL ago: one second past expiry
            created_at: now - ttl - Duration::seconds(1),
            expires_at: now - Duration::seconds(1),
        })
        .unwrap();

        let state = AppState::new(
            test_config(),
            db,
            Arc::new(crate::api::test_support::StubBackend { amount_sat: 0 }),
        );
        let (sig, key) = wallet_signature(&k1);

        let err = auth_callback(
            State(state.clone()),
            Query(query(Some(&k1), Some(&sig), Some(&key))),
        )
        .await
        .unwrap_err();
        assert_eq!(err.reason, "Session expired");

        // A second session still inside its TTL passes
        let k1_fresh = hex::encode([0x5bu8; 32]);
        state
            .db
            .create_auth_session(&StoredAuthSession {
                k1: k1_fresh.clone(),
                session_id: "session-ok".to_string(),
                action: "login".to_string(),
                created_at: now,
                expires_at: now + Duration::seconds(1),
            })
            .unwrap();
        let (sig, key) = wallet_signature(&k1_fresh);
        auth_callback(
            State(state),
            Query(query(Some(&k1_fresh), Some(&sig), Some(&key))),
        )
        .await
        .expect("unexpired session is accepted");
    }

    #[tokio::test]
    async fn bad_signature_is_rejected() {
        let (state, _dir) = test_state(100);
        let issued = state.issuer.issue_auth("login").unwrap();

        // Signature over a different challenge
        let other_k1 = hex::encode([0x99u8; 32]);
        let (sig, key) = wallet_signature(&other_k1);

        let err = auth_callback(
            State(state),
            Query(query(Some(&issued.k1), Some(&sig), Some(&key))),
        )
        .await
        .unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert_eq!(err.reason, "signature does not match k1 and key");
    }

    #[tokio::test]
    async fn missing_parameters_are_named() {
        let (state, _dir) = test_state(100);
        let issued = state.issuer.issue_auth("login").unwrap();

        let err = auth_callback(State(state.clone()), Query(query(None, None, None)))
            .await
            .unwrap_err();
        assert_eq!(err.reason, "missing k1 parameter");

        let err = auth_callback(
            State(state.clone()),
            Query(query(Some(&issued.k1), None, Some("aa"))),
        )
        .await
        .unwrap_err();
        assert_eq!(err.reason, "missing sig parameter");

        let err = auth_callback(
            State(state),
            Query(query(Some(&issued.k1), Some("aa"), None)),
        )
        .await
        .unwrap_err();
        assert_eq!(err.reason, "missing key parameter");
    }
}
