// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use utoipa::IntoParams;

use crate::{
    error::ApiError,
    issuer,
    models::{ChannelRequestResponse, StatusResponse},
    state::AppState,
};

#[derive(Deserialize, IntoParams)]
pub struct ChannelCallbackQuery {
    pub k1: Option<String>,
    /// The wallet node's pubkey.
    pub remoteid: Option<String>,
    pub private: Option<String>,
}

/// LUD-02 `channelRequest`, advertising the configured node URI.
#[utoipa::path(
    get,
    path = "/channel",
    tag = "Channel",
    responses((status = 200, body = ChannelRequestResponse))
)]
pub async fn channel_request(
    State(state): State<AppState>,
) -> Result<Json<ChannelRequestResponse>, ApiError> {
    let uri = state.config.channel_node_uri.clone().ok_or_else(|| {
        ApiError::new(
            StatusCode::SERVICE_UNAVAILABLE,
            "Channel node URI not configured",
        )
    })?;

    let k1 = issuer::generate_k1().map_err(|e| {
        tracing::error!(error = %e, "k1 generation failed");
        ApiError::internal("Internal error")
    })?;

    Ok(Json(ChannelRequestResponse {
        tag: "channelRequest".to_string(),
        uri,
        callback: format!("{}/channel/callback", state.config.base_url),
        k1,
    }))
}

/// Channel callback: acknowledges the request without opening a channel.
#[utoipa::path(
    get,
    path = "/channel/callback",
    params(ChannelCallbackQuery),
    tag = "Channel",
    responses((status = 200, body = StatusResponse))
)]
pub async fn channel_callback(
    Query(params): Query<ChannelCallbackQuery>,
) -> Result<Json<StatusResponse>, ApiError> {
    let k1 = params
        .k1
        .as_deref()
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ApiError::bad_request("missing k1 parameter"))?;
    let remoteid = params
        .remoteid
        .as_deref()
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ApiError::bad_request("missing remoteid parameter"))?;

    tracing::info!(
        k1,
        remoteid,
        private = params.private.as_deref().unwrap_or("0"),
        "channel request acknowledged"
    );

    Ok(Json(StatusResponse::ok()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::test_support::{test_config, test_state};
    use crate::state::AppState;
    use crate::storage::ChallengeDatabase;
    use std::sync::Arc;

    #[tokio::test]
    async fn channel_request_serves_node_uri_and_fresh_k1() {
        let (state, _dir) = test_state(100);

        let Json(response) = channel_request(State(state.clone()))
            .await
            .expect("channel request succeeds");
        assert_eq!(response.tag, "channelRequest");
        assert_eq!(
            Some(response.uri.as_str()),
            state.config.channel_node_uri.as_deref()
        );
        assert_eq!(response.k1.len(), 64);
        assert_eq!(
            response.callback,
            "http://127.0.0.1:3000/channel/callback"
        );
    }

    #[tokio::test]
    async fn channel_request_without_node_uri_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let db = ChallengeDatabase::open(&dir.path().join("test.redb")).unwrap();
        let mut config = test_config();
        config.channel_node_uri = None;
        let state = AppState::new(
            config,
            db,
            Arc::new(crate::api::test_support::StubBackend { amount_sat: 0 }),
        );

        let err = channel_request(State(state)).await.unwrap_err();
        assert_eq!(err.status, StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn channel_callback_requires_k1_and_remoteid() {
        let err = channel_callback(Query(ChannelCallbackQuery {
            k1: None,
            remoteid: Some("02abc".to_string()),
            private: None,
        }))
        .await
        .unwrap_err();
        assert_eq!(err.reason, "missing k1 parameter");

        let Json(response) = channel_callback(Query(ChannelCallbackQuery {
            k1: Some("aa".to_string()),
            remoteid: Some("02abc".to_string()),
            private: Some("1".to_string()),
        }))
        .await
        .expect("channel callback succeeds");
        assert_eq!(response, StatusResponse::ok());
    }
}
