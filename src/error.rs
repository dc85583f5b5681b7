// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! HTTP error type producing LNURL-style error bodies.
//!
//! LNURL wallets expect failures as `{"status":"ERROR","reason":"..."}`;
//! every handler error is rendered in that shape. Internal detail stays in
//! the tracing log, the caller only sees the reason string.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::issuer::IssueError;
use crate::settlement::SettleError;

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub reason: String,
}

#[derive(Serialize)]
struct ErrorBody {
    status: &'static str,
    reason: String,
}

impl ApiError {
    pub fn new(status: StatusCode, reason: impl Into<String>) -> Self {
        Self {
            status,
            reason: reason.into(),
        }
    }

    pub fn not_found(reason: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, reason)
    }

    pub fn bad_request(reason: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, reason)
    }

    pub fn unprocessable(reason: impl Into<String>) -> Self {
        Self::new(StatusCode::UNPROCESSABLE_ENTITY, reason)
    }

    pub fn bad_gateway(reason: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_GATEWAY, reason)
    }

    pub fn internal(reason: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, reason)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(ErrorBody {
            status: "ERROR",
            reason: self.reason,
        });
        (self.status, body).into_response()
    }
}

impl From<SettleError> for ApiError {
    fn from(err: SettleError) -> Self {
        match err {
            SettleError::InvalidChallenge => ApiError::bad_request(err.to_string()),
            SettleError::Validation(reason) => ApiError::bad_request(reason),
            SettleError::Payment(source) => {
                tracing::error!(error = %source, "payment backend failure");
                ApiError::bad_gateway("Payment failed")
            }
            SettleError::Consistency { .. } => {
                // Already logged at ERROR by the coordinator.
                ApiError::internal("Internal error")
            }
            SettleError::Store(source) => {
                tracing::error!(error = %source, "challenge store failure");
                ApiError::internal("Internal error")
            }
        }
    }
}

impl From<IssueError> for ApiError {
    fn from(err: IssueError) -> Self {
        match err {
            IssueError::Validation(reason) => ApiError::bad_request(reason),
            IssueError::Bounds(source) => ApiError::bad_request(source.to_string()),
            other => {
                tracing::error!(error = %other, "challenge issuance failure");
                ApiError::internal("Internal error")
            }
        }
    }
}
