// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::str::FromStr;

use axum::{routing::get, Router};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    error::ApiError,
    models::{
        ChannelRequestResponse, GenerateResponse, PayInvoiceResponse, PayRequestResponse,
        StatusResponse, WithdrawRequestResponse,
    },
    state::AppState,
};

pub mod auth;
pub mod channel;
pub mod generate;
pub mod health;
pub mod pay;
pub mod withdraw;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/generate/{type}", get(generate::generate_lnurl))
        .route("/withdraw", get(withdraw::withdraw_request))
        .route("/withdraw/callback", get(withdraw::withdraw_callback))
        .route("/pay/{payment_id}", get(pay::pay_request))
        .route("/pay/{payment_id}/callback", get(pay::pay_callback))
        .route("/auth", get(auth::auth_callback))
        .route("/channel", get(channel::channel_request))
        .route("/channel/callback", get(channel::channel_callback))
        .route("/health", get(health::health))
        .route("/health/live", get(health::liveness))
        .route("/health/ready", get(health::readiness))
        .with_state(state)
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// Parse an optional query parameter, mapping a parse failure to a
/// caller-facing validation error naming the parameter.
pub(crate) fn parse_param<T: FromStr>(
    name: &str,
    value: Option<&str>,
) -> Result<Option<T>, ApiError> {
    match value {
        None => Ok(None),
        Some(raw) => raw.parse().map(Some).map_err(|_| {
            ApiError::bad_request(format!("{name} must be a non-negative integer"))
        }),
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        generate::generate_lnurl,
        withdraw::withdraw_request,
        withdraw::withdraw_callback,
        pay::pay_request,
        pay::pay_callback,
        auth::auth_callback,
        channel::channel_request,
        channel::channel_callback,
        health::health,
        health::liveness,
        health::readiness
    ),
    components(
        schemas(
            GenerateResponse,
            WithdrawRequestResponse,
            PayRequestResponse,
            PayInvoiceResponse,
            ChannelRequestResponse,
            StatusResponse,
            health::ReadyResponse,
            health::HealthChecks,
            health::HealthResponse
        )
    ),
    tags(
        (name = "Generate", description = "LNURL generation for wallet testing"),
        (name = "Withdraw", description = "LNURL-withdraw flow"),
        (name = "Pay", description = "LNURL-pay flow"),
        (name = "Auth", description = "LNURL-auth flow"),
        (name = "Channel", description = "LNURL-channel flow"),
        (name = "Health", description = "Service health")
    )
)]
struct ApiDoc;
