// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Generator API: builds the LNURL a wallet scans for each flow.
//!
//! Withdraw and channel URLs are stateless; pay and auth generation persist
//! a config/session first. The bolt11 type asks the backend for a raw
//! invoice instead of producing an LNURL.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use url::Url;
use utoipa::IntoParams;

use crate::{error::ApiError, lnurl, models::GenerateResponse, state::AppState};

use super::parse_param;

const BOLT11_EXPIRY_SECS: u64 = 3_600;

#[derive(Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct GenerateQuery {
    pub min_withdrawable: Option<String>,
    pub max_withdrawable: Option<String>,
    pub min_sendable: Option<String>,
    pub max_sendable: Option<String>,
    pub comment_allowed: Option<String>,
    pub action: Option<String>,
    /// Invoice amount in satoshi for the bolt11 type; zero for a
    /// zero-amount invoice.
    pub amount: Option<String>,
}

#[utoipa::path(
    get,
    path = "/generate/{type}",
    params(
        ("type" = String, Path, description = "withdraw | pay | channel | auth | bolt11"),
        GenerateQuery
    ),
    tag = "Generate",
    responses((status = 200, body = GenerateResponse))
)]
pub async fn generate_lnurl(
    State(state): State<AppState>,
    Path(kind): Path<String>,
    Query(params): Query<GenerateQuery>,
) -> Result<Json<GenerateResponse>, ApiError> {
    match kind.as_str() {
        "withdraw" => generate_withdraw(&state, &params),
        "pay" => generate_pay(&state, &params),
        "channel" => generate_channel(&state),
        "auth" => generate_auth(&state, &params),
        "bolt11" => generate_bolt11(&state, &params).await,
        _ => Err(ApiError::bad_request(
            "Invalid type. Use \"withdraw\", \"pay\", \"channel\", \"auth\", or \"bolt11\"",
        )),
    }
    .map(Json)
}

fn generate_withdraw(
    state: &AppState,
    params: &GenerateQuery,
) -> Result<GenerateResponse, ApiError> {
    let min_msat: Option<u64> =
        parse_param("minWithdrawable", params.min_withdrawable.as_deref())?;
    let max_msat: Option<u64> =
        parse_param("maxWithdrawable", params.max_withdrawable.as_deref())?;

    // Bounds ride along as query parameters; the challenge itself is only
    // created when a wallet fetches /withdraw.
    let mut url = parse_base(state, "/withdraw")?;
    {
        let mut pairs = url.query_pairs_mut();
        if let Some(min) = min_msat {
            pairs.append_pair("minWithdrawable", &min.to_string());
        }
        if let Some(max) = max_msat {
            pairs.append_pair("maxWithdrawable", &max.to_string());
        }
    }
    let url = trim_empty_query(url);

    Ok(GenerateResponse::Withdraw {
        lnurl: encode_lnurl(&url)?,
        url,
        kind: "withdraw".to_string(),
    })
}

fn generate_pay(state: &AppState, params: &GenerateQuery) -> Result<GenerateResponse, ApiError> {
    let min_msat = parse_param("minSendable", params.min_sendable.as_deref())?;
    let max_msat = parse_param("maxSendable", params.max_sendable.as_deref())?;
    let comment_allowed = parse_param("commentAllowed", params.comment_allowed.as_deref())?;

    let config = state
        .issuer
        .issue_pay_config(min_msat, max_msat, comment_allowed)?;

    let url = format!("{}/pay/{}", state.config.base_url, config.payment_id);

    tracing::info!(
        payment_id = %config.payment_id,
        min_sendable = config.min_sendable_msat,
        max_sendable = config.max_sendable_msat,
        "payment config created"
    );

    Ok(GenerateResponse::Pay {
        lnurl: encode_lnurl(&url)?,
        url,
        payment_id: config.payment_id,
        kind: "pay".to_string(),
        min_sendable: config.min_sendable_msat,
        max_sendable: config.max_sendable_msat,
        comment_allowed: config.comment_allowed,
    })
}

fn generate_channel(state: &AppState) -> Result<GenerateResponse, ApiError> {
    let url = format!("{}/channel", state.config.base_url);
    Ok(GenerateResponse::Channel {
        lnurl: encode_lnurl(&url)?,
        url,
        kind: "channel".to_string(),
    })
}

fn generate_auth(state: &AppState, params: &GenerateQuery) -> Result<GenerateResponse, ApiError> {
    let action = params.action.as_deref().unwrap_or("login");
    let issued = state.issuer.issue_auth(action)?;

    let url = format!(
        "{}/auth?tag=login&k1={}&action={action}",
        state.config.base_url, issued.k1
    );

    tracing::info!(
        k1 = %issued.k1,
        session_id = %issued.session_id,
        action,
        "auth challenge generated"
    );

    Ok(GenerateResponse::Auth {
        status: "OK".to_string(),
        lnurl: encode_lnurl(&url)?,
        url,
        kind: "auth".to_string(),
        k1: issued.k1,
    })
}

async fn generate_bolt11(
    state: &AppState,
    params: &GenerateQuery,
) -> Result<GenerateResponse, ApiError> {
    let amount_sat = parse_param("amount", params.amount.as_deref())?.unwrap_or(0);

    let invoice = state
        .backend
        .create_invoice(amount_sat, "", BOLT11_EXPIRY_SECS)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "invoice creation failed");
            ApiError::bad_gateway("Invoice creation failed")
        })?;

    tracing::info!(
        amount = amount_sat,
        payment_hash = %invoice.payment_hash,
        "bolt11 invoice generated"
    );

    Ok(GenerateResponse::Bolt11 {
        bolt11: invoice.payment_request,
        kind: "bolt11".to_string(),
        amount: amount_sat,
        payment_hash: invoice.payment_hash,
    })
}

fn parse_base(state: &AppState, path: &str) -> Result<Url, ApiError> {
    Url::parse(&format!("{}{path}", state.config.base_url)).map_err(|e| {
        tracing::error!(error = %e, "BASE_URL does not form a valid URL");
        ApiError::internal("Internal error")
    })
}

fn encode_lnurl(url: &str) -> Result<String, ApiError> {
    lnurl::encode(url).map_err(|e| {
        tracing::error!(error = %e, "lnurl encoding failed");
        ApiError::internal("Internal error")
    })
}

fn trim_empty_query(mut url: Url) -> String {
    if url.query() == Some("") {
        url.set_query(None);
    }
    url.into()
}
