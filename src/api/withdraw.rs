// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;
use url::Url;
use utoipa::IntoParams;

use crate::{
    error::ApiError,
    models::{StatusResponse, WithdrawRequestResponse},
    state::AppState,
};

use super::parse_param;

const DEFAULT_DESCRIPTION: &str = "LNURL Withdraw Test";

#[derive(Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct WithdrawQuery {
    pub min_withdrawable: Option<String>,
    pub max_withdrawable: Option<String>,
}

#[derive(Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct WithdrawCallbackQuery {
    pub k1: Option<String>,
    /// bolt11 payment request.
    pub pr: Option<String>,
    pub min_withdrawable: Option<String>,
    pub max_withdrawable: Option<String>,
}

/// First leg of LNURL-withdraw: issue a challenge and advertise the bounds.
#[utoipa::path(
    get,
    path = "/withdraw",
    params(WithdrawQuery),
    tag = "Withdraw",
    responses((status = 200, body = WithdrawRequestResponse))
)]
pub async fn withdraw_request(
    State(state): State<AppState>,
    Query(params): Query<WithdrawQuery>,
) -> Result<Json<WithdrawRequestResponse>, ApiError> {
    let min_msat = parse_param("minWithdrawable", params.min_withdrawable.as_deref())?;
    let max_msat = parse_param("maxWithdrawable", params.max_withdrawable.as_deref())?;

    let issued = state.issuer.issue_withdrawal(min_msat, max_msat)?;

    // Embed the resolved bounds so the callback validates the same range it
    // advertised.
    let mut callback = Url::parse(&format!("{}/withdraw/callback", state.config.base_url))
        .map_err(|e| {
            tracing::error!(error = %e, "BASE_URL does not form a valid callback URL");
            ApiError::internal("Internal error")
        })?;
    callback
        .query_pairs_mut()
        .append_pair("k1", &issued.k1)
        .append_pair("minWithdrawable", &issued.min_msat.to_string())
        .append_pair("maxWithdrawable", &issued.max_msat.to_string());

    tracing::info!(
        k1 = %issued.k1,
        min_withdrawable = issued.min_msat,
        max_withdrawable = issued.max_msat,
        "withdrawal request created"
    );

    Ok(Json(WithdrawRequestResponse {
        tag: "withdrawRequest".to_string(),
        callback: callback.into(),
        k1: issued.k1,
        default_description: DEFAULT_DESCRIPTION.to_string(),
        min_withdrawable: issued.min_msat,
        max_withdrawable: issued.max_msat,
    }))
}

/// Second leg of LNURL-withdraw: validate the invoice and pay it.
#[utoipa::path(
    get,
    path = "/withdraw/callback",
    params(WithdrawCallbackQuery),
    tag = "Withdraw",
    responses((status = 200, body = StatusResponse))
)]
pub async fn withdraw_callback(
    State(state): State<AppState>,
    Query(params): Query<WithdrawCallbackQuery>,
) -> Result<Json<StatusResponse>, ApiError> {
    let k1 = params
        .k1
        .as_deref()
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ApiError::bad_request("missing k1 parameter"))?;
    let pr = params
        .pr
        .as_deref()
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ApiError::bad_request("missing pr parameter"))?;

    let min_msat = parse_param("minWithdrawable", params.min_withdrawable.as_deref())?;
    let max_msat = parse_param("maxWithdrawable", params.max_withdrawable.as_deref())?;

    let amount_sat = state.settlement.settle(k1, pr, min_msat, max_msat).await?;

    tracing::info!(k1, amount_sat, "withdrawal completed");
    Ok(Json(StatusResponse::ok()))
}
