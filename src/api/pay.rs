// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use utoipa::IntoParams;

use crate::{
    amounts::MSAT_PER_SAT,
    error::ApiError,
    models::{PayInvoiceResponse, PayRequestResponse},
    state::AppState,
};

use super::parse_param;

/// LUD-06 metadata served for every payment; the description doubles as the
/// invoice memo default.
const PAY_METADATA: &str = r#"[["text/plain","LNURL Pay Test"]]"#;
const PAY_DESCRIPTION: &str = "LNURL Pay Test";
const PAY_INVOICE_EXPIRY_SECS: u64 = 3_600;

#[derive(Deserialize, IntoParams)]
pub struct PayCallbackQuery {
    /// Requested amount in millisatoshi.
    pub amount: Option<String>,
    pub comment: Option<String>,
}

/// First leg of LNURL-pay: serve the stored configuration.
#[utoipa::path(
    get,
    path = "/pay/{payment_id}",
    params(("payment_id" = String, Path, description = "Payment configuration id")),
    tag = "Pay",
    responses((status = 200, body = PayRequestResponse))
)]
pub async fn pay_request(
    State(state): State<AppState>,
    Path(payment_id): Path<String>,
) -> Result<Json<PayRequestResponse>, ApiError> {
    let config = state
        .db
        .get_pay_config(&payment_id)
        .map_err(|e| {
            tracing::error!(error = %e, "challenge store failure");
            ApiError::internal("Internal error")
        })?
        .ok_or_else(|| ApiError::not_found("Payment config not found"))?;

    Ok(Json(PayRequestResponse {
        tag: "payRequest".to_string(),
        callback: format!("{}/pay/{payment_id}/callback", state.config.base_url),
        min_sendable: config.min_sendable_msat,
        max_sendable: config.max_sendable_msat,
        metadata: PAY_METADATA.to_string(),
        comment_allowed: config.comment_allowed,
    }))
}

/// Second leg of LNURL-pay: validate the requested amount and comment, then
/// return a fresh invoice from the backend.
#[utoipa::path(
    get,
    path = "/pay/{payment_id}/callback",
    params(
        ("payment_id" = String, Path, description = "Payment configuration id"),
        PayCallbackQuery
    ),
    tag = "Pay",
    responses((status = 200, body = PayInvoiceResponse))
)]
pub async fn pay_callback(
    State(state): State<AppState>,
    Path(payment_id): Path<String>,
    Query(params): Query<PayCallbackQuery>,
) -> Result<Json<PayInvoiceResponse>, ApiError> {
    let config = state
        .db
        .get_pay_config(&payment_id)
        .map_err(|e| {
            tracing::error!(error = %e, "challenge store failure");
            ApiError::internal("Internal error")
        })?
        .ok_or_else(|| ApiError::not_found("Payment config not found"))?;

    let amount_msat: u64 = parse_param("amount", params.amount.as_deref())?
        .ok_or_else(|| ApiError::bad_request("missing amount parameter"))?;

    if amount_msat < config.min_sendable_msat || amount_msat > config.max_sendable_msat {
        return Err(ApiError::bad_request(format!(
            "Amount out of range ({} - {} msat)",
            config.min_sendable_msat, config.max_sendable_msat
        )));
    }

    // Invoices are created in whole satoshi.
    if amount_msat % MSAT_PER_SAT != 0 {
        return Err(ApiError::bad_request(
            "Amount must be a whole number of satoshis",
        ));
    }

    if let Some(comment) = &params.comment {
        let max = config.comment_allowed as usize;
        if comment.chars().count() > max {
            return Err(ApiError::bad_request(format!(
                "Comment too long (max {max} characters)"
            )));
        }
    }

    let memo = params.comment.as_deref().unwrap_or(PAY_DESCRIPTION);
    let invoice = state
        .backend
        .create_invoice(amount_msat / MSAT_PER_SAT, memo, PAY_INVOICE_EXPIRY_SECS)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, payment_id = %payment_id, "invoice creation failed");
            ApiError::bad_gateway("Invoice creation failed")
        })?;

    tracing::info!(payment_id = %payment_id, amount_msat, "pay invoice issued");

    Ok(Json(PayInvoiceResponse {
        pr: invoice.payment_request,
        routes: Vec::new(),
    }))
}
