// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! LND REST client.
//!
//! Uses three endpoints: `GET /v1/payreq/{invoice}` to decode,
//! `POST /v1/channels/transactions` to pay (synchronous send), and
//! `POST /v1/invoices` to create invoices. Authentication is the macaroon
//! header; LND's self-signed certificate is accepted when configured for it.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

use crate::config::LndConfig;

use super::{CreatedInvoice, DecodedInvoice, LightningError, PaymentBackend};

const MACAROON_HEADER: &str = "Grpc-Metadata-macaroon";

#[derive(Debug, Clone)]
pub struct LndClient {
    rest_url: String,
    macaroon_hex: Option<String>,
    http: Client,
}

#[derive(Debug, Deserialize)]
struct PayReqResponse {
    /// LND serializes int64 fields as JSON strings.
    #[serde(default)]
    num_satoshis: String,
    #[serde(default)]
    payment_hash: String,
}

#[derive(Debug, Deserialize)]
struct SendResponse {
    #[serde(default)]
    payment_error: String,
}

#[derive(Debug, Deserialize)]
struct AddInvoiceResponse {
    #[serde(default)]
    payment_request: String,
    /// Base64-encoded payment hash, passed through as returned.
    #[serde(default)]
    r_hash: String,
}

impl LndClient {
    pub fn new(config: &LndConfig) -> Result<Self, LightningError> {
        let mut builder = Client::builder().timeout(Duration::from_secs(config.timeout_secs));
        if config.accept_invalid_certs {
            builder = builder.danger_accept_invalid_certs(true);
        }
        let http = builder.build()?;

        Ok(Self {
            rest_url: config.rest_url.clone(),
            macaroon_hex: config.macaroon_hex.clone(),
            http,
        })
    }

    fn get(&self, path: &str) -> reqwest::RequestBuilder {
        self.with_macaroon(self.http.get(format!("{}{path}", self.rest_url)))
    }

    fn post(&self, path: &str) -> reqwest::RequestBuilder {
        self.with_macaroon(self.http.post(format!("{}{path}", self.rest_url)))
    }

    fn with_macaroon(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.macaroon_hex {
            Some(macaroon) => request.header(MACAROON_HEADER, macaroon),
            None => request,
        }
    }
}

#[async_trait]
impl PaymentBackend for LndClient {
    async fn decode_invoice(&self, invoice: &str) -> Result<DecodedInvoice, LightningError> {
        let response = self.get(&format!("/v1/payreq/{invoice}")).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LightningError::Decode(format!("LND returned {status}: {body}")));
        }

        let decoded: PayReqResponse = response.json().await?;
        let amount_sat = decoded
            .num_satoshis
            .parse()
            .map_err(|_| {
                LightningError::InvalidResponse(format!(
                    "num_satoshis is not an integer: {:?}",
                    decoded.num_satoshis
                ))
            })?;

        Ok(DecodedInvoice {
            amount_sat,
            payment_hash: decoded.payment_hash,
        })
    }

    async fn pay_invoice(&self, invoice: &str) -> Result<(), LightningError> {
        let response = self
            .post("/v1/channels/transactions")
            .json(&json!({ "payment_request": invoice }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LightningError::Payment(format!("LND returned {status}: {body}")));
        }

        // LND reports routing failures inside a 200 response.
        let sent: SendResponse = response.json().await?;
        if !sent.payment_error.is_empty() {
            return Err(LightningError::Payment(sent.payment_error));
        }

        Ok(())
    }

    async fn create_invoice(
        &self,
        amount_sat: u64,
        memo: &str,
        expiry_secs: u64,
    ) -> Result<CreatedInvoice, LightningError> {
        let response = self
            .post("/v1/invoices")
            .json(&json!({
                "value": amount_sat.to_string(),
                "memo": memo,
                "expiry": expiry_secs.to_string(),
            }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LightningError::CreateInvoice(format!(
                "LND returned {status}: {body}"
            )));
        }

        let created: AddInvoiceResponse = response.json().await?;
        if created.payment_request.is_empty() {
            return Err(LightningError::InvalidResponse(
                "missing payment_request in add invoice response".to_string(),
            ));
        }

        Ok(CreatedInvoice {
            payment_request: created.payment_request,
            payment_hash: created.r_hash,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> LndConfig {
        LndConfig {
            rest_url: "https://127.0.0.1:8080".to_string(),
            macaroon_hex: Some("0201abcd".to_string()),
            timeout_secs: 5,
            accept_invalid_certs: true,
        }
    }

    #[test]
    fn client_builds_from_config() {
        let client = LndClient::new(&test_config()).unwrap();
        assert_eq!(client.rest_url, "https://127.0.0.1:8080");
        assert_eq!(client.macaroon_hex.as_deref(), Some("0201abcd"));
    }

    #[test]
    fn payreq_response_parses_lnd_string_integers() {
        let decoded: PayReqResponse =
            serde_json::from_str(r#"{"num_satoshis":"250","payment_hash":"ab12"}"#).unwrap();
        assert_eq!(decoded.num_satoshis, "250");
        assert_eq!(decoded.payment_hash, "ab12");
    }

    #[test]
    fn send_response_defaults_to_no_error() {
        let sent: SendResponse = serde_json::from_str("{}").unwrap();
        assert!(sent.payment_error.is_empty());

        let failed: SendResponse =
            serde_json::from_str(r#"{"payment_error":"no route"}"#).unwrap();
        assert_eq!(failed.payment_error, "no route");
    }
}
