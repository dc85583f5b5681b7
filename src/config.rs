// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! Configuration is loaded from the environment once at startup and threaded
//! into the issuer and settlement coordinator as constructor arguments.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `BASE_URL` | Public base URL embedded in LNURL callbacks | `http://127.0.0.1:3000` |
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `3000` |
//! | `DATA_DIR` | Directory for the challenge database | `./data` |
//! | `MIN_WITHDRAWABLE_MSAT` | Default withdraw lower bound | `1000` |
//! | `MAX_WITHDRAWABLE_MSAT` | Default withdraw upper bound | `100000000` |
//! | `MIN_SENDABLE_MSAT` | Default pay lower bound | `1000` |
//! | `MAX_SENDABLE_MSAT` | Default pay upper bound | `100000000` |
//! | `COMMENT_ALLOWED` | Max pay comment length | `255` |
//! | `AUTH_SESSION_TTL_SECS` | Auth challenge time-to-live | `300` |
//! | `CHANNEL_NODE_URI` | `pubkey@host:port` served by the channel endpoint | unset |
//! | `LND_REST_URL` | LND REST endpoint | `https://127.0.0.1:8080` |
//! | `LND_MACAROON_HEX` | Hex-encoded admin macaroon | unset |
//! | `LND_TIMEOUT_SECS` | LND request timeout | `30` |
//! | `LND_ACCEPT_INVALID_CERTS` | Accept LND's self-signed TLS cert | `true` |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |

use std::env;
use std::path::PathBuf;

/// Default msat bounds applied when a caller omits them.
///
/// Withdraw and pay limits are expressed in millisatoshi; invoice amounts
/// are validated in satoshi after rounding (see [`crate::amounts`]).
#[derive(Debug, Clone, Copy)]
pub struct Limits {
    pub min_withdrawable_msat: u64,
    pub max_withdrawable_msat: u64,
    pub min_sendable_msat: u64,
    pub max_sendable_msat: u64,
    pub comment_allowed: u32,
}

/// Connection settings for the LND REST backend.
#[derive(Debug, Clone)]
pub struct LndConfig {
    pub rest_url: String,
    pub macaroon_hex: Option<String>,
    pub timeout_secs: u64,
    pub accept_invalid_certs: bool,
}

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Public base URL used when building LNURL callback URLs.
    pub base_url: String,
    pub host: String,
    pub port: u16,
    pub data_dir: PathBuf,
    pub limits: Limits,
    /// Fixed TTL applied to every auth challenge at creation.
    pub auth_session_ttl_secs: u64,
    /// Node URI advertised by the channel endpoint, if configured.
    pub channel_node_uri: Option<String>,
    pub lnd: LndConfig,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("environment variable {0} is not valid: {1}")]
    Invalid(&'static str, String),
}

impl AppConfig {
    /// Load configuration from the environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        let port = env_parse("PORT", 3000)?;
        let base_url = env_or_default("BASE_URL", &format!("http://127.0.0.1:{port}"));

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            host: env_or_default("HOST", "0.0.0.0"),
            port,
            data_dir: PathBuf::from(env_or_default("DATA_DIR", "./data")),
            limits: Limits {
                min_withdrawable_msat: env_parse("MIN_WITHDRAWABLE_MSAT", 1_000)?,
                max_withdrawable_msat: env_parse("MAX_WITHDRAWABLE_MSAT", 100_000_000)?,
                min_sendable_msat: env_parse("MIN_SENDABLE_MSAT", 1_000)?,
                max_sendable_msat: env_parse("MAX_SENDABLE_MSAT", 100_000_000)?,
                comment_allowed: env_parse("COMMENT_ALLOWED", 255)?,
            },
            auth_session_ttl_secs: env_parse("AUTH_SESSION_TTL_SECS", 300)?,
            channel_node_uri: env::var("CHANNEL_NODE_URI").ok(),
            lnd: LndConfig {
                rest_url: env_or_default("LND_REST_URL", "https://127.0.0.1:8080")
                    .trim_end_matches('/')
                    .to_string(),
                macaroon_hex: env::var("LND_MACAROON_HEX").ok(),
                timeout_secs: env_parse("LND_TIMEOUT_SECS", 30)?,
                accept_invalid_certs: env_parse("LND_ACCEPT_INVALID_CERTS", true)?,
            },
        })
    }
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            min_withdrawable_msat: 1_000,
            max_withdrawable_msat: 100_000_000,
            min_sendable_msat: 1_000,
            max_sendable_msat: 100_000_000,
            comment_allowed: 255,
        }
    }
}

fn env_or_default(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_string())
}

fn env_parse<T: std::str::FromStr>(name: &'static str, default: T) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) => raw
            .parse()
            .map_err(|e: T::Err| ConfigError::Invalid(name, e.to_string())),
        Err(_) => Ok(default),
    }
}
