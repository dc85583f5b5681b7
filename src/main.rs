// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::{env, net::SocketAddr, sync::Arc};

use lnurl_test_server::api::router;
use lnurl_test_server::config::AppConfig;
use lnurl_test_server::lightning::LndClient;
use lnurl_test_server::state::AppState;
use lnurl_test_server::storage::ChallengeDatabase;

#[tokio::main]
async fn main() {
    init_tracing();

    let config = AppConfig::from_env().expect("Failed to load configuration");

    let db_path = config.data_dir.join("challenges.redb");
    let db = ChallengeDatabase::open(&db_path).expect("Failed to open challenge database");
    tracing::info!(path = %db_path.display(), "challenge database opened");

    let backend = LndClient::new(&config.lnd).expect("Failed to build LND client");
    tracing::info!(rest_url = %config.lnd.rest_url, "LND backend configured");

    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .expect("Failed to parse bind address");
    let base_url = config.base_url.clone();

    let state = AppState::new(config, db, Arc::new(backend));
    let app = router(state);

    tracing::info!(%addr, %base_url, "LNURL test server listening (docs at /docs)");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind listener");
    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("HTTP server failed");
}

fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tower_http=debug"));

    let format = env::var("LOG_FORMAT").unwrap_or_else(|_| "pretty".to_string());
    if format == "json" {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to install ctrl-c handler");
    tracing::info!("shutdown signal received");
}
