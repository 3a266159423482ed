// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! InternHub Server - process entry point
//!
//! Loads configuration, opens the primary and document stores (running
//! their migrations) and serves the HTTP API until Ctrl+C or SIGTERM.

use std::net::SocketAddr;

use anyhow::Result;
use tokio::net::TcpListener;
use tracing::{error, info};

use internhub_server::config::ServerConfig;
use internhub_server::{app, build_state, shutdown_signal};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file (from crate directory or parent directories)
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "internhub_server=info,internhub_core=info".into()),
        )
        .init();

    info!("Starting InternHub Server");

    // Load configuration
    let config = ServerConfig::from_env().map_err(|e| {
        error!("Configuration error: {}", e);
        e
    })?;

    info!(
        port = config.port,
        reconcile_mode = %config.core.reconcile_mode,
        document_url = %config.core.document_url,
        jwt_issuer = config.jwt_issuer.as_deref().unwrap_or("-"),
        "Configuration loaded"
    );

    let state = build_state(&config).await?;
    let store = state.handlers.store.clone();
    let (primary_ok, documents_ok) = store.health().await;
    info!(primary_ok, documents_ok, "Stores opened");

    let app = app(state, &config.cors_origins);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "InternHub Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Shutdown complete");
    Ok(())
}
