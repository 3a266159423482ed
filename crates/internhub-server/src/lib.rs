// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! InternHub Server - HTTP API for the internship marketplace
//!
//! Thin axum layer over `internhub-core`: it verifies bearer tokens from the
//! identity provider, resolves the caller, decodes requests and maps
//! [`CoreError`](internhub_core::CoreError) onto HTTP responses.
//!
//! # Configuration
//!
//! | Variable | Required | Default | Description |
//! |----------|----------|---------|-------------|
//! | `INTERNHUB_PORT` | No | `8080` | HTTP listen port |
//! | `INTERNHUB_JWT_SECRET` | Yes | - | HS256 secret shared with the identity provider |
//! | `INTERNHUB_JWT_ISSUER` | No | - | Expected `iss` claim |
//! | `INTERNHUB_CORS_ORIGINS` | No | any | Comma-separated allowed origins |
//!
//! Store settings are read by [`internhub_core::Config`].

pub mod auth;
pub mod config;
pub mod error;
pub mod extract;
pub mod routes;
pub mod state;

use std::time::Duration;

use axum::Router;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{HeaderValue, Method};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use internhub_core::{CoreError, DualStore, HandlerState};

use crate::auth::TokenVerifier;
use crate::config::ServerConfig;
use crate::state::AppState;

/// Open both stores and build the router state.
pub async fn build_state(config: &ServerConfig) -> Result<AppState, CoreError> {
    let store = DualStore::connect(&config.core).await?;
    let handlers = HandlerState::new(store, config.core.clone());
    let verifier = TokenVerifier::new(&config.jwt_secret, config.jwt_issuer.as_deref());
    Ok(AppState::new(handlers, verifier))
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE])
        .max_age(Duration::from_secs(60 * 60));

    if origins.is_empty() {
        return layer.allow_origin(Any);
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(origin = %origin, error = %e, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    layer.allow_origin(allowed)
}

/// The full application: routes, CORS and request tracing.
pub fn app(state: AppState, cors_origins: &[String]) -> Router {
    routes::router()
        .layer(cors_layer(cors_origins))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Resolves on Ctrl+C or SIGTERM.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Received Ctrl+C, shutting down"),
            Err(e) => {
                warn!(error = %e, "Failed to install Ctrl+C handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cors_layer_accepts_lists_and_skips_invalid() {
        // Construction must not panic for any input.
        let _ = cors_layer(&[]);
        let _ = cors_layer(&["https://app.example.com".to_string()]);
        let _ = cors_layer(&["bad\norigin".to_string()]);
    }
}
