// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Common test infrastructure for internhub-server integration tests.
//!
//! Builds the full router over an in-memory primary store and an in-memory
//! document store, mints tokens and drives requests through `oneshot`.

#![allow(dead_code)]

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode, header};
use http_body_util::BodyExt;
use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};
use serde_json::Value;
use tower::ServiceExt;

use internhub_core::persistence::{MemoryDocumentStore, SqlitePrimaryStore};
use internhub_core::{Config, DualStore, HandlerState};
use internhub_server::app;
use internhub_server::auth::{Claims, TokenVerifier};
use internhub_server::state::AppState;

pub const SECRET: &str = "integration-test-secret";
pub const ISSUER: &str = "https://id.internhub.test/";
pub const SUPERADMIN_EMAIL: &str = "root@internhub.test";

/// Router plus direct handles on both stores.
pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub primary: Arc<SqlitePrimaryStore>,
    pub documents: Arc<MemoryDocumentStore>,
}

impl TestApp {
    pub async fn new() -> Self {
        let primary = Arc::new(
            SqlitePrimaryStore::in_memory()
                .await
                .expect("Failed to create in-memory primary store"),
        );
        let documents = Arc::new(MemoryDocumentStore::new());
        let config = Config {
            superadmin_emails: vec![SUPERADMIN_EMAIL.to_string()],
            ..Config::in_memory()
        };
        let store = DualStore::new(primary.clone(), documents.clone(), config.reconcile_mode);
        let state = AppState::new(
            HandlerState::new(store, config),
            TokenVerifier::new(SECRET, Some(ISSUER)),
        );
        Self {
            router: app(state.clone(), &[]),
            state,
            primary,
            documents,
        }
    }

    /// A valid token for `subject`.
    pub fn token(&self, subject: &str, email: &str) -> String {
        sign(SECRET, subject, email, Some(ISSUER), 3600)
    }

    /// Send a request and decode the JSON response body (`Null` when empty).
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(path);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let body = match body {
            Some(json) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };
        let request = builder.body(body).expect("Failed to build request");
        self.send(request).await
    }

    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Router failed");
        let status = response.status();
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to read body")
            .to_bytes();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).expect("Response body is not JSON")
        };
        (status, value)
    }

    pub async fn get(&self, path: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.request(Method::GET, path, token, None).await
    }

    pub async fn post(&self, path: &str, token: &str, body: Value) -> (StatusCode, Value) {
        self.request(Method::POST, path, Some(token), Some(body)).await
    }

    /// Register a user through `/api/users/sync` and return its token.
    pub async fn register(&self, subject: &str, email: &str, role: &str) -> String {
        let token = self.token(subject, email);
        let (status, _) = self
            .post(
                "/api/users/sync",
                &token,
                serde_json::json!({ "role": role }),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "sync failed for {}", subject);
        token
    }
}

/// Sign an HS256 token.
pub fn sign(secret: &str, subject: &str, email: &str, iss: Option<&str>, ttl_secs: i64) -> String {
    let claims = Claims {
        sub: subject.to_string(),
        email: email.to_string(),
        name: None,
        exp: (chrono::Utc::now().timestamp() + ttl_secs) as u64,
        iss: iss.map(str::to_string),
    };
    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .expect("Failed to sign token")
}
