// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Bearer-token verification and caller extractors.
//!
//! Tokens are HS256 JWTs issued by the external identity provider. A verified
//! token yields an [`Identity`]; [`CurrentActor`] additionally resolves it to
//! a registered user through both stores.

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use serde::{Deserialize, Serialize};
use tracing::debug;

use internhub_core::CoreError;
use internhub_core::permissions::{Actor, Identity, resolve_actor};

use crate::error::ApiError;
use crate::state::AppState;

/// Claims carried by identity-provider tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    #[serde(default)]
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub exp: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,
}

impl From<Claims> for Identity {
    fn from(claims: Claims) -> Self {
        Identity {
            subject: claims.sub,
            email: claims.email,
            name: claims.name,
        }
    }
}

/// Verifies HS256 tokens against a shared secret.
#[derive(Clone)]
pub struct TokenVerifier {
    key: DecodingKey,
    validation: Validation,
}

impl TokenVerifier {
    /// Verifier for `secret`, checking `iss` when `issuer` is given.
    pub fn new(secret: &str, issuer: Option<&str>) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_required_spec_claims(&["exp", "sub"]);
        if let Some(issuer) = issuer {
            validation.set_issuer(&[issuer]);
        }
        Self {
            key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }

    /// Verify a raw token and return the identity it carries.
    pub fn verify(&self, token: &str) -> Result<Identity, ApiError> {
        let data = decode::<Claims>(token, &self.key, &self.validation).map_err(|e| {
            debug!(error = %e, "Token rejected");
            ApiError::InvalidToken(e.to_string())
        })?;
        if data.claims.sub.trim().is_empty() {
            return Err(ApiError::InvalidToken("empty subject".to_string()));
        }
        Ok(data.claims.into())
    }
}

/// The token from an `Authorization: Bearer ...` header, if any.
fn bearer_token(parts: &Parts) -> Result<Option<&str>, ApiError> {
    let Some(value) = parts.headers.get(AUTHORIZATION) else {
        return Ok(None);
    };
    let value = value
        .to_str()
        .map_err(|_| ApiError::InvalidToken("authorization header is not ASCII".to_string()))?;
    match value.split_once(' ') {
        Some((scheme, token)) if scheme.eq_ignore_ascii_case("bearer") && !token.trim().is_empty() => {
            Ok(Some(token.trim()))
        }
        _ => Err(ApiError::InvalidToken(
            "expected a bearer token".to_string(),
        )),
    }
}

/// A verified identity that may not have a user record yet.
#[derive(Debug, Clone)]
pub struct Authenticated(pub Identity);

impl FromRequestParts<AppState> for Authenticated {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)?.ok_or(ApiError::MissingToken)?;
        Ok(Self(state.verifier.verify(token)?))
    }
}

/// The registered caller.
#[derive(Debug, Clone)]
pub struct CurrentActor(pub Actor);

impl FromRequestParts<AppState> for CurrentActor {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let Authenticated(identity) = Authenticated::from_request_parts(parts, state).await?;
        let actor = resolve_actor(&state.handlers.store, &identity).await?;
        Ok(Self(actor))
    }
}

/// The caller on routes that also serve anonymous requests.
///
/// No token means anonymous. A token that fails verification is still
/// rejected; a valid one without a user record is treated as anonymous.
#[derive(Debug, Clone)]
pub struct MaybeActor(pub Option<Actor>);

impl FromRequestParts<AppState> for MaybeActor {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let Some(token) = bearer_token(parts)? else {
            return Ok(Self(None));
        };
        let identity = state.verifier.verify(token)?;
        match resolve_actor(&state.handlers.store, &identity).await {
            Ok(actor) => Ok(Self(Some(actor))),
            Err(CoreError::Unregistered { .. }) => Ok(Self(None)),
            Err(e) => Err(e.into()),
        }
    }
}
