// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! HTTP error responses.
//!
//! Every failure leaves the server as `{"error": {"code": ..., "message": ...}}`
//! with a status derived from the error kind.

use axum::Json;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;
use tracing::error;

use internhub_core::CoreError;

/// Result of a route returning a JSON body.
pub type ApiResult<T> = Result<Json<T>, ApiError>;

/// Errors returned by route handlers.
#[derive(Error, Debug)]
pub enum ApiError {
    /// Business or store error from the core.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// No bearer token on a route that needs one.
    #[error("Authentication required")]
    MissingToken,

    /// The bearer token failed verification.
    #[error("Invalid token: {0}")]
    InvalidToken(String),

    /// The request body or query string could not be decoded.
    #[error("Malformed request: {0}")]
    BadRequest(String),
}

impl ApiError {
    /// HTTP status for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::MissingToken | ApiError::InvalidToken(_) => StatusCode::UNAUTHORIZED,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Core(err) => match err {
                CoreError::NotFound { .. } => StatusCode::NOT_FOUND,
                CoreError::Forbidden(_) | CoreError::Unregistered { .. } => StatusCode::FORBIDDEN,
                CoreError::Unauthenticated => StatusCode::UNAUTHORIZED,
                CoreError::Conflict(_) | CoreError::InvalidTransition { .. } => {
                    StatusCode::CONFLICT
                }
                CoreError::Validation { .. } => StatusCode::UNPROCESSABLE_ENTITY,
                CoreError::StoresUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }

    /// Machine-readable error code.
    pub fn code(&self) -> &'static str {
        match self {
            ApiError::Core(err) => err.error_code(),
            ApiError::MissingToken => "UNAUTHENTICATED",
            ApiError::InvalidToken(_) => "INVALID_TOKEN",
            ApiError::BadRequest(_) => "BAD_REQUEST",
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = if status.is_server_error() && status != StatusCode::SERVICE_UNAVAILABLE {
            error!(code = self.code(), error = %self, "Request failed");
            "Internal server error".to_string()
        } else {
            self.to_string()
        };

        let body = json!({
            "error": {
                "code": self.code(),
                "message": message,
            }
        });
        (status, Json(body)).into_response()
    }
}
