// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Error types for internhub-core.
//!
//! Provides a unified error type with stable machine-readable codes that the
//! HTTP layer maps onto status codes.

use thiserror::Error;

/// Result type using CoreError
pub type Result<T> = std::result::Result<T, CoreError>;

/// Core errors that can occur during request processing.
#[derive(Debug, Clone, Error)]
#[non_exhaustive]
pub enum CoreError {
    /// The record was found in neither store.
    #[error("{entity} '{id}' not found")]
    NotFound {
        /// Entity name (user, company, ...).
        entity: &'static str,
        /// The key that was looked up.
        id: String,
    },

    /// The actor is not allowed to perform the operation.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// No valid identity was presented.
    #[error("Authentication required")]
    Unauthenticated,

    /// The identity is valid but has no user record yet.
    #[error("User '{subject}' is not registered")]
    Unregistered {
        /// Identity provider subject.
        subject: String,
    },

    /// A status change that the entity lifecycle does not allow.
    #[error("Cannot move {entity} from '{from}' to '{to}'")]
    InvalidTransition {
        /// Entity name.
        entity: &'static str,
        /// Current status.
        from: String,
        /// Requested status.
        to: String,
    },

    /// Input validation failed.
    #[error("Validation error for '{field}': {message}")]
    Validation {
        /// The field that failed validation.
        field: String,
        /// The validation error message.
        message: String,
    },

    /// The operation would duplicate an existing record.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Primary (relational) store operation failed.
    #[error("Database error during '{operation}': {details}")]
    Database {
        /// The operation that failed.
        operation: String,
        /// Error details.
        details: String,
    },

    /// Document store operation failed.
    #[error("Document store error during '{operation}': {details}")]
    Document {
        /// The operation that failed.
        operation: String,
        /// Error details.
        details: String,
    },

    /// Both the primary and the document store failed.
    #[error("No store could serve {entity}")]
    StoresUnavailable {
        /// Entity name.
        entity: &'static str,
    },
}

impl CoreError {
    /// Get the error code string for this error type.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "NOT_FOUND",
            Self::Forbidden(_) => "FORBIDDEN",
            Self::Unauthenticated => "UNAUTHENTICATED",
            Self::Unregistered { .. } => "USER_NOT_REGISTERED",
            Self::InvalidTransition { .. } => "INVALID_TRANSITION",
            Self::Validation { .. } => "VALIDATION_ERROR",
            Self::Conflict(_) => "CONFLICT",
            Self::Database { .. } => "DATABASE_ERROR",
            Self::Document { .. } => "DOCUMENT_STORE_ERROR",
            Self::StoresUnavailable { .. } => "STORES_UNAVAILABLE",
        }
    }

    /// Whether this error came from a store rather than from business rules.
    ///
    /// Only store failures trigger the fallback to the other store.
    pub fn is_store_failure(&self) -> bool {
        matches!(self, Self::Database { .. } | Self::Document { .. })
    }

    pub(crate) fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity,
            id: id.into(),
        }
    }

    pub(crate) fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    pub(crate) fn document(operation: &str, details: impl ToString) -> Self {
        Self::Document {
            operation: operation.to_string(),
            details: details.to_string(),
        }
    }
}

impl From<sqlx::Error> for CoreError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err
            && db_err.is_unique_violation()
        {
            return CoreError::Conflict(db_err.message().to_string());
        }
        CoreError::Database {
            operation: "query".to_string(),
            details: err.to_string(),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for CoreError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        CoreError::Database {
            operation: "migrate".to_string(),
            details: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for CoreError {
    fn from(err: serde_json::Error) -> Self {
        CoreError::Document {
            operation: "json".to_string(),
            details: err.to_string(),
        }
    }
}
