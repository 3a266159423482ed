// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Server configuration loading from environment variables.

use internhub_core::config::{Config, ConfigError, parse_list};

/// Default HTTP listen port.
pub const DEFAULT_PORT: u16 = 8080;

/// InternHub server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Core configuration (stores, reconcile mode, superadmins)
    pub core: Config,
    /// HTTP listen port
    pub port: u16,
    /// HS256 secret shared with the identity provider
    pub jwt_secret: String,
    /// Expected `iss` claim, checked when set
    pub jwt_issuer: Option<String>,
    /// Allowed CORS origins; empty allows any origin
    pub cors_origins: Vec<String>,
}

impl ServerConfig {
    /// Load configuration from environment variables.
    ///
    /// Required:
    /// - `INTERNHUB_DATABASE_URL`: primary store connection string
    /// - `INTERNHUB_JWT_SECRET`: token signing secret
    ///
    /// Optional (with defaults):
    /// - `INTERNHUB_PORT`: listen port (default: 8080)
    /// - `INTERNHUB_JWT_ISSUER`: expected issuer (default: not checked)
    /// - `INTERNHUB_CORS_ORIGINS`: comma-separated origins (default: any)
    /// - everything [`Config::from_env`] reads
    pub fn from_env() -> Result<Self, ConfigError> {
        let core = Config::from_env()?;

        let port: u16 = std::env::var("INTERNHUB_PORT")
            .unwrap_or_else(|_| DEFAULT_PORT.to_string())
            .parse()
            .map_err(|_| ConfigError::Invalid("INTERNHUB_PORT", "must be a port number"))?;

        let jwt_secret = std::env::var("INTERNHUB_JWT_SECRET")
            .ok()
            .filter(|s| !s.is_empty())
            .ok_or(ConfigError::Missing("INTERNHUB_JWT_SECRET"))?;

        let jwt_issuer = std::env::var("INTERNHUB_JWT_ISSUER")
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());

        let cors_origins = std::env::var("INTERNHUB_CORS_ORIGINS")
            .map(|raw| parse_list(&raw))
            .unwrap_or_default();

        Ok(Self {
            core,
            port,
            jwt_secret,
            jwt_issuer,
            cors_origins,
        })
    }
}
