// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Configuration loading from environment variables.

use crate::reconcile::ReconcileMode;

/// Default upper bound for page sizes.
pub const DEFAULT_MAX_PAGE_SIZE: usize = 100;

/// Document store URL used when none is configured.
pub const DEFAULT_DOCUMENT_URL: &str = "memory";

/// InternHub core configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// SQLite connection URL for the primary (relational) store
    pub database_url: String,
    /// Document store URL (`memory` or a SQLite URL)
    pub document_url: String,
    /// How list reads combine the two stores
    pub reconcile_mode: ReconcileMode,
    /// Emails that become superadmins on their first sync (lower-cased)
    pub superadmin_emails: Vec<String>,
    /// Upper bound for `limit` in paginated requests
    pub max_page_size: usize,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Required:
    /// - `INTERNHUB_DATABASE_URL`: primary store connection string
    ///
    /// Optional (with defaults):
    /// - `INTERNHUB_DOCUMENT_URL`: document store (default: memory)
    /// - `INTERNHUB_RECONCILE_MODE`: `merge` or `fallback` (default: merge)
    /// - `INTERNHUB_SUPERADMIN_EMAILS`: comma-separated list (default: empty)
    /// - `INTERNHUB_MAX_PAGE_SIZE`: page size bound (default: 100)
    pub fn from_env() -> Result<Self, ConfigError> {
        let database_url = std::env::var("INTERNHUB_DATABASE_URL")
            .map_err(|_| ConfigError::Missing("INTERNHUB_DATABASE_URL"))?;

        let document_url = std::env::var("INTERNHUB_DOCUMENT_URL")
            .unwrap_or_else(|_| DEFAULT_DOCUMENT_URL.to_string());

        let reconcile_mode: ReconcileMode = std::env::var("INTERNHUB_RECONCILE_MODE")
            .unwrap_or_else(|_| "merge".to_string())
            .parse()
            .map_err(|_| {
                ConfigError::Invalid("INTERNHUB_RECONCILE_MODE", "must be 'merge' or 'fallback'")
            })?;

        let superadmin_emails = std::env::var("INTERNHUB_SUPERADMIN_EMAILS")
            .map(|raw| parse_list(&raw))
            .unwrap_or_default()
            .into_iter()
            .map(|email| email.to_lowercase())
            .collect();

        let max_page_size: usize = std::env::var("INTERNHUB_MAX_PAGE_SIZE")
            .unwrap_or_else(|_| DEFAULT_MAX_PAGE_SIZE.to_string())
            .parse()
            .ok()
            .filter(|size| *size > 0)
            .ok_or(ConfigError::Invalid(
                "INTERNHUB_MAX_PAGE_SIZE",
                "must be a positive integer",
            ))?;

        Ok(Self {
            database_url,
            document_url,
            reconcile_mode,
            superadmin_emails,
            max_page_size,
        })
    }

    /// Configuration for tests and embedded use: in-memory primary and document stores.
    pub fn in_memory() -> Self {
        Self {
            database_url: "sqlite::memory:".to_string(),
            document_url: DEFAULT_DOCUMENT_URL.to_string(),
            reconcile_mode: ReconcileMode::default(),
            superadmin_emails: Vec::new(),
            max_page_size: DEFAULT_MAX_PAGE_SIZE,
        }
    }

    /// Whether the email is configured as a bootstrap superadmin.
    pub fn is_superadmin_email(&self, email: &str) -> bool {
        let email = email.to_lowercase();
        self.superadmin_emails.iter().any(|e| *e == email)
    }
}

/// Split a comma-separated variable, dropping blanks.
pub fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A required environment variable is missing.
    #[error("missing required environment variable: {0}")]
    Missing(&'static str),

    /// An environment variable has an invalid value.
    #[error("invalid value for {0}: {1}")]
    Invalid(&'static str, &'static str),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::Mutex;

    // Mutex to serialize tests that modify environment variables
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    /// Helper to set env vars for a test and restore them after
    struct EnvGuard {
        vars: Vec<(String, Option<String>)>,
    }

    impl EnvGuard {
        fn new() -> Self {
            Self { vars: Vec::new() }
        }

        fn set(&mut self, key: &str, value: &str) {
            let old = env::var(key).ok();
            self.vars.push((key.to_string(), old));
            // SAFETY: Tests are serialized via ENV_MUTEX, so no concurrent access
            unsafe { env::set_var(key, value) };
        }

        fn remove(&mut self, key: &str) {
            let old = env::var(key).ok();
            self.vars.push((key.to_string(), old));
            // SAFETY: Tests are serialized via ENV_MUTEX, so no concurrent access
            unsafe { env::remove_var(key) };
        }
    }

    impl Drop for EnvGuard {
        fn drop(&mut self) {
            for (key, value) in self.vars.drain(..).rev() {
                // SAFETY: Tests are serialized via ENV_MUTEX, so no concurrent access
                unsafe {
                    match value {
                        Some(v) => env::set_var(&key, v),
                        None => env::remove_var(&key),
                    }
                }
            }
        }
    }

    fn clear_optional(guard: &mut EnvGuard) {
        guard.remove("INTERNHUB_DOCUMENT_URL");
        guard.remove("INTERNHUB_RECONCILE_MODE");
        guard.remove("INTERNHUB_SUPERADMIN_EMAILS");
        guard.remove("INTERNHUB_MAX_PAGE_SIZE");
    }

    #[test]
    fn test_config_from_env_with_defaults() {
        let _lock = ENV_MUTEX.lock().unwrap();
        let mut guard = EnvGuard::new();

        guard.set("INTERNHUB_DATABASE_URL", "sqlite:internhub.db");
        clear_optional(&mut guard);

        let config = Config::from_env().unwrap();

        assert_eq!(config.database_url, "sqlite:internhub.db");
        assert_eq!(config.document_url, "memory");
        assert_eq!(config.reconcile_mode, ReconcileMode::Merge);
        assert!(config.superadmin_emails.is_empty());
        assert_eq!(config.max_page_size, 100);
    }

    #[test]
    fn test_config_all_custom() {
        let _lock = ENV_MUTEX.lock().unwrap();
        let mut guard = EnvGuard::new();

        guard.set("INTERNHUB_DATABASE_URL", "sqlite:/var/lib/internhub/primary.db");
        guard.set("INTERNHUB_DOCUMENT_URL", "sqlite:/var/lib/internhub/docs.db");
        guard.set("INTERNHUB_RECONCILE_MODE", "FALLBACK");
        guard.set(
            "INTERNHUB_SUPERADMIN_EMAILS",
            " Root@Example.com, ,ops@example.com ",
        );
        guard.set("INTERNHUB_MAX_PAGE_SIZE", "250");

        let config = Config::from_env().unwrap();

        assert_eq!(config.document_url, "sqlite:/var/lib/internhub/docs.db");
        assert_eq!(config.reconcile_mode, ReconcileMode::Fallback);
        assert_eq!(
            config.superadmin_emails,
            vec!["root@example.com".to_string(), "ops@example.com".to_string()]
        );
        assert_eq!(config.max_page_size, 250);
        assert!(config.is_superadmin_email("ROOT@example.com"));
        assert!(!config.is_superadmin_email("someone@example.com"));
    }

    #[test]
    fn test_config_missing_database_url() {
        let _lock = ENV_MUTEX.lock().unwrap();
        let mut guard = EnvGuard::new();

        guard.remove("INTERNHUB_DATABASE_URL");

        let err = Config::from_env().unwrap_err();
        assert!(matches!(err, ConfigError::Missing("INTERNHUB_DATABASE_URL")));
        assert!(err.to_string().contains("INTERNHUB_DATABASE_URL"));
    }

    #[test]
    fn test_config_invalid_reconcile_mode() {
        let _lock = ENV_MUTEX.lock().unwrap();
        let mut guard = EnvGuard::new();

        guard.set("INTERNHUB_DATABASE_URL", "sqlite::memory:");
        clear_optional(&mut guard);
        guard.set("INTERNHUB_RECONCILE_MODE", "sometimes");

        let err = Config::from_env().unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid("INTERNHUB_RECONCILE_MODE", _)
        ));
    }

    #[test]
    fn test_config_zero_page_size_rejected() {
        let _lock = ENV_MUTEX.lock().unwrap();
        let mut guard = EnvGuard::new();

        guard.set("INTERNHUB_DATABASE_URL", "sqlite::memory:");
        clear_optional(&mut guard);
        guard.set("INTERNHUB_MAX_PAGE_SIZE", "0");

        let err = Config::from_env().unwrap_err();
        assert!(matches!(err, ConfigError::Invalid("INTERNHUB_MAX_PAGE_SIZE", _)));
    }

    #[test]
    fn test_parse_list() {
        assert_eq!(parse_list("a, b,,c "), vec!["a", "b", "c"]);
        assert!(parse_list("  ").is_empty());
    }
}
