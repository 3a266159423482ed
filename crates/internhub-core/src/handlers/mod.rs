// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Request handlers.
//!
//! Handlers are transport-agnostic: each takes the shared [`HandlerState`],
//! the resolved caller and a typed request, and returns a typed response or
//! a [`CoreError`](crate::error::CoreError). The HTTP layer only decodes,
//! resolves the caller and maps errors.

pub mod admin;
pub mod applications;
pub mod companies;
pub mod internships;
pub mod notifications;
pub mod users;

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use chrono::Utc;
use serde::{Deserialize, Deserializer, Serialize};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tracing::{debug, warn};

use crate::config::Config;
use crate::ids::new_key;
use crate::models::{Notification, NotificationKind};
use crate::reconcile::DualStore;

/// Page size used when the request does not give one.
pub const DEFAULT_PAGE_SIZE: usize = 20;

/// Shared state for all handlers.
pub struct HandlerState {
    /// Both stores behind the reconciler.
    pub store: DualStore,
    /// Core configuration.
    pub config: Config,
    /// Writes in-app notifications.
    pub notifier: Notifier,
    /// When the server started (for uptime calculation).
    pub start_time: std::time::Instant,
    /// Server version string.
    pub version: String,
    /// Serializes uniqueness checks with the insert they guard.
    pub locks: KeyedLocks,
}

impl HandlerState {
    /// Create handler state over the given stores.
    pub fn new(store: DualStore, config: Config) -> Self {
        Self {
            notifier: Notifier::new(store.clone()),
            store,
            config,
            start_time: std::time::Instant::now(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            locks: KeyedLocks::default(),
        }
    }

    /// Get the server uptime in milliseconds.
    pub fn uptime_ms(&self) -> i64 {
        self.start_time.elapsed().as_millis() as i64
    }

    /// Clamp raw pagination parameters against the configured bound.
    pub fn page(&self, query: PageQuery) -> Page {
        Page::new(query.limit, query.offset, self.config.max_page_size)
    }
}

/// Async locks keyed by string.
///
/// Holding the guard for a key excludes every other holder of the same key
/// in this process. Entries nobody holds or waits on are pruned on the next
/// acquire.
#[derive(Default)]
pub struct KeyedLocks {
    locks: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl KeyedLocks {
    /// Wait for exclusive access to `key`.
    pub async fn lock(&self, key: impl Into<String>) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
            locks.retain(|_, lock| Arc::strong_count(lock) > 1);
            locks.entry(key.into()).or_default().clone()
        };
        lock.lock_owned().await
    }

    /// Number of keys currently tracked.
    pub fn len(&self) -> usize {
        self.locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// ============================================================================
// Pagination
// ============================================================================

/// Raw pagination parameters as sent by clients.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct PageQuery {
    #[serde(default)]
    pub limit: Option<usize>,
    #[serde(default)]
    pub offset: Option<usize>,
}

/// Validated pagination window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub limit: usize,
    pub offset: usize,
}

impl Page {
    /// `limit` defaults to [`DEFAULT_PAGE_SIZE`] and is clamped to `[1, max]`.
    pub fn new(limit: Option<usize>, offset: Option<usize>, max: usize) -> Self {
        let max = max.max(1);
        Self {
            limit: limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, max),
            offset: offset.unwrap_or(0),
        }
    }

    /// Cut one page out of a full result set.
    pub fn apply<T>(self, items: Vec<T>) -> Paginated<T> {
        let total = items.len();
        let items = items
            .into_iter()
            .skip(self.offset)
            .take(self.limit)
            .collect();
        Paginated {
            items,
            total,
            limit: self.limit,
            offset: self.offset,
        }
    }
}

impl Default for Page {
    fn default() -> Self {
        Self {
            limit: DEFAULT_PAGE_SIZE,
            offset: 0,
        }
    }
}

/// One page of results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Paginated<T> {
    pub items: Vec<T>,
    pub total: usize,
    pub limit: usize,
    pub offset: usize,
}

// ============================================================================
// Notifications
// ============================================================================

/// Creates in-app notifications through the reconciler's write path.
///
/// Failures are logged and swallowed: a notification never fails the
/// operation that triggered it.
#[derive(Clone)]
pub struct Notifier {
    store: DualStore,
}

impl Notifier {
    pub fn new(store: DualStore) -> Self {
        Self { store }
    }

    /// Store a notification for `user_id`. Returns it when it was written.
    pub async fn notify(
        &self,
        user_id: &str,
        kind: NotificationKind,
        title: impl Into<String>,
        message: impl Into<String>,
        link: Option<String>,
    ) -> Option<Notification> {
        let notification = Notification {
            id: new_key(),
            user_id: user_id.to_string(),
            kind,
            title: title.into(),
            message: message.into(),
            link,
            read: false,
            created_at: Utc::now(),
        };

        match self.store.insert_notification(&notification).await {
            Ok(target) => {
                debug!(user_id = %user_id, kind = %kind, ?target, "Notification stored");
                Some(notification)
            }
            Err(e) => {
                warn!(user_id = %user_id, kind = %kind, error = %e, "Failed to store notification");
                None
            }
        }
    }
}

/// Deserialize a field that was present in the input, `null` included, as
/// `Some`. Paired with `#[serde(default)]`, an absent field stays `None` and
/// an explicit `null` becomes `Some(None)`.
pub(crate) fn present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Trim an optional text field, mapping blank to `None`.
pub(crate) fn clean(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Require a non-blank text field, returning it trimmed.
pub(crate) fn required(field: &str, value: &str) -> crate::error::Result<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(crate::error::CoreError::validation(field, "must not be empty"));
    }
    Ok(value.to_string())
}

/// Validate an optional absolute http(s) URL.
pub(crate) fn http_url(field: &str, value: Option<String>) -> crate::error::Result<Option<String>> {
    let Some(raw) = clean(value) else {
        return Ok(None);
    };
    match url::Url::parse(&raw) {
        Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => Ok(Some(raw)),
        Ok(_) => Err(crate::error::CoreError::validation(field, "must be an http(s) URL")),
        Err(e) => Err(crate::error::CoreError::validation(field, e.to_string())),
    }
}
