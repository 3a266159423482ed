// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Notification inbox handlers.

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use crate::error::{CoreError, Result};
use crate::handlers::{HandlerState, Page, Paginated};
use crate::models::Notification;
use crate::permissions::Actor;
use crate::persistence::NotificationFilter;

#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationQuery {
    #[serde(default)]
    pub unread_only: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnreadCount {
    pub count: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkedRead {
    pub updated: usize,
}

async fn inbox(state: &HandlerState, actor: &Actor, unread_only: bool) -> Result<Vec<Notification>> {
    let mut notifications = state
        .store
        .list_notifications(&NotificationFilter {
            user_id: Some(actor.id().to_string()),
            unread_only,
        })
        .await?;
    notifications.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    Ok(notifications)
}

/// The caller's notifications, newest first.
#[instrument(skip(state, actor), fields(user_id = %actor.id()))]
pub async fn list_notifications(
    state: &HandlerState,
    actor: &Actor,
    query: NotificationQuery,
    page: Page,
) -> Result<Paginated<Notification>> {
    actor.ensure_active()?;
    Ok(page.apply(inbox(state, actor, query.unread_only).await?))
}

pub async fn unread_count(state: &HandlerState, actor: &Actor) -> Result<UnreadCount> {
    actor.ensure_active()?;
    Ok(UnreadCount {
        count: inbox(state, actor, true).await?.len(),
    })
}

/// Mark one notification read. Marking a read notification is a no-op.
#[instrument(skip(state, actor), fields(user_id = %actor.id()))]
pub async fn mark_read(state: &HandlerState, actor: &Actor, id: &str) -> Result<Notification> {
    actor.ensure_active()?;
    let mut notification = state
        .store
        .get_notification(id)
        .await?
        .ok_or_else(|| CoreError::not_found("notification", id))?;
    if !actor.is(&notification.user_id) {
        return Err(CoreError::Forbidden(
            "notification belongs to another user".to_string(),
        ));
    }
    if notification.read {
        return Ok(notification);
    }

    notification.read = true;
    state.store.update_notification(&notification).await?;
    Ok(notification)
}

#[instrument(skip(state, actor), fields(user_id = %actor.id()))]
pub async fn mark_all_read(state: &HandlerState, actor: &Actor) -> Result<MarkedRead> {
    actor.ensure_active()?;
    let mut updated = 0;
    let mut failed = 0;
    for mut notification in inbox(state, actor, true).await? {
        notification.read = true;
        match state.store.update_notification(&notification).await {
            Ok(_) => updated += 1,
            Err(e) => {
                warn!(notification_id = %notification.id, error = %e, "Failed to mark notification read");
                failed += 1;
            }
        }
    }
    debug!(updated, failed, "Marked notifications read");
    Ok(MarkedRead { updated })
}
