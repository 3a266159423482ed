// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Notification inbox routes.

use axum::Json;
use axum::extract::{Path, State};

use internhub_core::handlers::notifications::{
    self, MarkedRead, NotificationQuery, UnreadCount,
};
use internhub_core::handlers::{PageQuery, Paginated};
use internhub_core::models::Notification;

use crate::auth::CurrentActor;
use crate::error::ApiResult;
use crate::extract::ApiQuery;
use crate::state::AppState;

pub async fn list(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    ApiQuery(query): ApiQuery<NotificationQuery>,
    ApiQuery(page): ApiQuery<PageQuery>,
) -> ApiResult<Paginated<Notification>> {
    let page = state.handlers.page(page);
    Ok(Json(
        notifications::list_notifications(&state.handlers, &actor, query, page).await?,
    ))
}

pub async fn unread_count(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
) -> ApiResult<UnreadCount> {
    Ok(Json(
        notifications::unread_count(&state.handlers, &actor).await?,
    ))
}

pub async fn mark_read(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<String>,
) -> ApiResult<Notification> {
    Ok(Json(
        notifications::mark_read(&state.handlers, &actor, &id).await?,
    ))
}

pub async fn mark_all_read(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
) -> ApiResult<MarkedRead> {
    Ok(Json(
        notifications::mark_all_read(&state.handlers, &actor).await?,
    ))
}
