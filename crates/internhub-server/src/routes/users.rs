// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! User routes.

use axum::Json;
use axum::body::Bytes;
use axum::extract::{Path, State};

use internhub_core::handlers::users::{
    self, ProfileUpdate, RoleChange, StatusChange, SyncRequest, UserQuery,
};
use internhub_core::handlers::{PageQuery, Paginated};
use internhub_core::models::User;

use crate::auth::{Authenticated, CurrentActor};
use crate::error::{ApiError, ApiResult};
use crate::extract::{ApiJson, ApiQuery};
use crate::state::AppState;

/// `POST /api/users/sync`. The body is optional.
pub async fn sync(
    State(state): State<AppState>,
    Authenticated(identity): Authenticated,
    body: Bytes,
) -> ApiResult<User> {
    let request: SyncRequest = if body.iter().all(u8::is_ascii_whitespace) {
        SyncRequest::default()
    } else {
        serde_json::from_slice(&body).map_err(|e| ApiError::BadRequest(e.to_string()))?
    };
    Ok(Json(
        users::sync_user(&state.handlers, &identity, request).await?,
    ))
}

pub async fn me(CurrentActor(actor): CurrentActor) -> ApiResult<User> {
    Ok(Json(users::get_me(&actor)))
}

pub async fn update_profile(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    ApiJson(update): ApiJson<ProfileUpdate>,
) -> ApiResult<User> {
    Ok(Json(
        users::update_profile(&state.handlers, &actor, update).await?,
    ))
}

pub async fn list(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    ApiQuery(query): ApiQuery<UserQuery>,
    ApiQuery(page): ApiQuery<PageQuery>,
) -> ApiResult<Paginated<User>> {
    let page = state.handlers.page(page);
    Ok(Json(
        users::list_users(&state.handlers, &actor, query, page).await?,
    ))
}

pub async fn set_status(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<String>,
    ApiJson(change): ApiJson<StatusChange>,
) -> ApiResult<User> {
    Ok(Json(
        users::set_user_status(&state.handlers, &actor, &id, change).await?,
    ))
}

pub async fn set_role(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<String>,
    ApiJson(change): ApiJson<RoleChange>,
) -> ApiResult<User> {
    Ok(Json(
        users::set_user_role(&state.handlers, &actor, &id, change).await?,
    ))
}
