// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Application routes.

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;

use internhub_core::handlers::applications::{self, ApplicationStatusChange, NewApplication};
use internhub_core::models::Application;

use crate::auth::CurrentActor;
use crate::error::{ApiError, ApiResult};
use crate::extract::ApiJson;
use crate::state::AppState;

/// `POST /api/internships/{id}/applications`
pub async fn apply(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(internship_id): Path<String>,
    ApiJson(request): ApiJson<NewApplication>,
) -> Result<(StatusCode, Json<Application>), ApiError> {
    let application =
        applications::apply(&state.handlers, &actor, &internship_id, request).await?;
    Ok((StatusCode::CREATED, Json(application)))
}

/// `GET /api/internships/{id}/applications`
pub async fn for_internship(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(internship_id): Path<String>,
) -> ApiResult<Vec<Application>> {
    Ok(Json(
        applications::internship_applications(&state.handlers, &actor, &internship_id).await?,
    ))
}

pub async fn mine(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
) -> ApiResult<Vec<Application>> {
    Ok(Json(
        applications::my_applications(&state.handlers, &actor).await?,
    ))
}

pub async fn show(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<String>,
) -> ApiResult<Application> {
    Ok(Json(
        applications::get_application(&state.handlers, &actor, &id).await?,
    ))
}

pub async fn update_status(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<String>,
    ApiJson(change): ApiJson<ApplicationStatusChange>,
) -> ApiResult<Application> {
    Ok(Json(
        applications::update_application_status(&state.handlers, &actor, &id, change).await?,
    ))
}

pub async fn withdraw(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<String>,
) -> ApiResult<Application> {
    Ok(Json(
        applications::withdraw_application(&state.handlers, &actor, &id).await?,
    ))
}
