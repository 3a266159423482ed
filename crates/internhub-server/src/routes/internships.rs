// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Internship routes.

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;

use internhub_core::handlers::internships::{
    self, BrowseQuery, InternshipPatch, InternshipQuery, InternshipReview, NewInternship,
};
use internhub_core::handlers::{PageQuery, Paginated};
use internhub_core::models::Internship;

use crate::auth::{CurrentActor, MaybeActor};
use crate::error::{ApiError, ApiResult};
use crate::extract::{ApiJson, ApiQuery};
use crate::state::AppState;

/// Public search; no token needed.
pub async fn browse(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<BrowseQuery>,
    ApiQuery(page): ApiQuery<PageQuery>,
) -> ApiResult<Paginated<Internship>> {
    let page = state.handlers.page(page);
    Ok(Json(
        internships::browse(&state.handlers, query, page).await?,
    ))
}

pub async fn show(
    State(state): State<AppState>,
    MaybeActor(actor): MaybeActor,
    Path(id): Path<String>,
) -> ApiResult<Internship> {
    Ok(Json(
        internships::get_internship(&state.handlers, actor.as_ref(), &id).await?,
    ))
}

pub async fn create(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    ApiJson(request): ApiJson<NewInternship>,
) -> Result<(StatusCode, Json<Internship>), ApiError> {
    let internship = internships::create_internship(&state.handlers, &actor, request).await?;
    Ok((StatusCode::CREATED, Json(internship)))
}

pub async fn update(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<String>,
    ApiJson(patch): ApiJson<InternshipPatch>,
) -> ApiResult<Internship> {
    Ok(Json(
        internships::update_internship(&state.handlers, &actor, &id, patch).await?,
    ))
}

pub async fn delete(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    internships::delete_internship(&state.handlers, &actor, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn submit(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<String>,
) -> ApiResult<Internship> {
    Ok(Json(
        internships::submit_internship(&state.handlers, &actor, &id).await?,
    ))
}

pub async fn close(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<String>,
) -> ApiResult<Internship> {
    Ok(Json(
        internships::close_internship(&state.handlers, &actor, &id).await?,
    ))
}

pub async fn reopen(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<String>,
) -> ApiResult<Internship> {
    Ok(Json(
        internships::reopen_internship(&state.handlers, &actor, &id).await?,
    ))
}

/// `GET /api/companies/{id}/internships`
pub async fn for_company(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(company_id): Path<String>,
) -> ApiResult<Vec<Internship>> {
    Ok(Json(
        internships::company_internships(&state.handlers, &actor, &company_id).await?,
    ))
}

pub async fn list(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    ApiQuery(query): ApiQuery<InternshipQuery>,
    ApiQuery(page): ApiQuery<PageQuery>,
) -> ApiResult<Paginated<Internship>> {
    let page = state.handlers.page(page);
    Ok(Json(
        internships::list_internships(&state.handlers, &actor, query, page).await?,
    ))
}

pub async fn review(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<String>,
    ApiJson(review): ApiJson<InternshipReview>,
) -> ApiResult<Internship> {
    Ok(Json(
        internships::review_internship(&state.handlers, &actor, &id, review).await?,
    ))
}
