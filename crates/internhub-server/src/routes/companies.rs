// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Company routes.

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;

use internhub_core::handlers::companies::{
    self, CompanyPatch, CompanyQuery, CompanyReview, NewCompany,
};
use internhub_core::handlers::{PageQuery, Paginated};
use internhub_core::models::Company;

use crate::auth::{CurrentActor, MaybeActor};
use crate::error::{ApiError, ApiResult};
use crate::extract::{ApiJson, ApiQuery};
use crate::state::AppState;

pub async fn create(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    ApiJson(request): ApiJson<NewCompany>,
) -> Result<(StatusCode, Json<Company>), ApiError> {
    let company = companies::create_company(&state.handlers, &actor, request).await?;
    Ok((StatusCode::CREATED, Json(company)))
}

pub async fn mine(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
) -> ApiResult<Vec<Company>> {
    Ok(Json(companies::my_companies(&state.handlers, &actor).await?))
}

pub async fn show(
    State(state): State<AppState>,
    MaybeActor(actor): MaybeActor,
    Path(id): Path<String>,
) -> ApiResult<Company> {
    Ok(Json(
        companies::get_company(&state.handlers, actor.as_ref(), &id).await?,
    ))
}

pub async fn update(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<String>,
    ApiJson(patch): ApiJson<CompanyPatch>,
) -> ApiResult<Company> {
    Ok(Json(
        companies::update_company(&state.handlers, &actor, &id, patch).await?,
    ))
}

pub async fn resubmit(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<String>,
) -> ApiResult<Company> {
    Ok(Json(
        companies::resubmit_company(&state.handlers, &actor, &id).await?,
    ))
}

pub async fn list(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    ApiQuery(query): ApiQuery<CompanyQuery>,
    ApiQuery(page): ApiQuery<PageQuery>,
) -> ApiResult<Paginated<Company>> {
    let page = state.handlers.page(page);
    Ok(Json(
        companies::list_companies(&state.handlers, &actor, query, page).await?,
    ))
}

pub async fn review(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<String>,
    ApiJson(review): ApiJson<CompanyReview>,
) -> ApiResult<Company> {
    Ok(Json(
        companies::review_company(&state.handlers, &actor, &id, review).await?,
    ))
}
