// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Health and moderation statistics.

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;

use internhub_core::handlers::admin::{self, HealthReport, PlatformStats};

use crate::auth::CurrentActor;
use crate::error::ApiResult;
use crate::state::AppState;

/// `GET /health`: 200 while at least one store answers, 503 otherwise.
pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<HealthReport>) {
    let report = admin::health(&state.handlers).await;
    let status = if report.primary_store || report.document_store {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(report))
}

pub async fn stats(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
) -> ApiResult<PlatformStats> {
    Ok(Json(admin::platform_stats(&state.handlers, &actor).await?))
}
