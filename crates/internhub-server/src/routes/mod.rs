// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Route table.
//!
//! Routes decode the request, resolve the caller and delegate to
//! `internhub_core::handlers`. No business rule lives here.

pub mod admin;
pub mod applications;
pub mod companies;
pub mod internships;
pub mod notifications;
pub mod users;

use axum::Router;
use axum::routing::{get, patch, post};

use crate::state::AppState;

/// Every route, unlayered.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/health", get(admin::health))
        .nest("/api", api())
}

fn api() -> Router<AppState> {
    Router::new()
        // Users
        .route("/users/sync", post(users::sync))
        .route("/me", get(users::me).patch(users::update_profile))
        // Internships
        .route(
            "/internships",
            get(internships::browse).post(internships::create),
        )
        .route(
            "/internships/{id}",
            get(internships::show)
                .patch(internships::update)
                .delete(internships::delete),
        )
        .route("/internships/{id}/submit", post(internships::submit))
        .route("/internships/{id}/close", post(internships::close))
        .route("/internships/{id}/reopen", post(internships::reopen))
        .route(
            "/internships/{id}/applications",
            get(applications::for_internship).post(applications::apply),
        )
        // Applications
        .route("/applications", get(applications::mine))
        .route("/applications/{id}", get(applications::show))
        .route("/applications/{id}/status", patch(applications::update_status))
        .route("/applications/{id}/withdraw", post(applications::withdraw))
        // Companies
        .route("/companies", post(companies::create))
        .route("/companies/mine", get(companies::mine))
        .route(
            "/companies/{id}",
            get(companies::show).patch(companies::update),
        )
        .route("/companies/{id}/resubmit", post(companies::resubmit))
        .route("/companies/{id}/internships", get(internships::for_company))
        // Notifications
        .route("/notifications", get(notifications::list))
        .route("/notifications/unread-count", get(notifications::unread_count))
        .route("/notifications/read-all", post(notifications::mark_all_read))
        .route("/notifications/{id}/read", post(notifications::mark_read))
        // Moderation
        .route("/admin/stats", get(admin::stats))
        .route("/admin/users", get(users::list))
        .route("/admin/users/{id}/status", post(users::set_status))
        .route("/admin/users/{id}/role", post(users::set_role))
        .route("/admin/companies", get(companies::list))
        .route("/admin/companies/{id}/review", post(companies::review))
        .route("/admin/internships", get(internships::list))
        .route("/admin/internships/{id}/review", post(internships::review))
}
