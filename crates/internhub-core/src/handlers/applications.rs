// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Application handlers.
//!
//! Students apply and withdraw; the internship's company owner (or a
//! moderator) moves applications through review.

use chrono::Utc;
use serde::Deserialize;
use tracing::{info, instrument};

use crate::error::{CoreError, Result};
use crate::handlers::companies::load_company;
use crate::handlers::internships::load_internship;
use crate::handlers::{HandlerState, clean, http_url};
use crate::ids::{canonical_key, new_key};
use crate::models::{Application, ApplicationStatus, Internship, NotificationKind, Role};
use crate::permissions::{Actor, owns_application, owns_internship, require_role};
use crate::persistence::ApplicationFilter;
use crate::transitions::{ApplicationParty, application_party, ensure_transition};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewApplication {
    #[serde(default)]
    pub cover_letter: Option<String>,
    #[serde(default)]
    pub resume_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApplicationStatusChange {
    pub status: ApplicationStatus,
}

async fn load_application(state: &HandlerState, id: &str) -> Result<Application> {
    state
        .store
        .get_application(id)
        .await?
        .ok_or_else(|| CoreError::not_found("application", id))
}

/// Whether the caller reviews applications for this internship.
async fn is_reviewer(state: &HandlerState, actor: &Actor, internship: &Internship) -> Result<bool> {
    Ok(actor.is_moderator() || owns_internship(&state.store, actor, internship).await?)
}

async fn notify_owner(state: &HandlerState, internship: &Internship, application: &Application) {
    let Ok(company) = load_company(state, &internship.company_id).await else {
        return;
    };
    state
        .notifier
        .notify(
            &company.owner_id,
            NotificationKind::ApplicationReceived,
            "New application",
            format!("A student applied to {}.", internship.title),
            Some(format!("/applications/{}", application.id)),
        )
        .await;
}

/// Apply to an open internship.
///
/// One live application per student and internship; a withdrawn one does
/// not block reapplying.
#[instrument(skip(state, actor, request), fields(student_id = %actor.id()))]
pub async fn apply(
    state: &HandlerState,
    actor: &Actor,
    internship_id: &str,
    request: NewApplication,
) -> Result<Application> {
    actor.ensure_active()?;
    require_role(actor, &[Role::Student])?;

    let internship = load_internship(state, internship_id).await?;
    if !internship.accepts_applications(Utc::now()) {
        return Err(CoreError::validation(
            "internship",
            "internship is not accepting applications",
        ));
    }
    let resume_url = http_url("resumeUrl", request.resume_url)?;

    let _guard = state
        .locks
        .lock(format!(
            "application:{}:{}",
            canonical_key(&internship.id),
            canonical_key(actor.id())
        ))
        .await;
    let existing = state
        .store
        .list_applications(&ApplicationFilter {
            internship_id: Some(internship.id.clone()),
            student_id: Some(actor.id().to_string()),
            status: None,
        })
        .await?;
    if existing
        .iter()
        .any(|a| a.status != ApplicationStatus::Withdrawn)
    {
        return Err(CoreError::Conflict(
            "already applied to this internship".to_string(),
        ));
    }

    let now = Utc::now();
    let application = Application {
        id: new_key(),
        internship_id: internship.id.clone(),
        student_id: actor.id().to_string(),
        cover_letter: clean(request.cover_letter),
        resume_url,
        status: ApplicationStatus::Pending,
        created_at: now,
        updated_at: now,
    };
    let target = state.store.insert_application(&application).await?;
    info!(application_id = %application.id, internship_id = %internship.id, ?target, "Application submitted");

    notify_owner(state, &internship, &application).await;
    Ok(application)
}

/// The caller's applications, newest first.
pub async fn my_applications(state: &HandlerState, actor: &Actor) -> Result<Vec<Application>> {
    actor.ensure_active()?;
    require_role(actor, &[Role::Student])?;
    let mut applications = state
        .store
        .list_applications(&ApplicationFilter {
            internship_id: None,
            student_id: Some(actor.id().to_string()),
            status: None,
        })
        .await?;
    applications.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    Ok(applications)
}

#[instrument(skip(state, actor))]
pub async fn internship_applications(
    state: &HandlerState,
    actor: &Actor,
    internship_id: &str,
) -> Result<Vec<Application>> {
    actor.ensure_active()?;
    let internship = load_internship(state, internship_id).await?;
    if !is_reviewer(state, actor, &internship).await? {
        return Err(CoreError::Forbidden(
            "only the company owner or a moderator can list applications".to_string(),
        ));
    }
    let mut applications = state
        .store
        .list_applications(&ApplicationFilter {
            internship_id: Some(internship.id),
            student_id: None,
            status: None,
        })
        .await?;
    applications.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    Ok(applications)
}

/// Visible to the applicant, the internship owner and moderators.
#[instrument(skip(state, actor))]
pub async fn get_application(
    state: &HandlerState,
    actor: &Actor,
    id: &str,
) -> Result<Application> {
    actor.ensure_active()?;
    let application = load_application(state, id).await?;
    if owns_application(actor, &application) || actor.is_moderator() {
        return Ok(application);
    }
    let internship = load_internship(state, &application.internship_id).await?;
    if owns_internship(&state.store, actor, &internship).await? {
        return Ok(application);
    }
    Err(CoreError::Forbidden(
        "not allowed to view this application".to_string(),
    ))
}

/// Move an application through review. Withdrawal goes through
/// [`withdraw_application`].
#[instrument(skip(state, actor, change), fields(status = %change.status))]
pub async fn update_application_status(
    state: &HandlerState,
    actor: &Actor,
    id: &str,
    change: ApplicationStatusChange,
) -> Result<Application> {
    actor.ensure_active()?;
    if application_party(change.status) != ApplicationParty::Reviewer {
        return Err(CoreError::Forbidden(
            "only the applicant can withdraw".to_string(),
        ));
    }

    let mut application = load_application(state, id).await?;
    let internship = load_internship(state, &application.internship_id).await?;
    if !is_reviewer(state, actor, &internship).await? {
        return Err(CoreError::Forbidden(
            "only the company owner or a moderator can review applications".to_string(),
        ));
    }
    ensure_transition(application.status, change.status)?;

    application.status = change.status;
    application.updated_at = Utc::now();
    state.store.update_application(&application).await?;
    info!(application_id = %application.id, status = %application.status, "Application status changed");

    state
        .notifier
        .notify(
            &application.student_id,
            NotificationKind::ApplicationStatusChanged,
            "Application updated",
            format!(
                "Your application to {} is now {}.",
                internship.title, application.status
            ),
            Some(format!("/applications/{}", application.id)),
        )
        .await;

    Ok(application)
}

#[instrument(skip(state, actor))]
pub async fn withdraw_application(
    state: &HandlerState,
    actor: &Actor,
    id: &str,
) -> Result<Application> {
    actor.ensure_active()?;
    let mut application = load_application(state, id).await?;
    if !owns_application(actor, &application) {
        return Err(CoreError::Forbidden(
            "only the applicant can withdraw".to_string(),
        ));
    }
    ensure_transition(application.status, ApplicationStatus::Withdrawn)?;

    application.status = ApplicationStatus::Withdrawn;
    application.updated_at = Utc::now();
    state.store.update_application(&application).await?;
    info!(application_id = %application.id, "Application withdrawn");
    Ok(application)
}
