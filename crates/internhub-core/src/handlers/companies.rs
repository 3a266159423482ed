// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Company handlers.

use chrono::Utc;
use serde::Deserialize;
use tracing::{info, instrument};

use crate::error::{CoreError, Result};
use crate::handlers::{HandlerState, Page, Paginated, clean, http_url, present, required};
use crate::ids::{canonical_key, new_key};
use crate::models::{Company, CompanyStatus, NotificationKind, Role};
use crate::permissions::{Actor, owns_company, require_moderator, require_role};
use crate::persistence::CompanyFilter;
use crate::transitions::ensure_transition;

#[derive(Debug, Clone, Deserialize)]
pub struct NewCompany {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub website: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
}

/// Editable company fields. Absent fields are left unchanged; `null`
/// clears an optional one.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CompanyPatch {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "present")]
    pub description: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    pub website: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    pub location: Option<Option<String>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CompanyQuery {
    #[serde(default)]
    pub status: Option<CompanyStatus>,
}

/// A moderation decision.
#[derive(Debug, Clone, Deserialize)]
pub struct CompanyReview {
    pub decision: CompanyStatus,
    #[serde(default)]
    pub note: Option<String>,
}

pub(crate) async fn load_company(state: &HandlerState, id: &str) -> Result<Company> {
    state
        .store
        .get_company(id)
        .await?
        .ok_or_else(|| CoreError::not_found("company", id))
}

async fn load_owned_company(state: &HandlerState, actor: &Actor, id: &str) -> Result<Company> {
    let company = load_company(state, id).await?;
    if !owns_company(actor, &company) {
        return Err(CoreError::Forbidden(
            "only the company owner can do this".to_string(),
        ));
    }
    Ok(company)
}

/// Register the caller's company. One company per owner.
#[instrument(skip(state, actor, request), fields(owner_id = %actor.id()))]
pub async fn create_company(
    state: &HandlerState,
    actor: &Actor,
    request: NewCompany,
) -> Result<Company> {
    actor.ensure_active()?;
    require_role(actor, &[Role::Company])?;

    let name = required("name", &request.name)?;
    let website = http_url("website", request.website)?;

    let _guard = state
        .locks
        .lock(format!("company-owner:{}", canonical_key(actor.id())))
        .await;
    let existing = state
        .store
        .list_companies(&CompanyFilter {
            owner_id: Some(actor.id().to_string()),
            status: None,
        })
        .await?;
    if !existing.is_empty() {
        return Err(CoreError::Conflict(
            "owner already has a company".to_string(),
        ));
    }

    let now = Utc::now();
    let company = Company {
        id: new_key(),
        owner_id: actor.id().to_string(),
        name,
        description: clean(request.description),
        website,
        location: clean(request.location),
        status: CompanyStatus::Pending,
        review_note: None,
        created_at: now,
        updated_at: now,
    };
    let target = state.store.insert_company(&company).await?;
    info!(company_id = %company.id, ?target, "Company created");
    Ok(company)
}

/// Approved companies are public; owners and moderators see any status.
#[instrument(skip(state, actor))]
pub async fn get_company(state: &HandlerState, actor: Option<&Actor>, id: &str) -> Result<Company> {
    if let Some(actor) = actor {
        actor.ensure_active()?;
    }
    let company = load_company(state, id).await?;
    let visible = company.status == CompanyStatus::Approved
        || actor.is_some_and(|a| a.is_moderator() || owns_company(a, &company));
    if !visible {
        return Err(CoreError::not_found("company", id));
    }
    Ok(company)
}

pub async fn my_companies(state: &HandlerState, actor: &Actor) -> Result<Vec<Company>> {
    actor.ensure_active()?;
    state
        .store
        .list_companies(&CompanyFilter {
            owner_id: Some(actor.id().to_string()),
            status: None,
        })
        .await
}

#[instrument(skip(state, actor, patch))]
pub async fn update_company(
    state: &HandlerState,
    actor: &Actor,
    id: &str,
    patch: CompanyPatch,
) -> Result<Company> {
    actor.ensure_active()?;
    let mut company = load_owned_company(state, actor, id).await?;

    if let Some(name) = patch.name {
        company.name = required("name", &name)?;
    }
    if let Some(description) = patch.description {
        company.description = clean(description);
    }
    if let Some(website) = patch.website {
        company.website = http_url("website", website)?;
    }
    if let Some(location) = patch.location {
        company.location = clean(location);
    }
    company.updated_at = Utc::now();

    state.store.update_company(&company).await?;
    Ok(company)
}

/// Send a rejected company back for review.
#[instrument(skip(state, actor))]
pub async fn resubmit_company(state: &HandlerState, actor: &Actor, id: &str) -> Result<Company> {
    actor.ensure_active()?;
    let mut company = load_owned_company(state, actor, id).await?;
    ensure_transition(company.status, CompanyStatus::Pending)?;

    company.status = CompanyStatus::Pending;
    company.updated_at = Utc::now();
    state.store.update_company(&company).await?;
    info!(company_id = %company.id, "Company resubmitted");
    Ok(company)
}

#[instrument(skip(state, actor, query))]
pub async fn list_companies(
    state: &HandlerState,
    actor: &Actor,
    query: CompanyQuery,
    page: Page,
) -> Result<Paginated<Company>> {
    actor.ensure_active()?;
    require_moderator(actor)?;
    let companies = state
        .store
        .list_companies(&CompanyFilter {
            owner_id: None,
            status: query.status,
        })
        .await?;
    Ok(page.apply(companies))
}

/// Approve, reject, suspend or reinstate a company.
#[instrument(skip(state, actor, review), fields(decision = %review.decision))]
pub async fn review_company(
    state: &HandlerState,
    actor: &Actor,
    id: &str,
    review: CompanyReview,
) -> Result<Company> {
    actor.ensure_active()?;
    require_moderator(actor)?;

    if review.decision == CompanyStatus::Pending {
        return Err(CoreError::validation(
            "decision",
            "must be APPROVED, REJECTED or SUSPENDED",
        ));
    }

    let mut company = load_company(state, id).await?;
    ensure_transition(company.status, review.decision)?;

    company.status = review.decision;
    company.review_note = clean(review.note);
    company.updated_at = Utc::now();
    state.store.update_company(&company).await?;
    info!(company_id = %company.id, status = %company.status, "Company reviewed");

    let message = match &company.review_note {
        Some(note) => format!("{} is now {}: {}", company.name, company.status, note),
        None => format!("{} is now {}.", company.name, company.status),
    };
    state
        .notifier
        .notify(
            &company.owner_id,
            NotificationKind::CompanyReviewed,
            "Company reviewed",
            message,
            Some(format!("/companies/{}", company.id)),
        )
        .await;

    Ok(company)
}
