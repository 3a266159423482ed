// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Internship handlers: public browsing, owner lifecycle, moderation.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::{info, instrument};

use crate::error::{CoreError, Result};
use crate::handlers::companies::load_company;
use crate::handlers::{HandlerState, Page, Paginated, clean, present, required};
use crate::ids::{canonical_key, new_key};
use crate::models::{
    ApplicationStatus, CompanyStatus, Internship, InternshipStatus, NotificationKind,
};
use crate::permissions::{Actor, owns_company, owns_internship, require_moderator};
use crate::persistence::{ApplicationFilter, CompanyFilter, InternshipFilter};
use crate::transitions::ensure_transition;

/// Public search filters.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BrowseQuery {
    /// Free text matched against title and description, ignoring case.
    #[serde(default)]
    pub q: Option<String>,
    /// Substring of the location, ignoring case.
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub remote: Option<bool>,
    /// Required skill, ignoring case.
    #[serde(default)]
    pub skill: Option<String>,
    #[serde(default)]
    pub company_id: Option<String>,
}

impl BrowseQuery {
    fn matches(&self, internship: &Internship) -> bool {
        if let Some(q) = self.q.as_deref().map(str::to_lowercase)
            && !internship.title.to_lowercase().contains(&q)
            && !internship.description.to_lowercase().contains(&q)
        {
            return false;
        }
        if let Some(location) = self.location.as_deref().map(str::to_lowercase)
            && !internship
                .location
                .as_deref()
                .is_some_and(|l| l.to_lowercase().contains(&location))
        {
            return false;
        }
        if let Some(remote) = self.remote
            && internship.remote != remote
        {
            return false;
        }
        if let Some(skill) = self.skill.as_deref()
            && !internship
                .skills
                .iter()
                .any(|s| s.eq_ignore_ascii_case(skill.trim()))
        {
            return false;
        }
        true
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewInternship {
    pub company_id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub remote: bool,
    #[serde(default)]
    pub stipend: Option<i64>,
    #[serde(default)]
    pub duration_weeks: Option<i32>,
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default)]
    pub deadline: Option<DateTime<Utc>>,
}

/// Editable internship fields. Absent fields are left unchanged; `null`
/// clears an optional one.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InternshipPatch {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "present")]
    pub location: Option<Option<String>>,
    #[serde(default)]
    pub remote: Option<bool>,
    #[serde(default, deserialize_with = "present")]
    pub stipend: Option<Option<i64>>,
    #[serde(default, deserialize_with = "present")]
    pub duration_weeks: Option<Option<i32>>,
    #[serde(default)]
    pub skills: Option<Vec<String>>,
    #[serde(default, deserialize_with = "present")]
    pub deadline: Option<Option<DateTime<Utc>>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct InternshipQuery {
    #[serde(default)]
    pub status: Option<InternshipStatus>,
}

/// A moderation decision.
#[derive(Debug, Clone, Deserialize)]
pub struct InternshipReview {
    pub decision: InternshipStatus,
    #[serde(default)]
    pub note: Option<String>,
}

fn validate_terms(
    stipend: Option<i64>,
    duration_weeks: Option<i32>,
    deadline: Option<DateTime<Utc>>,
) -> Result<()> {
    if stipend.is_some_and(|s| s < 0) {
        return Err(CoreError::validation("stipend", "must not be negative"));
    }
    if duration_weeks.is_some_and(|d| d <= 0) {
        return Err(CoreError::validation("durationWeeks", "must be positive"));
    }
    if deadline.is_some_and(|d| d < Utc::now()) {
        return Err(CoreError::validation("deadline", "must be in the future"));
    }
    Ok(())
}

fn clean_skills(skills: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    skills
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty() && seen.insert(s.to_lowercase()))
        .collect()
}

pub(crate) async fn load_internship(state: &HandlerState, id: &str) -> Result<Internship> {
    state
        .store
        .get_internship(id)
        .await?
        .ok_or_else(|| CoreError::not_found("internship", id))
}

async fn load_owned_internship(
    state: &HandlerState,
    actor: &Actor,
    id: &str,
) -> Result<Internship> {
    let internship = load_internship(state, id).await?;
    if !owns_internship(&state.store, actor, &internship).await? {
        return Err(CoreError::Forbidden(
            "only the company owner can do this".to_string(),
        ));
    }
    Ok(internship)
}

/// Whether the caller may see an internship in any status.
async fn can_view_any(state: &HandlerState, actor: &Actor, internship: &Internship) -> Result<bool> {
    Ok(actor.is_moderator() || owns_internship(&state.store, actor, internship).await?)
}

fn newest_first(internships: &mut [Internship]) {
    internships.sort_by(|a, b| b.created_at.cmp(&a.created_at));
}

/// Open internships of approved companies, newest first.
#[instrument(skip(state, query))]
pub async fn browse(
    state: &HandlerState,
    query: BrowseQuery,
    page: Page,
) -> Result<Paginated<Internship>> {
    let approved: HashSet<String> = state
        .store
        .list_companies(&CompanyFilter {
            owner_id: None,
            status: Some(CompanyStatus::Approved),
        })
        .await?
        .into_iter()
        .map(|company| canonical_key(&company.id))
        .collect();

    let mut internships: Vec<Internship> = state
        .store
        .list_internships(&InternshipFilter {
            company_id: query.company_id.clone(),
            status: Some(InternshipStatus::Open),
        })
        .await?
        .into_iter()
        .filter(|i| approved.contains(&canonical_key(&i.company_id)) && query.matches(i))
        .collect();

    newest_first(&mut internships);
    Ok(page.apply(internships))
}

/// Open internships are public; owners and moderators see any status.
#[instrument(skip(state, actor))]
pub async fn get_internship(
    state: &HandlerState,
    actor: Option<&Actor>,
    id: &str,
) -> Result<Internship> {
    let internship = load_internship(state, id).await?;
    if internship.status == InternshipStatus::Open {
        return Ok(internship);
    }
    if let Some(actor) = actor
        && actor.ensure_active().is_ok()
        && can_view_any(state, actor, &internship).await?
    {
        return Ok(internship);
    }
    Err(CoreError::not_found("internship", id))
}

/// Draft a new internship for one of the caller's companies.
#[instrument(skip(state, actor, request), fields(company_id = %request.company_id))]
pub async fn create_internship(
    state: &HandlerState,
    actor: &Actor,
    request: NewInternship,
) -> Result<Internship> {
    actor.ensure_active()?;
    let company = load_company(state, &request.company_id).await?;
    if !owns_company(actor, &company) {
        return Err(CoreError::Forbidden(
            "only the company owner can post internships".to_string(),
        ));
    }

    let title = required("title", &request.title)?;
    validate_terms(request.stipend, request.duration_weeks, request.deadline)?;

    let now = Utc::now();
    let internship = Internship {
        id: new_key(),
        company_id: company.id,
        title,
        description: request.description.trim().to_string(),
        location: clean(request.location),
        remote: request.remote,
        stipend: request.stipend,
        duration_weeks: request.duration_weeks,
        skills: clean_skills(request.skills),
        deadline: request.deadline,
        status: InternshipStatus::Draft,
        review_note: None,
        created_at: now,
        updated_at: now,
    };
    let target = state.store.insert_internship(&internship).await?;
    info!(internship_id = %internship.id, ?target, "Internship drafted");
    Ok(internship)
}

/// Edit an internship that is not live or under review. Editing a rejected
/// internship returns it to draft.
#[instrument(skip(state, actor, patch))]
pub async fn update_internship(
    state: &HandlerState,
    actor: &Actor,
    id: &str,
    patch: InternshipPatch,
) -> Result<Internship> {
    actor.ensure_active()?;
    let mut internship = load_owned_internship(state, actor, id).await?;

    if !matches!(
        internship.status,
        InternshipStatus::Draft | InternshipStatus::Rejected | InternshipStatus::Closed
    ) {
        return Err(CoreError::validation(
            "status",
            format!("cannot edit an internship in status {}", internship.status),
        ));
    }

    validate_terms(
        patch.stipend.flatten(),
        patch.duration_weeks.flatten(),
        patch.deadline.flatten(),
    )?;
    if let Some(title) = patch.title {
        internship.title = required("title", &title)?;
    }
    if let Some(description) = patch.description {
        internship.description = description.trim().to_string();
    }
    if let Some(location) = patch.location {
        internship.location = clean(location);
    }
    if let Some(remote) = patch.remote {
        internship.remote = remote;
    }
    if let Some(stipend) = patch.stipend {
        internship.stipend = stipend;
    }
    if let Some(duration_weeks) = patch.duration_weeks {
        internship.duration_weeks = duration_weeks;
    }
    if let Some(skills) = patch.skills {
        internship.skills = clean_skills(skills);
    }
    if let Some(deadline) = patch.deadline {
        internship.deadline = deadline;
    }
    if internship.status == InternshipStatus::Rejected {
        internship.status = InternshipStatus::Draft;
        internship.review_note = None;
    }
    internship.updated_at = Utc::now();

    state.store.update_internship(&internship).await?;
    Ok(internship)
}

async fn owner_transition(
    state: &HandlerState,
    mut internship: Internship,
    to: InternshipStatus,
) -> Result<Internship> {
    ensure_transition(internship.status, to)?;

    internship.status = to;
    internship.updated_at = Utc::now();
    state.store.update_internship(&internship).await?;
    info!(internship_id = %internship.id, status = %to, "Internship status changed");
    Ok(internship)
}

/// Send a draft for moderation. The company must be approved.
#[instrument(skip(state, actor))]
pub async fn submit_internship(state: &HandlerState, actor: &Actor, id: &str) -> Result<Internship> {
    actor.ensure_active()?;
    let internship = load_owned_internship(state, actor, id).await?;
    let company = load_company(state, &internship.company_id).await?;
    if company.status != CompanyStatus::Approved {
        return Err(CoreError::validation(
            "company",
            "company must be approved before submitting internships",
        ));
    }
    owner_transition(state, internship, InternshipStatus::PendingReview).await
}

#[instrument(skip(state, actor))]
pub async fn close_internship(state: &HandlerState, actor: &Actor, id: &str) -> Result<Internship> {
    actor.ensure_active()?;
    let internship = load_owned_internship(state, actor, id).await?;
    owner_transition(state, internship, InternshipStatus::Closed).await
}

/// Reopen a closed internship whose deadline has not passed.
#[instrument(skip(state, actor))]
pub async fn reopen_internship(state: &HandlerState, actor: &Actor, id: &str) -> Result<Internship> {
    actor.ensure_active()?;
    let internship = load_owned_internship(state, actor, id).await?;
    if internship.deadline_passed(Utc::now()) {
        return Err(CoreError::validation(
            "deadline",
            "cannot reopen after the deadline",
        ));
    }
    owner_transition(state, internship, InternshipStatus::Open).await
}

/// Delete an internship from both stores. Refused once an application has
/// been accepted.
#[instrument(skip(state, actor))]
pub async fn delete_internship(state: &HandlerState, actor: &Actor, id: &str) -> Result<()> {
    actor.ensure_active()?;
    let internship = load_internship(state, id).await?;
    if !can_view_any(state, actor, &internship).await? {
        return Err(CoreError::Forbidden(
            "only the company owner or a moderator can delete".to_string(),
        ));
    }

    let accepted = state
        .store
        .list_applications(&ApplicationFilter {
            internship_id: Some(internship.id.clone()),
            student_id: None,
            status: Some(ApplicationStatus::Accepted),
        })
        .await?;
    if !accepted.is_empty() {
        return Err(CoreError::Conflict(
            "internship has accepted applications".to_string(),
        ));
    }

    if !state.store.delete_internship(&internship.id).await? {
        return Err(CoreError::not_found("internship", id));
    }
    info!(internship_id = %internship.id, "Internship deleted");
    Ok(())
}

/// Every internship of a company, in any status.
#[instrument(skip(state, actor))]
pub async fn company_internships(
    state: &HandlerState,
    actor: &Actor,
    company_id: &str,
) -> Result<Vec<Internship>> {
    actor.ensure_active()?;
    let company = load_company(state, company_id).await?;
    if !actor.is_moderator() && !owns_company(actor, &company) {
        return Err(CoreError::Forbidden(
            "only the company owner or a moderator can list these".to_string(),
        ));
    }

    let mut internships = state
        .store
        .list_internships(&InternshipFilter {
            company_id: Some(company.id),
            status: None,
        })
        .await?;
    newest_first(&mut internships);
    Ok(internships)
}

#[instrument(skip(state, actor, query))]
pub async fn list_internships(
    state: &HandlerState,
    actor: &Actor,
    query: InternshipQuery,
    page: Page,
) -> Result<Paginated<Internship>> {
    actor.ensure_active()?;
    require_moderator(actor)?;
    let mut internships = state
        .store
        .list_internships(&InternshipFilter {
            company_id: None,
            status: query.status,
        })
        .await?;
    newest_first(&mut internships);
    Ok(page.apply(internships))
}

/// Publish or reject an internship under review.
#[instrument(skip(state, actor, review), fields(decision = %review.decision))]
pub async fn review_internship(
    state: &HandlerState,
    actor: &Actor,
    id: &str,
    review: InternshipReview,
) -> Result<Internship> {
    actor.ensure_active()?;
    require_moderator(actor)?;
    if !matches!(review.decision, InternshipStatus::Open | InternshipStatus::Rejected) {
        return Err(CoreError::validation("decision", "must be OPEN or REJECTED"));
    }

    let mut internship = load_internship(state, id).await?;
    ensure_transition(internship.status, review.decision)?;

    internship.status = review.decision;
    internship.review_note = clean(review.note);
    internship.updated_at = Utc::now();
    state.store.update_internship(&internship).await?;
    info!(internship_id = %internship.id, status = %internship.status, "Internship reviewed");

    if let Ok(company) = load_company(state, &internship.company_id).await {
        let message = match &internship.review_note {
            Some(note) => format!("{} is now {}: {}", internship.title, internship.status, note),
            None => format!("{} is now {}.", internship.title, internship.status),
        };
        state
            .notifier
            .notify(
                &company.owner_id,
                NotificationKind::InternshipReviewed,
                "Internship reviewed",
                message,
                Some(format!("/internships/{}", internship.id)),
            )
            .await;
    }

    Ok(internship)
}
