// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Platform statistics and health.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator;
use tracing::{debug, instrument};

use crate::error::Result;
use crate::handlers::HandlerState;
use crate::models::{ApplicationStatus, CompanyStatus, InternshipStatus, Role};
use crate::permissions::{Actor, require_moderator};
use crate::persistence::{ApplicationFilter, CompanyFilter, InternshipFilter, UserFilter};

/// Record counts over the merged record set of both stores.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlatformStats {
    pub total_users: usize,
    pub users_by_role: BTreeMap<String, usize>,
    pub companies_by_status: BTreeMap<String, usize>,
    pub internships_by_status: BTreeMap<String, usize>,
    pub applications_by_status: BTreeMap<String, usize>,
}

/// Count values by their string form, listing every variant even when zero.
fn tally<E, I>(values: I) -> BTreeMap<String, usize>
where
    E: IntoEnumIterator + AsRef<str>,
    I: IntoIterator<Item = E>,
{
    let mut counts: BTreeMap<String, usize> =
        E::iter().map(|variant| (variant.as_ref().to_string(), 0)).collect();
    for value in values {
        *counts.entry(value.as_ref().to_string()).or_default() += 1;
    }
    counts
}

#[instrument(skip(state, actor))]
pub async fn platform_stats(state: &HandlerState, actor: &Actor) -> Result<PlatformStats> {
    actor.ensure_active()?;
    require_moderator(actor)?;

    let users = state.store.list_users(&UserFilter::default()).await?;
    let companies = state.store.list_companies(&CompanyFilter::default()).await?;
    let internships = state
        .store
        .list_internships(&InternshipFilter::default())
        .await?;
    let applications = state
        .store
        .list_applications(&ApplicationFilter::default())
        .await?;

    Ok(PlatformStats {
        total_users: users.len(),
        users_by_role: tally::<Role, _>(users.iter().map(|u| u.role)),
        companies_by_status: tally::<CompanyStatus, _>(companies.iter().map(|c| c.status)),
        internships_by_status: tally::<InternshipStatus, _>(internships.iter().map(|i| i.status)),
        applications_by_status: tally::<ApplicationStatus, _>(
            applications.iter().map(|a| a.status),
        ),
    })
}

/// Health of the service and each store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthReport {
    /// `ok` with both stores up, `degraded` with one, `unavailable` with none.
    pub status: String,
    pub version: String,
    pub uptime_ms: i64,
    pub primary_store: bool,
    pub document_store: bool,
}

/// Handle health check request.
#[instrument(skip(state))]
pub async fn health(state: &HandlerState) -> HealthReport {
    debug!("Health check requested");
    let (primary_store, document_store) = state.store.health().await;
    let status = match (primary_store, document_store) {
        (true, true) => "ok",
        (false, false) => "unavailable",
        _ => "degraded",
    };
    HealthReport {
        status: status.to_string(),
        version: state.version.clone(),
        uptime_ms: state.uptime_ms(),
        primary_store,
        document_store,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tally_lists_every_variant() {
        let counts = tally::<Role, _>(vec![Role::Student, Role::Student, Role::Admin]);
        assert_eq!(counts["STUDENT"], 2);
        assert_eq!(counts["ADMIN"], 1);
        assert_eq!(counts["COMPANY"], 0);
        assert_eq!(counts["SUPERADMIN"], 0);
    }
}
