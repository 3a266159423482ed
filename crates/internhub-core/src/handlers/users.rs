// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! User handlers: identity sync, profile, moderation.

use chrono::Utc;
use serde::Deserialize;
use tracing::{info, instrument};

use crate::error::{CoreError, Result};
use crate::handlers::{HandlerState, Page, Paginated, clean, required};
use crate::ids::canonical_key;
use crate::models::{NotificationKind, Role, User, UserStatus};
use crate::permissions::{
    Actor, Identity, can_manage_user, require_moderator, require_superadmin,
};
use crate::persistence::UserFilter;
use crate::transitions::ensure_transition;

/// Body of `POST /api/users/sync`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SyncRequest {
    /// Role requested on first sign-in; only student and company are granted.
    #[serde(default)]
    pub role: Option<Role>,
}

/// Editable profile fields. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfileUpdate {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub headline: Option<String>,
    #[serde(default)]
    pub university: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserQuery {
    #[serde(default)]
    pub role: Option<Role>,
    #[serde(default)]
    pub status: Option<UserStatus>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StatusChange {
    pub status: UserStatus,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RoleChange {
    pub role: Role,
}

fn display_name(identity: &Identity) -> String {
    identity
        .name
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| {
            identity
                .email
                .split('@')
                .next()
                .unwrap_or_default()
                .to_string()
        })
}

/// Create or refresh the caller's user record.
///
/// Existing users (found by subject, then by email) get their email and name
/// refreshed from the identity. New users get the requested role when it is
/// student or company, or superadmin when their email is configured as one.
#[instrument(skip(state, identity, request), fields(subject = %identity.subject))]
pub async fn sync_user(
    state: &HandlerState,
    identity: &Identity,
    request: SyncRequest,
) -> Result<User> {
    let email = identity.email.trim().to_lowercase();
    if email.is_empty() {
        return Err(CoreError::validation("email", "identity has no email"));
    }

    let existing = match state.store.get_user(&identity.subject).await? {
        Some(user) => Some(user),
        None => state.store.get_user_by_email(&email).await?,
    };

    if let Some(mut user) = existing {
        let name = display_name(identity);
        if user.email != email || user.name != name {
            user.email = email;
            user.name = name;
            user.updated_at = Utc::now();
            state.store.update_user(&user).await?;
        }
        return Ok(user);
    }

    let role = if state.config.is_superadmin_email(&email) {
        Role::Superadmin
    } else {
        match request.role.unwrap_or(Role::Student) {
            role @ (Role::Student | Role::Company) => role,
            other => {
                return Err(CoreError::Forbidden(format!(
                    "role {} cannot be self-assigned",
                    other
                )));
            }
        }
    };

    let now = Utc::now();
    let user = User {
        id: canonical_key(&identity.subject),
        email,
        name: display_name(identity),
        role,
        status: UserStatus::Active,
        headline: None,
        university: None,
        created_at: now,
        updated_at: now,
    };
    let target = state.store.insert_user(&user).await?;
    info!(user_id = %user.id, role = %user.role, ?target, "User registered");
    Ok(user)
}

/// The caller's own record. Allowed for suspended users.
pub fn get_me(actor: &Actor) -> User {
    actor.user.clone()
}

#[instrument(skip(state, actor, update), fields(user_id = %actor.id()))]
pub async fn update_profile(
    state: &HandlerState,
    actor: &Actor,
    update: ProfileUpdate,
) -> Result<User> {
    actor.ensure_active()?;

    let mut user = actor.user.clone();
    if let Some(name) = update.name {
        user.name = required("name", &name)?;
    }
    if update.headline.is_some() {
        user.headline = clean(update.headline);
    }
    if update.university.is_some() {
        user.university = clean(update.university);
    }
    user.updated_at = Utc::now();

    state.store.update_user(&user).await?;
    Ok(user)
}

#[instrument(skip(state, actor, query))]
pub async fn list_users(
    state: &HandlerState,
    actor: &Actor,
    query: UserQuery,
    page: Page,
) -> Result<Paginated<User>> {
    actor.ensure_active()?;
    require_moderator(actor)?;

    let users = state
        .store
        .list_users(&UserFilter {
            role: query.role,
            status: query.status,
            email: None,
        })
        .await?;
    Ok(page.apply(users))
}

async fn load_user(state: &HandlerState, user_id: &str) -> Result<User> {
    state
        .store
        .get_user(user_id)
        .await?
        .ok_or_else(|| CoreError::not_found("user", user_id))
}

/// Suspend or reinstate a user.
#[instrument(skip(state, actor), fields(actor_id = %actor.id()))]
pub async fn set_user_status(
    state: &HandlerState,
    actor: &Actor,
    user_id: &str,
    change: StatusChange,
) -> Result<User> {
    actor.ensure_active()?;
    require_moderator(actor)?;

    let mut user = load_user(state, user_id).await?;
    can_manage_user(actor, &user)?;
    ensure_transition(user.status, change.status)?;

    user.status = change.status;
    user.updated_at = Utc::now();
    state.store.update_user(&user).await?;
    info!(user_id = %user.id, status = %user.status, "User status changed");

    let message = match user.status {
        UserStatus::Suspended => "Your account has been suspended.",
        UserStatus::Active => "Your account has been reinstated.",
    };
    state
        .notifier
        .notify(&user.id, NotificationKind::AccountUpdated, "Account status changed", message, None)
        .await;

    Ok(user)
}

/// Change a user's role. Superadmins only.
#[instrument(skip(state, actor), fields(actor_id = %actor.id()))]
pub async fn set_user_role(
    state: &HandlerState,
    actor: &Actor,
    user_id: &str,
    change: RoleChange,
) -> Result<User> {
    actor.ensure_active()?;
    require_superadmin(actor)?;

    let mut user = load_user(state, user_id).await?;
    can_manage_user(actor, &user)?;
    if user.role == change.role {
        return Err(CoreError::validation(
            "role",
            format!("user already has role {}", change.role),
        ));
    }

    user.role = change.role;
    user.updated_at = Utc::now();
    state.store.update_user(&user).await?;
    info!(user_id = %user.id, role = %user.role, "User role changed");

    state
        .notifier
        .notify(
            &user.id,
            NotificationKind::AccountUpdated,
            "Role changed",
            format!("Your role is now {}.", user.role),
            None,
        )
        .await;

    Ok(user)
}
