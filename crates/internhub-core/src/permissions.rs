// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Caller resolution and permission checks.
//!
//! Ownership is always decided on normalized keys: an owner id stored as a
//! native id in the document store matches the caller's string id.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{CoreError, Result};
use crate::ids::same_key;
use crate::models::{Application, Company, Internship, Role, User, UserStatus};
use crate::reconcile::DualStore;

/// Claims of a verified identity-provider token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// Stable subject id; doubles as the user key.
    pub subject: String,
    pub email: String,
    #[serde(default)]
    pub name: Option<String>,
}

/// The authenticated caller, resolved to a user record.
#[derive(Debug, Clone)]
pub struct Actor {
    pub user: User,
}

impl Actor {
    pub fn new(user: User) -> Self {
        Self { user }
    }

    /// The caller's user key.
    pub fn id(&self) -> &str {
        &self.user.id
    }

    pub fn role(&self) -> Role {
        self.user.role
    }

    pub fn is_moderator(&self) -> bool {
        self.user.role.is_moderator()
    }

    /// Whether `key` refers to the caller.
    pub fn is(&self, key: &str) -> bool {
        same_key(&self.user.id, key)
    }

    /// Reject suspended accounts.
    pub fn ensure_active(&self) -> Result<()> {
        if self.user.status == UserStatus::Suspended {
            return Err(CoreError::Forbidden("account is suspended".to_string()));
        }
        Ok(())
    }
}

/// Resolve an identity to its user: by subject first, then by email, each
/// through both stores.
pub async fn resolve_actor(store: &DualStore, identity: &Identity) -> Result<Actor> {
    if let Some(user) = store.get_user(&identity.subject).await? {
        return Ok(Actor::new(user));
    }
    if !identity.email.is_empty()
        && let Some(user) = store.get_user_by_email(&identity.email).await?
    {
        debug!(subject = %identity.subject, user_id = %user.id, "Resolved caller by email");
        return Ok(Actor::new(user));
    }
    Err(CoreError::Unregistered {
        subject: identity.subject.clone(),
    })
}

/// Require one of the given roles.
pub fn require_role(actor: &Actor, roles: &[Role]) -> Result<()> {
    if roles.contains(&actor.role()) {
        Ok(())
    } else {
        Err(CoreError::Forbidden(format!(
            "role {} may not perform this operation",
            actor.role()
        )))
    }
}

pub fn require_moderator(actor: &Actor) -> Result<()> {
    require_role(actor, &[Role::Admin, Role::Superadmin])
}

pub fn require_superadmin(actor: &Actor) -> Result<()> {
    require_role(actor, &[Role::Superadmin])
}

pub fn owns_company(actor: &Actor, company: &Company) -> bool {
    actor.is(&company.owner_id)
}

/// Whether the caller owns the company that posted the internship.
///
/// A company missing from both stores owns nothing.
pub async fn owns_internship(
    store: &DualStore,
    actor: &Actor,
    internship: &Internship,
) -> Result<bool> {
    Ok(store
        .get_company(&internship.company_id)
        .await?
        .is_some_and(|company| owns_company(actor, &company)))
}

/// Whether the caller is the applicant.
pub fn owns_application(actor: &Actor, application: &Application) -> bool {
    actor.is(&application.student_id)
}

/// Whether the caller may change another user's status or role.
///
/// Nobody manages themselves; only superadmins manage moderators.
pub fn can_manage_user(actor: &Actor, target: &User) -> Result<()> {
    require_moderator(actor)?;
    if actor.is(&target.id) {
        return Err(CoreError::Forbidden(
            "cannot change your own account".to_string(),
        ));
    }
    if target.role.is_moderator() && actor.role() != Role::Superadmin {
        return Err(CoreError::Forbidden(
            "only superadmins can manage admins".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::{DocumentStore, MemoryDocumentStore, SqlitePrimaryStore};
    use crate::reconcile::ReconcileMode;
    use chrono::Utc;
    use serde_json::json;
    use std::sync::Arc;

    fn user(id: &str, role: Role) -> User {
        let now = Utc::now();
        User {
            id: id.to_string(),
            email: format!("{id}@example.com"),
            name: id.to_string(),
            role,
            status: UserStatus::Active,
            headline: None,
            university: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn company(owner_id: &str) -> Company {
        let now = Utc::now();
        Company {
            id: "c-1".to_string(),
            owner_id: owner_id.to_string(),
            name: "Acme".to_string(),
            description: None,
            website: None,
            location: None,
            status: Default::default(),
            review_note: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_require_role() {
        let student = Actor::new(user("s", Role::Student));
        assert!(require_role(&student, &[Role::Student]).is_ok());
        assert!(require_moderator(&student).is_err());

        let admin = Actor::new(user("a", Role::Admin));
        assert!(require_moderator(&admin).is_ok());
        assert!(require_superadmin(&admin).is_err());
    }

    #[test]
    fn test_suspended_actor_is_rejected() {
        let mut u = user("s", Role::Student);
        u.status = UserStatus::Suspended;
        let err = Actor::new(u).ensure_active().unwrap_err();
        assert!(matches!(err, CoreError::Forbidden(_)));
    }

    #[test]
    fn test_ownership_uses_normalized_keys() {
        let actor = Actor::new(user("65f1a2b3c4d5e6f708091011", Role::Company));
        assert!(owns_company(&actor, &company("65F1A2B3C4D5E6F708091011")));
        assert!(!owns_company(&actor, &company("65f1a2b3c4d5e6f708091012")));
    }

    #[test]
    fn test_can_manage_user() {
        let admin = Actor::new(user("a", Role::Admin));
        let superadmin = Actor::new(user("root", Role::Superadmin));
        let other_admin = user("b", Role::Admin);
        let student = user("s", Role::Student);

        assert!(can_manage_user(&admin, &student).is_ok());
        assert!(can_manage_user(&admin, &other_admin).is_err());
        assert!(can_manage_user(&superadmin, &other_admin).is_ok());
        assert!(can_manage_user(&admin, &admin.user).is_err());
        assert!(can_manage_user(&Actor::new(student.clone()), &other_admin).is_err());
    }

    #[tokio::test]
    async fn test_resolve_actor_by_subject_then_email() {
        let primary = SqlitePrimaryStore::in_memory().await.unwrap();
        let documents = Arc::new(MemoryDocumentStore::new());
        let store = DualStore::new(Arc::new(primary), documents.clone(), ReconcileMode::Merge);

        documents
            .insert(
                "users",
                json!({"_id": "legacy-id", "email": "old@example.com", "name": "Old", "role": "STUDENT"}),
            )
            .await
            .unwrap();

        let identity = Identity {
            subject: "new-subject".into(),
            email: "OLD@example.com".into(),
            name: None,
        };
        let actor = resolve_actor(&store, &identity).await.unwrap();
        assert_eq!(actor.id(), "legacy-id");

        let unknown = Identity {
            subject: "nobody".into(),
            email: "nobody@example.com".into(),
            name: None,
        };
        let err = resolve_actor(&store, &unknown).await.unwrap_err();
        assert!(matches!(err, CoreError::Unregistered { .. }));
    }

    #[tokio::test]
    async fn test_owns_internship_through_document_company() {
        let primary = SqlitePrimaryStore::in_memory().await.unwrap();
        let documents = Arc::new(MemoryDocumentStore::new());
        let store = DualStore::new(Arc::new(primary), documents.clone(), ReconcileMode::Merge);

        let owner = crate::ids::new_key();
        let company_key = documents
            .insert(
                "companies",
                json!({"ownerId": {"$oid": owner}, "name": "Doc Co", "status": "approved"}),
            )
            .await
            .unwrap();

        let internship: Internship = serde_json::from_value(json!({
            "id": "i-1", "companyId": company_key, "title": "T"
        }))
        .unwrap();

        let actor = Actor::new(user(&owner, Role::Company));
        assert!(owns_internship(&store, &actor, &internship).await.unwrap());

        let stranger = Actor::new(user("someone", Role::Company));
        assert!(!owns_internship(&store, &stranger, &internship).await.unwrap());
    }
}
