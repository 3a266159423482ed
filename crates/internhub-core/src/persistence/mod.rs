// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Persistence interfaces and backends for internhub-core.
//!
//! Two stores hold the same logical data:
//!
//! - [`PrimaryStore`]: typed relational tables ([`SqlitePrimaryStore`])
//! - [`DocumentStore`]: schemaless JSON collections ([`SqliteDocumentStore`],
//!   [`MemoryDocumentStore`])
//!
//! Neither is used directly by handlers; [`crate::reconcile::DualStore`]
//! combines them.

pub mod documents;
pub mod memory;
pub mod sqlite;

pub use self::documents::SqliteDocumentStore;
pub use self::memory::MemoryDocumentStore;
pub use self::sqlite::SqlitePrimaryStore;

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::document::Filter;
use crate::error::CoreError;
use crate::models::{
    Application, ApplicationStatus, Company, CompanyStatus, Internship, InternshipStatus,
    Notification, Role, User, UserStatus,
};

/// Document collection names.
pub mod collections {
    pub const USERS: &str = "users";
    pub const COMPANIES: &str = "companies";
    pub const INTERNSHIPS: &str = "internships";
    pub const APPLICATIONS: &str = "applications";
    pub const NOTIFICATIONS: &str = "notifications";
}

/// Filter options for listing users.
#[derive(Debug, Clone, Default)]
pub struct UserFilter {
    pub role: Option<Role>,
    pub status: Option<UserStatus>,
    /// Exact (lower-cased) email.
    pub email: Option<String>,
}

/// Filter options for listing companies.
#[derive(Debug, Clone, Default)]
pub struct CompanyFilter {
    pub owner_id: Option<String>,
    pub status: Option<CompanyStatus>,
}

/// Filter options for listing internships.
#[derive(Debug, Clone, Default)]
pub struct InternshipFilter {
    pub company_id: Option<String>,
    pub status: Option<InternshipStatus>,
}

/// Filter options for listing applications.
#[derive(Debug, Clone, Default)]
pub struct ApplicationFilter {
    pub internship_id: Option<String>,
    pub student_id: Option<String>,
    pub status: Option<ApplicationStatus>,
}

/// Filter options for listing notifications.
#[derive(Debug, Clone, Default)]
pub struct NotificationFilter {
    pub user_id: Option<String>,
    pub unread_only: bool,
}

/// Typed relational store.
///
/// `update_*` and `delete_*` return whether a row was affected, so the
/// reconciler can tell a miss from a success.
#[allow(missing_docs)]
#[async_trait]
pub trait PrimaryStore: Send + Sync {
    async fn health_check(&self) -> Result<bool, CoreError>;

    /// Which of `keys` have a row in the table backing `collection`,
    /// whatever that row's current state.
    async fn existing_keys(
        &self,
        collection: &str,
        keys: &[String],
    ) -> Result<HashSet<String>, CoreError>;

    async fn get_user(&self, id: &str) -> Result<Option<User>, CoreError>;
    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, CoreError>;
    async fn list_users(&self, filter: &UserFilter) -> Result<Vec<User>, CoreError>;
    async fn insert_user(&self, user: &User) -> Result<(), CoreError>;
    async fn update_user(&self, user: &User) -> Result<bool, CoreError>;

    async fn get_company(&self, id: &str) -> Result<Option<Company>, CoreError>;
    async fn list_companies(&self, filter: &CompanyFilter) -> Result<Vec<Company>, CoreError>;
    async fn insert_company(&self, company: &Company) -> Result<(), CoreError>;
    async fn update_company(&self, company: &Company) -> Result<bool, CoreError>;

    async fn get_internship(&self, id: &str) -> Result<Option<Internship>, CoreError>;
    async fn list_internships(
        &self,
        filter: &InternshipFilter,
    ) -> Result<Vec<Internship>, CoreError>;
    async fn insert_internship(&self, internship: &Internship) -> Result<(), CoreError>;
    async fn update_internship(&self, internship: &Internship) -> Result<bool, CoreError>;
    async fn delete_internship(&self, id: &str) -> Result<bool, CoreError>;

    async fn get_application(&self, id: &str) -> Result<Option<Application>, CoreError>;
    async fn list_applications(
        &self,
        filter: &ApplicationFilter,
    ) -> Result<Vec<Application>, CoreError>;
    async fn insert_application(&self, application: &Application) -> Result<(), CoreError>;
    async fn update_application(&self, application: &Application) -> Result<bool, CoreError>;

    async fn get_notification(&self, id: &str) -> Result<Option<Notification>, CoreError>;
    async fn list_notifications(
        &self,
        filter: &NotificationFilter,
    ) -> Result<Vec<Notification>, CoreError>;
    async fn insert_notification(&self, notification: &Notification) -> Result<(), CoreError>;
    async fn update_notification(&self, notification: &Notification)
    -> Result<bool, CoreError>;
}

/// Schemaless document store.
///
/// Documents are extended-JSON objects keyed by `_id`. Keys and foreign keys
/// may be strings or native ids; [`Filter`] hides the difference.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// All documents of a collection matching the filter, in insertion order.
    async fn find(&self, collection: &str, filter: &Filter) -> Result<Vec<Value>, CoreError>;

    /// First matching document.
    async fn find_one(&self, collection: &str, filter: &Filter) -> Result<Option<Value>, CoreError> {
        Ok(self.find(collection, filter).await?.into_iter().next())
    }

    /// Insert a document, assigning a native `_id` when it has none.
    /// Returns the canonical key of the stored document.
    async fn insert(&self, collection: &str, document: Value) -> Result<String, CoreError>;

    /// Merge `set` into the first matching document. Returns whether one matched.
    async fn update_one(
        &self,
        collection: &str,
        filter: &Filter,
        set: Map<String, Value>,
    ) -> Result<bool, CoreError>;

    /// Delete the first matching document. Returns whether one matched.
    async fn delete_one(&self, collection: &str, filter: &Filter) -> Result<bool, CoreError>;

    /// Number of matching documents.
    async fn count(&self, collection: &str, filter: &Filter) -> Result<usize, CoreError> {
        Ok(self.find(collection, filter).await?.len())
    }

    /// Whether the store can serve requests.
    async fn health_check(&self) -> Result<bool, CoreError>;
}

/// Open the document store named by a URL: `memory` for an in-process store,
/// anything else as a SQLite URL.
pub async fn open_document_store(url: &str) -> Result<Arc<dyn DocumentStore>, CoreError> {
    if url.eq_ignore_ascii_case("memory") {
        return Ok(Arc::new(MemoryDocumentStore::new()));
    }
    Ok(Arc::new(SqliteDocumentStore::connect(url).await?))
}

/// Prepare a document for insertion: require an object and give it an `_id`.
///
/// Returns the canonical key together with the document.
pub(crate) fn prepare_insert(document: Value) -> Result<(String, Value), CoreError> {
    let Value::Object(mut map) = document else {
        return Err(CoreError::document("insert", "document must be a JSON object"));
    };
    let key = match map.get(crate::document::ID_FIELD) {
        Some(id) => crate::ids::normalize_key(id)
            .ok_or_else(|| CoreError::document("insert", "unsupported _id representation"))?,
        None => {
            let id = crate::ids::DocumentId::new();
            map.insert(crate::document::ID_FIELD.to_string(), id.to_native());
            id.to_hex()
        }
    };
    Ok((key, Value::Object(map)))
}

/// Merge `$set` fields into a stored document body.
pub(crate) fn apply_set(document: &mut Value, set: Map<String, Value>) {
    if let Value::Object(map) = document {
        for (field, value) in set {
            if field != crate::document::ID_FIELD {
                map.insert(field, value);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_prepare_insert_assigns_native_id() {
        let (key, doc) = prepare_insert(json!({"name": "Acme"})).unwrap();
        assert_eq!(key.len(), 24);
        assert_eq!(doc["_id"]["$oid"], json!(key));
    }

    #[test]
    fn test_prepare_insert_keeps_existing_id() {
        let (key, doc) = prepare_insert(json!({"_id": "legacy-9", "name": "Acme"})).unwrap();
        assert_eq!(key, "legacy-9");
        assert_eq!(doc["_id"], json!("legacy-9"));
    }

    #[test]
    fn test_prepare_insert_rejects_non_objects() {
        assert!(prepare_insert(json!([1, 2])).is_err());
        assert!(prepare_insert(json!({"_id": true})).is_err());
    }

    #[tokio::test]
    async fn test_open_document_store() {
        let memory = open_document_store("memory").await.unwrap();
        assert!(memory.health_check().await.unwrap());
        let sqlite = open_document_store("sqlite::memory:").await.unwrap();
        assert!(sqlite.health_check().await.unwrap());
    }

    #[test]
    fn test_apply_set_never_touches_id() {
        let mut doc = json!({"_id": "a", "status": "PENDING"});
        let mut set = Map::new();
        set.insert("_id".into(), json!("b"));
        set.insert("status".into(), json!("APPROVED"));
        apply_set(&mut doc, set);
        assert_eq!(doc, json!({"_id": "a", "status": "APPROVED"}));
    }
}
