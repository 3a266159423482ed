// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Dual-store reconciliation.
//!
//! [`DualStore`] puts the primary (relational) store in front of the document
//! store. Reads try the primary first and fall back to, or merge in, the
//! document store; writes go to the primary and fall back to the document
//! store only when the primary itself fails.
//!
//! ```text
//!   lookup_one                         lookup_many (merge)
//!   ──────────                         ───────────────────
//!   primary ─ Some ──► done            primary ──┐
//!      │                                         ├─► merge_by_key ──► done
//!      └ None / store error            documents ┘   (primary wins)
//!            │
//!            ▼
//!   documents ─ normalize ─ decode ──► done
//! ```

use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;
use strum::{AsRefStr, Display, EnumString};
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::document::{Filter, ID_FIELD, decode_document, encode_record, update_fields};
use crate::error::{CoreError, Result};
use crate::ids::canonical_key;
use crate::models::Keyed;
use crate::persistence::{
    DocumentStore, PrimaryStore, SqlitePrimaryStore, collections, open_document_store,
};

/// How list reads combine the two stores.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, EnumString, AsRefStr, Display)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum ReconcileMode {
    /// Query the document store only when the primary is empty or failing.
    Fallback,
    /// Always query both stores and merge the results.
    #[default]
    Merge,
}

/// Entity kinds held by both stores.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entity {
    User,
    Company,
    Internship,
    Application,
    Notification,
}

impl Entity {
    /// Document collection holding this entity.
    pub fn collection(self) -> &'static str {
        match self {
            Entity::User => collections::USERS,
            Entity::Company => collections::COMPANIES,
            Entity::Internship => collections::INTERNSHIPS,
            Entity::Application => collections::APPLICATIONS,
            Entity::Notification => collections::NOTIFICATIONS,
        }
    }

    /// Name used in errors and logs.
    pub fn name(self) -> &'static str {
        match self {
            Entity::User => "user",
            Entity::Company => "company",
            Entity::Internship => "internship",
            Entity::Application => "application",
            Entity::Notification => "notification",
        }
    }
}

/// Store that accepted a write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteTarget {
    Primary,
    Documents,
}

/// Primary store in front of a document store.
#[derive(Clone)]
pub struct DualStore {
    primary: Arc<dyn PrimaryStore>,
    documents: Arc<dyn DocumentStore>,
    mode: ReconcileMode,
}

impl DualStore {
    /// Combine two stores under the given mode.
    pub fn new(
        primary: Arc<dyn PrimaryStore>,
        documents: Arc<dyn DocumentStore>,
        mode: ReconcileMode,
    ) -> Self {
        Self {
            primary,
            documents,
            mode,
        }
    }

    /// Open both stores named by the configuration, running migrations.
    pub async fn connect(config: &Config) -> Result<Self> {
        let primary = SqlitePrimaryStore::connect(&config.database_url).await?;
        let documents = open_document_store(&config.document_url).await?;
        info!(
            mode = %config.reconcile_mode,
            document_url = %config.document_url,
            "Opened primary and document stores"
        );
        Ok(Self::new(Arc::new(primary), documents, config.reconcile_mode))
    }

    /// The primary store.
    pub fn primary(&self) -> &dyn PrimaryStore {
        self.primary.as_ref()
    }

    /// The document store.
    pub fn documents(&self) -> &dyn DocumentStore {
        self.documents.as_ref()
    }

    /// The configured list mode.
    pub fn mode(&self) -> ReconcileMode {
        self.mode
    }

    /// Look up one record, falling back to the document store when the
    /// primary misses or fails.
    ///
    /// A document that cannot be decoded counts as missing. Both stores
    /// failing yields [`CoreError::StoresUnavailable`].
    pub async fn lookup_one<T, F>(
        &self,
        entity: Entity,
        key: &str,
        primary: F,
        filter: Filter,
    ) -> Result<Option<T>>
    where
        T: DeserializeOwned,
        F: Future<Output = Result<Option<T>>>,
    {
        let primary_failed = match primary.await {
            Ok(Some(record)) => return Ok(Some(record)),
            Ok(None) => {
                debug!(entity = entity.name(), key = %key, "Not in primary store, trying documents");
                false
            }
            Err(e) if e.is_store_failure() => {
                warn!(
                    entity = entity.name(),
                    key = %key,
                    error = %e,
                    "Primary lookup failed, falling back to document store"
                );
                true
            }
            Err(e) => return Err(e),
        };

        match self.documents.find_one(entity.collection(), &filter).await {
            Ok(Some(document)) => match decode_document::<T>(document) {
                Ok(record) => Ok(Some(record)),
                Err(e) => {
                    warn!(entity = entity.name(), key = %key, error = %e, "Skipping undecodable document");
                    Ok(None)
                }
            },
            Ok(None) => Ok(None),
            Err(e) if primary_failed => {
                warn!(entity = entity.name(), key = %key, error = %e, "Document lookup failed too");
                Err(CoreError::StoresUnavailable {
                    entity: entity.name(),
                })
            }
            Err(e) => {
                warn!(entity = entity.name(), key = %key, error = %e, "Document lookup failed");
                Ok(None)
            }
        }
    }

    /// List records from both stores according to the reconcile mode.
    pub async fn lookup_many<T, F>(&self, entity: Entity, primary: F, filter: Filter) -> Result<Vec<T>>
    where
        T: DeserializeOwned + Keyed,
        F: Future<Output = Result<Vec<T>>>,
    {
        let primary_records = match primary.await {
            Ok(records) => Some(records),
            Err(e) if e.is_store_failure() => {
                warn!(
                    entity = entity.name(),
                    error = %e,
                    "Primary list failed, falling back to document store"
                );
                None
            }
            Err(e) => return Err(e),
        };

        let primary_has_rows = primary_records.as_ref().is_some_and(|r| !r.is_empty());
        if self.mode == ReconcileMode::Fallback && primary_has_rows {
            return Ok(primary_records.unwrap_or_default());
        }

        let documents = match self.documents.find(entity.collection(), &filter).await {
            Ok(documents) => documents,
            Err(e) => {
                return match primary_records {
                    Some(records) => {
                        warn!(entity = entity.name(), error = %e, "Document list failed, using primary only");
                        Ok(records)
                    }
                    None => {
                        warn!(entity = entity.name(), error = %e, "Document list failed too");
                        Err(CoreError::StoresUnavailable {
                            entity: entity.name(),
                        })
                    }
                };
            }
        };

        let decoded: Vec<T> = documents
            .into_iter()
            .filter_map(|document| match decode_document::<T>(document) {
                Ok(record) => Some(record),
                Err(e) => {
                    warn!(entity = entity.name(), error = %e, "Skipping undecodable document");
                    None
                }
            })
            .collect();

        let (primary_records, decoded) = match primary_records {
            Some(records) => {
                let decoded = self.drop_shadowed(entity, &records, decoded).await;
                (records, decoded)
            }
            None => (Vec::new(), decoded),
        };
        debug!(
            entity = entity.name(),
            primary = primary_records.len(),
            documents = decoded.len(),
            "Merging store results"
        );
        Ok(merge_by_key(primary_records, decoded))
    }

    /// Remove document records whose key the primary holds but left out of
    /// its filtered result. The primary row is authoritative, so such a
    /// document is a stale copy of a record that no longer matches.
    async fn drop_shadowed<T: Keyed>(&self, entity: Entity, listed: &[T], documents: Vec<T>) -> Vec<T> {
        let listed: HashSet<String> = listed.iter().map(|r| canonical_key(r.key())).collect();
        let candidates: Vec<String> = documents
            .iter()
            .map(|r| canonical_key(r.key()))
            .filter(|key| !listed.contains(key))
            .collect();
        if candidates.is_empty() {
            return documents;
        }

        match self.primary.existing_keys(entity.collection(), &candidates).await {
            Ok(shadowed) if shadowed.is_empty() => documents,
            Ok(shadowed) => {
                debug!(
                    entity = entity.name(),
                    stale = shadowed.len(),
                    "Dropping document copies shadowed by primary rows"
                );
                documents
                    .into_iter()
                    .filter(|r| !shadowed.contains(&canonical_key(r.key())))
                    .collect()
            }
            Err(e) => {
                warn!(
                    entity = entity.name(),
                    error = %e,
                    "Primary key check failed, keeping document records"
                );
                documents
            }
        }
    }

    /// Write a new record, falling back to the document store when the
    /// primary fails.
    pub async fn insert<T, F>(&self, entity: Entity, record: &T, primary: F) -> Result<WriteTarget>
    where
        T: Serialize + Keyed,
        F: Future<Output = Result<()>>,
    {
        let primary_error = match primary.await {
            Ok(()) => return Ok(WriteTarget::Primary),
            Err(e) if e.is_store_failure() => e,
            Err(e) => return Err(e),
        };
        warn!(
            entity = entity.name(),
            key = %record.key(),
            error = %primary_error,
            "Primary insert failed, writing to document store"
        );

        let document = encode_record(record)?;
        match self.documents.insert(entity.collection(), document).await {
            Ok(_) => Ok(WriteTarget::Documents),
            Err(e) if e.is_store_failure() => {
                warn!(entity = entity.name(), error = %e, "Document insert failed too");
                Err(CoreError::StoresUnavailable {
                    entity: entity.name(),
                })
            }
            Err(e) => Err(e),
        }
    }

    /// Update an existing record wherever it lives.
    ///
    /// A primary miss or failure sends the update to the document store by
    /// key. Fails with `NotFound` when neither store holds the record.
    pub async fn update<T, F>(&self, entity: Entity, record: &T, primary: F) -> Result<WriteTarget>
    where
        T: Serialize + Keyed,
        F: Future<Output = Result<bool>>,
    {
        let primary_error = match primary.await {
            Ok(true) => return Ok(WriteTarget::Primary),
            Ok(false) => None,
            Err(e) if e.is_store_failure() => {
                warn!(
                    entity = entity.name(),
                    key = %record.key(),
                    error = %e,
                    "Primary update failed, updating document store"
                );
                Some(e)
            }
            Err(e) => return Err(e),
        };

        let filter = Filter::by_key(ID_FIELD, record.key());
        let fields = update_fields(record)?;
        match self
            .documents
            .update_one(entity.collection(), &filter, fields)
            .await
        {
            Ok(true) => Ok(WriteTarget::Documents),
            Ok(false) => Err(primary_error
                .unwrap_or_else(|| CoreError::not_found(entity.name(), record.key()))),
            Err(e) if primary_error.is_some() && e.is_store_failure() => {
                Err(CoreError::StoresUnavailable {
                    entity: entity.name(),
                })
            }
            Err(e) => Err(e),
        }
    }

    /// Delete a record from both stores. Returns whether either removed it.
    pub async fn delete<F>(&self, entity: Entity, key: &str, primary: F) -> Result<bool>
    where
        F: Future<Output = Result<bool>>,
    {
        let primary_result = primary.await;
        let document_result = self
            .documents
            .delete_one(entity.collection(), &Filter::by_key(ID_FIELD, key))
            .await;

        match (primary_result, document_result) {
            (Ok(a), Ok(b)) => Ok(a || b),
            (Ok(true), Err(e)) | (Err(e), Ok(true)) => {
                warn!(entity = entity.name(), key = %key, error = %e, "Delete succeeded in one store only");
                Ok(true)
            }
            (Ok(false), Err(e)) | (Err(e), Ok(false)) => Err(e),
            (Err(p), Err(d)) => {
                warn!(entity = entity.name(), key = %key, primary = %p, documents = %d, "Delete failed in both stores");
                Err(CoreError::StoresUnavailable {
                    entity: entity.name(),
                })
            }
        }
    }

    /// Health of each store as `(primary, documents)`.
    pub async fn health(&self) -> (bool, bool) {
        let primary = self.primary.health_check().await.unwrap_or(false);
        let documents = self.documents.health_check().await.unwrap_or(false);
        (primary, documents)
    }
}

/// Merge two record lists by normalized key.
///
/// Primary records come first in their original order and win on key
/// conflicts; document-only records follow in document order. No key
/// appears twice, even if a single input repeats one.
pub fn merge_by_key<T: Keyed>(primary: Vec<T>, documents: Vec<T>) -> Vec<T> {
    let mut seen = HashSet::with_capacity(primary.len() + documents.len());
    primary
        .into_iter()
        .chain(documents)
        .filter(|record| seen.insert(canonical_key(record.key())))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Role, User, UserStatus};
    use crate::persistence::MemoryDocumentStore;
    use chrono::Utc;
    use serde_json::json;

    fn user(id: &str, email: &str) -> User {
        let now = Utc::now();
        User {
            id: id.to_string(),
            email: email.to_string(),
            name: "Test".to_string(),
            role: Role::Student,
            status: UserStatus::Active,
            headline: None,
            university: None,
            created_at: now,
            updated_at: now,
        }
    }

    async fn stores(mode: ReconcileMode) -> (SqlitePrimaryStore, Arc<MemoryDocumentStore>, DualStore) {
        let primary = SqlitePrimaryStore::in_memory().await.unwrap();
        let documents = Arc::new(MemoryDocumentStore::new());
        let dual = DualStore::new(Arc::new(primary.clone()), documents.clone(), mode);
        (primary, documents, dual)
    }

    #[test]
    fn test_reconcile_mode_parsing() {
        assert_eq!("merge".parse::<ReconcileMode>().unwrap(), ReconcileMode::Merge);
        assert_eq!("FALLBACK".parse::<ReconcileMode>().unwrap(), ReconcileMode::Fallback);
        assert!("both".parse::<ReconcileMode>().is_err());
        assert_eq!(ReconcileMode::default(), ReconcileMode::Merge);
    }

    #[test]
    fn test_merge_by_key_primary_wins_and_dedups() {
        let primary = vec![
            user("65f1a2b3c4d5e6f708091011", "primary@x.io"),
            user("b", "b@x.io"),
        ];
        let documents = vec![
            user("65F1A2B3C4D5E6F708091011", "stale@x.io"),
            user("c", "c@x.io"),
            user("c", "c-again@x.io"),
        ];
        let merged = merge_by_key(primary, documents);
        let emails: Vec<_> = merged.iter().map(|u| u.email.as_str()).collect();
        assert_eq!(emails, vec!["primary@x.io", "b@x.io", "c@x.io"]);
    }

    #[tokio::test]
    async fn test_lookup_one_prefers_primary() {
        let (primary, documents, dual) = stores(ReconcileMode::Merge).await;
        let u = user("65f1a2b3c4d5e6f708091011", "primary@x.io");
        primary.insert_user(&u).await.unwrap();
        documents
            .insert(
                "users",
                json!({"_id": {"$oid": u.id}, "email": "doc@x.io", "name": "D", "role": "student"}),
            )
            .await
            .unwrap();

        let found: Option<User> = dual
            .lookup_one(
                Entity::User,
                &u.id,
                primary.get_user(&u.id),
                Filter::by_key(ID_FIELD, &u.id),
            )
            .await
            .unwrap();
        assert_eq!(found.unwrap().email, "primary@x.io");
    }

    #[tokio::test]
    async fn test_lookup_one_falls_back_when_primary_misses() {
        let (primary, documents, dual) = stores(ReconcileMode::Merge).await;
        documents
            .insert(
                "users",
                json!({
                    "_id": {"$oid": "65f1a2b3c4d5e6f708091011"},
                    "email": "doc@x.io",
                    "name": "Doc",
                    "role": "company",
                    "createdAt": {"$date": 1_700_000_000_000_i64}
                }),
            )
            .await
            .unwrap();

        let key = "65F1A2B3C4D5E6F708091011";
        let canonical = canonical_key(key);
        let found: User = dual
            .lookup_one(
                Entity::User,
                key,
                primary.get_user(&canonical),
                Filter::by_key(ID_FIELD, key),
            )
            .await
            .unwrap()
            .expect("found in documents");
        assert_eq!(found.id, "65f1a2b3c4d5e6f708091011");
        assert_eq!(found.role, Role::Company);
        assert_eq!(found.updated_at, found.created_at);
    }

    #[tokio::test]
    async fn test_lookup_one_falls_back_when_primary_fails() {
        let (primary, documents, dual) = stores(ReconcileMode::Merge).await;
        documents
            .insert("users", json!({"_id": "legacy", "email": "l@x.io", "name": "L", "role": "STUDENT"}))
            .await
            .unwrap();
        primary.pool().close().await;

        let found: Option<User> = dual
            .lookup_one(
                Entity::User,
                "legacy",
                primary.get_user("legacy"),
                Filter::by_key(ID_FIELD, "legacy"),
            )
            .await
            .unwrap();
        assert_eq!(found.unwrap().email, "l@x.io");
    }

    #[tokio::test]
    async fn test_lookup_one_both_failing_is_unavailable() {
        let (primary, documents, dual) = stores(ReconcileMode::Merge).await;
        primary.pool().close().await;
        documents.set_unavailable(true);

        let err = dual
            .lookup_one::<User, _>(
                Entity::User,
                "x",
                primary.get_user("x"),
                Filter::by_key(ID_FIELD, "x"),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::StoresUnavailable { entity: "user" }));
    }

    #[tokio::test]
    async fn test_lookup_one_document_failure_after_primary_miss_is_none() {
        let (primary, documents, dual) = stores(ReconcileMode::Merge).await;
        documents.set_unavailable(true);
        let found = dual
            .lookup_one::<User, _>(
                Entity::User,
                "x",
                primary.get_user("x"),
                Filter::by_key(ID_FIELD, "x"),
            )
            .await
            .unwrap();
        assert!(found.is_none());
    }

    #[tokio::test]
    async fn test_lookup_many_merges_and_skips_bad_documents() {
        let (primary, documents, dual) = stores(ReconcileMode::Merge).await;
        let shared = user("65f1a2b3c4d5e6f708091011", "primary@x.io");
        primary.insert_user(&shared).await.unwrap();
        documents
            .seed(
                "users",
                vec![
                    json!({"_id": {"$oid": shared.id}, "email": "stale@x.io", "name": "S", "role": "STUDENT"}),
                    json!({"_id": "doc-only", "email": "doc@x.io", "name": "D", "role": "STUDENT"}),
                    json!({"_id": "broken", "email": "b@x.io", "role": "ASTRONAUT"}),
                ],
            )
            .await
            .unwrap();

        let users: Vec<User> = dual
            .lookup_many(
                Entity::User,
                primary.list_users(&Default::default()),
                Filter::new(),
            )
            .await
            .unwrap();
        let emails: Vec<_> = users.iter().map(|u| u.email.as_str()).collect();
        assert_eq!(emails, vec!["primary@x.io", "doc@x.io"]);
    }

    #[tokio::test]
    async fn test_lookup_many_filtered_drops_stale_document_copies() {
        let (primary, documents, dual) = stores(ReconcileMode::Merge).await;
        let mut moved = user("65f1a2b3c4d5e6f708091011", "moved@x.io");
        moved.status = UserStatus::Suspended;
        primary.insert_user(&moved).await.unwrap();
        documents
            .seed(
                "users",
                vec![
                    json!({"_id": {"$oid": "65F1A2B3C4D5E6F708091011"}, "email": "moved@x.io", "name": "M", "role": "STUDENT", "status": "active"}),
                    json!({"_id": "doc-only", "email": "doc@x.io", "name": "D", "role": "STUDENT", "status": "ACTIVE"}),
                ],
            )
            .await
            .unwrap();

        let filter = crate::persistence::UserFilter {
            status: Some(UserStatus::Active),
            ..Default::default()
        };
        let active: Vec<User> = dual
            .lookup_many(
                Entity::User,
                primary.list_users(&filter),
                filter.document_filter(),
            )
            .await
            .unwrap();
        let ids: Vec<_> = active.iter().map(|u| u.id.as_str()).collect();
        assert_eq!(ids, vec!["doc-only"]);
    }

    #[tokio::test]
    async fn test_lookup_many_fallback_mode_drops_stale_copies_when_primary_empty() {
        let (primary, documents, dual) = stores(ReconcileMode::Fallback).await;
        let mut moved = user("p", "p@x.io");
        moved.status = UserStatus::Suspended;
        primary.insert_user(&moved).await.unwrap();
        documents
            .insert(
                "users",
                json!({"_id": "p", "email": "p@x.io", "name": "P", "role": "STUDENT", "status": "ACTIVE"}),
            )
            .await
            .unwrap();

        let filter = crate::persistence::UserFilter {
            status: Some(UserStatus::Active),
            ..Default::default()
        };
        let active: Vec<User> = dual
            .lookup_many(
                Entity::User,
                primary.list_users(&filter),
                filter.document_filter(),
            )
            .await
            .unwrap();
        assert!(active.is_empty());
    }

    #[tokio::test]
    async fn test_lookup_many_keeps_documents_when_primary_down() {
        let (primary, documents, dual) = stores(ReconcileMode::Merge).await;
        primary.insert_user(&user("p", "p@x.io")).await.unwrap();
        documents
            .insert("users", json!({"_id": "p", "email": "doc@x.io", "name": "P", "role": "STUDENT"}))
            .await
            .unwrap();
        primary.pool().close().await;

        let users: Vec<User> = dual
            .lookup_many(Entity::User, primary.list_users(&Default::default()), Filter::new())
            .await
            .unwrap();
        assert_eq!(users.len(), 1);
        assert_eq!(users[0].email, "doc@x.io");
    }

    #[tokio::test]
    async fn test_lookup_many_fallback_mode_skips_documents_when_primary_has_rows() {
        let (primary, documents, dual) = stores(ReconcileMode::Fallback).await;
        primary.insert_user(&user("p", "p@x.io")).await.unwrap();
        documents
            .insert("users", json!({"_id": "d", "email": "d@x.io", "name": "D", "role": "STUDENT"}))
            .await
            .unwrap();

        let users: Vec<User> = dual
            .lookup_many(Entity::User, primary.list_users(&Default::default()), Filter::new())
            .await
            .unwrap();
        assert_eq!(users.len(), 1);
        assert_eq!(users[0].id, "p");
    }

    #[tokio::test]
    async fn test_lookup_many_fallback_mode_uses_documents_when_primary_empty() {
        let (primary, documents, dual) = stores(ReconcileMode::Fallback).await;
        documents
            .insert("users", json!({"_id": "d", "email": "d@x.io", "name": "D", "role": "STUDENT"}))
            .await
            .unwrap();

        let users: Vec<User> = dual
            .lookup_many(Entity::User, primary.list_users(&Default::default()), Filter::new())
            .await
            .unwrap();
        assert_eq!(users.len(), 1);
        assert_eq!(users[0].id, "d");
    }

    #[tokio::test]
    async fn test_lookup_many_document_failure_keeps_primary() {
        let (primary, documents, dual) = stores(ReconcileMode::Merge).await;
        primary.insert_user(&user("p", "p@x.io")).await.unwrap();
        documents.set_unavailable(true);

        let users: Vec<User> = dual
            .lookup_many(Entity::User, primary.list_users(&Default::default()), Filter::new())
            .await
            .unwrap();
        assert_eq!(users.len(), 1);
    }

    #[tokio::test]
    async fn test_insert_falls_back_to_documents() {
        let (primary, documents, dual) = stores(ReconcileMode::Merge).await;
        let u = user(&crate::ids::new_key(), "new@x.io");

        assert_eq!(
            dual.insert(Entity::User, &u, primary.insert_user(&u)).await.unwrap(),
            WriteTarget::Primary
        );

        primary.pool().close().await;
        let v = user(&crate::ids::new_key(), "fallback@x.io");
        assert_eq!(
            dual.insert(Entity::User, &v, primary.insert_user(&v)).await.unwrap(),
            WriteTarget::Documents
        );

        let stored = documents
            .find_one("users", &Filter::by_key(ID_FIELD, &v.id))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored["_id"], json!({"$oid": v.id}));
    }

    #[tokio::test]
    async fn test_insert_conflict_does_not_fall_back() {
        let (primary, documents, dual) = stores(ReconcileMode::Merge).await;
        primary.insert_user(&user("a", "same@x.io")).await.unwrap();
        let dup = user("b", "same@x.io");
        let err = dual
            .insert(Entity::User, &dup, primary.insert_user(&dup))
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::Conflict(_)));
        assert_eq!(documents.count("users", &Filter::new()).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_update_routes_to_owning_store() {
        let (primary, documents, dual) = stores(ReconcileMode::Merge).await;
        documents
            .insert("users", json!({"_id": "doc-user", "email": "d@x.io", "name": "D", "role": "STUDENT"}))
            .await
            .unwrap();

        let mut u = user("doc-user", "d@x.io");
        u.name = "Renamed".to_string();
        assert_eq!(
            dual.update(Entity::User, &u, primary.update_user(&u)).await.unwrap(),
            WriteTarget::Documents
        );
        let stored = documents
            .find_one("users", &Filter::by_key(ID_FIELD, "doc-user"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored["name"], "Renamed");

        let ghost = user("ghost", "g@x.io");
        let err = dual
            .update(Entity::User, &ghost, primary.update_user(&ghost))
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_delete_removes_from_both_stores() {
        let (_primary, documents, dual) = stores(ReconcileMode::Merge).await;
        documents.insert("internships", json!({"_id": "i-1"})).await.unwrap();

        let removed = dual
            .delete(Entity::Internship, "i-1", async { Ok::<_, CoreError>(false) })
            .await
            .unwrap();
        assert!(removed);
        assert_eq!(documents.count("internships", &Filter::new()).await.unwrap(), 0);

        let removed = dual
            .delete(Entity::Internship, "i-1", async { Ok::<_, CoreError>(false) })
            .await
            .unwrap();
        assert!(!removed);
    }

    #[tokio::test]
    async fn test_connect_from_config() {
        let dual = DualStore::connect(&Config::in_memory()).await.unwrap();
        assert_eq!(dual.mode(), ReconcileMode::Merge);
        assert_eq!(dual.health().await, (true, true));
    }

    #[tokio::test]
    async fn test_health_reports_each_store() {
        let (primary, documents, dual) = stores(ReconcileMode::Merge).await;
        assert_eq!(dual.health().await, (true, true));
        documents.set_unavailable(true);
        primary.pool().close().await;
        assert_eq!(dual.health().await, (false, false));
    }
}
