// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Common test infrastructure for internhub-core integration tests.
//!
//! Provides a TestContext over an in-memory primary store wrapped in a
//! fault-injecting [`FlakyPrimary`] and an in-memory document store.

#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;

use internhub_core::error::CoreError;
use internhub_core::handlers::HandlerState;
use internhub_core::ids::new_key;
use internhub_core::models::{
    Application, Company, CompanyStatus, Internship, InternshipStatus, Notification, Role, User,
    UserStatus,
};
use internhub_core::permissions::Actor;
use internhub_core::persistence::{
    ApplicationFilter, CompanyFilter, DocumentStore, InternshipFilter, MemoryDocumentStore,
    NotificationFilter, PrimaryStore, SqlitePrimaryStore, UserFilter,
};
use internhub_core::{Config, DualStore, ReconcileMode};

/// Primary store that can be switched into failing every call, or only
/// named operations.
pub struct FlakyPrimary {
    inner: SqlitePrimaryStore,
    failing: AtomicBool,
    failing_operations: Mutex<HashSet<String>>,
}

impl FlakyPrimary {
    pub fn new(inner: SqlitePrimaryStore) -> Self {
        Self {
            inner,
            failing: AtomicBool::new(false),
            failing_operations: Mutex::new(HashSet::new()),
        }
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Fail every call of one operation, such as `update_notification`.
    pub fn fail_operation(&self, operation: &str) {
        self.failing_operations
            .lock()
            .unwrap()
            .insert(operation.to_string());
    }

    pub fn inner(&self) -> &SqlitePrimaryStore {
        &self.inner
    }

    fn check(&self, operation: &str) -> Result<(), CoreError> {
        if self.failing.load(Ordering::SeqCst)
            || self.failing_operations.lock().unwrap().contains(operation)
        {
            return Err(CoreError::Database {
                operation: operation.to_string(),
                details: "injected failure".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl PrimaryStore for FlakyPrimary {
    async fn health_check(&self) -> Result<bool, CoreError> {
        self.check("health_check")?;
        self.inner.health_check().await
    }
    async fn existing_keys(
        &self,
        collection: &str,
        keys: &[String],
    ) -> Result<HashSet<String>, CoreError> {
        self.check("existing_keys")?;
        self.inner.existing_keys(collection, keys).await
    }

    async fn get_user(&self, id: &str) -> Result<Option<User>, CoreError> {
        self.check("get_user")?;
        self.inner.get_user(id).await
    }
    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, CoreError> {
        self.check("get_user_by_email")?;
        self.inner.get_user_by_email(email).await
    }
    async fn list_users(&self, filter: &UserFilter) -> Result<Vec<User>, CoreError> {
        self.check("list_users")?;
        self.inner.list_users(filter).await
    }
    async fn insert_user(&self, user: &User) -> Result<(), CoreError> {
        self.check("insert_user")?;
        self.inner.insert_user(user).await
    }
    async fn update_user(&self, user: &User) -> Result<bool, CoreError> {
        self.check("update_user")?;
        self.inner.update_user(user).await
    }

    async fn get_company(&self, id: &str) -> Result<Option<Company>, CoreError> {
        self.check("get_company")?;
        self.inner.get_company(id).await
    }
    async fn list_companies(&self, filter: &CompanyFilter) -> Result<Vec<Company>, CoreError> {
        self.check("list_companies")?;
        self.inner.list_companies(filter).await
    }
    async fn insert_company(&self, company: &Company) -> Result<(), CoreError> {
        self.check("insert_company")?;
        self.inner.insert_company(company).await
    }
    async fn update_company(&self, company: &Company) -> Result<bool, CoreError> {
        self.check("update_company")?;
        self.inner.update_company(company).await
    }

    async fn get_internship(&self, id: &str) -> Result<Option<Internship>, CoreError> {
        self.check("get_internship")?;
        self.inner.get_internship(id).await
    }
    async fn list_internships(
        &self,
        filter: &InternshipFilter,
    ) -> Result<Vec<Internship>, CoreError> {
        self.check("list_internships")?;
        self.inner.list_internships(filter).await
    }
    async fn insert_internship(&self, internship: &Internship) -> Result<(), CoreError> {
        self.check("insert_internship")?;
        self.inner.insert_internship(internship).await
    }
    async fn update_internship(&self, internship: &Internship) -> Result<bool, CoreError> {
        self.check("update_internship")?;
        self.inner.update_internship(internship).await
    }
    async fn delete_internship(&self, id: &str) -> Result<bool, CoreError> {
        self.check("delete_internship")?;
        self.inner.delete_internship(id).await
    }

    async fn get_application(&self, id: &str) -> Result<Option<Application>, CoreError> {
        self.check("get_application")?;
        self.inner.get_application(id).await
    }
    async fn list_applications(
        &self,
        filter: &ApplicationFilter,
    ) -> Result<Vec<Application>, CoreError> {
        self.check("list_applications")?;
        self.inner.list_applications(filter).await
    }
    async fn insert_application(&self, application: &Application) -> Result<(), CoreError> {
        self.check("insert_application")?;
        self.inner.insert_application(application).await
    }
    async fn update_application(&self, application: &Application) -> Result<bool, CoreError> {
        self.check("update_application")?;
        self.inner.update_application(application).await
    }

    async fn get_notification(&self, id: &str) -> Result<Option<Notification>, CoreError> {
        self.check("get_notification")?;
        self.inner.get_notification(id).await
    }
    async fn list_notifications(
        &self,
        filter: &NotificationFilter,
    ) -> Result<Vec<Notification>, CoreError> {
        self.check("list_notifications")?;
        self.inner.list_notifications(filter).await
    }
    async fn insert_notification(&self, notification: &Notification) -> Result<(), CoreError> {
        self.check("insert_notification")?;
        self.inner.insert_notification(notification).await
    }
    async fn update_notification(
        &self,
        notification: &Notification,
    ) -> Result<bool, CoreError> {
        self.check("update_notification")?;
        self.inner.update_notification(notification).await
    }
}

/// Test context with both stores and handler state.
pub struct TestContext {
    pub primary: Arc<FlakyPrimary>,
    pub documents: Arc<MemoryDocumentStore>,
    pub state: HandlerState,
}

impl TestContext {
    pub async fn new() -> Self {
        Self::with_config(Config::in_memory()).await
    }

    pub async fn with_config(config: Config) -> Self {
        let sqlite = SqlitePrimaryStore::in_memory()
            .await
            .expect("Failed to create in-memory primary store");
        let primary = Arc::new(FlakyPrimary::new(sqlite));
        let documents = Arc::new(MemoryDocumentStore::new());
        let store = DualStore::new(primary.clone(), documents.clone(), config.reconcile_mode);
        Self {
            primary,
            documents,
            state: HandlerState::new(store, config),
        }
    }

    pub async fn fallback_mode() -> Self {
        let config = Config {
            reconcile_mode: ReconcileMode::Fallback,
            ..Config::in_memory()
        };
        Self::with_config(config).await
    }

    /// Insert a user straight into the primary store and return it as an actor.
    pub async fn user(&self, role: Role) -> Actor {
        let now = Utc::now();
        let id = new_key();
        let user = User {
            email: format!("{}@example.com", id),
            id,
            name: format!("{role} user"),
            role,
            status: UserStatus::Active,
            headline: None,
            university: None,
            created_at: now,
            updated_at: now,
        };
        self.state
            .store
            .insert_user(&user)
            .await
            .expect("Failed to insert user");
        Actor::new(user)
    }

    /// Insert a company in the given status, owned by `owner`.
    pub async fn company(&self, owner: &Actor, status: CompanyStatus) -> Company {
        let now = Utc::now();
        let company = Company {
            id: new_key(),
            owner_id: owner.id().to_string(),
            name: "Acme".to_string(),
            description: None,
            website: None,
            location: Some("Berlin".to_string()),
            status,
            review_note: None,
            created_at: now,
            updated_at: now,
        };
        self.state
            .store
            .insert_company(&company)
            .await
            .expect("Failed to insert company");
        company
    }

    /// Insert an internship in the given status.
    pub async fn internship(&self, company: &Company, status: InternshipStatus) -> Internship {
        let now = Utc::now();
        let internship = Internship {
            id: new_key(),
            company_id: company.id.clone(),
            title: "Rust Intern".to_string(),
            description: "Build storage engines".to_string(),
            location: Some("Berlin".to_string()),
            remote: false,
            stipend: Some(1200),
            duration_weeks: Some(12),
            skills: vec!["Rust".to_string()],
            deadline: None,
            status,
            review_note: None,
            created_at: now,
            updated_at: now,
        };
        self.state
            .store
            .insert_internship(&internship)
            .await
            .expect("Failed to insert internship");
        internship
    }

    /// Insert a raw document into the document store.
    pub async fn document(&self, collection: &str, document: Value) -> String {
        self.documents
            .insert(collection, document)
            .await
            .expect("Failed to insert document")
    }
}
