// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Typed record access over [`DualStore`].
//!
//! Each method pairs a primary store call with the equivalent document
//! filter. Keys are canonicalized before they reach the primary store, so
//! upper-case native ids resolve the same as lower-case ones.

use crate::document::{Filter, ID_FIELD};
use crate::error::Result;
use crate::ids::canonical_key;
use crate::models::{Application, Company, Internship, Notification, User};
use crate::persistence::{
    ApplicationFilter, CompanyFilter, InternshipFilter, NotificationFilter, UserFilter,
};
use crate::reconcile::{DualStore, Entity, WriteTarget};

impl UserFilter {
    /// Equivalent document store filter.
    pub fn document_filter(&self) -> Filter {
        let mut filter = Filter::new();
        if let Some(role) = self.role {
            filter = filter.eq_ignore_case("role", role.as_ref());
        }
        if let Some(status) = self.status {
            filter = filter.eq_ignore_case("status", status.as_ref());
        }
        if let Some(email) = &self.email {
            filter = filter.eq_ignore_case("email", email);
        }
        filter
    }
}

impl CompanyFilter {
    /// Equivalent document store filter.
    pub fn document_filter(&self) -> Filter {
        let mut filter = Filter::new();
        if let Some(owner_id) = &self.owner_id {
            filter = filter.key("ownerId", owner_id);
        }
        if let Some(status) = self.status {
            filter = filter.eq_ignore_case("status", status.as_ref());
        }
        filter
    }
}

impl InternshipFilter {
    /// Equivalent document store filter.
    pub fn document_filter(&self) -> Filter {
        let mut filter = Filter::new();
        if let Some(company_id) = &self.company_id {
            filter = filter.key("companyId", company_id);
        }
        if let Some(status) = self.status {
            filter = filter.eq_ignore_case("status", status.as_ref());
        }
        filter
    }
}

impl ApplicationFilter {
    /// Equivalent document store filter.
    pub fn document_filter(&self) -> Filter {
        let mut filter = Filter::new();
        if let Some(internship_id) = &self.internship_id {
            filter = filter.key("internshipId", internship_id);
        }
        if let Some(student_id) = &self.student_id {
            filter = filter.key("studentId", student_id);
        }
        if let Some(status) = self.status {
            filter = filter.eq_ignore_case("status", status.as_ref());
        }
        filter
    }
}

impl NotificationFilter {
    /// Equivalent document store filter.
    pub fn document_filter(&self) -> Filter {
        let mut filter = Filter::new();
        if let Some(user_id) = &self.user_id {
            filter = filter.key("userId", user_id);
        }
        if self.unread_only {
            filter = filter.falsy("read");
        }
        filter
    }
}

fn canonical(value: &Option<String>) -> Option<String> {
    value.as_deref().map(canonical_key)
}

impl DualStore {
    // ------------------------------------------------------------------------
    // Users
    // ------------------------------------------------------------------------

    pub async fn get_user(&self, id: &str) -> Result<Option<User>> {
        let key = canonical_key(id);
        self.lookup_one(
            Entity::User,
            &key,
            self.primary().get_user(&key),
            Filter::by_key(ID_FIELD, &key),
        )
        .await
    }

    /// Look up a user by email, ignoring case.
    pub async fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let email = email.trim().to_lowercase();
        self.lookup_one(
            Entity::User,
            &email,
            self.primary().get_user_by_email(&email),
            Filter::new().eq_ignore_case("email", &email),
        )
        .await
    }

    pub async fn list_users(&self, filter: &UserFilter) -> Result<Vec<User>> {
        let filter = UserFilter {
            email: filter.email.as_ref().map(|e| e.trim().to_lowercase()),
            ..filter.clone()
        };
        self.lookup_many(
            Entity::User,
            self.primary().list_users(&filter),
            filter.document_filter(),
        )
        .await
    }

    pub async fn insert_user(&self, user: &User) -> Result<WriteTarget> {
        self.insert(Entity::User, user, self.primary().insert_user(user))
            .await
    }

    pub async fn update_user(&self, user: &User) -> Result<WriteTarget> {
        self.update(Entity::User, user, self.primary().update_user(user))
            .await
    }

    // ------------------------------------------------------------------------
    // Companies
    // ------------------------------------------------------------------------

    pub async fn get_company(&self, id: &str) -> Result<Option<Company>> {
        let key = canonical_key(id);
        self.lookup_one(
            Entity::Company,
            &key,
            self.primary().get_company(&key),
            Filter::by_key(ID_FIELD, &key),
        )
        .await
    }

    pub async fn list_companies(&self, filter: &CompanyFilter) -> Result<Vec<Company>> {
        let filter = CompanyFilter {
            owner_id: canonical(&filter.owner_id),
            ..filter.clone()
        };
        self.lookup_many(
            Entity::Company,
            self.primary().list_companies(&filter),
            filter.document_filter(),
        )
        .await
    }

    pub async fn insert_company(&self, company: &Company) -> Result<WriteTarget> {
        self.insert(Entity::Company, company, self.primary().insert_company(company))
            .await
    }

    pub async fn update_company(&self, company: &Company) -> Result<WriteTarget> {
        self.update(Entity::Company, company, self.primary().update_company(company))
            .await
    }

    // ------------------------------------------------------------------------
    // Internships
    // ------------------------------------------------------------------------

    pub async fn get_internship(&self, id: &str) -> Result<Option<Internship>> {
        let key = canonical_key(id);
        self.lookup_one(
            Entity::Internship,
            &key,
            self.primary().get_internship(&key),
            Filter::by_key(ID_FIELD, &key),
        )
        .await
    }

    pub async fn list_internships(&self, filter: &InternshipFilter) -> Result<Vec<Internship>> {
        let filter = InternshipFilter {
            company_id: canonical(&filter.company_id),
            ..filter.clone()
        };
        self.lookup_many(
            Entity::Internship,
            self.primary().list_internships(&filter),
            filter.document_filter(),
        )
        .await
    }

    pub async fn insert_internship(&self, internship: &Internship) -> Result<WriteTarget> {
        self.insert(
            Entity::Internship,
            internship,
            self.primary().insert_internship(internship),
        )
        .await
    }

    pub async fn update_internship(&self, internship: &Internship) -> Result<WriteTarget> {
        self.update(
            Entity::Internship,
            internship,
            self.primary().update_internship(internship),
        )
        .await
    }

    pub async fn delete_internship(&self, id: &str) -> Result<bool> {
        let key = canonical_key(id);
        self.delete(Entity::Internship, &key, self.primary().delete_internship(&key))
            .await
    }

    // ------------------------------------------------------------------------
    // Applications
    // ------------------------------------------------------------------------

    pub async fn get_application(&self, id: &str) -> Result<Option<Application>> {
        let key = canonical_key(id);
        self.lookup_one(
            Entity::Application,
            &key,
            self.primary().get_application(&key),
            Filter::by_key(ID_FIELD, &key),
        )
        .await
    }

    pub async fn list_applications(&self, filter: &ApplicationFilter) -> Result<Vec<Application>> {
        let filter = ApplicationFilter {
            internship_id: canonical(&filter.internship_id),
            student_id: canonical(&filter.student_id),
            ..filter.clone()
        };
        self.lookup_many(
            Entity::Application,
            self.primary().list_applications(&filter),
            filter.document_filter(),
        )
        .await
    }

    pub async fn insert_application(&self, application: &Application) -> Result<WriteTarget> {
        self.insert(
            Entity::Application,
            application,
            self.primary().insert_application(application),
        )
        .await
    }

    pub async fn update_application(&self, application: &Application) -> Result<WriteTarget> {
        self.update(
            Entity::Application,
            application,
            self.primary().update_application(application),
        )
        .await
    }

    // ------------------------------------------------------------------------
    // Notifications
    // ------------------------------------------------------------------------

    pub async fn get_notification(&self, id: &str) -> Result<Option<Notification>> {
        let key = canonical_key(id);
        self.lookup_one(
            Entity::Notification,
            &key,
            self.primary().get_notification(&key),
            Filter::by_key(ID_FIELD, &key),
        )
        .await
    }

    pub async fn list_notifications(
        &self,
        filter: &NotificationFilter,
    ) -> Result<Vec<Notification>> {
        let filter = NotificationFilter {
            user_id: canonical(&filter.user_id),
            ..filter.clone()
        };
        self.lookup_many(
            Entity::Notification,
            self.primary().list_notifications(&filter),
            filter.document_filter(),
        )
        .await
    }

    pub async fn insert_notification(&self, notification: &Notification) -> Result<WriteTarget> {
        self.insert(
            Entity::Notification,
            notification,
            self.primary().insert_notification(notification),
        )
        .await
    }

    pub async fn update_notification(&self, notification: &Notification) -> Result<WriteTarget> {
        self.update(
            Entity::Notification,
            notification,
            self.primary().update_notification(notification),
        )
        .await
    }
}
