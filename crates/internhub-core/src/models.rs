// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Domain records shared by both stores and the HTTP API.
//!
//! Field names serialize in camelCase (the document store convention) and
//! enum values in SCREAMING_SNAKE_CASE. Enum parsing ignores case because
//! documents written by older clients use lower-case values.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString};

/// Implements serde for a strum enum through its string form.
macro_rules! string_enum_serde {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl Serialize for $ty {
                fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                    serializer.serialize_str(self.as_ref())
                }
            }

            impl<'de> Deserialize<'de> for $ty {
                fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                    let raw = String::deserialize(deserializer)?;
                    raw.parse().map_err(|_| {
                        serde::de::Error::custom(format!(
                            "unknown {} '{}'",
                            stringify!($ty),
                            raw
                        ))
                    })
                }
            }
        )+
    };
}

/// Records addressable by a key in both stores.
pub trait Keyed {
    /// The record key.
    fn key(&self) -> &str;
}

macro_rules! keyed {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl Keyed for $ty {
                fn key(&self) -> &str {
                    &self.id
                }
            }
        )+
    };
}

/// Platform role of a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumString, AsRefStr, Display, EnumIter)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE", ascii_case_insensitive)]
pub enum Role {
    Student,
    Company,
    Admin,
    Superadmin,
}

impl Role {
    /// Admins and superadmins moderate the platform.
    pub fn is_moderator(self) -> bool {
        matches!(self, Role::Admin | Role::Superadmin)
    }
}

/// Account status of a user.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, EnumString, AsRefStr, Display, EnumIter,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE", ascii_case_insensitive)]
pub enum UserStatus {
    #[default]
    Active,
    Suspended,
}

/// Moderation status of a company.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, EnumString, AsRefStr, Display, EnumIter,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE", ascii_case_insensitive)]
pub enum CompanyStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
    Suspended,
}

/// Lifecycle status of an internship posting.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, EnumString, AsRefStr, Display, EnumIter,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE", ascii_case_insensitive)]
pub enum InternshipStatus {
    #[default]
    Draft,
    PendingReview,
    Open,
    Closed,
    Rejected,
}

/// Status of a student's application.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, EnumString, AsRefStr, Display, EnumIter,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE", ascii_case_insensitive)]
pub enum ApplicationStatus {
    #[default]
    Pending,
    Reviewing,
    Shortlisted,
    Accepted,
    Rejected,
    Withdrawn,
}

/// What a notification is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumString, AsRefStr, Display, EnumIter)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE", ascii_case_insensitive)]
pub enum NotificationKind {
    ApplicationReceived,
    ApplicationStatusChanged,
    InternshipReviewed,
    CompanyReviewed,
    AccountUpdated,
}

string_enum_serde!(
    Role,
    UserStatus,
    CompanyStatus,
    InternshipStatus,
    ApplicationStatus,
    NotificationKind,
);

/// A platform user, mirrored from the identity provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub email: String,
    pub name: String,
    pub role: Role,
    #[serde(default)]
    pub status: UserStatus,
    #[serde(default)]
    pub headline: Option<String>,
    #[serde(default)]
    pub university: Option<String>,
    #[serde(default)]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_at: DateTime<Utc>,
}

/// A company profile owned by a user with the company role.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Company {
    pub id: String,
    pub owner_id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub website: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub status: CompanyStatus,
    #[serde(default)]
    pub review_note: Option<String>,
    #[serde(default)]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_at: DateTime<Utc>,
}

/// An internship posted by a company.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Internship {
    pub id: String,
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
    #[serde(default)]
    pub status: InternshipStatus,
    #[serde(default)]
    pub review_note: Option<String>,
    #[serde(default)]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_at: DateTime<Utc>,
}

impl Internship {
    /// Whether the application deadline has passed at `now`.
    pub fn deadline_passed(&self, now: DateTime<Utc>) -> bool {
        self.deadline.is_some_and(|deadline| deadline < now)
    }

    /// Whether students may currently apply.
    pub fn accepts_applications(&self, now: DateTime<Utc>) -> bool {
        self.status == InternshipStatus::Open && !self.deadline_passed(now)
    }
}

/// A student's application to an internship.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Application {
    pub id: String,
    pub internship_id: String,
    pub student_id: String,
    #[serde(default)]
    pub cover_letter: Option<String>,
    #[serde(default)]
    pub resume_url: Option<String>,
    #[serde(default)]
    pub status: ApplicationStatus,
    #[serde(default)]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_at: DateTime<Utc>,
}

/// An in-app notification. Delivery beyond storage is out of scope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: String,
    pub user_id: String,
    pub kind: NotificationKind,
    pub title: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub link: Option<String>,
    #[serde(default)]
    pub read: bool,
    #[serde(default)]
    pub created_at: DateTime<Utc>,
}

keyed!(User, Company, Internship, Application, Notification);
