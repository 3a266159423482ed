// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! SQLite-backed primary store.

use std::collections::HashSet;
use std::path::Path;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};

use crate::error::CoreError;
use crate::ids::canonical_key;
use crate::models::{Application, Company, Internship, Notification, User};

use super::{
    ApplicationFilter, CompanyFilter, InternshipFilter, NotificationFilter, PrimaryStore,
    UserFilter, collections,
};

pub(crate) static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations/primary");

/// Keys bound per `IN (...)` query, well under SQLite's variable limit.
const KEY_BATCH: usize = 500;

/// Table holding the records of a document collection.
fn table_for(collection: &str) -> Result<&'static str, CoreError> {
    match collection {
        collections::USERS => Ok("users"),
        collections::COMPANIES => Ok("companies"),
        collections::INTERNSHIPS => Ok("internships"),
        collections::APPLICATIONS => Ok("applications"),
        collections::NOTIFICATIONS => Ok("notifications"),
        other => Err(CoreError::Database {
            operation: "existing_keys".to_string(),
            details: format!("no table for collection '{}'", other),
        }),
    }
}

/// SQLite-backed primary store.
#[derive(Clone)]
pub struct SqlitePrimaryStore {
    pool: SqlitePool,
}

impl SqlitePrimaryStore {
    /// Create a new primary store from an existing, migrated pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Connect to a SQLite URL and run all migrations.
    ///
    /// `sqlite::memory:` URLs get a single long-lived connection, since every
    /// connection to an in-memory database sees a different database.
    pub async fn connect(url: &str) -> Result<Self, CoreError> {
        let pool = if url.contains(":memory:") {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
                .connect(url)
                .await
        } else {
            SqlitePoolOptions::new().max_connections(5).connect(url).await
        }
        .map_err(|e| CoreError::Database {
            operation: "connect".to_string(),
            details: format!("Failed to connect to SQLite at {}: {}", url, e),
        })?;

        MIGRATOR.run(&pool).await?;

        Ok(Self { pool })
    }

    /// Create and initialize a primary store from a file path, creating
    /// parent directories and the database file as needed.
    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self, CoreError> {
        let path = path.as_ref();

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|e| CoreError::Database {
                operation: "create_dir".to_string(),
                details: format!("Failed to create directory {:?}: {}", parent, e),
            })?;
        }

        Self::connect(&format!("sqlite:{}?mode=rwc", path.to_string_lossy())).await
    }

    /// Fresh in-memory store with the schema applied.
    pub async fn in_memory() -> Result<Self, CoreError> {
        Self::connect("sqlite::memory:").await
    }

    /// The underlying pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

// ============================================================================
// Row types
// ============================================================================

fn parse_enum<T: FromStr>(column: &str, raw: &str) -> Result<T, CoreError> {
    raw.parse().map_err(|_| CoreError::Database {
        operation: "decode".to_string(),
        details: format!("unexpected value '{}' in column '{}'", raw, column),
    })
}

#[derive(sqlx::FromRow)]
struct UserRow {
    id: String,
    email: String,
    name: String,
    role: String,
    status: String,
    headline: Option<String>,
    university: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = CoreError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        Ok(User {
            role: parse_enum("role", &row.role)?,
            status: parse_enum("status", &row.status)?,
            id: row.id,
            email: row.email,
            name: row.name,
            headline: row.headline,
            university: row.university,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct CompanyRow {
    id: String,
    owner_id: String,
    name: String,
    description: Option<String>,
    website: Option<String>,
    location: Option<String>,
    status: String,
    review_note: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<CompanyRow> for Company {
    type Error = CoreError;

    fn try_from(row: CompanyRow) -> Result<Self, Self::Error> {
        Ok(Company {
            status: parse_enum("status", &row.status)?,
            id: row.id,
            owner_id: row.owner_id,
            name: row.name,
            description: row.description,
            website: row.website,
            location: row.location,
            review_note: row.review_note,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct InternshipRow {
    id: String,
    company_id: String,
    title: String,
    description: String,
    location: Option<String>,
    remote: bool,
    stipend: Option<i64>,
    duration_weeks: Option<i32>,
    skills: String,
    deadline: Option<DateTime<Utc>>,
    status: String,
    review_note: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<InternshipRow> for Internship {
    type Error = CoreError;

    fn try_from(row: InternshipRow) -> Result<Self, Self::Error> {
        let skills: Vec<String> =
            serde_json::from_str(&row.skills).map_err(|e| CoreError::Database {
                operation: "decode".to_string(),
                details: format!("invalid skills for internship '{}': {}", row.id, e),
            })?;
        Ok(Internship {
            status: parse_enum("status", &row.status)?,
            skills,
            id: row.id,
            company_id: row.company_id,
            title: row.title,
            description: row.description,
            location: row.location,
            remote: row.remote,
            stipend: row.stipend,
            duration_weeks: row.duration_weeks,
            deadline: row.deadline,
            review_note: row.review_note,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct ApplicationRow {
    id: String,
    internship_id: String,
    student_id: String,
    cover_letter: Option<String>,
    resume_url: Option<String>,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ApplicationRow> for Application {
    type Error = CoreError;

    fn try_from(row: ApplicationRow) -> Result<Self, Self::Error> {
        Ok(Application {
            status: parse_enum("status", &row.status)?,
            id: row.id,
            internship_id: row.internship_id,
            student_id: row.student_id,
            cover_letter: row.cover_letter,
            resume_url: row.resume_url,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct NotificationRow {
    id: String,
    user_id: String,
    kind: String,
    title: String,
    message: String,
    link: Option<String>,
    read: bool,
    created_at: DateTime<Utc>,
}

impl TryFrom<NotificationRow> for Notification {
    type Error = CoreError;

    fn try_from(row: NotificationRow) -> Result<Self, Self::Error> {
        Ok(Notification {
            kind: parse_enum("kind", &row.kind)?,
            id: row.id,
            user_id: row.user_id,
            title: row.title,
            message: row.message,
            link: row.link,
            read: row.read,
            created_at: row.created_at,
        })
    }
}

fn convert_all<R, T>(rows: Vec<R>) -> Result<Vec<T>, CoreError>
where
    T: TryFrom<R, Error = CoreError>,
{
    rows.into_iter().map(T::try_from).collect()
}

const USER_COLUMNS: &str =
    "id, email, name, role, status, headline, university, created_at, updated_at";
const COMPANY_COLUMNS: &str = "id, owner_id, name, description, website, location, status, review_note, created_at, updated_at";
const INTERNSHIP_COLUMNS: &str = "id, company_id, title, description, location, remote, stipend, duration_weeks, skills, deadline, status, review_note, created_at, updated_at";
const APPLICATION_COLUMNS: &str =
    "id, internship_id, student_id, cover_letter, resume_url, status, created_at, updated_at";
const NOTIFICATION_COLUMNS: &str = "id, user_id, kind, title, message, link, read, created_at";

#[async_trait::async_trait]
impl PrimaryStore for SqlitePrimaryStore {
    async fn health_check(&self) -> Result<bool, CoreError> {
        let row: (i64,) = sqlx::query_as("SELECT 1").fetch_one(&self.pool).await?;
        Ok(row.0 == 1)
    }

    async fn existing_keys(
        &self,
        collection: &str,
        keys: &[String],
    ) -> Result<HashSet<String>, CoreError> {
        let table = table_for(collection)?;
        let mut found = HashSet::with_capacity(keys.len());

        for batch in keys.chunks(KEY_BATCH) {
            let mut query =
                QueryBuilder::<Sqlite>::new(format!("SELECT id FROM {table} WHERE id IN ("));
            let mut ids = query.separated(", ");
            for key in batch {
                ids.push_bind(key);
            }
            ids.push_unseparated(")");

            let rows: Vec<(String,)> = query.build_query_as().fetch_all(&self.pool).await?;
            found.extend(rows.into_iter().map(|(id,)| canonical_key(&id)));
        }

        Ok(found)
    }

    // ------------------------------------------------------------------------
    // Users
    // ------------------------------------------------------------------------

    async fn get_user(&self, id: &str) -> Result<Option<User>, CoreError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(User::try_from).transpose()
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, CoreError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = ?"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        row.map(User::try_from).transpose()
    }

    async fn list_users(&self, filter: &UserFilter) -> Result<Vec<User>, CoreError> {
        let rows = sqlx::query_as::<_, UserRow>(&format!(
            r#"
            SELECT {USER_COLUMNS}
            FROM users
            WHERE (?1 IS NULL OR role = ?1)
              AND (?2 IS NULL OR status = ?2)
              AND (?3 IS NULL OR email = ?3)
            ORDER BY created_at DESC, id DESC
            "#
        ))
        .bind(filter.role.as_ref().map(|r| r.as_ref()))
        .bind(filter.status.as_ref().map(|s| s.as_ref()))
        .bind(filter.email.as_deref())
        .fetch_all(&self.pool)
        .await?;

        convert_all(rows)
    }

    async fn insert_user(&self, user: &User) -> Result<(), CoreError> {
        sqlx::query(
            r#"
            INSERT INTO users (id, email, name, role, status, headline, university, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&user.id)
        .bind(&user.email)
        .bind(&user.name)
        .bind(user.role.as_ref())
        .bind(user.status.as_ref())
        .bind(&user.headline)
        .bind(&user.university)
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn update_user(&self, user: &User) -> Result<bool, CoreError> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET email = ?, name = ?, role = ?, status = ?, headline = ?, university = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&user.email)
        .bind(&user.name)
        .bind(user.role.as_ref())
        .bind(user.status.as_ref())
        .bind(&user.headline)
        .bind(&user.university)
        .bind(user.updated_at)
        .bind(&user.id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    // ------------------------------------------------------------------------
    // Companies
    // ------------------------------------------------------------------------

    async fn get_company(&self, id: &str) -> Result<Option<Company>, CoreError> {
        let row = sqlx::query_as::<_, CompanyRow>(&format!(
            "SELECT {COMPANY_COLUMNS} FROM companies WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Company::try_from).transpose()
    }

    async fn list_companies(&self, filter: &CompanyFilter) -> Result<Vec<Company>, CoreError> {
        let rows = sqlx::query_as::<_, CompanyRow>(&format!(
            r#"
            SELECT {COMPANY_COLUMNS}
            FROM companies
            WHERE (?1 IS NULL OR owner_id = ?1)
              AND (?2 IS NULL OR status = ?2)
            ORDER BY created_at DESC, id DESC
            "#
        ))
        .bind(filter.owner_id.as_deref())
        .bind(filter.status.as_ref().map(|s| s.as_ref()))
        .fetch_all(&self.pool)
        .await?;

        convert_all(rows)
    }

    async fn insert_company(&self, company: &Company) -> Result<(), CoreError> {
        sqlx::query(
            r#"
            INSERT INTO companies (id, owner_id, name, description, website, location, status, review_note, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&company.id)
        .bind(&company.owner_id)
        .bind(&company.name)
        .bind(&company.description)
        .bind(&company.website)
        .bind(&company.location)
        .bind(company.status.as_ref())
        .bind(&company.review_note)
        .bind(company.created_at)
        .bind(company.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn update_company(&self, company: &Company) -> Result<bool, CoreError> {
        let result = sqlx::query(
            r#"
            UPDATE companies
            SET owner_id = ?, name = ?, description = ?, website = ?, location = ?,
                status = ?, review_note = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&company.owner_id)
        .bind(&company.name)
        .bind(&company.description)
        .bind(&company.website)
        .bind(&company.location)
        .bind(company.status.as_ref())
        .bind(&company.review_note)
        .bind(company.updated_at)
        .bind(&company.id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    // ------------------------------------------------------------------------
    // Internships
    // ------------------------------------------------------------------------

    async fn get_internship(&self, id: &str) -> Result<Option<Internship>, CoreError> {
        let row = sqlx::query_as::<_, InternshipRow>(&format!(
            "SELECT {INTERNSHIP_COLUMNS} FROM internships WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Internship::try_from).transpose()
    }

    async fn list_internships(
        &self,
        filter: &InternshipFilter,
    ) -> Result<Vec<Internship>, CoreError> {
        let rows = sqlx::query_as::<_, InternshipRow>(&format!(
            r#"
            SELECT {INTERNSHIP_COLUMNS}
            FROM internships
            WHERE (?1 IS NULL OR company_id = ?1)
              AND (?2 IS NULL OR status = ?2)
            ORDER BY created_at DESC, id DESC
            "#
        ))
        .bind(filter.company_id.as_deref())
        .bind(filter.status.as_ref().map(|s| s.as_ref()))
        .fetch_all(&self.pool)
        .await?;

        convert_all(rows)
    }

    async fn insert_internship(&self, internship: &Internship) -> Result<(), CoreError> {
        let skills = serde_json::to_string(&internship.skills)?;
        sqlx::query(
            r#"
            INSERT INTO internships (
                id, company_id, title, description, location, remote, stipend,
                duration_weeks, skills, deadline, status, review_note, created_at, updated_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&internship.id)
        .bind(&internship.company_id)
        .bind(&internship.title)
        .bind(&internship.description)
        .bind(&internship.location)
        .bind(internship.remote)
        .bind(internship.stipend)
        .bind(internship.duration_weeks)
        .bind(skills)
        .bind(internship.deadline)
        .bind(internship.status.as_ref())
        .bind(&internship.review_note)
        .bind(internship.created_at)
        .bind(internship.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn update_internship(&self, internship: &Internship) -> Result<bool, CoreError> {
        let skills = serde_json::to_string(&internship.skills)?;
        let result = sqlx::query(
            r#"
            UPDATE internships
            SET company_id = ?, title = ?, description = ?, location = ?, remote = ?,
                stipend = ?, duration_weeks = ?, skills = ?, deadline = ?, status = ?,
                review_note = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&internship.company_id)
        .bind(&internship.title)
        .bind(&internship.description)
        .bind(&internship.location)
        .bind(internship.remote)
        .bind(internship.stipend)
        .bind(internship.duration_weeks)
        .bind(skills)
        .bind(internship.deadline)
        .bind(internship.status.as_ref())
        .bind(&internship.review_note)
        .bind(internship.updated_at)
        .bind(&internship.id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete_internship(&self, id: &str) -> Result<bool, CoreError> {
        let result = sqlx::query("DELETE FROM internships WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    // ------------------------------------------------------------------------
    // Applications
    // ------------------------------------------------------------------------

    async fn get_application(&self, id: &str) -> Result<Option<Application>, CoreError> {
        let row = sqlx::query_as::<_, ApplicationRow>(&format!(
            "SELECT {APPLICATION_COLUMNS} FROM applications WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Application::try_from).transpose()
    }

    async fn list_applications(
        &self,
        filter: &ApplicationFilter,
    ) -> Result<Vec<Application>, CoreError> {
        let rows = sqlx::query_as::<_, ApplicationRow>(&format!(
            r#"
            SELECT {APPLICATION_COLUMNS}
            FROM applications
            WHERE (?1 IS NULL OR internship_id = ?1)
              AND (?2 IS NULL OR student_id = ?2)
              AND (?3 IS NULL OR status = ?3)
            ORDER BY created_at DESC, id DESC
            "#
        ))
        .bind(filter.internship_id.as_deref())
        .bind(filter.student_id.as_deref())
        .bind(filter.status.as_ref().map(|s| s.as_ref()))
        .fetch_all(&self.pool)
        .await?;

        convert_all(rows)
    }

    async fn insert_application(&self, application: &Application) -> Result<(), CoreError> {
        sqlx::query(
            r#"
            INSERT INTO applications (id, internship_id, student_id, cover_letter, resume_url, status, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&application.id)
        .bind(&application.internship_id)
        .bind(&application.student_id)
        .bind(&application.cover_letter)
        .bind(&application.resume_url)
        .bind(application.status.as_ref())
        .bind(application.created_at)
        .bind(application.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn update_application(&self, application: &Application) -> Result<bool, CoreError> {
        let result = sqlx::query(
            r#"
            UPDATE applications
            SET cover_letter = ?, resume_url = ?, status = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&application.cover_letter)
        .bind(&application.resume_url)
        .bind(application.status.as_ref())
        .bind(application.updated_at)
        .bind(&application.id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    // ------------------------------------------------------------------------
    // Notifications
    // ------------------------------------------------------------------------

    async fn get_notification(&self, id: &str) -> Result<Option<Notification>, CoreError> {
        let row = sqlx::query_as::<_, NotificationRow>(&format!(
            "SELECT {NOTIFICATION_COLUMNS} FROM notifications WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Notification::try_from).transpose()
    }

    async fn list_notifications(
        &self,
        filter: &NotificationFilter,
    ) -> Result<Vec<Notification>, CoreError> {
        let rows = sqlx::query_as::<_, NotificationRow>(&format!(
            r#"
            SELECT {NOTIFICATION_COLUMNS}
            FROM notifications
            WHERE (?1 IS NULL OR user_id = ?1)
              AND (NOT ?2 OR read = 0)
            ORDER BY created_at DESC, id DESC
            "#
        ))
        .bind(filter.user_id.as_deref())
        .bind(filter.unread_only)
        .fetch_all(&self.pool)
        .await?;

        convert_all(rows)
    }

    async fn insert_notification(&self, notification: &Notification) -> Result<(), CoreError> {
        sqlx::query(
            r#"
            INSERT INTO notifications (id, user_id, kind, title, message, link, read, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&notification.id)
        .bind(&notification.user_id)
        .bind(notification.kind.as_ref())
        .bind(&notification.title)
        .bind(&notification.message)
        .bind(&notification.link)
        .bind(notification.read)
        .bind(notification.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn update_notification(
        &self,
        notification: &Notification,
    ) -> Result<bool, CoreError> {
        let result = sqlx::query("UPDATE notifications SET read = ? WHERE id = ?")
            .bind(notification.read)
            .bind(&notification.id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
