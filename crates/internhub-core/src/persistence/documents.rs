// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! SQLite-backed document store.
//!
//! Every document is one row of the `documents` table with its body kept as
//! JSON text. `doc_id` holds the canonical key of `_id`, so key lookups hit
//! the primary key; every other condition is evaluated in Rust.

use std::path::Path;

use serde_json::{Map, Value};
use sqlx::SqlitePool;
use sqlx::sqlite::SqlitePoolOptions;

use crate::document::Filter;
use crate::error::CoreError;

use super::{DocumentStore, apply_set, prepare_insert};

static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations/documents");

/// Document store over a SQLite database.
///
/// Must not share a database with [`super::SqlitePrimaryStore`]: each keeps
/// its own migration history.
#[derive(Clone)]
pub struct SqliteDocumentStore {
    pool: SqlitePool,
}

/// Map a driver error onto the document store's error space.
fn store_error(operation: &'static str) -> impl Fn(sqlx::Error) -> CoreError {
    move |err| {
        if let sqlx::Error::Database(db_err) = &err
            && db_err.is_unique_violation()
        {
            return CoreError::Conflict(format!("duplicate document key: {}", db_err.message()));
        }
        CoreError::document(operation, err)
    }
}

impl SqliteDocumentStore {
    /// Create a document store from an existing, migrated pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Connect to a SQLite URL and install the documents table.
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
        .map_err(store_error("connect"))?;

        MIGRATOR
            .run(&pool)
            .await
            .map_err(|e| CoreError::document("migrate", e))?;

        Ok(Self { pool })
    }

    /// Open (or create) a document database file.
    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self, CoreError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|e| CoreError::document("create_dir", e))?;
        }
        Self::connect(&format!("sqlite:{}?mode=rwc", path.to_string_lossy())).await
    }

    /// Fresh in-memory document store.
    pub async fn in_memory() -> Result<Self, CoreError> {
        Self::connect("sqlite::memory:").await
    }

    /// The underlying pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Candidate rows `(doc_id, body)` for a filter, in insertion order.
    async fn candidates(
        &self,
        collection: &str,
        filter: &Filter,
    ) -> Result<Vec<(String, Value)>, CoreError> {
        let rows: Vec<(String, String)> = match filter.id_key() {
            Some(key) => {
                sqlx::query_as(
                    "SELECT doc_id, body FROM documents WHERE collection = ? AND doc_id = ?",
                )
                .bind(collection)
                .bind(key)
                .fetch_all(&self.pool)
                .await
            }
            None => {
                sqlx::query_as(
                    "SELECT doc_id, body FROM documents WHERE collection = ? ORDER BY seq ASC",
                )
                .bind(collection)
                .fetch_all(&self.pool)
                .await
            }
        }
        .map_err(store_error("find"))?;

        let mut matched = Vec::with_capacity(rows.len());
        for (doc_id, body) in rows {
            let document: Value = serde_json::from_str(&body).map_err(|e| {
                CoreError::document("find", format!("corrupt body for '{}': {}", doc_id, e))
            })?;
            if filter.matches(&document) {
                matched.push((doc_id, document));
            }
        }
        Ok(matched)
    }
}

#[async_trait::async_trait]
impl DocumentStore for SqliteDocumentStore {
    async fn find(&self, collection: &str, filter: &Filter) -> Result<Vec<Value>, CoreError> {
        Ok(self
            .candidates(collection, filter)
            .await?
            .into_iter()
            .map(|(_, document)| document)
            .collect())
    }

    async fn insert(&self, collection: &str, document: Value) -> Result<String, CoreError> {
        let (key, document) = prepare_insert(document)?;
        let body = serde_json::to_string(&document)?;

        sqlx::query(
            r#"
            INSERT INTO documents (collection, doc_id, body, seq)
            VALUES (?1, ?2, ?3, (SELECT COALESCE(MAX(seq), 0) + 1 FROM documents WHERE collection = ?1))
            "#,
        )
        .bind(collection)
        .bind(&key)
        .bind(body)
        .execute(&self.pool)
        .await
        .map_err(store_error("insert"))?;

        Ok(key)
    }

    async fn update_one(
        &self,
        collection: &str,
        filter: &Filter,
        set: Map<String, Value>,
    ) -> Result<bool, CoreError> {
        let Some((doc_id, mut document)) =
            self.candidates(collection, filter).await?.into_iter().next()
        else {
            return Ok(false);
        };

        apply_set(&mut document, set);
        let body = serde_json::to_string(&document)?;

        let result = sqlx::query("UPDATE documents SET body = ? WHERE collection = ? AND doc_id = ?")
            .bind(body)
            .bind(collection)
            .bind(&doc_id)
            .execute(&self.pool)
            .await
            .map_err(store_error("update"))?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete_one(&self, collection: &str, filter: &Filter) -> Result<bool, CoreError> {
        let Some((doc_id, _)) = self.candidates(collection, filter).await?.into_iter().next()
        else {
            return Ok(false);
        };

        let result = sqlx::query("DELETE FROM documents WHERE collection = ? AND doc_id = ?")
            .bind(collection)
            .bind(&doc_id)
            .execute(&self.pool)
            .await
            .map_err(store_error("delete"))?;

        Ok(result.rows_affected() > 0)
    }

    async fn count(&self, collection: &str, filter: &Filter) -> Result<usize, CoreError> {
        if filter.is_empty() {
            let (count,): (i64,) =
                sqlx::query_as("SELECT COUNT(*) FROM documents WHERE collection = ?")
                    .bind(collection)
                    .fetch_one(&self.pool)
                    .await
                    .map_err(store_error("count"))?;
            return Ok(count as usize);
        }
        Ok(self.candidates(collection, filter).await?.len())
    }

    async fn health_check(&self) -> Result<bool, CoreError> {
        let row: (i64,) = sqlx::query_as("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map_err(store_error("health_check"))?;
        Ok(row.0 == 1)
    }
}
