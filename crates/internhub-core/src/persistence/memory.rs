// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! In-process document store for tests and ephemeral deployments.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use serde_json::{Map, Value};
use tokio::sync::RwLock;

use crate::document::{Filter, document_key};
use crate::error::CoreError;

use super::{DocumentStore, apply_set, prepare_insert};

/// Document store holding every collection in memory.
///
/// Can be switched into an unavailable state, in which every operation
/// fails with a document store error.
#[derive(Debug, Default)]
pub struct MemoryDocumentStore {
    collections: RwLock<HashMap<String, Vec<Value>>>,
    unavailable: AtomicBool,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store that fails every operation.
    pub fn failing() -> Self {
        let store = Self::default();
        store.set_unavailable(true);
        store
    }

    /// Toggle the unavailable state.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Insert raw documents, returning their keys.
    pub async fn seed(
        &self,
        collection: &str,
        documents: impl IntoIterator<Item = Value>,
    ) -> Result<Vec<String>, CoreError> {
        let mut keys = Vec::new();
        for document in documents {
            keys.push(self.insert(collection, document).await?);
        }
        Ok(keys)
    }

    fn ensure_available(&self, operation: &str) -> Result<(), CoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(CoreError::document(operation, "document store unavailable"));
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn find(&self, collection: &str, filter: &Filter) -> Result<Vec<Value>, CoreError> {
        self.ensure_available("find")?;
        let collections = self.collections.read().await;
        Ok(collections
            .get(collection)
            .map(|documents| {
                documents
                    .iter()
                    .filter(|document| filter.matches(document))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn insert(&self, collection: &str, document: Value) -> Result<String, CoreError> {
        self.ensure_available("insert")?;
        let (key, document) = prepare_insert(document)?;

        let mut collections = self.collections.write().await;
        let documents = collections.entry(collection.to_string()).or_default();
        if documents
            .iter()
            .any(|existing| document_key(existing).as_deref() == Some(key.as_str()))
        {
            return Err(CoreError::Conflict(format!(
                "duplicate document key '{}' in '{}'",
                key, collection
            )));
        }
        documents.push(document);
        Ok(key)
    }

    async fn update_one(
        &self,
        collection: &str,
        filter: &Filter,
        set: Map<String, Value>,
    ) -> Result<bool, CoreError> {
        self.ensure_available("update")?;
        let mut collections = self.collections.write().await;
        let Some(document) = collections
            .get_mut(collection)
            .and_then(|documents| documents.iter_mut().find(|d| filter.matches(d)))
        else {
            return Ok(false);
        };
        apply_set(document, set);
        Ok(true)
    }

    async fn delete_one(&self, collection: &str, filter: &Filter) -> Result<bool, CoreError> {
        self.ensure_available("delete")?;
        let mut collections = self.collections.write().await;
        let Some(documents) = collections.get_mut(collection) else {
            return Ok(false);
        };
        match documents.iter().position(|d| filter.matches(d)) {
            Some(index) => {
                documents.remove(index);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn health_check(&self) -> Result<bool, CoreError> {
        Ok(!self.unavailable.load(Ordering::SeqCst))
    }
}
