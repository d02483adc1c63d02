//! Thread-safe in-memory resource store.
//!
//! Documents are kept in a single map keyed by [`StorageKey`] behind a tokio
//! `RwLock`. Intended for tests, demos and single-process deployments.

use crate::storage::{ConditionalResult, StorageError, StorageKey, StorageProvider};
use log::trace;
use serde_json::Value;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use tokio::sync::RwLock;

/// In-memory [`StorageProvider`]; clones share the same data.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStorage {
    data: Arc<RwLock<HashMap<StorageKey, Value>>>,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get storage statistics for debugging and monitoring.
    pub async fn stats(&self) -> InMemoryStorageStats {
        let data_guard = self.data.read().await;
        let tenants: BTreeSet<&str> = data_guard.keys().map(StorageKey::tenant_id).collect();
        let resource_types: BTreeSet<(&str, &str)> = data_guard
            .keys()
            .map(|key| (key.tenant_id(), key.resource_type()))
            .collect();

        InMemoryStorageStats {
            tenant_count: tenants.len(),
            resource_type_count: resource_types.len(),
            total_resources: data_guard.len(),
        }
    }

    /// Clear all data (useful for testing).
    pub async fn clear(&self) {
        self.data.write().await.clear();
    }
}

impl StorageProvider for InMemoryStorage {
    type Error = StorageError;

    async fn put(&self, key: StorageKey, data: Value) -> Result<Value, Self::Error> {
        check_object(&key, &data)?;
        trace!("Storing resource {key}");
        self.data.write().await.insert(key, data.clone());
        Ok(data)
    }

    async fn conditional_put(
        &self,
        key: StorageKey,
        expected: Value,
        data: Value,
    ) -> Result<ConditionalResult<Value>, Self::Error> {
        check_object(&key, &data)?;
        let mut data_guard = self.data.write().await;
        let Some(current) = data_guard.get_mut(&key) else {
            return Ok(ConditionalResult::NotFound);
        };
        if *current != expected {
            trace!("Conditional store of {key} rejected, resource changed");
            return Ok(ConditionalResult::Mismatch(current.clone()));
        }
        trace!("Storing resource {key}");
        *current = data.clone();
        Ok(ConditionalResult::Success(data))
    }

    async fn get(&self, key: StorageKey) -> Result<Option<Value>, Self::Error> {
        Ok(self.data.read().await.get(&key).cloned())
    }

    async fn delete(&self, key: StorageKey) -> Result<bool, Self::Error> {
        Ok(self.data.write().await.remove(&key).is_some())
    }

    async fn exists(&self, key: StorageKey) -> Result<bool, Self::Error> {
        Ok(self.data.read().await.contains_key(&key))
    }
}

fn check_object(key: &StorageKey, data: &Value) -> Result<(), StorageError> {
    if data.is_object() {
        return Ok(());
    }
    Err(StorageError::invalid_data_with_cause(
        format!("Cannot store {key}"),
        "resource must be a JSON object",
    ))
}

/// Statistics about the current state of in-memory storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InMemoryStorageStats {
    /// Number of tenants with data
    pub tenant_count: usize,
    /// Number of distinct resource types per tenant
    pub resource_type_count: usize,
    /// Total number of individual resources
    pub total_resources: usize,
}
