//! Resource store abstraction used by the PATCH service.
//!
//! The store only moves JSON documents in and out. Schema handling, PATCH
//! semantics and versioning all live above it in [`crate::service`].
//!
//! # Example Usage
//!
//! ```rust
//! use scim_patch::storage::{InMemoryStorage, StorageKey, StorageProvider};
//! use serde_json::json;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let storage = InMemoryStorage::new();
//! let key = StorageKey::new("tenant1", "User", "123");
//!
//! storage.put(key.clone(), json!({"id": "123", "userName": "bjensen"})).await?;
//! assert!(storage.get(key.clone()).await?.is_some());
//! assert!(storage.delete(key).await?);
//! # Ok(())
//! # }
//! ```

pub mod errors;
pub mod in_memory;

pub use errors::StorageError;
pub use in_memory::{InMemoryStorage, InMemoryStorageStats};

use serde_json::Value;
use std::fmt;
use std::future::Future;

/// Location of one resource: `tenant_id` → `resource_type` → `resource_id`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StorageKey {
    tenant_id: String,
    resource_type: String,
    resource_id: String,
}

impl StorageKey {
    pub fn new(
        tenant_id: impl Into<String>,
        resource_type: impl Into<String>,
        resource_id: impl Into<String>,
    ) -> Self {
        Self {
            tenant_id: tenant_id.into(),
            resource_type: resource_type.into(),
            resource_id: resource_id.into(),
        }
    }

    pub fn tenant_id(&self) -> &str {
        &self.tenant_id
    }

    pub fn resource_type(&self) -> &str {
        &self.resource_type
    }

    pub fn resource_id(&self) -> &str {
        &self.resource_id
    }
}

impl fmt::Display for StorageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}",
            self.tenant_id, self.resource_type, self.resource_id
        )
    }
}

/// Outcome of a [`StorageProvider::conditional_put`].
#[derive(Debug, Clone, PartialEq)]
pub enum ConditionalResult<T> {
    /// The expected document was found and replaced
    Success(T),
    /// Another document is stored under the key; carries that document
    Mismatch(Value),
    /// Nothing is stored under the key
    NotFound,
}

impl<T> ConditionalResult<T> {
    pub fn is_success(&self) -> bool {
        matches!(self, ConditionalResult::Success(_))
    }
}

/// Async store for resource documents.
///
/// `put` replaces whatever is stored under the key and returns the stored
/// document. `conditional_put` does the same only while the stored document
/// still equals `expected`; the comparison and the write happen atomically.
/// `delete` reports whether the key existed.
pub trait StorageProvider: Send + Sync {
    /// The error type returned by storage operations.
    type Error: std::error::Error + Send + Sync + 'static;

    fn put(
        &self,
        key: StorageKey,
        data: Value,
    ) -> impl Future<Output = Result<Value, Self::Error>> + Send;

    fn conditional_put(
        &self,
        key: StorageKey,
        expected: Value,
        data: Value,
    ) -> impl Future<Output = Result<ConditionalResult<Value>, Self::Error>> + Send;

    fn get(
        &self,
        key: StorageKey,
    ) -> impl Future<Output = Result<Option<Value>, Self::Error>> + Send;

    fn delete(&self, key: StorageKey) -> impl Future<Output = Result<bool, Self::Error>> + Send;

    fn exists(&self, key: StorageKey) -> impl Future<Output = Result<bool, Self::Error>> + Send;
}
