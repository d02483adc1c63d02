//! Storage-backed PATCH service.
//!
//! [`PatchService`] loads a resource from a [`StorageProvider`], checks the
//! client's `If-Match` version, applies the PATCH request with
//! [`PatchRequestHandler`] and writes the result back with a compare and
//! write against the document it loaded. A concurrent writer that got there
//! first makes the request fail with a concurrent modification error.
//!
//! Operation handlers are notified only after the write succeeded. A handler
//! failure restores the previous document. A rejected request never reaches
//! the store, and an unchanged resource is not rewritten.
//!
//! ```rust
//! use scim_patch::patch::{PatchOpRequest, PatchRequestOperation};
//! use scim_patch::service::PatchService;
//! use scim_patch::storage::{InMemoryStorage, StorageKey};
//! use serde_json::json;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let service = PatchService::with_embedded_schemas(InMemoryStorage::new())?;
//! let key = StorageKey::new("tenant1", "User", "1");
//! service.store(key.clone(), json!({"id": "1", "userName": "bjensen"})).await?;
//!
//! let request = PatchOpRequest::new(vec![PatchRequestOperation::add("title", json!("Manager"))]);
//! let patched = service.patch(key, &request, None).await?;
//! assert_eq!(patched.resource.attribute("title"), Some(&json!("Manager")));
//! # Ok(())
//! # }
//! ```

use log::{debug, info, trace, warn};
use serde_json::Value;
use std::collections::HashMap;

use crate::config::PatchConfig;
use crate::error::{ScimError, ScimResult};
use crate::patch::{PatchOpRequest, PatchOperationHandler, PatchRequestHandler, StoreOperationHandler};
use crate::resource::{HttpVersion, RawVersion, ResourceNode};
use crate::schema::ResourceSchemas;
use crate::storage::{ConditionalResult, StorageError, StorageKey, StorageProvider};

/// A resource together with the version of its stored representation.
#[derive(Debug, Clone, PartialEq)]
pub struct VersionedResource {
    pub resource: ResourceNode,
    pub version: RawVersion,
}

impl VersionedResource {
    pub fn new(resource: ResourceNode) -> Self {
        let version = RawVersion::from_resource(&resource);
        Self { resource, version }
    }

    /// The version in `ETag` header form.
    pub fn etag(&self) -> HttpVersion {
        HttpVersion::from(self.version.clone())
    }
}

/// Applies PATCH requests to stored resources.
#[derive(Debug)]
pub struct PatchService<S: StorageProvider> {
    storage: S,
    resource_types: HashMap<String, ResourceSchemas>,
    config: PatchConfig,
}

impl<S: StorageProvider> PatchService<S> {
    pub fn new(storage: S) -> Self {
        Self {
            storage,
            resource_types: HashMap::new(),
            config: PatchConfig::default(),
        }
    }

    /// A service serving the embedded User and Group resource types.
    pub fn with_embedded_schemas(storage: S) -> ScimResult<Self> {
        Ok(Self::new(storage)
            .register(ResourceSchemas::user()?)
            .register(ResourceSchemas::group()?))
    }

    /// Register the schemas of one resource type, keyed by its name.
    pub fn register(mut self, schemas: ResourceSchemas) -> Self {
        self.resource_types.insert(schemas.name().to_string(), schemas);
        self
    }

    pub fn with_config(mut self, config: PatchConfig) -> Self {
        self.config = config;
        self
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn resource_schemas(&self, resource_type: &str) -> ScimResult<&ResourceSchemas> {
        self.resource_types.get(resource_type).ok_or_else(|| {
            ScimError::invalid_request(format!("Unsupported resource type: {resource_type}"))
        })
    }

    /// Store a resource document, replacing any existing one.
    pub async fn store(&self, key: StorageKey, data: Value) -> ScimResult<VersionedResource> {
        let schemas = self.resource_schemas(key.resource_type())?;
        let resource = ResourceNode::from_json(data, schemas)?;
        self.write(key, &resource).await?;
        Ok(VersionedResource::new(resource))
    }

    /// Load a resource and its current version.
    pub async fn get(&self, key: StorageKey) -> ScimResult<Option<VersionedResource>> {
        let schemas = self.resource_schemas(key.resource_type())?;
        let Some(data) = self.storage.get(key).await.map_err(storage_error)? else {
            return Ok(None);
        };
        Ok(Some(VersionedResource::new(ResourceNode::from_json(
            data, schemas,
        )?)))
    }

    /// Patch a stored resource, logging applied operations.
    pub async fn patch(
        &self,
        key: StorageKey,
        request: &PatchOpRequest,
        if_match: Option<&HttpVersion>,
    ) -> ScimResult<VersionedResource> {
        let mut handler = StoreOperationHandler::new();
        let patched = self
            .patch_with_handler(key, request, if_match, &mut handler)
            .await?;
        trace!("Store handler received {} operation(s)", handler.handled());
        Ok(patched)
    }

    /// Patch a stored resource, reporting every applied operation to `handler`.
    pub async fn patch_with_handler<H>(
        &self,
        key: StorageKey,
        request: &PatchOpRequest,
        if_match: Option<&HttpVersion>,
        handler: &mut H,
    ) -> ScimResult<VersionedResource>
    where
        H: PatchOperationHandler + ?Sized,
    {
        let schemas = self.resource_schemas(key.resource_type())?;
        let stored = self
            .storage
            .get(key.clone())
            .await
            .map_err(storage_error)?
            .ok_or_else(|| ScimError::resource_not_found(key.resource_type(), key.resource_id()))?;
        let current = VersionedResource::new(ResourceNode::from_json(stored.clone(), schemas)?);

        if let Some(expected) = if_match {
            if *expected != current.version {
                debug!("If-Match {expected} does not match {key} at {}", current.version);
                return Err(ScimError::VersionMismatch {
                    expected: expected.to_string(),
                    current: current.etag().to_string(),
                });
            }
        }

        let patcher = PatchRequestHandler::with_config(schemas, self.config.clone());
        let applied = patcher.apply(&current.resource, request)?;

        if !applied.changed {
            debug!("PATCH of {key} left the resource unchanged");
            applied.notify(handler)?;
            return Ok(current);
        }

        let document = applied.resource.to_json();
        let written = self
            .storage
            .conditional_put(key.clone(), stored.clone(), document.clone())
            .await
            .map_err(storage_error)?;
        match written {
            ConditionalResult::Success(_) => {}
            ConditionalResult::NotFound => {
                debug!("{key} was deleted while being patched");
                return Err(ScimError::resource_not_found(
                    key.resource_type(),
                    key.resource_id(),
                ));
            }
            ConditionalResult::Mismatch(latest) => {
                let latest = RawVersion::from_resource(&ResourceNode::from_json(latest, schemas)?);
                debug!("{key} changed from {} to {latest} while being patched", current.version);
                return Err(StorageError::concurrent_modification(
                    &key,
                    current.version.as_str(),
                    latest.as_str(),
                )
                .into());
            }
        }

        let outcome = match applied.notify(handler) {
            Ok(outcome) => outcome,
            Err(error) => {
                self.restore(key, document, stored).await;
                return Err(error.into());
            }
        };
        let patched = VersionedResource::new(outcome.resource);
        info!("Patched {key}, new version {}", patched.version);
        Ok(patched)
    }

    /// Put back the document a failed request replaced, unless someone wrote
    /// over it in the meantime.
    async fn restore(&self, key: StorageKey, written: Value, previous: Value) {
        match self.storage.conditional_put(key.clone(), written, previous).await {
            Ok(ConditionalResult::Success(_)) => debug!("Restored {key} after handler failure"),
            Ok(_) => warn!("Could not restore {key}, it changed after the failed patch"),
            Err(error) => warn!("Could not restore {key}: {error}"),
        }
    }

    async fn write(&self, key: StorageKey, resource: &ResourceNode) -> ScimResult<()> {
        self.storage
            .put(key, resource.to_json())
            .await
            .map_err(storage_error)?;
        Ok(())
    }
}

fn storage_error<E>(error: E) -> ScimError
where
    E: std::error::Error + Send + Sync + 'static,
{
    ScimError::Storage(StorageError::internal_with_source(
        "storage operation failed",
        Box::new(error),
    ))
}
