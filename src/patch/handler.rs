//! PATCH request orchestration and operation handler callbacks.
//!
//! [`PatchRequestHandler`] runs every request operation through
//! classification and mutation on a working copy of the resource. Handler
//! notifications are buffered in the resulting [`AppliedPatch`] and delivered
//! only once the whole request has been applied, so a rejected request
//! notifies nobody and leaves the caller's resource untouched. Callers that
//! persist the result deliver them after the write succeeded.

use chrono::{SecondsFormat, Utc};
use log::debug;
use serde_json::Value;
use std::error::Error;

use crate::config::PatchConfig;
use crate::error::{PatchError, PatchResult};
use crate::resource::ResourceNode;
use crate::schema::ResourceSchemas;

use super::classifier::OperationClassifier;
use super::engine::{apply_operation, has_target};
use super::operation::{OperationKind, PatchOperation};
use super::request::{PatchOp, PatchOpRequest};
use super::workarounds;

/// Callback receiving every applied operation of a successful request.
///
/// Implementations mirror the change into a backing store. An error aborts
/// delivery of the remaining notifications and fails the request.
pub trait PatchOperationHandler {
    fn handle_operation(
        &mut self,
        operation: &PatchOperation<'_>,
    ) -> Result<(), Box<dyn Error + Send + Sync>>;
}

impl<F> PatchOperationHandler for F
where
    F: FnMut(&PatchOperation<'_>) -> Result<(), Box<dyn Error + Send + Sync>>,
{
    fn handle_operation(
        &mut self,
        operation: &PatchOperation<'_>,
    ) -> Result<(), Box<dyn Error + Send + Sync>> {
        self(operation)
    }
}

/// Result of a completed PATCH request.
#[derive(Debug, Clone, PartialEq)]
pub struct PatchOutcome {
    /// The patched resource
    pub resource: ResourceNode,
    /// Whether any operation changed the resource
    pub changed: bool,
    /// Number of handler notifications delivered
    pub notifications: usize,
}

/// A request applied to a working copy whose notifications are still pending.
#[derive(Debug, Clone)]
pub struct AppliedPatch<'a> {
    /// The patched resource
    pub resource: ResourceNode,
    /// Whether any operation changed the resource
    pub changed: bool,
    operations: Vec<PatchOperation<'a>>,
}

impl<'a> AppliedPatch<'a> {
    /// The applied operations in request order.
    pub fn operations(&self) -> &[PatchOperation<'a>] {
        &self.operations
    }

    /// Deliver the buffered notifications to `handler`, in order.
    pub fn notify<H>(self, handler: &mut H) -> PatchResult<PatchOutcome>
    where
        H: PatchOperationHandler + ?Sized,
    {
        for operation in &self.operations {
            handler
                .handle_operation(operation)
                .map_err(PatchError::Handler)?;
        }
        Ok(PatchOutcome {
            notifications: self.operations.len(),
            resource: self.resource,
            changed: self.changed,
        })
    }
}

/// Applies PATCH requests to resources of one resource type.
#[derive(Debug, Clone)]
pub struct PatchRequestHandler<'a> {
    schemas: &'a ResourceSchemas,
    config: PatchConfig,
}

impl<'a> PatchRequestHandler<'a> {
    pub fn new(schemas: &'a ResourceSchemas) -> Self {
        Self::with_config(schemas, PatchConfig::default())
    }

    pub fn with_config(schemas: &'a ResourceSchemas, config: PatchConfig) -> Self {
        Self { schemas, config }
    }

    pub fn config(&self) -> &PatchConfig {
        &self.config
    }

    /// Apply `request` to a copy of `resource` and deliver the notifications.
    pub fn patch<H>(
        &self,
        resource: &ResourceNode,
        request: &PatchOpRequest,
        handler: &mut H,
    ) -> PatchResult<PatchOutcome>
    where
        H: PatchOperationHandler + ?Sized,
    {
        self.apply(resource, request)?.notify(handler)
    }

    /// Apply `request` to a copy of `resource` without notifying anyone.
    ///
    /// Operations are applied in request order, each seeing the effect of the
    /// previous ones. A required attribute or extension that the request
    /// removes fails the request. If anything changed `meta.lastModified` is
    /// refreshed.
    pub fn apply(
        &self,
        resource: &ResourceNode,
        request: &PatchOpRequest,
    ) -> PatchResult<AppliedPatch<'_>> {
        self.check_request(request)?;

        let classifier = OperationClassifier::new(self.schemas, &self.config);
        let mut working = resource.clone();
        let mut applied = Vec::new();
        let mut changed = false;

        for (index, entry) in request.operations.iter().enumerate() {
            let operations = classifier.classify(entry).inspect_err(|error| {
                debug!("PATCH operation {index} ({}) rejected: {error}", entry.op);
            })?;
            for operation in operations {
                let operation =
                    workarounds::filtered_sub_attribute_as_element(&self.config, &working, operation);
                if !self.config.do_not_fail_on_no_target && !has_target(&working, &operation) {
                    debug!("PATCH operation {index} ({}) has no target", entry.op);
                    return Err(PatchError::no_target(
                        entry
                            .target_path()
                            .map_or_else(|| operation.target_name(), str::to_string),
                    ));
                }
                changed |= apply_operation(&mut working, &operation);
                applied.push(operation);
            }
        }

        if changed {
            self.check_required(resource, &working)?;
            working.set_last_modified(&Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true));
        }
        debug!(
            "PATCH of {} '{}' applied {} operation(s), changed: {}",
            self.schemas.name(),
            working.id().unwrap_or_default(),
            applied.len(),
            changed
        );

        Ok(AppliedPatch {
            resource: working,
            changed,
            operations: applied,
        })
    }

    /// Required attributes and required extensions present before the
    /// request must still be present after it. Server-assigned readOnly
    /// attributes are not checked.
    fn check_required(&self, before: &ResourceNode, after: &ResourceNode) -> PatchResult<()> {
        let main = self.schemas.main_schema();
        let extensions = self
            .schemas
            .extensions()
            .map(|extension| (&extension.schema, true));
        for (schema, extension) in std::iter::once((main, false)).chain(extensions) {
            for definition in schema.attributes.iter().filter(|definition| definition.required) {
                let Some(attribute) = self.schemas.attribute_in(schema, extension, &definition.name)
                else {
                    continue;
                };
                if attribute.is_read_only() {
                    continue;
                }
                if before.value_of(&attribute).is_some() && after.value_of(&attribute).is_none() {
                    let name = attribute.full_name();
                    return Err(PatchError::required(
                        &name,
                        format!("Required attribute '{name}' is missing"),
                    ));
                }
            }
        }
        for extension in self.schemas.extensions().filter(|extension| extension.required) {
            let urn = &extension.schema.id;
            if before.has_extension(urn) && !after.has_extension(urn) {
                return Err(PatchError::required(
                    urn,
                    format!("Required extension '{urn}' must not be removed"),
                ));
            }
        }
        Ok(())
    }

    fn check_request(&self, request: &PatchOpRequest) -> PatchResult<()> {
        if !self.config.supported {
            return Err(PatchError::invalid_operation("PATCH is not supported"));
        }
        if !request.has_patch_schema() {
            return Err(PatchError::invalid_operation(format!(
                "Request schemas {:?} do not contain '{}'",
                request.schemas,
                super::request::PATCH_OP_SCHEMA
            )));
        }
        if request.operations.len() > self.config.max_operations {
            return Err(PatchError::invalid_operation(format!(
                "Request contains {} operations but at most {} are allowed",
                request.operations.len(),
                self.config.max_operations
            )));
        }
        Ok(())
    }
}

/// An owned copy of one notification.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedOperation {
    pub kind: OperationKind,
    pub op: PatchOp,
    /// Full name of the attribute, or the URN of a removed extension
    pub target: String,
    /// For sub-attribute variants, the full name of the multi-valued parent
    pub parent: Option<String>,
    pub values: Vec<Value>,
    pub filter: Option<String>,
}

impl From<&PatchOperation<'_>> for RecordedOperation {
    fn from(operation: &PatchOperation<'_>) -> Self {
        let parent = match operation {
            PatchOperation::MultivaluedComplexSimpleSubAttribute { attribute, .. }
            | PatchOperation::MultivaluedComplexMultivaluedSubAttribute { attribute, .. } => {
                Some(attribute.full_name())
            }
            _ => None,
        };
        Self {
            kind: operation.kind(),
            op: operation.op(),
            target: operation.target_name(),
            parent,
            values: operation.values(),
            filter: operation.filter().map(ToString::to_string),
        }
    }
}

/// Handler that keeps a copy of every notification.
#[derive(Debug, Clone, Default)]
pub struct RecordingOperationHandler {
    pub operations: Vec<RecordedOperation>,
}

impl RecordingOperationHandler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn kinds(&self) -> Vec<OperationKind> {
        self.operations.iter().map(|operation| operation.kind).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }
}

impl PatchOperationHandler for RecordingOperationHandler {
    fn handle_operation(
        &mut self,
        operation: &PatchOperation<'_>,
    ) -> Result<(), Box<dyn Error + Send + Sync>> {
        self.operations.push(RecordedOperation::from(operation));
        Ok(())
    }
}

/// Handler used by the service layer: logs and counts notifications.
#[derive(Debug, Clone, Default)]
pub struct StoreOperationHandler {
    handled: usize,
}

impl StoreOperationHandler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn handled(&self) -> usize {
        self.handled
    }
}

impl PatchOperationHandler for StoreOperationHandler {
    fn handle_operation(
        &mut self,
        operation: &PatchOperation<'_>,
    ) -> Result<(), Box<dyn Error + Send + Sync>> {
        debug!("Storing patch operation: {operation}");
        self.handled += 1;
        Ok(())
    }
}
