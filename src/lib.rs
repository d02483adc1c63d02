//! SCIM 2.0 PATCH processing for Rust.
//!
//! Resolves PATCH operation paths against resource schemas, validates the
//! supplied values, classifies each request operation into a closed set of
//! semantic operations and applies them to an in-memory resource tree.
//!
//! # Core Components
//!
//! - [`PatchRequestHandler`] - Applies a whole PATCH request to a resource
//! - [`PatchOperation`] - The classified operation handed to callbacks
//! - [`PatchOperationHandler`] - Callback trait for mirroring changes into a store
//! - [`ResourceSchemas`] - Main schema and extensions of one resource type
//! - [`PatchService`] - Storage-backed PATCH with `If-Match` checks
//!
//! # Quick Start
//!
//! ```rust
//! use scim_patch::{PatchOpRequest, PatchRequestHandler, ResourceNode, ResourceSchemas};
//! use scim_patch::patch::{PatchRequestOperation, StoreOperationHandler};
//! use serde_json::json;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let schemas = ResourceSchemas::user()?;
//! let user = ResourceNode::from_json(
//!     json!({"id": "1", "userName": "bjensen", "emails": [{"value": "b@example.com"}]}),
//!     &schemas,
//! )?;
//!
//! let request = PatchOpRequest::new(vec![
//!     PatchRequestOperation::add("emails", json!([{"value": "babs@example.com", "primary": true}])),
//!     PatchRequestOperation::remove("emails[value eq \"b@example.com\"]"),
//! ]);
//!
//! let outcome = PatchRequestHandler::new(&schemas).patch(&user, &request, &mut StoreOperationHandler::new())?;
//! assert_eq!(
//!     outcome.resource.attribute("emails"),
//!     Some(&json!([{"value": "babs@example.com", "primary": true}]))
//! );
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod patch;
pub mod resource;
pub mod schema;
pub mod service;
pub mod storage;

pub use config::PatchConfig;
pub use error::{ErrorReport, PatchError, PatchResult, ScimError, ScimResult};
pub use patch::{
    AppliedPatch, OperationKind, PatchOp, PatchOpRequest, PatchOperation, PatchOperationHandler, PatchOutcome,
    PatchRequestHandler,
};
pub use resource::{HttpVersion, RawVersion, ResourceNode};
pub use schema::{ResourceSchemas, Schema, SchemaAttribute, SchemaRegistry};
pub use service::{PatchService, VersionedResource};
pub use storage::{ConditionalResult, StorageKey, StorageProvider};
