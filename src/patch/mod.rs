//! SCIM PATCH processing.
//!
//! A request flows through four stages:
//!
//! 1. [`path`] parses the operation path into URN, attribute, filter and
//!    sub-attribute parts.
//! 2. [`resolver`] maps the parsed path onto schema attribute definitions.
//! 3. [`classifier`] validates values and turns each request operation into
//!    one or more [`PatchOperation`]s.
//! 4. [`engine`] applies the operations to a [`ResourceNode`](crate::resource::ResourceNode).
//!
//! [`PatchRequestHandler`] drives the stages for a whole request and reports
//! every applied operation to a [`PatchOperationHandler`]. [`workarounds`]
//! holds the opt-in rewrites for clients that bend the protocol.
//!
//! # Example
//!
//! ```rust
//! use scim_patch::patch::{PatchOpRequest, PatchRequestHandler, PatchRequestOperation, RecordingOperationHandler};
//! use scim_patch::resource::ResourceNode;
//! use scim_patch::schema::ResourceSchemas;
//! use serde_json::json;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let schemas = ResourceSchemas::user()?;
//! let user = ResourceNode::from_json(json!({"id": "1", "userName": "bjensen"}), &schemas)?;
//! let request = PatchOpRequest::new(vec![PatchRequestOperation::replace("displayName", json!("Babs"))]);
//!
//! let mut recorder = RecordingOperationHandler::new();
//! let outcome = PatchRequestHandler::new(&schemas).patch(&user, &request, &mut recorder)?;
//!
//! assert!(outcome.changed);
//! assert_eq!(outcome.resource.attribute("displayName"), Some(&json!("Babs")));
//! assert_eq!(recorder.len(), 1);
//! # Ok(())
//! # }
//! ```

pub mod classifier;
pub mod engine;
pub mod handler;
pub mod operation;
pub mod path;
pub mod request;
pub mod resolver;
pub mod validator;
pub mod workarounds;

pub use classifier::OperationClassifier;
pub use engine::{apply_operation, has_target};
pub use handler::{
    AppliedPatch, PatchOperationHandler, PatchOutcome, PatchRequestHandler, RecordedOperation,
    RecordingOperationHandler, StoreOperationHandler,
};
pub use operation::{OperationKind, PatchOperation};
pub use path::{AttributePath, Filter};
pub use request::{PATCH_OP_SCHEMA, PatchOp, PatchOpRequest, PatchRequestOperation};
pub use resolver::{AttributeResolver, ResolvedTarget};
pub use validator::ValueValidator;
