//! Schema definitions for SCIM resources.
//!
//! This module provides the RFC 7643 schema model and the per-resource-type
//! schema sets the PATCH pipeline resolves attribute paths against.
//!
//! # Key Types
//!
//! - [`Schema`] - SCIM schema definition with attributes and metadata
//! - [`ResourceSchemas`] - Main schema plus ordered extensions of one resource type
//! - [`SchemaAttribute`] - A resolved attribute bound to its owning schema
//! - [`SchemaRegistry`] - Registry for managing and accessing schemas
//!
//! # Examples
//!
//! ```rust
//! use scim_patch::schema::ResourceSchemas;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let user = ResourceSchemas::user()?;
//! let attribute = user.find_attribute("employeeNumber").expect("enterprise attribute");
//! assert!(attribute.is_extension());
//! # Ok(())
//! # }
//! ```

pub mod embedded;
pub mod registry;
pub mod types;


pub use embedded::{ENTERPRISE_USER_SCHEMA_ID, GROUP_SCHEMA_ID, USER_SCHEMA_ID};
pub use registry::{ResourceSchemas, SchemaExtension, SchemaRegistry};
pub use types::{
    AttributeDefinition, AttributeType, Mutability, Schema, SchemaAttribute, Uniqueness,
};
