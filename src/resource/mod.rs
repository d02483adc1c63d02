//! Resource model for PATCH processing.
//!
//! * [`ResourceNode`] - main-schema attributes plus per-extension attribute trees
//! * [`version`] - content hash versions used for `If-Match` checks

pub mod node;
pub mod version;

pub use node::ResourceNode;
pub use version::{HttpVersion, RawVersion, VersionError};
