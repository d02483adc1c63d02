//! Error types for SCIM PATCH processing.
//!
//! [`PatchError`] covers everything that can reject a PATCH request: malformed
//! paths, unknown attributes, values that disagree with their schema and
//! operation shapes that cannot be classified. [`ScimError`] is the outer error
//! of the service layer, wrapping patch, storage and serialization failures.

use std::collections::BTreeMap;

use crate::storage::StorageError;

/// Errors raised while resolving, validating or applying a PATCH request.
///
/// Every variant is fatal to the enclosing request. Use [`PatchError::report`]
/// to obtain the structured detail/field-error representation returned to
/// clients.
#[derive(Debug, thiserror::Error)]
pub enum PatchError {
    /// The path or its filter expression could not be parsed
    #[error("{message}")]
    PathSyntax { path: String, message: String },

    /// The path references an attribute that no schema of the resource defines
    #[error("Attribute '{attribute}' is unknown to resource type '{resource_type}'")]
    UnknownAttribute {
        attribute: String,
        resource_type: String,
    },

    /// The supplied value disagrees with the declared attribute type or shape
    #[error("{message}")]
    TypeMismatch { attribute: String, message: String },

    /// An element of a multi-valued value failed validation
    #[error("{summary}")]
    MultivaluedElement {
        attribute: String,
        summary: String,
        source: Box<PatchError>,
    },

    /// The op/path/value combination has no valid interpretation
    #[error("{message}")]
    InvalidOperation { message: String },

    /// The operation targets an attribute that clients may not modify
    #[error("Attribute '{attribute}' is readOnly and cannot be modified")]
    Mutability { attribute: String },

    /// A filter or removal found nothing to operate on
    #[error("No target found for path '{path}'")]
    NoTarget { path: String },

    /// The patched resource lacks a required attribute or extension
    #[error("{message}")]
    Required { attribute: String, message: String },

    /// The operation handler rejected a notification
    #[error("Operation handler failed: {0}")]
    Handler(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Structured representation of a rejected PATCH request.
///
/// `field_errors` is keyed by attribute full name. When a summary message and
/// an element-level message exist for the same attribute the summary comes
/// first.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorReport {
    pub detail: String,
    pub scim_type: &'static str,
    pub field_errors: BTreeMap<String, Vec<String>>,
}

impl PatchError {
    /// Create a path syntax error
    pub fn path_syntax(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::PathSyntax {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create an unknown attribute error
    pub fn unknown_attribute(
        attribute: impl Into<String>,
        resource_type: impl Into<String>,
    ) -> Self {
        Self::UnknownAttribute {
            attribute: attribute.into(),
            resource_type: resource_type.into(),
        }
    }

    /// Create a type mismatch error bound to an attribute
    pub fn type_mismatch(attribute: impl Into<String>, message: impl Into<String>) -> Self {
        Self::TypeMismatch {
            attribute: attribute.into(),
            message: message.into(),
        }
    }

    /// Create an invalid operation error
    pub fn invalid_operation(message: impl Into<String>) -> Self {
        Self::InvalidOperation {
            message: message.into(),
        }
    }

    /// Create a no-target error for `path`
    pub fn no_target(path: impl Into<String>) -> Self {
        Self::NoTarget { path: path.into() }
    }

    /// Create a missing required attribute or extension error
    pub fn required(attribute: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Required {
            attribute: attribute.into(),
            message: message.into(),
        }
    }

    /// Wrap a handler error
    pub fn handler<E>(error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Handler(Box::new(error))
    }

    /// The RFC 7644 `scimType` keyword for this error.
    pub fn scim_type(&self) -> &'static str {
        match self {
            Self::PathSyntax { path, .. } if path.contains('[') => "invalidFilter",
            Self::PathSyntax { .. } => "invalidPath",
            Self::UnknownAttribute { .. } => "invalidPath",
            Self::TypeMismatch { .. } | Self::MultivaluedElement { .. } => "invalidValue",
            Self::InvalidOperation { message } if message.starts_with("Missing target") => "noTarget",
            Self::InvalidOperation { .. } => "invalidValue",
            Self::Mutability { .. } => "mutability",
            Self::NoTarget { .. } => "noTarget",
            Self::Required { .. } => "invalidValue",
            Self::Handler(_) => "invalidValue",
        }
    }

    /// The attribute full name the error is bound to, if any.
    pub fn attribute(&self) -> Option<&str> {
        match self {
            Self::TypeMismatch { attribute, .. }
            | Self::MultivaluedElement { attribute, .. }
            | Self::Mutability { attribute }
            | Self::Required { attribute, .. } => Some(attribute),
            _ => None,
        }
    }

    /// Field-bound messages in reporting order.
    fn field_messages(&self) -> Vec<String> {
        match self {
            Self::MultivaluedElement { summary, source, .. } => {
                let mut messages = vec![summary.clone()];
                messages.extend(source.field_messages());
                messages
            }
            other => vec![other.to_string()],
        }
    }

    /// Build the error-reporting surface for this error.
    pub fn report(&self) -> ErrorReport {
        let mut field_errors = BTreeMap::new();
        if let Some(attribute) = self.attribute() {
            field_errors.insert(attribute.to_string(), self.field_messages());
        }
        ErrorReport {
            detail: self.to_string(),
            scim_type: self.scim_type(),
            field_errors,
        }
    }
}

/// Main error type for the PATCH service layer.
#[derive(Debug, thiserror::Error)]
pub enum ScimError {
    /// The PATCH request was rejected
    #[error("Patch error: {0}")]
    Patch(#[from] PatchError),

    /// The backing store failed
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Resource not found errors
    #[error("Resource not found: {resource_type} with ID {id}")]
    ResourceNotFound { resource_type: String, id: String },

    /// The client's If-Match version does not match the stored resource
    #[error("Version mismatch: expected {expected}, current {current}")]
    VersionMismatch { expected: String, current: String },

    /// Invalid request format or parameters
    #[error("Invalid request: {message}")]
    InvalidRequest { message: String },
}

impl ScimError {
    /// Create a resource not found error
    pub fn resource_not_found(resource_type: impl Into<String>, id: impl Into<String>) -> Self {
        Self::ResourceNotFound {
            resource_type: resource_type.into(),
            id: id.into(),
        }
    }

    /// Create an invalid request error
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest {
            message: message.into(),
        }
    }
}

pub type PatchResult<T> = Result<T, PatchError>;
pub type ScimResult<T> = Result<T, ScimError>;
