//! Classified PATCH operations.
//!
//! Every resolvable request operation maps to one or more [`PatchOperation`]s.
//! The enum is closed: the mutation engine and operation handlers match on it
//! exhaustively.

use serde_json::Value;
use std::fmt;

use crate::schema::{Schema, SchemaAttribute};

use super::path::Filter;
use super::request::PatchOp;

/// The semantic variant of a resolved PATCH operation.
///
/// `op` is [`PatchOp::Remove`] for explicit removals and for add/replace
/// operations whose value was `null`. Removal variants carry no values.
#[derive(Debug, Clone)]
pub enum PatchOperation<'a> {
    /// Set or remove a singular simple attribute, including sub-attributes of
    /// singular complex attributes such as `name.givenName`
    SimpleAttribute {
        attribute: SchemaAttribute<'a>,
        op: PatchOp,
        value: Option<Value>,
    },
    /// Add, replace or remove values of a multi-valued simple attribute
    MultivaluedSimpleAttribute {
        attribute: SchemaAttribute<'a>,
        op: PatchOp,
        values: Vec<Value>,
        filter: Option<Filter>,
    },
    /// Remove a singular complex attribute
    RemoveComplexAttribute { attribute: SchemaAttribute<'a> },
    /// Add, replace or remove elements of a multi-valued complex attribute
    MultivaluedComplexAttribute {
        attribute: SchemaAttribute<'a>,
        op: PatchOp,
        values: Vec<Value>,
        filter: Option<Filter>,
    },
    /// Set or remove a simple sub-attribute on the (filtered) elements of a
    /// multi-valued complex attribute
    MultivaluedComplexSimpleSubAttribute {
        attribute: SchemaAttribute<'a>,
        sub_attribute: SchemaAttribute<'a>,
        op: PatchOp,
        value: Option<Value>,
        filter: Option<Filter>,
    },
    /// Add, replace or remove a multi-valued sub-attribute on the (filtered)
    /// elements of a multi-valued complex attribute
    MultivaluedComplexMultivaluedSubAttribute {
        attribute: SchemaAttribute<'a>,
        sub_attribute: SchemaAttribute<'a>,
        op: PatchOp,
        values: Vec<Value>,
        filter: Option<Filter>,
    },
    /// Remove a whole extension
    RemoveExtensionRef { schema: &'a Schema },
}

/// Field-less tag of a [`PatchOperation`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    SimpleAttribute,
    MultivaluedSimpleAttribute,
    RemoveComplexAttribute,
    MultivaluedComplexAttribute,
    MultivaluedComplexSimpleSubAttribute,
    MultivaluedComplexMultivaluedSubAttribute,
    RemoveExtensionRef,
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

impl<'a> PatchOperation<'a> {
    pub fn kind(&self) -> OperationKind {
        match self {
            Self::SimpleAttribute { .. } => OperationKind::SimpleAttribute,
            Self::MultivaluedSimpleAttribute { .. } => OperationKind::MultivaluedSimpleAttribute,
            Self::RemoveComplexAttribute { .. } => OperationKind::RemoveComplexAttribute,
            Self::MultivaluedComplexAttribute { .. } => OperationKind::MultivaluedComplexAttribute,
            Self::MultivaluedComplexSimpleSubAttribute { .. } => {
                OperationKind::MultivaluedComplexSimpleSubAttribute
            }
            Self::MultivaluedComplexMultivaluedSubAttribute { .. } => {
                OperationKind::MultivaluedComplexMultivaluedSubAttribute
            }
            Self::RemoveExtensionRef { .. } => OperationKind::RemoveExtensionRef,
        }
    }

    /// The effective operation kind.
    pub fn op(&self) -> PatchOp {
        match self {
            Self::SimpleAttribute { op, .. }
            | Self::MultivaluedSimpleAttribute { op, .. }
            | Self::MultivaluedComplexAttribute { op, .. }
            | Self::MultivaluedComplexSimpleSubAttribute { op, .. }
            | Self::MultivaluedComplexMultivaluedSubAttribute { op, .. } => *op,
            Self::RemoveComplexAttribute { .. } | Self::RemoveExtensionRef { .. } => {
                PatchOp::Remove
            }
        }
    }

    /// The most specific attribute this operation writes; `None` for
    /// extension removal.
    pub fn attribute(&self) -> Option<SchemaAttribute<'a>> {
        match self {
            Self::SimpleAttribute { attribute, .. }
            | Self::MultivaluedSimpleAttribute { attribute, .. }
            | Self::RemoveComplexAttribute { attribute }
            | Self::MultivaluedComplexAttribute { attribute, .. } => Some(*attribute),
            Self::MultivaluedComplexSimpleSubAttribute { sub_attribute, .. }
            | Self::MultivaluedComplexMultivaluedSubAttribute { sub_attribute, .. } => {
                Some(*sub_attribute)
            }
            Self::RemoveExtensionRef { .. } => None,
        }
    }

    /// The schema the operation writes into.
    pub fn schema(&self) -> &'a Schema {
        match self {
            Self::SimpleAttribute { attribute, .. }
            | Self::MultivaluedSimpleAttribute { attribute, .. }
            | Self::RemoveComplexAttribute { attribute }
            | Self::MultivaluedComplexAttribute { attribute, .. }
            | Self::MultivaluedComplexSimpleSubAttribute { attribute, .. }
            | Self::MultivaluedComplexMultivaluedSubAttribute { attribute, .. } => attribute.schema,
            Self::RemoveExtensionRef { schema } => schema,
        }
    }

    /// Full name of the written attribute, or the URN of a removed extension.
    pub fn target_name(&self) -> String {
        match self {
            Self::RemoveExtensionRef { schema } => schema.id.clone(),
            other => other
                .attribute()
                .map(|attribute| attribute.full_name())
                .unwrap_or_default(),
        }
    }

    /// The values written by this operation.
    pub fn values(&self) -> Vec<Value> {
        match self {
            Self::SimpleAttribute { value, .. }
            | Self::MultivaluedComplexSimpleSubAttribute { value, .. } => {
                value.iter().cloned().collect()
            }
            Self::MultivaluedSimpleAttribute { values, .. }
            | Self::MultivaluedComplexAttribute { values, .. }
            | Self::MultivaluedComplexMultivaluedSubAttribute { values, .. } => values.clone(),
            Self::RemoveComplexAttribute { .. } | Self::RemoveExtensionRef { .. } => Vec::new(),
        }
    }

    pub fn filter(&self) -> Option<&Filter> {
        match self {
            Self::MultivaluedSimpleAttribute { filter, .. }
            | Self::MultivaluedComplexAttribute { filter, .. }
            | Self::MultivaluedComplexSimpleSubAttribute { filter, .. }
            | Self::MultivaluedComplexMultivaluedSubAttribute { filter, .. } => filter.as_ref(),
            _ => None,
        }
    }
}

impl fmt::Display for PatchOperation<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} '{}'", self.kind(), self.op(), self.target_name())?;
        if let Some(filter) = self.filter() {
            write!(f, " [{filter}]")?;
        }
        Ok(())
    }
}
