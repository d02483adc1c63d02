//! Core schema type definitions for SCIM resources.
//!
//! This module contains the data structures that describe SCIM schemas and
//! their attribute definitions as specified in RFC 7643, plus the
//! [`SchemaAttribute`] view the PATCH engine passes around once a path has
//! been resolved.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A SCIM schema definition.
///
/// Represents a complete schema with its metadata and attribute definitions.
/// Each schema defines the structure and validation rules for a specific
/// resource type like User or Group, or for an extension layered onto one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Schema {
    /// Unique schema identifier (URN)
    pub id: String,
    /// Human-readable schema name
    pub name: String,
    /// Schema description
    #[serde(default)]
    pub description: String,
    /// List of attribute definitions
    pub attributes: Vec<AttributeDefinition>,
}

impl Schema {
    /// Find a top-level attribute by name (case-insensitive, per RFC 7643 §2.1).
    pub fn attribute(&self, name: &str) -> Option<&AttributeDefinition> {
        self.attributes
            .iter()
            .find(|attr| attr.name.eq_ignore_ascii_case(name))
    }
}

/// Definition of a SCIM attribute.
///
/// Defines all characteristics of an attribute including type,
/// constraints, and validation rules.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttributeDefinition {
    /// Attribute name
    pub name: String,
    /// Data type of the attribute
    #[serde(rename = "type")]
    pub data_type: AttributeType,
    /// Whether this attribute can have multiple values
    #[serde(rename = "multiValued", default)]
    pub multi_valued: bool,
    /// Whether this attribute is required
    #[serde(default)]
    pub required: bool,
    /// Whether string comparison is case-sensitive
    #[serde(rename = "caseExact", default)]
    pub case_exact: bool,
    /// Mutability characteristics
    #[serde(default)]
    pub mutability: Mutability,
    /// Uniqueness constraints
    #[serde(default)]
    pub uniqueness: Uniqueness,
    /// Allowed values for string attributes
    #[serde(rename = "canonicalValues", default)]
    pub canonical_values: Vec<String>,
    /// Sub-attributes for complex types
    #[serde(rename = "subAttributes", default)]
    pub sub_attributes: Vec<AttributeDefinition>,
    /// How the attribute is returned in responses
    #[serde(default)]
    pub returned: Option<String>,
}

impl AttributeDefinition {
    /// Find a sub-attribute by name (case-insensitive).
    pub fn sub_attribute(&self, name: &str) -> Option<&AttributeDefinition> {
        self.sub_attributes
            .iter()
            .find(|attr| attr.name.eq_ignore_ascii_case(name))
    }

    pub fn is_complex(&self) -> bool {
        self.data_type == AttributeType::Complex
    }

    pub fn is_read_only(&self) -> bool {
        self.mutability == Mutability::ReadOnly
    }
}

impl Default for AttributeDefinition {
    fn default() -> Self {
        Self {
            name: String::new(),
            data_type: AttributeType::String,
            multi_valued: false,
            required: false,
            case_exact: false,
            mutability: Mutability::ReadWrite,
            uniqueness: Uniqueness::None,
            canonical_values: Vec::new(),
            sub_attributes: Vec::new(),
            returned: None,
        }
    }
}

/// SCIM attribute data types.
///
/// Represents the valid data types for SCIM attributes as defined in RFC 7643.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum AttributeType {
    /// String value
    #[default]
    String,
    /// Boolean value
    Boolean,
    /// Decimal number
    Decimal,
    /// Integer number
    Integer,
    /// DateTime in RFC3339 format
    DateTime,
    /// Binary data (base64 encoded)
    Binary,
    /// URI reference
    Reference,
    /// Complex attribute with sub-attributes
    Complex,
}

impl AttributeType {
    /// The schema keyword of this type as used in error messages.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Boolean => "boolean",
            Self::Decimal => "decimal",
            Self::Integer => "integer",
            Self::DateTime => "dateTime",
            Self::Binary => "binary",
            Self::Reference => "reference",
            Self::Complex => "complex",
        }
    }
}

impl fmt::Display for AttributeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Attribute mutability characteristics.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum Mutability {
    /// Read-only attribute (managed by server)
    ReadOnly,
    /// Read-write attribute (can be modified by clients)
    #[default]
    ReadWrite,
    /// Immutable attribute (set once, never modified)
    Immutable,
    /// Write-only attribute (passwords, etc.)
    WriteOnly,
}

/// Attribute uniqueness constraints.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum Uniqueness {
    /// No uniqueness constraint
    #[default]
    None,
    /// Unique within the server
    Server,
    /// Globally unique
    Global,
}

/// A resolved attribute together with the schema that owns it.
///
/// Sub-attributes of complex attributes carry their parent definition so the
/// full name (`<schema>:<parent>.<name>`) and the location inside the resource
/// can be derived.
#[derive(Debug, Clone, Copy)]
pub struct SchemaAttribute<'a> {
    pub schema: &'a Schema,
    pub definition: &'a AttributeDefinition,
    pub parent: Option<&'a AttributeDefinition>,
    /// Whether `schema` is an extension of the resource type
    pub extension: bool,
}

impl<'a> SchemaAttribute<'a> {
    /// Short attribute name.
    pub fn name(&self) -> &'a str {
        &self.definition.name
    }

    /// Attribute path relative to its schema, e.g. `name.givenName`.
    pub fn node_name(&self) -> String {
        match self.parent {
            Some(parent) => format!("{}.{}", parent.name, self.definition.name),
            None => self.definition.name.clone(),
        }
    }

    /// Schema-qualified name, e.g. `urn:ietf:params:scim:schemas:core:2.0:User:name.givenName`.
    pub fn full_name(&self) -> String {
        format!("{}:{}", self.schema.id, self.node_name())
    }

    pub fn schema_id(&self) -> &'a str {
        &self.schema.id
    }

    pub fn is_multi_valued(&self) -> bool {
        self.definition.multi_valued
    }

    pub fn is_complex(&self) -> bool {
        self.definition.is_complex()
    }

    pub fn is_extension(&self) -> bool {
        self.extension
    }

    /// Whether this attribute or its parent is read-only.
    pub fn is_read_only(&self) -> bool {
        self.definition.is_read_only() || self.parent.is_some_and(|p| p.is_read_only())
    }

    /// The same schema, descending into `definition` as the new parent.
    pub fn child(&self, definition: &'a AttributeDefinition) -> SchemaAttribute<'a> {
        SchemaAttribute {
            schema: self.schema,
            definition,
            parent: Some(self.definition),
            extension: self.extension,
        }
    }

    /// The parent attribute, if this is a sub-attribute.
    pub fn parent_attribute(&self) -> Option<SchemaAttribute<'a>> {
        self.parent.map(|parent| SchemaAttribute {
            schema: self.schema,
            definition: parent,
            parent: None,
            extension: self.extension,
        })
    }
}

impl fmt::Display for SchemaAttribute<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.full_name())
    }
}
