//! Schema registry and per-resource-type schema sets.
//!
//! [`SchemaRegistry`] owns every loaded schema keyed by URN. A
//! [`ResourceSchemas`] is the read-only view the PATCH engine consumes for one
//! resource type: its main schema followed by its extension schemas in
//! declaration order.

use super::embedded;
use super::types::{Schema, SchemaAttribute};

use log::debug;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// An extension schema registered on a resource type.
#[derive(Debug, Clone)]
pub struct SchemaExtension {
    pub schema: Schema,
    pub required: bool,
}

/// The schemas of one resource type, in lookup order.
///
/// Attribute lookups without an explicit schema URN probe the main schema
/// first and then each extension in the order they were added; the first
/// match wins.
#[derive(Debug, Clone)]
pub struct ResourceSchemas {
    name: String,
    main: Schema,
    extensions: Vec<SchemaExtension>,
}

impl ResourceSchemas {
    /// Create a resource type with only a main schema.
    pub fn new(name: impl Into<String>, main: Schema) -> Self {
        Self {
            name: name.into(),
            main,
            extensions: Vec::new(),
        }
    }

    /// Add an extension schema; extensions are probed in insertion order.
    pub fn with_extension(mut self, schema: Schema, required: bool) -> Self {
        self.extensions.push(SchemaExtension { schema, required });
        self
    }

    /// Build from RFC 7643 schema documents.
    pub fn from_json(
        name: impl Into<String>,
        main: &str,
        extensions: &[&str],
    ) -> Result<Self, serde_json::Error> {
        let mut resource = Self::new(name, serde_json::from_str(main)?);
        for extension in extensions {
            resource = resource.with_extension(serde_json::from_str(extension)?, false);
        }
        Ok(resource)
    }

    /// The User resource type with the Enterprise User extension.
    pub fn user() -> Result<Self, serde_json::Error> {
        Self::from_json(
            "User",
            embedded::core_user_schema(),
            &[embedded::enterprise_user_schema()],
        )
    }

    /// The Group resource type.
    pub fn group() -> Result<Self, serde_json::Error> {
        Self::from_json("Group", embedded::core_group_schema(), &[])
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn main_schema(&self) -> &Schema {
        &self.main
    }

    pub fn extensions(&self) -> impl Iterator<Item = &SchemaExtension> {
        self.extensions.iter()
    }

    /// Look up an extension schema by its URN.
    pub fn extension(&self, urn: &str) -> Option<&Schema> {
        self.extensions
            .iter()
            .map(|ext| &ext.schema)
            .find(|schema| schema.id.eq_ignore_ascii_case(urn))
    }

    /// Look up any schema of this resource type by URN, returning whether it
    /// is an extension.
    pub fn schema(&self, urn: &str) -> Option<(&Schema, bool)> {
        if self.main.id.eq_ignore_ascii_case(urn) {
            return Some((&self.main, false));
        }
        self.extension(urn).map(|schema| (schema, true))
    }

    /// All schemas in lookup order with their extension flag.
    fn ordered_schemas(&self) -> impl Iterator<Item = (&Schema, bool)> {
        std::iter::once((&self.main, false))
            .chain(self.extensions.iter().map(|ext| (&ext.schema, true)))
    }

    /// Every known schema URN, longest first.
    ///
    /// Matching path prefixes against this list greedily keeps URNs that
    /// contain colons or dots from being split at the wrong place.
    pub fn known_urns(&self) -> Vec<&str> {
        let mut urns: Vec<&str> = self
            .ordered_schemas()
            .map(|(schema, _)| schema.id.as_str())
            .collect();
        urns.sort_by(|a, b| b.len().cmp(&a.len()));
        urns
    }

    /// Resolve a top-level attribute name inside one schema.
    pub fn attribute_in<'a>(
        &'a self,
        schema: &'a Schema,
        extension: bool,
        name: &str,
    ) -> Option<SchemaAttribute<'a>> {
        schema.attribute(name).map(|definition| SchemaAttribute {
            schema,
            definition,
            parent: None,
            extension,
        })
    }

    /// Resolve an unqualified top-level attribute name: main schema first,
    /// then each extension in order.
    pub fn find_attribute(&self, name: &str) -> Option<SchemaAttribute<'_>> {
        self.ordered_schemas()
            .find_map(|(schema, extension)| self.attribute_in(schema, extension, name))
    }
}

/// Registry for SCIM schemas keyed by URN.
#[derive(Debug, Clone, Default)]
pub struct SchemaRegistry {
    schemas: HashMap<String, Schema>,
}

impl SchemaRegistry {
    /// Create a registry holding the embedded User, Group and Enterprise User schemas.
    pub fn with_embedded_schemas() -> Result<Self, serde_json::Error> {
        let mut registry = Self::default();
        for content in [
            embedded::core_user_schema(),
            embedded::core_group_schema(),
            embedded::enterprise_user_schema(),
        ] {
            registry.add_schema(Self::load_schema_from_str(content)?);
        }
        Ok(registry)
    }

    /// Load every `*.json` schema file from a directory.
    pub fn from_schema_dir<P: AsRef<Path>>(
        schema_dir: P,
    ) -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        let mut registry = Self::default();
        for entry in fs::read_dir(schema_dir)? {
            let path = entry?.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                let content = fs::read_to_string(&path)?;
                registry.add_schema(Self::load_schema_from_str(&content)?);
            }
        }
        Ok(registry)
    }

    /// Load a schema from a JSON string.
    pub fn load_schema_from_str(content: &str) -> Result<Schema, serde_json::Error> {
        serde_json::from_str(content)
    }

    /// Add or replace a schema.
    pub fn add_schema(&mut self, schema: Schema) {
        debug!("Registering schema '{}'", schema.id);
        self.schemas.insert(schema.id.clone(), schema);
    }

    /// Get a specific schema by URN.
    pub fn get_schema(&self, id: &str) -> Option<&Schema> {
        self.schemas.get(id)
    }

    /// Get all available schemas.
    pub fn get_schemas(&self) -> Vec<&Schema> {
        self.schemas.values().collect()
    }

    /// Assemble the schema set of a resource type from registered schemas.
    ///
    /// Each extension is given with whether the resource type requires it.
    /// Returns `None` if the main schema or any extension is not registered.
    pub fn resource_schemas(
        &self,
        name: &str,
        main_id: &str,
        extensions: &[(&str, bool)],
    ) -> Option<ResourceSchemas> {
        let mut resource = ResourceSchemas::new(name, self.get_schema(main_id)?.clone());
        for (id, required) in extensions {
            resource = resource.with_extension(self.get_schema(id)?.clone(), *required);
        }
        Some(resource)
    }
}
