//! In-memory resource representation used while a PATCH request is applied.
//!
//! A [`ResourceNode`] splits a SCIM resource document into the attributes of
//! its main schema and one attribute map per extension schema, keyed by the
//! extension URN. The `schemas` array is tracked separately and kept in step
//! with the extensions that are present.

use serde_json::{Map, Value};
use std::collections::BTreeMap;

use crate::error::{ScimError, ScimResult};
use crate::schema::{ResourceSchemas, SchemaAttribute};

/// Mutable attribute tree of one resource instance.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ResourceNode {
    resource_type: String,
    schemas: Vec<String>,
    attributes: Map<String, Value>,
    extensions: BTreeMap<String, Map<String, Value>>,
}

impl ResourceNode {
    /// Create an empty resource carrying only the main schema URN.
    pub fn new(schemas: &ResourceSchemas) -> Self {
        Self {
            resource_type: schemas.name().to_string(),
            schemas: vec![schemas.main_schema().id.clone()],
            attributes: Map::new(),
            extensions: BTreeMap::new(),
        }
    }

    /// Split a resource document into main attributes and extension trees.
    ///
    /// Top-level keys naming a known extension URN become extension trees;
    /// everything else stays a main-schema attribute.
    pub fn from_json(data: Value, schemas: &ResourceSchemas) -> ScimResult<Self> {
        let Value::Object(object) = data else {
            return Err(ScimError::invalid_request("Resource must be a JSON object"));
        };

        let mut node = Self::new(schemas);
        node.schemas.clear();

        for (key, value) in object {
            if key == "schemas" {
                let Value::Array(items) = value else {
                    return Err(ScimError::invalid_request("'schemas' must be an array"));
                };
                for item in items {
                    match item {
                        Value::String(urn) => node.add_schema_urn(&urn),
                        other => {
                            return Err(ScimError::invalid_request(format!(
                                "'schemas' must only contain strings but found {other}"
                            )));
                        }
                    }
                }
                continue;
            }

            match schemas.extension(&key) {
                Some(extension) => match value {
                    Value::Object(attributes) => {
                        node.extensions.insert(extension.id.clone(), attributes);
                    }
                    Value::Null => {}
                    other => {
                        return Err(ScimError::invalid_request(format!(
                            "Extension '{key}' must be a JSON object but was {other}"
                        )));
                    }
                },
                None => {
                    node.attributes.insert(key, value);
                }
            }
        }

        let main = schemas.main_schema().id.clone();
        if !node.has_schema_urn(&main) {
            node.schemas.insert(0, main);
        }
        for urn in node.extensions.keys().cloned().collect::<Vec<_>>() {
            node.add_schema_urn(&urn);
        }
        Ok(node)
    }

    /// Render the resource back into a SCIM document.
    pub fn to_json(&self) -> Value {
        let mut object = Map::new();
        object.insert(
            "schemas".to_string(),
            Value::Array(self.schemas.iter().cloned().map(Value::String).collect()),
        );
        for (key, value) in &self.attributes {
            object.insert(key.clone(), value.clone());
        }
        for (urn, attributes) in &self.extensions {
            object.insert(urn.clone(), Value::Object(attributes.clone()));
        }
        Value::Object(object)
    }

    pub fn resource_type(&self) -> &str {
        &self.resource_type
    }

    pub fn id(&self) -> Option<&str> {
        self.attributes.get("id").and_then(Value::as_str)
    }

    pub fn schemas(&self) -> &[String] {
        &self.schemas
    }

    /// Main-schema attributes.
    pub fn attributes(&self) -> &Map<String, Value> {
        &self.attributes
    }

    /// Look up a main-schema attribute by name, ignoring case.
    pub fn attribute(&self, name: &str) -> Option<&Value> {
        find_key(&self.attributes, name).and_then(|key| self.attributes.get(key))
    }

    /// Attribute tree of an extension, if present.
    pub fn extension(&self, urn: &str) -> Option<&Map<String, Value>> {
        self.extensions
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(urn))
            .map(|(_, attributes)| attributes)
    }

    pub fn has_extension(&self, urn: &str) -> bool {
        self.extension(urn).is_some()
    }

    /// Current value of a top-level attribute, wherever it lives.
    pub fn value_of(&self, attribute: &SchemaAttribute<'_>) -> Option<&Value> {
        let container = if attribute.is_extension() {
            self.extension(attribute.schema_id())?
        } else {
            &self.attributes
        };
        let top = attribute
            .parent_attribute()
            .map_or(attribute.name(), |parent| parent.name());
        find_key(container, top).and_then(|key| container.get(key))
    }

    /// The map that holds top-level attributes of `attribute`'s schema.
    ///
    /// With `create` set, a missing extension tree is created and its URN
    /// added to `schemas`.
    pub(crate) fn container_mut(
        &mut self,
        attribute: &SchemaAttribute<'_>,
        create: bool,
    ) -> Option<&mut Map<String, Value>> {
        if !attribute.is_extension() {
            return Some(&mut self.attributes);
        }
        let urn = attribute.schema_id();
        let key = self
            .extensions
            .keys()
            .find(|key| key.eq_ignore_ascii_case(urn))
            .cloned();
        match key {
            Some(key) => self.extensions.get_mut(&key),
            None if create => {
                self.add_schema_urn(urn);
                Some(self.extensions.entry(urn.to_string()).or_default())
            }
            None => None,
        }
    }

    /// Drop an extension tree that no longer holds any attribute.
    pub(crate) fn prune_extension(&mut self, urn: &str) {
        if self.extension(urn).is_some_and(Map::is_empty) {
            self.remove_extension(urn);
        }
    }

    /// Remove an extension tree and its URN from `schemas`.
    pub fn remove_extension(&mut self, urn: &str) -> Option<Map<String, Value>> {
        self.schemas.retain(|schema| !schema.eq_ignore_ascii_case(urn));
        let key = self
            .extensions
            .keys()
            .find(|key| key.eq_ignore_ascii_case(urn))
            .cloned()?;
        self.extensions.remove(&key)
    }

    /// Set `meta.lastModified`, creating `meta` if needed.
    pub fn set_last_modified(&mut self, timestamp: &str) {
        let key = find_key(&self.attributes, "meta")
            .unwrap_or("meta")
            .to_string();
        let meta = self
            .attributes
            .entry(key)
            .or_insert_with(|| Value::Object(Map::new()));
        if !meta.is_object() {
            *meta = Value::Object(Map::new());
        }
        if let Value::Object(meta) = meta {
            meta.insert(
                "lastModified".to_string(),
                Value::String(timestamp.to_string()),
            );
        }
    }

    fn has_schema_urn(&self, urn: &str) -> bool {
        self.schemas.iter().any(|schema| schema.eq_ignore_ascii_case(urn))
    }

    fn add_schema_urn(&mut self, urn: &str) {
        if !self.has_schema_urn(urn) {
            self.schemas.push(urn.to_string());
        }
    }
}

/// Find the stored spelling of `name` in `map`, ignoring case.
pub(crate) fn find_key<'m>(map: &'m Map<String, Value>, name: &str) -> Option<&'m str> {
    map.get_key_value(name)
        .or_else(|| map.iter().find(|(key, _)| key.eq_ignore_ascii_case(name)))
        .map(|(key, _)| key.as_str())
}
