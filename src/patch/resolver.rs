//! Resolution of attribute paths against the schemas of a resource type.

use log::trace;

use crate::error::{PatchError, PatchResult};
use crate::schema::{ResourceSchemas, Schema, SchemaAttribute};

use super::path::{AttributePath, Filter};

/// What a path points at once resolved.
#[derive(Debug, Clone)]
pub enum ResolvedTarget<'a> {
    /// An attribute, optionally narrowed by a filter over its elements
    Attribute {
        /// The targeted attribute; carries its parent for `attr.sub` paths
        attribute: SchemaAttribute<'a>,
        filter: Option<Filter>,
    },
    /// A whole extension, addressed by its schema URN
    Extension(&'a Schema),
}

/// Resolves paths and bare attribute names to schema attributes.
#[derive(Debug, Clone, Copy)]
pub struct AttributeResolver<'a> {
    schemas: &'a ResourceSchemas,
}

impl<'a> AttributeResolver<'a> {
    pub fn new(schemas: &'a ResourceSchemas) -> Self {
        Self { schemas }
    }

    pub fn schemas(&self) -> &'a ResourceSchemas {
        self.schemas
    }

    /// Parse and resolve a raw path string.
    pub fn resolve_str(&self, path: &str) -> PatchResult<ResolvedTarget<'a>> {
        let parsed = AttributePath::parse(path, &self.schemas.known_urns())?;
        self.resolve(&parsed)
    }

    /// Resolve a parsed path.
    ///
    /// A URN-qualified path is looked up in that schema only. An unqualified
    /// path probes the main schema and then each extension in order.
    pub fn resolve(&self, path: &AttributePath) -> PatchResult<ResolvedTarget<'a>> {
        let unknown = || PatchError::unknown_attribute(&path.raw, self.schemas.name());

        let top = match &path.schema_urn {
            Some(urn) => {
                let (schema, extension) = self.schemas.schema(urn).ok_or_else(unknown)?;
                if path.is_schema_reference() {
                    return if extension {
                        Ok(ResolvedTarget::Extension(schema))
                    } else {
                        Err(unknown())
                    };
                }
                self.schemas
                    .attribute_in(schema, extension, &path.attribute)
                    .ok_or_else(unknown)?
            }
            None => self
                .schemas
                .find_attribute(&path.attribute)
                .ok_or_else(unknown)?,
        };

        let attribute = match &path.sub_attribute {
            Some(sub) => {
                let definition = top
                    .definition
                    .sub_attribute(sub)
                    .filter(|_| top.is_complex())
                    .ok_or_else(unknown)?;
                top.child(definition)
            }
            None => top,
        };

        if let Some(filter) = &path.filter {
            self.check_filter(&top, filter, &path.raw)?;
        }

        trace!("Resolved path '{}' to '{}'", path.raw, attribute.full_name());
        Ok(ResolvedTarget::Attribute {
            attribute,
            filter: path.filter.clone(),
        })
    }

    /// Filters only apply to multi-valued attributes and may only compare
    /// sub-attributes the element type defines.
    fn check_filter(
        &self,
        attribute: &SchemaAttribute<'a>,
        filter: &Filter,
        raw: &str,
    ) -> PatchResult<()> {
        if !attribute.is_multi_valued() {
            return Err(PatchError::path_syntax(
                raw,
                format!(
                    "Filter expressions are only allowed on multi-valued attributes but '{}' is not multi-valued",
                    attribute.full_name()
                ),
            ));
        }
        for name in filter.attributes() {
            let known = if attribute.is_complex() {
                attribute.definition.sub_attribute(name).is_some()
            } else {
                name.eq_ignore_ascii_case("value")
            };
            if !known {
                return Err(PatchError::unknown_attribute(
                    format!("{}.{}", attribute.full_name(), name),
                    self.schemas.name(),
                ));
            }
        }
        Ok(())
    }

    /// Resolve a key of a resource-scoped value.
    ///
    /// Keys may be bare attribute names or URN-qualified names; keys naming
    /// an extension resolve to that extension.
    pub fn resolve_resource_key(&self, key: &str) -> PatchResult<ResolvedTarget<'a>> {
        if let Some(schema) = self.schemas.extension(key) {
            return Ok(ResolvedTarget::Extension(schema));
        }
        self.resolve_str(key)
    }

    /// Resolve a key of an extension-scoped value inside that extension only.
    pub fn resolve_extension_key(
        &self,
        extension: &'a Schema,
        key: &str,
    ) -> PatchResult<SchemaAttribute<'a>> {
        self.schemas
            .attribute_in(extension, true, key)
            .ok_or_else(|| {
                PatchError::unknown_attribute(
                    format!("{}:{}", extension.id, key),
                    self.schemas.name(),
                )
            })
    }
}
