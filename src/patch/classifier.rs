//! Mapping of request operations to [`PatchOperation`] variants.
//!
//! The classifier resolves each target, validates its value and decides the
//! variant from the attribute's shape:
//!
//! | attribute                      | variant                                      |
//! |--------------------------------|----------------------------------------------|
//! | simple, singular               | `SimpleAttribute`                            |
//! | simple, multi-valued           | `MultivaluedSimpleAttribute`                 |
//! | complex, singular, remove      | `RemoveComplexAttribute`                     |
//! | complex, singular, add/replace | one operation per sub-attribute              |
//! | complex, multi-valued          | `MultivaluedComplexAttribute`                |
//! | simple sub of multi complex    | `MultivaluedComplexSimpleSubAttribute`       |
//! | multi sub of multi complex     | `MultivaluedComplexMultivaluedSubAttribute`  |
//! | extension URN, or null/`{}`    | `RemoveExtensionRef`                         |
//!
//! Add and replace operations with a `null` value are classified as removals.
//! A filter on a simple multi-valued attribute is only accepted for removals.

use log::{debug, trace};
use serde_json::{Map, Value};

use crate::config::PatchConfig;
use crate::error::{PatchError, PatchResult};
use crate::schema::{ResourceSchemas, Schema, SchemaAttribute};

use super::operation::PatchOperation;
use super::path::Filter;
use super::request::{PatchOp, PatchRequestOperation};
use super::resolver::{AttributeResolver, ResolvedTarget};
use super::validator::ValueValidator;
use super::workarounds;

/// Keys of a resource-scoped value that never name a patchable attribute.
const IGNORED_RESOURCE_KEYS: [&str; 2] = ["schemas", "meta"];

/// Classifies request operations against the schemas of one resource type.
#[derive(Debug, Clone, Copy)]
pub struct OperationClassifier<'a> {
    resolver: AttributeResolver<'a>,
    validator: ValueValidator<'a>,
    config: &'a PatchConfig,
}

impl<'a> OperationClassifier<'a> {
    pub fn new(schemas: &'a ResourceSchemas, config: &'a PatchConfig) -> Self {
        Self {
            resolver: AttributeResolver::new(schemas),
            validator: ValueValidator::new(config, schemas.name()),
            config,
        }
    }

    /// Classify one request operation into the operations to apply, in order.
    pub fn classify(
        &self,
        request: &PatchRequestOperation,
    ) -> PatchResult<Vec<PatchOperation<'a>>> {
        let rewritten = workarounds::rewrite_request(self.config, request);
        let request = rewritten.as_ref().unwrap_or(request);
        let value = request.target_value();
        match request.target_path() {
            Some(path) => {
                if let (PatchOp::Remove, Some(value)) = (request.op, value) {
                    return Err(PatchError::invalid_operation(format!(
                        "Values must not be set for remove operation but was: {value}"
                    )));
                }
                match self.resolver.resolve_str(path)? {
                    ResolvedTarget::Extension(schema) => {
                        self.classify_extension(request.op, schema, value)
                    }
                    ResolvedTarget::Attribute { attribute, filter } => {
                        if attribute.is_read_only() {
                            return Err(PatchError::Mutability {
                                attribute: attribute.full_name(),
                            });
                        }
                        let wrapped =
                            workarounds::wrap_simple_complex_value(self.config, &attribute, value);
                        self.classify_attribute(request.op, attribute, filter, wrapped.as_ref().or(value))
                    }
                }
            }
            None => match (request.op, value) {
                (op, Some(Value::Object(object))) => self.classify_resource_value(op, object),
                (PatchOp::Remove, _) => Err(PatchError::invalid_operation(
                    "Missing target for remove operation",
                )),
                (op, Some(other)) => Err(PatchError::invalid_operation(format!(
                    "Value of a {op} operation without a path must be a JSON object but was: {other}"
                ))),
                (op, None) => Err(PatchError::invalid_operation(format!(
                    "Missing value for {op} operation without a path"
                ))),
            },
        }
    }

    /// Each key of a resource-scoped value is its own target.
    fn classify_resource_value(
        &self,
        op: PatchOp,
        object: &Map<String, Value>,
    ) -> PatchResult<Vec<PatchOperation<'a>>> {
        let mut operations = Vec::new();
        for (key, value) in object {
            if IGNORED_RESOURCE_KEYS
                .iter()
                .any(|ignored| key.eq_ignore_ascii_case(ignored))
            {
                trace!("Ignoring '{key}' in resource value");
                continue;
            }
            let target = match self.resolver.resolve_resource_key(key) {
                Ok(target) => target,
                Err(PatchError::UnknownAttribute { attribute, .. })
                    if self.config.ignore_unknown_attributes =>
                {
                    debug!("Ignoring unknown attribute '{attribute}'");
                    continue;
                }
                Err(error) => return Err(error),
            };
            let value = Some(value).filter(|value| !value.is_null());
            match target {
                ResolvedTarget::Extension(schema) => {
                    operations.extend(self.classify_extension(op, schema, value)?);
                }
                ResolvedTarget::Attribute { attribute, .. } if attribute.is_read_only() => {
                    debug!("Skipping readOnly attribute '{}'", attribute.full_name());
                }
                ResolvedTarget::Attribute { attribute, filter } => {
                    operations.extend(self.classify_attribute(op, attribute, filter, value)?);
                }
            }
        }
        Ok(operations)
    }

    /// An extension is removed as a whole for remove operations and for
    /// `null` or `{}` values; otherwise each of its keys is a target.
    fn classify_extension(
        &self,
        op: PatchOp,
        schema: &'a Schema,
        value: Option<&Value>,
    ) -> PatchResult<Vec<PatchOperation<'a>>> {
        let object = match (op, value) {
            (PatchOp::Remove, _) | (_, None) => None,
            (_, Some(Value::Object(object))) if object.is_empty() => None,
            (_, Some(Value::Object(object))) => Some(object),
            (_, Some(other)) => {
                return Err(PatchError::type_mismatch(
                    &schema.id,
                    format!(
                        "Attribute '{}' must be of type object but is '{}'",
                        schema.id, other
                    ),
                ));
            }
        };
        let Some(object) = object else {
            trace!("Classified removal of extension '{}'", schema.id);
            return Ok(vec![PatchOperation::RemoveExtensionRef { schema }]);
        };

        let mut operations = Vec::new();
        for (key, value) in object {
            let attribute = match self.resolver.resolve_extension_key(schema, key) {
                Ok(attribute) => attribute,
                Err(PatchError::UnknownAttribute { attribute, .. })
                    if self.config.ignore_unknown_attributes =>
                {
                    debug!("Ignoring unknown attribute '{attribute}'");
                    continue;
                }
                Err(error) => return Err(error),
            };
            if attribute.is_read_only() {
                debug!("Skipping readOnly attribute '{}'", attribute.full_name());
                continue;
            }
            let value = Some(value).filter(|value| !value.is_null());
            operations.extend(self.classify_attribute(op, attribute, None, value)?);
        }
        Ok(operations)
    }

    /// Classify an operation on a resolved attribute.
    pub fn classify_attribute(
        &self,
        op: PatchOp,
        attribute: SchemaAttribute<'a>,
        filter: Option<Filter>,
        value: Option<&Value>,
    ) -> PatchResult<Vec<PatchOperation<'a>>> {
        let value = if op == PatchOp::Remove { None } else { value };
        let op = if value.is_none() { PatchOp::Remove } else { op };
        let validated = value
            .map(|value| self.validator.validate(&attribute, value))
            .transpose()?;

        let operation = match attribute.parent_attribute() {
            None => match (attribute.is_complex(), attribute.is_multi_valued()) {
                (false, false) => PatchOperation::SimpleAttribute {
                    attribute,
                    op,
                    value: validated,
                },
                (false, true) => {
                    if filter.is_some() && op != PatchOp::Remove {
                        return Err(PatchError::invalid_operation(format!(
                            "Filter expressions on multi-valued simple attribute '{}' are only supported for remove operations",
                            attribute.full_name()
                        )));
                    }
                    PatchOperation::MultivaluedSimpleAttribute {
                        attribute,
                        op,
                        values: into_values(validated),
                        filter,
                    }
                }
                (true, false) => {
                    let requested_empty = value
                        .and_then(Value::as_object)
                        .is_some_and(Map::is_empty);
                    return Ok(self.classify_complex(attribute, op, validated, requested_empty));
                }
                (true, true) => PatchOperation::MultivaluedComplexAttribute {
                    attribute,
                    op,
                    values: into_values(validated),
                    filter,
                },
            },
            Some(parent) if parent.is_multi_valued() => {
                if attribute.is_multi_valued() {
                    PatchOperation::MultivaluedComplexMultivaluedSubAttribute {
                        attribute: parent,
                        sub_attribute: attribute,
                        op,
                        values: into_values(validated),
                        filter,
                    }
                } else {
                    PatchOperation::MultivaluedComplexSimpleSubAttribute {
                        attribute: parent,
                        sub_attribute: attribute,
                        op,
                        value: validated,
                        filter,
                    }
                }
            }
            Some(_) if attribute.is_multi_valued() => PatchOperation::MultivaluedSimpleAttribute {
                attribute,
                op,
                values: into_values(validated),
                filter: None,
            },
            Some(_) => PatchOperation::SimpleAttribute {
                attribute,
                op,
                value: validated,
            },
        };
        trace!("Classified operation: {operation}");
        Ok(vec![operation])
    }

    /// A singular complex value is applied sub-attribute by sub-attribute.
    ///
    /// Replacing with `{}` removes the attribute; adding `{}`, or a value
    /// whose keys were all skipped, does nothing. With the SailsPoint
    /// workaround a replace is applied as an add.
    fn classify_complex(
        &self,
        attribute: SchemaAttribute<'a>,
        op: PatchOp,
        validated: Option<Value>,
        requested_empty: bool,
    ) -> Vec<PatchOperation<'a>> {
        let op = match op {
            PatchOp::Replace if self.config.activate_sails_point_workaround => PatchOp::Add,
            op => op,
        };
        let object = match validated {
            Some(Value::Object(object)) if !object.is_empty() => object,
            Some(_) if op == PatchOp::Replace && requested_empty => {
                return vec![PatchOperation::RemoveComplexAttribute { attribute }];
            }
            Some(_) => return Vec::new(),
            None => return vec![PatchOperation::RemoveComplexAttribute { attribute }],
        };

        let mut operations = Vec::with_capacity(object.len());
        for (key, value) in object {
            let Some(definition) = attribute.definition.sub_attribute(&key) else {
                continue;
            };
            let sub = attribute.child(definition);
            let (op, value) = match value {
                Value::Null => (PatchOp::Remove, None),
                value => (op, Some(value)),
            };
            let operation = if sub.is_multi_valued() {
                PatchOperation::MultivaluedSimpleAttribute {
                    attribute: sub,
                    op,
                    values: into_values(value),
                    filter: None,
                }
            } else {
                PatchOperation::SimpleAttribute {
                    attribute: sub,
                    op,
                    value,
                }
            };
            trace!("Classified operation: {operation}");
            operations.push(operation);
        }
        operations
    }
}

fn into_values(value: Option<Value>) -> Vec<Value> {
    match value {
        Some(Value::Array(values)) => values,
        Some(value) => vec![value],
        None => Vec::new(),
    }
}
