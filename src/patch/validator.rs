//! Value validation against attribute definitions.
//!
//! [`ValueValidator::validate`] checks a request value against the declared
//! type and multiplicity of an attribute and returns it normalized: collections
//! for multi-valued attributes, a bare scalar for singular simple attributes
//! and an object holding only known, writable sub-attributes for complex ones.

use base64::{Engine, engine::general_purpose::STANDARD as BASE64};
use chrono::DateTime;
use log::debug;
use serde_json::{Map, Number, Value};

use crate::config::PatchConfig;
use crate::error::{PatchError, PatchResult};
use crate::schema::{AttributeType, SchemaAttribute};

/// Name of a JSON value's kind as used in error messages.
pub fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Validates values for schema attributes.
#[derive(Debug, Clone, Copy)]
pub struct ValueValidator<'c> {
    config: &'c PatchConfig,
    resource_type: &'c str,
}

impl<'c> ValueValidator<'c> {
    pub fn new(config: &'c PatchConfig, resource_type: &'c str) -> Self {
        Self {
            config,
            resource_type,
        }
    }

    /// Validate and normalize `value` for `attribute`.
    pub fn validate(&self, attribute: &SchemaAttribute<'_>, value: &Value) -> PatchResult<Value> {
        if attribute.is_multi_valued() {
            self.validate_multi_valued(attribute, value)
        } else {
            self.validate_single(attribute, value)
        }
    }

    /// A non-array value is accepted as a one-element collection.
    fn validate_multi_valued(
        &self,
        attribute: &SchemaAttribute<'_>,
        value: &Value,
    ) -> PatchResult<Value> {
        let elements = match value {
            Value::Array(elements) => elements.clone(),
            single => vec![single.clone()],
        };

        let mut validated = Vec::with_capacity(elements.len());
        for element in &elements {
            match self.validate_single(attribute, element) {
                Ok(element) => validated.push(element),
                Err(source) => {
                    let array = Value::Array(elements.clone());
                    let kind = if attribute.is_complex() { "multivalued complex" } else { "multivalued" };
                    let summary =
                        format!("Found unsupported value in {kind} attribute '{array}'");
                    debug!("{summary}: {source}");
                    return Err(PatchError::MultivaluedElement {
                        attribute: attribute.full_name(),
                        summary,
                        source: Box::new(source),
                    });
                }
            }
        }

        if attribute.is_complex() {
            check_single_primary(attribute, &validated)?;
        }
        Ok(Value::Array(validated))
    }

    fn validate_single(&self, attribute: &SchemaAttribute<'_>, value: &Value) -> PatchResult<Value> {
        if attribute.is_complex() {
            return self.validate_complex(attribute, value);
        }
        let scalar = match value {
            Value::Array(elements) if elements.len() == 1 && is_scalar(&elements[0]) => &elements[0],
            Value::Array(_) | Value::Object(_) => {
                return Err(PatchError::type_mismatch(
                    attribute.full_name(),
                    format!(
                        "Attribute '{}' is expected to be a simple attribute of type '{}' but is '{}'",
                        attribute.full_name(),
                        attribute.definition.data_type,
                        value
                    ),
                ));
            }
            scalar => scalar,
        };
        check_canonical_values(attribute, scalar)?;
        self.check_type(attribute, scalar)
    }

    /// Keys are mapped to their declared spelling; unknown keys fail unless
    /// ignored by configuration, read-only keys are dropped.
    fn validate_complex(&self, attribute: &SchemaAttribute<'_>, value: &Value) -> PatchResult<Value> {
        let object = match value {
            Value::Object(object) => Some(object),
            Value::Array(elements) if elements.len() == 1 => elements[0].as_object(),
            _ => None,
        };
        let Some(object) = object else {
            return Err(PatchError::type_mismatch(
                attribute.full_name(),
                format!(
                    "Attribute '{}' must be of type object but is '{}'",
                    attribute.full_name(),
                    value
                ),
            ));
        };

        let mut validated = Map::new();
        for (key, sub_value) in object {
            let Some(definition) = attribute.definition.sub_attribute(key) else {
                if self.config.ignore_unknown_attributes {
                    debug!(
                        "Ignoring unknown sub-attribute '{}' of '{}'",
                        key,
                        attribute.full_name()
                    );
                    continue;
                }
                return Err(PatchError::unknown_attribute(
                    format!("{}.{}", attribute.full_name(), key),
                    self.resource_type,
                ));
            };
            let sub = attribute.child(definition);
            if definition.is_read_only() && !attribute.is_read_only() {
                debug!("Skipping readOnly attribute '{}'", sub.full_name());
                continue;
            }
            let normalized = if sub_value.is_null() {
                Value::Null
            } else {
                self.validate(&sub, sub_value)?
            };
            validated.insert(definition.name.clone(), normalized);
        }
        Ok(Value::Object(validated))
    }

    fn check_type(&self, attribute: &SchemaAttribute<'_>, value: &Value) -> PatchResult<Value> {
        let full_name = attribute.full_name();
        let declared = attribute.definition.data_type;
        let mismatch = || {
            PatchError::type_mismatch(
                &full_name,
                format!(
                    "Value of attribute '{}' is not of type '{}' but of type '{}' with value '{}'",
                    full_name,
                    declared,
                    json_type_name(value),
                    value
                ),
            )
        };
        let coerce = self.config.coerce_string_values;

        match (declared, value) {
            (AttributeType::String | AttributeType::Reference, Value::String(_)) => Ok(value.clone()),
            (AttributeType::Boolean, Value::Bool(_)) => Ok(value.clone()),
            (AttributeType::Boolean, Value::String(text)) if coerce => {
                match text.to_ascii_lowercase().as_str() {
                    "true" => Ok(Value::Bool(true)),
                    "false" => Ok(Value::Bool(false)),
                    _ => Err(mismatch()),
                }
            }
            (AttributeType::Integer, Value::Number(number))
                if number.is_i64() || number.is_u64() =>
            {
                Ok(value.clone())
            }
            (AttributeType::Integer, Value::String(text)) if coerce => text
                .trim()
                .parse::<i64>()
                .map(Value::from)
                .map_err(|_| mismatch()),
            (AttributeType::Decimal, Value::Number(_)) => Ok(value.clone()),
            (AttributeType::Decimal, Value::String(text)) if coerce => text
                .trim()
                .parse::<f64>()
                .ok()
                .and_then(Number::from_f64)
                .map(Value::Number)
                .ok_or_else(mismatch),
            (AttributeType::DateTime, Value::String(text)) => {
                if DateTime::parse_from_rfc3339(text).is_ok() {
                    Ok(value.clone())
                } else {
                    Err(PatchError::type_mismatch(
                        &full_name,
                        format!("Given value is not a valid dateTime '{text}'"),
                    ))
                }
            }
            (AttributeType::Binary, Value::String(text)) => {
                if BASE64.decode(text).is_ok() {
                    Ok(value.clone())
                } else {
                    Err(PatchError::type_mismatch(
                        &full_name,
                        format!(
                            "Attribute '{full_name}' is not valid base64 encoded data '{text}'"
                        ),
                    ))
                }
            }
            _ => Err(mismatch()),
        }
    }
}

fn is_scalar(value: &Value) -> bool {
    !value.is_array() && !value.is_object()
}

fn check_canonical_values(attribute: &SchemaAttribute<'_>, value: &Value) -> PatchResult<()> {
    let canonical = &attribute.definition.canonical_values;
    let Value::String(text) = value else {
        return Ok(());
    };
    if canonical.is_empty() || canonical.iter().any(|allowed| allowed == text) {
        return Ok(());
    }
    let full_name = attribute.full_name();
    let listed = format!("[{}]", canonical.join(", "));
    let loose_match = canonical.iter().any(|allowed| allowed.eq_ignore_ascii_case(text));
    match (loose_match, attribute.definition.case_exact) {
        (true, false) => Ok(()),
        (true, true) => Err(PatchError::type_mismatch(
            &full_name,
            format!(
                "Attribute '{full_name}' is caseExact and does not match its canonicalValues '{listed}' actual value is '{text}'"
            ),
        )),
        (false, _) => Err(PatchError::type_mismatch(
            &full_name,
            format!(
                "Attribute '{full_name}' does not match one of its canonicalValues '{listed}' actual value is '{text}'"
            ),
        )),
    }
}

fn check_single_primary(attribute: &SchemaAttribute<'_>, elements: &[Value]) -> PatchResult<()> {
    let primaries = elements
        .iter()
        .filter(|element| element.get("primary") == Some(&Value::Bool(true)))
        .count();
    if primaries > 1 {
        let full_name = attribute.full_name();
        return Err(PatchError::type_mismatch(
            &full_name,
            format!(
                "Attribute '{full_name}' has at least two primary values but only one primary is allowed '{}'",
                Value::Array(elements.to_vec())
            ),
        ));
    }
    Ok(())
}
