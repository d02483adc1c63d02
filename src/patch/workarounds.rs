//! Rewrites for request shapes some identity providers send.
//!
//! Each rewrite turns a non-conforming operation into the conforming one the
//! client meant. All of them are switched off unless enabled in
//! [`PatchConfig`]; a rewrite that does not recognize its input leaves the
//! operation alone so normal validation reports the problem.

use log::trace;
use serde_json::{Map, Value};

use crate::config::PatchConfig;
use crate::resource::ResourceNode;
use crate::schema::SchemaAttribute;

use super::engine::has_target;
use super::operation::PatchOperation;
use super::path::Filter;
use super::request::{PatchOp, PatchRequestOperation};

/// Apply the request-level rewrites, returning the rewritten operation if
/// any of them fired.
pub fn rewrite_request(
    config: &PatchConfig,
    request: &PatchRequestOperation,
) -> Option<PatchRequestOperation> {
    let mut rewritten = None;
    if config.ms_azure_remove_workaround {
        rewritten = remove_value_as_filter(request);
    }
    if config.ms_azure_value_sub_attribute_workaround {
        let current = rewritten.as_ref().unwrap_or(request);
        if let Some(unwrapped) = unwrap_value_sub_attribute(current) {
            rewritten = Some(unwrapped);
        }
    }
    rewritten
}

/// `remove members [{"value": "u1"}]` becomes `remove members[value eq "u1"]`.
///
/// Only objects with a single simple-valued key are understood; several of
/// them are joined with `or`.
fn remove_value_as_filter(request: &PatchRequestOperation) -> Option<PatchRequestOperation> {
    if request.op != PatchOp::Remove {
        return None;
    }
    let path = request.target_path().filter(|path| !path.contains('['))?;
    let elements = match request.target_value()? {
        Value::Array(elements) if !elements.is_empty() => elements.iter().collect::<Vec<_>>(),
        Value::Array(_) => return None,
        value => vec![value],
    };

    let mut comparisons = Vec::with_capacity(elements.len());
    for element in elements {
        let object = element.as_object().filter(|object| object.len() == 1)?;
        let (key, value) = object.iter().next()?;
        let literal = match value {
            Value::String(text) if !text.contains('"') => format!("\"{text}\""),
            Value::Number(number) => number.to_string(),
            Value::Bool(flag) => flag.to_string(),
            _ => return None,
        };
        comparisons.push(format!("{key} eq {literal}"));
    }

    let filtered = format!("{path}[{}]", comparisons.join(" or "));
    trace!("Rewrote remove with value on '{path}' to '{filtered}'");
    Some(PatchRequestOperation::new(PatchOp::Remove, Some(&filtered), None))
}

/// `[{"value": "{\"value\": \"Admin\"}"}]` becomes `[{"value": "Admin"}]`:
/// an element whose only key is `value`, holding a JSON object serialized
/// as a string, is replaced by that object.
fn unwrap_value_sub_attribute(request: &PatchRequestOperation) -> Option<PatchRequestOperation> {
    if request.op == PatchOp::Remove {
        return None;
    }
    let unwrap = |element: &Value| -> Option<Value> {
        let object = element.as_object().filter(|object| object.len() == 1)?;
        let text = object.get("value")?.as_str()?;
        serde_json::from_str::<Value>(text)
            .ok()
            .filter(Value::is_object)
    };

    let value = match request.target_value()? {
        Value::Array(elements) => {
            let mut changed = false;
            let rebuilt = elements
                .iter()
                .map(|element| match unwrap(element) {
                    Some(inner) => {
                        changed = true;
                        inner
                    }
                    None => element.clone(),
                })
                .collect();
            if !changed {
                return None;
            }
            Value::Array(rebuilt)
        }
        element => unwrap(element)?,
    };
    trace!("Unwrapped serialized 'value' elements of a {} operation", request.op);
    Some(PatchRequestOperation {
        op: request.op,
        path: request.path.clone(),
        value: Some(value),
    })
}

/// A simple value given for a complex attribute becomes `{"value": ...}`;
/// for a multi-valued attribute every simple element is wrapped.
pub fn wrap_simple_complex_value(
    config: &PatchConfig,
    attribute: &SchemaAttribute<'_>,
    value: Option<&Value>,
) -> Option<Value> {
    if !config.ms_azure_complex_simple_value_workaround || !attribute.is_complex() {
        return None;
    }
    let wrap = |element: &Value| Value::Object(Map::from_iter([("value".to_string(), element.clone())]));
    let wrapped = match value? {
        Value::Object(_) => return None,
        Value::Array(elements) => {
            if elements.iter().all(Value::is_object) {
                return None;
            }
            Value::Array(
                elements
                    .iter()
                    .map(|element| if element.is_object() { element.clone() } else { wrap(element) })
                    .collect(),
            )
        }
        simple => wrap(simple),
    };
    trace!("Wrapped simple value for complex attribute '{}'", attribute.full_name());
    Some(wrapped)
}

/// An add on `attr[key eq "x"].sub` that matches no element adds a new
/// element `{"sub": value, "key": "x"}` instead.
pub fn filtered_sub_attribute_as_element<'a>(
    config: &PatchConfig,
    resource: &ResourceNode,
    operation: PatchOperation<'a>,
) -> PatchOperation<'a> {
    if !config.ms_azure_filter_workaround || has_target(resource, &operation) {
        return operation;
    }
    let PatchOperation::MultivaluedComplexSimpleSubAttribute {
        attribute,
        sub_attribute,
        op: PatchOp::Add,
        value: Some(value),
        filter: Some(Filter::Equals {
            attribute: key,
            value: literal,
        }),
    } = &operation
    else {
        return operation;
    };
    let Some(key) = attribute
        .definition
        .sub_attribute(key)
        .map(|definition| definition.name.clone())
    else {
        return operation;
    };

    let element = Map::from_iter([
        (sub_attribute.name().to_string(), value.clone()),
        (key, literal.clone()),
    ]);
    trace!(
        "No element of '{}' matches, adding {}",
        attribute.full_name(),
        Value::Object(element.clone())
    );
    PatchOperation::MultivaluedComplexAttribute {
        attribute: *attribute,
        op: PatchOp::Add,
        values: vec![Value::Object(element)],
        filter: None,
    }
}
