//! Application of classified operations to a [`ResourceNode`].
//!
//! Mutation never fails: validation already happened during classification.
//! A filter that matches nothing and a removal of an absent attribute leave
//! the resource untouched. Only what an operation empties is dropped: the
//! collection it cleared, the element it stripped, the complex parent or the
//! extension it left without attributes. Data it did not touch stays as it is.

use log::trace;
use serde_json::{Map, Value};

use crate::resource::ResourceNode;
use crate::resource::node::find_key;
use crate::schema::{AttributeDefinition, SchemaAttribute};

use super::operation::PatchOperation;
use super::path::Filter;
use super::request::PatchOp;

/// Apply `operation` to `resource`, returning whether the resource changed.
pub fn apply_operation(resource: &mut ResourceNode, operation: &PatchOperation<'_>) -> bool {
    let extension = operation
        .attribute()
        .filter(|attribute| attribute.is_extension())
        .map(|attribute| attribute.schema_id().to_string());
    let had_extension = extension
        .as_deref()
        .is_some_and(|urn| resource.has_extension(urn));
    let before = snapshot(resource, operation);

    match operation {
        PatchOperation::SimpleAttribute {
            attribute, value, ..
        } => match value {
            Some(value) => {
                if let Some(holder) = holder_mut(resource, attribute, true) {
                    upsert(holder, attribute.name(), value.clone());
                }
            }
            None => {
                let removed = holder_mut(resource, attribute, false)
                    .is_some_and(|holder| remove_key(holder, attribute.name()));
                if removed {
                    drop_empty_parent(resource, attribute);
                }
            }
        },
        PatchOperation::MultivaluedSimpleAttribute {
            attribute,
            op,
            values,
            filter,
        } => {
            let create = *op != PatchOp::Remove && !values.is_empty();
            let removed = holder_mut(resource, attribute, create).is_some_and(|holder| {
                patch_collection(
                    holder,
                    attribute.name(),
                    attribute.definition,
                    *op,
                    values,
                    filter.as_ref(),
                )
            });
            if removed {
                drop_empty_parent(resource, attribute);
            }
        }
        PatchOperation::RemoveComplexAttribute { attribute } => {
            if let Some(container) = resource.container_mut(attribute, false) {
                remove_key(container, attribute.name());
            }
        }
        PatchOperation::MultivaluedComplexAttribute {
            attribute,
            op,
            values,
            filter,
        } => {
            let create = *op != PatchOp::Remove && !values.is_empty();
            if let Some(container) = resource.container_mut(attribute, create) {
                patch_collection(
                    container,
                    attribute.name(),
                    attribute.definition,
                    *op,
                    values,
                    filter.as_ref(),
                );
                if let Some(primary) = values.iter().find(|value| is_primary(value)) {
                    if let Some(Value::Array(items)) = get_mut(container, attribute.name()) {
                        clear_other_primaries(items, |item| item == primary);
                    }
                }
            }
        }
        PatchOperation::MultivaluedComplexSimpleSubAttribute {
            attribute,
            sub_attribute,
            value,
            filter,
            ..
        } => set_sub_attribute(resource, attribute, sub_attribute, value.as_ref(), filter.as_ref()),
        PatchOperation::MultivaluedComplexMultivaluedSubAttribute {
            attribute,
            sub_attribute,
            op,
            values,
            filter,
        } => patch_sub_collection(resource, attribute, sub_attribute, *op, values, filter.as_ref()),
        PatchOperation::RemoveExtensionRef { schema } => {
            resource.remove_extension(&schema.id);
        }
    }

    let changed = snapshot(resource, operation) != before;
    if let Some(urn) = extension {
        if changed || !had_extension {
            resource.prune_extension(&urn);
        }
    }
    trace!("Applied {operation} (changed: {changed})");
    changed
}

/// Whether `operation` finds something to work on: an element matching its
/// filter, or for removals the attribute or extension to remove. Unfiltered
/// add and replace always have a target.
pub fn has_target(resource: &ResourceNode, operation: &PatchOperation<'_>) -> bool {
    let Some(attribute) = operation.attribute() else {
        return match operation {
            PatchOperation::RemoveExtensionRef { schema } => resource.has_extension(&schema.id),
            _ => true,
        };
    };
    let top = resource.value_of(&attribute);
    if let Some(filter) = operation.filter() {
        let collection = attribute.parent_attribute().unwrap_or(attribute);
        return top.and_then(Value::as_array).is_some_and(|items| {
            items
                .iter()
                .any(|item| filter.matches(item, collection.definition))
        });
    }
    if operation.op() != PatchOp::Remove {
        return true;
    }
    if attribute.parent_attribute().is_none() {
        return top.is_some();
    }
    let holds = |value: &Value| {
        value
            .as_object()
            .is_some_and(|object| find_key(object, attribute.name()).is_some())
    };
    match top {
        Some(Value::Array(items)) => items.iter().any(holds),
        Some(value) => holds(value),
        None => false,
    }
}

/// Copy of the state an operation can touch: the top-level attribute, or
/// the whole extension for extension removal.
fn snapshot(resource: &ResourceNode, operation: &PatchOperation<'_>) -> Option<Value> {
    match operation {
        PatchOperation::RemoveExtensionRef { schema } => resource
            .extension(&schema.id)
            .cloned()
            .map(Value::Object),
        other => other
            .attribute()
            .and_then(|attribute| resource.value_of(&attribute))
            .cloned(),
    }
}

/// The map that directly holds `attribute`: its schema's container, or the
/// object of its singular complex parent.
fn holder_mut<'r>(
    resource: &'r mut ResourceNode,
    attribute: &SchemaAttribute<'_>,
    create: bool,
) -> Option<&'r mut Map<String, Value>> {
    let container = resource.container_mut(attribute, create)?;
    let Some(parent) = attribute.parent_attribute() else {
        return Some(container);
    };
    let key = match find_key(container, parent.name()) {
        Some(key) => key.to_string(),
        None if create => parent.name().to_string(),
        None => return None,
    };
    let slot = container
        .entry(key)
        .or_insert_with(|| Value::Object(Map::new()));
    if !slot.is_object() && create {
        *slot = Value::Object(Map::new());
    }
    slot.as_object_mut()
}

/// Drop the singular complex parent of `attribute` once it holds nothing.
fn drop_empty_parent(resource: &mut ResourceNode, attribute: &SchemaAttribute<'_>) {
    let Some(parent) = attribute.parent_attribute() else {
        return;
    };
    let Some(container) = resource.container_mut(attribute, false) else {
        return;
    };
    let empty = get_mut(container, parent.name())
        .and_then(|value| value.as_object())
        .is_some_and(Map::is_empty);
    if empty {
        remove_key(container, parent.name());
    }
}

fn get_mut<'m>(map: &'m mut Map<String, Value>, name: &str) -> Option<&'m mut Value> {
    let key = find_key(map, name)?.to_string();
    map.get_mut(&key)
}

fn upsert(map: &mut Map<String, Value>, name: &str, value: Value) {
    let key = find_key(map, name).unwrap_or(name).to_string();
    map.insert(key, value);
}

fn remove_key(map: &mut Map<String, Value>, name: &str) -> bool {
    match find_key(map, name).map(str::to_string) {
        Some(key) => map.remove(&key).is_some(),
        None => false,
    }
}

/// The array stored under `name`, created if absent. A scalar already stored
/// there becomes the first element.
fn array_mut<'m>(map: &'m mut Map<String, Value>, name: &str) -> Option<&'m mut Vec<Value>> {
    let key = find_key(map, name).unwrap_or(name).to_string();
    let slot = map.entry(key).or_insert(Value::Null);
    let items = match slot.take() {
        Value::Array(items) => items,
        Value::Null => Vec::new(),
        other => vec![other],
    };
    *slot = Value::Array(items);
    slot.as_array_mut()
}

/// Apply a collection-level operation to the array `name` in `holder`,
/// returning whether the array was removed from `holder`.
///
/// Without a filter, add appends `values` in order, replace overwrites and
/// remove deletes the whole collection. Adding nothing is a no-op and
/// replacing with nothing is a removal. With a filter, remove drops the
/// matching elements and add/replace swap them for `values`; a collection
/// left empty by that is removed.
fn patch_collection(
    holder: &mut Map<String, Value>,
    name: &str,
    definition: &AttributeDefinition,
    op: PatchOp,
    values: &[Value],
    filter: Option<&Filter>,
) -> bool {
    match (op, filter) {
        (PatchOp::Remove, None) => remove_key(holder, name),
        (PatchOp::Replace, None) if values.is_empty() => remove_key(holder, name),
        (PatchOp::Replace, None) => {
            upsert(holder, name, Value::Array(values.to_vec()));
            false
        }
        (PatchOp::Add, None) => {
            if !values.is_empty() {
                if let Some(items) = array_mut(holder, name) {
                    items.extend(values.iter().cloned());
                }
            }
            false
        }
        (op, Some(filter)) => {
            let Some(Value::Array(items)) = get_mut(holder, name) else {
                return false;
            };
            let before = items.len();
            items.retain(|item| !filter.matches(item, definition));
            if items.len() == before {
                return false;
            }
            if op != PatchOp::Remove {
                items.extend(values.iter().cloned());
            }
            items.is_empty() && remove_key(holder, name)
        }
    }
}

fn is_primary(value: &Value) -> bool {
    value.get("primary") == Some(&Value::Bool(true))
}

/// Only one element of a multi-valued complex attribute may be primary.
fn clear_other_primaries(items: &mut [Value], keep: impl Fn(&Value) -> bool) {
    for item in items.iter_mut() {
        if is_primary(item) && !keep(item) {
            if let Value::Object(object) = item {
                object.insert("primary".to_string(), Value::Bool(false));
            }
        }
    }
}

/// Indices of the elements a sub-attribute operation applies to.
fn matching_elements(
    items: &[Value],
    definition: &AttributeDefinition,
    filter: Option<&Filter>,
) -> Vec<usize> {
    items
        .iter()
        .enumerate()
        .filter(|(_, item)| item.is_object())
        .filter(|(_, item)| filter.is_none_or(|filter| filter.matches(item, definition)))
        .map(|(index, _)| index)
        .collect()
}

/// The elements of the multi-valued complex attribute `name`; created if
/// `create`.
fn elements_mut<'m>(
    container: &'m mut Map<String, Value>,
    name: &str,
    create: bool,
) -> Option<&'m mut Vec<Value>> {
    if create {
        return array_mut(container, name);
    }
    match get_mut(container, name) {
        Some(Value::Array(items)) => Some(items),
        _ => None,
    }
}

/// Drop the elements at `emptied`, then the collection itself once nothing
/// is left in it.
fn drop_emptied_elements(container: &mut Map<String, Value>, name: &str, emptied: &[usize]) {
    if emptied.is_empty() {
        return;
    }
    let Some(items) = elements_mut(container, name, false) else {
        return;
    };
    let mut position = 0;
    items.retain(|_| {
        let keep = !emptied.contains(&position);
        position += 1;
        keep
    });
    if items.is_empty() {
        remove_key(container, name);
    }
}

/// Set or remove a simple sub-attribute on the selected elements. Without a
/// filter and without any element, setting a value creates one element.
fn set_sub_attribute(
    resource: &mut ResourceNode,
    attribute: &SchemaAttribute<'_>,
    sub_attribute: &SchemaAttribute<'_>,
    value: Option<&Value>,
    filter: Option<&Filter>,
) {
    let create = value.is_some() && filter.is_none();
    let Some(container) = resource.container_mut(attribute, create) else {
        return;
    };
    let Some(items) = elements_mut(container, attribute.name(), create) else {
        return;
    };
    let matched = matching_elements(items, attribute.definition, filter);
    let name = sub_attribute.name();

    match value {
        Some(value) => {
            if matched.is_empty() && filter.is_none() {
                let element = Map::from_iter([(name.to_string(), value.clone())]);
                items.push(Value::Object(element));
                return;
            }
            for &index in &matched {
                if let Value::Object(element) = &mut items[index] {
                    upsert(element, name, value.clone());
                }
            }
            if name == "primary" && value == &Value::Bool(true) {
                for (position, item) in items.iter_mut().enumerate() {
                    if matched.contains(&position) || !is_primary(item) {
                        continue;
                    }
                    if let Value::Object(object) = item {
                        object.insert("primary".to_string(), Value::Bool(false));
                    }
                }
            }
        }
        None => {
            let mut emptied = Vec::new();
            for &index in &matched {
                if let Value::Object(element) = &mut items[index] {
                    if remove_key(element, name) && element.is_empty() {
                        emptied.push(index);
                    }
                }
            }
            drop_emptied_elements(container, attribute.name(), &emptied);
        }
    }
}

/// Apply a collection-level operation to a multi-valued sub-attribute of the
/// selected elements.
fn patch_sub_collection(
    resource: &mut ResourceNode,
    attribute: &SchemaAttribute<'_>,
    sub_attribute: &SchemaAttribute<'_>,
    op: PatchOp,
    values: &[Value],
    filter: Option<&Filter>,
) {
    let op = match op {
        PatchOp::Add if values.is_empty() => return,
        PatchOp::Replace if values.is_empty() => PatchOp::Remove,
        op => op,
    };
    let create = op != PatchOp::Remove && filter.is_none();
    let Some(container) = resource.container_mut(attribute, create) else {
        return;
    };
    let Some(items) = elements_mut(container, attribute.name(), create) else {
        return;
    };
    let matched = matching_elements(items, attribute.definition, filter);
    if matched.is_empty() && create {
        let element = Map::from_iter([(
            sub_attribute.name().to_string(),
            Value::Array(values.to_vec()),
        )]);
        items.push(Value::Object(element));
        return;
    }
    let mut emptied = Vec::new();
    for index in matched {
        if let Value::Object(element) = &mut items[index] {
            let removed = patch_collection(
                element,
                sub_attribute.name(),
                sub_attribute.definition,
                op,
                values,
                None,
            );
            if removed && element.is_empty() {
                emptied.push(index);
            }
        }
    }
    drop_emptied_elements(container, attribute.name(), &emptied);
}
