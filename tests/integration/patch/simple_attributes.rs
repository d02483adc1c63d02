//! Singular scalar attributes.

use crate::common::fixtures::{empty_widget, full_widget};
use crate::common::{main_name, run_patch, run_patch_with};
use scim_patch::patch::{PatchOp, PatchRequestOperation};
use scim_patch::{OperationKind, PatchConfig};
use serde_json::{Value, json};

#[test]
fn test_replace_sets_value_and_notifies_once() {
    let run = run_patch(&empty_widget(), vec![PatchRequestOperation::replace("count", json!(42))]);

    assert!(run.outcome().changed);
    assert_eq!(run.resource().attribute("count"), Some(&json!(42)));
    assert_eq!(run.recorder.kinds(), vec![OperationKind::SimpleAttribute]);
    assert_eq!(run.recorder.operations[0].target, main_name("count"));
    assert_eq!(run.recorder.operations[0].op, PatchOp::Replace);
}

#[test]
fn test_replace_with_null_removes() {
    let run = run_patch(
        &full_widget(),
        vec![PatchRequestOperation::new(
            PatchOp::Replace,
            Some("label"),
            Some(Value::Null),
        )],
    );

    assert!(run.outcome().changed);
    assert_eq!(run.resource().attribute("label"), None);
    assert_eq!(run.recorder.kinds(), vec![OperationKind::SimpleAttribute]);
    assert_eq!(run.recorder.operations[0].op, PatchOp::Remove);
    assert!(run.recorder.operations[0].values.is_empty());
}

#[test]
fn test_remove_twice_is_idempotent() {
    let run = run_patch(
        &full_widget(),
        vec![
            PatchRequestOperation::remove("count"),
            PatchRequestOperation::remove("count"),
        ],
    );

    assert!(run.outcome().changed);
    assert_eq!(run.resource().attribute("count"), None);
    assert_eq!(run.recorder.len(), 2);

    let again = run_patch(run.resource(), vec![PatchRequestOperation::remove("count")]);
    assert!(!again.outcome().changed);
}

#[test]
fn test_replace_with_same_value_is_unchanged() {
    let run = run_patch(&full_widget(), vec![PatchRequestOperation::replace("count", json!(3))]);
    assert!(!run.outcome().changed);
    assert_eq!(run.recorder.len(), 1);
    assert_eq!(run.resource().attribute("meta"), None);
}

#[test]
fn test_later_operations_see_earlier_ones() {
    let run = run_patch(
        &empty_widget(),
        vec![
            PatchRequestOperation::add("label", json!("first")),
            PatchRequestOperation::replace("label", json!("second")),
        ],
    );
    assert_eq!(run.resource().attribute("label"), Some(&json!("second")));
    assert_eq!(run.recorder.len(), 2);
}

#[test]
fn test_attribute_names_are_case_insensitive() {
    let run = run_patch(&full_widget(), vec![PatchRequestOperation::replace("COUNT", json!(4))]);
    assert_eq!(run.resource().attribute("count"), Some(&json!(4)));
    assert!(run.resource().attributes().get("COUNT").is_none());
}

#[test]
fn test_single_element_array_for_scalar() {
    let run = run_patch(&empty_widget(), vec![PatchRequestOperation::add("label", json!(["boxed"]))]);
    assert_eq!(run.resource().attribute("label"), Some(&json!("boxed")));
}

#[test]
fn test_resource_scoped_value() {
    let run = run_patch(
        &full_widget(),
        vec![PatchRequestOperation::new(
            PatchOp::Replace,
            None,
            Some(json!({
                "schemas": ["ignored"],
                "meta": {"lastModified": "2020-01-01T00:00:00Z"},
                "id": "not-allowed",
                "label": "renamed",
                "enabled": true
            })),
        )],
    );

    let resource = run.resource();
    assert_eq!(resource.id(), Some("w-1"));
    assert_eq!(resource.attribute("label"), Some(&json!("renamed")));
    assert_eq!(resource.attribute("enabled"), Some(&json!(true)));
    assert_eq!(
        run.recorder.kinds(),
        vec![OperationKind::SimpleAttribute, OperationKind::SimpleAttribute]
    );
}

#[test]
fn test_remove_with_resource_value_removes_each_key() {
    let run = run_patch(
        &full_widget(),
        vec![PatchRequestOperation::new(
            PatchOp::Remove,
            None,
            Some(json!({"label": "x", "count": 1})),
        )],
    );
    assert_eq!(run.resource().attribute("label"), None);
    assert_eq!(run.resource().attribute("count"), None);
}

#[test]
fn test_string_coercion_is_opt_in() {
    let strict = run_patch(&empty_widget(), vec![PatchRequestOperation::add("count", json!("7"))]);
    assert!(strict.result.is_err());

    let lenient = run_patch_with(
        &empty_widget(),
        vec![
            PatchRequestOperation::add("count", json!("7")),
            PatchRequestOperation::add("enabled", json!("TRUE")),
            PatchRequestOperation::add("ratio", json!("0.5")),
        ],
        PatchConfig::builder().coerce_string_values(true).build(),
    );
    let resource = lenient.resource();
    assert_eq!(resource.attribute("count"), Some(&json!(7)));
    assert_eq!(resource.attribute("enabled"), Some(&json!(true)));
    assert_eq!(resource.attribute("ratio"), Some(&json!(0.5)));
}

#[test]
fn test_changed_request_sets_last_modified() {
    let run = run_patch(&empty_widget(), vec![PatchRequestOperation::add("label", json!("x"))]);
    let modified = run.resource().attribute("meta").unwrap()["lastModified"]
        .as_str()
        .unwrap()
        .to_string();
    assert!(chrono::DateTime::parse_from_rfc3339(&modified).is_ok());
}
