//! Singular complex attributes.

use crate::common::fixtures::{empty_widget, full_widget};
use crate::common::{main_name, run_patch, widget};
use scim_patch::OperationKind;
use scim_patch::patch::PatchRequestOperation;
use serde_json::json;

#[test]
fn test_replace_merges_sub_attributes() {
    let run = run_patch(
        &full_widget(),
        vec![PatchRequestOperation::replace("settings", json!({"mode": "safe"}))],
    );
    assert_eq!(
        run.resource().attribute("settings"),
        Some(&json!({"mode": "safe", "flags": ["a", "b"]}))
    );
    assert_eq!(run.recorder.kinds(), vec![OperationKind::SimpleAttribute]);
    assert_eq!(run.recorder.operations[0].target, main_name("settings.mode"));
}

#[test]
fn test_multivalued_sub_attribute_of_singular_complex() {
    let run = run_patch(
        &full_widget(),
        vec![PatchRequestOperation::add("settings", json!({"flags": ["c"]}))],
    );
    assert_eq!(
        run.resource().attribute("settings").unwrap()["flags"],
        json!(["a", "b", "c"])
    );
    assert_eq!(run.recorder.kinds(), vec![OperationKind::MultivaluedSimpleAttribute]);
}

#[test]
fn test_add_creates_complex_attribute() {
    let run = run_patch(
        &empty_widget(),
        vec![PatchRequestOperation::add("settings.mode", json!("fast"))],
    );
    assert_eq!(run.resource().attribute("settings"), Some(&json!({"mode": "fast"})));
}

#[test]
fn test_remove_complex_attribute() {
    let run = run_patch(&full_widget(), vec![PatchRequestOperation::remove("settings")]);
    assert_eq!(run.resource().attribute("settings"), None);
    assert_eq!(run.recorder.kinds(), vec![OperationKind::RemoveComplexAttribute]);
}

#[test]
fn test_removing_last_sub_attribute_removes_parent() {
    let run = run_patch(
        &full_widget(),
        vec![
            PatchRequestOperation::remove("settings.mode"),
            PatchRequestOperation::remove("settings.flags"),
        ],
    );
    assert_eq!(run.resource().attribute("settings"), None);
}

#[test]
fn test_replace_with_empty_object_removes() {
    let run = run_patch(&full_widget(), vec![PatchRequestOperation::replace("settings", json!({}))]);
    assert_eq!(run.resource().attribute("settings"), None);
    assert_eq!(run.recorder.kinds(), vec![OperationKind::RemoveComplexAttribute]);

    let add = run_patch(&full_widget(), vec![PatchRequestOperation::add("settings", json!({}))]);
    assert!(!add.outcome().changed);
    assert!(add.recorder.is_empty());
}

#[test]
fn test_null_sub_attribute_in_value_is_removed() {
    let run = run_patch(
        &full_widget(),
        vec![PatchRequestOperation::replace("settings", json!({"mode": null}))],
    );
    assert_eq!(
        run.resource().attribute("settings"),
        Some(&json!({"flags": ["a", "b"]}))
    );
}

#[test]
fn test_read_only_sub_attribute_in_value_is_skipped() {
    let run = run_patch(
        &full_widget(),
        vec![PatchRequestOperation::replace(
            "settings",
            json!({"mode": "safe", "checksum": "abc"}),
        )],
    );
    assert!(run.resource().attribute("settings").unwrap().get("checksum").is_none());
    assert_eq!(run.recorder.len(), 1);
}

#[test]
fn test_canonical_values_are_case_insensitive() {
    let run = run_patch(
        &full_widget(),
        vec![PatchRequestOperation::replace("settings.mode", json!("SAFE"))],
    );
    assert_eq!(run.resource().attribute("settings").unwrap()["mode"], json!("SAFE"));

    let rejected = run_patch(
        &full_widget(),
        vec![PatchRequestOperation::replace("settings.mode", json!("slow"))],
    );
    crate::assert_error_message_contains!(rejected.result, "does not match one of its canonicalValues '[fast, safe]'");
}

#[test]
fn test_value_with_only_read_only_keys_changes_nothing() {
    let run = run_patch(
        &full_widget(),
        vec![PatchRequestOperation::replace("settings", json!({"checksum": "abc"}))],
    );
    assert!(!run.outcome().changed);
    assert!(run.recorder.is_empty());
    assert_eq!(
        run.resource().attribute("settings"),
        full_widget().attribute("settings")
    );
}

#[test]
fn test_replace_with_same_value_keeps_empty_siblings() {
    let resource = widget(json!({"id": "w", "settings": {"mode": "fast", "flags": []}}));
    let run = run_patch(
        &resource,
        vec![PatchRequestOperation::replace("settings.mode", json!("fast"))],
    );
    assert!(!run.outcome().changed);
    assert_eq!(run.resource(), &resource);
    assert!(run.resource().to_json()["meta"].is_null());
    assert_eq!(
        run.resource().attribute("settings"),
        Some(&json!({"mode": "fast", "flags": []}))
    );
}
