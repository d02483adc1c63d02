//! Client workarounds, strict target checks and required content.

use crate::assert_patch_error;
use crate::common::fixtures::{empty_widget, full_widget};
use crate::common::{
    WIDGET_EXTENSION_ID, extension_name, run_patch, run_patch_with, widget_extension_schema,
    widget_schema,
};
use scim_patch::patch::{PatchOpRequest, PatchRequestHandler, PatchRequestOperation};
use scim_patch::{OperationKind, PatchConfig, PatchError, PatchOp, ResourceSchemas};
use serde_json::json;

#[test]
fn test_sails_point_replace_merges_sub_collections() {
    let operations = vec![PatchRequestOperation::replace("settings", json!({"flags": ["c"]}))];

    let plain = run_patch(&full_widget(), operations.clone());
    assert_eq!(
        plain.resource().attribute("settings"),
        Some(&json!({"mode": "fast", "flags": ["c"]}))
    );

    let config = PatchConfig::builder().activate_sails_point_workaround(true).build();
    let merged = run_patch_with(&full_widget(), operations, config);
    assert_eq!(
        merged.resource().attribute("settings"),
        Some(&json!({"mode": "fast", "flags": ["a", "b", "c"]}))
    );
}

#[test]
fn test_simple_value_for_complex_attribute_is_wrapped() {
    let operations = vec![
        PatchRequestOperation::add("members", json!("u3")),
        PatchRequestOperation::replace(&extension_name("owner"), json!("alice")),
    ];

    let rejected = run_patch(&full_widget(), operations.clone());
    assert!(rejected.result.is_err());
    assert!(rejected.recorder.is_empty());

    let config = PatchConfig::builder()
        .ms_azure_complex_simple_value_workaround(true)
        .build();
    let run = run_patch_with(&full_widget(), operations, config);
    let members = run.resource().attribute("members").unwrap().as_array().unwrap();
    assert_eq!(members.len(), 3);
    assert_eq!(members[2], json!({"value": "u3"}));
    assert_eq!(
        run.resource().extension(WIDGET_EXTENSION_ID).unwrap().get("owner"),
        Some(&json!({"value": "alice"}))
    );
}

#[test]
fn test_remove_with_value_removes_matching_elements() {
    let operation = PatchRequestOperation::new(
        PatchOp::Remove,
        Some("members"),
        Some(json!([{"value": "u1"}])),
    );

    let rejected = run_patch(&full_widget(), vec![operation.clone()]);
    assert_patch_error!(rejected.result, PatchError::InvalidOperation { .. });

    let config = PatchConfig::builder().ms_azure_remove_workaround(true).build();
    let run = run_patch_with(&full_widget(), vec![operation], config);
    let members = run.resource().attribute("members").unwrap().as_array().unwrap();
    assert_eq!(members.len(), 1);
    assert_eq!(members[0]["value"], json!("u2"));
    assert_eq!(run.recorder.operations[0].filter.as_deref(), Some("value eq \"u1\""));
}

#[test]
fn test_serialized_member_value_is_parsed() {
    let operations = vec![PatchRequestOperation::add(
        "members",
        json!([{"value": "{\"value\":\"u5\",\"display\":\"Eve\"}"}]),
    )];
    let config = PatchConfig::builder()
        .ms_azure_value_sub_attribute_workaround(true)
        .build();

    let run = run_patch_with(&full_widget(), operations, config);

    let members = run.resource().attribute("members").unwrap().as_array().unwrap();
    assert_eq!(members[2], json!({"value": "u5", "display": "Eve"}));
}

#[test]
fn test_filtered_add_without_match_adds_element() {
    let operations = vec![PatchRequestOperation::add(
        "members[type eq \"guest\"].value",
        json!("u9"),
    )];

    let plain = run_patch(&full_widget(), operations.clone());
    assert!(!plain.outcome().changed);

    let config = PatchConfig::builder().ms_azure_filter_workaround(true).build();
    let run = run_patch_with(&full_widget(), operations, config);
    let members = run.resource().attribute("members").unwrap().as_array().unwrap();
    assert_eq!(members.len(), 3);
    assert_eq!(members[2], json!({"value": "u9", "type": "guest"}));
    assert_eq!(run.recorder.kinds(), vec![OperationKind::MultivaluedComplexAttribute]);

    // A matching element is patched in place.
    let matching = vec![PatchRequestOperation::add(
        "members[type eq \"viewer\"].display",
        json!("Robert"),
    )];
    let config = PatchConfig::builder().ms_azure_filter_workaround(true).build();
    let run = run_patch_with(&full_widget(), matching, config);
    let members = run.resource().attribute("members").unwrap().as_array().unwrap();
    assert_eq!(members.len(), 2);
    assert_eq!(members[1]["display"], json!("Robert"));
}

#[test]
fn test_strict_mode_reports_missing_targets() {
    let strict = || PatchConfig::builder().do_not_fail_on_no_target(false).build();

    let filtered = run_patch_with(
        &full_widget(),
        vec![PatchRequestOperation::remove("numbers[value eq 99]")],
        strict(),
    );
    assert!(filtered.recorder.is_empty());
    assert_patch_error!(filtered.result, PatchError::NoTarget { .. });

    let absent = run_patch_with(&empty_widget(), vec![PatchRequestOperation::remove("label")], strict());
    assert_patch_error!(absent.result, PatchError::NoTarget { .. });

    let lenient = run_patch(&empty_widget(), vec![PatchRequestOperation::remove("label")]);
    assert!(!lenient.outcome().changed);

    let present = run_patch_with(
        &full_widget(),
        vec![PatchRequestOperation::remove("numbers[value eq 6]")],
        strict(),
    );
    assert_eq!(present.resource().attribute("numbers"), Some(&json!([5, 7])));
}

#[test]
fn test_required_extension_cannot_be_removed() {
    let schemas = ResourceSchemas::new("Widget", widget_schema())
        .with_extension(widget_extension_schema(), true);
    let handler = PatchRequestHandler::new(&schemas);
    let request = PatchOpRequest::new(vec![PatchRequestOperation::remove(WIDGET_EXTENSION_ID)]);

    let result = handler.apply(&full_widget(), &request);
    assert_patch_error!(result, PatchError::Required { .. });

    let without = handler.apply(&empty_widget(), &request).unwrap();
    assert!(!without.changed);
}
