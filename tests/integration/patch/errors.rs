//! Rejected requests and error reporting.

use crate::common::fixtures::{empty_widget, full_widget};
use crate::common::{main_name, run_patch, run_patch_with};
use crate::{assert_error_message_contains, assert_patch_error};
use scim_patch::patch::{PatchOp, PatchOpRequest, PatchRequestHandler, PatchRequestOperation};
use scim_patch::{PatchConfig, PatchError};
use serde_json::json;

#[test]
fn test_string_for_integer() {
    let run = run_patch(&empty_widget(), vec![PatchRequestOperation::add("count", json!("hello"))]);
    let error = run.result.unwrap_err();
    let expected = format!(
        "Value of attribute '{}' is not of type 'integer' but of type 'string' with value '\"hello\"'",
        main_name("count")
    );
    assert_eq!(error.to_string(), expected);

    let report = error.report();
    assert_eq!(report.detail, expected);
    assert_eq!(report.scim_type, "invalidValue");
    assert_eq!(report.field_errors[&main_name("count")], vec![expected]);
}

#[test]
fn test_bad_element_in_integer_array() {
    let run = run_patch(
        &empty_widget(),
        vec![PatchRequestOperation::replace("numbers", json!([5, "hello"]))],
    );
    let error = run.result.unwrap_err();
    assert!(matches!(error, PatchError::MultivaluedElement { .. }));

    let messages = &error.report().field_errors[&main_name("numbers")];
    assert_eq!(messages.len(), 2);
    assert_eq!(
        messages[0],
        "Found unsupported value in multivalued attribute '[5,\"hello\"]'"
    );
    assert_eq!(
        messages[1],
        format!(
            "Value of attribute '{}' is not of type 'integer' but of type 'string' with value '\"hello\"'",
            main_name("numbers")
        )
    );
}

#[test]
fn test_bad_element_in_complex_array() {
    let run = run_patch(
        &full_widget(),
        vec![PatchRequestOperation::add("members", json!([{"value": 1}]))],
    );
    let error = run.result.unwrap_err();
    let messages = &error.report().field_errors[&main_name("members")];
    assert_eq!(
        messages[0],
        "Found unsupported value in multivalued complex attribute '[{\"value\":1}]'"
    );
}

#[test]
fn test_two_primaries() {
    let run = run_patch(
        &empty_widget(),
        vec![PatchRequestOperation::add(
            "members",
            json!([{"value": "a", "primary": true}, {"value": "b", "primary": true}]),
        )],
    );
    assert_error_message_contains!(run.result, "has at least two primary values");
}

#[test]
fn test_object_for_simple_attribute() {
    let run = run_patch(&empty_widget(), vec![PatchRequestOperation::add("label", json!({"a": 1}))]);
    assert_error_message_contains!(run.result, "is expected to be a simple attribute of type 'string'");
}

#[test]
fn test_scalar_for_complex_attribute() {
    let run = run_patch(&empty_widget(), vec![PatchRequestOperation::add("settings", json!("fast"))]);
    assert_error_message_contains!(run.result, "must be of type object but is '\"fast\"'");
}

#[test]
fn test_unknown_attribute() {
    let run = run_patch(&empty_widget(), vec![PatchRequestOperation::add("colour", json!("red"))]);
    assert_patch_error!(run.result, PatchError::UnknownAttribute { .. });

    let run = run_patch(&empty_widget(), vec![PatchRequestOperation::add("colour", json!("red"))]);
    assert_error_message_contains!(run.result, "Attribute 'colour' is unknown to resource type 'Widget'");
}

#[test]
fn test_unknown_sub_attribute_in_value() {
    let run = run_patch(
        &empty_widget(),
        vec![PatchRequestOperation::add("settings", json!({"speed": 3}))],
    );
    assert_patch_error!(run.result, PatchError::UnknownAttribute { .. });

    let ignored = run_patch_with(
        &empty_widget(),
        vec![PatchRequestOperation::add("settings", json!({"speed": 3, "mode": "fast"}))],
        PatchConfig::builder().ignore_unknown_attributes(true).build(),
    );
    assert_eq!(ignored.resource().attribute("settings"), Some(&json!({"mode": "fast"})));
}

#[test]
fn test_malformed_paths() {
    for path in [
        "numbers[value eq 6",
        "numbers[value gt 6]",
        "members[value eq \"a\"",
        "members[]",
    ] {
        let run = run_patch(&full_widget(), vec![PatchRequestOperation::remove(path)]);
        assert_patch_error!(run.result, PatchError::PathSyntax { .. });
    }
}

#[test]
fn test_filter_on_singular_attribute() {
    let run = run_patch(&full_widget(), vec![PatchRequestOperation::remove("label[value eq \"x\"]")]);
    assert_patch_error!(run.result, PatchError::PathSyntax { .. });
}

#[test]
fn test_filtered_write_on_simple_collection() {
    for operation in [
        PatchRequestOperation::replace("numbers[value eq 6]", json!(9)),
        PatchRequestOperation::add("tags[value eq \"blue\"]", json!("green")),
    ] {
        let run = run_patch(&full_widget(), vec![operation]);
        assert_error_message_contains!(run.result, "only supported for remove operations");
        assert!(run.recorder.is_empty());
    }
    let run = run_patch(
        &full_widget(),
        vec![PatchRequestOperation::replace("numbers[value eq 6]", json!(9))],
    );
    assert_patch_error!(run.result, PatchError::InvalidOperation { .. });
}

#[test]
fn test_read_only_path() {
    let run = run_patch(&full_widget(), vec![PatchRequestOperation::replace("id", json!("x"))]);
    let error = run.result.unwrap_err();
    assert!(matches!(error, PatchError::Mutability { .. }));
    assert_eq!(error.report().scim_type, "mutability");
}

#[test]
fn test_remove_without_target() {
    let run = run_patch(
        &full_widget(),
        vec![PatchRequestOperation::new(PatchOp::Remove, None, None)],
    );
    assert_error_message_contains!(run.result, "Missing target for remove operation");
}

#[test]
fn test_remove_with_value() {
    let run = run_patch(
        &full_widget(),
        vec![PatchRequestOperation::new(PatchOp::Remove, Some("label"), Some(json!("x")))],
    );
    assert_patch_error!(run.result, PatchError::InvalidOperation { .. });
}

#[test]
fn test_failure_discards_earlier_operations() {
    let original = full_widget();
    let run = run_patch(
        &original,
        vec![
            PatchRequestOperation::replace("label", json!("changed")),
            PatchRequestOperation::remove("tags"),
            PatchRequestOperation::add("count", json!(1.5)),
        ],
    );
    assert_patch_error!(run.result, PatchError::TypeMismatch { .. });
    assert!(run.recorder.is_empty());
    assert_eq!(original, full_widget());
}

#[test]
fn test_request_without_patch_schema() {
    let schemas = crate::common::widget_schemas();
    let mut request = PatchOpRequest::new(vec![PatchRequestOperation::remove("label")]);
    request.schemas = vec!["urn:example:not-a-patch".to_string()];
    let result = PatchRequestHandler::new(&schemas).patch(
        &full_widget(),
        &request,
        &mut scim_patch::patch::RecordingOperationHandler::new(),
    );
    assert_patch_error!(result, PatchError::InvalidOperation { .. });
}

#[test]
fn test_request_json_shape() {
    let request: PatchOpRequest = serde_json::from_value(json!({
        "schemas": ["urn:ietf:params:scim:api:messages:2.0:PatchOp"],
        "Operations": [
            {"op": "Add", "path": "label", "value": "from json"},
            {"op": "remove", "path": "numbers[value eq 5]"}
        ]
    }))
    .unwrap();
    let schemas = crate::common::widget_schemas();
    let outcome = PatchRequestHandler::new(&schemas)
        .patch(
            &full_widget(),
            &request,
            &mut scim_patch::patch::StoreOperationHandler::new(),
        )
        .unwrap();
    assert_eq!(outcome.resource.attribute("label"), Some(&json!("from json")));
    assert_eq!(outcome.resource.attribute("numbers"), Some(&json!([6, 7])));
}
