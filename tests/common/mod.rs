//! Common test utilities for PATCH testing.
//!
//! Provides a `Widget` resource type whose schema covers every attribute
//! shape the classifier distinguishes, a handful of resource fixtures and
//! helpers to run requests while recording handler notifications.

use scim_patch::patch::{
    PatchOpRequest, PatchRequestHandler, PatchRequestOperation, RecordingOperationHandler,
};
use scim_patch::{PatchConfig, PatchOutcome, PatchResult, ResourceNode, ResourceSchemas, Schema};
use serde_json::{Value, json};


pub const WIDGET_SCHEMA_ID: &str = "urn:test:params:scim:schemas:core:2.0:Widget";
pub const WIDGET_EXTENSION_ID: &str = "urn:test:params:scim:schemas:extension:tracking:2.0:Widget";

/// Assert that a result failed with an error whose message contains `$substring`.
#[macro_export]
macro_rules! assert_error_message_contains {
    ($result:expr, $substring:expr) => {
        match $result {
            Err(err) => assert!(
                err.to_string().contains($substring),
                "Error message '{}' does not contain '{}'",
                err.to_string(),
                $substring
            ),
            Ok(_) => panic!("Expected error containing '{}', but patch succeeded", $substring),
        }
    };
}

/// Assert that a result failed with a specific error variant.
#[macro_export]
macro_rules! assert_patch_error {
    ($result:expr, $variant:pat) => {
        match $result {
            Err(error) => assert!(
                matches!(error, $variant),
                "Expected {}, got {:?}",
                stringify!($variant),
                error
            ),
            Ok(_) => panic!("Expected {}, but patch succeeded", stringify!($variant)),
        }
    };
}

pub fn widget_schema() -> Schema {
    serde_json::from_value(json!({
        "id": WIDGET_SCHEMA_ID,
        "name": "Widget",
        "description": "Test resource covering every attribute shape",
        "attributes": [
            {"name": "id", "type": "string", "mutability": "readOnly", "caseExact": true},
            {"name": "label", "type": "string"},
            {"name": "count", "type": "integer"},
            {"name": "ratio", "type": "decimal"},
            {"name": "enabled", "type": "boolean"},
            {"name": "numbers", "type": "integer", "multiValued": true},
            {"name": "tags", "type": "string", "multiValued": true},
            {"name": "settings", "type": "complex", "subAttributes": [
                {"name": "mode", "type": "string", "canonicalValues": ["fast", "safe"]},
                {"name": "flags", "type": "string", "multiValued": true},
                {"name": "checksum", "type": "string", "mutability": "readOnly"}
            ]},
            {"name": "members", "type": "complex", "multiValued": true, "subAttributes": [
                {"name": "value", "type": "string"},
                {"name": "display", "type": "string"},
                {"name": "type", "type": "string"},
                {"name": "primary", "type": "boolean"},
                {"name": "roles", "type": "string", "multiValued": true}
            ]},
            {"name": "meta", "type": "complex", "mutability": "readOnly", "subAttributes": [
                {"name": "lastModified", "type": "dateTime"}
            ]}
        ]
    }))
    .expect("widget schema")
}

pub fn widget_extension_schema() -> Schema {
    serde_json::from_value(json!({
        "id": WIDGET_EXTENSION_ID,
        "name": "WidgetTracking",
        "attributes": [
            {"name": "label", "type": "string"},
            {"name": "level", "type": "integer"},
            {"name": "owner", "type": "complex", "subAttributes": [
                {"name": "value", "type": "string"},
                {"name": "display", "type": "string"}
            ]}
        ]
    }))
    .expect("widget extension schema")
}

pub fn widget_schemas() -> ResourceSchemas {
    ResourceSchemas::new("Widget", widget_schema()).with_extension(widget_extension_schema(), false)
}

pub fn widget(data: Value) -> ResourceNode {
    ResourceNode::from_json(data, &widget_schemas()).expect("widget resource")
}

/// Route `log` output through `env_logger`; set `RUST_LOG=scim_patch=trace` to see it.
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Result of running one request against the Widget resource type.
pub struct PatchRun {
    pub result: PatchResult<PatchOutcome>,
    pub recorder: RecordingOperationHandler,
}

impl PatchRun {
    pub fn outcome(&self) -> &PatchOutcome {
        match &self.result {
            Ok(outcome) => outcome,
            Err(error) => panic!("Expected patch to succeed, got {error}"),
        }
    }

    pub fn resource(&self) -> &ResourceNode {
        &self.outcome().resource
    }
}

pub fn run_patch(resource: &ResourceNode, operations: Vec<PatchRequestOperation>) -> PatchRun {
    run_patch_with(resource, operations, PatchConfig::default())
}

pub fn run_patch_with(
    resource: &ResourceNode,
    operations: Vec<PatchRequestOperation>,
    config: PatchConfig,
) -> PatchRun {
    init_logging();
    let schemas = widget_schemas();
    let handler = PatchRequestHandler::with_config(&schemas, config);
    let mut recorder = RecordingOperationHandler::new();
    let result = handler.patch(resource, &PatchOpRequest::new(operations), &mut recorder);
    PatchRun { result, recorder }
}

/// Full name of a main-schema attribute.
pub fn main_name(attribute: &str) -> String {
    format!("{WIDGET_SCHEMA_ID}:{attribute}")
}

/// Full name of an extension attribute.
pub fn extension_name(attribute: &str) -> String {
    format!("{WIDGET_EXTENSION_ID}:{attribute}")
}
