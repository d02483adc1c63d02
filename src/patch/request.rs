//! PATCH request message types (RFC 7644 §3.5.2).

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::fmt;

/// Schema URN of a PATCH request message.
pub const PATCH_OP_SCHEMA: &str = "urn:ietf:params:scim:api:messages:2.0:PatchOp";

/// PATCH operation kind. Deserialization ignores case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PatchOp {
    Add,
    Replace,
    Remove,
}

impl PatchOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Add => "add",
            Self::Replace => "replace",
            Self::Remove => "remove",
        }
    }
}

impl fmt::Display for PatchOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for PatchOp {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for PatchOp {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let op = String::deserialize(deserializer)?;
        match op.to_ascii_lowercase().as_str() {
            "add" => Ok(Self::Add),
            "replace" => Ok(Self::Replace),
            "remove" => Ok(Self::Remove),
            _ => Err(serde::de::Error::custom(format!(
                "Unsupported PATCH operation: {op}"
            ))),
        }
    }
}

/// One entry of the `Operations` array.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatchRequestOperation {
    pub op: PatchOp,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
}

impl PatchRequestOperation {
    pub fn new(op: PatchOp, path: Option<&str>, value: Option<Value>) -> Self {
        Self {
            op,
            path: path.map(str::to_string),
            value,
        }
    }

    pub fn add(path: &str, value: Value) -> Self {
        Self::new(PatchOp::Add, Some(path), Some(value))
    }

    pub fn replace(path: &str, value: Value) -> Self {
        Self::new(PatchOp::Replace, Some(path), Some(value))
    }

    pub fn remove(path: &str) -> Self {
        Self::new(PatchOp::Remove, Some(path), None)
    }

    /// The path, or `None` if it is absent or blank.
    pub fn target_path(&self) -> Option<&str> {
        self.path
            .as_deref()
            .map(str::trim)
            .filter(|path| !path.is_empty())
    }

    /// The value, or `None` if it is absent or JSON `null`.
    pub fn target_value(&self) -> Option<&Value> {
        self.value.as_ref().filter(|value| !value.is_null())
    }
}

/// A PATCH request message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatchOpRequest {
    #[serde(default)]
    pub schemas: Vec<String>,
    #[serde(rename = "Operations")]
    pub operations: Vec<PatchRequestOperation>,
}

impl PatchOpRequest {
    pub fn new(operations: Vec<PatchRequestOperation>) -> Self {
        Self {
            schemas: vec![PATCH_OP_SCHEMA.to_string()],
            operations,
        }
    }

    /// Whether `schemas` is empty or names the PatchOp message schema.
    pub fn has_patch_schema(&self) -> bool {
        self.schemas.is_empty()
            || self
                .schemas
                .iter()
                .any(|schema| schema.eq_ignore_ascii_case(PATCH_OP_SCHEMA))
    }
}

impl From<Vec<PatchRequestOperation>> for PatchOpRequest {
    fn from(operations: Vec<PatchRequestOperation>) -> Self {
        Self::new(operations)
    }
}
