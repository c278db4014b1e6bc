//! Patch operations and the PatchOp request body (RFC 7644 section 3.5.2).

use super::path::PatchOperationPath;
use crate::error::{PatchError, PatchResult, ScimResult};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// Schema URN of a PATCH request body.
pub const PATCH_OP_URN: &str = "urn:ietf:params:scim:api:messages:2.0:PatchOp";

/// Patch operation kind. Parsed case-insensitively, written lowercase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PatchOp {
    Add,
    Remove,
    Replace,
}

impl PatchOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Add => "add",
            Self::Remove => "remove",
            Self::Replace => "replace",
        }
    }
}

impl fmt::Display for PatchOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PatchOp {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "add" => Ok(Self::Add),
            "remove" => Ok(Self::Remove),
            "replace" => Ok(Self::Replace),
            _ => Err(format!("unsupported patch operation '{}'", s)),
        }
    }
}

impl<'de> Deserialize<'de> for PatchOp {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let op = String::deserialize(deserializer)?;
        op.parse().map_err(serde::de::Error::custom)
    }
}

/// One entry of the `Operations` array.
///
/// A JSON `null` value deserializes as an absent value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatchOperation {
    pub op: PatchOp,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PatchOperationPath>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
}

impl PatchOperation {
    pub fn new(op: PatchOp, path: Option<PatchOperationPath>, value: Option<Value>) -> Self {
        Self { op, path, value }
    }

    pub fn add(path: Option<PatchOperationPath>, value: Value) -> Self {
        Self::new(PatchOp::Add, path, Some(value))
    }

    pub fn replace(path: Option<PatchOperationPath>, value: Value) -> Self {
        Self::new(PatchOp::Replace, path, Some(value))
    }

    pub fn remove(path: PatchOperationPath) -> Self {
        Self::new(PatchOp::Remove, Some(path), None)
    }
}

/// A PATCH request body.
///
/// ```rust
/// use scim_core::patch::{PatchOp, PatchRequest};
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let request = PatchRequest::from_json(r#"{
///     "schemas": ["urn:ietf:params:scim:api:messages:2.0:PatchOp"],
///     "Operations": [{"op": "Replace", "path": "active", "value": false}]
/// }"#)?;
/// assert_eq!(request.operations[0].op, PatchOp::Replace);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatchRequest {
    pub schemas: Vec<String>,
    #[serde(rename = "Operations", alias = "operations")]
    pub operations: Vec<PatchOperation>,
}

impl PatchRequest {
    pub fn new(operations: Vec<PatchOperation>) -> Self {
        Self {
            schemas: vec![PATCH_OP_URN.to_string()],
            operations,
        }
    }

    /// Parse and validate a request body.
    pub fn from_json(body: &str) -> ScimResult<Self> {
        let request: PatchRequest = serde_json::from_str(body)?;
        request.validate()?;
        Ok(request)
    }

    /// The body must declare the PatchOp message schema.
    pub fn validate(&self) -> PatchResult<()> {
        if self
            .schemas
            .iter()
            .any(|schema| schema.eq_ignore_ascii_case(PATCH_OP_URN))
        {
            Ok(())
        } else {
            Err(PatchError::invalid_value(
                "schemas",
                format!("PATCH request must declare '{}'", PATCH_OP_URN),
            ))
        }
    }
}
