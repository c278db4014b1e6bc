//! Engine limits for filter parsing and patch application.
//!
//! Filters and patch bodies arrive straight from clients, so the parser and
//! patcher bound their input. The defaults suit typical deployments; a REST
//! layer can load its own values from configuration.

use crate::error::{ScimError, ScimResult};
use serde::{Deserialize, Serialize};

/// Limits applied by the filter parser and the patch engine.
///
/// ```rust
/// use scim_core::EngineConfig;
///
/// let config: EngineConfig = serde_json::from_str(r#"{"maxFilterDepth": 8}"#).unwrap();
/// assert_eq!(config.max_filter_depth, 8);
/// assert_eq!(config.max_patch_operations, EngineConfig::default().max_patch_operations);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EngineConfig {
    /// Maximum filter or patch path length in bytes
    pub max_filter_length: usize,
    /// Maximum nesting of groups, `not` and value paths
    pub max_filter_depth: usize,
    /// Maximum number of operations in one patch request
    pub max_patch_operations: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_filter_length: 8192,
            max_filter_depth: 32,
            max_patch_operations: 1000,
        }
    }
}

impl EngineConfig {
    /// Validate the configuration.
    pub fn validate(&self) -> ScimResult<()> {
        if self.max_filter_length == 0 {
            return Err(ScimError::invalid_configuration(
                "maxFilterLength must be greater than zero",
            ));
        }
        if self.max_filter_depth == 0 {
            return Err(ScimError::invalid_configuration(
                "maxFilterDepth must be greater than zero",
            ));
        }
        if self.max_patch_operations == 0 {
            return Err(ScimError::invalid_configuration(
                "maxPatchOperations must be greater than zero",
            ));
        }
        Ok(())
    }
}
