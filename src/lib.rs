//! SCIM 2.0 core engines for Rust.
//!
//! Schema-driven attribute paths, filters, PATCH and attribute projection as
//! defined by RFC 7643 and RFC 7644. Everything here is synchronous and works
//! on `serde_json::Value` resources, so it can sit behind any REST layer.
//!
//! # Core Components
//!
//! - [`SchemaRegistry`] - Frozen catalog of schemas and resource types
//! - [`parse_filter`] / [`filter_matches`] - Filter parsing and evaluation
//! - [`apply_patch`] - PATCH add/remove/replace state machine
//! - [`project`] - `attributes` / `excludedAttributes` handling
//!
//! # Quick Start
//!
//! ```rust
//! use scim_core::{SchemaRegistry, apply_patch, filter_matches, parse_filter, PatchOperation};
//! use serde_json::json;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let registry = SchemaRegistry::with_core_schemas()?;
//! let users = registry.resource_schema_for_endpoint("/Users").unwrap();
//!
//! let mut user = json!({
//!     "schemas": ["urn:ietf:params:scim:schemas:core:2.0:User"],
//!     "userName": "bjensen",
//!     "emails": [{"value": "bjensen@example.com", "type": "work"}]
//! });
//!
//! let operation: PatchOperation =
//!     serde_json::from_value(json!({"op": "replace", "path": "title", "value": "Tour Guide"}))?;
//! apply_patch(&mut user, &users, &[operation])?;
//!
//! let filter = parse_filter(r#"title sw "tour" and emails[type eq "work"]"#)?;
//! assert!(filter_matches(&user, &users, &filter));
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod filter;
pub mod patch;
pub mod path;
pub mod projection;
pub mod resource;
pub mod schema;

// Re-export commonly used types for convenience
pub use config::EngineConfig;
pub use error::{
    FilterParseError, InvalidPathError, PatchError, ProjectionError, SchemaError, ScimError,
    ScimResult,
};
pub use filter::{FilterExpression, filter_matches, parse_filter, to_filter_string};
pub use patch::{
    PatchOp, PatchOperation, PatchOperationPath, PatchRequest, apply_patch, parse_patch_path,
};
pub use path::AttributeReference;
pub use projection::{AttributeSelection, project};
pub use resource::AttributeAccess;
pub use schema::{ResourceSchema, ResourceType, Schema, SchemaRegistry};
