//! Schema definitions and the schema registry.
//!
//! This module implements the RFC 7643 schema model that the filter, patch and
//! projection engines resolve attribute paths against.
//!
//! # Key Types
//!
//! - [`Schema`] - SCIM schema definition with attributes and metadata
//! - [`AttributeDefinition`] - Individual attribute definitions and constraints
//! - [`SchemaRegistry`] - Frozen catalog of schemas and resource types
//! - [`ResourceSchema`] - Base schema plus extensions of one resource type
//!
//! # Examples
//!
//! ```rust
//! use scim_core::schema::SchemaRegistry;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let registry = SchemaRegistry::with_core_schemas()?;
//! let user_schema = registry
//!     .get_schema("urn:ietf:params:scim:schemas:core:2.0:User")
//!     .unwrap();
//! assert!(user_schema.get_attribute("emails").unwrap().is_multi_valued());
//! # Ok(())
//! # }
//! ```

pub mod embedded;
pub mod registry;
pub mod resource_schema;
pub mod types;


// Re-export the main types for convenience
pub use registry::{ResourceType, SchemaExtension, SchemaRegistry, SchemaRegistryBuilder};
pub use resource_schema::{AttributeContainer, Resolution, ResolvedAttribute, ResourceSchema};
pub use types::{AttributeDefinition, AttributeType, Mutability, Returned, Schema, Uniqueness};
