//! Schema registry mapping schema URNs and endpoints to definitions.
//!
//! Registration happens once, at startup, on a [`SchemaRegistryBuilder`].
//! [`SchemaRegistryBuilder::build`] freezes the result into a
//! [`SchemaRegistry`] that exposes only read operations and can be shared
//! across threads (typically behind an `Arc`) without locking.

use super::embedded;
use super::resource_schema::ResourceSchema;
use super::types::Schema;
use crate::error::{SchemaError, SchemaResult};

use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// A SCIM resource type (RFC 7643 section 6).
///
/// Binds a wire endpoint such as `/Users` to a base schema and zero or more
/// extension schemas.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceType {
    /// Resource type identifier, e.g. `User`
    pub id: String,
    /// Human-readable name
    pub name: String,
    /// Endpoint relative to the service base, e.g. `/Users`
    pub endpoint: String,
    #[serde(default)]
    pub description: String,
    /// URN of the base schema
    pub schema: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub schema_extensions: Vec<SchemaExtension>,
}

/// An extension schema attached to a resource type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaExtension {
    /// URN of the extension schema
    pub schema: String,
    /// Whether resources of this type must carry the extension
    pub required: bool,
}

impl ResourceType {
    pub fn new(
        id: impl Into<String>,
        endpoint: impl Into<String>,
        schema: impl Into<String>,
    ) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            endpoint: endpoint.into(),
            description: String::new(),
            schema: schema.into(),
            schema_extensions: Vec::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_extension(mut self, schema: impl Into<String>, required: bool) -> Self {
        self.schema_extensions.push(SchemaExtension {
            schema: schema.into(),
            required,
        });
        self
    }
}

/// Normalise an endpoint to `/Name` form.
fn normalize_endpoint(endpoint: &str) -> String {
    let trimmed = endpoint.trim().trim_end_matches('/');
    if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{}", trimmed)
    }
}

/// Mutable registry used during startup registration.
#[derive(Debug, Default)]
pub struct SchemaRegistryBuilder {
    schemas: HashMap<String, Schema>,
    resource_types: Vec<ResourceType>,
}

impl SchemaRegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a resource type together with its base and extension schemas.
    ///
    /// Every extension declared by `resource_type` must either be supplied in
    /// `extensions` or already be registered. A schema URN that is already
    /// registered is accepted only if the definition is identical.
    pub fn register(
        &mut self,
        resource_type: ResourceType,
        base: Schema,
        extensions: Vec<Schema>,
    ) -> SchemaResult<&mut Self> {
        if resource_type.id.trim().is_empty() {
            return Err(SchemaError::invalid_resource_type(
                &resource_type.name,
                "resource type id is required",
            ));
        }
        if resource_type.schema.trim().is_empty() {
            return Err(SchemaError::invalid_resource_type(
                &resource_type.id,
                "base schema URN is required",
            ));
        }
        if normalize_endpoint(&resource_type.endpoint) == "/" {
            return Err(SchemaError::invalid_resource_type(
                &resource_type.id,
                "endpoint is required",
            ));
        }
        if base.id != resource_type.schema {
            return Err(SchemaError::invalid_resource_type(
                &resource_type.id,
                format!(
                    "base schema '{}' does not match declared schema '{}'",
                    base.id, resource_type.schema
                ),
            ));
        }

        let endpoint = normalize_endpoint(&resource_type.endpoint);
        if self
            .resource_types
            .iter()
            .any(|existing| normalize_endpoint(&existing.endpoint) == endpoint)
        {
            return Err(SchemaError::DuplicateEndpoint { endpoint });
        }
        if self.resource_types.iter().any(|rt| rt.id == resource_type.id) {
            return Err(SchemaError::invalid_resource_type(
                &resource_type.id,
                "resource type id is already registered",
            ));
        }

        for supplied in &extensions {
            if !resource_type
                .schema_extensions
                .iter()
                .any(|ext| ext.schema == supplied.id)
            {
                return Err(SchemaError::invalid_resource_type(
                    &resource_type.id,
                    format!("extension '{}' is not declared", supplied.id),
                ));
            }
        }
        for declared in &resource_type.schema_extensions {
            let supplied = extensions.iter().any(|s| s.id == declared.schema);
            if !supplied && !self.schemas.contains_key(&declared.schema) {
                return Err(SchemaError::UnknownExtension {
                    resource_type: resource_type.id.clone(),
                    urn: declared.schema.clone(),
                });
            }
        }

        // Validate everything before mutating so a failed registration
        // leaves the builder unchanged.
        for schema in std::iter::once(&base).chain(extensions.iter()) {
            schema.validate()?;
            if let Some(existing) = self.schemas.get(&schema.id) {
                if existing != schema {
                    return Err(SchemaError::DuplicateSchema {
                        urn: schema.id.clone(),
                    });
                }
            }
        }

        for schema in std::iter::once(base).chain(extensions) {
            if self.schemas.contains_key(&schema.id) {
                debug!("Schema {} already registered, sharing definition", schema.id);
                continue;
            }
            self.schemas.insert(schema.id.clone(), schema);
        }

        info!(
            "Registered resource type {} at {} ({} extension(s))",
            resource_type.id,
            endpoint,
            resource_type.schema_extensions.len()
        );
        self.resource_types.push(resource_type);
        Ok(self)
    }

    /// Freeze the registry.
    pub fn build(self) -> SchemaRegistry {
        SchemaRegistry {
            schemas: self.schemas,
            resource_types: self.resource_types,
        }
    }
}

/// Read-only catalog of schemas and resource types.
///
/// # Examples
///
/// ```rust
/// use scim_core::schema::SchemaRegistry;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let registry = SchemaRegistry::with_core_schemas()?;
/// let users = registry.find_resource_type_for_endpoint("/Users").unwrap();
/// assert_eq!(users.schema, "urn:ietf:params:scim:schemas:core:2.0:User");
///
/// let view = registry.resource_schema(&users.id).unwrap();
/// assert!(view.base().get_attribute("USERNAME").is_some());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct SchemaRegistry {
    schemas: HashMap<String, Schema>,
    resource_types: Vec<ResourceType>,
}

impl SchemaRegistry {
    pub fn builder() -> SchemaRegistryBuilder {
        SchemaRegistryBuilder::new()
    }

    /// Registry with the embedded RFC 7643 schemas.
    ///
    /// Registers `User` at `/Users` (with the optional Enterprise User
    /// extension) and `Group` at `/Groups`.
    pub fn with_core_schemas() -> SchemaResult<Self> {
        let user = Schema::from_json(embedded::core_user_schema())?;
        let group = Schema::from_json(embedded::core_group_schema())?;
        let enterprise = Schema::from_json(embedded::enterprise_user_schema())?;

        let mut builder = Self::builder();
        builder.register(
            ResourceType::new("User", "/Users", embedded::USER_URN)
                .with_description("User Account")
                .with_extension(embedded::ENTERPRISE_USER_URN, false),
            user,
            vec![enterprise],
        )?;
        builder.register(
            ResourceType::new("Group", "/Groups", embedded::GROUP_URN).with_description("Group"),
            group,
            Vec::new(),
        )?;
        Ok(builder.build())
    }

    /// Load a schema from a JSON file.
    pub fn load_schema_from_file<P: AsRef<Path>>(path: P) -> SchemaResult<Schema> {
        let content = fs::read_to_string(&path)?;
        Schema::from_json(&content)
    }

    /// Get a specific schema by URN.
    pub fn get_schema(&self, urn: &str) -> Option<&Schema> {
        self.schemas.get(urn)
    }

    /// All registered schemas, ordered by URN.
    pub fn get_all_schemas(&self) -> Vec<&Schema> {
        let mut schemas: Vec<&Schema> = self.schemas.values().collect();
        schemas.sort_by(|a, b| a.id.cmp(&b.id));
        schemas
    }

    pub fn get_resource_type(&self, id: &str) -> Option<&ResourceType> {
        self.resource_types.iter().find(|rt| rt.id == id)
    }

    /// Resource types in registration order.
    pub fn get_all_resource_types(&self) -> &[ResourceType] {
        &self.resource_types
    }

    /// Resource type served at `endpoint` (`/Users`, `Users` and `/Users/`
    /// are equivalent).
    pub fn find_resource_type_for_endpoint(&self, endpoint: &str) -> Option<&ResourceType> {
        let endpoint = normalize_endpoint(endpoint);
        self.resource_types
            .iter()
            .find(|rt| normalize_endpoint(&rt.endpoint) == endpoint)
    }

    /// Base and extension schemas of a resource type.
    pub fn resource_schema(&self, resource_type_id: &str) -> Option<ResourceSchema<'_>> {
        let resource_type = self.get_resource_type(resource_type_id)?;
        self.view_of(resource_type)
    }

    /// Base and extension schemas of the resource type served at `endpoint`.
    pub fn resource_schema_for_endpoint(&self, endpoint: &str) -> Option<ResourceSchema<'_>> {
        let resource_type = self.find_resource_type_for_endpoint(endpoint)?;
        self.view_of(resource_type)
    }

    fn view_of(&self, resource_type: &ResourceType) -> Option<ResourceSchema<'_>> {
        let base = self.schemas.get(&resource_type.schema)?;
        let extensions = resource_type
            .schema_extensions
            .iter()
            .filter_map(|ext| self.schemas.get(&ext.schema))
            .collect();
        Some(ResourceSchema::new(base, extensions))
    }
}
