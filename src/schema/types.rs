//! Core schema type definitions for SCIM resources.
//!
//! This module contains the fundamental data structures that define SCIM schemas,
//! attribute definitions, and their characteristics as specified in RFC 7643.
//! Schemas are built once (from JSON or with the builder methods) and are
//! immutable afterwards; every container keeps a case-insensitive name index.

use crate::error::{SchemaError, SchemaResult};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Case-insensitive name → position index over an attribute list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct NameIndex(HashMap<String, usize>);

impl NameIndex {
    fn build(attributes: &[AttributeDefinition]) -> Self {
        let mut index = HashMap::with_capacity(attributes.len());
        for (position, attr) in attributes.iter().enumerate() {
            // First declaration wins; duplicates are reported by `validate`.
            index
                .entry(attr.name.to_ascii_lowercase())
                .or_insert(position);
        }
        Self(index)
    }

    fn get<'a>(
        &self,
        attributes: &'a [AttributeDefinition],
        name: &str,
    ) -> Option<&'a AttributeDefinition> {
        self.0
            .get(&name.to_ascii_lowercase())
            .and_then(|&position| attributes.get(position))
    }
}

/// A SCIM schema definition.
///
/// Represents a complete schema with its metadata and attribute definitions.
/// Each schema defines the structure of a resource type like User or Group,
/// or of an extension such as the Enterprise User.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(from = "SchemaDocument")]
pub struct Schema {
    /// Unique schema identifier (URN)
    pub id: String,
    /// Human-readable schema name
    pub name: String,
    /// Schema description
    #[serde(default)]
    pub description: String,
    attributes: Vec<AttributeDefinition>,
    #[serde(skip)]
    index: NameIndex,
}

#[derive(Deserialize)]
struct SchemaDocument {
    id: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    attributes: Vec<AttributeDefinition>,
}

impl From<SchemaDocument> for Schema {
    fn from(doc: SchemaDocument) -> Self {
        Schema::new(doc.id, doc.name, doc.description, doc.attributes)
    }
}

impl PartialEq for Schema {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
            && self.name == other.name
            && self.description == other.description
            && self.attributes == other.attributes
    }
}

impl Schema {
    /// Create a schema and index its attributes.
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        description: impl Into<String>,
        attributes: Vec<AttributeDefinition>,
    ) -> Self {
        let index = NameIndex::build(&attributes);
        Self {
            id: id.into(),
            name: name.into(),
            description: description.into(),
            attributes,
            index,
        }
    }

    /// Load a schema from its RFC 7643 JSON representation.
    pub fn from_json(content: &str) -> SchemaResult<Self> {
        let schema: Schema = serde_json::from_str(content)?;
        schema.validate()?;
        Ok(schema)
    }

    /// Top-level attribute definitions in declaration order.
    pub fn attributes(&self) -> &[AttributeDefinition] {
        &self.attributes
    }

    /// Case-insensitive attribute lookup.
    pub fn get_attribute(&self, name: &str) -> Option<&AttributeDefinition> {
        self.index.get(&self.attributes, name)
    }

    /// Check the model invariants for every attribute in the schema.
    ///
    /// - sub-attributes only on `complex` attributes
    /// - complex attributes declare at least one sub-attribute
    /// - names unique (case-insensitively) within their container
    /// - canonical values only on string or reference attributes
    pub fn validate(&self) -> SchemaResult<()> {
        if self.id.trim().is_empty() {
            return Err(SchemaError::invalid_attribute(
                &self.name,
                "<schema>",
                "schema id cannot be empty",
            ));
        }
        validate_attribute_list(&self.id, None, &self.attributes)
    }
}

fn validate_attribute_list(
    schema_id: &str,
    parent: Option<&str>,
    attributes: &[AttributeDefinition],
) -> SchemaResult<()> {
    let mut seen = HashMap::new();
    for attr in attributes {
        let qualified = match parent {
            Some(parent) => format!("{}.{}", parent, attr.name),
            None => attr.name.clone(),
        };
        let invalid = |reason: &str| SchemaError::invalid_attribute(schema_id, &qualified, reason);

        if attr.name.is_empty() {
            return Err(invalid("attribute name cannot be empty"));
        }
        if seen.insert(attr.name.to_ascii_lowercase(), ()).is_some() {
            return Err(invalid("duplicate attribute name"));
        }

        match attr.data_type {
            AttributeType::Complex => {
                if attr.sub_attributes.is_empty() {
                    return Err(invalid("complex attribute must declare sub-attributes"));
                }
                if parent.is_some() {
                    return Err(invalid("complex attributes cannot be nested"));
                }
                validate_attribute_list(schema_id, Some(&attr.name), &attr.sub_attributes)?;
            }
            _ if !attr.sub_attributes.is_empty() => {
                return Err(invalid("only complex attributes may have sub-attributes"));
            }
            _ => {}
        }

        if !attr.canonical_values.is_empty()
            && !matches!(
                attr.data_type,
                AttributeType::String | AttributeType::Reference
            )
        {
            return Err(invalid("canonical values are only allowed on strings"));
        }
    }
    Ok(())
}

/// Definition of a SCIM attribute.
///
/// Defines all characteristics of an attribute including type,
/// constraints, visibility and its sub-attributes.
///
/// ```rust
/// use scim_core::schema::{AttributeDefinition, AttributeType, Returned};
///
/// let emails = AttributeDefinition::new("emails", AttributeType::Complex)
///     .multi_valued(true)
///     .sub_attributes(vec![
///         AttributeDefinition::new("value", AttributeType::String),
///         AttributeDefinition::new("type", AttributeType::String)
///             .canonical_values(["work", "home", "other"]),
///     ]);
///
/// assert!(emails.get_attribute("VALUE").is_some());
/// assert_eq!(emails.get_returned(), Returned::Default);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "AttributeDocument")]
pub struct AttributeDefinition {
    name: String,
    #[serde(rename = "type")]
    data_type: AttributeType,
    multi_valued: bool,
    required: bool,
    case_exact: bool,
    mutability: Mutability,
    returned: Returned,
    uniqueness: Uniqueness,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    canonical_values: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    sub_attributes: Vec<AttributeDefinition>,
    #[serde(skip)]
    index: NameIndex,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AttributeDocument {
    name: String,
    #[serde(rename = "type", default)]
    data_type: AttributeType,
    #[serde(default)]
    multi_valued: bool,
    #[serde(default)]
    required: bool,
    #[serde(default)]
    case_exact: bool,
    #[serde(default)]
    mutability: Mutability,
    #[serde(default)]
    returned: Returned,
    #[serde(default)]
    uniqueness: Uniqueness,
    #[serde(default)]
    canonical_values: Vec<String>,
    #[serde(default)]
    sub_attributes: Vec<AttributeDefinition>,
}

impl From<AttributeDocument> for AttributeDefinition {
    fn from(doc: AttributeDocument) -> Self {
        let index = NameIndex::build(&doc.sub_attributes);
        Self {
            name: doc.name,
            data_type: doc.data_type,
            multi_valued: doc.multi_valued,
            required: doc.required,
            case_exact: doc.case_exact,
            mutability: doc.mutability,
            returned: doc.returned,
            uniqueness: doc.uniqueness,
            canonical_values: doc.canonical_values,
            sub_attributes: doc.sub_attributes,
            index,
        }
    }
}

impl PartialEq for AttributeDefinition {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.data_type == other.data_type
            && self.multi_valued == other.multi_valued
            && self.required == other.required
            && self.case_exact == other.case_exact
            && self.mutability == other.mutability
            && self.returned == other.returned
            && self.uniqueness == other.uniqueness
            && self.canonical_values == other.canonical_values
            && self.sub_attributes == other.sub_attributes
    }
}

impl AttributeDefinition {
    /// Create a single-valued, optional, read-write attribute.
    pub fn new(name: impl Into<String>, data_type: AttributeType) -> Self {
        Self {
            name: name.into(),
            data_type,
            multi_valued: false,
            required: false,
            case_exact: false,
            mutability: Mutability::ReadWrite,
            returned: Returned::Default,
            uniqueness: Uniqueness::None,
            canonical_values: Vec::new(),
            sub_attributes: Vec::new(),
            index: NameIndex::default(),
        }
    }

    pub fn multi_valued(mut self, multi_valued: bool) -> Self {
        self.multi_valued = multi_valued;
        self
    }

    pub fn required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    pub fn case_exact(mut self, case_exact: bool) -> Self {
        self.case_exact = case_exact;
        self
    }

    pub fn mutability(mut self, mutability: Mutability) -> Self {
        self.mutability = mutability;
        self
    }

    pub fn returned(mut self, returned: Returned) -> Self {
        self.returned = returned;
        self
    }

    pub fn uniqueness(mut self, uniqueness: Uniqueness) -> Self {
        self.uniqueness = uniqueness;
        self
    }

    pub fn canonical_values<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.canonical_values = values.into_iter().map(Into::into).collect();
        self
    }

    /// Set the sub-attributes and rebuild the lookup index.
    pub fn sub_attributes(mut self, sub_attributes: Vec<AttributeDefinition>) -> Self {
        self.index = NameIndex::build(&sub_attributes);
        self.sub_attributes = sub_attributes;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn data_type(&self) -> AttributeType {
        self.data_type
    }

    pub fn is_multi_valued(&self) -> bool {
        self.multi_valued
    }

    pub fn is_required(&self) -> bool {
        self.required
    }

    pub fn is_case_exact(&self) -> bool {
        self.case_exact
    }

    pub fn get_mutability(&self) -> Mutability {
        self.mutability
    }

    pub fn get_returned(&self) -> Returned {
        self.returned
    }

    pub fn get_uniqueness(&self) -> Uniqueness {
        self.uniqueness
    }

    pub fn get_canonical_values(&self) -> &[String] {
        &self.canonical_values
    }

    pub fn get_sub_attributes(&self) -> &[AttributeDefinition] {
        &self.sub_attributes
    }

    pub fn is_complex(&self) -> bool {
        self.data_type == AttributeType::Complex
    }

    /// Case-insensitive sub-attribute lookup.
    pub fn get_attribute(&self, name: &str) -> Option<&AttributeDefinition> {
        self.index.get(&self.sub_attributes, name)
    }
}

/// SCIM attribute data types.
///
/// Represents the valid data types for SCIM attributes as defined in RFC 7643.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "camelCase")]
pub enum AttributeType {
    /// String value
    #[default]
    String,
    /// Boolean value
    Boolean,
    /// Decimal number
    Decimal,
    /// Integer number
    Integer,
    /// DateTime in RFC3339 format
    DateTime,
    /// Binary data (base64 encoded)
    Binary,
    /// URI reference
    Reference,
    /// Complex attribute with sub-attributes
    Complex,
}

/// Attribute mutability characteristics.
///
/// Defines whether and how an attribute can be modified.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "camelCase")]
pub enum Mutability {
    /// Read-only attribute (managed by server)
    ReadOnly,
    /// Read-write attribute (can be modified by clients)
    #[default]
    ReadWrite,
    /// Immutable attribute (set once, never modified)
    Immutable,
    /// Write-only attribute (passwords, etc.)
    WriteOnly,
}

impl fmt::Display for Mutability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::ReadOnly => "readOnly",
            Self::ReadWrite => "readWrite",
            Self::Immutable => "immutable",
            Self::WriteOnly => "writeOnly",
        };
        f.write_str(name)
    }
}

/// When an attribute is returned in responses.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "camelCase")]
pub enum Returned {
    /// Always returned, regardless of `attributes`/`excludedAttributes`
    Always,
    /// Never returned
    Never,
    /// Returned unless excluded
    #[default]
    Default,
    /// Returned only when explicitly requested
    Request,
}

/// Attribute uniqueness constraints.
///
/// Defines the scope of uniqueness for attribute values.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "camelCase")]
pub enum Uniqueness {
    /// No uniqueness constraint
    #[default]
    None,
    /// Unique within the server
    Server,
    /// Globally unique
    Global,
}
