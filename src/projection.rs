//! Attribute projection for responses (RFC 7644 section 3.4.2.5).
//!
//! Decides which attributes of a resource are returned, combining each
//! attribute's `returned` characteristic with the client's `attributes` or
//! `excludedAttributes` list.

use crate::error::{ProjectionError, ProjectionResult};
use crate::path::AttributeReference;
use crate::resource::is_present;
use crate::schema::{AttributeDefinition, Mutability, Resolution, ResourceSchema, Returned, Schema};
use log::debug;
use serde_json::{Map, Value};

/// The `attributes` / `excludedAttributes` pair of a request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttributeSelection {
    pub attributes: Vec<AttributeReference>,
    pub excluded_attributes: Vec<AttributeReference>,
}

impl AttributeSelection {
    /// Parse the comma-separated query parameters.
    ///
    /// ```rust
    /// use scim_core::projection::AttributeSelection;
    ///
    /// let selection = AttributeSelection::from_params(Some("userName, name.givenName"), None).unwrap();
    /// assert_eq!(selection.attributes.len(), 2);
    /// assert!(AttributeSelection::from_params(Some("userName"), Some("emails")).is_err());
    /// ```
    pub fn from_params(
        attributes: Option<&str>,
        excluded_attributes: Option<&str>,
    ) -> ProjectionResult<Self> {
        let selection = Self {
            attributes: parse_list(attributes)?,
            excluded_attributes: parse_list(excluded_attributes)?,
        };
        if !selection.attributes.is_empty() && !selection.excluded_attributes.is_empty() {
            return Err(ProjectionError::AmbiguousProjection);
        }
        Ok(selection)
    }

    /// Project `resource` with this selection.
    pub fn apply(&self, resource: &Value, schema: &ResourceSchema<'_>) -> ProjectionResult<Value> {
        project(
            resource,
            schema,
            Some(self.attributes.as_slice()),
            Some(self.excluded_attributes.as_slice()),
        )
    }
}

fn parse_list(list: Option<&str>) -> ProjectionResult<Vec<AttributeReference>> {
    list.into_iter()
        .flat_map(|list| list.split(','))
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(|name| AttributeReference::parse(name).map_err(ProjectionError::from))
        .collect()
}

/// Copy of `resource` holding only the attributes to return.
///
/// `schemas` is always kept. Attributes the schema does not define are
/// dropped, as are `returned=never` and `writeOnly` attributes.
pub fn project(
    resource: &Value,
    schema: &ResourceSchema<'_>,
    included: Option<&[AttributeReference]>,
    excluded: Option<&[AttributeReference]>,
) -> ProjectionResult<Value> {
    let included = included.unwrap_or_default();
    let excluded = excluded.unwrap_or_default();
    if !included.is_empty() && !excluded.is_empty() {
        return Err(ProjectionError::AmbiguousProjection);
    }

    let Some(object) = resource.as_object() else {
        return Ok(resource.clone());
    };

    let projection = Projection {
        include_list: !included.is_empty(),
        included: resolve_all(schema, included),
        excluded: resolve_all(schema, excluded),
    };

    let mut output = Map::new();
    for (key, value) in object {
        if key.eq_ignore_ascii_case("schemas") {
            output.insert(key.clone(), value.clone());
        } else if let Some(extension) = schema.extension_for_key(key) {
            if let Some(fields) = value.as_object() {
                let projected = projection.container(extension, fields);
                if !projected.is_empty() {
                    output.insert(extension.id.clone(), Value::Object(projected));
                }
            }
        } else if let Some(attribute) = schema.base().get_attribute(key) {
            if let Some(projected) = projection.attribute(schema.base(), attribute, value) {
                output.insert(attribute.name().to_string(), projected);
            }
        } else {
            debug!("Dropping '{}' from projection: not defined by the schema", key);
        }
    }
    Ok(Value::Object(output))
}

/// A list entry bound to the schema.
enum Selected<'a> {
    Extension(&'a Schema),
    Attribute {
        attribute: &'a AttributeDefinition,
        sub: Option<&'a AttributeDefinition>,
    },
}

fn resolve_all<'a>(
    schema: &ResourceSchema<'a>,
    references: &[AttributeReference],
) -> Vec<Selected<'a>> {
    references
        .iter()
        .filter_map(|reference| match schema.resolve(reference) {
            Some(Resolution::Extension(extension)) => Some(Selected::Extension(extension)),
            Some(Resolution::Attribute(resolved)) => Some(Selected::Attribute {
                attribute: resolved.attribute,
                sub: resolved.sub_attribute,
            }),
            None => {
                debug!("Ignoring unknown attribute '{}' in projection list", reference);
                None
            }
        })
        .collect()
}

struct Projection<'a> {
    include_list: bool,
    included: Vec<Selected<'a>>,
    excluded: Vec<Selected<'a>>,
}

/// How a selection list refers to one attribute.
#[derive(Default)]
struct Mentions<'a> {
    whole: bool,
    subs: Vec<&'a AttributeDefinition>,
}

impl<'a> Projection<'a> {
    fn container(&self, schema: &Schema, fields: &Map<String, Value>) -> Map<String, Value> {
        fields
            .iter()
            .filter_map(|(key, value)| {
                let attribute = schema.get_attribute(key)?;
                let projected = self.attribute(schema, attribute, value)?;
                Some((attribute.name().to_string(), projected))
            })
            .collect()
    }

    fn attribute(
        &self,
        schema: &Schema,
        attribute: &AttributeDefinition,
        value: &Value,
    ) -> Option<Value> {
        if hidden(attribute) || !is_present(value) {
            return None;
        }

        let included = mentions(&self.included, schema, attribute);
        let excluded = mentions(&self.excluded, schema, attribute);

        let whole = match attribute.get_returned() {
            Returned::Never => return None,
            Returned::Always => included.whole || included.subs.is_empty(),
            _ if self.include_list => {
                if included.whole {
                    true
                } else if !included.subs.is_empty() {
                    false
                } else {
                    return None;
                }
            }
            Returned::Default if !excluded.whole => true,
            _ => return None,
        };

        if !attribute.is_complex() {
            return Some(value.clone());
        }

        let keep = |sub: &AttributeDefinition| {
            if hidden(sub) {
                return false;
            }
            if sub.get_returned() == Returned::Always || contains(&included.subs, sub) {
                return true;
            }
            whole && sub.get_returned() == Returned::Default && !contains(&excluded.subs, sub)
        };
        let projected = project_complex(attribute, value, &keep);
        is_present(&projected).then_some(projected)
    }
}

fn hidden(attribute: &AttributeDefinition) -> bool {
    attribute.get_returned() == Returned::Never
        || attribute.get_mutability() == Mutability::WriteOnly
}

fn contains(list: &[&AttributeDefinition], attribute: &AttributeDefinition) -> bool {
    list.iter().any(|entry| std::ptr::eq(*entry, attribute))
}

fn mentions<'a>(
    selected: &[Selected<'a>],
    schema: &Schema,
    attribute: &AttributeDefinition,
) -> Mentions<'a> {
    let mut mentions = Mentions::default();
    for entry in selected {
        match entry {
            Selected::Extension(extension) if std::ptr::eq(*extension, schema) => {
                mentions.whole = true;
            }
            Selected::Attribute { attribute: a, sub } if std::ptr::eq(*a, attribute) => match sub {
                Some(sub) => mentions.subs.push(*sub),
                None => mentions.whole = true,
            },
            _ => {}
        }
    }
    mentions
}

/// Filter the sub-attributes of a complex value, element by element for a
/// multi-valued attribute.
fn project_complex(
    attribute: &AttributeDefinition,
    value: &Value,
    keep: &dyn Fn(&AttributeDefinition) -> bool,
) -> Value {
    match value {
        Value::Array(items) => Value::Array(
            items
                .iter()
                .map(|item| project_complex(attribute, item, keep))
                .filter(is_present)
                .collect(),
        ),
        Value::Object(fields) => Value::Object(
            fields
                .iter()
                .filter_map(|(key, field)| {
                    let sub = attribute.get_attribute(key)?;
                    (keep(sub) && is_present(field))
                        .then(|| (sub.name().to_string(), field.clone()))
                })
                .collect(),
        ),
        other => other.clone(),
    }
}
