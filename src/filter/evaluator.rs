//! In-memory evaluation of filter expressions against resource JSON.
//!
//! Evaluation never fails: an unknown attribute, a type mismatch between the
//! stored value and the literal, or a value of the wrong shape simply makes
//! that term evaluate to `false`, so one bad term cannot abort a search.

use super::ast::{CompareOperator, FilterExpression, LogicalOperator};
use crate::path::AttributeReference;
use crate::resource::{AttributeAccess, container_of, is_present};
use crate::schema::{AttributeDefinition, AttributeType, ResourceSchema};
use chrono::{DateTime, FixedOffset};
use log::{debug, trace};
use serde_json::{Map, Value};
use std::cmp::Ordering;

/// Does `resource` satisfy `expression`?
///
/// ```rust
/// use scim_core::filter::{filter_matches, parse_filter};
/// use scim_core::schema::SchemaRegistry;
/// use serde_json::json;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let registry = SchemaRegistry::with_core_schemas()?;
/// let users = registry.resource_schema("User").unwrap();
/// let user = json!({"userName": "Bob", "emails": [{"value": "bob@example.com", "type": "work"}]});
///
/// assert!(filter_matches(&user, &users, &parse_filter(r#"userName eq "bob""#)?));
/// assert!(filter_matches(&user, &users, &parse_filter(r#"emails[type eq "work"]"#)?));
/// assert!(!filter_matches(&user, &users, &parse_filter(r#"shoeSize gt 10"#)?));
/// # Ok(())
/// # }
/// ```
pub fn filter_matches(
    resource: &Value,
    schema: &ResourceSchema<'_>,
    expression: &FilterExpression,
) -> bool {
    match resource.as_object() {
        Some(object) => evaluate(expression, &Scope::Resource { resource: object, schema }),
        None => false,
    }
}

/// Evaluate `filter` against one element of a multi-valued complex
/// attribute, resolving its paths against `parent`'s sub-attributes.
pub(crate) fn element_matches(
    element: &Value,
    parent: &AttributeDefinition,
    filter: &FilterExpression,
) -> bool {
    match element.as_object() {
        Some(element) => evaluate(filter, &Scope::Element { element, parent }),
        None => false,
    }
}

impl FilterExpression {
    /// Shorthand for [`filter_matches`].
    pub fn matches(&self, resource: &Value, schema: &ResourceSchema<'_>) -> bool {
        filter_matches(resource, schema, self)
    }
}

/// What attribute paths are resolved against.
enum Scope<'s, 'a> {
    /// The whole resource
    Resource {
        resource: &'s Map<String, Value>,
        schema: &'s ResourceSchema<'a>,
    },
    /// One element inside a value path `attr[...]`
    Element {
        element: &'s Map<String, Value>,
        parent: &'s AttributeDefinition,
    },
}

fn evaluate(expression: &FilterExpression, scope: &Scope<'_, '_>) -> bool {
    match expression {
        FilterExpression::Comparison {
            path,
            operator,
            value,
        } => match resolve_values(scope, path, true) {
            Some((definition, values)) => compare_all(definition, &values, *operator, value),
            None => false,
        },
        FilterExpression::Present { path } => match resolve_values(scope, path, false) {
            Some((_, values)) => values.into_iter().any(is_present),
            None => false,
        },
        FilterExpression::Logical {
            left,
            operator: LogicalOperator::And,
            right,
        } => evaluate(left, scope) && evaluate(right, scope),
        FilterExpression::Logical {
            left,
            operator: LogicalOperator::Or,
            right,
        } => evaluate(left, scope) || evaluate(right, scope),
        FilterExpression::Group { negated, inner } => evaluate(inner, scope) != *negated,
        FilterExpression::ValuePath { path, filter } => evaluate_value_path(scope, path, filter),
    }
}

fn evaluate_value_path(
    scope: &Scope<'_, '_>,
    path: &AttributeReference,
    filter: &FilterExpression,
) -> bool {
    let Scope::Resource { resource, schema } = *scope else {
        debug!("Nested value path '{}' is not supported, no match", path);
        return false;
    };
    let Some(resolved) = schema.resolve_attribute(path) else {
        debug!("Filter references unknown attribute '{}', no match", path);
        return false;
    };
    if resolved.sub_attribute.is_some() || !resolved.attribute.is_complex() {
        debug!("Value path '{}' does not name a complex attribute", path);
        return false;
    }

    let current = container_of(resource, &resolved)
        .and_then(|container| container.attribute(resolved.attribute.name()));
    match current {
        Some(Value::Array(items)) => items
            .iter()
            .any(|item| element_matches(item, resolved.attribute, filter)),
        Some(item @ Value::Object(_)) => element_matches(item, resolved.attribute, filter),
        _ => false,
    }
}

/// Resolve a path to its definition and the stored values it addresses.
///
/// Arrays are flattened, so a multi-valued attribute yields one entry per
/// element. With `implicit_value`, a complex attribute without a
/// sub-attribute resolves to its `value` sub-attribute.
fn resolve_values<'s>(
    scope: &Scope<'s, '_>,
    path: &AttributeReference,
    implicit_value: bool,
) -> Option<(&'s AttributeDefinition, Vec<&'s Value>)> {
    match *scope {
        Scope::Resource { resource, schema } => {
            let Some(resolved) = schema.resolve_attribute(path) else {
                debug!("Filter references unknown attribute '{}', no match", path);
                return None;
            };
            // Tie the definitions to the scope borrow rather than the view.
            let attribute: &'s AttributeDefinition = resolved.attribute;
            let top = container_of(resource, &resolved)
                .and_then(|container| container.attribute(attribute.name()));

            let sub = match resolved.sub_attribute {
                Some(sub) => Some(sub),
                None if implicit_value && attribute.is_complex() => {
                    let value = attribute.get_attribute("value");
                    if value.is_none() {
                        debug!("Complex attribute '{}' has no 'value' to compare", path);
                        return None;
                    }
                    value
                }
                None => None,
            };

            match sub {
                Some(sub) => Some((sub, sub_values(top, sub.name()))),
                None => Some((attribute, flatten(top))),
            }
        }
        Scope::Element { element, parent } => {
            if path.urn().is_some() || path.sub_attribute_name().is_some() {
                debug!("Value filter path '{}' must name a sub-attribute", path);
                return None;
            }
            let Some(definition) = parent.get_attribute(path.attribute_name()) else {
                debug!(
                    "Filter references unknown sub-attribute '{}.{}', no match",
                    parent.name(),
                    path
                );
                return None;
            };
            Some((definition, flatten(element.attribute(definition.name()))))
        }
    }
}

fn flatten(value: Option<&Value>) -> Vec<&Value> {
    match value {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => items.iter().filter(|v| !v.is_null()).collect(),
        Some(other) => vec![other],
    }
}

fn sub_values<'v>(parent: Option<&'v Value>, sub: &str) -> Vec<&'v Value> {
    flatten(parent)
        .into_iter()
        .filter_map(Value::as_object)
        .flat_map(|object| flatten(object.attribute(sub)))
        .collect()
}

/// Existential comparison: true if any stored value satisfies it.
fn compare_all(
    definition: &AttributeDefinition,
    values: &[&Value],
    operator: CompareOperator,
    literal: &Value,
) -> bool {
    if literal.is_null() {
        let present = values.iter().any(|v| is_present(v));
        return match operator {
            CompareOperator::Eq => !present,
            CompareOperator::Ne => present,
            _ => false,
        };
    }

    values
        .iter()
        .any(|stored| compare_one(definition, stored, operator, literal))
}

fn compare_one(
    definition: &AttributeDefinition,
    stored: &Value,
    operator: CompareOperator,
    literal: &Value,
) -> bool {
    let result = match definition.data_type() {
        AttributeType::String | AttributeType::Reference => {
            compare_strings(definition.is_case_exact(), stored, operator, literal)
        }
        AttributeType::Binary => match (stored.as_str(), literal.as_str()) {
            (Some(a), Some(b)) => equality(operator, a == b),
            _ => None,
        },
        AttributeType::Boolean => match (stored.as_bool(), literal.as_bool()) {
            (Some(a), Some(b)) => equality(operator, a == b),
            _ => None,
        },
        AttributeType::Integer | AttributeType::Decimal => {
            compare_numbers(stored, literal).and_then(|ordering| ordered(operator, ordering))
        }
        AttributeType::DateTime => compare_date_times(stored, literal)
            .and_then(|ordering| ordered(operator, ordering)),
        AttributeType::Complex => None,
    };

    if result.is_none() {
        trace!(
            "Cannot apply '{}' to {} attribute '{}' with {}, no match",
            operator,
            stored,
            definition.name(),
            literal
        );
    }
    result.unwrap_or(false)
}

/// `eq`/`ne` only; other operators are not meaningful.
fn equality(operator: CompareOperator, equal: bool) -> Option<bool> {
    match operator {
        CompareOperator::Eq => Some(equal),
        CompareOperator::Ne => Some(!equal),
        _ => None,
    }
}

/// Natural ordering; substring operators are not meaningful.
fn ordered(operator: CompareOperator, ordering: Ordering) -> Option<bool> {
    match operator {
        CompareOperator::Eq => Some(ordering == Ordering::Equal),
        CompareOperator::Ne => Some(ordering != Ordering::Equal),
        CompareOperator::Gt => Some(ordering == Ordering::Greater),
        CompareOperator::Ge => Some(ordering != Ordering::Less),
        CompareOperator::Lt => Some(ordering == Ordering::Less),
        CompareOperator::Le => Some(ordering != Ordering::Greater),
        CompareOperator::Co | CompareOperator::Sw | CompareOperator::Ew => None,
    }
}

fn compare_strings(
    case_exact: bool,
    stored: &Value,
    operator: CompareOperator,
    literal: &Value,
) -> Option<bool> {
    let (stored, literal) = (stored.as_str()?, literal.as_str()?);
    let (stored, literal) = if case_exact {
        (stored.to_string(), literal.to_string())
    } else {
        (stored.to_lowercase(), literal.to_lowercase())
    };

    Some(match operator {
        CompareOperator::Co => stored.contains(&literal),
        CompareOperator::Sw => stored.starts_with(&literal),
        CompareOperator::Ew => stored.ends_with(&literal),
        _ => return ordered(operator, stored.cmp(&literal)),
    })
}

fn compare_numbers(stored: &Value, literal: &Value) -> Option<Ordering> {
    let (Value::Number(a), Value::Number(b)) = (stored, literal) else {
        return None;
    };
    match (a.as_i64(), b.as_i64()) {
        (Some(a), Some(b)) => Some(a.cmp(&b)),
        _ => a.as_f64()?.partial_cmp(&b.as_f64()?),
    }
}

fn compare_date_times(stored: &Value, literal: &Value) -> Option<Ordering> {
    let parse = |value: &Value| {
        value
            .as_str()
            .and_then(|s| DateTime::<FixedOffset>::parse_from_rfc3339(s).ok())
    };
    Some(parse(stored)?.cmp(&parse(literal)?))
}
