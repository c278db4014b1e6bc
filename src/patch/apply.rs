//! Applies patch operations to resource JSON (RFC 7644 section 3.5.2).
//!
//! Operations run strictly in order. Each one is applied to a copy of the
//! resource and only committed when it succeeds, so a failing operation never
//! leaves a half-applied change behind. Operations committed before the
//! failure stay applied.

use super::operation::{PatchOp, PatchOperation};
use super::path::PatchOperationPath;
use crate::config::EngineConfig;
use crate::error::{PatchError, PatchResult};
use crate::filter::FilterExpression;
use crate::filter::evaluator::element_matches;
use crate::path::AttributeReference;
use crate::resource::{AttributeAccess, is_present};
use crate::schema::{
    AttributeContainer, AttributeDefinition, AttributeType, Mutability, Resolution,
    ResourceSchema, Schema,
};
use chrono::DateTime;
use log::{debug, trace};
use serde_json::{Map, Value};

/// Apply `operations` to `resource` with the default limits.
///
/// ```rust
/// use scim_core::patch::{apply_patch, PatchOperation};
/// use scim_core::schema::SchemaRegistry;
/// use serde_json::json;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let registry = SchemaRegistry::with_core_schemas()?;
/// let users = registry.resource_schema("User").unwrap();
///
/// let mut user = json!({"userName": "bjensen"});
/// let operation: PatchOperation = serde_json::from_value(json!({
///     "op": "add",
///     "path": "emails",
///     "value": [{"value": "bjensen@example.com", "type": "work"}]
/// }))?;
/// apply_patch(&mut user, &users, &[operation])?;
///
/// assert_eq!(user["emails"][0]["value"], "bjensen@example.com");
/// # Ok(())
/// # }
/// ```
pub fn apply_patch(
    resource: &mut Value,
    schema: &ResourceSchema<'_>,
    operations: &[PatchOperation],
) -> PatchResult<()> {
    apply_patch_with_config(resource, schema, operations, &EngineConfig::default())
}

/// Apply `operations` to `resource`, rejecting oversized requests up front.
pub fn apply_patch_with_config(
    resource: &mut Value,
    schema: &ResourceSchema<'_>,
    operations: &[PatchOperation],
    config: &EngineConfig,
) -> PatchResult<()> {
    if operations.len() > config.max_patch_operations {
        return Err(PatchError::TooManyOperations {
            count: operations.len(),
            limit: config.max_patch_operations,
        });
    }

    for (index, operation) in operations.iter().enumerate() {
        let mut working = resource.clone();
        let object = working
            .as_object_mut()
            .ok_or_else(|| PatchError::invalid_value("", "resource must be a JSON object"))?;

        if let Err(e) = apply_operation(object, schema, operation) {
            debug!(
                "Patch operation {} ({} {}) failed: {}",
                index,
                operation.op,
                describe(operation.path.as_ref()),
                e
            );
            return Err(e);
        }

        *resource = working;
        debug!(
            "Applied patch operation {} ({} {})",
            index,
            operation.op,
            describe(operation.path.as_ref())
        );
    }

    Ok(())
}

/// Patched copy of `resource`; the input is left untouched.
pub fn patched(
    resource: &Value,
    schema: &ResourceSchema<'_>,
    operations: &[PatchOperation],
) -> PatchResult<Value> {
    let mut copy = resource.clone();
    apply_patch(&mut copy, schema, operations)?;
    Ok(copy)
}

fn describe(path: Option<&PatchOperationPath>) -> String {
    path.map_or_else(|| "<resource>".to_string(), ToString::to_string)
}

/// The effect of an operation once `op` and `value` are reconciled.
#[derive(Clone, Copy)]
enum Change<'v> {
    Add(&'v Value),
    Replace(&'v Value),
    Remove,
}

impl<'v> Change<'v> {
    fn new(op: PatchOp, value: Option<&'v Value>, path: &str) -> PatchResult<Self> {
        match (op, value.filter(|v| !v.is_null())) {
            (PatchOp::Add, Some(value)) => Ok(Self::Add(value)),
            (PatchOp::Add, None) => Err(PatchError::invalid_value(path, "add requires a value")),
            (PatchOp::Replace, Some(value)) => Ok(Self::Replace(value)),
            // replacing with null clears the attribute
            (PatchOp::Replace, None) | (PatchOp::Remove, _) => Ok(Self::Remove),
        }
    }

    fn value(&self) -> Option<&'v Value> {
        match *self {
            Self::Add(value) | Self::Replace(value) => Some(value),
            Self::Remove => None,
        }
    }
}

/// A patch path bound to its schema definitions.
struct Target<'a, 'p> {
    path: String,
    container: AttributeContainer<'a>,
    attribute: &'a AttributeDefinition,
    filter: Option<&'p FilterExpression>,
    sub: Option<&'a AttributeDefinition>,
}

fn apply_operation(
    resource: &mut Map<String, Value>,
    schema: &ResourceSchema<'_>,
    operation: &PatchOperation,
) -> PatchResult<()> {
    let value = operation.value.as_ref();

    let Some(path) = &operation.path else {
        if operation.op == PatchOp::Remove {
            return Err(PatchError::invalid_path("", "remove requires a path"));
        }
        let Some(Value::Object(fields)) = value else {
            return Err(PatchError::invalid_value(
                "",
                format!("{} without a path requires a JSON object value", operation.op),
            ));
        };
        return apply_fields(resource, schema, operation.op, None, fields);
    };

    if path.value_filter.is_none() {
        if let Some(Resolution::Extension(extension)) = schema.resolve(&path.attribute_path) {
            return apply_extension(resource, schema, operation.op, extension, value);
        }
    }

    let target = resolve_target(
        schema,
        &path.attribute_path,
        path.value_filter.as_ref(),
        path.sub_attribute_name.as_deref(),
        path.to_string(),
    )?;
    let change = Change::new(operation.op, value, &target.path)?;
    apply_target(resource, &target, change)
}

/// Apply each field of an object value as if it had its own path.
fn apply_fields(
    resource: &mut Map<String, Value>,
    schema: &ResourceSchema<'_>,
    op: PatchOp,
    extension: Option<&Schema>,
    fields: &Map<String, Value>,
) -> PatchResult<()> {
    for (key, field) in fields {
        if extension.is_none() {
            if key.eq_ignore_ascii_case("schemas") {
                continue;
            }
            if let Some(nested) = schema.extension_for_key(key) {
                let Value::Object(nested_fields) = field else {
                    return Err(PatchError::invalid_value(
                        key.as_str(),
                        "extension attributes must be a JSON object",
                    ));
                };
                apply_fields(resource, schema, op, Some(nested), nested_fields)?;
                continue;
            }
        }
        if op == PatchOp::Add && field.is_null() {
            continue;
        }

        let text = match extension {
            Some(extension) => format!("{}:{}", extension.id, key),
            None => key.clone(),
        };
        let reference = AttributeReference::parse(&text)?;
        let target = resolve_target(schema, &reference, None, None, text)?;
        let change = Change::new(op, Some(field), &target.path)?;
        apply_target(resource, &target, change)?;
    }
    Ok(())
}

/// A path naming a whole extension schema.
fn apply_extension(
    resource: &mut Map<String, Value>,
    schema: &ResourceSchema<'_>,
    op: PatchOp,
    extension: &Schema,
    value: Option<&Value>,
) -> PatchResult<()> {
    let urn = extension.id.as_str();
    match Change::new(op, value, urn)? {
        Change::Remove => {
            if let Some(Value::Object(fields)) = resource.attribute(urn) {
                for definition in extension.attributes() {
                    if fields.attribute(definition.name()).is_some_and(is_present) {
                        check_mutability(definition, true)?;
                    }
                }
            }
            if resource.remove_attribute(urn).is_some() {
                unregister_extension(resource, urn);
            }
            Ok(())
        }
        Change::Add(Value::Object(fields)) | Change::Replace(Value::Object(fields)) => {
            apply_fields(resource, schema, op, Some(extension), fields)
        }
        Change::Add(_) | Change::Replace(_) => Err(PatchError::invalid_value(
            urn,
            "extension attributes must be a JSON object",
        )),
    }
}

fn resolve_target<'a, 'p>(
    schema: &ResourceSchema<'a>,
    reference: &AttributeReference,
    filter: Option<&'p FilterExpression>,
    sub_attribute_name: Option<&str>,
    path: String,
) -> PatchResult<Target<'a, 'p>> {
    let Some(resolved) = schema.resolve_attribute(reference) else {
        return Err(PatchError::invalid_path(
            path,
            "attribute is not defined for this resource type",
        ));
    };

    let attribute = resolved.attribute;
    let sub = match sub_attribute_name {
        Some(name) => match attribute.get_attribute(name) {
            Some(sub) => Some(sub),
            None => {
                return Err(PatchError::invalid_path(
                    path,
                    format!("'{}' has no sub-attribute '{}'", attribute.name(), name),
                ));
            }
        },
        None => resolved.sub_attribute,
    };

    if filter.is_some() && !(attribute.is_multi_valued() && attribute.is_complex()) {
        return Err(PatchError::invalid_path(
            path,
            "a value filter requires a multi-valued complex attribute",
        ));
    }

    trace!(
        "Patch path '{}' resolved to '{}'{} in {}",
        path,
        attribute.name(),
        sub.map(|s| format!(".{}", s.name())).unwrap_or_default(),
        resolved.schema.id
    );

    Ok(Target {
        path,
        container: resolved.container,
        attribute,
        filter,
        sub,
    })
}

fn apply_target(
    resource: &mut Map<String, Value>,
    target: &Target<'_, '_>,
    change: Change<'_>,
) -> PatchResult<()> {
    if target.filter.is_some() && matches!(change, Change::Add(_)) {
        return Err(PatchError::invalid_path(
            target.path.as_str(),
            "add does not accept a value filter",
        ));
    }
    check_value(target, change)?;

    let create = !matches!(change, Change::Remove);
    let Some(container) = container_mut(resource, target.container, create)? else {
        // removing from an extension the resource does not carry
        return match target.filter {
            Some(_) => Err(PatchError::no_target(target.path.as_str())),
            None => Ok(()),
        };
    };

    match (target.filter, target.sub) {
        (None, None) => apply_attribute(container, target, change)?,
        (None, Some(sub)) => apply_sub_attribute(container, target, sub, change)?,
        (Some(filter), sub) => apply_filtered(container, target, filter, sub, change)?,
    }

    if let AttributeContainer::Extension(urn) = target.container {
        tidy_extension(resource, urn);
    }
    Ok(())
}

/// `attr` with no filter and no sub-attribute.
fn apply_attribute(
    container: &mut Map<String, Value>,
    target: &Target<'_, '_>,
    change: Change<'_>,
) -> PatchResult<()> {
    let attribute = target.attribute;
    let name = attribute.name();
    check_mutability(attribute, container.attribute(name).is_some_and(is_present))?;

    match change {
        Change::Remove => {
            container.remove_attribute(name);
        }
        Change::Add(value) if attribute.is_multi_valued() => {
            let mut items = match container.remove_attribute(name) {
                Some(Value::Array(items)) => items,
                Some(Value::Null) | None => Vec::new(),
                Some(other) => vec![other],
            };
            let added = match value {
                Value::Array(values) => values.as_slice(),
                single => std::slice::from_ref(single),
            };
            for item in added {
                if !items.contains(item) {
                    items.push(item.clone());
                }
            }
            if !items.is_empty() {
                container.set_attribute(name, Value::Array(items));
            }
        }
        Change::Replace(value) if attribute.is_multi_valued() => {
            if is_present(value) {
                container.set_attribute(name, value.clone());
            } else {
                container.remove_attribute(name);
            }
        }
        Change::Add(value) | Change::Replace(value) if attribute.is_complex() => {
            merge_complex(container, attribute, value, &target.path)?;
        }
        Change::Add(value) | Change::Replace(value) => {
            container.set_attribute(name, value.clone());
        }
    }
    Ok(())
}

/// Merge sub-attributes into a single-valued complex attribute. A `null`
/// sub-attribute value clears that sub-attribute.
fn merge_complex(
    container: &mut Map<String, Value>,
    attribute: &AttributeDefinition,
    value: &Value,
    path: &str,
) -> PatchResult<()> {
    let Some(fields) = value.as_object() else {
        return Err(PatchError::invalid_value(path, "expected a JSON object"));
    };
    let existing = container.attribute(attribute.name());
    check_fields_mutability(attribute, fields, |sub| sub_present(existing, sub))?;

    let mut current = match container.remove_attribute(attribute.name()) {
        Some(Value::Object(current)) => current,
        _ => Map::new(),
    };
    for (key, field) in fields {
        let name = attribute.get_attribute(key).map_or(key.as_str(), |sub| sub.name());
        if field.is_null() {
            current.remove_attribute(name);
        } else {
            current.set_attribute(name, field.clone());
        }
    }

    if current.values().any(is_present) {
        container.set_attribute(attribute.name(), Value::Object(current));
    }
    Ok(())
}

/// `attr.sub` with no filter: every element of a multi-valued attribute,
/// or the single complex value.
fn apply_sub_attribute(
    container: &mut Map<String, Value>,
    target: &Target<'_, '_>,
    sub: &AttributeDefinition,
    change: Change<'_>,
) -> PatchResult<()> {
    let attribute = target.attribute;
    let name = attribute.name();
    let current = container.attribute(name);
    check_mutability(attribute, current.is_some_and(is_present))?;
    check_mutability(sub, sub_present(current, sub.name()))?;

    if attribute.is_multi_valued() {
        let items = match container.attribute_mut(name) {
            Some(Value::Array(items)) if !items.is_empty() => items,
            _ => {
                return match change {
                    Change::Remove => Ok(()),
                    _ => Err(PatchError::no_target(target.path.as_str())),
                };
            }
        };
        for item in items.iter_mut() {
            let Value::Object(element) = item else {
                return Err(PatchError::invalid_value(
                    target.path.as_str(),
                    "elements of a complex attribute must be JSON objects",
                ));
            };
            match change.value() {
                Some(value) => element.set_attribute(sub.name(), value.clone()),
                None => {
                    element.remove_attribute(sub.name());
                }
            }
        }
        items.retain(is_present);
        if items.is_empty() {
            container.remove_attribute(name);
        }
        return Ok(());
    }

    match change.value() {
        Some(value) => {
            if !matches!(container.attribute(name), Some(Value::Object(_))) {
                container.set_attribute(name, Value::Object(Map::new()));
            }
            if let Some(Value::Object(parent)) = container.attribute_mut(name) {
                parent.set_attribute(sub.name(), value.clone());
            }
        }
        None => {
            let emptied = match container.attribute_mut(name) {
                Some(Value::Object(parent)) => {
                    parent.remove_attribute(sub.name());
                    !parent.values().any(is_present)
                }
                _ => false,
            };
            if emptied {
                container.remove_attribute(name);
            }
        }
    }
    Ok(())
}

/// `attr[filter]` or `attr[filter].sub` on a multi-valued complex attribute.
fn apply_filtered(
    container: &mut Map<String, Value>,
    target: &Target<'_, '_>,
    filter: &FilterExpression,
    sub: Option<&AttributeDefinition>,
    change: Change<'_>,
) -> PatchResult<()> {
    let attribute = target.attribute;
    let name = attribute.name();
    check_mutability(attribute, container.attribute(name).is_some_and(is_present))?;

    let Some(Value::Array(items)) = container.attribute_mut(name) else {
        return Err(PatchError::no_target(target.path.as_str()));
    };
    let matched: Vec<usize> = items
        .iter()
        .enumerate()
        .filter(|(_, item)| element_matches(item, attribute, filter))
        .map(|(index, _)| index)
        .collect();
    if matched.is_empty() {
        return Err(PatchError::no_target(target.path.as_str()));
    }
    trace!(
        "Value filter of '{}' matched {} of {} elements",
        target.path,
        matched.len(),
        items.len()
    );

    match sub {
        None => match change.value() {
            Some(value) => {
                if let Some(fields) = value.as_object() {
                    check_fields_mutability(attribute, fields, |sub| {
                        matched.iter().any(|&index| sub_present(items.get(index), sub))
                    })?;
                }
                for &index in &matched {
                    items[index] = value.clone();
                }
            }
            None => {
                let mut index = 0;
                items.retain(|_| {
                    let keep = !matched.contains(&index);
                    index += 1;
                    keep
                });
            }
        },
        Some(sub) => {
            let present = matched
                .iter()
                .any(|&index| sub_present(items.get(index), sub.name()));
            check_mutability(sub, present)?;

            for &index in &matched {
                if let Some(Value::Object(element)) = items.get_mut(index) {
                    match change.value() {
                        Some(value) => element.set_attribute(sub.name(), value.clone()),
                        None => {
                            element.remove_attribute(sub.name());
                        }
                    }
                }
            }
            items.retain(is_present);
        }
    }

    if items.is_empty() {
        container.remove_attribute(name);
    }
    Ok(())
}

fn check_mutability(definition: &AttributeDefinition, present: bool) -> PatchResult<()> {
    match definition.get_mutability() {
        Mutability::ReadOnly => Err(PatchError::mutability(
            definition.name(),
            Mutability::ReadOnly,
        )),
        Mutability::Immutable if present => Err(PatchError::mutability(
            definition.name(),
            Mutability::Immutable,
        )),
        _ => Ok(()),
    }
}

/// Mutability of every sub-attribute named in an object value.
fn check_fields_mutability(
    attribute: &AttributeDefinition,
    fields: &Map<String, Value>,
    present: impl Fn(&str) -> bool,
) -> PatchResult<()> {
    for key in fields.keys() {
        if let Some(sub) = attribute.get_attribute(key) {
            check_mutability(sub, present(sub.name()))?;
        }
    }
    Ok(())
}

fn sub_present(value: Option<&Value>, sub: &str) -> bool {
    match value {
        Some(Value::Array(items)) => items.iter().any(|item| sub_present(Some(item), sub)),
        Some(Value::Object(object)) => object.attribute(sub).is_some_and(is_present),
        _ => false,
    }
}

/// Type-check the value of an add or replace against the target definition.
fn check_value(target: &Target<'_, '_>, change: Change<'_>) -> PatchResult<()> {
    let Some(value) = change.value() else {
        return Ok(());
    };
    let path = target.path.as_str();

    match (target.filter, target.sub) {
        (_, Some(sub)) => check_attribute_value(sub, value, path),
        // a filtered replace swaps whole elements
        (Some(_), None) => check_single(target.attribute, value, path),
        (None, None) if target.attribute.is_multi_valued() => match (change, value) {
            (_, Value::Array(items)) => items
                .iter()
                .try_for_each(|item| check_single(target.attribute, item, path)),
            (Change::Add(_), item) => check_single(target.attribute, item, path),
            _ => Err(PatchError::invalid_value(
                path,
                "a multi-valued attribute must be replaced with an array",
            )),
        },
        (None, None) => check_single(target.attribute, value, path),
    }
}

fn check_attribute_value(
    definition: &AttributeDefinition,
    value: &Value,
    path: &str,
) -> PatchResult<()> {
    match value {
        Value::Array(items) if definition.is_multi_valued() => items
            .iter()
            .try_for_each(|item| check_single(definition, item, path)),
        _ => check_single(definition, value, path),
    }
}

fn check_single(definition: &AttributeDefinition, value: &Value, path: &str) -> PatchResult<()> {
    let valid = match definition.data_type() {
        AttributeType::String | AttributeType::Reference | AttributeType::Binary => {
            value.is_string()
        }
        AttributeType::DateTime => value
            .as_str()
            .is_some_and(|s| DateTime::parse_from_rfc3339(s).is_ok()),
        AttributeType::Boolean => value.is_boolean(),
        AttributeType::Integer => value.is_i64() || value.is_u64(),
        AttributeType::Decimal => value.is_number(),
        AttributeType::Complex => {
            let Some(fields) = value.as_object() else {
                return Err(PatchError::invalid_value(
                    path,
                    format!("'{}' expects a JSON object", definition.name()),
                ));
            };
            for (key, field) in fields {
                let Some(sub) = definition.get_attribute(key) else {
                    return Err(PatchError::invalid_value(
                        path,
                        format!("'{}' has no sub-attribute '{}'", definition.name(), key),
                    ));
                };
                if !field.is_null() {
                    check_attribute_value(sub, field, path)?;
                }
            }
            true
        }
    };

    if valid {
        Ok(())
    } else {
        Err(PatchError::invalid_value(
            path,
            format!(
                "expected a {:?} value for '{}', got {}",
                definition.data_type(),
                definition.name(),
                value
            ),
        ))
    }
}

/// The object holding attributes of `container`, created on demand.
fn container_mut<'r>(
    resource: &'r mut Map<String, Value>,
    container: AttributeContainer<'_>,
    create: bool,
) -> PatchResult<Option<&'r mut Map<String, Value>>> {
    let urn = match container {
        AttributeContainer::Base => return Ok(Some(resource)),
        AttributeContainer::Extension(urn) => urn,
    };

    if resource.attribute(urn).is_none_or(Value::is_null) {
        if !create {
            return Ok(None);
        }
        resource.set_attribute(urn, Value::Object(Map::new()));
        register_extension(resource, urn);
    }

    match resource.attribute_mut(urn) {
        Some(Value::Object(object)) => Ok(Some(object)),
        _ => Err(PatchError::invalid_value(
            urn,
            "extension attributes must be a JSON object",
        )),
    }
}

fn register_extension(resource: &mut Map<String, Value>, urn: &str) {
    if let Some(Value::Array(schemas)) = resource.attribute_mut("schemas") {
        let listed = schemas
            .iter()
            .filter_map(Value::as_str)
            .any(|schema| schema.eq_ignore_ascii_case(urn));
        if !listed {
            debug!("Adding extension '{}' to resource schemas", urn);
            schemas.push(Value::String(urn.to_string()));
        }
    }
}

fn unregister_extension(resource: &mut Map<String, Value>, urn: &str) {
    if let Some(Value::Array(schemas)) = resource.attribute_mut("schemas") {
        schemas.retain(|schema| !schema.as_str().is_some_and(|s| s.eq_ignore_ascii_case(urn)));
    }
}

/// Drop an extension object that no longer holds any value.
fn tidy_extension(resource: &mut Map<String, Value>, urn: &str) {
    if resource.attribute(urn).is_some_and(|value| !is_present(value)) {
        resource.remove_attribute(urn);
        unregister_extension(resource, urn);
    }
}
