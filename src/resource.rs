//! Accessor contract over SCIM resource JSON.
//!
//! SCIM attribute names are case-insensitive on the wire, so a resource may
//! carry `userName` as `username` or `USERNAME`. [`AttributeAccess`] gives the
//! engines one way to read and write attributes of a JSON object regardless
//! of key casing.

use crate::schema::{AttributeContainer, ResolvedAttribute};
use serde_json::{Map, Value};

/// Case-insensitive attribute access on a JSON object.
pub trait AttributeAccess {
    /// Current value of the attribute, if present.
    fn attribute(&self, name: &str) -> Option<&Value>;

    /// Mutable access to the attribute, if present.
    fn attribute_mut(&mut self, name: &str) -> Option<&mut Value>;

    /// Set the attribute, replacing any key that differs only in casing.
    fn set_attribute(&mut self, name: &str, value: Value);

    /// Remove the attribute under any casing, returning its value.
    fn remove_attribute(&mut self, name: &str) -> Option<Value>;
}

impl AttributeAccess for Map<String, Value> {
    fn attribute(&self, name: &str) -> Option<&Value> {
        self.get(name).or_else(|| {
            self.iter()
                .find(|(key, _)| key.eq_ignore_ascii_case(name))
                .map(|(_, value)| value)
        })
    }

    fn attribute_mut(&mut self, name: &str) -> Option<&mut Value> {
        let key = self.keys().find(|key| key.eq_ignore_ascii_case(name))?.clone();
        self.get_mut(&key)
    }

    fn set_attribute(&mut self, name: &str, value: Value) {
        if let Some(existing) = self.keys().find(|key| key.eq_ignore_ascii_case(name)) {
            if existing != name {
                let existing = existing.clone();
                self.remove(&existing);
            }
        }
        self.insert(name.to_string(), value);
    }

    fn remove_attribute(&mut self, name: &str) -> Option<Value> {
        let key = self.keys().find(|key| key.eq_ignore_ascii_case(name))?.clone();
        self.remove(&key)
    }
}

/// Object holding the attribute: the resource itself or an extension object.
pub(crate) fn container_of<'r>(
    resource: &'r Map<String, Value>,
    resolved: &ResolvedAttribute<'_>,
) -> Option<&'r Map<String, Value>> {
    match resolved.container {
        AttributeContainer::Base => Some(resource),
        AttributeContainer::Extension(urn) => resource.attribute(urn)?.as_object(),
    }
}

/// Whether a value counts as "present" (non-null, non-empty collection).
pub(crate) fn is_present(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Array(items) => items.iter().any(is_present),
        Value::Object(map) => map.values().any(is_present),
        Value::String(s) => !s.is_empty(),
        _ => true,
    }
}
