//! Attribute references such as `name.familyName` or
//! `urn:ietf:params:scim:schemas:extension:enterprise:2.0:User:employeeNumber`.
//!
//! An [`AttributeReference`] is the leaf of every filter, patch path and
//! projection list. It holds at most two path segments (attribute and
//! sub-attribute) and an optional schema URN prefix.

use crate::error::InvalidPathError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

/// A reference to a schema attribute, optionally URN-qualified.
///
/// Names keep their display casing but compare case-insensitively; the URN
/// compares exactly.
///
/// ```rust
/// use scim_core::path::AttributeReference;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let reference = AttributeReference::parse("name.familyName")?;
/// assert_eq!(reference.attribute_name(), "name");
/// assert_eq!(reference.sub_attribute_name(), Some("familyName"));
///
/// let qualified = AttributeReference::parse(
///     "urn:ietf:params:scim:schemas:extension:enterprise:2.0:User:employeeNumber",
/// )?;
/// assert_eq!(
///     qualified.urn(),
///     Some("urn:ietf:params:scim:schemas:extension:enterprise:2.0:User")
/// );
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Eq)]
pub struct AttributeReference {
    urn: Option<String>,
    attribute_name: String,
    sub_attribute_name: Option<String>,
}

impl AttributeReference {
    /// Parse an attribute reference.
    ///
    /// The URN prefix is everything before the last `:`; the remainder is
    /// split on its first `.` into attribute and sub-attribute.
    pub fn parse(text: &str) -> Result<Self, InvalidPathError> {
        if text.is_empty() {
            return Err(InvalidPathError::new(text, "attribute path is empty"));
        }

        let (urn, path) = match text.rfind(':') {
            Some(idx) if idx + 1 < text.len() => (Some(&text[..idx]), &text[idx + 1..]),
            Some(_) => {
                return Err(InvalidPathError::new(
                    text,
                    "schema URN must be followed by an attribute name",
                ));
            }
            None => (None, text),
        };

        if urn.is_some_and(str::is_empty) {
            return Err(InvalidPathError::new(text, "schema URN is empty"));
        }

        // An attribute name starts with a letter, so `urn:acme:ext:1.0` can
        // only name a whole schema whose URN ends in a version segment.
        if urn.is_some() && is_version_segment(path) {
            return Ok(Self {
                urn: urn.map(str::to_string),
                attribute_name: path.to_string(),
                sub_attribute_name: None,
            });
        }

        let (attribute_name, sub_attribute_name) = match path.split_once('.') {
            Some((attr, sub)) => (attr, Some(sub)),
            None => (path, None),
        };

        validate_name(text, attribute_name)?;
        if let Some(sub) = sub_attribute_name {
            if sub.contains('.') {
                return Err(InvalidPathError::new(
                    text,
                    "at most two path segments are allowed",
                ));
            }
            validate_name(text, sub)?;
        }

        Ok(Self {
            urn: urn.map(str::to_string),
            attribute_name: attribute_name.to_string(),
            sub_attribute_name: sub_attribute_name.map(str::to_string),
        })
    }

    /// Build a reference from already-validated parts.
    pub fn new(
        urn: Option<String>,
        attribute_name: impl Into<String>,
        sub_attribute_name: Option<String>,
    ) -> Self {
        Self {
            urn,
            attribute_name: attribute_name.into(),
            sub_attribute_name,
        }
    }

    /// Unqualified reference to a top-level attribute.
    pub fn attribute(name: impl Into<String>) -> Self {
        Self {
            urn: None,
            attribute_name: name.into(),
            sub_attribute_name: None,
        }
    }

    pub fn urn(&self) -> Option<&str> {
        self.urn.as_deref()
    }

    pub fn attribute_name(&self) -> &str {
        &self.attribute_name
    }

    pub fn sub_attribute_name(&self) -> Option<&str> {
        self.sub_attribute_name.as_deref()
    }

    /// The full `urn:attribute` text when this reference could name a whole
    /// extension schema, e.g. `urn:...:enterprise:2.0:User`.
    pub fn as_schema_urn(&self) -> Option<String> {
        match (&self.urn, &self.sub_attribute_name) {
            (Some(urn), None) => Some(format!("{}:{}", urn, self.attribute_name)),
            _ => None,
        }
    }

    /// Same reference with a sub-attribute appended.
    pub fn with_sub_attribute(&self, sub_attribute_name: impl Into<String>) -> Self {
        Self {
            urn: self.urn.clone(),
            attribute_name: self.attribute_name.clone(),
            sub_attribute_name: Some(sub_attribute_name.into()),
        }
    }

    /// Same reference with the parent attribute only.
    pub fn parent(&self) -> Self {
        Self {
            urn: self.urn.clone(),
            attribute_name: self.attribute_name.clone(),
            sub_attribute_name: None,
        }
    }

    /// Same reference with names replaced, URN kept.
    pub(crate) fn renamed(&self, attribute_name: &str, sub_attribute_name: Option<&str>) -> Self {
        Self {
            urn: self.urn.clone(),
            attribute_name: attribute_name.to_string(),
            sub_attribute_name: sub_attribute_name.map(str::to_string),
        }
    }
}

fn is_version_segment(segment: &str) -> bool {
    segment.starts_with(|c: char| c.is_ascii_digit())
        && segment
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_'))
}

/// ATTRNAME = ALPHA *(nameChar), nameChar = "-" / "_" / DIGIT / ALPHA.
/// `$ref` is the one name allowed to start with `$`.
fn validate_name(path: &str, name: &str) -> Result<(), InvalidPathError> {
    if name.is_empty() {
        return Err(InvalidPathError::new(path, "attribute name is empty"));
    }
    if name == "$ref" {
        return Ok(());
    }

    let mut chars = name.chars();
    let first_ok = chars.next().is_some_and(|c| c.is_ascii_alphabetic());
    let rest_ok = chars.all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if first_ok && rest_ok {
        Ok(())
    } else {
        Err(InvalidPathError::new(
            path,
            format!("'{}' is not a valid attribute name", name),
        ))
    }
}

impl PartialEq for AttributeReference {
    fn eq(&self, other: &Self) -> bool {
        self.urn == other.urn
            && self.attribute_name.eq_ignore_ascii_case(&other.attribute_name)
            && match (&self.sub_attribute_name, &other.sub_attribute_name) {
                (Some(a), Some(b)) => a.eq_ignore_ascii_case(b),
                (None, None) => true,
                _ => false,
            }
    }
}

impl Hash for AttributeReference {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.urn.hash(state);
        self.attribute_name.to_ascii_lowercase().hash(state);
        self.sub_attribute_name
            .as_ref()
            .map(|s| s.to_ascii_lowercase())
            .hash(state);
    }
}

impl fmt::Display for AttributeReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(urn) = &self.urn {
            write!(f, "{}:", urn)?;
        }
        write!(f, "{}", self.attribute_name)?;
        if let Some(sub) = &self.sub_attribute_name {
            write!(f, ".{}", sub)?;
        }
        Ok(())
    }
}

impl FromStr for AttributeReference {
    type Err = InvalidPathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for AttributeReference {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for AttributeReference {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = String::deserialize(deserializer)?;
        Self::parse(&value).map_err(serde::de::Error::custom)
    }
}
