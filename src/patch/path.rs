//! Patch path grammar: `attrPath ("[" valFilter "]")? ("." subAttr)?`.

use crate::config::EngineConfig;
use crate::error::{FilterParseError, FilterResult, InvalidPathError};
use crate::filter::FilterExpression;
use crate::filter::parser::parse_fragment;
use crate::path::AttributeReference;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Target of a patch operation, e.g. `members[value eq "2819c223"].display`.
///
/// Without a value filter the sub-attribute, if any, is part of
/// `attribute_path` (`name.givenName`); with one it follows the closing
/// bracket and is held in `sub_attribute_name`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PatchOperationPath {
    pub attribute_path: AttributeReference,
    pub value_filter: Option<FilterExpression>,
    pub sub_attribute_name: Option<String>,
}

impl PatchOperationPath {
    /// Path to a plain attribute or sub-attribute.
    pub fn attribute(attribute_path: AttributeReference) -> Self {
        Self {
            attribute_path,
            value_filter: None,
            sub_attribute_name: None,
        }
    }

    /// Path selecting elements of a multi-valued attribute.
    pub fn filtered(
        attribute_path: AttributeReference,
        value_filter: FilterExpression,
        sub_attribute_name: Option<String>,
    ) -> Self {
        Self {
            attribute_path,
            value_filter: Some(value_filter),
            sub_attribute_name,
        }
    }
}

/// Parse a patch path with the default limits.
///
/// ```rust
/// use scim_core::patch::parse_patch_path;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let path = parse_patch_path(r#"members[value eq "2819c223"].display"#)?;
/// assert_eq!(path.attribute_path.attribute_name(), "members");
/// assert_eq!(path.sub_attribute_name.as_deref(), Some("display"));
/// assert!(path.value_filter.is_some());
/// # Ok(())
/// # }
/// ```
pub fn parse_patch_path(text: &str) -> FilterResult<PatchOperationPath> {
    parse_patch_path_with_config(text, &EngineConfig::default())
}

/// Parse a patch path, applying the configured filter limits to the
/// bracketed value filter.
pub fn parse_patch_path_with_config(
    text: &str,
    config: &EngineConfig,
) -> FilterResult<PatchOperationPath> {
    if text.len() > config.max_filter_length {
        return Err(FilterParseError::new(
            format!(
                "path exceeds maximum length of {} bytes",
                config.max_filter_length
            ),
            text.chars().take(32).collect::<String>(),
            0,
        ));
    }

    let Some(open) = text.find('[') else {
        let attribute_path = reference(text, text, 0)?;
        return Ok(PatchOperationPath::attribute(attribute_path));
    };

    let attribute_path = reference(&text[..open], text, 0)?;
    if attribute_path.sub_attribute_name().is_some() {
        return Err(FilterParseError::new(
            "a value filter must follow a top-level attribute",
            &text[..open],
            0,
        ));
    }

    let close = closing_bracket(text, open)?;
    let value_filter = parse_fragment(&text[open + 1..close], open + 1, config)?;

    let rest = &text[close + 1..];
    let sub_attribute_name = if rest.is_empty() {
        None
    } else if let Some(name) = rest.strip_prefix('.') {
        let sub = reference(name, text, close + 2)?;
        if sub.urn().is_some() || sub.sub_attribute_name().is_some() {
            return Err(FilterParseError::new(
                "expected a sub-attribute name after the value filter",
                rest,
                close + 1,
            ));
        }
        Some(sub.attribute_name().to_string())
    } else {
        return Err(FilterParseError::new(
            "expected '.' or end of path after the value filter",
            rest,
            close + 1,
        ));
    };

    Ok(PatchOperationPath::filtered(
        attribute_path,
        value_filter,
        sub_attribute_name,
    ))
}

fn reference(part: &str, whole: &str, position: usize) -> FilterResult<AttributeReference> {
    AttributeReference::parse(part).map_err(|e: InvalidPathError| {
        FilterParseError::new(
            e.reason,
            if part.is_empty() { whole } else { part },
            position,
        )
    })
}

/// Byte index of the `]` matching the `[` at `open`, skipping quoted text.
fn closing_bracket(text: &str, open: usize) -> FilterResult<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (idx, c) in text[open..].char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '[' => depth += 1,
            ']' => {
                depth -= 1;
                if depth == 0 {
                    return Ok(open + idx);
                }
            }
            _ => {}
        }
    }

    Err(FilterParseError::new(
        "missing ']' after value filter",
        &text[open..],
        open,
    ))
}

impl fmt::Display for PatchOperationPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.attribute_path)?;
        if let Some(filter) = &self.value_filter {
            write!(f, "[{}]", filter)?;
        }
        if let Some(sub) = &self.sub_attribute_name {
            write!(f, ".{}", sub)?;
        }
        Ok(())
    }
}

impl FromStr for PatchOperationPath {
    type Err = FilterParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_patch_path(s)
    }
}

impl TryFrom<String> for PatchOperationPath {
    type Error = FilterParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        parse_patch_path(&value)
    }
}

impl From<PatchOperationPath> for String {
    fn from(path: PatchOperationPath) -> Self {
        path.to_string()
    }
}
