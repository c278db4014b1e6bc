//! Filter expression tree.
//!
//! Built once per parsed filter string and never mutated. `Display` writes the
//! expression back in RFC 7644 filter syntax with lowercase keywords, so a
//! parsed tree re-parses to an equal tree. Trees built by hand get
//! parentheses wherever the `and`/`or` precedence would otherwise regroup
//! them.

use crate::path::AttributeReference;
use crate::schema::{AttributeDefinition, ResourceSchema};
use serde_json::Value;
use std::fmt;

/// Attribute comparison operators (RFC 7644 section 3.4.2.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompareOperator {
    Eq,
    Ne,
    Co,
    Sw,
    Ew,
    Gt,
    Ge,
    Lt,
    Le,
}

impl CompareOperator {
    pub const ALL: [CompareOperator; 9] = [
        Self::Eq,
        Self::Ne,
        Self::Co,
        Self::Sw,
        Self::Ew,
        Self::Gt,
        Self::Ge,
        Self::Lt,
        Self::Le,
    ];

    /// Match a keyword case-insensitively.
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|op| op.as_str().eq_ignore_ascii_case(keyword))
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Eq => "eq",
            Self::Ne => "ne",
            Self::Co => "co",
            Self::Sw => "sw",
            Self::Ew => "ew",
            Self::Gt => "gt",
            Self::Ge => "ge",
            Self::Lt => "lt",
            Self::Le => "le",
        }
    }

    pub fn is_ordering(&self) -> bool {
        matches!(self, Self::Gt | Self::Ge | Self::Lt | Self::Le)
    }
}

impl fmt::Display for CompareOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogicalOperator {
    And,
    Or,
}

impl fmt::Display for LogicalOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::And => f.write_str("and"),
            Self::Or => f.write_str("or"),
        }
    }
}

/// A parsed SCIM filter.
///
/// ```rust
/// use scim_core::filter::{parse_filter, FilterExpression};
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let filter = parse_filter(r#"userName Eq "bjensen" AND NOT (emails[type eq "work"])"#)?;
/// assert_eq!(
///     filter.to_string(),
///     r#"userName eq "bjensen" and not (emails[type eq "work"])"#
/// );
/// assert!(matches!(filter, FilterExpression::Logical { .. }));
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum FilterExpression {
    /// `attrPath compareOp compValue`
    Comparison {
        path: AttributeReference,
        operator: CompareOperator,
        value: Value,
    },
    /// `attrPath pr`
    Present { path: AttributeReference },
    /// `filter (and|or) filter`
    Logical {
        left: Box<FilterExpression>,
        operator: LogicalOperator,
        right: Box<FilterExpression>,
    },
    /// `( filter )` or `not ( filter )`
    Group {
        negated: bool,
        inner: Box<FilterExpression>,
    },
    /// `attrPath [ valFilter ]`, with the inner filter scoped to each element
    ValuePath {
        path: AttributeReference,
        filter: Box<FilterExpression>,
    },
}

impl FilterExpression {
    pub fn comparison(path: AttributeReference, operator: CompareOperator, value: Value) -> Self {
        Self::Comparison {
            path,
            operator,
            value,
        }
    }

    pub fn present(path: AttributeReference) -> Self {
        Self::Present { path }
    }

    pub fn and(left: FilterExpression, right: FilterExpression) -> Self {
        Self::Logical {
            left: Box::new(left),
            operator: LogicalOperator::And,
            right: Box::new(right),
        }
    }

    pub fn or(left: FilterExpression, right: FilterExpression) -> Self {
        Self::Logical {
            left: Box::new(left),
            operator: LogicalOperator::Or,
            right: Box::new(right),
        }
    }

    pub fn group(inner: FilterExpression) -> Self {
        Self::Group {
            negated: false,
            inner: Box::new(inner),
        }
    }

    pub fn not(inner: FilterExpression) -> Self {
        Self::Group {
            negated: true,
            inner: Box::new(inner),
        }
    }

    pub fn value_path(path: AttributeReference, filter: FilterExpression) -> Self {
        Self::ValuePath {
            path,
            filter: Box::new(filter),
        }
    }

    /// Serialize back to filter syntax.
    pub fn to_filter_string(&self) -> String {
        self.to_string()
    }

    /// Copy of this expression with attribute names in schema-declared casing.
    ///
    /// Names that do not resolve are kept as written.
    pub fn canonicalize(&self, schema: &ResourceSchema<'_>) -> FilterExpression {
        self.canonicalize_in(schema, None)
    }

    fn canonicalize_in(
        &self,
        schema: &ResourceSchema<'_>,
        parent: Option<&AttributeDefinition>,
    ) -> FilterExpression {
        let rename = |path: &AttributeReference| match parent {
            Some(parent) => parent
                .get_attribute(path.attribute_name())
                .map(|sub| path.renamed(sub.name(), path.sub_attribute_name()))
                .unwrap_or_else(|| path.clone()),
            None => schema
                .resolve_attribute(path)
                .map(|resolved| resolved.canonical_reference(path))
                .unwrap_or_else(|| path.clone()),
        };

        match self {
            Self::Comparison {
                path,
                operator,
                value,
            } => Self::comparison(rename(path), *operator, value.clone()),
            Self::Present { path } => Self::present(rename(path)),
            Self::Logical {
                left,
                operator,
                right,
            } => Self::Logical {
                left: Box::new(left.canonicalize_in(schema, parent)),
                operator: *operator,
                right: Box::new(right.canonicalize_in(schema, parent)),
            },
            Self::Group { negated, inner } => Self::Group {
                negated: *negated,
                inner: Box::new(inner.canonicalize_in(schema, parent)),
            },
            Self::ValuePath { path, filter } => {
                let attribute = match parent {
                    Some(_) => None,
                    None => schema.resolve_attribute(path).map(|r| r.attribute),
                };
                Self::value_path(rename(path), filter.canonicalize_in(schema, attribute))
            }
        }
    }
}

impl FilterExpression {
    /// Whether this operand of a `parent` expression needs parentheses to
    /// parse back into the same tree. `and` binds tighter than `or` and both
    /// associate to the left.
    fn binds_looser_than(&self, parent: LogicalOperator, right_operand: bool) -> bool {
        match self {
            Self::Logical { operator, .. } => match (parent, operator) {
                (LogicalOperator::And, LogicalOperator::Or) => true,
                (LogicalOperator::Or, LogicalOperator::And) => false,
                _ => right_operand,
            },
            _ => false,
        }
    }
}

fn write_operand(
    f: &mut fmt::Formatter<'_>,
    operand: &FilterExpression,
    parenthesize: bool,
) -> fmt::Result {
    if parenthesize {
        write!(f, "({})", operand)
    } else {
        write!(f, "{}", operand)
    }
}

impl fmt::Display for FilterExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Comparison {
                path,
                operator,
                value,
            } => write!(f, "{} {} {}", path, operator, value),
            Self::Present { path } => write!(f, "{} pr", path),
            Self::Logical {
                left,
                operator,
                right,
            } => {
                write_operand(f, left, left.binds_looser_than(*operator, false))?;
                write!(f, " {} ", operator)?;
                write_operand(f, right, right.binds_looser_than(*operator, true))
            }
            Self::Group { negated, inner } => {
                if *negated {
                    write!(f, "not ({})", inner)
                } else {
                    write!(f, "({})", inner)
                }
            }
            Self::ValuePath { path, filter } => write!(f, "{}[{}]", path, filter),
        }
    }
}
