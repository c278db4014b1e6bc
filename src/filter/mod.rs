//! SCIM filter expressions (RFC 7644 section 3.4.2.2).
//!
//! Filter text is parsed into a [`FilterExpression`] tree, which can be
//! evaluated against resource JSON in the context of a [`ResourceSchema`] and
//! written back to text.
//!
//! # Examples
//!
//! ```rust
//! use scim_core::filter::{parse_filter, to_filter_string};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let filter = parse_filter(r#"title pr AND (userType eq "Employee" or userType eq "Intern")"#)?;
//! assert_eq!(
//!     to_filter_string(&filter),
//!     r#"title pr and (userType eq "Employee" or userType eq "Intern")"#
//! );
//! # Ok(())
//! # }
//! ```
//!
//! [`ResourceSchema`]: crate::schema::ResourceSchema

pub mod ast;
pub mod evaluator;
pub(crate) mod lexer;
pub mod parser;

pub use ast::{CompareOperator, FilterExpression, LogicalOperator};
pub use evaluator::filter_matches;
pub use parser::{parse_filter, parse_filter_with_config};

/// Serialize an expression back to filter syntax.
pub fn to_filter_string(expression: &FilterExpression) -> String {
    expression.to_string()
}
