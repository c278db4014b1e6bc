//! Attribute resolution across a resource type's base and extension schemas.

use super::types::{AttributeDefinition, Schema};
use crate::path::AttributeReference;

/// A base schema together with the extension schemas of one resource type.
///
/// This is the context in which filters, patch paths and projections resolve
/// attribute references. A lone [`Schema`] converts into a view without
/// extensions.
#[derive(Debug, Clone)]
pub struct ResourceSchema<'a> {
    base: &'a Schema,
    extensions: Vec<&'a Schema>,
}

/// Where a resolved attribute lives in the resource JSON.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributeContainer<'a> {
    /// Top level of the resource
    Base,
    /// Inside the object keyed by this extension URN
    Extension(&'a str),
}

/// Outcome of resolving an [`AttributeReference`].
#[derive(Debug, Clone, Copy)]
pub enum Resolution<'a> {
    /// The reference names an attribute (and possibly a sub-attribute)
    Attribute(ResolvedAttribute<'a>),
    /// The reference is the URN of a whole extension schema
    Extension(&'a Schema),
}

/// An attribute reference bound to its schema definitions.
#[derive(Debug, Clone, Copy)]
pub struct ResolvedAttribute<'a> {
    pub schema: &'a Schema,
    pub container: AttributeContainer<'a>,
    pub attribute: &'a AttributeDefinition,
    pub sub_attribute: Option<&'a AttributeDefinition>,
}

impl<'a> ResolvedAttribute<'a> {
    /// The definition the reference ultimately points at.
    pub fn target(&self) -> &'a AttributeDefinition {
        self.sub_attribute.unwrap_or(self.attribute)
    }

    /// Reference rebuilt with schema-declared casing.
    pub fn canonical_reference(&self, original: &AttributeReference) -> AttributeReference {
        original.renamed(
            self.attribute.name(),
            self.sub_attribute.map(AttributeDefinition::name),
        )
    }
}

impl<'a> ResourceSchema<'a> {
    pub fn new(base: &'a Schema, extensions: Vec<&'a Schema>) -> Self {
        Self { base, extensions }
    }

    pub fn base(&self) -> &'a Schema {
        self.base
    }

    pub fn extensions(&self) -> &[&'a Schema] {
        &self.extensions
    }

    /// Schema (base or extension) with the given URN.
    pub fn schema_for_urn(&self, urn: &str) -> Option<&'a Schema> {
        std::iter::once(self.base)
            .chain(self.extensions.iter().copied())
            .find(|schema| schema.id.eq_ignore_ascii_case(urn))
    }

    /// Extension schema whose URN is used as a key in the resource JSON.
    pub fn extension_for_key(&self, key: &str) -> Option<&'a Schema> {
        self.extensions
            .iter()
            .copied()
            .find(|schema| schema.id.eq_ignore_ascii_case(key))
    }

    /// Resolve a reference to an extension or an attribute.
    ///
    /// URN-qualified references go to the named schema; unqualified ones try
    /// the base schema first, then each extension in declaration order.
    pub fn resolve(&self, reference: &AttributeReference) -> Option<Resolution<'a>> {
        if let Some(urn) = reference.as_schema_urn() {
            if let Some(extension) = self.extension_for_key(&urn) {
                return Some(Resolution::Extension(extension));
            }
        }
        self.resolve_attribute(reference).map(Resolution::Attribute)
    }

    /// Resolve a reference that must name an attribute.
    pub fn resolve_attribute(&self, reference: &AttributeReference) -> Option<ResolvedAttribute<'a>> {
        match reference.urn() {
            Some(urn) => {
                let schema = self.schema_for_urn(urn)?;
                self.resolve_in(schema, reference)
            }
            None => std::iter::once(self.base)
                .chain(self.extensions.iter().copied())
                .find_map(|schema| self.resolve_in(schema, reference)),
        }
    }

    fn resolve_in(
        &self,
        schema: &'a Schema,
        reference: &AttributeReference,
    ) -> Option<ResolvedAttribute<'a>> {
        let attribute = schema.get_attribute(reference.attribute_name())?;
        let sub_attribute = match reference.sub_attribute_name() {
            Some(sub) => Some(attribute.get_attribute(sub)?),
            None => None,
        };
        let container = if std::ptr::eq(schema, self.base) {
            AttributeContainer::Base
        } else {
            AttributeContainer::Extension(&schema.id)
        };
        Some(ResolvedAttribute {
            schema,
            container,
            attribute,
            sub_attribute,
        })
    }
}

impl<'a> From<&'a Schema> for ResourceSchema<'a> {
    fn from(base: &'a Schema) -> Self {
        Self::new(base, Vec::new())
    }
}
