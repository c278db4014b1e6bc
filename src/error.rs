//! Error types for SCIM filter, patch, projection and schema operations.
//!
//! Query-time problems (type mismatches, unknown attributes) never surface as
//! errors; they evaluate to "no match". Everything in this module is a
//! recoverable, client-facing condition that the REST layer maps to a SCIM
//! `scimType` and HTTP status.

use crate::schema::Mutability;

/// Main error type for the SCIM core.
///
/// Each component has its own focused error type; this enum unifies them for
/// callers that drive several components in one request.
#[derive(Debug, thiserror::Error)]
pub enum ScimError {
    /// Malformed filter or patch-path text
    #[error(transparent)]
    FilterParse(#[from] FilterParseError),

    /// Structurally invalid attribute path
    #[error(transparent)]
    InvalidPath(#[from] InvalidPathError),

    /// PATCH application failure
    #[error("Patch error: {0}")]
    Patch(#[from] PatchError),

    /// Attribute projection failure
    #[error("Projection error: {0}")]
    Projection(#[from] ProjectionError),

    /// Schema or registry failure
    #[error("Schema error: {0}")]
    Schema(#[from] SchemaError),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Invalid engine configuration
    #[error("Invalid configuration: {message}")]
    InvalidConfiguration { message: String },
}

/// A filter or patch path could not be parsed.
///
/// The parser never recovers; the first lexical or grammatical problem is
/// reported together with the text it was looking at.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid filter at position {position}: {message} (near '{offending_text}')")]
pub struct FilterParseError {
    /// What went wrong
    pub message: String,
    /// The token or fragment that could not be parsed
    pub offending_text: String,
    /// Byte offset of the offending text within the input
    pub position: usize,
}

/// An attribute path is empty, malformed or not allowed where it is used.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid path '{path}': {reason}")]
pub struct InvalidPathError {
    /// The offending path text
    pub path: String,
    /// Why the path was rejected
    pub reason: String,
}

/// Errors raised while applying PATCH operations.
///
/// Unlike filter evaluation, patch path resolution is strict: an operation
/// that cannot be applied exactly as written fails instead of doing nothing.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PatchError {
    /// The path is malformed, unknown, or not meaningful for the operation
    #[error(transparent)]
    InvalidPath(#[from] InvalidPathError),

    /// The path contains a value filter that could not be parsed
    #[error(transparent)]
    Parse(#[from] FilterParseError),

    /// A value filter selected no elements
    #[error("No target matched path '{path}'")]
    NoTarget { path: String },

    /// The target attribute may not be modified
    #[error("Attribute '{attribute}' is {mutability} and cannot be modified")]
    Mutability {
        attribute: String,
        mutability: Mutability,
    },

    /// The supplied value does not fit the target attribute
    #[error("Invalid value for '{attribute}': {reason}")]
    InvalidValue { attribute: String, reason: String },

    /// The request carries more operations than configured
    #[error("Patch request has {count} operations, limit is {limit}")]
    TooManyOperations { count: usize, limit: usize },
}

/// Errors raised while projecting a resource for the wire.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProjectionError {
    /// Both `attributes` and `excludedAttributes` were supplied
    #[error("'attributes' and 'excludedAttributes' cannot be specified together")]
    AmbiguousProjection,

    /// An attribute name in the selection could not be parsed
    #[error(transparent)]
    InvalidAttribute(#[from] InvalidPathError),
}

/// Errors raised while building schemas and the schema registry.
#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    /// Resource type lacks an id, schema URN or endpoint, or is inconsistent
    #[error("Invalid resource type '{id}': {reason}")]
    InvalidResourceType { id: String, reason: String },

    /// A different schema is already registered under this URN
    #[error("Schema '{urn}' is already registered with a different definition")]
    DuplicateSchema { urn: String },

    /// Another resource type already serves this endpoint
    #[error("Endpoint '{endpoint}' is already registered")]
    DuplicateEndpoint { endpoint: String },

    /// A declared extension schema was neither supplied nor registered
    #[error("Resource type '{resource_type}' declares unknown extension '{urn}'")]
    UnknownExtension { resource_type: String, urn: String },

    /// An attribute definition violates the schema model invariants
    #[error("Attribute '{attribute}' in schema '{schema}' is invalid: {reason}")]
    InvalidAttribute {
        schema: String,
        attribute: String,
        reason: String,
    },

    /// Schema JSON could not be read
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Schema file could not be read
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl FilterParseError {
    /// Create a parse error pointing at a fragment of the input
    pub fn new(
        message: impl Into<String>,
        offending_text: impl Into<String>,
        position: usize,
    ) -> Self {
        Self {
            message: message.into(),
            offending_text: offending_text.into(),
            position,
        }
    }
}

impl InvalidPathError {
    /// Create an invalid path error
    pub fn new(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

impl PatchError {
    /// Create an invalid path error
    pub fn invalid_path(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidPath(InvalidPathError::new(path, reason))
    }

    /// Create a no-target error
    pub fn no_target(path: impl Into<String>) -> Self {
        Self::NoTarget { path: path.into() }
    }

    /// Create a mutability violation
    pub fn mutability(attribute: impl Into<String>, mutability: Mutability) -> Self {
        Self::Mutability {
            attribute: attribute.into(),
            mutability,
        }
    }

    /// Create an invalid value error
    pub fn invalid_value(attribute: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            attribute: attribute.into(),
            reason: reason.into(),
        }
    }

    /// The RFC 7644 `scimType` detail code for this error.
    pub fn scim_type(&self) -> &'static str {
        match self {
            Self::InvalidPath(_) => "invalidPath",
            Self::Parse(_) => "invalidFilter",
            Self::NoTarget { .. } => "noTarget",
            Self::Mutability { .. } => "mutability",
            Self::InvalidValue { .. } => "invalidValue",
            Self::TooManyOperations { .. } => "tooMany",
        }
    }
}

impl SchemaError {
    /// Create an invalid resource type error
    pub fn invalid_resource_type(id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidResourceType {
            id: id.into(),
            reason: reason.into(),
        }
    }

    /// Create an invalid attribute error
    pub fn invalid_attribute(
        schema: impl Into<String>,
        attribute: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidAttribute {
            schema: schema.into(),
            attribute: attribute.into(),
            reason: reason.into(),
        }
    }
}

impl ScimError {
    /// Create an invalid configuration error
    pub fn invalid_configuration(message: impl Into<String>) -> Self {
        Self::InvalidConfiguration {
            message: message.into(),
        }
    }
}

// Result type aliases for convenience
pub type ScimResult<T> = Result<T, ScimError>;
pub type FilterResult<T> = Result<T, FilterParseError>;
pub type PatchResult<T> = Result<T, PatchError>;
pub type ProjectionResult<T> = Result<T, ProjectionError>;
pub type SchemaResult<T> = Result<T, SchemaError>;
