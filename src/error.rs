//! Error taxonomy for configuration loading, generation and diffing.
//!
//! Validation errors are collected exhaustively and returned as a list;
//! template errors are recorded per artifact; a [`TypeRegistryGap`] is an
//! internal inconsistency and halts generation.

use std::fmt;
use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;

use crate::codegen::type_registry::MappingTarget;
use crate::config::FieldType;

/// Result type alias for domaingen operations
pub type DomaingenResult<T> = Result<T, DomaingenError>;

/// Category of a configuration defect
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationErrorKind {
    /// A required key is absent
    MissingField,
    /// A value is outside its closed enumeration or incompatible with its field
    InvalidValue,
    /// A name or version does not match its required pattern
    InvalidPattern,
    /// A name is declared twice within its scope
    DuplicateName,
    /// A reference names an entity, field or state that is not declared
    UnknownReference,
    /// An entity declares no fields
    EmptyEntity,
    /// A validation rule is malformed or self-contradictory
    InvalidRule,
    /// Two unrelated relationships resolve to the same key column
    ForeignKeyConflict,
}

/// A single structural or cross-reference violation in a domain config.
#[derive(Debug, Clone, PartialEq, Error, Serialize)]
#[error("{location}: {message}")]
pub struct ValidationError {
    pub kind: ValidationErrorKind,
    /// Dotted location, e.g. `entities[task].fields[title]`
    pub location: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    pub message: String,
}

impl ValidationError {
    pub fn new(kind: ValidationErrorKind, location: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind,
            location: location.into(),
            entity: None,
            field: None,
            message: message.into(),
        }
    }

    pub fn with_entity(mut self, entity: Option<&str>) -> Self {
        self.entity = entity.map(str::to_string);
        self
    }

    pub fn with_field(mut self, field: Option<&str>) -> Self {
        self.field = field.map(str::to_string);
        self
    }
}

/// Failure to render a single template.
#[derive(Debug, Clone, PartialEq, Error, Serialize)]
#[serde(tag = "error", rename_all = "snake_case")]
pub enum TemplateError {
    #[error("template '{template}' is not registered")]
    Missing { template: String },

    #[error("failed to render template '{template}': {cause}")]
    Render { template: String, cause: String },

    #[error("failed to bind context for template '{template}': {cause}")]
    Binding { template: String, cause: String },
}

/// Failure to register templates at startup.
#[derive(Debug, Error)]
pub enum TemplateLoadError {
    #[error("failed to read template source {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("template override {path} does not correspond to a known template id")]
    UnknownTemplate { path: PathBuf },

    #[error("malformed templates: {cause}")]
    Parse { cause: String },
}

/// The type registry has no entry for a field type the validator accepts.
///
/// Indicates that the validator's enumeration and the mapping table have
/// drifted apart; generation cannot proceed.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
pub struct TypeRegistryGap {
    pub field_type: FieldType,
    pub target: MappingTarget,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

impl TypeRegistryGap {
    pub fn at(mut self, entity: &str, field: &str) -> Self {
        self.entity = Some(entity.to_string());
        self.field = Some(field.to_string());
        self
    }
}

impl fmt::Display for TypeRegistryGap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "type registry has no '{}' mapping for field type '{}'",
            self.target.as_str(),
            self.field_type
        )?;
        if let (Some(entity), Some(field)) = (&self.entity, &self.field) {
            write!(f, " (entity '{}', field '{}')", entity, field)?;
        }
        Ok(())
    }
}

/// Top-level error type for domaingen operations
#[derive(Debug, Error)]
pub enum DomaingenError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse YAML {path}: {source}")]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("failed to parse JSON {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("{} validation error(s):\n{}", .0.len(), format_validation_errors(.0))]
    Validation(Vec<ValidationError>),

    #[error(transparent)]
    TemplateLoad(#[from] TemplateLoadError),

    #[error(transparent)]
    Template(#[from] TemplateError),

    #[error(transparent)]
    TypeRegistryGap(#[from] TypeRegistryGap),

    #[error(transparent)]
    Manual(#[from] crate::manual::ManualError),

    #[error("invalid settings: {0}")]
    Settings(String),
}

fn format_validation_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| format!("  - {}", e))
        .collect::<Vec<_>>()
        .join("\n")
}
