use std::fmt;
use thiserror::Error;

/// Errors that abort the parse of a whole captured block
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    #[error("Unexpected output structure: {0}")]
    Structural(String),

    #[error("Cannot determine record end sentinel: {0}")]
    Sentinel(String),
}

/// Errors that can occur while capturing text from an external command
#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("Executable not found: {0}")]
    NotFound(String),

    #[error("Failed to spawn subprocess: {0}")]
    Spawn(String),

    #[error("Subprocess timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("Subprocess exited with {status}: {output}")]
    NonZeroExit { status: String, output: String },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// A value that cannot be interpreted as the declared schema type
#[derive(Error, Debug, Clone, PartialEq)]
#[error("cannot coerce {value:?} to {target}")]
pub struct CoerceError {
    pub value: String,
    pub target: &'static str,
}

/// Errors that can occur during configuration loading
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(String),

    #[error("Invalid configuration value: {0}")]
    ValidationError(String),

    #[error("TOML parse error: {0}")]
    TomlError(#[from] toml::de::Error),
}

/// Failure of one configured target during a collection cycle
#[derive(Error, Debug)]
pub enum TargetError {
    #[error("{target}: capture failed: {source}")]
    Capture {
        target: String,
        #[source]
        source: CaptureError,
    },

    #[error("{target}: parse failed: {source}")]
    Parse {
        target: String,
        #[source]
        source: ParseError,
    },
}

impl TargetError {
    /// Identity of the target that failed
    pub fn target(&self) -> &str {
        match self {
            TargetError::Capture { target, .. } | TargetError::Parse { target, .. } => target,
        }
    }
}

/// A single field that was dropped from a record
///
/// Not an abort condition: the record is still emitted without the field.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldError {
    pub field: String,
    pub raw: String,
    pub reason: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, raw: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            raw: raw.into(),
            reason: reason.into(),
        }
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "field {} dropped ({:?}): {}", self.field, self.raw, self.reason)
    }
}

/// Errors from the byte-size normalization path
///
/// A byte-size field must never silently degrade to a string, so a missing or
/// unknown unit is an error here rather than a fallback.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ByteSizeError {
    #[error("byte quantity {0:?} has no unit of measurement")]
    MissingUnit(String),

    #[error("byte quantity {0:?} has an unknown unit")]
    UnknownUnit(String),

    #[error("byte quantity {0:?} is not a positive number")]
    InvalidNumber(String),

    #[error("byte quantity {0:?} does not fit in 64 bits")]
    Overflow(String),
}
