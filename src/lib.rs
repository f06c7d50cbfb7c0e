/// Error types for capture, parsing and configuration
pub mod error;

/// Record, tag and typed value types
pub mod record;

/// Scalar and byte-size normalization
pub mod normalize;

/// Declared field types and cross-type coercion
pub mod schema;

/// Line classification and record extraction
pub mod parse;

/// Per-source format drivers
pub mod drivers;

/// Collection façade, subprocess capture and warn-once set
pub mod collectors;

/// Configuration management
pub mod config;

// Re-export commonly used types
pub use error::{CaptureError, ConfigError, FieldError, ParseError, TargetError};
pub use record::{Record, Tags, Value};
