//! Error types for numeric operations and the parameter codec.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum NumericError {
    #[error("division by zero")]
    DivisionByZero,

    #[error("binary exponent {exponent} exceeds the representable range")]
    ExponentOverflow { exponent: i64 },

    #[error("value is not finite: {0}")]
    NotFinite(f64),

    #[error("failed to parse number: {0}")]
    Parse(String),
}

#[derive(Debug, Error)]
pub enum FormatError {
    #[error("parameter stream is not valid compressed data: {0}")]
    Compression(#[from] std::io::Error),

    #[error("parameter body is corrupt: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unsupported parameter version {found} (supported: {supported})")]
    UnsupportedVersion { found: u32, supported: u32 },

    #[error("invalid parameter value: {0}")]
    InvalidValue(String),

    #[error("invalid share string: {0}")]
    ShareString(String),
}

/// Rejected viewport or engine configuration.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigurationError {
    #[error("max iterations must be positive, got {0}")]
    InvalidMaxIterations(u32),

    #[error("invalid center: {0}")]
    InvalidCenter(String),

    #[error("scale must be positive, got {0}")]
    InvalidScale(String),

    #[error("image must have a non-zero area, got {width}x{height}")]
    InvalidImageSize { width: u32, height: u32 },

    #[error("invalid engine configuration: {0}")]
    InvalidConfig(String),
}
