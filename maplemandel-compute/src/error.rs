//! Engine error types.

use maplemandel_core::{ConfigurationError, NumericError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error("a render is in progress")]
    Busy,

    #[error("numeric failure: {0}")]
    Numeric(#[from] NumericError),

    #[error("failed to start render thread: {0}")]
    Spawn(#[source] std::io::Error),
}
