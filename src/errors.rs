// src/errors.rs

use thiserror::Error;

/// Internal failure taxonomy of a source adapter.
///
/// None of these ever reach the orchestrator: adapters convert every
/// failure into a `NotFound` outcome locally. The enum exists so recovery
/// points log a classified cause instead of a bare string.
#[derive(Debug, Error)]
pub enum AdapterError {
    /// Network failure, timeout, or non-success HTTP status.
    #[error("upstream unavailable: {0}")]
    Unavailable(String),

    /// Response arrived but could not be decoded into the expected shape.
    #[error("malformed response: {0}")]
    Malformed(String),
}

impl From<reqwest::Error> for AdapterError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            AdapterError::Malformed(err.to_string())
        } else {
            AdapterError::Unavailable(err.to_string())
        }
    }
}
