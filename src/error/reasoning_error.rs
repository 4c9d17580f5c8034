use std::time::Duration;

/// Failures of the reasoning path. Only `Unavailable` and `Timeout` are retried.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ReasoningError {
    #[error("reasoning service unavailable after {attempts} attempt(s): {message}")]
    Unavailable { attempts: u32, message: String },

    #[error("reasoning call exceeded its deadline of {0:?}")]
    Timeout(Duration),

    #[error("malformed reasoning response: {0}")]
    MalformedResponse(String),
}

impl ReasoningError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Unavailable { .. } | Self::Timeout(_))
    }
}

/// Errors raised by a concrete completion backend.
///
/// The reasoning client treats all of them as opaque.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("http error: {0}")]
    Http(String),

    #[error("backend returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("backend returned no completion")]
    EmptyResponse,

    #[error("failed to decode backend response: {0}")]
    Decode(String),
}
