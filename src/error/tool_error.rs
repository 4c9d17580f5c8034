#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("capability '{0}' is already registered")]
    DuplicateCapability(String),

    #[error("unknown capability '{0}'")]
    UnknownCapability(String),
}

/// Raised (as opposed to reported) capability failures.
#[derive(Debug, thiserror::Error)]
pub enum CapabilityError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("failed to decode response: {0}")]
    Decode(String),

    #[error("capability panicked: {0}")]
    Panicked(String),

    #[error("{0}")]
    Other(String),
}
