pub mod reasoning_error;
pub mod tool_error;

use std::{io, path::PathBuf};

use thiserror::Error as ThisError;

pub use reasoning_error::{BackendError, ReasoningError};
pub use tool_error::{CapabilityError, RegistryError};

#[derive(ThisError, Debug)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid value {value:?} for {key}")]
    InvalidValue { key: String, value: String },
}

#[derive(ThisError, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("serde_json error: {0}")]
    SerdeJsonError(#[from] serde_json::Error),

    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    #[error("registry error: {0}")]
    Registry(#[from] RegistryError),

    #[error("reasoning error: {0}")]
    Reasoning(#[from] ReasoningError),

    #[error("capability error: {0}")]
    Capability(#[from] CapabilityError),

    #[error("backend error: {0}")]
    Backend(#[from] BackendError),
}

pub type Result<T> = core::result::Result<T, Error>;
