//! Error types for taskpanel-core.

use std::path::PathBuf;

use thiserror::Error;

/// All errors that can arise from record store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Underlying I/O failure, with the path that was being touched.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// YAML serialization error (write/save path).
    #[error("YAML serialization error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// YAML parse error on load — includes file path and line context from serde_yaml.
    #[error("failed to parse record at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// `dirs::home_dir()` returned `None` — cannot locate `~/.taskpanel/`.
    #[error("cannot determine home directory; set $HOME or equivalent")]
    HomeNotFound,

    /// The record YAML file did not exist at the expected path.
    #[error("record not found at {path}")]
    RecordNotFound { path: PathBuf },
}

/// Errors raised by the structured-record API.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RecordError {
    /// No plan, step or EVR with this id.
    #[error("no node with id '{id}'")]
    UnknownNode { id: String },

    /// The record violates a structural invariant.
    #[error("invalid record: {field}: {reason}")]
    Invalid { field: String, reason: String },
}

/// Convenience constructor for [`StoreError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> StoreError {
    StoreError::Io {
        path: path.into(),
        source,
    }
}
