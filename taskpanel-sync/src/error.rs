//! Error types for taskpanel-sync.

use std::path::PathBuf;

use thiserror::Error;

use taskpanel_core::error::{RecordError, StoreError};
use taskpanel_core::RecordId;
use taskpanel_renderer::RenderError;

/// All errors that can arise from sync operations.
///
/// Parse warnings and field conflicts are values on
/// [`SyncPreview`](crate::SyncPreview), not errors.
#[derive(Debug, Error)]
pub enum SyncError {
    /// An error from the rendering engine.
    #[error("render error: {0}")]
    Render(#[from] RenderError),

    /// An error from the record store.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// A structured-record API call was rejected.
    #[error("record error: {0}")]
    Record(#[from] RecordError),

    /// An I/O error, with annotated path for context.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// JSON serialization error (audit log).
    #[error("audit JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Malformed engine configuration file.
    #[error("invalid config at {path}: {source}")]
    Config {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// Invalid record or document binding. Nothing was written.
    #[error("validation failed for record '{record}': {reason}")]
    Validation { record: RecordId, reason: String },

    /// The document has parse warnings and the engine blocks on them.
    #[error("record '{record}' blocked: document has {warnings} parse warning(s)")]
    Blocked { record: RecordId, warnings: usize },
}

/// Convenience constructor for [`SyncError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> SyncError {
    SyncError::Io {
        path: path.into(),
        source,
    }
}

pub(crate) fn invalid(record: &RecordId, reason: impl Into<String>) -> SyncError {
    SyncError::Validation {
        record: record.clone(),
        reason: reason.into(),
    }
}
