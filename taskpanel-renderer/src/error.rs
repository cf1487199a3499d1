//! Error types for taskpanel-renderer.

use thiserror::Error;

/// All errors that can arise from panel rendering.
///
/// Parsing never fails; recoverable problems surface as
/// [`ParseWarning`](crate::panel::ParseWarning)s instead.
#[derive(Debug, Error)]
pub enum RenderError {
    /// Tera template engine error.
    #[error("template engine error: {0}")]
    Tera(#[from] tera::Error),

    /// JSON serialization error (building tera context).
    #[error("context serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
