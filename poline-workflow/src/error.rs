//! Error types for poline-workflow.

use std::path::PathBuf;

use thiserror::Error;

use poline_core::CoreError;
use poline_renderer::RenderError;

/// Errors that can abort a run, or be folded into a per-PO outcome.
#[derive(Debug, Error)]
pub enum WorkflowError {
    /// Configuration or input error.
    #[error("{0}")]
    Core(#[from] CoreError),

    /// An error from the body renderer.
    #[error("render error: {0}")]
    Render(#[from] RenderError),

    /// The request never produced an HTTP response (DNS, TLS, timeout, ...).
    #[error("transport error for {url}: {message}")]
    Transport { url: String, message: String },

    /// An I/O error, with annotated path for context.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Audit log write failure.
    #[error("audit log error: {0}")]
    Audit(#[from] csv::Error),
}

/// Convenience constructor for [`WorkflowError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> WorkflowError {
    WorkflowError::Io {
        path: path.into(),
        source,
    }
}
