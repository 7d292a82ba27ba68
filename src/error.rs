//! Error taxonomy for the classification core.

use thiserror::Error;

/// Failures surfaced by the classifier library.
///
/// `ModelLoad` and `Config` are fatal for a run. `Encoding` is scoped to a
/// single document and is recorded against that document's id.
#[derive(Debug, Error)]
pub enum ClassifyError {
    #[error("model load error: {0}")]
    ModelLoad(String),

    #[error("encoding error: {0}")]
    Encoding(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ClassifyError {
    /// Whether the error only affects the document being classified.
    pub fn is_per_document(&self) -> bool {
        matches!(self, Self::Encoding(_))
    }
}

pub type Result<T, E = ClassifyError> = std::result::Result<T, E>;
