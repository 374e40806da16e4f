use thiserror::Error;

/// Structural failures that prevent an [`Animation`](crate::Animation) from
/// being constructed. Everything below the document header is recoverable and
/// reported through [`DiagnosticSink`](crate::DiagnosticSink) instead.
#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("Malformed JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Document root is not an object")]
    NotAnObject,
    #[error("Document has no version tag")]
    MissingVersion,
    #[error("Invalid animation size: {width}x{height}")]
    InvalidSize { width: f32, height: f32 },
    #[error("Invalid frame rate: {0}")]
    InvalidFrameRate(f32),
    #[error("Resource not found: {0}")]
    ResourceNotFound(String),
}

pub type Result<T> = std::result::Result<T, Error>;
