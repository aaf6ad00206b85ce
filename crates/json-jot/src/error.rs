//! Error type shared by every operation.
//!
//! Structural problems (bad payloads, wrong document shapes, unknown tags)
//! are errors. Semantic OT conflicts are not: `rebase` reports those as
//! `None`.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum OtError {
    /// Malformed payload at construction or decoding.
    #[error("INVALID_OP: {0}")]
    Validation(String),

    #[error("UNKNOWN_TYPE: {0}")]
    UnknownVariant(String),

    #[error("NOT_IMPLEMENTED: {0}")]
    NotImplemented(String),

    /// The operation does not fit the shape of the document it was applied to.
    #[error("TYPE_MISMATCH: {0}")]
    TypeMismatch(String),

    #[error("OUT_OF_BOUNDS")]
    OutOfBounds,

    #[error("NOT_FOUND: {0}")]
    NotFound(String),

    #[error("INTERNAL: {0}")]
    Internal(String),

    #[error("INVALID_JSON: {0}")]
    Json(String),
}

impl From<serde_json::Error> for OtError {
    fn from(err: serde_json::Error) -> Self {
        OtError::Json(err.to_string())
    }
}

pub type OtResult<T> = Result<T, OtError>;

pub(crate) fn invalid(msg: impl Into<String>) -> OtError {
    OtError::Validation(msg.into())
}

pub(crate) fn mismatch(msg: impl Into<String>) -> OtError {
    OtError::TypeMismatch(msg.into())
}
