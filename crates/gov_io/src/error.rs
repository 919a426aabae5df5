//! I/O-layer error type. Kept distinct from `gov_core::GovError` — this one
//! wraps `std::io::Error` and friends, and gets converted to a `GovError`
//! at the first boundary that has enough context to pick a variant.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum IoError {
    #[error("read failed: {0}")]
    Read(#[source] std::io::Error),

    #[error("write failed: {0}")]
    Write(#[source] std::io::Error),

    #[error("path has no parent directory: {0}")]
    NoParent(String),

    #[error("serialization failed: {0}")]
    Serde(String),

    #[error("hashing failed: {0}")]
    Hash(String),
}

impl From<gov_core::GovError> for IoError {
    fn from(e: gov_core::GovError) -> Self {
        IoError::Serde(e.to_string())
    }
}

impl From<IoError> for gov_core::GovError {
    fn from(e: IoError) -> Self {
        gov_core::GovError::SerializationFail(e.to_string())
    }
}
