//! Error taxonomy shared by the index, seed registry and path engine.

use thiserror::Error;

use crate::store::StoreError;
use lodestar_schema::VocabularyError;

#[derive(Debug, Error)]
pub enum IndexError {
    /// Malformed input: bad seed URI, mismatched vocabulary identifiers.
    #[error("validation failed: {0}")]
    Validation(String),

    /// Unknown vocabulary, type or property. An expected outcome, not a crash.
    #[error("not found: {0}")]
    NotFound(String),

    /// Duplicate vocabulary or duplicate (type, uri) seed.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Malformed or dangling seed identifier.
    #[error("invalid seed: {0}")]
    InvalidSeed(String),

    /// Index store failure. Always fatal for the running operation; retry
    /// policy belongs to the caller.
    #[error(transparent)]
    Storage(#[from] StoreError),
}

impl From<VocabularyError> for IndexError {
    fn from(err: VocabularyError) -> Self {
        match err {
            VocabularyError::Duplicate(vid) => {
                IndexError::Conflict(format!("vocabulary `{vid}` is already registered"))
            }
            VocabularyError::Unknown(vid) => {
                IndexError::NotFound(format!("vocabulary `{vid}` is not known"))
            }
            VocabularyError::IdMismatch { expected, found } => IndexError::Validation(format!(
                "vocabulary identifiers do not match: expected `{expected}`, got `{found}`"
            )),
        }
    }
}
