//! Error types and result types for document store and relation operations.
//!
//! This module provides the error handling for every operation in the crate.
//! Use [`DocumentStoreResult<T>`] as the return type for fallible operations.

use bson::error::Error as BsonError;
use serde_json::Error as SerdeJsonError;
use thiserror::Error;

/// Represents all possible errors that can occur when interacting with a document store
/// or resolving relations between documents.
///
/// The variants fall into four groups: serialization, missing records (returned by the
/// `*_or_throw` relation operations), constraint violations (invalid collection, index or
/// field combinations that could not be rejected at compile time) and backend errors.
#[derive(Error, Debug)]
pub enum DocumentStoreError {
    /// Serialization/deserialization error when converting between document formats (BSON, JSON).
    #[error("Serialization error: {0}")]
    Serialization(String),
    /// Error during store initialization or connection setup.
    #[error("Initialization error: {0}")]
    Initialization(String),
    /// A document with the given ID already exists in the collection.
    /// The first argument is the document ID, the second is the collection name.
    #[error("Document {0} already exists in collection {1}")]
    DocumentAlreadyExists(String, String),
    /// The requested document was not found in the collection.
    /// The first argument is the document ID, the second is the collection name.
    #[error("Document not found {0} in collection {1}")]
    DocumentNotFound(String, String),
    /// An index lookup that requires a match found nothing.
    /// The arguments are the collection, the field and the looked-up value.
    #[error("No document in collection {0} where {1} = {2}")]
    NoIndexMatch(String, String, String),
    /// A join record pointed at a document that could not be resolved.
    /// The arguments are the join collection, the target field and the originating lookup value.
    #[error("Unresolved reference in {0}.{1} for lookup value {2}")]
    UnresolvedJoinTarget(String, String, String),
    /// A lookup expected to be unique matched more than one document.
    /// The arguments are the collection, the field, the value and the number of matches.
    #[error("Expected at most one document in collection {0} where {1} = {2}, found {3}")]
    AmbiguousMatch(String, String, String, usize),
    /// The named index is not declared on the collection.
    /// The first argument is the index name, the second is the collection name.
    #[error("Index {0} not found on collection {1}")]
    IndexNotFound(String, String),
    /// A collection, index or field combination is not valid for the requested operation.
    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),
    /// An error occurred in the underlying storage backend.
    #[error("Backend error: {0}")]
    Backend(String),
}

impl DocumentStoreError {
    /// Returns `true` for the errors raised when a reference or lookup resolved to nothing.
    pub fn is_missing_record(&self) -> bool {
        matches!(
            self,
            DocumentStoreError::DocumentNotFound(..)
                | DocumentStoreError::NoIndexMatch(..)
                | DocumentStoreError::UnresolvedJoinTarget(..)
        )
    }
}

/// A specialized `Result` type for document store operations.
///
/// This type alias is used throughout the crate to indicate operations that may fail
/// with a [`DocumentStoreError`].
pub type DocumentStoreResult<T> = Result<T, DocumentStoreError>;

impl From<BsonError> for DocumentStoreError {
    fn from(err: BsonError) -> Self {
        DocumentStoreError::Serialization(err.to_string())
    }
}

impl From<SerdeJsonError> for DocumentStoreError {
    fn from(err: SerdeJsonError) -> Self {
        DocumentStoreError::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_record_variants_are_grouped() {
        assert!(DocumentStoreError::DocumentNotFound("a".into(), "users".into()).is_missing_record());
        assert!(
            DocumentStoreError::NoIndexMatch("users".into(), "token".into(), "\"b\"".into())
                .is_missing_record()
        );
        assert!(
            DocumentStoreError::UnresolvedJoinTarget("edges".into(), "session_id".into(), "u".into())
                .is_missing_record()
        );
        assert!(!DocumentStoreError::ConstraintViolation("bad".into()).is_missing_record());
        assert!(
            !DocumentStoreError::AmbiguousMatch("users".into(), "token".into(), "b".into(), 2)
                .is_missing_record()
        );
    }

    #[test]
    fn messages_carry_context() {
        let err = DocumentStoreError::NoIndexMatch("users".into(), "token_identifier".into(), "\"b\"".into());
        assert_eq!(err.to_string(), "No document in collection users where token_identifier = \"b\"");
    }
}
