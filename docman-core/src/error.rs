//! Error types and result types for document classes, instances and managers.
//!
//! Use [`DocumentResult<T>`] as the return type for fallible operations.

use bson::error::Error as BsonError;
use serde_json::Error as SerdeJsonError;
use thiserror::Error;

/// Represents all possible errors raised while declaring document classes, building
/// document instances or running manager operations.
#[derive(Error, Debug)]
pub enum DocumentError {
    /// Init data is not a mapping, or positional and keyword init data were both given.
    #[error("Invalid init data: {0}")]
    InitData(String),
    /// A field was read or removed from a document that does not hold it.
    /// The first argument is the class name, the second is the field name.
    #[error("'{class}' document has no attribute '{name}'")]
    AttributeNotFound {
        /// Name of the document class.
        class: String,
        /// Name of the missing field.
        name: String,
    },
    /// A lookup that expects exactly one document found none.
    #[error("Document matching {filter} does not exist in collection {collection}")]
    DoesNotExist {
        /// Name of the collection that was searched.
        collection: String,
        /// Rendered filter used for the lookup.
        filter: String,
    },
    /// The class is abstract or has no database settings anywhere in its chain.
    #[error("Document class {0} has no manager")]
    NoManager(String),
    /// Serialization/deserialization error when converting between document formats (BSON, JSON).
    #[error("Serialization error: {0}")]
    Serialization(String),
    /// Error while creating a client from database settings.
    #[error("Initialization error: {0}")]
    Initialization(String),
    /// The stored document or a filter value has an unexpected shape.
    #[error("Invalid document: {0}")]
    InvalidDocument(String),
    /// An error occurred in the underlying storage backend.
    #[error("Backend error: {0}")]
    Backend(String),
}

/// A specialized `Result` type for document operations.
pub type DocumentResult<T> = Result<T, DocumentError>;

impl DocumentError {
    pub(crate) fn attribute_not_found(class: &str, name: &str) -> Self {
        DocumentError::AttributeNotFound {
            class: class.to_string(),
            name: name.to_string(),
        }
    }
}

impl From<BsonError> for DocumentError {
    fn from(err: BsonError) -> Self {
        DocumentError::Serialization(err.to_string())
    }
}

impl From<SerdeJsonError> for DocumentError {
    fn from(err: SerdeJsonError) -> Self {
        DocumentError::Serialization(err.to_string())
    }
}
