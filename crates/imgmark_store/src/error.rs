//! Error types for store operations.

use thiserror::Error;

use crate::model::{AnnotationId, ImageId};

/// Errors that can occur while talking to a store.
#[derive(Error, Debug)]
pub enum StoreError {
    /// The image is not known to the store
    #[error("Image not found: {0}")]
    ImageNotFound(ImageId),

    /// The annotation is not known for that image
    #[error("Annotation {annotation} not found on image {image}")]
    AnnotationNotFound {
        /// Image that was searched
        image: ImageId,
        /// The missing annotation
        annotation: AnnotationId,
    },

    /// The request carries data the store refuses to persist
    #[error("Invalid annotation: {0}")]
    InvalidAnnotation(String),

    /// Storage is unreachable or refused the operation
    #[error("Storage unavailable: {0}")]
    Unavailable(String),

    /// Stored data could not be encoded or decoded
    #[error("JSON error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O error in a file-backed store
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl StoreError {
    /// Create an unavailable error with a message.
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable(message.into())
    }

    /// Whether this is one of the not-found variants.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::ImageNotFound(_) | Self::AnnotationNotFound { .. }
        )
    }
}
