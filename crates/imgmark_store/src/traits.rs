//! The persistence contract the editor is written against.

use crate::error::StoreError;
use crate::model::{Annotation, AnnotationId, AnnotationPatch, ImageId, ImageRecord, NewAnnotation};

/// Asynchronous per-image annotation storage.
///
/// Implementations run on a single-threaded event loop, so the futures
/// are not required to be `Send`. Operations issued from different user
/// gestures may complete in any order.
#[allow(async_fn_in_trait)]
pub trait AnnotationStore {
    /// Persist a new annotation and return it with its assigned id and
    /// timestamps. Fails with [`StoreError::ImageNotFound`] for an
    /// unknown image.
    async fn create_annotation(
        &self,
        image_id: &ImageId,
        annotation: NewAnnotation,
    ) -> Result<Annotation, StoreError>;

    /// All annotations of an image, in storage order.
    async fn list_annotations(&self, image_id: &ImageId) -> Result<Vec<Annotation>, StoreError>;

    /// Apply a partial update and return the stored result.
    async fn update_annotation(
        &self,
        image_id: &ImageId,
        annotation_id: &AnnotationId,
        patch: AnnotationPatch,
    ) -> Result<Annotation, StoreError>;

    /// Remove an annotation.
    async fn delete_annotation(
        &self,
        image_id: &ImageId,
        annotation_id: &AnnotationId,
    ) -> Result<(), StoreError>;
}

/// Registry of uploaded images.
#[allow(async_fn_in_trait)]
pub trait ImageCatalog {
    /// Register an image. `id` and `uploaded_at` are assigned by the store.
    async fn add_image(
        &self,
        title: String,
        url: String,
        natural_width: u32,
        natural_height: u32,
    ) -> Result<ImageRecord, StoreError>;

    async fn get_image(&self, image_id: &ImageId) -> Result<ImageRecord, StoreError>;

    /// All images in upload order.
    async fn list_images(&self) -> Result<Vec<ImageRecord>, StoreError>;

    /// Remove an image together with all of its annotations.
    async fn remove_image(&self, image_id: &ImageId) -> Result<ImageRecord, StoreError>;
}
