//! imgmark_store - persistence for image annotations.
//!
//! Provides the shared data model, the asynchronous [`AnnotationStore`] and
//! [`ImageCatalog`] contracts the editor is written against, and a
//! [`MockStore`] that fulfils them over localStorage-style key/value
//! backends.

pub mod backend;
pub mod error;
pub mod mock;
pub mod model;
pub mod traits;

#[cfg(not(target_arch = "wasm32"))]
pub use backend::FileBackend;
#[cfg(target_arch = "wasm32")]
pub use backend::LocalStorageBackend;
pub use backend::{KeyValueBackend, MemoryBackend};
pub use error::StoreError;
pub use mock::MockStore;
pub use model::{
    Annotation, AnnotationId, AnnotationPatch, ImageId, ImageRecord, NewAnnotation, Point, Rect,
    now_millis,
};
pub use traits::{AnnotationStore, ImageCatalog};
