//! Mock persistence over a key/value backend.
//!
//! Layout:
//! - `images`: JSON array of [`ImageRecord`] in upload order
//! - `image-counter`: last numeric image id handed out
//! - `annotations-{imageId}`: JSON array of [`Annotation`] for one image
//!
//! Every operation can be made to yield to the executor a number of times
//! before it touches the backend, so concurrent requests complete in a
//! controlled order.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::pin::Pin;
use std::task::{Context, Poll};

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::backend::KeyValueBackend;
use crate::error::StoreError;
use crate::model::{
    Annotation, AnnotationId, AnnotationPatch, ImageId, ImageRecord, NewAnnotation, now_millis,
};
use crate::traits::{AnnotationStore, ImageCatalog};

const IMAGES_KEY: &str = "images";
const IMAGE_COUNTER_KEY: &str = "image-counter";

fn annotations_key(image_id: &ImageId) -> String {
    format!("annotations-{}", image_id)
}

/// Pending once, after waking its task.
#[derive(Default)]
struct YieldNow {
    yielded: bool,
}

impl Future for YieldNow {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        if self.yielded {
            return Poll::Ready(());
        }
        self.yielded = true;
        cx.waker().wake_by_ref();
        Poll::Pending
    }
}

/// Store implementing both [`AnnotationStore`] and [`ImageCatalog`] on top
/// of any [`KeyValueBackend`].
pub struct MockStore<B> {
    backend: B,
    /// Disambiguates annotation ids created within the same millisecond.
    sequence: Cell<u64>,
    latency: Cell<u32>,
    queued: RefCell<VecDeque<u32>>,
}

impl<B: KeyValueBackend> MockStore<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            sequence: Cell::new(0),
            latency: Cell::new(0),
            queued: RefCell::new(VecDeque::new()),
        }
    }

    /// Yield `yields` times at the start of every operation.
    pub fn with_latency(self, yields: u32) -> Self {
        self.latency.set(yields);
        self
    }

    /// Override the latency of the next operation to start. Queued values
    /// are used up in the order operations are first polled.
    pub fn queue_latency(&self, yields: u32) {
        self.queued.borrow_mut().push_back(yields);
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    async fn simulate_latency(&self) {
        let queued = self.queued.borrow_mut().pop_front();
        for _ in 0..queued.unwrap_or(self.latency.get()) {
            YieldNow::default().await;
        }
    }

    fn read<T: DeserializeOwned + Default>(&self, key: &str) -> Result<T, StoreError> {
        match self.backend.get(key)? {
            Some(json) => Ok(serde_json::from_str(&json)?),
            None => Ok(T::default()),
        }
    }

    fn write<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<(), StoreError> {
        let json = serde_json::to_string(value)?;
        self.backend.set(key, &json)
    }

    fn images(&self) -> Result<Vec<ImageRecord>, StoreError> {
        self.read(IMAGES_KEY)
    }

    fn require_image(&self, image_id: &ImageId) -> Result<(), StoreError> {
        if self.images()?.iter().any(|img| img.id == *image_id) {
            Ok(())
        } else {
            Err(StoreError::ImageNotFound(image_id.clone()))
        }
    }

    fn annotations(&self, image_id: &ImageId) -> Result<Vec<Annotation>, StoreError> {
        self.read(&annotations_key(image_id))
    }

    fn next_annotation_id(&self, image_id: &ImageId, existing: &[Annotation], now: u64) -> AnnotationId {
        loop {
            let seq = self.sequence.get();
            self.sequence.set(seq + 1);
            let id = AnnotationId::new(format!("ann-{}-{}-{}", image_id, now, seq));
            if !existing.iter().any(|a| a.id == id) {
                return id;
            }
        }
    }
}

impl<B: KeyValueBackend> AnnotationStore for MockStore<B> {
    async fn create_annotation(
        &self,
        image_id: &ImageId,
        annotation: NewAnnotation,
    ) -> Result<Annotation, StoreError> {
        self.simulate_latency().await;
        let rect = annotation.rect;
        if !(rect.width > 0.0 && rect.height > 0.0) {
            return Err(StoreError::InvalidAnnotation(format!(
                "rectangle {}x{} has no area",
                rect.width, rect.height
            )));
        }
        if annotation.label.trim().is_empty() {
            return Err(StoreError::InvalidAnnotation("label is empty".to_string()));
        }
        self.require_image(image_id)?;
        let mut list = self.annotations(image_id)?;

        let now = now_millis();
        let created = Annotation {
            id: self.next_annotation_id(image_id, &list, now),
            image_id: image_id.clone(),
            rect: annotation.rect,
            label: annotation.label,
            created_at: now,
            updated_at: now,
        };
        list.push(created.clone());
        self.write(&annotations_key(image_id), &list)?;
        log::trace!("Mock store: created {} on {}", created.id, image_id);
        Ok(created)
    }

    async fn list_annotations(&self, image_id: &ImageId) -> Result<Vec<Annotation>, StoreError> {
        self.simulate_latency().await;
        self.require_image(image_id)?;
        self.annotations(image_id)
    }

    async fn update_annotation(
        &self,
        image_id: &ImageId,
        annotation_id: &AnnotationId,
        patch: AnnotationPatch,
    ) -> Result<Annotation, StoreError> {
        self.simulate_latency().await;
        if patch.label.as_deref().is_some_and(|l| l.trim().is_empty()) {
            return Err(StoreError::InvalidAnnotation("label is empty".to_string()));
        }
        self.require_image(image_id)?;
        let mut list = self.annotations(image_id)?;
        let entry = list
            .iter_mut()
            .find(|a| a.id == *annotation_id)
            .ok_or_else(|| StoreError::AnnotationNotFound {
                image: image_id.clone(),
                annotation: annotation_id.clone(),
            })?;

        entry.apply(&patch, now_millis());
        let updated = entry.clone();
        self.write(&annotations_key(image_id), &list)?;
        log::trace!("Mock store: updated {} on {}", annotation_id, image_id);
        Ok(updated)
    }

    async fn delete_annotation(
        &self,
        image_id: &ImageId,
        annotation_id: &AnnotationId,
    ) -> Result<(), StoreError> {
        self.simulate_latency().await;
        self.require_image(image_id)?;
        let mut list = self.annotations(image_id)?;
        let index = list
            .iter()
            .position(|a| a.id == *annotation_id)
            .ok_or_else(|| StoreError::AnnotationNotFound {
                image: image_id.clone(),
                annotation: annotation_id.clone(),
            })?;

        list.remove(index);
        self.write(&annotations_key(image_id), &list)?;
        log::trace!("Mock store: deleted {} on {}", annotation_id, image_id);
        Ok(())
    }
}

impl<B: KeyValueBackend> ImageCatalog for MockStore<B> {
    async fn add_image(
        &self,
        title: String,
        url: String,
        natural_width: u32,
        natural_height: u32,
    ) -> Result<ImageRecord, StoreError> {
        self.simulate_latency().await;
        let mut images = self.images()?;
        let counter: u64 = self.read(IMAGE_COUNTER_KEY)?;
        let next = counter + 1;

        let record = ImageRecord {
            id: ImageId::new(format!("img-{}", next)),
            title,
            url,
            natural_width,
            natural_height,
            uploaded_at: now_millis(),
        };
        images.push(record.clone());

        self.write(IMAGE_COUNTER_KEY, &next)?;
        self.write(IMAGES_KEY, &images)?;
        log::trace!("Mock store: added image {}", record.id);
        Ok(record)
    }

    async fn get_image(&self, image_id: &ImageId) -> Result<ImageRecord, StoreError> {
        self.simulate_latency().await;
        self.images()?
            .into_iter()
            .find(|img| img.id == *image_id)
            .ok_or_else(|| StoreError::ImageNotFound(image_id.clone()))
    }

    async fn list_images(&self) -> Result<Vec<ImageRecord>, StoreError> {
        self.simulate_latency().await;
        self.images()
    }

    async fn remove_image(&self, image_id: &ImageId) -> Result<ImageRecord, StoreError> {
        self.simulate_latency().await;
        let mut images = self.images()?;
        let index = images
            .iter()
            .position(|img| img.id == *image_id)
            .ok_or_else(|| StoreError::ImageNotFound(image_id.clone()))?;

        let removed = images.remove(index);
        self.write(IMAGES_KEY, &images)?;
        self.backend.remove(&annotations_key(image_id))?;
        log::trace!("Mock store: removed image {}", image_id);
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MemoryBackend;
    use crate::model::Rect;
    use pollster::block_on;

    fn store_with_image() -> (MockStore<MemoryBackend>, ImageId) {
        let store = MockStore::new(MemoryBackend::new());
        let image = block_on(store.add_image("a".into(), "a.png".into(), 800, 600)).unwrap();
        (store, image.id)
    }

    fn draft(label: &str) -> NewAnnotation {
        NewAnnotation::new(Rect::new(10.0, 10.0, 40.0, 40.0), label)
    }

    #[test]
    fn test_create_assigns_distinct_ids() {
        let (store, image) = store_with_image();
        let a = block_on(store.create_annotation(&image, draft("A"))).unwrap();
        let b = block_on(store.create_annotation(&image, draft("B"))).unwrap();

        assert_ne!(a.id, b.id);
        assert_eq!(a.image_id, image);
        assert_eq!(a.created_at, a.updated_at);

        let listed = block_on(store.list_annotations(&image)).unwrap();
        assert_eq!(listed, vec![a, b]);
    }

    #[test]
    fn test_unknown_image_is_not_found() {
        let store = MockStore::new(MemoryBackend::new());
        let missing = ImageId::new("img-404");
        let err = block_on(store.create_annotation(&missing, draft("A"))).unwrap_err();
        assert!(matches!(err, StoreError::ImageNotFound(ref id) if *id == missing));
        assert!(block_on(store.list_annotations(&missing)).is_err());
    }

    #[test]
    fn test_update_and_delete_unknown_annotation() {
        let (store, image) = store_with_image();
        let ghost = AnnotationId::new("ann-ghost");

        let err = block_on(store.update_annotation(&image, &ghost, AnnotationPatch::label("x")))
            .unwrap_err();
        assert!(matches!(err, StoreError::AnnotationNotFound { .. }));

        let err = block_on(store.delete_annotation(&image, &ghost)).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_update_changes_label_only() {
        let (store, image) = store_with_image();
        let a = block_on(store.create_annotation(&image, draft("A"))).unwrap();
        let updated =
            block_on(store.update_annotation(&image, &a.id, AnnotationPatch::label("renamed")))
                .unwrap();

        assert_eq!(updated.id, a.id);
        assert_eq!(updated.label, "renamed");
        assert_eq!(updated.rect, a.rect);
        assert_eq!(updated.created_at, a.created_at);
        assert_eq!(block_on(store.list_annotations(&image)).unwrap()[0].label, "renamed");
    }

    #[test]
    fn test_delete_leaves_others() {
        let (store, image) = store_with_image();
        let a = block_on(store.create_annotation(&image, draft("A"))).unwrap();
        let b = block_on(store.create_annotation(&image, draft("B"))).unwrap();

        block_on(store.delete_annotation(&image, &a.id)).unwrap();
        assert_eq!(block_on(store.list_annotations(&image)).unwrap(), vec![b]);
    }

    #[test]
    fn test_remove_image_drops_annotations() {
        let (store, image) = store_with_image();
        block_on(store.create_annotation(&image, draft("A"))).unwrap();

        block_on(store.remove_image(&image)).unwrap();
        assert!(block_on(store.list_images()).unwrap().is_empty());
        assert!(store.backend().get(&annotations_key(&image)).unwrap().is_none());
    }

    #[test]
    fn test_image_ids_are_not_reused() {
        let store = MockStore::new(MemoryBackend::new());
        let first = block_on(store.add_image("a".into(), "a".into(), 1, 1)).unwrap();
        block_on(store.remove_image(&first.id)).unwrap();
        let second = block_on(store.add_image("b".into(), "b".into(), 1, 1)).unwrap();
        assert_ne!(first.id, second.id);
    }

    #[test]
    fn test_offline_backend_is_unavailable() {
        let (store, image) = store_with_image();
        store.backend().set_offline(true);
        let err = block_on(store.create_annotation(&image, draft("A"))).unwrap_err();
        assert!(matches!(err, StoreError::Unavailable(_)));
    }

    #[test]
    fn test_create_rejects_degenerate_input() {
        let (store, image) = store_with_image();
        for rect in [
            Rect::new(10.0, 10.0, 0.0, 40.0),
            Rect::new(10.0, 10.0, 40.0, 0.0),
            Rect::new(10.0, 10.0, -5.0, 40.0),
        ] {
            let err = block_on(store.create_annotation(&image, NewAnnotation::new(rect, "A")))
                .unwrap_err();
            assert!(matches!(err, StoreError::InvalidAnnotation(_)));
        }
        let err = block_on(store.create_annotation(&image, draft("  "))).unwrap_err();
        assert!(matches!(err, StoreError::InvalidAnnotation(_)));
        assert!(block_on(store.list_annotations(&image)).unwrap().is_empty());
    }

    #[test]
    fn test_update_rejects_empty_label() {
        let (store, image) = store_with_image();
        let a = block_on(store.create_annotation(&image, draft("A"))).unwrap();
        let err = block_on(store.update_annotation(&image, &a.id, AnnotationPatch::label("")))
            .unwrap_err();
        assert!(matches!(err, StoreError::InvalidAnnotation(_)));
        assert_eq!(block_on(store.list_annotations(&image)).unwrap(), vec![a]);
    }

    #[test]
    fn test_queued_latency_orders_completions() {
        let (store, image) = store_with_image();
        store.queue_latency(3);
        store.queue_latency(0);

        let (slow, fast) = block_on(async {
            futures::join!(
                store.create_annotation(&image, draft("slow")),
                store.create_annotation(&image, draft("fast"))
            )
        });
        let (slow, fast) = (slow.unwrap(), fast.unwrap());

        // The second request overtook the first.
        let listed = block_on(store.list_annotations(&image)).unwrap();
        assert_eq!(listed, vec![fast, slow]);
    }

    #[test]
    fn test_latency_applies_to_every_call() {
        let store = MockStore::new(MemoryBackend::new()).with_latency(2);
        let image = block_on(store.add_image("a".into(), "a.png".into(), 10, 10)).unwrap();
        let a = block_on(store.create_annotation(&image.id, draft("A"))).unwrap();
        assert_eq!(block_on(store.list_annotations(&image.id)).unwrap(), vec![a]);
    }
}
