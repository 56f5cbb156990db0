//! Registering uploaded images.

use std::rc::Rc;

use imgmark_store::{ImageCatalog, ImageId, ImageRecord, StoreError};
use thiserror::Error;

use crate::events::{AppEvent, EventBus};

/// Supported image file extensions.
pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "bmp", "webp"];

/// Check if a filename has a supported image extension.
/// Works with both full paths and bare names.
pub fn is_image_filename(name: &str) -> bool {
    let lower = name.to_lowercase();
    IMAGE_EXTENSIONS
        .iter()
        .any(|ext| lower.ends_with(&format!(".{}", ext)))
}

/// Errors that can occur while uploading an image.
#[derive(Error, Debug)]
pub enum UploadError {
    #[error("Unsupported image format: {0}")]
    UnsupportedFormat(String),

    #[error("Failed to decode image: {0}")]
    Decode(#[from] image::ImageError),

    #[error("Image has no pixels")]
    EmptyImage,

    #[error("Storage error: {0}")]
    Store(#[from] StoreError),
}

/// Natural size of an encoded image.
pub fn dimensions_from_bytes(bytes: &[u8]) -> Result<(u32, u32), UploadError> {
    let img = image::load_from_memory(bytes)?;
    Ok((img.width(), img.height()))
}

/// Natural size of an image file, read from its header.
#[cfg(not(target_arch = "wasm32"))]
pub fn dimensions_from_path(path: &std::path::Path) -> Result<(u32, u32), UploadError> {
    Ok(image::image_dimensions(path)?)
}

/// Adds images to a catalog and announces them on the bus.
pub struct Uploader<S> {
    catalog: Rc<S>,
    bus: EventBus,
}

impl<S: ImageCatalog> Uploader<S> {
    pub fn new(catalog: Rc<S>, bus: EventBus) -> Self {
        Self { catalog, bus }
    }

    /// Register an encoded image. `url` is where a view can load it from.
    pub async fn upload_bytes(
        &self,
        filename: &str,
        url: String,
        bytes: &[u8],
    ) -> Result<ImageRecord, UploadError> {
        if !is_image_filename(filename) {
            return Err(UploadError::UnsupportedFormat(filename.to_string()));
        }
        let (width, height) = dimensions_from_bytes(bytes)?;
        self.register(filename, url, width, height).await
    }

    /// Register an image file by path.
    #[cfg(not(target_arch = "wasm32"))]
    pub async fn upload_path(&self, path: &std::path::Path) -> Result<ImageRecord, UploadError> {
        let filename = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        if !is_image_filename(&filename) {
            return Err(UploadError::UnsupportedFormat(path.display().to_string()));
        }
        let (width, height) = dimensions_from_path(path)?;
        let url = path
            .canonicalize()
            .unwrap_or_else(|_| path.to_path_buf())
            .display()
            .to_string();
        self.register(&filename, url, width, height).await
    }

    async fn register(
        &self,
        filename: &str,
        url: String,
        width: u32,
        height: u32,
    ) -> Result<ImageRecord, UploadError> {
        if width == 0 || height == 0 {
            return Err(UploadError::EmptyImage);
        }
        let record = self
            .catalog
            .add_image(filename.to_string(), url, width, height)
            .await?;
        log::info!(
            "Uploaded {} as {} ({}x{})",
            filename,
            record.id,
            width,
            height
        );
        self.bus.publish(&AppEvent::ImageUploaded(record.clone()));
        Ok(record)
    }

    /// Remove an image and its annotations.
    pub async fn delete(&self, image_id: &ImageId) -> Result<ImageRecord, UploadError> {
        let removed = self.catalog.remove_image(image_id).await?;
        log::info!("Deleted image {}", image_id);
        self.bus.publish(&AppEvent::ImageDeleted(image_id.clone()));
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::io::Cursor;

    use imgmark_store::{MemoryBackend, MockStore};
    use pollster::block_on;

    use super::*;

    fn png(width: u32, height: u32) -> Vec<u8> {
        let img = image::RgbaImage::new(width, height);
        let mut bytes = Cursor::new(Vec::new());
        img.write_to(&mut bytes, image::ImageFormat::Png).unwrap();
        bytes.into_inner()
    }

    #[test]
    fn test_extensions() {
        assert!(is_image_filename("photo.PNG"));
        assert!(is_image_filename("/tmp/a/b.webp"));
        assert!(!is_image_filename("notes.txt"));
        assert!(!is_image_filename("png"));
    }

    #[test]
    fn test_upload_bytes_reads_dimensions_and_publishes() {
        let store = Rc::new(MockStore::new(MemoryBackend::new()));
        let bus = EventBus::new();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        let _sub = bus.subscribe(move |event| sink.borrow_mut().push(event.clone()));

        let uploader = Uploader::new(store.clone(), bus);
        let record = block_on(uploader.upload_bytes("cat.png", "blob:cat".into(), &png(32, 24)))
            .unwrap();

        assert_eq!((record.natural_width, record.natural_height), (32, 24));
        assert_eq!(record.title, "cat.png");
        assert_eq!(*seen.borrow(), vec![AppEvent::ImageUploaded(record.clone())]);
        assert_eq!(block_on(store.get_image(&record.id)).unwrap(), record);
    }

    #[test]
    fn test_rejects_bad_input() {
        let store = Rc::new(MockStore::new(MemoryBackend::new()));
        let uploader = Uploader::new(store, EventBus::new());

        let err = block_on(uploader.upload_bytes("cat.txt", String::new(), &png(4, 4))).unwrap_err();
        assert!(matches!(err, UploadError::UnsupportedFormat(_)));

        let err = block_on(uploader.upload_bytes("cat.png", String::new(), b"not a png")).unwrap_err();
        assert!(matches!(err, UploadError::Decode(_)));
    }

    #[test]
    fn test_upload_path_and_delete() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dog.png");
        std::fs::write(&path, png(40, 30)).unwrap();

        let store = Rc::new(MockStore::new(MemoryBackend::new()));
        let bus = EventBus::new();
        let deleted = Rc::new(RefCell::new(None));
        let sink = deleted.clone();
        let _sub = bus.subscribe(move |event| {
            if let AppEvent::ImageDeleted(id) = event {
                *sink.borrow_mut() = Some(id.clone());
            }
        });
        let uploader = Uploader::new(store.clone(), bus);

        let record = block_on(uploader.upload_path(&path)).unwrap();
        assert_eq!((record.natural_width, record.natural_height), (40, 30));

        block_on(uploader.delete(&record.id)).unwrap();
        assert_eq!(*deleted.borrow(), Some(record.id.clone()));
        assert!(block_on(store.list_images()).unwrap().is_empty());
    }
}
