//! Browser bindings.
//!
//! The JavaScript view layer measures the image, forwards pointer events in
//! viewport coordinates, and draws whatever [`WebAnnotator::render`]
//! returns. Everything crosses the boundary as JSON strings.

use std::rc::Rc;

use js_sys::Promise;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::future_to_promise;

use crate::config::AppConfig;
use crate::editor::ImageAnnotator;
use crate::events::EventBus;
use crate::geometry::ImageLayout;
use crate::message::Key;
use crate::store::{AnnotationId, ImageCatalog, ImageId, LocalStorageBackend, MockStore, Point};
use crate::upload::Uploader;

type Store = MockStore<LocalStorageBackend>;

fn to_js<E: std::fmt::Display>(err: E) -> JsValue {
    JsValue::from_str(&err.to_string())
}

fn json<T: serde::Serialize>(value: &T) -> Result<JsValue, JsValue> {
    serde_json::to_string(value)
        .map(|s| JsValue::from_str(&s))
        .map_err(to_js)
}

fn open_store() -> Result<Rc<Store>, JsValue> {
    let backend = LocalStorageBackend::open().map_err(to_js)?;
    Ok(Rc::new(MockStore::new(backend)))
}

fn load_config() -> AppConfig {
    match AppConfig::load_from_local_storage() {
        Ok(config) => config.unwrap_or_default(),
        Err(e) => {
            log::warn!("Ignoring stored configuration, using defaults: {}", e);
            AppConfig::default()
        }
    }
}

#[wasm_bindgen(start)]
pub fn start() {
    console_error_panic_hook::set_once();

    // Warnings from loading the configuration must reach the console
    // before its own level applies.
    if let Err(e) = console_log::init_with_level(log::Level::Trace) {
        web_sys::console::log_1(&format!("Logger already initialised: {}", e).into());
    }
    log::set_max_level(log::LevelFilter::Warn);
    let config = load_config();
    log::set_max_level(config.preferences.log_level.to_level_filter());
    log::info!("imgmark starting");
}

/// Validate and store a configuration JSON document.
#[wasm_bindgen]
pub fn save_config(json: &str) -> Result<(), JsValue> {
    let config = AppConfig::from_json(json).map_err(to_js)?;
    config.save_to_local_storage().map_err(to_js)?;
    log::set_max_level(config.preferences.log_level.to_level_filter());
    Ok(())
}

/// The configuration in effect, as JSON.
#[wasm_bindgen]
pub fn current_config() -> Result<String, JsValue> {
    load_config().to_json().map_err(to_js)
}

/// Register an encoded image. Resolves to the image record as JSON.
#[wasm_bindgen]
pub fn upload_image(filename: String, url: String, bytes: Vec<u8>) -> Promise {
    future_to_promise(async move {
        let uploader = Uploader::new(open_store()?, EventBus::new());
        let record = uploader
            .upload_bytes(&filename, url, &bytes)
            .await
            .map_err(to_js)?;
        json(&record)
    })
}

/// Resolves to all image records as JSON.
#[wasm_bindgen]
pub fn list_images() -> Promise {
    future_to_promise(async move {
        let images = open_store()?.list_images().await.map_err(to_js)?;
        json(&images)
    })
}

/// Resolves to a [`WebAnnotator`] for the image.
#[wasm_bindgen]
pub fn open_annotator(image_id: String) -> Promise {
    future_to_promise(async move {
        let config = load_config();
        let editor = ImageAnnotator::open(open_store()?, ImageId::new(image_id), &config.editor)
            .await
            .map_err(to_js)?;
        Ok(WebAnnotator {
            editor: Rc::new(editor),
        }
        .into())
    })
}

/// An [`ImageAnnotator`] over localStorage.
#[wasm_bindgen]
pub struct WebAnnotator {
    editor: Rc<ImageAnnotator<Store>>,
}

#[wasm_bindgen]
impl WebAnnotator {
    pub fn image_id(&self) -> String {
        self.editor.image_id().to_string()
    }

    /// The image's bounding box and natural size changed.
    pub fn set_layout(
        &self,
        left: f32,
        top: f32,
        displayed_width: f32,
        displayed_height: f32,
        natural_width: f32,
        natural_height: f32,
    ) {
        self.editor.set_layout(Some(ImageLayout::new(
            left,
            top,
            displayed_width,
            displayed_height,
            natural_width,
            natural_height,
        )));
    }

    pub fn clear_layout(&self) {
        self.editor.set_layout(None);
    }

    pub fn set_read_only(&self, read_only: bool) {
        self.editor.set_read_only(read_only);
    }

    pub fn pointer_down(&self, x: f32, y: f32) {
        self.editor.pointer_down(Point::new(x, y));
    }

    pub fn pointer_move(&self, x: f32, y: f32) {
        self.editor.pointer_move(Point::new(x, y));
    }

    /// Returns true when the drag produced a draft waiting for a label.
    pub fn pointer_up(&self, x: f32, y: f32) -> bool {
        matches!(
            self.editor.pointer_up(Point::new(x, y)),
            crate::draft::DraftOutcome::AwaitingLabel(_)
        )
    }

    pub fn set_label(&self, label: &str) -> bool {
        self.editor.set_label(label)
    }

    pub fn cancel_label(&self) -> bool {
        self.editor.cancel_label()
    }

    /// Forward a key press from the label prompt, named as in
    /// `KeyboardEvent.key`. Resolves to true when the key confirmed or
    /// cancelled the draft.
    pub fn label_key(&self, key: &str) -> Promise {
        let editor = self.editor.clone();
        let message = editor.label_key(Key::from_name(key));
        future_to_promise(async move {
            match message {
                Some(message) => {
                    editor.handle(message).await.map_err(to_js)?;
                    Ok(JsValue::TRUE)
                }
                None => Ok(JsValue::FALSE),
            }
        })
    }

    /// Save the pending draft. Resolves to the saved annotation as JSON.
    pub fn confirm_label(&self) -> Promise {
        let editor = self.editor.clone();
        future_to_promise(async move {
            let saved = editor.confirm_label().await.map_err(to_js)?;
            json(&saved)
        })
    }

    pub fn update_label(&self, annotation_id: String, label: String) -> Promise {
        let editor = self.editor.clone();
        future_to_promise(async move {
            let updated = editor
                .update_label(&AnnotationId::new(annotation_id), &label)
                .await
                .map_err(to_js)?;
            json(&updated)
        })
    }

    pub fn delete(&self, annotation_id: String) -> Promise {
        let editor = self.editor.clone();
        future_to_promise(async move {
            editor
                .delete(&AnnotationId::new(annotation_id))
                .await
                .map_err(to_js)?;
            Ok(JsValue::UNDEFINED)
        })
    }

    /// Resolves to true when the list changed.
    pub fn reload(&self) -> Promise {
        let editor = self.editor.clone();
        future_to_promise(async move {
            let changed = editor.reload().await.map_err(to_js)?;
            Ok(JsValue::from_bool(changed))
        })
    }

    /// Current overlay frame as JSON.
    pub fn render(&self) -> Result<String, JsValue> {
        serde_json::to_string(&self.editor.render()).map_err(to_js)
    }

    /// Active notifications as JSON.
    pub fn notifications(&self) -> Result<String, JsValue> {
        let notes: Vec<_> = self
            .editor
            .notifications()
            .into_iter()
            .map(|n| serde_json::json!({ "id": n.id, "kind": n.kind, "message": n.message }))
            .collect();
        serde_json::to_string(&notes).map_err(to_js)
    }

    pub fn dismiss_notification(&self, id: u64) -> bool {
        self.editor.dismiss_notification(id)
    }

    /// Register a JavaScript callback receiving `(imageId, annotationsJson)`.
    pub fn on_change(&self, callback: js_sys::Function) {
        self.editor.on_change(move |image_id, list| {
            let payload = serde_json::to_string(list).unwrap_or_else(|_| "[]".to_string());
            if let Err(e) = callback.call2(
                &JsValue::NULL,
                &JsValue::from_str(image_id.as_str()),
                &JsValue::from_str(&payload),
            ) {
                log::error!("Change callback failed: {:?}", e);
            }
        });
    }
}
