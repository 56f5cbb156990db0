//! imgmark - Image Rectangle Annotation Editor
//!
//! The editing core of a browser-first image labelling tool: drawing
//! rectangles over a scaled image, labelling them, and keeping the local
//! list consistent with an asynchronous store. Rendering is left to the
//! front end; see [`view::RenderedList`].

pub mod config;
pub mod constants;
pub mod draft;
pub mod editor;
pub mod error;
pub mod events;
pub mod gallery;
pub mod geometry;
pub mod message;
pub mod notify;
pub mod sync;
pub mod upload;
pub mod view;

pub use config::{AppConfig, ConfigError, EditorConfig, LogLevel};
pub use draft::{DraftOutcome, DraftState, DraftTracker};
pub use editor::ImageAnnotator;
pub use error::{Action, EditorError, ValidationError};
pub use events::{AppEvent, EventBus, Subscription};
pub use geometry::ImageLayout;
pub use message::Message;
pub use notify::{Notification, NotificationKind, Notifications};
pub use view::{ListIntent, ListView, RenderedList};

pub use imgmark_store as store;

// WASM entry point
#[cfg(target_arch = "wasm32")]
mod wasm;

#[cfg(target_arch = "wasm32")]
pub use wasm::*;
