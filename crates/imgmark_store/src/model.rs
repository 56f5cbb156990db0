//! Annotation and image records shared between the store and the editor.
//!
//! All geometry is in intrinsic image pixels: coordinates relative to the
//! image's natural resolution, independent of how large it is displayed.

use std::fmt;

use serde::{Deserialize, Serialize};
use web_time::{SystemTime, UNIX_EPOCH};

/// Identifier of an uploaded image.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ImageId(String);

impl ImageId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ImageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Opaque annotation identifier assigned by the store.
///
/// Ids carry no ordering; callers must only compare them for equality.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnnotationId(String);

impl AnnotationId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AnnotationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A 2D point.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// An axis-aligned rectangle with its top-left corner at `(x, y)`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Zero-size rectangle at a point.
    pub fn at(point: Point) -> Self {
        Self::new(point.x, point.y, 0.0, 0.0)
    }

    /// Bounding box of two corners, normalized to non-negative extents
    /// whichever corner the drag started from.
    pub fn from_corners(a: Point, b: Point) -> Self {
        Self {
            x: a.x.min(b.x),
            y: a.y.min(b.y),
            width: (b.x - a.x).abs(),
            height: (b.y - a.y).abs(),
        }
    }

    /// Both extents strictly greater than the given minimums.
    pub fn exceeds(&self, min_width: f32, min_height: f32) -> bool {
        self.width > min_width && self.height > min_height
    }
}

/// A rectangle and label submitted for persistence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewAnnotation {
    #[serde(flatten)]
    pub rect: Rect,
    pub label: String,
}

impl NewAnnotation {
    pub fn new(rect: Rect, label: impl Into<String>) -> Self {
        Self {
            rect,
            label: label.into(),
        }
    }
}

/// Partial update of an annotation. Only the label is editable.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AnnotationPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl AnnotationPatch {
    pub fn label(label: impl Into<String>) -> Self {
        Self {
            label: Some(label.into()),
        }
    }
}

/// A persisted, labeled rectangle on one image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Annotation {
    pub id: AnnotationId,
    pub image_id: ImageId,
    #[serde(flatten)]
    pub rect: Rect,
    pub label: String,
    /// Milliseconds since the UNIX epoch.
    pub created_at: u64,
    /// Milliseconds since the UNIX epoch.
    pub updated_at: u64,
}

impl Annotation {
    /// Apply a patch, refreshing `updated_at` when anything changed.
    pub fn apply(&mut self, patch: &AnnotationPatch, now: u64) -> bool {
        let mut changed = false;
        if let Some(label) = &patch.label {
            if *label != self.label {
                self.label = label.clone();
                changed = true;
            }
        }
        if changed {
            self.updated_at = now;
        }
        changed
    }
}

/// An uploaded image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageRecord {
    pub id: ImageId,
    pub title: String,
    /// Where the browser or a viewer loads the bitmap from.
    pub url: String,
    pub natural_width: u32,
    pub natural_height: u32,
    pub uploaded_at: u64,
}

/// Current wall-clock time in milliseconds since the UNIX epoch.
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
