//! Render model for the annotation overlay.
//!
//! Produces everything a front end needs to draw: persisted boxes in
//! displayed pixels, the live draft, and an empty-state prompt. User
//! intents are handed back as [`ListIntent`]s for the editor to dispatch.

use imgmark_store::{Annotation, AnnotationId, Rect};
use serde::Serialize;

use crate::geometry::ImageLayout;

/// One persisted annotation, positioned relative to the image's top-left.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderedBox {
    pub id: AnnotationId,
    pub label: String,
    pub rect: Rect,
    /// Edit and delete controls are shown.
    pub controls: bool,
}

/// The rectangle being drawn.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DraftBox {
    pub rect: Rect,
    /// The drag is over and a label is being asked for.
    pub awaiting_label: bool,
}

/// Prompt shown when there is nothing to draw.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmptyPrompt {
    pub title: &'static str,
    pub hint: &'static str,
}

const EDITABLE_PROMPT: EmptyPrompt = EmptyPrompt {
    title: "Start Annotating",
    hint: "Click and drag to create rectangular annotations",
};

const READ_ONLY_PROMPT: EmptyPrompt = EmptyPrompt {
    title: "No annotations",
    hint: "This image has no annotations yet",
};

/// A complete frame of the overlay.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderedList {
    pub boxes: Vec<RenderedBox>,
    pub draft: Option<DraftBox>,
    pub empty: Option<EmptyPrompt>,
    pub read_only: bool,
}

impl RenderedList {
    pub fn ids(&self) -> Vec<&AnnotationId> {
        self.boxes.iter().map(|b| &b.id).collect()
    }
}

/// Something the user asked for on a rendered box.
#[derive(Debug, Clone, PartialEq)]
pub enum ListIntent {
    EditRequested { id: AnnotationId, label: String },
    DeleteRequested(AnnotationId),
}

/// Stateless overlay renderer.
#[derive(Debug, Clone, Copy, Default)]
pub struct ListView {
    read_only: bool,
}

impl ListView {
    pub fn new(read_only: bool) -> Self {
        Self { read_only }
    }

    pub fn read_only(&self) -> bool {
        self.read_only
    }

    /// Build a frame.
    ///
    /// `annotations` must already be de-duplicated. Without a measured
    /// layout, intrinsic coordinates are passed through unscaled.
    pub fn render(
        &self,
        layout: Option<&ImageLayout>,
        annotations: &[&Annotation],
        draft: Option<DraftBox>,
    ) -> RenderedList {
        let to_display = |rect: Rect| match layout {
            Some(layout) if layout.is_measured() => layout.rect_to_display(rect),
            _ => rect,
        };

        let boxes = annotations
            .iter()
            .map(|a| RenderedBox {
                id: a.id.clone(),
                label: a.label.clone(),
                rect: to_display(a.rect),
                controls: !self.read_only,
            })
            .collect::<Vec<_>>();

        let draft = draft.map(|d| DraftBox {
            rect: to_display(d.rect),
            awaiting_label: d.awaiting_label,
        });

        let empty = if boxes.is_empty() && draft.is_none() {
            Some(if self.read_only {
                READ_ONLY_PROMPT
            } else {
                EDITABLE_PROMPT
            })
        } else {
            None
        };

        RenderedList {
            boxes,
            draft,
            empty,
            read_only: self.read_only,
        }
    }

    /// Translate an edit click into an intent; None in read-only mode.
    pub fn edit(&self, id: AnnotationId, label: impl Into<String>) -> Option<ListIntent> {
        (!self.read_only).then(|| ListIntent::EditRequested {
            id,
            label: label.into(),
        })
    }

    /// Translate a delete click into an intent; None in read-only mode.
    pub fn delete(&self, id: AnnotationId) -> Option<ListIntent> {
        (!self.read_only).then_some(ListIntent::DeleteRequested(id))
    }
}

#[cfg(test)]
mod tests {
    use imgmark_store::ImageId;

    use super::*;

    fn ann(id: &str, rect: Rect) -> Annotation {
        Annotation {
            id: AnnotationId::new(id),
            image_id: ImageId::new("img-1"),
            rect,
            label: id.to_uppercase(),
            created_at: 0,
            updated_at: 0,
        }
    }

    #[test]
    fn test_empty_list_shows_prompt() {
        let frame = ListView::new(false).render(None, &[], None);
        assert!(frame.boxes.is_empty());
        assert_eq!(frame.empty.as_ref().map(|p| p.title), Some("Start Annotating"));

        let frame = ListView::new(true).render(None, &[], None);
        assert_eq!(frame.empty.as_ref().map(|p| p.title), Some("No annotations"));
    }

    #[test]
    fn test_draft_hides_prompt() {
        let draft = DraftBox {
            rect: Rect::new(0.0, 0.0, 4.0, 4.0),
            awaiting_label: false,
        };
        let frame = ListView::new(false).render(None, &[], Some(draft));
        assert!(frame.empty.is_none());
        assert!(frame.draft.is_some());
    }

    #[test]
    fn test_boxes_are_scaled_to_display() {
        let layout = ImageLayout::new(0.0, 0.0, 400.0, 300.0, 800.0, 600.0);
        let a = ann("a", Rect::new(200.0, 200.0, 100.0, 80.0));
        let frame = ListView::new(false).render(Some(&layout), &[&a], None);

        assert_eq!(frame.boxes[0].rect, Rect::new(100.0, 100.0, 50.0, 40.0));
        assert_eq!(frame.boxes[0].label, "A");
        assert!(frame.boxes[0].controls);
    }

    #[test]
    fn test_read_only_hides_controls_and_intents() {
        let view = ListView::new(true);
        let a = ann("a", Rect::new(0.0, 0.0, 30.0, 30.0));
        let frame = view.render(None, &[&a], None);
        assert_eq!(frame.boxes.len(), 1);
        assert!(!frame.boxes[0].controls);

        assert!(view.delete(AnnotationId::new("a")).is_none());
        assert!(view.edit(AnnotationId::new("a"), "x").is_none());
        assert_eq!(
            ListView::new(false).delete(AnnotationId::new("a")),
            Some(ListIntent::DeleteRequested(AnnotationId::new("a")))
        );
    }
}
