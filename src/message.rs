//! Editor message types.
//!
//! Every input the annotation editor reacts to is a message, so a front end
//! only needs to translate its native events and call
//! [`ImageAnnotator::handle`](crate::editor::ImageAnnotator::handle).

use imgmark_store::{Annotation, Point};

use crate::geometry::ImageLayout;
use crate::notify::NotificationId;
use crate::view::ListIntent;

/// Messages that can be sent to the editor.
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    // Image
    /// The rendered image was measured or resized
    LayoutChanged(Option<ImageLayout>),

    // Pointer (viewport coordinates)
    /// Primary button pressed over the image
    PointerDown(Point),
    /// Pointer moved over the image
    PointerMove(Point),
    /// Primary button released
    PointerUp(Point),

    // Label prompt
    /// Label input text changed
    LabelChanged(String),
    /// Save the pending draft with the current label
    ConfirmLabel,
    /// Discard the pending draft
    CancelLabel,

    // Annotation list
    /// Edit or delete clicked on a rendered annotation
    Intent(ListIntent),

    // Synchronisation
    /// Fetch the authoritative list from the store
    Reload,
    /// The owner pushed a new authoritative list
    Resync(Vec<Annotation>),

    // Notifications
    /// A notification was closed
    DismissNotification(NotificationId),
}

/// Keys the label prompt reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Enter,
    Escape,
    Other,
}

impl Key {
    /// Map a DOM `KeyboardEvent.key` value.
    pub fn from_name(name: &str) -> Self {
        match name {
            "Enter" => Key::Enter,
            "Escape" | "Esc" => Key::Escape,
            _ => Key::Other,
        }
    }
}

/// Translate a key press in the label prompt into a message.
///
/// Enter only confirms when there is a non-blank label to save.
pub fn label_prompt_key(key: Key, label: &str) -> Option<Message> {
    match key {
        Key::Enter if !label.trim().is_empty() => Some(Message::ConfirmLabel),
        Key::Escape => Some(Message::CancelLabel),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_prompt_keys() {
        assert_eq!(label_prompt_key(Key::Enter, "car"), Some(Message::ConfirmLabel));
        assert_eq!(label_prompt_key(Key::Enter, "  "), None);
        assert_eq!(label_prompt_key(Key::Escape, ""), Some(Message::CancelLabel));
        assert_eq!(label_prompt_key(Key::Other, "car"), None);
    }

    #[test]
    fn test_key_from_dom_name() {
        assert_eq!(Key::from_name("Enter"), Key::Enter);
        assert_eq!(Key::from_name("Escape"), Key::Escape);
        assert_eq!(Key::from_name("Esc"), Key::Escape);
        assert_eq!(Key::from_name("a"), Key::Other);
    }
}
