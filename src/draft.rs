//! Draft rectangle tracking for the drag gesture.
//!
//! ```text
//!  Idle --down--> Dragging --up (large)--> PendingLabel --saved--> Idle
//!   ^               |  ^ move                |  cancel / down
//!   +---up (small)--+  +---------+           +------------------> Idle
//! ```
//!
//! All points are already in intrinsic pixels; see [`crate::geometry`].

use imgmark_store::{NewAnnotation, Point, Rect};

use crate::constants::{MIN_DRAFT_HEIGHT, MIN_DRAFT_WIDTH};
use crate::error::ValidationError;

/// Where the current gesture is.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum DraftState {
    /// Nothing being drawn.
    #[default]
    Idle,
    /// Pointer held down; `rect` spans the anchor and the latest position.
    Dragging { anchor: Point, rect: Rect },
    /// Drag finished and large enough; waiting for the user's label.
    PendingLabel {
        rect: Rect,
        label: String,
        /// A create request for this draft is in flight.
        saving: bool,
    },
}

/// What a pointer event did to the draft.
#[derive(Debug, Clone, PartialEq)]
pub enum DraftOutcome {
    /// The event had no effect in the current state.
    Ignored,
    /// A new drag began at this point.
    Started(Point),
    /// The draft was resized.
    Updated(Rect),
    /// The drag ended with a rectangle large enough to label.
    AwaitingLabel(Rect),
    /// The drag ended below the minimum size and was discarded.
    TooSmall(Rect),
}

/// A validated draft handed out for persistence.
///
/// The ticket ties the eventual completion back to the draft it came from,
/// so a late completion cannot clear a newer draft.
#[derive(Debug, Clone, PartialEq)]
pub struct Submission {
    pub ticket: u64,
    pub annotation: NewAnnotation,
}

/// Tracks one in-progress rectangle at a time.
#[derive(Debug, Clone)]
pub struct DraftTracker {
    state: DraftState,
    min_width: f32,
    min_height: f32,
    read_only: bool,
    /// Bumped whenever a draft is started or thrown away.
    generation: u64,
}

impl Default for DraftTracker {
    fn default() -> Self {
        Self::new(MIN_DRAFT_WIDTH, MIN_DRAFT_HEIGHT)
    }
}

impl DraftTracker {
    /// Create a tracker that only promotes rectangles strictly larger than
    /// `min_width` x `min_height`.
    pub fn new(min_width: f32, min_height: f32) -> Self {
        Self {
            state: DraftState::Idle,
            min_width,
            min_height,
            read_only: false,
            generation: 0,
        }
    }

    pub fn with_read_only(mut self, read_only: bool) -> Self {
        self.read_only = read_only;
        self
    }

    pub fn set_read_only(&mut self, read_only: bool) {
        self.read_only = read_only;
        if read_only && !self.is_saving() {
            self.state = DraftState::Idle;
        }
    }

    /// Drop any draft, including one being saved. Completions for it will
    /// be ignored.
    pub fn reset(&mut self) {
        self.generation += 1;
        self.state = DraftState::Idle;
    }

    pub fn state(&self) -> &DraftState {
        &self.state
    }

    pub fn min_size(&self) -> (f32, f32) {
        (self.min_width, self.min_height)
    }

    /// Pointer held down and moving.
    pub fn is_dragging(&self) -> bool {
        matches!(self.state, DraftState::Dragging { .. })
    }

    pub fn is_pending_label(&self) -> bool {
        matches!(self.state, DraftState::PendingLabel { .. })
    }

    pub fn is_saving(&self) -> bool {
        matches!(self.state, DraftState::PendingLabel { saving: true, .. })
    }

    /// The rectangle being drawn or awaiting a label.
    pub fn draft_rect(&self) -> Option<Rect> {
        match &self.state {
            DraftState::Idle => None,
            DraftState::Dragging { rect, .. } | DraftState::PendingLabel { rect, .. } => {
                Some(*rect)
            }
        }
    }

    /// Current label text while waiting for one.
    pub fn label(&self) -> Option<&str> {
        match &self.state {
            DraftState::PendingLabel { label, .. } => Some(label),
            _ => None,
        }
    }

    pub fn pointer_down(&mut self, point: Point) -> DraftOutcome {
        if self.read_only || self.is_saving() {
            return DraftOutcome::Ignored;
        }
        if self.is_pending_label() {
            // Clicking outside the label prompt dismisses it.
            log::debug!("Draft: pending label discarded by new gesture");
        }
        self.generation += 1;
        self.state = DraftState::Dragging {
            anchor: point,
            rect: Rect::at(point),
        };
        log::trace!("Draft: drag started at ({}, {})", point.x, point.y);
        DraftOutcome::Started(point)
    }

    pub fn pointer_move(&mut self, point: Point) -> DraftOutcome {
        if self.read_only {
            return DraftOutcome::Ignored;
        }
        match &mut self.state {
            DraftState::Dragging { anchor, rect } => {
                *rect = Rect::from_corners(*anchor, point);
                DraftOutcome::Updated(*rect)
            }
            _ => DraftOutcome::Ignored,
        }
    }

    /// Finish the drag at `point`.
    pub fn pointer_up(&mut self, point: Point) -> DraftOutcome {
        if self.read_only {
            return DraftOutcome::Ignored;
        }
        let DraftState::Dragging { anchor, .. } = self.state else {
            return DraftOutcome::Ignored;
        };

        let rect = Rect::from_corners(anchor, point);
        if rect.exceeds(self.min_width, self.min_height) {
            log::debug!(
                "Draft: {}x{} at ({}, {}) awaiting label",
                rect.width,
                rect.height,
                rect.x,
                rect.y
            );
            self.state = DraftState::PendingLabel {
                rect,
                label: String::new(),
                saving: false,
            };
            DraftOutcome::AwaitingLabel(rect)
        } else {
            log::debug!("Draft: {}x{} too small, discarded", rect.width, rect.height);
            self.state = DraftState::Idle;
            DraftOutcome::TooSmall(rect)
        }
    }

    /// Replace the label being typed. Returns false when no label is
    /// expected or a save is already in flight.
    pub fn set_label(&mut self, text: &str) -> bool {
        match &mut self.state {
            DraftState::PendingLabel {
                label,
                saving: false,
                ..
            } => {
                *label = text.to_string();
                true
            }
            _ => false,
        }
    }

    /// Validate the pending draft and mark it as saving.
    ///
    /// The draft stays in place until [`Self::submission_succeeded`] or
    /// [`Self::submission_failed`] is called, so a failed save can be retried.
    pub fn take_submission(&mut self) -> Result<Submission, ValidationError> {
        let (min_width, min_height) = (self.min_width, self.min_height);
        let ticket = self.generation;
        match &mut self.state {
            DraftState::PendingLabel {
                saving: true, ..
            } => Err(ValidationError::SaveInProgress),
            DraftState::PendingLabel {
                rect,
                label,
                saving,
            } => {
                let trimmed = label.trim();
                if trimmed.is_empty() {
                    return Err(ValidationError::EmptyLabel);
                }
                if !rect.exceeds(min_width, min_height) {
                    return Err(ValidationError::TooSmall {
                        width: rect.width,
                        height: rect.height,
                        min_width,
                        min_height,
                    });
                }
                *saving = true;
                Ok(Submission {
                    ticket,
                    annotation: NewAnnotation::new(*rect, trimmed),
                })
            }
            _ => Err(ValidationError::NoPendingDraft),
        }
    }

    /// The create request for `ticket` failed; the draft becomes editable
    /// again.
    pub fn submission_failed(&mut self, ticket: u64) {
        if ticket != self.generation {
            return;
        }
        if let DraftState::PendingLabel { saving, .. } = &mut self.state {
            *saving = false;
        }
    }

    /// The create request for `ticket` succeeded; the draft is done.
    pub fn submission_succeeded(&mut self, ticket: u64) {
        if ticket == self.generation && self.is_pending_label() {
            self.state = DraftState::Idle;
        }
    }

    /// Abandon the current draft. A draft whose save is in flight is kept.
    pub fn cancel(&mut self) -> bool {
        match self.state {
            DraftState::Idle | DraftState::PendingLabel { saving: true, .. } => false,
            _ => {
                log::trace!("Draft: cancelled");
                self.generation += 1;
                self.state = DraftState::Idle;
                true
            }
        }
    }
}
