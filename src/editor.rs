//! The annotation editor for one image.
//!
//! [`ImageAnnotator`] wires the coordinate mapper, the draft tracker, the
//! local cache, and the overlay renderer to a store. Methods take `&self`
//! so a front end can keep several store requests in flight while pointer
//! events keep arriving; no internal borrow is held across an `.await`.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use imgmark_store::{Annotation, AnnotationId, AnnotationPatch, AnnotationStore, ImageId, Point};

use crate::config::EditorConfig;
use crate::draft::{DraftOutcome, DraftTracker};
use crate::error::{Action, EditorError, ValidationError};
use crate::events::{AppEvent, EventBus};
use crate::geometry::{ImageLayout, map_pointer};
use crate::message::{Key, Message, label_prompt_key};
use crate::notify::{Notification, NotificationId, Notifications};
use crate::sync::AnnotationSync;
use crate::view::{DraftBox, ListIntent, ListView, RenderedList};

pub const MSG_SAVED: &str = "Annotation saved successfully";
pub const MSG_UPDATED: &str = "Annotation updated";
pub const MSG_DELETED: &str = "Annotation deleted";
pub const MSG_TOO_SMALL: &str = "Annotation too small. Please draw a larger area.";
pub const MSG_EMPTY_LABEL: &str = "Annotation label cannot be empty";

/// Called with the image and its de-duplicated list after every change.
pub type ChangeCallback = Rc<dyn Fn(&ImageId, &[Annotation])>;

struct EditorState {
    layout: Option<ImageLayout>,
    tracker: DraftTracker,
    sync: AnnotationSync,
    view: ListView,
    notes: Notifications,
}

/// Rectangle annotation editor bound to one image at a time.
pub struct ImageAnnotator<S> {
    store: Rc<S>,
    state: RefCell<EditorState>,
    on_change: RefCell<Option<ChangeCallback>>,
}

impl<S: AnnotationStore> ImageAnnotator<S> {
    /// Create an editor for `image_id` seeded with a known list.
    pub fn new(
        store: Rc<S>,
        image_id: ImageId,
        annotations: Vec<Annotation>,
        config: &EditorConfig,
    ) -> Self {
        let tracker = DraftTracker::new(config.min_draft_width, config.min_draft_height)
            .with_read_only(config.read_only);
        Self {
            store,
            state: RefCell::new(EditorState {
                layout: None,
                tracker,
                sync: AnnotationSync::new(image_id, annotations),
                view: ListView::new(config.read_only),
                notes: Notifications::new()
                    .with_lifetime(Duration::from_millis(config.notification_ms)),
            }),
            on_change: RefCell::new(None),
        }
    }

    /// Create an editor and load the image's list from the store.
    pub async fn open(
        store: Rc<S>,
        image_id: ImageId,
        config: &EditorConfig,
    ) -> Result<Self, EditorError> {
        let annotations = store.list_annotations(&image_id).await?;
        log::debug!("Opened editor on {} with {} annotations", image_id, annotations.len());
        Ok(Self::new(store, image_id, annotations, config))
    }

    /// Register the owner's change notification.
    ///
    /// Called with the image id and the de-duplicated list after the list
    /// changes. The editor is not borrowed while the callback runs, so the
    /// callback may register a replacement.
    pub fn on_change<F>(&self, f: F)
    where
        F: Fn(&ImageId, &[Annotation]) + 'static,
    {
        *self.on_change.borrow_mut() = Some(Rc::new(f));
    }

    /// Publish [`AppEvent::AnnotationsChanged`] on `bus` for every change.
    pub fn publish_changes_to(&self, bus: EventBus) {
        self.on_change(move |image_id, list| {
            bus.publish(&AppEvent::AnnotationsChanged {
                image_id: image_id.clone(),
                count: list.len(),
            });
        });
    }

    pub fn store(&self) -> &Rc<S> {
        &self.store
    }

    pub fn image_id(&self) -> ImageId {
        self.state.borrow().sync.image_id().clone()
    }

    pub fn read_only(&self) -> bool {
        self.state.borrow().view.read_only()
    }

    pub fn set_read_only(&self, read_only: bool) {
        let mut state = self.state.borrow_mut();
        state.view = ListView::new(read_only);
        state.tracker.set_read_only(read_only);
    }

    pub fn set_layout(&self, layout: Option<ImageLayout>) {
        self.state.borrow_mut().layout = layout;
    }

    /// Show another image. Any draft is dropped and late completions for
    /// the previous image are ignored.
    pub fn switch_image(&self, image_id: ImageId, annotations: Vec<Annotation>) {
        let mut state = self.state.borrow_mut();
        log::debug!("Switching editor to {}", image_id);
        state.tracker.reset();
        state.layout = None;
        state.sync.reset(image_id, annotations);
    }

    // ========================================================================
    // Pointer gestures
    // ========================================================================

    pub fn pointer_down(&self, screen: Point) -> DraftOutcome {
        let mut state = self.state.borrow_mut();
        let point = map_pointer(state.layout.as_ref(), screen);
        state.tracker.pointer_down(point)
    }

    pub fn pointer_move(&self, screen: Point) -> DraftOutcome {
        let mut state = self.state.borrow_mut();
        let point = map_pointer(state.layout.as_ref(), screen);
        state.tracker.pointer_move(point)
    }

    pub fn pointer_up(&self, screen: Point) -> DraftOutcome {
        let mut state = self.state.borrow_mut();
        let point = map_pointer(state.layout.as_ref(), screen);
        let outcome = state.tracker.pointer_up(point);
        if let DraftOutcome::TooSmall(_) = outcome {
            state.notes.info(MSG_TOO_SMALL);
        }
        outcome
    }

    // ========================================================================
    // Label prompt
    // ========================================================================

    pub fn set_label(&self, label: &str) -> bool {
        self.state.borrow_mut().tracker.set_label(label)
    }

    /// The label typed so far, while a draft awaits one.
    pub fn pending_label(&self) -> Option<String> {
        self.state.borrow().tracker.label().map(str::to_string)
    }

    pub fn cancel_label(&self) -> bool {
        self.state.borrow_mut().tracker.cancel()
    }

    /// The message a key press in the label prompt stands for, if any.
    /// Keys are ignored while no draft awaits a label.
    pub fn label_key(&self, key: Key) -> Option<Message> {
        let label = self.pending_label()?;
        label_prompt_key(key, &label)
    }

    /// Persist the pending draft with its label.
    ///
    /// Validation happens before any request. On failure the draft stays
    /// pending so confirming again retries the save.
    pub async fn confirm_label(&self) -> Result<Annotation, EditorError> {
        let (image_id, submission) = {
            let mut state = self.state.borrow_mut();
            match state.tracker.take_submission() {
                Ok(submission) => (state.sync.image_id().clone(), submission),
                Err(err) => {
                    if err == ValidationError::EmptyLabel {
                        state.notes.warning(MSG_EMPTY_LABEL);
                    }
                    return Err(err.into());
                }
            }
        };

        let result = self
            .store
            .create_annotation(&image_id, submission.annotation)
            .await;

        let changed = {
            let mut state = self.state.borrow_mut();
            match &result {
                Ok(created) => {
                    log::info!("Saved annotation {} on {}", created.id, image_id);
                    state.tracker.submission_succeeded(submission.ticket);
                    state.notes.success(MSG_SAVED);
                    state.sync.apply_created(created.clone())
                }
                Err(err) => {
                    log::error!("Failed to save annotation on {}: {}", image_id, err);
                    state.tracker.submission_failed(submission.ticket);
                    state.notes.error(Action::Save.failure_message());
                    false
                }
            }
        };
        if changed {
            self.emit_change();
        }
        result.map_err(EditorError::from)
    }

    // ========================================================================
    // Edits of persisted annotations
    // ========================================================================

    /// Change the label of a persisted annotation.
    pub async fn update_label(
        &self,
        id: &AnnotationId,
        label: &str,
    ) -> Result<Annotation, EditorError> {
        let image_id = self.check_editable(id)?;
        let label = label.trim();
        if label.is_empty() {
            self.state.borrow_mut().notes.warning(MSG_EMPTY_LABEL);
            return Err(ValidationError::EmptyLabel.into());
        }

        let result = self
            .store
            .update_annotation(&image_id, id, AnnotationPatch::label(label))
            .await;

        let changed = {
            let mut state = self.state.borrow_mut();
            match &result {
                Ok(updated) => {
                    log::info!("Updated annotation {} on {}", id, image_id);
                    state.notes.success(MSG_UPDATED);
                    state.sync.image_id() == &image_id && state.sync.apply_updated(updated.clone())
                }
                Err(err) => {
                    log::error!("Failed to update annotation {}: {}", id, err);
                    state.notes.error(Action::Update.failure_message());
                    false
                }
            }
        };
        if changed {
            self.emit_change();
        }
        result.map_err(EditorError::from)
    }

    /// Delete a persisted annotation.
    pub async fn delete(&self, id: &AnnotationId) -> Result<(), EditorError> {
        let image_id = self.check_editable(id)?;

        let result = self.store.delete_annotation(&image_id, id).await;

        let changed = {
            let mut state = self.state.borrow_mut();
            match &result {
                Ok(()) => {
                    log::info!("Deleted annotation {} on {}", id, image_id);
                    state.notes.success(MSG_DELETED);
                    state.sync.image_id() == &image_id && state.sync.apply_deleted(id)
                }
                Err(err) => {
                    log::error!("Failed to delete annotation {}: {}", id, err);
                    state.notes.error(Action::Delete.failure_message());
                    false
                }
            }
        };
        if changed {
            self.emit_change();
        }
        result.map_err(EditorError::from)
    }

    fn check_editable(&self, id: &AnnotationId) -> Result<ImageId, EditorError> {
        let state = self.state.borrow();
        if state.view.read_only() {
            return Err(ValidationError::ReadOnly.into());
        }
        if state.sync.get(id).is_none() {
            return Err(EditorError::NotFound(format!(
                "annotation {} on image {}",
                id,
                state.sync.image_id()
            )));
        }
        Ok(state.sync.image_id().clone())
    }

    // ========================================================================
    // Reconciliation
    // ========================================================================

    /// Replace the local list with an authoritative one from the owner.
    pub fn resync(&self, authoritative: Vec<Annotation>) -> bool {
        let changed = self.state.borrow_mut().sync.resync(authoritative);
        if changed {
            self.emit_change();
        }
        changed
    }

    /// Fetch the authoritative list from the store and resync.
    pub async fn reload(&self) -> Result<bool, EditorError> {
        let image_id = self.image_id();
        match self.store.list_annotations(&image_id).await {
            Ok(list) => {
                if self.image_id() != image_id {
                    return Ok(false);
                }
                Ok(self.resync(list))
            }
            Err(err) => {
                log::error!("Failed to load annotations for {}: {}", image_id, err);
                self.state
                    .borrow_mut()
                    .notes
                    .error(Action::Load.failure_message());
                Err(err.into())
            }
        }
    }

    fn emit_change(&self) {
        let (image_id, list) = {
            let state = self.state.borrow();
            let list: Vec<Annotation> = state.sync.rendered().into_iter().cloned().collect();
            (state.sync.image_id().clone(), list)
        };
        let callback = self.on_change.borrow().clone();
        if let Some(callback) = callback {
            callback(&image_id, &list);
        }
    }

    // ========================================================================
    // Output
    // ========================================================================

    /// De-duplicated annotations in display order.
    pub fn annotations(&self) -> Vec<Annotation> {
        self.state
            .borrow()
            .sync
            .rendered()
            .into_iter()
            .cloned()
            .collect()
    }

    /// Build the current overlay frame.
    pub fn render(&self) -> RenderedList {
        let state = self.state.borrow();
        let draft = state.tracker.draft_rect().map(|rect| DraftBox {
            rect,
            awaiting_label: state.tracker.is_pending_label(),
        });
        let list = state.sync.rendered();
        state.view.render(state.layout.as_ref(), &list, draft)
    }

    pub fn notifications(&self) -> Vec<Notification> {
        let mut state = self.state.borrow_mut();
        state.notes.prune_expired();
        state.notes.active().to_vec()
    }

    pub fn dismiss_notification(&self, id: NotificationId) -> bool {
        self.state.borrow_mut().notes.dismiss(id)
    }

    /// Dispatch a message. Failures have already been reported as
    /// notifications when this returns an error.
    pub async fn handle(&self, message: Message) -> Result<(), EditorError> {
        match message {
            Message::LayoutChanged(layout) => self.set_layout(layout),
            Message::PointerDown(p) => {
                self.pointer_down(p);
            }
            Message::PointerMove(p) => {
                self.pointer_move(p);
            }
            Message::PointerUp(p) => {
                self.pointer_up(p);
            }
            Message::LabelChanged(label) => {
                self.set_label(&label);
            }
            Message::ConfirmLabel => {
                self.confirm_label().await?;
            }
            Message::CancelLabel => {
                self.cancel_label();
            }
            Message::Intent(ListIntent::EditRequested { id, label }) => {
                self.update_label(&id, &label).await?;
            }
            Message::Intent(ListIntent::DeleteRequested(id)) => {
                self.delete(&id).await?;
            }
            Message::Reload => {
                self.reload().await?;
            }
            Message::Resync(list) => {
                self.resync(list);
            }
            Message::DismissNotification(id) => {
                self.dismiss_notification(id);
            }
        }
        Ok(())
    }
}
