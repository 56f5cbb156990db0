//! Editor error taxonomy.
//!
//! Validation failures are caught before any request is issued. Store
//! failures are folded into [`EditorError::NotFound`],
//! [`ValidationError::Rejected`] or [`EditorError::PersistenceUnavailable`].
//! None of them is fatal and the local annotation list is left at its last
//! known good state.

use imgmark_store::StoreError;
use thiserror::Error;

/// Reasons a draft or edit is rejected locally.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("label is empty")]
    EmptyLabel,

    #[error("area {width}x{height} is not larger than {min_width}x{min_height}")]
    TooSmall {
        width: f32,
        height: f32,
        min_width: f32,
        min_height: f32,
    },

    #[error("no draft is waiting for a label")]
    NoPendingDraft,

    #[error("a save for this draft is already in progress")]
    SaveInProgress,

    #[error("the editor is read-only")]
    ReadOnly,

    /// The store refused the data itself
    #[error("rejected by the store: {0}")]
    Rejected(String),
}

/// Errors surfaced by editor operations.
#[derive(Error, Debug)]
pub enum EditorError {
    /// Image or annotation missing at the store
    #[error("Not found: {0}")]
    NotFound(String),

    /// Rejected before reaching the store
    #[error("Validation failed: {0}")]
    ValidationFailed(#[from] ValidationError),

    /// Network or storage failure
    #[error("Persistence unavailable: {0}")]
    PersistenceUnavailable(String),
}

impl From<StoreError> for EditorError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::InvalidAnnotation(reason) => ValidationError::Rejected(reason).into(),
            err if err.is_not_found() => EditorError::NotFound(err.to_string()),
            err => EditorError::PersistenceUnavailable(err.to_string()),
        }
    }
}

/// The user action a failure is reported against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Save,
    Update,
    Delete,
    Load,
}

impl Action {
    /// User-facing failure text, without technical detail.
    pub fn failure_message(&self) -> &'static str {
        match self {
            Action::Save => "Failed to save annotation",
            Action::Update => "Failed to update annotation",
            Action::Delete => "Failed to delete annotation",
            Action::Load => "Failed to load annotations",
        }
    }
}
