//! Global constants for imgmark

/// Minimum draft width, in intrinsic pixels, for promotion to an annotation.
/// The drawn width must be strictly greater than this.
pub const MIN_DRAFT_WIDTH: f32 = 20.0;

/// Minimum draft height, in intrinsic pixels, for promotion to an annotation.
pub const MIN_DRAFT_HEIGHT: f32 = 20.0;

/// How long a notification stays visible
pub const DEFAULT_NOTIFICATION_MS: u64 = 4000;

/// Gallery page size
pub const DEFAULT_PAGE_SIZE: usize = 10;

/// Application name used for config and data directories
pub const APP_NAME: &str = "imgmark";
