//! Dismissable user notifications (toasts).

use std::time::Duration;
use web_time::Instant;

use crate::constants::DEFAULT_NOTIFICATION_MS;

/// Identifier of a shown notification.
pub type NotificationId = u64;

/// Severity of a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Info,
    Success,
    Warning,
    Error,
}

/// A single notification.
#[derive(Debug, Clone)]
pub struct Notification {
    pub id: NotificationId,
    pub kind: NotificationKind,
    pub message: String,
    created: Instant,
    lifetime: Duration,
}

impl Notification {
    pub fn is_expired_at(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.created) >= self.lifetime
    }
}

/// Queue of currently visible notifications.
#[derive(Debug)]
pub struct Notifications {
    active: Vec<Notification>,
    next_id: NotificationId,
    lifetime: Duration,
}

impl Default for Notifications {
    fn default() -> Self {
        Self::new()
    }
}

impl Notifications {
    pub fn new() -> Self {
        Self {
            active: Vec::new(),
            next_id: 1,
            lifetime: Duration::from_millis(DEFAULT_NOTIFICATION_MS),
        }
    }

    /// Set how long new notifications stay visible.
    pub fn with_lifetime(mut self, lifetime: Duration) -> Self {
        self.lifetime = lifetime;
        self
    }

    pub fn push(&mut self, kind: NotificationKind, message: impl Into<String>) -> NotificationId {
        let id = self.next_id;
        self.next_id += 1;
        let message = message.into();
        log::debug!("Notification {} ({:?}): {}", id, kind, message);
        self.active.push(Notification {
            id,
            kind,
            message,
            created: Instant::now(),
            lifetime: self.lifetime,
        });
        id
    }

    pub fn info(&mut self, message: impl Into<String>) -> NotificationId {
        self.push(NotificationKind::Info, message)
    }

    pub fn success(&mut self, message: impl Into<String>) -> NotificationId {
        self.push(NotificationKind::Success, message)
    }

    pub fn warning(&mut self, message: impl Into<String>) -> NotificationId {
        self.push(NotificationKind::Warning, message)
    }

    pub fn error(&mut self, message: impl Into<String>) -> NotificationId {
        self.push(NotificationKind::Error, message)
    }

    /// Remove a notification. Returns false if it was already gone.
    pub fn dismiss(&mut self, id: NotificationId) -> bool {
        let before = self.active.len();
        self.active.retain(|n| n.id != id);
        self.active.len() != before
    }

    pub fn active(&self) -> &[Notification] {
        &self.active
    }

    /// Drop notifications whose lifetime has passed.
    pub fn prune_expired(&mut self) -> usize {
        self.prune_expired_at(Instant::now())
    }

    pub fn prune_expired_at(&mut self, now: Instant) -> usize {
        let before = self.active.len();
        self.active.retain(|n| !n.is_expired_at(now));
        before - self.active.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_and_dismiss() {
        let mut notes = Notifications::new();
        let a = notes.info("Annotation too small. Please draw a larger area.");
        let b = notes.error("Failed to save annotation");
        assert_ne!(a, b);
        assert_eq!(notes.active().len(), 2);
        assert_eq!(notes.active()[1].kind, NotificationKind::Error);

        assert!(notes.dismiss(a));
        assert!(!notes.dismiss(a));
        assert_eq!(notes.active()[0].message, "Failed to save annotation");
    }

    #[test]
    fn test_prune_respects_lifetime() {
        let mut notes = Notifications::new().with_lifetime(Duration::from_secs(4));
        notes.success("Annotation saved successfully");
        let now = Instant::now();
        assert_eq!(notes.prune_expired_at(now), 0);
        assert_eq!(notes.prune_expired_at(now + Duration::from_secs(5)), 1);
        assert!(notes.active().is_empty());
    }
}
