//! Local annotation cache for one image, reconciled with the store.
//!
//! The local list is never the source of truth. Store completions are
//! applied as they arrive, in whatever order they complete, and an
//! authoritative snapshot replaces the list wholesale. Rendering goes
//! through [`dedupe`] so an entry that arrived both from a completion and
//! from a snapshot is shown once.

use std::collections::HashSet;

use imgmark_store::{Annotation, AnnotationId, ImageId};

/// Keep the first entry seen for each id, preserving order.
pub fn dedupe<'a, I>(annotations: I) -> Vec<&'a Annotation>
where
    I: IntoIterator<Item = &'a Annotation>,
{
    let mut seen: HashSet<&AnnotationId> = HashSet::new();
    annotations
        .into_iter()
        .filter(|&a| seen.insert(&a.id))
        .collect()
}

/// The editor's cached copy of one image's annotations.
///
/// Every `apply_*` and [`resync`](Self::resync) returns whether the
/// rendered list changed; the caller decides who to tell.
#[derive(Debug)]
pub struct AnnotationSync {
    image_id: ImageId,
    local: Vec<Annotation>,
}

impl AnnotationSync {
    pub fn new(image_id: ImageId, initial: Vec<Annotation>) -> Self {
        Self {
            image_id,
            local: initial,
        }
    }

    pub fn image_id(&self) -> &ImageId {
        &self.image_id
    }

    /// The raw cache, possibly containing duplicates.
    pub fn local(&self) -> &[Annotation] {
        &self.local
    }

    /// Number of distinct annotations.
    pub fn len(&self) -> usize {
        self.rendered().len()
    }

    pub fn is_empty(&self) -> bool {
        self.local.is_empty()
    }

    pub fn get(&self, id: &AnnotationId) -> Option<&Annotation> {
        self.local.iter().find(|a| a.id == *id)
    }

    /// The list to display: one entry per id, first seen wins.
    pub fn rendered(&self) -> Vec<&Annotation> {
        dedupe(&self.local)
    }

    /// Switch to another image, replacing the cache.
    pub fn reset(&mut self, image_id: ImageId, annotations: Vec<Annotation>) {
        self.image_id = image_id;
        self.local = annotations;
    }

    /// A create request succeeded.
    pub fn apply_created(&mut self, annotation: Annotation) -> bool {
        if annotation.image_id != self.image_id {
            log::warn!(
                "Ignoring created annotation {} for image {} while showing {}",
                annotation.id,
                annotation.image_id,
                self.image_id
            );
            return false;
        }
        log::debug!("Sync: appended {}", annotation.id);
        self.local.push(annotation);
        true
    }

    /// An update request succeeded. Entries no longer cached are left alone.
    pub fn apply_updated(&mut self, annotation: Annotation) -> bool {
        let mut replaced = false;
        for entry in self.local.iter_mut().filter(|a| a.id == annotation.id) {
            *entry = annotation.clone();
            replaced = true;
        }
        if replaced {
            log::debug!("Sync: replaced {}", annotation.id);
        } else {
            log::debug!("Sync: update for {} no longer cached", annotation.id);
        }
        replaced
    }

    /// A delete request succeeded.
    pub fn apply_deleted(&mut self, id: &AnnotationId) -> bool {
        let before = self.local.len();
        self.local.retain(|a| a.id != *id);
        let removed = self.local.len() != before;
        if removed {
            log::debug!("Sync: removed {}", id);
        }
        removed
    }

    /// Replace the cache with an authoritative snapshot.
    ///
    /// Returns false when the snapshot equals the cache.
    pub fn resync(&mut self, authoritative: Vec<Annotation>) -> bool {
        if authoritative == self.local {
            return false;
        }
        log::debug!(
            "Sync: resynced {} with {} entries",
            self.image_id,
            authoritative.len()
        );
        self.local = authoritative;
        true
    }
}

#[cfg(test)]
mod tests {
    use imgmark_store::Rect;

    use super::*;

    fn ann(id: &str, label: &str) -> Annotation {
        Annotation {
            id: AnnotationId::new(id),
            image_id: ImageId::new("img-1"),
            rect: Rect::new(0.0, 0.0, 30.0, 30.0),
            label: label.to_string(),
            created_at: 1,
            updated_at: 1,
        }
    }

    #[test]
    fn test_created_appends() {
        let mut sync = AnnotationSync::new(ImageId::new("img-1"), vec![]);

        assert!(sync.apply_created(ann("a", "A")));
        assert_eq!(sync.len(), 1);
        assert_eq!(sync.get(&AnnotationId::new("a")).unwrap().label, "A");
    }

    #[test]
    fn test_created_for_other_image_is_ignored() {
        let mut sync = AnnotationSync::new(ImageId::new("img-2"), vec![]);
        assert!(!sync.apply_created(ann("a", "A")));
        assert!(sync.is_empty());
    }

    #[test]
    fn test_deleted_removes_only_target() {
        let mut sync =
            AnnotationSync::new(ImageId::new("img-1"), vec![ann("a", "A"), ann("b", "B")]);
        assert!(sync.apply_deleted(&AnnotationId::new("a")));
        assert_eq!(sync.local(), &[ann("b", "B")]);
        assert!(!sync.apply_deleted(&AnnotationId::new("a")));
    }

    #[test]
    fn test_updated_replaces_in_place() {
        let mut sync =
            AnnotationSync::new(ImageId::new("img-1"), vec![ann("a", "A"), ann("b", "B")]);
        assert!(sync.apply_updated(ann("a", "renamed")));
        assert_eq!(sync.local()[0].label, "renamed");
        assert_eq!(sync.local()[1].label, "B");

        assert!(!sync.apply_updated(ann("zzz", "ghost")));
        assert_eq!(sync.local().len(), 2);
    }

    #[test]
    fn test_resync_reports_change_only_on_difference() {
        let mut sync = AnnotationSync::new(ImageId::new("img-1"), vec![ann("a", "A")]);

        assert!(!sync.resync(vec![ann("a", "A")]));
        assert_eq!(sync.local(), &[ann("a", "A")]);

        assert!(sync.resync(vec![ann("a", "A"), ann("b", "B")]));
        assert_eq!(sync.len(), 2);
    }

    #[test]
    fn test_rendered_dedupes_resync_and_completion_race() {
        let mut sync = AnnotationSync::new(ImageId::new("img-1"), vec![]);
        // The snapshot lands before the create completion for the same id.
        sync.resync(vec![ann("a", "A")]);
        sync.apply_created(ann("a", "A"));

        assert_eq!(sync.local().len(), 2);
        let rendered = sync.rendered();
        assert_eq!(rendered.len(), 1);
        assert_eq!(rendered[0].id, AnnotationId::new("a"));
    }

    #[test]
    fn test_out_of_order_completions() {
        let mut sync = AnnotationSync::new(ImageId::new("img-1"), vec![ann("a", "A")]);
        // Delete of "a" completes before a stale rename of "a".
        sync.apply_deleted(&AnnotationId::new("a"));
        assert!(!sync.apply_updated(ann("a", "late")));
        sync.apply_created(ann("b", "B"));
        sync.apply_created(ann("c", "C"));

        let labels: Vec<&str> = sync.rendered().iter().map(|a| a.label.as_str()).collect();
        assert_eq!(labels, vec!["B", "C"]);
    }

    #[test]
    fn test_dedupe_keeps_first_seen() {
        let list = vec![ann("a", "first"), ann("b", "B"), ann("a", "second")];
        let unique = dedupe(&list);
        assert_eq!(unique.len(), 2);
        assert_eq!(unique[0].label, "first");
    }
}
