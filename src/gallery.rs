//! Gallery listing: pagination, per-image annotation badges, filtering,
//! and progress statistics.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;
use std::str::FromStr;

use imgmark_store::{AnnotationStore, ImageId, ImageRecord, StoreError};
use serde::Serialize;

use crate::events::{AppEvent, EventBus, Subscription};

/// One page of a list.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GalleryPage<T> {
    pub items: Vec<T>,
    pub total: usize,
    /// 1-based
    pub page: usize,
    pub limit: usize,
    pub total_pages: usize,
    pub has_more: bool,
}

/// Slice `items` into 1-based pages of `limit`.
///
/// Page 0 is treated as page 1 and a zero limit as 1. A page past the end
/// is empty but still reports the real totals.
pub fn paginate<T: Clone>(items: &[T], page: usize, limit: usize) -> GalleryPage<T> {
    let page = page.max(1);
    let limit = limit.max(1);
    let total = items.len();
    let start = (page - 1).saturating_mul(limit).min(total);
    let end = start.saturating_add(limit).min(total);

    GalleryPage {
        items: items[start..end].to_vec(),
        total,
        page,
        limit,
        total_pages: total.div_ceil(limit),
        has_more: end < total,
    }
}

/// The `count` most recently uploaded images, newest first.
pub fn recent(images: &[ImageRecord], count: usize) -> Vec<ImageRecord> {
    let mut sorted = images.to_vec();
    sorted.sort_by(|a, b| b.uploaded_at.cmp(&a.uploaded_at));
    sorted.truncate(count);
    sorted
}

/// Which images the gallery shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AnnotationFilter {
    #[default]
    All,
    Annotated,
    Unannotated,
}

impl AnnotationFilter {
    pub fn matches(&self, count: usize) -> bool {
        match self {
            AnnotationFilter::All => true,
            AnnotationFilter::Annotated => count > 0,
            AnnotationFilter::Unannotated => count == 0,
        }
    }
}

impl fmt::Display for AnnotationFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AnnotationFilter::All => "all",
            AnnotationFilter::Annotated => "annotated",
            AnnotationFilter::Unannotated => "unannotated",
        };
        f.write_str(name)
    }
}

impl FromStr for AnnotationFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "all" => Ok(AnnotationFilter::All),
            "annotated" => Ok(AnnotationFilter::Annotated),
            "unannotated" => Ok(AnnotationFilter::Unannotated),
            other => Err(format!(
                "unknown filter '{}', expected all, annotated or unannotated",
                other
            )),
        }
    }
}

/// Annotation counts per image, shared between views.
///
/// Clones share the same counts. [`Self::follow`] keeps them current from
/// bus events.
#[derive(Debug, Clone, Default)]
pub struct AnnotationBadges {
    counts: Rc<RefCell<HashMap<ImageId, usize>>>,
}

impl AnnotationBadges {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch the count of every image from the store.
    pub async fn load<S: AnnotationStore>(
        store: &S,
        images: &[ImageRecord],
    ) -> Result<Self, StoreError> {
        let badges = Self::new();
        for image in images {
            let count = store.list_annotations(&image.id).await?.len();
            badges.set(image.id.clone(), count);
        }
        log::debug!("Loaded annotation badges for {} images", images.len());
        Ok(badges)
    }

    pub fn set(&self, image_id: ImageId, count: usize) {
        self.counts.borrow_mut().insert(image_id, count);
    }

    /// Count for an image; unknown images have none.
    pub fn count(&self, image_id: &ImageId) -> usize {
        self.counts.borrow().get(image_id).copied().unwrap_or(0)
    }

    /// Update from a published event. Returns whether a count changed.
    pub fn apply(&self, event: &AppEvent) -> bool {
        let mut counts = self.counts.borrow_mut();
        match event {
            AppEvent::ImageUploaded(record) => counts.insert(record.id.clone(), 0).is_none(),
            AppEvent::ImageDeleted(id) => counts.remove(id).is_some(),
            AppEvent::AnnotationsChanged { image_id, count } => {
                counts.insert(image_id.clone(), *count) != Some(*count)
            }
        }
    }

    /// Keep these badges current while the subscription lives.
    pub fn follow(&self, bus: &EventBus) -> Subscription {
        let badges = self.clone();
        bus.subscribe(move |event| {
            badges.apply(event);
        })
    }

    /// Images passing `filter`, in their original order.
    pub fn filter<'a>(
        &self,
        images: &'a [ImageRecord],
        filter: AnnotationFilter,
    ) -> Vec<&'a ImageRecord> {
        images
            .iter()
            .filter(|image| filter.matches(self.count(&image.id)))
            .collect()
    }

    pub fn stats(&self, images: &[ImageRecord]) -> AnnotationStats {
        AnnotationStats::compute(images.iter().map(|image| self.count(&image.id)))
    }
}

/// Overall labelling progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct AnnotationStats {
    pub total_images: usize,
    pub annotated_images: usize,
    pub total_annotations: usize,
    /// Share of images with at least one annotation, rounded.
    pub progress_percent: u32,
}

impl AnnotationStats {
    /// Build from the annotation count of each image.
    pub fn compute(counts: impl IntoIterator<Item = usize>) -> Self {
        let mut stats = Self::default();
        for count in counts {
            stats.total_images += 1;
            stats.total_annotations += count;
            if count > 0 {
                stats.annotated_images += 1;
            }
        }
        if stats.total_images > 0 {
            let ratio = stats.annotated_images as f64 / stats.total_images as f64;
            stats.progress_percent = (ratio * 100.0).round() as u32;
        }
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image(n: u64) -> ImageRecord {
        ImageRecord {
            id: ImageId::new(format!("img-{}", n)),
            title: format!("image {}", n),
            url: format!("image{}.png", n),
            natural_width: 100,
            natural_height: 100,
            uploaded_at: n,
        }
    }

    #[test]
    fn test_paginate_pages() {
        let items: Vec<u32> = (1..=23).collect();

        let first = paginate(&items, 1, 10);
        assert_eq!(first.items, (1..=10).collect::<Vec<_>>());
        assert_eq!(first.total_pages, 3);
        assert!(first.has_more);

        let last = paginate(&items, 3, 10);
        assert_eq!(last.items, vec![21, 22, 23]);
        assert!(!last.has_more);

        let past = paginate(&items, 9, 10);
        assert!(past.items.is_empty());
        assert_eq!(past.total, 23);
    }

    #[test]
    fn test_paginate_clamps_arguments() {
        let items = vec!['a', 'b'];
        let page = paginate(&items, 0, 0);
        assert_eq!(page.page, 1);
        assert_eq!(page.items, vec!['a']);
        assert_eq!(page.total_pages, 2);

        let empty: GalleryPage<char> = paginate(&[], 1, 10);
        assert_eq!(empty.total_pages, 0);
        assert!(!empty.has_more);
    }

    #[test]
    fn test_recent_is_newest_first() {
        let images = vec![image(1), image(3), image(2)];
        let ids: Vec<u64> = recent(&images, 2).iter().map(|i| i.uploaded_at).collect();
        assert_eq!(ids, vec![3, 2]);
    }

    #[test]
    fn test_badges_follow_events() {
        let bus = EventBus::new();
        let badges = AnnotationBadges::new();
        let _sub = badges.follow(&bus);

        bus.publish(&AppEvent::ImageUploaded(image(1)));
        bus.publish(&AppEvent::AnnotationsChanged {
            image_id: ImageId::new("img-1"),
            count: 3,
        });
        assert_eq!(badges.count(&ImageId::new("img-1")), 3);

        bus.publish(&AppEvent::ImageDeleted(ImageId::new("img-1")));
        assert_eq!(badges.count(&ImageId::new("img-1")), 0);
    }

    #[test]
    fn test_filter_and_stats() {
        let images = vec![image(1), image(2), image(3)];
        let badges = AnnotationBadges::new();
        badges.set(ImageId::new("img-1"), 2);
        badges.set(ImageId::new("img-3"), 1);

        let annotated = badges.filter(&images, AnnotationFilter::Annotated);
        assert_eq!(annotated.len(), 2);
        let unannotated = badges.filter(&images, AnnotationFilter::Unannotated);
        assert_eq!(unannotated[0].id, ImageId::new("img-2"));

        let stats = badges.stats(&images);
        assert_eq!(stats.total_images, 3);
        assert_eq!(stats.annotated_images, 2);
        assert_eq!(stats.total_annotations, 3);
        assert_eq!(stats.progress_percent, 67);

        assert_eq!(AnnotationStats::compute([]).progress_percent, 0);
    }

    #[test]
    fn test_filter_names() {
        assert_eq!(
            "Annotated".parse::<AnnotationFilter>(),
            Ok(AnnotationFilter::Annotated)
        );
        assert!("some".parse::<AnnotationFilter>().is_err());
        assert_eq!(AnnotationFilter::Unannotated.to_string(), "unannotated");
    }
}
