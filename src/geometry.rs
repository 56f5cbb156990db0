//! Screen to intrinsic coordinate mapping.
//!
//! An image may be rendered at any CSS size. Annotations are stored in the
//! image's natural pixel space, so every pointer position is scaled by
//! `natural / displayed` on the way in and by the inverse on the way out.

use imgmark_store::{Point, Rect};

/// Measured placement of a rendered image.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImageLayout {
    /// Left edge of the rendered image in viewport coordinates
    pub left: f32,
    /// Top edge of the rendered image in viewport coordinates
    pub top: f32,
    pub displayed_width: f32,
    pub displayed_height: f32,
    pub natural_width: f32,
    pub natural_height: f32,
}

impl ImageLayout {
    pub fn new(
        left: f32,
        top: f32,
        displayed_width: f32,
        displayed_height: f32,
        natural_width: f32,
        natural_height: f32,
    ) -> Self {
        Self {
            left,
            top,
            displayed_width,
            displayed_height,
            natural_width,
            natural_height,
        }
    }

    /// Layout of an image shown at its natural size.
    pub fn unscaled(left: f32, top: f32, width: f32, height: f32) -> Self {
        Self::new(left, top, width, height, width, height)
    }

    /// Whether both the rendered box and the bitmap have a non-zero size.
    pub fn is_measured(&self) -> bool {
        self.displayed_width > 0.0
            && self.displayed_height > 0.0
            && self.natural_width > 0.0
            && self.natural_height > 0.0
    }

    /// Intrinsic pixels per displayed pixel, horizontally.
    pub fn scale_x(&self) -> f32 {
        self.natural_width / self.displayed_width
    }

    /// Intrinsic pixels per displayed pixel, vertically.
    pub fn scale_y(&self) -> f32 {
        self.natural_height / self.displayed_height
    }

    /// Map a viewport point into intrinsic pixels.
    ///
    /// The result is clamped to the image bounds so stored coordinates are
    /// never negative. An unmeasured layout maps everything to `(0, 0)`.
    pub fn to_intrinsic(&self, screen: Point) -> Point {
        if !self.is_measured() {
            return Point::default();
        }
        let x = (screen.x - self.left) * self.scale_x();
        let y = (screen.y - self.top) * self.scale_y();
        Point::new(
            x.clamp(0.0, self.natural_width),
            y.clamp(0.0, self.natural_height),
        )
    }

    /// Map an intrinsic point to displayed pixels relative to the image's
    /// top-left corner.
    pub fn to_display(&self, point: Point) -> Point {
        if !self.is_measured() {
            return Point::default();
        }
        Point::new(point.x / self.scale_x(), point.y / self.scale_y())
    }

    /// Scale an intrinsic rectangle to displayed pixels relative to the
    /// image's top-left corner.
    pub fn rect_to_display(&self, rect: Rect) -> Rect {
        if !self.is_measured() {
            return Rect::default();
        }
        let origin = self.to_display(Point::new(rect.x, rect.y));
        Rect::new(
            origin.x,
            origin.y,
            rect.width / self.scale_x(),
            rect.height / self.scale_y(),
        )
    }
}

/// Map a pointer position, tolerating an image that has not been laid out.
///
/// Callers must accept `(0, 0)` while the image is still loading.
pub fn map_pointer(layout: Option<&ImageLayout>, screen: Point) -> Point {
    match layout {
        Some(layout) => layout.to_intrinsic(screen),
        None => Point::default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f32 = 0.001;

    fn approx_eq(a: f32, b: f32) -> bool {
        (a - b).abs() < EPSILON
    }

    fn half_size() -> ImageLayout {
        // 800x600 bitmap shown at 400x300, offset in the page
        ImageLayout::new(30.0, 70.0, 400.0, 300.0, 800.0, 600.0)
    }

    #[test]
    fn test_scaled_mapping() {
        let layout = half_size();
        let p = layout.to_intrinsic(Point::new(130.0, 170.0));
        assert_eq!(p, Point::new(200.0, 200.0));
    }

    #[test]
    fn test_unscaled_layout_is_offset_only() {
        let layout = ImageLayout::unscaled(10.0, 20.0, 640.0, 480.0);
        assert_eq!(layout.to_intrinsic(Point::new(15.0, 25.0)), Point::new(5.0, 5.0));
    }

    #[test]
    fn test_missing_layout_maps_to_origin() {
        assert_eq!(map_pointer(None, Point::new(123.0, 456.0)), Point::default());

        let unmeasured = ImageLayout::new(0.0, 0.0, 0.0, 0.0, 800.0, 600.0);
        assert_eq!(
            map_pointer(Some(&unmeasured), Point::new(50.0, 50.0)),
            Point::default()
        );
    }

    #[test]
    fn test_outside_points_are_clamped() {
        let layout = half_size();
        assert_eq!(layout.to_intrinsic(Point::new(0.0, 0.0)), Point::new(0.0, 0.0));
        assert_eq!(
            layout.to_intrinsic(Point::new(1000.0, 1000.0)),
            Point::new(800.0, 600.0)
        );
    }

    #[test]
    fn test_round_trip_returns_original_point() {
        let layouts = [
            half_size(),
            ImageLayout::new(0.0, 0.0, 333.0, 251.0, 1920.0, 1080.0),
            ImageLayout::new(12.5, 3.0, 1024.0, 768.0, 640.0, 480.0),
        ];
        for layout in layouts {
            for (dx, dy) in [(0.0, 0.0), (17.3, 42.9), (100.0, 99.5)] {
                let screen = Point::new(layout.left + dx, layout.top + dy);
                let back = layout.to_display(layout.to_intrinsic(screen));
                assert!(approx_eq(back.x, dx), "{:?} -> {:?}", screen, back);
                assert!(approx_eq(back.y, dy), "{:?} -> {:?}", screen, back);
            }
        }
    }

    #[test]
    fn test_rect_to_display_inverts_scale() {
        let layout = half_size();
        let shown = layout.rect_to_display(Rect::new(200.0, 200.0, 100.0, 80.0));
        assert_eq!(shown, Rect::new(100.0, 100.0, 50.0, 40.0));
    }
}
