use geoview_types::Extent;
use nalgebra::{Point2, Vector2};
use serde::{Deserialize, Serialize};

/// Point in screen pixels or map projection units.
pub type Point2d = Point2<f64>;

/// Meters per pixel at zoom level 0 of the 256px Web Mercator pyramid.
pub const ZOOM_0_RESOLUTION: f64 = 156_543.033_928_000_14;

/// Viewport dimensions in pixels.
#[derive(Debug, Default, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Size {
    width: f64,
    height: f64,
}

impl Size {
    /// Creates a size.
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// Horizontal pixels.
    pub fn width(&self) -> f64 {
        self.width
    }

    /// Vertical pixels.
    pub fn height(&self) -> f64 {
        self.height
    }

    /// Returns true unless both dimensions are positive and finite.
    pub fn is_zero(&self) -> bool {
        let usable = |v: f64| v.is_finite() && v > 0.0;
        !(usable(self.width) && usable(self.height))
    }

    fn half(&self) -> Vector2<f64> {
        Vector2::new(self.width / 2.0, self.height / 2.0)
    }
}

/// What part of the map is on screen.
///
/// A north-up camera: `center` and `resolution` are in map projection units, the viewport
/// `size` in pixels. Screen `y` grows downwards from the top-left corner, map `y` grows upwards.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MapView {
    center: Point2d,
    resolution: f64,
    size: Size,
}

impl Default for MapView {
    fn default() -> Self {
        Self::new(Point2d::origin(), 1.0)
    }
}

impl MapView {
    /// Creates a view with an empty viewport.
    pub fn new(center: Point2d, resolution: f64) -> Self {
        Self {
            center,
            resolution,
            size: Size::default(),
        }
    }

    /// Same as [`MapView::new`] with the resolution of a zoom level.
    pub fn with_zoom_level(center: Point2d, zoom: f64) -> Self {
        Self::new(center, resolution_for_zoom(zoom))
    }

    /// Map point in the middle of the viewport.
    pub fn center(&self) -> Point2d {
        self.center
    }

    /// Map units per pixel.
    pub fn resolution(&self) -> f64 {
        self.resolution
    }

    /// Fractional zoom level.
    pub fn zoom_level(&self) -> f64 {
        zoom_for_resolution(self.resolution)
    }

    /// Viewport size.
    pub fn size(&self) -> Size {
        self.size
    }

    /// The view with another viewport size.
    pub fn with_size(&self, size: Size) -> Self {
        Self { size, ..*self }
    }

    /// The view moved into the `[min_zoom, max_zoom]` range. A view with a nonsensical
    /// resolution lands at `min_zoom`.
    pub fn clamp_zoom(&self, min_zoom: f64, max_zoom: f64) -> Self {
        let zoom = self.zoom_level();
        let target = match zoom.is_finite() {
            true if zoom < min_zoom => min_zoom,
            true if zoom > max_zoom => max_zoom,
            true => return *self,
            false => min_zoom,
        };

        Self {
            resolution: resolution_for_zoom(target),
            ..*self
        }
    }

    /// Map area covered by the viewport, or `None` for an empty viewport.
    pub fn visible_extent(&self) -> Option<Extent> {
        if self.size.is_zero() {
            return None;
        }

        let top_left = self.screen_to_map(Point2d::origin());
        let bottom_right = self.screen_to_map(Point2d::new(self.size.width, self.size.height));
        Extent::from_points(
            [
                [top_left.x, top_left.y],
                [bottom_right.x, bottom_right.y],
            ]
            .into_iter(),
        )
    }

    /// Pixel position of a map point.
    pub fn map_to_screen(&self, point: Point2d) -> Point2d {
        let offset = (point - self.center) / self.resolution;
        Point2d::from(self.size.half() + Vector2::new(offset.x, -offset.y))
    }

    /// Map position of a pixel. Gives `NaN` coordinates if the resolution is zero.
    pub fn screen_to_map(&self, pixel: Point2d) -> Point2d {
        if self.resolution == 0.0 {
            return Point2d::new(f64::NAN, f64::NAN);
        }

        let offset = pixel.coords - self.size.half();
        self.center + Vector2::new(offset.x, -offset.y) * self.resolution
    }

    /// Shifts the map content by `offset` map units, so the center moves the opposite way.
    pub fn translate(&self, offset: Vector2<f64>) -> Self {
        Self {
            center: self.center - offset,
            ..*self
        }
    }

    /// Scales the resolution by `factor` while the map point under the `anchor` pixel stays put.
    pub fn zoom(&self, factor: f64, anchor: Point2d) -> Self {
        let fixed = self.screen_to_map(anchor);
        Self {
            center: fixed + (self.center - fixed) * factor,
            resolution: self.resolution * factor,
            ..*self
        }
    }

    /// The view showing all of `extent` with `padding` free pixels on each side.
    ///
    /// A point extent, or an empty viewport, only recenters. An invalid extent changes nothing.
    pub fn fit(&self, extent: &Extent, padding: f64) -> Self {
        if !extent.is_valid() {
            return *self;
        }

        let [x, y] = extent.center();
        let centered = Self {
            center: Point2d::new(x, y),
            ..*self
        };
        let is_point = extent.width() == 0.0 && extent.height() == 0.0;
        if is_point || self.size.is_zero() {
            return centered;
        }

        let room = |pixels: f64| (pixels - 2.0 * padding).max(1.0);
        let resolution = f64::max(
            extent.width() / room(self.size.width),
            extent.height() / room(self.size.height),
        );
        Self {
            resolution,
            ..centered
        }
    }
}

/// Resolution at a fractional zoom level.
pub fn resolution_for_zoom(zoom: f64) -> f64 {
    ZOOM_0_RESOLUTION * (-zoom).exp2()
}

/// Fractional zoom level at a resolution.
pub fn zoom_for_resolution(resolution: f64) -> f64 {
    (ZOOM_0_RESOLUTION / resolution).log2()
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;

    use super::*;

    #[test]
    fn pixels_to_map_around_center() {
        let view = MapView::default().with_size(Size::new(100.0, 100.0));
        assert_abs_diff_eq!(
            view.screen_to_map(Point2d::new(0.0, 0.0)),
            Point2d::new(-50.0, 50.0),
            epsilon = 1e-9
        );
        assert_abs_diff_eq!(
            view.screen_to_map(Point2d::new(50.0, 50.0)),
            Point2d::origin(),
            epsilon = 1e-9
        );

        let wide = MapView::default().with_size(Size::new(200.0, 50.0));
        assert_abs_diff_eq!(
            wide.screen_to_map(Point2d::new(25.0, 49.0)),
            Point2d::new(-75.0, -24.0),
            epsilon = 1e-9
        );
    }

    #[test]
    fn map_and_screen_agree() {
        let view =
            MapView::new(Point2d::new(-100.0, -100.0), 2.0).with_size(Size::new(100.0, 100.0));
        assert_abs_diff_eq!(
            view.screen_to_map(Point2d::origin()),
            Point2d::new(-200.0, 0.0),
            epsilon = 1e-9
        );
        assert_abs_diff_eq!(
            view.map_to_screen(Point2d::new(-200.0, 0.0)),
            Point2d::origin(),
            epsilon = 1e-9
        );
    }

    #[test]
    fn zoom_keeps_anchor() {
        let view = MapView::new(Point2d::new(10.0, 10.0), 4.0).with_size(Size::new(100.0, 100.0));
        let anchor = Point2d::new(20.0, 70.0);
        let before = view.screen_to_map(anchor);
        let zoomed = view.zoom(0.5, anchor);

        assert_abs_diff_eq!(zoomed.resolution(), 2.0);
        assert_abs_diff_eq!(zoomed.screen_to_map(anchor), before, epsilon = 1e-9);
    }

    #[test]
    fn zoom_levels() {
        assert_abs_diff_eq!(resolution_for_zoom(0.0), ZOOM_0_RESOLUTION);
        assert_abs_diff_eq!(zoom_for_resolution(resolution_for_zoom(12.5)), 12.5, epsilon = 1e-9);

        let view = MapView::with_zoom_level(Point2d::origin(), 22.0).clamp_zoom(2.0, 20.0);
        assert_abs_diff_eq!(view.zoom_level(), 20.0, epsilon = 1e-9);
        let view = MapView::new(Point2d::origin(), 0.0).clamp_zoom(2.0, 20.0);
        assert_abs_diff_eq!(view.zoom_level(), 2.0, epsilon = 1e-9);
    }

    #[test]
    fn fit_with_padding() {
        let view = MapView::default().with_size(Size::new(300.0, 200.0));
        let fitted = view.fit(&Extent::new(0.0, 0.0, 1000.0, 500.0), 50.0);

        assert_abs_diff_eq!(fitted.center(), Point2d::new(500.0, 250.0));
        assert_abs_diff_eq!(fitted.resolution(), 5.0);

        let visible = fitted.visible_extent().unwrap();
        assert!(visible.contains(0.0, 0.0));
        assert!(visible.contains(1000.0, 500.0));
    }

    #[test]
    fn empty_viewport_only_recenters() {
        let view = MapView::default();
        assert!(view.visible_extent().is_none());
        let fitted = view.fit(&Extent::new(0.0, 0.0, 10.0, 10.0), 50.0);
        assert_abs_diff_eq!(fitted.center(), Point2d::new(5.0, 5.0));
        assert_abs_diff_eq!(fitted.resolution(), 1.0);
    }
}
