use crate::control::{InputEvent, MouseButton};
use crate::view::{MapView, Point2d};

/// Settings of a [`MapController`].
#[derive(Copy, Clone, PartialEq, Debug)]
pub struct MapControllerConfiguration {
    zoom_speed: f64,
    min_zoom: f64,
    max_zoom: f64,
}

impl Default for MapControllerConfiguration {
    fn default() -> Self {
        Self {
            zoom_speed: 0.2,
            min_zoom: 2.0,
            max_zoom: 20.0,
        }
    }
}

impl MapControllerConfiguration {
    /// Resolution change per scrolled line: `0.2` makes every line scale the map by 1.2.
    pub fn zoom_speed(&self) -> f64 {
        self.zoom_speed
    }

    /// Replaces [`zoom_speed`](Self::zoom_speed).
    pub fn with_zoom_speed(self, zoom_speed: f64) -> Self {
        Self { zoom_speed, ..self }
    }

    /// Allowed zoom levels, inclusive.
    pub fn zoom_range(&self) -> (f64, f64) {
        (self.min_zoom, self.max_zoom)
    }

    /// Replaces [`zoom_range`](Self::zoom_range).
    pub fn with_zoom_range(self, min_zoom: f64, max_zoom: f64) -> Self {
        Self {
            min_zoom,
            max_zoom,
            ..self
        }
    }
}

/// Moves the view in response to drags, scrolls and zoom buttons, keeping it inside the allowed
/// zoom range.
#[derive(Default, Copy, Clone, PartialEq, Debug)]
pub struct MapController {
    config: MapControllerConfiguration,
}

impl MapController {
    /// Creates a controller.
    pub fn new(config: MapControllerConfiguration) -> Self {
        Self { config }
    }

    /// Current settings.
    pub fn config(&self) -> MapControllerConfiguration {
        self.config
    }

    /// The view after `event`, or `None` if the event doesn't move the map.
    pub fn handle(&self, event: &InputEvent, view: &MapView) -> Option<MapView> {
        match event {
            InputEvent::Drag(MouseButton::Left | MouseButton::Middle, offset, _) => {
                Some(view.translate(*offset))
            }
            InputEvent::Scroll(lines, pointer) => {
                let factor = (1.0 + self.config.zoom_speed).powf(-lines);
                Some(self.clamp(view.zoom(factor, pointer.screen)))
            }
            _ => None,
        }
    }

    /// Changes the zoom level by `levels` around the middle of the viewport.
    pub fn zoom_by(&self, view: &MapView, levels: f64) -> MapView {
        let size = view.size();
        let middle = Point2d::new(size.width() / 2.0, size.height() / 2.0);
        self.clamp(view.zoom(2f64.powf(-levels), middle))
    }

    /// Pulls the view into the allowed zoom range.
    pub fn clamp(&self, view: MapView) -> MapView {
        view.clamp_zoom(self.config.min_zoom, self.config.max_zoom)
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use nalgebra::Vector2;

    use super::*;
    use crate::control::{PointerState, PressedButtons};
    use crate::view::{resolution_for_zoom, Size};

    fn view(zoom: f64) -> MapView {
        MapView::with_zoom_level(Point2d::new(0.0, 0.0), zoom).with_size(Size::new(100.0, 100.0))
    }

    fn pointer(x: f64, y: f64) -> PointerState {
        PointerState {
            screen: Point2d::new(x, y),
            map: Point2d::new(0.0, 0.0),
            buttons: PressedButtons::default(),
        }
    }

    #[test]
    fn zoom_is_clamped() {
        let controller = MapController::default();
        assert_relative_eq!(controller.clamp(view(25.0)).resolution(), resolution_for_zoom(20.0));
        assert_relative_eq!(controller.clamp(view(0.0)).resolution(), resolution_for_zoom(2.0));

        let controller =
            MapController::new(MapControllerConfiguration::default().with_zoom_range(5.0, 6.0));
        assert_relative_eq!(
            controller.zoom_by(&view(5.5), 3.0).zoom_level(),
            6.0,
            epsilon = 1e-9
        );
    }

    #[test]
    fn scroll_keeps_pointer_in_place() {
        let controller = MapController::default();
        let view = view(10.0);
        let at = Point2d::new(80.0, 20.0);
        let before = view.screen_to_map(at);

        let zoomed = controller
            .handle(&InputEvent::Scroll(1.0, pointer(80.0, 20.0)), &view)
            .unwrap();
        assert!(zoomed.resolution() < view.resolution());
        let after = zoomed.screen_to_map(at);
        assert_relative_eq!(before.x, after.x, epsilon = 1e-6);
        assert_relative_eq!(before.y, after.y, epsilon = 1e-6);
    }

    #[test]
    fn left_drag_pans_click_does_not() {
        let controller = MapController::default();
        let view = view(10.0);
        let drag = InputEvent::Drag(MouseButton::Left, Vector2::new(100.0, 0.0), pointer(0.0, 0.0));
        assert_relative_eq!(controller.handle(&drag, &view).unwrap().center().x, -100.0);

        let click = InputEvent::Click(MouseButton::Left, pointer(0.0, 0.0));
        assert!(controller.handle(&click, &view).is_none());
    }
}
