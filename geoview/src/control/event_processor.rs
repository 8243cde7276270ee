use nalgebra::Vector2;
use web_time::{Duration, Instant};

use crate::control::{InputEvent, MouseButton, PointerState, PressedButtons, RawInput};
use crate::view::{MapView, Point2d};

/// Manhattan distance in pixels the pointer must travel with a held button before a drag starts.
const DRAG_THRESHOLD: f64 = 3.0;
/// Longest press that still counts as a click.
const CLICK_TIMEOUT: Duration = Duration::from_millis(200);
/// Longest gap between two clicks of a double click.
const DOUBLE_CLICK_TIMEOUT: Duration = Duration::from_millis(500);

/// Turns [`RawInput`] into [`InputEvent`]s.
#[derive(Debug)]
pub struct EventProcessor {
    pointer: Point2d,
    press_origin: Point2d,
    buttons: PressedButtons,
    pressed_at: Option<Instant>,
    clicked_at: Option<Instant>,
    drag: Option<MouseButton>,
}

impl Default for EventProcessor {
    fn default() -> Self {
        Self {
            pointer: Point2d::origin(),
            press_origin: Point2d::origin(),
            buttons: PressedButtons::default(),
            pressed_at: None,
            clicked_at: None,
            drag: None,
        }
    }
}

impl EventProcessor {
    /// Last known pointer position on the screen.
    pub fn pointer_position(&self) -> Point2d {
        self.pointer
    }

    /// Returns true while a drag is in progress.
    pub fn is_dragging(&self) -> bool {
        self.drag.is_some()
    }

    /// Interprets input received at `now`. Map positions are computed with `view`.
    pub fn process(&mut self, input: RawInput, view: &MapView, now: Instant) -> Vec<InputEvent> {
        match input {
            RawInput::ButtonPressed(button) => self.pressed(button, view, now),
            RawInput::ButtonReleased(button) => self.released(button, view, now),
            RawInput::PointerMoved(position) => self.moved(position, view),
            RawInput::Scroll(lines) => vec![InputEvent::Scroll(lines, self.state(view))],
        }
    }

    fn pressed(&mut self, button: MouseButton, view: &MapView, now: Instant) -> Vec<InputEvent> {
        self.buttons.press(button);
        self.pressed_at = Some(now);
        self.press_origin = self.pointer;

        vec![InputEvent::ButtonPressed(button, self.state(view))]
    }

    fn released(&mut self, button: MouseButton, view: &MapView, now: Instant) -> Vec<InputEvent> {
        self.buttons.release(button);
        let state = self.state(view);
        let mut out = vec![InputEvent::ButtonReleased(button, state)];

        if self.drag.take().is_some() {
            out.push(InputEvent::DragEnded(button, state));
        } else if elapsed_below(now, self.pressed_at, CLICK_TIMEOUT) {
            out.push(InputEvent::Click(button, state));
            if elapsed_below(now, self.clicked_at, DOUBLE_CLICK_TIMEOUT) {
                out.push(InputEvent::DoubleClick(button, state));
                self.clicked_at = None;
            } else {
                self.clicked_at = Some(now);
            }
        }

        out
    }

    fn moved(&mut self, position: Point2d, view: &MapView) -> Vec<InputEvent> {
        let previous = std::mem::replace(&mut self.pointer, position);
        let mut out = vec![InputEvent::PointerMoved(self.state(view))];

        let Some(button) = self.buttons.single() else {
            return out;
        };

        if self.drag.is_some() {
            out.push(InputEvent::Drag(
                button,
                self.map_offset(view, previous),
                self.state(view),
            ));
        } else if manhattan(position, self.press_origin) > DRAG_THRESHOLD {
            self.drag = Some(button);
            out.push(InputEvent::DragStarted(
                button,
                self.state_at(view, self.press_origin),
            ));
            out.push(InputEvent::Drag(
                button,
                self.map_offset(view, self.press_origin),
                self.state(view),
            ));
        }

        out
    }

    fn state(&self, view: &MapView) -> PointerState {
        self.state_at(view, self.pointer)
    }

    fn state_at(&self, view: &MapView, screen: Point2d) -> PointerState {
        PointerState {
            screen,
            map: view.screen_to_map(screen),
            buttons: self.buttons,
        }
    }

    fn map_offset(&self, view: &MapView, from: Point2d) -> Vector2<f64> {
        view.screen_to_map(self.pointer) - view.screen_to_map(from)
    }
}

fn elapsed_below(now: Instant, since: Option<Instant>, limit: Duration) -> bool {
    since.is_some_and(|since| now.saturating_duration_since(since) < limit)
}

fn manhattan(a: Point2d, b: Point2d) -> f64 {
    (a.x - b.x).abs() + (a.y - b.y).abs()
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;
    use crate::view::Size;

    fn view() -> MapView {
        MapView::new(Point2d::new(0.0, 0.0), 2.0).with_size(Size::new(100.0, 100.0))
    }

    fn click(processor: &mut EventProcessor, at: Instant) -> Vec<InputEvent> {
        processor.process(RawInput::ButtonPressed(MouseButton::Left), &view(), at);
        processor.process(
            RawInput::ButtonReleased(MouseButton::Left),
            &view(),
            at + Duration::from_millis(50),
        )
    }

    #[test]
    fn quick_release_is_click() {
        let mut processor = EventProcessor::default();
        let now = Instant::now();
        processor.process(RawInput::PointerMoved(Point2d::new(60.0, 50.0)), &view(), now);

        let events = click(&mut processor, now);
        assert_eq!(events.len(), 2);
        assert_matches!(&events[1], InputEvent::Click(MouseButton::Left, e) if (e.map.x - 20.0).abs() < 1e-9);
    }

    #[test]
    fn slow_release_is_not_click() {
        let mut processor = EventProcessor::default();
        let now = Instant::now();
        processor.process(RawInput::ButtonPressed(MouseButton::Left), &view(), now);
        let events = processor.process(
            RawInput::ButtonReleased(MouseButton::Left),
            &view(),
            now + Duration::from_millis(300),
        );
        assert_eq!(events.len(), 1);
    }

    #[test]
    fn second_click_is_double_click() {
        let mut processor = EventProcessor::default();
        let now = Instant::now();
        click(&mut processor, now);
        let events = click(&mut processor, now + Duration::from_millis(200));
        assert_matches!(events.last(), Some(InputEvent::DoubleClick(MouseButton::Left, _)));

        // third click starts over
        let events = click(&mut processor, now + Duration::from_millis(400));
        assert_matches!(events.last(), Some(InputEvent::Click(..)));
    }

    #[test]
    fn drag_past_threshold() {
        let mut processor = EventProcessor::default();
        let now = Instant::now();
        let view = view();
        processor.process(RawInput::PointerMoved(Point2d::new(10.0, 10.0)), &view, now);
        processor.process(RawInput::ButtonPressed(MouseButton::Left), &view, now);

        let events =
            processor.process(RawInput::PointerMoved(Point2d::new(11.0, 11.0)), &view, now);
        assert_eq!(events.len(), 1);

        let events =
            processor.process(RawInput::PointerMoved(Point2d::new(15.0, 10.0)), &view, now);
        assert_matches!(events[1], InputEvent::DragStarted(MouseButton::Left, _));
        assert_matches!(events[2], InputEvent::Drag(MouseButton::Left, delta, _) if (delta.x - 10.0).abs() < 1e-9);
        assert!(processor.is_dragging());

        let events = processor.process(
            RawInput::ButtonReleased(MouseButton::Left),
            &view,
            now + Duration::from_millis(10),
        );
        assert_matches!(events[1], InputEvent::DragEnded(MouseButton::Left, _));
        assert_eq!(events.len(), 2);
        assert!(!processor.is_dragging());
    }
}
