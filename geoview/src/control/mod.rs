//! Pointer input.
//!
//! The host translates whatever its windowing layer reports into [`RawInput`] values and feeds
//! them to the engine. [`EventProcessor`] remembers where the pointer is and which buttons are
//! down, and derives the higher level [`InputEvent`]s from that: clicks, double clicks and drags.
//! Drags and scrolls move the map through the [`MapController`]; clicks go to the active tool.

use nalgebra::Vector2;

use crate::view::Point2d;

mod event_processor;
mod map;

pub use event_processor::EventProcessor;
pub use map::{MapController, MapControllerConfiguration};

/// Input as reported by the host, without any pointer state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RawInput {
    /// A button went down.
    ButtonPressed(MouseButton),
    /// A button went up.
    ButtonReleased(MouseButton),
    /// The pointer is now at this pixel, counted from the top-left corner of the viewport.
    PointerMoved(Point2d),
    /// Wheel or touch pad scroll, in text lines. Positive values zoom out.
    Scroll(f64),
}

/// Input interpreted against the pointer state.
#[derive(Debug, Clone)]
pub enum InputEvent {
    /// See [`RawInput::ButtonPressed`].
    ButtonPressed(MouseButton, PointerState),
    /// See [`RawInput::ButtonReleased`].
    ButtonReleased(MouseButton, PointerState),
    /// Press and release in quick succession with no drag in between.
    Click(MouseButton, PointerState),
    /// Follows the [`InputEvent::Click`] that completed a quick pair of clicks.
    DoubleClick(MouseButton, PointerState),
    /// See [`RawInput::PointerMoved`].
    PointerMoved(PointerState),
    /// A held button travelled past the drag threshold.
    DragStarted(MouseButton, PointerState),
    /// Movement during a drag, in map units.
    Drag(MouseButton, Vector2<f64>, PointerState),
    /// The dragging button went up.
    DragEnded(MouseButton, PointerState),
    /// See [`RawInput::Scroll`].
    Scroll(f64, PointerState),
}

/// Mouse button.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum MouseButton {
    /// Primary.
    Left,
    /// Wheel.
    Middle,
    /// Secondary.
    Right,
    /// Not tracked.
    Other,
}

impl MouseButton {
    fn bit(self) -> u8 {
        match self {
            MouseButton::Left => 0b001,
            MouseButton::Middle => 0b010,
            MouseButton::Right => 0b100,
            MouseButton::Other => 0,
        }
    }
}

/// Where the pointer was and what was held when an [`InputEvent`] happened.
#[derive(Debug, Clone, Copy)]
pub struct PointerState {
    /// Pixel position in the viewport.
    pub screen: Point2d,
    /// The same position in map coordinates.
    pub map: Point2d,
    /// Buttons held down.
    pub buttons: PressedButtons,
}

/// Set of held mouse buttons. [`MouseButton::Other`] is never recorded.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct PressedButtons(u8);

impl PressedButtons {
    /// Returns true if the button is held.
    pub fn contains(&self, button: MouseButton) -> bool {
        let bit = button.bit();
        bit != 0 && self.0 & bit == bit
    }

    /// Returns true if nothing is held.
    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub(crate) fn press(&mut self, button: MouseButton) {
        self.0 |= button.bit();
    }

    pub(crate) fn release(&mut self, button: MouseButton) {
        self.0 &= !button.bit();
    }

    /// The held button, if exactly one is held.
    pub(crate) fn single(&self) -> Option<MouseButton> {
        [MouseButton::Left, MouseButton::Middle, MouseButton::Right]
            .into_iter()
            .find(|button| button.bit() == self.0)
    }
}
