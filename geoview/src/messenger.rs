use maybe_sync::{MaybeSend, MaybeSync};

/// Hook through which the engine asks the host application to repaint the rendering surface.
///
/// Called after a reconcile pass changed render objects, when an overlay changed, and on every
/// visibility toggle of a flashing highlight.
pub trait Messenger: MaybeSend + MaybeSync {
    /// Requests the host to redraw the map.
    fn request_redraw(&self);
}

/// Messenger that does nothing. Used when the host drives redraws itself.
#[derive(Debug, Default, Clone, Copy)]
pub struct DummyMessenger;

impl Messenger for DummyMessenger {
    fn request_redraw(&self) {}
}
