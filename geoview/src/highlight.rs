//! Highlight overlay and feature flashing.

use std::fmt::{Debug, Formatter};
use std::sync::Arc;

use geojson::{Feature, FeatureCollection};
use web_time::{Duration, Instant};

use crate::render::{
    empty_collection, RenderObjectId, RenderObjectSpec, RenderSource, RenderSurface,
};
use crate::style::{PointPaint, RenderStyle, StrokePaint, Style};
use crate::Color;

cfg_if::cfg_if! {
    if #[cfg(target_arch = "wasm32")] {
        /// Called once a flash sequence ends.
        pub type FlashCallback = Box<dyn FnOnce()>;
    } else {
        /// Called once a flash sequence ends.
        pub type FlashCallback = Box<dyn FnOnce() + Send>;
    }
}

struct Flash {
    started: Instant,
    ticks: u32,
    on_done: Option<FlashCallback>,
}

/// Single-feature overlay drawn on top of all layers.
///
/// The overlay object is created once and stays on the surface; it is shown only while it holds
/// a feature. A flash shows the feature, blinks it and clears it, driven by
/// [`update`](Self::update). Any new highlight or flash cancels a running flash without calling
/// its callback.
pub struct HighlightController {
    handle: RenderObjectId,
    feature: Option<Feature>,
    flash: Option<Flash>,
    interval: Duration,
    count: u32,
}

impl Debug for HighlightController {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HighlightController")
            .field("handle", &self.handle)
            .field("feature", &self.feature)
            .field("flashing", &self.flash.is_some())
            .finish()
    }
}

/// Style of highlighted features.
pub fn highlight_style() -> RenderStyle {
    let fill = Color::HIGHLIGHT.with_opacity(0.6);
    let stroke = Color::rgba(255, 0, 0, 255);
    RenderStyle {
        point: Some(PointPaint {
            shape: Default::default(),
            radius: 8.0,
            fill,
            stroke,
            stroke_width: 4.0,
            rotation: 0.0,
        }),
        fill: Some(fill),
        stroke: Some(StrokePaint::solid(stroke, 4.0)),
        text: None,
    }
}

impl HighlightController {
    /// Creates the hidden overlay object on the surface.
    ///
    /// A flash blinks `count` times with `interval` between visibility changes.
    pub fn new(
        surface: &mut impl RenderSurface,
        z_index: i32,
        interval: Duration,
        count: u32,
    ) -> Self {
        let handle = surface.create_object(RenderObjectSpec {
            source: RenderSource::empty_vector(),
            style: Some(Style::Static(Arc::from(vec![highlight_style()]))),
            z_index,
            visible: false,
            opacity: 1.0,
        });

        Self {
            handle,
            feature: None,
            flash: None,
            interval,
            count,
        }
    }

    /// Render object of the overlay.
    pub fn handle(&self) -> RenderObjectId {
        self.handle
    }

    /// Highlighted feature, in the map projection.
    pub fn feature(&self) -> Option<&Feature> {
        self.feature.as_ref()
    }

    /// Returns true while a flash sequence runs.
    pub fn is_flashing(&self) -> bool {
        self.flash.is_some()
    }

    /// Shows the feature, given in the map projection, or hides the overlay if `None`.
    pub fn set_highlight(&mut self, surface: &mut impl RenderSurface, feature: Option<Feature>) {
        if self.flash.take().is_some() {
            log::debug!("Highlight replaced a running flash");
        }
        self.show(surface, feature);
    }

    /// Highlights the feature and starts blinking it. When the sequence ends the highlight is
    /// cleared and `on_done` is called.
    pub fn flash(
        &mut self,
        surface: &mut impl RenderSurface,
        feature: Feature,
        now: Instant,
        on_done: Option<FlashCallback>,
    ) {
        self.set_highlight(surface, Some(feature));
        self.flash = Some(Flash {
            started: now,
            ticks: 0,
            on_done,
        });
    }

    /// Advances a running flash. Returns true if the overlay changed and the map must be
    /// redrawn.
    pub fn update(&mut self, surface: &mut impl RenderSurface, now: Instant) -> bool {
        let Some(flash) = &mut self.flash else {
            return false;
        };

        let elapsed = now.saturating_duration_since(flash.started);
        let due = if self.interval.is_zero() {
            u32::MAX
        } else {
            (elapsed.as_nanos() / self.interval.as_nanos()).min(u32::MAX as u128) as u32
        };

        let last = self.count * 2;
        if due >= last {
            let on_done = flash.on_done.take();
            self.flash = None;
            self.show(surface, None);
            if let Some(on_done) = on_done {
                on_done();
            }
            return true;
        }

        if due == flash.ticks {
            return false;
        }

        // Odd ticks hide the overlay, even ticks show it again.
        flash.ticks = due;
        surface.set_visible(self.handle, due % 2 == 0);
        true
    }

    fn show(&mut self, surface: &mut impl RenderSurface, feature: Option<Feature>) {
        let features = FeatureCollection {
            features: feature.iter().cloned().collect(),
            ..empty_collection()
        };
        surface.set_features(self.handle, Arc::new(features));
        surface.set_visible(self.handle, feature.is_some());
        self.feature = feature;
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::render::MemorySurface;

    fn feature() -> Feature {
        serde_json::from_str(
            r#"{"type": "Feature", "properties": {}, "geometry": {"type": "Point", "coordinates": [1, 2]}}"#,
        )
        .unwrap()
    }

    fn controller(surface: &mut MemorySurface) -> HighlightController {
        HighlightController::new(surface, 9998, Duration::from_millis(200), 3)
    }

    fn visible(surface: &MemorySurface, controller: &HighlightController) -> bool {
        surface.object(controller.handle()).unwrap().visible
    }

    #[test]
    fn overlay_is_hidden_until_highlighted() {
        let mut surface = MemorySurface::new();
        let mut controller = controller(&mut surface);
        let object = surface.object(controller.handle()).unwrap();
        assert!(!object.visible);
        assert_eq!(object.z_index, 9998);

        controller.set_highlight(&mut surface, Some(feature()));
        assert!(visible(&surface, &controller));
        let features = surface.object(controller.handle()).unwrap().features().unwrap();
        assert_eq!(features.features.len(), 1);

        controller.set_highlight(&mut surface, Some(feature()));
        let features = surface.object(controller.handle()).unwrap().features().unwrap();
        assert_eq!(features.features.len(), 1);

        controller.set_highlight(&mut surface, None);
        assert!(!visible(&surface, &controller));
        assert!(controller.feature().is_none());
    }

    #[test]
    fn flash_blinks_then_clears() {
        let mut surface = MemorySurface::new();
        let mut controller = controller(&mut surface);
        let done = Arc::new(AtomicUsize::new(0));
        let counter = done.clone();

        let start = Instant::now();
        controller.flash(
            &mut surface,
            feature(),
            start,
            Some(Box::new(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            })),
        );
        assert!(visible(&surface, &controller));
        assert!(!controller.update(&mut surface, start + Duration::from_millis(100)));

        let mut states = vec![];
        for tick in 1..=5 {
            assert!(controller.update(&mut surface, start + Duration::from_millis(200 * tick)));
            states.push(visible(&surface, &controller));
        }
        assert_eq!(states, [false, true, false, true, false]);
        assert_eq!(done.load(Ordering::SeqCst), 0);

        assert!(controller.update(&mut surface, start + Duration::from_millis(1200)));
        assert!(!visible(&surface, &controller));
        assert!(!controller.is_flashing());
        assert!(controller.feature().is_none());
        assert_eq!(done.load(Ordering::SeqCst), 1);

        assert!(!controller.update(&mut surface, start + Duration::from_millis(5000)));
    }

    #[test]
    fn new_flash_cancels_running_one() {
        let mut surface = MemorySurface::new();
        let mut controller = controller(&mut surface);
        let done = Arc::new(AtomicUsize::new(0));
        let counter = done.clone();

        let start = Instant::now();
        controller.flash(
            &mut surface,
            feature(),
            start,
            Some(Box::new(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            })),
        );
        controller.update(&mut surface, start + Duration::from_millis(200));

        let restart = start + Duration::from_millis(300);
        controller.flash(&mut surface, feature(), restart, None);
        assert!(visible(&surface, &controller));

        controller.update(&mut surface, restart + Duration::from_secs(2));
        assert!(!controller.is_flashing());
        assert_eq!(done.load(Ordering::SeqCst), 0);
    }
}
