//! Global evaluation context: the animation clock, camera zoom, zoom
//! history for cross-fading, and per-feature input.

use std::collections::BTreeMap;

use crate::{schema::Value, transition::TransitionConfig};

/// A point on the animation clock, in milliseconds. The clock starts at 0
/// and callers must only move it forward.
#[derive(Clone, Copy, Debug, Default, PartialEq, PartialOrd, serde::Serialize, serde::Deserialize)]
pub struct TimePoint(pub f64);

impl TimePoint {
    pub fn offset_ms(self, ms: f64) -> Self {
        Self(self.0 + ms)
    }
}

/// Tracks integer zoom boundary crossings, which drive pattern
/// cross-fading.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ZoomHistory {
    pub last_zoom: f64,
    pub last_integer_zoom: f64,
    pub last_integer_zoom_time: TimePoint,
    first: bool,
}

impl Default for ZoomHistory {
    fn default() -> Self {
        Self {
            last_zoom: 0.0,
            last_integer_zoom: 0.0,
            last_integer_zoom_time: TimePoint(0.0),
            first: true,
        }
    }
}

impl ZoomHistory {
    /// Records a camera zoom observed at `now`. Returns true when any
    /// tracked field changed.
    pub fn update(&mut self, zoom: f64, now: TimePoint) -> bool {
        if self.first {
            self.first = false;
            self.last_integer_zoom = zoom.floor();
            self.last_integer_zoom_time = TimePoint(0.0);
            self.last_zoom = zoom;
            return true;
        }

        let mut changed = false;
        if self.last_zoom.floor() < zoom.floor() {
            // Crossed upward: the boundary just left behind is floor(zoom).
            self.last_integer_zoom = zoom.floor();
            self.last_integer_zoom_time = now;
            changed = true;
        } else if self.last_zoom.floor() > zoom.floor() {
            // Crossed downward: the boundary is the one above the new zoom.
            self.last_integer_zoom = zoom.floor() + 1.0;
            self.last_integer_zoom_time = now;
            changed = true;
        }
        if self.last_zoom != zoom {
            self.last_zoom = zoom;
            changed = true;
        }
        changed
    }
}

/// Feature-independent evaluation context. Captured by data-driven
/// results at possibly-evaluate time; per-feature evaluation always uses
/// the captured copy.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct EvaluationParameters {
    pub zoom: f64,
    pub now: TimePoint,
    /// Duration of the pattern cross-fade animation. 0 disables fading
    /// (the blend factor is then always 1).
    pub fade_duration_ms: f64,
    pub zoom_history: ZoomHistory,
}

impl EvaluationParameters {
    pub fn new(zoom: f64) -> Self {
        Self {
            zoom,
            ..Self::default()
        }
    }

    pub fn with_now(mut self, now: TimePoint) -> Self {
        self.now = now;
        self
    }

    /// Progress of the cross-fade animation since the last integer zoom
    /// crossing, in `[0, 1]`.
    pub fn cross_fading_factor(&self) -> f64 {
        if self.fade_duration_ms == 0.0 {
            1.0
        } else {
            ((self.now.0 - self.zoom_history.last_integer_zoom_time.0) / self.fade_duration_ms)
                .min(1.0)
                .max(0.0)
        }
    }

    /// The same context with the zoom replaced, used when sampling an
    /// expression at neighboring integer zoom levels.
    pub fn at_zoom(&self, zoom: f64) -> Self {
        let mut p = self.clone();
        p.zoom = zoom;
        p
    }
}

/// Context for recomputing transition windows: the clock plus the global
/// transition defaults that per-property overrides merge against.
#[derive(Clone, Copy, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TransitionParameters {
    pub now: TimePoint,
    pub transition: TransitionConfig,
}

/// A single rendered feature's attributes, as seen by source and
/// composite expressions.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Feature {
    pub id: Option<u64>,
    pub attributes: BTreeMap<String, Value>,
}

impl Feature {
    pub fn new(attributes: impl IntoIterator<Item = (String, Value)>) -> Self {
        Self {
            id: None,
            attributes: attributes.into_iter().collect(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.attributes.get(name)
    }
}
