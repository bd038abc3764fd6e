//! The paint-property transition pipeline:
//! [`Transitionable`](set::Transitionable) (mutable store) →
//! [`Transitioning`](set::Transitioning) (timed snapshot) →
//! [`PossiblyEvaluated`](set::PossiblyEvaluated) (zoom/time-resolved).

pub mod set;
pub mod value;

use crate::foundation::error::{PaintboxError, PaintboxResult};

/// Timing of a transition window: how long to wait after a value change
/// before blending starts, and how long the blend runs.
#[derive(Clone, Copy, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TransitionConfig {
    #[serde(default, rename = "delay")]
    pub delay_ms: f64,
    #[serde(default, rename = "duration")]
    pub duration_ms: f64,
}

impl TransitionConfig {
    pub fn new(delay_ms: f64, duration_ms: f64) -> Self {
        Self {
            delay_ms,
            duration_ms,
        }
    }

    /// A zero-width window: value changes apply instantly.
    pub fn is_instant(self) -> bool {
        self.delay_ms == 0.0 && self.duration_ms == 0.0
    }

    pub fn validate(self) -> PaintboxResult<()> {
        if !self.delay_ms.is_finite() || self.delay_ms < 0.0 {
            return Err(PaintboxError::validation(
                "transition delay must be a finite number >= 0",
            ));
        }
        if !self.duration_ms.is_finite() || self.duration_ms < 0.0 {
            return Err(PaintboxError::validation(
                "transition duration must be a finite number >= 0",
            ));
        }
        Ok(())
    }
}

/// A per-property transition override. Fields left unspecified inherit
/// from the global [`TransitionConfig`] at merge time, so
/// `{"duration": 1000}` keeps the global delay.
#[derive(Clone, Copy, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TransitionOverride {
    #[serde(default, rename = "delay", skip_serializing_if = "Option::is_none")]
    pub delay_ms: Option<f64>,
    #[serde(default, rename = "duration", skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<f64>,
}

impl TransitionOverride {
    pub fn delay(ms: f64) -> Self {
        Self {
            delay_ms: Some(ms),
            ..Self::default()
        }
    }

    pub fn duration(ms: f64) -> Self {
        Self {
            duration_ms: Some(ms),
            ..Self::default()
        }
    }

    pub fn new(delay_ms: f64, duration_ms: f64) -> Self {
        Self {
            delay_ms: Some(delay_ms),
            duration_ms: Some(duration_ms),
        }
    }

    /// Field-by-field merge over the global defaults.
    pub fn merge_into(self, base: TransitionConfig) -> TransitionConfig {
        TransitionConfig {
            delay_ms: self.delay_ms.unwrap_or(base.delay_ms),
            duration_ms: self.duration_ms.unwrap_or(base.duration_ms),
        }
    }

    pub fn validate(self) -> PaintboxResult<()> {
        if let Some(delay) = self.delay_ms
            && (!delay.is_finite() || delay < 0.0)
        {
            return Err(PaintboxError::validation(
                "transition delay must be a finite number >= 0",
            ));
        }
        if let Some(duration) = self.duration_ms
            && (!duration.is_finite() || duration < 0.0)
        {
            return Err(PaintboxError::validation(
                "transition duration must be a finite number >= 0",
            ));
        }
        Ok(())
    }
}
