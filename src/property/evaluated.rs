use std::sync::Arc;

use crate::{
    eval::{EvaluationParameters, Feature},
    expression::Expression,
    foundation::error::PaintboxResult,
    schema::{PropertySpec, Value},
};

/// Discrete pattern blend state across an integer zoom boundary.
#[derive(Clone, Debug, PartialEq)]
pub struct CrossFadeState {
    pub from: Value,
    pub to: Value,
    pub from_scale: f64,
    pub to_scale: f64,
    /// Blend factor in `[0, 1]`; 1 means fully `to`.
    pub t: f64,
}

impl CrossFadeState {
    /// Computes the blend state from the property's values at the three
    /// neighboring integer zooms (`min` = z-1, `mid` = z, `max` = z+1).
    ///
    /// Zooming in blends from the coarser pattern at double scale; zooming
    /// out blends from the finer pattern at half scale. Exactly at an
    /// integer zoom whose boundary was already crossed, the fraction is 0
    /// and the blend factor is 1, so the `to` value shows fully.
    pub fn calculate(min: Value, mid: Value, max: Value, parameters: &EvaluationParameters) -> Self {
        let z = parameters.zoom;
        let fraction = z - z.floor();
        let t = parameters.cross_fading_factor();
        if z > parameters.zoom_history.last_integer_zoom {
            Self {
                from: min,
                to: mid,
                from_scale: 2.0,
                to_scale: 1.0,
                t: fraction + (1.0 - fraction) * t,
            }
        } else {
            Self {
                from: max,
                to: mid,
                from_scale: 0.5,
                to_scale: 1.0,
                t: 1.0 - (1.0 - t) * fraction,
            }
        }
    }
}

/// Payload of a data-driven possibly-evaluated result.
#[derive(Clone, Debug, PartialEq)]
pub enum DataDrivenInner {
    /// Resolved ahead of time; no per-feature work remains.
    Constant(Value),
    /// Feature-dependent; evaluated per feature against captured globals.
    Source(Expression),
    /// Feature- and zoom-dependent; zoom comes from the captured globals.
    Composite(Expression),
}

/// A data-driven property's possibly-evaluated result: the resolved
/// constant or the deferred expression, plus the global parameters
/// captured when it was produced.
///
/// Per-feature evaluation always uses the captured globals — supplying
/// feature-time parameters would silently be ignored for the constant and
/// camera cases, so the API never accepts them. The result is a pure
/// function of (value, captured globals, feature).
#[derive(Clone, Debug, PartialEq)]
pub struct DataDrivenValue {
    spec: Arc<PropertySpec>,
    inner: DataDrivenInner,
    globals: EvaluationParameters,
}

impl DataDrivenValue {
    pub(crate) fn new(
        spec: Arc<PropertySpec>,
        inner: DataDrivenInner,
        globals: EvaluationParameters,
    ) -> Self {
        Self {
            spec,
            inner,
            globals,
        }
    }

    pub fn spec(&self) -> &Arc<PropertySpec> {
        &self.spec
    }

    pub fn inner(&self) -> &DataDrivenInner {
        &self.inner
    }

    pub fn globals(&self) -> &EvaluationParameters {
        &self.globals
    }

    pub fn is_constant(&self) -> bool {
        matches!(self.inner, DataDrivenInner::Constant(_))
    }

    /// The resolved constant, or `fallback` when per-feature evaluation is
    /// still required. Used when building values shared across all
    /// features of a draw call.
    pub fn constant_or(&self, fallback: Value) -> Value {
        match &self.inner {
            DataDrivenInner::Constant(v) => v.clone(),
            _ => fallback,
        }
    }

    /// Final per-feature evaluation, against the captured globals.
    pub fn evaluate(&self, feature: &Feature) -> PaintboxResult<Value> {
        match &self.inner {
            DataDrivenInner::Constant(v) => Ok(v.clone()),
            DataDrivenInner::Source(expr) | DataDrivenInner::Composite(expr) => {
                expr.evaluate(&self.globals, Some(feature))
            }
        }
    }
}

/// The possibly-evaluated result of one property, shaped by its variant.
#[derive(Clone, Debug, PartialEq)]
pub enum EvaluatedValue {
    /// Data-constant properties: a plain scalar.
    Scalar(Value),
    /// Data-driven properties: constant or deferred per-feature work.
    DataDriven(DataDrivenValue),
    /// Cross-faded properties: the blend state, absent when the property
    /// has no value.
    CrossFade(Option<CrossFadeState>),
    /// Color-ramp properties: only whether a ramp is defined.
    Presence(bool),
}

impl EvaluatedValue {
    pub fn as_scalar(&self) -> Option<&Value> {
        match self {
            Self::Scalar(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_data_driven(&self) -> Option<&DataDrivenValue> {
        match self {
            Self::DataDriven(dd) => Some(dd),
            _ => None,
        }
    }

    pub fn as_cross_fade(&self) -> Option<&CrossFadeState> {
        match self {
            Self::CrossFade(state) => state.as_ref(),
            _ => None,
        }
    }

    pub fn is_present(&self) -> bool {
        match self {
            Self::Presence(p) => *p,
            Self::CrossFade(state) => state.is_some(),
            Self::Scalar(v) => !v.is_absent(),
            Self::DataDriven(dd) => !matches!(dd.inner(), DataDrivenInner::Constant(v) if v.is_absent()),
        }
    }

    /// A single constant across the whole draw call, or `fallback`.
    pub fn constant_or(&self, fallback: Value) -> Value {
        match self {
            Self::Scalar(v) => v.clone(),
            Self::DataDriven(dd) => dd.constant_or(fallback),
            _ => fallback,
        }
    }

    /// Per-feature scalar resolution for scalar and data-driven results.
    pub fn evaluate(&self, feature: &Feature) -> PaintboxResult<Value> {
        match self {
            Self::Scalar(v) => Ok(v.clone()),
            Self::DataDriven(dd) => dd.evaluate(feature),
            Self::CrossFade(_) | Self::Presence(_) => Ok(Value::Absent),
        }
    }
}
