//! Paintbox converts raw style-layer property declarations into
//! renderer-ready values, applying smooth timed transitions when a value
//! changes and discrete cross-fading for pattern-like properties.
//!
//! # Pipeline overview
//!
//! 1. **Edit**: `Transitionable` is the per-layer mutable store; raw
//!    inputs are compiled and type-checked at this boundary.
//! 2. **Snapshot**: `Transitionable::transitioned` opens per-property
//!    transition windows, producing an immutable `Transitioning` set.
//! 3. **Resolve**: `Transitioning::possibly_evaluate` collapses zoom and
//!    clock inputs into a `PossiblyEvaluated` set, deferring only true
//!    per-feature work.
//! 4. **Per feature**: `EvaluatedValue::evaluate(feature)` resolves
//!    data-driven results against the globals captured in step 3.
//!
//! The key design constraints:
//!
//! - **No unsafe**: `unsafe` is forbidden in this crate.
//! - **No invalid numerics**: evaluation never emits NaN or an undefined
//!   blend into the render loop, including at zero-width windows.
//! - **One-way time**: a transition that has settled can never resume;
//!   callers pass non-decreasing `now` values.
//! - **Feature purity**: per-feature results are a pure function of
//!   (value, captured globals, feature).
#![forbid(unsafe_code)]

mod eval;
mod expression;
mod foundation;
mod layer;
mod property;
mod schema;
mod transition;

pub use eval::{EvaluationParameters, Feature, TimePoint, TransitionParameters, ZoomHistory};
pub use expression::{Expression, ExpressionKind, compile};
pub use foundation::color::Color;
pub use foundation::ease::ease_cubic_in_out;
pub use foundation::error::{PaintboxError, PaintboxResult};
pub use layer::{Layout, StyleLayer, Visibility};
pub use property::evaluated::{
    CrossFadeState, DataDrivenInner, DataDrivenValue, EvaluatedValue,
};
pub use property::registry::Properties;
pub use property::value::{PropertyValue, interpolate};
pub use schema::{PropertyKind, PropertySpec, Value, ValueType};
pub use transition::{TransitionConfig, TransitionOverride};
pub use transition::set::{PossiblyEvaluated, Transitionable, Transitioning};
pub use transition::value::{TransitionPhase, TransitionablePropertyValue, TransitioningValue};
