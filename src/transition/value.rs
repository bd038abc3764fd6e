use crate::{
    eval::{EvaluationParameters, TimePoint, TransitionParameters},
    foundation::{ease::ease_cubic_in_out, error::PaintboxResult},
    property::{
        evaluated::EvaluatedValue,
        value::{PropertyValue, interpolate},
    },
    transition::TransitionOverride,
};

/// One property's entry in the mutable transitionable store: the current
/// value plus an optional per-property transition override.
#[derive(Clone, Debug, PartialEq)]
pub struct TransitionablePropertyValue {
    pub value: PropertyValue,
    pub transition: Option<TransitionOverride>,
}

impl TransitionablePropertyValue {
    pub fn new(value: PropertyValue) -> Self {
        Self {
            value,
            transition: None,
        }
    }

    /// Opens a transition window at `now` from `prior` toward the current
    /// value. The per-property override merges field-by-field over the
    /// global config, so a bare duration override inherits the global
    /// delay. The prior is retained only if the schema permits transition
    /// and the merged config has a nonzero window; otherwise the entry
    /// starts settled, so non-transitionable properties never carry dead
    /// transition state.
    pub fn transitioned(
        &self,
        parameters: &TransitionParameters,
        prior: Option<TransitioningValue>,
    ) -> TransitioningValue {
        let config = self
            .transition
            .unwrap_or_default()
            .merge_into(parameters.transition);
        let begin = parameters.now.offset_ms(config.delay_ms);
        let end = begin.offset_ms(config.duration_ms);

        let phase = match prior {
            Some(prior) if self.value.spec().transition && !config.is_instant() => {
                TransitionPhase::Transitioning {
                    prior: Box::new(prior),
                    begin,
                    end,
                }
            }
            _ => TransitionPhase::Settled,
        };
        TransitioningValue {
            value: self.value.clone(),
            phase,
        }
    }

    /// A settled snapshot with a zero-width window, used once at initial
    /// construction so no phantom transition can fire before the first
    /// real edit.
    pub fn untransitioned(&self) -> TransitioningValue {
        TransitioningValue {
            value: self.value.clone(),
            phase: TransitionPhase::Settled,
        }
    }
}

/// Per-key transition state. `Settled` is terminal for a given window:
/// once the prior is dropped it can never be restored.
#[derive(Clone, Debug, PartialEq)]
pub enum TransitionPhase {
    Settled,
    Transitioning {
        prior: Box<TransitioningValue>,
        begin: TimePoint,
        end: TimePoint,
    },
}

/// One property's entry in a timed snapshot: the target value plus the
/// transition phase. The phase collapse in [`Self::possibly_evaluate`] is
/// the only mutation in the whole pipeline.
#[derive(Clone, Debug, PartialEq)]
pub struct TransitioningValue {
    value: PropertyValue,
    phase: TransitionPhase,
}

impl TransitioningValue {
    pub fn value(&self) -> &PropertyValue {
        &self.value
    }

    pub fn is_transitioning(&self) -> bool {
        matches!(self.phase, TransitionPhase::Transitioning { .. })
    }

    /// Resolves this entry at `parameters.now`, blending against the prior
    /// while the window is open.
    ///
    /// Data-driven targets snap immediately: per-feature values cannot be
    /// pixel-blended against a single prior constant, and layout needs to
    /// see the data-driven result to populate vertex buffers.
    pub fn possibly_evaluate(
        &mut self,
        parameters: &EvaluationParameters,
    ) -> PaintboxResult<EvaluatedValue> {
        let now = parameters.now;
        let final_value = self.value.possibly_evaluate(parameters)?;

        let TransitionPhase::Transitioning { prior, begin, end } = &mut self.phase else {
            return Ok(final_value);
        };
        let (begin, end) = (*begin, *end);

        if now.0 > end.0 {
            tracing::trace!(now = now.0, end = end.0, "transition complete; settling");
            self.phase = TransitionPhase::Settled;
            return Ok(final_value);
        }

        if self.value.is_data_driven() {
            tracing::trace!("data-driven target; snapping without a blend");
            self.phase = TransitionPhase::Settled;
            return Ok(final_value);
        }

        if now.0 < begin.0 {
            // Window not yet open; the prior may itself still be
            // mid-transition.
            return prior.possibly_evaluate(parameters);
        }

        if end.0 <= begin.0 {
            // Zero-width window: jump the instant now reaches begin.
            self.phase = TransitionPhase::Settled;
            return Ok(final_value);
        }

        let t_raw = (now.0 - begin.0) / (end.0 - begin.0);
        let prior_value = prior.possibly_evaluate(parameters)?;
        Ok(interpolate(
            self.value.spec(),
            &prior_value,
            &final_value,
            ease_cubic_in_out(t_raw),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        property::registry::Properties,
        schema::{PropertySpec, Value, ValueType},
        transition::TransitionConfig,
    };
    use serde_json::json;
    use std::sync::Arc;

    fn opacity_entry(raw: f64) -> TransitionablePropertyValue {
        let spec = Arc::new(PropertySpec::data_constant(
            ValueType::Number,
            Value::Number(1.0),
            true,
        ));
        TransitionablePropertyValue::new(
            PropertyValue::new(spec, Some(json!(raw))).unwrap(),
        )
    }

    fn eval_at(tv: &mut TransitioningValue, now: f64) -> Value {
        let params = EvaluationParameters::new(0.0).with_now(TimePoint(now));
        tv.possibly_evaluate(&params)
            .unwrap()
            .as_scalar()
            .cloned()
            .unwrap()
    }

    #[test]
    fn non_transitionable_spec_never_enters_transitioning() {
        let spec = Arc::new(PropertySpec::data_constant(
            ValueType::Number,
            Value::Number(1.0),
            false,
        ));
        let entry = TransitionablePropertyValue::new(
            PropertyValue::new(Arc::clone(&spec), Some(json!(0.0))).unwrap(),
        );
        let prior = entry.untransitioned();
        let params = TransitionParameters {
            now: TimePoint(0.0),
            transition: TransitionConfig::new(0.0, 1000.0),
        };
        let tv = entry.transitioned(&params, Some(prior));
        assert!(!tv.is_transitioning());
    }

    #[test]
    fn instant_config_never_enters_transitioning() {
        let entry = opacity_entry(0.0);
        let prior = opacity_entry(1.0).untransitioned();
        let params = TransitionParameters::default();
        let tv = entry.transitioned(&params, Some(prior));
        assert!(!tv.is_transitioning());
        let mut tv = tv;
        // Never NaN, at any clock value.
        for now in [0.0, 0.5, 1.0, 1e9] {
            assert_eq!(eval_at(&mut tv, now), Value::Number(0.0));
        }
    }

    #[test]
    fn midpoint_blend_uses_the_cubic_curve() {
        let entry = opacity_entry(0.0);
        let prior = opacity_entry(1.0).untransitioned();
        let params = TransitionParameters {
            now: TimePoint(0.0),
            transition: TransitionConfig::new(0.0, 1000.0),
        };
        let mut tv = entry.transitioned(&params, Some(prior));

        assert_eq!(eval_at(&mut tv, 0.0), Value::Number(1.0));
        // ease(0.5) == 0.5, blending 1.0 -> 0.0.
        assert_eq!(eval_at(&mut tv, 500.0), Value::Number(0.5));
        assert_eq!(eval_at(&mut tv, 1000.0), Value::Number(0.0));
        assert!(tv.is_transitioning());
        assert_eq!(eval_at(&mut tv, 1001.0), Value::Number(0.0));
        assert!(!tv.is_transitioning());
    }

    #[test]
    fn partial_duration_override_inherits_the_global_delay() {
        let mut entry = opacity_entry(0.0);
        entry.transition = Some(TransitionOverride::duration(1000.0));
        let prior = opacity_entry(1.0).untransitioned();
        let params = TransitionParameters {
            now: TimePoint(0.0),
            transition: TransitionConfig::new(500.0, 300.0),
        };
        let mut tv = entry.transitioned(&params, Some(prior));

        // The global 500 ms delay still holds the prior value.
        assert_eq!(eval_at(&mut tv, 100.0), Value::Number(1.0));
        assert_eq!(eval_at(&mut tv, 499.0), Value::Number(1.0));
        // Overridden duration: window is [500, 1500], midpoint at 1000.
        assert_eq!(eval_at(&mut tv, 1000.0), Value::Number(0.5));
        assert_eq!(eval_at(&mut tv, 1501.0), Value::Number(0.0));
    }

    #[test]
    fn delay_holds_the_prior_value() {
        let entry = opacity_entry(0.0);
        let prior = opacity_entry(1.0).untransitioned();
        let params = TransitionParameters {
            now: TimePoint(0.0),
            transition: TransitionConfig::new(200.0, 100.0),
        };
        let mut tv = entry.transitioned(&params, Some(prior));
        assert_eq!(eval_at(&mut tv, 100.0), Value::Number(1.0));
        assert_eq!(eval_at(&mut tv, 250.0), Value::Number(0.5));
        assert_eq!(eval_at(&mut tv, 301.0), Value::Number(0.0));
    }

    #[test]
    fn zero_duration_with_delay_jumps_without_dividing() {
        let entry = opacity_entry(0.0);
        let prior = opacity_entry(1.0).untransitioned();
        let params = TransitionParameters {
            now: TimePoint(0.0),
            transition: TransitionConfig::new(500.0, 0.0),
        };
        let mut tv = entry.transitioned(&params, Some(prior));
        assert!(tv.is_transitioning());
        assert_eq!(eval_at(&mut tv, 100.0), Value::Number(1.0));
        // Exactly at begin == end: immediate jump, no NaN.
        assert_eq!(eval_at(&mut tv, 500.0), Value::Number(0.0));
        assert!(!tv.is_transitioning());
    }

    #[test]
    fn data_driven_target_snaps_on_first_evaluation() {
        let props = Properties::new([(
            "circle-radius",
            PropertySpec::data_driven(ValueType::Number, Value::Number(5.0), true),
        )])
        .unwrap();
        let spec = Arc::clone(props.spec("circle-radius").unwrap());
        let prior = TransitionablePropertyValue::new(
            PropertyValue::new(Arc::clone(&spec), Some(json!(2.0))).unwrap(),
        )
        .untransitioned();
        let entry = TransitionablePropertyValue::new(
            PropertyValue::new(spec, Some(json!({"property": "r"}))).unwrap(),
        );
        let params = TransitionParameters {
            now: TimePoint(0.0),
            transition: TransitionConfig::new(0.0, 10_000.0),
        };
        let mut tv = entry.transitioned(&params, Some(prior));
        assert!(tv.is_transitioning());

        // Deep inside the window the prior is still dropped immediately.
        let r = tv
            .possibly_evaluate(&EvaluationParameters::new(0.0).with_now(TimePoint(1.0)))
            .unwrap();
        assert!(!tv.is_transitioning());
        assert!(!r.as_data_driven().unwrap().is_constant());
    }

    #[test]
    fn chained_priors_resolve_recursively() {
        // 1.0 -> 0.5 (still running) -> 0.0: before the outer window opens
        // the inner transition keeps blending.
        let params = TransitionParameters {
            now: TimePoint(0.0),
            transition: TransitionConfig::new(0.0, 1000.0),
        };
        let inner = opacity_entry(0.5)
            .transitioned(&params, Some(opacity_entry(1.0).untransitioned()));

        let outer_params = TransitionParameters {
            now: TimePoint(500.0),
            transition: TransitionConfig::new(300.0, 1000.0),
        };
        let mut outer = opacity_entry(0.0).transitioned(&outer_params, Some(inner));

        // Outer window opens at 800; at 700 the inner blend (1.0 -> 0.5)
        // is still in charge and past its midpoint.
        let v = eval_at(&mut outer, 700.0);
        let Value::Number(n) = v else { panic!("expected a number") };
        assert!(n < 1.0 && n > 0.5);
    }
}
