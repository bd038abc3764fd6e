use std::sync::Arc;

use paintbox::{
    EvaluationParameters, Feature, Properties, PropertySpec, TimePoint, TransitionConfig,
    TransitionOverride, TransitionParameters, Transitionable, Value, ValueType,
};
use serde_json::json;

fn paint_properties() -> Arc<Properties> {
    Arc::new(
        Properties::new([
            (
                "fill-opacity",
                PropertySpec::data_constant(ValueType::Number, Value::Number(1.0), true),
            ),
            (
                "circle-radius",
                PropertySpec::data_driven(ValueType::Number, Value::Number(5.0), true),
            ),
            (
                "fill-antialias",
                PropertySpec::data_constant(ValueType::Boolean, Value::Bool(true), false),
            ),
        ])
        .unwrap(),
    )
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::TRACE)
        .try_init();
}

fn params(now: f64) -> EvaluationParameters {
    EvaluationParameters::new(0.0).with_now(TimePoint(now))
}

fn scalar_number(set: &paintbox::PossiblyEvaluated, name: &str) -> f64 {
    set.get(name)
        .unwrap()
        .as_scalar()
        .unwrap()
        .as_number()
        .unwrap()
}

#[test]
fn opacity_transition_scenario() {
    init_tracing();

    // Default 1.0, set to 0.0 at now=0 with a 1000 ms duration.
    let mut t = Transitionable::new(paint_properties());
    t.set_transition("fill-opacity", Some(TransitionOverride::new(0.0, 1000.0)))
        .unwrap();

    let prior = t.untransitioned();
    t.set_value("fill-opacity", Some(json!(0.0))).unwrap();

    let tp = TransitionParameters {
        now: TimePoint(0.0),
        transition: TransitionConfig::default(),
    };
    let mut snapshot = t.transitioned(&tp, &prior);
    assert!(snapshot.has_transition());

    let at_start = snapshot.possibly_evaluate(&params(0.0)).unwrap();
    assert_eq!(scalar_number(&at_start, "fill-opacity"), 1.0);

    // The cubic ease-in-out curve is symmetric at the midpoint.
    let at_mid = snapshot.possibly_evaluate(&params(500.0)).unwrap();
    assert_eq!(scalar_number(&at_mid, "fill-opacity"), 0.5);

    let at_end = snapshot.possibly_evaluate(&params(1000.0)).unwrap();
    assert_eq!(scalar_number(&at_end, "fill-opacity"), 0.0);

    // Past the window the prior is gone for good.
    snapshot.possibly_evaluate(&params(1001.0)).unwrap();
    assert!(!snapshot.has_transition());
    let later = snapshot.possibly_evaluate(&params(2000.0)).unwrap();
    assert_eq!(scalar_number(&later, "fill-opacity"), 0.0);
}

#[test]
fn numeric_transitions_converge_monotonically() {
    let mut t = Transitionable::new(paint_properties());
    let prior = t.untransitioned();
    t.set_value("fill-opacity", Some(json!(0.0))).unwrap();

    let tp = TransitionParameters {
        now: TimePoint(0.0),
        transition: TransitionConfig::new(0.0, 800.0),
    };
    let mut snapshot = t.transitioned(&tp, &prior);

    let mut last = f64::INFINITY;
    for now in [0.0, 200.0, 400.0, 600.0, 800.0] {
        let set = snapshot.possibly_evaluate(&params(now)).unwrap();
        let v = scalar_number(&set, "fill-opacity");
        assert!(v.is_finite());
        assert!(v <= last, "expected convergence toward 0.0, got {v} after {last}");
        last = v;
    }
    assert_eq!(last, 0.0);
}

#[test]
fn instant_config_never_produces_nan() {
    let mut t = Transitionable::new(paint_properties());
    let prior = t.untransitioned();
    t.set_value("fill-opacity", Some(json!(0.25))).unwrap();

    let tp = TransitionParameters::default();
    let mut snapshot = t.transitioned(&tp, &prior);
    assert!(!snapshot.has_transition());

    for now in [0.0, 1.0, 16.6, 1e12] {
        let set = snapshot.possibly_evaluate(&params(now)).unwrap();
        assert_eq!(scalar_number(&set, "fill-opacity"), 0.25);
    }
}

#[test]
fn transition_disabled_properties_always_snap() {
    let mut t = Transitionable::new(paint_properties());
    let prior = t.untransitioned();
    t.set_value("fill-antialias", Some(json!(false))).unwrap();

    // Even with a global default transition in force.
    let tp = TransitionParameters {
        now: TimePoint(0.0),
        transition: TransitionConfig::new(100.0, 1000.0),
    };
    let mut snapshot = t.transitioned(&tp, &prior);
    assert!(!snapshot.has_transition());

    let set = snapshot.possibly_evaluate(&params(0.0)).unwrap();
    assert_eq!(
        set.get("fill-antialias").unwrap().as_scalar(),
        Some(&Value::Bool(false))
    );
}

#[test]
fn data_driven_target_drops_prior_immediately() {
    init_tracing();

    let mut t = Transitionable::new(paint_properties());
    t.set_value("circle-radius", Some(json!(2.0))).unwrap();
    let prior = t.untransitioned();
    t.set_value("circle-radius", Some(json!({"property": "r"})))
        .unwrap();

    let tp = TransitionParameters {
        now: TimePoint(0.0),
        transition: TransitionConfig::new(0.0, 60_000.0),
    };
    let mut snapshot = t.transitioned(&tp, &prior);
    assert!(snapshot.has_transition());

    // First evaluation, far inside the window.
    let set = snapshot.possibly_evaluate(&params(10.0)).unwrap();
    assert!(!snapshot.has_transition());

    let dd = set.get("circle-radius").unwrap().as_data_driven().unwrap();
    assert!(!dd.is_constant());
    let feature = Feature::new([("r".to_owned(), Value::Number(7.5))]);
    assert_eq!(dd.evaluate(&feature).unwrap(), Value::Number(7.5));
}

#[test]
fn captured_globals_drive_deferred_evaluation() {
    let mut t = Transitionable::new(paint_properties());
    t.set_value(
        "circle-radius",
        Some(json!({"property": "depth", "stops": [[0, 0.0], [100, 10.0]]})),
    )
    .unwrap();

    let mut snapshot = t.untransitioned();
    let captured = EvaluationParameters::new(8.0).with_now(TimePoint(123.0));
    let set = snapshot.possibly_evaluate(&captured).unwrap();
    let dd = set.get("circle-radius").unwrap().as_data_driven().unwrap();
    assert_eq!(dd.globals(), &captured);

    let feature = Feature::new([("depth".to_owned(), Value::Number(50.0))]);
    assert_eq!(dd.evaluate(&feature).unwrap(), Value::Number(5.0));
    // Shared draw-call value falls back for non-constant results.
    assert_eq!(dd.constant_or(Value::Number(5.0)), Value::Number(5.0));
}

#[test]
fn retargeting_mid_transition_chains_priors() {
    // 1.0 -> 0.0 retargeted to 1.0 halfway: the value must come back up
    // smoothly, never jumping.
    let mut t = Transitionable::new(paint_properties());
    let prior = t.untransitioned();
    t.set_value("fill-opacity", Some(json!(0.0))).unwrap();

    let tp = TransitionParameters {
        now: TimePoint(0.0),
        transition: TransitionConfig::new(0.0, 1000.0),
    };
    let mut first = t.transitioned(&tp, &prior);
    let halfway = first.possibly_evaluate(&params(500.0)).unwrap();
    assert_eq!(scalar_number(&halfway, "fill-opacity"), 0.5);

    t.set_value("fill-opacity", Some(json!(1.0))).unwrap();
    let tp2 = TransitionParameters {
        now: TimePoint(500.0),
        transition: TransitionConfig::new(0.0, 1000.0),
    };
    let mut second = t.transitioned(&tp2, &first);

    let v750 = {
        let set = second.possibly_evaluate(&params(750.0)).unwrap();
        scalar_number(&set, "fill-opacity")
    };
    let v1500 = {
        let set = second.possibly_evaluate(&params(1500.0)).unwrap();
        scalar_number(&set, "fill-opacity")
    };
    assert!(v750 > 0.0 && v750 < 1.0);
    assert_eq!(v1500, 1.0);
}
