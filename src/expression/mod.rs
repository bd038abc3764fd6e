//! A small expression compiler and evaluator for raw style property
//! inputs.
//!
//! Raw inputs are JSON values in a deliberately small function grammar:
//!
//! - a literal of the property's declared type (constant)
//! - `{"stops": [[zoom, out], ...], "base"?}` — zoom function (camera)
//! - `{"property": "name", "default"?}` — feature attribute lookup (source)
//! - `{"property": "name", "stops": [[attr, out], ...], "base"?}` —
//!   feature-value function (source)
//! - `{"property": "name", "stops": [[{"zoom": z, "value": v}, out], ...]}`
//!   — zoom-and-feature function (composite)
//!
//! The compiled [`Expression`] is classified by [`ExpressionKind`]; the
//! transition pipeline only ever branches on that classification.

use smallvec::SmallVec;

use crate::{
    eval::{EvaluationParameters, Feature},
    foundation::error::{PaintboxError, PaintboxResult},
    schema::{PropertySpec, Value},
};

/// Classification of a compiled expression by its inputs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExpressionKind {
    /// No inputs at all.
    Constant,
    /// Zoom only.
    Camera,
    /// Feature only.
    Source,
    /// Zoom and feature.
    Composite,
}

type Stops = SmallVec<[(f64, Value); 4]>;

#[derive(Clone, Debug, PartialEq)]
enum Body {
    Constant(Value),
    CameraStops {
        stops: Stops,
        base: f64,
    },
    SourceGet {
        attribute: String,
        default: Value,
    },
    SourceStops {
        attribute: String,
        stops: Stops,
        base: f64,
        default: Value,
    },
    CompositeStops {
        attribute: String,
        /// Outer key is zoom; inner stops map the feature value.
        zoom_stops: Vec<(f64, Stops)>,
        base: f64,
        default: Value,
    },
}

/// A compiled style property expression.
#[derive(Clone, Debug, PartialEq)]
pub struct Expression {
    kind: ExpressionKind,
    body: Body,
}

impl Expression {
    pub fn constant(value: Value) -> Self {
        Self {
            kind: ExpressionKind::Constant,
            body: Body::Constant(value),
        }
    }

    pub fn kind(&self) -> ExpressionKind {
        self.kind
    }

    pub fn is_data_driven(&self) -> bool {
        matches!(self.kind, ExpressionKind::Source | ExpressionKind::Composite)
    }

    /// Evaluates against global parameters and, for source/composite
    /// expressions, a feature. A missing feature or attribute resolves to
    /// the expression's default.
    pub fn evaluate(
        &self,
        parameters: &EvaluationParameters,
        feature: Option<&Feature>,
    ) -> PaintboxResult<Value> {
        match &self.body {
            Body::Constant(v) => Ok(v.clone()),
            Body::CameraStops { stops, base } => Ok(sample_stops(stops, parameters.zoom, *base)),
            Body::SourceGet { attribute, default } => {
                Ok(match feature.and_then(|f| f.get(attribute)) {
                    Some(v) if !v.is_absent() => v.clone(),
                    _ => default.clone(),
                })
            }
            Body::SourceStops {
                attribute,
                stops,
                base,
                default,
            } => {
                let input = feature
                    .and_then(|f| f.get(attribute))
                    .and_then(Value::as_number);
                Ok(match input {
                    Some(n) => sample_stops(stops, n, *base),
                    None => default.clone(),
                })
            }
            Body::CompositeStops {
                attribute,
                zoom_stops,
                base,
                default,
            } => {
                let input = feature
                    .and_then(|f| f.get(attribute))
                    .and_then(Value::as_number);
                let Some(n) = input else {
                    return Ok(default.clone());
                };
                Ok(sample_composite(zoom_stops, parameters.zoom, n, *base))
            }
        }
    }
}

/// Compiles a raw JSON input against a property's schema record.
///
/// Type errors and data-driven inputs to non-data-driven properties are
/// rejected here, at the mutation boundary; evaluation assumes compiled
/// input.
pub fn compile(raw: &serde_json::Value, spec: &PropertySpec) -> PaintboxResult<Expression> {
    if raw.is_null() {
        return Err(PaintboxError::expression(
            "null is not a value; reset the property instead",
        ));
    }

    if let Some(obj) = raw.as_object()
        && (obj.contains_key("stops") || obj.contains_key("property"))
    {
        return compile_function(obj, spec);
    }

    let value = Value::from_json(raw, spec.value_type)?;
    spec.check(&value)?;
    Ok(Expression::constant(value))
}

fn compile_function(
    obj: &serde_json::Map<String, serde_json::Value>,
    spec: &PropertySpec,
) -> PaintboxResult<Expression> {
    let attribute = match obj.get("property") {
        None => None,
        Some(serde_json::Value::String(s)) => Some(s.clone()),
        Some(other) => {
            return Err(PaintboxError::expression(format!(
                "\"property\" must be a string, got {other}"
            )));
        }
    };

    let base = match obj.get("base") {
        None => 1.0,
        Some(v) => v
            .as_f64()
            .filter(|b| b.is_finite() && *b > 0.0)
            .ok_or_else(|| {
                PaintboxError::expression("\"base\" must be a finite number > 0")
            })?,
    };

    let default = match obj.get("default") {
        None => spec.default.clone(),
        Some(v) => {
            let d = Value::from_json(v, spec.value_type)?;
            spec.check(&d)?;
            d
        }
    };

    let stops_raw = match obj.get("stops") {
        None => {
            // Identity attribute lookup.
            let attribute = attribute.ok_or_else(|| {
                PaintboxError::expression("a function needs \"stops\", \"property\", or both")
            })?;
            let expr = Expression {
                kind: ExpressionKind::Source,
                body: Body::SourceGet { attribute, default },
            };
            return check_data_driven(expr, spec);
        }
        Some(serde_json::Value::Array(a)) if !a.is_empty() => a,
        Some(_) => {
            return Err(PaintboxError::expression(
                "\"stops\" must be a non-empty array of [input, output] pairs",
            ));
        }
    };

    // Composite stops use an object key {"zoom", "value"}; plain numeric
    // keys make a camera or source function depending on "property".
    let composite = stops_raw
        .first()
        .and_then(|s| s.get(0))
        .is_some_and(serde_json::Value::is_object);

    if composite {
        let attribute = attribute.ok_or_else(|| {
            PaintboxError::expression("composite stops require \"property\"")
        })?;
        let zoom_stops = parse_composite_stops(stops_raw, spec)?;
        let expr = Expression {
            kind: ExpressionKind::Composite,
            body: Body::CompositeStops {
                attribute,
                zoom_stops,
                base,
                default,
            },
        };
        return check_data_driven(expr, spec);
    }

    let stops = parse_stops(stops_raw, spec)?;
    match attribute {
        None => Ok(Expression {
            kind: ExpressionKind::Camera,
            body: Body::CameraStops { stops, base },
        }),
        Some(attribute) => {
            let expr = Expression {
                kind: ExpressionKind::Source,
                body: Body::SourceStops {
                    attribute,
                    stops,
                    base,
                    default,
                },
            };
            check_data_driven(expr, spec)
        }
    }
}

fn check_data_driven(expr: Expression, spec: &PropertySpec) -> PaintboxResult<Expression> {
    if expr.is_data_driven() && !spec.data_driven {
        return Err(PaintboxError::expression(
            "this property does not support data-driven (feature-dependent) expressions",
        ));
    }
    Ok(expr)
}

fn parse_stops(raw: &[serde_json::Value], spec: &PropertySpec) -> PaintboxResult<Stops> {
    let mut stops = Stops::new();
    for stop in raw {
        let pair = stop.as_array().filter(|p| p.len() == 2).ok_or_else(|| {
            PaintboxError::expression("each stop must be an [input, output] pair")
        })?;
        let input = pair[0].as_f64().filter(|n| n.is_finite()).ok_or_else(|| {
            PaintboxError::expression("stop inputs must be finite numbers")
        })?;
        let output = Value::from_json(&pair[1], spec.value_type)?;
        spec.check(&output)?;
        stops.push((input, output));
    }
    if !stops.windows(2).all(|w| w[0].0 < w[1].0) {
        return Err(PaintboxError::expression(
            "stop inputs must be strictly increasing",
        ));
    }
    Ok(stops)
}

fn parse_composite_stops(
    raw: &[serde_json::Value],
    spec: &PropertySpec,
) -> PaintboxResult<Vec<(f64, Stops)>> {
    let mut zoom_stops: Vec<(f64, Stops)> = Vec::new();
    for stop in raw {
        let pair = stop.as_array().filter(|p| p.len() == 2).ok_or_else(|| {
            PaintboxError::expression("each stop must be an [input, output] pair")
        })?;
        let key = pair[0].as_object().ok_or_else(|| {
            PaintboxError::expression("composite stop keys must be {\"zoom\", \"value\"} objects")
        })?;
        let zoom = key
            .get("zoom")
            .and_then(serde_json::Value::as_f64)
            .filter(|z| z.is_finite())
            .ok_or_else(|| PaintboxError::expression("composite stop key needs a finite \"zoom\""))?;
        let input = key
            .get("value")
            .and_then(serde_json::Value::as_f64)
            .filter(|v| v.is_finite())
            .ok_or_else(|| {
                PaintboxError::expression("composite stop key needs a finite \"value\"")
            })?;
        let output = Value::from_json(&pair[1], spec.value_type)?;
        spec.check(&output)?;

        let start_new_group = match zoom_stops.last() {
            Some((z, _)) if *z == zoom => false,
            Some((z, _)) if *z > zoom => {
                return Err(PaintboxError::expression(
                    "composite stops must be grouped by non-decreasing zoom",
                ));
            }
            _ => true,
        };
        if start_new_group {
            zoom_stops.push((zoom, Stops::new()));
        }
        if let Some((_, inner)) = zoom_stops.last_mut() {
            inner.push((input, output));
        }
    }
    for (_, inner) in &zoom_stops {
        if !inner.windows(2).all(|w| w[0].0 < w[1].0) {
            return Err(PaintboxError::expression(
                "composite stop values must be strictly increasing within a zoom level",
            ));
        }
    }
    Ok(zoom_stops)
}

/// Exponential interpolation ratio between two stop inputs.
fn interpolation_factor(input: f64, base: f64, lower: f64, upper: f64) -> f64 {
    let diff = upper - lower;
    if diff <= 0.0 {
        return 0.0;
    }
    let progress = input - lower;
    if base == 1.0 {
        progress / diff
    } else {
        (base.powf(progress) - 1.0) / (base.powf(diff) - 1.0)
    }
}

fn sample_stops(stops: &[(f64, Value)], input: f64, base: f64) -> Value {
    debug_assert!(!stops.is_empty(), "compile guarantees non-empty stops");
    let idx = stops.partition_point(|(k, _)| *k <= input);
    if idx == 0 {
        return stops[0].1.clone();
    }
    if idx >= stops.len() {
        return stops[stops.len() - 1].1.clone();
    }

    let (lower, ref a) = stops[idx - 1];
    let (upper, ref b) = stops[idx];
    let t = interpolation_factor(input, base, lower, upper);
    // Non-interpolable types step at the lower stop.
    Value::lerp(a, b, t).unwrap_or_else(|| a.clone())
}

fn sample_composite(zoom_stops: &[(f64, Stops)], zoom: f64, input: f64, base: f64) -> Value {
    debug_assert!(!zoom_stops.is_empty(), "compile guarantees non-empty stops");
    let idx = zoom_stops.partition_point(|(z, _)| *z <= zoom);
    if idx == 0 {
        return sample_stops(&zoom_stops[0].1, input, base);
    }
    if idx >= zoom_stops.len() {
        return sample_stops(&zoom_stops[zoom_stops.len() - 1].1, input, base);
    }

    let (z0, ref s0) = zoom_stops[idx - 1];
    let (z1, ref s1) = zoom_stops[idx];
    let a = sample_stops(s0, input, base);
    let b = sample_stops(s1, input, base);
    let t = interpolation_factor(zoom, 1.0, z0, z1);
    Value::lerp(&a, &b, t).unwrap_or(a)
}
