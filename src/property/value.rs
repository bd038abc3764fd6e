use std::sync::Arc;

use crate::{
    eval::EvaluationParameters,
    expression::{self, Expression, ExpressionKind},
    foundation::error::PaintboxResult,
    property::evaluated::{CrossFadeState, DataDrivenInner, DataDrivenValue, EvaluatedValue},
    schema::{PropertyKind, PropertySpec, Value},
};

/// The value half of a property key-value unit: the raw style input (or
/// absence, meaning the schema default) plus its compiled expression.
///
/// Immutable once constructed; a new raw input produces a new
/// `PropertyValue`, never an in-place mutation.
#[derive(Clone, Debug, PartialEq)]
pub struct PropertyValue {
    spec: Arc<PropertySpec>,
    raw: Option<serde_json::Value>,
    expression: Expression,
}

impl PropertyValue {
    pub fn new(spec: Arc<PropertySpec>, raw: Option<serde_json::Value>) -> PaintboxResult<Self> {
        let expression = match &raw {
            None => Expression::constant(spec.default.clone()),
            Some(json) => expression::compile(json, &spec)?,
        };
        Ok(Self {
            spec,
            raw,
            expression,
        })
    }

    pub fn spec(&self) -> &Arc<PropertySpec> {
        &self.spec
    }

    pub fn raw(&self) -> Option<&serde_json::Value> {
        self.raw.as_ref()
    }

    pub fn expression(&self) -> &Expression {
        &self.expression
    }

    pub fn is_data_driven(&self) -> bool {
        self.expression.is_data_driven()
    }

    /// Resolves everything that does not need a feature, dispatched by the
    /// property's variant.
    pub fn possibly_evaluate(
        &self,
        parameters: &EvaluationParameters,
    ) -> PaintboxResult<EvaluatedValue> {
        match self.spec.kind {
            PropertyKind::DataConstant => {
                assert!(
                    !self.is_data_driven(),
                    "data-driven expression reached a data-constant property; \
                     upstream compilation must reject this"
                );
                let v = self.expression.evaluate(parameters, None)?;
                Ok(EvaluatedValue::Scalar(v))
            }
            PropertyKind::DataDriven => match self.expression.kind() {
                ExpressionKind::Constant | ExpressionKind::Camera => {
                    let v = self.expression.evaluate(parameters, None)?;
                    Ok(EvaluatedValue::DataDriven(DataDrivenValue::new(
                        Arc::clone(&self.spec),
                        DataDrivenInner::Constant(v),
                        parameters.clone(),
                    )))
                }
                ExpressionKind::Source => Ok(EvaluatedValue::DataDriven(DataDrivenValue::new(
                    Arc::clone(&self.spec),
                    DataDrivenInner::Source(self.expression.clone()),
                    parameters.clone(),
                ))),
                ExpressionKind::Composite => Ok(EvaluatedValue::DataDriven(DataDrivenValue::new(
                    Arc::clone(&self.spec),
                    DataDrivenInner::Composite(self.expression.clone()),
                    parameters.clone(),
                ))),
            },
            PropertyKind::CrossFaded => {
                assert!(
                    !self.is_data_driven(),
                    "data-driven expression reached a cross-faded property; \
                     upstream compilation must reject this"
                );
                if self.expression.kind() == ExpressionKind::Constant {
                    let c = self.expression.evaluate(parameters, None)?;
                    if c.is_absent() {
                        return Ok(EvaluatedValue::CrossFade(None));
                    }
                    return Ok(EvaluatedValue::CrossFade(Some(CrossFadeState::calculate(
                        c.clone(),
                        c.clone(),
                        c,
                        parameters,
                    ))));
                }
                let min = self
                    .expression
                    .evaluate(&parameters.at_zoom((parameters.zoom - 1.0).floor()), None)?;
                let mid = self
                    .expression
                    .evaluate(&parameters.at_zoom(parameters.zoom.floor()), None)?;
                let max = self
                    .expression
                    .evaluate(&parameters.at_zoom((parameters.zoom + 1.0).floor()), None)?;
                Ok(EvaluatedValue::CrossFade(Some(CrossFadeState::calculate(
                    min, mid, max, parameters,
                ))))
            }
            PropertyKind::ColorRamp => {
                let v = self.expression.evaluate(parameters, None)?;
                Ok(EvaluatedValue::Presence(v.is_truthy()))
            }
        }
    }
}

/// Blends two possibly-evaluated results of the same property, dispatched
/// by variant.
///
/// Data-driven results only blend when both sides resolved to constants;
/// otherwise the transition degrades to a hard cut (the state machine
/// snaps). The absent sentinel never blends against a concrete value.
/// Cross-faded results carry their own blend and must not be
/// double-interpolated, so they pass through unchanged.
pub fn interpolate(
    spec: &PropertySpec,
    a: &EvaluatedValue,
    b: &EvaluatedValue,
    t: f64,
) -> EvaluatedValue {
    match spec.kind {
        PropertyKind::DataConstant => match (a, b) {
            (EvaluatedValue::Scalar(x), EvaluatedValue::Scalar(y)) => {
                match Value::lerp(x, y, t) {
                    Some(v) => EvaluatedValue::Scalar(v),
                    None => a.clone(),
                }
            }
            _ => a.clone(),
        },
        PropertyKind::DataDriven => match (a, b) {
            (EvaluatedValue::DataDriven(x), EvaluatedValue::DataDriven(y)) => {
                let (DataDrivenInner::Constant(xv), DataDrivenInner::Constant(yv)) =
                    (x.inner(), y.inner())
                else {
                    return a.clone();
                };
                if xv.is_absent() || yv.is_absent() {
                    return EvaluatedValue::DataDriven(DataDrivenValue::new(
                        Arc::clone(x.spec()),
                        DataDrivenInner::Constant(Value::Absent),
                        x.globals().clone(),
                    ));
                }
                match Value::lerp(xv, yv, t) {
                    Some(v) => EvaluatedValue::DataDriven(DataDrivenValue::new(
                        Arc::clone(x.spec()),
                        DataDrivenInner::Constant(v),
                        x.globals().clone(),
                    )),
                    None => a.clone(),
                }
            }
            _ => a.clone(),
        },
        PropertyKind::CrossFaded => a.clone(),
        PropertyKind::ColorRamp => EvaluatedValue::Presence(false),
    }
}
