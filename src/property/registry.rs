use std::{collections::BTreeMap, sync::Arc};

use crate::{
    eval::EvaluationParameters,
    foundation::error::{PaintboxError, PaintboxResult},
    property::{evaluated::EvaluatedValue, value::PropertyValue},
    schema::PropertySpec,
};

/// The immutable default table shared by every per-layer property set.
///
/// Per-layer sets store only explicit overrides and fall back here for
/// everything else, so an unset property never pays per-frame transition
/// or evaluation work. Default possibly-evaluated results are computed
/// once, at table construction, with default global parameters — which is
/// sound because defaults compile to constant expressions.
#[derive(Clone, Debug)]
pub struct Properties {
    specs: BTreeMap<String, Arc<PropertySpec>>,
    default_values: BTreeMap<String, PropertyValue>,
    default_evaluated: BTreeMap<String, EvaluatedValue>,
}

impl Properties {
    pub fn new(
        specs: impl IntoIterator<Item = (impl Into<String>, PropertySpec)>,
    ) -> PaintboxResult<Self> {
        let specs: BTreeMap<String, Arc<PropertySpec>> = specs
            .into_iter()
            .map(|(name, spec)| (name.into(), Arc::new(spec)))
            .collect();

        let mut default_values = BTreeMap::new();
        let mut default_evaluated = BTreeMap::new();
        let parameters = EvaluationParameters::default();
        for (name, spec) in &specs {
            let value = PropertyValue::new(Arc::clone(spec), None)?;
            default_evaluated.insert(name.clone(), value.possibly_evaluate(&parameters)?);
            default_values.insert(name.clone(), value);
        }

        Ok(Self {
            specs,
            default_values,
            default_evaluated,
        })
    }

    pub fn spec(&self, name: &str) -> Option<&Arc<PropertySpec>> {
        self.specs.get(name)
    }

    pub fn expect_spec(&self, name: &str) -> PaintboxResult<&Arc<PropertySpec>> {
        self.specs
            .get(name)
            .ok_or_else(|| PaintboxError::validation(format!("unknown property \"{name}\"")))
    }

    pub fn default_value(&self, name: &str) -> Option<&PropertyValue> {
        self.default_values.get(name)
    }

    pub fn default_evaluated(&self, name: &str) -> Option<&EvaluatedValue> {
        self.default_evaluated.get(name)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.specs.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Value, ValueType};

    #[test]
    fn precomputes_default_results() {
        let props = Properties::new([
            (
                "fill-opacity",
                PropertySpec::data_driven(ValueType::Number, Value::Number(1.0), true),
            ),
            (
                "fill-antialias",
                PropertySpec::data_constant(ValueType::Boolean, Value::Bool(true), false),
            ),
        ])
        .unwrap();

        assert_eq!(props.len(), 2);
        let d = props.default_evaluated("fill-opacity").unwrap();
        assert_eq!(d.constant_or(Value::Absent), Value::Number(1.0));
        let d = props.default_evaluated("fill-antialias").unwrap();
        assert_eq!(d.as_scalar(), Some(&Value::Bool(true)));
    }

    #[test]
    fn unknown_names_are_validation_errors() {
        let props = Properties::new([(
            "line-width",
            PropertySpec::data_driven(ValueType::Number, Value::Number(1.0), true),
        )])
        .unwrap();
        assert!(props.expect_spec("line-widht").is_err());
    }
}
