use std::{collections::BTreeMap, sync::Arc};

use crate::{
    eval::{EvaluationParameters, TransitionParameters},
    foundation::error::{PaintboxError, PaintboxResult},
    property::{evaluated::EvaluatedValue, registry::Properties, value::PropertyValue},
    transition::{
        TransitionOverride,
        value::{TransitionablePropertyValue, TransitioningValue},
    },
};

const TRANSITION_SUFFIX: &str = "-transition";

/// The mutable per-layer store of paint property values and transition
/// overrides; the only mutation surface of the pipeline.
///
/// Only explicitly-set properties occupy an entry; everything else falls
/// back to the shared [`Properties`] default table.
#[derive(Clone, Debug)]
pub struct Transitionable {
    properties: Arc<Properties>,
    values: BTreeMap<String, TransitionablePropertyValue>,
}

impl Transitionable {
    pub fn new(properties: Arc<Properties>) -> Self {
        Self {
            properties,
            values: BTreeMap::new(),
        }
    }

    /// Rebuilds a `Transitionable` from its [`serialize`](Self::serialize)
    /// output.
    pub fn from_serialized(
        properties: Arc<Properties>,
        map: &serde_json::Map<String, serde_json::Value>,
    ) -> PaintboxResult<Self> {
        let mut result = Self::new(properties);
        for (key, raw) in map {
            if let Some(name) = key.strip_suffix(TRANSITION_SUFFIX) {
                let config: TransitionOverride = serde_json::from_value(raw.clone())
                    .map_err(|e| PaintboxError::serde(format!("bad transition for {name}: {e}")))?;
                result.set_transition(name, Some(config))?;
            } else if raw.is_null() {
                result.set_value(key, None)?;
            } else {
                result.set_value(key, Some(raw.clone()))?;
            }
        }
        Ok(result)
    }

    pub fn properties(&self) -> &Arc<Properties> {
        &self.properties
    }

    /// The explicitly-set raw value, if any. `None` means the property
    /// takes its schema default.
    pub fn get_value(&self, name: &str) -> Option<&serde_json::Value> {
        self.values.get(name).and_then(|v| v.value.raw())
    }

    /// Sets or resets (`raw == None`) a property value. The raw input is
    /// compiled and type-checked here; on failure the stored value is left
    /// unchanged. An explicit transition override for the key survives a
    /// value reset: value and transition are independent axes.
    pub fn set_value(&mut self, name: &str, raw: Option<serde_json::Value>) -> PaintboxResult<()> {
        let spec = Arc::clone(self.properties.expect_spec(name)?);
        let value = PropertyValue::new(spec, raw)?;
        self.entry(name)?.value = value;
        Ok(())
    }

    pub fn get_transition(&self, name: &str) -> Option<TransitionOverride> {
        self.values.get(name).and_then(|v| v.transition)
    }

    /// Sets or clears the per-property transition override, independent of
    /// value changes. Unspecified override fields inherit the global
    /// config at snapshot time.
    pub fn set_transition(
        &mut self,
        name: &str,
        config: Option<TransitionOverride>,
    ) -> PaintboxResult<()> {
        self.properties.expect_spec(name)?;
        if let Some(config) = config {
            config.validate()?;
        }
        self.entry(name)?.transition = config;
        Ok(())
    }

    fn entry(&mut self, name: &str) -> PaintboxResult<&mut TransitionablePropertyValue> {
        if !self.values.contains_key(name) {
            let default = self
                .properties
                .default_value(name)
                .cloned()
                .ok_or_else(|| PaintboxError::validation(format!("unknown property \"{name}\"")))?;
            self.values
                .insert(name.to_owned(), TransitionablePropertyValue::new(default));
        }
        self.values
            .get_mut(name)
            .ok_or_else(|| PaintboxError::validation(format!("unknown property \"{name}\"")))
    }

    /// Opens transition windows at `parameters.now` from the entries of
    /// `prior` toward the current values.
    pub fn transitioned(
        &self,
        parameters: &TransitionParameters,
        prior: &Transitioning,
    ) -> Transitioning {
        let values = self
            .values
            .iter()
            .map(|(name, entry)| {
                // A key the prior snapshot never carried still has a prior
                // value: its settled default.
                let prior_entry = prior.values.get(name).cloned().or_else(|| {
                    self.properties
                        .default_value(name)
                        .map(|v| TransitionablePropertyValue::new(v.clone()).untransitioned())
                });
                (name.clone(), entry.transitioned(parameters, prior_entry))
            })
            .collect();
        Transitioning {
            properties: Arc::clone(&self.properties),
            values,
        }
    }

    /// A snapshot with no priors and zero-width windows. Must be used once
    /// at initial construction, before the first `transitioned` call.
    pub fn untransitioned(&self) -> Transitioning {
        let values = self
            .values
            .iter()
            .map(|(name, entry)| (name.clone(), entry.untransitioned()))
            .collect();
        Transitioning {
            properties: Arc::clone(&self.properties),
            values,
        }
    }

    /// Lossless round-trip form: explicit values under their own keys and
    /// transition overrides under `<name>-transition`. Keys holding the
    /// schema default with no override are omitted.
    pub fn serialize(&self) -> serde_json::Map<String, serde_json::Value> {
        let mut result = serde_json::Map::new();
        for (name, entry) in &self.values {
            if let Some(raw) = entry.value.raw() {
                result.insert(name.clone(), raw.clone());
            }
            if let Some(transition) = entry.transition
                && let Ok(json) = serde_json::to_value(transition)
            {
                result.insert(format!("{name}{TRANSITION_SUFFIX}"), json);
            }
        }
        result
    }
}

/// An immutable timed snapshot of every explicitly-set property, each
/// paired with its optional prior and transition window.
#[derive(Clone, Debug)]
pub struct Transitioning {
    properties: Arc<Properties>,
    values: BTreeMap<String, TransitioningValue>,
}

impl Transitioning {
    /// Resolves every entry at `parameters.now`. Mutable because elapsed
    /// and data-driven entries collapse their prior here, irreversibly.
    pub fn possibly_evaluate(
        &mut self,
        parameters: &EvaluationParameters,
    ) -> PaintboxResult<PossiblyEvaluated> {
        let mut values = BTreeMap::new();
        for (name, entry) in &mut self.values {
            values.insert(name.clone(), entry.possibly_evaluate(parameters)?);
        }
        Ok(PossiblyEvaluated {
            properties: Arc::clone(&self.properties),
            values,
        })
    }

    /// Whether any entry still blends; callers use this to decide whether
    /// the pipeline needs re-running every frame or only on edits.
    pub fn has_transition(&self) -> bool {
        self.values.values().any(TransitioningValue::is_transitioning)
    }
}

/// The zoom/time-resolved result set. Only true per-feature evaluation
/// remains deferred.
#[derive(Clone, Debug)]
pub struct PossiblyEvaluated {
    properties: Arc<Properties>,
    values: BTreeMap<String, EvaluatedValue>,
}

impl PossiblyEvaluated {
    pub(crate) fn new(
        properties: Arc<Properties>,
        values: BTreeMap<String, EvaluatedValue>,
    ) -> Self {
        Self { properties, values }
    }

    pub fn get(&self, name: &str) -> Option<&EvaluatedValue> {
        self.values
            .get(name)
            .or_else(|| self.properties.default_evaluated(name))
    }

    pub fn properties(&self) -> &Arc<Properties> {
        &self.properties
    }
}
