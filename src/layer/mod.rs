//! Style layer integration: a non-transitionable [`Layout`] set and the
//! [`StyleLayer`] that wires layout and paint property sets together.

use std::{collections::BTreeMap, sync::Arc};

use crate::{
    eval::{EvaluationParameters, TransitionParameters},
    foundation::error::{PaintboxError, PaintboxResult},
    property::{registry::Properties, value::PropertyValue},
    transition::{
        TransitionOverride,
        set::{PossiblyEvaluated, Transitionable, Transitioning},
    },
};

const TRANSITION_SUFFIX: &str = "-transition";

/// Layout properties are not transitionable, so their evaluation chain is
/// just value → possibly-evaluated: no timed snapshot in between.
#[derive(Clone, Debug)]
pub struct Layout {
    properties: Arc<Properties>,
    values: BTreeMap<String, PropertyValue>,
}

impl Layout {
    pub fn new(properties: Arc<Properties>) -> Self {
        Self {
            properties,
            values: BTreeMap::new(),
        }
    }

    pub fn properties(&self) -> &Arc<Properties> {
        &self.properties
    }

    pub fn get_value(&self, name: &str) -> Option<&serde_json::Value> {
        self.values.get(name).and_then(PropertyValue::raw)
    }

    pub fn set_value(&mut self, name: &str, raw: Option<serde_json::Value>) -> PaintboxResult<()> {
        let spec = Arc::clone(self.properties.expect_spec(name)?);
        let value = PropertyValue::new(spec, raw)?;
        self.values.insert(name.to_owned(), value);
        Ok(())
    }

    pub fn serialize(&self) -> serde_json::Map<String, serde_json::Value> {
        let mut result = serde_json::Map::new();
        for (name, value) in &self.values {
            if let Some(raw) = value.raw() {
                result.insert(name.clone(), raw.clone());
            }
        }
        result
    }

    pub fn possibly_evaluate(
        &self,
        parameters: &EvaluationParameters,
    ) -> PaintboxResult<PossiblyEvaluated> {
        let mut values = BTreeMap::new();
        for (name, value) in &self.values {
            values.insert(name.clone(), value.possibly_evaluate(parameters)?);
        }
        Ok(PossiblyEvaluated::new(Arc::clone(&self.properties), values))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    Visible,
    None,
}

/// One style layer's property state: the unevaluated layout set, the
/// transitionable paint set, and their recalculated results.
#[derive(Clone, Debug)]
pub struct StyleLayer {
    id: String,
    pub minzoom: Option<f64>,
    pub maxzoom: Option<f64>,
    visibility: Visibility,
    unevaluated_layout: Layout,
    transitionable_paint: Transitionable,
    transitioning_paint: Transitioning,
    layout: Option<PossiblyEvaluated>,
    paint: Option<PossiblyEvaluated>,
}

impl StyleLayer {
    pub fn new(
        id: impl Into<String>,
        layout_properties: Arc<Properties>,
        paint_properties: Arc<Properties>,
    ) -> Self {
        let transitionable_paint = Transitionable::new(paint_properties);
        // Start from a priorless snapshot so no phantom transition can
        // fire before the first edit.
        let transitioning_paint = transitionable_paint.untransitioned();
        Self {
            id: id.into(),
            minzoom: None,
            maxzoom: None,
            visibility: Visibility::Visible,
            unevaluated_layout: Layout::new(layout_properties),
            transitionable_paint,
            transitioning_paint,
            layout: None,
            paint: None,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn visibility(&self) -> Visibility {
        self.visibility
    }

    pub fn get_layout_property(&self, name: &str) -> Option<serde_json::Value> {
        if name == "visibility" {
            return serde_json::to_value(self.visibility).ok();
        }
        self.unevaluated_layout.get_value(name).cloned()
    }

    pub fn set_layout_property(
        &mut self,
        name: &str,
        value: Option<serde_json::Value>,
    ) -> PaintboxResult<()> {
        if name == "visibility" {
            self.visibility = match value {
                None => Visibility::Visible,
                Some(v) => serde_json::from_value(v)
                    .map_err(|e| PaintboxError::validation(format!("bad visibility: {e}")))?,
            };
            return Ok(());
        }
        self.unevaluated_layout.set_value(name, value)
    }

    /// For a `<name>-transition` key, the transition override; otherwise
    /// the explicit raw value.
    pub fn get_paint_property(&self, name: &str) -> Option<serde_json::Value> {
        if let Some(base) = name.strip_suffix(TRANSITION_SUFFIX) {
            let config = self.transitionable_paint.get_transition(base)?;
            serde_json::to_value(config).ok()
        } else {
            self.transitionable_paint.get_value(name).cloned()
        }
    }

    pub fn set_paint_property(
        &mut self,
        name: &str,
        value: Option<serde_json::Value>,
    ) -> PaintboxResult<()> {
        if let Some(base) = name.strip_suffix(TRANSITION_SUFFIX) {
            let config = match value {
                None => None,
                Some(v) => Some(
                    serde_json::from_value::<TransitionOverride>(v).map_err(|e| {
                        PaintboxError::validation(format!("bad transition for {base}: {e}"))
                    })?,
                ),
            };
            self.transitionable_paint.set_transition(base, config)
        } else {
            self.transitionable_paint.set_value(name, value)
        }
    }

    /// Replaces the timed paint snapshot, opening transition windows from
    /// the previous snapshot toward the current values.
    #[tracing::instrument(skip_all, fields(layer = %self.id))]
    pub fn update_transitions(&mut self, parameters: &TransitionParameters) {
        self.transitioning_paint = self
            .transitionable_paint
            .transitioned(parameters, &self.transitioning_paint);
    }

    pub fn has_transition(&self) -> bool {
        self.transitioning_paint.has_transition()
    }

    /// Recomputes the layout and paint result sets for new global
    /// parameters (zoom, clock).
    #[tracing::instrument(skip_all, fields(layer = %self.id, zoom = parameters.zoom))]
    pub fn recalculate(&mut self, parameters: &EvaluationParameters) -> PaintboxResult<()> {
        self.layout = Some(self.unevaluated_layout.possibly_evaluate(parameters)?);
        self.paint = Some(self.transitioning_paint.possibly_evaluate(parameters)?);
        Ok(())
    }

    /// The paint results of the last `recalculate` call.
    pub fn paint(&self) -> Option<&PossiblyEvaluated> {
        self.paint.as_ref()
    }

    /// The layout results of the last `recalculate` call.
    pub fn layout(&self) -> Option<&PossiblyEvaluated> {
        self.layout.as_ref()
    }

    pub fn is_hidden(&self, zoom: f64) -> bool {
        if self.minzoom.is_some_and(|mz| zoom < mz) {
            return true;
        }
        if self.maxzoom.is_some_and(|mz| zoom >= mz) {
            return true;
        }
        self.visibility == Visibility::None
    }

    pub fn serialize(&self) -> serde_json::Value {
        let mut output = serde_json::Map::new();
        output.insert("id".to_owned(), serde_json::Value::String(self.id.clone()));
        if let Some(minzoom) = self.minzoom {
            output.insert("minzoom".to_owned(), serde_json::json!(minzoom));
        }
        if let Some(maxzoom) = self.maxzoom {
            output.insert("maxzoom".to_owned(), serde_json::json!(maxzoom));
        }

        let mut layout = self.unevaluated_layout.serialize();
        if self.visibility == Visibility::None {
            layout.insert("visibility".to_owned(), serde_json::json!("none"));
        }
        if !layout.is_empty() {
            output.insert("layout".to_owned(), serde_json::Value::Object(layout));
        }

        let paint = self.transitionable_paint.serialize();
        if !paint.is_empty() {
            output.insert("paint".to_owned(), serde_json::Value::Object(paint));
        }

        serde_json::Value::Object(output)
    }
}
