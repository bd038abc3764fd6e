//! Style schema primitives: the closed set of property value types, the
//! runtime [`Value`] union, and per-property [`PropertySpec`] records as
//! supplied by a style schema table.

use crate::foundation::{
    color::Color,
    error::{PaintboxError, PaintboxResult},
};

/// The declared type of a style property, from the style schema.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ValueType {
    Number,
    Color,
    Boolean,
    Enum,
    String,
    NumberArray,
    StringArray,
}

/// A resolved style value.
///
/// `Absent` is the sentinel for "no value": it is produced by properties
/// whose schema default is itself absent (properties that fall back to a
/// sibling at recalculation time, e.g. an outline color defaulting to the
/// fill color). It is never blended with a concrete value.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Absent,
    Bool(bool),
    Number(f64),
    Color(Color),
    Str(String),
    NumberArray(Vec<f64>),
    StrArray(Vec<String>),
}

// Hand-written rather than untagged: colors travel as {r, g, b, a}
// objects so a number array never collides with a color's array form on
// the way back in.
impl serde::Serialize for Value {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::ser::SerializeMap;
        match self {
            Self::Absent => serializer.serialize_unit(),
            Self::Bool(b) => serializer.serialize_bool(*b),
            Self::Number(n) => serializer.serialize_f64(*n),
            Self::Color(c) => {
                let mut map = serializer.serialize_map(Some(4))?;
                map.serialize_entry("r", &c.r)?;
                map.serialize_entry("g", &c.g)?;
                map.serialize_entry("b", &c.b)?;
                map.serialize_entry("a", &c.a)?;
                map.end()
            }
            Self::Str(s) => serializer.serialize_str(s),
            Self::NumberArray(v) => v.serialize(serializer),
            Self::StrArray(v) => v.serialize(serializer),
        }
    }
}

impl<'de> serde::Deserialize<'de> for Value {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        use serde::de::Error;
        match serde_json::Value::deserialize(deserializer)? {
            serde_json::Value::Null => Ok(Self::Absent),
            serde_json::Value::Bool(b) => Ok(Self::Bool(b)),
            serde_json::Value::Number(n) => n
                .as_f64()
                .map(Self::Number)
                .ok_or_else(|| D::Error::custom("number out of f64 range")),
            serde_json::Value::String(s) => Ok(Self::Str(s)),
            serde_json::Value::Array(items) => {
                if items.iter().all(serde_json::Value::is_string) {
                    let v = items
                        .into_iter()
                        .filter_map(|i| i.as_str().map(str::to_owned))
                        .collect();
                    return Ok(Self::StrArray(v));
                }
                items
                    .iter()
                    .map(|i| {
                        i.as_f64()
                            .ok_or_else(|| D::Error::custom("array must be all numbers or all strings"))
                    })
                    .collect::<Result<Vec<f64>, _>>()
                    .map(Self::NumberArray)
            }
            obj @ serde_json::Value::Object(_) => serde_json::from_value::<Color>(obj)
                .map(Self::Color)
                .map_err(|e| D::Error::custom(format!("expected a color object: {e}"))),
        }
    }
}

impl Value {
    pub fn is_absent(&self) -> bool {
        matches!(self, Self::Absent)
    }

    /// Truthiness in the style-expression sense: absent is false, booleans
    /// are themselves, everything else counts as present.
    pub fn is_truthy(&self) -> bool {
        match self {
            Self::Absent => false,
            Self::Bool(b) => *b,
            _ => true,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_color(&self) -> Option<Color> {
        match self {
            Self::Color(c) => Some(*c),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Parses a raw JSON literal against a declared type.
    pub fn from_json(raw: &serde_json::Value, ty: ValueType) -> PaintboxResult<Self> {
        let err = |msg: String| PaintboxError::validation(msg);
        match ty {
            ValueType::Number => raw
                .as_f64()
                .filter(|n| n.is_finite())
                .map(Self::Number)
                .ok_or_else(|| err(format!("expected a finite number, got {raw}"))),
            ValueType::Color => serde_json::from_value::<Color>(raw.clone())
                .map(Self::Color)
                .map_err(|e| err(format!("expected a color: {e}"))),
            ValueType::Boolean => raw
                .as_bool()
                .map(Self::Bool)
                .ok_or_else(|| err(format!("expected a boolean, got {raw}"))),
            ValueType::Enum | ValueType::String => raw
                .as_str()
                .map(|s| Self::Str(s.to_owned()))
                .ok_or_else(|| err(format!("expected a string, got {raw}"))),
            ValueType::NumberArray => serde_json::from_value::<Vec<f64>>(raw.clone())
                .map(Self::NumberArray)
                .map_err(|e| err(format!("expected an array of numbers: {e}"))),
            ValueType::StringArray => serde_json::from_value::<Vec<String>>(raw.clone())
                .map(Self::StrArray)
                .map_err(|e| err(format!("expected an array of strings: {e}"))),
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::Absent => serde_json::Value::Null,
            other => serde_json::to_value(other).unwrap_or(serde_json::Value::Null),
        }
    }

    /// The type's native interpolation, if it has one. Numbers and colors
    /// blend; number arrays blend element-wise when lengths agree.
    pub fn lerp(a: &Self, b: &Self, t: f64) -> Option<Self> {
        match (a, b) {
            (Self::Number(x), Self::Number(y)) => Some(Self::Number(x + (y - x) * t)),
            (Self::Color(x), Self::Color(y)) => Some(Self::Color(Color::lerp(*x, *y, t))),
            (Self::NumberArray(xs), Self::NumberArray(ys)) if xs.len() == ys.len() => {
                Some(Self::NumberArray(
                    xs.iter()
                        .zip(ys)
                        .map(|(x, y)| x + (y - x) * t)
                        .collect(),
                ))
            }
            _ => None,
        }
    }
}

/// Selects which of the four evaluation strategies a property uses.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PropertyKind {
    /// Feature-independent scalar; source/composite expressions rejected.
    DataConstant,
    /// May defer to per-feature evaluation.
    DataDriven,
    /// Pattern/dasharray style: discrete cross-fade across integer zooms.
    CrossFaded,
    /// Ramp-sampled (e.g. heat intensity to color); only presence resolves here.
    ColorRamp,
}

/// One property's schema record. Immutable once loaded.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct PropertySpec {
    pub value_type: ValueType,
    pub default: Value,
    /// Allowed enum members when `value_type` is `Enum`.
    #[serde(default)]
    pub enum_values: Option<Vec<String>>,
    /// Whether source/composite expressions are permitted.
    pub data_driven: bool,
    /// Whether timed transitions are permitted.
    pub transition: bool,
    pub kind: PropertyKind,
}

impl PropertySpec {
    pub fn data_constant(value_type: ValueType, default: Value, transition: bool) -> Self {
        Self {
            value_type,
            default,
            enum_values: None,
            data_driven: false,
            transition,
            kind: PropertyKind::DataConstant,
        }
    }

    pub fn data_driven(value_type: ValueType, default: Value, transition: bool) -> Self {
        Self {
            value_type,
            default,
            enum_values: None,
            data_driven: true,
            transition,
            kind: PropertyKind::DataDriven,
        }
    }

    pub fn cross_faded(value_type: ValueType, default: Value) -> Self {
        Self {
            value_type,
            default,
            enum_values: None,
            data_driven: false,
            transition: true,
            kind: PropertyKind::CrossFaded,
        }
    }

    pub fn color_ramp(default: Value) -> Self {
        Self {
            value_type: ValueType::Color,
            default,
            enum_values: None,
            data_driven: false,
            transition: false,
            kind: PropertyKind::ColorRamp,
        }
    }

    pub fn with_enum_values(mut self, values: &[&str]) -> Self {
        self.enum_values = Some(values.iter().map(|s| (*s).to_owned()).collect());
        self
    }

    /// Type-checks an already-parsed value against this spec.
    pub fn check(&self, value: &Value) -> PaintboxResult<()> {
        if value.is_absent() {
            return Ok(());
        }
        let ok = match self.value_type {
            ValueType::Number => matches!(value, Value::Number(_)),
            ValueType::Color => matches!(value, Value::Color(_)),
            ValueType::Boolean => matches!(value, Value::Bool(_)),
            ValueType::Enum | ValueType::String => matches!(value, Value::Str(_)),
            ValueType::NumberArray => matches!(value, Value::NumberArray(_)),
            ValueType::StringArray => matches!(value, Value::StrArray(_)),
        };
        if !ok {
            return Err(PaintboxError::validation(format!(
                "value {value:?} does not match declared type {:?}",
                self.value_type
            )));
        }
        if self.value_type == ValueType::Enum
            && let (Some(allowed), Value::Str(s)) = (&self.enum_values, value)
            && !allowed.iter().any(|v| v == s)
        {
            return Err(PaintboxError::validation(format!(
                "\"{s}\" is not one of the allowed enum values"
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn from_json_enforces_declared_type() {
        assert!(Value::from_json(&json!(2.5), ValueType::Number).is_ok());
        assert!(Value::from_json(&json!("x"), ValueType::Number).is_err());
        assert!(Value::from_json(&json!([1.0, 2.0]), ValueType::NumberArray).is_ok());
        assert!(Value::from_json(&json!([1.0, "a"]), ValueType::NumberArray).is_err());
    }

    #[test]
    fn lerp_handles_numbers_and_arrays() {
        let v = Value::lerp(&Value::Number(0.0), &Value::Number(10.0), 0.25).unwrap();
        assert_eq!(v, Value::Number(2.5));

        let v = Value::lerp(
            &Value::NumberArray(vec![0.0, 4.0]),
            &Value::NumberArray(vec![2.0, 8.0]),
            0.5,
        )
        .unwrap();
        assert_eq!(v, Value::NumberArray(vec![1.0, 6.0]));

        // Mismatched lengths have no native interpolation.
        assert!(
            Value::lerp(
                &Value::NumberArray(vec![0.0]),
                &Value::NumberArray(vec![1.0, 2.0]),
                0.5,
            )
            .is_none()
        );
    }

    #[test]
    fn serde_round_trip_keeps_arrays_and_colors_apart() {
        let dash = Value::NumberArray(vec![1.0, 2.0, 0.5, 0.25]);
        let back: Value = serde_json::from_value(serde_json::to_value(&dash).unwrap()).unwrap();
        assert_eq!(back, dash);

        let color = Value::Color(Color::rgba(0.25, 0.5, 0.75, 1.0));
        let json = serde_json::to_value(&color).unwrap();
        assert_eq!(json, json!({"r": 0.25, "g": 0.5, "b": 0.75, "a": 1.0}));
        let back: Value = serde_json::from_value(json).unwrap();
        assert_eq!(back, color);

        let absent: Value = serde_json::from_value(json!(null)).unwrap();
        assert_eq!(absent, Value::Absent);
    }

    #[test]
    fn enum_membership_is_checked() {
        let spec = PropertySpec::data_constant(ValueType::Enum, Value::Str("round".into()), false)
            .with_enum_values(&["round", "butt", "square"]);
        assert!(spec.check(&Value::Str("butt".into())).is_ok());
        assert!(spec.check(&Value::Str("miter".into())).is_err());
    }

    #[test]
    fn absent_passes_any_type_check() {
        let spec = PropertySpec::data_driven(ValueType::Color, Value::Absent, true);
        assert!(spec.check(&Value::Absent).is_ok());
    }
}
