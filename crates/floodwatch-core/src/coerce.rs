use serde_json::Value;
use tracing::debug;

/// A loosely typed field as it arrives from an upstream weather or elevation
/// payload. Providers are inconsistent about shapes: the same field can be a
/// scalar, a singleton list, a numeric string, or missing entirely.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum FieldValue {
    #[default]
    Absent,
    Number(f64),
    Bool(bool),
    Text(String),
    List(Vec<FieldValue>),
    /// Objects and anything else with no numeric reading.
    Other,
}

impl FieldValue {
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::Null => Self::Absent,
            Value::Bool(b) => Self::Bool(*b),
            Value::Number(n) => n.as_f64().map_or(Self::Other, Self::Number),
            Value::String(s) => Self::Text(s.clone()),
            Value::Array(items) => Self::List(items.iter().map(Self::from_json).collect()),
            Value::Object(_) => Self::Other,
        }
    }

    /// Reads `key` out of a JSON object. Missing keys and non-object
    /// containers both read as [`FieldValue::Absent`].
    pub fn field(container: &Value, key: &str) -> Self {
        container.get(key).map_or(Self::Absent, Self::from_json)
    }
}

/// Converts `value` to a float, falling back to `default`.
///
/// Absent values yield the default. Lists are reduced to their first element
/// (or the default when empty) and converted recursively. Strings are parsed
/// after trimming. Anything that cannot be read as a number yields the default.
/// This never fails, so scoring code downstream is plain arithmetic.
pub fn to_float(value: &FieldValue, default: f64) -> f64 {
    try_float(value).unwrap_or(default)
}

/// Like [`to_float`], but reports `None` where the default would be used.
pub fn try_float(value: &FieldValue) -> Option<f64> {
    match value {
        FieldValue::Absent => None,
        FieldValue::Number(n) => Some(*n),
        FieldValue::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        FieldValue::Text(raw) => {
            let parsed = raw.trim().parse::<f64>().ok();
            if parsed.is_none() {
                debug!(value = %raw, "could not convert text field to float");
            }
            parsed
        }
        FieldValue::List(items) => items.first().and_then(try_float),
        FieldValue::Other => {
            debug!("non-numeric field shape");
            None
        }
    }
}
