use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{ChartError, ChartResult};

/// Declarative chart configuration.
///
/// Always a JSON object at the top level. Layers combine through
/// [`ChartOptions::merge_from`]: nested objects merge key by key, while any
/// other overlay value (arrays, scalars, `null`) replaces the base value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChartOptions(Map<String, Value>);

impl ChartOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_value(value: Value) -> ChartResult<Self> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            other => Err(ChartError::InvalidOption(format!(
                "chart options must be a JSON object, got {}",
                json_kind(&other)
            ))),
        }
    }

    pub fn from_json_str(input: &str) -> ChartResult<Self> {
        let value: Value = serde_json::from_str(input)
            .map_err(|err| ChartError::InvalidOption(format!("failed to parse options: {err}")))?;
        Self::from_value(value)
    }

    /// The single-key layer `{ textStyle: { fontFamily: font } }`.
    #[must_use]
    pub fn with_default_font(font: &str) -> Self {
        let mut text_style = Map::new();
        text_style.insert("fontFamily".to_owned(), Value::String(font.to_owned()));
        let mut root = Map::new();
        root.insert("textStyle".to_owned(), Value::Object(text_style));
        Self(root)
    }

    /// Caller options layered over a default font.
    #[must_use]
    pub fn layered(font: &str, caller: &ChartOptions) -> Self {
        let mut layered = Self::with_default_font(font);
        layered.merge_from(caller);
        layered
    }

    pub fn merge_from(&mut self, overlay: &ChartOptions) {
        merge_objects(&mut self.0, &overlay.0);
    }

    #[must_use]
    pub fn merged_with(&self, overlay: &ChartOptions) -> Self {
        let mut merged = self.clone();
        merged.merge_from(overlay);
        merged
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    #[must_use]
    pub fn get_path(&self, path: &[&str]) -> Option<&Value> {
        let (first, rest) = path.split_first()?;
        rest.iter()
            .try_fold(self.0.get(*first)?, |value, key| value.get(*key))
    }

    pub fn insert(&mut self, key: impl Into<String>, value: Value) -> Option<Value> {
        self.0.insert(key.into(), value)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    #[must_use]
    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }
}

impl TryFrom<Value> for ChartOptions {
    type Error = ChartError;

    fn try_from(value: Value) -> ChartResult<Self> {
        Self::from_value(value)
    }
}

fn merge_objects(base: &mut Map<String, Value>, overlay: &Map<String, Value>) {
    for (key, overlay_value) in overlay {
        match (base.get_mut(key), overlay_value) {
            (Some(Value::Object(base_child)), Value::Object(overlay_child)) => {
                merge_objects(base_child, overlay_child);
            }
            _ => {
                base.insert(key.clone(), overlay_value.clone());
            }
        }
    }
}

pub(crate) fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
