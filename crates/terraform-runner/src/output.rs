//! Terraform output values.

use serde::Deserialize;

/// Value of a root module output as reported by `terraform output -json`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(transparent)]
pub struct OutputValue(serde_json::Value);

impl OutputValue {
    /// Parse the stdout of `terraform output -json <name>`.
    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw.trim())
    }

    /// Textual form of the value.
    ///
    /// Strings are returned verbatim, `null` becomes an empty string, and
    /// lists, maps and scalars are rendered as compact JSON.
    pub fn as_text(&self) -> String {
        match &self.0 {
            serde_json::Value::String(s) => s.clone(),
            serde_json::Value::Null => String::new(),
            other => other.to_string(),
        }
    }

    pub fn as_json(&self) -> &serde_json::Value {
        &self.0
    }
}

impl From<serde_json::Value> for OutputValue {
    fn from(value: serde_json::Value) -> Self {
        Self(value)
    }
}

impl From<&str> for OutputValue {
    fn from(value: &str) -> Self {
        Self(serde_json::Value::String(value.to_string()))
    }
}
