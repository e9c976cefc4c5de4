use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// Severity of a server-side validation result.
///
/// Accepts both the numeric form (`0..=3`) and the name on the wire;
/// anything else decodes as [`ValidationResultSeverity::Unknown`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "JsonValue", into = "String")]
pub enum ValidationResultSeverity {
    #[default]
    Unknown,
    Error,
    Warning,
    Information,
}

impl From<JsonValue> for ValidationResultSeverity {
    fn from(value: JsonValue) -> Self {
        match value {
            JsonValue::Number(n) => match n.as_u64() {
                Some(1) => ValidationResultSeverity::Error,
                Some(2) => ValidationResultSeverity::Warning,
                Some(3) => ValidationResultSeverity::Information,
                _ => ValidationResultSeverity::Unknown,
            },
            JsonValue::String(s) => match s.to_ascii_lowercase().as_str() {
                "error" => ValidationResultSeverity::Error,
                "warning" => ValidationResultSeverity::Warning,
                "information" => ValidationResultSeverity::Information,
                _ => ValidationResultSeverity::Unknown,
            },
            _ => ValidationResultSeverity::Unknown,
        }
    }
}

impl From<ValidationResultSeverity> for String {
    fn from(severity: ValidationResultSeverity) -> Self {
        match severity {
            ValidationResultSeverity::Unknown => "unknown",
            ValidationResultSeverity::Error => "error",
            ValidationResultSeverity::Warning => "warning",
            ValidationResultSeverity::Information => "information",
        }
        .to_string()
    }
}

/// A single validation result attached to a query result envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResult {
    #[serde(default)]
    pub severity: ValidationResultSeverity,

    #[serde(default)]
    pub message: String,

    /// Names of the members (arguments/properties) the result refers to
    #[serde(default)]
    pub members: Vec<String>,

    /// Opaque server state attached to the result
    #[serde(default)]
    pub state: JsonValue,
}
