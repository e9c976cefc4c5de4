//! Output formatters for observed query state
//!
//! One line per state change: either a compact human-readable summary or
//! the full state as a JSON line.

use clap::ValueEnum;
use observable_link::{ObservedQuery, ResultOrigin, ValidationResultSeverity};
use serde_json::Value as JsonValue;

use crate::error::Result;

/// Maximum characters of `data` shown in compact output
const MAX_DATA_WIDTH: usize = 120;

/// Output format for state changes
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Compact,
    Json,
}

/// Formats observed state for display
pub struct OutputFormatter {
    format: OutputFormat,
}

impl OutputFormatter {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Truncate a string to max width with ellipsis
    fn truncate_value(value: &str, max_width: usize) -> String {
        if value.chars().count() <= max_width {
            value.to_string()
        } else {
            let take = max_width.saturating_sub(3);
            format!("{}...", value.chars().take(take).collect::<String>())
        }
    }

    pub fn format_state(&self, state: &ObservedQuery<JsonValue>) -> Result<String> {
        match self.format {
            OutputFormat::Json => Ok(serde_json::to_string(state)?),
            OutputFormat::Compact => Ok(self.format_compact(state)),
        }
    }

    fn format_compact(&self, state: &ObservedQuery<JsonValue>) -> String {
        let result = &state.query_result;
        let origin = match result.origin {
            ResultOrigin::Initial => "initial",
            ResultOrigin::Received => "received",
        };
        let subscribed = if state.is_subscribed {
            "subscribed"
        } else {
            "unsubscribed"
        };
        let data = match &result.data {
            JsonValue::String(s) => s.clone(),
            other => other.to_string(),
        };

        let mut line = format!(
            "[{}] {} data={}",
            origin,
            subscribed,
            Self::truncate_value(&data, MAX_DATA_WIDTH)
        );

        if !result.is_authorized {
            line.push_str(" (unauthorized)");
        }
        if result.has_exceptions {
            line.push_str(&format!(" exceptions: {}", result.exception_messages.join("; ")));
        }
        for validation in &result.validation_results {
            let label = match validation.severity {
                ValidationResultSeverity::Error => "error",
                ValidationResultSeverity::Warning => "warning",
                ValidationResultSeverity::Information => "info",
                ValidationResultSeverity::Unknown => "note",
            };
            line.push_str(&format!("\n  {}: {}", label, validation.message));
        }

        line
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use observable_link::{QueryResult, QueryResultWithState};
    use serde_json::json;

    fn received(data: JsonValue) -> ObservedQuery<JsonValue> {
        ObservedQuery {
            query_result: QueryResultWithState::from_query_result(QueryResult::success(data), false),
            is_subscribed: true,
        }
    }

    #[test]
    fn test_compact_initial_state() {
        let formatter = OutputFormatter::new(OutputFormat::Compact);
        let line = formatter.format_state(&ObservedQuery::initial(JsonValue::Null)).unwrap();
        assert_eq!(line, "[initial] unsubscribed data=null");
    }

    #[test]
    fn test_compact_received_string_is_unquoted() {
        let formatter = OutputFormatter::new(OutputFormat::Compact);
        let line = formatter.format_state(&received(json!("c"))).unwrap();
        assert_eq!(line, "[received] subscribed data=c");
    }

    #[test]
    fn test_compact_exceptions_and_validation() {
        let envelope: QueryResult<JsonValue> = serde_json::from_value(json!({
            "data": {"count": 2},
            "isSuccess": false,
            "hasExceptions": true,
            "exceptionMessages": ["boom", "bang"],
            "validationResults": [{"severity": 2, "message": "stale"}]
        }))
        .unwrap();
        let state = ObservedQuery {
            query_result: QueryResultWithState::from_query_result(envelope, false),
            is_subscribed: false,
        };

        let line = OutputFormatter::new(OutputFormat::Compact).format_state(&state).unwrap();
        assert_eq!(
            line,
            "[received] unsubscribed data={\"count\":2} exceptions: boom; bang\n  warning: stale"
        );
    }

    #[test]
    fn test_compact_truncates_long_data() {
        let line = OutputFormatter::new(OutputFormat::Compact)
            .format_state(&received(json!("x".repeat(500))))
            .unwrap();
        assert!(line.ends_with("..."));
        assert!(line.len() < 200);
    }

    #[test]
    fn test_json_line() {
        let line = OutputFormatter::new(OutputFormat::Json)
            .format_state(&received(json!([1, 2])))
            .unwrap();
        let parsed: JsonValue = serde_json::from_str(&line).unwrap();
        assert_eq!(parsed["query_result"]["data"], json!([1, 2]));
        assert_eq!(parsed["query_result"]["origin"], "received");
        assert_eq!(parsed["is_subscribed"], true);
    }
}
