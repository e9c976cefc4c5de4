use serde::{Deserialize, Serialize};

use super::query_result::QueryResult;
use super::validation_result::ValidationResult;

/// Where the value held by a [`QueryResultWithState`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultOrigin {
    /// Seeded from the query's default value; nothing received yet
    #[default]
    Initial,
    /// Copied from an envelope pushed by the server
    Received,
}

/// The query result as held by the reactive state cell.
///
/// Mirrors every [`QueryResult`] field and adds the UI-facing
/// `is_performing` flag plus an [`origin`](ResultOrigin) marker that
/// distinguishes the seeded default from data that actually arrived.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryResultWithState<T> {
    pub data: T,
    pub is_success: bool,
    pub has_exceptions: bool,
    pub exception_messages: Vec<String>,
    pub exception_stack_trace: String,
    pub has_data: bool,
    pub is_authorized: bool,
    pub is_valid: bool,
    pub validation_results: Vec<ValidationResult>,
    pub is_performing: bool,
    pub origin: ResultOrigin,
}

impl<T> QueryResultWithState<T> {
    /// The seed value written before any data arrives.
    pub fn initial(default_value: T) -> Self {
        Self {
            data: default_value,
            is_success: true,
            has_exceptions: false,
            exception_messages: Vec::new(),
            exception_stack_trace: String::new(),
            has_data: false,
            is_authorized: true,
            is_valid: true,
            validation_results: Vec::new(),
            is_performing: false,
            origin: ResultOrigin::Initial,
        }
    }

    /// Copy a received envelope in full (last write wins, nothing is merged).
    pub fn from_query_result(result: QueryResult<T>, is_performing: bool) -> Self {
        Self {
            data: result.data,
            is_success: result.is_success,
            has_exceptions: result.has_exceptions,
            exception_messages: result.exception_messages,
            exception_stack_trace: result.exception_stack_trace,
            has_data: result.has_data,
            is_authorized: result.is_authorized,
            is_valid: result.is_valid,
            validation_results: result.validation_results,
            is_performing,
            origin: ResultOrigin::Received,
        }
    }

    /// `true` while the value is still the seeded default.
    pub fn is_initial(&self) -> bool {
        self.origin == ResultOrigin::Initial
    }
}
