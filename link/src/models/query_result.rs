use serde::{Deserialize, Serialize};

use super::validation_result::ValidationResult;

/// Query result envelope pushed by the server for an observable query.
///
/// Consumed verbatim: the only fields the client interprets are
/// `is_success` and `has_exceptions`, which decide whether the
/// subscription is torn down after delivery (see [`QueryResult::is_failure`]).
///
/// Every field except `data` is optional on the wire so minimal frames such
/// as `{"data":"a"}` still decode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryResult<T> {
    /// The query payload
    pub data: T,

    /// Whether the query executed successfully
    #[serde(default = "default_true")]
    pub is_success: bool,

    /// Whether server-side exceptions were raised while producing this result
    #[serde(default)]
    pub has_exceptions: bool,

    /// Exception messages, if any
    #[serde(default)]
    pub exception_messages: Vec<String>,

    /// Exception stack trace, if any
    #[serde(default)]
    pub exception_stack_trace: String,

    /// Whether `data` carries a meaningful value
    #[serde(default)]
    pub has_data: bool,

    /// Whether the caller was authorized for the query
    #[serde(default = "default_true")]
    pub is_authorized: bool,

    /// Whether the query arguments passed validation
    #[serde(default = "default_true")]
    pub is_valid: bool,

    /// Validation results produced by the server
    #[serde(default)]
    pub validation_results: Vec<ValidationResult>,
}

fn default_true() -> bool {
    true
}

impl<T> QueryResult<T> {
    /// A successful result carrying `data`.
    pub fn success(data: T) -> Self {
        Self {
            data,
            is_success: true,
            has_exceptions: false,
            exception_messages: Vec::new(),
            exception_stack_trace: String::new(),
            has_data: true,
            is_authorized: true,
            is_valid: true,
            validation_results: Vec::new(),
        }
    }

    /// A failed result carrying `data` and the given exception messages.
    pub fn with_exceptions(data: T, messages: Vec<String>) -> Self {
        Self {
            is_success: false,
            has_exceptions: true,
            exception_messages: messages,
            ..Self::success(data)
        }
    }

    /// `true` when the envelope signals failure.
    ///
    /// A failing envelope is still delivered to the reactive state, but it
    /// terminates the subscription instance that produced it.
    pub fn is_failure(&self) -> bool {
        !self.is_success || self.has_exceptions
    }

    /// Replace the payload, keeping every status field.
    pub fn map_data<U>(self, f: impl FnOnce(T) -> U) -> QueryResult<U> {
        QueryResult {
            data: f(self.data),
            is_success: self.is_success,
            has_exceptions: self.has_exceptions,
            exception_messages: self.exception_messages,
            exception_stack_trace: self.exception_stack_trace,
            has_data: self.has_data,
            is_authorized: self.is_authorized,
            is_valid: self.is_valid,
            validation_results: self.validation_results,
        }
    }
}
