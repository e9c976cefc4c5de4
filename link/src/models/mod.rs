//! Data models for the observable-link client library.
//!
//! Defines the server-pushed result envelope, the state-side view of it,
//! and the configuration values passed into connections.

pub mod connection_options;
pub mod host_context;
pub mod query_arguments;
pub mod query_result;
pub mod query_result_with_state;
pub mod validation_result;


pub use connection_options::ConnectionOptions;
pub use host_context::HostContext;
pub use query_arguments::{argument_text, QueryArguments};
pub use query_result::QueryResult;
pub use query_result_with_state::{QueryResultWithState, ResultOrigin};
pub use validation_result::{ValidationResult, ValidationResultSeverity};
