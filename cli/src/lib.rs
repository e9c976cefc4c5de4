//! Library entry point for observable-cli components.
//!
//! Exposes configuration, logging and formatting so they can be tested
//! without going through the `observe` binary.

pub mod config;
pub mod error;
pub mod formatter;
pub mod logging;

pub use config::CLIConfiguration;
pub use error::{CLIError, Result};
pub use formatter::{OutputFormat, OutputFormatter};
