//! Connection lifecycle event handlers.
//!
//! Provides callback-based hooks for monitoring the per-query WebSocket
//! connections opened by observable queries:
//!
//! - [`on_connect`](EventHandlers::on_connect): a connection for a route was established
//! - [`on_disconnect`](EventHandlers::on_disconnect): a connection closed unexpectedly
//! - [`on_error`](EventHandlers::on_error): a transport error, or retry exhaustion
//! - [`on_receive`](EventHandlers::on_receive): optional debug hook for every inbound frame
//!
//! Transport failures are never returned as errors to the caller; these
//! hooks (and the log output) are the only place they are observable.
//!
//! # Example
//!
//! ```rust,no_run
//! use observable_link::{EventHandlers, ObservableLinkClient};
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let handlers = EventHandlers::new()
//!     .on_connect(|route| println!("Connected: {}", route))
//!     .on_disconnect(|reason| println!("Disconnected: {}", reason))
//!     .on_error(|error| eprintln!("Connection error: {}", error));
//!
//! let client = ObservableLinkClient::builder()
//!     .base_url("http://localhost:5000")
//!     .event_handlers(handlers)
//!     .build()?;
//! # Ok(())
//! # }
//! ```

use std::fmt;
use std::sync::Arc;

/// Reason for a disconnect event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisconnectReason {
    /// Route of the connection that closed.
    pub route: String,
    /// Human-readable description of why the connection closed.
    pub message: String,
    /// WebSocket close code, if available (e.g. 1000 = normal, 1006 = abnormal).
    pub code: Option<u16>,
}

impl DisconnectReason {
    /// Create a new disconnect reason with a message.
    pub fn new(route: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            route: route.into(),
            message: message.into(),
            code: None,
        }
    }

    /// Create a new disconnect reason with a message and close code.
    pub fn with_code(route: impl Into<String>, message: impl Into<String>, code: u16) -> Self {
        Self {
            route: route.into(),
            message: message.into(),
            code: Some(code),
        }
    }
}

impl fmt::Display for DisconnectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(code) = self.code {
            write!(f, "'{}': {} (code: {})", self.route, self.message, code)
        } else {
            write!(f, "'{}': {}", self.route, self.message)
        }
    }
}

/// Error information passed to the `on_error` handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionError {
    /// Route of the connection the error belongs to.
    pub route: String,
    /// Human-readable error message.
    pub message: String,
    /// Whether the connection will keep retrying after this error.
    pub recoverable: bool,
}

impl ConnectionError {
    /// Create a new connection error.
    pub fn new(route: impl Into<String>, message: impl Into<String>, recoverable: bool) -> Self {
        Self {
            route: route.into(),
            message: message.into(),
            recoverable,
        }
    }
}

impl fmt::Display for ConnectionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "'{}': {}", self.route, self.message)
    }
}

/// Type alias for the on_connect callback (receives the route).
pub type OnConnectCallback = Arc<dyn Fn(&str) + Send + Sync>;

/// Type alias for the on_disconnect callback.
pub type OnDisconnectCallback = Arc<dyn Fn(DisconnectReason) + Send + Sync>;

/// Type alias for the on_error callback.
pub type OnErrorCallback = Arc<dyn Fn(ConnectionError) + Send + Sync>;

/// Type alias for the on_receive callback (route, raw frame).
pub type OnReceiveCallback = Arc<dyn Fn(&str, &str) + Send + Sync>;

/// Connection lifecycle event handlers.
///
/// All handlers are optional. Handlers are `Send + Sync` so they can be
/// invoked from the connection tasks running on the tokio runtime.
#[derive(Clone, Default)]
pub struct EventHandlers {
    pub(crate) on_connect: Option<OnConnectCallback>,
    pub(crate) on_disconnect: Option<OnDisconnectCallback>,
    pub(crate) on_error: Option<OnErrorCallback>,
    pub(crate) on_receive: Option<OnReceiveCallback>,
}

impl fmt::Debug for EventHandlers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventHandlers")
            .field("on_connect", &self.on_connect.is_some())
            .field("on_disconnect", &self.on_disconnect.is_some())
            .field("on_error", &self.on_error.is_some())
            .field("on_receive", &self.on_receive.is_some())
            .finish()
    }
}

impl EventHandlers {
    /// Create a new empty `EventHandlers` (no callbacks registered).
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a callback invoked when a connection is established.
    ///
    /// # Example
    /// ```rust
    /// use observable_link::EventHandlers;
    ///
    /// let handlers = EventHandlers::new()
    ///     .on_connect(|route| println!("Connected to {}", route));
    /// ```
    pub fn on_connect(mut self, f: impl Fn(&str) + Send + Sync + 'static) -> Self {
        self.on_connect = Some(Arc::new(f));
        self
    }

    /// Register a callback invoked when a connection closes unexpectedly.
    ///
    /// Explicit `disconnect()` calls do not fire this handler.
    pub fn on_disconnect(mut self, f: impl Fn(DisconnectReason) + Send + Sync + 'static) -> Self {
        self.on_disconnect = Some(Arc::new(f));
        self
    }

    /// Register a callback invoked when a connection error occurs.
    ///
    /// `recoverable == false` means the connection gave up (retry ceiling
    /// reached or auto-reconnect disabled) and will deliver no more data.
    pub fn on_error(mut self, f: impl Fn(ConnectionError) + Send + Sync + 'static) -> Self {
        self.on_error = Some(Arc::new(f));
        self
    }

    /// Register a debug hook receiving every raw inbound frame before parsing.
    pub fn on_receive(mut self, f: impl Fn(&str, &str) + Send + Sync + 'static) -> Self {
        self.on_receive = Some(Arc::new(f));
        self
    }

    /// Returns `true` if any handler is registered.
    pub fn has_any(&self) -> bool {
        self.on_connect.is_some()
            || self.on_disconnect.is_some()
            || self.on_error.is_some()
            || self.on_receive.is_some()
    }

    pub(crate) fn emit_connect(&self, route: &str) {
        if let Some(cb) = &self.on_connect {
            cb(route);
        }
    }

    pub(crate) fn emit_disconnect(&self, reason: DisconnectReason) {
        if let Some(cb) = &self.on_disconnect {
            cb(reason);
        }
    }

    pub(crate) fn emit_error(&self, error: ConnectionError) {
        if let Some(cb) = &self.on_error {
            cb(error);
        }
    }

    pub(crate) fn emit_receive(&self, route: &str, raw: &str) {
        if let Some(cb) = &self.on_receive {
            cb(route, raw);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_empty_handlers_have_none() {
        let handlers = EventHandlers::new();
        assert!(!handlers.has_any());
        // Dispatch with nothing registered is a no-op.
        handlers.emit_connect("/a");
        handlers.emit_error(ConnectionError::new("/a", "boom", true));
    }

    #[test]
    fn test_handlers_are_dispatched() {
        let connects = Arc::new(AtomicUsize::new(0));
        let errors = Arc::new(AtomicUsize::new(0));
        let c = connects.clone();
        let e = errors.clone();
        let handlers = EventHandlers::new()
            .on_connect(move |_| {
                c.fetch_add(1, Ordering::SeqCst);
            })
            .on_error(move |err| {
                assert!(!err.recoverable);
                e.fetch_add(1, Ordering::SeqCst);
            });

        assert!(handlers.has_any());
        handlers.emit_connect("/accounts");
        handlers.emit_error(ConnectionError::new("/accounts", "gave up", false));
        assert_eq!(connects.load(Ordering::SeqCst), 1);
        assert_eq!(errors.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_disconnect_reason_display() {
        let plain = DisconnectReason::new("/q", "stream ended");
        assert_eq!(plain.to_string(), "'/q': stream ended");
        let coded = DisconnectReason::with_code("/q", "going away", 1001);
        assert_eq!(coded.to_string(), "'/q': going away (code: 1001)");
    }
}
