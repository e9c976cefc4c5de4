use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Reconnect policy for observable query connections.
///
/// Every connection retries independently: after an unexpected close, an
/// error, or a failed open it waits `delay` and tries again, growing the
/// delay linearly by `reconnect_step_ms * attempt` after each scheduled
/// retry. A successful open resets both the attempt counter and the delay.
///
/// # Example
///
/// ```rust
/// use observable_link::ConnectionOptions;
///
/// let options = ConnectionOptions::default()
///     .with_auto_reconnect(true)
///     .with_reconnect_delay_ms(250)
///     .with_max_reconnect_attempts(Some(10));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionOptions {
    /// Enable automatic reconnection on connection loss
    /// Default: true
    #[serde(default = "default_auto_reconnect")]
    pub auto_reconnect: bool,

    /// Delay before the first reconnection attempt, in milliseconds
    /// Default: 500ms
    #[serde(default = "default_reconnect_delay_ms")]
    pub reconnect_delay_ms: u64,

    /// Linear backoff step in milliseconds; after scheduling attempt `n`
    /// the delay grows by `step * n`
    /// Default: 500ms
    #[serde(default = "default_reconnect_step_ms")]
    pub reconnect_step_ms: u64,

    /// Maximum number of reconnection attempts before giving up
    /// Default: Some(100). None retries forever, Some(0) never retries
    #[serde(default = "default_max_reconnect_attempts")]
    pub max_reconnect_attempts: Option<u32>,
}

fn default_auto_reconnect() -> bool {
    true
}

fn default_reconnect_delay_ms() -> u64 {
    500
}

fn default_reconnect_step_ms() -> u64 {
    500
}

fn default_max_reconnect_attempts() -> Option<u32> {
    Some(100)
}

impl Default for ConnectionOptions {
    fn default() -> Self {
        Self {
            auto_reconnect: default_auto_reconnect(),
            reconnect_delay_ms: default_reconnect_delay_ms(),
            reconnect_step_ms: default_reconnect_step_ms(),
            max_reconnect_attempts: default_max_reconnect_attempts(),
        }
    }
}

impl ConnectionOptions {
    /// Create new connection options with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Set whether to automatically reconnect on connection loss
    pub fn with_auto_reconnect(mut self, enabled: bool) -> Self {
        self.auto_reconnect = enabled;
        self
    }

    /// Set the delay before the first reconnection attempt (in milliseconds)
    pub fn with_reconnect_delay_ms(mut self, delay_ms: u64) -> Self {
        self.reconnect_delay_ms = delay_ms;
        self
    }

    /// Set the linear backoff step (in milliseconds)
    pub fn with_reconnect_step_ms(mut self, step_ms: u64) -> Self {
        self.reconnect_step_ms = step_ms;
        self
    }

    /// Set the maximum number of reconnection attempts
    /// Pass None for infinite retries, Some(0) to disable reconnection
    pub fn with_max_reconnect_attempts(mut self, max_attempts: Option<u32>) -> Self {
        self.max_reconnect_attempts = max_attempts;
        self
    }

    pub fn initial_reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }

    /// Delay to use after scheduling retry number `attempt`.
    pub fn next_delay(&self, current: Duration, attempt: u32) -> Duration {
        let step = self.reconnect_step_ms.saturating_mul(u64::from(attempt));
        current.saturating_add(Duration::from_millis(step))
    }

    /// `true` once `attempt` exceeds the configured ceiling.
    pub fn is_exhausted(&self, attempt: u32) -> bool {
        match self.max_reconnect_attempts {
            Some(max) => attempt > max,
            None => false,
        }
    }
}
