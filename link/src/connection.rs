//! Per-query WebSocket connection with local reconnection.
//!
//! Each observable query subscription owns exactly one
//! [`ObservableQueryConnection`].  `connect` spawns a background task that:
//!
//! - Opens a socket to `{ws|wss}://{host}{route}` (bounded by the connect timeout)
//! - Decodes every inbound text frame as a [`QueryResult`] and hands it to
//!   the data callback, in arrival order
//! - Sends keepalive pings and treats a silent peer as a lost connection
//! - Reconnects after a lost connection or failed open with linear backoff,
//!   giving up after `max_reconnect_attempts`
//!
//! `disconnect` is the only teardown entry.  It flips a terminal flag and
//! signals the task, which closes the socket and cancels any pending
//! reconnect wait; no socket is opened after `disconnect` has returned.

use std::marker::PhantomData;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;
use tokio::sync::{oneshot, watch};
use tokio::time::Instant as TokioInstant;

use crate::client::LinkContext;
use crate::error::{ObservableLinkError, Result};
use crate::event_handlers::{ConnectionError, DisconnectReason};
use crate::models::QueryResult;
use crate::timeouts::LinkTimeouts;
use crate::transport::{TransportFrame, TransportSocket};

/// Maximum sleep duration that won't overflow `Instant + Duration`.
const FAR_FUTURE: Duration = Duration::from_secs(100 * 365 * 24 * 3600);

/// Callback receiving each decoded envelope.
pub type DataReceived<T> = Arc<dyn Fn(QueryResult<T>) + Send + Sync>;

/// Observable state of a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    /// Created, `connect` not called yet
    Idle,
    /// First open in progress
    Connecting,
    Open,
    /// Waiting for (or performing) reconnect attempt `attempt`
    Reconnecting { attempt: u32 },
    /// Retry ceiling reached or reconnect disabled; no further data
    Abandoned,
    /// `disconnect` was called; terminal
    Disconnected,
}

/// The teardown surface a subscription needs from its connection.
pub trait QueryConnection: Send + Sync {
    fn route(&self) -> &str;

    /// Tear the connection down. Returns `true` only for the call that
    /// actually performed the teardown.
    fn disconnect(&self) -> bool;

    fn is_disconnected(&self) -> bool;
}

struct ConnectionShared {
    disconnected: AtomicBool,
    reconnect_attempts: AtomicU32,
    status: watch::Sender<ConnectionStatus>,
}

impl ConnectionShared {
    fn is_disconnected(&self) -> bool {
        self.disconnected.load(Ordering::SeqCst)
    }

    /// `Disconnected` is terminal and never overwritten.
    fn set_status(&self, status: ConnectionStatus) {
        self.status.send_if_modified(|current| {
            if *current == ConnectionStatus::Disconnected || *current == status {
                return false;
            }
            *current = status;
            true
        });
    }
}

/// A single reconnecting socket for one resolved route.
pub struct ObservableQueryConnection<T> {
    route: String,
    url: String,
    context: Arc<LinkContext>,
    shared: Arc<ConnectionShared>,
    started: AtomicBool,
    close_tx: Mutex<Option<oneshot::Sender<()>>>,
    fallback: Mutex<Option<T>>,
    _data: PhantomData<fn() -> T>,
}

impl<T> ObservableQueryConnection<T>
where
    T: DeserializeOwned + Clone + Send + Sync + 'static,
{
    /// Create a connection for an already-resolved route. Nothing is opened
    /// until [`connect`](Self::connect).
    pub fn new(route: impl Into<String>, context: Arc<LinkContext>) -> Self {
        let route = route.into();
        let url = context.host.ws_url(&route);
        let (status, _) = watch::channel(ConnectionStatus::Idle);
        Self {
            route,
            url,
            context,
            shared: Arc::new(ConnectionShared {
                disconnected: AtomicBool::new(false),
                reconnect_attempts: AtomicU32::new(0),
                status,
            }),
            started: AtomicBool::new(false),
            close_tx: Mutex::new(None),
            fallback: Mutex::new(None),
            _data: PhantomData,
        }
    }

    /// Value delivered in place of `data` when a frame carries none (null or
    /// missing), or when a failing envelope carries data of another shape.
    pub fn with_fallback(self, value: T) -> Self {
        *self.fallback.lock() = Some(value);
        self
    }

    /// Start the background task delivering envelopes to `data_received`.
    ///
    /// Ignored after `disconnect`, and on every call but the first.  Must be
    /// called from within a tokio runtime; without one the connection is
    /// marked [`ConnectionStatus::Abandoned`].
    pub fn connect(&self, data_received: DataReceived<T>) {
        if self.shared.is_disconnected() {
            log::debug!(
                "[observable-link] connect() ignored for '{}': already disconnected",
                self.route
            );
            return;
        }
        if self.started.swap(true, Ordering::SeqCst) {
            log::debug!(
                "[observable-link] connect() ignored for '{}': already connected",
                self.route
            );
            return;
        }

        let handle = match tokio::runtime::Handle::try_current() {
            Ok(handle) => handle,
            Err(e) => {
                log::error!(
                    "[observable-link] Cannot connect '{}' outside a tokio runtime: {}",
                    self.route,
                    e
                );
                self.context.handlers.emit_error(ConnectionError::new(
                    &self.route,
                    "no tokio runtime available",
                    false,
                ));
                self.shared.set_status(ConnectionStatus::Abandoned);
                return;
            },
        };

        let (close_tx, close_rx) = oneshot::channel();
        *self.close_tx.lock() = Some(close_tx);
        self.shared.set_status(ConnectionStatus::Connecting);

        handle.spawn(connection_task::<T>(
            self.route.clone(),
            self.url.clone(),
            self.context.clone(),
            self.shared.clone(),
            close_rx,
            data_received,
            self.fallback.lock().clone(),
        ));

        // A disconnect racing the spawn found no sender to signal.
        if self.shared.is_disconnected() {
            if let Some(tx) = self.close_tx.lock().take() {
                let _ = tx.send(());
            }
        }
    }
}

impl<T> ObservableQueryConnection<T> {
    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn status(&self) -> ConnectionStatus {
        *self.shared.status.borrow()
    }

    /// Receiver observing every status change.
    pub fn watch_status(&self) -> watch::Receiver<ConnectionStatus> {
        self.shared.status.subscribe()
    }

    /// Consecutive failed attempts since the last successful open.
    pub fn reconnect_attempts(&self) -> u32 {
        self.shared.reconnect_attempts.load(Ordering::SeqCst)
    }

    fn teardown(&self) -> bool {
        if self.shared.disconnected.swap(true, Ordering::SeqCst) {
            return false;
        }
        log::debug!("[observable-link] Disconnecting '{}'", self.route);
        if let Some(tx) = self.close_tx.lock().take() {
            let _ = tx.send(());
        }
        self.shared.status.send_replace(ConnectionStatus::Disconnected);
        true
    }
}

impl<T: Send> QueryConnection for ObservableQueryConnection<T> {
    fn route(&self) -> &str {
        &self.route
    }

    fn disconnect(&self) -> bool {
        self.teardown()
    }

    fn is_disconnected(&self) -> bool {
        self.shared.is_disconnected()
    }
}

impl<T> Drop for ObservableQueryConnection<T> {
    fn drop(&mut self) {
        self.teardown();
    }
}

impl<T> std::fmt::Debug for ObservableQueryConnection<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObservableQueryConnection")
            .field("route", &self.route)
            .field("url", &self.url)
            .field("status", &self.status())
            .finish()
    }
}

// ── Background task ─────────────────────────────────────────────────────────

enum ReadOutcome {
    /// `disconnect` was called; close the socket and stop.
    Closed,
    /// The socket ended on its own; go through the reconnect path.
    Lost(DisconnectReason),
}

async fn open_socket(
    context: &LinkContext,
    url: &str,
    timeouts: &LinkTimeouts,
) -> Result<Box<dyn TransportSocket>> {
    let open = context.transport.open(url);
    if LinkTimeouts::is_no_timeout(timeouts.connection_timeout) {
        return open.await;
    }
    match tokio::time::timeout(timeouts.connection_timeout, open).await {
        Ok(result) => result,
        Err(_) => Err(ObservableLinkError::TimeoutError(format!(
            "Connection timeout ({:?})",
            timeouts.connection_timeout
        ))),
    }
}

/// Lifecycle:
/// 1. Open the socket (cancellable by `disconnect`)
/// 2. Read frames, deliver envelopes, keep the socket alive
/// 3. On loss or failed open: back off and go to 1, or abandon
async fn connection_task<T: DeserializeOwned + Clone>(
    route: String,
    url: String,
    context: Arc<LinkContext>,
    shared: Arc<ConnectionShared>,
    mut close_rx: oneshot::Receiver<()>,
    data_received: DataReceived<T>,
    fallback: Option<T>,
) {
    let options = context.options.clone();
    let timeouts = context.timeouts.clone();
    let mut delay = options.initial_reconnect_delay();
    let mut attempt: u32 = 0;

    loop {
        if shared.is_disconnected() {
            return;
        }

        let opened = tokio::select! {
            biased;
            _ = &mut close_rx => return,
            result = open_socket(&context, &url, &timeouts) => result,
        };

        let open_error = match opened {
            Ok(mut socket) => {
                if shared.is_disconnected() {
                    socket.close().await;
                    return;
                }

                log::debug!("[observable-link] Connection for '{}' established", route);
                attempt = 0;
                delay = options.initial_reconnect_delay();
                shared.reconnect_attempts.store(0, Ordering::SeqCst);
                shared.set_status(ConnectionStatus::Open);
                context.handlers.emit_connect(&route);

                let outcome = read_loop(
                    &route,
                    socket.as_mut(),
                    &mut close_rx,
                    &timeouts,
                    &context,
                    &shared,
                    &data_received,
                    fallback.as_ref(),
                )
                .await;

                match outcome {
                    ReadOutcome::Closed => {
                        socket.close().await;
                        return;
                    },
                    ReadOutcome::Lost(reason) => {
                        log::info!(
                            "[observable-link] Unexpected connection closed for route {}",
                            reason
                        );
                        context.handlers.emit_disconnect(reason);
                        None
                    },
                }
            },
            Err(e) => {
                log::warn!("[observable-link] Error with connection for '{}' - {}", route, e);
                Some(e.to_string())
            },
        };

        if shared.is_disconnected() {
            return;
        }

        if !options.auto_reconnect {
            log::warn!(
                "[observable-link] Auto-reconnect disabled for '{}'. Abandoning.",
                route
            );
            context.handlers.emit_error(ConnectionError::new(
                &route,
                open_error.unwrap_or_else(|| "connection lost".to_string()),
                false,
            ));
            shared.set_status(ConnectionStatus::Abandoned);
            return;
        }

        attempt = attempt.saturating_add(1);
        shared.reconnect_attempts.store(attempt, Ordering::SeqCst);

        if options.is_exhausted(attempt) {
            let retries = options.max_reconnect_attempts.unwrap_or(attempt);
            log::warn!(
                "[observable-link] Attempted {} retries for route '{}'. Abandoning.",
                retries,
                route
            );
            context.handlers.emit_error(ConnectionError::new(
                &route,
                format!("gave up after {} retries", retries),
                false,
            ));
            shared.set_status(ConnectionStatus::Abandoned);
            return;
        }

        if let Some(message) = open_error {
            context.handlers.emit_error(ConnectionError::new(&route, message, true));
        }

        log::info!(
            "[observable-link] Attempting to reconnect for '{}' (#{}) in {:?}",
            route,
            attempt,
            delay
        );
        shared.set_status(ConnectionStatus::Reconnecting { attempt });

        let wait = delay;
        delay = options.next_delay(delay, attempt);

        tokio::select! {
            biased;
            _ = &mut close_rx => return,
            _ = tokio::time::sleep(wait) => {},
        }
    }
}

/// Decode one text frame into an envelope.
///
/// Status fields always decode. A null or missing `data`, or `data` of the
/// wrong shape on a failing envelope, falls back to `fallback` so the
/// failure still reaches the callback.
fn decode_envelope<T: DeserializeOwned + Clone>(
    text: &str,
    fallback: Option<&T>,
) -> Result<QueryResult<T>> {
    let mut raw: QueryResult<Option<JsonValue>> = serde_json::from_str(text)?;
    let value = raw.data.take().filter(|value| !value.is_null());
    let lenient = value.is_none() || raw.is_failure();

    let data = match serde_json::from_value::<T>(value.unwrap_or(JsonValue::Null)) {
        Ok(data) => data,
        Err(e) => match fallback {
            Some(default) if lenient => default.clone(),
            _ => return Err(e.into()),
        },
    };
    Ok(raw.map_data(|_| data))
}

async fn read_loop<T: DeserializeOwned + Clone>(
    route: &str,
    socket: &mut dyn TransportSocket,
    close_rx: &mut oneshot::Receiver<()>,
    timeouts: &LinkTimeouts,
    context: &LinkContext,
    shared: &ConnectionShared,
    data_received: &DataReceived<T>,
    fallback: Option<&T>,
) -> ReadOutcome {
    let has_keepalive = !timeouts.keepalive_interval.is_zero();
    let keepalive_dur = if has_keepalive {
        timeouts.keepalive_interval
    } else {
        FAR_FUTURE
    };
    let mut idle_deadline = TokioInstant::now() + keepalive_dur;

    // After a Ping, some frame must arrive within this window.
    let pong_timeout_dur = timeouts.pong_timeout;
    let has_pong_timeout = has_keepalive && !pong_timeout_dur.is_zero();
    let mut awaiting_pong = false;
    let mut pong_deadline = TokioInstant::now() + FAR_FUTURE;

    loop {
        let idle_sleep = tokio::time::sleep_until(idle_deadline);
        tokio::pin!(idle_sleep);
        let pong_sleep = tokio::time::sleep_until(pong_deadline);
        tokio::pin!(pong_sleep);

        tokio::select! {
            biased;

            _ = &mut *close_rx => return ReadOutcome::Closed,

            _ = &mut pong_sleep, if has_pong_timeout && awaiting_pong => {
                log::warn!(
                    "[observable-link] Pong timeout ({:?}) for '{}', treating connection as dead",
                    pong_timeout_dur,
                    route
                );
                return ReadOutcome::Lost(DisconnectReason::new(
                    route,
                    format!("Pong timeout ({:?})", pong_timeout_dur),
                ));
            },

            _ = &mut idle_sleep, if has_keepalive && !awaiting_pong => {
                if let Err(e) = socket.ping().await {
                    log::warn!("[observable-link] Failed to send keepalive ping: {}", e);
                    return ReadOutcome::Lost(DisconnectReason::new(route, e.to_string()));
                }
                if has_pong_timeout {
                    awaiting_pong = true;
                    pong_deadline = TokioInstant::now() + pong_timeout_dur;
                }
                idle_deadline = TokioInstant::now() + keepalive_dur;
            },

            frame = socket.next_frame() => {
                idle_deadline = TokioInstant::now() + keepalive_dur;
                if awaiting_pong {
                    awaiting_pong = false;
                    pong_deadline = TokioInstant::now() + FAR_FUTURE;
                }

                match frame {
                    Some(Ok(TransportFrame::Text(text))) => {
                        context.handlers.emit_receive(route, &text);
                        if shared.is_disconnected() {
                            return ReadOutcome::Closed;
                        }
                        match decode_envelope(&text, fallback) {
                            Ok(result) => data_received(result),
                            Err(e) => {
                                log::warn!(
                                    "[observable-link] Dropping undecodable frame for '{}': {}",
                                    route,
                                    e
                                );
                            },
                        }
                        // The callback may have torn this connection down.
                        if shared.is_disconnected() {
                            return ReadOutcome::Closed;
                        }
                    },
                    Some(Ok(TransportFrame::Heartbeat)) => {},
                    Some(Ok(TransportFrame::Close(Some((code, reason))))) => {
                        let message = if reason.is_empty() {
                            "Server closed connection".to_string()
                        } else {
                            reason
                        };
                        return ReadOutcome::Lost(DisconnectReason::with_code(route, message, code));
                    },
                    Some(Ok(TransportFrame::Close(None))) | None => {
                        return ReadOutcome::Lost(DisconnectReason::new(
                            route,
                            "Server closed connection",
                        ));
                    },
                    Some(Err(e)) => {
                        return ReadOutcome::Lost(DisconnectReason::new(route, e.to_string()));
                    },
                }
            },
        }
    }
}
