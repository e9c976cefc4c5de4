#![allow(dead_code)]
//! Scripted transport for connection and controller tests.
//!
//! Every `open` consumes the next queued [`Plan`]; when the queue is empty
//! the open fails.  Sockets are fed by an unbounded channel the test keeps
//! the sender of; dropping the sender ends the stream.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use futures_util::future::BoxFuture;
use observable_link::{
    ConnectionOptions, EventHandlers, LinkTimeouts, ObservableLinkClient, ObservableLinkError,
    Transport, TransportFrame, TransportSocket,
};
use tokio::sync::mpsc;
use tokio::time::Instant;

pub const BASE_URL: &str = "http://observable.test";

pub enum Plan {
    Fail,
    Open(mpsc::UnboundedReceiver<TransportFrame>),
}

#[derive(Default)]
pub struct TransportLog {
    opens: Mutex<Vec<(Instant, String)>>,
    plans: Mutex<VecDeque<Plan>>,
    pings: AtomicUsize,
    closes: AtomicUsize,
}

impl TransportLog {
    pub fn push_failures(&self, count: usize) {
        let mut plans = self.plans.lock().unwrap();
        for _ in 0..count {
            plans.push_back(Plan::Fail);
        }
    }

    /// Queue a socket and return the sender feeding it.
    pub fn push_socket(&self) -> mpsc::UnboundedSender<TransportFrame> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.plans.lock().unwrap().push_back(Plan::Open(rx));
        tx
    }

    pub fn open_count(&self) -> usize {
        self.opens.lock().unwrap().len()
    }

    pub fn open_times(&self) -> Vec<Instant> {
        self.opens.lock().unwrap().iter().map(|(at, _)| *at).collect()
    }

    pub fn urls(&self) -> Vec<String> {
        self.opens.lock().unwrap().iter().map(|(_, url)| url.clone()).collect()
    }

    pub fn pings(&self) -> usize {
        self.pings.load(Ordering::SeqCst)
    }

    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }
}

#[derive(Clone, Default)]
pub struct ScriptedTransport {
    log: Arc<TransportLog>,
}

impl ScriptedTransport {
    pub fn new() -> (Self, Arc<TransportLog>) {
        let transport = Self::default();
        let log = transport.log.clone();
        (transport, log)
    }
}

impl Transport for ScriptedTransport {
    fn open(&self, url: &str) -> BoxFuture<'static, observable_link::Result<Box<dyn TransportSocket>>> {
        self.log.opens.lock().unwrap().push((Instant::now(), url.to_string()));
        let plan = self.log.plans.lock().unwrap().pop_front().unwrap_or(Plan::Fail);
        let log = self.log.clone();
        Box::pin(async move {
            match plan {
                Plan::Fail => Err(ObservableLinkError::WebSocketError("connection refused".into())),
                Plan::Open(frames) => Ok(Box::new(ScriptedSocket { frames, log }) as Box<dyn TransportSocket>),
            }
        })
    }
}

struct ScriptedSocket {
    frames: mpsc::UnboundedReceiver<TransportFrame>,
    log: Arc<TransportLog>,
}

impl TransportSocket for ScriptedSocket {
    fn next_frame(&mut self) -> BoxFuture<'_, Option<observable_link::Result<TransportFrame>>> {
        Box::pin(async move { self.frames.recv().await.map(Ok) })
    }

    fn ping(&mut self) -> BoxFuture<'_, observable_link::Result<()>> {
        self.log.pings.fetch_add(1, Ordering::SeqCst);
        Box::pin(async { Ok(()) })
    }

    fn close(&mut self) -> BoxFuture<'_, ()> {
        self.log.closes.fetch_add(1, Ordering::SeqCst);
        Box::pin(async {})
    }
}

/// Client wired to a fresh scripted transport, keepalive disabled.
pub fn scripted_client(options: ConnectionOptions) -> (ObservableLinkClient, Arc<TransportLog>) {
    scripted_client_with(options, LinkTimeouts::without_keepalive(), EventHandlers::new())
}

pub fn scripted_client_with(
    options: ConnectionOptions,
    timeouts: LinkTimeouts,
    handlers: EventHandlers,
) -> (ObservableLinkClient, Arc<TransportLog>) {
    let (transport, log) = ScriptedTransport::new();
    let client = ObservableLinkClient::builder()
        .base_url(BASE_URL)
        .connection_options(options)
        .timeouts(timeouts)
        .event_handlers(handlers)
        .transport(transport)
        .build()
        .expect("scripted client");
    (client, log)
}

pub fn text(json: &str) -> TransportFrame {
    TransportFrame::Text(json.to_string())
}

pub fn envelope(data: &str) -> TransportFrame {
    TransportFrame::Text(serde_json::json!({ "data": data, "isSuccess": true }).to_string())
}

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}
