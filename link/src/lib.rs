//! # observable-link
//!
//! Client library for server-pushed observable queries.
//!
//! Each observable query is a WebSocket at a route on the server that pushes
//! a JSON [`QueryResult`] envelope whenever the result changes.  This crate
//! keeps that socket alive (reconnecting with backoff), and binds it to a
//! reactive state cell through [`ObservableQueryController`], which
//! guarantees one live connection per subscription and deterministic
//! teardown on every exit path.
//!
//! # Example
//!
//! ```rust,no_run
//! use observable_link::{ObservableLinkClient, ObservableQueryController};
//! use serde_json::json;
//!
//! # async fn example() -> observable_link::Result<()> {
//! let client = ObservableLinkClient::builder()
//!     .base_url("http://localhost:5000")
//!     .build()?;
//!
//! let query = client
//!     .query::<serde_json::Value>("/api/accounts/{{accountId}}", json!(null))?
//!     .with_arguments(["accountId"]);
//!
//! let (mut controller, mut rx) =
//!     ObservableQueryController::observe(query, &json!({ "accountId": 42 }))?;
//!
//! rx.changed().await.ok();
//! println!("{:?}", rx.borrow().query_result.data);
//!
//! // Value-equal arguments do not resubscribe.
//! controller.update_arguments(&json!({ "accountId": 42 }))?;
//! controller.unmount();
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod connection;
pub mod controller;
pub mod error;
pub mod event_handlers;
pub mod models;
pub mod query;
pub mod route;
pub mod state;
pub mod subscription;
pub mod timeouts;
pub mod transport;

pub use client::{LinkContext, ObservableLinkClient, ObservableLinkClientBuilder};
pub use connection::{ConnectionStatus, DataReceived, ObservableQueryConnection, QueryConnection};
pub use controller::{
    ControllerPhase, ObservableQueryController, ObservableQueryResult, UnsubscribeHandle,
};
pub use error::{ObservableLinkError, Result};
pub use event_handlers::{ConnectionError, DisconnectReason, EventHandlers};
pub use models::{
    ConnectionOptions, HostContext, QueryArguments, QueryResult, QueryResultWithState,
    ResultOrigin, ValidationResult, ValidationResultSeverity,
};
pub use query::{ObservableQueryFor, OnNextResult, RoutedQuery};
pub use route::RouteTemplate;
pub use state::{ObservedQuery, ReactiveState, WatchState};
pub use subscription::ObservableQuerySubscription;
pub use timeouts::{LinkTimeouts, LinkTimeoutsBuilder};
pub use transport::{Transport, TransportFrame, TransportSocket, WebSocketTransport};
