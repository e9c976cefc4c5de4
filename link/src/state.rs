//! Reactive state written by the lifecycle controller.
//!
//! The controller never owns UI state; it writes into a [`ReactiveState`]
//! cell supplied by the binding layer.  [`WatchState`] is the stock cell,
//! built on a `tokio::sync::watch` channel so any number of consumers can
//! await changes.

use serde::Serialize;
use tokio::sync::watch;

use crate::models::QueryResultWithState;

/// What consumers of an observable query see.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ObservedQuery<T> {
    pub query_result: QueryResultWithState<T>,
    pub is_subscribed: bool,
}

impl<T> ObservedQuery<T> {
    pub fn initial(default_value: T) -> Self {
        Self {
            query_result: QueryResultWithState::initial(default_value),
            is_subscribed: false,
        }
    }
}

/// A state cell the controller writes into.
///
/// Writes happen while the controller holds its internal lock, so
/// implementations must not call back into the controller synchronously.
pub trait ReactiveState<T>: Send + Sync {
    /// Replace the current result in full.
    fn set_result(&self, result: QueryResultWithState<T>);

    fn set_subscribed(&self, subscribed: bool);
}

/// `watch`-channel backed state cell.
pub struct WatchState<T> {
    tx: watch::Sender<ObservedQuery<T>>,
}

impl<T: Clone + Send + Sync> WatchState<T> {
    pub fn new(default_value: T) -> Self {
        let (tx, _) = watch::channel(ObservedQuery::initial(default_value));
        Self { tx }
    }

    /// A receiver marked as having seen the current value.
    pub fn subscribe(&self) -> watch::Receiver<ObservedQuery<T>> {
        self.tx.subscribe()
    }

    pub fn current(&self) -> ObservedQuery<T> {
        self.tx.borrow().clone()
    }
}

impl<T: Send + Sync> ReactiveState<T> for WatchState<T> {
    fn set_result(&self, result: QueryResultWithState<T>) {
        self.tx.send_modify(|state| state.query_result = result);
    }

    fn set_subscribed(&self, subscribed: bool) {
        self.tx.send_if_modified(|state| {
            if state.is_subscribed == subscribed {
                return false;
            }
            state.is_subscribed = subscribed;
            true
        });
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for WatchState<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatchState").field("current", &*self.tx.borrow()).finish()
    }
}
