//! Lifecycle controller for observable queries.
//!
//! [`ObservableQueryController`] binds one query descriptor and one argument
//! set to a [`ReactiveState`] cell:
//!
//! - `mount` seeds the state with the query's default value and subscribes
//! - `update_arguments` resubscribes only when the serialized arguments change
//! - `replace_query` swaps the descriptor, reseeds and resubscribes
//! - `unsubscribe` (or an [`UnsubscribeHandle`]) tears down on demand
//! - `unmount` / `Drop` tear down and block every later write
//!
//! Every activation bumps a liveness generation.  Data callbacks and
//! subscribe completions carry the generation they were created for and act
//! only while it is still current, so a consumer that has moved on never
//! sees stale data and every subscription created is torn down exactly once.

use std::any::Any;
use std::marker::PhantomData;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Weak};

use futures_util::FutureExt;
use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::watch;

use crate::error::{ObservableLinkError, Result};
use crate::models::{QueryArguments, QueryResult, QueryResultWithState};
use crate::query::{ObservableQueryFor, OnNextResult};
use crate::state::{ObservedQuery, ReactiveState, WatchState};
use crate::subscription::ObservableQuerySubscription;

/// Where the controller is in its subscribe/teardown cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerPhase {
    Idle,
    /// `subscribe` has been called and has not resolved yet
    Subscribing,
    Subscribed,
    TearingDown,
    /// The last `subscribe` failed; the result keeps its last value
    Error,
}

struct ControllerInner {
    generation: u64,
    subscription: Option<ObservableQuerySubscription>,
    phase: ControllerPhase,
    unmounted: bool,
}

struct ControllerShared<T, S> {
    state: Arc<S>,
    inner: Mutex<ControllerInner>,
    _data: PhantomData<fn(T)>,
}

impl<T, S> ControllerShared<T, S>
where
    S: ReactiveState<T>,
{
    /// Tear down the current subscription and invalidate the current
    /// generation. With `expected`, only acts while that generation is
    /// still current.
    fn retire(&self, expected: Option<u64>) -> bool {
        let (subscription, retired_generation) = {
            let mut inner = self.inner.lock();
            if inner.unmounted {
                return false;
            }
            if let Some(generation) = expected {
                if inner.generation != generation {
                    return false;
                }
            }
            // A failed subscribe left nothing to tear down; keep the marker.
            if inner.subscription.is_none() && inner.phase == ControllerPhase::Error {
                return false;
            }
            inner.generation += 1;
            inner.phase = ControllerPhase::TearingDown;
            (inner.subscription.take(), inner.generation)
        };

        let had_subscription = match subscription {
            Some(subscription) => {
                subscription.unsubscribe();
                true
            },
            None => false,
        };

        let mut inner = self.inner.lock();
        if !inner.unmounted && inner.generation == retired_generation {
            inner.phase = ControllerPhase::Idle;
            self.state.set_subscribed(false);
        }
        had_subscription
    }

    /// Tear down for good. No state is written.
    fn shutdown(&self) {
        let subscription = {
            let mut inner = self.inner.lock();
            if inner.unmounted {
                return;
            }
            inner.unmounted = true;
            inner.generation += 1;
            inner.phase = ControllerPhase::Idle;
            inner.subscription.take()
        };
        if let Some(subscription) = subscription {
            subscription.unsubscribe();
        }
    }

    fn complete_subscribe(
        &self,
        generation: u64,
        outcome: std::thread::Result<Result<ObservableQuerySubscription>>,
    ) {
        match outcome {
            Ok(Ok(subscription)) => {
                let mut inner = self.inner.lock();
                if inner.unmounted || inner.generation != generation {
                    drop(inner);
                    log::debug!(
                        "[observable-link] Subscription for '{}' resolved after the controller moved on; tearing it down",
                        subscription.route()
                    );
                    subscription.unsubscribe();
                    return;
                }
                log::debug!("[observable-link] Subscription created for '{}'", subscription.route());
                inner.subscription = Some(subscription);
                inner.phase = ControllerPhase::Subscribed;
                self.state.set_subscribed(true);
            },
            Ok(Err(e)) => {
                log::error!("[observable-link] Error during subscription: {}", e);
                self.fail(generation);
            },
            Err(panic) => {
                log::error!(
                    "[observable-link] Subscribe panicked: {}",
                    panic_message(panic.as_ref())
                );
                self.fail(generation);
            },
        }
    }

    fn fail(&self, generation: u64) {
        let mut inner = self.inner.lock();
        if inner.unmounted || inner.generation != generation {
            return;
        }
        inner.phase = ControllerPhase::Error;
        self.state.set_subscribed(false);
    }
}

trait Retire: Send + Sync {
    fn retire_manually(&self) -> bool;
}

impl<T, S> Retire for ControllerShared<T, S>
where
    S: ReactiveState<T>,
{
    fn retire_manually(&self) -> bool {
        log::debug!("[observable-link] Observable query cleanup called manually");
        self.retire(None)
    }
}

/// Cloneable handle that unsubscribes the controller it came from.
///
/// Holds no strong reference; calling it after the controller is gone is a
/// no-op.
#[derive(Clone)]
pub struct UnsubscribeHandle {
    target: Weak<dyn Retire>,
}

impl UnsubscribeHandle {
    /// Returns `true` if a live subscription was torn down by this call.
    pub fn unsubscribe(&self) -> bool {
        match self.target.upgrade() {
            Some(target) => target.retire_manually(),
            None => false,
        }
    }
}

impl std::fmt::Debug for UnsubscribeHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UnsubscribeHandle")
            .field("alive", &(self.target.strong_count() > 0))
            .finish()
    }
}

/// The triple handed to consumers: current result, subscription flag and a
/// way to unsubscribe.
#[derive(Debug, Clone)]
pub struct ObservableQueryResult<T> {
    pub query_result: QueryResultWithState<T>,
    pub is_subscribed: bool,
    pub unsubscribe: UnsubscribeHandle,
}

/// Binds a query descriptor and its arguments to a reactive state cell.
pub struct ObservableQueryController<Q, S = WatchState<<Q as ObservableQueryFor>::Data>>
where
    Q: ObservableQueryFor,
    S: ReactiveState<Q::Data> + 'static,
{
    query: Arc<Q>,
    arguments: QueryArguments,
    fingerprint: String,
    shared: Arc<ControllerShared<Q::Data, S>>,
}

impl<Q, S> ObservableQueryController<Q, S>
where
    Q: ObservableQueryFor,
    S: ReactiveState<Q::Data> + 'static,
{
    /// Seed `state` with the query's default value and subscribe.
    ///
    /// Must be called within a tokio runtime.  A failing `subscribe` does not
    /// fail the mount; it is logged and leaves the controller in
    /// [`ControllerPhase::Error`].
    pub fn mount<A>(query: Q, args: &A, state: Arc<S>) -> Result<Self>
    where
        A: Serialize + ?Sized,
    {
        let arguments = QueryArguments::from_serializable(args)?;
        let fingerprint = arguments.fingerprint();

        state.set_result(QueryResultWithState::initial(query.default_value()));
        state.set_subscribed(false);

        let controller = Self {
            query: Arc::new(query),
            arguments,
            fingerprint,
            shared: Arc::new(ControllerShared {
                state,
                inner: Mutex::new(ControllerInner {
                    generation: 0,
                    subscription: None,
                    phase: ControllerPhase::Idle,
                    unmounted: false,
                }),
                _data: PhantomData,
            }),
        };
        controller.activate()?;
        Ok(controller)
    }

    /// Resubscribe with new arguments.
    ///
    /// Returns `Ok(false)` without touching the subscription when the
    /// arguments serialize to the same value as the current ones.
    pub fn update_arguments<A>(&mut self, args: &A) -> Result<bool>
    where
        A: Serialize + ?Sized,
    {
        let arguments = QueryArguments::from_serializable(args)?;
        let fingerprint = arguments.fingerprint();
        if fingerprint == self.fingerprint {
            log::trace!("[observable-link] Arguments unchanged for '{}'", self.query.route());
            return Ok(false);
        }

        self.arguments = arguments;
        self.fingerprint = fingerprint;
        self.shared.retire(None);
        self.activate()?;
        Ok(true)
    }

    /// Swap in a new query descriptor, reseed the state with its default
    /// value and resubscribe with the current arguments.
    pub fn replace_query(&mut self, query: Q) -> Result<()> {
        self.shared.retire(None);
        self.query = Arc::new(query);
        {
            let inner = self.shared.inner.lock();
            if !inner.unmounted {
                self.shared
                    .state
                    .set_result(QueryResultWithState::initial(self.query.default_value()));
            }
        }
        self.activate()
    }

    /// Tear down the active subscription. Idempotent.
    ///
    /// Returns `true` if a live subscription was torn down by this call.
    pub fn unsubscribe(&self) -> bool {
        self.shared.retire_manually()
    }

    pub fn unsubscribe_handle(&self) -> UnsubscribeHandle {
        let shared: Arc<dyn Retire> = self.shared.clone();
        UnsubscribeHandle {
            target: Arc::downgrade(&shared),
        }
    }

    pub fn is_subscribed(&self) -> bool {
        self.shared.inner.lock().subscription.is_some()
    }

    pub fn phase(&self) -> ControllerPhase {
        self.shared.inner.lock().phase
    }

    pub fn query(&self) -> &Q {
        &self.query
    }

    pub fn arguments(&self) -> &QueryArguments {
        &self.arguments
    }

    pub fn state(&self) -> &Arc<S> {
        &self.shared.state
    }

    /// Tear down and stop writing to the state.
    pub fn unmount(self) {
        self.shared.shutdown();
    }

    fn activate(&self) -> Result<()> {
        let handle = tokio::runtime::Handle::try_current().map_err(|e| {
            ObservableLinkError::InternalError(format!(
                "observable queries require a tokio runtime: {}",
                e
            ))
        })?;

        let generation = {
            let mut inner = self.shared.inner.lock();
            if inner.unmounted {
                return Ok(());
            }
            inner.generation += 1;
            inner.phase = ControllerPhase::Subscribing;
            inner.generation
        };

        log::debug!(
            "[observable-link] Subscribing to '{}' (generation {})",
            self.query.route(),
            generation
        );

        let callback = data_callback(Arc::downgrade(&self.shared), generation);
        let query = self.query.clone();
        let arguments = self.arguments.clone();
        let shared = Arc::downgrade(&self.shared);

        handle.spawn(async move {
            let outcome = AssertUnwindSafe(query.subscribe(callback, arguments))
                .catch_unwind()
                .await;
            match shared.upgrade() {
                Some(shared) => shared.complete_subscribe(generation, outcome),
                // Controller gone: dropping the subscription unsubscribes it.
                None => drop(outcome),
            }
        });
        Ok(())
    }
}

impl<Q> ObservableQueryController<Q, WatchState<Q::Data>>
where
    Q: ObservableQueryFor,
{
    /// Mount with a fresh [`WatchState`] and return a receiver for it.
    pub fn observe<A>(query: Q, args: &A) -> Result<(Self, watch::Receiver<ObservedQuery<Q::Data>>)>
    where
        A: Serialize + ?Sized,
    {
        let state = Arc::new(WatchState::new(query.default_value()));
        let rx = state.subscribe();
        let controller = Self::mount(query, args, state)?;
        Ok((controller, rx))
    }

    pub fn snapshot(&self) -> ObservableQueryResult<Q::Data> {
        let current = self.shared.state.current();
        ObservableQueryResult {
            query_result: current.query_result,
            is_subscribed: current.is_subscribed,
            unsubscribe: self.unsubscribe_handle(),
        }
    }
}

impl<Q, S> Drop for ObservableQueryController<Q, S>
where
    Q: ObservableQueryFor,
    S: ReactiveState<Q::Data> + 'static,
{
    fn drop(&mut self) {
        self.shared.shutdown();
    }
}

fn data_callback<T, S>(shared: Weak<ControllerShared<T, S>>, generation: u64) -> OnNextResult<T>
where
    T: Send + Sync + 'static,
    S: ReactiveState<T> + 'static,
{
    Arc::new(move |result: QueryResult<T>| {
        let Some(shared) = shared.upgrade() else {
            return;
        };

        let failed = result.is_failure();
        {
            let inner = shared.inner.lock();
            if inner.unmounted || inner.generation != generation {
                log::trace!("[observable-link] Dropping result for stale generation {}", generation);
                return;
            }
            shared
                .state
                .set_result(QueryResultWithState::from_query_result(result, false));
        }

        if failed {
            log::warn!(
                "[observable-link] Query reported failure; tearing down subscription (generation {})",
                generation
            );
            shared.retire(Some(generation));
        }
    })
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
