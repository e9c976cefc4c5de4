//! `ObservableQuerySubscription` – the handle returned by `subscribe`.
//!
//! Owns exactly one connection and exposes nothing of it except
//! [`unsubscribe`](ObservableQuerySubscription::unsubscribe).  Unsubscribing
//! is idempotent and disconnects the connection at most once; dropping a
//! live subscription unsubscribes it.

use std::sync::atomic::{AtomicBool, Ordering};

use crate::connection::QueryConnection;

pub struct ObservableQuerySubscription {
    connection: Box<dyn QueryConnection>,
    unsubscribed: AtomicBool,
}

impl ObservableQuerySubscription {
    /// Wrap an already-connecting connection.
    pub fn new(connection: impl QueryConnection + 'static) -> Self {
        Self {
            connection: Box::new(connection),
            unsubscribed: AtomicBool::new(false),
        }
    }

    /// Tear down the underlying connection.
    ///
    /// Returns `true` only for the first call; later calls (and `Drop`) are
    /// no-ops.
    pub fn unsubscribe(&self) -> bool {
        if self.unsubscribed.swap(true, Ordering::SeqCst) {
            return false;
        }
        log::debug!("[observable-link] Unsubscribing '{}'", self.connection.route());
        self.connection.disconnect();
        true
    }

    pub fn is_unsubscribed(&self) -> bool {
        self.unsubscribed.load(Ordering::SeqCst)
    }

    /// Resolved route of the underlying connection.
    pub fn route(&self) -> &str {
        self.connection.route()
    }
}

impl Drop for ObservableQuerySubscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

impl std::fmt::Debug for ObservableQuerySubscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObservableQuerySubscription")
            .field("route", &self.connection.route())
            .field("unsubscribed", &self.is_unsubscribed())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Arc;

    struct CountingConnection {
        disconnects: Arc<AtomicUsize>,
        disconnected: AtomicBool,
    }

    impl CountingConnection {
        fn new(disconnects: Arc<AtomicUsize>) -> Self {
            Self {
                disconnects,
                disconnected: AtomicBool::new(false),
            }
        }
    }

    impl QueryConnection for CountingConnection {
        fn route(&self) -> &str {
            "/api/counting"
        }

        fn disconnect(&self) -> bool {
            self.disconnects.fetch_add(1, Ordering::SeqCst);
            !self.disconnected.swap(true, Ordering::SeqCst)
        }

        fn is_disconnected(&self) -> bool {
            self.disconnected.load(Ordering::SeqCst)
        }
    }

    #[test]
    fn test_unsubscribe_disconnects_exactly_once() {
        let disconnects = Arc::new(AtomicUsize::new(0));
        let sub = ObservableQuerySubscription::new(CountingConnection::new(disconnects.clone()));

        assert!(!sub.is_unsubscribed());
        assert!(sub.unsubscribe());
        assert!(!sub.unsubscribe());
        assert!(!sub.unsubscribe());
        assert!(sub.is_unsubscribed());
        drop(sub);

        assert_eq!(disconnects.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_drop_unsubscribes() {
        let disconnects = Arc::new(AtomicUsize::new(0));
        let sub = ObservableQuerySubscription::new(CountingConnection::new(disconnects.clone()));
        assert_eq!(sub.route(), "/api/counting");
        drop(sub);
        assert_eq!(disconnects.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_concurrent_unsubscribe_single_teardown() {
        let disconnects = Arc::new(AtomicUsize::new(0));
        let sub = Arc::new(ObservableQuerySubscription::new(CountingConnection::new(
            disconnects.clone(),
        )));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let sub = sub.clone();
                std::thread::spawn(move || sub.unsubscribe())
            })
            .collect();
        let winners = handles
            .into_iter()
            .map(|h| h.join().expect("thread"))
            .filter(|won| *won)
            .count();

        assert_eq!(winners, 1);
        assert_eq!(disconnects.load(Ordering::SeqCst), 1);
    }
}
