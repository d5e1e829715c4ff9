//! # Subscription: shared, idempotent disposal handle.
//!
//! Returned by [`Observable::subscribe`](super::Observable::subscribe). The producer decides
//! what disposal means (usually "remove this observer from my fan-out set"); whoever
//! holds a clone may trigger it. The teardown runs at most once no matter how many clones
//! call [`Subscription::dispose`], and it runs outside the handle's lock so it may call
//! back into the producer.

use std::sync::Arc;

use parking_lot::Mutex;

type Teardown = Box<dyn FnOnce() + Send + 'static>;

#[derive(Default)]
struct Inner {
    teardown: Option<Teardown>,
    disposed: bool,
}

/// Opaque disposal token. Dropping it does **not** dispose.
#[derive(Clone, Default)]
pub struct Subscription {
    inner: Arc<Mutex<Inner>>,
}

impl Subscription {
    /// Creates a handle that runs `teardown` on first disposal.
    pub fn new(teardown: impl FnOnce() + Send + 'static) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                teardown: Some(Box::new(teardown)),
                disposed: false,
            })),
        }
    }

    /// A handle whose disposal does nothing.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Runs the teardown if it has not run yet.
    pub fn dispose(&self) {
        let teardown = {
            let mut inner = self.inner.lock();
            inner.disposed = true;
            inner.teardown.take()
        };
        if let Some(teardown) = teardown {
            teardown();
        }
    }

    /// True once any clone has been disposed.
    pub fn is_disposed(&self) -> bool {
        self.inner.lock().disposed
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_teardown_runs_once_across_clones() {
        let hits = Arc::new(AtomicUsize::new(0));
        let h = Arc::clone(&hits);
        let sub = Subscription::new(move || {
            h.fetch_add(1, Ordering::SeqCst);
        });
        let other = sub.clone();

        assert!(!sub.is_disposed());
        sub.dispose();
        other.dispose();
        sub.dispose();

        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert!(other.is_disposed());
    }

    #[test]
    fn test_empty_handle_is_noop() {
        let sub = Subscription::empty();
        sub.dispose();
        assert!(sub.is_disposed());
    }

    #[test]
    fn test_teardown_may_reenter_handle() {
        let slot: Arc<Mutex<Option<Subscription>>> = Arc::new(Mutex::new(None));
        let s = Arc::clone(&slot);
        let sub = Subscription::new(move || {
            if let Some(me) = s.lock().as_ref() {
                assert!(me.is_disposed());
                me.dispose();
            }
        });
        *slot.lock() = Some(sub.clone());
        sub.dispose();
    }
}
