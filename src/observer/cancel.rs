//! # Cancellation registration without a runtime.
//!
//! Runs an action when a [`CancellationToken`] fires, on the thread that cancels it,
//! without spawning a task. The token's `cancelled_owned()` future is polled with a waker
//! that re-polls it; tokio-util wakes that waker from inside `cancel()`.
//!
//! ## Rules
//! - A token that is already cancelled fires during [`CancelRegistration::register`].
//! - The action runs at most once and outside every internal lock.
//! - [`CancelRegistration::disarm`] (also on drop) drops the pending future, which
//!   unregisters the waker from the token.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::Context;

use futures::task::{self, ArcWake};
use parking_lot::Mutex;
use tokio_util::sync::{CancellationToken, WaitForCancellationFutureOwned};

type Action = Box<dyn FnOnce() + Send + 'static>;

struct Watch {
    cancelled: Mutex<Option<Pin<Box<WaitForCancellationFutureOwned>>>>,
    action: Mutex<Option<Action>>,
}

impl Watch {
    fn poll(self: &Arc<Self>) {
        let waker = task::waker(Arc::clone(self));
        let mut cx = Context::from_waker(&waker);

        let fired = {
            let mut slot = self.cancelled.lock();
            let ready = match slot.as_mut() {
                Some(fut) => fut.as_mut().poll(&mut cx).is_ready(),
                None => false,
            };
            if ready {
                *slot = None;
            }
            ready
        };

        if fired {
            let action = self.action.lock().take();
            if let Some(action) = action {
                action();
            }
        }
    }
}

impl ArcWake for Watch {
    fn wake_by_ref(arc_self: &Arc<Self>) {
        arc_self.poll();
    }
}

/// Live link between a token and a one-shot action.
pub(crate) struct CancelRegistration {
    watch: Arc<Watch>,
}

impl CancelRegistration {
    /// Arms `action` on `token`; fires immediately if the token is already cancelled.
    pub(crate) fn register(token: &CancellationToken, action: impl FnOnce() + Send + 'static) -> Self {
        let watch = Arc::new(Watch {
            cancelled: Mutex::new(Some(Box::pin(token.clone().cancelled_owned()))),
            action: Mutex::new(Some(Box::new(action))),
        });
        watch.poll();
        Self { watch }
    }

    /// Drops the action without running it.
    pub(crate) fn disarm(&self) {
        let fut = self.watch.cancelled.lock().take();
        let action = self.watch.action.lock().take();
        drop(fut);
        drop(action);
    }

    /// True while the action can still fire.
    pub(crate) fn is_armed(&self) -> bool {
        self.watch.action.lock().is_some()
    }
}

impl Drop for CancelRegistration {
    fn drop(&mut self) {
        self.disarm();
    }
}
