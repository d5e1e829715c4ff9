//! # Untyped awaiter and its future.
//!
//! [`SignalAwaiter`] blocks through the signal's condvar and registers continuations
//! directly on it. `.await`ing it yields a [`Completion`] future, which registers one
//! continuation on first poll and is woken by it; nothing is spawned.

use std::future::{Future, IntoFuture};
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures::FutureExt;
use tokio::sync::oneshot;

use crate::contract::{Awaiter, Continuation};
use crate::error::StreamError;

use super::CompletionSignal;

/// Awaiter over a shared [`CompletionSignal`]. Cheap to clone.
#[derive(Clone, Debug)]
pub struct SignalAwaiter {
    signal: Arc<CompletionSignal>,
}

impl SignalAwaiter {
    pub(crate) fn new(signal: Arc<CompletionSignal>) -> Self {
        Self { signal }
    }

    /// The signal this awaiter observes.
    pub fn signal(&self) -> &Arc<CompletionSignal> {
        &self.signal
    }
}

impl Awaiter for SignalAwaiter {
    type Output = ();

    fn is_completed(&self) -> bool {
        self.signal.is_completed()
    }

    fn wait(&self) -> Result<(), StreamError> {
        self.signal.wait()
    }

    fn on_completed(&self, continuation: Continuation) {
        self.signal.register_continuation(continuation);
    }
}

impl IntoFuture for SignalAwaiter {
    type Output = Result<(), StreamError>;
    type IntoFuture = Completion;

    fn into_future(self) -> Completion {
        Completion {
            signal: self.signal,
            notified: None,
        }
    }
}

/// Future resolving to the signal's outcome.
///
/// The first poll on a pending signal registers a continuation that fires a oneshot;
/// a signal that is already complete resolves without registering anything.
#[must_use = "futures do nothing unless polled"]
pub struct Completion {
    signal: Arc<CompletionSignal>,
    notified: Option<oneshot::Receiver<()>>,
}

impl Future for Completion {
    type Output = Result<(), StreamError>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        if let Some(outcome) = this.signal.outcome() {
            return Poll::Ready(outcome);
        }

        let signal = &this.signal;
        let rx = this.notified.get_or_insert_with(|| {
            let (tx, rx) = oneshot::channel();
            signal.register_continuation(Box::new(move || {
                let _ = tx.send(());
            }));
            rx
        });

        match rx.poll_unpin(cx) {
            // The sender only drops unfired together with the signal, which we hold.
            Poll::Ready(_) => Poll::Ready(
                this.signal
                    .outcome()
                    .unwrap_or(Err(StreamError::Canceled)),
            ),
            Poll::Pending => Poll::Pending,
        }
    }
}
