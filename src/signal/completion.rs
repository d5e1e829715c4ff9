//! # CompletionSignal: first-call-wins terminal state with a continuation queue.
//!
//! ## Rules
//! - `complete()` succeeds once; later calls are no-ops and return `false`.
//! - The error is recorded at the same instant `completed` becomes true.
//! - Continuations queued before completion run exactly once, in FIFO order, on the
//!   completing thread. Continuations registered afterwards run immediately on the
//!   registering thread.
//! - Blocking waiters park on a condvar woken by `complete()` (no polling).
//!
//! ## Isolation
//! The lock is released before any continuation runs, so a continuation may call back
//! into the same signal. A panicking continuation is caught and reported as
//! [`EventKind::ContinuationPanicked`]; the remaining continuations still run.

use std::collections::VecDeque;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

use crate::contract::{Awaitable, Continuation};
use crate::error::StreamError;
use crate::events::{Bus, Event, EventKind, panic_message, publish_to};

use super::SignalAwaiter;

/// Mutable state guarded by the signal's lock.
#[derive(Default)]
struct State {
    completed: bool,
    error: Option<StreamError>,
    pending: VecDeque<Continuation>,
}

impl State {
    fn outcome(&self) -> Result<(), StreamError> {
        match &self.error {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }
}

/// Synchronization cell recording completion and draining queued continuations.
///
/// Share it as `Arc<CompletionSignal>`; [`Awaitable`] is implemented for the `Arc`.
///
/// # Example
/// ```
/// use std::sync::Arc;
/// use streamwait::{Awaitable, Awaiter, CompletionSignal};
///
/// let signal = Arc::new(CompletionSignal::new());
/// let awaiter = signal.awaiter();
/// assert!(!awaiter.is_completed());
///
/// assert!(signal.complete(None));
/// assert!(awaiter.wait().is_ok());
/// ```
#[derive(Default)]
pub struct CompletionSignal {
    state: Mutex<State>,
    done: Condvar,
    bus: Option<Bus>,
    name: Option<Arc<str>>,
}

impl CompletionSignal {
    /// Creates a pending signal.
    pub fn new() -> Self {
        Self::default()
    }

    /// Publishes diagnostics (completion, continuation panics) to `bus`.
    pub fn with_bus(mut self, bus: Bus) -> Self {
        self.bus = Some(bus);
        self
    }

    /// Names the signal in published events.
    pub fn named(mut self, name: impl Into<Arc<str>>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Completes the signal; `None` means success.
    ///
    /// Returns `true` if this call performed the transition, `false` if the signal was
    /// already completed (the call is then a no-op and the stored error is untouched).
    pub fn complete(&self, error: Option<StreamError>) -> bool {
        let label = error.as_ref().map(StreamError::as_label);
        let drained = {
            let mut state = self.state.lock();
            if state.completed {
                return false;
            }
            state.completed = true;
            state.error = error;
            std::mem::take(&mut state.pending)
        };
        self.done.notify_all();

        let drained_count = drained.len();
        for continuation in drained {
            self.invoke(continuation);
        }

        publish_to(self.bus.as_ref(), || {
            let ev = Event::new(EventKind::SignalCompleted)
                .with_source_opt(self.name.as_ref())
                .with_count(drained_count);
            match label {
                Some(label) => ev.with_reason(label),
                None => ev,
            }
        });
        true
    }

    /// Queues `continuation`, or runs it right away if the signal already completed.
    pub fn register_continuation(&self, continuation: Continuation) {
        {
            let mut state = self.state.lock();
            if !state.completed {
                state.pending.push_back(continuation);
                return;
            }
        }
        self.invoke(continuation);
    }

    /// True once [`complete`](Self::complete) has run.
    pub fn is_completed(&self) -> bool {
        self.state.lock().completed
    }

    /// The stored error, if the signal completed with one.
    pub fn error(&self) -> Option<StreamError> {
        self.state.lock().error.clone()
    }

    /// Non-blocking read of the outcome; `None` while pending.
    pub fn outcome(&self) -> Option<Result<(), StreamError>> {
        let state = self.state.lock();
        state.completed.then(|| state.outcome())
    }

    /// Number of continuations queued and not yet invoked.
    pub fn pending(&self) -> usize {
        self.state.lock().pending.len()
    }

    /// Blocks the calling thread until the signal completes.
    pub fn wait(&self) -> Result<(), StreamError> {
        let mut state = self.state.lock();
        while !state.completed {
            self.done.wait(&mut state);
        }
        state.outcome()
    }

    /// Blocks for at most `timeout`; returns `None` if the signal is still pending.
    pub fn wait_for(&self, timeout: Duration) -> Option<Result<(), StreamError>> {
        let Some(deadline) = Instant::now().checked_add(timeout) else {
            return Some(self.wait());
        };
        let mut state = self.state.lock();
        while !state.completed {
            if self.done.wait_until(&mut state, deadline).timed_out() {
                break;
            }
        }
        state.completed.then(|| state.outcome())
    }

    /// Runs one continuation, containing a panic to this call.
    fn invoke(&self, continuation: Continuation) {
        if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(continuation)) {
            let info = panic_message(payload.as_ref());
            publish_to(self.bus.as_ref(), || {
                Event::new(EventKind::ContinuationPanicked)
                    .with_source_opt(self.name.as_ref())
                    .with_reason(info)
            });
        }
    }
}

impl std::fmt::Debug for CompletionSignal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("CompletionSignal")
            .field("name", &self.name)
            .field("completed", &state.completed)
            .field("error", &state.error)
            .field("pending", &state.pending.len())
            .finish()
    }
}

impl Awaitable for Arc<CompletionSignal> {
    type Output = ();
    type Awaiter = SignalAwaiter;

    fn awaiter(&self) -> SignalAwaiter {
        SignalAwaiter::new(Arc::clone(self))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;

    fn recorder() -> (Arc<Mutex<Vec<usize>>>, impl Fn(usize) -> Continuation) {
        let log = Arc::new(Mutex::new(Vec::new()));
        let make = {
            let log = Arc::clone(&log);
            move |id: usize| -> Continuation {
                let log = Arc::clone(&log);
                Box::new(move || log.lock().push(id))
            }
        };
        (log, make)
    }

    #[test]
    fn test_queued_continuations_run_once_in_fifo_order() {
        let signal = CompletionSignal::new();
        let (log, make) = recorder();

        for id in 0..5 {
            signal.register_continuation(make(id));
        }
        assert_eq!(signal.pending(), 5);
        assert!(log.lock().is_empty());

        assert!(signal.complete(None));
        assert_eq!(*log.lock(), vec![0, 1, 2, 3, 4]);
        assert_eq!(signal.pending(), 0);

        assert!(!signal.complete(None));
        assert_eq!(log.lock().len(), 5);
    }

    #[test]
    fn test_late_continuation_runs_synchronously() {
        let signal = CompletionSignal::new();
        signal.complete(None);

        let hits = Arc::new(AtomicUsize::new(0));
        let h = Arc::clone(&hits);
        let caller = thread::current().id();
        signal.register_continuation(Box::new(move || {
            assert_eq!(thread::current().id(), caller);
            h.fetch_add(1, Ordering::SeqCst);
        }));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_second_complete_does_not_overwrite_error() {
        let signal = CompletionSignal::new();
        assert!(signal.complete(Some(StreamError::producer("first"))));
        assert!(!signal.complete(Some(StreamError::producer("second"))));
        assert!(!signal.complete(None));

        let err = signal.error().expect("error stored");
        assert_eq!(err.to_string(), "producer failed: first");
    }

    #[test]
    fn test_wait_is_repeatable_after_failure() {
        let signal = CompletionSignal::new();
        signal.complete(Some(StreamError::producer("E")));
        for _ in 0..2 {
            let err = signal.wait().unwrap_err();
            assert_eq!(err.to_string(), "producer failed: E");
        }
    }

    #[test]
    fn test_wait_blocks_until_completed_from_other_thread() {
        let signal = Arc::new(CompletionSignal::new());
        let s = Arc::clone(&signal);
        let completer = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            s.complete(None);
        });

        assert!(signal.wait().is_ok());
        assert!(signal.is_completed());
        completer.join().unwrap();
    }

    #[test]
    fn test_wait_for_times_out_while_pending() {
        let signal = CompletionSignal::new();
        assert!(signal.wait_for(Duration::from_millis(10)).is_none());
        signal.complete(Some(StreamError::Canceled));
        let outcome = signal.wait_for(Duration::from_millis(10)).expect("completed");
        assert!(outcome.unwrap_err().is_canceled());
    }

    #[test]
    fn test_wait_for_unbounded_timeout_waits_for_completion() {
        let signal = Arc::new(CompletionSignal::new());
        let s = Arc::clone(&signal);
        let completer = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            s.complete(Some(StreamError::producer("late")));
        });

        let outcome = signal.wait_for(Duration::MAX).expect("completed");
        assert_eq!(outcome.unwrap_err().to_string(), "producer failed: late");
        completer.join().unwrap();

        assert!(signal.wait_for(Duration::MAX).expect("completed").is_err());
    }

    #[test]
    fn test_panicking_continuation_does_not_stop_drain() {
        let bus = Bus::new(16);
        let mut rx = bus.subscribe();
        let signal = CompletionSignal::new().with_bus(bus).named("sig");
        let (log, make) = recorder();

        signal.register_continuation(make(1));
        signal.register_continuation(Box::new(|| panic!("bad waiter")));
        signal.register_continuation(make(3));
        signal.complete(None);

        assert_eq!(*log.lock(), vec![1, 3]);

        let panicked = rx.try_recv().expect("panic event");
        assert_eq!(panicked.kind, EventKind::ContinuationPanicked);
        assert_eq!(panicked.source.as_deref(), Some("sig"));
        assert_eq!(panicked.reason.as_deref(), Some("bad waiter"));

        let completed = rx.try_recv().expect("completion event");
        assert_eq!(completed.kind, EventKind::SignalCompleted);
        assert_eq!(completed.count, Some(3));
    }

    #[test]
    fn test_continuation_may_reenter_signal() {
        let signal = Arc::new(CompletionSignal::new());
        let inner_ran = Arc::new(AtomicUsize::new(0));

        let s = Arc::clone(&signal);
        let flag = Arc::clone(&inner_ran);
        signal.register_continuation(Box::new(move || {
            assert!(s.is_completed());
            assert!(!s.complete(None));
            let flag = Arc::clone(&flag);
            s.register_continuation(Box::new(move || {
                flag.fetch_add(1, Ordering::SeqCst);
            }));
        }));
        signal.complete(None);
        assert_eq!(inner_ran.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_concurrent_register_and_complete_invoke_each_once() {
        for _ in 0..50 {
            let signal = Arc::new(CompletionSignal::new());
            let hits = Arc::new(AtomicUsize::new(0));

            let registrars: Vec<_> = (0..4)
                .map(|_| {
                    let signal = Arc::clone(&signal);
                    let hits = Arc::clone(&hits);
                    thread::spawn(move || {
                        for _ in 0..25 {
                            let hits = Arc::clone(&hits);
                            signal.register_continuation(Box::new(move || {
                                hits.fetch_add(1, Ordering::SeqCst);
                            }));
                        }
                    })
                })
                .collect();
            let s = Arc::clone(&signal);
            let completer = thread::spawn(move || s.complete(None));

            for r in registrars {
                r.join().unwrap();
            }
            assert!(completer.join().unwrap());
            assert_eq!(hits.load(Ordering::SeqCst), 100);
        }
    }
}
