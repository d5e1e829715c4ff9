//! # AwaitableObserver: observer + awaitable bridge.
//!
//! Receives values from a producer, buffers them, runs a per-item callback, and exposes
//! the stream's completion through the [`Awaitable`] contract.
//!
//! ## Flow
//! ```text
//! producer ── on_next(v) ──► [completed?] ─yes─► ignore
//!                                 │ no
//!                                 ├─► callback(&v) ──Err(e)──► complete(e), dispose, return Err(e)
//!                                 └─► buffer.push(v)
//! producer ── on_completed ─► complete(None) ─► dispose subscription ─► continuations fire
//! producer ── on_error(e) ──► complete(e)    ─► dispose subscription ─► continuations fire
//! token.cancel() ───────────► complete(Canceled) ─► dispose subscription
//! ```
//!
//! ## Rules
//! - The first terminal outcome wins (natural termination vs. cancellation vs. callback
//!   failure); the others become no-ops through the signal's first-call-wins `complete`.
//! - The subscription handle is disposed at most once.
//! - Values arriving after termination are ignored silently.
//! - Every terminal path seals the buffer under its lock before completing, so a value
//!   whose callback races a cancellation is either kept before the outcome or dropped.

use std::future::{Future, IntoFuture};
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Weak};
use std::task::{Context, Poll};

use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::contract::{Awaitable, Awaiter, Continuation};
use crate::error::StreamError;
use crate::events::{Bus, Event, EventKind, publish_to};
use crate::signal::{Completion, CompletionSignal, SignalAwaiter};

use super::builder::SubscribeBuilder;
use super::cancel::CancelRegistration;
use super::{Observable, Observer, Subscription};

/// Per-item callback. Returning `Err` rejects the value and terminates the observer.
pub type Callback<T> = Box<dyn Fn(&T) -> Result<(), StreamError> + Send + Sync + 'static>;

/// Observer whose completion can be awaited.
///
/// Create it with [`AwaitableObserver::builder`] (or [`AwaitableObserver::drain`] when no
/// per-item work is needed).
///
/// # Example
/// ```
/// use std::sync::Arc;
/// use std::sync::atomic::{AtomicI64, Ordering};
/// use streamwait::{Awaitable, Awaiter, AwaitableObserver, MulticastReplay, Observer};
///
/// // Any `Observable` works as a source; a replay wrapper fed by hand is the simplest.
/// let source = MulticastReplay::<i64, i64>::detached(|v| Ok(v));
/// let sum = Arc::new(AtomicI64::new(0));
/// let s = Arc::clone(&sum);
///
/// let observer = AwaitableObserver::builder()
///     .for_each(move |v: &i64| { s.fetch_add(*v, Ordering::SeqCst); })
///     .subscribe(&*source)
///     .unwrap();
///
/// for v in [1, 2, 3] {
///     source.on_next(v).unwrap();
/// }
/// source.on_completed();
///
/// assert_eq!(observer.awaiter().wait().unwrap(), vec![1, 2, 3]);
/// assert_eq!(sum.load(Ordering::SeqCst), 6);
/// ```
pub struct AwaitableObserver<T> {
    signal: Arc<CompletionSignal>,
    values: Arc<Mutex<Vec<T>>>,
    callback: Callback<T>,
    retain: bool,
    sealed: AtomicBool,
    observed: AtomicUsize,
    subscription: Mutex<Option<Subscription>>,
    cancel: Mutex<Option<CancelRegistration>>,
    bus: Option<Bus>,
    name: Option<Arc<str>>,
}

impl<T: Send + 'static> AwaitableObserver<T> {
    /// Starts a subscribe builder.
    pub fn builder() -> SubscribeBuilder<T> {
        SubscribeBuilder::new()
    }

    /// Subscribes without a per-item callback; values are still buffered.
    pub fn drain<O>(source: &O, token: Option<CancellationToken>) -> Arc<Self>
    where
        O: Observable<T> + ?Sized,
    {
        let noop: Callback<T> = Box::new(|_: &T| Ok::<(), StreamError>(()));
        let observer = Arc::new(Self::new(noop, &Config::default(), None, None));
        let subscription = source.subscribe(observer.clone());
        observer.add_cancellation(subscription, token);
        observer
    }

    pub(crate) fn new(
        callback: Callback<T>,
        cfg: &Config,
        bus: Option<Bus>,
        name: Option<Arc<str>>,
    ) -> Self {
        let mut signal = CompletionSignal::new();
        if let Some(bus) = &bus {
            signal = signal.with_bus(bus.clone());
        }
        if let Some(name) = &name {
            signal = signal.named(Arc::clone(name));
        }
        let values = match cfg.buffer_capacity_hint() {
            Some(n) if cfg.retain_values => Vec::with_capacity(n),
            _ => Vec::new(),
        };

        Self {
            signal: Arc::new(signal),
            values: Arc::new(Mutex::new(values)),
            callback,
            retain: cfg.retain_values,
            sealed: AtomicBool::new(false),
            observed: AtomicUsize::new(0),
            subscription: Mutex::new(None),
            cancel: Mutex::new(None),
            bus,
            name,
        }
    }

    /// Takes ownership of the producer's `subscription` and links `token` to it.
    ///
    /// When the token fires, the subscription is disposed and the observer completes with
    /// [`StreamError::Canceled`]. An already-cancelled token fires right here. If the
    /// observer terminated while being subscribed, the subscription is disposed now.
    pub fn add_cancellation(
        self: &Arc<Self>,
        subscription: Subscription,
        token: Option<CancellationToken>,
    ) {
        {
            let mut slot = self.subscription.lock();
            if self.signal.is_completed() {
                drop(slot);
                subscription.dispose();
                return;
            }
            *slot = Some(subscription);
        }

        let Some(token) = token else { return };
        let weak: Weak<Self> = Arc::downgrade(self);
        let registration = CancelRegistration::register(&token, move || {
            if let Some(observer) = weak.upgrade() {
                observer.cancel();
            }
        });

        let mut slot = self.cancel.lock();
        if !self.signal.is_completed() {
            *slot = Some(registration);
        }
    }

    /// True once a terminal outcome has been recorded.
    pub fn is_completed(&self) -> bool {
        self.signal.is_completed()
    }

    /// Number of values accepted so far (including a rejected one).
    pub fn observed(&self) -> usize {
        self.observed.load(Ordering::SeqCst)
    }

    /// Untyped view of this observer's completion.
    pub fn signal(&self) -> SignalAwaiter {
        self.signal.awaiter()
    }

    fn cancel(&self) {
        self.seal();
        if self.signal.complete(Some(StreamError::Canceled)) {
            publish_to(self.bus.as_ref(), || {
                Event::new(EventKind::ObserverCanceled)
                    .with_source_opt(self.name.as_ref())
                    .with_count(self.observed())
            });
        }
        self.release();
    }

    fn terminate(&self, error: Option<StreamError>) {
        self.seal();
        self.signal.complete(error);
        self.release();
    }

    /// Closes the buffer to further pushes. Taken under the buffer lock so an
    /// in-flight push either lands first or sees the seal.
    fn seal(&self) {
        let _values = self.values.lock();
        self.sealed.store(true, Ordering::SeqCst);
    }

    /// Disposes the subscription and disarms cancellation; each happens at most once.
    fn release(&self) {
        let subscription = self.subscription.lock().take();
        if let Some(subscription) = subscription {
            subscription.dispose();
        }
        let registration = self.cancel.lock().take();
        drop(registration);
    }
}

impl<T: Clone + Send + 'static> AwaitableObserver<T> {
    /// Snapshot of the buffered values.
    pub fn values(&self) -> Vec<T> {
        self.values.lock().clone()
    }
}

impl<T: Send + 'static> Observer<T> for AwaitableObserver<T> {
    fn on_next(&self, value: T) -> Result<(), StreamError> {
        if self.signal.is_completed() {
            return Ok(());
        }
        let observed = self.observed.fetch_add(1, Ordering::SeqCst) + 1;

        let outcome = (self.callback)(&value);
        if self.retain {
            let mut values = self.values.lock();
            if !self.sealed.load(Ordering::SeqCst) {
                values.push(value);
            }
        }

        if let Err(err) = &outcome {
            self.seal();
            if self.signal.complete(Some(err.clone())) {
                publish_to(self.bus.as_ref(), || {
                    Event::new(EventKind::CallbackFailed)
                        .with_source_opt(self.name.as_ref())
                        .with_reason(err.as_message())
                        .with_count(observed)
                });
            }
            self.release();
        }
        outcome
    }

    fn on_completed(&self) {
        self.terminate(None);
    }

    fn on_error(&self, error: StreamError) {
        self.terminate(Some(error));
    }
}

impl<T: Clone + Send + 'static> Awaitable for AwaitableObserver<T> {
    type Output = Vec<T>;
    type Awaiter = ObserverAwaiter<T>;

    fn awaiter(&self) -> ObserverAwaiter<T> {
        ObserverAwaiter {
            signal: self.signal.awaiter(),
            values: Arc::clone(&self.values),
        }
    }
}

impl<T> std::fmt::Debug for AwaitableObserver<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AwaitableObserver")
            .field("name", &self.name)
            .field("signal", &self.signal)
            .field("observed", &self.observed.load(Ordering::SeqCst))
            .field(
                "cancellable",
                &self.cancel.lock().as_ref().is_some_and(CancelRegistration::is_armed),
            )
            .finish()
    }
}

/// Typed awaiter: on success yields every buffered value, in emission order.
#[derive(Clone)]
pub struct ObserverAwaiter<T> {
    signal: SignalAwaiter,
    values: Arc<Mutex<Vec<T>>>,
}

impl<T: Clone> Awaiter for ObserverAwaiter<T> {
    type Output = Vec<T>;

    fn is_completed(&self) -> bool {
        self.signal.is_completed()
    }

    fn wait(&self) -> Result<Vec<T>, StreamError> {
        self.signal.wait()?;
        Ok(self.values.lock().clone())
    }

    fn on_completed(&self, continuation: Continuation) {
        self.signal.on_completed(continuation);
    }
}

impl<T: Clone> IntoFuture for ObserverAwaiter<T> {
    type Output = Result<Vec<T>, StreamError>;
    type IntoFuture = ObserverCompletion<T>;

    fn into_future(self) -> ObserverCompletion<T> {
        ObserverCompletion {
            inner: self.signal.into_future(),
            values: self.values,
        }
    }
}

/// Future returned by `.await`ing an [`ObserverAwaiter`].
#[must_use = "futures do nothing unless polled"]
pub struct ObserverCompletion<T> {
    inner: Completion,
    values: Arc<Mutex<Vec<T>>>,
}

impl<T: Clone> Future for ObserverCompletion<T> {
    type Output = Result<Vec<T>, StreamError>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        match Pin::new(&mut this.inner).poll(cx) {
            Poll::Ready(Ok(())) => Poll::Ready(Ok(this.values.lock().clone())),
            Poll::Ready(Err(err)) => Poll::Ready(Err(err)),
            Poll::Pending => Poll::Pending,
        }
    }
}
