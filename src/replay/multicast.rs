//! # MulticastReplay: transform, cache and fan out one upstream.
//!
//! ## Locking
//! - **gate** (`ReentrantMutex<()>`): serializes emissions, terminal delivery and replays,
//!   which gives every observer one global order. It is reentrant, so an observer may
//!   subscribe, dispose or even emit from inside a callback on the same thread.
//! - **state** (`Mutex`): cache, live set, terminal state and the pending queue. Never
//!   held while user code runs; fan-out works on a snapshot of the live set.
//!
//! ## Reentrant emission
//! ```text
//! on_next(1) ─► cache [1] ─► emitting = true ─► fan-out 1 ──► A.on_next(1)
//!                                                              └─► on_next(2): cache [1, 2],
//!                                                                  pending [#1], return
//!            ◄─ fan-out 1 finishes (B, C, ...) ─► drain pending ─► fan-out 2 ─► emitting = false
//! ```
//! A nested `on_next` or terminal only records itself; the outermost call delivers it once
//! its own fan-out is done. Every live subscriber therefore sees the cache order, and a
//! reentrant terminal arrives after every value cached before it.
//!
//! ## Replay
//! `subscribe` walks the cache by index, re-reading it under the state lock at each step,
//! and attaches to the live set in the same critical section that observes the end of the
//! cache. The attachment records the cache length, so values already replayed are skipped
//! by any fan-out still pending.
//!
//! ## Failures
//! - Transform error: terminal for the wrapper. Every live subscriber receives `on_error`,
//!   the upstream subscription is disposed, and the error is returned to the upstream.
//! - Downstream `on_next` error: only that subscriber is detached
//!   ([`EventKind::SubscriberDetached`]).

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::{Mutex, ReentrantMutex};

use crate::error::StreamError;
use crate::events::{Bus, Event, EventKind, publish_to};
use crate::observer::{Observable, Observer, Subscription};

use super::slots::{SlotKey, Slots};

/// Per-value transform applied before caching.
pub type Transform<T, U> = Box<dyn Fn(T) -> Result<U, StreamError> + Send + Sync + 'static>;

#[derive(Clone, Debug)]
enum Terminal {
    Completed,
    Errored(StreamError),
}

impl Terminal {
    fn deliver<U>(&self, observer: &dyn Observer<U>) {
        match self {
            Terminal::Completed => observer.on_completed(),
            Terminal::Errored(err) => observer.on_error(err.clone()),
        }
    }
}

/// Live subscriber; `from` is the first cache index it has not seen through replay.
struct Live<U> {
    observer: Arc<dyn Observer<U>>,
    from: usize,
}

/// Delivery recorded by a reentrant call, run by the outermost one.
enum Delivery {
    Value(usize),
    Terminal(Terminal),
}

struct State<U> {
    cache: Vec<U>,
    live: Slots<Live<U>>,
    terminal: Option<Terminal>,
    emitting: bool,
    pending: VecDeque<Delivery>,
}

enum Step<U> {
    Replay(U),
    Finish(Terminal),
    Attached(SlotKey),
}

/// Ends an emission round; also runs when a subscriber panics mid fan-out.
struct Emitting<'a, U> {
    state: &'a Mutex<State<U>>,
}

impl<U> Drop for Emitting<'_, U> {
    fn drop(&mut self) {
        let mut state = self.state.lock();
        state.emitting = false;
        state.pending.clear();
    }
}

/// Replaying multicast wrapper over one upstream producer.
///
/// # Example
/// ```
/// use std::sync::Arc;
/// use streamwait::{Awaitable, Awaiter, AwaitableObserver, MulticastReplay, Observer};
///
/// let doubled = MulticastReplay::<i32, i32>::detached(|x| Ok(x * 2));
/// doubled.on_next(5).unwrap();
///
/// let late = AwaitableObserver::drain(&*doubled, None);
/// doubled.on_next(7).unwrap();
/// doubled.on_completed();
///
/// assert_eq!(late.awaiter().wait().unwrap(), vec![10, 14]);
/// assert_eq!(doubled.cached(), vec![10, 14]);
/// ```
pub struct MulticastReplay<T, U> {
    transform: Transform<T, U>,
    gate: ReentrantMutex<()>,
    state: Arc<Mutex<State<U>>>,
    upstream: Mutex<Option<Subscription>>,
    bus: Option<Bus>,
    name: Option<Arc<str>>,
}

impl<T, U> MulticastReplay<T, U>
where
    T: Send + 'static,
    U: Clone + Send + 'static,
{
    /// Creates an unconnected wrapper; see [`connect`](Self::connect).
    pub fn new<F>(transform: F) -> Self
    where
        F: Fn(T) -> Result<U, StreamError> + Send + Sync + 'static,
    {
        Self {
            transform: Box::new(transform),
            gate: ReentrantMutex::new(()),
            state: Arc::new(Mutex::new(State {
                cache: Vec::new(),
                live: Slots::new(),
                terminal: None,
                emitting: false,
                pending: VecDeque::new(),
            })),
            upstream: Mutex::new(None),
            bus: None,
            name: None,
        }
    }

    /// Shared wrapper without an upstream, fed directly through [`Observer`].
    pub fn detached<F>(transform: F) -> Arc<Self>
    where
        F: Fn(T) -> Result<U, StreamError> + Send + Sync + 'static,
    {
        Arc::new(Self::new(transform))
    }

    /// Publishes diagnostics to `bus`.
    pub fn with_bus(mut self, bus: Bus) -> Self {
        self.bus = Some(bus);
        self
    }

    /// Names the wrapper in published events.
    pub fn named(mut self, name: impl Into<Arc<str>>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Preallocates room for `n` cached values.
    pub fn with_capacity(self, n: usize) -> Self {
        self.state.lock().cache.reserve(n);
        self
    }

    /// Shares the wrapper and subscribes it to `source` immediately.
    ///
    /// A source that terminates during `subscribe` leaves the wrapper terminal; its
    /// subscription is then disposed right away.
    pub fn connect<O>(self, source: &O) -> Arc<Self>
    where
        O: Observable<T> + ?Sized,
    {
        let wrapper = Arc::new(self);
        let subscription = source.subscribe(wrapper.clone());

        let leftover = {
            let mut slot = wrapper.upstream.lock();
            if wrapper.is_terminated() {
                Some(subscription)
            } else {
                *slot = Some(subscription);
                None
            }
        };
        if let Some(subscription) = leftover {
            subscription.dispose();
        }
        wrapper
    }

    /// Snapshot of every transformed value so far, in emission order.
    pub fn cached(&self) -> Vec<U> {
        self.state.lock().cache.clone()
    }

    /// Number of attached live subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.state.lock().live.len()
    }

    /// True once completed or errored.
    pub fn is_terminated(&self) -> bool {
        self.state.lock().terminal.is_some()
    }

    /// The terminal error, if the wrapper failed.
    pub fn error(&self) -> Option<StreamError> {
        match &self.state.lock().terminal {
            Some(Terminal::Errored(err)) => Some(err.clone()),
            _ => None,
        }
    }

    fn finish(&self, terminal: Terminal) {
        let _gate = self.gate.lock();
        {
            let mut state = self.state.lock();
            if state.terminal.is_some() {
                return;
            }
            state.terminal = Some(terminal.clone());
            if state.emitting {
                state.pending.push_back(Delivery::Terminal(terminal));
                return;
            }
        }
        self.conclude(&terminal);
    }

    /// Delivers the recorded terminal to the live set, then lets go of the upstream.
    fn conclude(&self, terminal: &Terminal) {
        let (observers, cached) = {
            let mut state = self.state.lock();
            (state.live.drain(), state.cache.len())
        };

        for live in &observers {
            terminal.deliver(live.observer.as_ref());
        }

        publish_to(self.bus.as_ref(), || {
            let ev = Event::new(EventKind::ReplayTerminated)
                .with_source_opt(self.name.as_ref())
                .with_count(cached);
            match terminal {
                Terminal::Errored(err) => ev.with_reason(err.to_string()),
                Terminal::Completed => ev,
            }
        });

        let upstream = self.upstream.lock().take();
        if let Some(upstream) = upstream {
            upstream.dispose();
        }
    }

    /// Sends the cached value at `index` to every live subscriber that has not replayed it.
    fn fan_out(&self, index: usize) {
        let (value, targets) = {
            let state = self.state.lock();
            let Some(value) = state.cache.get(index).cloned() else {
                return;
            };
            let targets: Vec<(SlotKey, Arc<dyn Observer<U>>)> = state
                .live
                .iter()
                .filter(|(_, live)| live.from <= index)
                .map(|(key, live)| (key, Arc::clone(&live.observer)))
                .collect();
            (value, targets)
        };

        for (key, observer) in targets {
            if !self.state.lock().live.contains(key) {
                continue;
            }
            if let Err(err) = observer.on_next(value.clone()) {
                self.detach(Some(key), &err);
            }
        }
    }

    /// Runs the deliveries recorded by reentrant calls, in the order they were made.
    fn drain_pending(&self) {
        loop {
            let next = self.state.lock().pending.pop_front();
            match next {
                Some(Delivery::Value(index)) => self.fan_out(index),
                Some(Delivery::Terminal(terminal)) => self.conclude(&terminal),
                None => break,
            }
        }
    }

    fn detach(&self, key: Option<SlotKey>, err: &StreamError) {
        if let Some(key) = key {
            self.state.lock().live.remove(key);
        }
        publish_to(self.bus.as_ref(), || {
            Event::new(EventKind::SubscriberDetached)
                .with_source_opt(self.name.as_ref())
                .with_reason(err.to_string())
        });
    }
}

impl<T, U> Observer<T> for MulticastReplay<T, U>
where
    T: Send + 'static,
    U: Clone + Send + 'static,
{
    fn on_next(&self, value: T) -> Result<(), StreamError> {
        let _gate = self.gate.lock();
        if self.is_terminated() {
            return Ok(());
        }

        let mapped = match (self.transform)(value) {
            Ok(mapped) => mapped,
            Err(err) => {
                publish_to(self.bus.as_ref(), || {
                    Event::new(EventKind::TransformFailed)
                        .with_source_opt(self.name.as_ref())
                        .with_reason(err.to_string())
                });
                self.finish(Terminal::Errored(err.clone()));
                return Err(err);
            }
        };

        let index = {
            let mut state = self.state.lock();
            if state.terminal.is_some() {
                return Ok(());
            }
            state.cache.push(mapped);
            let index = state.cache.len() - 1;
            if state.emitting {
                state.pending.push_back(Delivery::Value(index));
                return Ok(());
            }
            state.emitting = true;
            index
        };

        let _round = Emitting { state: &self.state };
        self.fan_out(index);
        self.drain_pending();
        Ok(())
    }

    fn on_completed(&self) {
        self.finish(Terminal::Completed);
    }

    fn on_error(&self, error: StreamError) {
        self.finish(Terminal::Errored(error));
    }
}

impl<T, U> Observable<U> for MulticastReplay<T, U>
where
    T: Send + 'static,
    U: Clone + Send + 'static,
{
    fn subscribe(&self, observer: Arc<dyn Observer<U>>) -> Subscription {
        let _gate = self.gate.lock();
        let mut next = 0;
        loop {
            let step = {
                let mut guard = self.state.lock();
                let state = &mut *guard;
                match state.cache.get(next) {
                    Some(value) => Step::Replay(value.clone()),
                    None => match &state.terminal {
                        Some(terminal) => Step::Finish(terminal.clone()),
                        None => Step::Attached(state.live.insert(Live {
                            observer: Arc::clone(&observer),
                            from: next,
                        })),
                    },
                }
            };

            match step {
                Step::Replay(value) => {
                    if let Err(err) = observer.on_next(value) {
                        self.detach(None, &err);
                        return Subscription::empty();
                    }
                    next += 1;
                }
                Step::Finish(terminal) => {
                    terminal.deliver(observer.as_ref());
                    return Subscription::empty();
                }
                Step::Attached(key) => {
                    let state = Arc::downgrade(&self.state);
                    return Subscription::new(move || {
                        if let Some(state) = state.upgrade() {
                            state.lock().live.remove(key);
                        }
                    });
                }
            }
        }
    }
}

impl<T, U> std::fmt::Debug for MulticastReplay<T, U> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("MulticastReplay")
            .field("name", &self.name)
            .field("cached", &state.cache.len())
            .field("live", &state.live.len())
            .field("pending", &state.pending.len())
            .field("terminal", &state.terminal)
            .finish()
    }
}
