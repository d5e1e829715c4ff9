//! # SubscriberSet: non-blocking fan-out over multiple subscribers
//!
//! [`SubscriberSet`] distributes each [`Event`] to every subscriber **without awaiting**
//! their processing.
//!
//! ## Rules
//! - **Non-blocking**: `emit()` uses `try_send` and returns immediately.
//! - **Per-subscriber FIFO**: each worker sees events in queue order.
//! - **Overflow**: the event is dropped for that subscriber only and `SubscriberOverflow`
//!   is published. Overflow events never trigger further overflow events.
//! - **Panic isolation**: a panicking `on_event` is caught and reported as
//!   `SubscriberPanicked`; the worker keeps running.
//!
//! ## Diagram
//! ```text
//!    Bus ── listen(bus, token) ──► emit_arc(Arc<Event>)
//!                                      ├──► [queue S1] ─► worker S1 ─► on_event()
//!                                      ├──► [queue S2] ─► worker S2 ─► on_event()
//!                                      └──► [queue SN] ─► worker SN ─► on_event()
//! ```

use std::sync::Arc;

use futures::FutureExt;
use tokio::sync::broadcast::error::RecvError;
use tokio::{sync::mpsc, task::JoinHandle};
use tokio_util::sync::CancellationToken;

use super::Subscribe;
use crate::events::{Bus, Event, EventKind, panic_message};

/// Per-subscriber channel metadata.
struct SubscriberChannel {
    name: &'static str,
    sender: mpsc::Sender<Arc<Event>>,
}

/// Fan-out coordinator for event subscribers.
///
/// Owns one bounded queue and one worker task per subscriber. Must be created inside a
/// tokio runtime.
pub struct SubscriberSet {
    channels: Vec<SubscriberChannel>,
    workers: Vec<JoinHandle<()>>,
    bus: Bus,
}

impl SubscriberSet {
    /// Creates a new set and spawns one worker task per subscriber.
    ///
    /// Queue capacity comes from [`Subscribe::queue_capacity`], with a minimum of 1.
    /// Panics and overflows are reported on `bus`.
    #[must_use]
    pub fn new(subs: Vec<Arc<dyn Subscribe>>, bus: Bus) -> Self {
        let mut channels = Vec::with_capacity(subs.len());
        let mut workers = Vec::with_capacity(subs.len());

        for sub in subs {
            let cap = sub.queue_capacity().max(1);
            let name = sub.name();
            let (tx, mut rx) = mpsc::channel::<Arc<Event>>(cap);
            let bus_for_worker = bus.clone();

            let handle = tokio::spawn(async move {
                while let Some(ev) = rx.recv().await {
                    let fut = sub.on_event(ev.as_ref());
                    if let Err(payload) = std::panic::AssertUnwindSafe(fut).catch_unwind().await {
                        bus_for_worker
                            .publish(Event::subscriber_panicked(name, panic_message(&*payload)));
                    }
                }
            });

            channels.push(SubscriberChannel { name, sender: tx });
            workers.push(handle);
        }

        Self {
            channels,
            workers,
            bus,
        }
    }

    /// Emits an event to all subscribers (clones the event).
    pub fn emit(&self, event: &Event) {
        self.emit_arc(Arc::new(event.clone()));
    }

    /// Emits a pre-allocated event to all subscribers.
    pub fn emit_arc(&self, event: Arc<Event>) {
        let is_overflow_evt = event.is_subscriber_overflow();

        for channel in &self.channels {
            let reason = match channel.sender.try_send(Arc::clone(&event)) {
                Ok(()) => continue,
                Err(mpsc::error::TrySendError::Full(_)) => "full",
                Err(mpsc::error::TrySendError::Closed(_)) => "closed",
            };
            if !is_overflow_evt {
                self.bus
                    .publish(Event::subscriber_overflow(channel.name, reason));
            }
        }
    }

    /// Spawns the bus listener that forwards events into this set until `token` is
    /// cancelled or the bus closes.
    ///
    /// A lagging listener reports the skipped count as a `SubscriberOverflow` event
    /// delivered straight to the subscribers.
    pub fn listen(self: Arc<Self>, bus: &Bus, token: CancellationToken) -> JoinHandle<()> {
        let mut rx = bus.subscribe();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    msg = rx.recv() => match msg {
                        Ok(ev) => self.emit_arc(Arc::new(ev)),
                        Err(RecvError::Closed) => break,
                        Err(RecvError::Lagged(skipped)) => {
                            let ev = Event::new(EventKind::SubscriberOverflow)
                                .with_source("listener")
                                .with_reason("lagged")
                                .with_count(usize::try_from(skipped).unwrap_or(usize::MAX));
                            self.emit_arc(Arc::new(ev));
                        }
                    }
                }
            }
        })
    }

    /// Gracefully shuts down all workers.
    ///
    /// Closes every queue, then awaits the workers; queued events are still delivered.
    pub async fn shutdown(self) {
        drop(self.channels);
        for h in self.workers {
            let _ = h.await;
        }
    }

    /// True if there are no subscribers.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    /// Number of subscribers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.channels.len()
    }
}

impl std::fmt::Debug for SubscriberSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self.channels.iter().map(|c| c.name).collect();
        f.debug_struct("SubscriberSet")
            .field("subscribers", &names)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::time::Duration;
    use tokio::sync::Notify;

    struct Collect {
        seen: Mutex<Vec<EventKind>>,
        notify: Notify,
    }

    impl Collect {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                seen: Mutex::new(Vec::new()),
                notify: Notify::new(),
            })
        }

        async fn wait_for(&self, n: usize) -> Vec<EventKind> {
            loop {
                let notified = self.notify.notified();
                {
                    let seen = self.seen.lock();
                    if seen.len() >= n {
                        return seen.clone();
                    }
                }
                let _ = tokio::time::timeout(Duration::from_millis(50), notified).await;
            }
        }
    }

    #[async_trait]
    impl Subscribe for Collect {
        async fn on_event(&self, event: &Event) {
            self.seen.lock().push(event.kind);
            self.notify.notify_waiters();
        }

        fn name(&self) -> &'static str {
            "collect"
        }
    }

    struct Explode;

    #[async_trait]
    impl Subscribe for Explode {
        async fn on_event(&self, _event: &Event) {
            panic!("boom");
        }

        fn name(&self) -> &'static str {
            "explode"
        }
    }

    struct Stuck {
        gate: Arc<Notify>,
    }

    #[async_trait]
    impl Subscribe for Stuck {
        async fn on_event(&self, _event: &Event) {
            self.gate.notified().await;
        }

        fn name(&self) -> &'static str {
            "stuck"
        }

        fn queue_capacity(&self) -> usize {
            1
        }
    }

    #[tokio::test]
    async fn test_emit_preserves_per_subscriber_order() {
        let bus = Bus::new(16);
        let collect = Collect::new();
        let set = SubscriberSet::new(vec![collect.clone() as Arc<dyn Subscribe>], bus);
        assert_eq!(set.len(), 1);
        assert!(!set.is_empty());

        set.emit(&Event::new(EventKind::SignalCompleted));
        set.emit(&Event::new(EventKind::ObserverCanceled));
        set.emit(&Event::new(EventKind::ReplayTerminated));
        set.shutdown().await;

        assert_eq!(
            *collect.seen.lock(),
            vec![
                EventKind::SignalCompleted,
                EventKind::ObserverCanceled,
                EventKind::ReplayTerminated,
            ]
        );
    }

    #[tokio::test]
    async fn test_panicking_subscriber_is_reported_and_keeps_running() {
        let bus = Bus::new(16);
        let mut rx = bus.subscribe();
        let collect = Collect::new();
        let set = SubscriberSet::new(
            vec![Arc::new(Explode) as Arc<dyn Subscribe>, collect.clone()],
            bus,
        );

        set.emit(&Event::new(EventKind::SignalCompleted));
        set.emit(&Event::new(EventKind::SignalCompleted));
        set.shutdown().await;

        let first = rx.recv().await.unwrap();
        assert!(first.is_subscriber_panic());
        assert_eq!(first.source.as_deref(), Some("explode"));
        assert_eq!(first.reason.as_deref(), Some("boom"));
        assert!(rx.recv().await.unwrap().is_subscriber_panic());
        assert_eq!(collect.seen.lock().len(), 2);
    }

    #[tokio::test]
    async fn test_full_queue_publishes_overflow() {
        let bus = Bus::new(16);
        let mut rx = bus.subscribe();
        let gate = Arc::new(Notify::new());
        let set = SubscriberSet::new(
            vec![Arc::new(Stuck { gate: Arc::clone(&gate) }) as Arc<dyn Subscribe>],
            bus,
        );

        for _ in 0..4 {
            set.emit(&Event::new(EventKind::SignalCompleted));
        }

        let ev = rx.recv().await.unwrap();
        assert!(ev.is_subscriber_overflow());
        assert_eq!(ev.source.as_deref(), Some("stuck"));
        assert!(ev.reason.as_deref().unwrap_or_default().contains("full"));

        while rx.try_recv().is_ok() {}
        set.emit(&Event::subscriber_overflow("other", "full"));
        assert!(rx.try_recv().is_err());

        gate.notify_waiters();
    }

    #[tokio::test]
    async fn test_listen_forwards_bus_events_until_cancelled() {
        let bus = Bus::new(16);
        let collect = Collect::new();
        let set = Arc::new(SubscriberSet::new(
            vec![collect.clone() as Arc<dyn Subscribe>],
            bus.clone(),
        ));
        let token = CancellationToken::new();
        let handle = Arc::clone(&set).listen(&bus, token.clone());

        bus.publish(Event::new(EventKind::CallbackFailed));
        bus.publish(Event::new(EventKind::TransformFailed));
        assert_eq!(
            collect.wait_for(2).await,
            vec![EventKind::CallbackFailed, EventKind::TransformFailed]
        );

        token.cancel();
        handle.await.unwrap();
        bus.publish(Event::new(EventKind::SignalCompleted));

        let set = Arc::try_unwrap(set).expect("listener released the set");
        set.shutdown().await;
        assert_eq!(collect.seen.lock().len(), 2);
    }

    #[tokio::test]
    async fn test_signal_events_reach_subscribers() {
        use crate::signal::CompletionSignal;

        let bus = Bus::new(16);
        let collect = Collect::new();
        let set = Arc::new(SubscriberSet::new(
            vec![collect.clone() as Arc<dyn Subscribe>],
            bus.clone(),
        ));
        let token = CancellationToken::new();
        let handle = Arc::clone(&set).listen(&bus, token.clone());

        let signal = CompletionSignal::new().with_bus(bus.clone()).named("job");
        signal.complete(None);

        assert_eq!(collect.wait_for(1).await, vec![EventKind::SignalCompleted]);
        token.cancel();
        handle.await.unwrap();
    }
}
