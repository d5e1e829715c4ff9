//! # Diagnostic events emitted by signals, observers and the replay wrapper.
//!
//! The [`EventKind`] enum classifies event types across three categories:
//! - **Completion events**: a signal reached its terminal state, an observer was cancelled
//! - **Isolation events**: user code failed and was contained (panicking continuation,
//!   rejected value, detached subscriber)
//! - **Subscriber events**: problems inside the [`SubscriberSet`](crate::SubscriberSet) workers
//!
//! The [`Event`] struct carries additional metadata such as timestamps, the name of the
//! emitting component, a reason and a value count.
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases monotonically.
//!
//! ## Example
//! ```rust
//! use streamwait::{Event, EventKind};
//!
//! let ev = Event::new(EventKind::CallbackFailed)
//!     .with_source("import-job")
//!     .with_reason("bad row")
//!     .with_count(3);
//!
//! assert_eq!(ev.kind, EventKind::CallbackFailed);
//! assert_eq!(ev.source.as_deref(), Some("import-job"));
//! assert_eq!(ev.reason.as_deref(), Some("bad row"));
//! assert_eq!(ev.count, Some(3));
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::SystemTime;

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of diagnostic events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Completion events ===
    /// A completion signal transitioned to completed.
    ///
    /// Sets:
    /// - `source`: signal name (if named)
    /// - `reason`: error label when completed with an error
    /// - `count`: number of queued continuations drained
    SignalCompleted,

    /// An awaitable observer was cancelled through its token.
    ///
    /// Sets:
    /// - `source`: observer name (if named)
    /// - `count`: values observed before cancellation
    ObserverCanceled,

    /// The replay wrapper reached its terminal state.
    ///
    /// Sets:
    /// - `source`: wrapper name (if named)
    /// - `reason`: error message when terminated with an error
    /// - `count`: number of cached values
    ReplayTerminated,

    // === Isolation events ===
    /// A continuation panicked while being invoked; draining continued.
    ///
    /// Sets:
    /// - `source`: signal name (if named)
    /// - `reason`: panic info/message
    ContinuationPanicked,

    /// A per-item callback rejected a value; the observer terminated with that error.
    ///
    /// Sets:
    /// - `source`: observer name (if named)
    /// - `reason`: error message
    /// - `count`: values observed including the rejected one
    CallbackFailed,

    /// The replay transform rejected a value; the wrapper terminated with that error.
    ///
    /// Sets:
    /// - `source`: wrapper name (if named)
    /// - `reason`: error message
    TransformFailed,

    /// A downstream subscriber failed `on_next` and was removed from the live set.
    ///
    /// Sets:
    /// - `source`: wrapper name (if named)
    /// - `reason`: error message
    SubscriberDetached,

    // === Subscriber worker events ===
    /// Subscriber panicked during event processing.
    ///
    /// Sets:
    /// - `source`: subscriber name
    /// - `reason`: panic info/message
    SubscriberPanicked,

    /// Subscriber dropped an event (queue full or worker closed).
    ///
    /// Sets:
    /// - `source`: subscriber name
    /// - `reason`: reason string (e.g., "full", "closed")
    SubscriberOverflow,
}

/// Diagnostic event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,
    /// Name of the emitting component, if it was given one.
    pub source: Option<Arc<str>>,
    /// Human-readable reason (errors, panic info, overflow details).
    pub reason: Option<Arc<str>>,
    /// Number of values or continuations involved.
    pub count: Option<u64>,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            source: None,
            reason: None,
            count: None,
        }
    }

    /// Attaches the emitting component's name.
    #[inline]
    pub fn with_source(mut self, source: impl Into<Arc<str>>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Attaches the name only when one is present.
    #[inline]
    pub(crate) fn with_source_opt(mut self, source: Option<&Arc<str>>) -> Self {
        self.source = source.cloned();
        self
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Attaches a count.
    #[inline]
    pub fn with_count(mut self, n: usize) -> Self {
        self.count = Some(n as u64);
        self
    }

    /// Creates a subscriber overflow event.
    #[inline]
    pub fn subscriber_overflow(subscriber: &'static str, reason: &'static str) -> Self {
        Event::new(EventKind::SubscriberOverflow)
            .with_source(subscriber)
            .with_reason(format!("subscriber={subscriber} reason={reason}"))
    }

    /// Creates a subscriber panic event.
    #[inline]
    pub fn subscriber_panicked(subscriber: &'static str, info: String) -> Self {
        Event::new(EventKind::SubscriberPanicked)
            .with_source(subscriber)
            .with_reason(info)
    }

    #[inline]
    pub fn is_subscriber_overflow(&self) -> bool {
        matches!(self.kind, EventKind::SubscriberOverflow)
    }

    #[inline]
    pub fn is_subscriber_panic(&self) -> bool {
        matches!(self.kind, EventKind::SubscriberPanicked)
    }
}

/// Extracts a readable message from a caught panic payload.
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&'static str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}
