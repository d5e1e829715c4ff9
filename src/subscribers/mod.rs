//! # Event subscribers for diagnostic events.
//!
//! Signals, observers and replay wrappers publish [`Event`](crate::events::Event)s to an
//! optional [`Bus`](crate::events::Bus). This module turns that stream into calls on
//! user-provided handlers without ever blocking the publishers.
//!
//! ## Architecture
//! ```text
//!   CompletionSignal ─┐
//!   AwaitableObserver ┼─ publish(Event) ──► Bus
//!   MulticastReplay ──┘                      │
//!                                  SubscriberSet::listen(bus, token)
//!                                            │
//!                              ┌─────────────┼─────────────┐
//!                              ▼             ▼             ▼
//!                          LogWriter      Metrics        Custom
//! ```
//!
//! ## Implementing custom subscribers
//! ```no_run
//! use streamwait::{Event, EventKind, Subscribe};
//! use async_trait::async_trait;
//!
//! struct PanicCounter;
//!
//! #[async_trait]
//! impl Subscribe for PanicCounter {
//!     async fn on_event(&self, event: &Event) {
//!         if event.kind == EventKind::ContinuationPanicked {
//!             // increment a counter
//!         }
//!     }
//!
//!     fn name(&self) -> &'static str {
//!         "panic-counter"
//!     }
//! }
//! ```

#[cfg(feature = "logging")]
mod embedded;
mod set;
mod subscribe;

#[cfg(feature = "logging")]
pub use embedded::LogWriter;
pub use set::SubscriberSet;
pub use subscribe::Subscribe;
