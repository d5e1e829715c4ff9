//! Diagnostic events: types and broadcast bus.
//!
//! This module groups the event **data model** and the **bus** used to publish
//! diagnostics from completion signals, awaitable observers, the replay wrapper and
//! subscriber workers.
//!
//! ## Contents
//! - [`EventKind`], [`Event`] event classification and payload metadata
//! - [`Bus`] thin wrapper over `tokio::sync::broadcast`
//!
//! ## Quick reference
//! - **Publishers**: `CompletionSignal` (completion, continuation panics),
//!   `AwaitableObserver` (cancellation, callback failures), `MulticastReplay`
//!   (transform failures, detached subscribers, termination), `SubscriberSet` workers.
//! - **Consumers**: `SubscriberSet::listen()` fans events out to [`Subscribe`](crate::Subscribe)
//!   implementations, or any caller holding a `Bus::subscribe()` receiver.
//!
//! Publishing is optional everywhere: components without a bus stay silent.

mod bus;
mod event;

pub use bus::Bus;
pub use event::{Event, EventKind};

pub(crate) use bus::publish_to;
pub(crate) use event::panic_message;
