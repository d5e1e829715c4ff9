//! # Completion signal
//!
//! A single-writer, multi-reader cell recording a terminal outcome and draining the
//! continuations queued while it was pending.
//!
//! ## Contents
//! - [`CompletionSignal`] state (`completed`, `error`, FIFO continuation queue) behind one lock
//! - [`SignalAwaiter`] untyped [`Awaiter`](crate::Awaiter) over a shared signal
//! - [`Completion`] the future returned when an awaiter is `.await`ed
//!
//! ## Lifecycle
//! ```text
//!   new() ──► pending ──complete(err)──► completed (never reverts)
//!                │                          │
//!   register(c) ─┘ enqueue        register(c) └─ invoke c now, on the caller's thread
//! ```

mod awaiter;
mod completion;

pub use awaiter::{Completion, SignalAwaiter};
pub use completion::CompletionSignal;
