//! # Awaitable / Awaiter contract
//!
//! Two small traits that separate "something that can be waited on" from any particular
//! scheduler. A blocking caller uses [`Awaiter::wait`], an async caller `.await`s the
//! awaiter (every awaiter in this crate implements [`IntoFuture`](std::future::IntoFuture)),
//! and a callback-driven caller registers a [`Continuation`] with [`Awaiter::on_completed`].
//!
//! ```text
//! Awaitable ──awaiter()──► Awaiter ─┬─ is_completed()      (non-blocking)
//!                                   ├─ wait()              (blocks until completion)
//!                                   └─ on_completed(cont)  (runs now if already complete)
//! ```
//!
//! All awaiters obtained from one awaitable observe the same completion event.

use crate::error::StreamError;

/// Zero-argument callback scheduled to run once, after completion.
pub type Continuation = Box<dyn FnOnce() + Send + 'static>;

/// Handle used to wait for one completion event.
pub trait Awaiter {
    /// Value produced on success (`()` for the untyped variant).
    type Output;

    /// True iff the underlying operation has completed (successfully or not).
    fn is_completed(&self) -> bool;

    /// Blocks the calling thread until completion, then returns the stored outcome.
    ///
    /// Repeatable: every call after completion yields the same success or error.
    fn wait(&self) -> Result<Self::Output, StreamError>;

    /// Registers `continuation` to run when completion occurs.
    ///
    /// If the operation already completed, `continuation` runs synchronously on the
    /// calling thread before this method returns.
    fn on_completed(&self, continuation: Continuation);
}

/// Something that can hand out [`Awaiter`]s.
pub trait Awaitable {
    /// Value produced on success.
    type Output;
    /// Concrete awaiter type.
    type Awaiter: Awaiter<Output = Self::Output>;

    /// Returns an awaiter over this operation's completion. Safe to call repeatedly.
    fn awaiter(&self) -> Self::Awaiter;
}
