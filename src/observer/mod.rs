//! # Observers, producers and the awaitable bridge.
//!
//! ## Contents
//! - [`Observer`] / [`Observable`] the push-subscribe contract consumed and exposed here
//! - [`Subscription`] idempotent disposal handle returned by `subscribe`
//! - [`AwaitableObserver`] observer whose completion can be awaited ([`ObserverAwaiter`])
//! - [`SubscribeBuilder`] subscribe helper: attach, then wire cancellation
//!
//! ## Wiring
//! ```text
//! SubscribeBuilder::subscribe(&source)
//!   ├─► reject missing callback          (InvalidArgument, nothing attached)
//!   ├─► source.subscribe(observer) ──► Subscription
//!   └─► observer.add_cancellation(subscription, token)
//!             └─► token fires ─► dispose + complete(Canceled)
//! ```

mod awaitable;
mod builder;
mod cancel;
mod observer;
mod subscription;

#[cfg(test)]
pub(crate) mod testing;

pub use awaitable::{AwaitableObserver, Callback, ObserverAwaiter, ObserverCompletion};
pub use builder::SubscribeBuilder;
pub use observer::{Observable, Observer};
pub use subscription::Subscription;
