//! # Push-based observer contract.
//!
//! A producer delivers zero or more values through [`Observer::on_next`], then exactly one
//! terminal signal: [`Observer::on_completed`] or [`Observer::on_error`].
//!
//! ## Contract
//! - Values reach one observer in emission order.
//! - `on_next` returning `Err` means the consumer is broken: the producer should stop
//!   emitting to it (and may report the error through its own channel).
//! - Calls after a terminal signal are ignored by every observer in this crate.

use std::sync::Arc;

use crate::error::StreamError;

use super::Subscription;

/// Consumer of a push-based value stream.
pub trait Observer<T>: Send + Sync {
    /// Delivers one value.
    fn on_next(&self, value: T) -> Result<(), StreamError>;

    /// Terminal success.
    fn on_completed(&self);

    /// Terminal failure.
    fn on_error(&self, error: StreamError);
}

/// Producer offering the standard push-subscribe contract.
pub trait Observable<T> {
    /// Attaches `observer`; disposing the returned handle detaches it.
    fn subscribe(&self, observer: Arc<dyn Observer<T>>) -> Subscription;
}
