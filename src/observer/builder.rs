use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::error::StreamError;
use crate::events::Bus;

use super::awaitable::{AwaitableObserver, Callback};
use super::Observable;

/// Builder attaching an [`AwaitableObserver`] to a producer.
///
/// The per-item callback is mandatory: [`subscribe`](Self::subscribe) fails with
/// [`StreamError::InvalidArgument`] before touching the producer when none was set.
/// Use [`AwaitableObserver::drain`] to subscribe without one.
pub struct SubscribeBuilder<T> {
    callback: Option<Callback<T>>,
    token: Option<CancellationToken>,
    bus: Option<Bus>,
    cfg: Config,
    name: Option<Arc<str>>,
}

impl<T: Send + 'static> SubscribeBuilder<T> {
    /// Creates a builder with the default [`Config`] and no callback.
    pub fn new() -> Self {
        Self {
            callback: None,
            token: None,
            bus: None,
            cfg: Config::default(),
            name: None,
        }
    }

    /// Sets a fallible per-item callback.
    pub fn on_next<F>(mut self, f: F) -> Self
    where
        F: Fn(&T) -> Result<(), StreamError> + Send + Sync + 'static,
    {
        self.callback = Some(Box::new(f));
        self
    }

    /// Sets an infallible per-item callback.
    pub fn for_each<F>(self, f: F) -> Self
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        self.on_next(move |v: &T| {
            f(v);
            Ok(())
        })
    }

    /// Sets (or clears) the callback from an already boxed value.
    ///
    /// Host glue that forwards an optional user callback goes through here; `None`
    /// makes [`subscribe`](Self::subscribe) fail.
    pub fn callback(mut self, callback: Option<Callback<T>>) -> Self {
        self.callback = callback;
        self
    }

    /// Links an external cancellation token. Without one the observer only completes
    /// naturally.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.token = Some(token);
        self
    }

    /// Publishes diagnostics to `bus`.
    pub fn with_bus(mut self, bus: Bus) -> Self {
        self.bus = Some(bus);
        self
    }

    /// Replaces the configuration (buffering behaviour).
    pub fn with_config(mut self, cfg: Config) -> Self {
        self.cfg = cfg;
        self
    }

    /// Names the observer in published events.
    pub fn named(mut self, name: impl Into<Arc<str>>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Validates the builder, subscribes to `source` and wires cancellation.
    ///
    /// ### Order
    /// 1. Reject a missing callback (`InvalidArgument { name: "on_next" }`)
    /// 2. `source.subscribe(observer)` (a cold source may run to completion here)
    /// 3. `add_cancellation(subscription, token)`
    pub fn subscribe<O>(self, source: &O) -> Result<Arc<AwaitableObserver<T>>, StreamError>
    where
        O: Observable<T> + ?Sized,
    {
        let callback = self
            .callback
            .ok_or(StreamError::InvalidArgument { name: "on_next" })?;
        let observer = Arc::new(AwaitableObserver::new(
            callback, &self.cfg, self.bus, self.name,
        ));
        let subscription = source.subscribe(observer.clone());
        observer.add_cancellation(subscription, self.token);
        Ok(observer)
    }
}

impl<T: Send + 'static> Default for SubscribeBuilder<T> {
    fn default() -> Self {
        Self::new()
    }
}
