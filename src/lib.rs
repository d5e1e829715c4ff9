//! # streamwait
//!
//! **streamwait** turns push-based value streams into things you can wait on.
//!
//! It provides a one-shot completion signal with FIFO continuations, an observer that
//! collects a stream and exposes its terminal outcome as an awaitable result, and a
//! multicast replay wrapper that lets late subscribers see the full history followed by
//! live items.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!   producer (any thread)
//!        │ on_next / on_completed / on_error
//!        ▼
//! ┌──────────────────────────────┐  subscribe()  ┌─────────────────────────────┐
//! │ MulticastReplay<T, U>        │ ◄──────────── │ late subscribers            │
//! │  transform ─► cache ─► live  │ ──replay────► │ (cache first, then live)    │
//! └──────────────┬───────────────┘               └─────────────────────────────┘
//!                │ Observable<U>
//!                ▼
//! ┌──────────────────────────────┐
//! │ AwaitableObserver<T>         │
//! │  callback ─► values          │
//! │  Subscription + token        │
//! └──────────────┬───────────────┘
//!                │ complete(error)
//!                ▼
//! ┌──────────────────────────────┐
//! │ CompletionSignal             │ ──► continuations (FIFO, once)
//! │  Mutex + Condvar             │ ──► wait() / wait_for() / .await
//! └──────────────────────────────┘
//!
//! every component ── publish(Event) ──► Bus ──► SubscriberSet::listen ──► Subscribe impls
//! ```
//!
//! ### Terminal states
//! ```text
//! running ──► completed (Ok)            on_completed
//!         ├─► completed (Err(e))        on_error(e) / callback failure
//!         └─► completed (Err(Canceled)) cancellation token fired
//! first transition wins; later terminals are ignored
//! ```
//!
//! ## Features
//! | Area              | Description                                                    | Key types / traits                        |
//! |-------------------|----------------------------------------------------------------|-------------------------------------------|
//! | **Contract**      | Uniform completion/result/continuation protocol.               | [`Awaitable`], [`Awaiter`]                |
//! | **Signal**        | One-shot completion with FIFO continuations and blocking wait. | [`CompletionSignal`], [`SignalAwaiter`]   |
//! | **Observer**      | Collect a stream and wait for its outcome.                     | [`AwaitableObserver`], [`SubscribeBuilder`] |
//! | **Replay**        | Transform, cache and fan out to late subscribers.              | [`MulticastReplay`]                       |
//! | **Events**        | Diagnostic events on an optional broadcast bus.                | [`Bus`], [`Event`], [`EventKind`]         |
//! | **Subscriber API**| Consume diagnostic events asynchronously.                      | [`Subscribe`], [`SubscriberSet`]          |
//! | **Errors**        | Typed terminal errors.                                         | [`StreamError`]                           |
//! | **Configuration** | Bus capacity and value retention.                              | [`Config`]                                |
//!
//! ## Optional features
//! - `logging`: exports a simple built-in [`LogWriter`] _(demo/reference only)_.
//!
//! ## Example
//! ```rust
//! use streamwait::{AwaitableObserver, Awaitable, Awaiter, MulticastReplay, Observer};
//!
//! let source = MulticastReplay::<i64, i64>::detached(|v| Ok(v * 10));
//! source.on_next(1).unwrap();
//! source.on_next(2).unwrap();
//!
//! // Late subscriber: sees 10 and 20 first, then live values.
//! let observer = AwaitableObserver::builder()
//!     .for_each(|v: &i64| println!("got {v}"))
//!     .subscribe(&*source)
//!     .unwrap();
//!
//! source.on_next(3).unwrap();
//! source.on_completed();
//!
//! assert_eq!(observer.awaiter().wait().unwrap(), vec![10, 20, 30]);
//! ```
mod config;
mod contract;
mod error;
mod events;
mod observer;
mod replay;
mod signal;
mod subscribers;

// ---- Public re-exports ----

pub use config::Config;
pub use contract::{Awaitable, Awaiter, Continuation};
pub use error::{SharedError, StreamError};
pub use events::{Bus, Event, EventKind};
pub use observer::{
    AwaitableObserver, Callback, Observable, Observer, ObserverAwaiter, ObserverCompletion,
    SubscribeBuilder, Subscription,
};
pub use replay::{MulticastReplay, Transform};
pub use signal::{Completion, CompletionSignal, SignalAwaiter};
pub use subscribers::{Subscribe, SubscriberSet};

// Optional: expose a simple built-in logger subscriber (demo/reference).
// Enable with: `--features logging`
#[cfg(feature = "logging")]
pub use subscribers::LogWriter;
