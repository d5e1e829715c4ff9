//! # LogWriter: simple event printer
//!
//! A minimal subscriber that prints incoming [`Event`]s to stdout, one line each.
//! Use it for tests or demos.
//!
//! ## Example output
//! ```text
//! [signal-completed] source="job" continuations=2
//! [signal-completed] source="job" continuations=0 err="stream_canceled"
//! [observer-canceled] source="import" observed=3
//! [callback-failed] source="import" err="callback failed: bad row" observed=4
//! [transform-failed] source="prices" err="transform failed: negative"
//! [subscriber-detached] source="prices" err="callback failed: closed"
//! [replay-terminated] source="prices" cached=10
//! [continuation-panicked] source="job" info="boom"
//! [subscriber-overflow] subscriber="metrics" reason="subscriber=metrics reason=full"
//! [subscriber-panicked] subscriber=metrics info=boom
//! ```

use async_trait::async_trait;

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

/// Event writer subscriber.
#[derive(Default)]
pub struct LogWriter;

impl LogWriter {
    /// Construct a new [`LogWriter`].
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Renders one event as a single line.
    pub fn format(e: &Event) -> String {
        let source = e.source.as_deref().unwrap_or("-");
        let reason = e.reason.as_deref();
        let count = e.count.unwrap_or(0);

        match e.kind {
            EventKind::SignalCompleted => match reason {
                Some(err) => {
                    format!("[signal-completed] source={source:?} continuations={count} err={err:?}")
                }
                None => format!("[signal-completed] source={source:?} continuations={count}"),
            },
            EventKind::ObserverCanceled => {
                format!("[observer-canceled] source={source:?} observed={count}")
            }
            EventKind::CallbackFailed => format!(
                "[callback-failed] source={source:?} err={:?} observed={count}",
                reason.unwrap_or("unknown")
            ),
            EventKind::TransformFailed => format!(
                "[transform-failed] source={source:?} err={:?}",
                reason.unwrap_or("unknown")
            ),
            EventKind::SubscriberDetached => format!(
                "[subscriber-detached] source={source:?} err={:?}",
                reason.unwrap_or("unknown")
            ),
            EventKind::ReplayTerminated => match reason {
                Some(err) => format!("[replay-terminated] source={source:?} cached={count} err={err:?}"),
                None => format!("[replay-terminated] source={source:?} cached={count}"),
            },
            EventKind::ContinuationPanicked => format!(
                "[continuation-panicked] source={source:?} info={:?}",
                reason.unwrap_or("unknown")
            ),
            EventKind::SubscriberOverflow => format!(
                "[subscriber-overflow] subscriber={source:?} reason={:?}",
                reason.unwrap_or("unknown")
            ),
            EventKind::SubscriberPanicked => format!(
                "[subscriber-panicked] subscriber={} info={}",
                e.source.as_deref().unwrap_or("unknown"),
                reason.unwrap_or("unknown"),
            ),
        }
    }
}

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        println!("{}", Self::format(e));
    }

    fn name(&self) -> &'static str {
        "LogWriter"
    }
}
