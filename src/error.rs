//! Error types shared by the completion signal, observers and the replay wrapper.
//!
//! [`StreamError`] is the single outcome type stored by a
//! [`CompletionSignal`](crate::CompletionSignal) and handed to every waiter. It is
//! `Clone` because one failure is surfaced many times: to each blocked waiter, to each
//! repeated `wait()` call, and to each multicast subscriber.
//!
//! Helper methods (`as_label`, `as_message`) mirror the ones used for logs/events.

use std::error::Error as StdError;
use std::sync::Arc;

use thiserror::Error;

/// Shared, cloneable handle to an arbitrary producer error.
pub type SharedError = Arc<dyn StdError + Send + Sync + 'static>;

/// # Terminal outcome of an observed stream.
///
/// - [`StreamError::Canceled`] is raised only by the cancellation path, so callers can tell
///   "cancelled" apart from "failed".
/// - [`StreamError::Producer`] wraps whatever the upstream reported through `on_error`.
/// - [`StreamError::Callback`] / [`StreamError::Transform`] come from user code failing
///   while a value was being delivered.
#[non_exhaustive]
#[derive(Error, Debug, Clone)]
pub enum StreamError {
    /// The operation was cancelled through its cancellation token.
    #[error("operation canceled")]
    Canceled,

    /// The upstream producer signalled an error.
    #[error("producer failed: {0}")]
    Producer(SharedError),

    /// A per-item callback rejected a value.
    #[error("callback failed: {error}")]
    Callback {
        /// The underlying error message.
        error: String,
    },

    /// A multicast transform rejected a value.
    #[error("transform failed: {error}")]
    Transform {
        /// The underlying error message.
        error: String,
    },

    /// A required argument was not supplied.
    #[error("invalid argument: `{name}` must be provided")]
    InvalidArgument {
        /// Name of the missing argument.
        name: &'static str,
    },
}

impl StreamError {
    /// Wraps any error (or message) as a producer failure.
    ///
    /// # Example
    /// ```
    /// use streamwait::StreamError;
    ///
    /// let err = StreamError::producer("disk on fire");
    /// assert_eq!(err.to_string(), "producer failed: disk on fire");
    /// ```
    pub fn producer(err: impl Into<Box<dyn StdError + Send + Sync + 'static>>) -> Self {
        StreamError::Producer(Arc::from(err.into()))
    }

    /// Builds a callback failure from a message.
    pub fn callback(error: impl Into<String>) -> Self {
        StreamError::Callback {
            error: error.into(),
        }
    }

    /// Builds a transform failure from a message.
    pub fn transform(error: impl Into<String>) -> Self {
        StreamError::Transform {
            error: error.into(),
        }
    }

    /// Returns a short stable label (snake_case) for use in logs/events.
    ///
    /// # Example
    /// ```
    /// use streamwait::StreamError;
    ///
    /// assert_eq!(StreamError::Canceled.as_label(), "stream_canceled");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            StreamError::Canceled => "stream_canceled",
            StreamError::Producer(_) => "stream_producer_failed",
            StreamError::Callback { .. } => "stream_callback_failed",
            StreamError::Transform { .. } => "stream_transform_failed",
            StreamError::InvalidArgument { .. } => "stream_invalid_argument",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            StreamError::Canceled => "canceled".to_string(),
            StreamError::Producer(err) => format!("producer: {err}"),
            StreamError::Callback { error } => format!("callback: {error}"),
            StreamError::Transform { error } => format!("transform: {error}"),
            StreamError::InvalidArgument { name } => format!("missing argument: {name}"),
        }
    }

    /// True for [`StreamError::Canceled`].
    pub fn is_canceled(&self) -> bool {
        matches!(self, StreamError::Canceled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Boom;

    impl std::fmt::Display for Boom {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.write_str("boom")
        }
    }

    impl StdError for Boom {}

    #[test]
    fn test_producer_keeps_source_error() {
        let err = StreamError::producer(Boom);
        match &err {
            StreamError::Producer(inner) => assert!(inner.downcast_ref::<Boom>().is_some()),
            other => panic!("unexpected variant: {other:?}"),
        }
        assert_eq!(err.to_string(), "producer failed: boom");
    }

    #[test]
    fn test_clone_shares_producer_error() {
        let err = StreamError::producer("E");
        let copy = err.clone();
        match (&err, &copy) {
            (StreamError::Producer(a), StreamError::Producer(b)) => assert!(Arc::ptr_eq(a, b)),
            _ => panic!("clone changed the variant"),
        }
    }

    #[test]
    fn test_labels_are_distinct() {
        let all = [
            StreamError::Canceled,
            StreamError::producer("x"),
            StreamError::callback("x"),
            StreamError::transform("x"),
            StreamError::InvalidArgument { name: "on_next" },
        ];
        let mut labels: Vec<_> = all.iter().map(StreamError::as_label).collect();
        labels.sort_unstable();
        labels.dedup();
        assert_eq!(labels.len(), all.len());
    }

    #[test]
    fn test_only_canceled_is_canceled() {
        assert!(StreamError::Canceled.is_canceled());
        assert!(!StreamError::producer("x").is_canceled());
        assert!(!StreamError::callback("x").is_canceled());
    }
}
