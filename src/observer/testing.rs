//! Hand-driven producers and a recording observer for unit tests.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use parking_lot::Mutex;

use crate::error::StreamError;

use super::{Observable, Observer, Subscription};

type Entries<T> = Arc<Mutex<Vec<(u64, Arc<dyn Observer<T>>)>>>;

/// Hot producer: observers only see what is emitted after they attach.
pub(crate) struct TestSource<T> {
    observers: Entries<T>,
    next_id: AtomicU64,
    disposals: Arc<AtomicUsize>,
}

impl<T: Clone + Send + 'static> TestSource<T> {
    pub(crate) fn new() -> Self {
        Self {
            observers: Arc::new(Mutex::new(Vec::new())),
            next_id: AtomicU64::new(0),
            disposals: Arc::new(AtomicUsize::new(0)),
        }
    }

    fn snapshot(&self) -> Vec<Arc<dyn Observer<T>>> {
        self.observers.lock().iter().map(|(_, o)| Arc::clone(o)).collect()
    }

    /// Emits to every attached observer; returns each observer's verdict.
    pub(crate) fn emit(&self, value: T) -> Vec<Result<(), StreamError>> {
        self.snapshot()
            .into_iter()
            .map(|o| o.on_next(value.clone()))
            .collect()
    }

    pub(crate) fn complete(&self) {
        for o in self.snapshot() {
            o.on_completed();
        }
    }

    pub(crate) fn fail(&self, error: StreamError) {
        for o in self.snapshot() {
            o.on_error(error.clone());
        }
    }

    pub(crate) fn observer_count(&self) -> usize {
        self.observers.lock().len()
    }

    /// Number of teardowns that actually ran.
    pub(crate) fn disposals(&self) -> usize {
        self.disposals.load(Ordering::SeqCst)
    }
}

impl<T: Clone + Send + 'static> Observable<T> for TestSource<T> {
    fn subscribe(&self, observer: Arc<dyn Observer<T>>) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.observers.lock().push((id, observer));

        let observers = Arc::clone(&self.observers);
        let disposals = Arc::clone(&self.disposals);
        Subscription::new(move || {
            observers.lock().retain(|(other, _)| *other != id);
            disposals.fetch_add(1, Ordering::SeqCst);
        })
    }
}

/// Cold producer: replays a fixed script synchronously inside `subscribe`.
pub(crate) struct ColdSource<T> {
    values: Vec<T>,
    error: Option<StreamError>,
    disposals: Arc<AtomicUsize>,
}

impl<T: Clone + Send + 'static> ColdSource<T> {
    pub(crate) fn completing(values: Vec<T>) -> Self {
        Self {
            values,
            error: None,
            disposals: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub(crate) fn failing(values: Vec<T>, error: StreamError) -> Self {
        Self {
            values,
            error: Some(error),
            disposals: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub(crate) fn disposals(&self) -> usize {
        self.disposals.load(Ordering::SeqCst)
    }
}

impl<T: Clone + Send + 'static> Observable<T> for ColdSource<T> {
    fn subscribe(&self, observer: Arc<dyn Observer<T>>) -> Subscription {
        let mut broken = false;
        for v in &self.values {
            if observer.on_next(v.clone()).is_err() {
                broken = true;
                break;
            }
        }
        if !broken {
            match &self.error {
                Some(err) => observer.on_error(err.clone()),
                None => observer.on_completed(),
            }
        }
        let disposals = Arc::clone(&self.disposals);
        Subscription::new(move || {
            disposals.fetch_add(1, Ordering::SeqCst);
        })
    }
}

/// One recorded notification.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Note<T> {
    Next(T),
    Completed,
    Error(String),
}

/// Observer that records everything it receives; optionally rejects one value.
pub(crate) struct Recorder<T> {
    notes: Mutex<Vec<Note<T>>>,
    reject: Option<T>,
}

impl<T: Clone + PartialEq + Send + 'static> Recorder<T> {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self {
            notes: Mutex::new(Vec::new()),
            reject: None,
        })
    }

    pub(crate) fn rejecting(value: T) -> Arc<Self> {
        Arc::new(Self {
            notes: Mutex::new(Vec::new()),
            reject: Some(value),
        })
    }

    pub(crate) fn notes(&self) -> Vec<Note<T>> {
        self.notes.lock().clone()
    }

    pub(crate) fn values(&self) -> Vec<T> {
        self.notes
            .lock()
            .iter()
            .filter_map(|n| match n {
                Note::Next(v) => Some(v.clone()),
                _ => None,
            })
            .collect()
    }
}

impl<T: Clone + PartialEq + Send + Sync + 'static> Observer<T> for Recorder<T> {
    fn on_next(&self, value: T) -> Result<(), StreamError> {
        if self.reject.as_ref() == Some(&value) {
            return Err(StreamError::callback("rejected"));
        }
        self.notes.lock().push(Note::Next(value));
        Ok(())
    }

    fn on_completed(&self) {
        self.notes.lock().push(Note::Completed);
    }

    fn on_error(&self, error: StreamError) {
        self.notes.lock().push(Note::Error(error.to_string()));
    }
}
