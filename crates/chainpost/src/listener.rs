//! Progress notifications.
//!
//! Implement [`Listener`] and override only the events you care about;
//! every method has an empty default body.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use chainpost_core::EntryHash;
use chainpost_rpc::{AckResponse, CommitChainResponse, CommitEntryResponse, RevealResponse};

use crate::compose::Composed;
use crate::error::SubmitError;

/// A commit the node accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitEvent {
    Chain(CommitChainResponse),
    Entry(CommitEntryResponse),
}

impl CommitEvent {
    /// The entry hash the node acknowledged.
    pub fn entry_hash(&self) -> EntryHash {
        match self {
            CommitEvent::Chain(c) => c.entry_hash,
            CommitEvent::Entry(c) => c.entry_hash,
        }
    }
}

/// Observer of submission progress.
///
/// Called synchronously from the submitting task, so keep handlers short.
pub trait Listener: Send + Sync {
    /// Messages composed and commit accepted.
    fn on_compose(&self, _composed: &Composed) {}

    fn on_commit(&self, _event: &CommitEvent) {}

    fn on_reveal(&self, _reveal: &RevealResponse) {}

    /// The node acknowledged the submission. Fires at most once.
    fn on_transaction_acknowledged(&self, _ack: &AckResponse) {}

    /// The submission is in a directory block.
    fn on_commit_confirmed(&self, _ack: &AckResponse) {}

    /// The submission failed. Fires once per failed submission.
    fn on_error(&self, _error: &SubmitError) {}
}

/// Listens to nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopListener;

impl Listener for NoopListener {}

/// Registered listeners, notified in registration order.
#[derive(Clone, Default)]
pub struct Listeners {
    listeners: Vec<Arc<dyn Listener>>,
}

impl Listeners {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, listener: Arc<dyn Listener>) {
        self.listeners.push(listener);
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    /// Call `f` on every listener. A listener that panics is logged and
    /// skipped; the rest still run.
    pub fn notify(&self, event: &'static str, f: impl Fn(&dyn Listener)) {
        for (index, listener) in self.listeners.iter().enumerate() {
            let outcome = catch_unwind(AssertUnwindSafe(|| f(listener.as_ref())));
            if outcome.is_err() {
                tracing::warn!(index, event, "listener panicked");
            }
        }
    }
}

impl std::fmt::Debug for Listeners {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Listeners")
            .field("count", &self.listeners.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct Recording {
        name: &'static str,
        log: Arc<Mutex<Vec<&'static str>>>,
    }

    impl Listener for Recording {
        fn on_error(&self, _error: &SubmitError) {
            self.log.lock().unwrap().push(self.name);
        }
    }

    struct Panicking;

    impl Listener for Panicking {
        fn on_error(&self, _error: &SubmitError) {
            panic!("listener bug");
        }
    }

    fn timeout() -> SubmitError {
        SubmitError::Timeout {
            attempts: 1,
            last_status: chainpost_rpc::AckStatus::Unknown,
        }
    }

    #[test]
    fn test_registration_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut listeners = Listeners::new();
        for name in ["first", "second", "third"] {
            listeners.register(Arc::new(Recording {
                name,
                log: Arc::clone(&log),
            }));
        }

        let error = timeout();
        listeners.notify("on_error", |l| l.on_error(&error));
        assert_eq!(*log.lock().unwrap(), vec!["first", "second", "third"]);
    }

    #[test]
    fn test_panicking_listener_isolated() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut listeners = Listeners::new();
        listeners.register(Arc::new(Panicking));
        listeners.register(Arc::new(Recording {
            name: "after",
            log: Arc::clone(&log),
        }));

        let error = timeout();
        listeners.notify("on_error", |l| l.on_error(&error));
        assert_eq!(*log.lock().unwrap(), vec!["after"]);
    }

    #[test]
    fn test_noop_listener_accepts_everything() {
        let mut listeners = Listeners::new();
        listeners.register(Arc::new(NoopListener));
        assert_eq!(listeners.len(), 1);
        let error = timeout();
        listeners.notify("on_error", |l| l.on_error(&error));
    }
}
