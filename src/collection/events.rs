//! Diagnostic events raised by lazy collection state transitions

use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use tracing::warn;

use super::CollectionKey;

/// A non-fatal collection diagnostic; message keys are stable
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CollectionEvent {
    /// `HHH000494`
    MergeQueueDiscarded { key: CollectionKey },
    /// `HHH000495`
    AttachedWithQueuedOps { key: CollectionKey },
    /// `HHH000496`
    DetachedWithQueuedOps { key: CollectionKey },
    /// `HHH000498`
    QueueRollback { key: CollectionKey },
}

impl CollectionEvent {
    pub fn message_key(&self) -> &'static str {
        match self {
            CollectionEvent::MergeQueueDiscarded { .. } => "HHH000494",
            CollectionEvent::AttachedWithQueuedOps { .. } => "HHH000495",
            CollectionEvent::DetachedWithQueuedOps { .. } => "HHH000496",
            CollectionEvent::QueueRollback { .. } => "HHH000498",
        }
    }

    pub fn key(&self) -> &CollectionKey {
        match self {
            CollectionEvent::MergeQueueDiscarded { key }
            | CollectionEvent::AttachedWithQueuedOps { key }
            | CollectionEvent::DetachedWithQueuedOps { key }
            | CollectionEvent::QueueRollback { key } => key,
        }
    }

    fn summary(&self) -> &'static str {
        match self {
            CollectionEvent::MergeQueueDiscarded { .. } => {
                "Attempt to merge an uninitialized collection with queued operations; queued operations will be ignored"
            }
            CollectionEvent::AttachedWithQueuedOps { .. } => {
                "Attaching an uninitialized collection with queued operations to a session"
            }
            CollectionEvent::DetachedWithQueuedOps { .. } => {
                "Detaching an uninitialized collection with queued operations from a session"
            }
            CollectionEvent::QueueRollback { .. } => {
                "Discarding queued operations of an uninitialized collection due to rollback"
            }
        }
    }
}

impl fmt::Display for CollectionEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}: {}", self.message_key(), self.summary(), self.key())
    }
}

/// Observer of collection diagnostics
pub trait CollectionEventListener: Send + Sync {
    fn on_event(&self, event: &CollectionEvent);
}

/// Fan-out of events to the registered listeners, plus a `warn!` per event
#[derive(Clone, Default)]
pub struct EventSink {
    listeners: Vec<Arc<dyn CollectionEventListener>>,
}

impl EventSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_listener(mut self, listener: Arc<dyn CollectionEventListener>) -> Self {
        self.listeners.push(listener);
        self
    }

    pub fn emit(&self, event: CollectionEvent) {
        warn!(
            message_key = event.message_key(),
            collection = %event.key(),
            "{}",
            event.summary()
        );
        for listener in &self.listeners {
            listener.on_event(&event);
        }
    }
}

impl fmt::Debug for EventSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventSink")
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

/// Listener that keeps every event it sees
#[derive(Debug, Default)]
pub struct RecordingListener {
    events: Mutex<Vec<CollectionEvent>>,
}

impl RecordingListener {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn events(&self) -> Vec<CollectionEvent> {
        self.events.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Number of recorded events with the given message key
    pub fn count(&self, message_key: &str) -> usize {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|e| e.message_key() == message_key)
            .count()
    }

    pub fn was_triggered(&self, message_key: &str) -> bool {
        self.count(message_key) > 0
    }

    pub fn clear(&self) {
        self.events.lock().unwrap_or_else(PoisonError::into_inner).clear();
    }
}

impl CollectionEventListener for RecordingListener {
    fn on_event(&self, event: &CollectionEvent) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_event_message() {
        let event = CollectionEvent::DetachedWithQueuedOps {
            key: CollectionKey::new("Parent", "children", 1),
        };
        assert_eq!(
            event.to_string(),
            "HHH000496: Detaching an uninitialized collection with queued operations from a session: [Parent.children#1]"
        );
    }

    #[test]
    fn test_sink_fans_out() {
        let first = RecordingListener::new();
        let second = RecordingListener::new();
        let sink = EventSink::new()
            .with_listener(first.clone())
            .with_listener(second.clone());

        sink.emit(CollectionEvent::QueueRollback {
            key: CollectionKey::new("Parent", "children", 7),
        });
        assert_eq!(first.count("HHH000498"), 1);
        assert_eq!(second.events().len(), 1);
        assert!(!second.was_triggered("HHH000494"));

        first.clear();
        assert!(first.events().is_empty());
    }
}
