//! Detached collections with queued operations: merge, reattach and rollback

use std::collections::HashMap;

use ormdialect::collection::{Attachment, EventSink, RecordingListener};
use ormdialect::{CollectionError, CollectionKey, LazyCollection, SessionId, TransactionOutcome};
use pretty_assertions::assert_eq;

/// Rows the loader sees, keyed by collection
struct Store {
    rows: HashMap<CollectionKey, Vec<String>>,
}

impl Store {
    fn with_children() -> Self {
        let mut rows = HashMap::new();
        rows.insert(key(), vec!["Yogi".to_string(), "Sherman".to_string()]);
        Self { rows }
    }

    fn load(&self, key: &CollectionKey) -> Result<Vec<String>, CollectionError> {
        self.rows
            .get(key)
            .cloned()
            .ok_or_else(|| CollectionError::Load(format!("no rows for {}", key)))
    }
}

fn key() -> CollectionKey {
    CollectionKey::new("Parent", "children", 1)
}

fn queued_detached_children(events: EventSink) -> LazyCollection<String> {
    let mut children = LazyCollection::new(key(), SessionId(1), events);
    children.add("Zeke".to_string()).unwrap();
    children.detach();
    children
}

#[test]
fn test_merge_discards_queued_operations() {
    let store = Store::with_children();
    let listener = RecordingListener::new();
    let detached = queued_detached_children(EventSink::new().with_listener(listener.clone()));
    assert_eq!(listener.count("HHH000496"), 1);

    let mut merged = detached.merge(SessionId(2));
    assert!(!merged.is_initialized());
    assert!(!merged.has_queued_operations());
    merged.initialize(&|key: &CollectionKey| store.load(key)).unwrap();

    assert_eq!(
        merged.elements().unwrap(),
        &["Yogi".to_string(), "Sherman".to_string()][..]
    );
    assert_eq!(listener.count("HHH000494"), 1);
    assert!(!listener.was_triggered("HHH000495"));
    // the detached handle keeps its queue
    assert_eq!(detached.queued_operations().len(), 1);
}

#[test]
fn test_reattach_keeps_queued_operations() {
    let store = Store::with_children();
    let listener = RecordingListener::new();
    let mut children = queued_detached_children(EventSink::new().with_listener(listener.clone()));

    children.reattach(SessionId(2));
    assert!(children.is_attached());
    children.initialize(&|key: &CollectionKey| store.load(key)).unwrap();

    assert_eq!(
        children.elements().unwrap(),
        &["Yogi".to_string(), "Sherman".to_string(), "Zeke".to_string()][..]
    );
    assert_eq!(listener.count("HHH000495"), 1);
    assert!(!listener.was_triggered("HHH000494"));
}

#[test]
fn test_event_message_names_collection() {
    let listener = RecordingListener::new();
    let mut children = queued_detached_children(EventSink::new().with_listener(listener.clone()));
    children.reattach(SessionId(2));

    let messages: Vec<String> = listener.events().iter().map(ToString::to_string).collect();
    assert_eq!(
        messages,
        vec![
            "HHH000496: Detaching an uninitialized collection with queued operations from a session: \
             [Parent.children#1]"
                .to_string(),
            "HHH000495: Attaching an uninitialized collection with queued operations to a session: \
             [Parent.children#1]"
                .to_string(),
        ]
    );
}

#[test]
fn test_rollback_discards_operations_since_begin() {
    let store = Store::with_children();
    let listener = RecordingListener::new();
    let mut children = LazyCollection::new(key(), SessionId(1), EventSink::new().with_listener(listener.clone()));

    children.add("Zeke".to_string()).unwrap();
    children.begin_transaction();
    children.remove("Yogi".to_string()).unwrap();
    children.add("Boo Boo".to_string()).unwrap();
    children.complete_transaction(TransactionOutcome::RolledBack);

    assert_eq!(listener.count("HHH000498"), 1);
    assert_eq!(children.queued_operations().len(), 1);

    children.initialize(&|key: &CollectionKey| store.load(key)).unwrap();
    assert_eq!(
        children.elements().unwrap(),
        &["Yogi".to_string(), "Sherman".to_string(), "Zeke".to_string()][..]
    );
}

#[test]
fn test_rollback_with_nothing_queued_is_silent() {
    let listener = RecordingListener::new();
    let mut children: LazyCollection<String> =
        LazyCollection::new(key(), SessionId(1), EventSink::new().with_listener(listener.clone()));
    children.begin_transaction();
    children.complete_transaction(TransactionOutcome::RolledBack);
    assert!(listener.events().is_empty());
}

#[test]
fn test_missing_rows_surface_load_error() {
    let store = Store { rows: HashMap::new() };
    let mut children: LazyCollection<String> = LazyCollection::new(key(), SessionId(1), EventSink::new());
    let err = children.initialize(&|key: &CollectionKey| store.load(key)).unwrap_err();
    assert_eq!(err, CollectionError::Load("no rows for [Parent.children#1]".to_string()));
    assert!(!children.is_initialized());
}

#[test]
fn test_reattach_of_attached_handle_is_silent() {
    let listener = RecordingListener::new();
    let mut children = queued_detached_children(EventSink::new().with_listener(listener.clone()));
    children.reattach(SessionId(2));
    children.reattach(SessionId(2));
    children.reattach(SessionId(3));

    assert_eq!(listener.count("HHH000495"), 1);
    assert_eq!(children.attachment(), Attachment::Attached(SessionId(2)));
    assert_eq!(children.queued_operations().len(), 1);
}
