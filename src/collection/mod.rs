//! Lazy collections with delayed operations
//!
//! A [`LazyCollection`] that has not been loaded records `add`, `remove` and
//! `clear` in a [`DelayedOperationQueue`]. The queue is replayed once when the
//! collection is initialized. Reattaching a detached handle keeps the queue;
//! merging it discards the queue. Both raise a [`CollectionEvent`].

pub mod events;
pub mod queue;

use std::fmt;

use thiserror::Error;
use tracing::debug;

pub use events::{CollectionEvent, CollectionEventListener, EventSink, RecordingListener};
pub use queue::{CollectionOperation, DelayedOperationQueue};

/// Role and owner of a collection, displayed as `[Entity.property#id]`
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CollectionKey {
    pub entity: String,
    pub property: String,
    pub owner_id: String,
}

impl CollectionKey {
    pub fn new(entity: impl Into<String>, property: impl Into<String>, owner_id: impl ToString) -> Self {
        Self {
            entity: entity.into(),
            property: property.into(),
            owner_id: owner_id.to_string(),
        }
    }

    /// `Entity.property`
    pub fn role(&self) -> String {
        format!("{}.{}", self.entity, self.property)
    }
}

impl fmt::Display for CollectionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}.{}#{}]", self.entity, self.property, self.owner_id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SessionId(pub u64);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "session-{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadState {
    Uninitialized,
    Initializing,
    Initialized,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attachment {
    Attached(SessionId),
    Attaching(SessionId),
    Detached,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionOutcome {
    Committed,
    RolledBack,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CollectionError {
    #[error("failed to lazily initialize a collection of role: {role}, could not initialize proxy - no session")]
    LazyInitialization { role: String },

    #[error("failed to load collection: {0}")]
    Load(String),
}

/// Storage-side loader of a collection's persistent contents
pub trait CollectionLoader<T> {
    fn load(&self, key: &CollectionKey) -> Result<Vec<T>, CollectionError>;
}

impl<T, F> CollectionLoader<T> for F
where
    F: Fn(&CollectionKey) -> Result<Vec<T>, CollectionError>,
{
    fn load(&self, key: &CollectionKey) -> Result<Vec<T>, CollectionError> {
        self(key)
    }
}

/// A collection handle whose contents may not be loaded yet
#[derive(Debug, Clone)]
pub struct LazyCollection<T> {
    key: CollectionKey,
    state: LoadState,
    attachment: Attachment,
    elements: Vec<T>,
    queue: DelayedOperationQueue<T>,
    events: EventSink,
}

impl<T: Clone + PartialEq> LazyCollection<T> {
    /// Uninitialized handle attached to `session`
    pub fn new(key: CollectionKey, session: SessionId, events: EventSink) -> Self {
        Self {
            key,
            state: LoadState::Uninitialized,
            attachment: Attachment::Attached(session),
            elements: Vec::new(),
            queue: DelayedOperationQueue::new(),
            events,
        }
    }

    /// Handle whose contents are already known, e.g. a freshly persisted owner
    pub fn initialized(key: CollectionKey, session: SessionId, elements: Vec<T>, events: EventSink) -> Self {
        Self {
            state: LoadState::Initialized,
            elements,
            ..Self::new(key, session, events)
        }
    }

    pub fn key(&self) -> &CollectionKey {
        &self.key
    }

    pub fn load_state(&self) -> LoadState {
        self.state
    }

    pub fn attachment(&self) -> Attachment {
        self.attachment
    }

    pub fn is_initialized(&self) -> bool {
        self.state == LoadState::Initialized
    }

    pub fn is_attached(&self) -> bool {
        matches!(self.attachment, Attachment::Attached(_))
    }

    pub fn has_queued_operations(&self) -> bool {
        !self.queue.is_empty()
    }

    pub fn queued_operations(&self) -> &[CollectionOperation<T>] {
        self.queue.operations()
    }

    /// Loaded contents, `None` until initialized
    pub fn elements(&self) -> Option<&[T]> {
        self.is_initialized().then_some(self.elements.as_slice())
    }

    pub fn add(&mut self, element: T) -> Result<(), CollectionError> {
        self.mutate(CollectionOperation::Add(element))
    }

    pub fn remove(&mut self, element: T) -> Result<(), CollectionError> {
        self.mutate(CollectionOperation::Remove(element))
    }

    pub fn clear(&mut self) -> Result<(), CollectionError> {
        self.mutate(CollectionOperation::Clear)
    }

    fn mutate(&mut self, operation: CollectionOperation<T>) -> Result<(), CollectionError> {
        if self.is_initialized() {
            operation.apply(&mut self.elements);
            return Ok(());
        }
        if !self.is_attached() {
            return Err(self.lazy_initialization_error());
        }
        self.queue.push(operation);
        Ok(())
    }

    fn lazy_initialization_error(&self) -> CollectionError {
        CollectionError::LazyInitialization {
            role: self.key.role(),
        }
    }

    /// Load the contents and replay the queue; a no-op once initialized.
    /// A failed load leaves the handle uninitialized with its queue intact.
    pub fn initialize(&mut self, loader: &impl CollectionLoader<T>) -> Result<(), CollectionError> {
        if self.is_initialized() {
            return Ok(());
        }
        if !self.is_attached() {
            return Err(self.lazy_initialization_error());
        }
        self.state = LoadState::Initializing;
        let mut elements = match loader.load(&self.key) {
            Ok(elements) => elements,
            Err(err) => {
                self.state = LoadState::Uninitialized;
                return Err(err);
            }
        };
        let replayed = self.queue.len();
        self.queue.flush_into(&mut elements);
        self.elements = elements;
        self.state = LoadState::Initialized;
        debug!(
            collection = %self.key,
            replayed,
            size = self.elements.len(),
            "initialized collection"
        );
        Ok(())
    }

    /// Leave the session; queued operations are kept
    pub fn detach(&mut self) {
        if !self.is_initialized() && self.has_queued_operations() {
            self.events.emit(CollectionEvent::DetachedWithQueuedOps {
                key: self.key.clone(),
            });
        }
        self.attachment = Attachment::Detached;
    }

    /// Merge into `session`, producing a new managed handle. Queued operations
    /// of an uninitialized handle are dropped; `self` is left as it was.
    pub fn merge(&self, session: SessionId) -> LazyCollection<T> {
        if self.is_initialized() {
            return LazyCollection::initialized(
                self.key.clone(),
                session,
                self.elements.clone(),
                self.events.clone(),
            );
        }
        if self.has_queued_operations() {
            self.events.emit(CollectionEvent::MergeQueueDiscarded {
                key: self.key.clone(),
            });
        }
        LazyCollection::new(self.key.clone(), session, self.events.clone())
    }

    /// Reattach as-is (save/update); the queue waits for the next initialization
    pub fn reattach(&mut self, session: SessionId) {
        if self.attachment != Attachment::Detached {
            return;
        }
        self.attachment = Attachment::Attaching(session);
        if !self.is_initialized() && self.has_queued_operations() {
            self.events.emit(CollectionEvent::AttachedWithQueuedOps {
                key: self.key.clone(),
            });
        }
        self.attachment = Attachment::Attached(session);
    }

    pub fn begin_transaction(&mut self) {
        self.queue.checkpoint();
    }

    pub fn complete_transaction(&mut self, outcome: TransactionOutcome) {
        match outcome {
            TransactionOutcome::Committed => self.queue.release_checkpoint(),
            TransactionOutcome::RolledBack => {
                if self.queue.rollback() > 0 {
                    self.events.emit(CollectionEvent::QueueRollback {
                        key: self.key.clone(),
                    });
                }
            }
        }
    }
}
