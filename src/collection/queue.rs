//! Ordered record of mutations made to an uninitialized collection

/// A mutation recorded while the collection contents were not loaded
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CollectionOperation<T> {
    Add(T),
    /// Removes the first equal element, bag semantics
    Remove(T),
    Clear,
}

impl<T: PartialEq> CollectionOperation<T> {
    pub fn apply(self, elements: &mut Vec<T>) {
        match self {
            CollectionOperation::Add(element) => elements.push(element),
            CollectionOperation::Remove(element) => {
                if let Some(index) = elements.iter().position(|e| *e == element) {
                    elements.remove(index);
                }
            }
            CollectionOperation::Clear => elements.clear(),
        }
    }
}

/// FIFO queue of [`CollectionOperation`]s with an optional transaction checkpoint
#[derive(Debug, Clone)]
pub struct DelayedOperationQueue<T> {
    operations: Vec<CollectionOperation<T>>,
    checkpoint: Option<usize>,
}

impl<T> Default for DelayedOperationQueue<T> {
    fn default() -> Self {
        Self {
            operations: Vec::new(),
            checkpoint: None,
        }
    }
}

impl<T> DelayedOperationQueue<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, operation: CollectionOperation<T>) {
        self.operations.push(operation);
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    pub fn operations(&self) -> &[CollectionOperation<T>] {
        &self.operations
    }

    /// Remember the current length; a later rollback truncates back to it
    pub fn checkpoint(&mut self) {
        self.checkpoint = Some(self.operations.len());
    }

    pub fn has_checkpoint(&self) -> bool {
        self.checkpoint.is_some()
    }

    pub fn release_checkpoint(&mut self) {
        self.checkpoint = None;
    }

    /// Drop operations recorded since the checkpoint, returning how many were dropped.
    /// Without a checkpoint nothing is dropped.
    pub fn rollback(&mut self) -> usize {
        let Some(mark) = self.checkpoint.take() else {
            return 0;
        };
        let discarded = self.operations.len().saturating_sub(mark);
        self.operations.truncate(mark);
        discarded
    }

    /// Empty the queue, handing back the operations in recorded order
    pub fn take(&mut self) -> Vec<CollectionOperation<T>> {
        self.checkpoint = None;
        std::mem::take(&mut self.operations)
    }
}

impl<T: PartialEq> DelayedOperationQueue<T> {
    /// Apply every queued operation to `elements` in FIFO order and empty the queue
    pub fn flush_into(&mut self, elements: &mut Vec<T>) {
        for operation in self.take() {
            operation.apply(elements);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_flush_applies_in_order() {
        let mut queue = DelayedOperationQueue::new();
        queue.push(CollectionOperation::Add("zeke"));
        queue.push(CollectionOperation::Remove("yogi"));
        queue.push(CollectionOperation::Add("yogi"));

        let mut elements = vec!["yogi", "sherman", "yogi"];
        queue.flush_into(&mut elements);
        assert_eq!(elements, vec!["sherman", "yogi", "zeke", "yogi"]);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_clear_then_add() {
        let mut queue = DelayedOperationQueue::new();
        queue.push(CollectionOperation::Clear);
        queue.push(CollectionOperation::Add(3));
        let mut elements = vec![1, 2];
        queue.flush_into(&mut elements);
        assert_eq!(elements, vec![3]);
    }

    #[test]
    fn test_rollback_to_checkpoint() {
        let mut queue = DelayedOperationQueue::new();
        queue.push(CollectionOperation::Add(1));
        queue.checkpoint();
        queue.push(CollectionOperation::Add(2));
        queue.push(CollectionOperation::Clear);

        assert_eq!(queue.rollback(), 2);
        assert_eq!(queue.operations(), &[CollectionOperation::Add(1)]);
        assert!(!queue.has_checkpoint());
        // a second rollback has nothing to return to
        assert_eq!(queue.rollback(), 0);
    }

    #[test]
    fn test_rollback_after_flush_discards_nothing() {
        let mut queue = DelayedOperationQueue::new();
        queue.checkpoint();
        queue.push(CollectionOperation::Add(1));
        queue.flush_into(&mut Vec::new());
        assert_eq!(queue.rollback(), 0);
    }
}
