//! Bounded FIFO of proposals waiting for another attempt.

use std::collections::VecDeque;

/// Bounded FIFO without duplicates. When full, the oldest entry is evicted.
#[derive(Debug)]
pub struct RetryQueue<T> {
    items: VecDeque<T>,
    capacity: usize,
}

impl<T: PartialEq> RetryQueue<T> {
    pub fn new(capacity: usize) -> Self {
        Self {
            items: VecDeque::with_capacity(capacity),
            capacity: capacity.max(1),
        }
    }

    /// Enqueue `item`. Returns the evicted entry if the queue was full.
    pub fn push(&mut self, item: T) -> Option<T> {
        if self.items.contains(&item) {
            return None;
        }
        let evicted = if self.items.len() >= self.capacity {
            self.items.pop_front()
        } else {
            None
        };
        self.items.push_back(item);
        evicted
    }

    /// Take everything currently queued, oldest first.
    pub fn take_all(&mut self) -> Vec<T> {
        self.items.drain(..).collect()
    }

    pub fn remove(&mut self, item: &T) -> bool {
        let before = self.items.len();
        self.items.retain(|i| i != item);
        self.items.len() != before
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
