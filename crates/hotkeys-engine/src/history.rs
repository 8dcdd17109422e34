//! Bounded history of recent events, newest first.

use std::collections::VecDeque;

/// Fixed-capacity buffer that evicts its oldest entry when full.
///
/// Index 0 is always the most recent entry. Besides random access via [`Self::peek`],
/// the buffer keeps a traversal cursor that can walk towards older or newer entries.
#[derive(Clone, Debug)]
pub struct EventHistory<T> {
    /// Entries, oldest at the front.
    entries: VecDeque<T>,
    /// Maximum number of entries.
    capacity: usize,
    /// Traversal position as a peek index, `None` before traversal starts.
    cursor: Option<usize>,
}

impl<T> EventHistory<T> {
    /// Create an empty history holding at most `capacity` entries.
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
            cursor: None,
        }
    }

    /// Append `value` as the most recent entry, evicting the oldest if full.
    pub fn push(&mut self, value: T) {
        if self.capacity == 0 {
            return;
        }
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(value);
        self.cursor = None;
    }

    /// Remove and return the most recent entry.
    pub fn pop(&mut self) -> Option<T> {
        self.cursor = None;
        self.entries.pop_back()
    }

    /// The most recent entry.
    pub fn peek_latest(&self) -> Option<&T> {
        self.entries.back()
    }

    /// The entry `n` steps back; `peek(0)` is the most recent.
    pub fn peek(&self, n: usize) -> Option<&T> {
        let idx = self.entries.len().checked_sub(n + 1)?;
        self.entries.get(idx)
    }

    /// Iterate from newest to oldest.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.entries.iter().rev()
    }

    /// The `n` most recent entries, newest first, or `None` if fewer are recorded.
    pub fn last_n(&self, n: usize) -> Option<Vec<&T>> {
        if self.entries.len() < n {
            return None;
        }
        Some(self.iter().take(n).collect())
    }

    /// Drop every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.cursor = None;
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if no entries are recorded.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Maximum number of entries.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// True if the next push evicts an entry.
    pub fn is_full(&self) -> bool {
        self.entries.len() == self.capacity
    }

    /// Free slots before eviction starts.
    pub fn space(&self) -> usize {
        self.capacity - self.entries.len()
    }

    /// Entry under the traversal cursor. Before traversal starts this is the newest entry.
    pub fn traversing(&self) -> Option<&T> {
        self.peek(self.cursor.unwrap_or(0))
    }

    /// Move the cursor one entry back in time and return it. Stops at the oldest entry.
    pub fn traverse_older(&mut self) -> Option<&T> {
        let next = match self.cursor {
            None => 0,
            Some(c) if c + 1 < self.entries.len() => c + 1,
            Some(_) => return None,
        };
        self.cursor = Some(next);
        self.peek(next)
    }

    /// Move the cursor one entry forward in time and return it. Stops at the newest entry.
    pub fn traverse_newer(&mut self) -> Option<&T> {
        match self.cursor {
            Some(c) if c > 0 => {
                self.cursor = Some(c - 1);
                self.peek(c - 1)
            }
            _ => None,
        }
    }

    /// Forget the traversal position.
    pub fn reset_traversal(&mut self) {
        self.cursor = None;
    }
}
