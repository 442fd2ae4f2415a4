//! Bounded, linear undo/redo history of whole-state snapshots.

use std::collections::VecDeque;

/// Default number of snapshots kept.
pub const DEFAULT_HISTORY_LIMIT: usize = 50;

/// Snapshots are owned clones, so later edits to the live state never
/// reach recorded entries.
#[derive(Debug, Clone)]
pub struct History<T: Clone> {
    entries: VecDeque<T>,
    cursor: usize,
    limit: usize,
}

impl<T: Clone> Default for History<T> {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_LIMIT)
    }
}

impl<T: Clone> History<T> {
    /// A history holding at most `limit` snapshots (at least one).
    pub fn new(limit: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            cursor: 0,
            limit: limit.max(1),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn current(&self) -> Option<&T> {
        self.entries.get(self.cursor)
    }

    /// Store `state` as entry 0 when nothing has been recorded yet, so the
    /// first real action can be undone back to it.
    pub fn seed(&mut self, state: &T) {
        if self.entries.is_empty() {
            self.entries.push_back(state.clone());
            self.cursor = 0;
        }
    }

    /// Append a snapshot after the cursor, discarding any redoable entries.
    /// The oldest entry is evicted when the limit is exceeded.
    pub fn record(&mut self, state: T) {
        if !self.entries.is_empty() {
            self.entries.truncate(self.cursor + 1);
        }
        self.entries.push_back(state);
        self.cursor = self.entries.len() - 1;
        while self.entries.len() > self.limit {
            self.entries.pop_front();
            self.cursor = self.cursor.saturating_sub(1);
            tracing::info!(limit = self.limit, "history full, evicted oldest snapshot");
        }
        self.cursor = self.cursor.min(self.limit - 1);
    }

    pub fn can_undo(&self) -> bool {
        self.cursor > 0
    }

    pub fn can_redo(&self) -> bool {
        self.cursor + 1 < self.entries.len()
    }

    /// Step back and return the snapshot that is now live.
    pub fn undo(&mut self) -> Option<&T> {
        if !self.can_undo() {
            return None;
        }
        self.cursor -= 1;
        self.entries.get(self.cursor)
    }

    /// Step forward and return the snapshot that is now live.
    pub fn redo(&mut self) -> Option<&T> {
        if !self.can_redo() {
            return None;
        }
        self.cursor += 1;
        self.entries.get(self.cursor)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.cursor = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_undo_redo_walks_the_line() {
        let mut h = History::new(10);
        h.seed(&0);
        h.record(1);
        h.record(2);
        assert_eq!(h.undo(), Some(&1));
        assert_eq!(h.undo(), Some(&0));
        assert_eq!(h.undo(), None);
        assert_eq!(h.redo(), Some(&1));
        assert_eq!(h.redo(), Some(&2));
        assert_eq!(h.redo(), None);
    }

    #[test]
    fn test_record_after_undo_discards_future() {
        let mut h = History::new(10);
        h.seed(&"a");
        h.record("b");
        h.record("c");
        h.undo();
        h.record("d");
        assert!(!h.can_redo());
        assert_eq!(h.len(), 3);
        assert_eq!(h.undo(), Some(&"b"));
    }

    #[test]
    fn test_eviction_keeps_cursor_on_newest() {
        let mut h = History::new(3);
        h.seed(&0);
        for i in 1..=5 {
            h.record(i);
            assert!(h.len() <= 3);
            assert_eq!(h.current(), Some(&i));
        }
        assert_eq!(h.cursor(), 2);
        assert_eq!(h.undo(), Some(&4));
        assert_eq!(h.undo(), Some(&3));
        assert_eq!(h.undo(), None);
    }

    #[test]
    fn test_seed_only_applies_once() {
        let mut h = History::new(5);
        h.seed(&1);
        h.seed(&2);
        assert_eq!(h.len(), 1);
        assert_eq!(h.current(), Some(&1));
    }

    #[test]
    fn test_limit_of_one() {
        let mut h = History::new(0);
        assert_eq!(h.limit(), 1);
        h.seed(&0);
        h.record(1);
        assert_eq!(h.len(), 1);
        assert_eq!(h.cursor(), 0);
        assert!(!h.can_undo());
    }
}
