//! Bounded, reorderable work queue with a single "current" cursor.
//!
//! [`QueueStore`] owns every [`WorkItem`].  All mutations are synchronous and
//! atomic: they either apply completely or report failure (`false`) without
//! touching anything.  After any removal or move, the cursor keeps pointing at
//! the same logical item, or at its new neighbour if that item was removed.

use std::path::Path;

use crate::audio::is_supported_format;

use super::state::{ItemState, TransitionError};

// ---------------------------------------------------------------------------
// WorkItem
// ---------------------------------------------------------------------------

/// A media file waiting in (or moving through) the queue.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkItem {
    /// Stable identity — the file path as given.  Also the result-cache key.
    pub identity: String,
    /// File name shown to the user.
    pub display_name: String,
    /// Lifecycle state.
    pub state: ItemState,
}

impl WorkItem {
    pub fn new(identity: impl Into<String>) -> Self {
        let identity = identity.into();
        let display_name = Path::new(&identity)
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| identity.clone());
        Self {
            identity,
            display_name,
            state: ItemState::Pending,
        }
    }
}

// ---------------------------------------------------------------------------
// QueueStore
// ---------------------------------------------------------------------------

/// Ordered collection of at most [`QueueStore::MAX_ITEMS`] work items.
#[derive(Debug, Default)]
pub struct QueueStore {
    items: Vec<WorkItem>,
    current: Option<usize>,
}

impl QueueStore {
    /// Capacity bound of the queue.
    pub const MAX_ITEMS: usize = 5;

    pub fn new() -> Self {
        Self::default()
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    pub fn items(&self) -> &[WorkItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.items.len() >= Self::MAX_ITEMS
    }

    /// Remaining admission capacity.
    pub fn remaining(&self) -> usize {
        Self::MAX_ITEMS.saturating_sub(self.items.len())
    }

    /// The cursor, `None` when nothing is selected (or the queue is empty).
    pub fn current_index(&self) -> Option<usize> {
        self.current
    }

    pub fn current_item(&self) -> Option<&WorkItem> {
        self.current.and_then(|i| self.items.get(i))
    }

    pub fn current_identity(&self) -> Option<&str> {
        self.current_item().map(|item| item.identity.as_str())
    }

    /// Whether [`next_after_current`](Self::next_after_current) would advance.
    pub fn has_next(&self) -> bool {
        match self.current {
            Some(c) => c + 1 < self.items.len(),
            None => !self.items.is_empty(),
        }
    }

    pub fn get(&self, index: usize) -> Option<&WorkItem> {
        self.items.get(index)
    }

    /// Position of the first item with `identity`.
    pub fn position_of(&self, identity: &str) -> Option<usize> {
        self.items.iter().position(|item| item.identity == identity)
    }

    /// State of the first item with `identity`.
    pub fn state_of(&self, identity: &str) -> Option<ItemState> {
        self.position_of(identity).map(|i| self.items[i].state)
    }

    /// Index of the item currently in `Processing`, if any.
    pub fn processing_index(&self) -> Option<usize> {
        self.items
            .iter()
            .position(|item| item.state == ItemState::Processing)
    }

    // -----------------------------------------------------------------------
    // Mutations
    // -----------------------------------------------------------------------

    /// Admit `paths` with a supported extension, up to the remaining capacity.
    ///
    /// Unsupported formats and overflow are dropped silently; the return
    /// value is the number actually admitted so callers can report the
    /// deficit.
    pub fn add<I, S>(&mut self, paths: I) -> usize
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut added = 0;
        for path in paths {
            if self.is_full() {
                break;
            }
            let path = path.as_ref();
            if !is_supported_format(path) {
                log::debug!("queue: skipping unsupported file {path}");
                continue;
            }
            self.items.push(WorkItem::new(path));
            added += 1;
        }
        if added > 0 {
            log::debug!("queue: admitted {added} item(s), len = {}", self.items.len());
        }
        added
    }

    /// Remove the item at `index`.  Returns `false` when out of range.
    pub fn remove(&mut self, index: usize) -> bool {
        if index >= self.items.len() {
            return false;
        }
        self.items.remove(index);

        let len = self.items.len();
        self.current = match self.current {
            None => None,
            Some(_) if len == 0 => None,
            Some(c) if index < c => Some(c - 1),
            // The current item itself was removed: its successor slides into
            // the same slot, unless it was the last item.
            Some(c) if c >= len => Some(len - 1),
            Some(c) => Some(c),
        };
        true
    }

    /// Move the item at `from` so it ends up at `to`.
    ///
    /// Fails when either index is out of range; `from == to` is a successful
    /// no-op.  The cursor follows the item it pointed to.
    pub fn move_item(&mut self, from: usize, to: usize) -> bool {
        let len = self.items.len();
        if from >= len || to >= len {
            return false;
        }
        if from == to {
            return true;
        }

        let item = self.items.remove(from);
        self.items.insert(to, item);

        self.current = self.current.map(|c| {
            if c == from {
                to
            } else if from < c && c <= to {
                c - 1
            } else if to <= c && c < from {
                c + 1
            } else {
                c
            }
        });
        true
    }

    /// Point the cursor at `index`.  Returns `false` when out of range.
    pub fn set_current(&mut self, index: usize) -> bool {
        if index >= self.items.len() {
            return false;
        }
        self.current = Some(index);
        true
    }

    /// Advance the cursor by exactly one position and return the identity
    /// now under it, or `None` (cursor unchanged) at the end of the queue.
    pub fn next_after_current(&mut self) -> Option<String> {
        if !self.has_next() {
            return None;
        }
        let next = self.current.map_or(0, |c| c + 1);
        self.current = Some(next);
        Some(self.items[next].identity.clone())
    }

    /// Write `state` onto the item at `index`.
    ///
    /// Writing `Processing` first demotes any other `Processing` item to
    /// `Pending`, so at most one item is ever `Processing`.
    pub fn set_state(&mut self, index: usize, state: ItemState) -> bool {
        if index >= self.items.len() {
            return false;
        }
        if state == ItemState::Processing {
            for (i, item) in self.items.iter_mut().enumerate() {
                if i != index && item.state == ItemState::Processing {
                    log::debug!("queue: demoting {} to Pending", item.display_name);
                    item.state = ItemState::Pending;
                }
            }
        }
        self.items[index].state = state;
        true
    }

    /// Like [`set_state`](Self::set_state) but rejects transitions the item
    /// state machine does not allow.
    pub fn transition(&mut self, index: usize, next: ItemState) -> Result<(), TransitionError> {
        let current = self
            .items
            .get(index)
            .map(|item| item.state)
            .ok_or(TransitionError::OutOfRange(index))?;
        if !current.can_transition_to(next) {
            return Err(TransitionError::Illegal {
                from: current,
                to: next,
            });
        }
        self.set_state(index, next);
        Ok(())
    }

    /// Empty the queue and reset the cursor.
    pub fn clear(&mut self) {
        self.items.clear();
        self.current = None;
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn queue_of(names: &[&str]) -> QueueStore {
        let mut q = QueueStore::new();
        let added = q.add(names.iter().map(|n| format!("/media/{n}.wav")));
        assert_eq!(added, names.len());
        q
    }

    fn order(q: &QueueStore) -> Vec<&str> {
        q.items().iter().map(|i| i.display_name.as_str()).collect()
    }

    fn assert_cursor_in_bounds(q: &QueueStore) {
        assert!(q.len() <= QueueStore::MAX_ITEMS);
        if let Some(c) = q.current_index() {
            assert!(c < q.len(), "cursor {c} out of bounds for len {}", q.len());
        }
    }

    // ---- add ---------------------------------------------------------------

    #[test]
    fn add_filters_unsupported_formats() {
        let mut q = QueueStore::new();
        let added = q.add(["a.wav", "b.txt", "c.MP3", "d.flac", "noext"]);
        assert_eq!(added, 2);
        assert_eq!(order(&q), ["a.wav", "c.MP3"]);
    }

    #[test]
    fn add_stops_at_capacity() {
        let mut q = QueueStore::new();
        let paths: Vec<String> = (0..8).map(|i| format!("{i}.wav")).collect();
        assert_eq!(q.add(&paths), 5);
        assert!(q.is_full());
        assert_eq!(q.add(["late.wav"]), 0);
        assert_eq!(q.len(), QueueStore::MAX_ITEMS);
    }

    #[test]
    fn new_items_are_pending_with_file_name() {
        let q = queue_of(&["talk"]);
        let item = &q.items()[0];
        assert_eq!(item.identity, "/media/talk.wav");
        assert_eq!(item.display_name, "talk.wav");
        assert_eq!(item.state, ItemState::Pending);
        assert_eq!(q.current_index(), None);
    }

    // ---- remove ------------------------------------------------------------

    #[test]
    fn remove_out_of_range_fails() {
        let mut q = queue_of(&["a"]);
        assert!(!q.remove(1));
        assert_eq!(q.len(), 1);
    }

    #[test]
    fn remove_before_cursor_shifts_it() {
        let mut q = queue_of(&["a", "b", "c"]);
        q.set_current(2);
        assert!(q.remove(0));
        assert_eq!(q.current_index(), Some(1));
        assert_eq!(q.current_item().unwrap().display_name, "c.wav");
    }

    #[test]
    fn remove_current_selects_successor() {
        let mut q = queue_of(&["a", "b", "c"]);
        q.set_current(1);
        q.remove(1);
        assert_eq!(q.current_item().unwrap().display_name, "c.wav");
    }

    #[test]
    fn remove_current_last_selects_predecessor() {
        let mut q = queue_of(&["a", "b"]);
        q.set_current(1);
        q.remove(1);
        assert_eq!(q.current_index(), Some(0));
    }

    #[test]
    fn remove_only_item_resets_cursor() {
        let mut q = queue_of(&["a"]);
        q.set_current(0);
        q.remove(0);
        assert_eq!(q.current_index(), None);
        assert!(q.is_empty());
    }

    #[test]
    fn remove_after_cursor_keeps_it() {
        let mut q = queue_of(&["a", "b", "c"]);
        q.set_current(0);
        q.remove(2);
        assert_eq!(q.current_index(), Some(0));
    }

    // ---- move --------------------------------------------------------------

    #[test]
    fn move_current_forward_follows_item() {
        let mut q = queue_of(&["A", "B", "C"]);
        q.set_current(0);
        assert!(q.move_item(0, 2));
        assert_eq!(order(&q), ["B.wav", "C.wav", "A.wav"]);
        assert_eq!(q.current_index(), Some(2));
    }

    #[test]
    fn move_across_cursor_shifts_it() {
        let mut q = queue_of(&["A", "B", "C", "D"]);
        q.set_current(2); // C
        q.move_item(0, 3);
        assert_eq!(q.current_item().unwrap().display_name, "C.wav");
        assert_eq!(q.current_index(), Some(1));

        q.move_item(3, 0); // A back to the front
        assert_eq!(q.current_item().unwrap().display_name, "C.wav");
        assert_eq!(q.current_index(), Some(2));
    }

    #[test]
    fn move_same_index_is_noop_success() {
        let mut q = queue_of(&["A", "B"]);
        assert!(q.move_item(1, 1));
        assert_eq!(order(&q), ["A.wav", "B.wav"]);
    }

    #[test]
    fn move_out_of_range_fails_without_change() {
        let mut q = queue_of(&["A", "B"]);
        q.set_current(1);
        assert!(!q.move_item(0, 2));
        assert!(!q.move_item(5, 0));
        assert_eq!(order(&q), ["A.wav", "B.wav"]);
        assert_eq!(q.current_index(), Some(1));
    }

    #[test]
    fn mixed_mutations_keep_cursor_in_bounds() {
        let mut q = QueueStore::new();
        let ops: [(u8, usize, usize); 14] = [
            (0, 0, 0),
            (2, 3, 0),
            (1, 4, 1),
            (3, 0, 0),
            (1, 0, 0),
            (0, 0, 0),
            (2, 0, 2),
            (3, 1, 0),
            (1, 2, 0),
            (2, 1, 0),
            (1, 0, 0),
            (1, 0, 0),
            (0, 0, 0),
            (2, 2, 0),
        ];
        for (op, a, b) in ops {
            match op {
                0 => {
                    q.add(["x.wav", "y.mp3", "z.wav"]);
                }
                1 => {
                    q.remove(a);
                }
                2 => {
                    q.move_item(a, b);
                }
                _ => {
                    q.set_current(a);
                }
            }
            assert_cursor_in_bounds(&q);
        }
    }

    // ---- cursor ------------------------------------------------------------

    #[test]
    fn next_after_current_advances_one() {
        let mut q = queue_of(&["a", "b"]);
        q.set_current(0);
        assert_eq!(q.next_after_current().as_deref(), Some("/media/b.wav"));
        assert_eq!(q.current_index(), Some(1));
        assert_eq!(q.next_after_current(), None);
        assert_eq!(q.current_index(), Some(1));
    }

    #[test]
    fn next_after_unset_cursor_starts_at_front() {
        let mut q = queue_of(&["a", "b"]);
        assert_eq!(q.next_after_current().as_deref(), Some("/media/a.wav"));
    }

    #[test]
    fn set_current_out_of_range_fails() {
        let mut q = queue_of(&["a"]);
        assert!(!q.set_current(1));
        assert_eq!(q.current_index(), None);
    }

    // ---- state -------------------------------------------------------------

    #[test]
    fn setting_processing_demotes_other() {
        let mut q = queue_of(&["a", "b", "c"]);
        assert!(q.set_state(0, ItemState::Processing));
        assert!(q.set_state(2, ItemState::Processing));
        assert_eq!(q.items()[0].state, ItemState::Pending);
        assert_eq!(q.items()[2].state, ItemState::Processing);
        assert_eq!(q.processing_index(), Some(2));
    }

    #[test]
    fn at_most_one_processing_across_interleavings() {
        let mut q = queue_of(&["a", "b", "c", "d"]);
        let writes = [
            (0, ItemState::Processing),
            (1, ItemState::Ready),
            (3, ItemState::Processing),
            (1, ItemState::Processing),
            (0, ItemState::Failed),
            (2, ItemState::Processing),
            (2, ItemState::Processing),
            (3, ItemState::Processing),
        ];
        for (i, s) in writes {
            q.set_state(i, s);
            let n = q
                .items()
                .iter()
                .filter(|it| it.state == ItemState::Processing)
                .count();
            assert!(n <= 1);
        }
    }

    #[test]
    fn set_state_out_of_range_fails() {
        let mut q = queue_of(&["a"]);
        assert!(!q.set_state(3, ItemState::Ready));
    }

    #[test]
    fn transition_rejects_illegal_change() {
        let mut q = queue_of(&["a"]);
        let err = q.transition(0, ItemState::Playing).unwrap_err();
        assert_eq!(
            err,
            TransitionError::Illegal {
                from: ItemState::Pending,
                to: ItemState::Playing
            }
        );
        assert_eq!(q.items()[0].state, ItemState::Pending);
        assert_eq!(
            q.transition(4, ItemState::Ready),
            Err(TransitionError::OutOfRange(4))
        );
    }

    #[test]
    fn transition_applies_legal_change() {
        let mut q = queue_of(&["a"]);
        q.transition(0, ItemState::Processing).unwrap();
        q.transition(0, ItemState::Ready).unwrap();
        assert_eq!(q.state_of("/media/a.wav"), Some(ItemState::Ready));
    }

    #[test]
    fn clear_resets_everything() {
        let mut q = queue_of(&["a", "b"]);
        q.set_current(1);
        q.clear();
        assert!(q.is_empty());
        assert_eq!(q.current_index(), None);
        assert_eq!(q.remaining(), QueueStore::MAX_ITEMS);
    }
}
