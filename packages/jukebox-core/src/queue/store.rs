//! Per-room play queue.
//!
//! Responsibilities:
//! - Ordered storage of queued items, index 0 being the active item
//! - Loop-mode bookkeeping and the `advance` transition that applies it
//! - Shuffle, clear and dedup operations that never relocate the active item
//!
//! Every operation takes the queue lock once for the whole edit. The lock is
//! a `parking_lot::Mutex` and is never held across an `.await`.

use std::collections::{HashSet, VecDeque};
use std::time::Duration;

use parking_lot::Mutex;
use rand::seq::SliceRandom;
use rand::Rng;

use super::{LoopMode, QueueItem};

/// Minimum queue length for a shuffle to reorder anything.
const MIN_SHUFFLE_LEN: usize = 3;

/// Where newly added items landed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueuePlacement {
    /// 1-based position of the first added item.
    pub position: usize,
    /// Combined duration of everything queued ahead of the first added item.
    pub ahead: Duration,
    /// Queue length after the add.
    pub len: usize,
}

#[derive(Default)]
struct QueueInner {
    items: VecDeque<QueueItem>,
    loop_mode: LoopMode,
}

/// Thread-safe play queue for one room.
#[derive(Default)]
pub struct QueueStore {
    inner: Mutex<QueueInner>,
}

impl QueueStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends items to the end, preserving their order.
    pub fn add(&self, items: impl IntoIterator<Item = QueueItem>) -> QueuePlacement {
        let mut inner = self.inner.lock();
        let ahead = inner.items.iter().map(|item| item.duration).sum();
        let position = inner.items.len() + 1;
        inner.items.extend(items);
        QueuePlacement {
            position,
            ahead,
            len: inner.items.len(),
        }
    }

    /// Returns the item at index 0.
    pub fn active_item(&self) -> Option<QueueItem> {
        self.inner.lock().items.front().cloned()
    }

    /// Advances past the active item according to the current loop mode.
    pub fn advance(&self) -> Option<QueueItem> {
        let mut inner = self.inner.lock();
        let mode = inner.loop_mode;
        Self::advance_locked(&mut inner.items, mode)
    }

    /// Advances past the active item as if `mode` were the loop mode.
    ///
    /// Used for forced progression after faults and skips, where the
    /// configured mode must not cause a replay.
    pub fn advance_with(&self, mode: LoopMode) -> Option<QueueItem> {
        let mut inner = self.inner.lock();
        Self::advance_locked(&mut inner.items, mode)
    }

    fn advance_locked(items: &mut VecDeque<QueueItem>, mode: LoopMode) -> Option<QueueItem> {
        match mode {
            LoopMode::Off => {
                items.pop_front();
            }
            LoopMode::RepeatQueue => {
                if let Some(head) = items.pop_front() {
                    items.push_back(head);
                }
            }
            LoopMode::RepeatItem => {}
        }
        items.front().cloned()
    }

    /// Randomizes everything behind the active item.
    ///
    /// Returns `false` (and does nothing) for queues shorter than three.
    pub fn shuffle(&self) -> bool {
        self.shuffle_with(&mut rand::rng())
    }

    pub fn shuffle_with<R: Rng + ?Sized>(&self, rng: &mut R) -> bool {
        let mut inner = self.inner.lock();
        if inner.items.len() < MIN_SHUFFLE_LEN {
            return false;
        }
        inner.items.make_contiguous()[1..].shuffle(rng);
        true
    }

    /// Removes everything except the active item. Returns how many were removed.
    pub fn clear(&self) -> usize {
        let mut inner = self.inner.lock();
        let removed = inner.items.len().saturating_sub(1);
        inner.items.truncate(1);
        removed
    }

    /// Keeps the first occurrence of each identifier. Returns how many were removed.
    pub fn remove_duplicates(&self) -> usize {
        let mut inner = self.inner.lock();
        let before = inner.items.len();
        let mut seen = HashSet::new();
        inner
            .items
            .retain(|item| seen.insert(item.identifier.clone()));
        before - inner.items.len()
    }

    /// Sum of all durations, active item included.
    pub fn total_duration(&self) -> Duration {
        self.inner.lock().items.iter().map(|item| item.duration).sum()
    }

    pub fn snapshot(&self) -> Vec<QueueItem> {
        self.inner.lock().items.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().items.is_empty()
    }

    pub fn loop_mode(&self) -> LoopMode {
        self.inner.lock().loop_mode
    }

    pub fn set_loop_mode(&self, mode: LoopMode) {
        self.inner.lock().loop_mode = mode;
    }

    /// Applies a loop toggle request and returns the resulting mode.
    pub fn toggle_loop_mode(&self, requested: LoopMode) -> LoopMode {
        let mut inner = self.inner.lock();
        inner.loop_mode = inner.loop_mode.toggled(requested);
        inner.loop_mode
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::item;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn ids(store: &QueueStore) -> Vec<String> {
        store.snapshot().into_iter().map(|i| i.identifier).collect()
    }

    fn store_with(ids: &[&str]) -> QueueStore {
        let store = QueueStore::new();
        store.add(ids.iter().map(|id| item(id, 60)));
        store
    }

    #[test]
    fn add_preserves_order_and_reports_placement() {
        let store = store_with(&["a"]);
        let placement = store.add([item("b", 90), item("c", 30)]);

        assert_eq!(ids(&store), ["a", "b", "c"]);
        assert_eq!(placement.position, 2);
        assert_eq!(placement.ahead, Duration::from_secs(60));
        assert_eq!(placement.len, 3);
    }

    #[test]
    fn advance_off_discards_head() {
        let store = store_with(&["a", "b"]);
        let next = store.advance();
        assert_eq!(next.map(|i| i.identifier).as_deref(), Some("b"));
        assert_eq!(ids(&store), ["b"]);

        assert!(store.advance().is_none());
        assert!(store.active_item().is_none());
    }

    #[test]
    fn advance_repeat_queue_rotates_head_to_tail() {
        let store = store_with(&["a", "b"]);
        store.set_loop_mode(LoopMode::RepeatQueue);

        let next = store.advance();
        assert_eq!(next.map(|i| i.identifier).as_deref(), Some("b"));
        assert_eq!(ids(&store), ["b", "a"]);
    }

    #[test]
    fn advance_repeat_item_keeps_head() {
        let store = store_with(&["a", "b"]);
        store.set_loop_mode(LoopMode::RepeatItem);

        assert_eq!(store.advance().map(|i| i.identifier).as_deref(), Some("a"));
        assert_eq!(ids(&store), ["a", "b"]);
    }

    #[test]
    fn advance_with_overrides_loop_mode() {
        let store = store_with(&["a", "b"]);
        store.set_loop_mode(LoopMode::RepeatItem);

        store.advance_with(LoopMode::Off);
        assert_eq!(ids(&store), ["b"]);
        assert_eq!(store.loop_mode(), LoopMode::RepeatItem);
    }

    #[test]
    fn shuffle_is_noop_below_three_items() {
        let store = store_with(&["a", "b"]);
        assert!(!store.shuffle());
        assert_eq!(ids(&store), ["a", "b"]);

        let empty = QueueStore::new();
        assert!(!empty.shuffle());
    }

    #[test]
    fn shuffle_keeps_head_and_permutes_tail() {
        let names: Vec<String> = (0..20).map(|i| format!("t{i}")).collect();
        let refs: Vec<&str> = names.iter().map(String::as_str).collect();
        let store = store_with(&refs);

        let mut rng = StdRng::seed_from_u64(7);
        assert!(store.shuffle_with(&mut rng));

        let after = ids(&store);
        assert_eq!(after[0], "t0");

        let mut tail = after[1..].to_vec();
        tail.sort();
        let mut expected = names[1..].to_vec();
        expected.sort();
        assert_eq!(tail, expected);
    }

    #[test]
    fn clear_keeps_active_item() {
        let store = store_with(&["a", "b", "c"]);
        assert_eq!(store.clear(), 2);
        assert_eq!(ids(&store), ["a"]);

        let empty = QueueStore::new();
        assert_eq!(empty.clear(), 0);
        assert!(empty.is_empty());
    }

    #[test]
    fn remove_duplicates_keeps_first_occurrences_in_order() {
        let store = store_with(&["a", "b", "a", "c", "b", "a"]);
        assert_eq!(store.remove_duplicates(), 3);
        assert_eq!(ids(&store), ["a", "b", "c"]);
    }

    #[test]
    fn remove_duplicates_never_drops_head() {
        let store = store_with(&["a", "a", "a"]);
        store.remove_duplicates();
        assert_eq!(ids(&store), ["a"]);
    }

    #[test]
    fn total_duration_includes_active_item() {
        let store = QueueStore::new();
        store.add([item("a", 60), item("b", 90)]);
        assert_eq!(store.total_duration(), Duration::from_secs(150));
    }

    #[test]
    fn toggle_loop_twice_returns_to_off() {
        let store = QueueStore::new();
        assert_eq!(store.toggle_loop_mode(LoopMode::RepeatItem), LoopMode::RepeatItem);
        assert_eq!(store.toggle_loop_mode(LoopMode::RepeatItem), LoopMode::Off);
    }
}
