use std::collections::BTreeMap;

use essentia_core::grid::{GridBox, GridPos};
use essentia_core::tick::Ticks;

use crate::scan::Candidate;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct CacheEntry {
    pub candidates: Vec<Candidate>,
    pub volume: GridBox,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Backoff {
    until: Ticks,
    volume: GridBox,
}

/// Candidate lists by origin, plus "do not rescan before" marks.
#[derive(Debug, Default)]
pub(crate) struct SourceCache {
    entries: BTreeMap<GridPos, CacheEntry>,
    backoff: BTreeMap<GridPos, Backoff>,
}

impl SourceCache {
    pub fn get(&self, origin: GridPos) -> Option<&CacheEntry> {
        self.entries.get(&origin)
    }

    pub fn insert(&mut self, origin: GridPos, entry: CacheEntry) {
        self.backoff.remove(&origin);
        self.entries.insert(origin, entry);
    }

    pub fn invalidate(&mut self, origin: GridPos) -> bool {
        self.entries.remove(&origin).is_some()
    }

    pub fn back_off(&mut self, origin: GridPos, until: Ticks, volume: GridBox) {
        self.backoff.insert(origin, Backoff { until, volume });
    }

    /// Whether `origin` must not be rescanned at `now`.
    pub fn backing_off(&self, origin: GridPos, now: Ticks) -> bool {
        self.backoff.get(&origin).is_some_and(|b| now < b.until)
    }

    /// Drop every entry and backoff whose volume contains `pos`. Returns the
    /// number of cached entries dropped.
    pub fn forget_containing(&mut self, pos: GridPos) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, e| !e.volume.contains(pos));
        self.backoff.retain(|_, b| !b.volume.contains(pos));
        before - self.entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.backoff.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use essentia_core::test_utils::*;

    fn volume_around(p: GridPos) -> GridBox {
        GridBox::new(p.translate(-1, -1, -1), p.translate(1, 1, 1))
    }

    #[test]
    fn backoff_expires() {
        let mut cache = SourceCache::default();
        cache.back_off(pos(0, 0, 0), 100, volume_around(pos(0, 0, 0)));
        assert!(cache.backing_off(pos(0, 0, 0), 0));
        assert!(cache.backing_off(pos(0, 0, 0), 99));
        assert!(!cache.backing_off(pos(0, 0, 0), 100));
        assert!(!cache.backing_off(pos(5, 0, 0), 0));
    }

    #[test]
    fn insert_clears_backoff() {
        let mut cache = SourceCache::default();
        let origin = pos(0, 0, 0);
        cache.back_off(origin, 100, volume_around(origin));
        cache.insert(
            origin,
            CacheEntry {
                candidates: Vec::new(),
                volume: volume_around(origin),
            },
        );
        assert!(!cache.backing_off(origin, 0));
        assert!(cache.get(origin).is_some());
    }

    #[test]
    fn forget_containing_is_spatial() {
        let mut cache = SourceCache::default();
        for x in [0, 10] {
            let origin = pos(x, 0, 0);
            cache.insert(
                origin,
                CacheEntry {
                    candidates: Vec::new(),
                    volume: volume_around(origin),
                },
            );
        }
        cache.back_off(pos(20, 0, 0), 50, volume_around(pos(20, 0, 0)));

        assert_eq!(cache.forget_containing(pos(1, 1, 1)), 1);
        assert!(cache.get(pos(0, 0, 0)).is_none());
        assert!(cache.get(pos(10, 0, 0)).is_some());

        cache.forget_containing(pos(21, 0, 0));
        assert!(!cache.backing_off(pos(20, 0, 0), 0));
        assert_eq!(cache.len(), 1);
    }
}
