//! Per-builder memoization of rule-factory calls.
//!
//! The cache guarantees at-most-one construction per (rule name, argument
//! key) pair. A name whose factory takes no arguments gets a single-slot
//! cell; parameterized factories get a keyed map. Entries are written twice
//! during a construction: first with the forwarding placeholder (before the
//! factory body runs, which is what lets recursive references terminate),
//! then with the real rule once the body returns. A failed body removes the
//! entry entirely so a corrected attempt can retry.

use crate::rule::{key::ArgKey, RuleId};
use hashbrown::HashMap;
use lasso::Spur;

#[derive(Debug)]
enum CacheEntry {
    /// Argument-less rules: one cell per name.
    Slot(Option<RuleId>),
    /// Parameterized rules: one entry per flattened argument key.
    Keyed(HashMap<ArgKey, RuleId, ahash::RandomState>),
}

/// Store mapping (rule name, argument key) to the constructed rule.
#[derive(Debug, Default)]
pub(crate) struct RuleCache {
    entries: HashMap<Spur, CacheEntry, ahash::RandomState>,
}

impl RuleCache {
    pub(crate) fn new() -> Self {
        Self {
            entries: HashMap::with_hasher(ahash::RandomState::new()),
        }
    }

    pub(crate) fn get(&self, name: Spur, key: &ArgKey) -> Option<RuleId> {
        match self.entries.get(&name)? {
            CacheEntry::Slot(slot) if key.is_empty() => *slot,
            CacheEntry::Slot(_) => None,
            CacheEntry::Keyed(map) => map.get(key).copied(),
        }
    }

    /// Record the in-progress rule for a fresh key.
    ///
    /// The slot must be empty: a non-empty entry is never displaced by a
    /// different construction.
    pub(crate) fn insert(&mut self, name: Spur, key: ArgKey, id: RuleId) {
        let entry = self.entries.entry(name).or_insert_with(|| {
            if key.is_empty() {
                CacheEntry::Slot(None)
            } else {
                CacheEntry::Keyed(HashMap::with_hasher(ahash::RandomState::new()))
            }
        });
        // A name first seen without arguments can later be called with
        // arguments; migrate the cell into a keyed map, keeping its value.
        if let CacheEntry::Slot(slot) = entry {
            if !key.is_empty() {
                let mut map = HashMap::with_hasher(ahash::RandomState::new());
                if let Some(existing) = slot.take() {
                    map.insert(ArgKey::empty(), existing);
                }
                *entry = CacheEntry::Keyed(map);
            }
        }
        match entry {
            CacheEntry::Slot(slot) => {
                debug_assert!(slot.is_none(), "cache slot constructed twice");
                *slot = Some(id);
            }
            CacheEntry::Keyed(map) => {
                let previous = map.insert(key, id);
                debug_assert!(previous.is_none(), "cache entry constructed twice");
            }
        }
    }

    /// Supersede the forwarding placeholder with the real rule for `key`.
    ///
    /// This is the only sanctioned update of a non-empty entry: both ids
    /// name the same construction, so later lookups can skip the
    /// forwarding indirection.
    pub(crate) fn complete(&mut self, name: Spur, key: &ArgKey, id: RuleId) {
        match self.entries.get_mut(&name) {
            Some(CacheEntry::Slot(slot)) if key.is_empty() => *slot = Some(id),
            Some(CacheEntry::Keyed(map)) => {
                map.insert(key.clone(), id);
            }
            _ => debug_assert!(false, "completing a construction that was never started"),
        }
    }

    /// Roll a failed construction back to the empty state.
    pub(crate) fn remove(&mut self, name: Spur, key: &ArgKey) {
        match self.entries.get_mut(&name) {
            Some(CacheEntry::Slot(slot)) if key.is_empty() => *slot = None,
            Some(CacheEntry::Keyed(map)) => {
                map.remove(key);
            }
            _ => {}
        }
    }
}

/// Tracks entry and exit of rule-construction calls.
///
/// Only cache misses pass through the tracker: a repeat call for an already
/// constructed key returns straight from the cache. The depth therefore
/// mirrors how deeply factory bodies are nested inside each other, and the
/// total counts first constructions.
#[derive(Debug, Default)]
pub(crate) struct ConstructionTracker {
    depth: usize,
    total: usize,
}

impl ConstructionTracker {
    pub(crate) fn enter(&mut self) -> usize {
        self.depth += 1;
        self.total += 1;
        self.depth
    }

    pub(crate) fn exit(&mut self) {
        debug_assert!(self.depth > 0, "construction exit without matching entry");
        self.depth = self.depth.saturating_sub(1);
    }

    pub(crate) const fn depth(&self) -> usize {
        self.depth
    }

    /// Number of factory bodies that have run to date.
    pub(crate) const fn constructions(&self) -> usize {
        self.total
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lasso::Rodeo;

    fn id(n: u32) -> RuleId {
        RuleId::from_index(n as usize)
    }

    #[test]
    fn test_slot_entry_for_argless_rules() {
        let mut names = Rodeo::new();
        let mut cache = RuleCache::new();
        let expr = names.get_or_intern("expr");

        assert_eq!(cache.get(expr, &ArgKey::empty()), None);
        cache.insert(expr, ArgKey::empty(), id(0));
        assert_eq!(cache.get(expr, &ArgKey::empty()), Some(id(0)));

        cache.complete(expr, &ArgKey::empty(), id(1));
        assert_eq!(cache.get(expr, &ArgKey::empty()), Some(id(1)));
    }

    #[test]
    fn test_keyed_entries_are_independent() {
        let mut names = Rodeo::new();
        let mut cache = RuleCache::new();
        let op = names.get_or_intern("op");
        let plus = ArgKey::new(['+']);
        let minus = ArgKey::new(['-']);

        cache.insert(op, plus.clone(), id(3));
        assert_eq!(cache.get(op, &plus), Some(id(3)));
        assert_eq!(cache.get(op, &minus), None);
    }

    #[test]
    fn test_remove_resets_to_empty() {
        let mut names = Rodeo::new();
        let mut cache = RuleCache::new();
        let expr = names.get_or_intern("expr");

        cache.insert(expr, ArgKey::empty(), id(0));
        cache.remove(expr, &ArgKey::empty());
        assert_eq!(cache.get(expr, &ArgKey::empty()), None);
    }

    #[test]
    fn test_slot_migrates_when_arguments_appear() {
        let mut names = Rodeo::new();
        let mut cache = RuleCache::new();
        let rule = names.get_or_intern("rule");
        let keyed = ArgKey::new([1i64]);

        cache.insert(rule, ArgKey::empty(), id(0));
        cache.insert(rule, keyed.clone(), id(1));
        assert_eq!(cache.get(rule, &ArgKey::empty()), Some(id(0)));
        assert_eq!(cache.get(rule, &keyed), Some(id(1)));
    }

    #[test]
    fn test_tracker_depth_pairs() {
        let mut tracker = ConstructionTracker::default();
        assert_eq!(tracker.enter(), 1);
        assert_eq!(tracker.enter(), 2);
        tracker.exit();
        assert_eq!(tracker.depth(), 1);
        tracker.exit();
        assert_eq!(tracker.depth(), 0);
        assert_eq!(tracker.constructions(), 2);
    }
}
