//! # Slots: ordered arena of live subscribers.
//!
//! Keys are stable and strictly increasing, so iteration order is attachment order and a
//! key is never reused. Entries sit in a vector sorted by key; removal is a binary search
//! plus a tombstone, and tombstones are compacted once they outnumber live entries.

/// Stable handle for one slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub(crate) struct SlotKey(u64);

#[derive(Debug)]
pub(crate) struct Slots<V> {
    entries: Vec<(SlotKey, Option<V>)>,
    next: u64,
    live: usize,
}

impl<V> Default for Slots<V> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            next: 0,
            live: 0,
        }
    }
}

impl<V> Slots<V> {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn insert(&mut self, value: V) -> SlotKey {
        let key = SlotKey(self.next);
        self.next += 1;
        self.entries.push((key, Some(value)));
        self.live += 1;
        key
    }

    /// Removes the value under `key`; unknown or already-removed keys return `None`.
    pub(crate) fn remove(&mut self, key: SlotKey) -> Option<V> {
        let idx = self.entries.binary_search_by_key(&key, |(k, _)| *k).ok()?;
        let value = self.entries[idx].1.take()?;
        self.live -= 1;
        if self.entries.len() > 2 * self.live.max(4) {
            self.entries.retain(|(_, v)| v.is_some());
        }
        Some(value)
    }

    pub(crate) fn contains(&self, key: SlotKey) -> bool {
        self.entries
            .binary_search_by_key(&key, |(k, _)| *k)
            .is_ok_and(|idx| self.entries[idx].1.is_some())
    }

    pub(crate) fn len(&self) -> usize {
        self.live
    }

    /// Live entries in attachment order.
    pub(crate) fn iter(&self) -> impl Iterator<Item = (SlotKey, &V)> {
        self.entries
            .iter()
            .filter_map(|(k, v)| v.as_ref().map(|v| (*k, v)))
    }

    /// Removes every live entry, returning them in attachment order.
    pub(crate) fn drain(&mut self) -> Vec<V> {
        self.live = 0;
        self.entries.drain(..).filter_map(|(_, v)| v).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_iteration_follows_attachment_order() {
        let mut slots = Slots::new();
        let a = slots.insert("a");
        let _b = slots.insert("b");
        let _c = slots.insert("c");

        assert_eq!(slots.remove(a), Some("a"));
        let _d = slots.insert("d");

        let order: Vec<_> = slots.iter().map(|(_, v)| *v).collect();
        assert_eq!(order, vec!["b", "c", "d"]);
    }

    #[test]
    fn test_remove_is_idempotent() {
        let mut slots = Slots::new();
        let a = slots.insert(1);
        assert_eq!(slots.remove(a), Some(1));
        assert_eq!(slots.remove(a), None);
        assert!(!slots.contains(a));
        assert_eq!(slots.len(), 0);
    }

    #[test]
    fn test_keys_survive_compaction() {
        let mut slots = Slots::new();
        let keys: Vec<_> = (0..20).map(|i| slots.insert(i)).collect();
        for k in &keys[..18] {
            slots.remove(*k);
        }
        assert_eq!(slots.len(), 2);
        assert!(slots.contains(keys[18]));
        assert_eq!(slots.remove(keys[19]), Some(19));
        assert_eq!(slots.iter().map(|(_, v)| *v).collect::<Vec<_>>(), vec![18]);
    }

    #[test]
    fn test_drain_empties_in_order() {
        let mut slots = Slots::new();
        let a = slots.insert('a');
        slots.insert('b');
        slots.remove(a);
        slots.insert('c');
        assert_eq!(slots.drain(), vec!['b', 'c']);
        assert_eq!(slots.len(), 0);
        assert_eq!(slots.iter().count(), 0);
    }
}
