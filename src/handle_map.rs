//! Slot table mapping [`AssetInstanceHandle`]s to data.
//!
//! Lookups are O(1). Insertion first looks for an equal live value so that opening the same
//! object twice yields the same handle, then reuses the lowest free slot. Removal never moves
//! other entries, so every live handle keeps its index.

use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::ops::{Index, IndexMut};

use crate::handle::AssetInstanceHandle;

#[derive(Debug, Clone)]
pub struct HandleMap<T> {
    slots: Vec<Option<T>>,
    free: BinaryHeap<Reverse<usize>>,
    live: usize,
}

impl<T> Default for HandleMap<T> {
    fn default() -> Self {
        Self { slots: Vec::new(), free: BinaryHeap::new(), live: 0 }
    }
}

impl<T> HandleMap<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has(&self, handle: AssetInstanceHandle) -> bool {
        self.slot(handle).is_some()
    }

    pub fn get(&self, handle: AssetInstanceHandle) -> Option<&T> {
        self.slot(handle)
    }

    pub fn get_mut(&mut self, handle: AssetInstanceHandle) -> Option<&mut T> {
        let index = handle.index()?;
        self.slots.get_mut(index)?.as_mut()
    }

    /// Frees the slot. The index becomes available for the next insertion of a new value.
    pub fn remove(&mut self, handle: AssetInstanceHandle) -> Option<T> {
        let index = handle.index()?;
        let value = self.slots.get_mut(index)?.take()?;
        self.free.push(Reverse(index));
        self.live -= 1;
        Some(value)
    }

    pub fn len(&self) -> usize {
        self.live
    }

    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = (AssetInstanceHandle, &T)> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(index, slot)| slot.as_ref().map(|value| (AssetInstanceHandle::from_index(index), value)))
    }

    pub fn find(&self, mut predicate: impl FnMut(&T) -> bool) -> Option<AssetInstanceHandle> {
        self.iter().find(|(_, value)| predicate(value)).map(|(handle, _)| handle)
    }

    fn slot(&self, handle: AssetInstanceHandle) -> Option<&T> {
        let index = handle.index()?;
        self.slots.get(index)?.as_ref()
    }

    fn insert_new(&mut self, value: T) -> AssetInstanceHandle {
        self.live += 1;
        // Indices in the heap can only point at empty slots; removal is the only producer.
        if let Some(Reverse(index)) = self.free.pop() {
            self.slots[index] = Some(value);
            return AssetInstanceHandle::from_index(index);
        }
        self.slots.push(Some(value));
        AssetInstanceHandle::from_index(self.slots.len() - 1)
    }
}

impl<T: PartialEq> HandleMap<T> {
    pub fn insert(&mut self, value: T) -> AssetInstanceHandle {
        if let Some(existing) = self.find(|live| *live == value) {
            return existing;
        }
        self.insert_new(value)
    }
}

impl<T> Index<AssetInstanceHandle> for HandleMap<T> {
    type Output = T;

    fn index(&self, handle: AssetInstanceHandle) -> &T {
        match self.get(handle) {
            Some(value) => value,
            None => panic!("handle {handle} is not live in this map"),
        }
    }
}

impl<T> IndexMut<AssetInstanceHandle> for HandleMap<T> {
    fn index_mut(&mut self, handle: AssetInstanceHandle) -> &mut T {
        match self.get_mut(handle) {
            Some(value) => value,
            None => panic!("handle {handle} is not live in this map"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    #[test]
    fn insert_returns_slot_indices() {
        let mut map = HandleMap::new();
        assert_eq!(map.insert("a").internal_value(), 0);
        assert_eq!(map.insert("b").internal_value(), 1);
        assert_eq!(map.len(), 2);
    }

    #[test]
    fn equal_values_share_a_handle() {
        let mut map = HandleMap::new();
        let first = map.insert(String::from("shader.ps"));
        let second = map.insert(String::from("shader.ps"));
        assert_eq!(first, second);
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn removal_keeps_other_handles_stable() {
        let mut map = HandleMap::new();
        let a = map.insert(1);
        let b = map.insert(2);
        let c = map.insert(3);
        assert_eq!(map.remove(b), Some(2));
        assert!(!map.has(b));
        assert_eq!(map[a], 1);
        assert_eq!(map[c], 3);
        assert_eq!(map.remove(b), None, "double remove is a no-op");
    }

    #[test]
    fn lowest_free_slot_is_reused_first() {
        let mut map = HandleMap::new();
        let handles: Vec<_> = (0..5).map(|v| map.insert(v)).collect();
        map.remove(handles[3]);
        map.remove(handles[1]);
        assert_eq!(map.insert(10), handles[1]);
        assert_eq!(map.insert(11), handles[3]);
        assert_eq!(map.insert(12).internal_value(), 5);
    }

    #[test]
    fn invalid_and_out_of_range_handles_are_absent() {
        let mut map = HandleMap::new();
        map.insert(7);
        assert!(!map.has(AssetInstanceHandle::INVALID));
        assert!(!map.has(AssetInstanceHandle::new(42)));
        assert!(map.get(AssetInstanceHandle::new(-5)).is_none());
        assert!(map.get_mut(AssetInstanceHandle::new(1)).is_none());
    }

    #[test]
    #[should_panic(expected = "not live")]
    fn indexing_a_removed_handle_panics() {
        let mut map = HandleMap::new();
        let handle = map.insert(1);
        map.remove(handle);
        let _ = map[handle];
    }

    #[test]
    fn has_tracks_insert_remove_sequences() {
        // Deterministic pseudo-random walk; the model is the set of live handles.
        let mut map = HandleMap::new();
        let mut model: BTreeSet<AssetInstanceHandle> = BTreeSet::new();
        let mut removed: BTreeSet<AssetInstanceHandle> = BTreeSet::new();
        let mut seed: u32 = 0x9e37_79b9;
        for step in 0..500u32 {
            seed ^= seed << 13;
            seed ^= seed >> 17;
            seed ^= seed << 5;
            if seed % 3 == 0 && !model.is_empty() {
                let victim = *model.iter().nth(seed as usize % model.len()).expect("non-empty");
                map.remove(victim);
                model.remove(&victim);
                removed.insert(victim);
            } else {
                let handle = map.insert(step);
                model.insert(handle);
                removed.remove(&handle);
            }
            for handle in &model {
                assert!(map.has(*handle));
            }
            for handle in &removed {
                assert!(!map.has(*handle));
            }
            assert_eq!(map.len(), model.len());
        }
    }
}
