//! # Entity Registries
//!
//! Id-keyed storage for bodies, vehicles and constraints, plus the
//! reference counts that decide when a shared material is registered with
//! or released from the worker.
//!
//! Iteration order is id order, so every pass over a registry (dirty
//! flush, collision diff) is deterministic.

use physbridge_shared::{EntityId, MaterialDescriptor};
use std::collections::btree_map::{self, BTreeMap, Entry};

/// Mapping from id to entity state.
#[derive(Debug)]
pub struct Registry<T> {
    entries: BTreeMap<EntityId, T>,
}

impl<T> Default for Registry<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Registry<T> {
    /// Creates an empty registry.
    #[must_use]
    pub const fn new() -> Self {
        Self { entries: BTreeMap::new() }
    }

    /// Inserts an entry, returning the one it replaced.
    pub fn insert(&mut self, id: EntityId, value: T) -> Option<T> {
        self.entries.insert(id, value)
    }

    /// Removes an entry.
    pub fn remove(&mut self, id: EntityId) -> Option<T> {
        self.entries.remove(&id)
    }

    /// Looks up an entry.
    #[inline]
    #[must_use]
    pub fn get(&self, id: EntityId) -> Option<&T> {
        self.entries.get(&id)
    }

    /// Looks up an entry mutably.
    #[inline]
    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut T> {
        self.entries.get_mut(&id)
    }

    /// Returns true if `id` is registered.
    #[inline]
    #[must_use]
    pub fn contains(&self, id: EntityId) -> bool {
        self.entries.contains_key(&id)
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Registered ids in ascending order.
    pub fn ids(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.entries.keys().copied()
    }

    /// Entries in id order.
    pub fn iter(&self) -> btree_map::Iter<'_, EntityId, T> {
        self.entries.iter()
    }

    /// Entries in id order, mutably.
    pub fn iter_mut(&mut self) -> btree_map::IterMut<'_, EntityId, T> {
        self.entries.iter_mut()
    }
}

impl<'a, T> IntoIterator for &'a Registry<T> {
    type Item = (&'a EntityId, &'a T);
    type IntoIter = btree_map::Iter<'a, EntityId, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Reference counts for materials shared between bodies.
#[derive(Debug, Default)]
pub struct MaterialRegistry {
    counts: BTreeMap<u32, (MaterialDescriptor, usize)>,
}

impl MaterialRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub const fn new() -> Self {
        Self { counts: BTreeMap::new() }
    }

    /// Records one more user of `material`.
    ///
    /// Returns true on first use, when the worker has to be told about it.
    pub fn acquire(&mut self, material: MaterialDescriptor) -> bool {
        match self.counts.entry(material.id) {
            Entry::Vacant(slot) => {
                slot.insert((material, 1));
                true
            }
            Entry::Occupied(mut slot) => {
                slot.get_mut().1 += 1;
                false
            }
        }
    }

    /// Records one fewer user of material `id`.
    ///
    /// Returns the descriptor when the last user is gone and the worker
    /// should forget it.
    pub fn release(&mut self, id: u32) -> Option<MaterialDescriptor> {
        let Entry::Occupied(mut slot) = self.counts.entry(id) else {
            return None;
        };
        slot.get_mut().1 -= 1;
        if slot.get().1 == 0 {
            Some(slot.remove().0)
        } else {
            None
        }
    }

    /// Current user count of material `id`.
    #[must_use]
    pub fn users(&self, id: u32) -> usize {
        self.counts.get(&id).map_or(0, |(_, count)| *count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_lookup_remove() {
        let mut registry = Registry::new();
        let a = EntityId::allocate();
        let b = EntityId::allocate();

        assert!(registry.insert(a, "a").is_none());
        registry.insert(b, "b");
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.get(a), Some(&"a"));

        assert_eq!(registry.remove(a), Some("a"));
        assert!(!registry.contains(a));
        assert_eq!(registry.remove(a), None);
        assert_eq!(registry.ids().collect::<Vec<_>>(), vec![b]);
    }

    #[test]
    fn test_iteration_is_in_id_order() {
        let mut registry = Registry::new();
        for raw in [9, 3, 5, 1] {
            registry.insert(EntityId::from_raw(raw), raw);
        }
        let order: Vec<u32> = registry.iter().map(|(_, v)| *v).collect();
        assert_eq!(order, vec![1, 3, 5, 9]);
    }

    #[test]
    fn test_ids_never_reused_after_removal() {
        let mut registry = Registry::new();
        let mut seen = Vec::new();
        for _ in 0..16 {
            let id = EntityId::allocate();
            registry.insert(id, ());
            registry.remove(id);
            seen.push(id);
        }
        for pair in seen.windows(2) {
            assert!(pair[0] < pair[1]);
        }
    }

    #[test]
    fn test_material_refcount() {
        let mut materials = MaterialRegistry::new();
        let rubber = MaterialDescriptor::new(4).with_restitution(0.9);

        assert!(materials.acquire(rubber));
        assert!(!materials.acquire(rubber));
        assert_eq!(materials.users(4), 2);

        assert_eq!(materials.release(4), None);
        assert_eq!(materials.release(4), Some(rubber));
        assert_eq!(materials.users(4), 0);
        assert_eq!(materials.release(4), None);
    }
}
