use std::{
    marker::PhantomData,
    ops::{Index, IndexMut},
};

use super::EntityIndex;

/// A growable side table addressed by an entity index.
///
/// Entries that were never written read as the default value. Algorithms
/// use this for transient per-vertex scratch so the graph's own entities
/// are never mutated; the scratch disappears when the map is dropped,
/// whatever the exit path.
#[derive(Debug, Clone)]
pub struct SecondaryMap<K, V> {
    values: Vec<V>,
    default: V,
    phantom: PhantomData<K>,
}

impl<K: EntityIndex, V: Clone + Default> SecondaryMap<K, V> {
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            values: Vec::with_capacity(capacity),
            default: V::default(),
            phantom: PhantomData,
        }
    }

    /// The value stored at `key`, or the shared default when the entry
    /// was never written.
    pub fn get(&self, key: K) -> &V {
        self.values.get(key.index()).unwrap_or(&self.default)
    }

    /// A writable entry at `key`, backfilling defaults up to it first.
    pub fn get_mut(&mut self, key: K) -> &mut V {
        let index = key.index();
        if self.values.len() <= index {
            self.values.resize_with(index + 1, V::default);
        }
        &mut self.values[index]
    }

    /// Number of entries that have backing storage, written or not.
    pub fn backed_len(&self) -> usize {
        self.values.len()
    }
}

impl<K: EntityIndex, V: Default + Clone> Default for SecondaryMap<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: EntityIndex, V: Clone + Default> Index<K> for SecondaryMap<K, V> {
    type Output = V;

    fn index(&self, key: K) -> &Self::Output {
        self.get(key)
    }
}

impl<K: EntityIndex, V: Clone + Default> IndexMut<K> for SecondaryMap<K, V> {
    fn index_mut(&mut self, key: K) -> &mut Self::Output {
        self.get_mut(key)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    crate::make_entity! {
        pub struct TestIndex(u32);
    }

    #[test]
    fn absent_entries_read_default() {
        let mut map: SecondaryMap<TestIndex, Option<u64>> = SecondaryMap::new();

        let k0 = TestIndex::new(0);
        let k9 = TestIndex::new(9);

        assert_eq!(map[k9], None);
        map[k9] = Some(42);
        assert_eq!(map[k9], Some(42));
        assert_eq!(map[k0], None);
    }

    #[test]
    fn get_mut_backfills_up_to_the_key() {
        let mut map: SecondaryMap<TestIndex, u32> = SecondaryMap::new();
        assert_eq!(map.backed_len(), 0);

        *map.get_mut(TestIndex::new(4)) = 7;
        assert_eq!(map.backed_len(), 5);
        assert_eq!(*map.get(TestIndex::new(4)), 7);
        assert_eq!(*map.get(TestIndex::new(3)), 0);

        // Reading past the backing still yields the default.
        assert_eq!(*map.get(TestIndex::new(100)), 0);
        assert_eq!(map.backed_len(), 5);
    }
}
