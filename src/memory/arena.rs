use std::{
    iter::FusedIterator,
    marker::PhantomData,
    ops::{Index, IndexMut},
};

use crate::memory::EntityIndex;

/// A free-list arena that manages fixed-sized entities.
///
/// Indices of removed entities are recycled by later insertions, so an
/// index is only valid as long as the entity it was minted for is alive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Arena<K, V> {
    data: Vec<Entry<V>>,
    free: usize,
    len: usize,
    phantom: PhantomData<K>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Entry<V> {
    Free(usize),
    Full(V),
}

impl<K, V> Arena<K, V>
where
    K: EntityIndex,
{
    /// Creates an empty [`Arena<K, V>`].
    pub fn new() -> Self {
        Self {
            data: Vec::new(),
            free: 0,
            len: 0,
            phantom: PhantomData,
        }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            data: Vec::with_capacity(capacity),
            free: 0,
            len: 0,
            phantom: PhantomData,
        }
    }

    /// Returns the number of stored values.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns whether there is no stored value.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns an exclusive upper bound on valid indices in this arena.
    pub fn upper_bound(&self) -> usize {
        self.data.len()
    }

    pub fn contains(&self, key: K) -> bool {
        matches!(self.data.get(key.index()), Some(Entry::Full(_)))
    }

    pub fn insert(&mut self, value: V) -> K {
        let index = self.free;

        if index == self.data.len() {
            self.data.push(Entry::Full(value));
            self.free += 1;
        } else {
            let Entry::Free(next) = self.data[index] else {
                unreachable!("free list points at an occupied entry")
            };
            self.free = next;
            self.data[index] = Entry::Full(value);
        }

        self.len += 1;

        K::new(index)
    }

    pub fn remove(&mut self, key: K) -> Option<V> {
        let index = key.index();
        let entry = self.data.get_mut(index)?;

        let entry_data = std::mem::replace(entry, Entry::Free(self.free));

        match entry_data {
            Entry::Free(_) => {
                *entry = entry_data;
                None
            }
            Entry::Full(value) => {
                self.free = index;
                self.len -= 1;
                Some(value)
            }
        }
    }

    pub fn get(&self, key: K) -> Option<&V> {
        match self.data.get(key.index()) {
            Some(Entry::Full(value)) => Some(value),
            _ => None,
        }
    }

    pub fn get_mut(&mut self, key: K) -> Option<&mut V> {
        match self.data.get_mut(key.index()) {
            Some(Entry::Full(value)) => Some(value),
            _ => None,
        }
    }

    /// Iterates over the live entries in index order.
    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter {
            entries: self.data.iter().enumerate(),
            len: self.len,
            phantom: PhantomData,
        }
    }
}

impl<K, V> Index<K> for Arena<K, V>
where
    K: EntityIndex,
{
    type Output = V;

    fn index(&self, key: K) -> &Self::Output {
        self.get(key).expect("invalid key")
    }
}

impl<K, V> IndexMut<K> for Arena<K, V>
where
    K: EntityIndex,
{
    fn index_mut(&mut self, key: K) -> &mut Self::Output {
        self.get_mut(key).expect("invalid key")
    }
}

impl<K, V> Default for Arena<K, V>
where
    K: EntityIndex,
{
    fn default() -> Self {
        Self::new()
    }
}

/// Iterator created by [`Arena::iter`].
#[derive(Clone)]
pub struct Iter<'a, K, V> {
    entries: std::iter::Enumerate<std::slice::Iter<'a, Entry<V>>>,
    len: usize,
    phantom: PhantomData<K>,
}

impl<'a, K, V> Iterator for Iter<'a, K, V>
where
    K: EntityIndex,
{
    type Item = (K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        for (index, entry) in self.entries.by_ref() {
            if let Entry::Full(value) = entry {
                self.len -= 1;
                return Some((K::new(index), value));
            }
        }

        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.len, Some(self.len))
    }
}

impl<'a, K, V> ExactSizeIterator for Iter<'a, K, V>
where
    K: EntityIndex,
{
    fn len(&self) -> usize {
        self.len
    }
}

impl<'a, K, V> FusedIterator for Iter<'a, K, V> where K: EntityIndex {}

impl<'a, K, V> IntoIterator for &'a Arena<K, V>
where
    K: EntityIndex,
{
    type Item = (K, &'a V);
    type IntoIter = Iter<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
