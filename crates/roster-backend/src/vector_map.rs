//! Vector backend with a key-to-position index.

use std::collections::HashMap;
use std::fmt;

use roster_types::{KeyOf, Keyed};

use crate::error::{check_index, check_insert, check_range, ListError, ListResult};
use crate::traits::{count_new_keys, keyed_prefix_assignable, Backend, Inserted, KeyedBackend};

/// A `Vec` of items plus a `HashMap` from key to position.
///
/// Positional reads are direct; key lookups are O(1). Inserting an item
/// whose key is already present overwrites the existing entry instead of
/// adding a second one. Every insert or erase rewrites the index entries of
/// the shifted positions before returning.
pub struct VecMapBackend<T: Keyed> {
    items: Vec<T>,
    index: HashMap<KeyOf<T>, usize>,
}

impl<T: Keyed> VecMapBackend<T> {
    /// Create an empty backend.
    pub fn new() -> Self {
        Self {
            items: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Create an empty backend with room for `capacity` items.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            items: Vec::with_capacity(capacity),
            index: HashMap::with_capacity(capacity),
        }
    }

    /// The items as a slice.
    pub fn as_slice(&self) -> &[T] {
        &self.items
    }

    /// Iterate over `(key, position)` pairs of the index, in no particular
    /// order.
    pub fn index_entries(&self) -> impl Iterator<Item = (&KeyOf<T>, usize)> + '_ {
        self.index.iter().map(|(key, pos)| (key, *pos))
    }

    fn reindex_from(&mut self, start: usize) {
        for (pos, item) in self.items.iter().enumerate().skip(start) {
            self.index.insert(item.key(), pos);
        }
    }
}

impl<T: Keyed> Default for VecMapBackend<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Keyed + fmt::Debug> fmt::Debug for VecMapBackend<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VecMapBackend")
            .field("items", &self.items)
            .field("indexed", &self.index.len())
            .finish()
    }
}

impl<T: Keyed> Backend for VecMapBackend<T> {
    type Item = T;
    type Ref<'a>
        = &'a T
    where
        Self: 'a;

    fn len(&self) -> usize {
        self.items.len()
    }

    fn get(&self, index: usize) -> ListResult<&T> {
        check_index(index, self.items.len())?;
        Ok(&self.items[index])
    }

    fn set(&mut self, index: usize, value: T) -> ListResult<()> {
        check_index(index, self.items.len())?;
        let key = value.key();
        let old = self.items[index].key();
        if key != old {
            if self.index.contains_key(&key) {
                return Err(ListError::ContractViolation {
                    reason: format!("key {key:?} is already held by another position"),
                });
            }
            self.index.remove(&old);
            self.index.insert(key, index);
        }
        self.items[index] = value;
        Ok(())
    }

    fn insert_len(&self, items: &[T]) -> usize {
        count_new_keys(items, |key| self.index.contains_key(key))
    }

    fn insert_at(&mut self, index: usize, items: Vec<T>) -> ListResult<Inserted> {
        check_insert(index, self.items.len())?;
        let mut run: Vec<T> = Vec::with_capacity(items.len());
        let mut run_pos: HashMap<KeyOf<T>, usize> = HashMap::new();
        let mut merged = Vec::new();
        for item in items {
            let key = item.key();
            if let Some(&pos) = self.index.get(&key) {
                self.items[pos] = item;
                merged.push(pos);
            } else if let Some(&pos) = run_pos.get(&key) {
                run[pos] = item;
            } else {
                run_pos.insert(key, run.len());
                run.push(item);
            }
        }
        let count = run.len();
        let tail = self.items.split_off(index);
        self.items.extend(run);
        self.items.extend(tail);
        self.reindex_from(index);
        Ok(Inserted::with_merged(count, merged, index))
    }

    fn erase_range(&mut self, start: usize, end: usize) -> ListResult<()> {
        check_range(start, end, self.items.len())?;
        for item in &self.items[start..end] {
            self.index.remove(&item.key());
        }
        self.items.drain(start..end);
        self.reindex_from(start);
        Ok(())
    }

    fn reset(&mut self) -> ListResult<()> {
        self.items.clear();
        self.index.clear();
        Ok(())
    }

    fn prefix_assignable(&self, items: &[T]) -> bool {
        keyed_prefix_assignable(items, self.items.len(), |key| self.index.get(key).copied())
    }

    fn capacity(&self) -> usize {
        self.items.capacity()
    }

    fn reserve(&mut self, additional: usize) {
        self.items.reserve(additional);
        self.index.reserve(additional);
    }
}

impl<T: Keyed> KeyedBackend for VecMapBackend<T> {
    fn position_of(&self, key: &KeyOf<T>) -> Option<usize> {
        self.index.get(key).copied()
    }

    fn key_at(&self, index: usize) -> ListResult<KeyOf<T>> {
        Ok(self.get(index)?.key())
    }
}
