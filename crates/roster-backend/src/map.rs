//! Map backend: items keyed directly, order kept as a parallel key sequence.

use std::collections::{HashMap, HashSet};
use std::fmt;

use roster_types::{KeyOf, Keyed};

use crate::error::{check_index, check_insert, check_range, ListError, ListResult};
use crate::traits::{count_new_keys, keyed_prefix_assignable, Backend, Inserted, KeyedBackend};

/// Items stored in a `HashMap` by key, with a `Vec` of keys giving order.
///
/// Reading by position goes through the order sequence; reading by key is a
/// single map lookup. Finding the *position* of a key scans the order
/// sequence.
pub struct MapBackend<T: Keyed> {
    order: Vec<KeyOf<T>>,
    items: HashMap<KeyOf<T>, T>,
}

impl<T: Keyed> MapBackend<T> {
    /// Create an empty backend.
    pub fn new() -> Self {
        Self {
            order: Vec::new(),
            items: HashMap::new(),
        }
    }

    /// Create an empty backend with room for `capacity` items.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            order: Vec::with_capacity(capacity),
            items: HashMap::with_capacity(capacity),
        }
    }

    /// The keys in position order.
    pub fn keys(&self) -> &[KeyOf<T>] {
        &self.order
    }

    fn out_of_sync(key: &KeyOf<T>) -> ListError {
        ListError::ContractViolation {
            reason: format!("ordered key {key:?} has no stored item"),
        }
    }
}

impl<T: Keyed> Default for MapBackend<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Keyed> fmt::Debug for MapBackend<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MapBackend")
            .field("order", &self.order)
            .field("stored", &self.items.len())
            .finish()
    }
}

impl<T: Keyed> Backend for MapBackend<T> {
    type Item = T;
    type Ref<'a>
        = &'a T
    where
        Self: 'a;

    fn len(&self) -> usize {
        self.order.len()
    }

    fn get(&self, index: usize) -> ListResult<&T> {
        check_index(index, self.order.len())?;
        let key = &self.order[index];
        self.items.get(key).ok_or_else(|| Self::out_of_sync(key))
    }

    fn set(&mut self, index: usize, value: T) -> ListResult<()> {
        check_index(index, self.order.len())?;
        let key = value.key();
        if key != self.order[index] {
            if self.items.contains_key(&key) {
                return Err(ListError::ContractViolation {
                    reason: format!("key {key:?} is already held by another position"),
                });
            }
            let old = std::mem::replace(&mut self.order[index], key.clone());
            self.items.remove(&old);
        }
        self.items.insert(key, value);
        Ok(())
    }

    fn insert_len(&self, items: &[T]) -> usize {
        count_new_keys(items, |key| self.items.contains_key(key))
    }

    fn insert_at(&mut self, index: usize, items: Vec<T>) -> ListResult<Inserted> {
        check_insert(index, self.order.len())?;
        let mut run: Vec<KeyOf<T>> = Vec::with_capacity(items.len());
        let mut fresh: HashSet<KeyOf<T>> = HashSet::new();
        let mut merged_keys: HashSet<KeyOf<T>> = HashSet::new();
        for item in items {
            let key = item.key();
            if !fresh.contains(&key) {
                if self.items.contains_key(&key) {
                    merged_keys.insert(key.clone());
                } else {
                    fresh.insert(key.clone());
                    run.push(key.clone());
                }
            }
            self.items.insert(key, item);
        }
        let count = run.len();
        let tail = self.order.split_off(index);
        self.order.extend(run);
        self.order.extend(tail);

        let merged = if merged_keys.is_empty() {
            Vec::new()
        } else {
            self.order
                .iter()
                .enumerate()
                .filter(|(_, key)| merged_keys.contains(*key))
                .map(|(pos, _)| pos)
                .collect()
        };
        Ok(Inserted { count, merged })
    }

    fn erase_range(&mut self, start: usize, end: usize) -> ListResult<()> {
        check_range(start, end, self.order.len())?;
        for key in self.order.drain(start..end) {
            self.items.remove(&key);
        }
        Ok(())
    }

    fn reset(&mut self) -> ListResult<()> {
        self.order.clear();
        self.items.clear();
        Ok(())
    }

    fn prefix_assignable(&self, items: &[T]) -> bool {
        let positions: HashMap<&KeyOf<T>, usize> = self
            .order
            .iter()
            .enumerate()
            .map(|(pos, key)| (key, pos))
            .collect();
        keyed_prefix_assignable(items, self.order.len(), |key| positions.get(key).copied())
    }

    fn capacity(&self) -> usize {
        self.order.capacity()
    }

    fn reserve(&mut self, additional: usize) {
        self.order.reserve(additional);
        self.items.reserve(additional);
    }
}

impl<T: Keyed> KeyedBackend for MapBackend<T> {
    fn position_of(&self, key: &KeyOf<T>) -> Option<usize> {
        if !self.items.contains_key(key) {
            return None;
        }
        self.order.iter().position(|candidate| candidate == key)
    }

    fn key_at(&self, index: usize) -> ListResult<KeyOf<T>> {
        check_index(index, self.order.len())?;
        Ok(self.order[index].clone())
    }

    fn contains_key(&self, key: &KeyOf<T>) -> bool {
        self.items.contains_key(key)
    }

    fn value_of(&self, key: &KeyOf<T>) -> ListResult<Option<&T>> {
        Ok(self.items.get(key))
    }
}
