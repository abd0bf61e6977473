//! Plain vector backend: positional storage with no identity index.

use roster_types::{KeyOf, Keyed};

use crate::error::{check_index, check_insert, check_range, ListResult};
use crate::traits::{Backend, Inserted, KeyedBackend};

/// A `Vec`-backed list store.
///
/// Items have no identity here: inserting an item whose key already exists
/// simply stores it twice. Key lookups (available when `T: Keyed`) scan the
/// whole vector, so reconciling large lists against this backend costs
/// O(n * m).
#[derive(Clone, Debug, PartialEq)]
pub struct VecBackend<T> {
    items: Vec<T>,
}

impl<T> VecBackend<T> {
    /// Create an empty backend.
    pub fn new() -> Self {
        Self { items: Vec::new() }
    }

    /// Create an empty backend with room for `capacity` items.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            items: Vec::with_capacity(capacity),
        }
    }

    /// The items as a slice.
    pub fn as_slice(&self) -> &[T] {
        &self.items
    }

    /// Mutable access to the item at `index`.
    pub fn get_mut(&mut self, index: usize) -> ListResult<&mut T> {
        check_index(index, self.items.len())?;
        Ok(&mut self.items[index])
    }
}

impl<T: PartialEq> VecBackend<T> {
    /// Position of the first item equal to `item`.
    pub fn find(&self, item: &T) -> Option<usize> {
        self.items.iter().position(|candidate| candidate == item)
    }
}

impl<T> Default for VecBackend<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Backend for VecBackend<T> {
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
        *self.get_mut(index)? = value;
        Ok(())
    }

    fn insert_len(&self, items: &[T]) -> usize {
        items.len()
    }

    fn insert_at(&mut self, index: usize, items: Vec<T>) -> ListResult<Inserted> {
        check_insert(index, self.items.len())?;
        let count = items.len();
        let tail = self.items.split_off(index);
        self.items.extend(items);
        self.items.extend(tail);
        Ok(Inserted::fresh(count))
    }

    fn erase_range(&mut self, start: usize, end: usize) -> ListResult<()> {
        check_range(start, end, self.items.len())?;
        self.items.drain(start..end);
        Ok(())
    }

    fn reset(&mut self) -> ListResult<()> {
        self.items.clear();
        Ok(())
    }

    fn capacity(&self) -> usize {
        self.items.capacity()
    }

    fn reserve(&mut self, additional: usize) {
        self.items.reserve(additional);
    }
}

impl<T: Keyed> KeyedBackend for VecBackend<T> {
    fn position_of(&self, key: &KeyOf<T>) -> Option<usize> {
        self.items.iter().position(|item| item.key() == *key)
    }

    fn key_at(&self, index: usize) -> ListResult<KeyOf<T>> {
        Ok(self.get(index)?.key())
    }
}
