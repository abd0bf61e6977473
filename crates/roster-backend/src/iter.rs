use crate::error::ListResult;
use crate::traits::Backend;

/// Position-order traversal over a backend.
///
/// Borrowing the backend keeps it immutable for the iterator's lifetime.
/// Cloning an `Iter` restarts nothing; call [`Backend::iter`] again for a
/// fresh pass.
pub struct Iter<'a, B: Backend> {
    backend: &'a B,
    front: usize,
    back: usize,
}

impl<'a, B: Backend> Iter<'a, B> {
    pub(crate) fn new(backend: &'a B) -> Self {
        Self {
            backend,
            front: 0,
            back: backend.len(),
        }
    }
}

impl<B: Backend> Clone for Iter<'_, B> {
    fn clone(&self) -> Self {
        Self {
            backend: self.backend,
            front: self.front,
            back: self.back,
        }
    }
}

impl<'a, B: Backend> Iterator for Iter<'a, B> {
    type Item = ListResult<B::Ref<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.front >= self.back {
            return None;
        }
        let item = self.backend.get(self.front);
        self.front += 1;
        Some(item)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.back - self.front;
        (remaining, Some(remaining))
    }
}

impl<B: Backend> DoubleEndedIterator for Iter<'_, B> {
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.front >= self.back {
            return None;
        }
        self.back -= 1;
        Some(self.backend.get(self.back))
    }
}

impl<B: Backend> ExactSizeIterator for Iter<'_, B> {}
