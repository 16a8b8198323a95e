/// Append-only buffer with a hard capacity fixed at construction.
///
/// Performance characteristics:
/// - storage is allocated once in `with_capacity`; `push` and `rewind` never reallocate
/// - `push` is O(1) and writes nothing when full
#[derive(Debug)]
pub(crate) struct FixedBuf<T> {
    items: Vec<T>,
    capacity: usize,
}

impl<T> FixedBuf<T> {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            items: Vec::with_capacity(capacity),
            capacity,
        }
    }

    /// Appends `item` and returns its index, or `None` if the buffer is full.
    #[inline]
    pub(crate) fn push(&mut self, item: T) -> Option<usize> {
        if self.items.len() >= self.capacity {
            return None;
        }
        self.items.push(item);
        Some(self.items.len() - 1)
    }

    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.items.len()
    }

    #[inline]
    pub(crate) fn capacity(&self) -> usize {
        self.capacity
    }

    #[inline]
    pub(crate) fn as_slice(&self) -> &[T] {
        &self.items
    }

    #[inline]
    pub(crate) fn get(&self, index: usize) -> Option<&T> {
        self.items.get(index)
    }

    /// Drops all items. Keeps allocated storage for the next frame.
    #[inline]
    pub(crate) fn rewind(&mut self) {
        self.items.clear();
    }
}
