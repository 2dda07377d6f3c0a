//! Bounded FIFO of recent iterates, stored as a ring of preallocated slots.

use crate::core::traits::Scalar;

/// The `capacity` most recent vectors, oldest first.
///
/// Slots are allocated once; pushing into a full buffer overwrites the oldest
/// slot in place and advances `head`, so the logical position `i` lives in
/// slot `(head + i) % capacity`.
#[derive(Debug, Clone)]
pub struct History<T> {
    slots: Vec<Vec<T>>,
    head: usize,
    len: usize,
    ndof: usize,
}

impl<T: Scalar> History<T> {
    /// Empty buffer for `capacity` vectors of length `ndof`.
    ///
    /// # Panics
    /// Panics if `capacity` is zero.
    pub fn new(capacity: usize, ndof: usize) -> Self {
        assert!(capacity >= 1, "History: capacity must be at least one");
        History {
            slots: (0..capacity).map(|_| vec![T::zero(); ndof]).collect(),
            head: 0,
            len: 0,
            ndof,
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn is_full(&self) -> bool {
        self.len == self.capacity()
    }

    /// Length of every stored vector.
    pub fn ndof(&self) -> usize {
        self.ndof
    }

    /// Append `v`, evicting the oldest vector when full.
    ///
    /// # Panics
    /// Panics if `v.len() != self.ndof()`.
    pub fn push(&mut self, v: &[T]) {
        assert_eq!(v.len(), self.ndof, "History: pushed vector has incorrect length");
        let cap = self.capacity();
        if self.len < cap {
            let slot = (self.head + self.len) % cap;
            self.slots[slot].copy_from_slice(v);
            self.len += 1;
        } else {
            self.slots[self.head].copy_from_slice(v);
            self.head = (self.head + 1) % cap;
        }
    }

    /// Vector at logical position `i` (0 = oldest), if stored.
    pub fn get(&self, i: usize) -> Option<&[T]> {
        if i < self.len {
            Some(&self.slots[(self.head + i) % self.capacity()])
        } else {
            None
        }
    }

    /// Stored vectors, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &[T]> + '_ {
        (0..self.len).map(move |i| self.slots[(self.head + i) % self.capacity()].as_slice())
    }

    pub fn clear(&mut self) {
        self.head = 0;
        self.len = 0;
    }
}

impl<T: Scalar> std::ops::Index<usize> for History<T> {
    type Output = [T];

    fn index(&self, i: usize) -> &[T] {
        self.get(i).unwrap_or_else(|| panic!("History: index {} out of range (len {})", i, self.len))
    }
}
