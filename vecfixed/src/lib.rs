use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

/// `VecFixed` is a vector that never grows past `N` elements. Every time a new element
/// is pushed into a full vector, the oldest element is dropped and the new one is
/// appended at the end.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VecFixed<const N: usize, T> {
    buffer: VecDeque<T>,
}

impl<const N: usize, T> Default for VecFixed<N, T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize, T> VecFixed<N, T> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            buffer: VecDeque::with_capacity(N),
        }
    }

    pub fn push(&mut self, element: T) {
        if N == 0 {
            return;
        }

        if self.buffer.len() == N {
            self.buffer.pop_front();
        }

        self.buffer.push_back(element);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    #[must_use]
    pub const fn capacity(&self) -> usize {
        N
    }

    /// The most recently pushed element.
    #[must_use]
    pub fn last(&self) -> Option<&T> {
        self.buffer.back()
    }

    /// Iterates from the oldest to the newest element.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &T> + ExactSizeIterator {
        self.buffer.iter()
    }

    pub fn clear(&mut self) {
        self.buffer.clear();
    }
}

impl<const N: usize, T: ToString> VecFixed<N, T> {
    /// Join the elements of the buffer into a string, oldest first.
    pub fn join(&self, separator: &str) -> String {
        self.buffer
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(separator)
    }
}
