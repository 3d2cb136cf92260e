/*
 * SPDX-FileCopyrightText: 2026 The rankprop authors
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! Double-buffered rank storage.

/// Two rank vectors of the same length, indexed by dense identifier.
///
/// During an iteration the _current_ vector is only read and the _next_
/// vector is only written; [`buffers`](Self::buffers) hands out both at the
/// same time, so the borrow checker guarantees that no one can swap them
/// while writers are active. [`swap`](Self::swap) then makes the next vector
/// current.
///
/// # Examples
///
/// ```
/// use rankprop::store::RankStore;
///
/// let mut store = RankStore::new(3, 1.0);
/// assert_eq!(store.current(), &[1.0, 1.0, 1.0]);
///
/// let (current, next) = store.buffers();
/// for (n, c) in next.iter_mut().zip(current) {
///     *n = c / 2.0;
/// }
/// store.swap();
/// assert_eq!(store.read(1), 0.5);
/// ```
#[derive(Debug, Clone)]
pub struct RankStore {
    current: Box<[f64]>,
    next: Box<[f64]>,
}

impl RankStore {
    /// Creates a store with `n` entries, all set to `initial` in the current
    /// vector.
    pub fn new(n: usize, initial: f64) -> Self {
        Self {
            current: vec![initial; n].into_boxed_slice(),
            next: vec![0.0; n].into_boxed_slice(),
        }
    }

    /// Returns the number of entries.
    #[inline]
    pub fn len(&self) -> usize {
        self.current.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.current.is_empty()
    }

    /// Returns the current value of `node`.
    #[inline]
    pub fn read(&self, node: usize) -> f64 {
        self.current[node]
    }

    /// Writes the next value of `node`.
    #[inline]
    pub fn write(&mut self, node: usize, value: f64) {
        self.next[node] = value;
    }

    /// Returns the current vector.
    pub fn current(&self) -> &[f64] {
        &self.current
    }

    /// Returns the current vector for reading and the next vector for
    /// writing.
    pub fn buffers(&mut self) -> (&[f64], &mut [f64]) {
        (&self.current, &mut self.next)
    }

    /// Exchanges the current and the next vector.
    pub fn swap(&mut self) {
        std::mem::swap(&mut self.current, &mut self.next);
    }

    /// Sets every entry of the current vector to `initial`.
    pub fn reset(&mut self, initial: f64) {
        self.current.fill(initial);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_swap() {
        let mut store = RankStore::new(4, 1.0);
        assert_eq!(store.len(), 4);
        for i in 0..4 {
            store.write(i, i as f64);
        }
        // Writes are not visible before the swap
        assert_eq!(store.current(), &[1.0; 4]);
        store.swap();
        assert_eq!(store.current(), &[0.0, 1.0, 2.0, 3.0]);
        store.reset(0.25);
        assert_eq!(store.current(), &[0.25; 4]);
    }

    #[test]
    fn test_empty() {
        let mut store = RankStore::new(0, 1.0);
        assert!(store.is_empty());
        store.swap();
        assert!(store.current().is_empty());
    }
}
