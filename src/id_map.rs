/*
 * SPDX-FileCopyrightText: 2026 The rankprop authors
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! Mapping between external node identifiers and dense indices.
//!
//! Rank vectors are indexed by _dense_ identifiers in [0 . . *n*). An
//! [`IdMap`] assigns them in order of first sight, and keeps the reverse
//! mapping so that results can be looked up by external identifier.

use std::collections::HashMap;
use std::hash::Hash;

/// A bidirectional map between external identifiers and dense identifiers.
///
/// Dense identifiers are assigned in insertion order, so the same sequence
/// of insertions always yields the same assignment.
///
/// # Examples
///
/// ```
/// use rankprop::id_map::IdMap;
///
/// let mut ids = IdMap::new();
/// assert_eq!(ids.insert(100_u64), 0);
/// assert_eq!(ids.insert(7), 1);
/// assert_eq!(ids.insert(100), 0);
///
/// assert_eq!(ids.dense(&7), Some(1));
/// assert_eq!(ids.external(0), Some(&100));
/// assert_eq!(ids.external(2), None);
/// ```
#[derive(Debug, Clone)]
pub struct IdMap<N> {
    to_external: Vec<N>,
    to_dense: HashMap<N, usize>,
}

impl<N: Copy + Eq + Hash> core::default::Default for IdMap<N> {
    fn default() -> Self {
        Self {
            to_external: Vec::new(),
            to_dense: HashMap::new(),
        }
    }
}

impl<N: Copy + Eq + Hash> IdMap<N> {
    /// Creates an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty map with room for `capacity` identifiers.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            to_external: Vec::with_capacity(capacity),
            to_dense: HashMap::with_capacity(capacity),
        }
    }

    /// Returns the dense identifier of `external`, assigning the next unused
    /// one if `external` has never been seen.
    pub fn insert(&mut self, external: N) -> usize {
        if let Some(&dense) = self.to_dense.get(&external) {
            return dense;
        }
        let dense = self.to_external.len();
        self.to_external.push(external);
        self.to_dense.insert(external, dense);
        dense
    }

    /// Returns the dense identifier of `external`, if registered.
    #[inline]
    pub fn dense(&self, external: &N) -> Option<usize> {
        self.to_dense.get(external).copied()
    }

    /// Returns the external identifier of `dense`, if in range.
    #[inline]
    pub fn external(&self, dense: usize) -> Option<&N> {
        self.to_external.get(dense)
    }

    /// Returns the number of registered identifiers.
    #[inline]
    pub fn len(&self) -> usize {
        self.to_external.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.to_external.is_empty()
    }

    /// Iterates over external identifiers in dense order.
    pub fn iter(&self) -> impl ExactSizeIterator<Item = &N> + '_ {
        self.to_external.iter()
    }
}

impl<N: Copy + Eq + Hash> FromIterator<N> for IdMap<N> {
    fn from_iter<I: IntoIterator<Item = N>>(iter: I) -> Self {
        let iter = iter.into_iter();
        let mut ids = Self::with_capacity(iter.size_hint().0);
        for external in iter {
            ids.insert(external);
        }
        ids
    }
}
