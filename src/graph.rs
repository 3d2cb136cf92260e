/*
 * SPDX-FileCopyrightText: 2026 The rankprop authors
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! Property graphs as seen by the ranking engine.
//!
//! The engine does not own the graph it ranks: a host database exposes its
//! nodes and relationships through the [`PropertyGraph`] trait, and the
//! [adjacency builder](crate::adjacency::AdjacencyBuilder) reads it once.
//! [`MemGraph`] is a simple in-memory implementation, useful for tests and
//! for the command-line tool.

use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;

/// The numeric properties attached to a relationship.
pub type Properties = HashMap<String, f64>;

/// A relationship leaving a node, as returned by
/// [`PropertyGraph::relationships`].
#[derive(Debug, Clone, Copy)]
pub struct Relationship<'a, N> {
    /// The node the relationship points to.
    pub target: N,
    /// The relationship type (e.g., `SIMILAR`).
    pub rel_type: &'a str,
    /// The numeric properties of the relationship.
    pub properties: &'a Properties,
}

impl<N> Relationship<'_, N> {
    /// Returns the value of a property, if present.
    pub fn property(&self, name: &str) -> Option<f64> {
        self.properties.get(name).copied()
    }
}

/// A graph whose nodes are identified by opaque external identifiers and
/// whose relationships carry typed, numeric properties.
///
/// Both enumerations must be deterministic: the order in which nodes and
/// relationships are returned decides the dense identifiers and thus the
/// floating-point accumulation order of the ranking.
pub trait PropertyGraph {
    /// The external node identifier.
    type NodeId: Copy + Eq + Hash + Debug + Send + Sync;

    /// Returns the number of nodes, if known in advance.
    fn num_nodes_hint(&self) -> Option<usize> {
        None
    }

    /// Enumerates all nodes.
    ///
    /// Each node should be returned once; repetitions are ignored with a
    /// warning by [`AdjacencyBuilder`](crate::adjacency::AdjacencyBuilder).
    fn nodes(&self) -> impl Iterator<Item = Self::NodeId> + '_;

    /// Enumerates the outgoing relationships of `node`.
    fn relationships(
        &self,
        node: Self::NodeId,
    ) -> impl Iterator<Item = Relationship<'_, Self::NodeId>> + '_;
}

#[derive(Debug, Clone)]
struct StoredRelationship<N> {
    target: N,
    rel_type: String,
    properties: Properties,
}

/// An in-memory [`PropertyGraph`].
///
/// Nodes are enumerated in insertion order, and the relationships of a node
/// in the order they were added. Adding a relationship implicitly adds its
/// endpoints (source first).
///
/// # Examples
///
/// ```
/// use rankprop::graph::{MemGraph, PropertyGraph};
///
/// let mut g = MemGraph::new();
/// g.add_node("a");
/// g.add_relationship("a", "b", "LINK", [("weight", 2.0)]);
///
/// assert_eq!(g.nodes().collect::<Vec<_>>(), ["a", "b"]);
/// let rel = g.relationships("a").next().unwrap();
/// assert_eq!(rel.target, "b");
/// assert_eq!(rel.property("weight"), Some(2.0));
/// ```
#[derive(Debug, Clone)]
pub struct MemGraph<N> {
    nodes: Vec<N>,
    index: HashMap<N, usize>,
    relationships: Vec<Vec<StoredRelationship<N>>>,
    num_relationships: usize,
}

impl<N: Copy + Eq + Hash> core::default::Default for MemGraph<N> {
    fn default() -> Self {
        Self {
            nodes: Vec::new(),
            index: HashMap::new(),
            relationships: Vec::new(),
            num_relationships: 0,
        }
    }
}

impl<N: Copy + Eq + Hash> MemGraph<N> {
    /// Creates an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a node, returning `false` if it was already present.
    pub fn add_node(&mut self, node: N) -> bool {
        self.slot(node).1
    }

    /// Adds a relationship from `source` to `target`.
    ///
    /// Parallel relationships are kept: each one will contribute
    /// independently to the ranking.
    pub fn add_relationship<K: Into<String>>(
        &mut self,
        source: N,
        target: N,
        rel_type: impl Into<String>,
        properties: impl IntoIterator<Item = (K, f64)>,
    ) {
        let (src, _) = self.slot(source);
        self.slot(target);
        self.relationships[src].push(StoredRelationship {
            target,
            rel_type: rel_type.into(),
            properties: properties
                .into_iter()
                .map(|(k, v)| (k.into(), v))
                .collect(),
        });
        self.num_relationships += 1;
    }

    /// Returns the number of nodes.
    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    /// Returns the number of relationships.
    pub fn num_relationships(&self) -> usize {
        self.num_relationships
    }

    fn slot(&mut self, node: N) -> (usize, bool) {
        if let Some(&slot) = self.index.get(&node) {
            return (slot, false);
        }
        let slot = self.nodes.len();
        self.nodes.push(node);
        self.relationships.push(Vec::new());
        self.index.insert(node, slot);
        (slot, true)
    }
}

impl<N: Copy + Eq + Hash + Debug + Send + Sync> PropertyGraph for MemGraph<N> {
    type NodeId = N;

    fn num_nodes_hint(&self) -> Option<usize> {
        Some(self.nodes.len())
    }

    fn nodes(&self) -> impl Iterator<Item = N> + '_ {
        self.nodes.iter().copied()
    }

    fn relationships(&self, node: N) -> impl Iterator<Item = Relationship<'_, N>> + '_ {
        let rels: &[StoredRelationship<N>] = match self.index.get(&node) {
            Some(&slot) => &self.relationships[slot],
            None => &[],
        };
        rels.iter().map(|r| Relationship {
            target: r.target,
            rel_type: &r.rel_type,
            properties: &r.properties,
        })
    }
}
