/*
 * SPDX-FileCopyrightText: 2026 The rankprop authors
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! Weighted adjacency extraction.
//!
//! An [`AdjacencyBuilder`] reads a [`PropertyGraph`] once and produces a
//! [`Projection`]: an [`IdMap`] assigning dense identifiers to nodes, and an
//! [`Adjacency`] storing, in compressed sparse-row form, both the weighted
//! successors and the weighted predecessors of every node, together with the
//! sum of the outgoing weights of each node.
//!
//! Rank propagation _pulls_ rank from predecessors, so predecessor lists are
//! what the iteration reads; successor lists are kept for inspection and for
//! sequential reference computations.

use crate::graph::PropertyGraph;
use crate::id_map::IdMap;
use dsi_progress_logger::{no_logging, ProgressLog};
use thiserror::Error;

/// Errors raised while extracting the weighted adjacency of a graph.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BuildError {
    /// A relationship lacks the weight property and no default weight was
    /// configured.
    #[error("Relationship {from} -> {to} has no weight property {property:?} and no default weight is set")]
    MissingWeight {
        from: String,
        to: String,
        property: String,
    },
    /// A relationship has a weight that is not finite and positive.
    #[error("Relationship {from} -> {to} has weight {weight}, but weights must be finite and positive")]
    InvalidWeight { from: String, to: String, weight: f64 },
}

/// Returns true if `weight` can be used as a relationship weight.
#[inline]
pub(crate) fn is_valid_weight(weight: f64) -> bool {
    weight.is_finite() && weight > 0.0
}

/// The weighted adjacency of a graph on dense identifiers.
///
/// Arcs are stored twice, by source and by target. Predecessor lists are
/// ordered by source, and arcs with the same source and target (parallel
/// arcs) keep the order in which they were provided, so that iterating over
/// them always accumulates floating-point values in the same order.
#[derive(Debug, Clone, PartialEq)]
pub struct Adjacency {
    succ_offsets: Box<[usize]>,
    succ: Box<[(usize, f64)]>,
    pred_offsets: Box<[usize]>,
    pred: Box<[(usize, f64)]>,
    out_weights: Box<[f64]>,
    num_dangling: usize,
}

impl Adjacency {
    /// Creates an adjacency from a list of `(source, target, weight)` arcs.
    ///
    /// # Panics
    ///
    /// Panics if an endpoint is not smaller than `num_nodes` or if a weight
    /// is not finite and positive.
    pub fn from_arcs(num_nodes: usize, arcs: impl IntoIterator<Item = (usize, usize, f64)>) -> Self {
        let arcs = arcs.into_iter().collect::<Vec<_>>();
        let mut out_weights = vec![0.0; num_nodes];
        for &(src, dst, w) in &arcs {
            assert!(
                src < num_nodes && dst < num_nodes,
                "Arc ({src}, {dst}) out of range for {num_nodes} nodes"
            );
            assert!(is_valid_weight(w), "Invalid weight {w} for arc ({src}, {dst})");
            out_weights[src] += w;
        }

        let (succ_offsets, succ) = bucket(num_nodes, &arcs, |&(src, dst, w)| (src, (dst, w)));
        // Bucketing the source-major successor lists orders predecessors by source
        let by_src = (0..num_nodes)
            .flat_map(|src| {
                succ[succ_offsets[src]..succ_offsets[src + 1]]
                    .iter()
                    .map(move |&(dst, w)| (src, dst, w))
            })
            .collect::<Vec<_>>();
        let (pred_offsets, pred) = bucket(num_nodes, &by_src, |&(src, dst, w)| (dst, (src, w)));
        let num_dangling = succ_offsets.windows(2).filter(|w| w[0] == w[1]).count();

        Self {
            succ_offsets,
            succ,
            pred_offsets,
            pred,
            out_weights: out_weights.into_boxed_slice(),
            num_dangling,
        }
    }

    /// Returns the number of nodes.
    #[inline]
    pub fn num_nodes(&self) -> usize {
        self.out_weights.len()
    }

    /// Returns the number of arcs.
    #[inline]
    pub fn num_arcs(&self) -> u64 {
        self.succ.len() as u64
    }

    /// Returns the weighted successors of `node`.
    #[inline]
    pub fn successors(&self, node: usize) -> &[(usize, f64)] {
        &self.succ[self.succ_offsets[node]..self.succ_offsets[node + 1]]
    }

    /// Returns the weighted predecessors of `node`.
    #[inline]
    pub fn predecessors(&self, node: usize) -> &[(usize, f64)] {
        &self.pred[self.pred_offsets[node]..self.pred_offsets[node + 1]]
    }

    #[inline]
    pub fn outdegree(&self, node: usize) -> usize {
        self.succ_offsets[node + 1] - self.succ_offsets[node]
    }

    /// Returns the sum of the weights of the arcs leaving `node`.
    #[inline]
    pub fn out_weight(&self, node: usize) -> f64 {
        self.out_weights[node]
    }

    /// Returns the sums of outgoing weights, indexed by node.
    pub fn out_weights(&self) -> &[f64] {
        &self.out_weights
    }

    /// Returns true if `node` has no outgoing arcs.
    #[inline]
    pub fn is_dangling(&self, node: usize) -> bool {
        self.succ_offsets[node] == self.succ_offsets[node + 1]
    }

    /// Returns the number of dangling nodes.
    pub fn num_dangling(&self) -> usize {
        self.num_dangling
    }
}

/// Stable counting sort of arcs into buckets.
fn bucket<A>(
    num_nodes: usize,
    arcs: &[A],
    key: impl Fn(&A) -> (usize, (usize, f64)),
) -> (Box<[usize]>, Box<[(usize, f64)]>) {
    let mut offsets = vec![0; num_nodes + 1];
    for arc in arcs {
        offsets[key(arc).0 + 1] += 1;
    }
    for i in 0..num_nodes {
        offsets[i + 1] += offsets[i];
    }
    let mut pos = offsets[..num_nodes].to_vec();
    let mut items = vec![(0, 0.0); arcs.len()];
    for arc in arcs {
        let (b, item) = key(arc);
        items[pos[b]] = item;
        pos[b] += 1;
    }
    (offsets.into_boxed_slice(), items.into_boxed_slice())
}

/// A dense view of a property graph: identifiers plus weighted adjacency.
#[derive(Debug, Clone)]
pub struct Projection<N> {
    ids: IdMap<N>,
    adjacency: Adjacency,
}

impl<N> Projection<N> {
    /// Returns the identifier map.
    pub fn ids(&self) -> &IdMap<N> {
        &self.ids
    }

    /// Returns the weighted adjacency.
    pub fn adjacency(&self) -> &Adjacency {
        &self.adjacency
    }

    /// Returns the number of nodes.
    pub fn num_nodes(&self) -> usize {
        self.adjacency.num_nodes()
    }
}

/// Extracts the weighted adjacency of a [`PropertyGraph`].
///
/// Nodes receive dense identifiers in the order returned by
/// [`PropertyGraph::nodes`]; relationship targets that are not enumerated
/// as nodes receive identifiers on first sight.
///
/// # Examples
///
/// ```
/// use rankprop::prelude::*;
///
/// let mut g = MemGraph::new();
/// g.add_relationship('a', 'b', "SIMILAR", [("score", 0.8)]);
/// g.add_relationship('a', 'c', "OTHER", [("score", 0.3)]);
/// g.add_relationship('b', 'a', "SIMILAR", None::<(&str, f64)>);
///
/// // Missing weights are rejected unless a default is given
/// assert!(AdjacencyBuilder::new("score").build(&g).is_err());
///
/// let p = AdjacencyBuilder::new("score")
///     .rel_type(Some("SIMILAR"))
///     .default_weight(Some(1.0))
///     .build(&g)?;
/// assert_eq!(p.num_nodes(), 3);
/// assert_eq!(p.adjacency().num_arcs(), 2);
/// assert_eq!(p.adjacency().out_weight(0), 0.8);
/// assert!(p.adjacency().is_dangling(2));
/// # Ok::<(), BuildError>(())
/// ```
#[derive(Debug, Clone)]
pub struct AdjacencyBuilder {
    weight_property: String,
    rel_type: Option<String>,
    default_weight: Option<f64>,
}

impl AdjacencyBuilder {
    /// Creates a builder reading weights from the given relationship
    /// property.
    pub fn new(weight_property: impl Into<String>) -> Self {
        Self {
            weight_property: weight_property.into(),
            rel_type: None,
            default_weight: None,
        }
    }

    /// Restricts the extraction to relationships of the given type.
    ///
    /// Pass `None` to use all relationships (the default).
    pub fn rel_type(&mut self, rel_type: Option<&str>) -> &mut Self {
        self.rel_type = rel_type.map(str::to_owned);
        self
    }

    /// Sets the weight used for relationships lacking the weight property.
    ///
    /// Pass `None` (the default) to reject such relationships with
    /// [`BuildError::MissingWeight`].
    ///
    /// # Panics
    ///
    /// Panics if the weight is not finite and positive.
    pub fn default_weight(&mut self, default_weight: Option<f64>) -> &mut Self {
        if let Some(w) = default_weight {
            assert!(
                is_valid_weight(w),
                "The default weight must be finite and positive, got {w}"
            );
        }
        self.default_weight = default_weight;
        self
    }

    /// Builds the projection of `graph`.
    pub fn build<G: PropertyGraph>(&self, graph: &G) -> Result<Projection<G::NodeId>, BuildError> {
        self.build_with_logging(graph, no_logging![])
    }

    /// Builds the projection of `graph`, logging progress on nodes.
    pub fn build_with_logging<G: PropertyGraph>(
        &self,
        graph: &G,
        pl: &mut impl ProgressLog,
    ) -> Result<Projection<G::NodeId>, BuildError> {
        let mut ids = IdMap::with_capacity(graph.num_nodes_hint().unwrap_or(0));
        for node in graph.nodes() {
            ids.insert(node);
        }
        let num_listed = ids.len();

        pl.item_name("node");
        pl.expected_updates(Some(num_listed));
        pl.start(format!(
            "Reading relationships (weight property {:?})...",
            self.weight_property
        ));

        let mut arcs = Vec::new();
        let mut seen = vec![false; num_listed];
        for node in graph.nodes() {
            let src = ids.insert(node);
            match seen.get_mut(src) {
                Some(true) => {
                    log::warn!("Node {node:?} listed more than once");
                    continue;
                }
                Some(seen) => *seen = true,
                None => {}
            }
            for rel in graph.relationships(node) {
                if let Some(rel_type) = &self.rel_type {
                    if rel.rel_type != rel_type.as_str() {
                        continue;
                    }
                }
                let weight = match (rel.property(&self.weight_property), self.default_weight) {
                    (Some(w), _) => w,
                    (None, Some(w)) => w,
                    (None, None) => {
                        return Err(BuildError::MissingWeight {
                            from: format!("{node:?}"),
                            to: format!("{:?}", rel.target),
                            property: self.weight_property.clone(),
                        })
                    }
                };
                if !is_valid_weight(weight) {
                    return Err(BuildError::InvalidWeight {
                        from: format!("{node:?}"),
                        to: format!("{:?}", rel.target),
                        weight,
                    });
                }
                arcs.push((src, ids.insert(rel.target), weight));
            }
            pl.light_update();
        }
        pl.done();

        if ids.len() > num_listed {
            log::warn!(
                "{} relationship targets were not listed as nodes",
                ids.len() - num_listed
            );
        }

        let adjacency = Adjacency::from_arcs(ids.len(), arcs);
        log::info!(
            "Projected {} nodes, {} arcs, {} dangling nodes",
            adjacency.num_nodes(),
            adjacency.num_arcs(),
            adjacency.num_dangling()
        );

        Ok(Projection { ids, adjacency })
    }
}
