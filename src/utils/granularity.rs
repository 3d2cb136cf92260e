/*
 * SPDX-FileCopyrightText: 2026 The rankprop authors
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

/// Size of the batches of nodes handed to a worker, specified by nodes or
/// by arcs.
///
/// A [`WorkerPool`](crate::pool::WorkerPool) partitions the dense
/// identifiers [0 . . *n*) into contiguous batches. The natural way to size
/// a batch is by number of nodes, but since the cost of computing the rank
/// of a node is proportional to its number of predecessors, it is sometimes
/// more convenient to specify a tentative number of arcs per batch, which is
/// converted to a number of nodes using the average degree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Granularity {
    /// Each batch contains the specified number of nodes (the last one
    /// possibly fewer).
    Nodes(usize),
    /// Each batch contains a number of nodes whose expected number of arcs
    /// is the specified one.
    Arcs(u64),
}

impl core::default::Default for Granularity {
    /// Returns a default granularity of 1000 nodes.
    fn default() -> Self {
        Self::Nodes(1000)
    }
}

impl Granularity {
    /// Returns the number of nodes in a batch for a graph with the given
    /// number of nodes and arcs.
    ///
    /// The result is always at least one.
    pub fn batch_size(&self, num_nodes: usize, num_arcs: u64) -> usize {
        match *self {
            Self::Nodes(n) => n.max(1),
            Self::Arcs(a) => {
                if num_arcs == 0 {
                    return num_nodes.max(1);
                }
                let average_degree = num_arcs as f64 / num_nodes.max(1) as f64;
                (a as f64 / average_degree)
                    .ceil()
                    .clamp(1.0, usize::MAX as f64) as usize
            }
        }
    }
}
