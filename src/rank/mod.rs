/*
 * SPDX-FileCopyrightText: 2026 The rankprop authors
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! Ranking algorithms.

pub mod pagerank;
pub use pagerank::{preds, Dangling, PageRank, Teleport};

use thiserror::Error;

/// Errors raised by a [`Ranking`].
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RankError {
    /// The requested node is not part of the ranked graph.
    #[error("No such node: {0}")]
    NoSuchNode(String),
    /// Results were requested before a successful computation.
    #[error("Ranks have not been computed, or the last computation failed")]
    NotComputed,
    /// A computation was requested with zero iterations.
    #[error("The number of iterations must be positive")]
    ZeroIterations,
    /// An iteration produced a rank that is not finite.
    #[error("Non-finite rank {value} for node {node}")]
    NonFinite { node: usize, value: f64 },
    /// A worker panicked during an iteration.
    #[error("Worker panicked: {0}")]
    WorkerPanic(String),
}

/// A node-ranking computation.
///
/// Callers that only need to run a fixed number of iterations and read
/// results can hold a `dyn Ranking` and ignore the concrete algorithm.
pub trait Ranking {
    /// The external node identifier.
    type NodeId;

    /// Runs exactly `iterations` iterations, starting from the initial ranks.
    ///
    /// On failure no result can be read until the next successful call.
    fn compute(&mut self, iterations: usize) -> Result<(), RankError>;

    /// Returns the rank of a node after a successful computation.
    fn result(&self, node: &Self::NodeId) -> Result<f64, RankError>;

    /// Returns the number of ranked nodes.
    fn num_nodes(&self) -> usize;
}
