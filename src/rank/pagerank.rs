/*
 * SPDX-FileCopyrightText: 2026 The rankprop authors
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! Parallel Jacobi PageRank on weighted graphs.
//!
//! This implementation keeps two rank vectors: during an iteration the
//! _current_ one is only read, and the _next_ one is filled by an
//! [`Executor`], usually a [`WorkerPool`](crate::pool::WorkerPool). At the end
//! of the iteration the two vectors are swapped.
//!
//! # The formula
//!
//! Let *wⱼᵢ* be the sum of the weights of the arcs *j* → *i*, and let *oⱼ* be
//! the sum of the weights of the arcs leaving *j*. Then, at each iteration,
//!
//! > *xᵢ*⁽*ᵗ* ⁺ ¹⁾ = *b* + *s* + α ∑_(*j* → *i*) *xⱼ*⁽*ᵗ*⁾ *wⱼᵢ* / *oⱼ*,
//!
//! where α is the damping factor and *b* is the teleport term:
//!
//! - with [`Teleport::PerNode`] (the default) *b* = 1 − α, and the ranks of a
//!   graph without dangling nodes converge to a vector summing to *n*;
//! - with [`Teleport::Uniform`] *b* = (1 − α) / *n*, and the ranks converge
//!   to a stochastic vector.
//!
//! The term *s* handles dangling nodes: with [`Dangling::Drop`] (the default)
//! *s* = 0, and the rank of dangling nodes leaks out of the system; with
//! [`Dangling::Redistribute`] *s* = α *D* / *n*, where *D* is the total rank of
//! dangling nodes at iteration *t*.
//!
//! # Determinism
//!
//! Each node pulls rank from its predecessors in the order in which the
//! [`Adjacency`](crate::adjacency::Adjacency) stores them, and it is computed
//! by a single thread. Thus, the result does not depend on the number of
//! threads or on the batch size, and repeated computations on the same
//! projection yield bit-identical ranks.
//!
//! # Stopping criteria
//!
//! [`compute`](Ranking::compute) runs a fixed number of iterations. The
//! [`run`](PageRank::run) method accepts instead a composable [`Predicate`]
//! that is evaluated after each iteration. The predicate receives the current
//! iteration number and a _norm delta_, an upper bound on the ℓ₁ error
//! between the current approximation and the limit vector, computed as
//!
//! > α / (1 − α) · ‖**x**⁽ᵗ⁾ − **x**⁽ᵗ⁻¹⁾‖₁

pub mod preds {
    //! Predicates implementing stopping conditions.
    //!
    //! [`PageRank::run`](super::PageRank::run) requires a [predicate](Predicate)
    //! telling when to stop: the predicates in this module evaluate to true if
    //! the computation should be stopped.
    //!
    //! You can combine them using the `and` and `or` methods provided by the
    //! [`Predicate`] trait.
    //!
    //! # Examples
    //! ```
    //! # fn main() -> Result<(), Box<dyn std::error::Error>> {
    //! use predicates::prelude::*;
    //! use rankprop::rank::preds::{L1Norm, MaxIter};
    //!
    //! let mut predicate = L1Norm::try_from(1E-6)?.boxed();
    //! predicate = predicate.or(MaxIter::from(100)).boxed();
    //! #     Ok(())
    //! # }
    //! ```

    use anyhow::ensure;
    use predicates::{reflection::PredicateReflection, Predicate};
    use std::fmt::Display;

    #[doc(hidden)]
    /// The information passed to stopping predicates after each iteration.
    #[derive(Debug)]
    pub struct PredParams {
        pub iteration: usize,
        pub norm_delta: f64,
    }

    /// Stops after the provided number of iterations.
    #[derive(Debug, Clone)]
    pub struct MaxIter {
        max_iter: usize,
    }

    impl MaxIter {
        pub const DEFAULT_MAX_ITER: usize = usize::MAX;
    }

    impl From<usize> for MaxIter {
        fn from(max_iter: usize) -> Self {
            MaxIter { max_iter }
        }
    }

    impl Default for MaxIter {
        fn default() -> Self {
            Self::from(Self::DEFAULT_MAX_ITER)
        }
    }

    impl Display for MaxIter {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "(max iter: {})", self.max_iter)
        }
    }

    impl PredicateReflection for MaxIter {}

    impl Predicate<PredParams> for MaxIter {
        fn eval(&self, params: &PredParams) -> bool {
            params.iteration >= self.max_iter
        }
    }

    /// Stops when the norm delta falls below a given threshold.
    ///
    /// The norm delta α / (1 − α) · ‖*x*(*t*) − *x*(*t* − 1)‖₁ bounds the ℓ₁
    /// distance between the rank vector *x*(*t*) at iteration *t* and the
    /// limit vector.
    #[derive(Debug, Clone)]
    pub struct L1Norm {
        threshold: f64,
    }

    impl L1Norm {
        pub const DEFAULT_THRESHOLD: f64 = 1E-6;
    }

    impl TryFrom<Option<f64>> for L1Norm {
        type Error = anyhow::Error;
        fn try_from(threshold: Option<f64>) -> anyhow::Result<Self> {
            Ok(match threshold {
                Some(threshold) => {
                    ensure!(threshold.is_finite(), "The threshold must be finite");
                    ensure!(threshold > 0.0, "The threshold must be positive");
                    L1Norm { threshold }
                }
                None => Self::default(),
            })
        }
    }

    impl TryFrom<f64> for L1Norm {
        type Error = anyhow::Error;
        fn try_from(threshold: f64) -> anyhow::Result<Self> {
            Some(threshold).try_into()
        }
    }

    impl Default for L1Norm {
        fn default() -> Self {
            L1Norm {
                threshold: Self::DEFAULT_THRESHOLD,
            }
        }
    }

    impl Display for L1Norm {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "(norm: {})", self.threshold)
        }
    }

    impl PredicateReflection for L1Norm {}

    impl Predicate<PredParams> for L1Norm {
        fn eval(&self, params: &PredParams) -> bool {
            params.norm_delta <= self.threshold
        }
    }
}

use super::{RankError, Ranking};
use crate::adjacency::Projection;
use crate::pool::Executor;
use crate::store::RankStore;
use dsi_progress_logger::{no_logging, ConcurrentProgressLog, ProgressLog};
use kahan::KahanSum;
use predicates::Predicate;
use std::fmt::Debug;
use std::hash::Hash;

/// Selects the teleport term of the update rule.
///
/// See the [module-level documentation](self) for the details.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "kebab-case"))]
pub enum Teleport {
    /// Every node receives 1 − α at each iteration. This is the default.
    #[default]
    PerNode,
    /// Every node receives (1 − α) / *n* at each iteration.
    Uniform,
}

impl Teleport {
    fn base(self, alpha: f64, num_nodes: usize) -> f64 {
        match self {
            Teleport::PerNode => 1.0 - alpha,
            Teleport::Uniform => (1.0 - alpha) / num_nodes as f64,
        }
    }
}

impl std::fmt::Display for Teleport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Teleport::PerNode => f.write_str("per node"),
            Teleport::Uniform => f.write_str("uniform"),
        }
    }
}

/// Selects what happens to the rank of dangling nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "kebab-case"))]
pub enum Dangling {
    /// The rank of dangling nodes is lost. This is the default.
    #[default]
    Drop,
    /// The rank of dangling nodes is spread uniformly over all nodes.
    Redistribute,
}

impl std::fmt::Display for Dangling {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Dangling::Drop => f.write_str("drop"),
            Dangling::Redistribute => f.write_str("redistribute"),
        }
    }
}

/// Computes PageRank on a [`Projection`] using an [`Executor`].
///
/// The struct is configured via setters and then executed via
/// [`compute`](Ranking::compute) or [`run`](Self::run). After a successful
/// computation ranks are available by external identifier through
/// [`result`](Ranking::result), or in dense order through
/// [`rows`](Self::rows) and [`rank`](Self::rank).
///
/// # Examples
///
/// ```
/// use rankprop::prelude::*;
///
/// // A triangle and a node pointing to it
/// let mut g = MemGraph::new();
/// for (src, dst) in [(0_u64, 1), (1, 2), (2, 0), (3, 0)] {
///     g.add_relationship(src, dst, "LINK", [("weight", 1.0)]);
/// }
/// let projection = AdjacencyBuilder::new("weight").build(&g)?;
/// let pool = WorkerPool::with_batch_size(2, 2)?;
///
/// let mut pr = PageRank::new(&projection, &pool);
/// pr.alpha(0.85);
/// assert_eq!(pr.result(&0), Err(RankError::NotComputed));
///
/// pr.compute(20)?;
/// assert_eq!(pr.iterations(), 20);
/// assert!(pr.result(&0)? > pr.result(&1)?);
/// assert!((pr.result(&3)? - 0.15).abs() < 1E-12);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub struct PageRank<'a, N, E: Executor> {
    projection: &'a Projection<N>,
    executor: &'a E,
    alpha: f64,
    teleport: Teleport,
    dangling: Dangling,
    initial_rank: f64,
    store: RankStore,
    iteration: usize,
    norm_delta: f64,
    computed: bool,
}

impl<N, E: Executor> std::fmt::Debug for PageRank<'_, N, E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PageRank")
            .field("alpha", &self.alpha)
            .field("teleport", &self.teleport)
            .field("dangling", &self.dangling)
            .field("initial_rank", &self.initial_rank)
            .field("iteration", &self.iteration)
            .field("norm_delta", &self.norm_delta)
            .field("computed", &self.computed)
            .finish_non_exhaustive()
    }
}

impl<'a, N: Copy + Eq + Hash + Debug, E: Executor> PageRank<'a, N, E> {
    pub const DEFAULT_ALPHA: f64 = 0.85;
    pub const DEFAULT_INITIAL_RANK: f64 = 1.0;

    /// Creates a new PageRank computation on `projection`, which will run
    /// iterations on `executor`.
    pub fn new(projection: &'a Projection<N>, executor: &'a E) -> Self {
        Self {
            projection,
            executor,
            alpha: Self::DEFAULT_ALPHA,
            teleport: Teleport::default(),
            dangling: Dangling::default(),
            initial_rank: Self::DEFAULT_INITIAL_RANK,
            store: RankStore::new(projection.num_nodes(), Self::DEFAULT_INITIAL_RANK),
            iteration: 0,
            norm_delta: f64::INFINITY,
            computed: false,
        }
    }

    /// Sets the damping factor α.
    ///
    /// # Panics
    ///
    /// Panics if `alpha` is not in the interval [0 . . 1).
    pub fn alpha(&mut self, alpha: f64) -> &mut Self {
        assert!(
            // 0.0..1.0 is [0 . . 1) in mathematical notation
            (0.0..1.0).contains(&alpha),
            "The damping factor must be in [0 . . 1), got {alpha}"
        );
        self.alpha = alpha;
        self
    }

    /// Sets the [teleport term](Teleport).
    pub fn teleport(&mut self, teleport: Teleport) -> &mut Self {
        self.teleport = teleport;
        self
    }

    /// Sets the [treatment of dangling nodes](Dangling).
    pub fn dangling(&mut self, dangling: Dangling) -> &mut Self {
        self.dangling = dangling;
        self
    }

    /// Sets the rank of every node before the first iteration.
    ///
    /// This resets the rank vector, so previously computed results are no
    /// longer available.
    ///
    /// # Panics
    ///
    /// Panics if `initial_rank` is not finite and non-negative.
    pub fn initial_rank(&mut self, initial_rank: f64) -> &mut Self {
        assert!(
            initial_rank.is_finite() && initial_rank >= 0.0,
            "The initial rank must be finite and non-negative, got {initial_rank}"
        );
        self.initial_rank = initial_rank;
        self.store.reset(initial_rank);
        self.computed = false;
        self
    }

    /// Returns the rank vector, indexed by dense identifier.
    ///
    /// Before any computation, and after a failed one, this is filled with
    /// the initial rank.
    pub fn rank(&self) -> &[f64] {
        self.store.current()
    }

    /// Iterates over pairs of external identifiers and ranks, in dense order.
    pub fn rows(&self) -> Result<impl ExactSizeIterator<Item = (&N, f64)> + '_, RankError> {
        if !self.computed {
            return Err(RankError::NotComputed);
        }
        Ok(self
            .projection
            .ids()
            .iter()
            .zip(self.store.current().iter().copied()))
    }

    /// Returns the number of iterations performed by the last computation.
    pub fn iterations(&self) -> usize {
        self.iteration
    }

    /// Returns the norm delta after the last iteration.
    ///
    /// This is an upper bound on the ℓ₁ error between the current
    /// approximation and the limit vector, computed as
    /// α / (1 − α) · ‖*x*(*t*) − *x*(*t* − 1)‖₁.
    pub fn norm_delta(&self) -> f64 {
        self.norm_delta
    }

    /// Runs PageRank from the initial ranks until the given predicate is
    /// satisfied.
    ///
    /// The predicate is evaluated after each iteration, so at least one
    /// iteration is always performed.
    pub fn run(&mut self, predicate: impl Predicate<preds::PredParams>) -> Result<(), RankError> {
        self.run_with_logging(predicate, no_logging![], no_logging![])
    }

    /// Runs PageRank from the initial ranks until the given predicate is
    /// satisfied, logging progress.
    ///
    /// `pl` is a sequential [`ProgressLog`] counting iterations; `cpl` is a
    /// [`ConcurrentProgressLog`] used for node-level progress inside each
    /// iteration. Either can be [`no_logging![]`](no_logging).
    pub fn run_with_logging(
        &mut self,
        predicate: impl Predicate<preds::PredParams>,
        pl: &mut impl ProgressLog,
        cpl: &mut impl ConcurrentProgressLog,
    ) -> Result<(), RankError> {
        self.computed = false;
        self.iteration = 0;
        self.norm_delta = f64::INFINITY;
        self.store.reset(self.initial_rank);

        let n = self.projection.num_nodes();
        if n == 0 {
            self.computed = true;
            return Ok(());
        }

        log::info!("Alpha: {}", self.alpha);
        log::info!("Teleport: {}", self.teleport);
        log::info!("Dangling nodes: {}", self.dangling);
        log::info!("Initial rank: {}", self.initial_rank);
        log::info!("Stopping criterion: {}", predicate);

        let projection = self.projection;
        let executor = self.executor;
        let adjacency = projection.adjacency();
        let alpha = self.alpha;
        let base = self.teleport.base(alpha, n);
        let inv_n = 1.0 / n as f64;

        pl.item_name("iteration");
        pl.expected_updates(None);
        pl.start(format!("Computing PageRank (alpha={alpha})..."));

        loop {
            let share = match self.dangling {
                Dangling::Drop => 0.0,
                Dangling::Redistribute => {
                    let current = self.store.current();
                    let mass = (0..n)
                        .filter(|&j| adjacency.is_dangling(j))
                        .fold(KahanSum::<f64>::new(), |sum, j| sum + current[j])
                        .sum();
                    alpha * mass * inv_n
                }
            };

            cpl.item_name("node");
            cpl.expected_updates(Some(n));
            cpl.start(format!("Iteration {}...", self.iteration + 1));

            let (current, next) = self.store.buffers();
            let outcome = executor.for_each_node(next, adjacency.num_arcs(), cpl, |i| {
                let mut sigma = 0.0;
                for &(j, w) in adjacency.predecessors(i) {
                    sigma += current[j] * w / adjacency.out_weight(j);
                }
                let rank = base + share + alpha * sigma;
                if rank.is_finite() {
                    Ok(rank)
                } else {
                    Err(RankError::NonFinite {
                        node: i,
                        value: rank,
                    })
                }
            });
            cpl.done();

            if let Err(e) = outcome {
                pl.done();
                log::error!("Iteration {} failed: {}", self.iteration + 1, e);
                self.iteration = 0;
                self.norm_delta = f64::INFINITY;
                self.store.reset(self.initial_rank);
                return Err(e);
            }

            let delta = current
                .iter()
                .zip(next.iter())
                .fold(KahanSum::<f64>::new(), |sum, (x, y)| sum + (y - x).abs())
                .sum();
            // Bound on ℓ₁ error
            self.norm_delta = delta * alpha / (1.0 - alpha);

            self.store.swap();
            self.iteration += 1;

            log::info!(
                "Iteration {}: norm delta = {}",
                self.iteration,
                self.norm_delta
            );

            pl.update_and_display();

            if predicate.eval(&preds::PredParams {
                iteration: self.iteration,
                norm_delta: self.norm_delta,
            }) {
                break;
            }
        }

        pl.done();
        self.computed = true;
        Ok(())
    }
}

impl<N: Copy + Eq + Hash + Debug, E: Executor> Ranking for PageRank<'_, N, E> {
    type NodeId = N;

    fn compute(&mut self, iterations: usize) -> Result<(), RankError> {
        if iterations == 0 {
            return Err(RankError::ZeroIterations);
        }
        self.run(preds::MaxIter::from(iterations))
    }

    fn result(&self, node: &N) -> Result<f64, RankError> {
        let dense = self
            .projection
            .ids()
            .dense(node)
            .ok_or_else(|| RankError::NoSuchNode(format!("{node:?}")))?;
        if !self.computed {
            return Err(RankError::NotComputed);
        }
        Ok(self.store.read(dense))
    }

    fn num_nodes(&self) -> usize {
        self.projection.num_nodes()
    }
}
