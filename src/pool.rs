/*
 * SPDX-FileCopyrightText: 2026 The rankprop authors
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! Execution strategies for a rank-propagation sweep.
//!
//! An [`Executor`] fills the _next_ rank vector by calling a per-node
//! function on every dense identifier, and returns only when all values have
//! been written. [`WorkerPool`] does so in parallel on a dedicated Rayon
//! thread pool, splitting the vector into batches of contiguous nodes; each
//! batch is a mutable subslice, so concurrent writers are disjoint by
//! construction. [`Sequential`] is a single-threaded baseline.

use crate::rank::RankError;
use crate::utils::Granularity;
use dsi_progress_logger::ConcurrentProgressLog;
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuildError};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

/// A strategy to compute all entries of a rank vector.
pub trait Executor {
    /// Sets `next[i]` to `per_node(i)` for every index `i` of `next`.
    ///
    /// The method returns only after all entries have been written, or
    /// with an error if `per_node` failed or panicked on some node; in the
    /// latter case the content of `next` is unspecified.
    ///
    /// `num_arcs` is the number of arcs of the graph, which might be used
    /// to size batches. `cpl` is updated with the number of nodes processed.
    fn for_each_node<F>(
        &self,
        next: &mut [f64],
        num_arcs: u64,
        cpl: &mut impl ConcurrentProgressLog,
        per_node: F,
    ) -> Result<(), RankError>
    where
        F: Fn(usize) -> Result<f64, RankError> + Sync;
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_owned()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_owned()
    }
}

/// A fixed-size pool of worker threads with a fixed batch size.
///
/// The pool is meant to be created once and passed by reference to any
/// number of computations; its threads live until the pool is dropped or
/// [shut down](Self::shutdown).
///
/// # Examples
///
/// ```
/// use dsi_progress_logger::no_logging;
/// use rankprop::pool::{Executor, WorkerPool};
///
/// let pool = WorkerPool::with_batch_size(2, 3)?;
/// let mut squares = vec![0.0; 10];
/// pool.for_each_node(&mut squares, 0, no_logging![], |i| Ok((i * i) as f64))?;
/// assert_eq!(squares[9], 81.0);
/// pool.shutdown();
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug)]
pub struct WorkerPool {
    thread_pool: ThreadPool,
    granularity: Granularity,
}

impl WorkerPool {
    /// Creates a pool with the given number of threads and batch
    /// granularity.
    ///
    /// If `num_threads` is zero, Rayon chooses the number of threads.
    pub fn new(num_threads: usize, granularity: Granularity) -> Result<Self, ThreadPoolBuildError> {
        let thread_pool = rayon::ThreadPoolBuilder::new()
            .num_threads(num_threads)
            .thread_name(|i| format!("rankprop-worker-{i}"))
            .build()?;
        log::debug!(
            "Started worker pool with {} threads, granularity {:?}",
            thread_pool.current_num_threads(),
            granularity
        );
        Ok(Self {
            thread_pool,
            granularity,
        })
    }

    /// Creates a pool with the given number of threads processing batches of
    /// `batch_size` nodes.
    pub fn with_batch_size(num_threads: usize, batch_size: usize) -> Result<Self, ThreadPoolBuildError> {
        Self::new(num_threads, Granularity::Nodes(batch_size))
    }

    /// Returns the number of threads of the pool.
    pub fn num_threads(&self) -> usize {
        self.thread_pool.current_num_threads()
    }

    /// Returns the batch granularity of the pool.
    pub fn granularity(&self) -> Granularity {
        self.granularity
    }

    /// Terminates the threads of the pool.
    pub fn shutdown(self) {
        log::debug!(
            "Shutting down worker pool with {} threads",
            self.thread_pool.current_num_threads()
        );
    }
}

impl Executor for WorkerPool {
    fn for_each_node<F>(
        &self,
        next: &mut [f64],
        num_arcs: u64,
        cpl: &mut impl ConcurrentProgressLog,
        per_node: F,
    ) -> Result<(), RankError>
    where
        F: Fn(usize) -> Result<f64, RankError> + Sync,
    {
        if next.is_empty() {
            return Ok(());
        }
        let batch_size = self.granularity.batch_size(next.len(), num_arcs);
        let local_cpl = cpl.clone();
        let per_node = &per_node;

        panic::catch_unwind(AssertUnwindSafe(|| {
            self.thread_pool.install(|| {
                next.par_chunks_mut(batch_size).enumerate().try_for_each_with(
                    local_cpl,
                    |cpl, (batch, values)| {
                        let start = batch * batch_size;
                        for (offset, value) in values.iter_mut().enumerate() {
                            *value = per_node(start + offset)?;
                        }
                        cpl.update_with_count(values.len());
                        Ok(())
                    },
                )
            })
        }))
        .unwrap_or_else(|payload| Err(RankError::WorkerPanic(panic_message(payload))))
    }
}

impl core::default::Default for WorkerPool {
    /// Returns a pool with one thread per CPU and the default granularity.
    ///
    /// # Panics
    ///
    /// Panics if the thread pool cannot be created.
    fn default() -> Self {
        Self::new(num_cpus::get(), Granularity::default()).expect("Failed to create thread pool")
    }
}

/// A single-threaded [`Executor`] processing nodes in increasing order.
#[derive(Debug, Clone, Copy, Default)]
pub struct Sequential;

impl Executor for Sequential {
    fn for_each_node<F>(
        &self,
        next: &mut [f64],
        _num_arcs: u64,
        cpl: &mut impl ConcurrentProgressLog,
        per_node: F,
    ) -> Result<(), RankError>
    where
        F: Fn(usize) -> Result<f64, RankError> + Sync,
    {
        panic::catch_unwind(AssertUnwindSafe(|| {
            for (node, value) in next.iter_mut().enumerate() {
                *value = per_node(node)?;
                cpl.light_update();
            }
            Ok(())
        }))
        .unwrap_or_else(|payload| Err(RankError::WorkerPanic(panic_message(payload))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dsi_progress_logger::no_logging;

    #[test]
    fn test_covers_all_nodes() -> anyhow::Result<()> {
        for threads in [1, 2, 4] {
            for batch_size in [1, 3, 50, 1000] {
                let pool = WorkerPool::with_batch_size(threads, batch_size)?;
                let mut next = vec![-1.0; 101];
                pool.for_each_node(&mut next, 0, no_logging![], |i| Ok(i as f64))?;
                for (i, &v) in next.iter().enumerate() {
                    assert_eq!(v, i as f64);
                }
            }
        }
        Ok(())
    }

    #[test]
    fn test_reuse() -> anyhow::Result<()> {
        let pool = WorkerPool::with_batch_size(2, 7)?;
        assert_eq!(pool.num_threads(), 2);
        assert_eq!(pool.granularity(), Granularity::Nodes(7));
        for round in 0..10 {
            let mut next = vec![0.0; 30];
            pool.for_each_node(&mut next, 0, no_logging![], |i| Ok((i + round) as f64))?;
            assert_eq!(next[29], (29 + round) as f64);
        }
        pool.shutdown();
        Ok(())
    }

    #[test]
    fn test_error() -> anyhow::Result<()> {
        let pool = WorkerPool::with_batch_size(2, 4)?;
        let mut next = vec![0.0; 20];
        let res = pool.for_each_node(&mut next, 0, no_logging![], |i| {
            if i == 13 {
                Err(RankError::NonFinite {
                    node: i,
                    value: f64::NAN,
                })
            } else {
                Ok(0.0)
            }
        });
        assert!(matches!(res, Err(RankError::NonFinite { node: 13, .. })));
        Ok(())
    }

    #[test]
    fn test_panic() -> anyhow::Result<()> {
        let pool = WorkerPool::with_batch_size(2, 4)?;
        let mut next = vec![0.0; 20];
        let res = pool.for_each_node(&mut next, 0, no_logging![], |i| {
            if i == 17 {
                panic!("boom at {i}");
            }
            Ok(0.0)
        });
        assert_eq!(res, Err(RankError::WorkerPanic("boom at 17".into())));

        // The pool is still usable
        pool.for_each_node(&mut next, 0, no_logging![], |_| Ok(1.0))?;
        assert!(next.iter().all(|&v| v == 1.0));

        let res = Sequential.for_each_node(&mut next, 0, no_logging![], |_| -> Result<f64, _> {
            panic!("sequential boom")
        });
        assert_eq!(res, Err(RankError::WorkerPanic("sequential boom".into())));
        Ok(())
    }

    #[test]
    fn test_empty() -> anyhow::Result<()> {
        let pool = WorkerPool::with_batch_size(2, 4)?;
        pool.for_each_node(&mut [], 0, no_logging![], |_| -> Result<f64, _> {
            unreachable!()
        })?;
        Sequential.for_each_node(&mut [], 0, no_logging![], |_| -> Result<f64, _> {
            unreachable!()
        })?;
        Ok(())
    }
}
