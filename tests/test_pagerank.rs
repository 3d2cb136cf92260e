/*
 * SPDX-FileCopyrightText: 2026 The rankprop authors
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

use anyhow::Result;
use dsi_progress_logger::no_logging;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use rankprop::prelude::*;

/// Builds a projection with nodes 0..n (in this order) and unit-weight arcs.
fn project(n: u64, arcs: impl IntoIterator<Item = (u64, u64)>) -> Result<Projection<u64>> {
    let mut g = MemGraph::new();
    for node in 0..n {
        g.add_node(node);
    }
    for (src, dst) in arcs {
        g.add_relationship(src, dst, "LINK", [("weight", 1.0)]);
    }
    Ok(AdjacencyBuilder::new("weight").build(&g)?)
}

/// Builds a random graph in which about one node in ten is dangling.
fn random_graph(n: u64, avg_degree: usize, seed: u64) -> MemGraph<u64> {
    let mut rng = SmallRng::seed_from_u64(seed);
    let mut g = MemGraph::new();
    for node in 0..n {
        g.add_node(node);
    }
    for src in 0..n {
        if rng.random_bool(0.1) {
            continue;
        }
        for _ in 0..rng.random_range(1..=2 * avg_degree) {
            let dst = rng.random_range(0..n);
            g.add_relationship(src, dst, "LINK", [("weight", rng.random_range(0.1..2.0))]);
        }
    }
    g
}

/// A sequential power method pushing rank along successors.
fn reference(
    adj: &Adjacency,
    alpha: f64,
    teleport: Teleport,
    dangling: Dangling,
    initial: f64,
    iterations: usize,
) -> Vec<f64> {
    let n = adj.num_nodes();
    let base = match teleport {
        Teleport::PerNode => 1.0 - alpha,
        Teleport::Uniform => (1.0 - alpha) / n as f64,
    };
    let mut x = vec![initial; n];
    for _ in 0..iterations {
        let share = match dangling {
            Dangling::Drop => 0.0,
            Dangling::Redistribute => {
                let mass: f64 = (0..n).filter(|&j| adj.is_dangling(j)).map(|j| x[j]).sum();
                alpha * mass / n as f64
            }
        };
        let mut next = vec![base + share; n];
        for (j, &x_j) in x.iter().enumerate() {
            for &(i, w) in adj.successors(j) {
                next[i] += alpha * x_j * w / adj.out_weight(j);
            }
        }
        x = next;
    }
    x
}

/// Returns the ℓ∞ distance (maximum absolute difference) between two vectors.
fn l_inf_distance(a: &[f64], b: &[f64]) -> f64 {
    assert_eq!(a.len(), b.len());
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y).abs())
        .fold(0.0, f64::max)
}

#[test]
fn test_companies() -> Result<()> {
    let mut g = MemGraph::new();
    for name in ["a", "b", "c", "d", "e", "f", "g", "h", "i", "j", "k"] {
        g.add_node(name);
    }
    for (src, dst) in [
        ("b", "c"),
        ("c", "b"),
        ("d", "a"),
        ("e", "b"),
        ("e", "d"),
        ("e", "f"),
        ("f", "b"),
        ("f", "e"),
        ("g", "b"),
        ("g", "e"),
        ("h", "b"),
        ("h", "e"),
        ("i", "b"),
        ("i", "e"),
        ("j", "e"),
        ("k", "e"),
    ] {
        g.add_relationship(src, dst, "SIMILAR", [("score", 0.80)]);
    }
    let projection = AdjacencyBuilder::new("score")
        .rel_type(Some("SIMILAR"))
        .build(&g)?;
    assert_eq!(projection.num_nodes(), 11);
    assert_eq!(projection.adjacency().num_dangling(), 1);

    let pool = WorkerPool::with_batch_size(2, 50)?;
    let mut pr = PageRank::new(&projection, &pool);
    pr.alpha(0.85).initial_rank(0.0);
    pr.compute(20)?;

    assert_eq!(pr.num_nodes(), 11);
    let b = pr.result(&"b")?;
    assert!((b - 2.87711).abs() < 0.1, "b = {b}");
    // Nodes without predecessors only get the teleport term
    assert!((pr.result(&"k")? - 0.15).abs() < 1E-12);
    assert!(matches!(pr.result(&"z"), Err(RankError::NoSuchNode(_))));

    pool.shutdown();
    Ok(())
}

#[test]
fn test_empty() -> Result<()> {
    let projection = project(0, [])?;
    let pool = WorkerPool::with_batch_size(2, 10)?;
    let mut pr = PageRank::new(&projection, &pool);
    pr.compute(10)?;
    assert_eq!(pr.num_nodes(), 0);
    assert!(pr.rank().is_empty());
    assert_eq!(pr.result(&0), Err(RankError::NoSuchNode("0".into())));
    Ok(())
}

#[test]
fn test_uniform_start() -> Result<()> {
    let projection = AdjacencyBuilder::new("weight").build(&random_graph(100, 3, 0))?;
    let mut pr = PageRank::new(&projection, &Sequential);
    assert!(pr.rank().iter().all(|&x| x == 1.0));
    assert_eq!(pr.result(&0), Err(RankError::NotComputed));

    pr.initial_rank(0.01);
    assert!(pr.rank().iter().all(|&x| x == 0.01));
    Ok(())
}

#[test]
fn test_mass_conservation() -> Result<()> {
    let pool = WorkerPool::with_batch_size(3, 17)?;

    // No dangling nodes: a cycle with chords
    let n = 50;
    let projection = project(n, (0..n).flat_map(|i| [(i, (i + 1) % n), (i, (i * 7) % n)]))?;
    assert_eq!(projection.adjacency().num_dangling(), 0);
    let mut pr = PageRank::new(&projection, &pool);
    pr.compute(30)?;
    let sum: f64 = pr.rank().iter().sum();
    assert!((sum - n as f64).abs() < 1E-9, "sum = {sum}");

    // Dangling nodes, redistributed
    let projection = AdjacencyBuilder::new("weight").build(&random_graph(500, 4, 1))?;
    assert!(projection.adjacency().num_dangling() > 0);
    let mut pr = PageRank::new(&projection, &pool);
    pr.dangling(Dangling::Redistribute);
    pr.compute(30)?;
    let sum: f64 = pr.rank().iter().sum();
    assert!((sum - 500.0).abs() < 1E-8, "sum = {sum}");

    // Stochastic version
    pr.teleport(Teleport::Uniform).initial_rank(1.0 / 500.0);
    pr.compute(30)?;
    let sum: f64 = pr.rank().iter().sum();
    assert!((sum - 1.0).abs() < 1E-12, "sum = {sum}");

    // Dropping dangling rank loses mass
    pr.dangling(Dangling::Drop);
    pr.compute(30)?;
    assert!(pr.rank().iter().sum::<f64>() < 1.0);
    Ok(())
}

#[test]
fn test_convergence() -> Result<()> {
    let projection = AdjacencyBuilder::new("weight").build(&random_graph(300, 5, 2))?;
    let pool = WorkerPool::with_batch_size(2, 32)?;

    for dangling in [Dangling::Drop, Dangling::Redistribute] {
        let mut pr = PageRank::new(&projection, &pool);
        pr.dangling(dangling);
        let mut deltas = vec![];
        for iterations in 1..=15 {
            pr.compute(iterations)?;
            assert_eq!(pr.iterations(), iterations);
            deltas.push(pr.norm_delta());
        }
        for w in deltas.windows(2) {
            assert!(
                w[1] <= 0.85 * w[0] * (1.0 + 1E-9) + 1E-12,
                "{dangling}: {} > 0.85 * {}",
                w[1],
                w[0]
            );
        }
    }
    Ok(())
}

#[test]
fn test_early_stop() -> Result<()> {
    let projection = AdjacencyBuilder::new("weight").build(&random_graph(300, 5, 3))?;
    let pool = WorkerPool::with_batch_size(2, 32)?;
    let mut pr = PageRank::new(&projection, &pool);
    pr.run(preds::L1Norm::try_from(1E-6)?)?;
    assert!(pr.norm_delta() <= 1E-6);
    let iterations = pr.iterations();
    assert!(iterations > 1);

    let mut long = PageRank::new(&projection, &pool);
    long.run(preds::L1Norm::try_from(1E-13)?)?;
    assert!(long.iterations() > iterations);
    // The norm delta bounds the ℓ₁ distance from the limit
    let distance: f64 = pr
        .rank()
        .iter()
        .zip(long.rank())
        .map(|(x, y)| (x - y).abs())
        .sum();
    assert!(distance <= 1E-6 + 1E-12, "distance = {distance}");
    Ok(())
}

#[test]
fn test_reference() -> Result<()> {
    let pool = WorkerPool::with_batch_size(4, 13)?;
    for seed in 0..5 {
        let projection = AdjacencyBuilder::new("weight").build(&random_graph(400, 6, seed))?;
        for (teleport, dangling, initial) in [
            (Teleport::PerNode, Dangling::Drop, 1.0),
            (Teleport::PerNode, Dangling::Redistribute, 0.0),
            (Teleport::Uniform, Dangling::Redistribute, 1.0 / 400.0),
        ] {
            let mut pr = PageRank::new(&projection, &pool);
            pr.alpha(0.9)
                .teleport(teleport)
                .dangling(dangling)
                .initial_rank(initial);
            pr.compute(25)?;
            let expected = reference(
                projection.adjacency(),
                0.9,
                teleport,
                dangling,
                initial,
                25,
            );
            let scale = expected.iter().cloned().fold(0.0, f64::max);
            assert!(
                l_inf_distance(&expected, pr.rank()) <= 1E-12 * scale.max(1.0),
                "seed={seed} {teleport} {dangling}: L∞={}",
                l_inf_distance(&expected, pr.rank())
            );
        }
    }
    Ok(())
}

/// Tests PageRank on a graph made of a *k*-clique (nodes 0..*k*) and a
/// directed *p*-cycle (nodes *k*..*k* + *p*), connected by a single arc from
/// node *k* to node *k* − 1. The expected rank values are fully analytical.
#[test]
fn test_clique_back_bridge_cycle() -> Result<()> {
    let pool = WorkerPool::with_batch_size(2, 16)?;
    for threshold in [1E-3, 1E-6, 1E-9] {
        for p in [10, 50] {
            for k in [10, 50] {
                let n = p + k;
                let mut arcs = vec![];
                for i in 0..k {
                    for j in 0..k {
                        if i != j {
                            arcs.push((i, j));
                        }
                    }
                }
                for i in 0..p {
                    arcs.push((k + i, k + (i + 1) % p));
                }
                arcs.push((k, k - 1));
                let projection = project(n, arcs)?;

                for alpha in [0.25, 0.50, 0.75] {
                    let mut pr = PageRank::new(&projection, &pool);
                    pr.alpha(alpha)
                        .teleport(Teleport::Uniform)
                        .initial_rank(1.0 / n as f64);
                    pr.run(preds::L1Norm::try_from(threshold / 10.0)?)?;

                    let (k, p) = (k as usize, p as usize);
                    let kf = k as f64;
                    let mut expected = vec![0.0; n as usize];

                    let clique_rank = (2.0 * (kf - 1.0) - 2.0 * (kf - 2.0) * alpha - alpha * alpha)
                        / (2.0 * (1.0 - alpha) * (kf - 1.0 + alpha))
                        - alpha.powi(p as i32 + 2)
                            / (2.0
                                * (1.0 - alpha)
                                * (kf - 1.0 + alpha)
                                * (2.0 - alpha.powi(p as i32)));
                    expected[..k - 1].fill(clique_rank);

                    expected[k - 1] = (2.0 * (kf - 1.0) - (kf - 3.0) * alpha - alpha * alpha * kf)
                        / (2.0 * (1.0 - alpha) * (kf - 1.0 + alpha))
                        - alpha.powi(p as i32 + 1) * (kf - 1.0 - alpha * (kf - 2.0))
                            / (2.0
                                * (1.0 - alpha)
                                * (kf - 1.0 + alpha)
                                * (2.0 - alpha.powi(p as i32)));

                    for d in 0..p {
                        let exp = if d == 0 { p } else { d };
                        expected[k + d] =
                            1.0 - alpha.powi(exp as i32) / (2.0 - alpha.powi(p as i32));
                    }

                    for v in expected.iter_mut() {
                        *v /= n as f64;
                    }

                    assert!(
                        l_inf_distance(&expected, pr.rank()) < threshold,
                        "p={p} k={k} alpha={alpha} threshold={threshold}: L∞={}",
                        l_inf_distance(&expected, pr.rank())
                    );
                }
            }
        }
    }
    Ok(())
}

#[test]
fn test_non_finite() -> Result<()> {
    let projection = project(3, [(0, 2), (1, 2)])?;
    let pool = WorkerPool::with_batch_size(2, 1)?;
    let mut pr = PageRank::new(&projection, &pool);
    pr.compute(1)?;
    assert!(pr.result(&2).is_ok());

    // Two huge contributions overflow
    pr.alpha(0.99).initial_rank(1E308);
    assert_eq!(
        pr.compute(1),
        Err(RankError::NonFinite {
            node: 2,
            value: f64::INFINITY
        })
    );
    assert_eq!(pr.result(&2), Err(RankError::NotComputed));
    assert!(pr.rows().is_err());

    pr.initial_rank(1.0);
    pr.compute(1)?;
    assert!(pr.result(&2)?.is_finite());
    Ok(())
}

#[test]
fn test_late_failure() -> Result<()> {
    // The first iteration succeeds, the second overflows at node 3
    let projection = project(8, [(0, 2), (1, 2), (6, 5), (7, 5), (2, 3), (5, 3)])?;
    let pool = WorkerPool::with_batch_size(3, 2)?;
    let mut pr = PageRank::new(&projection, &pool);
    pr.alpha(0.99).initial_rank(6E307);
    assert_eq!(
        pr.compute(5),
        Err(RankError::NonFinite {
            node: 3,
            value: f64::INFINITY
        })
    );
    // No trace of the completed iteration remains
    assert_eq!(pr.rank(), &[6E307; 8]);
    assert_eq!(pr.iterations(), 0);
    assert_eq!(pr.norm_delta(), f64::INFINITY);
    assert_eq!(pr.result(&2), Err(RankError::NotComputed));
    Ok(())
}

#[test]
fn test_weights() -> Result<()> {
    // Node 0 sends three quarters of its rank to 1 and one quarter to 2
    let mut g = MemGraph::new();
    g.add_relationship(0_u64, 1, "LINK", [("weight", 3.0)]);
    g.add_relationship(0, 2, "LINK", [("weight", 1.0)]);
    g.add_relationship(0, 2, "IGNORED", [("weight", 100.0)]);
    let projection = AdjacencyBuilder::new("weight")
        .rel_type(Some("LINK"))
        .build(&g)?;
    let mut pr = PageRank::new(&projection, &Sequential);
    pr.alpha(0.5);
    pr.compute(1)?;
    assert_eq!(pr.result(&0)?, 0.5);
    assert_eq!(pr.result(&1)?, 0.5 + 0.5 * 0.75);
    assert_eq!(pr.result(&2)?, 0.5 + 0.5 * 0.25);
    Ok(())
}

#[test]
fn test_dyn_ranking() -> Result<()> {
    let _ = env_logger::builder().is_test(true).try_init();
    let projection = AdjacencyBuilder::new("weight").build(&random_graph(200, 3, 4))?;
    let pool = WorkerPool::with_batch_size(2, 9)?;
    let mut rankings: Vec<Box<dyn Ranking<NodeId = u64> + '_>> = vec![
        Box::new(PageRank::new(&projection, &pool)),
        Box::new(PageRank::new(&projection, &Sequential)),
    ];
    for ranking in rankings.iter_mut() {
        assert_eq!(ranking.num_nodes(), 200);
        ranking.compute(10)?;
    }
    for node in 0..200 {
        assert_eq!(rankings[0].result(&node)?, rankings[1].result(&node)?);
    }
    Ok(())
}

#[test]
fn test_logging() -> Result<()> {
    let projection = AdjacencyBuilder::new("weight")
        .build_with_logging(&random_graph(100, 3, 5), no_logging![])?;
    let pool = WorkerPool::with_batch_size(2, 9)?;
    let mut pr = PageRank::new(&projection, &pool);
    pr.run_with_logging(
        preds::MaxIter::from(5),
        &mut dsi_progress_logger::progress_logger![],
        &mut dsi_progress_logger::concurrent_progress_logger![],
    )?;
    assert_eq!(pr.iterations(), 5);
    assert_eq!(pr.rows()?.len(), 100);
    Ok(())
}
