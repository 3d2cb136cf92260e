/*
 * SPDX-FileCopyrightText: 2026 The rankprop authors
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

use super::arcs::{read_arcs, LabeledGraph, WEIGHT_PROPERTY};
use super::{create_parent_dir, ArcsArgs, GlobalArgs, GranularityArgs, NumThreadsArg};
use crate::adjacency::AdjacencyBuilder;
use crate::pool::WorkerPool;
use crate::rank::preds::{L1Norm, MaxIter};
use crate::rank::{Dangling, PageRank, Teleport};
use anyhow::{ensure, Context, Result};
use clap::Parser;
use dsi_progress_logger::{concurrent_progress_logger, progress_logger, ProgressLog};
use predicates::prelude::*;
use serde::Serialize;
use std::io::{BufReader, BufWriter, Write};
use std::path::PathBuf;

/// The treatment of dangling nodes.
#[derive(clap::ValueEnum, Debug, Clone, Copy, Default)]
pub enum CliDangling {
    /// Dangling nodes lose their rank.
    #[default]
    Drop,
    /// The rank of dangling nodes is spread uniformly over all nodes.
    Redistribute,
}

impl From<CliDangling> for Dangling {
    fn from(d: CliDangling) -> Self {
        match d {
            CliDangling::Drop => Dangling::Drop,
            CliDangling::Redistribute => Dangling::Redistribute,
        }
    }
}

/// The teleport term.
#[derive(clap::ValueEnum, Debug, Clone, Copy, Default)]
pub enum CliTeleport {
    /// Each node receives 1 − α (ranks sum to the number of nodes).
    #[default]
    PerNode,
    /// Each node receives (1 − α)/n (ranks sum to one).
    Uniform,
}

impl From<CliTeleport> for Teleport {
    fn from(t: CliTeleport) -> Self {
        match t {
            CliTeleport::PerNode => Teleport::PerNode,
            CliTeleport::Uniform => Teleport::Uniform,
        }
    }
}

/// Formats for the output rows.
#[derive(clap::ValueEnum, Debug, Clone, Copy, Default)]
pub enum RowFormat {
    /// One tab-separated label/score pair per line.
    #[default]
    Tsv,
    /// A JSON array of objects with fields `id` and `score`.
    Json,
}

/// A ranked node.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Row<'a> {
    pub id: &'a str,
    pub score: f64,
}

impl RowFormat {
    /// Writes rows using the format defined by `self`.
    ///
    /// If `precision` is specified, scores are rounded to the given number
    /// of decimal digits.
    pub fn write(
        &self,
        mut writer: impl Write,
        rows: &[Row<'_>],
        precision: Option<usize>,
    ) -> Result<()> {
        match self {
            RowFormat::Tsv => {
                for row in rows {
                    match precision {
                        None => writeln!(writer, "{}\t{}", row.id, row.score),
                        Some(precision) => {
                            writeln!(writer, "{}\t{:.precision$}", row.id, row.score)
                        }
                    }
                    .context("Could not write rows")?;
                }
            }
            RowFormat::Json => {
                let rounded;
                let rows = match precision {
                    None => rows,
                    Some(precision) => {
                        let scale = 10f64.powi(precision.min(i32::MAX as usize) as i32);
                        rounded = rows
                            .iter()
                            .map(|row| Row {
                                id: row.id,
                                score: (row.score * scale).round() / scale,
                            })
                            .collect::<Vec<_>>();
                        &rounded
                    }
                };
                serde_json::to_writer(&mut writer, rows).context("Could not write rows")?;
                writeln!(writer).context("Could not write rows")?;
            }
        }
        writer.flush().context("Could not write rows")?;
        Ok(())
    }
}

#[derive(Parser, Debug)]
#[command(
    name = "pagerank",
    about = "Compute PageRank on a weighted arc list using a pool of worker threads.",
    long_about = "Compute PageRank on a weighted arc list using a pool of worker threads. Each arc is specified by a pair of labels, optionally followed by a weight, separated by a TAB (but the format is customizable); numerical identifiers are assigned to the labels in appearance order. Arcs without a weight get the default weight."
)]
pub struct CliArgs {
    /// The file containing the arcs; if missing, arcs are read from standard
    /// input.
    pub arcs: Option<PathBuf>,

    #[arg(short, long)]
    /// Where to write the ranks; if missing, ranks are written to standard
    /// output.
    pub output: Option<PathBuf>,

    #[arg(short, long, default_value_t = 0.85)]
    /// The damping factor α (must be in the interval [0 . . 1)).
    pub alpha: f64,

    #[arg(short, long, default_value_t = 20)]
    /// The number of iterations.
    pub iterations: usize,

    #[arg(short, long)]
    /// Stop before the given number of iterations if the ℓ₁ error bound falls
    /// below this threshold.
    pub threshold: Option<f64>,

    #[arg(long, value_enum, default_value_t = CliDangling::Drop)]
    /// The treatment of dangling nodes.
    pub dangling: CliDangling,

    #[arg(long, value_enum, default_value_t = CliTeleport::PerNode)]
    /// The teleport term.
    pub teleport: CliTeleport,

    #[arg(long, default_value_t = 1.0)]
    /// The rank of every node before the first iteration.
    pub initial_rank: f64,

    #[arg(long, default_value_t = 1.0)]
    /// The weight of arcs without a weight column.
    pub default_weight: f64,

    #[arg(long, value_enum, default_value_t = RowFormat::Tsv)]
    /// The output format.
    pub fmt: RowFormat,

    #[arg(long)]
    /// Decimal digits of the scores in the output.
    pub precision: Option<usize>,

    #[clap(flatten)]
    pub arcs_args: ArcsArgs,

    #[clap(flatten)]
    pub num_threads: NumThreadsArg,

    #[clap(flatten)]
    pub granularity: GranularityArgs,
}

pub fn main(global_args: GlobalArgs, args: CliArgs) -> Result<()> {
    ensure!(
        // 0.0..1.0 is [0 . . 1) in mathematical notation
        (0.0..1.0).contains(&args.alpha),
        "The damping factor must be in [0 . . 1), got {}",
        args.alpha
    );
    ensure!(args.iterations > 0, "The number of iterations must be positive");
    ensure!(
        args.initial_rank.is_finite() && args.initial_rank >= 0.0,
        "The initial rank must be finite and non-negative, got {}",
        args.initial_rank
    );
    ensure!(
        args.default_weight.is_finite() && args.default_weight > 0.0,
        "The default weight must be finite and positive, got {}",
        args.default_weight
    );

    let mut pl = progress_logger![];
    pl.display_memory(true);
    if let Some(log_interval) = global_args.log_interval {
        pl.log_interval(log_interval);
    }

    let mut cpl = concurrent_progress_logger![];
    cpl.display_memory(true);
    if let Some(log_interval) = global_args.log_interval {
        cpl.log_interval(log_interval);
    }

    let LabeledGraph { graph, labels } = match &args.arcs {
        Some(path) => {
            log::info!("Reading arcs from {}", path.display());
            let file = std::fs::File::open(path)
                .with_context(|| format!("Could not open {}", path.display()))?;
            read_arcs(&args.arcs_args, BufReader::new(file), &mut pl)?
        }
        None => {
            log::info!("Reading arcs from stdin...");
            read_arcs(&args.arcs_args, std::io::stdin().lock(), &mut pl)?
        }
    };

    let projection = AdjacencyBuilder::new(WEIGHT_PROPERTY)
        .default_weight(Some(args.default_weight))
        .build_with_logging(&graph, &mut pl)?;

    let pool = WorkerPool::new(
        args.num_threads.num_threads,
        args.granularity.into_granularity(),
    )?;
    log::info!("Using {} threads", pool.num_threads());

    let mut predicate = MaxIter::from(args.iterations).boxed();
    if let Some(threshold) = args.threshold {
        predicate = predicate.or(L1Norm::try_from(threshold)?).boxed();
    }

    let mut pr = PageRank::new(&projection, &pool);
    pr.alpha(args.alpha)
        .teleport(args.teleport.into())
        .dangling(args.dangling.into())
        .initial_rank(args.initial_rank);

    pr.run_with_logging(predicate, &mut pl, &mut cpl)?;

    log::info!(
        "Completed after {} iteration(s), norm delta = {}",
        pr.iterations(),
        pr.norm_delta()
    );

    // Dense identifiers of a projection of a MemGraph<usize> are label indices
    let rows = pr
        .rows()?
        .map(|(&node, score)| Row {
            id: &labels[node],
            score,
        })
        .collect::<Vec<_>>();

    match &args.output {
        Some(path) => {
            create_parent_dir(path)?;
            let file = std::fs::File::create(path)
                .with_context(|| format!("Could not create {}", path.display()))?;
            log::info!("Writing ranks to {}", path.display());
            args.fmt.write(BufWriter::new(file), &rows, args.precision)?;
        }
        None => {
            args.fmt
                .write(BufWriter::new(std::io::stdout().lock()), &rows, args.precision)?;
        }
    }

    pool.shutdown();
    Ok(())
}
