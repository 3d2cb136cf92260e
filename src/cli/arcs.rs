/*
 * SPDX-FileCopyrightText: 2026 The rankprop authors
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! Reading labelled, weighted arc lists.

use super::ArcsArgs;
use crate::graph::MemGraph;
use anyhow::{Context, Result};
use dsi_progress_logger::ProgressLog;
use std::collections::HashMap;
use std::io::BufRead;

/// The relationship type of arcs read from a list.
pub const REL_TYPE: &str = "ARC";
/// The property holding the weight of arcs read from a list.
pub const WEIGHT_PROPERTY: &str = "weight";

/// A graph read from an arc list, with node labels in appearance order.
#[derive(Debug, Clone)]
pub struct LabeledGraph {
    pub graph: MemGraph<usize>,
    pub labels: Vec<String>,
}

/// Reads a list of arcs, one per line.
///
/// Labels are turned into node identifiers in appearance order. Lines with
/// too few columns are skipped with a warning; a weight that cannot be
/// parsed is an error. Arcs whose line lacks the weight column have no
/// weight property.
pub fn read_arcs(
    args: &ArcsArgs,
    reader: impl BufRead,
    pl: &mut impl ProgressLog,
) -> Result<LabeledGraph> {
    let mut graph = MemGraph::new();
    let mut labels = Vec::new();
    let mut index = HashMap::<String, usize>::new();
    let mut node = |label: &str| -> usize {
        if let Some(&id) = index.get(label) {
            return id;
        }
        let id = labels.len();
        labels.push(label.to_owned());
        index.insert(label.to_owned(), id);
        id
    };

    pl.item_name("arc");
    pl.expected_updates(args.max_arcs);
    pl.start("Reading arcs...");

    let needed = args.source_column.max(args.target_column);
    let mut num_arcs = 0;
    let mut skipped = 0;
    for (line_num, line) in reader.lines().enumerate() {
        if args.max_arcs.is_some_and(|max_arcs| num_arcs >= max_arcs) {
            break;
        }
        let line = line.with_context(|| format!("Could not read line {}", line_num + 1))?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with(args.line_comment_symbol) {
            continue;
        }
        if skipped < args.lines_to_skip {
            skipped += 1;
            continue;
        }

        let vals = trimmed.split(args.separator).collect::<Vec<_>>();
        if vals.len() <= needed {
            log::warn!(
                "Line {}: {:?} does not have enough columns: got {} columns but expected at least {} columns separated by {:?} (you can change the separator using the --separator option)",
                line_num + 1,
                line,
                vals.len(),
                needed + 1,
                args.separator,
            );
            continue;
        }

        let weight = match vals.get(args.weight_column) {
            Some(w) => Some(w.trim().parse::<f64>().with_context(|| {
                format!("Could not parse weight {:?} at line {}", w, line_num + 1)
            })?),
            None => None,
        };

        let src = node(vals[args.source_column].trim());
        let dst = node(vals[args.target_column].trim());
        graph.add_relationship(src, dst, REL_TYPE, weight.map(|w| (WEIGHT_PROPERTY, w)));
        num_arcs += 1;
        pl.light_update();
    }
    pl.done();

    log::info!("Arcs read: {} Nodes: {}", num_arcs, labels.len());
    Ok(LabeledGraph { graph, labels })
}
