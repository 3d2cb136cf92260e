/*
 * SPDX-FileCopyrightText: 2026 The rankprop authors
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

#![doc = include_str!("../README.md")]
// for now we don't need any new feature but we might remove this in the future
#![deny(unstable_features)]
#![deny(trivial_casts)]
#![deny(unconditional_recursion)]
#![deny(clippy::empty_loop)]
#![deny(unreachable_code)]
#![deny(unreachable_pub)]
#![deny(unreachable_patterns)]
#![deny(unused_macro_rules)]
#![deny(unused_doc_comments)]
#![allow(clippy::type_complexity)]

pub mod adjacency;
pub mod graph;
pub mod id_map;
pub mod pool;
pub mod rank;
pub mod store;
pub mod utils;

#[cfg(feature = "cli")]
pub mod cli;

/// Prelude module to import everything from this crate
pub mod prelude {
    pub use crate::adjacency::*;
    pub use crate::graph::*;
    pub use crate::id_map::*;
    pub use crate::pool::*;
    pub use crate::rank::*;
    pub use crate::store::*;
    pub use crate::utils::*;
}
