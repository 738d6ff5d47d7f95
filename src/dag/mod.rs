// src/dag/mod.rs

//! Task graph model and the incremental filter.
//!
//! - [`graph`] holds the immutable, declaration-ordered task graph with its
//!   deterministic topological order and subgraph restriction.
//! - [`filter`] selects the nodes that must execute for a given mode.

pub mod filter;
pub mod graph;

pub use filter::{filter, filtered_graph};
pub use graph::{Graph, Node, NodeName};
