// src/dag/filter.rs

//! Incremental filter: decides which nodes of a graph run this time.

use std::collections::HashSet;

use tracing::{debug, info};

use crate::dag::graph::{Graph, NodeName};
use crate::errors::NoWorkError;
use crate::types::SubmitMode;

/// Names of the nodes to include for `mode`.
///
/// - [`SubmitMode::All`] includes every node.
/// - [`SubmitMode::Incremental`] includes exactly the nodes with
///   `needs_execution = true`. Unchanged ancestors are not pulled back in;
///   their prior outputs count as satisfied inputs.
///
/// An empty selection is reported as [`NoWorkError`].
pub fn filter(graph: &Graph, mode: SubmitMode) -> Result<HashSet<NodeName>, NoWorkError> {
    let included: HashSet<NodeName> = match mode {
        SubmitMode::All => graph.names().map(str::to_string).collect(),
        SubmitMode::Incremental => graph
            .nodes()
            .filter(|n| n.needs_execution)
            .map(|n| n.name.clone())
            .collect(),
    };

    if included.is_empty() {
        info!(%mode, "filter selected no nodes");
        return Err(NoWorkError { mode });
    }

    debug!(
        %mode,
        included = included.len(),
        total = graph.len(),
        "filtered graph"
    );
    Ok(included)
}

/// [`filter`] followed by [`Graph::restrict`].
pub fn filtered_graph(graph: &Graph, mode: SubmitMode) -> Result<Graph, NoWorkError> {
    let included = filter(graph, mode)?;
    Ok(graph.restrict(&included))
}
