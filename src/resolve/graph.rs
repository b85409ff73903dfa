//! Reachability over embedded dimension relationships.
//!
//! Embedded relationships form a directed graph between dimensions. The graph
//! may contain cycles (`A → B → C → A`), so traversal tracks the current path
//! and never revisits a dimension already on it. A dimension reached once is
//! not expanded again, so each node is explored at most once per call. Path
//! length is capped to keep pathological inputs from running away.

use std::collections::HashMap;

use indexmap::IndexSet;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;

use crate::error::{ConvertError, ConvertResult};
use crate::sml::Dimension;

/// Directed graph of dimensions joined by embedded relationships.
#[derive(Debug, Clone, Default)]
pub struct DimensionGraph {
    graph: DiGraph<String, ()>,
    nodes: HashMap<String, NodeIndex>,
}

impl DimensionGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the graph from the embedded relationships stored on dimensions.
    pub fn from_dimensions<'d>(dimensions: impl IntoIterator<Item = &'d Dimension>) -> Self {
        let mut graph = Self::new();
        for dimension in dimensions {
            graph.node(&dimension.unique_name);
            for relationship in &dimension.relationships {
                graph.add_edge(&dimension.unique_name, &relationship.to.dimension);
            }
        }
        graph
    }

    pub fn add_edge(&mut self, from: &str, to: &str) {
        let from = self.node(from);
        let to = self.node(to);
        self.graph.add_edge(from, to, ());
    }

    fn node(&mut self, name: &str) -> NodeIndex {
        if let Some(&index) = self.nodes.get(name) {
            return index;
        }
        let index = self.graph.add_node(name.to_string());
        self.nodes.insert(name.to_string(), index);
        index
    }

    /// Every dimension reachable from `start` through one or more edges, in
    /// depth-first discovery order. `start` itself is never included.
    ///
    /// Fails with [`ConvertError::RecursionLimit`] when a path grows longer
    /// than `max_depth` dimensions.
    pub fn reachable(&self, start: &str, max_depth: usize) -> ConvertResult<IndexSet<String>> {
        let mut found = IndexSet::new();
        let Some(&index) = self.nodes.get(start) else {
            return Ok(found);
        };
        let mut path = vec![index];
        self.visit(start, &mut path, &mut found, max_depth)?;
        Ok(found)
    }

    fn visit(
        &self,
        start: &str,
        path: &mut Vec<NodeIndex>,
        found: &mut IndexSet<String>,
        max_depth: usize,
    ) -> ConvertResult<()> {
        if path.len() > max_depth {
            return Err(ConvertError::RecursionLimit {
                start: start.to_string(),
                max_depth,
                path: path.iter().map(|&n| self.graph[n].clone()).collect(),
            });
        }

        let Some(&current) = path.last() else {
            return Ok(());
        };
        // petgraph yields the most recently added edge first.
        let mut targets: Vec<NodeIndex> = self.graph.edges(current).map(|e| e.target()).collect();
        targets.reverse();

        for target in targets {
            if path.contains(&target) || found.contains(&self.graph[target]) {
                continue;
            }
            found.insert(self.graph[target].clone());
            path.push(target);
            self.visit(start, path, found, max_depth)?;
            path.pop();
        }
        Ok(())
    }
}
