//! Module requirement graph built during the fetch loop

use std::collections::HashMap;

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;

use crate::module_path::ModulePath;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleNode {
    pub path: ModulePath,
    pub version: String,
}

/// Directed graph with an edge `a -> b` when module `a` requires `b`.
#[derive(Debug, Default)]
pub struct ModuleGraph {
    graph: DiGraph<ModuleNode, ()>,
    indices: HashMap<ModulePath, NodeIndex>,
}

impl ModuleGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a module, or returns the existing node. The first version seen wins.
    pub fn add_module(&mut self, path: &ModulePath, version: &str) -> NodeIndex {
        if let Some(&idx) = self.indices.get(path) {
            return idx;
        }
        let idx = self.graph.add_node(ModuleNode {
            path: path.clone(),
            version: version.to_string(),
        });
        self.indices.insert(path.clone(), idx);
        idx
    }

    /// Records that `from` requires `to`. Returns true if `to` was not known yet.
    pub fn add_requirement(&mut self, from: &ModulePath, to: &ModulePath, version: &str) -> bool {
        let is_new = !self.indices.contains_key(to);
        let to_idx = self.add_module(to, version);
        if let Some(&from_idx) = self.indices.get(from) {
            if self.graph.find_edge(from_idx, to_idx).is_none() {
                self.graph.add_edge(from_idx, to_idx, ());
            }
        }
        is_new
    }

    pub fn contains(&self, path: &ModulePath) -> bool {
        self.indices.contains_key(path)
    }

    pub fn version_of(&self, path: &ModulePath) -> Option<&str> {
        self.indices
            .get(path)
            .map(|&idx| self.graph[idx].version.as_str())
    }

    /// Modules that require `path`, sorted.
    pub fn required_by(&self, path: &ModulePath) -> Vec<&ModulePath> {
        self.neighbors(path, Direction::Incoming)
    }

    /// Modules that `path` requires, sorted.
    pub fn requirements_of(&self, path: &ModulePath) -> Vec<&ModulePath> {
        self.neighbors(path, Direction::Outgoing)
    }

    fn neighbors(&self, path: &ModulePath, direction: Direction) -> Vec<&ModulePath> {
        let Some(&idx) = self.indices.get(path) else {
            return Vec::new();
        };
        let mut out: Vec<&ModulePath> = self
            .graph
            .neighbors_directed(idx, direction)
            .map(|n| &self.graph[n].path)
            .collect();
        out.sort();
        out
    }

    /// Every module, sorted by path.
    pub fn modules(&self) -> Vec<&ModuleNode> {
        let mut nodes: Vec<&ModuleNode> = self.graph.node_weights().collect();
        nodes.sort_by(|a, b| a.path.cmp(&b.path));
        nodes
    }

    pub fn len(&self) -> usize {
        self.graph.node_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_required_by() {
        let app = ModulePath::new("example.com/app");
        let lib = ModulePath::new("example.com/lib");
        let util = ModulePath::new("example.com/util");

        let mut graph = ModuleGraph::new();
        graph.add_module(&app, "v1.0.0");
        assert!(graph.add_requirement(&app, &lib, "v0.2.0"));
        assert!(graph.add_requirement(&app, &util, "v0.1.0"));
        assert!(!graph.add_requirement(&lib, &util, "v0.3.0"));

        assert_eq!(graph.required_by(&util), vec![&app, &lib]);
        assert_eq!(graph.requirements_of(&app), vec![&lib, &util]);
        assert_eq!(graph.version_of(&util), Some("v0.1.0"));
        assert_eq!(graph.len(), 3);
    }

    #[test]
    fn test_duplicate_edges_collapse() {
        let a = ModulePath::new("a.io/a");
        let b = ModulePath::new("a.io/b");
        let mut graph = ModuleGraph::new();
        graph.add_module(&a, "v1");
        graph.add_requirement(&a, &b, "v1");
        graph.add_requirement(&a, &b, "v1");
        assert_eq!(graph.required_by(&b).len(), 1);
        assert!(graph.required_by(&ModulePath::new("missing.io/x")).is_empty());
    }
}
