// src/resolver/graph.rs

//! Arena dependency graph and nearest-wins flattening
//!
//! Nodes live in a flat arena addressed by index, built with an explicit
//! work stack rather than recursion so deep graphs cannot overflow the call
//! stack. The graph exists only for the duration of one resolution; it is
//! discarded after flattening.

use crate::dependency::Dependency;
use crate::notation::ArtifactKey;
use std::collections::HashMap;

#[derive(Debug)]
pub(crate) struct GraphNode {
    pub dependency: Dependency,
    pub depth: usize,
    pub children: Vec<usize>,
}

/// Dependency tree produced during collection
#[derive(Debug, Default)]
pub(crate) struct DependencyGraph {
    nodes: Vec<GraphNode>,
    roots: Vec<usize>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_root(&mut self, dependency: Dependency) -> usize {
        let index = self.nodes.len();
        self.nodes.push(GraphNode {
            dependency,
            depth: 0,
            children: Vec::new(),
        });
        self.roots.push(index);
        index
    }

    pub fn add_child(&mut self, parent: usize, dependency: Dependency) -> usize {
        let index = self.nodes.len();
        let depth = self.nodes[parent].depth + 1;
        self.nodes.push(GraphNode {
            dependency,
            depth,
            children: Vec::new(),
        });
        self.nodes[parent].children.push(index);
        index
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Flatten to the deduplicated, ordered dependency sequence
    ///
    /// Preorder traversal (parent before children, children in declared
    /// order). When an artifact key recurs, the occurrence at the smallest
    /// depth survives; at equal depth the first-discovered occurrence wins.
    /// Survivors keep their preorder positions.
    pub fn flatten(&self) -> Vec<Dependency> {
        // Preorder walk with an explicit stack
        let mut preorder: Vec<usize> = Vec::with_capacity(self.nodes.len());
        let mut stack: Vec<usize> = self.roots.iter().rev().copied().collect();
        while let Some(index) = stack.pop() {
            preorder.push(index);
            stack.extend(self.nodes[index].children.iter().rev());
        }

        // position-in-preorder of the surviving occurrence per key
        let mut winners: HashMap<ArtifactKey, (usize, usize)> = HashMap::new();
        for (position, &index) in preorder.iter().enumerate() {
            let key = self.nodes[index].dependency.coordinate.key();
            let depth = self.nodes[index].depth;
            match winners.get(&key) {
                Some(&(_, winning_depth)) if winning_depth <= depth => {}
                _ => {
                    winners.insert(key, (position, depth));
                }
            }
        }

        let mut surviving: Vec<usize> = winners.values().map(|&(position, _)| position).collect();
        surviving.sort_unstable();
        surviving
            .into_iter()
            .map(|position| self.nodes[preorder[position]].dependency.clone())
            .collect()
    }
}
