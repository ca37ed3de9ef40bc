// Copyright 2025 Cowboy AI, LLC.

//! Structural validation, cycle detection and ordering for workflow graphs
//!
//! All three operations are pure and run in time linear in nodes plus edges.
//! Edges whose endpoints do not resolve are skipped by the traversal helpers;
//! [`WorkflowGraph::validate`] reports them before any traversal happens.

use crate::errors::{DomainError, DomainResult};
use crate::identifiers::NodeId;
use crate::workflow::graph::WorkflowGraph;
use indexmap::IndexMap;
use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashSet};

/// Declaration-ordered node index plus successor lists
struct Adjacency<'a> {
    index: IndexMap<&'a NodeId, usize>,
    successors: Vec<Vec<usize>>,
}

impl<'a> Adjacency<'a> {
    fn build(graph: &'a WorkflowGraph) -> Self {
        let mut index = IndexMap::with_capacity(graph.nodes.len());
        for node in &graph.nodes {
            let next = index.len();
            index.entry(&node.id).or_insert(next);
        }

        let mut successors = vec![Vec::new(); index.len()];
        for edge in &graph.edges {
            if let (Some(&from), Some(&to)) = (index.get(&edge.source), index.get(&edge.target)) {
                successors[from].push(to);
            }
        }

        Self { index, successors }
    }

    fn len(&self) -> usize {
        self.index.len()
    }

    fn id(&self, position: usize) -> Option<&'a NodeId> {
        self.index.get_index(position).map(|(id, _)| *id)
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Color {
    Unvisited,
    InProgress,
    Done,
}

impl WorkflowGraph {
    /// Check every structural invariant, stopping at the first failure
    ///
    /// Order: non-empty, unique node ids, resolvable edge endpoints, no
    /// self-loops, acyclic, decision branching, recognized error policy.
    pub fn validate(&self) -> DomainResult<()> {
        if self.nodes.is_empty() {
            return Err(DomainError::EmptyWorkflow);
        }

        let adjacency = Adjacency::build(self);
        if adjacency.len() != self.nodes.len() {
            let mut seen = HashSet::new();
            if let Some(node) = self.nodes.iter().find(|node| !seen.insert(&node.id)) {
                return Err(DomainError::DuplicateNodeId {
                    node_id: node.id.clone(),
                });
            }
        }

        for edge in &self.edges {
            for endpoint in [&edge.source, &edge.target] {
                if !adjacency.index.contains_key(endpoint) {
                    return Err(DomainError::InvalidEdge {
                        edge_id: edge.id.clone(),
                        node_id: endpoint.clone(),
                    });
                }
            }
        }

        if let Some(edge) = self.edges.iter().find(|edge| edge.is_self_loop()) {
            return Err(DomainError::SelfReferencingEdge {
                edge_id: edge.id.clone(),
                node_id: edge.source.clone(),
            });
        }

        if detect_cycle(&adjacency) {
            return Err(DomainError::CyclicWorkflow);
        }

        for node in self.nodes.iter().filter(|node| node.is_decision()) {
            let branches = adjacency
                .index
                .get(&node.id)
                .map(|&position| adjacency.successors[position].len())
                .unwrap_or_default();
            if branches < 2 {
                return Err(DomainError::DecisionNeedsMultipleBranches {
                    node_id: node.id.clone(),
                    branches,
                });
            }
        }

        self.error_policy.mode()?;

        Ok(())
    }

    /// True iff the edge relation contains a directed cycle
    ///
    /// Every node is used as a DFS root, so a cycle in a component that is
    /// unreachable from the entry nodes is still found.
    pub fn has_cycle(&self) -> bool {
        detect_cycle(&Adjacency::build(self))
    }

    /// Order nodes so every edge points forward
    ///
    /// Kahn's algorithm. Among nodes that are ready at the same time the one
    /// declared first wins, so identical graphs always yield identical orders.
    pub fn topological_sort(&self) -> DomainResult<Vec<NodeId>> {
        let adjacency = Adjacency::build(self);

        let mut in_degree = vec![0usize; adjacency.len()];
        for targets in &adjacency.successors {
            for &target in targets {
                in_degree[target] += 1;
            }
        }

        let mut ready: BinaryHeap<Reverse<usize>> = in_degree
            .iter()
            .enumerate()
            .filter(|(_, degree)| **degree == 0)
            .map(|(position, _)| Reverse(position))
            .collect();

        let mut order = Vec::with_capacity(adjacency.len());
        while let Some(Reverse(position)) = ready.pop() {
            if let Some(id) = adjacency.id(position) {
                order.push(id.clone());
            }
            for &next in &adjacency.successors[position] {
                in_degree[next] -= 1;
                if in_degree[next] == 0 {
                    ready.push(Reverse(next));
                }
            }
        }

        if order.len() < adjacency.len() {
            return Err(DomainError::CyclicWorkflow);
        }
        Ok(order)
    }
}

/// Iterative three-color DFS over every root
fn detect_cycle(adjacency: &Adjacency<'_>) -> bool {
    let mut color = vec![Color::Unvisited; adjacency.len()];
    let mut stack: Vec<(usize, usize)> = Vec::new();

    for root in 0..adjacency.len() {
        if color[root] != Color::Unvisited {
            continue;
        }
        color[root] = Color::InProgress;
        stack.push((root, 0));

        while let Some((node, cursor)) = stack.pop() {
            match adjacency.successors[node].get(cursor) {
                Some(&next) => {
                    stack.push((node, cursor + 1));
                    match color[next] {
                        Color::InProgress => return true,
                        Color::Unvisited => {
                            color[next] = Color::InProgress;
                            stack.push((next, 0));
                        }
                        Color::Done => {}
                    }
                }
                None => color[node] = Color::Done,
            }
        }
    }

    false
}
