// Copyright 2025 Cowboy AI, LLC.

//! The workflow graph value object

use crate::errors::{DomainError, DomainResult};
use crate::identifiers::NodeId;
use crate::workflow::edge::WorkflowEdge;
use crate::workflow::node::WorkflowNode;
use crate::workflow::policy::{ErrorHandlingPolicy, WorkflowTrigger, WorkflowVariable};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// A workflow as authored in the visual editor
///
/// Nodes keep their declaration order, which is also the tie-break order for
/// [`WorkflowGraph::topological_sort`]. Structural rules are only enforced by
/// [`WorkflowGraph::validate`]; a draft may be invalid while it is edited.
///
/// # Examples
///
/// ```rust
/// use cim_service_definition::workflow::{NodeType, WorkflowEdge, WorkflowGraph, WorkflowNode};
///
/// let graph = WorkflowGraph::new()
///     .with_node(WorkflowNode::new("fetch", NodeType::Activity, "Fetch order"))
///     .with_node(WorkflowNode::new("notify", NodeType::Activity, "Notify customer"))
///     .with_edge(WorkflowEdge::new("e1", "fetch", "notify"));
///
/// assert!(graph.validate().is_ok());
/// assert_eq!(graph.topological_sort().unwrap().len(), 2);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct WorkflowGraph {
    /// Nodes in declaration order
    #[serde(default)]
    pub nodes: Vec<WorkflowNode>,
    /// Edges in declaration order
    #[serde(default)]
    pub edges: Vec<WorkflowEdge>,
    /// Declared variables
    #[serde(default)]
    pub variables: Vec<WorkflowVariable>,
    /// Ways to start a run
    #[serde(default)]
    pub triggers: Vec<WorkflowTrigger>,
    /// What happens when a node fails
    #[serde(default)]
    pub error_policy: ErrorHandlingPolicy,
}

impl WorkflowGraph {
    /// An empty graph
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: append a node without checks
    pub fn with_node(mut self, node: WorkflowNode) -> Self {
        self.nodes.push(node);
        self
    }

    /// Builder: append an edge without checks
    pub fn with_edge(mut self, edge: WorkflowEdge) -> Self {
        self.edges.push(edge);
        self
    }

    /// Builder: append a variable
    pub fn with_variable(mut self, variable: WorkflowVariable) -> Self {
        self.variables.push(variable);
        self
    }

    /// Builder: append a trigger
    pub fn with_trigger(mut self, trigger: WorkflowTrigger) -> Self {
        self.triggers.push(trigger);
        self
    }

    /// Builder: replace the error policy
    pub fn with_error_policy(mut self, policy: ErrorHandlingPolicy) -> Self {
        self.error_policy = policy;
        self
    }

    /// Add a node, rejecting a duplicate id
    pub fn add_node(&mut self, node: WorkflowNode) -> DomainResult<()> {
        if self.contains_node(&node.id) {
            return Err(DomainError::DuplicateNodeId { node_id: node.id });
        }
        self.nodes.push(node);
        Ok(())
    }

    /// Add an edge; references are checked by validation
    pub fn add_edge(&mut self, edge: WorkflowEdge) {
        self.edges.push(edge);
    }

    /// Look up a node; absence is a normal outcome
    pub fn node(&self, id: &NodeId) -> Option<&WorkflowNode> {
        self.nodes.iter().find(|node| &node.id == id)
    }

    /// Whether a node with this id exists
    pub fn contains_node(&self, id: &NodeId) -> bool {
        self.node(id).is_some()
    }

    /// Edges leaving `id`, in declaration order
    pub fn outgoing_edges(&self, id: &NodeId) -> Vec<&WorkflowEdge> {
        self.edges.iter().filter(|edge| &edge.source == id).collect()
    }

    /// Edges entering `id`, in declaration order
    pub fn incoming_edges(&self, id: &NodeId) -> Vec<&WorkflowEdge> {
        self.edges.iter().filter(|edge| &edge.target == id).collect()
    }

    /// Nodes with no incoming edge
    pub fn entry_nodes(&self) -> Vec<&WorkflowNode> {
        self.nodes
            .iter()
            .filter(|node| !self.edges.iter().any(|edge| edge.target == node.id))
            .collect()
    }

    /// Nodes with no outgoing edge
    pub fn terminal_nodes(&self) -> Vec<&WorkflowNode> {
        self.nodes
            .iter()
            .filter(|node| !self.edges.iter().any(|edge| edge.source == node.id))
            .collect()
    }

    /// Number of nodes
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of edges
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// True when the graph has no nodes
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::node::NodeType;

    fn diamond() -> WorkflowGraph {
        WorkflowGraph::new()
            .with_node(WorkflowNode::new("start", NodeType::Activity, "Start"))
            .with_node(WorkflowNode::new("left", NodeType::Activity, "Left"))
            .with_node(WorkflowNode::new("right", NodeType::Activity, "Right"))
            .with_node(WorkflowNode::new("join", NodeType::Activity, "Join"))
            .with_edge(WorkflowEdge::new("e1", "start", "left"))
            .with_edge(WorkflowEdge::new("e2", "start", "right"))
            .with_edge(WorkflowEdge::new("e3", "left", "join"))
            .with_edge(WorkflowEdge::new("e4", "right", "join"))
    }

    #[test]
    fn test_node_lookup() {
        let graph = diamond();
        assert_eq!(graph.node(&NodeId::from("left")).unwrap().label, "Left");
        assert!(graph.node(&NodeId::from("missing")).is_none());
    }

    #[test]
    fn test_edge_queries() {
        let graph = diamond();
        let out: Vec<_> = graph
            .outgoing_edges(&NodeId::from("start"))
            .iter()
            .map(|edge| edge.id.as_str())
            .collect();
        assert_eq!(out, vec!["e1", "e2"]);
        assert_eq!(graph.incoming_edges(&NodeId::from("join")).len(), 2);
        assert!(graph.outgoing_edges(&NodeId::from("join")).is_empty());
    }

    #[test]
    fn test_entry_and_terminal_nodes() {
        let graph = diamond();
        let entries: Vec<_> = graph.entry_nodes().iter().map(|n| n.id.as_str()).collect();
        let terminals: Vec<_> = graph.terminal_nodes().iter().map(|n| n.id.as_str()).collect();
        assert_eq!(entries, vec!["start"]);
        assert_eq!(terminals, vec!["join"]);
    }

    #[test]
    fn test_add_node_rejects_duplicates() {
        let mut graph = diamond();
        let err = graph
            .add_node(WorkflowNode::new("left", NodeType::Wait, "Again"))
            .unwrap_err();
        assert_eq!(
            err,
            DomainError::DuplicateNodeId {
                node_id: NodeId::from("left")
            }
        );
        assert_eq!(graph.node_count(), 4);
    }

    #[test]
    fn test_missing_sections_default_when_parsing() {
        let graph: WorkflowGraph = serde_json::from_str(r#"{"nodes": []}"#).unwrap();
        assert!(graph.is_empty());
        assert_eq!(graph.edge_count(), 0);
        assert_eq!(graph.error_policy, ErrorHandlingPolicy::default());
    }
}
