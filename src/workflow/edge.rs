// Copyright 2025 Cowboy AI, LLC.

//! Directed edges between workflow nodes

use crate::identifiers::{EdgeId, NodeId};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Guard evaluated by the execution collaborator before following an edge
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct EdgeCondition {
    /// Expression over workflow variables
    pub expression: String,
    /// Label shown on the edge in the editor
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

/// A directed connection from `source` to `target`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct WorkflowEdge {
    /// Edge identifier
    pub id: EdgeId,
    /// Node the edge leaves
    pub source: NodeId,
    /// Node the edge enters
    pub target: NodeId,
    /// Optional guard
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<EdgeCondition>,
    /// Output port on multi-port source nodes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_handle: Option<String>,
    /// Input port on multi-port target nodes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_handle: Option<String>,
}

impl WorkflowEdge {
    /// Create an unconditional edge
    pub fn new(id: impl Into<EdgeId>, source: impl Into<NodeId>, target: impl Into<NodeId>) -> Self {
        Self {
            id: id.into(),
            source: source.into(),
            target: target.into(),
            condition: None,
            source_handle: None,
            target_handle: None,
        }
    }

    /// Attach a guard expression
    pub fn when(mut self, expression: impl Into<String>) -> Self {
        self.condition = Some(EdgeCondition {
            expression: expression.into(),
            label: None,
        });
        self
    }

    /// Route through specific ports
    pub fn via(mut self, source_handle: impl Into<String>, target_handle: impl Into<String>) -> Self {
        self.source_handle = Some(source_handle.into());
        self.target_handle = Some(target_handle.into());
        self
    }

    /// True when the edge starts and ends at the same node
    pub fn is_self_loop(&self) -> bool {
        self.source == self.target
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_self_loop_detection() {
        assert!(WorkflowEdge::new("e1", "a", "a").is_self_loop());
        assert!(!WorkflowEdge::new("e2", "a", "b").is_self_loop());
    }

    #[test]
    fn test_conditional_edge_serialization() {
        let edge = WorkflowEdge::new("yes", "check", "ship").when("stock > 0");
        let json = serde_json::to_value(&edge).unwrap();

        assert_eq!(json["condition"]["expression"], "stock > 0");
        assert!(json.get("source_handle").is_none());

        let back: WorkflowEdge = serde_json::from_value(json).unwrap();
        assert_eq!(back, edge);
    }
}
