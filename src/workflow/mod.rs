// Copyright 2025 Cowboy AI, LLC.

//! Workflow graph value object
//!
//! A workflow is a DAG of typed nodes. This module owns its document shape
//! (what the visual editor submits), structural validation, cycle detection
//! and deterministic topological ordering. Nothing here executes a node.
//!
//! ```mermaid
//! graph LR
//!     T[triggers] --> A[activity]
//!     A --> D{decision}
//!     D -->|approved| H[human_task]
//!     D -->|rejected| W[wait]
//! ```

mod edge;
mod graph;
mod node;
mod policy;
mod validation;

pub use edge::{EdgeCondition, WorkflowEdge};
pub use graph::WorkflowGraph;
pub use node::{
    ActivityConfig, AiActionConfig, AutomationConfig, ConfigMap, DataMapping, DecisionConfig,
    HumanTaskConfig, NodeKind, NodeType, ParallelConfig, Position, RetryPolicy, SubflowConfig,
    WaitConfig, WaitType, WorkflowNode,
};
pub use policy::{
    ErrorHandlingPolicy, ErrorMode, TriggerType, VariableType, WorkflowTrigger, WorkflowVariable,
};

/// JSON Schema of the workflow document accepted from authoring clients
pub fn workflow_graph_schema() -> schemars::schema::RootSchema {
    schemars::schema_for!(WorkflowGraph)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_describes_graph_sections() {
        let schema = serde_json::to_value(workflow_graph_schema()).unwrap();
        let properties = &schema["properties"];
        for section in ["nodes", "edges", "variables", "triggers", "error_policy"] {
            assert!(properties.get(section).is_some(), "missing {section}");
        }
    }
}
