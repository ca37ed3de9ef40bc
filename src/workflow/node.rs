// Copyright 2025 Cowboy AI, LLC.

//! Workflow nodes and their type-specific configuration
//!
//! A node's behavior is chosen by its type tag and described by a config
//! payload whose shape depends on that tag. The engine only ever inspects the
//! tag; payloads are carried for the execution collaborator.

use crate::identifiers::NodeId;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Extra configuration keys preserved verbatim
pub type ConfigMap = BTreeMap<String, Value>;

/// The closed set of node types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum NodeType {
    /// Runs a registered activity
    Activity,
    /// Starts another service workflow as a child
    Subflow,
    /// Calls the LLM inference gateway
    AiAction,
    /// Calls the external automation engine
    Automation,
    /// Branches on a condition
    Decision,
    /// Splits into concurrent branches
    Parallel,
    /// Waits on a timer or a signal
    Wait,
    /// Hands work to a person
    HumanTask,
}

impl NodeType {
    /// Wire name of this node type
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeType::Activity => "activity",
            NodeType::Subflow => "subflow",
            NodeType::AiAction => "ai_action",
            NodeType::Automation => "automation",
            NodeType::Decision => "decision",
            NodeType::Parallel => "parallel",
            NodeType::Wait => "wait",
            NodeType::HumanTask => "human_task",
        }
    }
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Data flow settings shared by every node type
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct DataMapping {
    /// Workflow variable to node input bindings
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub input_mapping: BTreeMap<String, String>,
    /// Variable receiving the node's result
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_variable: Option<String>,
}

/// Configuration of an `activity` node
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ActivityConfig {
    /// Registered activity name
    #[serde(default)]
    pub activity_name: String,
    /// Input and output bindings
    #[serde(flatten)]
    pub mapping: DataMapping,
    /// Unrecognized keys
    #[serde(flatten)]
    pub extra: ConfigMap,
}

/// Configuration of a `subflow` node
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SubflowConfig {
    /// Child workflow to start
    #[serde(default)]
    pub workflow_id: String,
    /// Input and output bindings
    #[serde(flatten)]
    pub mapping: DataMapping,
    /// Unrecognized keys
    #[serde(flatten)]
    pub extra: ConfigMap,
}

/// Configuration of an `ai_action` node
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct AiActionConfig {
    /// Inference provider
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    /// Model name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    /// Prompt template with variable placeholders
    #[serde(default)]
    pub prompt_template: String,
    /// Sampling temperature
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    /// Completion token cap
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    /// Route to a locally hosted model
    #[serde(default)]
    pub use_local_model: bool,
    /// Input and output bindings
    #[serde(flatten)]
    pub mapping: DataMapping,
    /// Unrecognized keys
    #[serde(flatten)]
    pub extra: ConfigMap,
}

/// Configuration of an `automation` node
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct AutomationConfig {
    /// Workflow id inside the automation engine
    #[serde(default)]
    pub automation_workflow_id: String,
    /// Webhook path used to trigger it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub webhook_path: Option<String>,
    /// Input and output bindings
    #[serde(flatten)]
    pub mapping: DataMapping,
    /// Unrecognized keys
    #[serde(flatten)]
    pub extra: ConfigMap,
}

/// Configuration of a `decision` node
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct DecisionConfig {
    /// Expression evaluated at runtime
    #[serde(default)]
    pub condition: String,
    /// Branch labels, informational only
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub branches: Vec<String>,
    /// Unrecognized keys
    #[serde(flatten)]
    pub extra: ConfigMap,
}

/// Configuration of a `parallel` node
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ParallelConfig {
    /// Branch labels, informational only
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub branches: Vec<String>,
    /// Unrecognized keys
    #[serde(flatten)]
    pub extra: ConfigMap,
}

/// What a `wait` node waits for
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum WaitType {
    /// A fixed duration
    #[default]
    Timer,
    /// A named external signal
    Signal,
}

/// Configuration of a `wait` node
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct WaitConfig {
    /// Timer or signal
    #[serde(default)]
    pub wait_type: WaitType,
    /// Timer length
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_seconds: Option<u64>,
    /// Signal name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signal_name: Option<String>,
    /// Unrecognized keys
    #[serde(flatten)]
    pub extra: ConfigMap,
}

/// Configuration of a `human_task` node
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct HumanTaskConfig {
    /// Kind of task, e.g. approval or review
    #[serde(default)]
    pub task_type: String,
    /// Form rendered to the assignee
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub form_schema: Option<Value>,
    /// Input and output bindings
    #[serde(flatten)]
    pub mapping: DataMapping,
    /// Unrecognized keys
    #[serde(flatten)]
    pub extra: ConfigMap,
}

/// Node type tag plus its type-specific configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "type", content = "config", rename_all = "snake_case")]
pub enum NodeKind {
    /// Activity node
    Activity(ActivityConfig),
    /// Subflow node
    Subflow(SubflowConfig),
    /// AI action node
    AiAction(AiActionConfig),
    /// Automation node
    Automation(AutomationConfig),
    /// Decision node
    Decision(DecisionConfig),
    /// Parallel split node
    Parallel(ParallelConfig),
    /// Wait node
    Wait(WaitConfig),
    /// Human task node
    HumanTask(HumanTaskConfig),
}

impl NodeKind {
    /// The payload-free type tag
    pub fn node_type(&self) -> NodeType {
        match self {
            NodeKind::Activity(_) => NodeType::Activity,
            NodeKind::Subflow(_) => NodeType::Subflow,
            NodeKind::AiAction(_) => NodeType::AiAction,
            NodeKind::Automation(_) => NodeType::Automation,
            NodeKind::Decision(_) => NodeType::Decision,
            NodeKind::Parallel(_) => NodeType::Parallel,
            NodeKind::Wait(_) => NodeType::Wait,
            NodeKind::HumanTask(_) => NodeType::HumanTask,
        }
    }

    /// Default configuration for a node type
    pub fn empty(node_type: NodeType) -> Self {
        match node_type {
            NodeType::Activity => NodeKind::Activity(ActivityConfig::default()),
            NodeType::Subflow => NodeKind::Subflow(SubflowConfig::default()),
            NodeType::AiAction => NodeKind::AiAction(AiActionConfig::default()),
            NodeType::Automation => NodeKind::Automation(AutomationConfig::default()),
            NodeType::Decision => NodeKind::Decision(DecisionConfig::default()),
            NodeType::Parallel => NodeKind::Parallel(ParallelConfig::default()),
            NodeType::Wait => NodeKind::Wait(WaitConfig::default()),
            NodeType::HumanTask => NodeKind::HumanTask(HumanTaskConfig::default()),
        }
    }
}

/// Authoring-UI coordinates
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Position {
    /// Horizontal offset
    pub x: f64,
    /// Vertical offset
    pub y: f64,
}

/// Retry behavior handed to the execution collaborator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct RetryPolicy {
    /// Total attempts including the first
    pub max_attempts: u32,
    /// Delay before the first retry
    pub initial_interval_ms: u64,
    /// Multiplier applied after each retry
    pub backoff_coefficient: f64,
    /// Upper bound on the delay
    pub max_interval_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_interval_ms: 1_000,
            backoff_coefficient: 2.0,
            max_interval_ms: 60_000,
        }
    }
}

/// A single node in a workflow graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct WorkflowNode {
    /// Unique within the graph
    pub id: NodeId,
    /// Display label
    #[serde(default)]
    pub label: String,
    /// Type tag and configuration
    #[serde(flatten)]
    pub kind: NodeKind,
    /// Editor position, ignored by validation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<Position>,
    /// Retry behavior
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry_policy: Option<RetryPolicy>,
    /// Execution timeout
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_seconds: Option<u64>,
}

impl WorkflowNode {
    /// Create a node with the default configuration for its type
    pub fn new(id: impl Into<NodeId>, node_type: NodeType, label: impl Into<String>) -> Self {
        Self::with_kind(id, NodeKind::empty(node_type), label)
    }

    /// Create a node from an explicit configuration
    pub fn with_kind(id: impl Into<NodeId>, kind: NodeKind, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            kind,
            position: None,
            retry_policy: None,
            timeout_seconds: None,
        }
    }

    /// Set the editor position
    pub fn at(mut self, x: f64, y: f64) -> Self {
        self.position = Some(Position { x, y });
        self
    }

    /// Attach a retry policy
    pub fn with_retry(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = Some(policy);
        self
    }

    /// Attach a timeout
    pub fn with_timeout(mut self, seconds: u64) -> Self {
        self.timeout_seconds = Some(seconds);
        self
    }

    /// The node's type tag
    pub fn node_type(&self) -> NodeType {
        self.kind.node_type()
    }

    /// Shorthand for decision nodes
    pub fn is_decision(&self) -> bool {
        self.node_type() == NodeType::Decision
    }
}
