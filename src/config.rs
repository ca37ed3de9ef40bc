// Copyright 2025 Cowboy AI, LLC.

//! Engine configuration
//!
//! Loaded from JSON. Every field has a default, so an empty document (`{}`)
//! is a valid configuration.

use crate::workflow::WorkflowGraph;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Errors raised while loading or checking configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read
    #[error("failed to read configuration: {0}")]
    Io(#[from] std::io::Error),

    /// The document is not valid configuration JSON
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] serde_json::Error),

    /// A value is out of range
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// A graph exceeded one of the configured size bounds
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("workflow has {actual} {dimension}, limit is {limit}")]
pub struct LimitExceeded {
    /// Which collection overflowed (nodes, edges, variables, triggers)
    pub dimension: &'static str,
    /// Submitted size
    pub actual: usize,
    /// Configured maximum
    pub limit: usize,
}

/// Upper bounds on submitted graphs
///
/// Validation is linear in graph size, but untrusted documents still need a
/// ceiling before they reach the aggregate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphLimits {
    /// Maximum number of nodes
    pub max_nodes: usize,
    /// Maximum number of edges
    pub max_edges: usize,
    /// Maximum number of declared variables
    pub max_variables: usize,
    /// Maximum number of triggers
    pub max_triggers: usize,
}

impl Default for GraphLimits {
    fn default() -> Self {
        Self {
            max_nodes: 500,
            max_edges: 2000,
            max_variables: 200,
            max_triggers: 20,
        }
    }
}

impl GraphLimits {
    /// Reject a graph that is larger than allowed in any dimension
    pub fn check(&self, graph: &WorkflowGraph) -> Result<(), LimitExceeded> {
        let dimensions = [
            ("nodes", graph.nodes.len(), self.max_nodes),
            ("edges", graph.edges.len(), self.max_edges),
            ("variables", graph.variables.len(), self.max_variables),
            ("triggers", graph.triggers.len(), self.max_triggers),
        ];
        match dimensions
            .into_iter()
            .find(|(_, actual, limit)| actual > limit)
        {
            Some((dimension, actual, limit)) => Err(LimitExceeded {
                dimension,
                actual,
                limit,
            }),
            None => Ok(()),
        }
    }
}

/// Top-level engine configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Size bounds enforced before a graph reaches the aggregate
    pub limits: GraphLimits,

    /// Ask the runtime for live instances before archiving
    pub require_zero_instances_for_archive: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            limits: GraphLimits::default(),
            require_zero_instances_for_archive: true,
        }
    }
}

impl EngineConfig {
    /// Parse and validate a JSON document
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json(&raw)
    }

    /// Check that every limit allows at least a one-node workflow
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.limits.max_nodes == 0 {
            return Err(ConfigError::Invalid(
                "limits.max_nodes must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
