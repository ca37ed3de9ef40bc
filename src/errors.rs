// Copyright 2025 Cowboy AI, LLC.

//! Error types for service definition operations

use crate::identifiers::{EdgeId, NodeId};
use thiserror::Error;

/// Errors raised by the workflow graph and the service definition aggregate
///
/// Every variant is a caller-correctable input problem. Structural variants
/// carry the offending node or edge so an editor can highlight it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    /// The workflow has no nodes
    #[error("workflow must have at least one node")]
    EmptyWorkflow,

    /// Two nodes share the same id
    #[error("node id {node_id} is declared more than once")]
    DuplicateNodeId {
        /// The repeated node id
        node_id: NodeId,
    },

    /// An edge references a node that does not exist
    #[error("edge {edge_id} references non-existent node {node_id}")]
    InvalidEdge {
        /// The dangling edge
        edge_id: EdgeId,
        /// The node id that could not be resolved
        node_id: NodeId,
    },

    /// An edge points back at its own source
    #[error("edge {edge_id} cannot connect node {node_id} to itself")]
    SelfReferencingEdge {
        /// The self-loop edge
        edge_id: EdgeId,
        /// The node on both ends
        node_id: NodeId,
    },

    /// The edge set contains a directed cycle
    #[error("workflow contains cycles")]
    CyclicWorkflow,

    /// A decision node has fewer than two outgoing edges
    #[error("decision node {node_id} requires at least 2 outgoing edges, found {branches}")]
    DecisionNeedsMultipleBranches {
        /// The malformed decision node
        node_id: NodeId,
        /// How many outgoing edges it has
        branches: usize,
    },

    /// The error policy names an unknown mode
    #[error("invalid error handling policy: {value}")]
    InvalidErrorPolicy {
        /// The rejected `on_error` value
        value: String,
    },

    /// Archived services accept no further transitions
    #[error("cannot publish archived service")]
    CannotPublishArchived,

    /// Archive is only reachable from deprecated
    #[error("cannot archive service in {status} status - deprecate first")]
    CannotArchiveFromNonDeprecated {
        /// Status the service was in
        status: String,
    },

    /// Generic illegal lifecycle move
    #[error("invalid status transition from {from} to {to}")]
    InvalidStatusTransition {
        /// Current status
        from: String,
        /// Attempted target status
        to: String,
    },

    /// The draft workflow is frozen outside of draft status
    #[error("can only modify workflow in draft status, service is {status}")]
    WorkflowNotEditable {
        /// Status the service was in
        status: String,
    },

    /// Archived services cannot receive new versions
    #[error("archived service cannot receive new versions")]
    ArchivedServiceImmutable,

    /// Service name outside the 3-100 character bounds
    #[error("service name must be 3-100 characters, got {length}")]
    InvalidServiceName {
        /// Length in characters of the rejected name
        length: usize,
    },
}

/// Result type for domain operations
pub type DomainResult<T> = Result<T, DomainError>;

impl DomainError {
    /// Check if this is a structural graph error
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            DomainError::EmptyWorkflow
                | DomainError::DuplicateNodeId { .. }
                | DomainError::InvalidEdge { .. }
                | DomainError::SelfReferencingEdge { .. }
                | DomainError::CyclicWorkflow
                | DomainError::DecisionNeedsMultipleBranches { .. }
                | DomainError::InvalidErrorPolicy { .. }
        )
    }

    /// Check if this is a lifecycle error
    pub fn is_lifecycle(&self) -> bool {
        matches!(
            self,
            DomainError::CannotPublishArchived
                | DomainError::CannotArchiveFromNonDeprecated { .. }
                | DomainError::InvalidStatusTransition { .. }
                | DomainError::WorkflowNotEditable { .. }
                | DomainError::ArchivedServiceImmutable
        )
    }

    /// Check if this is a validation error
    pub fn is_validation_error(&self) -> bool {
        self.is_structural() || matches!(self, DomainError::InvalidServiceName { .. })
    }

    /// The node an editor should highlight, if any
    pub fn offending_node(&self) -> Option<&NodeId> {
        match self {
            DomainError::DuplicateNodeId { node_id }
            | DomainError::InvalidEdge { node_id, .. }
            | DomainError::SelfReferencingEdge { node_id, .. }
            | DomainError::DecisionNeedsMultipleBranches { node_id, .. } => Some(node_id),
            _ => None,
        }
    }

    /// The edge an editor should highlight, if any
    pub fn offending_edge(&self) -> Option<&EdgeId> {
        match self {
            DomainError::InvalidEdge { edge_id, .. }
            | DomainError::SelfReferencingEdge { edge_id, .. } => Some(edge_id),
            _ => None,
        }
    }
}
