// Copyright 2025 Cowboy AI, LLC.

//! # CIM Service Definition
//!
//! Workflow definition and validation engine for tenant-authored services.
//!
//! A tenant describes a business process as a graph of typed nodes in a
//! visual editor. This crate owns everything about that description that can
//! be decided without running it:
//! - **WorkflowGraph**: the graph value object with structural validation,
//!   cycle detection and deterministic topological ordering
//! - **ServiceVersion**: immutable, numbered snapshots of validated graphs
//! - **ServiceDefinition**: the aggregate root holding the draft, the version
//!   history and the lifecycle state machine
//! - **Domain Events**: facts buffered by the aggregate and drained by the caller
//! - **Collaborators**: repository, event publisher and instance counter
//!   contracts with in-memory implementations, tied together by
//!   [`ServiceCommandHandler`]
//!
//! The aggregate is synchronous and performs no I/O. Persistence, publishing
//! and execution of a published graph are left to collaborators.
//!
//! ```rust
//! use cim_service_definition::workflow::{NodeType, WorkflowEdge, WorkflowGraph, WorkflowNode};
//! use cim_service_definition::{
//!     DomainError, ServiceCategory, ServiceDefinition, ServiceName, TenantId, UserId,
//! };
//!
//! let mut service = ServiceDefinition::create(
//!     TenantId::new(),
//!     ServiceName::new("Order Processing").unwrap(),
//!     "",
//!     ServiceCategory::Fulfillment,
//!     UserId::new(),
//! );
//! assert_eq!(service.publish(), Err(DomainError::EmptyWorkflow));
//!
//! let graph = WorkflowGraph::new()
//!     .with_node(WorkflowNode::new("a", NodeType::Activity, "A"))
//!     .with_node(WorkflowNode::new("b", NodeType::Activity, "B"))
//!     .with_edge(WorkflowEdge::new("e1", "a", "b"))
//!     .with_edge(WorkflowEdge::new("e2", "b", "a"));
//! assert_eq!(graph.validate(), Err(DomainError::CyclicWorkflow));
//! ```

#![warn(missing_docs)]

mod command_handlers;
mod config;
mod entity;
mod errors;
mod events;
mod identifiers;
mod persistence;
mod publishing;
mod service;
pub mod state_machine;
mod value_objects;
pub mod workflow;

pub use command_handlers::{
    ActiveInstanceCounter, AddVersion, ArchiveService, CommandAck, CreateService,
    DeprecateService, FixedInstanceCount, PublishService, ServiceCommandHandler, ServiceError,
    UpdateWorkflow,
};
pub use config::{ConfigError, EngineConfig, GraphLimits, LimitExceeded};
pub use entity::{AggregateRoot, EntityId, ServiceMarker, TenantMarker, UserMarker, VersionMarker};
pub use errors::{DomainError, DomainResult};
pub use events::{
    DomainEvent, ServiceArchived, ServiceCreated, ServiceDeprecated, ServiceEvent,
    ServicePublished, VersionReleased, WorkflowNodeAdded,
};
pub use identifiers::{CorrelationId, EdgeId, NodeId, ServiceId, TenantId, UserId, VersionId};
pub use persistence::{InMemoryServiceRepository, RepositoryError, ServiceRepository};
pub use publishing::{EventPublisher, InMemoryEventPublisher, PublishError};
pub use service::{ServiceDefinition, ServiceVersion, PUBLISH_RELEASE_NOTES};
pub use state_machine::{State, StateTransition, StateTransitions};
pub use value_objects::{
    ServiceCategory, ServiceName, ServiceStatus, SERVICE_NAME_MAX_LEN, SERVICE_NAME_MIN_LEN,
};
