// Copyright 2025 Cowboy AI, LLC.

//! The service definition aggregate root

use crate::entity::AggregateRoot;
use crate::errors::{DomainError, DomainResult};
use crate::events::{
    ServiceArchived, ServiceCreated, ServiceDeprecated, ServiceEvent, ServicePublished,
    VersionReleased, WorkflowNodeAdded,
};
use crate::identifiers::{ServiceId, TenantId, UserId, VersionId};
use crate::service::version::ServiceVersion;
use crate::state_machine::StateTransitions;
use crate::value_objects::{ServiceCategory, ServiceName, ServiceStatus};
use crate::workflow::{WorkflowEdge, WorkflowGraph, WorkflowNode};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Release notes recorded when publishing freezes an unreleased draft
pub const PUBLISH_RELEASE_NOTES: &str = "Published from draft";

/// A tenant's workflow-backed service and its version history
///
/// Every mutating method either applies completely, including the events it
/// emits, or returns an error and leaves the aggregate untouched. Events are
/// buffered until [`ServiceDefinition::pull_events`] drains them.
///
/// ```mermaid
/// stateDiagram-v2
///     [*] --> draft: create
///     draft --> published: publish
///     published --> deprecated: deprecate
///     deprecated --> published: publish
///     deprecated --> archived: archive
///     archived --> [*]
/// ```
///
/// # Examples
///
/// ```rust
/// use cim_service_definition::workflow::{NodeType, WorkflowGraph, WorkflowNode};
/// use cim_service_definition::{
///     ServiceCategory, ServiceDefinition, ServiceName, ServiceStatus, TenantId, UserId,
/// };
///
/// let mut service = ServiceDefinition::create(
///     TenantId::new(),
///     ServiceName::new("Order Processing").unwrap(),
///     "Handles incoming orders",
///     ServiceCategory::Fulfillment,
///     UserId::new(),
/// );
///
/// let graph = WorkflowGraph::new()
///     .with_node(WorkflowNode::new("fetch", NodeType::Activity, "Fetch order"));
/// service.update_workflow(graph).unwrap();
/// service.publish().unwrap();
///
/// assert_eq!(service.status(), ServiceStatus::Published);
/// assert_eq!(service.versions().len(), 1);
/// assert_eq!(service.pull_events().len(), 3);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceDefinition {
    id: ServiceId,
    tenant_id: TenantId,
    name: ServiceName,
    description: String,
    category: ServiceCategory,
    workflow: WorkflowGraph,
    versions: Vec<ServiceVersion>,
    active_version: Option<VersionId>,
    status: ServiceStatus,
    created_by: UserId,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    published_at: Option<DateTime<Utc>>,
    revision: u64,
    #[serde(skip)]
    pending_events: Vec<ServiceEvent>,
}

impl ServiceDefinition {
    /// Create a draft service with an empty workflow
    pub fn create(
        tenant_id: TenantId,
        name: ServiceName,
        description: impl Into<String>,
        category: ServiceCategory,
        created_by: UserId,
    ) -> Self {
        let now = Utc::now();
        let id = ServiceId::new();
        let mut service = Self {
            id,
            tenant_id,
            name: name.clone(),
            description: description.into(),
            category,
            workflow: WorkflowGraph::new(),
            versions: Vec::new(),
            active_version: None,
            status: ServiceStatus::Draft,
            created_by,
            created_at: now,
            updated_at: now,
            published_at: None,
            revision: 0,
            pending_events: Vec::new(),
        };
        service.record(ServiceCreated {
            service_id: id,
            tenant_id,
            name,
            category,
            created_by,
            occurred_at: now,
        });
        service
    }

    /// Replace the draft workflow; structure is checked at publish time
    pub fn update_workflow(&mut self, workflow: WorkflowGraph) -> DomainResult<()> {
        self.ensure_editable()?;
        self.workflow = workflow;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Append a node to the draft workflow
    pub fn add_workflow_node(&mut self, node: WorkflowNode) -> DomainResult<()> {
        self.ensure_editable()?;
        let node_id = node.id.clone();
        let node_type = node.node_type();
        self.workflow.add_node(node)?;

        let now = Utc::now();
        self.updated_at = now;
        self.record(WorkflowNodeAdded {
            service_id: self.id,
            tenant_id: self.tenant_id,
            node_id,
            node_type,
            occurred_at: now,
        });
        Ok(())
    }

    /// Connect two existing draft nodes
    pub fn add_workflow_edge(&mut self, edge: WorkflowEdge) -> DomainResult<()> {
        self.ensure_editable()?;
        for endpoint in [&edge.source, &edge.target] {
            if !self.workflow.contains_node(endpoint) {
                return Err(DomainError::InvalidEdge {
                    edge_id: edge.id.clone(),
                    node_id: endpoint.clone(),
                });
            }
        }
        if edge.is_self_loop() {
            return Err(DomainError::SelfReferencingEdge {
                node_id: edge.source.clone(),
                edge_id: edge.id,
            });
        }

        self.workflow.add_edge(edge);
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Freeze a validated graph as the next version and make it active
    ///
    /// The graph also becomes the draft. Works in any status except archived.
    pub fn add_version(
        &mut self,
        workflow: WorkflowGraph,
        notes: impl Into<String>,
        author: UserId,
    ) -> DomainResult<VersionId> {
        if self.status == ServiceStatus::Archived {
            return Err(DomainError::ArchivedServiceImmutable);
        }
        workflow.validate()?;

        Ok(self.release(workflow, notes.into(), author, Utc::now()))
    }

    /// Take the service live
    ///
    /// Allowed from draft and deprecated, and as a republish from published.
    /// The draft is validated; if it differs from the active version (or no
    /// version exists yet) it is frozen as a new version first, emitting
    /// `VersionReleased` before `ServicePublished`.
    pub fn publish(&mut self) -> DomainResult<()> {
        if self.status == ServiceStatus::Archived {
            return Err(DomainError::CannotPublishArchived);
        }
        if self.status != ServiceStatus::Published {
            self.status.transition_to(ServiceStatus::Published)?;
        }
        if self.workflow.is_empty() {
            return Err(DomainError::EmptyWorkflow);
        }
        self.workflow.validate()?;

        let now = Utc::now();
        let unchanged = self
            .active_version()
            .filter(|active| active.workflow() == &self.workflow)
            .map(ServiceVersion::id);
        let version_id = match unchanged {
            Some(id) => id,
            None => self.release(
                self.workflow.clone(),
                PUBLISH_RELEASE_NOTES.to_string(),
                self.created_by,
                now,
            ),
        };
        let version_number = self
            .version_by_id(version_id)
            .map(ServiceVersion::version_number)
            .unwrap_or_default();

        self.status = ServiceStatus::Published;
        self.published_at = Some(now);
        self.updated_at = now;
        self.record(ServicePublished {
            service_id: self.id,
            tenant_id: self.tenant_id,
            version_id,
            version_number,
            occurred_at: now,
        });
        Ok(())
    }

    /// Mark a published service for retirement
    pub fn deprecate(
        &mut self,
        reason: impl Into<String>,
        migration_target: Option<ServiceId>,
    ) -> DomainResult<()> {
        let transition = self.status.transition_to(ServiceStatus::Deprecated)?;

        self.status = transition.to;
        self.updated_at = transition.timestamp;
        self.record(ServiceDeprecated {
            service_id: self.id,
            tenant_id: self.tenant_id,
            reason: reason.into(),
            migration_target,
            occurred_at: transition.timestamp,
        });
        Ok(())
    }

    /// Retire a deprecated service for good
    ///
    /// The caller is responsible for confirming that no runtime instances
    /// are still active.
    pub fn archive(&mut self) -> DomainResult<()> {
        if self.status != ServiceStatus::Deprecated {
            return Err(DomainError::CannotArchiveFromNonDeprecated {
                status: self.status.to_string(),
            });
        }
        let transition = self.status.transition_to(ServiceStatus::Archived)?;

        self.status = transition.to;
        self.updated_at = transition.timestamp;
        self.record(ServiceArchived {
            service_id: self.id,
            tenant_id: self.tenant_id,
            occurred_at: transition.timestamp,
        });
        Ok(())
    }

    /// Change the display name
    pub fn rename(&mut self, name: ServiceName) -> DomainResult<()> {
        if self.status == ServiceStatus::Archived {
            return Err(DomainError::ArchivedServiceImmutable);
        }
        self.name = name;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Change description and category
    pub fn update_details(
        &mut self,
        description: impl Into<String>,
        category: ServiceCategory,
    ) -> DomainResult<()> {
        if self.status == ServiceStatus::Archived {
            return Err(DomainError::ArchivedServiceImmutable);
        }
        self.description = description.into();
        self.category = category;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Drain buffered events in emission order
    pub fn pull_events(&mut self) -> Vec<ServiceEvent> {
        std::mem::take(&mut self.pending_events)
    }

    /// Whether any events are waiting to be drained
    pub fn has_pending_events(&self) -> bool {
        !self.pending_events.is_empty()
    }

    fn ensure_editable(&self) -> DomainResult<()> {
        if self.status != ServiceStatus::Draft {
            return Err(DomainError::WorkflowNotEditable {
                status: self.status.to_string(),
            });
        }
        Ok(())
    }

    /// Infallible tail of a release; callers validate first
    fn release(
        &mut self,
        workflow: WorkflowGraph,
        notes: String,
        author: UserId,
        now: DateTime<Utc>,
    ) -> VersionId {
        let version_number = self.next_version_number();
        let version = ServiceVersion::freeze(
            self.id,
            version_number,
            workflow.clone(),
            notes.clone(),
            author,
            now,
        );
        let version_id = version.id();

        self.versions.push(version);
        self.active_version = Some(version_id);
        self.workflow = workflow;
        self.updated_at = now;
        self.record(VersionReleased {
            service_id: self.id,
            tenant_id: self.tenant_id,
            version_id,
            version_number,
            notes,
            released_by: author,
            occurred_at: now,
        });
        version_id
    }

    fn next_version_number(&self) -> u32 {
        self.versions
            .last()
            .map_or(1, |latest| latest.version_number() + 1)
    }

    fn record(&mut self, event: impl Into<ServiceEvent>) {
        self.pending_events.push(event.into());
    }
}

// Queries
impl ServiceDefinition {
    /// Service identity
    pub fn id(&self) -> ServiceId {
        self.id
    }

    /// Owning tenant
    pub fn tenant_id(&self) -> TenantId {
        self.tenant_id
    }

    /// Display name
    pub fn name(&self) -> &ServiceName {
        &self.name
    }

    /// Free-text description
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Business category
    pub fn category(&self) -> ServiceCategory {
        self.category
    }

    /// The draft workflow
    pub fn workflow(&self) -> &WorkflowGraph {
        &self.workflow
    }

    /// Every version, ordered by number
    pub fn versions(&self) -> &[ServiceVersion] {
        &self.versions
    }

    /// Id of the live version, if any was ever released
    pub fn active_version_id(&self) -> Option<VersionId> {
        self.active_version
    }

    /// The live version
    pub fn active_version(&self) -> Option<&ServiceVersion> {
        self.active_version.and_then(|id| self.version_by_id(id))
    }

    /// Look up a version by id
    pub fn version_by_id(&self, id: VersionId) -> Option<&ServiceVersion> {
        self.versions.iter().find(|version| version.id() == id)
    }

    /// Look up a version by number
    pub fn version_by_number(&self, number: u32) -> Option<&ServiceVersion> {
        self.versions
            .iter()
            .find(|version| version.version_number() == number)
    }

    /// Highest-numbered version
    pub fn latest_version(&self) -> Option<&ServiceVersion> {
        self.versions.last()
    }

    /// Lifecycle status
    pub fn status(&self) -> ServiceStatus {
        self.status
    }

    /// Author
    pub fn created_by(&self) -> UserId {
        self.created_by
    }

    /// Creation time
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Last mutation time
    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Most recent publish time
    pub fn published_at(&self) -> Option<DateTime<Utc>> {
        self.published_at
    }
}

impl AggregateRoot for ServiceDefinition {
    type Id = ServiceId;

    fn id(&self) -> Self::Id {
        self.id
    }

    fn version(&self) -> u64 {
        self.revision
    }

    fn increment_version(&mut self) {
        self.revision += 1;
    }
}
