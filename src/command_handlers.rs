// Copyright 2025 Cowboy AI, LLC.

//! Command handlers for the service definition aggregate
//!
//! Each command is one unit of work: bound-check any submitted graph, load,
//! mutate, drain events, save, publish. Handlers return acknowledgments, not
//! aggregate data.

use crate::config::{EngineConfig, LimitExceeded};
use crate::entity::AggregateRoot;
use crate::errors::DomainError;
use crate::events::ServiceEvent;
use crate::identifiers::{CorrelationId, ServiceId, TenantId, UserId, VersionId};
use crate::persistence::{RepositoryError, ServiceRepository};
use crate::publishing::{EventPublisher, PublishError};
use crate::service::ServiceDefinition;
use crate::value_objects::{ServiceCategory, ServiceName, ServiceStatus};
use crate::workflow::WorkflowGraph;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Errors surfaced to callers of the command handler
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// The aggregate or graph rejected the command
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// Loading or saving failed
    #[error(transparent)]
    Repository(#[from] RepositoryError),

    /// The save committed but its events could not be handed downstream
    #[error("events not published: {source}")]
    Publish {
        /// Transport failure
        source: PublishError,
        /// Correlation id the batch was sent under
        correlation_id: CorrelationId,
        /// The undelivered batch, in emission order
        events: Vec<ServiceEvent>,
    },

    /// The submitted graph is over the configured bounds
    #[error(transparent)]
    GraphTooLarge(#[from] LimitExceeded),

    /// The tenant already has a service with this name
    #[error("service name already in use: {0}")]
    NameTaken(String),

    /// Archive refused while runs are still live
    #[error("cannot archive service with {count} active instances")]
    ActiveInstancesRemaining {
        /// Live instance count reported by the runtime
        count: u64,
    },

    /// The runtime could not report instance counts
    #[error("active instance count unavailable: {0}")]
    InstanceQuery(String),
}

impl ServiceError {
    /// True when the caller lost an optimistic concurrency race
    pub fn is_conflict(&self) -> bool {
        matches!(self, ServiceError::Repository(err) if err.is_conflict())
    }

    /// Take back the batch a failed publish left undelivered
    pub fn into_undelivered(self) -> Option<(Vec<ServiceEvent>, CorrelationId)> {
        match self {
            ServiceError::Publish {
                events,
                correlation_id,
                ..
            } => Some((events, correlation_id)),
            _ => None,
        }
    }
}

/// Reports how many runs of a service are still executing
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ActiveInstanceCounter: Send + Sync {
    /// Count live instances of any version of the service
    async fn active_instances(
        &self,
        tenant_id: TenantId,
        service_id: ServiceId,
    ) -> Result<u64, String>;
}

/// Counter that always reports the same number
#[derive(Debug, Clone, Copy, Default)]
pub struct FixedInstanceCount(pub u64);

#[async_trait]
impl ActiveInstanceCounter for FixedInstanceCount {
    async fn active_instances(
        &self,
        _tenant_id: TenantId,
        _service_id: ServiceId,
    ) -> Result<u64, String> {
        Ok(self.0)
    }
}

/// Create a draft service
#[derive(Debug, Clone)]
pub struct CreateService {
    /// Owning tenant
    pub tenant_id: TenantId,
    /// Requested name, validated by the handler
    pub name: String,
    /// Description
    pub description: String,
    /// Category
    pub category: ServiceCategory,
    /// Author
    pub created_by: UserId,
}

/// Replace the draft workflow
#[derive(Debug, Clone)]
pub struct UpdateWorkflow {
    /// Owning tenant
    pub tenant_id: TenantId,
    /// Target service
    pub service_id: ServiceId,
    /// New draft
    pub workflow: WorkflowGraph,
}

/// Freeze a graph as the next active version
#[derive(Debug, Clone)]
pub struct AddVersion {
    /// Owning tenant
    pub tenant_id: TenantId,
    /// Target service
    pub service_id: ServiceId,
    /// Graph to freeze
    pub workflow: WorkflowGraph,
    /// Release notes
    pub notes: String,
    /// Who releases it
    pub author: UserId,
}

/// Take a service live
#[derive(Debug, Clone)]
pub struct PublishService {
    /// Owning tenant
    pub tenant_id: TenantId,
    /// Target service
    pub service_id: ServiceId,
}

/// Deprecate a published service
#[derive(Debug, Clone)]
pub struct DeprecateService {
    /// Owning tenant
    pub tenant_id: TenantId,
    /// Target service
    pub service_id: ServiceId,
    /// Why
    pub reason: String,
    /// Replacement, if any
    pub migration_target: Option<ServiceId>,
}

/// Archive a deprecated service
#[derive(Debug, Clone)]
pub struct ArchiveService {
    /// Owning tenant
    pub tenant_id: TenantId,
    /// Target service
    pub service_id: ServiceId,
}

/// Acknowledgment returned by every command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandAck {
    /// Service the command applied to
    pub service_id: ServiceId,
    /// Stored revision after the command
    pub revision: u64,
    /// Correlation id attached to the published events
    pub correlation_id: CorrelationId,
    /// Number of events published
    pub events_published: usize,
    /// Version released by the command, if any
    pub version_id: Option<VersionId>,
}

/// Application service coordinating aggregate, repository and publisher
pub struct ServiceCommandHandler {
    repository: Arc<dyn ServiceRepository>,
    publisher: Arc<dyn EventPublisher>,
    instances: Arc<dyn ActiveInstanceCounter>,
    config: EngineConfig,
}

impl ServiceCommandHandler {
    /// Create a handler
    pub fn new(
        repository: Arc<dyn ServiceRepository>,
        publisher: Arc<dyn EventPublisher>,
        instances: Arc<dyn ActiveInstanceCounter>,
        config: EngineConfig,
    ) -> Self {
        Self {
            repository,
            publisher,
            instances,
            config,
        }
    }

    /// Active configuration
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Handle [`CreateService`]
    ///
    /// The name lookup rejects most duplicates early; the repository save
    /// settles races between concurrent creates.
    #[instrument(skip(self, command), fields(tenant_id = %command.tenant_id))]
    pub async fn create_service(&self, command: CreateService) -> Result<CommandAck, ServiceError> {
        let name = ServiceName::new(command.name)?;
        if self
            .repository
            .find_by_name(command.tenant_id, name.as_str())
            .await?
            .is_some()
        {
            return Err(ServiceError::NameTaken(name.to_string()));
        }

        let mut service = ServiceDefinition::create(
            command.tenant_id,
            name,
            command.description,
            command.category,
            command.created_by,
        );
        info!(service_id = %service.id(), name = %service.name(), "Creating service");
        match self.commit(&mut service, None).await {
            Err(ServiceError::Repository(RepositoryError::DuplicateName(name))) => {
                Err(ServiceError::NameTaken(name))
            }
            other => other,
        }
    }

    /// Handle [`UpdateWorkflow`]
    #[instrument(skip(self, command), fields(tenant_id = %command.tenant_id, service_id = %command.service_id))]
    pub async fn update_workflow(&self, command: UpdateWorkflow) -> Result<CommandAck, ServiceError> {
        self.config.limits.check(&command.workflow)?;
        let mut service = self
            .repository
            .load(command.tenant_id, command.service_id)
            .await?;
        service.update_workflow(command.workflow)?;
        self.commit(&mut service, None).await
    }

    /// Handle [`AddVersion`]
    #[instrument(skip(self, command), fields(tenant_id = %command.tenant_id, service_id = %command.service_id))]
    pub async fn add_version(&self, command: AddVersion) -> Result<CommandAck, ServiceError> {
        self.config.limits.check(&command.workflow)?;
        let mut service = self
            .repository
            .load(command.tenant_id, command.service_id)
            .await?;
        let version_id = service.add_version(command.workflow, command.notes, command.author)?;
        info!(version_id = %version_id, "Released version");
        self.commit(&mut service, Some(version_id)).await
    }

    /// Handle [`PublishService`]
    #[instrument(skip(self, command), fields(tenant_id = %command.tenant_id, service_id = %command.service_id))]
    pub async fn publish_service(&self, command: PublishService) -> Result<CommandAck, ServiceError> {
        let mut service = self
            .repository
            .load(command.tenant_id, command.service_id)
            .await?;
        service.publish()?;
        let version_id = service.active_version_id();
        self.commit(&mut service, version_id).await
    }

    /// Handle [`DeprecateService`]
    #[instrument(skip(self, command), fields(tenant_id = %command.tenant_id, service_id = %command.service_id))]
    pub async fn deprecate_service(
        &self,
        command: DeprecateService,
    ) -> Result<CommandAck, ServiceError> {
        let mut service = self
            .repository
            .load(command.tenant_id, command.service_id)
            .await?;
        service.deprecate(command.reason, command.migration_target)?;
        self.commit(&mut service, None).await
    }

    /// Handle [`ArchiveService`]
    ///
    /// When configured, refuses while the runtime still reports live runs.
    #[instrument(skip(self, command), fields(tenant_id = %command.tenant_id, service_id = %command.service_id))]
    pub async fn archive_service(&self, command: ArchiveService) -> Result<CommandAck, ServiceError> {
        let mut service = self
            .repository
            .load(command.tenant_id, command.service_id)
            .await?;

        if service.status() == ServiceStatus::Deprecated
            && self.config.require_zero_instances_for_archive
        {
            let count = self
                .instances
                .active_instances(command.tenant_id, command.service_id)
                .await
                .map_err(ServiceError::InstanceQuery)?;
            if count > 0 {
                warn!(count, "Archive refused, instances still running");
                return Err(ServiceError::ActiveInstancesRemaining { count });
            }
        }

        service.archive()?;
        self.commit(&mut service, None).await
    }

    /// Deliver a batch returned by [`ServiceError::into_undelivered`]
    pub async fn republish(
        &self,
        events: Vec<ServiceEvent>,
        correlation_id: CorrelationId,
    ) -> Result<(), ServiceError> {
        if events.is_empty() {
            return Ok(());
        }
        let count = events.len();
        match self.publisher.publish(events.clone(), correlation_id).await {
            Ok(()) => {
                info!(correlation_id = %correlation_id, events = count, "Republished events");
                Ok(())
            }
            Err(source) => Err(ServiceError::Publish {
                source,
                correlation_id,
                events,
            }),
        }
    }

    async fn commit(
        &self,
        service: &mut ServiceDefinition,
        version_id: Option<VersionId>,
    ) -> Result<CommandAck, ServiceError> {
        let events = service.pull_events();
        let revision = self.repository.save(service).await?;

        let correlation_id = CorrelationId::new();
        let events_published = events.len();
        if !events.is_empty() {
            if let Err(source) = self.publisher.publish(events.clone(), correlation_id).await {
                warn!(
                    service_id = %service.id(),
                    revision,
                    error = %source,
                    "Saved service but events were not published"
                );
                return Err(ServiceError::Publish {
                    source,
                    correlation_id,
                    events,
                });
            }
        }

        info!(
            service_id = %service.id(),
            revision = service.version(),
            status = %service.status(),
            events = events_published,
            "Committed service"
        );
        Ok(CommandAck {
            service_id: service.id(),
            revision,
            correlation_id,
            events_published,
            version_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::DomainEvent;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use crate::persistence::InMemoryServiceRepository;
    use crate::publishing::{InMemoryEventPublisher, MockEventPublisher};
    use crate::workflow::{NodeType, WorkflowEdge, WorkflowNode};

    struct Fixture {
        handler: ServiceCommandHandler,
        repository: InMemoryServiceRepository,
        publisher: InMemoryEventPublisher,
        tenant_id: TenantId,
    }

    fn fixture_with(instances: Arc<dyn ActiveInstanceCounter>, config: EngineConfig) -> Fixture {
        let repository = InMemoryServiceRepository::new();
        let publisher = InMemoryEventPublisher::new();
        let handler = ServiceCommandHandler::new(
            Arc::new(repository.clone()),
            Arc::new(publisher.clone()),
            instances,
            config,
        );
        Fixture {
            handler,
            repository,
            publisher,
            tenant_id: TenantId::new(),
        }
    }

    fn fixture() -> Fixture {
        fixture_with(Arc::new(FixedInstanceCount(0)), EngineConfig::default())
    }

    fn two_steps() -> WorkflowGraph {
        WorkflowGraph::new()
            .with_node(WorkflowNode::new("fetch", NodeType::Activity, "Fetch"))
            .with_node(WorkflowNode::new("notify", NodeType::Activity, "Notify"))
            .with_edge(WorkflowEdge::new("e1", "fetch", "notify"))
    }

    impl Fixture {
        async fn create(&self, name: &str) -> ServiceId {
            self.handler
                .create_service(CreateService {
                    tenant_id: self.tenant_id,
                    name: name.to_string(),
                    description: String::new(),
                    category: ServiceCategory::Automation,
                    created_by: UserId::new(),
                })
                .await
                .unwrap()
                .service_id
        }

        async fn deprecated(&self) -> ServiceId {
            let service_id = self.create("Order Processing").await;
            self.handler
                .update_workflow(UpdateWorkflow {
                    tenant_id: self.tenant_id,
                    service_id,
                    workflow: two_steps(),
                })
                .await
                .unwrap();
            self.handler
                .publish_service(PublishService {
                    tenant_id: self.tenant_id,
                    service_id,
                })
                .await
                .unwrap();
            self.handler
                .deprecate_service(DeprecateService {
                    tenant_id: self.tenant_id,
                    service_id,
                    reason: "replaced".to_string(),
                    migration_target: None,
                })
                .await
                .unwrap();
            service_id
        }
    }

    #[tokio::test]
    async fn test_create_persists_and_publishes() {
        let fx = fixture();
        let service_id = fx.create("Order Processing").await;

        let stored = fx.repository.load(fx.tenant_id, service_id).await.unwrap();
        assert_eq!(stored.status(), ServiceStatus::Draft);
        assert_eq!(stored.version(), 1);
        assert_eq!(fx.publisher.event_types().await, vec!["service.created"]);
    }

    #[tokio::test]
    async fn test_invalid_name_is_rejected_before_storage() {
        let fx = fixture();
        let err = fx
            .handler
            .create_service(CreateService {
                tenant_id: fx.tenant_id,
                name: "ab".to_string(),
                description: String::new(),
                category: ServiceCategory::Custom,
                created_by: UserId::new(),
            })
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            ServiceError::Domain(DomainError::InvalidServiceName { length: 2 })
        ));
        assert!(fx.repository.is_empty().await);
    }

    #[tokio::test]
    async fn test_duplicate_name_is_rejected() {
        let fx = fixture();
        fx.create("Order Processing").await;
        let err = fx
            .handler
            .create_service(CreateService {
                tenant_id: fx.tenant_id,
                name: "Order Processing".to_string(),
                description: String::new(),
                category: ServiceCategory::Custom,
                created_by: UserId::new(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::NameTaken(_)));
    }

    #[tokio::test]
    async fn test_add_version_acknowledges_version() {
        let fx = fixture();
        let service_id = fx.create("Order Processing").await;

        let ack = fx
            .handler
            .add_version(AddVersion {
                tenant_id: fx.tenant_id,
                service_id,
                workflow: two_steps(),
                notes: "first".to_string(),
                author: UserId::new(),
            })
            .await
            .unwrap();

        let stored = fx.repository.load(fx.tenant_id, service_id).await.unwrap();
        assert_eq!(ack.version_id, stored.active_version_id());
        assert_eq!(ack.revision, 2);
        assert_eq!(ack.events_published, 1);
        assert_eq!(fx.publisher.correlated(ack.correlation_id).await.len(), 1);
    }

    #[tokio::test]
    async fn test_oversized_graph_is_rejected() {
        let config = EngineConfig {
            limits: crate::config::GraphLimits {
                max_nodes: 1,
                ..Default::default()
            },
            ..Default::default()
        };
        let fx = fixture_with(Arc::new(FixedInstanceCount(0)), config);
        let service_id = fx.create("Order Processing").await;

        let err = fx
            .handler
            .update_workflow(UpdateWorkflow {
                tenant_id: fx.tenant_id,
                service_id,
                workflow: two_steps(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::GraphTooLarge(_)));

        let stored = fx.repository.load(fx.tenant_id, service_id).await.unwrap();
        assert!(stored.workflow().is_empty());
    }

    #[tokio::test]
    async fn test_archive_refused_while_instances_run() {
        let mut counter = MockActiveInstanceCounter::new();
        counter
            .expect_active_instances()
            .times(1)
            .returning(|_, _| Ok(2));
        let fx = fixture_with(Arc::new(counter), EngineConfig::default());
        let service_id = fx.deprecated().await;

        let err = fx
            .handler
            .archive_service(ArchiveService {
                tenant_id: fx.tenant_id,
                service_id,
            })
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ServiceError::ActiveInstancesRemaining { count: 2 }
        ));

        let stored = fx.repository.load(fx.tenant_id, service_id).await.unwrap();
        assert_eq!(stored.status(), ServiceStatus::Deprecated);
    }

    #[tokio::test]
    async fn test_archive_without_instance_check() {
        let mut counter = MockActiveInstanceCounter::new();
        counter.expect_active_instances().never();
        let config = EngineConfig {
            require_zero_instances_for_archive: false,
            ..Default::default()
        };
        let fx = fixture_with(Arc::new(counter), config);
        let service_id = fx.deprecated().await;

        fx.handler
            .archive_service(ArchiveService {
                tenant_id: fx.tenant_id,
                service_id,
            })
            .await
            .unwrap();

        let stored = fx.repository.load(fx.tenant_id, service_id).await.unwrap();
        assert_eq!(stored.status(), ServiceStatus::Archived);
    }

    #[tokio::test]
    async fn test_archive_from_published_skips_instance_query() {
        let mut counter = MockActiveInstanceCounter::new();
        counter.expect_active_instances().never();
        let fx = fixture_with(Arc::new(counter), EngineConfig::default());
        let service_id = fx.create("Order Processing").await;

        let err = fx
            .handler
            .archive_service(ArchiveService {
                tenant_id: fx.tenant_id,
                service_id,
            })
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ServiceError::Domain(DomainError::CannotArchiveFromNonDeprecated { .. })
        ));
    }

    #[tokio::test]
    async fn test_publish_failure_surfaces_after_save() {
        let repository = InMemoryServiceRepository::new();
        let mut publisher = MockEventPublisher::new();
        publisher
            .expect_publish()
            .withf(|events: &Vec<ServiceEvent>, _| {
                events.len() == 1 && events[0].event_type() == "service.created"
            })
            .times(1)
            .returning(|_, _| Err(PublishError::Unavailable("broker down".to_string())));
        let handler = ServiceCommandHandler::new(
            Arc::new(repository.clone()),
            Arc::new(publisher),
            Arc::new(FixedInstanceCount(0)),
            EngineConfig::default(),
        );

        let err = handler
            .create_service(CreateService {
                tenant_id: TenantId::new(),
                name: "Order Processing".to_string(),
                description: String::new(),
                category: ServiceCategory::Custom,
                created_by: UserId::new(),
            })
            .await
            .unwrap_err();

        assert!(matches!(err, ServiceError::Publish { .. }));
        assert_eq!(repository.len().await, 1);
    }

    #[tokio::test]
    async fn test_undelivered_events_can_be_republished() {
        let repository = InMemoryServiceRepository::new();
        let mut publisher = MockEventPublisher::new();
        let attempts = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&attempts);
        publisher
            .expect_publish()
            .withf(|events: &Vec<ServiceEvent>, _| {
                events.len() == 1 && events[0].event_type() == "service.created"
            })
            .times(2)
            .returning(move |_, _| match seen.fetch_add(1, Ordering::SeqCst) {
                0 => Err(PublishError::Unavailable("broker down".to_string())),
                _ => Ok(()),
            });
        let handler = ServiceCommandHandler::new(
            Arc::new(repository.clone()),
            Arc::new(publisher),
            Arc::new(FixedInstanceCount(0)),
            EngineConfig::default(),
        );
        let tenant_id = TenantId::new();

        let err = handler
            .create_service(CreateService {
                tenant_id,
                name: "Order Processing".to_string(),
                description: String::new(),
                category: ServiceCategory::Custom,
                created_by: UserId::new(),
            })
            .await
            .unwrap_err();

        let (events, correlation_id) = err.into_undelivered().unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].tenant_id(), tenant_id);
        handler.republish(events, correlation_id).await.unwrap();
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_concurrent_creates_with_one_name() {
        let fx = fixture();
        let command = CreateService {
            tenant_id: fx.tenant_id,
            name: "Order Processing".to_string(),
            description: String::new(),
            category: ServiceCategory::Custom,
            created_by: UserId::new(),
        };

        let (first, second) = tokio::join!(
            fx.handler.create_service(command.clone()),
            fx.handler.create_service(command),
        );

        let outcomes = [first, second];
        assert_eq!(outcomes.iter().filter(|r| r.is_ok()).count(), 1);
        assert!(outcomes
            .iter()
            .any(|r| matches!(r, Err(ServiceError::NameTaken(name)) if name == "Order Processing")));
        assert_eq!(fx.repository.len().await, 1);
        assert_eq!(fx.publisher.event_types().await, vec!["service.created"]);
    }
}
