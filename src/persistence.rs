// Copyright 2025 Cowboy AI, LLC.

//! Persistence collaborator contract and an in-memory implementation
//!
//! Repositories enforce optimistic concurrency: a save succeeds only when the
//! stored revision equals the revision the aggregate was loaded at, and then
//! bumps both.

use crate::entity::AggregateRoot;
use crate::identifiers::{ServiceId, TenantId};
use crate::service::ServiceDefinition;
use crate::value_objects::ServiceStatus;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// Repository errors
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    /// No service with this id exists for the tenant
    #[error("service not found: {0}")]
    NotFound(ServiceId),

    /// Someone else saved the service since it was loaded
    #[error("concurrent modification: expected revision {expected}, found {actual}")]
    ConcurrentModification {
        /// Revision the caller loaded
        expected: u64,
        /// Revision currently stored
        actual: u64,
    },

    /// Another service of the tenant already uses this name
    #[error("service name already in use: {0}")]
    DuplicateName(String),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Storage error
    #[error("storage error: {0}")]
    Storage(String),
}

impl RepositoryError {
    /// True for stale-write rejections the caller may retry after reloading
    pub fn is_conflict(&self) -> bool {
        matches!(self, RepositoryError::ConcurrentModification { .. })
    }
}

/// Loads and stores service definitions, scoped by tenant
///
/// Implementations must round-trip every field losslessly, including the full
/// version history. Pending events are not part of the stored state.
#[async_trait]
pub trait ServiceRepository: Send + Sync {
    /// Load a service
    async fn load(
        &self,
        tenant_id: TenantId,
        service_id: ServiceId,
    ) -> Result<ServiceDefinition, RepositoryError>;

    /// Store a service if nobody saved it since it was loaded
    ///
    /// On success the aggregate's revision is incremented and returned.
    /// Fails with [`RepositoryError::DuplicateName`] when another service of
    /// the same tenant already holds the name.
    async fn save(&self, service: &mut ServiceDefinition) -> Result<u64, RepositoryError>;

    /// Check if a service exists
    async fn exists(&self, tenant_id: TenantId, service_id: ServiceId)
        -> Result<bool, RepositoryError>;

    /// Remove a service
    async fn delete(&self, tenant_id: TenantId, service_id: ServiceId)
        -> Result<(), RepositoryError>;

    /// All services of a tenant in the given status, oldest first
    async fn find_by_status(
        &self,
        tenant_id: TenantId,
        status: ServiceStatus,
    ) -> Result<Vec<ServiceDefinition>, RepositoryError>;

    /// A tenant's service with exactly this name
    async fn find_by_name(
        &self,
        tenant_id: TenantId,
        name: &str,
    ) -> Result<Option<ServiceDefinition>, RepositoryError>;
}

#[derive(Debug, Clone)]
struct StoredService {
    revision: u64,
    name: String,
    document: String,
}

/// In-memory repository storing the JSON form of each service
///
/// Going through JSON keeps the round-trip guarantee honest in tests.
#[derive(Debug, Clone, Default)]
pub struct InMemoryServiceRepository {
    storage: Arc<RwLock<HashMap<(TenantId, ServiceId), StoredService>>>,
}

impl InMemoryServiceRepository {
    /// Create an empty repository
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored services across all tenants
    pub async fn len(&self) -> usize {
        self.storage.read().await.len()
    }

    /// Whether nothing is stored
    pub async fn is_empty(&self) -> bool {
        self.storage.read().await.is_empty()
    }

    async fn tenant_services(
        &self,
        tenant_id: TenantId,
    ) -> Result<Vec<ServiceDefinition>, RepositoryError> {
        let storage = self.storage.read().await;
        let mut services = storage
            .iter()
            .filter(|((tenant, _), _)| *tenant == tenant_id)
            .map(|(_, stored)| serde_json::from_str::<ServiceDefinition>(&stored.document))
            .collect::<Result<Vec<_>, _>>()?;
        services.sort_by_key(|service| service.created_at());
        Ok(services)
    }
}

#[async_trait]
impl ServiceRepository for InMemoryServiceRepository {
    async fn load(
        &self,
        tenant_id: TenantId,
        service_id: ServiceId,
    ) -> Result<ServiceDefinition, RepositoryError> {
        let storage = self.storage.read().await;
        let stored = storage
            .get(&(tenant_id, service_id))
            .ok_or(RepositoryError::NotFound(service_id))?;
        debug!(
            service_id = %service_id,
            tenant_id = %tenant_id,
            revision = stored.revision,
            "Loaded service"
        );
        Ok(serde_json::from_str(&stored.document)?)
    }

    async fn save(&self, service: &mut ServiceDefinition) -> Result<u64, RepositoryError> {
        let key = (service.tenant_id(), service.id());
        let mut storage = self.storage.write().await;

        let expected = service.version();
        let actual = storage.get(&key).map_or(0, |stored| stored.revision);
        if expected != actual {
            warn!(
                service_id = %service.id(),
                expected,
                actual,
                "Rejected stale save"
            );
            return Err(RepositoryError::ConcurrentModification { expected, actual });
        }

        let name = service.name().as_str();
        let taken = storage.iter().any(|((tenant, id), stored)| {
            *tenant == key.0 && *id != key.1 && stored.name == name
        });
        if taken {
            warn!(service_id = %service.id(), name, "Rejected duplicate name");
            return Err(RepositoryError::DuplicateName(name.to_string()));
        }

        let mut next = service.clone();
        next.increment_version();
        let document = serde_json::to_string(&next)?;
        let revision = next.version();
        storage.insert(
            key,
            StoredService {
                revision,
                name: next.name().to_string(),
                document,
            },
        );
        service.increment_version();

        info!(
            service_id = %service.id(),
            tenant_id = %service.tenant_id(),
            revision,
            status = %service.status(),
            "Saved service"
        );
        Ok(revision)
    }

    async fn exists(
        &self,
        tenant_id: TenantId,
        service_id: ServiceId,
    ) -> Result<bool, RepositoryError> {
        Ok(self
            .storage
            .read()
            .await
            .contains_key(&(tenant_id, service_id)))
    }

    async fn delete(
        &self,
        tenant_id: TenantId,
        service_id: ServiceId,
    ) -> Result<(), RepositoryError> {
        match self.storage.write().await.remove(&(tenant_id, service_id)) {
            Some(_) => {
                info!(service_id = %service_id, tenant_id = %tenant_id, "Deleted service");
                Ok(())
            }
            None => Err(RepositoryError::NotFound(service_id)),
        }
    }

    async fn find_by_status(
        &self,
        tenant_id: TenantId,
        status: ServiceStatus,
    ) -> Result<Vec<ServiceDefinition>, RepositoryError> {
        let mut services = self.tenant_services(tenant_id).await?;
        services.retain(|service| service.status() == status);
        Ok(services)
    }

    async fn find_by_name(
        &self,
        tenant_id: TenantId,
        name: &str,
    ) -> Result<Option<ServiceDefinition>, RepositoryError> {
        Ok(self
            .tenant_services(tenant_id)
            .await?
            .into_iter()
            .find(|service| service.name().as_str() == name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identifiers::UserId;
    use crate::value_objects::{ServiceCategory, ServiceName};
    use crate::workflow::{NodeType, WorkflowGraph, WorkflowNode};

    fn service(tenant_id: TenantId, name: &str) -> ServiceDefinition {
        ServiceDefinition::create(
            tenant_id,
            ServiceName::new(name).unwrap(),
            "",
            ServiceCategory::Automation,
            UserId::new(),
        )
    }

    #[tokio::test]
    async fn test_save_and_load_round_trip() {
        let repo = InMemoryServiceRepository::new();
        let tenant = TenantId::new();
        let mut original = service(tenant, "Invoice Sync");
        original
            .add_version(
                WorkflowGraph::new().with_node(WorkflowNode::new("a", NodeType::Activity, "A")),
                "initial",
                UserId::new(),
            )
            .unwrap();
        original.pull_events();

        assert_eq!(repo.save(&mut original).await.unwrap(), 1);
        let loaded = repo.load(tenant, original.id()).await.unwrap();

        assert_eq!(loaded, original);
        assert_eq!(loaded.versions().len(), 1);
        assert_eq!(loaded.version(), 1);
    }

    #[tokio::test]
    async fn test_stale_save_is_rejected() {
        let repo = InMemoryServiceRepository::new();
        let tenant = TenantId::new();
        let mut original = service(tenant, "Invoice Sync");
        repo.save(&mut original).await.unwrap();

        let mut first = repo.load(tenant, original.id()).await.unwrap();
        let mut second = repo.load(tenant, original.id()).await.unwrap();

        first.update_details("first writer", ServiceCategory::Payment).unwrap();
        repo.save(&mut first).await.unwrap();

        second.update_details("second writer", ServiceCategory::Payment).unwrap();
        let err = repo.save(&mut second).await.unwrap_err();
        assert!(err.is_conflict());
        assert!(matches!(
            err,
            RepositoryError::ConcurrentModification {
                expected: 1,
                actual: 2
            }
        ));
        assert_eq!(second.version(), 1);

        let stored = repo.load(tenant, original.id()).await.unwrap();
        assert_eq!(stored.description(), "first writer");
    }

    #[tokio::test]
    async fn test_tenants_are_isolated() {
        let repo = InMemoryServiceRepository::new();
        let tenant = TenantId::new();
        let mut owned = service(tenant, "Invoice Sync");
        repo.save(&mut owned).await.unwrap();

        let other = TenantId::new();
        assert!(matches!(
            repo.load(other, owned.id()).await,
            Err(RepositoryError::NotFound(_))
        ));
        assert!(!repo.exists(other, owned.id()).await.unwrap());
        assert!(repo.exists(tenant, owned.id()).await.unwrap());
    }

    #[tokio::test]
    async fn test_queries() {
        let repo = InMemoryServiceRepository::new();
        let tenant = TenantId::new();
        let mut first = service(tenant, "Invoice Sync");
        let mut second = service(tenant, "Refund Desk");
        let mut foreign = service(TenantId::new(), "Invoice Sync");
        for svc in [&mut first, &mut second, &mut foreign] {
            repo.save(svc).await.unwrap();
        }

        let drafts = repo.find_by_status(tenant, ServiceStatus::Draft).await.unwrap();
        assert_eq!(drafts.len(), 2);
        assert!(repo
            .find_by_status(tenant, ServiceStatus::Published)
            .await
            .unwrap()
            .is_empty());

        let found = repo.find_by_name(tenant, "Refund Desk").await.unwrap();
        assert_eq!(found.map(|s| s.id()), Some(second.id()));
        assert!(repo.find_by_name(tenant, "Nothing Here").await.unwrap().is_none());
        assert_eq!(repo.len().await, 3);
    }

    #[tokio::test]
    async fn test_names_are_unique_per_tenant() {
        let repo = InMemoryServiceRepository::new();
        let tenant = TenantId::new();
        let mut first = service(tenant, "Invoice Sync");
        repo.save(&mut first).await.unwrap();

        let mut twin = service(tenant, "Invoice Sync");
        let err = repo.save(&mut twin).await.unwrap_err();
        assert!(matches!(err, RepositoryError::DuplicateName(ref name) if name == "Invoice Sync"));
        assert_eq!(twin.version(), 0);
        assert_eq!(repo.len().await, 1);

        let mut foreign = service(TenantId::new(), "Invoice Sync");
        repo.save(&mut foreign).await.unwrap();

        first.update_details("resaved", ServiceCategory::Payment).unwrap();
        repo.save(&mut first).await.unwrap();

        twin.rename(ServiceName::new("Invoice Sync Two").unwrap()).unwrap();
        repo.save(&mut twin).await.unwrap();
        assert_eq!(repo.len().await, 3);
    }

    #[tokio::test]
    async fn test_delete() {
        let repo = InMemoryServiceRepository::new();
        let tenant = TenantId::new();
        let mut svc = service(tenant, "Invoice Sync");
        repo.save(&mut svc).await.unwrap();

        repo.delete(tenant, svc.id()).await.unwrap();
        assert!(repo.is_empty().await);
        assert!(matches!(
            repo.delete(tenant, svc.id()).await,
            Err(RepositoryError::NotFound(_))
        ));
    }
}
