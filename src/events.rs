// Copyright 2025 Cowboy AI, LLC.

//! Domain events emitted by the service definition aggregate
//!
//! Events are immutable facts. The aggregate buffers them during a unit of
//! work; they leave only through [`crate::ServiceDefinition::pull_events`].

use crate::identifiers::{NodeId, ServiceId, TenantId, UserId, VersionId};
use crate::value_objects::{ServiceCategory, ServiceName};
use crate::workflow::NodeType;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Base trait for all domain events
///
/// # Examples
///
/// ```rust
/// use cim_service_definition::DomainEvent;
/// use uuid::Uuid;
///
/// #[derive(Debug)]
/// struct Pinged {
///     service: Uuid,
///     at: chrono::DateTime<chrono::Utc>,
/// }
///
/// impl DomainEvent for Pinged {
///     fn aggregate_id(&self) -> Uuid {
///         self.service
///     }
///
///     fn event_type(&self) -> &'static str {
///         "service.pinged"
///     }
///
///     fn occurred_at(&self) -> chrono::DateTime<chrono::Utc> {
///         self.at
///     }
/// }
///
/// let event = Pinged { service: Uuid::new_v4(), at: chrono::Utc::now() };
/// assert_eq!(event.event_type(), "service.pinged");
/// assert_eq!(event.version(), "v1");
/// ```
pub trait DomainEvent: Send + Sync + std::fmt::Debug {
    /// Get the aggregate ID this event relates to
    fn aggregate_id(&self) -> Uuid;

    /// Get the event type name
    fn event_type(&self) -> &'static str;

    /// When the fact was recorded
    fn occurred_at(&self) -> DateTime<Utc>;

    /// Get the schema version
    fn version(&self) -> &'static str {
        "v1"
    }
}

/// A service definition was created in draft
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceCreated {
    /// The new service
    pub service_id: ServiceId,
    /// Owning tenant
    pub tenant_id: TenantId,
    /// Initial name
    pub name: ServiceName,
    /// Initial category
    pub category: ServiceCategory,
    /// Author
    pub created_by: UserId,
    /// Timestamp
    pub occurred_at: DateTime<Utc>,
}

/// A service went live
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServicePublished {
    /// The service
    pub service_id: ServiceId,
    /// Owning tenant
    pub tenant_id: TenantId,
    /// Version that is now active
    pub version_id: VersionId,
    /// Its number
    pub version_number: u32,
    /// Timestamp
    pub occurred_at: DateTime<Utc>,
}

/// A published service was deprecated
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceDeprecated {
    /// The service
    pub service_id: ServiceId,
    /// Owning tenant
    pub tenant_id: TenantId,
    /// Why it is being retired
    pub reason: String,
    /// Replacement service, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub migration_target: Option<ServiceId>,
    /// Timestamp
    pub occurred_at: DateTime<Utc>,
}

/// A deprecated service was archived
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceArchived {
    /// The service
    pub service_id: ServiceId,
    /// Owning tenant
    pub tenant_id: TenantId,
    /// Timestamp
    pub occurred_at: DateTime<Utc>,
}

/// A new immutable version was frozen and made active
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VersionReleased {
    /// The service
    pub service_id: ServiceId,
    /// Owning tenant
    pub tenant_id: TenantId,
    /// The new version
    pub version_id: VersionId,
    /// Its number, one above the previous maximum
    pub version_number: u32,
    /// Release notes
    pub notes: String,
    /// Who released it
    pub released_by: UserId,
    /// Timestamp
    pub occurred_at: DateTime<Utc>,
}

/// A node was added to the draft workflow
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowNodeAdded {
    /// The service
    pub service_id: ServiceId,
    /// Owning tenant
    pub tenant_id: TenantId,
    /// The new node
    pub node_id: NodeId,
    /// Its type
    pub node_type: NodeType,
    /// Timestamp
    pub occurred_at: DateTime<Utc>,
}

macro_rules! impl_domain_event {
    ($($event:ty => $name:literal),+ $(,)?) => {
        $(
            impl DomainEvent for $event {
                fn aggregate_id(&self) -> Uuid {
                    *self.service_id.as_uuid()
                }

                fn event_type(&self) -> &'static str {
                    $name
                }

                fn occurred_at(&self) -> DateTime<Utc> {
                    self.occurred_at
                }
            }
        )+
    };
}

impl_domain_event! {
    ServiceCreated => "service.created",
    ServicePublished => "service.published",
    ServiceDeprecated => "service.deprecated",
    ServiceArchived => "service.archived",
    VersionReleased => "service.version_released",
    WorkflowNodeAdded => "service.workflow_node_added",
}

/// Every event a service definition can emit
///
/// Serialized with the event type string as the `event_type` tag so the
/// publishing collaborator can route without inspecting payloads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event_type")]
pub enum ServiceEvent {
    /// See [`ServiceCreated`]
    #[serde(rename = "service.created")]
    Created(ServiceCreated),
    /// See [`ServicePublished`]
    #[serde(rename = "service.published")]
    Published(ServicePublished),
    /// See [`ServiceDeprecated`]
    #[serde(rename = "service.deprecated")]
    Deprecated(ServiceDeprecated),
    /// See [`ServiceArchived`]
    #[serde(rename = "service.archived")]
    Archived(ServiceArchived),
    /// See [`VersionReleased`]
    #[serde(rename = "service.version_released")]
    VersionReleased(VersionReleased),
    /// See [`WorkflowNodeAdded`]
    #[serde(rename = "service.workflow_node_added")]
    WorkflowNodeAdded(WorkflowNodeAdded),
}

impl ServiceEvent {
    fn inner(&self) -> &dyn DomainEvent {
        match self {
            ServiceEvent::Created(e) => e,
            ServiceEvent::Published(e) => e,
            ServiceEvent::Deprecated(e) => e,
            ServiceEvent::Archived(e) => e,
            ServiceEvent::VersionReleased(e) => e,
            ServiceEvent::WorkflowNodeAdded(e) => e,
        }
    }

    /// Tenant that owns the emitting service
    pub fn tenant_id(&self) -> TenantId {
        match self {
            ServiceEvent::Created(e) => e.tenant_id,
            ServiceEvent::Published(e) => e.tenant_id,
            ServiceEvent::Deprecated(e) => e.tenant_id,
            ServiceEvent::Archived(e) => e.tenant_id,
            ServiceEvent::VersionReleased(e) => e.tenant_id,
            ServiceEvent::WorkflowNodeAdded(e) => e.tenant_id,
        }
    }

    /// Service that emitted the event
    pub fn service_id(&self) -> ServiceId {
        ServiceId::from_uuid(self.aggregate_id())
    }
}

impl DomainEvent for ServiceEvent {
    fn aggregate_id(&self) -> Uuid {
        self.inner().aggregate_id()
    }

    fn event_type(&self) -> &'static str {
        self.inner().event_type()
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        self.inner().occurred_at()
    }
}

macro_rules! impl_from_event {
    ($($event:ident => $variant:ident),+ $(,)?) => {
        $(
            impl From<$event> for ServiceEvent {
                fn from(event: $event) -> Self {
                    ServiceEvent::$variant(event)
                }
            }
        )+
    };
}

impl_from_event! {
    ServiceCreated => Created,
    ServicePublished => Published,
    ServiceDeprecated => Deprecated,
    ServiceArchived => Archived,
    VersionReleased => VersionReleased,
    WorkflowNodeAdded => WorkflowNodeAdded,
}
