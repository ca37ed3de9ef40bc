// Copyright 2025 Cowboy AI, LLC.

//! Typed entity identities and the aggregate root contract

use serde::{Deserialize, Serialize};
use std::fmt;
use std::marker::PhantomData;
use std::str::FromStr;
use uuid::Uuid;

/// A typed entity ID using phantom types for type safety
///
/// These IDs are globally unique and persistent. The phantom type
/// parameter ensures that IDs for different entity types cannot be
/// mixed up at compile time.
///
/// # Examples
///
/// ```rust
/// use cim_service_definition::{ServiceId, TenantId};
///
/// let service_id = ServiceId::new();
/// let tenant_id = TenantId::new();
///
/// // These are different types - won't compile if mixed up:
/// // let _: ServiceId = tenant_id; // ERROR!
/// assert_ne!(service_id.as_uuid(), tenant_id.as_uuid());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId<T> {
    id: Uuid,
    #[serde(skip)]
    _phantom: PhantomData<T>,
}

impl<T> EntityId<T> {
    /// Create a new random entity ID
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            _phantom: PhantomData,
        }
    }

    /// Create an entity ID from a UUID
    pub fn from_uuid(id: Uuid) -> Self {
        Self {
            id,
            _phantom: PhantomData,
        }
    }

    /// Get the underlying UUID
    pub fn as_uuid(&self) -> &Uuid {
        &self.id
    }
}

impl<T> fmt::Display for EntityId<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id)
    }
}

impl<T> Default for EntityId<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> FromStr for EntityId<T> {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self::from_uuid)
    }
}

impl<T> From<EntityId<T>> for Uuid {
    fn from(id: EntityId<T>) -> Self {
        id.id
    }
}

/// Marker trait for aggregate roots
///
/// Aggregate roots are the entry points for modifying aggregates.
/// All changes to entities within an aggregate must go through the root.
/// The version counter backs optimistic concurrency in repositories.
pub trait AggregateRoot: Sized {
    /// The type of ID for this aggregate
    type Id: Copy + Eq + Send + Sync;

    /// Get the aggregate's ID
    fn id(&self) -> Self::Id;

    /// Get the aggregate's version for optimistic concurrency
    fn version(&self) -> u64;

    /// Increment the version
    fn increment_version(&mut self);
}

// Marker types for entity IDs
/// Marker for service definition aggregates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ServiceMarker;

/// Marker for service versions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VersionMarker;

/// Marker for tenants
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TenantMarker;

/// Marker for users
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UserMarker;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_id_new() {
        let id1 = EntityId::<ServiceMarker>::new();
        let id2 = EntityId::<ServiceMarker>::new();

        assert_ne!(id1, id2);
        assert!(!id1.as_uuid().is_nil());
    }

    #[test]
    fn test_entity_id_display_and_parse() {
        let uuid = Uuid::new_v4();
        let id = EntityId::<TenantMarker>::from_uuid(uuid);

        assert_eq!(format!("{id}"), format!("{uuid}"));
        let parsed: EntityId<TenantMarker> = id.to_string().parse().unwrap();
        assert_eq!(parsed, id);
        assert!("not-a-uuid".parse::<EntityId<TenantMarker>>().is_err());
    }

    #[test]
    fn test_entity_id_serde_round_trip() {
        let id = EntityId::<VersionMarker>::new();
        let json = serde_json::to_string(&id).unwrap();
        let back: EntityId<VersionMarker> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }
}
