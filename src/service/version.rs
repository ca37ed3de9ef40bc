// Copyright 2025 Cowboy AI, LLC.

//! Frozen workflow versions

use crate::identifiers::{ServiceId, UserId, VersionId};
use crate::workflow::WorkflowGraph;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An immutable snapshot of a validated workflow
///
/// Only [`crate::ServiceDefinition`] constructs versions, which keeps the
/// numbering strictly increasing and gap-free per service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceVersion {
    id: VersionId,
    service_id: ServiceId,
    version_number: u32,
    workflow: WorkflowGraph,
    notes: String,
    created_at: DateTime<Utc>,
    created_by: UserId,
}

impl ServiceVersion {
    pub(crate) fn freeze(
        service_id: ServiceId,
        version_number: u32,
        workflow: WorkflowGraph,
        notes: String,
        created_by: UserId,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: VersionId::new(),
            service_id,
            version_number,
            workflow,
            notes,
            created_at,
            created_by,
        }
    }

    /// Version identity
    pub fn id(&self) -> VersionId {
        self.id
    }

    /// Owning service
    pub fn service_id(&self) -> ServiceId {
        self.service_id
    }

    /// Sequence number, starting at 1
    pub fn version_number(&self) -> u32 {
        self.version_number
    }

    /// The frozen graph; guaranteed to have passed validation
    pub fn workflow(&self) -> &WorkflowGraph {
        &self.workflow
    }

    /// Release notes
    pub fn notes(&self) -> &str {
        &self.notes
    }

    /// When the version was frozen
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Who froze it
    pub fn created_by(&self) -> UserId {
        self.created_by
    }
}
