// Copyright 2025 Cowboy AI, LLC.

//! Event publishing collaborator

use crate::events::{DomainEvent, ServiceEvent};
use crate::identifiers::CorrelationId;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

/// Errors raised while handing events downstream
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PublishError {
    /// The transport could not be reached
    #[error("publisher unavailable: {0}")]
    Unavailable(String),

    /// The transport refused the batch
    #[error("events rejected: {0}")]
    Rejected(String),
}

/// Delivers drained aggregate events downstream
///
/// Receives events in emission order. Delivery guarantees beyond that are
/// the implementation's business.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Publish a batch of events from one unit of work
    async fn publish(
        &self,
        events: Vec<ServiceEvent>,
        correlation_id: CorrelationId,
    ) -> Result<(), PublishError>;
}

/// Publisher that records everything it receives
#[derive(Debug, Clone, Default)]
pub struct InMemoryEventPublisher {
    published: Arc<RwLock<Vec<(ServiceEvent, CorrelationId)>>>,
}

impl InMemoryEventPublisher {
    /// Create an empty publisher
    pub fn new() -> Self {
        Self::default()
    }

    /// Every published event in delivery order
    pub async fn events(&self) -> Vec<ServiceEvent> {
        self.published
            .read()
            .await
            .iter()
            .map(|(event, _)| event.clone())
            .collect()
    }

    /// Event type names in delivery order
    pub async fn event_types(&self) -> Vec<&'static str> {
        self.published
            .read()
            .await
            .iter()
            .map(|(event, _)| event.event_type())
            .collect()
    }

    /// Events published under one correlation id
    pub async fn correlated(&self, correlation_id: CorrelationId) -> Vec<ServiceEvent> {
        self.published
            .read()
            .await
            .iter()
            .filter(|(_, id)| *id == correlation_id)
            .map(|(event, _)| event.clone())
            .collect()
    }

    /// Forget everything recorded so far
    pub async fn clear(&self) {
        self.published.write().await.clear();
    }
}

#[async_trait]
impl EventPublisher for InMemoryEventPublisher {
    async fn publish(
        &self,
        events: Vec<ServiceEvent>,
        correlation_id: CorrelationId,
    ) -> Result<(), PublishError> {
        let mut published = self.published.write().await;
        for event in events {
            debug!(
                event_type = event.event_type(),
                service_id = %event.service_id(),
                correlation_id = %correlation_id,
                "Published event"
            );
            published.push((event, correlation_id));
        }
        Ok(())
    }
}
