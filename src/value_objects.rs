// Copyright 2025 Cowboy AI, LLC.

//! Value objects owned by the service definition aggregate

use crate::errors::{DomainError, DomainResult};
use crate::state_machine::{State, StateTransitions};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Minimum service name length in characters
pub const SERVICE_NAME_MIN_LEN: usize = 3;

/// Maximum service name length in characters
pub const SERVICE_NAME_MAX_LEN: usize = 100;

/// A validated service name of 3-100 characters
///
/// Length is counted in Unicode scalar values, not bytes. Out-of-range
/// names are rejected, never truncated.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct ServiceName(String);

impl ServiceName {
    /// Validate and wrap a name
    pub fn new(name: impl Into<String>) -> DomainResult<Self> {
        let name = name.into();
        let length = name.chars().count();
        if !(SERVICE_NAME_MIN_LEN..=SERVICE_NAME_MAX_LEN).contains(&length) {
            return Err(DomainError::InvalidServiceName { length });
        }
        Ok(Self(name))
    }

    /// Get the underlying string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ServiceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<&str> for ServiceName {
    type Error = DomainError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl<'de> Deserialize<'de> for ServiceName {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        ServiceName::new(raw).map_err(serde::de::Error::custom)
    }
}

/// Classifies services by their business function
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceCategory {
    /// Internal process automation
    Automation,
    /// Third-party system integration
    Integration,
    /// Outbound notifications
    Notification,
    /// Payment handling
    Payment,
    /// Order fulfillment
    Fulfillment,
    /// Reporting and analytics
    Analytics,
    /// Anything else
    #[default]
    Custom,
}

impl fmt::Display for ServiceCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ServiceCategory::Automation => "automation",
            ServiceCategory::Integration => "integration",
            ServiceCategory::Notification => "notification",
            ServiceCategory::Payment => "payment",
            ServiceCategory::Fulfillment => "fulfillment",
            ServiceCategory::Analytics => "analytics",
            ServiceCategory::Custom => "custom",
        };
        f.write_str(name)
    }
}

/// Lifecycle status of a service definition
///
/// Legal moves: draft to published, published to deprecated, deprecated to
/// archived, and deprecated back to published. Archived is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceStatus {
    /// Being authored; the draft workflow is editable
    Draft,
    /// Live and runnable
    Published,
    /// Still runnable but slated for retirement
    Deprecated,
    /// Retired for good
    Archived,
}

impl ServiceStatus {
    /// All statuses in lifecycle order
    pub const ALL: [ServiceStatus; 4] = [
        ServiceStatus::Draft,
        ServiceStatus::Published,
        ServiceStatus::Deprecated,
        ServiceStatus::Archived,
    ];
}

impl State for ServiceStatus {
    fn name(&self) -> &'static str {
        match self {
            ServiceStatus::Draft => "draft",
            ServiceStatus::Published => "published",
            ServiceStatus::Deprecated => "deprecated",
            ServiceStatus::Archived => "archived",
        }
    }

    fn is_terminal(&self) -> bool {
        matches!(self, ServiceStatus::Archived)
    }
}

impl StateTransitions for ServiceStatus {
    fn can_transition_to(&self, target: &Self) -> bool {
        matches!(
            (self, target),
            (ServiceStatus::Draft, ServiceStatus::Published)
                | (ServiceStatus::Published, ServiceStatus::Deprecated)
                | (ServiceStatus::Deprecated, ServiceStatus::Archived)
                | (ServiceStatus::Deprecated, ServiceStatus::Published)
        )
    }

    fn valid_transitions(&self) -> Vec<Self> {
        Self::ALL
            .into_iter()
            .filter(|target| self.can_transition_to(target))
            .collect()
    }
}

impl fmt::Display for ServiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("AB", false ; "too short")]
    #[test_case("ABC", true ; "minimum length")]
    #[test_case("Order Processing", true ; "typical name")]
    #[test_case(&"x".repeat(100), true ; "maximum length")]
    #[test_case(&"x".repeat(101), false ; "too long")]
    #[test_case("ñoñ", true ; "multibyte counted as characters")]
    fn test_service_name_bounds(input: &str, valid: bool) {
        assert_eq!(ServiceName::new(input).is_ok(), valid);
    }

    #[test]
    fn test_service_name_error_reports_length() {
        assert_eq!(
            ServiceName::new("").unwrap_err(),
            DomainError::InvalidServiceName { length: 0 }
        );
    }

    #[test]
    fn test_service_name_rejected_on_deserialize() {
        assert!(serde_json::from_str::<ServiceName>("\"ab\"").is_err());
        let name: ServiceName = serde_json::from_str("\"Billing\"").unwrap();
        assert_eq!(name.as_str(), "Billing");
    }

    #[test_case(ServiceStatus::Draft, ServiceStatus::Draft, false)]
    #[test_case(ServiceStatus::Draft, ServiceStatus::Published, true)]
    #[test_case(ServiceStatus::Draft, ServiceStatus::Deprecated, false)]
    #[test_case(ServiceStatus::Draft, ServiceStatus::Archived, false)]
    #[test_case(ServiceStatus::Published, ServiceStatus::Draft, false)]
    #[test_case(ServiceStatus::Published, ServiceStatus::Published, false)]
    #[test_case(ServiceStatus::Published, ServiceStatus::Deprecated, true)]
    #[test_case(ServiceStatus::Published, ServiceStatus::Archived, false)]
    #[test_case(ServiceStatus::Deprecated, ServiceStatus::Draft, false)]
    #[test_case(ServiceStatus::Deprecated, ServiceStatus::Published, true)]
    #[test_case(ServiceStatus::Deprecated, ServiceStatus::Deprecated, false)]
    #[test_case(ServiceStatus::Deprecated, ServiceStatus::Archived, true)]
    #[test_case(ServiceStatus::Archived, ServiceStatus::Draft, false)]
    #[test_case(ServiceStatus::Archived, ServiceStatus::Published, false)]
    #[test_case(ServiceStatus::Archived, ServiceStatus::Deprecated, false)]
    #[test_case(ServiceStatus::Archived, ServiceStatus::Archived, false)]
    fn test_status_transition_table(from: ServiceStatus, to: ServiceStatus, legal: bool) {
        assert_eq!(from.can_transition_to(&to), legal);
        assert_eq!(from.transition_to(to).is_ok(), legal);
    }

    #[test]
    fn test_archived_is_terminal() {
        assert!(ServiceStatus::Archived.is_terminal());
        assert!(ServiceStatus::Archived.valid_transitions().is_empty());
        assert_eq!(
            ServiceStatus::Deprecated.valid_transitions(),
            vec![ServiceStatus::Published, ServiceStatus::Archived]
        );
    }

    #[test]
    fn test_status_serde_names() {
        for status in ServiceStatus::ALL {
            let json = serde_json::to_string(&status).unwrap();
            assert_eq!(json, format!("\"{status}\""));
        }
        assert_eq!(
            serde_json::to_string(&ServiceStatus::Published).unwrap(),
            "\"published\""
        );
    }
}
