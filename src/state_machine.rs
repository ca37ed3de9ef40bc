//! State machine support for aggregate lifecycles
//!
//! Aggregates keep their lifecycle in a closed enum and describe the legal
//! moves between variants through [`StateTransitions`]. The aggregate asks the
//! table before mutating, so an illegal move never touches aggregate state.

use crate::errors::{DomainError, DomainResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

/// Trait for types that can be used as states in a state machine
pub trait State: Debug + Clone + PartialEq + Eq + Send + Sync {
    /// Get the name of this state for logging/debugging
    fn name(&self) -> &'static str;

    /// Check if this is a terminal state
    fn is_terminal(&self) -> bool {
        false
    }
}

/// Transition table for a state enum
///
/// # Examples
///
/// ```rust
/// use cim_service_definition::state_machine::StateTransitions;
/// use cim_service_definition::ServiceStatus;
///
/// let status = ServiceStatus::Deprecated;
/// assert!(status.can_transition_to(&ServiceStatus::Published));
/// assert!(status.can_transition_to(&ServiceStatus::Archived));
/// assert!(!status.can_transition_to(&ServiceStatus::Draft));
/// ```
pub trait StateTransitions: State {
    /// Check if a transition to the target state is valid
    fn can_transition_to(&self, target: &Self) -> bool;

    /// Get all valid target states from this state
    fn valid_transitions(&self) -> Vec<Self>;

    /// Validate a move, returning the transition record on success
    fn transition_to(&self, target: Self) -> DomainResult<StateTransition<Self>> {
        if self.is_terminal() || !self.can_transition_to(&target) {
            return Err(DomainError::InvalidStatusTransition {
                from: self.name().to_string(),
                to: target.name().to_string(),
            });
        }

        Ok(StateTransition {
            from: self.clone(),
            to: target,
            timestamp: Utc::now(),
        })
    }
}

/// Record of a state transition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateTransition<S> {
    /// The state before the transition
    pub from: S,
    /// The state after the transition
    pub to: S,
    /// When the transition occurred
    pub timestamp: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum Light {
        Red,
        Green,
        Off,
    }

    impl State for Light {
        fn name(&self) -> &'static str {
            match self {
                Light::Red => "Red",
                Light::Green => "Green",
                Light::Off => "Off",
            }
        }

        fn is_terminal(&self) -> bool {
            matches!(self, Light::Off)
        }
    }

    impl StateTransitions for Light {
        fn can_transition_to(&self, target: &Self) -> bool {
            self.valid_transitions().contains(target)
        }

        fn valid_transitions(&self) -> Vec<Self> {
            match self {
                Light::Red => vec![Light::Green, Light::Off],
                Light::Green => vec![Light::Red],
                Light::Off => vec![Light::Red],
            }
        }
    }

    #[test]
    fn test_transition_records_from_and_to() {
        let transition = Light::Red.transition_to(Light::Green).unwrap();
        assert_eq!(transition.from, Light::Red);
        assert_eq!(transition.to, Light::Green);
    }

    #[test]
    fn test_illegal_transition_is_rejected() {
        let err = Light::Green.transition_to(Light::Off).unwrap_err();
        assert_eq!(
            err,
            DomainError::InvalidStatusTransition {
                from: "Green".to_string(),
                to: "Off".to_string(),
            }
        );
    }

    #[test]
    fn test_terminal_state_blocks_even_listed_moves() {
        assert!(Light::Off.transition_to(Light::Red).is_err());
    }
}
