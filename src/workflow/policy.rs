// Copyright 2025 Cowboy AI, LLC.

//! Variables, triggers and the error-handling policy of a workflow

use crate::errors::{DomainError, DomainResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Type of a workflow variable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum VariableType {
    /// UTF-8 text
    String,
    /// Integer or floating point
    Number,
    /// true / false
    Boolean,
    /// JSON object
    Object,
    /// JSON array
    Array,
}

/// A named, typed workflow variable
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct WorkflowVariable {
    /// Variable name
    pub name: String,
    /// Declared type
    #[serde(rename = "type")]
    pub var_type: VariableType,
    /// Value used when the caller supplies none
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<Value>,
    /// Whether the caller must supply a value
    #[serde(default)]
    pub required: bool,
    /// Help text
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl WorkflowVariable {
    /// Create an optional variable without a default
    pub fn new(name: impl Into<String>, var_type: VariableType) -> Self {
        Self {
            name: name.into(),
            var_type,
            default_value: None,
            required: false,
            description: None,
        }
    }

    /// Mark the variable as required
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Provide a default value
    pub fn with_default(mut self, value: Value) -> Self {
        self.default_value = Some(value);
        self
    }
}

/// How a workflow run is started
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum TriggerType {
    /// Started by a user
    Manual,
    /// Started on a schedule
    Schedule,
    /// Started by an inbound webhook
    Webhook,
    /// Started by a domain event
    Event,
}

/// A trigger and its type-specific settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct WorkflowTrigger {
    /// Trigger mechanism
    #[serde(rename = "type")]
    pub trigger_type: TriggerType,
    /// Cron expression, webhook path, event subject, ...
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub config: BTreeMap<String, Value>,
}

impl WorkflowTrigger {
    /// Create a trigger with no settings
    pub fn new(trigger_type: TriggerType) -> Self {
        Self {
            trigger_type,
            config: BTreeMap::new(),
        }
    }

    /// Add a setting
    pub fn with(mut self, key: impl Into<String>, value: Value) -> Self {
        self.config.insert(key.into(), value);
        self
    }
}

/// Recognized error handling modes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum ErrorMode {
    /// Abort the run
    #[default]
    Fail,
    /// Run compensation
    Compensate,
    /// Continue past the failure
    Ignore,
    /// Retry per node retry policy
    Retry,
}

impl ErrorMode {
    /// Wire name of this mode
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorMode::Fail => "fail",
            ErrorMode::Compensate => "compensate",
            ErrorMode::Ignore => "ignore",
            ErrorMode::Retry => "retry",
        }
    }
}

impl fmt::Display for ErrorMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ErrorMode {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "" | "fail" => Ok(ErrorMode::Fail),
            "compensate" => Ok(ErrorMode::Compensate),
            "ignore" => Ok(ErrorMode::Ignore),
            "retry" => Ok(ErrorMode::Retry),
            other => Err(DomainError::InvalidErrorPolicy {
                value: other.to_string(),
            }),
        }
    }
}

/// Error handling policy as submitted by the authoring client
///
/// `on_error` is kept exactly as received so an unknown mode is reported
/// by validation instead of failing document parsing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ErrorHandlingPolicy {
    /// One of fail, compensate, ignore, retry; empty means fail
    #[serde(default)]
    pub on_error: String,
    /// Workflow run when compensating
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compensation_workflow_id: Option<String>,
    /// Where failures are announced
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notification_channel: Option<String>,
}

impl ErrorHandlingPolicy {
    /// Policy with a recognized mode
    pub fn new(mode: ErrorMode) -> Self {
        Self {
            on_error: mode.as_str().to_string(),
            ..Default::default()
        }
    }

    /// Parse the configured mode
    pub fn mode(&self) -> DomainResult<ErrorMode> {
        self.on_error.parse()
    }
}
