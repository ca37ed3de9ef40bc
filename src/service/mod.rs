// Copyright 2025 Cowboy AI, LLC.

//! The service definition aggregate and its immutable versions

mod definition;
mod version;

pub use definition::{ServiceDefinition, PUBLISH_RELEASE_NOTES};
pub use version::ServiceVersion;
