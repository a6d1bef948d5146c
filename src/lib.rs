//! GitLab provider for a declarative infrastructure orchestration tool
//!
//! Manages deploy tokens, project and group CI/CD variables and instance
//! settings through the GitLab REST API.
//!
//! - [`gitlab`] - Remote collaborator and its capability traits
//! - [`schema`] - Declarative schema, validation and planning
//! - [`resource`] - Resource handlers and the explicit registry
//! - [`provider`] - Root composition
//! - [`server`] - Line-delimited JSON request loop

pub mod config;
pub mod error;
pub mod gitlab;
pub mod provider;
pub mod resource;
pub mod schema;
pub mod server;

pub use error::{ProviderError, Result};
pub use provider::Provider;
pub use resource::Registry;

/// Version injected at compile time via GITLAB_PROVIDER_VERSION (set by CI/CD),
/// or the crate version for local builds.
pub const VERSION: &str = match option_env!("GITLAB_PROVIDER_VERSION") {
    Some(v) => v,
    None => env!("CARGO_PKG_VERSION"),
};
