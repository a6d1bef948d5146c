//! GitLab API interaction module
//!
//! The remote collaborator of the provider. Each resource area gets a narrow
//! capability trait so handlers can run against a fake in tests.
//!
//! # Module Structure
//!
//! - [`http`] - HTTP transport, error mapping and pagination cursor
//! - [`client`] - Authenticated client and URL building
//! - [`deploy_tokens`] - Project and group deploy tokens
//! - [`variables`] - Project and group CI/CD variables
//! - [`settings`] - Instance application settings
//!
//! # Example
//!
//! ```ignore
//! use gitlab_provider::gitlab::{GitlabClient, Owner, VariablesApi, ListOptions};
//!
//! async fn example(client: &GitlabClient) -> gitlab_provider::Result<()> {
//!     let owner = Owner::Project("my-group/my-project".to_string());
//!     let page = client.list_variables(&owner, ListOptions::page(1)).await?;
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod deploy_tokens;
pub mod http;
pub mod settings;
pub mod variables;

pub use client::{GitlabClient, Owner};
pub use deploy_tokens::{CreateDeployTokenOptions, DeployToken, DeployTokenScope, DeployTokensApi};
pub use http::{ApiResponse, GitlabHttpClient, HttpOptions, ListOptions, Page};
pub use settings::SettingsApi;
pub use variables::{
    CreateVariableOptions, UpdateVariableOptions, Variable, VariableType, VariablesApi,
};

use std::sync::Arc;

/// One handle per capability, handed to resource factories
#[derive(Clone)]
pub struct Clients {
    pub deploy_tokens: Arc<dyn DeployTokensApi>,
    pub variables: Arc<dyn VariablesApi>,
    pub settings: Arc<dyn SettingsApi>,
}

impl Clients {
    /// Use one backend for every capability
    pub fn from_backend<B>(backend: Arc<B>) -> Self
    where
        B: DeployTokensApi + VariablesApi + SettingsApi + 'static,
    {
        Self {
            deploy_tokens: backend.clone(),
            variables: backend.clone(),
            settings: backend,
        }
    }
}
