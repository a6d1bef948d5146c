//! Resource abstraction layer
//!
//! Resource handlers translate local state into remote calls and back.
//!
//! # Architecture
//!
//! - [`registry`] - Explicit table of resource and data source factories
//! - [`data`] - Local state of one resource instance
//! - [`id`] - Composite identifier encoding and parsing
//! - [`fetcher`] - Paginated scans for endpoints without direct lookup
//! - [`deploy_token`], [`project_variable`], [`group_variable`],
//!   [`instance_settings`] - The handlers
//!
//! # Example
//!
//! ```ignore
//! use gitlab_provider::resource::{Registry, ResourceData};
//!
//! async fn refresh(provider: &gitlab_provider::Provider, state: ResourceData) {
//!     match provider.read("gitlab_deploy_token", state).await {
//!         Ok(Some(state)) => println!("still there: {:?}", state.id()),
//!         Ok(None) => println!("gone, drop it"),
//!         Err(e) => eprintln!("{e}"),
//!     }
//! }
//! ```

pub mod data;
pub mod deploy_token;
pub mod fetcher;
pub mod group_variable;
pub mod id;
pub mod instance_settings;
pub mod project_variable;
pub mod registry;
mod variable;

pub use data::ResourceData;
pub use id::{VariableId, DEFAULT_ENVIRONMENT_SCOPE};
pub use registry::{DataSourceFactory, Registry, ResourceFactory};

use crate::error::{ProviderError, Result};
use async_trait::async_trait;
use serde_json::{Map, Value};

/// CRUD handler of a managed resource
#[async_trait]
pub trait Resource: Send + Sync {
    fn type_name(&self) -> &'static str;

    /// Create the remote object and record its identifier
    async fn create(&self, d: &mut ResourceData) -> Result<()>;

    /// Refresh state from the remote; clears the identifier when it is gone
    async fn read(&self, d: &mut ResourceData) -> Result<()>;

    /// Apply `config` in place. `d` holds the planned state, where unset
    /// computed attributes still carry their prior values.
    async fn update(&self, _d: &mut ResourceData, _config: &Map<String, Value>) -> Result<()> {
        Err(ProviderError::Unsupported {
            type_name: self.type_name().to_string(),
            operation: "update",
        })
    }

    async fn delete(&self, d: &mut ResourceData) -> Result<()>;

    /// Whether state can be rebuilt from an identifier alone
    fn importable(&self) -> bool {
        false
    }
}

/// Read-only handler of a data source
#[async_trait]
pub trait DataSource: Send + Sync {
    fn type_name(&self) -> &'static str;

    async fn read(&self, d: &mut ResourceData) -> Result<()>;
}
