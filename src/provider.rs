//! Provider root
//!
//! Composes the resource registry with the remote capabilities and exposes
//! the operations the orchestration tool drives.

use crate::config::ProviderConfig;
use crate::error::{ProviderError, Result};
use crate::gitlab::{Clients, GitlabClient};
use crate::resource::{DataSource, Registry, Resource, ResourceData};
use crate::schema::{PlanResult, ProviderSchema, ResourceSchema};
use serde_json::{Map, Value};
use std::sync::Arc;

fn resource_schema(registry: &Registry, type_name: &str) -> Result<ResourceSchema> {
    registry
        .resource(type_name)
        .map(|factory| (factory.schema)())
        .ok_or_else(|| ProviderError::UnknownResourceType(type_name.to_string()))
}

/// Validate a resource or data source configuration. Needs no remote, so it
/// also works before the provider is configured.
pub fn validate(registry: &Registry, type_name: &str, config: &Map<String, Value>) -> Result<()> {
    let schema = match registry.resource(type_name) {
        Some(factory) => (factory.schema)(),
        None => registry
            .data_source(type_name)
            .map(|factory| (factory.schema)())
            .ok_or_else(|| ProviderError::UnknownResourceType(type_name.to_string()))?,
    };
    schema.validate(config)
}

/// Plan a resource change without touching the remote
pub fn plan(
    registry: &Registry,
    type_name: &str,
    prior: Option<&ResourceData>,
    proposed: Map<String, Value>,
) -> Result<PlanResult> {
    let schema = resource_schema(registry, type_name)?;
    schema.validate(&proposed)?;
    Ok(schema.plan(prior, proposed))
}

/// A configured provider
pub struct Provider {
    registry: Registry,
    clients: Clients,
}

impl Provider {
    pub fn new(registry: &Registry, clients: Clients) -> Self {
        Self {
            registry: registry.clone(),
            clients,
        }
    }

    /// Connect to the GitLab instance described by `config`
    pub fn from_config(registry: &Registry, config: &ProviderConfig) -> Result<Self> {
        let client = GitlabClient::new(config)?;
        Ok(Self::new(registry, Clients::from_backend(Arc::new(client))))
    }

    pub fn schema(&self) -> ProviderSchema {
        self.registry.schema()
    }

    pub fn validate(&self, type_name: &str, config: &Map<String, Value>) -> Result<()> {
        validate(&self.registry, type_name, config)
    }

    pub fn plan(
        &self,
        type_name: &str,
        prior: Option<&ResourceData>,
        proposed: Map<String, Value>,
    ) -> Result<PlanResult> {
        plan(&self.registry, type_name, prior, proposed)
    }

    fn resource(&self, type_name: &str) -> Result<(ResourceSchema, Box<dyn Resource>)> {
        let factory = self
            .registry
            .resource(type_name)
            .ok_or_else(|| ProviderError::UnknownResourceType(type_name.to_string()))?;
        Ok(((factory.schema)(), (factory.build)(&self.clients)))
    }

    fn data_source(&self, type_name: &str) -> Result<(ResourceSchema, Box<dyn DataSource>)> {
        let factory = self
            .registry
            .data_source(type_name)
            .ok_or_else(|| ProviderError::UnknownResourceType(type_name.to_string()))?;
        Ok(((factory.schema)(), (factory.build)(&self.clients)))
    }

    /// Create a resource from its configuration and return the new state
    pub async fn create(
        &self,
        type_name: &str,
        mut config: Map<String, Value>,
    ) -> Result<ResourceData> {
        let (schema, handler) = self.resource(type_name)?;
        schema.validate(&config)?;
        schema.apply_defaults(&mut config);

        tracing::info!("Creating {}", type_name);
        let mut state = ResourceData::from_attributes(config);
        handler.create(&mut state).await?;

        if state.id().is_none() {
            return Err(ProviderError::NotFound(format!(
                "{} disappeared right after it was created",
                type_name
            )));
        }
        Ok(state)
    }

    /// Refresh a resource. `None` means it is gone and its state should be dropped.
    pub async fn read(
        &self,
        type_name: &str,
        mut state: ResourceData,
    ) -> Result<Option<ResourceData>> {
        let (_, handler) = self.resource(type_name)?;
        if state.id().is_none() {
            return Ok(None);
        }

        handler.read(&mut state).await?;
        Ok(state.id().is_some().then_some(state))
    }

    /// Apply an in-place change from `prior` state to `config`
    pub async fn update(
        &self,
        type_name: &str,
        prior: ResourceData,
        config: Map<String, Value>,
    ) -> Result<ResourceData> {
        let (schema, handler) = self.resource(type_name)?;
        schema.validate(&config)?;

        let planned = schema.plan(Some(&prior), config.clone());
        if planned.requires_replace {
            let names: Vec<&str> = planned
                .changes
                .iter()
                .filter(|c| c.requires_replace)
                .map(|c| c.name.as_str())
                .collect();
            return Err(ProviderError::InvalidConfig(format!(
                "{} can not be updated in place, changing {} requires replacement",
                type_name,
                names.join(", ")
            )));
        }

        tracing::info!("Updating {} {:?}", type_name, prior.id());
        let mut state = planned.planned_state;
        handler.update(&mut state, &config).await?;
        Ok(state)
    }

    pub async fn delete(&self, type_name: &str, mut state: ResourceData) -> Result<()> {
        let (_, handler) = self.resource(type_name)?;
        tracing::info!("Deleting {} {:?}", type_name, state.id());
        handler.delete(&mut state).await
    }

    /// Rebuild state from an identifier. `None` when nothing exists there.
    pub async fn import(&self, type_name: &str, id: &str) -> Result<Option<ResourceData>> {
        let (_, handler) = self.resource(type_name)?;
        if !handler.importable() {
            return Err(ProviderError::Unsupported {
                type_name: type_name.to_string(),
                operation: "import",
            });
        }

        tracing::info!("Importing {} {:?}", type_name, id);
        let mut state = ResourceData::with_id(id);
        handler.read(&mut state).await?;
        Ok(state.id().is_some().then_some(state))
    }

    pub async fn read_data_source(
        &self,
        type_name: &str,
        config: Map<String, Value>,
    ) -> Result<ResourceData> {
        let (schema, handler) = self.data_source(type_name)?;
        schema.validate(&config)?;

        let mut state = ResourceData::from_attributes(config);
        handler.read(&mut state).await?;
        Ok(state)
    }
}
