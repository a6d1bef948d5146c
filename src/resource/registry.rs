//! Resource Registry
//!
//! Explicit table of the resources and data sources this provider serves.
//! The table is built when the provider is composed and handed to it; there
//! is no process-wide registration.

use super::{deploy_token, group_variable, instance_settings, project_variable};
use super::{DataSource, Resource};
use crate::gitlab::Clients;
use crate::schema::{ProviderSchema, ResourceSchema};
use std::collections::BTreeMap;

/// How to describe and build a managed resource
#[derive(Clone, Copy)]
pub struct ResourceFactory {
    pub schema: fn() -> ResourceSchema,
    pub build: fn(&Clients) -> Box<dyn Resource>,
}

/// How to describe and build a data source
#[derive(Clone, Copy)]
pub struct DataSourceFactory {
    pub schema: fn() -> ResourceSchema,
    pub build: fn(&Clients) -> Box<dyn DataSource>,
}

/// Type name -> factory tables
#[derive(Clone, Default)]
pub struct Registry {
    resources: BTreeMap<&'static str, ResourceFactory>,
    data_sources: BTreeMap<&'static str, DataSourceFactory>,
}

impl Registry {
    /// An empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything this provider ships
    pub fn gitlab() -> Self {
        Self::new()
            .with_resource(deploy_token::TYPE_NAME, deploy_token::factory())
            .with_resource(project_variable::TYPE_NAME, project_variable::factory())
            .with_resource(group_variable::TYPE_NAME, group_variable::factory())
            .with_resource(instance_settings::TYPE_NAME, instance_settings::factory())
            .with_data_source(
                instance_settings::TYPE_NAME,
                instance_settings::data_source_factory(),
            )
    }

    pub fn with_resource(mut self, type_name: &'static str, factory: ResourceFactory) -> Self {
        self.resources.insert(type_name, factory);
        self
    }

    pub fn with_data_source(mut self, type_name: &'static str, factory: DataSourceFactory) -> Self {
        self.data_sources.insert(type_name, factory);
        self
    }

    pub fn resource(&self, type_name: &str) -> Option<&ResourceFactory> {
        self.resources.get(type_name)
    }

    pub fn data_source(&self, type_name: &str) -> Option<&DataSourceFactory> {
        self.data_sources.get(type_name)
    }

    /// Resource type names (for diagnostics)
    pub fn resource_types(&self) -> Vec<&'static str> {
        self.resources.keys().copied().collect()
    }

    pub fn data_source_types(&self) -> Vec<&'static str> {
        self.data_sources.keys().copied().collect()
    }

    /// Full schema; available before the provider is configured
    pub fn schema(&self) -> ProviderSchema {
        ProviderSchema {
            provider: ProviderSchema::provider_block(),
            resources: self
                .resources
                .iter()
                .map(|(name, factory)| (name.to_string(), (factory.schema)()))
                .collect(),
            data_sources: self
                .data_sources
                .iter()
                .map(|(name, factory)| (name.to_string(), (factory.schema)()))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_lists_gitlab_types() {
        let registry = Registry::gitlab();
        assert_eq!(
            registry.resource_types(),
            vec![
                "gitlab_deploy_token",
                "gitlab_group_variable",
                "gitlab_instance_settings",
                "gitlab_project_variable",
            ]
        );
        assert_eq!(registry.data_source_types(), vec!["gitlab_instance_settings"]);
    }

    #[test]
    fn test_empty_registry() {
        let registry = Registry::new();
        assert!(registry.resource("gitlab_deploy_token").is_none());
        assert!(registry.schema().resources.is_empty());
    }

    #[test]
    fn test_schema_covers_every_type() {
        let schema = Registry::gitlab().schema();
        assert_eq!(schema.resources.len(), 4);
        assert_eq!(schema.data_sources.len(), 1);
        assert!(schema.provider.attribute("token").unwrap().sensitive);

        let variable = &schema.resources["gitlab_project_variable"];
        assert!(variable.attribute("value").unwrap().sensitive);
        assert!(variable.attribute("key").unwrap().force_new);
    }
}
