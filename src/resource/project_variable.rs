//! gitlab_project_variable
//!
//! Reads list and scan instead of fetching by key: GitLab < 13.4 has no
//! scope filter on the single-variable endpoint.

use super::fetcher::find_paginated;
use super::id::VariableId;
use super::registry::ResourceFactory;
use super::variable::{self, VariableDocs};
use super::{Resource, ResourceData};
use crate::error::Result;
use crate::gitlab::{Clients, ListOptions, Owner, VariablesApi};
use crate::schema::ResourceSchema;
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::sync::Arc;

pub const TYPE_NAME: &str = "gitlab_project_variable";

const OWNER_ATTR: &str = "project";

pub fn schema() -> ResourceSchema {
    variable::schema(
        OWNER_ATTR,
        VariableDocs {
            resource: "The `gitlab_project_variable` resource allows to manage the lifecycle of a CI/CD variable for a project.",
            owner: "The name or id of the project.",
            masked: "If set to `true`, the variable will be masked if it would have been written to the logs. Defaults to `false`.",
            environment_scope: "The environment_scope of the variable. Defaults to `*`.",
        },
    )
}

pub fn factory() -> ResourceFactory {
    ResourceFactory {
        schema,
        build: |clients: &Clients| {
            Box::new(ProjectVariableResource::new(clients.variables.clone()))
        },
    }
}

pub struct ProjectVariableResource {
    api: Arc<dyn VariablesApi>,
}

impl ProjectVariableResource {
    pub fn new(api: Arc<dyn VariablesApi>) -> Self {
        Self { api }
    }

    fn owner(d: &ResourceData) -> Result<Owner> {
        Ok(Owner::Project(variable::required_str(d, OWNER_ATTR)?.to_string()))
    }
}

#[async_trait]
impl Resource for ProjectVariableResource {
    fn type_name(&self) -> &'static str {
        TYPE_NAME
    }

    async fn create(&self, d: &mut ResourceData) -> Result<()> {
        let owner = Self::owner(d)?;
        let options = variable::create_options(d)?;
        let id = VariableId::new(owner.id(), &options.key, &options.environment_scope);

        tracing::debug!("create gitlab project variable {:?}", id.to_string());
        self.api
            .create_variable(&owner, &options)
            .await
            .map_err(|e| variable::augment_error(d, e))?;

        d.set_id(id.to_string());
        self.read(d).await
    }

    async fn read(&self, d: &mut ResourceData) -> Result<()> {
        let raw_id = d.id().unwrap_or_default().to_string();
        let id = VariableId::parse(&raw_id, OWNER_ATTR, variable::environment_scope(d))?;
        let owner = Owner::Project(id.owner.clone());

        tracing::debug!("read gitlab project variable {:?}", raw_id);
        let api = &self.api;
        let found = find_paginated(
            |page| {
                let owner = &owner;
                async move { api.list_variables(owner, ListOptions::page(page)).await }
            },
            |v| v.key == id.key && v.environment_scope == id.environment_scope,
        )
        .await
        .map_err(|e| variable::augment_error(d, e))?;

        match found {
            Some(v) => variable::set_state(d, OWNER_ATTR, &id.owner, v),
            None => {
                tracing::warn!(
                    "gitlab project variable {:?} was not found, removing from state",
                    raw_id
                );
                d.clear_id();
            }
        }
        Ok(())
    }

    async fn update(&self, d: &mut ResourceData, _config: &Map<String, Value>) -> Result<()> {
        let owner = Self::owner(d)?;
        let key = variable::required_str(d, "key")?.to_string();
        let options = variable::update_options(d)?;

        tracing::debug!("update gitlab project variable {:?}", d.id());
        self.api
            .update_variable(&owner, &key, &options, &options.environment_scope)
            .await
            .map_err(|e| variable::augment_error(d, e))?;

        self.read(d).await
    }

    async fn delete(&self, d: &mut ResourceData) -> Result<()> {
        let owner = Self::owner(d)?;
        let key = variable::required_str(d, "key")?;
        let scope = variable::environment_scope(d);

        tracing::debug!("delete gitlab project variable {:?}", d.id());
        // On GitLab < 13.4 the scope filter is ignored and whichever variable
        // with this key comes first is removed.
        self.api
            .remove_variable(&owner, key, scope)
            .await
            .map_err(|e| variable::augment_error(d, e))
    }

    fn importable(&self) -> bool {
        true
    }
}
