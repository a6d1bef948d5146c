//! gitlab_group_variable

use super::id::{VariableId, DEFAULT_ENVIRONMENT_SCOPE};
use super::registry::ResourceFactory;
use super::variable::{self, VariableDocs};
use super::{Resource, ResourceData};
use crate::error::Result;
use crate::gitlab::{Clients, Owner, VariablesApi};
use crate::schema::ResourceSchema;
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::sync::Arc;

pub const TYPE_NAME: &str = "gitlab_group_variable";

const OWNER_ATTR: &str = "group";

pub fn schema() -> ResourceSchema {
    variable::schema(
        OWNER_ATTR,
        VariableDocs {
            resource: "The `gitlab_group_variable` resource allows to manage the lifecycle of a CI/CD variable for a group.",
            owner: "The name or id of the group.",
            masked: "If set to `true`, the value of the variable will be hidden in job logs. The value must meet the [masking requirements](https://docs.gitlab.com/ee/ci/variables/#masked-variables). Defaults to `false`.",
            environment_scope: "The environment scope of the variable. Defaults to all environment (`*`). Note that in Community Editions of Gitlab, values other than `*` will cause inconsistent plans.",
        },
    )
}

pub fn factory() -> ResourceFactory {
    ResourceFactory {
        schema,
        build: |clients: &Clients| Box::new(GroupVariableResource::new(clients.variables.clone())),
    }
}

pub struct GroupVariableResource {
    api: Arc<dyn VariablesApi>,
}

impl GroupVariableResource {
    pub fn new(api: Arc<dyn VariablesApi>) -> Self {
        Self { api }
    }

    fn owner(d: &ResourceData) -> Result<Owner> {
        Ok(Owner::Group(variable::required_str(d, OWNER_ATTR)?.to_string()))
    }
}

#[async_trait]
impl Resource for GroupVariableResource {
    fn type_name(&self) -> &'static str {
        TYPE_NAME
    }

    async fn create(&self, d: &mut ResourceData) -> Result<()> {
        let owner = Self::owner(d)?;
        let options = variable::create_options(d)?;

        tracing::debug!("create gitlab group variable {}/{}", owner.id(), options.key);
        self.api
            .create_variable(&owner, &options)
            .await
            .map_err(|e| variable::augment_error(d, e))?;

        d.set_id(VariableId::new(owner.id(), &options.key, &options.environment_scope).to_string());
        self.read(d).await
    }

    async fn read(&self, d: &mut ResourceData) -> Result<()> {
        // `group:key` ids predate scoped variables and always mean `*`
        let id = VariableId::parse(
            d.id().unwrap_or_default(),
            OWNER_ATTR,
            DEFAULT_ENVIRONMENT_SCOPE,
        )?;
        let owner = Owner::Group(id.owner.clone());

        tracing::debug!(
            "read gitlab group variable {}/{}/{}",
            id.owner,
            id.key,
            id.environment_scope
        );
        match self.api.get_variable(&owner, &id.key, &id.environment_scope).await {
            Ok(v) => variable::set_state(d, OWNER_ATTR, &id.owner, v),
            Err(e) if e.is_not_found() => {
                tracing::warn!(
                    "gitlab group variable not found {}/{}, removing from state",
                    id.owner,
                    id.key
                );
                d.clear_id();
            }
            Err(e) => return Err(variable::augment_error(d, e)),
        }
        Ok(())
    }

    async fn update(&self, d: &mut ResourceData, _config: &Map<String, Value>) -> Result<()> {
        let owner = Self::owner(d)?;
        let key = variable::required_str(d, "key")?.to_string();
        let options = variable::update_options(d)?;

        tracing::debug!(
            "update gitlab group variable {}/{}/{}",
            owner.id(),
            key,
            options.environment_scope
        );
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

        tracing::debug!("delete gitlab group variable {}/{}/{}", owner.id(), key, scope);
        self.api
            .remove_variable(&owner, key, scope)
            .await
            .map_err(|e| variable::augment_error(d, e))
    }

    fn importable(&self) -> bool {
        true
    }
}
