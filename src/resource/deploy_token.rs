//! gitlab_deploy_token
//!
//! Project and group deploy tokens. Tokens are immutable once created, so
//! every configurable attribute forces replacement and there is no update.

use super::fetcher::{find_paginated, DEPLOY_TOKEN_PAGE_SIZE};
use super::id::parse_deploy_token_id;
use super::registry::ResourceFactory;
use super::{Resource, ResourceData};
use crate::error::{ProviderError, Result};
use crate::gitlab::{
    Clients, CreateDeployTokenOptions, DeployTokenScope, DeployTokensApi, ListOptions, Owner,
};
use crate::schema::{validation, Attribute, AttributeType, ResourceSchema};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::StatusCode;
use std::sync::Arc;

pub const TYPE_NAME: &str = "gitlab_deploy_token";

/// Two RFC3339 strings naming the same instant are not a change
pub fn expires_at_equal(old: &str, new: &str) -> bool {
    match (
        DateTime::parse_from_rfc3339(old),
        DateTime::parse_from_rfc3339(new),
    ) {
        (Ok(old), Ok(new)) => old == new,
        _ => false,
    }
}

pub fn schema() -> ResourceSchema {
    ResourceSchema::new(
        "The `gitlab_deploy_token` resource allows to manage the lifecycle of group and project deploy tokens.",
    )
    .with_attribute(
        "project",
        Attribute::optional(AttributeType::String)
            .force_new()
            .exactly_one_of(&["project", "group"])
            .with_description("The name or id of the project to add the deploy token to."),
    )
    .with_attribute(
        "group",
        Attribute::optional(AttributeType::String)
            .force_new()
            .exactly_one_of(&["project", "group"])
            .with_description("The name or id of the group to add the deploy token to."),
    )
    .with_attribute(
        "name",
        Attribute::required(AttributeType::String)
            .force_new()
            .with_description("A name to describe the deploy token with."),
    )
    .with_attribute(
        "username",
        Attribute::optional_computed(AttributeType::String)
            .force_new()
            .with_description(
                "A username for the deploy token. Default is `gitlab+deploy-token-{n}`.",
            ),
    )
    .with_attribute(
        "expires_at",
        Attribute::optional(AttributeType::String)
            .force_new()
            .with_validator(validation::rfc3339_time)
            .with_diff_suppress(expires_at_equal)
            .with_description(
                "Time the token will expire it, RFC3339 format. Will not expire per default.",
            ),
    )
    .with_attribute(
        "scopes",
        Attribute::required(AttributeType::StringSet)
            .force_new()
            .with_validator(validation::deploy_token_scopes)
            .with_description(
                "Valid values: `read_repository`, `read_registry`, `read_package_registry`, `write_registry`, `write_package_registry`.",
            ),
    )
    .with_attribute(
        "token",
        Attribute::computed(AttributeType::String)
            .sensitive()
            .with_description(
                "The secret token. This is only populated when creating a new deploy token.",
            ),
    )
}

pub fn factory() -> ResourceFactory {
    ResourceFactory {
        schema,
        build: |clients: &Clients| {
            Box::new(DeployTokenResource::new(clients.deploy_tokens.clone()))
        },
    }
}

pub struct DeployTokenResource {
    api: Arc<dyn DeployTokensApi>,
}

impl DeployTokenResource {
    pub fn new(api: Arc<dyn DeployTokensApi>) -> Self {
        Self { api }
    }

    fn owner(d: &ResourceData) -> Result<Owner> {
        match (d.get_str("project"), d.get_str("group")) {
            (Some(project), None) => Ok(Owner::Project(project.to_string())),
            (None, Some(group)) => Ok(Owner::Group(group.to_string())),
            (Some(_), Some(_)) => Err(ProviderError::InvalidConfig(
                "only one of `group,project` can be specified".to_string(),
            )),
            (None, None) => Err(ProviderError::InvalidConfig(
                "one of `group,project` must be specified".to_string(),
            )),
        }
    }

    fn create_options(d: &ResourceData) -> Result<CreateDeployTokenOptions> {
        let name = d.get_str("name").ok_or_else(|| {
            ProviderError::InvalidConfig("name: the argument is required".to_string())
        })?;

        let expires_at = d
            .get_str("expires_at")
            .map(|raw| {
                DateTime::parse_from_rfc3339(raw)
                    .map(|t| t.with_timezone(&Utc))
                    .map_err(|e| {
                        ProviderError::InvalidConfig(format!("Invalid expires_at date: {}", e))
                    })
            })
            .transpose()?;

        let scopes = d
            .get_strings("scopes")
            .iter()
            .map(|s| s.parse::<DeployTokenScope>())
            .collect::<Result<Vec<_>>>()?;

        Ok(CreateDeployTokenOptions {
            name: name.to_string(),
            username: d.get_str("username").map(str::to_string),
            expires_at,
            scopes,
        })
    }

    fn token_id(d: &ResourceData) -> Result<u64> {
        parse_deploy_token_id(d.id().unwrap_or_default())
    }
}

#[async_trait]
impl Resource for DeployTokenResource {
    fn type_name(&self) -> &'static str {
        TYPE_NAME
    }

    async fn create(&self, d: &mut ResourceData) -> Result<()> {
        let owner = Self::owner(d)?;
        let options = Self::create_options(d)?;

        tracing::debug!("Create GitLab deploy token {} in {}", options.name, owner);
        let token = self.api.create_deploy_token(&owner, &options).await?;

        d.set_id(token.id.to_string());
        // the secret is only ever returned here
        d.set("token", token.token.unwrap_or_default());
        d.set("username", token.username);
        Ok(())
    }

    async fn read(&self, d: &mut ResourceData) -> Result<()> {
        let owner = Self::owner(d)?;
        let id = Self::token_id(d)?;

        tracing::debug!("Read GitLab deploy token {} in {}", id, owner);
        let api = &self.api;
        let found = find_paginated(
            |page| {
                let owner = &owner;
                async move {
                    let options = ListOptions::page(page).per_page(DEPLOY_TOKEN_PAGE_SIZE);
                    api.list_deploy_tokens(owner, options).await
                }
            },
            |token| token.id == id,
        )
        .await?;

        let Some(token) = found else {
            tracing::warn!(
                "GitLab deploy token {} in {} was not found, removing from state",
                id,
                owner
            );
            d.clear_id();
            return Ok(());
        };

        d.set("name", token.name);
        d.set("username", token.username);
        if let Some(expires_at) = token.expires_at {
            d.set("expires_at", expires_at.to_rfc3339_opts(SecondsFormat::Secs, true));
        }
        d.set("scopes", token.scopes);
        Ok(())
    }

    async fn delete(&self, d: &mut ResourceData) -> Result<()> {
        let owner = Self::owner(d)?;
        let id = Self::token_id(d)?;

        tracing::debug!("Delete GitLab deploy token {} in {}", id, owner);
        let status = self.api.delete_deploy_token(&owner, id).await?;
        if status != StatusCode::NO_CONTENT {
            return Err(ProviderError::UnexpectedStatus(status.to_string()));
        }
        Ok(())
    }
}
