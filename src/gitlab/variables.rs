//! CI/CD variable endpoints (project and group level)
//!
//! The `filter[environment_scope]` query parameter is understood by GitLab
//! 13.4 and later. Older versions ignore it and act on whichever variable with
//! the key they find first, which makes update and delete nondeterministic
//! when several scopes share a key. See
//! https://gitlab.com/gitlab-org/gitlab/-/merge_requests/39209

use super::client::{GitlabClient, Owner};
use super::http::{ListOptions, Page};
use crate::error::{ProviderError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use url::Url;

const SCOPE_FILTER_PARAM: &str = "filter[environment_scope]";

/// How a variable is exposed to jobs
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VariableType {
    #[default]
    EnvVar,
    File,
}

impl VariableType {
    pub fn as_str(&self) -> &'static str {
        match self {
            VariableType::EnvVar => "env_var",
            VariableType::File => "file",
        }
    }
}

impl fmt::Display for VariableType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VariableType {
    type Err = ProviderError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "env_var" => Ok(VariableType::EnvVar),
            "file" => Ok(VariableType::File),
            other => Err(ProviderError::InvalidConfig(format!(
                "unknown variable type {:?}, expected env_var or file",
                other
            ))),
        }
    }
}

/// CI/CD variable as returned by the API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Variable {
    pub key: String,
    #[serde(default)]
    pub value: String,
    #[serde(default)]
    pub variable_type: VariableType,
    #[serde(default)]
    pub protected: bool,
    #[serde(default)]
    pub masked: bool,
    #[serde(default = "default_scope")]
    pub environment_scope: String,
}

fn default_scope() -> String {
    "*".to_string()
}

/// Request body for creating a variable
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CreateVariableOptions {
    pub key: String,
    pub value: String,
    pub variable_type: VariableType,
    pub protected: bool,
    pub masked: bool,
    pub environment_scope: String,
}

/// Request body for updating a variable
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UpdateVariableOptions {
    pub value: String,
    pub variable_type: VariableType,
    pub protected: bool,
    pub masked: bool,
    pub environment_scope: String,
}

/// CI/CD variable capability of the remote, for both projects and groups
#[async_trait]
pub trait VariablesApi: Send + Sync {
    async fn list_variables(&self, owner: &Owner, options: ListOptions) -> Result<Page<Variable>>;

    async fn get_variable(&self, owner: &Owner, key: &str, scope_filter: &str) -> Result<Variable>;

    async fn create_variable(&self, owner: &Owner, options: &CreateVariableOptions)
        -> Result<Variable>;

    async fn update_variable(
        &self,
        owner: &Owner,
        key: &str,
        options: &UpdateVariableOptions,
        scope_filter: &str,
    ) -> Result<Variable>;

    async fn remove_variable(&self, owner: &Owner, key: &str, scope_filter: &str) -> Result<()>;
}

impl GitlabClient {
    fn variable_url(&self, owner: &Owner, key: &str, scope_filter: &str) -> Result<Url> {
        let mut url = self.owner_url(owner, &format!("variables/{}", urlencoding::encode(key)))?;
        url.query_pairs_mut()
            .append_pair(SCOPE_FILTER_PARAM, scope_filter);
        Ok(url)
    }
}

#[async_trait]
impl VariablesApi for GitlabClient {
    async fn list_variables(&self, owner: &Owner, options: ListOptions) -> Result<Page<Variable>> {
        let mut url = self.owner_url(owner, "variables")?;
        options.apply(&mut url);
        self.get(url).await?.into_page()
    }

    async fn get_variable(&self, owner: &Owner, key: &str, scope_filter: &str) -> Result<Variable> {
        let url = self.variable_url(owner, key, scope_filter)?;
        self.get(url).await?.json()
    }

    async fn create_variable(
        &self,
        owner: &Owner,
        options: &CreateVariableOptions,
    ) -> Result<Variable> {
        let url = self.owner_url(owner, "variables")?;
        self.post(url, options).await?.json()
    }

    async fn update_variable(
        &self,
        owner: &Owner,
        key: &str,
        options: &UpdateVariableOptions,
        scope_filter: &str,
    ) -> Result<Variable> {
        let url = self.variable_url(owner, key, scope_filter)?;
        self.put(url, options).await?.json()
    }

    async fn remove_variable(&self, owner: &Owner, key: &str, scope_filter: &str) -> Result<()> {
        let url = self.variable_url(owner, key, scope_filter)?;
        self.delete(url).await?;
        Ok(())
    }
}
