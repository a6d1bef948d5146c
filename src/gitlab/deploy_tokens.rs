//! Deploy token endpoints
//!
//! GitLab has no "get deploy token by ID" endpoint for projects and groups,
//! so callers list and scan.

use super::client::{GitlabClient, Owner};
use super::http::{ListOptions, Page};
use crate::error::{ProviderError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Scopes a deploy token can be granted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeployTokenScope {
    ReadRepository,
    ReadRegistry,
    ReadPackageRegistry,
    WriteRegistry,
    WritePackageRegistry,
}

impl DeployTokenScope {
    pub const ALL: [DeployTokenScope; 5] = [
        DeployTokenScope::ReadRepository,
        DeployTokenScope::ReadRegistry,
        DeployTokenScope::ReadPackageRegistry,
        DeployTokenScope::WriteRegistry,
        DeployTokenScope::WritePackageRegistry,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DeployTokenScope::ReadRepository => "read_repository",
            DeployTokenScope::ReadRegistry => "read_registry",
            DeployTokenScope::ReadPackageRegistry => "read_package_registry",
            DeployTokenScope::WriteRegistry => "write_registry",
            DeployTokenScope::WritePackageRegistry => "write_package_registry",
        }
    }
}

impl fmt::Display for DeployTokenScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeployTokenScope {
    type Err = ProviderError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|scope| scope.as_str() == s)
            .ok_or_else(|| {
                ProviderError::InvalidConfig(format!(
                    "unknown deploy token scope {:?}, expected one of: {}",
                    s,
                    Self::ALL.map(|scope| scope.as_str()).join(", ")
                ))
            })
    }
}

/// Deploy token as returned by the API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeployToken {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
    /// Kept as strings: newer GitLab versions know scopes we do not
    #[serde(default)]
    pub scopes: Vec<String>,
    /// Only present in the creation response
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(default)]
    pub revoked: bool,
    #[serde(default)]
    pub expired: bool,
}

/// Request body for creating a deploy token
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CreateDeployTokenOptions {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    pub scopes: Vec<DeployTokenScope>,
}

/// Deploy token capability of the remote
#[async_trait]
pub trait DeployTokensApi: Send + Sync {
    async fn create_deploy_token(
        &self,
        owner: &Owner,
        options: &CreateDeployTokenOptions,
    ) -> Result<DeployToken>;

    async fn list_deploy_tokens(
        &self,
        owner: &Owner,
        options: ListOptions,
    ) -> Result<Page<DeployToken>>;

    /// Returns the response status so callers can insist on 204
    async fn delete_deploy_token(&self, owner: &Owner, id: u64) -> Result<StatusCode>;
}

#[async_trait]
impl DeployTokensApi for GitlabClient {
    async fn create_deploy_token(
        &self,
        owner: &Owner,
        options: &CreateDeployTokenOptions,
    ) -> Result<DeployToken> {
        let url = self.owner_url(owner, "deploy_tokens")?;
        self.post(url, options).await?.json()
    }

    async fn list_deploy_tokens(
        &self,
        owner: &Owner,
        options: ListOptions,
    ) -> Result<Page<DeployToken>> {
        let mut url = self.owner_url(owner, "deploy_tokens")?;
        options.apply(&mut url);
        self.get(url).await?.into_page()
    }

    async fn delete_deploy_token(&self, owner: &Owner, id: u64) -> Result<StatusCode> {
        let url = self.owner_url(owner, &format!("deploy_tokens/{}", id))?;
        Ok(self.delete(url).await?.status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_scope_parse_and_display() {
        for scope in DeployTokenScope::ALL {
            assert_eq!(scope.as_str().parse::<DeployTokenScope>().unwrap(), scope);
            assert_eq!(scope.to_string(), scope.as_str());
        }
        assert!("api".parse::<DeployTokenScope>().is_err());
    }

    #[test]
    fn test_create_options_skip_unset_fields() {
        let options = CreateDeployTokenOptions {
            name: "ci".to_string(),
            username: None,
            expires_at: None,
            scopes: vec![DeployTokenScope::ReadRepository, DeployTokenScope::ReadRegistry],
        };
        assert_eq!(
            serde_json::to_value(&options).unwrap(),
            json!({"name": "ci", "scopes": ["read_repository", "read_registry"]})
        );
    }

    #[test]
    fn test_deploy_token_decodes_listing_entry() {
        let token: DeployToken = serde_json::from_value(json!({
            "id": 7,
            "name": "ci",
            "username": "gitlab+deploy-token-7",
            "expires_at": "2030-01-02T03:04:05.000Z",
            "scopes": ["read_repository"],
            "revoked": false,
            "expired": false
        }))
        .unwrap();

        assert_eq!(token.id, 7);
        assert_eq!(token.token, None);
        assert_eq!(
            token.expires_at.unwrap().to_rfc3339(),
            "2030-01-02T03:04:05+00:00"
        );
    }
}
