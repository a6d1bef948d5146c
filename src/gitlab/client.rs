//! GitLab Client
//!
//! Authenticated client for the GitLab REST API, combining the HTTP
//! transport with the configured endpoint and token.

use super::http::{ApiResponse, GitlabHttpClient, HttpOptions};
use crate::config::ProviderConfig;
use crate::error::{ProviderError, Result};
use serde::Serialize;
use std::fmt;
use url::Url;

/// Namespace that owns a deploy token or CI/CD variable
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Owner {
    /// Project ID or full path (`group/project`)
    Project(String),
    /// Group ID or full path (`group/subgroup`)
    Group(String),
}

impl Owner {
    /// Singular kind, used in log lines and errors
    pub fn kind(&self) -> &'static str {
        match self {
            Owner::Project(_) => "project",
            Owner::Group(_) => "group",
        }
    }

    /// The ID or path as configured
    pub fn id(&self) -> &str {
        match self {
            Owner::Project(id) | Owner::Group(id) => id,
        }
    }

    /// API path prefix, e.g. `projects/my-group%2Fmy-project`
    pub fn path(&self) -> String {
        let collection = match self {
            Owner::Project(_) => "projects",
            Owner::Group(_) => "groups",
        };
        format!("{}/{}", collection, urlencoding::encode(self.id()))
    }
}

impl fmt::Display for Owner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind(), self.id())
    }
}

/// Main GitLab client
#[derive(Clone)]
pub struct GitlabClient {
    http: GitlabHttpClient,
    base_url: Url,
    token: String,
}

impl GitlabClient {
    /// Create a client from provider configuration
    pub fn new(config: &ProviderConfig) -> Result<Self> {
        let base_url = config.effective_base_url()?;
        let token = config.effective_token()?.to_string();

        let ca_cert_pem = match &config.cacert_file {
            Some(path) => Some(std::fs::read(path).map_err(|e| {
                ProviderError::InvalidConfig(format!(
                    "failed to read cacert_file {}: {}",
                    path.display(),
                    e
                ))
            })?),
            None => None,
        };
        let http = GitlabHttpClient::new(&HttpOptions {
            insecure: config.insecure,
            ca_cert_pem,
        })?;

        tracing::info!("GitLab client configured for {}", base_url);

        Ok(Self::with_http(http, base_url, token))
    }

    /// Create a client from an already built transport
    pub fn with_http(http: GitlabHttpClient, base_url: Url, token: impl Into<String>) -> Self {
        Self {
            http,
            base_url,
            token: token.into(),
        }
    }

    /// API base URL, always ending in `/`
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Build an API URL relative to the base URL
    pub fn api_url(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path)
            .map_err(|e| ProviderError::InvalidConfig(format!("invalid API path {}: {}", path, e)))
    }

    /// Build an API URL below a project or group
    pub fn owner_url(&self, owner: &Owner, path: &str) -> Result<Url> {
        self.api_url(&format!("{}/{}", owner.path(), path))
    }

    /// Make a GET request to the GitLab API
    pub async fn get(&self, url: Url) -> Result<ApiResponse> {
        self.http.get(url, &self.token).await
    }

    /// Make a POST request to the GitLab API
    pub async fn post<B: Serialize + ?Sized>(&self, url: Url, body: &B) -> Result<ApiResponse> {
        self.http.post(url, &self.token, body).await
    }

    /// Make a PUT request to the GitLab API
    pub async fn put<B: Serialize + ?Sized>(&self, url: Url, body: &B) -> Result<ApiResponse> {
        self.http.put(url, &self.token, body).await
    }

    /// Make a DELETE request to the GitLab API
    pub async fn delete(&self, url: Url) -> Result<ApiResponse> {
        self.http.delete(url, &self.token).await
    }
}
