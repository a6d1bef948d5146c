//! Configuration Management
//!
//! Provider configuration is layered: config file, then environment, then the
//! `configure` request sent by the orchestration tool.

use crate::error::{ProviderError, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use url::Url;

/// Used when no base URL is configured
pub const DEFAULT_BASE_URL: &str = "https://gitlab.com/api/v4/";

const API_SUFFIX: &str = "api/v4/";

/// Provider configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct ProviderConfig {
    /// Personal, project or group access token
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    /// GitLab API endpoint, e.g. `https://gitlab.example.com/api/v4/`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    /// PEM file with an additional root certificate
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cacert_file: Option<PathBuf>,
    /// Disable TLS certificate verification
    #[serde(default)]
    pub insecure: bool,
}

impl ProviderConfig {
    /// Get the config file path
    fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("gitlab-provider").join("config.json"))
    }

    /// Load configuration from disk, falling back to defaults
    pub fn load() -> Self {
        let Some(path) = Self::config_path() else {
            return Self::default();
        };

        if !path.exists() {
            return Self::default();
        }

        match std::fs::read_to_string(&path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
                tracing::warn!("Ignoring malformed config file {:?}: {}", path, e);
                Self::default()
            }),
            Err(_) => Self::default(),
        }
    }

    /// Apply `GITLAB_*` environment variables on top of this configuration
    pub fn with_env(self) -> Self {
        self.with_env_from(|name| std::env::var(name).ok())
    }

    fn with_env_from(mut self, var: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(token) = var("GITLAB_TOKEN").filter(|v| !v.is_empty()) {
            self.token = Some(token);
        }
        if let Some(base_url) = var("GITLAB_BASE_URL").filter(|v| !v.is_empty()) {
            self.base_url = Some(base_url);
        }
        if let Some(cacert) = var("GITLAB_CACERT_FILE").filter(|v| !v.is_empty()) {
            self.cacert_file = Some(PathBuf::from(cacert));
        }
        if let Some(insecure) = var("GITLAB_INSECURE") {
            self.insecure = matches!(insecure.as_str(), "1" | "true" | "TRUE" | "True");
        }
        self
    }

    /// Overlay another configuration; its set values win
    pub fn merge(mut self, overrides: ProviderConfig) -> Self {
        if overrides.token.is_some() {
            self.token = overrides.token;
        }
        if overrides.base_url.is_some() {
            self.base_url = overrides.base_url;
        }
        if overrides.cacert_file.is_some() {
            self.cacert_file = overrides.cacert_file;
        }
        self.insecure |= overrides.insecure;
        self
    }

    /// Get effective API base URL (config > default), normalized to end in `api/v4/`
    pub fn effective_base_url(&self) -> Result<Url> {
        let raw = self
            .base_url
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or(DEFAULT_BASE_URL)
            .trim();

        let mut normalized = raw.to_string();
        if !normalized.ends_with('/') {
            normalized.push('/');
        }
        if !normalized.ends_with(API_SUFFIX) {
            normalized.push_str(API_SUFFIX);
        }

        Url::parse(&normalized).map_err(|e| {
            ProviderError::InvalidConfig(format!("invalid base_url {:?}: {}", raw, e))
        })
    }

    /// Get the API token, which is mandatory
    pub fn effective_token(&self) -> Result<&str> {
        self.token
            .as_deref()
            .filter(|t| !t.is_empty())
            .ok_or_else(|| {
                ProviderError::InvalidConfig(
                    "token is required (set it in the provider configuration or GITLAB_TOKEN)"
                        .to_string(),
                )
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_base_url() {
        let config = ProviderConfig::default();
        assert_eq!(config.effective_base_url().unwrap().as_str(), DEFAULT_BASE_URL);
    }

    #[test]
    fn test_base_url_gets_api_suffix() {
        for raw in [
            "https://gitlab.example.com",
            "https://gitlab.example.com/",
            "https://gitlab.example.com/api/v4",
            "https://gitlab.example.com/api/v4/",
        ] {
            let config = ProviderConfig {
                base_url: Some(raw.to_string()),
                ..Default::default()
            };
            assert_eq!(
                config.effective_base_url().unwrap().as_str(),
                "https://gitlab.example.com/api/v4/",
                "normalizing {raw}"
            );
        }
    }

    #[test]
    fn test_invalid_base_url() {
        let config = ProviderConfig {
            base_url: Some("not a url".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            config.effective_base_url(),
            Err(ProviderError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_token_is_required() {
        assert!(ProviderConfig::default().effective_token().is_err());
        let config = ProviderConfig {
            token: Some("glpat-123".to_string()),
            ..Default::default()
        };
        assert_eq!(config.effective_token().unwrap(), "glpat-123");
    }

    #[test]
    fn test_env_overrides_file() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("GITLAB_TOKEN", "from-env"),
            ("GITLAB_INSECURE", "true"),
        ]);
        let config = ProviderConfig {
            token: Some("from-file".to_string()),
            base_url: Some("https://file.example.com".to_string()),
            ..Default::default()
        }
        .with_env_from(|name| env.get(name).map(|v| v.to_string()));

        assert_eq!(config.token.as_deref(), Some("from-env"));
        assert_eq!(config.base_url.as_deref(), Some("https://file.example.com"));
        assert!(config.insecure);
    }

    #[test]
    fn test_merge_prefers_overrides() {
        let base = ProviderConfig {
            token: Some("env".to_string()),
            base_url: Some("https://env.example.com".to_string()),
            ..Default::default()
        };
        let merged = base.merge(ProviderConfig {
            token: Some("request".to_string()),
            ..Default::default()
        });

        assert_eq!(merged.token.as_deref(), Some("request"));
        assert_eq!(merged.base_url.as_deref(), Some("https://env.example.com"));
    }
}
