//! Application settings endpoints
//!
//! Settings are one instance-wide object. They are kept as raw JSON because
//! only a curated subset is mapped onto the local schema.

use super::client::GitlabClient;
use crate::error::{ProviderError, Result};
use async_trait::async_trait;
use serde_json::{Map, Value};

/// Instance settings capability of the remote
#[async_trait]
pub trait SettingsApi: Send + Sync {
    /// Stable identifier for the singleton settings object
    fn base_url(&self) -> String;

    async fn get_settings(&self) -> Result<Map<String, Value>>;

    /// Apply the given fields and return the full settings object
    async fn update_settings(&self, changes: &Map<String, Value>) -> Result<Map<String, Value>>;
}

fn into_object(value: Value) -> Result<Map<String, Value>> {
    match value {
        Value::Object(map) => Ok(map),
        other => Err(ProviderError::Api {
            status: reqwest::StatusCode::OK,
            message: format!("expected settings object, got {}", other),
        }),
    }
}

#[async_trait]
impl SettingsApi for GitlabClient {
    fn base_url(&self) -> String {
        GitlabClient::base_url(self).to_string()
    }

    async fn get_settings(&self) -> Result<Map<String, Value>> {
        let url = self.api_url("application/settings")?;
        into_object(self.get(url).await?.json()?)
    }

    async fn update_settings(&self, changes: &Map<String, Value>) -> Result<Map<String, Value>> {
        let url = self.api_url("application/settings")?;
        into_object(self.put(url, changes).await?.json()?)
    }
}
