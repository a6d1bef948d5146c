//! Request loop spoken with the orchestration tool
//!
//! One JSON request per input line, one JSON response per output line.
//!
//! ```text
//! -> {"operation":"read","type_name":"gitlab_deploy_token","state":{"id":"12","attributes":{"project":"g/p"}}}
//! <- {"status":"removed"}
//! ```

use crate::config::ProviderConfig;
use crate::error::{ProviderError, Result};
use crate::provider::{self, Provider};
use crate::resource::{Registry, ResourceData};
use anyhow::Context;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

/// A request, tagged by `operation`
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "operation", rename_all = "snake_case")]
pub enum Request {
    Schema,
    Configure {
        #[serde(default)]
        config: ProviderConfig,
    },
    Validate {
        type_name: String,
        #[serde(default)]
        config: Map<String, Value>,
    },
    Plan {
        type_name: String,
        #[serde(default)]
        prior: Option<ResourceData>,
        #[serde(default)]
        config: Map<String, Value>,
    },
    Create {
        type_name: String,
        #[serde(default)]
        config: Map<String, Value>,
    },
    Read {
        type_name: String,
        state: ResourceData,
    },
    Update {
        type_name: String,
        prior: ResourceData,
        #[serde(default)]
        config: Map<String, Value>,
    },
    Delete {
        type_name: String,
        state: ResourceData,
    },
    Import {
        type_name: String,
        id: String,
    },
    ReadDataSource {
        type_name: String,
        #[serde(default)]
        config: Map<String, Value>,
    },
}

/// A response, tagged by `status`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Response {
    Ok { result: Value },
    /// The remote object is gone; the caller drops its record
    Removed,
    Error { message: String },
}

impl Response {
    fn from_result(result: Result<Option<Value>>) -> Self {
        match result {
            Ok(Some(result)) => Response::Ok { result },
            Ok(None) => Response::Removed,
            Err(e) => {
                tracing::error!("Request failed: {}", e);
                Response::Error {
                    message: e.to_string(),
                }
            }
        }
    }
}

pub struct Server {
    base_config: ProviderConfig,
    registry: Registry,
    provider: Option<Provider>,
}

impl Server {
    /// `base_config` is overlaid by each `configure` request
    pub fn new(registry: Registry, base_config: ProviderConfig) -> Self {
        Self {
            base_config,
            registry,
            provider: None,
        }
    }

    /// A server whose provider is already composed (used by tests)
    pub fn with_provider(registry: Registry, provider: Provider) -> Self {
        Self {
            base_config: ProviderConfig::default(),
            registry,
            provider: Some(provider),
        }
    }

    fn provider(&self) -> Result<&Provider> {
        self.provider.as_ref().ok_or(ProviderError::NotConfigured)
    }

    pub async fn handle(&mut self, request: Request) -> Response {
        Response::from_result(self.dispatch(request).await)
    }

    async fn dispatch(&mut self, request: Request) -> Result<Option<Value>> {
        let value = match request {
            Request::Schema => serde_json::to_value(self.registry.schema())?,
            Request::Configure { config } => {
                let config = self.base_config.clone().merge(config);
                let provider = Provider::from_config(&self.registry, &config)?;
                self.provider = Some(provider);
                Value::Null
            }
            Request::Validate { type_name, config } => {
                provider::validate(&self.registry, &type_name, &config)?;
                Value::Null
            }
            Request::Plan {
                type_name,
                prior,
                config,
            } => serde_json::to_value(provider::plan(
                &self.registry,
                &type_name,
                prior.as_ref(),
                config,
            )?)?,
            Request::Create { type_name, config } => {
                serde_json::to_value(self.provider()?.create(&type_name, config).await?)?
            }
            Request::Read { type_name, state } => {
                match self.provider()?.read(&type_name, state).await? {
                    Some(state) => serde_json::to_value(state)?,
                    None => return Ok(None),
                }
            }
            Request::Update {
                type_name,
                prior,
                config,
            } => serde_json::to_value(self.provider()?.update(&type_name, prior, config).await?)?,
            Request::Delete { type_name, state } => {
                self.provider()?.delete(&type_name, state).await?;
                Value::Null
            }
            Request::Import { type_name, id } => {
                match self.provider()?.import(&type_name, &id).await? {
                    Some(state) => serde_json::to_value(state)?,
                    None => return Ok(None),
                }
            }
            Request::ReadDataSource { type_name, config } => serde_json::to_value(
                self.provider()?.read_data_source(&type_name, config).await?,
            )?,
        };
        Ok(Some(value))
    }

    /// Serve requests until the reader reaches EOF
    pub async fn run<R, W>(&mut self, reader: R, mut writer: W) -> anyhow::Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut lines = reader.lines();

        while let Some(line) = lines.next_line().await.context("Failed to read request")? {
            if line.trim().is_empty() {
                continue;
            }

            let response = match serde_json::from_str::<Request>(&line) {
                Ok(request) => {
                    tracing::debug!("Handling {:?} request", operation_name(&request));
                    self.handle(request).await
                }
                Err(e) => {
                    tracing::warn!("Malformed request: {}", e);
                    Response::Error {
                        message: format!("malformed request: {}", e),
                    }
                }
            };

            let mut out = serde_json::to_string(&response).context("Failed to encode response")?;
            out.push('\n');
            writer
                .write_all(out.as_bytes())
                .await
                .context("Failed to write response")?;
            writer.flush().await.context("Failed to flush response")?;
        }

        tracing::info!("Input closed, shutting down");
        Ok(())
    }
}

// Requests carry secrets, so only the operation is logged
fn operation_name(request: &Request) -> &'static str {
    match request {
        Request::Schema => "schema",
        Request::Configure { .. } => "configure",
        Request::Validate { .. } => "validate",
        Request::Plan { .. } => "plan",
        Request::Create { .. } => "create",
        Request::Read { .. } => "read",
        Request::Update { .. } => "update",
        Request::Delete { .. } => "delete",
        Request::Import { .. } => "import",
        Request::ReadDataSource { .. } => "read_data_source",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_decoding() {
        let request: Request = serde_json::from_value(json!({
            "operation": "import",
            "type_name": "gitlab_project_variable",
            "id": "1:KEY:*",
        }))
        .unwrap();
        assert!(matches!(request, Request::Import { ref id, .. } if id == "1:KEY:*"));

        let request: Request = serde_json::from_value(json!({
            "operation": "read_data_source",
            "type_name": "gitlab_instance_settings",
        }))
        .unwrap();
        assert_eq!(operation_name(&request), "read_data_source");
    }

    #[test]
    fn test_response_encoding() {
        assert_eq!(serde_json::to_value(Response::Removed).unwrap(), json!({"status": "removed"}));
        assert_eq!(
            serde_json::to_value(Response::Ok { result: json!(1) }).unwrap(),
            json!({"status": "ok", "result": 1})
        );
    }

    #[tokio::test]
    async fn test_unconfigured_crud_is_rejected() {
        let mut server = Server::new(Registry::gitlab(), ProviderConfig::default());
        let response = server
            .handle(Request::Delete {
                type_name: "gitlab_instance_settings".into(),
                state: ResourceData::with_id("https://gitlab.com/api/v4/"),
            })
            .await;
        assert_eq!(
            response,
            Response::Error {
                message: "Provider is not configured".into()
            }
        );
    }

    #[tokio::test]
    async fn test_configure_requires_token() {
        let mut server = Server::new(Registry::gitlab(), ProviderConfig::default());
        let response = server
            .handle(Request::Configure {
                config: ProviderConfig::default(),
            })
            .await;
        assert!(matches!(
            response,
            Response::Error { ref message } if message.contains("token is required")
        ));
    }

    #[tokio::test]
    async fn test_run_survives_malformed_lines() {
        let mut server = Server::new(Registry::gitlab(), ProviderConfig::default());
        let request = r#"{"operation":"validate","type_name":"gitlab_group_variable","config":{"group":"g","key":"K","value":"v"}}"#;
        let input = format!("not json\n\n{}\n", request);
        let mut output = Vec::new();

        server.run(input.as_bytes(), &mut output).await.unwrap();

        let lines: Vec<Response> = String::from_utf8(output)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 2);
        assert!(matches!(
            lines[0],
            Response::Error { ref message } if message.starts_with("malformed request")
        ));
        assert_eq!(lines[1], Response::Ok { result: Value::Null });
    }
}
