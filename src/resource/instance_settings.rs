//! gitlab_instance_settings
//!
//! The instance-wide application settings, exposed both as a resource and as
//! a data source. The settings object always exists: create and update share
//! one path and delete leaves the remote untouched.
//!
//! The mapped fields come from an embedded table. Settings the table lists
//! as deferred are known but deliberately not exposed yet.

use super::registry::{DataSourceFactory, ResourceFactory};
use super::{DataSource, Resource, ResourceData};
use crate::error::Result;
use crate::gitlab::{Clients, SettingsApi};
use crate::schema::{Attribute, AttributeType, ResourceSchema};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::sync::{Arc, OnceLock};

pub const TYPE_NAME: &str = "gitlab_instance_settings";

const FIELD_TABLE: &str = include_str!("../resources/instance_settings.json");

/// Value kind of a settings field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    Bool,
    Int,
    Float,
    String,
    StringList,
    IntList,
}

impl FieldKind {
    pub fn attribute_type(&self) -> AttributeType {
        match self {
            FieldKind::Bool => AttributeType::Bool,
            FieldKind::Int => AttributeType::Int,
            FieldKind::Float => AttributeType::Float,
            FieldKind::String => AttributeType::String,
            FieldKind::StringList => AttributeType::StringList,
            FieldKind::IntList => AttributeType::IntList,
        }
    }

    /// Bring a remote value into the local shape; `None` for null.
    /// Some GitLab versions return lists as comma separated strings.
    pub fn normalize(&self, value: &Value) -> Option<Value> {
        match (self, value) {
            (_, Value::Null) => None,
            (FieldKind::StringList, Value::String(raw)) => Some(Value::Array(
                split_list(raw).map(|s| Value::String(s.to_string())).collect(),
            )),
            (FieldKind::IntList, Value::String(raw)) => Some(Value::Array(
                split_list(raw)
                    .filter_map(|s| s.parse::<i64>().ok())
                    .map(Value::from)
                    .collect(),
            )),
            _ => Some(value.clone()),
        }
    }
}

fn split_list(raw: &str) -> impl Iterator<Item = &str> {
    raw.split(',').map(str::trim).filter(|s| !s.is_empty())
}

/// One mapped settings field
#[derive(Debug, Clone, Deserialize)]
pub struct FieldDef {
    pub name: String,
    pub kind: FieldKind,
    #[serde(default)]
    pub description: String,
}

/// Root structure of resources/instance_settings.json
#[derive(Debug, Clone, Deserialize)]
pub struct FieldTable {
    pub resource: String,
    pub fields: Vec<FieldDef>,
    /// Known settings not mapped yet
    #[serde(default)]
    pub deferred: Vec<String>,
}

static FIELDS: OnceLock<FieldTable> = OnceLock::new();

/// The embedded field table (parsed on first access)
pub fn field_table() -> &'static FieldTable {
    FIELDS.get_or_init(|| {
        let mut table: FieldTable = serde_json::from_str(FIELD_TABLE)
            .unwrap_or_else(|e| panic!("Failed to parse embedded instance settings JSON: {}", e));
        table.fields.retain(|f| !table.deferred.contains(&f.name));
        table
    })
}

fn build_schema(description: &str, attribute: fn(AttributeType) -> Attribute) -> ResourceSchema {
    field_table()
        .fields
        .iter()
        .fold(ResourceSchema::new(description), |schema, field| {
            schema.with_attribute(
                field.name.clone(),
                attribute(field.kind.attribute_type()).with_description(field.description.clone()),
            )
        })
}

pub fn schema() -> ResourceSchema {
    build_schema(
        "The `gitlab_instance_settings` resource allows to manage the GitLab application settings of an instance. Deleting it leaves the settings untouched.",
        Attribute::optional_computed,
    )
}

pub fn data_source_schema() -> ResourceSchema {
    build_schema(
        "The `gitlab_instance_settings` data source allows to retrieve the GitLab application settings of an instance.",
        Attribute::computed,
    )
}

/// Project the remote settings object onto state. Fields the remote left
/// out or returned as null are not touched.
fn set_state(d: &mut ResourceData, settings: &Map<String, Value>) {
    for field in &field_table().fields {
        if let Some(value) = settings.get(&field.name).and_then(|v| field.kind.normalize(v)) {
            d.set(&field.name, value);
        }
    }
}

/// The configured fields, including explicit false, zero and empty values
fn changes(config: &Map<String, Value>) -> Map<String, Value> {
    field_table()
        .fields
        .iter()
        .filter_map(|field| {
            config
                .get(&field.name)
                .filter(|v| !v.is_null())
                .map(|v| (field.name.clone(), v.clone()))
        })
        .collect()
}

pub fn factory() -> ResourceFactory {
    ResourceFactory {
        schema,
        build: |clients: &Clients| {
            Box::new(InstanceSettingsResource::new(clients.settings.clone()))
        },
    }
}

pub fn data_source_factory() -> DataSourceFactory {
    DataSourceFactory {
        schema: data_source_schema,
        build: |clients: &Clients| {
            Box::new(InstanceSettingsDataSource::new(clients.settings.clone()))
        },
    }
}

pub struct InstanceSettingsResource {
    api: Arc<dyn SettingsApi>,
}

impl InstanceSettingsResource {
    pub fn new(api: Arc<dyn SettingsApi>) -> Self {
        Self { api }
    }

    async fn create_or_update(
        &self,
        d: &mut ResourceData,
        config: &Map<String, Value>,
    ) -> Result<()> {
        let changes = changes(config);
        tracing::debug!("update gitlab instance level settings ({} fields)", changes.len());

        self.api.update_settings(&changes).await?;
        d.set_id(self.api.base_url());
        self.read(d).await
    }
}

#[async_trait]
impl Resource for InstanceSettingsResource {
    fn type_name(&self) -> &'static str {
        TYPE_NAME
    }

    async fn create(&self, d: &mut ResourceData) -> Result<()> {
        let config = d.attributes().clone();
        self.create_or_update(d, &config).await
    }

    async fn read(&self, d: &mut ResourceData) -> Result<()> {
        tracing::debug!("read gitlab instance level settings");
        // the settings can not disappear, so the id is never cleared
        let settings = self.api.get_settings().await?;
        set_state(d, &settings);
        Ok(())
    }

    async fn update(&self, d: &mut ResourceData, config: &Map<String, Value>) -> Result<()> {
        self.create_or_update(d, config).await
    }

    async fn delete(&self, _d: &mut ResourceData) -> Result<()> {
        tracing::debug!("delete gitlab instance level settings [noop]");
        Ok(())
    }
}

pub struct InstanceSettingsDataSource {
    api: Arc<dyn SettingsApi>,
}

impl InstanceSettingsDataSource {
    pub fn new(api: Arc<dyn SettingsApi>) -> Self {
        Self { api }
    }
}

#[async_trait]
impl DataSource for InstanceSettingsDataSource {
    fn type_name(&self) -> &'static str {
        TYPE_NAME
    }

    async fn read(&self, d: &mut ResourceData) -> Result<()> {
        let settings = self.api.get_settings().await?;
        d.set_id(self.api.base_url());
        set_state(d, &settings);
        Ok(())
    }
}
