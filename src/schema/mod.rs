//! Declarative schema surface
//!
//! Every resource and data source describes its attributes with flags the
//! orchestration tool understands (required, optional, computed, sensitive,
//! force_new) plus an optional validator per constrained field.
//!
//! - [`validation`] - Field validators and config validation
//! - [`plan`] - Diffing prior state against proposed config

pub mod plan;
pub mod validation;

pub use plan::{AttributeChange, PlanResult};

use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Validates a single configured value; the error names the problem
pub type ValidateFn = fn(&Value) -> Result<(), String>;

/// Returns true when an old and new string are semantically equal
pub type DiffSuppressFn = fn(&str, &str) -> bool;

/// Value type of an attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AttributeType {
    String,
    Bool,
    Int,
    Float,
    StringList,
    IntList,
    /// Unordered, duplicate-free list of strings
    StringSet,
}

impl AttributeType {
    /// Whether a JSON value has this type. Null is accepted everywhere.
    pub fn accepts(&self, value: &Value) -> bool {
        match (self, value) {
            (_, Value::Null) => true,
            (AttributeType::String, Value::String(_)) => true,
            (AttributeType::Bool, Value::Bool(_)) => true,
            (AttributeType::Int, Value::Number(n)) => n.is_i64() || n.is_u64(),
            (AttributeType::Float, Value::Number(_)) => true,
            (AttributeType::StringList | AttributeType::StringSet, Value::Array(items)) => {
                items.iter().all(Value::is_string)
            }
            (AttributeType::IntList, Value::Array(items)) => {
                items.iter().all(|v| v.is_i64() || v.is_u64())
            }
            _ => false,
        }
    }
}

fn is_false(b: &bool) -> bool {
    !*b
}

/// A single schema attribute
#[derive(Debug, Clone, Serialize)]
pub struct Attribute {
    #[serde(rename = "type")]
    pub ty: AttributeType,
    pub description: String,
    #[serde(skip_serializing_if = "is_false")]
    pub required: bool,
    #[serde(skip_serializing_if = "is_false")]
    pub optional: bool,
    #[serde(skip_serializing_if = "is_false")]
    pub computed: bool,
    #[serde(skip_serializing_if = "is_false")]
    pub sensitive: bool,
    #[serde(skip_serializing_if = "is_false")]
    pub force_new: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub exactly_one_of: Vec<String>,
    #[serde(skip)]
    pub validate: Option<ValidateFn>,
    #[serde(skip)]
    pub diff_suppress: Option<DiffSuppressFn>,
}

impl Attribute {
    fn new(ty: AttributeType) -> Self {
        Self {
            ty,
            description: String::new(),
            required: false,
            optional: false,
            computed: false,
            sensitive: false,
            force_new: false,
            default: None,
            exactly_one_of: Vec::new(),
            validate: None,
            diff_suppress: None,
        }
    }

    pub fn required(ty: AttributeType) -> Self {
        Self {
            required: true,
            ..Self::new(ty)
        }
    }

    pub fn optional(ty: AttributeType) -> Self {
        Self {
            optional: true,
            ..Self::new(ty)
        }
    }

    /// Set by the provider only
    pub fn computed(ty: AttributeType) -> Self {
        Self {
            computed: true,
            ..Self::new(ty)
        }
    }

    /// Configurable, filled from the remote when left unset
    pub fn optional_computed(ty: AttributeType) -> Self {
        Self {
            optional: true,
            computed: true,
            ..Self::new(ty)
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn sensitive(mut self) -> Self {
        self.sensitive = true;
        self
    }

    pub fn force_new(mut self) -> Self {
        self.force_new = true;
        self
    }

    pub fn with_default(mut self, default: impl Into<Value>) -> Self {
        self.default = Some(default.into());
        self
    }

    pub fn exactly_one_of(mut self, names: &[&str]) -> Self {
        self.exactly_one_of = names.iter().map(|n| n.to_string()).collect();
        self
    }

    pub fn with_validator(mut self, validate: ValidateFn) -> Self {
        self.validate = Some(validate);
        self
    }

    pub fn with_diff_suppress(mut self, diff_suppress: DiffSuppressFn) -> Self {
        self.diff_suppress = Some(diff_suppress);
        self
    }

    /// Whether the user may set this attribute
    pub fn is_configurable(&self) -> bool {
        self.required || self.optional
    }
}

/// Schema of a resource or data source
#[derive(Debug, Clone, Serialize)]
pub struct ResourceSchema {
    pub description: String,
    pub attributes: BTreeMap<String, Attribute>,
}

impl ResourceSchema {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            attributes: BTreeMap::new(),
        }
    }

    pub fn with_attribute(mut self, name: impl Into<String>, attribute: Attribute) -> Self {
        self.attributes.insert(name.into(), attribute);
        self
    }

    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.get(name)
    }

    /// Fill unset attributes that declare a default
    pub fn apply_defaults(&self, config: &mut Map<String, Value>) {
        for (name, attribute) in &self.attributes {
            let Some(default) = &attribute.default else {
                continue;
            };
            let unset = config.get(name).map_or(true, Value::is_null);
            if unset {
                config.insert(name.clone(), default.clone());
            }
        }
    }
}

/// Full provider schema: provider block, resources and data sources
#[derive(Debug, Clone, Serialize)]
pub struct ProviderSchema {
    pub provider: ResourceSchema,
    pub resources: BTreeMap<String, ResourceSchema>,
    pub data_sources: BTreeMap<String, ResourceSchema>,
}

impl ProviderSchema {
    /// Attributes of the provider configuration block
    pub fn provider_block() -> ResourceSchema {
        ResourceSchema::new("GitLab provider configuration")
            .with_attribute(
                "token",
                Attribute::optional(AttributeType::String)
                    .sensitive()
                    .with_description(
                        "The OAuth2 token or personal access token used to connect to GitLab. May also be set with GITLAB_TOKEN.",
                    ),
            )
            .with_attribute(
                "base_url",
                Attribute::optional(AttributeType::String).with_description(
                    "The GitLab base API URL, e.g. https://gitlab.example.com/api/v4/. Defaults to https://gitlab.com/api/v4/. May also be set with GITLAB_BASE_URL.",
                ),
            )
            .with_attribute(
                "cacert_file",
                Attribute::optional(AttributeType::String)
                    .with_description(
                        "A file containing the CA certificate to use when connecting to GitLab.",
                    ),
            )
            .with_attribute(
                "insecure",
                Attribute::optional(AttributeType::Bool)
                    .with_default(false)
                    .with_description(
                        "When set to true this disables SSL verification of the connection to GitLab.",
                    ),
            )
    }
}
