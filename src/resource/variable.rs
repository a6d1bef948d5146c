//! Shared pieces of the project and group variable resources

use super::id::DEFAULT_ENVIRONMENT_SCOPE;
use super::ResourceData;
use crate::error::{ProviderError, Result};
use crate::gitlab::{CreateVariableOptions, UpdateVariableOptions, Variable, VariableType};
use crate::schema::{validation, Attribute, AttributeType, ResourceSchema};
use reqwest::StatusCode;

pub(crate) const MASKED_VALUE_ERROR: &str = "Invalid value for a masked variable. Check the masked variable requirements: https://docs.gitlab.com/ee/ci/variables/#masked-variable-requirements";

/// Descriptions that differ between the project and group flavours
pub(crate) struct VariableDocs {
    pub resource: &'static str,
    pub owner: &'static str,
    pub masked: &'static str,
    pub environment_scope: &'static str,
}

pub(crate) fn schema(owner_attr: &str, docs: VariableDocs) -> ResourceSchema {
    ResourceSchema::new(docs.resource)
        .with_attribute(
            owner_attr,
            Attribute::required(AttributeType::String)
                .force_new()
                .with_description(docs.owner),
        )
        .with_attribute(
            "key",
            Attribute::required(AttributeType::String)
                .force_new()
                .with_validator(validation::variable_key)
                .with_description("The name of the variable."),
        )
        .with_attribute(
            "value",
            Attribute::required(AttributeType::String)
                .sensitive()
                .with_description("The value of the variable."),
        )
        .with_attribute(
            "variable_type",
            Attribute::optional(AttributeType::String)
                .with_default(VariableType::EnvVar.as_str())
                .with_validator(validation::variable_type)
                .with_description(
                    "The type of a variable. Available types are: env_var (default) and file.",
                ),
        )
        .with_attribute(
            "protected",
            Attribute::optional(AttributeType::Bool)
                .with_default(false)
                .with_description(
                    "If set to `true`, the variable will be passed only to pipelines running on protected branches and tags. Defaults to `false`.",
                ),
        )
        .with_attribute(
            "masked",
            Attribute::optional(AttributeType::Bool)
                .with_default(false)
                .with_description(docs.masked),
        )
        .with_attribute(
            "environment_scope",
            Attribute::optional(AttributeType::String)
                .force_new()
                .with_default(DEFAULT_ENVIRONMENT_SCOPE)
                .with_description(docs.environment_scope),
        )
}

pub(crate) fn required_str<'a>(d: &'a ResourceData, name: &str) -> Result<&'a str> {
    d.get_str(name)
        .ok_or_else(|| ProviderError::InvalidConfig(format!("{}: the argument is required", name)))
}

pub(crate) fn environment_scope(d: &ResourceData) -> &str {
    d.get_str("environment_scope")
        .unwrap_or(DEFAULT_ENVIRONMENT_SCOPE)
}

fn variable_type(d: &ResourceData) -> Result<VariableType> {
    d.get_str("variable_type")
        .map(str::parse::<VariableType>)
        .transpose()
        .map(Option::unwrap_or_default)
}

// value may legitimately be empty
fn value(d: &ResourceData) -> String {
    d.get("value")
        .and_then(|v| v.as_str())
        .unwrap_or_default()
        .to_string()
}

pub(crate) fn create_options(d: &ResourceData) -> Result<CreateVariableOptions> {
    Ok(CreateVariableOptions {
        key: required_str(d, "key")?.to_string(),
        value: value(d),
        variable_type: variable_type(d)?,
        protected: d.get_bool("protected").unwrap_or(false),
        masked: d.get_bool("masked").unwrap_or(false),
        environment_scope: environment_scope(d).to_string(),
    })
}

pub(crate) fn update_options(d: &ResourceData) -> Result<UpdateVariableOptions> {
    Ok(UpdateVariableOptions {
        value: value(d),
        variable_type: variable_type(d)?,
        protected: d.get_bool("protected").unwrap_or(false),
        masked: d.get_bool("masked").unwrap_or(false),
        environment_scope: environment_scope(d).to_string(),
    })
}

/// Copy a remote variable into state
pub(crate) fn set_state(d: &mut ResourceData, owner_attr: &str, owner: &str, variable: Variable) {
    d.set(owner_attr, owner);
    d.set("key", variable.key);
    d.set("value", variable.value);
    d.set("variable_type", variable.variable_type.as_str());
    d.set("protected", variable.protected);
    d.set("masked", variable.masked);
    d.set("environment_scope", variable.environment_scope);
}

/// GitLab answers a bad masked value with a terse 400; point at the rules
pub(crate) fn augment_error(d: &ResourceData, err: ProviderError) -> ProviderError {
    if d.get_bool("masked") != Some(true) {
        return err;
    }
    match err {
        ProviderError::Api { status, message }
            if status == StatusCode::BAD_REQUEST && message.contains("value") =>
        {
            ProviderError::Api {
                status,
                message: MASKED_VALUE_ERROR.to_string(),
            }
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn bad_value() -> ProviderError {
        ProviderError::Api {
            status: StatusCode::BAD_REQUEST,
            message: "{value: [is invalid]}".to_string(),
        }
    }

    #[test]
    fn test_augment_error_only_for_masked() {
        let mut d = ResourceData::new();
        let err = augment_error(&d, bad_value());
        assert!(!err.to_string().contains("masked"));

        d.set("masked", true);
        let err = augment_error(&d, bad_value());
        assert!(err.to_string().contains(MASKED_VALUE_ERROR));

        let err = augment_error(&d, ProviderError::NotFound("404".into()));
        assert!(err.is_not_found());
    }

    #[test]
    fn test_options_fall_back_to_defaults() {
        let mut d = ResourceData::new();
        d.set("key", "TOKEN");
        d.set("value", "");

        let options = create_options(&d).unwrap();
        assert_eq!(options.value, "");
        assert_eq!(options.variable_type, VariableType::EnvVar);
        assert!(!options.protected && !options.masked);
        assert_eq!(options.environment_scope, "*");

        d.set("variable_type", "file");
        d.set("environment_scope", "production");
        let options = update_options(&d).unwrap();
        assert_eq!(options.variable_type, VariableType::File);
        assert_eq!(options.environment_scope, "production");
    }

    #[test]
    fn test_create_requires_key() {
        let d = ResourceData::new();
        assert!(create_options(&d).is_err());
    }

    #[test]
    fn test_set_state() {
        let mut d = ResourceData::new();
        let variable: Variable = serde_json::from_value(json!({
            "key": "TOKEN",
            "value": "secret",
            "variable_type": "file",
            "protected": true,
            "masked": false,
            "environment_scope": "staging",
        }))
        .unwrap();

        set_state(&mut d, "group", "mygroup", variable);
        assert_eq!(d.get_str("group"), Some("mygroup"));
        assert_eq!(d.get_str("variable_type"), Some("file"));
        assert_eq!(d.get_bool("protected"), Some(true));
        assert_eq!(d.get_str("environment_scope"), Some("staging"));
    }
}
