//! Field validators and config validation

use super::ResourceSchema;
use crate::error::{ProviderError, Result};
use crate::gitlab::{DeployTokenScope, VariableType};
use serde_json::{Map, Value};
use std::collections::BTreeSet;

/// GitLab rejects longer variable keys
pub const VARIABLE_KEY_MAX_LEN: usize = 255;

/// Variable keys may only contain letters, digits and underscores
pub fn is_valid_variable_key(key: &str) -> bool {
    !key.is_empty()
        && key.len() <= VARIABLE_KEY_MAX_LEN
        && key.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn expect_str(value: &Value) -> std::result::Result<&str, String> {
    value
        .as_str()
        .ok_or_else(|| format!("expected a string, got {}", value))
}

pub fn variable_key(value: &Value) -> std::result::Result<(), String> {
    let key = expect_str(value)?;
    if is_valid_variable_key(key) {
        Ok(())
    } else {
        Err(format!(
            "{:?} is not a valid variable key: only A-Z, a-z, 0-9 and _ are allowed, up to {} characters",
            key, VARIABLE_KEY_MAX_LEN
        ))
    }
}

pub fn variable_type(value: &Value) -> std::result::Result<(), String> {
    let ty = expect_str(value)?;
    ty.parse::<VariableType>()
        .map(|_| ())
        .map_err(|_| format!("expected one of [env_var file], got {:?}", ty))
}

/// Validates every element of a deploy token scope set
pub fn deploy_token_scopes(value: &Value) -> std::result::Result<(), String> {
    let Some(items) = value.as_array() else {
        return Err(format!("expected a set of scopes, got {}", value));
    };
    for item in items {
        let scope = expect_str(item)?;
        if scope.parse::<DeployTokenScope>().is_err() {
            let allowed: Vec<&str> = DeployTokenScope::ALL.iter().map(|s| s.as_str()).collect();
            return Err(format!(
                "expected scope to be one of {:?}, got {:?}",
                allowed, scope
            ));
        }
    }
    Ok(())
}

pub fn rfc3339_time(value: &Value) -> std::result::Result<(), String> {
    let raw = expect_str(value)?;
    chrono::DateTime::parse_from_rfc3339(raw)
        .map(|_| ())
        .map_err(|e| format!("{:?} is not a valid RFC3339 time: {}", raw, e))
}

fn is_set(config: &Map<String, Value>, name: &str) -> bool {
    config.get(name).is_some_and(|v| !v.is_null())
}

impl ResourceSchema {
    /// Check a user supplied configuration, collecting every problem found
    pub fn validate(&self, config: &Map<String, Value>) -> Result<()> {
        let mut problems = Vec::new();

        for (name, value) in config {
            let Some(attribute) = self.attributes.get(name) else {
                problems.push(format!("{}: unsupported argument", name));
                continue;
            };
            if value.is_null() {
                continue;
            }
            if !attribute.is_configurable() {
                problems.push(format!("{}: value for unconfigurable attribute", name));
                continue;
            }
            if !attribute.ty.accepts(value) {
                problems.push(format!(
                    "{}: expected {:?}, got {}",
                    name, attribute.ty, value
                ));
                continue;
            }
            if let Some(validate) = attribute.validate {
                if let Err(message) = validate(value) {
                    problems.push(format!("{}: {}", name, message));
                }
            }
        }

        let mut groups_checked = BTreeSet::new();
        for (name, attribute) in &self.attributes {
            if attribute.required && !is_set(config, name) {
                problems.push(format!("{}: the argument is required", name));
            }

            if attribute.exactly_one_of.is_empty() {
                continue;
            }
            let mut group = attribute.exactly_one_of.clone();
            group.sort();
            let label = group.join(",");
            if !groups_checked.insert(label.clone()) {
                continue;
            }
            match group.iter().filter(|n| is_set(config, n)).count() {
                1 => {}
                0 => problems.push(format!("one of `{}` must be specified", label)),
                _ => problems.push(format!("only one of `{}` can be specified", label)),
            }
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(ProviderError::Validation(problems))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Attribute, AttributeType};
    use serde_json::json;

    #[test]
    fn test_variable_key_pattern() {
        assert!(variable_key(&json!("DEPLOY_KEY_1")).is_ok());
        assert!(variable_key(&json!("with-dash")).is_err());
        assert!(variable_key(&json!("")).is_err());
        assert!(variable_key(&json!("A".repeat(256))).is_err());
        assert!(variable_key(&json!(12)).is_err());
    }

    #[test]
    fn test_variable_type_enumeration() {
        assert!(variable_type(&json!("env_var")).is_ok());
        assert!(variable_type(&json!("file")).is_ok());
        assert!(variable_type(&json!("ENV_VAR")).is_err());
    }

    #[test]
    fn test_deploy_token_scopes() {
        assert!(deploy_token_scopes(&json!(["read_repository", "write_registry"])).is_ok());
        let err = deploy_token_scopes(&json!(["read_repository", "api"])).unwrap_err();
        assert!(err.contains("\"api\""));
    }

    #[test]
    fn test_rfc3339_time() {
        assert!(rfc3339_time(&json!("2030-01-01T00:00:00Z")).is_ok());
        assert!(rfc3339_time(&json!("2030-01-01T00:00:00+02:00")).is_ok());
        assert!(rfc3339_time(&json!("2030-01-01")).is_err());
    }

    fn owner_schema() -> ResourceSchema {
        ResourceSchema::new("test")
            .with_attribute(
                "project",
                Attribute::optional(AttributeType::String).exactly_one_of(&["project", "group"]),
            )
            .with_attribute(
                "group",
                Attribute::optional(AttributeType::String).exactly_one_of(&["project", "group"]),
            )
            .with_attribute(
                "key",
                Attribute::required(AttributeType::String).with_validator(variable_key),
            )
            .with_attribute("token", Attribute::computed(AttributeType::String))
    }

    fn config(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_validate_accepts_valid_config() {
        let schema = owner_schema();
        assert!(schema.validate(&config(json!({"project": "a/b", "key": "K"}))).is_ok());
    }

    #[test]
    fn test_validate_exactly_one_of() {
        let schema = owner_schema();

        let err = schema.validate(&config(json!({"key": "K"}))).unwrap_err();
        match err {
            ProviderError::Validation(problems) => {
                assert_eq!(problems, vec!["one of `group,project` must be specified"]);
            }
            other => panic!("unexpected error: {other:?}"),
        }

        let err = schema
            .validate(&config(json!({"key": "K", "project": "p", "group": "g"})))
            .unwrap_err();
        assert!(err.to_string().contains("only one of `group,project` can be specified"));
    }

    #[test]
    fn test_validate_collects_all_problems() {
        let schema = owner_schema();
        let err = schema
            .validate(&config(json!({
                "project": "p",
                "key": "bad-key",
                "token": "x",
                "extra": 1
            })))
            .unwrap_err();

        let ProviderError::Validation(problems) = err else {
            panic!("expected validation error");
        };
        assert_eq!(problems.len(), 3);
        assert!(problems.iter().any(|p| p.starts_with("extra: unsupported")));
        assert!(problems.iter().any(|p| p.starts_with("token: value for unconfigurable")));
        assert!(problems.iter().any(|p| p.starts_with("key: ")));
    }

    #[test]
    fn test_validate_required_and_types() {
        let schema = owner_schema();
        let err = schema
            .validate(&config(json!({"group": 5})))
            .unwrap_err();
        let ProviderError::Validation(problems) = err else {
            panic!("expected validation error");
        };
        assert!(problems.iter().any(|p| p.starts_with("group: expected String")));
        assert!(problems.iter().any(|p| p == "key: the argument is required"));
    }
}
