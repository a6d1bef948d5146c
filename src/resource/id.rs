//! Composite local identifiers
//!
//! Formats (must stay stable, they live in users' state):
//! - deploy token: decimal remote ID
//! - project variable: `project:key:environment_scope`, legacy `project:key`
//! - group variable: `group:key:environment_scope`, `group:key` read with scope `*`

use crate::error::{ProviderError, Result};
use std::fmt;

/// Scope used by GitLab when none is given
pub const DEFAULT_ENVIRONMENT_SCOPE: &str = "*";

/// Addressing tuple of a project or group CI/CD variable
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariableId {
    pub owner: String,
    pub key: String,
    pub environment_scope: String,
}

impl VariableId {
    pub fn new(
        owner: impl Into<String>,
        key: impl Into<String>,
        environment_scope: impl Into<String>,
    ) -> Self {
        Self {
            owner: owner.into(),
            key: key.into(),
            environment_scope: environment_scope.into(),
        }
    }

    /// Parse `owner:key:scope` or the legacy `owner:key`.
    ///
    /// The legacy form predates scope-aware IDs; its scope comes from
    /// `legacy_scope` (the scope recorded in state).
    pub fn parse(id: &str, owner_kind: &str, legacy_scope: &str) -> Result<Self> {
        let parts: Vec<&str> = id.splitn(4, ':').collect();
        let parsed = match parts.as_slice() {
            [owner, key] => Self::new(*owner, *key, legacy_scope),
            [owner, key, scope] => Self::new(*owner, *key, *scope),
            _ => return Err(Self::format_error(id, owner_kind)),
        };

        if parsed.owner.is_empty() || parsed.key.is_empty() || parsed.environment_scope.is_empty() {
            return Err(Self::format_error(id, owner_kind));
        }
        Ok(parsed)
    }

    fn format_error(id: &str, owner_kind: &str) -> ProviderError {
        ProviderError::InvalidId(format!(
            "Failed to parse {kind} variable ID {id:?}: expected format {kind}:key or {kind}:key:environment_scope",
            kind = owner_kind,
            id = id
        ))
    }
}

impl fmt::Display for VariableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.owner, self.key, self.environment_scope)
    }
}

/// Parse a deploy token identifier
pub fn parse_deploy_token_id(id: &str) -> Result<u64> {
    id.parse().map_err(|_| {
        ProviderError::InvalidId(format!(
            "Failed to parse deploy token ID {:?}: expected a numeric ID",
            id
        ))
    })
}
