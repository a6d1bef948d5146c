//! Diffing prior state against proposed config

use super::{AttributeType, ResourceSchema};
use crate::resource::ResourceData;
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeSet;

/// A single attribute that differs between prior and planned state
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AttributeChange {
    pub name: String,
    pub before: Value,
    pub after: Value,
    pub requires_replace: bool,
}

/// Outcome of planning a resource
#[derive(Debug, Clone, Serialize)]
pub struct PlanResult {
    pub planned_state: ResourceData,
    pub changes: Vec<AttributeChange>,
    /// A force_new attribute changed, so the resource is destroyed and recreated
    pub requires_replace: bool,
}

impl PlanResult {
    pub fn has_changes(&self) -> bool {
        !self.changes.is_empty()
    }
}

fn values_equal(ty: AttributeType, a: &Value, b: &Value) -> bool {
    match (ty, a, b) {
        (AttributeType::StringSet, Value::Array(a), Value::Array(b)) => {
            let a: BTreeSet<_> = a.iter().filter_map(Value::as_str).collect();
            let b: BTreeSet<_> = b.iter().filter_map(Value::as_str).collect();
            a == b
        }
        _ => a == b,
    }
}

impl ResourceSchema {
    /// Plan the transition from `prior` state to the `proposed` config.
    ///
    /// Computed attributes left out of the config keep their prior value and
    /// never show up as a change.
    pub fn plan(
        &self,
        prior: Option<&ResourceData>,
        mut proposed: Map<String, Value>,
    ) -> PlanResult {
        self.apply_defaults(&mut proposed);

        let Some(prior) = prior.filter(|p| p.id().is_some()) else {
            let changes = proposed
                .iter()
                .filter(|(_, v)| !v.is_null())
                .map(|(name, value)| AttributeChange {
                    name: name.clone(),
                    before: Value::Null,
                    after: value.clone(),
                    requires_replace: false,
                })
                .collect();
            return PlanResult {
                planned_state: ResourceData::from_attributes(proposed),
                changes,
                requires_replace: false,
            };
        };

        let mut planned = Map::new();
        let mut changes = Vec::new();

        for (name, attribute) in &self.attributes {
            let before = prior.get(name).cloned().unwrap_or(Value::Null);
            let configured = proposed.get(name).cloned().unwrap_or(Value::Null);

            let keep_prior =
                !attribute.is_configurable() || (configured.is_null() && attribute.computed);
            let mut after = if keep_prior {
                before.clone()
            } else {
                configured
            };

            if let (Some(suppress), Some(old), Some(new)) =
                (attribute.diff_suppress, before.as_str(), after.as_str())
            {
                if suppress(old, new) {
                    after = before.clone();
                }
            }

            if !values_equal(attribute.ty, &before, &after) {
                changes.push(AttributeChange {
                    name: name.clone(),
                    before: before.clone(),
                    after: after.clone(),
                    requires_replace: attribute.force_new,
                });
            }

            if !after.is_null() {
                planned.insert(name.clone(), after);
            }
        }

        let requires_replace = changes.iter().any(|c| c.requires_replace);
        if requires_replace {
            // Provider-assigned values will be regenerated by the new resource
            planned.retain(|name, _| {
                self.attributes
                    .get(name)
                    .map_or(true, |a| a.is_configurable())
            });
        }

        let mut planned_state = ResourceData::from_attributes(planned);
        if !requires_replace {
            if let Some(id) = prior.id() {
                planned_state.set_id(id);
            }
        }

        PlanResult {
            planned_state,
            changes,
            requires_replace,
        }
    }
}
