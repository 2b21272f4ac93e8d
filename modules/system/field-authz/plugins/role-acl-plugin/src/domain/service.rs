//! Service implementation for the role-based attribute-list plugin.

use std::collections::BTreeMap;

use field_authz_sdk::{ConfigError, Decision, FieldVisibility, WILDCARD};
use serde_json::{Map, Value};

use crate::config::{GrantConfig, RoleAclPluginConfig};
use crate::module::PLUGIN_NAME;

/// Role-based attribute-list service.
///
/// Grants are flattened per role (including inherited ones) at construction;
/// evaluation only filters them.
#[derive(Debug, Clone, Default)]
pub struct Service {
    grants: BTreeMap<String, Vec<GrantConfig>>,
}

impl Service {
    /// Build from raw backend configuration.
    ///
    /// `null` is an empty configuration (every request denied).
    ///
    /// # Errors
    ///
    /// Returns `InvalidBackendConfig` if the value is not a role map or a
    /// role inherits from an unknown role or from itself.
    pub fn from_value(value: &Value) -> Result<Self, ConfigError> {
        if value.is_null() {
            return Self::from_config(&RoleAclPluginConfig::default());
        }
        let cfg: RoleAclPluginConfig =
            serde_json::from_value(value.clone()).map_err(|e| invalid(e.to_string()))?;
        Self::from_config(&cfg)
    }

    /// # Errors
    ///
    /// Returns `InvalidBackendConfig` if a role inherits from an unknown role
    /// or from itself.
    pub fn from_config(cfg: &RoleAclPluginConfig) -> Result<Self, ConfigError> {
        let mut grants = BTreeMap::new();
        for role in cfg.roles.keys() {
            let mut collected = Vec::new();
            collect_grants(cfg, role, &mut Vec::new(), &mut collected)?;
            grants.insert(role.clone(), collected);
        }
        Ok(Self { grants })
    }

    /// Known role names.
    #[must_use]
    pub fn roles(&self) -> Vec<&str> {
        self.grants.keys().map(String::as_str).collect()
    }

    /// Union of every grant of `role` matching `action` on `resource_type`
    /// whose condition holds in `context`.
    #[must_use]
    pub fn access(
        &self,
        role: &str,
        action: &str,
        resource_type: &str,
        context: &Map<String, Value>,
    ) -> Decision {
        let matched: Vec<FieldVisibility> = self
            .grants
            .get(role)
            .into_iter()
            .flatten()
            .filter(|grant| {
                matches_name(&grant.resource, resource_type)
                    && matches_name(&grant.action, action)
                    && grant.condition.as_ref().is_none_or(|c| c.matches(context))
            })
            .map(|grant| FieldVisibility::from_attributes(&grant.attributes))
            .collect();

        if matched.is_empty() {
            return Decision::denied();
        }
        Decision::granted(FieldVisibility::union(matched))
    }
}

fn matches_name(pattern: &str, name: &str) -> bool {
    pattern == WILDCARD || pattern == name
}

fn invalid(reason: String) -> ConfigError {
    ConfigError::InvalidBackendConfig {
        backend: PLUGIN_NAME.to_owned(),
        reason,
    }
}

fn collect_grants(
    cfg: &RoleAclPluginConfig,
    role: &str,
    path: &mut Vec<String>,
    out: &mut Vec<GrantConfig>,
) -> Result<(), ConfigError> {
    if path.iter().any(|seen| seen == role) {
        return Err(invalid(format!(
            "role `{role}` inherits from itself ({} -> {role})",
            path.join(" -> ")
        )));
    }
    let Some(role_cfg) = cfg.roles.get(role) else {
        return Err(invalid(format!("unknown role `{role}` in `extends`")));
    };
    path.push(role.to_owned());
    out.extend(role_cfg.grants.iter().cloned());
    for parent in &role_cfg.extends {
        collect_grants(cfg, parent, path, out)?;
    }
    path.pop();
    Ok(())
}
