//! Configuration for the role-based attribute-list plugin.

use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::Value;

/// Plugin configuration: grants keyed by role name.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RoleAclPluginConfig {
    pub roles: BTreeMap<String, RoleConfig>,
}

/// Grants of a single role.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RoleConfig {
    /// Roles whose grants this role inherits.
    pub extends: Vec<String>,
    pub grants: Vec<GrantConfig>,
}

/// One grant: `role` may perform `action` on `resource`, touching `attributes`.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GrantConfig {
    /// Resource type name, or `*`.
    pub resource: String,
    /// Action name, or `*`.
    pub action: String,
    /// Attribute patterns such as `["*", "!email"]`.
    #[serde(default = "all_attributes")]
    pub attributes: Vec<String>,
    /// Extra condition over the evaluation context.
    #[serde(default)]
    pub condition: Option<Condition>,
}

fn all_attributes() -> Vec<String> {
    vec!["*".to_owned()]
}

/// Condition over the flat evaluation context.
///
/// `EQUALS` / `NOT_EQUALS` args map a context path to an expected value;
/// string values starting with `$.` are themselves context paths.
///
/// ```yaml
/// condition:
///   Fn: EQUALS
///   args:
///     id: $.req.user.id
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "Fn", content = "args", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Condition {
    Equals(BTreeMap<String, Value>),
    NotEquals(BTreeMap<String, Value>),
    And(Vec<Condition>),
    Or(Vec<Condition>),
    Not(Vec<Condition>),
}
