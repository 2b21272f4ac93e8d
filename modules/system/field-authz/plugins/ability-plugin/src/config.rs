//! Declarative configuration for the ability plugin.

use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::{Map, Value};

/// Plugin configuration.
///
/// `common` rules apply to every principal and come first; the rules of the
/// principal's role follow, so they take precedence.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AbilityPluginConfig {
    pub common: Vec<RuleConfig>,
    pub roles: BTreeMap<String, Vec<RuleConfig>>,
}

/// One declared rule.
///
/// Condition values of the form `$.principal.<path>` are resolved against
/// the acting principal when the ability is built.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RuleConfig {
    /// Action name, or `manage` for any action.
    pub action: String,
    /// Entity type name, or `all`.
    #[serde(default = "any_subject")]
    pub subject: String,
    #[serde(default)]
    pub fields: Option<Vec<String>>,
    #[serde(default)]
    pub conditions: Option<Map<String, Value>>,
    /// `true` for a `cannot` rule.
    #[serde(default)]
    pub inverted: bool,
}

fn any_subject() -> String {
    crate::domain::ability::ALL.to_owned()
}
