//! Ability construction, either from code or from declared rules.

use std::fmt;
use std::sync::Arc;

use field_authz_sdk::{
    Action, AuthorizeOptions, ConfigError, Entity, EvaluationRequest, InputItem, Principal,
};
use modkit_utils::get_path;
use serde_json::{Map, Value};

use super::ability::{Ability, Rule};
use crate::config::{AbilityPluginConfig, RuleConfig};
use crate::module::PLUGIN_NAME;

/// Prefix of condition values resolved against the principal.
const PRINCIPAL_PREFIX: &str = "$.principal.";

/// Everything available when defining an ability for one evaluation.
#[derive(Debug, Clone, Copy)]
pub struct AbilityContext<'a> {
    pub principal: &'a Principal,
    pub action: &'a Action,
    pub item: &'a Entity,
    pub input: &'a InputItem,
    pub options: &'a AuthorizeOptions,
    pub relation: Option<&'a str>,
}

impl<'a> AbilityContext<'a> {
    #[must_use]
    pub fn from_request(request: &'a EvaluationRequest) -> Self {
        Self {
            principal: &request.principal,
            action: &request.action,
            item: &request.item,
            input: &request.input,
            options: &request.options,
            relation: request.relation.as_deref(),
        }
    }
}

type DefineAbility = dyn Fn(&AbilityContext<'_>) -> Ability + Send + Sync;

/// Ability backend.
///
/// Rules are computed per evaluation, so they may depend on the principal,
/// the resource and the proposed input.
#[derive(Clone)]
pub struct AbilityAdapter {
    define: Arc<DefineAbility>,
}

impl AbilityAdapter {
    #[must_use]
    pub fn new<F>(define: F) -> Self
    where
        F: Fn(&AbilityContext<'_>) -> Ability + Send + Sync + 'static,
    {
        Self {
            define: Arc::new(define),
        }
    }

    /// Rules declared per role, shared rules first.
    #[must_use]
    pub fn from_config(cfg: AbilityPluginConfig) -> Self {
        let cfg = Arc::new(cfg);
        Self::new(move |ctx| declared_ability(&cfg, ctx.principal))
    }

    /// Build from raw backend configuration; `null` defines no rules.
    ///
    /// # Errors
    ///
    /// Returns `InvalidBackendConfig` if the value does not describe rules.
    pub fn from_value(value: &Value) -> Result<Self, ConfigError> {
        if value.is_null() {
            return Ok(Self::from_config(AbilityPluginConfig::default()));
        }
        let cfg: AbilityPluginConfig =
            serde_json::from_value(value.clone()).map_err(|e| ConfigError::InvalidBackendConfig {
                backend: PLUGIN_NAME.to_owned(),
                reason: e.to_string(),
            })?;
        Ok(Self::from_config(cfg))
    }

    #[must_use]
    pub fn define(&self, ctx: &AbilityContext<'_>) -> Ability {
        (self.define)(ctx)
    }
}

impl fmt::Debug for AbilityAdapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AbilityAdapter").finish_non_exhaustive()
    }
}

fn declared_ability(cfg: &AbilityPluginConfig, principal: &Principal) -> Ability {
    let principal_value = principal.to_value();
    let role_rules = cfg.roles.get(&principal.role).into_iter().flatten();
    Ability::new(
        cfg.common
            .iter()
            .chain(role_rules)
            .filter_map(|rule| declared_rule(rule, &principal_value))
            .collect(),
    )
}

/// A rule whose principal reference does not resolve can never match and
/// is left out.
fn declared_rule(cfg: &RuleConfig, principal: &Value) -> Option<Rule> {
    let mut rule = if cfg.inverted {
        Rule::cannot(cfg.action.as_str(), cfg.subject.as_str())
    } else {
        Rule::can(cfg.action.as_str(), cfg.subject.as_str())
    };
    if let Some(fields) = &cfg.fields {
        rule = rule.on_fields(fields.iter().cloned());
    }
    if let Some(conditions) = &cfg.conditions {
        let resolved = conditions
            .iter()
            .map(|(path, value)| Some((path.clone(), resolve(value, principal)?)))
            .collect::<Option<Map<String, Value>>>()?;
        rule = rule.when(resolved);
    }
    Some(rule)
}

fn resolve(value: &Value, principal: &Value) -> Option<Value> {
    match value {
        Value::String(s) => match s.strip_prefix(PRINCIPAL_PREFIX) {
            Some(path) => get_path(principal, path).filter(|v| !v.is_null()).cloned(),
            None => Some(value.clone()),
        },
        literal => Some(literal.clone()),
    }
}
