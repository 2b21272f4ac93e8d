//! Resolved authorization options and per-query overrides.

use std::fmt;
use std::sync::Arc;

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::models::{Entity, Principal};

/// Predicate deciding whether a write result is the principal's own record.
pub type SelfMatcher = Arc<dyn Fn(&Principal, &Entity) -> bool + Send + Sync>;

/// Whether the principal for the post-write read check is replaced by the
/// write result.
///
/// Configuration only carries a boolean; a predicate can be supplied from
/// code.
#[derive(Clone, Default, Deserialize)]
#[serde(from = "bool")]
pub enum UserFromResult {
    #[default]
    Disabled,
    /// Every write result is treated as the principal's own record.
    Always,
    /// Only results for which the predicate returns `true`.
    When(SelfMatcher),
}

impl UserFromResult {
    /// Use a caller-supplied predicate.
    #[must_use]
    pub fn when<F>(predicate: F) -> Self
    where
        F: Fn(&Principal, &Entity) -> bool + Send + Sync + 'static,
    {
        Self::When(Arc::new(predicate))
    }

    /// Whether `result` should become the principal for the read check.
    #[must_use]
    pub fn applies(&self, principal: &Principal, result: &Entity) -> bool {
        match self {
            Self::Disabled => false,
            Self::Always => true,
            Self::When(predicate) => predicate(principal, result),
        }
    }
}

impl From<bool> for UserFromResult {
    fn from(enabled: bool) -> Self {
        if enabled { Self::Always } else { Self::Disabled }
    }
}

impl fmt::Debug for UserFromResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disabled => f.write_str("Disabled"),
            Self::Always => f.write_str("Always"),
            Self::When(_) => f.write_str("When(<predicate>)"),
        }
    }
}

/// Resolved option bag shared by every query of one entity type.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AuthorizeOptions {
    /// Role assumed when no principal is supplied.
    pub default_role: String,
    /// Status raised when the anonymous role is denied.
    pub unauthenticated_error_code: u16,
    /// Status raised when a named role is denied.
    pub unauthorized_error_code: u16,
    /// Re-derive the principal from a write result for the read check.
    pub user_from_result: UserFromResult,
    /// Fields dropped from both sides before diffing (server-managed columns).
    pub ignore_fields: Vec<String>,
    /// Wrap diffed input in the entity type before evaluation.
    pub cast_diff_to_model: bool,
    /// Key under which `{ user, body }` is placed in flat rule contexts.
    pub context_key: String,
    /// Extra constant entries merged into flat rule contexts.
    pub resource_augments: Map<String, Value>,
}

impl Default for AuthorizeOptions {
    fn default() -> Self {
        Self {
            default_role: "anonymous".to_owned(),
            unauthenticated_error_code: 401,
            unauthorized_error_code: 403,
            user_from_result: UserFromResult::Disabled,
            ignore_fields: Vec::new(),
            cast_diff_to_model: false,
            context_key: "req".to_owned(),
            resource_augments: Map::new(),
        }
    }
}

/// Per-query overlay over [`AuthorizeOptions`].
///
/// All fields default to "not overridden"; only set what you need.
#[derive(Debug, Clone, Default)]
pub struct OptionsOverride {
    default_role: Option<String>,
    unauthenticated_error_code: Option<u16>,
    unauthorized_error_code: Option<u16>,
    user_from_result: Option<UserFromResult>,
    ignore_fields: Option<Vec<String>>,
    cast_diff_to_model: Option<bool>,
    context_key: Option<String>,
    resource_augments: Option<Map<String, Value>>,
}

impl OptionsOverride {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn default_role(mut self, role: impl Into<String>) -> Self {
        self.default_role = Some(role.into());
        self
    }

    #[must_use]
    pub fn unauthenticated_error_code(mut self, code: u16) -> Self {
        self.unauthenticated_error_code = Some(code);
        self
    }

    #[must_use]
    pub fn unauthorized_error_code(mut self, code: u16) -> Self {
        self.unauthorized_error_code = Some(code);
        self
    }

    #[must_use]
    pub fn user_from_result(mut self, mode: impl Into<UserFromResult>) -> Self {
        self.user_from_result = Some(mode.into());
        self
    }

    #[must_use]
    pub fn ignore_fields(mut self, fields: Vec<String>) -> Self {
        self.ignore_fields = Some(fields);
        self
    }

    #[must_use]
    pub fn cast_diff_to_model(mut self, enabled: bool) -> Self {
        self.cast_diff_to_model = Some(enabled);
        self
    }

    #[must_use]
    pub fn context_key(mut self, key: impl Into<String>) -> Self {
        self.context_key = Some(key.into());
        self
    }

    #[must_use]
    pub fn resource_augments(mut self, augments: Map<String, Value>) -> Self {
        self.resource_augments = Some(augments);
        self
    }

    /// Layer this override over `base`; later values win.
    #[must_use]
    pub fn merge(mut self, later: Self) -> Self {
        macro_rules! overlay {
            ($($field:ident),*) => {
                $(if later.$field.is_some() { self.$field = later.$field; })*
            };
        }
        overlay!(
            default_role,
            unauthenticated_error_code,
            unauthorized_error_code,
            user_from_result,
            ignore_fields,
            cast_diff_to_model,
            context_key,
            resource_augments
        );
        self
    }

    /// Resolve against the shared options.
    #[must_use]
    pub fn apply_to(&self, base: &AuthorizeOptions) -> AuthorizeOptions {
        AuthorizeOptions {
            default_role: self
                .default_role
                .clone()
                .unwrap_or_else(|| base.default_role.clone()),
            unauthenticated_error_code: self
                .unauthenticated_error_code
                .unwrap_or(base.unauthenticated_error_code),
            unauthorized_error_code: self
                .unauthorized_error_code
                .unwrap_or(base.unauthorized_error_code),
            user_from_result: self
                .user_from_result
                .clone()
                .unwrap_or_else(|| base.user_from_result.clone()),
            ignore_fields: self
                .ignore_fields
                .clone()
                .unwrap_or_else(|| base.ignore_fields.clone()),
            cast_diff_to_model: self.cast_diff_to_model.unwrap_or(base.cast_diff_to_model),
            context_key: self
                .context_key
                .clone()
                .unwrap_or_else(|| base.context_key.clone()),
            resource_augments: self
                .resource_augments
                .clone()
                .unwrap_or_else(|| base.resource_augments.clone()),
        }
    }
}
