//! Access request context accumulated over the lifecycle of one query.

use field_authz_sdk::{Action, AuthorizeOptions, OptionsOverride, Principal, Resource};

/// Layered, immutable-until-resolved request context.
///
/// Every builder call returns a new value; later calls overlay earlier ones.
/// [`resolve`](Self::resolve) freezes it into a [`ResolvedContext`] at the
/// moment a check runs.
#[derive(Debug, Clone, Default)]
pub struct AccessContext {
    principal: Option<Principal>,
    resource: Option<Resource>,
    overrides: OptionsOverride,
    action: Option<Action>,
    fetch_from_store: bool,
    diff_input: bool,
}

impl AccessContext {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn principal(mut self, principal: Principal) -> Self {
        self.principal = Some(principal);
        self
    }

    /// Explicit resource; an empty resource is ignored so later sources
    /// (store, bound instance, hook items) still apply.
    #[must_use]
    pub fn resource(mut self, resource: Resource) -> Self {
        if !resource.is_empty() {
            self.resource = Some(resource);
        }
        self
    }

    #[must_use]
    pub fn overrides(mut self, overrides: OptionsOverride) -> Self {
        self.overrides = self.overrides.merge(overrides);
        self
    }

    #[must_use]
    pub fn action(mut self, action: Action) -> Self {
        self.action = Some(action);
        self
    }

    #[must_use]
    pub fn fetch_from_store(mut self) -> Self {
        self.fetch_from_store = true;
        self
    }

    #[must_use]
    pub fn diff_input(mut self) -> Self {
        self.diff_input = true;
        self
    }

    #[must_use]
    pub fn explicit_resource(&self) -> Option<&Resource> {
        self.resource.as_ref()
    }

    #[must_use]
    pub fn wants_store_fetch(&self) -> bool {
        self.fetch_from_store
    }

    /// Freeze against the shared options.
    ///
    /// The principal defaults to the (possibly overridden) default role;
    /// the action defaults to what the calling hook implies.
    #[must_use]
    pub fn resolve(&self, base: &AuthorizeOptions, default_action: Action) -> ResolvedContext {
        let options = self.overrides.apply_to(base);
        let principal = self
            .principal
            .clone()
            .unwrap_or_else(|| Principal::new(options.default_role.clone()));
        ResolvedContext {
            principal,
            action: self.action.clone().unwrap_or(default_action),
            options,
            diff_input: self.diff_input,
        }
    }
}

/// Frozen context used by one check.
#[derive(Debug, Clone)]
pub struct ResolvedContext {
    pub principal: Principal,
    pub action: Action,
    pub options: AuthorizeOptions,
    pub diff_input: bool,
}

impl ResolvedContext {
    /// Whether the acting principal is the default (anonymous) role.
    #[must_use]
    pub fn is_anonymous(&self) -> bool {
        self.principal.is_role(&self.options.default_role)
    }
}
