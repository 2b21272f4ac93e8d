//! Per-entity-type authorizer shared by every query of that type.

use std::fmt;
use std::sync::Arc;

use field_authz_sdk::{
    Action, AdapterRegistry, AuthorizeError, AuthorizeOptions, ConfigError, Entity,
    ModelDescriptor, OptionsOverride, PolicyAdapter, Principal,
};
use serde_json::{Map, Value};

use super::context::AccessContext;
use super::evaluator::Evaluator;
use super::query::AuthorizedQuery;
use crate::config::FieldAuthzConfig;

fn log_and_convert(op: &str, e: ConfigError) -> ConfigError {
    tracing::error!(operation = op, error = %e, "field_authz configuration rejected");
    e
}

/// Authorization entry point for one entity type.
///
/// Holds the resolved backend and options; cheap to clone and safe to share
/// across tasks.
///
/// ```ignore
/// let users = FieldAuthorizer::from_config(&registry, &config, USER)?;
///
/// let mut query = users.query().authorize(Some(principal), None, None);
/// let body = query.before_insert(HookArgs::input(vec![payload])).await?;
/// ```
#[derive(Clone)]
pub struct FieldAuthorizer {
    adapter: Arc<dyn PolicyAdapter>,
    options: Arc<AuthorizeOptions>,
    model: ModelDescriptor,
}

impl FieldAuthorizer {
    #[must_use]
    pub fn new(
        adapter: Arc<dyn PolicyAdapter>,
        options: AuthorizeOptions,
        model: ModelDescriptor,
    ) -> Self {
        Self {
            adapter,
            options: Arc::new(options),
            model,
        }
    }

    /// Resolve the configured backend from `registry`.
    ///
    /// # Errors
    ///
    /// - `MissingBackend` if no backend is named
    /// - `UnknownBackend` if the name is not registered
    /// - `InvalidBackendConfig` if the backend rejects its configuration
    pub fn from_config(
        registry: &AdapterRegistry,
        config: &FieldAuthzConfig,
        model: ModelDescriptor,
    ) -> Result<Self, ConfigError> {
        let adapter = registry
            .build(&config.backend, &config.backend_config)
            .map_err(|e| log_and_convert("from_config", e))?;
        tracing::debug!(
            backend = adapter.name(),
            resource_type = model.name,
            "field_authz backend resolved"
        );
        Ok(Self::new(adapter, config.options.clone(), model))
    }

    #[must_use]
    pub fn options(&self) -> &AuthorizeOptions {
        &self.options
    }

    #[must_use]
    pub fn model(&self) -> &ModelDescriptor {
        &self.model
    }

    #[must_use]
    pub fn adapter(&self) -> &dyn PolicyAdapter {
        self.adapter.as_ref()
    }

    /// A new query with no bound instance.
    #[must_use]
    pub fn query(&self) -> AuthorizedQuery {
        AuthorizedQuery::new(self.clone(), None)
    }

    /// A new query bound to an existing instance (its fallback resource).
    #[must_use]
    pub fn query_for(&self, instance: Map<String, Value>) -> AuthorizedQuery {
        AuthorizedQuery::new(self.clone(), Some(self.model.entity(instance)))
    }

    /// Check read access to `instance` outside of a query and return the
    /// visible projection.
    ///
    /// `action` defaults to `read`.
    ///
    /// # Errors
    ///
    /// Returns [`AuthorizeError::Denied`] when the principal may not perform
    /// `action`, or the backend error as-is.
    #[tracing::instrument(skip_all, fields(resource_type = self.model.name))]
    pub async fn authorize_read(
        &self,
        instance: &Map<String, Value>,
        principal: Option<Principal>,
        action: Option<Action>,
        overrides: Option<OptionsOverride>,
    ) -> Result<Map<String, Value>, AuthorizeError> {
        let mut context = AccessContext::new();
        if let Some(principal) = principal {
            context = context.principal(principal);
        }
        if let Some(overrides) = overrides {
            context = context.overrides(overrides);
        }
        let resolved = context.resolve(&self.options, action.unwrap_or(Action::Read));
        let item = Entity::new(self.model.name, instance.clone());
        let visibility = Evaluator::new(self.adapter(), &self.model, &resolved, None)
            .check_read(&resolved.principal, &resolved.action, &item)
            .await?;
        Ok(visibility.project(instance))
    }
}

impl fmt::Debug for FieldAuthorizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldAuthorizer")
            .field("backend", &self.adapter.name())
            .field("model", &self.model.name)
            .finish_non_exhaustive()
    }
}
