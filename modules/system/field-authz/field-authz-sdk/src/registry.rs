//! Name-keyed registry of policy backend factories.
//!
//! Plugins register a factory under their identifier; the engine resolves
//! exactly one backend when an authorizer is constructed.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::adapter::PolicyAdapter;
use crate::error::ConfigError;

/// Builds a backend from its raw configuration.
pub type AdapterFactory =
    Arc<dyn Fn(&Value) -> Result<Arc<dyn PolicyAdapter>, ConfigError> + Send + Sync>;

/// Registry of backend factories keyed by identifier.
///
/// ```ignore
/// let mut registry = AdapterRegistry::new();
/// role_acl_authz_plugin::register(&mut registry);
/// let adapter = registry.build("role_acl", &backend_config)?;
/// ```
#[derive(Clone, Default)]
pub struct AdapterRegistry {
    factories: BTreeMap<String, AdapterFactory>,
}

impl AdapterRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) the factory for `name`.
    pub fn register<F>(&mut self, name: impl Into<String>, factory: F)
    where
        F: Fn(&Value) -> Result<Arc<dyn PolicyAdapter>, ConfigError> + Send + Sync + 'static,
    {
        self.factories.insert(name.into(), Arc::new(factory));
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Registered identifiers, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.factories.keys().cloned().collect()
    }

    /// Instantiate the backend registered under `name`.
    ///
    /// # Errors
    ///
    /// - `MissingBackend` if `name` is empty
    /// - `UnknownBackend` if nothing is registered under `name`
    /// - whatever the factory returns for a malformed configuration
    pub fn build(&self, name: &str, config: &Value) -> Result<Arc<dyn PolicyAdapter>, ConfigError> {
        if name.is_empty() {
            return Err(ConfigError::MissingBackend);
        }
        let factory = self
            .factories
            .get(name)
            .ok_or_else(|| ConfigError::UnknownBackend {
                name: name.to_owned(),
                known: self.names(),
            })?;
        factory(config)
    }
}

impl fmt::Debug for AdapterRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdapterRegistry")
            .field("backends", &self.names())
            .finish()
    }
}
