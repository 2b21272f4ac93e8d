//! Registration of the ability plugin.

use std::sync::Arc;

use field_authz_sdk::{AdapterRegistry, PolicyAdapter};
use tracing::info;

use crate::domain::AbilityAdapter;

/// Registry identifier of this backend.
pub const PLUGIN_NAME: &str = "ability";

/// Register the declarative form of this backend under [`PLUGIN_NAME`].
pub fn register(registry: &mut AdapterRegistry) {
    registry.register(PLUGIN_NAME, |config| {
        let adapter = AbilityAdapter::from_value(config)?;
        info!(backend = PLUGIN_NAME, "Loaded plugin configuration");
        let adapter: Arc<dyn PolicyAdapter> = Arc::new(adapter);
        Ok(adapter)
    });
}
