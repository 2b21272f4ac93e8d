//! Registration of the role-based attribute-list plugin.

use std::sync::Arc;

use field_authz_sdk::{AdapterRegistry, Blocking, PolicyAdapter};
use tracing::info;

use crate::domain::Service;

/// Registry identifier of this backend.
pub const PLUGIN_NAME: &str = "role_acl";

/// Register this backend under [`PLUGIN_NAME`].
pub fn register(registry: &mut AdapterRegistry) {
    registry.register(PLUGIN_NAME, |config| {
        let service = Service::from_value(config)?;
        info!(
            backend = PLUGIN_NAME,
            roles = service.roles().len(),
            "Loaded plugin configuration"
        );
        let adapter: Arc<dyn PolicyAdapter> = Arc::new(Blocking(service));
        Ok(adapter)
    });
}
