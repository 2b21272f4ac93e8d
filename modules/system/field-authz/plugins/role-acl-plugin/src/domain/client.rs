//! Policy adapter implementation for the role-based attribute-list plugin.

use field_authz_sdk::{
    AdapterCapabilities, AdapterError, EvaluationRequest, PolicyHandle, SyncPolicyAdapter,
};

use super::service::Service;
use crate::module::PLUGIN_NAME;

impl SyncPolicyAdapter for Service {
    fn name(&self) -> &'static str {
        PLUGIN_NAME
    }

    fn capabilities(&self) -> AdapterCapabilities {
        AdapterCapabilities::default()
    }

    fn evaluate(
        &self,
        request: &EvaluationRequest,
    ) -> Result<Box<dyn PolicyHandle>, AdapterError> {
        let context = request.context.as_ref().ok_or_else(|| {
            AdapterError::InvalidContext("role_acl evaluates against a flat context".to_owned())
        })?;
        Ok(Box::new(self.access(
            &request.principal.role,
            request.action.as_str(),
            request.resource_type(),
            context,
        )))
    }
}
