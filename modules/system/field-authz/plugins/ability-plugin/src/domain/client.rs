//! Policy adapter implementation for the ability plugin.

use std::collections::BTreeSet;

use async_trait::async_trait;
use field_authz_sdk::{
    Action, AdapterCapabilities, AdapterError, ContextShape, Entity, EvaluationRequest,
    FieldValidation, PolicyAdapter, PolicyHandle,
};

use super::ability::Ability;
use super::service::{AbilityAdapter, AbilityContext};
use crate::module::PLUGIN_NAME;

/// Ability evaluated for one request, answering per field.
#[derive(Debug, Clone)]
pub struct AbilityAccess {
    ability: Ability,
    permitted: BTreeSet<String>,
}

impl PolicyHandle for AbilityAccess {
    fn is_granted(&self, action: &Action, item: &Entity) -> bool {
        self.ability.can(action.as_str(), item, None)
    }

    fn allowed_fields(&self) -> BTreeSet<String> {
        self.permitted.clone()
    }

    fn denied_fields(&self) -> BTreeSet<String> {
        BTreeSet::new()
    }

    fn permits_field(&self, action: &Action, item: &Entity, field: &str) -> bool {
        self.ability.can(action.as_str(), item, Some(field))
    }
}

#[async_trait]
impl PolicyAdapter for AbilityAdapter {
    fn name(&self) -> &'static str {
        PLUGIN_NAME
    }

    fn capabilities(&self) -> AdapterCapabilities {
        AdapterCapabilities {
            field_validation: FieldValidation::PerField,
            context_shape: ContextShape::Typed,
            typed_input: false,
        }
    }

    async fn evaluate(
        &self,
        request: &EvaluationRequest,
    ) -> Result<Box<dyn PolicyHandle>, AdapterError> {
        if let Some(input_type) = request.input.entity_type()
            && input_type != request.resource_type()
        {
            return Err(AdapterError::InvalidContext(format!(
                "input typed as `{input_type}` for a `{}` resource",
                request.resource_type()
            )));
        }
        let ability = self.define(&AbilityContext::from_request(request));
        let permitted = ability.permitted_fields(
            request.action.as_str(),
            &request.item,
            &request.field_universe,
        );
        Ok(Box::new(AbilityAccess { ability, permitted }))
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::domain::ability::Rule;
    use field_authz_sdk::{AuthorizeOptions, InputItem, Principal};
    use serde_json::{Map, Value, json};

    fn obj(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            other => panic!("expected object, got {other}"),
        }
    }

    fn adapter() -> AbilityAdapter {
        AbilityAdapter::new(|ctx| {
            let id = ctx.principal.id.clone().unwrap_or(Value::Null);
            Ability::new(vec![
                Rule::can("read", "User"),
                Rule::cannot("read", "User").on_fields(["email"]),
                Rule::can("update", "User").when(obj(json!({ "id": id }))),
                Rule::cannot("update", "User").on_fields(["id"]),
            ])
        })
    }

    fn request(action: Action, item: Entity, input: InputItem) -> EvaluationRequest {
        EvaluationRequest {
            principal: Principal::new("user").with_id(1),
            action,
            item,
            input,
            options: AuthorizeOptions::default(),
            relation: None,
            context: None,
            field_universe: vec!["id".to_owned(), "email".to_owned(), "username".to_owned()],
        }
    }

    #[tokio::test]
    async fn answers_per_field() {
        let adapter = adapter();
        let own = Entity::new("User", obj(json!({ "id": 1, "username": "u1" })));
        let req = request(Action::Update, own.clone(), InputItem::default());
        let handle = adapter.evaluate(&req).await.unwrap();

        assert!(handle.is_granted(&Action::Update, &own));
        assert!(handle.permits_field(&Action::Update, &own, "username"));
        assert!(!handle.permits_field(&Action::Update, &own, "id"));
        assert!(handle.denied_fields().is_empty());
    }

    #[tokio::test]
    async fn read_visibility_uses_item_or_universe() {
        let adapter = adapter();

        let row = Entity::new("User", obj(json!({ "id": 2, "email": "x", "username": "u2" })));
        let handle = adapter
            .evaluate(&request(Action::Read, row, InputItem::default()))
            .await
            .unwrap();
        let visible: Vec<String> = handle.allowed_fields().into_iter().collect();
        assert_eq!(visible, vec!["id", "username"]);

        let handle = adapter
            .evaluate(&request(Action::Read, Entity::empty("User"), InputItem::default()))
            .await
            .unwrap();
        assert!(!handle.visibility().is_visible("email"));
        assert!(handle.visibility().is_visible("username"));
    }

    #[tokio::test]
    async fn mismatched_input_type_is_rejected() {
        let req = request(
            Action::Update,
            Entity::empty("User"),
            InputItem::typed("Pet", Map::new()),
        );
        let err = adapter().evaluate(&req).await.unwrap_err();
        assert!(matches!(err, AdapterError::InvalidContext(_)));
        assert_eq!(adapter().capabilities().field_validation, FieldValidation::PerField);
    }
}
