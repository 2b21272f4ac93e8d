//! Per-pair policy evaluation.
//!
//! Normalizes the request into the shape the backend asks for, runs it once
//! per `(resource item, input item)` pair and turns a refusal into a
//! [`Denial`] carrying the configured status.

use field_authz_sdk::{
    Action, AuthorizeError, ContextShape, Denial, DenialKind, Entity, EvaluationRequest,
    FieldValidation, FieldVisibility, InputItem, ModelDescriptor, PolicyAdapter, PolicyHandle,
    Principal,
};
use modkit_utils::{deep_keys, diff_fields, omit_paths};
use serde_json::{Map, Value, json};

use super::context::ResolvedContext;

pub struct Evaluator<'a> {
    adapter: &'a dyn PolicyAdapter,
    model: &'a ModelDescriptor,
    ctx: &'a ResolvedContext,
    relation: Option<&'a str>,
}

impl<'a> Evaluator<'a> {
    pub fn new(
        adapter: &'a dyn PolicyAdapter,
        model: &'a ModelDescriptor,
        ctx: &'a ResolvedContext,
        relation: Option<&'a str>,
    ) -> Self {
        Self {
            adapter,
            model,
            ctx,
            relation,
        }
    }

    /// Check a write and return the input items to persist.
    ///
    /// Every input item is checked against every resource item. Allow/deny
    /// backends narrow the body; per-field backends leave it untouched and
    /// abort on the first disallowed field.
    pub async fn check_write(
        &self,
        items: &[Entity],
        inputs: Vec<Map<String, Value>>,
    ) -> Result<Vec<Map<String, Value>>, AuthorizeError> {
        let validation = self.adapter.capabilities().field_validation;
        let fallback = [Entity::empty(self.model.name)];
        let items = if items.is_empty() { &fallback[..] } else { items };
        let had_inputs = !inputs.is_empty();
        let inputs = if had_inputs { inputs } else { vec![Map::new()] };

        let mut accepted = Vec::with_capacity(inputs.len());
        for input in inputs {
            let mut narrowed = input.clone();
            for item in items {
                let evaluated = self.input_for(item, &input);
                let handle = self
                    .evaluate(&self.ctx.principal, &self.ctx.action, item, evaluated.clone())
                    .await?;
                match validation {
                    FieldValidation::PerField => self.check_fields(handle.as_ref(), item, &evaluated)?,
                    FieldValidation::AllowDenySets => {
                        if !handle.is_granted(&self.ctx.action, item) {
                            return Err(self.deny(&self.ctx.action, None));
                        }
                        if !(self.ctx.diff_input && evaluated.is_empty()) {
                            narrowed = handle.visibility().project(&narrowed);
                        }
                    }
                }
            }
            accepted.push(narrowed);
        }
        // The empty placeholder only drives the check.
        if !had_inputs {
            accepted.clear();
        }
        Ok(accepted)
    }

    /// Check read access to `item` and return what the principal may see.
    ///
    /// `principal` may differ from the context principal after
    /// self-elevation; the status of a denial still follows the context
    /// principal.
    pub async fn check_read(
        &self,
        principal: &Principal,
        action: &Action,
        item: &Entity,
    ) -> Result<FieldVisibility, AuthorizeError> {
        let handle = self.evaluate(principal, action, item, InputItem::default()).await?;
        if !handle.is_granted(action, item) {
            return Err(self.deny(action, None));
        }
        Ok(handle.visibility())
    }

    fn check_fields(
        &self,
        handle: &dyn PolicyHandle,
        item: &Entity,
        input: &InputItem,
    ) -> Result<(), AuthorizeError> {
        let action = &self.ctx.action;
        let fields = deep_keys(input);
        if fields.is_empty() {
            return if handle.is_granted(action, item) {
                Ok(())
            } else {
                Err(self.deny(action, None))
            };
        }
        if let Some(field) = fields
            .into_iter()
            .find(|field| !handle.permits_field(action, item, field))
        {
            return Err(self.deny(action, Some(field)));
        }
        Ok(())
    }

    async fn evaluate(
        &self,
        principal: &Principal,
        action: &Action,
        item: &Entity,
        input: InputItem,
    ) -> Result<Box<dyn PolicyHandle>, AuthorizeError> {
        let request = self.request(principal, action, item, input);
        let handle = self.adapter.evaluate(&request).await?;
        tracing::debug!(
            backend = self.adapter.name(),
            action = %action,
            resource_type = item.entity_type(),
            role = %principal.role,
            granted = handle.is_granted(action, item),
            "policy evaluated"
        );
        Ok(handle)
    }

    fn request(
        &self,
        principal: &Principal,
        action: &Action,
        item: &Entity,
        input: InputItem,
    ) -> EvaluationRequest {
        let options = &self.ctx.options;
        let (context, field_universe) = match self.adapter.capabilities().context_shape {
            ContextShape::Flat => {
                let mut context = Map::new();
                context.insert(
                    options.context_key.clone(),
                    json!({ "user": principal.to_value(), "body": input.to_value() }),
                );
                context.extend(options.resource_augments.clone());
                context.extend(item.attributes().clone());
                (Some(context), Vec::new())
            }
            ContextShape::Typed => (None, self.model.column_names()),
        };
        EvaluationRequest {
            principal: principal.clone(),
            action: action.clone(),
            item: item.clone(),
            input,
            options: options.clone(),
            relation: self.relation.map(ToOwned::to_owned),
            context,
            field_universe,
        }
    }

    /// Input as the backend sees it: diffed against the item when asked,
    /// wrapped in the entity type when required.
    fn input_for(&self, item: &Entity, input: &Map<String, Value>) -> InputItem {
        let options = &self.ctx.options;
        let fields = if self.ctx.diff_input {
            let ignore = &options.ignore_fields;
            diff_fields(
                &omit_paths(item.attributes(), ignore),
                &omit_paths(input, ignore),
            )
        } else {
            input.clone()
        };
        let typed = self.adapter.capabilities().typed_input
            || (self.ctx.diff_input && options.cast_diff_to_model);
        if typed {
            InputItem::typed(self.model.name, fields)
        } else {
            InputItem::plain(fields)
        }
    }

    fn deny(&self, action: &Action, field: Option<String>) -> AuthorizeError {
        let options = &self.ctx.options;
        let (kind, status) = if self.ctx.is_anonymous() {
            (DenialKind::Unauthenticated, options.unauthenticated_error_code)
        } else {
            (DenialKind::Unauthorized, options.unauthorized_error_code)
        };
        tracing::debug!(
            action = %action,
            resource_type = self.model.name,
            status,
            field = field.as_deref(),
            "access denied"
        );
        Denial {
            kind,
            status,
            action: action.clone(),
            resource_type: self.model.name.to_owned(),
            field,
        }
        .into()
    }
}
