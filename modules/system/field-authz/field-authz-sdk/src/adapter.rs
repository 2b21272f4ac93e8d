//! Protocol every pluggable policy backend implements.
//!
//! The orchestrator calls [`PolicyAdapter::evaluate`] once per
//! `(resource item, input item)` pair and then interrogates the returned
//! [`PolicyHandle`]. A denial is reported through
//! [`PolicyHandle::is_granted`]; an `Err` from `evaluate` means the backend
//! itself failed.

use std::collections::BTreeSet;
use std::fmt;

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::decision::FieldVisibility;
use crate::error::AdapterError;
use crate::models::{Action, Entity, InputItem, Principal};
use crate::options::AuthorizeOptions;

/// How a backend validates the fields touched by a write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FieldValidation {
    /// The backend returns allow/deny sets; the write body is narrowed.
    #[default]
    AllowDenySets,
    /// The backend answers per field; any disallowed field aborts the write.
    PerField,
}

/// Shape of the context a backend expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ContextShape {
    /// One attribute map: `{ <context_key>: { user, body }, ...augments, ...resource }`.
    #[default]
    Flat,
    /// The typed resource item plus the model's field universe.
    Typed,
}

/// What the orchestrator must prepare before calling a backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AdapterCapabilities {
    pub field_validation: FieldValidation,
    pub context_shape: ContextShape,
    /// Always wrap input items in the entity type.
    pub typed_input: bool,
}

/// Everything a backend may need for one evaluation.
#[derive(Debug, Clone)]
pub struct EvaluationRequest {
    pub principal: Principal,
    pub action: Action,
    /// Resource item; empty for a create.
    pub item: Entity,
    /// Proposed write body (possibly diffed); empty for reads and deletes.
    pub input: InputItem,
    pub options: AuthorizeOptions,
    pub relation: Option<String>,
    /// Prepared flat context; only set for [`ContextShape::Flat`] backends.
    pub context: Option<Map<String, Value>>,
    /// Declared columns of the entity type; only set for [`ContextShape::Typed`].
    pub field_universe: Vec<String>,
}

impl EvaluationRequest {
    /// Resource type name used for rule matching.
    #[must_use]
    pub fn resource_type(&self) -> &str {
        self.item.entity_type()
    }
}

/// Backend-specific result of one evaluation.
pub trait PolicyHandle: Send + Sync + fmt::Debug {
    /// Whether `action` on `item` is permitted at row level.
    fn is_granted(&self, action: &Action, item: &Entity) -> bool;

    /// Dot-paths the principal may touch; may contain the wildcard.
    fn allowed_fields(&self) -> BTreeSet<String>;

    /// Dot-paths the principal may not touch.
    fn denied_fields(&self) -> BTreeSet<String>;

    fn visibility(&self) -> FieldVisibility {
        FieldVisibility::new(self.allowed_fields(), self.denied_fields())
    }

    /// Per-field check used by [`FieldValidation::PerField`] backends.
    ///
    /// The default consults the combined allow/deny sets.
    fn permits_field(&self, _action: &Action, _item: &Entity, field: &str) -> bool {
        self.visibility().is_visible(field)
    }
}

/// Asynchronous policy backend.
#[async_trait]
pub trait PolicyAdapter: Send + Sync {
    /// Registry identifier (e.g. `"role_acl"`).
    fn name(&self) -> &'static str;

    fn capabilities(&self) -> AdapterCapabilities {
        AdapterCapabilities::default()
    }

    /// Evaluate the rules matching the request.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError`] when the backend cannot evaluate at all
    /// (malformed context, internal failure). Never used to signal a denial.
    async fn evaluate(
        &self,
        request: &EvaluationRequest,
    ) -> Result<Box<dyn PolicyHandle>, AdapterError>;
}

/// Synchronous policy backend, lifted to [`PolicyAdapter`] by [`Blocking`].
pub trait SyncPolicyAdapter: Send + Sync {
    fn name(&self) -> &'static str;

    fn capabilities(&self) -> AdapterCapabilities {
        AdapterCapabilities::default()
    }

    /// # Errors
    ///
    /// Same contract as [`PolicyAdapter::evaluate`].
    fn evaluate(&self, request: &EvaluationRequest)
    -> Result<Box<dyn PolicyHandle>, AdapterError>;
}

/// Runs a [`SyncPolicyAdapter`] inline behind the async protocol.
#[derive(Debug, Clone)]
pub struct Blocking<A>(pub A);

#[async_trait]
impl<A: SyncPolicyAdapter> PolicyAdapter for Blocking<A> {
    fn name(&self) -> &'static str {
        self.0.name()
    }

    fn capabilities(&self) -> AdapterCapabilities {
        self.0.capabilities()
    }

    async fn evaluate(
        &self,
        request: &EvaluationRequest,
    ) -> Result<Box<dyn PolicyHandle>, AdapterError> {
        self.0.evaluate(request)
    }
}
