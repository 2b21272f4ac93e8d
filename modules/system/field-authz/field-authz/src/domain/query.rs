//! Per-query decision orchestrator.
//!
//! [`AuthorizedQuery`] is owned by the lifecycle substrate for the duration
//! of one query. Chain methods build the [`AccessContext`]; the substrate
//! then drives the `before_*` / `after_*` hooks.
//!
//! ```ignore
//! let mut query = users
//!     .query_for(instance)
//!     .authorize(Some(principal), None, None)
//!     .diff_input_from_resource();
//!
//! let body = query.before_update(HookArgs::input(vec![patch])).await?;
//! let row = table.patch(body).await;
//! let visible = query.after_update(row).await?;
//! ```

use std::fmt;
use std::mem;

use field_authz_sdk::{
    Action, AuthorizeError, Entity, OptionsOverride, Principal, Resource, ResourceStore,
    StoreError,
};
use serde_json::{Map, Value};

use super::authorizer::FieldAuthorizer;
use super::context::{AccessContext, ResolvedContext};
use super::evaluator::Evaluator;
use super::filter::RowDecisions;

/// Where a query is in its authorization lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryState {
    /// `authorize` was never called; every hook is a pass-through.
    Unauthenticated,
    /// Authorized, check not run yet (or deferred to the result).
    Pending,
    /// Decision computed.
    Checked,
}

/// Arguments handed to a `before_*` hook by the substrate.
#[derive(Default)]
pub struct HookArgs<'a> {
    /// Rows the substrate already knows the query targets.
    pub items: Vec<Map<String, Value>>,
    /// Write payload(s).
    pub input_items: Vec<Map<String, Value>>,
    /// Relation being queried through, if any.
    pub relation: Option<String>,
    /// Side-channel lookup of the current rows.
    pub store: Option<&'a dyn ResourceStore>,
}

impl<'a> HookArgs<'a> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Arguments carrying only a write payload.
    #[must_use]
    pub fn input(input_items: Vec<Map<String, Value>>) -> Self {
        Self {
            input_items,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_items(mut self, items: Vec<Map<String, Value>>) -> Self {
        self.items = items;
        self
    }

    #[must_use]
    pub fn with_relation(mut self, relation: impl Into<String>) -> Self {
        self.relation = Some(relation.into());
        self
    }

    #[must_use]
    pub fn with_store(mut self, store: &'a dyn ResourceStore) -> Self {
        self.store = Some(store);
        self
    }
}

impl fmt::Debug for HookArgs<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HookArgs")
            .field("items", &self.items)
            .field("input_items", &self.input_items)
            .field("relation", &self.relation)
            .field("store", &self.store.is_some())
            .finish()
    }
}

/// Authorization state of one query.
#[derive(Debug)]
pub struct AuthorizedQuery {
    authorizer: FieldAuthorizer,
    instance: Option<Entity>,
    context: AccessContext,
    state: QueryState,
    relation: Option<String>,
    read_gate: Option<RowDecisions>,
}

impl AuthorizedQuery {
    pub(crate) fn new(authorizer: FieldAuthorizer, instance: Option<Entity>) -> Self {
        Self {
            authorizer,
            instance,
            context: AccessContext::new(),
            state: QueryState::Unauthenticated,
            relation: None,
            read_gate: None,
        }
    }

    /// Opt this query into authorization.
    ///
    /// `principal` defaults to the default role, `resource` to the bound
    /// instance (or whatever the hooks resolve later). Calling it again
    /// overlays the earlier values.
    #[must_use]
    pub fn authorize(
        mut self,
        principal: Option<Principal>,
        resource: Option<Value>,
        overrides: Option<OptionsOverride>,
    ) -> Self {
        let mut context = mem::take(&mut self.context);
        if let Some(principal) = principal {
            context = context.principal(principal);
        }
        if let Some(resource) = resource {
            context = context.resource(Resource::from_value(self.authorizer.model().name, resource));
        }
        if let Some(overrides) = overrides {
            context = context.overrides(overrides);
        }
        self.context = context;
        self.state = QueryState::Pending;
        self
    }

    /// Check `action` instead of the one the hook implies.
    #[must_use]
    pub fn action(mut self, action: impl Into<Action>) -> Self {
        self.context = mem::take(&mut self.context).action(action.into());
        self
    }

    /// Resolve the resource from the store right before the check.
    #[must_use]
    pub fn fetch_resource_from_store(mut self) -> Self {
        self.context = mem::take(&mut self.context).fetch_from_store();
        self
    }

    /// Check only the fields that differ from the resource.
    #[must_use]
    pub fn diff_input_from_resource(mut self) -> Self {
        self.context = mem::take(&mut self.context).diff_input();
        self
    }

    #[must_use]
    pub fn state(&self) -> QueryState {
        self.state
    }

    #[must_use]
    pub fn context(&self) -> &AccessContext {
        &self.context
    }

    /// # Errors
    ///
    /// Returns [`AuthorizeError`] when the create is denied or the backend fails.
    #[tracing::instrument(skip_all, fields(hook = "before_insert", resource_type = self.authorizer.model().name))]
    pub async fn before_insert(
        &mut self,
        args: HookArgs<'_>,
    ) -> Result<Vec<Map<String, Value>>, AuthorizeError> {
        self.before_write(Action::Create, args).await
    }

    /// # Errors
    ///
    /// Returns [`AuthorizeError`] when the update is denied, the resource
    /// cannot be fetched, or the backend fails.
    #[tracing::instrument(skip_all, fields(hook = "before_update", resource_type = self.authorizer.model().name))]
    pub async fn before_update(
        &mut self,
        args: HookArgs<'_>,
    ) -> Result<Vec<Map<String, Value>>, AuthorizeError> {
        self.before_write(Action::Update, args).await
    }

    /// # Errors
    ///
    /// Returns [`AuthorizeError`] when the delete is denied, the resource
    /// cannot be fetched, or the backend fails.
    #[tracing::instrument(skip_all, fields(hook = "before_delete", resource_type = self.authorizer.model().name))]
    pub async fn before_delete(
        &mut self,
        args: HookArgs<'_>,
    ) -> Result<Vec<Map<String, Value>>, AuthorizeError> {
        self.before_write(Action::Delete, args).await
    }

    /// Check reads eagerly when the resource is already known; otherwise
    /// defer to [`after_find`](Self::after_find).
    ///
    /// # Errors
    ///
    /// Returns [`AuthorizeError`] when the read is denied, the resource
    /// cannot be fetched, or the backend fails.
    #[tracing::instrument(skip_all, fields(hook = "before_find", resource_type = self.authorizer.model().name))]
    pub async fn before_find(&mut self, args: HookArgs<'_>) -> Result<(), AuthorizeError> {
        if self.state == QueryState::Unauthenticated {
            return Ok(());
        }
        self.relation.clone_from(&args.relation);
        let items = self.resolve_items(&args).await?;
        if items.is_empty() {
            tracing::debug!("read check deferred to the result");
            return Ok(());
        }

        let resolved = self.resolve(Action::Read);
        let evaluator = self.evaluator(&resolved);
        let mut decisions = RowDecisions::new();
        for item in &items {
            let visibility = evaluator
                .check_read(&resolved.principal, &resolved.action, item)
                .await?;
            decisions.push(item, visibility);
        }
        self.read_gate = Some(decisions);
        self.state = QueryState::Checked;
        Ok(())
    }

    /// Read-check and filter the inserted row(s).
    ///
    /// # Errors
    ///
    /// Returns [`AuthorizeError`] when the result may not be read.
    #[tracing::instrument(skip_all, fields(hook = "after_insert", resource_type = self.authorizer.model().name))]
    pub async fn after_insert(&mut self, result: Value) -> Result<Value, AuthorizeError> {
        self.after_write(result).await
    }

    /// Read-check and filter the updated row(s).
    ///
    /// # Errors
    ///
    /// Returns [`AuthorizeError`] when the result may not be read.
    #[tracing::instrument(skip_all, fields(hook = "after_update", resource_type = self.authorizer.model().name))]
    pub async fn after_update(&mut self, result: Value) -> Result<Value, AuthorizeError> {
        self.after_write(result).await
    }

    /// Deletes expose no row data; the result passes through.
    ///
    /// # Errors
    ///
    /// Never fails; fallible like the other hooks so the substrate can
    /// drive them uniformly.
    #[allow(clippy::unused_async, clippy::unnecessary_wraps)]
    pub async fn after_delete(&mut self, result: Value) -> Result<Value, AuthorizeError> {
        tracing::debug!(state = ?self.state, "delete result passed through");
        Ok(result)
    }

    /// Filter fetched rows, running the deferred per-row check if needed.
    ///
    /// # Errors
    ///
    /// Returns [`AuthorizeError`] when any fetched row may not be read.
    #[tracing::instrument(skip_all, fields(hook = "after_find", resource_type = self.authorizer.model().name))]
    pub async fn after_find(&mut self, result: Value) -> Result<Value, AuthorizeError> {
        if self.state == QueryState::Unauthenticated {
            return Ok(result);
        }
        if let Some(decisions) = &self.read_gate {
            return Ok(decisions.project(result));
        }
        let resolved = self.resolve(Action::Read);
        let filtered = self.read_result(&resolved, result, false).await?;
        self.state = QueryState::Checked;
        Ok(filtered)
    }

    async fn before_write(
        &mut self,
        default_action: Action,
        args: HookArgs<'_>,
    ) -> Result<Vec<Map<String, Value>>, AuthorizeError> {
        if self.state == QueryState::Unauthenticated {
            return Ok(args.input_items);
        }
        self.relation.clone_from(&args.relation);
        let resolved = self.resolve(default_action);
        let items = self.resolve_items(&args).await?;
        let accepted = self
            .evaluator(&resolved)
            .check_write(&items, args.input_items)
            .await?;
        self.state = QueryState::Checked;
        Ok(accepted)
    }

    async fn after_write(&mut self, result: Value) -> Result<Value, AuthorizeError> {
        if self.state == QueryState::Unauthenticated {
            return Ok(result);
        }
        let mut resolved = self.resolve(Action::Read);
        resolved.action = Action::Read;
        self.read_result(&resolved, result, true).await
    }

    /// Read-check every object in `result` with the row as resource.
    async fn read_result(
        &self,
        resolved: &ResolvedContext,
        result: Value,
        from_write: bool,
    ) -> Result<Value, AuthorizeError> {
        match result {
            Value::Object(row) => Ok(Value::Object(self.read_row(resolved, row, from_write).await?)),
            Value::Array(rows) => {
                let mut filtered = Vec::with_capacity(rows.len());
                for row in rows {
                    filtered.push(match row {
                        Value::Object(row) => {
                            Value::Object(self.read_row(resolved, row, from_write).await?)
                        }
                        other => other,
                    });
                }
                Ok(Value::Array(filtered))
            }
            other => Ok(other),
        }
    }

    async fn read_row(
        &self,
        resolved: &ResolvedContext,
        row: Map<String, Value>,
        from_write: bool,
    ) -> Result<Map<String, Value>, AuthorizeError> {
        let item = self.authorizer.model().entity(row);
        let options = &resolved.options;
        let elevated = from_write && options.user_from_result.applies(&resolved.principal, &item);
        let principal = if elevated {
            tracing::debug!("reading the result as its own principal");
            Principal::from_fields(item.attributes(), &options.default_role)
        } else {
            resolved.principal.clone()
        };
        let visibility = self
            .evaluator(resolved)
            .check_read(&principal, &resolved.action, &item)
            .await?;
        Ok(visibility.project(item.attributes()))
    }

    /// Resource precedence: explicit, then store, then bound instance, then
    /// hook items. Empty means "nothing known yet".
    async fn resolve_items(&self, args: &HookArgs<'_>) -> Result<Vec<Entity>, AuthorizeError> {
        let model = self.authorizer.model();
        if let Some(resource) = self.context.explicit_resource() {
            return Ok(resource.items().to_vec());
        }
        if self.context.wants_store_fetch() {
            let store = args.store.ok_or(StoreError::Unavailable)?;
            let rows = store.fetch_current().await?;
            tracing::debug!(rows = rows.len(), "resource fetched from store");
            return Ok(rows.into_iter().map(|row| model.entity(row)).collect());
        }
        if let Some(instance) = &self.instance {
            return Ok(vec![instance.clone()]);
        }
        Ok(args
            .items
            .iter()
            .map(|row| model.entity(row.clone()))
            .collect())
    }

    fn resolve(&self, default_action: Action) -> ResolvedContext {
        self.context
            .resolve(self.authorizer.options(), default_action)
    }

    fn evaluator<'a>(&'a self, resolved: &'a ResolvedContext) -> Evaluator<'a> {
        Evaluator::new(
            self.authorizer.adapter(),
            self.authorizer.model(),
            resolved,
            self.relation.as_deref(),
        )
    }
}
