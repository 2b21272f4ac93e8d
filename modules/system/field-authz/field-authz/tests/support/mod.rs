//! In-memory lifecycle substrate for integration tests.
//!
//! [`Table`] holds JSON rows and runs each operation through the matching
//! `before_*` / `after_*` hooks of an [`AuthorizedQuery`], the way an ORM
//! would.
#![allow(dead_code, clippy::unwrap_used, clippy::expect_used)]

use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use field_authz::{AuthorizedQuery, FieldAuthorizer, FieldAuthzConfig, HookArgs};
use field_authz_sdk::{AdapterRegistry, ModelDescriptor, Principal, ResourceStore, StoreError};
use serde_json::{Map, Value, json};
use tokio::sync::Mutex;

pub const USER: ModelDescriptor = ModelDescriptor {
    name: "User",
    columns: &[
        "id",
        "username",
        "email",
        "role",
        "secrethiddenfield",
        "password",
        "metadata",
        "created_at",
        "updated_at",
    ],
};

pub fn obj(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        other => panic!("expected object, got {other}"),
    }
}

pub fn user(id: i64) -> Option<Principal> {
    Some(Principal::new("user").with_id(id))
}

pub fn seed_row(id: i64) -> Map<String, Value> {
    obj(json!({
        "id": id,
        "username": format!("user{id}"),
        "email": format!("user{id}@example.com"),
        "role": "user",
        "secrethiddenfield": format!("secret{id}"),
        "password": format!("password{id}"),
        "metadata": {
            "fixedField": "fixed",
            "mutableField": "mutable",
            "hiddenField": "hidden"
        },
        "created_at": "1984-04-07T00:00:00.000Z",
        "updated_at": "1984-04-07T00:00:00.000Z"
    }))
}

pub fn registry() -> AdapterRegistry {
    let mut registry = AdapterRegistry::new();
    role_acl_authz_plugin::register(&mut registry);
    ability_authz_plugin::register(&mut registry);
    registry
}

pub fn authorizer(config: Value) -> FieldAuthorizer {
    let config: FieldAuthzConfig = serde_json::from_value(config).unwrap();
    FieldAuthorizer::from_config(&registry(), &config, USER).unwrap()
}

/// A table of JSON rows keyed by `id`.
pub struct Table {
    rows: Mutex<Vec<Map<String, Value>>>,
    next_id: AtomicI64,
}

impl Table {
    /// Two users, ids 1 and 2.
    pub fn seeded() -> Self {
        Self {
            rows: Mutex::new(vec![seed_row(1), seed_row(2)]),
            next_id: AtomicI64::new(3),
        }
    }

    pub async fn row(&self, id: i64) -> Option<Map<String, Value>> {
        self.rows_with_id(id).await.into_iter().next()
    }

    pub async fn len(&self) -> usize {
        self.rows.lock().await.len()
    }

    async fn rows_with_id(&self, id: i64) -> Vec<Map<String, Value>> {
        self.rows
            .lock()
            .await
            .iter()
            .filter(|row| row_id(row) == Some(id))
            .cloned()
            .collect()
    }

    pub fn lookup(&self, id: i64) -> RowLookup<'_> {
        RowLookup { table: self, id }
    }

    pub async fn insert(
        &self,
        mut query: AuthorizedQuery,
        body: Value,
    ) -> Result<Value, field_authz_sdk::AuthorizeError> {
        let inputs = query.before_insert(HookArgs::input(vec![obj(body)])).await?;
        let mut inserted = Vec::with_capacity(inputs.len());
        for mut row in inputs {
            let id = self.next_id.fetch_add(1, Ordering::SeqCst);
            row.insert("id".to_owned(), json!(id));
            self.rows.lock().await.push(row.clone());
            inserted.push(Value::Object(row));
        }
        let result = match inserted.len() {
            1 => inserted.pop().unwrap(),
            _ => Value::Array(inserted),
        };
        query.after_insert(result).await
    }

    pub async fn patch(
        &self,
        mut query: AuthorizedQuery,
        id: i64,
        body: Value,
    ) -> Result<Value, field_authz_sdk::AuthorizeError> {
        let lookup = self.lookup(id);
        let args = HookArgs::input(vec![obj(body)])
            .with_items(self.rows_with_id(id).await)
            .with_store(&lookup);
        let inputs = query.before_update(args).await?;

        let mut rows = self.rows.lock().await;
        let row = rows
            .iter_mut()
            .find(|row| row_id(row) == Some(id))
            .expect("patched row exists");
        for input in inputs {
            merge(row, input);
        }
        let updated = Value::Object(row.clone());
        drop(rows);
        query.after_update(updated).await
    }

    pub async fn delete(
        &self,
        mut query: AuthorizedQuery,
        id: i64,
    ) -> Result<Value, field_authz_sdk::AuthorizeError> {
        let lookup = self.lookup(id);
        let args = HookArgs::new()
            .with_items(self.rows_with_id(id).await)
            .with_store(&lookup);
        query.before_delete(args).await?;

        let mut rows = self.rows.lock().await;
        let before = rows.len();
        rows.retain(|row| row_id(row) != Some(id));
        let removed = before - rows.len();
        drop(rows);
        query.after_delete(json!(removed)).await
    }

    /// All rows, or the row with `id`.
    pub async fn find(
        &self,
        mut query: AuthorizedQuery,
        id: Option<i64>,
    ) -> Result<Value, field_authz_sdk::AuthorizeError> {
        query.before_find(HookArgs::new()).await?;
        let rows = match id {
            Some(id) => self.rows_with_id(id).await,
            None => self.rows.lock().await.clone(),
        };
        let result = match id {
            Some(_) => rows.into_iter().next().map_or(Value::Null, Value::Object),
            None => Value::Array(rows.into_iter().map(Value::Object).collect()),
        };
        query.after_find(result).await
    }
}

/// Side-channel lookup of one row, bypassing the authorization hooks.
pub struct RowLookup<'a> {
    table: &'a Table,
    id: i64,
}

#[async_trait]
impl ResourceStore for RowLookup<'_> {
    async fn fetch_current(&self) -> Result<Vec<Map<String, Value>>, StoreError> {
        Ok(self.table.rows_with_id(self.id).await)
    }
}

fn row_id(row: &Map<String, Value>) -> Option<i64> {
    row.get("id").and_then(Value::as_i64)
}

fn merge(target: &mut Map<String, Value>, patch: Map<String, Value>) {
    for (key, value) in patch {
        match (target.get_mut(&key), value) {
            (Some(Value::Object(existing)), Value::Object(nested)) => merge(existing, nested),
            (_, value) => {
                target.insert(key, value);
            }
        }
    }
}
