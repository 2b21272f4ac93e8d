#![allow(clippy::unwrap_used, clippy::expect_used)]

mod support;

use std::sync::{Arc, Mutex};

use ability_authz_plugin::{Ability, AbilityAdapter, Rule};
use field_authz::{FieldAuthorizer, HookArgs};
use field_authz_sdk::{AuthorizeError, AuthorizeOptions, OptionsOverride};
use serde_json::{Value, json};
use support::{Table, USER, authorizer, obj, seed_row, user};

fn users() -> FieldAuthorizer {
    let own = json!({ "id": "$.principal.id" });
    authorizer(json!({
        "backend": "ability",
        "backend_config": {
            "common": [
                { "action": "read", "subject": "User" },
                {
                    "action": "read", "subject": "User",
                    "fields": ["metadata.hiddenField", "password"], "inverted": true
                }
            ],
            "roles": {
                "anonymous": [ { "action": "create" } ],
                "user": [
                    { "action": "read", "subject": "User", "fields": ["password"], "conditions": own },
                    { "action": "update", "subject": "User", "conditions": own },
                    {
                        "action": "update", "subject": "User", "inverted": true,
                        "fields": ["id", "metadata.fixedField", "created_at", "updated_at"]
                    },
                    { "action": "delete", "subject": "User", "conditions": own }
                ]
            }
        }
    }))
}

fn denied_field(result: &Result<Value, AuthorizeError>) -> Option<String> {
    result
        .as_ref()
        .err()
        .and_then(AuthorizeError::as_denial)
        .and_then(|denial| denial.field.clone())
}

#[tokio::test]
async fn anonymous_read_drops_hidden_nested_fields() {
    let table = Table::seeded();
    let rows = table
        .find(users().query().authorize(None, None, None), None)
        .await
        .unwrap();

    for row in rows.as_array().unwrap() {
        assert!(row.get("password").is_none());
        assert_eq!(row["metadata"]["fixedField"], json!("fixed"));
        assert_eq!(row["metadata"]["mutableField"], json!("mutable"));
        assert!(row["metadata"].get("hiddenField").is_none());
    }
}

#[tokio::test]
async fn own_password_is_readable() {
    let table = Table::seeded();
    let rows = table
        .find(users().query().authorize(user(1), None, None), None)
        .await
        .unwrap();

    assert_eq!(rows[0]["password"], json!("password1"));
    assert!(rows[1].get("password").is_none());
}

#[tokio::test]
async fn update_fetched_from_store_checks_the_diff() {
    let table = Table::seeded();
    let mut body = seed_row(1);
    body["metadata"]["mutableField"] = json!("changed");

    let updated = table
        .patch(
            users()
                .query()
                .authorize(user(1), None, None)
                .fetch_resource_from_store()
                .diff_input_from_resource(),
            1,
            Value::Object(body.clone()),
        )
        .await
        .unwrap();
    assert_eq!(updated["metadata"]["mutableField"], json!("changed"));

    let undiffed = table
        .patch(
            users().query().authorize(user(1), None, None),
            1,
            Value::Object(body),
        )
        .await;
    assert_eq!(undiffed.as_ref().unwrap_err().status(), Some(403));
    assert!(denied_field(&undiffed).is_some());
}

#[tokio::test]
async fn update_against_manual_resource_checks_the_diff() {
    let table = Table::seeded();
    let updated = table
        .patch(
            users()
                .query()
                .authorize(user(1), Some(Value::Object(seed_row(1))), None)
                .diff_input_from_resource(),
            1,
            json!({ "id": 1, "username": "renamed" }),
        )
        .await
        .unwrap();
    assert_eq!(updated["username"], json!("renamed"));
}

#[tokio::test]
async fn update_of_bound_instance_checks_the_diff() {
    let table = Table::seeded();
    let updated = table
        .patch(
            users()
                .query_for(seed_row(1))
                .authorize(user(1), None, None)
                .diff_input_from_resource(),
            1,
            json!({ "metadata": { "fixedField": "fixed", "mutableField": "new" } }),
        )
        .await
        .unwrap();
    assert_eq!(updated["metadata"]["mutableField"], json!("new"));
    assert_eq!(updated["metadata"]["fixedField"], json!("fixed"));
}

#[tokio::test]
async fn changing_a_fixed_field_aborts_the_update() {
    let table = Table::seeded();
    let result = table
        .patch(
            users()
                .query_for(seed_row(1))
                .authorize(user(1), None, None)
                .diff_input_from_resource(),
            1,
            json!({ "metadata": { "fixedField": "changed" } }),
        )
        .await;

    assert_eq!(denied_field(&result).as_deref(), Some("metadata.fixedField"));
    assert_eq!(
        table.row(1).await.unwrap()["metadata"]["fixedField"],
        json!("fixed")
    );
}

#[tokio::test]
async fn ignored_fields_are_left_out_of_the_diff() {
    let table = Table::seeded();
    let mut body = seed_row(1);
    body.insert("username".to_owned(), json!("renamed"));
    body.insert("updated_at".to_owned(), json!("2020-01-01T00:00:00.000Z"));

    let strict = table
        .patch(
            users()
                .query()
                .authorize(user(1), None, None)
                .fetch_resource_from_store()
                .diff_input_from_resource(),
            1,
            Value::Object(body.clone()),
        )
        .await;
    assert_eq!(denied_field(&strict).as_deref(), Some("updated_at"));

    let ignoring = OptionsOverride::new()
        .ignore_fields(vec!["created_at".to_owned(), "updated_at".to_owned()]);
    let updated = table
        .patch(
            users()
                .query()
                .authorize(user(1), None, Some(ignoring))
                .fetch_resource_from_store()
                .diff_input_from_resource(),
            1,
            Value::Object(body),
        )
        .await
        .unwrap();
    assert_eq!(updated["username"], json!("renamed"));
}

#[tokio::test]
async fn equivalent_timestamps_do_not_count_as_changes() {
    let table = Table::seeded();
    let mut body = seed_row(1);
    body.insert("created_at".to_owned(), json!("1984-04-07"));
    body.insert("username".to_owned(), json!("renamed"));

    let updated = table
        .patch(
            users()
                .query()
                .authorize(user(1), None, None)
                .fetch_resource_from_store()
                .diff_input_from_resource(),
            1,
            Value::Object(body),
        )
        .await
        .unwrap();
    assert_eq!(updated["username"], json!("renamed"));
}

#[tokio::test]
async fn only_anonymous_may_create() {
    let table = Table::seeded();

    let created = table
        .insert(
            users().query().authorize(None, None, None),
            json!({ "username": "newbie", "password": "pw" }),
        )
        .await
        .unwrap();
    assert_eq!(created["username"], json!("newbie"));
    assert!(created.get("password").is_none());

    let denied = table
        .insert(
            users().query().authorize(user(1), None, None),
            json!({ "username": "another" }),
        )
        .await;
    assert_eq!(denied_field(&denied).as_deref(), Some("username"));
    assert_eq!(table.len().await, 3);
}

#[tokio::test]
async fn delete_requires_ownership() {
    let table = Table::seeded();

    let denied = table
        .delete(users().query().authorize(user(1), None, None), 2)
        .await;
    assert_eq!(denied.unwrap_err().status(), Some(403));

    table
        .delete(users().query().authorize(user(1), None, None), 1)
        .await
        .unwrap();
    assert!(table.row(1).await.is_none());
}

#[tokio::test]
async fn direct_read_uses_item_fields() {
    let visible = users()
        .authorize_read(&seed_row(1), None, None, None)
        .await
        .unwrap();
    assert_eq!(visible["email"], json!("user1@example.com"));
    assert!(visible.get("password").is_none());
}

#[tokio::test]
async fn cast_diff_wraps_input_in_the_entity_type() {
    let seen: Arc<Mutex<Vec<Option<String>>>> = Arc::default();
    let recorder = Arc::clone(&seen);
    let adapter = AbilityAdapter::new(move |ctx| {
        recorder
            .lock()
            .unwrap()
            .push(ctx.input.entity_type().map(ToOwned::to_owned));
        Ability::new(vec![Rule::can("manage", "all")])
    });
    let options = AuthorizeOptions {
        cast_diff_to_model: true,
        ..AuthorizeOptions::default()
    };
    let users = FieldAuthorizer::new(Arc::new(adapter), options, USER);

    let mut diffed = users
        .query_for(seed_row(1))
        .authorize(user(1), None, None)
        .diff_input_from_resource();
    diffed
        .before_update(HookArgs::input(vec![obj(json!({ "username": "x" }))]))
        .await
        .unwrap();

    let mut plain = users.query_for(seed_row(1)).authorize(user(1), None, None);
    plain
        .before_update(HookArgs::input(vec![obj(json!({ "username": "x" }))]))
        .await
        .unwrap();

    assert_eq!(
        *seen.lock().unwrap(),
        vec![Some("User".to_owned()), None]
    );
}
