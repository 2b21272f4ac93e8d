//! Ordered rule lists and their evaluation.

use std::collections::BTreeSet;

use field_authz_sdk::{Entity, WILDCARD};
use modkit_utils::{deep_keys, get_path, values_equal};
use serde_json::{Map, Value};

/// Action name matching every action.
pub const MANAGE: &str = "manage";
/// Subject name matching every entity type.
pub const ALL: &str = "all";

/// A single `can` / `cannot` rule.
#[derive(Debug, Clone, PartialEq)]
pub struct Rule {
    action: String,
    subject: String,
    fields: Option<Vec<String>>,
    conditions: Option<Map<String, Value>>,
    inverted: bool,
}

impl Rule {
    /// Allow `action` on `subject`.
    #[must_use]
    pub fn can(action: impl Into<String>, subject: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            subject: subject.into(),
            fields: None,
            conditions: None,
            inverted: false,
        }
    }

    /// Forbid `action` on `subject`.
    #[must_use]
    pub fn cannot(action: impl Into<String>, subject: impl Into<String>) -> Self {
        Self {
            inverted: true,
            ..Self::can(action, subject)
        }
    }

    /// Restrict the rule to the given dot-paths.
    #[must_use]
    pub fn on_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fields = Some(fields.into_iter().map(Into::into).collect());
        self
    }

    /// Guard the rule with equality conditions on the resource.
    #[must_use]
    pub fn when(mut self, conditions: Map<String, Value>) -> Self {
        self.conditions = Some(conditions);
        self
    }

    #[must_use]
    pub fn fields(&self) -> Option<&[String]> {
        self.fields.as_deref()
    }

    fn matches_target(&self, action: &str, subject: &str) -> bool {
        (self.action == MANAGE || self.action == action)
            && (self.subject == ALL || self.subject == subject)
    }

    /// Field-less checks skip inverted field rules: forbidding one field
    /// does not forbid the action.
    fn matches_field(&self, field: Option<&str>) -> bool {
        match (&self.fields, field) {
            (None, _) => true,
            (Some(_), None) => !self.inverted,
            (Some(patterns), Some(field)) => patterns.iter().any(|p| field_matches(p, field)),
        }
    }

    /// An empty item stands for the entity type itself; conditional rules
    /// then count in their own direction.
    fn matches_conditions(&self, item: &Entity) -> bool {
        let Some(conditions) = &self.conditions else {
            return true;
        };
        if item.is_empty() {
            return !self.inverted;
        }
        let item = item.to_value();
        conditions.iter().all(|(path, expected)| {
            get_path(&item, path).is_some_and(|actual| values_equal(actual, expected))
        })
    }
}

/// Whether `pattern` covers `field`: equal, an ancestor, `*`, or `prefix.*`.
fn field_matches(pattern: &str, field: &str) -> bool {
    if pattern == WILDCARD || is_within(field, pattern) {
        return true;
    }
    pattern
        .strip_suffix(".*")
        .is_some_and(|prefix| is_within(field, prefix) && field != prefix)
}

fn is_within(field: &str, ancestor: &str) -> bool {
    field
        .strip_prefix(ancestor)
        .is_some_and(|rest| rest.is_empty() || rest.starts_with('.'))
}

/// An ordered rule list; later rules take precedence.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Ability {
    rules: Vec<Rule>,
}

impl Ability {
    #[must_use]
    pub fn new(rules: Vec<Rule>) -> Self {
        Self { rules }
    }

    #[must_use]
    pub fn with_rule(mut self, rule: Rule) -> Self {
        self.rules.push(rule);
        self
    }

    #[must_use]
    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// Whether `action` on `item` (or on one of its fields) is allowed.
    ///
    /// The last rule that targets the action, subject and field and whose
    /// conditions hold decides; no such rule means no.
    #[must_use]
    pub fn can(&self, action: &str, item: &Entity, field: Option<&str>) -> bool {
        self.rules
            .iter()
            .rev()
            .filter(|rule| rule.matches_target(action, item.entity_type()))
            .filter(|rule| rule.matches_field(field))
            .find(|rule| rule.matches_conditions(item))
            .is_some_and(|rule| !rule.inverted)
    }

    /// Fields of `item` the principal may touch for `action`.
    ///
    /// Applicable rules are folded in definition order: allowing rules add
    /// their fields, inverted ones remove them. A rule without fields covers
    /// the item's leaf keys, or `universe` when the item has none.
    #[must_use]
    pub fn permitted_fields(
        &self,
        action: &str,
        item: &Entity,
        universe: &[String],
    ) -> BTreeSet<String> {
        let item_fields = deep_keys(item);
        let default_fields = if item_fields.is_empty() {
            universe
        } else {
            &item_fields[..]
        };

        let mut permitted = BTreeSet::new();
        for rule in self
            .rules
            .iter()
            .filter(|rule| rule.matches_target(action, item.entity_type()))
            .filter(|rule| rule.matches_conditions(item))
        {
            let fields = rule.fields().unwrap_or(default_fields);
            if rule.inverted {
                permitted.retain(|field: &String| !fields.iter().any(|p| field_matches(p, field)));
            } else {
                permitted.extend(fields.iter().cloned());
            }
        }
        permitted
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use serde_json::json;

    fn obj(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            other => panic!("expected object, got {other}"),
        }
    }

    fn user(id: i64) -> Entity {
        Entity::new(
            "User",
            obj(json!({
                "id": id,
                "username": "user1",
                "password": "secret",
                "metadata": { "fixedField": 1, "mutableField": 2, "hiddenField": 3 }
            })),
        )
    }

    fn ability_for(user_id: i64) -> Ability {
        Ability::default()
            .with_rule(Rule::can("read", "User"))
            .with_rule(Rule::cannot("read", "User").on_fields(["metadata.hiddenField", "password"]))
            .with_rule(
                Rule::can("read", "User")
                    .on_fields(["password"])
                    .when(obj(json!({ "id": user_id }))),
            )
            .with_rule(Rule::can("update", "User").when(obj(json!({ "id": user_id }))))
            .with_rule(Rule::cannot("update", "User").on_fields(["id", "metadata.fixedField"]))
    }

    #[test]
    fn later_rules_take_precedence() {
        let ability = ability_for(1);
        assert!(ability.can("update", &user(1), Some("metadata.mutableField")));
        assert!(!ability.can("update", &user(1), Some("metadata.fixedField")));
        assert!(!ability.can("update", &user(1), Some("id")));
        assert!(!ability.can("update", &user(2), Some("username")));
    }

    #[test]
    fn inverted_field_rules_do_not_forbid_the_action() {
        let ability = ability_for(1);
        assert!(ability.can("read", &user(2), None));
        assert!(ability.can("update", &user(1), None));
        assert!(!ability.can("delete", &user(1), None));
    }

    #[test]
    fn permitted_fields_fold_in_order() {
        let ability = ability_for(1);

        let other = ability.permitted_fields("read", &user(2), &[]);
        assert!(other.contains("metadata.fixedField"));
        assert!(!other.contains("metadata.hiddenField"));
        assert!(!other.contains("password"));

        let own = ability.permitted_fields("read", &user(1), &[]);
        assert!(own.contains("password"));
        assert!(!own.contains("metadata.hiddenField"));
    }

    #[test]
    fn empty_item_falls_back_to_universe() {
        let ability = Ability::new(vec![Rule::can("manage", "all")]);
        let universe = vec!["id".to_owned(), "email".to_owned()];
        let fields = ability.permitted_fields("read", &Entity::empty("Pet"), &universe);
        assert_eq!(fields.into_iter().collect::<Vec<_>>(), vec!["email", "id"]);
        assert!(ability.can("publish", &Entity::empty("Pet"), Some("name")));
    }

    #[test]
    fn conditional_rules_on_empty_item_count_in_their_direction() {
        let ability = Ability::new(vec![
            Rule::can("update", "User").when(obj(json!({ "id": 1 }))),
        ]);
        assert!(ability.can("update", &Entity::empty("User"), None));

        let forbidden = Ability::new(vec![
            Rule::can("update", "User"),
            Rule::cannot("update", "User").when(obj(json!({ "locked": true }))),
        ]);
        assert!(forbidden.can("update", &Entity::empty("User"), None));
    }

    #[test]
    fn field_patterns() {
        assert!(field_matches("*", "a.b"));
        assert!(field_matches("metadata", "metadata.fixedField"));
        assert!(field_matches("metadata.*", "metadata.fixedField"));
        assert!(!field_matches("metadata.*", "metadata"));
        assert!(!field_matches("meta", "metadata"));
    }
}
