//! Domain models for the field `AuthZ` module.
//!
//! All payloads are JSON-shaped: an entity is a typed wrapper over a field
//! map, an input item is the proposed write body, and a principal is the
//! acting identity with arbitrary extra attributes.

use std::fmt;

use modkit_utils::PlainObject;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// The acting identity for an authorization check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Principal {
    /// Identity of the principal, compared against resource fields by policies.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
    /// Role used to select the applicable grants.
    pub role: String,
    /// Additional attributes available to policy evaluation.
    #[serde(flatten)]
    pub attributes: Map<String, Value>,
}

impl Principal {
    /// Create a principal with the given role and no identity.
    #[must_use]
    pub fn new(role: impl Into<String>) -> Self {
        Self {
            id: None,
            role: role.into(),
            attributes: Map::new(),
        }
    }

    /// Set the identity.
    #[must_use]
    pub fn with_id(mut self, id: impl Into<Value>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Add a single extra attribute.
    #[must_use]
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// Build a principal from a record's fields.
    ///
    /// `id` and `role` are lifted out of the map; a missing or non-string
    /// role falls back to `default_role`. Used when the result of a write is
    /// the principal's own record.
    #[must_use]
    pub fn from_fields(fields: &Map<String, Value>, default_role: &str) -> Self {
        let mut attributes = fields.clone();
        let id = attributes.remove("id");
        let role = match attributes.remove("role") {
            Some(Value::String(role)) => role,
            _ => default_role.to_owned(),
        };
        Self {
            id,
            role,
            attributes,
        }
    }

    /// Whether this principal has the given role.
    #[must_use]
    pub fn is_role(&self, role: &str) -> bool {
        self.role == role
    }

    /// Flattened JSON view (`{ id, role, ...attributes }`).
    #[must_use]
    pub fn to_value(&self) -> Value {
        let mut map = self.attributes.clone();
        if let Some(id) = &self.id {
            map.insert("id".to_owned(), id.clone());
        }
        map.insert("role".to_owned(), Value::String(self.role.clone()));
        Value::Object(map)
    }
}

/// An action performed on a resource.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Action {
    Create,
    Read,
    Update,
    Delete,
    /// Any application-defined action name.
    Custom(String),
}

impl Action {
    /// Action name as matched by policy rules.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Create => "create",
            Self::Read => "read",
            Self::Update => "update",
            Self::Delete => "delete",
            Self::Custom(name) => name,
        }
    }

    /// Whether the action writes data.
    #[must_use]
    pub fn is_mutation(&self) -> bool {
        matches!(self, Self::Create | Self::Update | Self::Delete)
    }
}

impl From<&str> for Action {
    fn from(name: &str) -> Self {
        match name {
            "create" => Self::Create,
            "read" => Self::Read,
            "update" => Self::Update,
            "delete" => Self::Delete,
            other => Self::Custom(other.to_owned()),
        }
    }
}

impl From<String> for Action {
    fn from(name: String) -> Self {
        Self::from(name.as_str())
    }
}

impl From<Action> for String {
    fn from(action: Action) -> Self {
        match action {
            Action::Custom(name) => name,
            known => known.as_str().to_owned(),
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A domain entity tagged with its type name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    entity_type: String,
    attributes: Map<String, Value>,
}

impl Entity {
    #[must_use]
    pub fn new(entity_type: impl Into<String>, attributes: Map<String, Value>) -> Self {
        Self {
            entity_type: entity_type.into(),
            attributes,
        }
    }

    /// An entity with no fields (a resource that does not exist yet).
    #[must_use]
    pub fn empty(entity_type: impl Into<String>) -> Self {
        Self::new(entity_type, Map::new())
    }

    /// Wrap a JSON object; returns `None` for anything else.
    #[must_use]
    pub fn from_value(entity_type: impl Into<String>, value: Value) -> Option<Self> {
        match value {
            Value::Object(attributes) => Some(Self::new(entity_type, attributes)),
            _ => None,
        }
    }

    #[must_use]
    pub fn entity_type(&self) -> &str {
        &self.entity_type
    }

    #[must_use]
    pub fn attributes(&self) -> &Map<String, Value> {
        &self.attributes
    }

    #[must_use]
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.attributes.get(field)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }

    #[must_use]
    pub fn to_value(&self) -> Value {
        Value::Object(self.attributes.clone())
    }
}

impl PlainObject for Entity {
    fn fields(&self) -> Option<&Map<String, Value>> {
        Some(&self.attributes)
    }
}

/// Proposed new state for a write action.
///
/// Plain by default; wrapped in the entity type when the backend or the
/// options ask for a typed input.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct InputItem {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    entity_type: Option<String>,
    fields: Map<String, Value>,
}

impl InputItem {
    #[must_use]
    pub fn plain(fields: Map<String, Value>) -> Self {
        Self {
            entity_type: None,
            fields,
        }
    }

    #[must_use]
    pub fn typed(entity_type: impl Into<String>, fields: Map<String, Value>) -> Self {
        Self {
            entity_type: Some(entity_type.into()),
            fields,
        }
    }

    /// Entity type this input was wrapped in, if any.
    #[must_use]
    pub fn entity_type(&self) -> Option<&str> {
        self.entity_type.as_deref()
    }

    #[must_use]
    pub fn attributes(&self) -> &Map<String, Value> {
        &self.fields
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    #[must_use]
    pub fn to_value(&self) -> Value {
        Value::Object(self.fields.clone())
    }
}

impl PlainObject for InputItem {
    fn fields(&self) -> Option<&Map<String, Value>> {
        Some(&self.fields)
    }
}

/// The entity instance(s) an action targets.
///
/// Normalized once when the request context is built so downstream code
/// never has to ask "is this a list".
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Resource {
    #[default]
    Empty,
    Single(Entity),
    Many(Vec<Entity>),
}

impl Resource {
    /// Normalize a list of rows: none, one, or many.
    #[must_use]
    pub fn from_rows(mut rows: Vec<Entity>) -> Self {
        match rows.len() {
            0 => Self::Empty,
            1 => rows.pop().map_or(Self::Empty, Self::Single),
            _ => Self::Many(rows),
        }
    }

    /// Normalize a JSON value into a resource of the given type.
    ///
    /// Objects become `Single`, arrays keep their object elements, anything
    /// else is `Empty`.
    #[must_use]
    pub fn from_value(entity_type: &str, value: Value) -> Self {
        match value {
            Value::Object(attributes) => Self::Single(Entity::new(entity_type, attributes)),
            Value::Array(rows) => Self::from_rows(
                rows.into_iter()
                    .filter_map(|row| Entity::from_value(entity_type, row))
                    .collect(),
            ),
            _ => Self::Empty,
        }
    }

    #[must_use]
    pub fn items(&self) -> &[Entity] {
        match self {
            Self::Empty => &[],
            Self::Single(entity) => std::slice::from_ref(entity),
            Self::Many(entities) => entities,
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items().is_empty()
    }
}

/// Static descriptor for an entity type.
///
/// The name is what policies match on; the columns are the full field
/// universe, used by backends that derive an allow-list from deny-only rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModelDescriptor {
    /// Entity type name (e.g. `"User"`).
    pub name: &'static str,
    /// Declared column / attribute names.
    pub columns: &'static [&'static str],
}

impl ModelDescriptor {
    /// Tag a field map with this entity type.
    #[must_use]
    pub fn entity(&self, attributes: Map<String, Value>) -> Entity {
        Entity::new(self.name, attributes)
    }

    #[must_use]
    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| (*c).to_owned()).collect()
    }
}
