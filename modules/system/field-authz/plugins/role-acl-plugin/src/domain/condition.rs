//! Condition evaluation over a flat context.

use modkit_utils::get_path;
use serde_json::{Map, Value};

use crate::config::Condition;

/// Prefix marking a string as a context path instead of a literal.
const PATH_PREFIX: &str = "$.";

impl Condition {
    /// Whether the condition holds for `context`.
    ///
    /// A path that does not resolve never equals anything, so a missing
    /// identity cannot match another missing identity.
    #[must_use]
    pub fn matches(&self, context: &Map<String, Value>) -> bool {
        match self {
            Self::Equals(args) => args
                .iter()
                .all(|(path, expected)| equals(context, path, expected)),
            Self::NotEquals(args) => args
                .iter()
                .all(|(path, expected)| !equals(context, path, expected)),
            Self::And(conditions) => conditions.iter().all(|c| c.matches(context)),
            Self::Or(conditions) => conditions.iter().any(|c| c.matches(context)),
            Self::Not(conditions) => !conditions.iter().all(|c| c.matches(context)),
        }
    }
}

fn equals(context: &Map<String, Value>, path: &str, expected: &Value) -> bool {
    let Some(actual) = lookup(context, path) else {
        return false;
    };
    let expected = match expected {
        Value::String(s) if s.starts_with(PATH_PREFIX) => lookup(context, s),
        literal => Some(literal),
    };
    expected.is_some_and(|expected| actual == expected)
}

fn lookup<'a>(context: &'a Map<String, Value>, path: &str) -> Option<&'a Value> {
    let path = path.strip_prefix(PATH_PREFIX).unwrap_or(path);
    let (head, rest) = path.split_once('.').unwrap_or((path, ""));
    let value = context.get(head)?;
    if value.is_null() {
        return None;
    }
    get_path(value, rest).filter(|v| !v.is_null())
}
