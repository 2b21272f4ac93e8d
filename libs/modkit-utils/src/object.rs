//! Structural helpers over plain objects.
//!
//! A "plain object" is anything that can expose its fields as a JSON map.
//! Arrays, strings, numbers and other scalars are leaves: they are never
//! descended into and always compared as a whole.

use serde_json::{Map, Value};

use crate::temporal;

/// Structural capability: "can be read as a field map".
///
/// Implemented for raw JSON values and maps here, and for typed entity
/// wrappers elsewhere, so traversal works the same regardless of the
/// concrete type that carries the fields.
pub trait PlainObject {
    /// The fields of this object, or `None` when it is not a plain object.
    fn fields(&self) -> Option<&Map<String, Value>>;
}

impl PlainObject for Value {
    fn fields(&self) -> Option<&Map<String, Value>> {
        self.as_object()
    }
}

impl PlainObject for Map<String, Value> {
    fn fields(&self) -> Option<&Map<String, Value>> {
        Some(self)
    }
}

impl<T: PlainObject + ?Sized> PlainObject for &T {
    fn fields(&self) -> Option<&Map<String, Value>> {
        (**self).fields()
    }
}

/// Enumerate every leaf field of `obj` as a dot-joined path.
///
/// Nested objects are descended into; arrays and scalars are leaves. An empty
/// nested object is reported as a leaf itself so that writes touching it are
/// not invisible to field checks. Non-objects yield an empty list.
///
/// ```
/// use modkit_utils::deep_keys;
/// use serde_json::json;
///
/// let mut keys = deep_keys(&json!({ "a": { "b": [1, 2], "e": false }, "d": 1 }));
/// keys.sort();
/// assert_eq!(keys, vec!["a.b", "a.e", "d"]);
/// ```
#[must_use]
pub fn deep_keys<T: PlainObject + ?Sized>(obj: &T) -> Vec<String> {
    let mut keys = Vec::new();
    if let Some(map) = obj.fields() {
        collect_leaf_keys(map, None, &mut keys);
    }
    keys
}

fn collect_leaf_keys(map: &Map<String, Value>, prefix: Option<&str>, out: &mut Vec<String>) {
    for (key, value) in map {
        let path = match prefix {
            Some(parent) => format!("{parent}.{key}"),
            None => key.clone(),
        };
        match value.as_object() {
            Some(nested) if !nested.is_empty() => collect_leaf_keys(nested, Some(&path), out),
            _ => out.push(path),
        }
    }
}

/// Return the part of `candidate` that differs from `base`.
///
/// When both are objects this is [`diff_fields`]; otherwise the diff is
/// meaningless and `candidate` is returned whole.
#[must_use]
pub fn structural_diff(base: &Value, candidate: &Value) -> Value {
    match (base, candidate) {
        (Value::Object(base), Value::Object(candidate)) => {
            Value::Object(diff_fields(base, candidate))
        }
        _ => candidate.clone(),
    }
}

/// Keys of `candidate` whose value differs from the same key in `base`.
///
/// Nested objects are compared recursively and only a non-empty sub-diff is
/// kept; an empty candidate object is never a change. Keys present only in `base` never appear in the output. Neither
/// input is modified.
#[must_use]
pub fn diff_fields(base: &Map<String, Value>, candidate: &Map<String, Value>) -> Map<String, Value> {
    let mut out = Map::new();
    for (key, value) in candidate {
        match (base.get(key), value) {
            (Some(Value::Object(base_nested)), Value::Object(nested)) => {
                let sub = diff_fields(base_nested, nested);
                if !sub.is_empty() {
                    out.insert(key.clone(), Value::Object(sub));
                }
            }
            (_, Value::Object(nested)) if nested.is_empty() => {}
            (Some(previous), _) if values_equal(previous, value) => {}
            _ => {
                out.insert(key.clone(), value.clone());
            }
        }
    }
    out
}

/// Leaf equality used by the diff.
///
/// Plain JSON equality, except that two strings denoting the same instant
/// (`"1984-04-07"` and `"1984-04-07T00:00:00.000Z"`) are equal.
#[must_use]
pub fn values_equal(a: &Value, b: &Value) -> bool {
    if a == b {
        return true;
    }
    match (temporal::as_instant(a), temporal::as_instant(b)) {
        (Some(left), Some(right)) => left == right,
        _ => false,
    }
}
