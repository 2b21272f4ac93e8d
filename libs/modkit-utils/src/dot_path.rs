//! Dot-notation paths over JSON objects (`"metadata.hiddenField"`).

use serde_json::{Map, Value};

/// Look up `path` in `value`, descending through nested objects.
///
/// An empty path returns `value` itself.
#[must_use]
pub fn get_path<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    if path.is_empty() {
        return Some(value);
    }
    path.split('.')
        .try_fold(value, |current, segment| current.as_object()?.get(segment))
}

/// Copy only the given paths out of `source`.
///
/// Intermediate objects are recreated as needed; paths that do not resolve
/// are skipped.
#[must_use]
pub fn pick_paths<S: AsRef<str>>(source: &Map<String, Value>, paths: &[S]) -> Map<String, Value> {
    let mut out = Map::new();
    for path in paths {
        let segments: Vec<&str> = path.as_ref().split('.').collect();
        if let Some(value) = lookup(source, &segments) {
            insert_at(&mut out, &segments, value.clone());
        }
    }
    out
}

/// Copy `source` without the given paths.
#[must_use]
pub fn omit_paths<S: AsRef<str>>(source: &Map<String, Value>, paths: &[S]) -> Map<String, Value> {
    let mut out = source.clone();
    for path in paths {
        let segments: Vec<&str> = path.as_ref().split('.').collect();
        remove_at(&mut out, &segments);
    }
    out
}

fn lookup<'a>(map: &'a Map<String, Value>, segments: &[&str]) -> Option<&'a Value> {
    let (first, rest) = segments.split_first()?;
    let value = map.get(*first)?;
    if rest.is_empty() {
        Some(value)
    } else {
        lookup(value.as_object()?, rest)
    }
}

fn insert_at(map: &mut Map<String, Value>, segments: &[&str], value: Value) {
    let Some((first, rest)) = segments.split_first() else {
        return;
    };
    if rest.is_empty() {
        map.insert((*first).to_owned(), value);
        return;
    }
    let slot = map
        .entry((*first).to_owned())
        .or_insert_with(|| Value::Object(Map::new()));
    // A previously picked ancestor already carries the whole subtree.
    if let Value::Object(nested) = slot {
        insert_at(nested, rest, value);
    }
}

fn remove_at(map: &mut Map<String, Value>, segments: &[&str]) {
    match segments {
        [] => {}
        [last] => {
            map.remove(*last);
        }
        [first, rest @ ..] => {
            if let Some(Value::Object(nested)) = map.get_mut(*first) {
                remove_at(nested, rest);
            }
        }
    }
}
