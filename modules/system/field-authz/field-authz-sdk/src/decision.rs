//! Attribute allow/deny sets produced by a policy evaluation.

use std::collections::BTreeSet;

use modkit_utils::{omit_paths, pick_paths};
use serde_json::{Map, Value};

use crate::adapter::PolicyHandle;
use crate::models::{Action, Entity};

/// Attribute pattern meaning "every field".
pub const WILDCARD: &str = "*";

/// Which dot-paths of an object a principal may see or write.
///
/// `allowed` may contain [`WILDCARD`]; `denied` always wins over `allowed`.
/// A [`union`](Self::union) shows whatever any of its members shows.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FieldVisibility {
    allowed: BTreeSet<String>,
    denied: BTreeSet<String>,
    any_of: Vec<FieldVisibility>,
}

impl FieldVisibility {
    #[must_use]
    pub fn new(allowed: BTreeSet<String>, denied: BTreeSet<String>) -> Self {
        Self {
            allowed,
            denied,
            any_of: Vec::new(),
        }
    }

    /// Everything visible.
    #[must_use]
    pub fn all() -> Self {
        Self::new(BTreeSet::from([WILDCARD.to_owned()]), BTreeSet::new())
    }

    /// A path is visible iff some member makes it visible.
    ///
    /// [`allowed`](Self::allowed) and [`denied`](Self::denied) only summarize
    /// the union: a denial that another member lifts, even for a single
    /// descendant, is left out of `denied`. Projection and
    /// [`is_visible`](Self::is_visible) consult every member.
    #[must_use]
    pub fn union(members: Vec<FieldVisibility>) -> Self {
        if members.len() <= 1 {
            return members.into_iter().next().unwrap_or_default();
        }
        let allowed = members
            .iter()
            .flat_map(|m| m.allowed.iter().cloned())
            .collect();
        let denied = members
            .iter()
            .flat_map(|m| m.denied.iter())
            .filter(|field| !members.iter().any(|m| m.reveals(field)))
            .cloned()
            .collect();
        Self {
            allowed,
            denied,
            any_of: members,
        }
    }

    /// Parse attribute patterns such as `["*", "!email"]`.
    ///
    /// Entries starting with `!` are denials; the rest are allowances.
    #[must_use]
    pub fn from_attributes<S: AsRef<str>>(attributes: &[S]) -> Self {
        let mut visibility = Self::default();
        for attribute in attributes {
            let attribute = attribute.as_ref();
            match attribute.strip_prefix('!') {
                Some(negated) => visibility.denied.insert(negated.to_owned()),
                None => visibility.allowed.insert(attribute.to_owned()),
            };
        }
        visibility
    }

    #[must_use]
    pub fn allowed(&self) -> &BTreeSet<String> {
        &self.allowed
    }

    #[must_use]
    pub fn denied(&self) -> &BTreeSet<String> {
        &self.denied
    }

    #[must_use]
    pub fn allows_all(&self) -> bool {
        self.allowed.contains(WILDCARD)
    }

    /// Whether `path` survives [`project`](Self::project).
    ///
    /// A path is covered by an entry equal to it or to one of its ancestors.
    #[must_use]
    pub fn is_visible(&self, path: &str) -> bool {
        if !self.any_of.is_empty() {
            return self.any_of.iter().any(|m| m.is_visible(path));
        }
        let allowed = self.allows_all() || covers(&self.allowed, path);
        allowed && !covers(&self.denied, path)
    }

    /// Copy of `source` restricted to the visible paths.
    ///
    /// Projecting an already projected object is a no-op.
    #[must_use]
    pub fn project(&self, source: &Map<String, Value>) -> Map<String, Value> {
        if !self.any_of.is_empty() {
            let mut merged = Map::new();
            for member in &self.any_of {
                merge_into(&mut merged, member.project(source));
            }
            return merged;
        }
        let kept = if self.allows_all() {
            source.clone()
        } else {
            let allowed: Vec<&String> = self.allowed.iter().collect();
            pick_paths(source, &allowed)
        };
        if self.denied.is_empty() {
            return kept;
        }
        let denied: Vec<&String> = self.denied.iter().collect();
        omit_paths(&kept, &denied)
    }

    /// Whether `path` or anything below it survives projection.
    fn reveals(&self, path: &str) -> bool {
        self.is_visible(path)
            || self
                .allowed
                .iter()
                .any(|field| is_below(field, path) && self.is_visible(field))
            || self.any_of.iter().any(|m| m.reveals(path))
    }
}

fn is_below(field: &str, ancestor: &str) -> bool {
    field
        .strip_prefix(ancestor)
        .is_some_and(|rest| rest.starts_with('.'))
}

fn merge_into(target: &mut Map<String, Value>, other: Map<String, Value>) {
    for (key, value) in other {
        match (target.get_mut(&key), value) {
            (Some(Value::Object(existing)), Value::Object(nested)) => merge_into(existing, nested),
            (_, value) => {
                target.insert(key, value);
            }
        }
    }
}

fn covers(set: &BTreeSet<String>, path: &str) -> bool {
    if set.contains(path) {
        return true;
    }
    path.match_indices('.')
        .any(|(idx, _)| set.contains(&path[..idx]))
}

/// Outcome of one evaluation: a grant bit plus the attribute sets.
///
/// Backends that answer with fixed allow/deny sets can return it directly
/// as their [`PolicyHandle`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decision {
    pub granted: bool,
    pub visibility: FieldVisibility,
}

impl Decision {
    #[must_use]
    pub fn granted(visibility: FieldVisibility) -> Self {
        Self {
            granted: true,
            visibility,
        }
    }

    #[must_use]
    pub fn denied() -> Self {
        Self {
            granted: false,
            visibility: FieldVisibility::default(),
        }
    }
}

impl PolicyHandle for Decision {
    fn is_granted(&self, _action: &Action, _item: &Entity) -> bool {
        self.granted
    }

    fn allowed_fields(&self) -> BTreeSet<String> {
        self.visibility.allowed().clone()
    }

    fn denied_fields(&self) -> BTreeSet<String> {
        self.visibility.denied().clone()
    }

    fn visibility(&self) -> FieldVisibility {
        self.visibility.clone()
    }
}
