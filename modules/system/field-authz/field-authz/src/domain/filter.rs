//! Attribute filtering of write bodies and read results.

use field_authz_sdk::{Entity, FieldVisibility};
use serde_json::{Map, Value};

/// Field pairing result rows with the resource items they were decided for.
pub const ROW_KEY: &str = "id";

/// Project `fields` through every visibility in turn.
///
/// Sequential projection keeps only what all of them allow.
#[must_use]
pub fn project_all<'a, I>(fields: &Map<String, Value>, visibilities: I) -> Map<String, Value>
where
    I: IntoIterator<Item = &'a FieldVisibility>,
{
    let mut projected = fields.clone();
    for visibility in visibilities {
        projected = visibility.project(&projected);
    }
    projected
}

/// Filter a query result row by row.
///
/// Arrays are filtered element-wise and `project` gets each element's
/// index; a single object is filtered directly as index 0. Anything else
/// (a delete count, a scalar) passes through.
#[must_use]
pub fn project_rows<F>(result: Value, mut project: F) -> Value
where
    F: FnMut(usize, &Map<String, Value>) -> Map<String, Value>,
{
    match result {
        Value::Object(row) => Value::Object(project(0, &row)),
        Value::Array(rows) => Value::Array(
            rows.into_iter()
                .enumerate()
                .map(|(position, row)| match row {
                    Value::Object(row) => Value::Object(project(position, &row)),
                    other => other,
                })
                .collect(),
        ),
        other => other,
    }
}

/// Read decisions taken per resource item before the rows are fetched.
#[derive(Debug, Clone, Default)]
pub struct RowDecisions {
    decisions: Vec<(Option<Value>, FieldVisibility)>,
}

impl RowDecisions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, item: &Entity, visibility: FieldVisibility) {
        self.decisions.push((item.get(ROW_KEY).cloned(), visibility));
    }

    /// Filter `result`, each row through the decision for its own item.
    ///
    /// Rows pair with items by [`ROW_KEY`], then by position when there are
    /// as many rows as decisions. A single decision covers every row. A row
    /// nothing pairs with keeps only what every decision allows.
    #[must_use]
    pub fn project(&self, result: Value) -> Value {
        let rows = match &result {
            Value::Array(rows) => rows.len(),
            _ => 1,
        };
        project_rows(result, |position, row| {
            match self.decision_for(position, rows, row) {
                Some(visibility) => visibility.project(row),
                None => project_all(row, self.decisions.iter().map(|(_, v)| v)),
            }
        })
    }

    fn decision_for(
        &self,
        position: usize,
        rows: usize,
        row: &Map<String, Value>,
    ) -> Option<&FieldVisibility> {
        if let Some(id) = row.get(ROW_KEY)
            && let Some((_, visibility)) = self
                .decisions
                .iter()
                .find(|(key, _)| key.as_ref() == Some(id))
        {
            return Some(visibility);
        }
        match self.decisions.as_slice() {
            [(_, only)] => Some(only),
            many if many.len() == rows => many.get(position).map(|(_, v)| v),
            _ => None,
        }
    }
}
