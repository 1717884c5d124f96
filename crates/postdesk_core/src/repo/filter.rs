//! Serializable filter criteria for entity queries.
//!
//! # Responsibility
//! - Represent a predicate as plain data (`field op value`, AND-combined).
//! - Render criteria into a parameterized SQL `WHERE` fragment.
//!
//! # Invariants
//! - Field names are checked against the entity mapping before rendering.
//! - Values are always bound, never spliced into SQL text.

use crate::repo::entity::Entity;
use crate::repo::error::{RepoError, RepoResult};
use rusqlite::types::Value;
use serde::{Deserialize, Serialize};

/// Comparison operator for one filter condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Like,
    IsNull,
    IsNotNull,
}

/// Scalar compared against a column.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterValue {
    #[default]
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
}

impl From<i64> for FilterValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<i32> for FilterValue {
    fn from(value: i32) -> Self {
        Self::Integer(i64::from(value))
    }
}

impl From<f64> for FilterValue {
    fn from(value: f64) -> Self {
        Self::Real(value)
    }
}

impl From<&str> for FilterValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for FilterValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<FilterValue> for Value {
    fn from(value: FilterValue) -> Self {
        match value {
            FilterValue::Null => Value::Null,
            FilterValue::Integer(value) => Value::Integer(value),
            FilterValue::Real(value) => Value::Real(value),
            FilterValue::Text(value) => Value::Text(value),
        }
    }
}

/// One `field op value` predicate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub field: String,
    pub op: FilterOp,
    /// Ignored by `IsNull` / `IsNotNull`.
    #[serde(default)]
    pub value: FilterValue,
}

/// AND-combined list of conditions.
///
/// An empty filter matches every row; single-row and list lookups reject it
/// so that "no predicate" is never silently treated as "everything".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Filter {
    pub conditions: Vec<Condition>,
}

impl Filter {
    /// Starts a filter with one equality condition.
    pub fn eq(field: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        Self::default().and(field, FilterOp::Eq, value)
    }

    /// Adds an equality condition.
    pub fn and_eq(self, field: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        self.and(field, FilterOp::Eq, value)
    }

    /// Adds an arbitrary condition.
    pub fn and(
        mut self,
        field: impl Into<String>,
        op: FilterOp,
        value: impl Into<FilterValue>,
    ) -> Self {
        self.conditions.push(Condition {
            field: field.into(),
            op,
            value: value.into(),
        });
        self
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    /// Renders conditions as a `WHERE` body plus bind values.
    ///
    /// Returns `None` for an empty filter.
    pub(crate) fn render_where<T: Entity>(&self) -> RepoResult<Option<(String, Vec<Value>)>> {
        if self.conditions.is_empty() {
            return Ok(None);
        }

        let mut clauses = Vec::with_capacity(self.conditions.len());
        let mut bind_values = Vec::new();
        for condition in &self.conditions {
            if !T::has_field(&condition.field) {
                return Err(RepoError::UnknownField {
                    entity: T::NAME,
                    field: condition.field.clone(),
                });
            }

            let field = condition.field.as_str();
            let null_value = condition.value == FilterValue::Null;
            let clause = match condition.op {
                FilterOp::IsNull => format!("{field} IS NULL"),
                FilterOp::IsNotNull => format!("{field} IS NOT NULL"),
                FilterOp::Eq if null_value => format!("{field} IS NULL"),
                FilterOp::Ne if null_value => format!("{field} IS NOT NULL"),
                op => {
                    bind_values.push(Value::from(condition.value.clone()));
                    format!("{field} {} ?", comparison_sql(op))
                }
            };
            clauses.push(clause);
        }

        Ok(Some((clauses.join(" AND "), bind_values)))
    }
}

fn comparison_sql(op: FilterOp) -> &'static str {
    match op {
        FilterOp::Eq => "=",
        FilterOp::Ne => "<>",
        FilterOp::Lt => "<",
        FilterOp::Le => "<=",
        FilterOp::Gt => ">",
        FilterOp::Ge => ">=",
        FilterOp::Like => "LIKE",
        FilterOp::IsNull => "IS",
        FilterOp::IsNotNull => "IS NOT",
    }
}
