//! Entity-to-table mapping used by the generic store.
//!
//! # Responsibility
//! - Describe how a domain record maps onto one SQLite table.
//! - Provide column-wise values so updates can detect real changes.
//!
//! # Invariants
//! - `COLUMNS` and `column_values()` share the same order.
//! - The identity column is never part of `COLUMNS`.

use crate::model::customer::Customer;
use crate::model::post::Post;
use crate::repo::error::{RepoError, RepoResult};
use rusqlite::types::Value;
use rusqlite::Row;

/// Capability set required by `EntityStore<T>`.
pub trait Entity: Clone + Default {
    /// Short name used in errors and log lines.
    const NAME: &'static str;
    const TABLE: &'static str;
    const ID_COLUMN: &'static str;
    /// Non-identity columns in bind order.
    const COLUMNS: &'static [&'static str];

    /// Store identity; `0` while unsaved.
    fn id(&self) -> i64;

    fn assign_id(&mut self, id: i64);

    /// Non-identity values in `COLUMNS` order.
    fn column_values(&self) -> Vec<Value>;

    /// Builds an entity from a row selecting the identity and all columns.
    fn from_row(row: &Row<'_>) -> RepoResult<Self>;

    /// Returns whether `field` is a mapped column (identity included).
    fn has_field(field: &str) -> bool {
        field == Self::ID_COLUMN || Self::COLUMNS.iter().any(|column| *column == field)
    }
}

impl Entity for Customer {
    const NAME: &'static str = "customer";
    const TABLE: &'static str = "customers";
    const ID_COLUMN: &'static str = "customer_id";
    const COLUMNS: &'static [&'static str] = &["name", "email", "phone"];

    fn id(&self) -> i64 {
        self.customer_id
    }

    fn assign_id(&mut self, id: i64) {
        self.customer_id = id;
    }

    fn column_values(&self) -> Vec<Value> {
        vec![
            Value::Text(self.name.clone()),
            optional_text(self.email.as_deref()),
            optional_text(self.phone.as_deref()),
        ]
    }

    fn from_row(row: &Row<'_>) -> RepoResult<Self> {
        Ok(Self {
            customer_id: row.get("customer_id")?,
            name: row.get("name")?,
            email: row.get("email")?,
            phone: row.get("phone")?,
        })
    }
}

impl Entity for Post {
    const NAME: &'static str = "post";
    const TABLE: &'static str = "posts";
    const ID_COLUMN: &'static str = "post_id";
    const COLUMNS: &'static [&'static str] = &["customer_id", "title", "body", "type", "category"];

    fn id(&self) -> i64 {
        self.post_id
    }

    fn assign_id(&mut self, id: i64) {
        self.post_id = id;
    }

    fn column_values(&self) -> Vec<Value> {
        vec![
            Value::Integer(self.customer_id),
            Value::Text(self.title.clone()),
            Value::Text(self.body.clone()),
            Value::Integer(i64::from(self.post_type)),
            optional_text(self.category.as_deref()),
        ]
    }

    fn from_row(row: &Row<'_>) -> RepoResult<Self> {
        let type_value: i64 = row.get("type")?;
        let post_type = i32::try_from(type_value).map_err(|_| {
            RepoError::InvalidData(format!("invalid type value `{type_value}` in posts.type"))
        })?;

        Ok(Self {
            post_id: row.get("post_id")?,
            customer_id: row.get("customer_id")?,
            title: row.get("title")?,
            body: row.get("body")?,
            post_type,
            category: row.get("category")?,
        })
    }
}

fn optional_text(value: Option<&str>) -> Value {
    match value {
        Some(text) => Value::Text(text.to_string()),
        None => Value::Null,
    }
}
