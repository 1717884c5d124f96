//! Customer domain model.
//!
//! # Invariants
//! - `customer_id` is assigned by the store and never changes afterwards.
//! - `name` is unique across customers; the customer service enforces it.

use serde::{Deserialize, Serialize};

/// Store-generated customer identity.
pub type CustomerId = i64;

/// Customer record owning zero or more posts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    /// `0` until the store assigns an id on insert.
    #[serde(default)]
    pub customer_id: CustomerId,
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
}

impl Customer {
    /// Creates an unsaved customer with only a name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}
