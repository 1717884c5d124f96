//! Post domain model.
//!
//! # Invariants
//! - `customer_id` points at an existing customer whenever a post is written.
//! - Persisted `body` never exceeds 100 characters (see `service::post_service`).
//! - `category` is either derived from `post_type` or caller supplied.

use crate::model::customer::CustomerId;
use serde::{Deserialize, Serialize};

/// Store-generated post identity.
pub type PostId = i64;

/// Post authored by a customer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    /// `0` until the store assigns an id on insert.
    #[serde(default)]
    pub post_id: PostId,
    pub customer_id: CustomerId,
    #[serde(default)]
    pub title: String,
    pub body: String,
    /// Serialized as `type` to match external schema naming.
    #[serde(rename = "type")]
    pub post_type: i32,
    #[serde(default)]
    pub category: Option<String>,
}

impl Post {
    /// Creates an unsaved post without a category.
    pub fn new(
        customer_id: CustomerId,
        title: impl Into<String>,
        body: impl Into<String>,
        post_type: i32,
    ) -> Self {
        Self {
            post_id: 0,
            customer_id,
            title: title.into(),
            body: body.into(),
            post_type,
            category: None,
        }
    }

    /// Returns a copy carrying the given caller-supplied category.
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }
}
