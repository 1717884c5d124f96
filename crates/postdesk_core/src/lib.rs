//! Data-access core for customers and their posts.
//!
//! Generic transactional CRUD over SQLite (`repo`, `service::repository_service`)
//! plus the customer and post business rules built on top of it.

pub mod config;
pub mod db;
pub mod error;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use config::CoreConfig;
pub use error::ErrorKind;
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::customer::{Customer, CustomerId};
pub use model::post::{Post, PostId};
pub use repo::entity::Entity;
pub use repo::entity_store::{EntityQuery, EntityStore, UpdateOutcome};
pub use repo::error::{RepoError, RepoResult};
pub use repo::filter::{Condition, Filter, FilterOp, FilterValue};
pub use repo::transaction::TransactionScope;
pub use service::customer_service::{CustomerService, CustomerServiceError};
pub use service::post_service::{
    category_for_type, normalize_post, truncate_body, PostService, PostServiceError,
};
pub use service::repository_service::RepositoryService;

/// Liveness answer printed by the CLI before it opens the store.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
