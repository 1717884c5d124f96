//! Use-case services.
//!
//! # Responsibility
//! - Own transaction boundaries for mutations (`repository_service`).
//! - Enforce customer/post business rules above the repository layer.
//!
//! # Invariants
//! - Services never bypass `RepositoryService` for writes.

pub mod customer_service;
pub mod post_service;
pub mod repository_service;
