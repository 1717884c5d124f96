//! Domain records for customers and their posts.
//!
//! # Responsibility
//! - Define the data structures shared by repositories and services.
//! - Stay storage-agnostic; SQL mapping lives in `repo::entity`.
//!
//! # Invariants
//! - Identity `0` means "not assigned yet"; the store assigns positive ids.
//! - A post references its owner through `customer_id` only (no back-list).

pub mod customer;
pub mod post;
