//! Repository layer: generic entity persistence over SQLite.
//!
//! # Responsibility
//! - Map domain records onto tables (`entity`).
//! - Express predicates as data (`filter`).
//! - Run reads and transactional writes for any mapped entity (`entity_store`).
//!
//! # Invariants
//! - Writes always run inside a `TransactionScope`.
//! - Repository APIs return semantic errors (`NotFound`, `InvalidArgument`)
//!   in addition to DB transport errors.

pub mod entity;
pub mod entity_store;
pub mod error;
pub mod filter;
pub mod transaction;
