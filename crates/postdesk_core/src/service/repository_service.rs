//! Transaction-owning CRUD service over [`EntityStore`].
//!
//! # Responsibility
//! - Validate required arguments before touching the store.
//! - Run each mutation as begin -> mutate -> flush -> commit.
//! - Pass reads straight through without a transaction.
//!
//! # Invariants
//! - A failed mutation rolls back and returns the original error unchanged.
//! - Inside an already open transaction the service runs under a savepoint:
//!   a failure undoes only its own statements and the outer owner still
//!   decides the final commit.

use crate::repo::entity::Entity;
use crate::repo::entity_store::{EntityQuery, EntityStore, UpdateOutcome};
use crate::repo::error::{RepoError, RepoResult};
use crate::repo::filter::Filter;
use crate::repo::transaction::TransactionScope;
use log::{debug, error, warn};
use rusqlite::Connection;
use std::time::Instant;

/// Generic repository service for one entity type.
pub struct RepositoryService<'conn, T: Entity> {
    store: EntityStore<'conn, T>,
}

impl<'conn, T: Entity> RepositoryService<'conn, T> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self::with_store(EntityStore::new(conn))
    }

    pub fn with_store(store: EntityStore<'conn, T>) -> Self {
        Self { store }
    }

    /// First entity matching `filter`, if any.
    pub fn get_by_where(&self, filter: &Filter) -> RepoResult<Option<T>> {
        self.store.find_by_filter(filter)
    }

    /// All entities matching `filter`.
    pub fn get_list_by_where(&self, filter: &Filter) -> RepoResult<Vec<T>> {
        self.store.find_all_by_filter(filter)
    }

    pub fn find_by_id(&self, id: i64) -> RepoResult<Option<T>> {
        self.store.find_by_id(id)
    }

    pub fn get_all(&self) -> EntityQuery<'conn, T> {
        self.store.get_all()
    }

    /// Inserts `entity` in its own transaction and returns it with identity.
    pub fn create(&self, entity: T) -> RepoResult<T> {
        self.in_transaction("create", 1, |scope| {
            let created = self.store.create(scope, entity)?;
            self.store.save_changes()?;
            Ok(created)
        })
    }

    /// Overwrites the entity stored under `id` with `edited`.
    ///
    /// # Errors
    /// - `InvalidArgument` for a non-positive `id`.
    /// - `NotFound` when no entity is stored under `id`.
    pub fn update(&self, id: i64, edited: &T) -> RepoResult<UpdateOutcome<T>> {
        if id <= 0 {
            return Err(RepoError::InvalidArgument("id must be a positive identity"));
        }
        let original = self
            .store
            .find_by_id(id)?
            .ok_or(RepoError::NotFound { entity: T::NAME, id })?;

        self.in_transaction("update", 1, |scope| {
            let outcome = self.store.update(scope, edited, original)?;
            self.store.save_changes()?;
            Ok(outcome)
        })
    }

    pub fn delete(&self, entity: T) -> RepoResult<T> {
        require_identity(&entity)?;
        self.in_transaction("delete", 1, |scope| {
            let deleted = self.store.delete(scope, entity)?;
            self.store.save_changes()?;
            Ok(deleted)
        })
    }

    /// Deletes the whole batch or nothing.
    pub fn delete_many(&self, entities: Vec<T>) -> RepoResult<Vec<T>> {
        if entities.is_empty() {
            return Err(RepoError::InvalidArgument("entities must not be empty"));
        }
        for entity in &entities {
            require_identity(entity)?;
        }

        self.in_transaction("delete_many", entities.len(), |scope| {
            let deleted = self.store.delete_many(scope, entities)?;
            self.store.save_changes()?;
            Ok(deleted)
        })
    }

    /// Inserts the whole batch or nothing.
    pub fn add_many(&self, entities: Vec<T>) -> RepoResult<Vec<T>> {
        if entities.is_empty() {
            return Err(RepoError::InvalidArgument("entities must not be empty"));
        }

        self.in_transaction("add_many", entities.len(), |scope| {
            let created = self.store.add_many(scope, entities)?;
            self.store.save_changes()?;
            Ok(created)
        })
    }

    pub fn save_changes(&self) -> RepoResult<()> {
        self.store.save_changes()
    }

    fn in_transaction<R>(
        &self,
        operation: &'static str,
        rows: usize,
        work: impl FnOnce(&TransactionScope<'conn>) -> RepoResult<R>,
    ) -> RepoResult<R> {
        let started_at = Instant::now();
        let scope = self.store.begin_transaction()?;
        let joined = !scope.is_owner();

        match work(&scope) {
            Ok(value) => {
                if let Err(err) = self.store.commit_transaction(scope) {
                    error!(
                        "event=repo_{} module=repo entity={} status=error stage=commit error_kind={} error={}",
                        operation,
                        T::NAME,
                        err.kind(),
                        err
                    );
                    return Err(err);
                }
                debug!(
                    "event=repo_{} module=repo entity={} status=ok rows={} joined={} duration_ms={}",
                    operation,
                    T::NAME,
                    rows,
                    joined,
                    started_at.elapsed().as_millis()
                );
                Ok(value)
            }
            Err(err) => {
                if let Err(rollback_err) = self.store.rollback_transaction(scope) {
                    error!(
                        "event=repo_{} module=repo entity={} status=error stage=rollback error={}",
                        operation,
                        T::NAME,
                        rollback_err
                    );
                }
                warn!(
                    "event=repo_{} module=repo entity={} status=rolled_back joined={} error_kind={} error={}",
                    operation,
                    T::NAME,
                    joined,
                    err.kind(),
                    err
                );
                Err(err)
            }
        }
    }
}

fn require_identity<T: Entity>(entity: &T) -> RepoResult<()> {
    if entity.id() <= 0 {
        return Err(RepoError::InvalidArgument("entity has no store identity"));
    }
    Ok(())
}
