//! Generic SQLite store for any mapped [`Entity`].
//!
//! # Responsibility
//! - Provide lookup, filtered query and lazy listing for one entity table.
//! - Apply inserts, change-detecting updates and deletes inside a caller
//!   supplied [`TransactionScope`].
//!
//! # Invariants
//! - Reads never open a transaction.
//! - Writes only run on the scope's connection, which must be the store's.
//! - Updates never touch the identity column and skip SQL when nothing changed.

use crate::repo::entity::Entity;
use crate::repo::error::{RepoError, RepoResult};
use crate::repo::filter::Filter;
use crate::repo::transaction::TransactionScope;
use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection};
use std::marker::PhantomData;

/// Result of a change-detecting update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateOutcome<T> {
    /// Entity as stored after the update.
    pub entity: T,
    /// Whether at least one column value differed from the original.
    pub changed: bool,
}

/// Per-entity adapter over a SQLite connection.
pub struct EntityStore<'conn, T: Entity> {
    conn: &'conn Connection,
    _entity: PhantomData<fn() -> T>,
}

impl<'conn, T: Entity> EntityStore<'conn, T> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self {
            conn,
            _entity: PhantomData,
        }
    }

    pub fn connection(&self) -> &'conn Connection {
        self.conn
    }

    /// Opens a transaction on the store connection or joins the open one.
    pub fn begin_transaction(&self) -> RepoResult<TransactionScope<'conn>> {
        TransactionScope::begin(self.conn)
    }

    pub fn commit_transaction(&self, scope: TransactionScope<'conn>) -> RepoResult<()> {
        scope.commit()
    }

    pub fn rollback_transaction(&self, scope: TransactionScope<'conn>) -> RepoResult<()> {
        scope.rollback()
    }

    /// Returns the first row matching `filter`, ordered by identity.
    pub fn find_by_filter(&self, filter: &Filter) -> RepoResult<Option<T>> {
        require_conditions(filter)?;
        self.get_all().filter(filter.clone()).first()
    }

    /// Returns all rows matching `filter`, ordered by identity.
    pub fn find_all_by_filter(&self, filter: &Filter) -> RepoResult<Vec<T>> {
        require_conditions(filter)?;
        self.get_all().filter(filter.clone()).fetch()
    }

    /// Primary-key lookup.
    pub fn find_by_id(&self, id: i64) -> RepoResult<Option<T>> {
        if id <= 0 {
            return Err(RepoError::InvalidArgument("id must be a positive identity"));
        }

        let sql = format!("{} WHERE {} = ?1;", select_sql::<T>(), T::ID_COLUMN);
        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query([id])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(T::from_row(row)?));
        }

        Ok(None)
    }

    /// Unfiltered query; nothing runs until the caller evaluates it.
    pub fn get_all(&self) -> EntityQuery<'conn, T> {
        EntityQuery {
            conn: self.conn,
            filter: Filter::default(),
            limit: None,
            offset: 0,
            _entity: PhantomData,
        }
    }

    /// Inserts one entity and returns it with its store identity.
    ///
    /// A non-zero identity is inserted as given.
    pub fn create(&self, scope: &TransactionScope<'_>, entity: T) -> RepoResult<T> {
        let conn = self.write_connection(scope)?;
        insert_one(conn, entity)
    }

    /// Inserts every entity in order; stops at the first failure.
    pub fn add_many(&self, scope: &TransactionScope<'_>, entities: Vec<T>) -> RepoResult<Vec<T>> {
        let conn = self.write_connection(scope)?;
        entities
            .into_iter()
            .map(|entity| insert_one(conn, entity))
            .collect()
    }

    /// Copies `edited` onto `original` and writes the columns that differ.
    ///
    /// The identity of `original` is kept regardless of `edited`'s identity.
    pub fn update(
        &self,
        scope: &TransactionScope<'_>,
        edited: &T,
        original: T,
    ) -> RepoResult<UpdateOutcome<T>> {
        let conn = self.write_connection(scope)?;
        let id = original.id();
        if id <= 0 {
            return Err(RepoError::InvalidArgument(
                "original entity has no store identity",
            ));
        }

        let changed_columns: Vec<(&str, Value)> = T::COLUMNS
            .iter()
            .zip(original.column_values().into_iter().zip(edited.column_values()))
            .filter(|(_, (before, after))| before != after)
            .map(|(column, (_, after))| (*column, after))
            .collect();

        if changed_columns.is_empty() {
            return Ok(UpdateOutcome {
                entity: original,
                changed: false,
            });
        }

        let assignments = changed_columns
            .iter()
            .enumerate()
            .map(|(index, (column, _))| format!("{column} = ?{}", index + 1))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "UPDATE {} SET {assignments} WHERE {} = ?{};",
            T::TABLE,
            T::ID_COLUMN,
            changed_columns.len() + 1
        );
        let mut bind_values: Vec<Value> = changed_columns
            .into_iter()
            .map(|(_, value)| value)
            .collect();
        bind_values.push(Value::Integer(id));

        let affected = conn.execute(&sql, params_from_iter(bind_values))?;
        if affected == 0 {
            return Err(RepoError::NotFound { entity: T::NAME, id });
        }

        let mut entity = edited.clone();
        entity.assign_id(id);
        Ok(UpdateOutcome {
            entity,
            changed: true,
        })
    }

    /// Deletes one row; `NotFound` when it is already gone.
    pub fn delete(&self, scope: &TransactionScope<'_>, entity: T) -> RepoResult<T> {
        let conn = self.write_connection(scope)?;
        delete_one(conn, entity)
    }

    /// Deletes every row in order; stops at the first failure.
    pub fn delete_many(
        &self,
        scope: &TransactionScope<'_>,
        entities: Vec<T>,
    ) -> RepoResult<Vec<T>> {
        let conn = self.write_connection(scope)?;
        entities
            .into_iter()
            .map(|entity| delete_one(conn, entity))
            .collect()
    }

    /// Writes dirty pages to the database file without committing.
    pub fn save_changes(&self) -> RepoResult<()> {
        self.conn.cache_flush()?;
        Ok(())
    }

    fn write_connection<'s>(&self, scope: &'s TransactionScope<'_>) -> RepoResult<&'s Connection> {
        let conn = scope.connection();
        if !std::ptr::eq(conn, self.conn) {
            return Err(RepoError::InvalidArgument(
                "transaction scope belongs to another connection",
            ));
        }
        Ok(conn)
    }
}

/// Lazily evaluated, composable query over one entity table.
///
/// Rows are ordered by identity ascending.
pub struct EntityQuery<'conn, T: Entity> {
    conn: &'conn Connection,
    filter: Filter,
    limit: Option<u32>,
    offset: u32,
    _entity: PhantomData<fn() -> T>,
}

impl<'conn, T: Entity> EntityQuery<'conn, T> {
    /// Narrows the query; conditions are AND-combined with existing ones.
    pub fn filter(mut self, filter: Filter) -> Self {
        self.filter.conditions.extend(filter.conditions);
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: u32) -> Self {
        self.offset = offset;
        self
    }

    /// Runs the query and materializes every row.
    pub fn fetch(&self) -> RepoResult<Vec<T>> {
        let mut sql = select_sql::<T>();
        let mut bind_values = self.where_clause(&mut sql)?;

        sql.push_str(&format!(" ORDER BY {} ASC", T::ID_COLUMN));

        if let Some(limit) = self.limit {
            sql.push_str(" LIMIT ?");
            bind_values.push(Value::Integer(i64::from(limit)));
            if self.offset > 0 {
                sql.push_str(" OFFSET ?");
                bind_values.push(Value::Integer(i64::from(self.offset)));
            }
        } else if self.offset > 0 {
            sql.push_str(" LIMIT -1 OFFSET ?");
            bind_values.push(Value::Integer(i64::from(self.offset)));
        }

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut entities = Vec::new();
        while let Some(row) = rows.next()? {
            entities.push(T::from_row(row)?);
        }

        Ok(entities)
    }

    /// Runs the query for at most one row.
    pub fn first(&self) -> RepoResult<Option<T>> {
        let single = EntityQuery::<T> {
            conn: self.conn,
            filter: self.filter.clone(),
            limit: Some(1),
            offset: self.offset,
            _entity: PhantomData,
        };
        Ok(single.fetch()?.into_iter().next())
    }

    /// Counts matching rows; `limit`/`offset` do not apply.
    pub fn count(&self) -> RepoResult<u64> {
        let mut sql = format!("SELECT COUNT(*) FROM {}", T::TABLE);
        let bind_values = self.where_clause(&mut sql)?;
        let count: i64 =
            self.conn
                .query_row(&sql, params_from_iter(bind_values), |row| row.get(0))?;
        Ok(u64::try_from(count).unwrap_or_default())
    }

    pub fn exists(&self) -> RepoResult<bool> {
        Ok(self.first()?.is_some())
    }

    fn where_clause(&self, sql: &mut String) -> RepoResult<Vec<Value>> {
        match self.filter.render_where::<T>()? {
            Some((clause, values)) => {
                sql.push_str(" WHERE ");
                sql.push_str(&clause);
                Ok(values)
            }
            None => Ok(Vec::new()),
        }
    }
}

fn select_sql<T: Entity>() -> String {
    format!(
        "SELECT {}, {} FROM {}",
        T::ID_COLUMN,
        T::COLUMNS.join(", "),
        T::TABLE
    )
}

fn require_conditions(filter: &Filter) -> RepoResult<()> {
    if filter.is_empty() {
        return Err(RepoError::InvalidArgument(
            "filter must contain at least one condition",
        ));
    }
    Ok(())
}

fn insert_one<T: Entity>(conn: &Connection, mut entity: T) -> RepoResult<T> {
    let mut columns: Vec<&str> = T::COLUMNS.to_vec();
    let mut bind_values = entity.column_values();
    let explicit_id = entity.id();
    if explicit_id != 0 {
        columns.insert(0, T::ID_COLUMN);
        bind_values.insert(0, Value::Integer(explicit_id));
    }

    let placeholders = (1..=columns.len())
        .map(|index| format!("?{index}"))
        .collect::<Vec<_>>()
        .join(", ");
    let sql = format!(
        "INSERT INTO {} ({}) VALUES ({placeholders});",
        T::TABLE,
        columns.join(", ")
    );
    conn.execute(&sql, params_from_iter(bind_values))?;

    if explicit_id == 0 {
        entity.assign_id(conn.last_insert_rowid());
    }
    Ok(entity)
}

fn delete_one<T: Entity>(conn: &Connection, entity: T) -> RepoResult<T> {
    let id = entity.id();
    if id <= 0 {
        return Err(RepoError::InvalidArgument("entity has no store identity"));
    }

    let affected = conn.execute(
        &format!("DELETE FROM {} WHERE {} = ?1;", T::TABLE, T::ID_COLUMN),
        [id],
    )?;
    if affected == 0 {
        return Err(RepoError::NotFound { entity: T::NAME, id });
    }

    Ok(entity)
}
