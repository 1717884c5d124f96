//! Explicit transaction scope passed to store mutations.
//!
//! # Responsibility
//! - Open one SQLite transaction per unit of work.
//! - Let nested callers join an already open transaction through a savepoint.
//!
//! # Invariants
//! - Only the scope that opened the transaction issues the final commit.
//! - A joined scope's `commit` releases its savepoint; `rollback` undoes the
//!   joined work only and keeps the outer transaction open.
//! - A scope dropped without `commit` rolls back its own work.

use crate::repo::error::RepoResult;
use log::{debug, warn};
use rusqlite::{Connection, Transaction, TransactionBehavior};
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_SAVEPOINT: AtomicU64 = AtomicU64::new(1);

enum ScopeState<'conn> {
    Owner(Transaction<'conn>),
    Joined(String),
    Finished,
}

/// Handle for the transaction a mutation runs in.
pub struct TransactionScope<'conn> {
    conn: &'conn Connection,
    state: ScopeState<'conn>,
}

impl<'conn> TransactionScope<'conn> {
    /// Begins an immediate transaction, or joins the one already open on
    /// `conn` under a fresh savepoint.
    pub fn begin(conn: &'conn Connection) -> RepoResult<Self> {
        if !conn.is_autocommit() {
            let name = format!(
                "postdesk_sp_{}",
                NEXT_SAVEPOINT.fetch_add(1, Ordering::Relaxed)
            );
            conn.execute_batch(&format!("SAVEPOINT {name};"))?;
            debug!("event=tx_begin module=repo status=joined savepoint={name}");
            return Ok(Self {
                conn,
                state: ScopeState::Joined(name),
            });
        }

        let tx = Transaction::new_unchecked(conn, TransactionBehavior::Immediate)?;
        debug!("event=tx_begin module=repo status=opened");
        Ok(Self {
            conn,
            state: ScopeState::Owner(tx),
        })
    }

    /// Returns whether this scope opened the transaction it runs in.
    pub fn is_owner(&self) -> bool {
        matches!(self.state, ScopeState::Owner(_))
    }

    /// Connection all statements of this unit of work must use.
    pub fn connection(&self) -> &'conn Connection {
        self.conn
    }

    /// Commits when owning; releases the savepoint into the outer
    /// transaction otherwise.
    pub fn commit(mut self) -> RepoResult<()> {
        match std::mem::replace(&mut self.state, ScopeState::Finished) {
            ScopeState::Owner(tx) => {
                tx.commit()?;
                debug!("event=tx_commit module=repo status=ok");
            }
            ScopeState::Joined(name) => {
                self.conn.execute_batch(&format!("RELEASE SAVEPOINT {name};"))?;
                debug!("event=tx_commit module=repo status=released savepoint={name}");
            }
            ScopeState::Finished => {}
        }
        Ok(())
    }

    /// Rolls back when owning; undoes only the joined work otherwise.
    pub fn rollback(mut self) -> RepoResult<()> {
        match std::mem::replace(&mut self.state, ScopeState::Finished) {
            ScopeState::Owner(tx) => {
                tx.rollback()?;
                debug!("event=tx_rollback module=repo status=ok");
            }
            ScopeState::Joined(name) => {
                rollback_savepoint(self.conn, &name)?;
                debug!("event=tx_rollback module=repo status=ok savepoint={name}");
            }
            ScopeState::Finished => {}
        }
        Ok(())
    }
}

impl Drop for TransactionScope<'_> {
    fn drop(&mut self) {
        // Owner: the wrapped transaction rolls back on drop.
        if let ScopeState::Joined(name) =
            std::mem::replace(&mut self.state, ScopeState::Finished)
        {
            if let Err(err) = rollback_savepoint(self.conn, &name) {
                warn!("event=tx_rollback module=repo status=error savepoint={name} error={err}");
            }
        }
    }
}

fn rollback_savepoint(conn: &Connection, name: &str) -> rusqlite::Result<()> {
    conn.execute_batch(&format!(
        "ROLLBACK TO SAVEPOINT {name}; RELEASE SAVEPOINT {name};"
    ))
}
