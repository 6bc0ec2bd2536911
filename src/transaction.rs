// src/transaction.rs

//! Transaction scope management for batched imports
//!
//! Batch importing relies on an ambient transaction scope: work accumulates
//! in the current scope until the importer either commits it and opens a
//! fresh one (batch boundary), rolls it back (failure), or commits it for
//! good (completion). `TransactionManager` captures those three moves;
//! [`SqliteTransactions`] maps them onto SQLite transactions over a single
//! connection.

use crate::error::Result;
use rusqlite::Connection;
use std::rc::Rc;
use tracing::{debug, warn};

/// The three transaction moves the batch importer needs.
pub trait TransactionManager {
    /// Commit the current scope, if one is open, and open a fresh one.
    fn require_new(&mut self) -> Result<()>;

    /// Roll back the current scope. Without an open scope this is a no-op:
    /// cancelling twice must be safe on every failure path.
    fn cancel(&mut self) -> Result<()>;

    /// Commit the current scope and leave none open.
    fn complete(&mut self) -> Result<()>;
}

/// SQLite-backed transaction scopes over a shared connection.
pub struct SqliteTransactions {
    conn: Rc<Connection>,
    active: bool,
}

impl SqliteTransactions {
    pub fn new(conn: Rc<Connection>) -> Self {
        SqliteTransactions {
            conn,
            active: false,
        }
    }

    /// Whether a scope is currently open.
    pub fn is_active(&self) -> bool {
        self.active
    }
}

impl TransactionManager for SqliteTransactions {
    fn require_new(&mut self) -> Result<()> {
        if self.active {
            self.conn.execute_batch("COMMIT")?;
            self.active = false;
            debug!("Committed transaction scope at batch boundary");
        }
        self.conn.execute_batch("BEGIN")?;
        self.active = true;
        debug!("Opened transaction scope");
        Ok(())
    }

    fn cancel(&mut self) -> Result<()> {
        if self.active {
            self.conn.execute_batch("ROLLBACK")?;
            self.active = false;
            debug!("Rolled back transaction scope");
        }
        Ok(())
    }

    fn complete(&mut self) -> Result<()> {
        if self.active {
            self.conn.execute_batch("COMMIT")?;
            self.active = false;
            debug!("Committed final transaction scope");
        }
        Ok(())
    }
}

impl Drop for SqliteTransactions {
    fn drop(&mut self) {
        if self.active {
            warn!("Transaction scope dropped while active, rolling back");
            let _ = self.conn.execute_batch("ROLLBACK");
        }
    }
}
