/// Connection Management Module
///
/// This module owns the SQLite connection lifecycle: eager open, pragma
/// setup, scoped transactions and release. A released manager fails every
/// later operation with `OrmError::Connection` instead of silently doing
/// nothing.

use crate::core::{OrmError, Result};
use rusqlite::{Connection, Transaction};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, error};

/// Represents database transaction states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransactionState {
    /// No active transaction (autocommit mode)
    #[default]
    Autocommit,
    /// Transaction in progress
    Transaction,
}

/// Pragmas applied to every connection when it is opened.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConnectionOptions {
    /// `PRAGMA journal_mode`, e.g. "WAL"
    pub journal_mode: Option<String>,
    /// `PRAGMA foreign_keys`
    pub foreign_keys: Option<bool>,
    /// Busy handler timeout
    pub busy_timeout: Option<Duration>,
}

/// Owns one SQLite connection from open until release.
///
/// The connection is opened in the constructor and released by
/// [`close`](Self::close) or, failing that, when the manager is dropped.
#[derive(Debug)]
pub struct ConnectionManager {
    /// Active database connection (None once released)
    connection: Option<Connection>,
    /// Path to the database file (None for in-memory databases)
    path: Option<PathBuf>,
}

impl ConnectionManager {
    /// Opens the SQLite database at `path` and applies `options`.
    ///
    /// # Errors
    ///
    /// Returns `OrmError::Database` if the file cannot be opened or a pragma
    /// is rejected.
    pub fn open(path: impl AsRef<Path>, options: &ConnectionOptions) -> Result<Self> {
        let path = path.as_ref();
        let conn = Connection::open(path)?;
        Self::configure(&conn, options)?;
        debug!("Opened connection to {}", path.display());

        Ok(ConnectionManager {
            connection: Some(conn),
            path: Some(path.to_path_buf()),
        })
    }

    /// Opens a private in-memory database.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Ok(ConnectionManager {
            connection: Some(conn),
            path: None,
        })
    }

    fn configure(conn: &Connection, options: &ConnectionOptions) -> Result<()> {
        if let Some(timeout) = options.busy_timeout {
            conn.busy_timeout(timeout)?;
        }
        if let Some(enabled) = options.foreign_keys {
            conn.pragma_update(None, "foreign_keys", enabled)?;
        }
        if let Some(mode) = &options.journal_mode {
            let applied: String =
                conn.pragma_update_and_check(None, "journal_mode", mode, |row| row.get(0))?;
            debug!("journal_mode set to {}", applied);
        }
        Ok(())
    }

    /// Returns the open connection.
    ///
    /// # Errors
    ///
    /// Returns `OrmError::Connection` once the manager has been closed.
    pub fn connection(&self) -> Result<&Connection> {
        self.connection
            .as_ref()
            .ok_or_else(|| OrmError::Connection("connection has been released".to_string()))
    }

    /// Begins a transaction scoped to the returned guard.
    ///
    /// The transaction rolls back when the guard is dropped without
    /// `commit()`, so early returns and errors never leave it open.
    pub fn transaction(&self) -> Result<Transaction<'_>> {
        let conn = self.connection()?;
        Ok(conn.unchecked_transaction()?)
    }

    /// Checks if the connection is still open
    pub fn is_connected(&self) -> bool {
        self.connection.is_some()
    }

    /// Path of the database file, `None` for in-memory databases
    pub fn current_path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Gets the current transaction state
    pub fn transaction_state(&self) -> TransactionState {
        match &self.connection {
            Some(conn) if !conn.is_autocommit() => TransactionState::Transaction,
            _ => TransactionState::Autocommit,
        }
    }

    /// Checks whether a table exists in the main schema.
    pub fn table_exists(&self, table: &str) -> Result<bool> {
        let count: i64 = self.connection()?.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
            [table],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// Releases the connection.
    ///
    /// Closing an already released manager is a no-op.
    ///
    /// # Errors
    ///
    /// Returns `OrmError::Database` if SQLite refuses to close; the handle
    /// is released regardless.
    pub fn close(&mut self) -> Result<()> {
        match self.connection.take() {
            Some(conn) => conn.close().map_err(|(_, e)| OrmError::Database(e)),
            None => Ok(()),
        }
    }
}

impl Drop for ConnectionManager {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            error!("Failed to close connection: {}", e);
        }
    }
}
