//! SQLite-based storage implementation for CharmChat.
//!
//! This module provides a SQLite-based storage implementation for the CharmChat messaging core.
//! It implements the [`ChatStorageProvider`] trait, allowing it to be used as a persistent
//! storage backend.
//!
//! All statements are parameterized. Schema changes are applied with embedded refinery
//! migrations when the storage is opened.
//!
//! ```no_run
//! use charmchat_sqlite_storage::ChatSqliteStorage;
//!
//! let storage = ChatSqliteStorage::new("/path/to/charmchat.sqlite3")?;
//! # Ok::<(), charmchat_sqlite_storage::error::Error>(())
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(rustdoc::bare_urls)]

use std::path::Path;
use std::sync::{Arc, Mutex};

use charmchat_storage_traits::{Backend, ChatStorageProvider};
use rusqlite::Connection;

mod conversations;
mod db;
pub mod error;
mod groups;
mod messages;
mod migrations;
mod transfers;
mod validation;

use self::error::Error;

/// A SQLite-based storage implementation for CharmChat.
///
/// A single connection guarded by a mutex; every trait method holds the lock for
/// exactly one statement (or one short read-then-write sequence), so compare-and-set
/// updates on the transfer ledger are atomic with respect to each other.
#[derive(Clone)]
pub struct ChatSqliteStorage {
    connection: Arc<Mutex<Connection>>,
}

impl ChatSqliteStorage {
    /// Opens (or creates) a database file and applies pending migrations.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened or a migration fails.
    pub fn new<P>(file_path: P) -> Result<Self, Error>
    where
        P: AsRef<Path>,
    {
        let file_path = file_path.as_ref();
        if let Some(parent) = file_path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let mut connection = Self::open_connection(file_path)?;
        migrations::run_migrations(&mut connection)?;

        tracing::debug!(path = %file_path.display(), "opened chat database");

        Ok(Self {
            connection: Arc::new(Mutex::new(connection)),
        })
    }

    /// Creates a new in-memory [`ChatSqliteStorage`].
    ///
    /// In-memory databases do not persist data.
    pub fn new_in_memory() -> Result<Self, Error> {
        let mut connection = Connection::open_in_memory()?;
        connection.execute_batch("PRAGMA foreign_keys = ON;")?;
        migrations::run_migrations(&mut connection)?;

        Ok(Self {
            connection: Arc::new(Mutex::new(connection)),
        })
    }

    fn open_connection(file_path: &Path) -> Result<Connection, Error> {
        let conn = Connection::open(file_path)?;
        conn.execute_batch("PRAGMA foreign_keys = ON; PRAGMA journal_mode = WAL;")?;
        Ok(conn)
    }

    /// Provides access to the underlying connection.
    ///
    /// A poisoned lock is recovered: every statement is self-contained so the
    /// connection cannot be left half-updated by a panicking holder.
    pub(crate) fn with_connection<F, T>(&self, f: F) -> T
    where
        F: FnOnce(&Connection) -> T,
    {
        let conn = self
            .connection
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        f(&conn)
    }
}

impl ChatStorageProvider for ChatSqliteStorage {
    fn backend(&self) -> Backend {
        Backend::SQLite
    }
}
