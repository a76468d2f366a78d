//! The single write connection. All catalog mutations are serialized here.

use std::path::Path;
use std::sync::Mutex;

use rusqlite::Connection;

use mosaic_core::errors::{MosaicResult, StorageError};

use super::pragmas::apply_pragmas;
use crate::to_storage_err;

/// Owns the one connection allowed to mutate the database.
pub struct WriteConnection {
    conn: Mutex<Connection>,
}

impl WriteConnection {
    /// Open the write connection for the given database file.
    pub fn open(path: &Path) -> MosaicResult<Self> {
        let conn = Connection::open(path).map_err(|e| StorageError::Unavailable {
            reason: format!("cannot open {}: {e}", path.display()),
        })?;
        apply_pragmas(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Open an in-memory write connection (for testing).
    pub fn open_in_memory() -> MosaicResult<Self> {
        let conn = Connection::open_in_memory().map_err(|e| to_storage_err(e.to_string()))?;
        apply_pragmas(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Execute a closure holding the writer. The lock is never held
    /// across a remote call; only local SQLite work happens inside.
    pub fn with_conn<F, T>(&self, f: F) -> MosaicResult<T>
    where
        F: FnOnce(&Connection) -> MosaicResult<T>,
    {
        let guard = self
            .conn
            .lock()
            .map_err(|e| to_storage_err(format!("write connection lock poisoned: {e}")))?;
        f(&guard)
    }
}
