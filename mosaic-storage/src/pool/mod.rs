//! Connection pool managing the single writer and the read pool.

pub mod pragmas;
pub mod read_pool;
pub mod write_connection;

use std::path::{Path, PathBuf};

use mosaic_core::errors::MosaicResult;

pub use read_pool::ReadPool;
pub use write_connection::WriteConnection;

/// Default number of read connections.
const DEFAULT_READ_POOL_SIZE: usize = 4;

/// The write connection plus the read connection pool.
pub struct ConnectionPool {
    pub writer: WriteConnection,
    pub readers: Option<ReadPool>,
    pub db_path: Option<PathBuf>,
}

impl ConnectionPool {
    /// Open a connection pool for the given database file.
    pub fn open(path: &Path) -> MosaicResult<Self> {
        let writer = WriteConnection::open(path)?;
        let readers = ReadPool::open(path, DEFAULT_READ_POOL_SIZE)?;
        Ok(Self {
            writer,
            readers: Some(readers),
            db_path: Some(path.to_path_buf()),
        })
    }

    /// Open an in-memory pool (for testing). No read pool: in-memory
    /// read connections would be isolated databases, so reads route
    /// through the writer.
    pub fn open_in_memory() -> MosaicResult<Self> {
        let writer = WriteConnection::open_in_memory()?;
        Ok(Self {
            writer,
            readers: None,
            db_path: None,
        })
    }
}
