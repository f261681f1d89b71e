//! `DuckDB` connection pool.
//!
//! The database file is opened once; every pooled connection is a clone of
//! that root handle so all of them share one database instance. Released
//! connections are parked per access mode, up to `max_pool_size` each.

use std::ops::{Deref, DerefMut};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use ::duckdb::Connection;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessMode {
    ReadOnly,
    ReadWrite,
}

#[derive(Default)]
struct IdleConnections {
    read_only: Vec<Connection>,
    read_write: Vec<Connection>,
}

impl IdleConnections {
    fn slot(&mut self, mode: AccessMode) -> &mut Vec<Connection> {
        match mode {
            AccessMode::ReadOnly => &mut self.read_only,
            AccessMode::ReadWrite => &mut self.read_write,
        }
    }
}

struct PoolInner {
    db_path: PathBuf,
    max_pool_size: usize,
    root: Mutex<Option<Connection>>,
    idle: Mutex<IdleConnections>,
}

impl PoolInner {
    fn idle(&self) -> MutexGuard<'_, IdleConnections> {
        self.idle.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn open(&self) -> Result<Connection, ::duckdb::Error> {
        let mut root = self.root.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let connection = match root.as_ref() {
            Some(root) => root.try_clone()?,
            None => {
                let opened = Connection::open(self.db_path.as_path())?;
                let clone = opened.try_clone()?;
                *root = Some(opened);
                clone
            }
        };
        configure_connection(&connection)?;
        Ok(connection)
    }
}

/// Shared handle to the pool of connections on one database file.
#[derive(Clone)]
pub struct DuckDbConnectionManager {
    inner: Arc<PoolInner>,
}

impl DuckDbConnectionManager {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>, max_pool_size: usize) -> Self {
        Self {
            inner: Arc::new(PoolInner {
                db_path: path.into(),
                max_pool_size: max_pool_size.max(1),
                root: Mutex::new(None),
                idle: Mutex::new(IdleConnections::default()),
            }),
        }
    }

    /// Reuse an idle connection for `mode` or open a new one.
    ///
    /// # Errors
    /// Returns an error if the database file cannot be opened or configured.
    pub fn acquire(&self, mode: AccessMode) -> Result<PooledConnection, ::duckdb::Error> {
        let parked = self.inner.idle().slot(mode).pop();
        let connection = match parked {
            Some(connection) => connection,
            None => self.inner.open()?,
        };

        Ok(PooledConnection {
            mode,
            pool: Arc::clone(&self.inner),
            connection: Some(connection),
        })
    }

    #[must_use]
    pub fn db_path(&self) -> &Path {
        self.inner.db_path.as_path()
    }

    /// Connections currently parked for `mode`.
    pub fn idle_count(&self, mode: AccessMode) -> usize {
        self.inner.idle().slot(mode).len()
    }
}

/// Connection guard; parks the connection back in the pool on drop.
pub struct PooledConnection {
    mode: AccessMode,
    pool: Arc<PoolInner>,
    connection: Option<Connection>,
}

impl PooledConnection {
    pub const fn mode(&self) -> AccessMode {
        self.mode
    }
}

impl Deref for PooledConnection {
    type Target = Connection;

    fn deref(&self) -> &Self::Target {
        self.connection
            .as_ref()
            .expect("pooled connection is only taken on drop")
    }
}

impl DerefMut for PooledConnection {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.connection
            .as_mut()
            .expect("pooled connection is only taken on drop")
    }
}

impl Drop for PooledConnection {
    fn drop(&mut self) {
        let Some(connection) = self.connection.take() else {
            return;
        };

        let mut idle = self.pool.idle();
        let slot = idle.slot(self.mode);
        if slot.len() < self.pool.max_pool_size {
            slot.push(connection);
        }
    }
}

// access_mode is fixed per database instance, so read-only connections are
// only a separate pool partition.
fn configure_connection(connection: &Connection) -> Result<(), ::duckdb::Error> {
    connection.execute_batch("PRAGMA disable_progress_bar;")
}
