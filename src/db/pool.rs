//! Bounded SQLite connection pool.
//!
//! A fixed number of permits guards a stack of idle connections. Callers
//! wait for a permit up to `acquire_timeout`, then fail with
//! `DatabaseError::PoolTimeout` instead of queueing forever. Connections
//! are opened lazily and returned to the idle stack on drop.

use std::ops::Deref;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use rusqlite::Connection;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use super::{open_connection, open_database, DatabaseError};

/// Shared handle to the pool. Cheap to clone.
#[derive(Clone)]
pub struct DbPool {
    inner: Arc<PoolInner>,
}

struct PoolInner {
    path: PathBuf,
    idle: Mutex<Vec<Connection>>,
    permits: Arc<Semaphore>,
    size: usize,
    acquire_timeout: Duration,
}

impl DbPool {
    /// Open the database at `path`, run migrations once, and build a pool
    /// of at most `size` connections.
    ///
    /// Fails immediately if the store cannot be opened: startup treats
    /// that as fatal.
    pub fn open(path: &Path, size: usize, acquire_timeout: Duration) -> Result<Self, DatabaseError> {
        let size = size.max(1);
        let first = open_database(path)?;

        tracing::info!(path = %path.display(), size, "Database pool ready");

        Ok(Self {
            inner: Arc::new(PoolInner {
                path: path.to_path_buf(),
                idle: Mutex::new(vec![first]),
                permits: Arc::new(Semaphore::new(size)),
                size,
                acquire_timeout,
            }),
        })
    }

    /// Wait for a free connection.
    pub async fn acquire(&self) -> Result<PooledConnection, DatabaseError> {
        let permit = tokio::time::timeout(
            self.inner.acquire_timeout,
            self.inner.permits.clone().acquire_owned(),
        )
        .await
        .map_err(|_| {
            tracing::warn!(timeout = ?self.inner.acquire_timeout, "Database pool exhausted");
            DatabaseError::PoolTimeout(self.inner.acquire_timeout)
        })?
        .map_err(|_| DatabaseError::PoolClosed)?;

        let reused = self
            .inner
            .idle
            .lock()
            .map_err(|_| DatabaseError::PoolClosed)?
            .pop();

        let conn = match reused {
            Some(conn) => conn,
            None => open_connection(&self.inner.path)?,
        };

        Ok(PooledConnection {
            conn: Some(conn),
            pool: self.inner.clone(),
            _permit: permit,
        })
    }

    /// Maximum number of simultaneously checked-out connections.
    pub fn size(&self) -> usize {
        self.inner.size
    }

    /// Connections currently available without waiting.
    pub fn available(&self) -> usize {
        self.inner.permits.available_permits()
    }
}

/// A checked-out connection. Returns itself to the pool on drop.
pub struct PooledConnection {
    conn: Option<Connection>,
    pool: Arc<PoolInner>,
    _permit: OwnedSemaphorePermit,
}

impl Deref for PooledConnection {
    type Target = Connection;

    fn deref(&self) -> &Connection {
        // Only taken in Drop.
        self.conn.as_ref().expect("connection present until drop")
    }
}

impl Drop for PooledConnection {
    fn drop(&mut self) {
        if let Some(conn) = self.conn.take() {
            if let Ok(mut idle) = self.pool.idle.lock() {
                idle.push(conn);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_pool(size: usize, timeout_ms: u64) -> (DbPool, tempfile::TempDir) {
        let tmp = tempfile::tempdir().unwrap();
        let pool = DbPool::open(
            &tmp.path().join("pool.db"),
            size,
            Duration::from_millis(timeout_ms),
        )
        .unwrap();
        (pool, tmp)
    }

    #[tokio::test]
    async fn acquire_returns_working_connection() {
        let (pool, _tmp) = test_pool(2, 500);
        let conn = pool.acquire().await.unwrap();
        let fk: i64 = conn
            .query_row("PRAGMA foreign_keys", [], |row| row.get(0))
            .unwrap();
        assert_eq!(fk, 1);
    }

    #[tokio::test]
    async fn exhausted_pool_times_out() {
        let (pool, _tmp) = test_pool(1, 50);
        let _held = pool.acquire().await.unwrap();
        let result = pool.acquire().await;
        assert!(matches!(result, Err(DatabaseError::PoolTimeout(_))));
    }

    #[tokio::test]
    async fn released_connection_is_reused() {
        let (pool, _tmp) = test_pool(1, 200);
        {
            let conn = pool.acquire().await.unwrap();
            conn.execute(
                "INSERT INTO hospitals (name, address, phone) VALUES ('City', NULL, NULL)",
                [],
            )
            .unwrap();
        }
        assert_eq!(pool.available(), 1);
        let conn = pool.acquire().await.unwrap();
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM hospitals", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn zero_size_is_clamped_to_one() {
        let (pool, _tmp) = test_pool(0, 50);
        assert_eq!(pool.size(), 1);
        assert!(pool.acquire().await.is_ok());
    }

    #[test]
    fn open_fails_for_unwritable_path() {
        let tmp = tempfile::tempdir().unwrap();
        let bad = tmp.path().join("missing-dir").join("db.sqlite");
        let result = DbPool::open(&bad, 2, Duration::from_millis(10));
        assert!(result.is_err());
    }
}
