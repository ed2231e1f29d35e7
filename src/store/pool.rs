//! Connection Pool Module
//!
//! Bounded pool of SQLite connections shared by all request handlers.
//!
//! Every store operation checks out one connection, runs one statement on the
//! blocking thread pool and hands the connection back when it finishes, on
//! success and failure alike. If the caller's future is dropped mid-statement
//! the statement is interrupted.

use std::ops::Deref;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use rusqlite::{Connection, InterruptHandle};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::{CacheError, Result};

// == Pool Options ==
/// Sizing and timeout parameters for a [`ConnectionPool`].
#[derive(Debug, Clone)]
pub struct PoolOptions {
    /// Maximum number of connections checked out at once
    pub max_size: usize,
    /// How long `acquire` waits for a free slot
    pub acquire_timeout: Duration,
    /// SQLite busy timeout applied to every connection
    pub busy_timeout: Duration,
}

impl PoolOptions {
    /// Extracts pool options from the server configuration.
    pub fn from_config(config: &Config) -> Self {
        Self {
            max_size: config.pool_size,
            acquire_timeout: config.acquire_timeout,
            busy_timeout: config.busy_timeout,
        }
    }
}

impl Default for PoolOptions {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

// == Connection Pool ==
/// Cheaply cloneable handle to a bounded set of SQLite connections.
#[derive(Clone)]
pub struct ConnectionPool {
    inner: Arc<PoolInner>,
}

struct PoolInner {
    path: PathBuf,
    idle: Mutex<Vec<Connection>>,
    permits: Arc<Semaphore>,
    options: PoolOptions,
}

impl PoolInner {
    fn open_connection(&self) -> rusqlite::Result<Connection> {
        let conn = Connection::open(&self.path)?;
        conn.busy_timeout(self.options.busy_timeout)?;
        conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| {
            row.get::<_, String>(0)
        })?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;
        debug!("Opened store connection to {}", self.path.display());
        Ok(conn)
    }

    fn release(&self, conn: Connection) {
        match self.idle.lock() {
            Ok(mut idle) => idle.push(conn),
            // A poisoned idle list only costs us the reuse of this connection
            Err(_) => warn!("Idle connection list poisoned, closing connection"),
        }
    }
}

impl ConnectionPool {
    // == Constructor ==
    /// Creates a pool over the SQLite database at `path`.
    ///
    /// Connections are opened lazily on first use, up to `options.max_size`.
    pub fn new(path: impl AsRef<Path>, options: PoolOptions) -> Self {
        let max_size = options.max_size.max(1);
        Self {
            inner: Arc::new(PoolInner {
                path: path.as_ref().to_path_buf(),
                idle: Mutex::new(Vec::with_capacity(max_size)),
                permits: Arc::new(Semaphore::new(max_size)),
                options: PoolOptions {
                    max_size,
                    ..options
                },
            }),
        }
    }

    // == Acquire ==
    /// Checks out a connection, waiting at most the configured acquire timeout.
    ///
    /// The connection goes back to the pool when the returned guard is dropped.
    pub async fn acquire(&self) -> Result<PooledConnection> {
        let permit = tokio::time::timeout(
            self.inner.options.acquire_timeout,
            self.inner.permits.clone().acquire_owned(),
        )
        .await
        .map_err(|_| {
            warn!(
                "Timed out after {:?} waiting for a store connection",
                self.inner.options.acquire_timeout
            );
            CacheError::StoreUnavailable("timed out waiting for a connection".to_string())
        })?
        .map_err(|_| CacheError::StoreUnavailable("connection pool is closed".to_string()))?;

        let idle = self
            .inner
            .idle
            .lock()
            .map_err(|_| CacheError::StoreError("idle connection list poisoned".to_string()))?
            .pop();

        let conn = match idle {
            Some(conn) => conn,
            None => {
                let inner = Arc::clone(&self.inner);
                tokio::task::spawn_blocking(move || inner.open_connection())
                    .await
                    .map_err(|e| CacheError::StoreError(format!("connect task failed: {e}")))??
            }
        };

        Ok(PooledConnection {
            conn: Some(conn),
            pool: Arc::clone(&self.inner),
            _permit: permit,
        })
    }

    // == Run ==
    /// Runs `op` against a pooled connection on the blocking thread pool.
    ///
    /// Dropping the returned future before it completes interrupts the
    /// running statement; the connection is still returned to the pool.
    pub async fn run<F, T>(&self, op: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> rusqlite::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = self.acquire().await?;
        let interrupt = InterruptOnDrop::new(conn.get_interrupt_handle());
        let checked_out = interrupt.slot();

        let outcome = tokio::task::spawn_blocking(move || {
            // Dropped before `conn`, even on panic, so the handle is gone
            // before the connection can reach another borrower.
            let _release = ClearOnExit(&checked_out);
            op(&conn)
        })
        .await;
        drop(interrupt);

        match outcome {
            Ok(result) => result.map_err(CacheError::from),
            Err(e) => Err(CacheError::StoreError(format!("store task failed: {e}"))),
        }
    }

    // == Introspection ==
    /// Configured upper bound on checked-out connections.
    pub fn max_size(&self) -> usize {
        self.inner.options.max_size
    }

    /// Number of connections currently checked out.
    pub fn in_use(&self) -> usize {
        self.inner.options.max_size - self.inner.permits.available_permits()
    }

    /// Number of open connections waiting for reuse.
    pub fn idle_count(&self) -> usize {
        self.inner.idle.lock().map(|idle| idle.len()).unwrap_or(0)
    }
}

// == Pooled Connection ==
/// A checked-out connection that returns itself to the pool on drop.
pub struct PooledConnection {
    conn: Option<Connection>,
    pool: Arc<PoolInner>,
    _permit: OwnedSemaphorePermit,
}

impl Deref for PooledConnection {
    type Target = Connection;

    fn deref(&self) -> &Connection {
        // Only taken in Drop
        self.conn.as_ref().expect("pooled connection already released")
    }
}

impl Drop for PooledConnection {
    fn drop(&mut self) {
        if let Some(conn) = self.conn.take() {
            self.pool.release(conn);
        }
        // The permit is released after this body runs, so the connection is
        // back in the idle list before a waiter can claim the slot.
    }
}

/// Interrupts the connection's running statement if dropped while the
/// connection is still checked out by the owning call.
///
/// The handle sits behind a mutex shared with the blocking task, which clears
/// it before handing the connection back. Interrupting and clearing are
/// serialized, so an interrupt never lands on a connection another caller owns.
struct InterruptOnDrop {
    handle: Arc<Mutex<Option<InterruptHandle>>>,
}

impl InterruptOnDrop {
    fn new(handle: InterruptHandle) -> Self {
        Self {
            handle: Arc::new(Mutex::new(Some(handle))),
        }
    }

    fn slot(&self) -> Arc<Mutex<Option<InterruptHandle>>> {
        Arc::clone(&self.handle)
    }
}

/// Clears an interrupt slot when the blocking task finishes with its connection.
struct ClearOnExit<'a>(&'a Mutex<Option<InterruptHandle>>);

impl Drop for ClearOnExit<'_> {
    fn drop(&mut self) {
        match self.0.lock() {
            Ok(mut handle) => *handle = None,
            Err(poisoned) => *poisoned.into_inner() = None,
        }
    }
}

impl Drop for InterruptOnDrop {
    fn drop(&mut self) {
        let handle = match self.handle.lock() {
            Ok(handle) => handle,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Some(handle) = handle.as_ref() {
            debug!("Store call cancelled, interrupting statement");
            handle.interrupt();
        }
    }
}
