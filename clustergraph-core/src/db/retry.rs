//! Deterministic retry-on-lock-busy, and an RAII transaction guard that
//! rolls back unless explicitly committed.

use std::thread::sleep;
use std::time::Duration;

use rusqlite::ffi::ErrorCode;
use rusqlite::{Connection, Error as SqlError};

use crate::error::{ClusterGraphError, Result};

#[derive(Copy, Clone, Debug)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub initial_backoff: Duration,
    pub factor: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { max_retries: 6, initial_backoff: Duration::from_millis(50), factor: 2 }
    }
}

fn is_busy(err: &SqlError) -> bool {
    matches!(
        err,
        SqlError::SqliteFailure(e, _)
            if e.code == ErrorCode::DatabaseBusy || e.code == ErrorCode::DatabaseLocked
    )
}

/// Run `f`, retrying on SQLITE_BUSY/SQLITE_LOCKED with a geometric backoff.
/// Any other error propagates immediately.
pub fn with_retry<T>(policy: &RetryPolicy, mut f: impl FnMut() -> rusqlite::Result<T>) -> Result<T> {
    let mut attempt = 0u32;
    let mut backoff = policy.initial_backoff;
    loop {
        match f() {
            Ok(v) => return Ok(v),
            Err(e) if is_busy(&e) => {
                if attempt >= policy.max_retries {
                    return Err(ClusterGraphError::LockBusy { retries: attempt });
                }
                sleep(backoff);
                backoff *= policy.factor;
                attempt += 1;
            }
            Err(e) => return Err(e.into()),
        }
    }
}

/// Explicit transaction guard: begins `BEGIN IMMEDIATE` on construction,
/// rolls back on `Drop` unless `commit()` was called.
pub struct TransactionGuard<'a> {
    conn: &'a Connection,
    committed: bool,
}

impl<'a> TransactionGuard<'a> {
    pub fn begin(conn: &'a Connection, policy: &RetryPolicy) -> Result<Self> {
        with_retry(policy, || conn.execute_batch("BEGIN IMMEDIATE"))?;
        Ok(Self { conn, committed: false })
    }

    pub fn commit(mut self, policy: &RetryPolicy) -> Result<()> {
        with_retry(policy, || self.conn.execute_batch("COMMIT"))?;
        self.committed = true;
        Ok(())
    }
}

impl Drop for TransactionGuard<'_> {
    fn drop(&mut self) {
        if !self.committed {
            let _ = self.conn.execute_batch("ROLLBACK");
        }
    }
}
