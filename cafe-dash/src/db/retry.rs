//! Write transactions and lock retry
//!
//! Writers open their transaction with `BEGIN IMMEDIATE`, so the write lock
//! is taken before anything is read and two writers cannot both read and then
//! collide on upgrade. A writer that still finds the database busy after the
//! connection's busy timeout is retried with exponential backoff; once the
//! wait budget is spent the caller gets `Conflict`.

use cafe_common::{Error, Result};
use sqlx::{Sqlite, SqlitePool, Transaction};
use std::future::Future;
use std::time::{Duration, Instant};

/// Total time a write keeps retrying on a locked database
pub(crate) const MAX_LOCK_WAIT_MS: u64 = 10_000;

const INITIAL_BACKOFF_MS: u64 = 10;
const MAX_BACKOFF_MS: u64 = 1_000;

/// Start a transaction holding the write lock from the first statement
pub(crate) async fn begin_immediate(pool: &SqlitePool) -> Result<Transaction<'static, Sqlite>> {
    Ok(pool.begin_with("BEGIN IMMEDIATE").await?)
}

/// SQLITE_BUSY / SQLITE_LOCKED, including their extended codes
pub(crate) fn is_lock_error(err: &Error) -> bool {
    let Error::Database(sqlx::Error::Database(db_err)) = err else {
        return false;
    };
    let busy_code = db_err
        .code()
        .and_then(|code| code.parse::<i32>().ok())
        .map_or(false, |code| matches!(code & 0xff, 5 | 6));
    busy_code || db_err.message().contains("database is locked")
}

/// Run `operation` until it succeeds, fails with a non-lock error, or
/// `max_wait_ms` elapses. Backoff starts at 10 ms and doubles up to 1 s.
pub(crate) async fn retry_on_lock<F, Fut, T>(
    operation_name: &str,
    max_wait_ms: u64,
    mut operation: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let start = Instant::now();
    let max_duration = Duration::from_millis(max_wait_ms);
    let mut attempt = 0u32;
    let mut backoff_ms = INITIAL_BACKOFF_MS;

    loop {
        attempt += 1;

        let err = match operation().await {
            Ok(value) => {
                if attempt > 1 {
                    tracing::debug!(
                        operation = operation_name,
                        attempt,
                        elapsed_ms = start.elapsed().as_millis() as u64,
                        "Database write succeeded after retry"
                    );
                }
                return Ok(value);
            }
            Err(err) => err,
        };

        if !is_lock_error(&err) {
            return Err(err);
        }

        let elapsed = start.elapsed();
        if elapsed >= max_duration {
            tracing::error!(
                operation = operation_name,
                attempt,
                elapsed_ms = elapsed.as_millis() as u64,
                max_wait_ms,
                "Database still locked, giving up"
            );
            return Err(Error::Conflict(
                "La base de datos está ocupada, intente de nuevo".to_string(),
            ));
        }

        tracing::warn!(
            operation = operation_name,
            attempt,
            backoff_ms,
            remaining_ms = max_duration.saturating_sub(elapsed).as_millis() as u64,
            "Database locked, will retry after backoff"
        );
        tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
        backoff_ms = (backoff_ms * 2).min(MAX_BACKOFF_MS);
    }
}
