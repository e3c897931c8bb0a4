//! SQLite connection provider.
//!
//! SQLite has no per-connection isolation setting: every transaction is
//! serializable. All levels therefore start with `BEGIN DEFERRED`, so locks
//! are taken only by the statements themselves (readers share, one writer
//! reserves), and the requested level is only recorded.
//!
//! A transaction is opened lazily before the first statement after a
//! commit or rollback, which is how auto-commit stays off.
//!
//! A lock conflict that waited out the busy timeout is a
//! [`DbError::Timeout`]. SQLite refuses some conflicts without waiting (a
//! reader upgrading to a writer while another writer holds the lock); those
//! are [`DbError::Busy`].

use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use rusqlite::types::ValueRef;
use rusqlite::ErrorCode;
use tracing::debug;

use super::{Connection, ConnectionProvider, DbError, RowSink};
use crate::command::{IsolationLevel, WorkerId};
use crate::config::DatabaseConfig;

/// Virtual machine steps between deadline checks
const PROGRESS_OPS: i32 = 1000;

/// Opens one SQLite connection per worker.
#[derive(Debug, Clone, Default)]
pub struct SqliteProvider;

impl SqliteProvider {
    pub fn new() -> Self {
        Self
    }

    /// Resolve `sqlite:<path>`, `sqlite://<path>` or a bare path.
    pub fn database_path(url: &str) -> Result<PathBuf, DbError> {
        let path = url
            .strip_prefix("sqlite://")
            .or_else(|| url.strip_prefix("sqlite:"))
            .unwrap_or(url);

        if path.is_empty() {
            return Err(DbError::Connect(format!("no database path in {:?}", url)));
        }
        if path == ":memory:" {
            return Err(DbError::Connect(
                "in-memory databases cannot be shared between workers".to_string(),
            ));
        }
        Ok(PathBuf::from(path))
    }
}

impl ConnectionProvider for SqliteProvider {
    fn connect(
        &self,
        worker: WorkerId,
        config: &DatabaseConfig,
    ) -> Result<Box<dyn Connection>, DbError> {
        let path = Self::database_path(&config.url)?;
        let conn = rusqlite::Connection::open(&path)
            .map_err(|e| DbError::Connect(format!("{}: {}", path.display(), e)))?;

        let deadline: Arc<Mutex<Option<Instant>>> = Arc::new(Mutex::new(None));
        let watched = Arc::clone(&deadline);
        conn.progress_handler(
            PROGRESS_OPS,
            Some(move || match watched.lock() {
                Ok(guard) => matches!(*guard, Some(at) if Instant::now() >= at),
                Err(_) => false,
            }),
        );

        debug!("Worker {} opened {}", worker, path.display());
        Ok(Box::new(SqliteConnection {
            conn,
            level: IsolationLevel::ReadCommitted,
            deadline,
            busy: Duration::ZERO,
        }))
    }
}

struct SqliteConnection {
    conn: rusqlite::Connection,
    /// Requested level, reported when a transaction starts
    level: IsolationLevel,
    /// Read by the progress handler; `Some` while a statement is running
    deadline: Arc<Mutex<Option<Instant>>>,
    /// Busy timeout currently installed on the connection
    busy: Duration,
}

impl SqliteConnection {
    fn arm(&self, at: Option<Instant>) {
        if let Ok(mut guard) = self.deadline.lock() {
            *guard = at;
        }
    }

    /// Run `f` with both the busy timeout and the progress deadline set.
    fn with_deadline<T>(
        &mut self,
        timeout: Duration,
        f: impl FnOnce(&rusqlite::Connection) -> rusqlite::Result<T>,
    ) -> Result<T, DbError> {
        if self.busy != timeout {
            self.conn
                .busy_timeout(timeout)
                .map_err(|e| DbError::Statement(e.to_string()))?;
            self.busy = timeout;
        }

        let started = Instant::now();
        self.arm(Some(started + timeout));
        let result = f(&self.conn);
        self.arm(None);

        result.map_err(|e| classify(e, timeout, started.elapsed()))
    }

    fn finish(&mut self, sql: &str) -> Result<(), DbError> {
        if self.conn.is_autocommit() {
            // No statement since the last commit/rollback
            return Ok(());
        }
        let started = Instant::now();
        self.conn
            .execute_batch(sql)
            .map_err(|e| classify(e, self.busy, started.elapsed()))
    }
}

impl Connection for SqliteConnection {
    fn set_isolation(&mut self, level: IsolationLevel) -> Result<(), DbError> {
        if !self.conn.is_autocommit() {
            debug!("{} takes effect at the next transaction", level);
        }
        self.level = level;
        Ok(())
    }

    fn query(
        &mut self,
        sql: &str,
        timeout: Duration,
        sink: &mut dyn RowSink,
    ) -> Result<(), DbError> {
        let level = self.level;
        self.with_deadline(timeout, |conn| {
            begin_if_needed(conn, level)?;

            let mut stmt = conn.prepare(sql)?;
            let columns: Vec<String> = stmt
                .column_names()
                .into_iter()
                .map(String::from)
                .collect();

            // The header goes out once the first step succeeded, so a
            // statement that fails immediately prints none.
            let mut header_sent = false;
            let mut rows = stmt.query([])?;
            while let Some(row) = rows.next()? {
                if !header_sent {
                    sink.columns(&columns);
                    header_sent = true;
                }
                let values = (0..columns.len())
                    .map(|i| row.get_ref(i).map(render_value))
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                sink.row(&values);
            }
            if !header_sent {
                sink.columns(&columns);
            }
            Ok(())
        })
    }

    fn update(&mut self, sql: &str, timeout: Duration) -> Result<u64, DbError> {
        let level = self.level;
        self.with_deadline(timeout, |conn| {
            begin_if_needed(conn, level)?;
            conn.execute(sql, []).map(|count| count as u64)
        })
    }

    fn commit(&mut self) -> Result<(), DbError> {
        self.finish("COMMIT")
    }

    fn rollback(&mut self) -> Result<(), DbError> {
        self.finish("ROLLBACK")
    }
}

fn begin_if_needed(
    conn: &rusqlite::Connection,
    level: IsolationLevel,
) -> rusqlite::Result<()> {
    if !conn.is_autocommit() {
        return Ok(());
    }
    debug!("Starting {} transaction", level);
    conn.execute_batch("BEGIN DEFERRED")
}

/// Interrupted statements are timeouts. Lock conflicts are timeouts only
/// when the busy handler actually waited; the rest are plain failures.
fn classify(err: rusqlite::Error, timeout: Duration, elapsed: Duration) -> DbError {
    match err.sqlite_error_code() {
        Some(ErrorCode::OperationInterrupted) => DbError::Timeout {
            after: timeout,
            detail: err.to_string(),
        },
        Some(ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked) => {
            // The busy handler sleeps until the whole timeout is spent
            if elapsed >= timeout / 2 {
                DbError::Timeout {
                    after: timeout,
                    detail: err.to_string(),
                }
            } else {
                DbError::Busy(err.to_string())
            }
        }
        _ => DbError::Statement(err.to_string()),
    }
}

fn render_value(value: ValueRef<'_>) -> String {
    match value {
        ValueRef::Null => "null".to_string(),
        ValueRef::Integer(i) => i.to_string(),
        ValueRef::Real(f) => f.to_string(),
        ValueRef::Text(text) => String::from_utf8_lossy(text).into_owned(),
        ValueRef::Blob(bytes) => bytes.iter().map(|b| format!("{:02x}", b)).collect(),
    }
}
