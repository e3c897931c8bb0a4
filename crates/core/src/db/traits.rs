//! Connection traits.

use std::time::Duration;

use super::DbError;
use crate::command::{IsolationLevel, WorkerId};
use crate::config::DatabaseConfig;

/// Receives a query's result set as text, header first.
pub trait RowSink {
    /// Column names, called once before any row.
    fn columns(&mut self, names: &[String]);

    /// One result row, values in column order.
    fn row(&mut self, values: &[String]);
}

/// A transactional connection owned by exactly one worker.
///
/// Auto-commit is off: statements accumulate in a transaction until
/// [`commit`](Connection::commit) or [`rollback`](Connection::rollback).
pub trait Connection: Send {
    fn set_isolation(&mut self, level: IsolationLevel) -> Result<(), DbError>;

    /// Run a read query, streaming the result set into `sink`.
    ///
    /// The header may be delivered before a failure surfaces mid-stream.
    fn query(
        &mut self,
        sql: &str,
        timeout: Duration,
        sink: &mut dyn RowSink,
    ) -> Result<(), DbError>;

    /// Run a write statement, returning the affected row count.
    fn update(&mut self, sql: &str, timeout: Duration) -> Result<u64, DbError>;

    fn commit(&mut self) -> Result<(), DbError>;

    fn rollback(&mut self) -> Result<(), DbError>;
}

/// Opens connections for workers.
pub trait ConnectionProvider: Send + Sync {
    /// Open a connection for `worker` with auto-commit disabled.
    fn connect(
        &self,
        worker: WorkerId,
        config: &DatabaseConfig,
    ) -> Result<Box<dyn Connection>, DbError>;
}
