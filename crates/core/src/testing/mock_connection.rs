//! Mock connection provider for testing.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use crate::command::{IsolationLevel, WorkerId};
use crate::config::DatabaseConfig;
use crate::db::{Connection, ConnectionProvider, DbError, RowSink};

/// A recorded connection call for test assertions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockCall {
    Connect(WorkerId),
    SetIsolation(WorkerId, IsolationLevel),
    Query(WorkerId, String),
    Update(WorkerId, String),
    Commit(WorkerId),
    Rollback(WorkerId),
}

impl MockCall {
    pub fn worker(&self) -> WorkerId {
        match self {
            Self::Connect(id)
            | Self::SetIsolation(id, _)
            | Self::Query(id, _)
            | Self::Update(id, _)
            | Self::Commit(id)
            | Self::Rollback(id) => *id,
        }
    }
}

/// Scripted outcome of one SQL statement.
#[derive(Debug, Clone)]
pub enum MockResponse {
    /// A result set.
    Rows {
        columns: Vec<String>,
        rows: Vec<Vec<String>>,
    },
    /// A result set that fails after streaming some rows.
    FailAfterRows {
        columns: Vec<String>,
        rows: Vec<Vec<String>>,
        error: DbError,
    },
    /// An affected row count.
    Count(u64),
    Fail(DbError),
}

impl MockResponse {
    pub fn rows(columns: &[&str], rows: &[&[&str]]) -> Self {
        Self::Rows {
            columns: columns.iter().map(|c| c.to_string()).collect(),
            rows: rows
                .iter()
                .map(|row| row.iter().map(|v| v.to_string()).collect())
                .collect(),
        }
    }
}

#[derive(Debug, Default)]
struct MockState {
    responses: HashMap<String, MockResponse>,
    refused: HashSet<WorkerId>,
    calls: Vec<MockCall>,
}

/// Mock implementation of the ConnectionProvider trait.
///
/// Provides controllable behavior for testing:
/// - Script responses per SQL text (unlisted queries return an empty
///   result set, unlisted updates a count of zero)
/// - Refuse connections for chosen workers
/// - Record every call for assertions
///
/// # Example
///
/// ```rust,ignore
/// use lockscope_core::testing::{MockProvider, MockResponse};
///
/// let provider = MockProvider::new()
///     .on("select 1", MockResponse::rows(&["1"], &[&["1"]]))
///     .fail_connect(3);
///
/// // ... run a dispatcher with it ...
///
/// assert_eq!(provider.calls_for(1).len(), 2);
/// ```
#[derive(Debug, Clone, Default)]
pub struct MockProvider {
    state: Arc<Mutex<MockState>>,
}

impl MockProvider {
    /// Create a new mock provider.
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer `sql` with `response` on every connection.
    pub fn on(self, sql: impl Into<String>, response: MockResponse) -> Self {
        self.lock().responses.insert(sql.into(), response);
        self
    }

    /// Refuse to connect `worker`.
    pub fn fail_connect(self, worker: WorkerId) -> Self {
        self.lock().refused.insert(worker);
        self
    }

    /// All recorded calls, in the order they happened.
    pub fn calls(&self) -> Vec<MockCall> {
        self.lock().calls.clone()
    }

    /// Recorded calls made by one worker.
    pub fn calls_for(&self, worker: WorkerId) -> Vec<MockCall> {
        self.lock()
            .calls
            .iter()
            .filter(|call| call.worker() == worker)
            .cloned()
            .collect()
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl ConnectionProvider for MockProvider {
    fn connect(
        &self,
        worker: WorkerId,
        _config: &DatabaseConfig,
    ) -> Result<Box<dyn Connection>, DbError> {
        let mut state = self.lock();
        state.calls.push(MockCall::Connect(worker));

        if state.refused.contains(&worker) {
            return Err(DbError::Connect(format!("mock refused worker {}", worker)));
        }
        Ok(Box::new(MockConnection {
            worker,
            provider: self.clone(),
        }))
    }
}

/// Connection handed out by [`MockProvider`].
#[derive(Debug)]
pub struct MockConnection {
    worker: WorkerId,
    provider: MockProvider,
}

impl MockConnection {
    fn record(&self, call: MockCall) -> Option<MockResponse> {
        let mut state = self.provider.lock();
        let response = match &call {
            MockCall::Query(_, sql) | MockCall::Update(_, sql) => state.responses.get(sql).cloned(),
            _ => None,
        };
        state.calls.push(call);
        response
    }
}

impl Connection for MockConnection {
    fn set_isolation(&mut self, level: IsolationLevel) -> Result<(), DbError> {
        self.record(MockCall::SetIsolation(self.worker, level));
        Ok(())
    }

    fn query(
        &mut self,
        sql: &str,
        _timeout: Duration,
        sink: &mut dyn RowSink,
    ) -> Result<(), DbError> {
        let response = self.record(MockCall::Query(self.worker, sql.to_string()));
        match response {
            None => {
                sink.columns(&[]);
                Ok(())
            }
            Some(MockResponse::Rows { columns, rows }) => {
                sink.columns(&columns);
                rows.iter().for_each(|row| sink.row(row));
                Ok(())
            }
            Some(MockResponse::FailAfterRows {
                columns,
                rows,
                error,
            }) => {
                sink.columns(&columns);
                rows.iter().for_each(|row| sink.row(row));
                Err(error)
            }
            Some(MockResponse::Count(_)) => {
                Err(DbError::Statement("mock: statement is not a query".to_string()))
            }
            Some(MockResponse::Fail(error)) => Err(error),
        }
    }

    fn update(&mut self, sql: &str, _timeout: Duration) -> Result<u64, DbError> {
        let response = self.record(MockCall::Update(self.worker, sql.to_string()));
        match response {
            None => Ok(0),
            Some(MockResponse::Count(count)) => Ok(count),
            Some(MockResponse::Fail(error)) | Some(MockResponse::FailAfterRows { error, .. }) => {
                Err(error)
            }
            Some(MockResponse::Rows { .. }) => {
                Err(DbError::Statement("mock: statement returned rows".to_string()))
            }
        }
    }

    fn commit(&mut self) -> Result<(), DbError> {
        self.record(MockCall::Commit(self.worker));
        Ok(())
    }

    fn rollback(&mut self) -> Result<(), DbError> {
        self.record(MockCall::Rollback(self.worker));
        Ok(())
    }
}
