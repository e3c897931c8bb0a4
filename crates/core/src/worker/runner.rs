//! Worker thread: one connection, one FIFO of commands.

use std::io;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use super::format::format_row;
use crate::command::{Command, CommandKind, WorkerId};
use crate::config::DatabaseConfig;
use crate::db::{ConnectionProvider, DbError, RowSink};
use crate::log::LogHandle;
use crate::metrics;

/// Everything a worker needs besides its own command queue.
#[derive(Clone)]
pub struct WorkerContext {
    pub provider: Arc<dyn ConnectionProvider>,
    pub database: Arc<DatabaseConfig>,
    pub query_timeout: Duration,
    pub log: LogHandle,
}

/// How a worker thread ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerExit {
    /// Consumed an EXIT.
    Exited,
    /// A database error ended it; the abort lines were logged.
    Aborted,
    /// Its command channel closed before an EXIT arrived.
    Disconnected,
    /// The thread panicked.
    Panicked,
}

/// The worker's thread is gone, so the command was not delivered.
#[derive(Debug, Error)]
#[error("worker {worker} is no longer running, {command} not delivered")]
pub struct WorkerGone {
    pub worker: WorkerId,
    pub command: Command,
}

/// Dispatcher-side handle to a running worker.
pub struct WorkerHandle {
    id: WorkerId,
    tx: mpsc::UnboundedSender<Command>,
    thread: JoinHandle<WorkerExit>,
}

impl WorkerHandle {
    /// Start thread `worker<id>`. The connection is opened on that thread.
    pub fn spawn(id: WorkerId, context: WorkerContext) -> io::Result<Self> {
        let (tx, rx) = mpsc::unbounded_channel();
        let worker = Worker { id, context, rx };
        let thread = thread::Builder::new()
            .name(format!("worker{}", id))
            .spawn(move || worker.run())?;

        Ok(Self { id, tx, thread })
    }

    pub fn id(&self) -> WorkerId {
        self.id
    }

    /// Queue a command without blocking.
    pub fn send(&self, command: Command) -> Result<(), WorkerGone> {
        self.tx.send(command).map_err(|e| WorkerGone {
            worker: self.id,
            command: e.0,
        })
    }

    /// Wait for the thread to end.
    ///
    /// The sending side is dropped first, so a worker that never received
    /// its EXIT still terminates once its queue is empty.
    pub fn join(self) -> WorkerExit {
        let Self { id, tx, thread } = self;
        drop(tx);

        match thread.join() {
            Ok(exit) => exit,
            Err(_) => {
                error!("Worker {} panicked", id);
                WorkerExit::Panicked
            }
        }
    }
}

struct Worker {
    id: WorkerId,
    context: WorkerContext,
    rx: mpsc::UnboundedReceiver<Command>,
}

impl Worker {
    fn run(mut self) -> WorkerExit {
        info!("Worker {} started", self.id);

        let exit = match self.serve() {
            Ok(exit) => exit,
            Err(e) => {
                self.context.log.emit(format!("({}:{})", self.id, e));
                self.context.log.emit(format!("{}:ABORT", self.id));
                metrics::WORKER_ABORTS.inc();
                warn!("Worker {} aborted: {}", self.id, e);
                WorkerExit::Aborted
            }
        };

        info!("Worker {} stopped ({:?})", self.id, exit);
        exit
    }

    fn serve(&mut self) -> Result<WorkerExit, DbError> {
        let Self { id, context, rx } = self;
        let id = *id;
        let mut conn = context.provider.connect(id, &context.database)?;

        while let Some(command) = rx.blocking_recv() {
            context.log.emit(command.to_string());
            debug!("Worker {} executing {}", id, command);

            match command {
                Command::SetIsolation { level, .. } => conn.set_isolation(level)?,
                Command::Query { sql, .. } => {
                    let result = timed(CommandKind::Query, || {
                        let mut sink = LogRowSink { log: &context.log };
                        conn.query(&sql, context.query_timeout, &mut sink)
                    });
                    context
                        .log
                        .emit(format!("({}:{})", id, CommandKind::Query));
                    result?;
                }
                Command::Update { sql, .. } => {
                    let result = timed(CommandKind::Update, || {
                        conn.update(&sql, context.query_timeout)
                    });
                    let count = result.as_ref().map_or(0, |count| *count);
                    context.log.emit(format!(
                        "({}:{}:COUNT={})",
                        id,
                        CommandKind::Update,
                        count
                    ));
                    result?;
                }
                Command::Commit { .. } => timed(CommandKind::Commit, || conn.commit())?,
                Command::Rollback { .. } => timed(CommandKind::Rollback, || conn.rollback())?,
                // Any open transaction is left to the connection's drop
                Command::Exit { .. } => return Ok(WorkerExit::Exited),
                Command::Sleep { .. } => {
                    warn!("Worker {} ignoring a global sleep", id);
                }
            }
        }

        Ok(WorkerExit::Disconnected)
    }
}

fn timed<T>(kind: CommandKind, f: impl FnOnce() -> Result<T, DbError>) -> Result<T, DbError> {
    let started = Instant::now();
    let result = f();
    metrics::STATEMENT_DURATION
        .with_label_values(&[kind.as_str()])
        .observe(started.elapsed().as_secs_f64());
    result
}

/// Streams a result set into the log, one line per row.
struct LogRowSink<'a> {
    log: &'a LogHandle,
}

impl RowSink for LogRowSink<'_> {
    fn columns(&mut self, names: &[String]) {
        self.log.emit(format_row(names));
    }

    fn row(&mut self, values: &[String]) {
        self.log.emit(format_row(values));
    }
}
