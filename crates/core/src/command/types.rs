//! Command data types.

use std::fmt;
use std::time::Duration;

/// Identifier of the worker (and therefore the connection) a command targets.
pub type WorkerId = u32;

/// Transaction isolation level requested on a worker's connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IsolationLevel {
    Serializable,
    RepeatableRead,
    ReadCommitted,
}

impl IsolationLevel {
    /// The command kind that requests this level.
    #[must_use]
    pub const fn kind(self) -> CommandKind {
        match self {
            Self::Serializable => CommandKind::Serializable,
            Self::RepeatableRead => CommandKind::RepeatableRead,
            Self::ReadCommitted => CommandKind::ReadCommitted,
        }
    }
}

impl fmt::Display for IsolationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.kind().as_str())
    }
}

/// The nine kinds of script command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum CommandKind {
    Serializable,
    RepeatableRead,
    ReadCommitted,
    Query,
    Update,
    Commit,
    Rollback,
    Sleep,
    Exit,
}

impl CommandKind {
    pub const ALL: [Self; 9] = [
        Self::Serializable,
        Self::RepeatableRead,
        Self::ReadCommitted,
        Self::Query,
        Self::Update,
        Self::Commit,
        Self::Rollback,
        Self::Sleep,
        Self::Exit,
    ];

    /// Canonical upper-case name used in the echo form.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Serializable => "SERIALIZABLE",
            Self::RepeatableRead => "REPEATABLE_READ",
            Self::ReadCommitted => "READ_COMMITTED",
            Self::Query => "QUERY",
            Self::Update => "UPDATE",
            Self::Commit => "COMMIT",
            Self::Rollback => "ROLLBACK",
            Self::Sleep => "SLEEP",
            Self::Exit => "EXIT",
        }
    }

    /// Short token accepted in scripts.
    #[must_use]
    pub const fn token(self) -> &'static str {
        match self {
            Self::Serializable => "SR",
            Self::RepeatableRead => "RR",
            Self::ReadCommitted => "RC",
            Self::Query => "Q",
            Self::Update => "U",
            Self::Commit => "C",
            Self::Rollback => "R",
            Self::Sleep => "S",
            Self::Exit => "E",
        }
    }

    /// Resolve either the short token or the canonical name.
    #[must_use]
    pub fn from_token(token: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.token() == token || kind.as_str() == token)
    }

    /// Whether this kind carries a SQL payload.
    #[must_use]
    pub const fn has_sql(self) -> bool {
        matches!(self, Self::Query | Self::Update)
    }
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One parsed script instruction.
///
/// Every variant except [`Command::Sleep`] is routed to exactly one worker.
/// A command is immutable once parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Change the isolation level of the worker's connection.
    SetIsolation {
        worker: WorkerId,
        level: IsolationLevel,
    },
    /// Run a read query and stream its rows to the log.
    Query { worker: WorkerId, sql: String },
    /// Run a write statement and report the affected row count.
    Update { worker: WorkerId, sql: String },
    Commit { worker: WorkerId },
    Rollback { worker: WorkerId },
    /// Stop the worker.
    Exit { worker: WorkerId },
    /// Pause the dispatcher itself.
    Sleep { seconds: u64 },
}

impl Command {
    #[must_use]
    pub const fn kind(&self) -> CommandKind {
        match self {
            Self::SetIsolation { level, .. } => level.kind(),
            Self::Query { .. } => CommandKind::Query,
            Self::Update { .. } => CommandKind::Update,
            Self::Commit { .. } => CommandKind::Commit,
            Self::Rollback { .. } => CommandKind::Rollback,
            Self::Exit { .. } => CommandKind::Exit,
            Self::Sleep { .. } => CommandKind::Sleep,
        }
    }

    /// Target worker, `None` for a global sleep.
    #[must_use]
    pub const fn worker(&self) -> Option<WorkerId> {
        match self {
            Self::SetIsolation { worker, .. }
            | Self::Query { worker, .. }
            | Self::Update { worker, .. }
            | Self::Commit { worker }
            | Self::Rollback { worker }
            | Self::Exit { worker } => Some(*worker),
            Self::Sleep { .. } => None,
        }
    }

    /// SQL payload of a QUERY or UPDATE.
    #[must_use]
    pub fn sql(&self) -> Option<&str> {
        match self {
            Self::Query { sql, .. } | Self::Update { sql, .. } => Some(sql),
            _ => None,
        }
    }

    /// Pause length of a SLEEP.
    #[must_use]
    pub const fn sleep_duration(&self) -> Option<Duration> {
        match self {
            Self::Sleep { seconds } => Some(Duration::from_secs(*seconds)),
            _ => None,
        }
    }

    /// The EXIT the dispatcher sends each worker at shutdown.
    #[must_use]
    pub const fn exit(worker: WorkerId) -> Self {
        Self::Exit { worker }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Query { worker, sql } | Self::Update { worker, sql } => {
                write!(f, "{}:{}:{}", worker, self.kind(), sql)
            }
            Self::Sleep { seconds } => write!(f, "{}:{}", self.kind(), seconds),
            _ => match self.worker() {
                Some(worker) => write!(f, "{}:{}", worker, self.kind()),
                None => f.write_str(self.kind().as_str()),
            },
        }
    }
}
