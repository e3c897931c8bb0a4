//! Dispatcher types.

use std::collections::BTreeMap;
use std::io;
use std::time::Duration;

use thiserror::Error;

use super::interrupt::Interrupted;
use crate::command::WorkerId;
use crate::config::DispatchConfig;
use crate::worker::WorkerExit;

/// Timing the dispatcher applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchSettings {
    /// Pause after every command, sleep or not.
    pub pacing: Duration,
    /// Statement timeout handed to every worker.
    pub query_timeout: Duration,
}

impl From<&DispatchConfig> for DispatchSettings {
    fn from(config: &DispatchConfig) -> Self {
        Self {
            pacing: config.pacing(),
            query_timeout: config.query_timeout(),
        }
    }
}

/// Errors that end the dispatch loop. Shutdown still runs after any of them.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("Dispatch loop interrupted")]
    Interrupted(#[from] Interrupted),

    #[error("Failed to start worker {worker}: {source}")]
    Spawn {
        worker: WorkerId,
        #[source]
        source: io::Error,
    },

    #[error("Failed to start logger: {0}")]
    Logger(#[source] io::Error),
}

/// Outcome of a run, produced after every worker has terminated.
#[derive(Debug, Default)]
pub struct RunReport {
    /// Commands handled, including sleeps.
    pub commands_dispatched: usize,
    pub sleeps: usize,
    /// How each created worker ended, by id.
    pub workers: BTreeMap<WorkerId, WorkerExit>,
    /// Lines the logger printed (zero until the logger is stopped).
    pub lines_logged: usize,
    /// Why the dispatch loop stopped early, if it did.
    pub error: Option<DispatchError>,
}

impl RunReport {
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    /// Workers that ended through a database error.
    pub fn aborted_workers(&self) -> Vec<WorkerId> {
        self.workers
            .iter()
            .filter(|(_, exit)| **exit == WorkerExit::Aborted)
            .map(|(id, _)| *id)
            .collect()
    }
}
