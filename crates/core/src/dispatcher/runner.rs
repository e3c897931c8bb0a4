//! The dispatch loop.

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{debug, error, info, warn};

use super::interrupt::Interrupt;
use super::types::{DispatchError, DispatchSettings, RunReport};
use crate::command::{Command, CommandKind, WorkerId};
use crate::config::DatabaseConfig;
use crate::db::ConnectionProvider;
use crate::log::LogHandle;
use crate::metrics;
use crate::script::Script;
use crate::worker::{WorkerContext, WorkerExit, WorkerHandle};

/// Routes a script's commands to workers, one command per pacing interval.
pub struct Dispatcher {
    settings: DispatchSettings,
    context: WorkerContext,
    interrupt: Interrupt,
}

impl Dispatcher {
    pub fn new(
        settings: DispatchSettings,
        provider: Arc<dyn ConnectionProvider>,
        database: DatabaseConfig,
        log: LogHandle,
    ) -> Self {
        Self {
            settings,
            context: WorkerContext {
                provider,
                database: Arc::new(database),
                query_timeout: settings.query_timeout,
                log,
            },
            interrupt: Interrupt::new(),
        }
    }

    /// Use an externally owned interrupt.
    pub fn with_interrupt(mut self, interrupt: Interrupt) -> Self {
        self.interrupt = interrupt;
        self
    }

    pub fn interrupt(&self) -> Interrupt {
        self.interrupt.clone()
    }

    /// Execute `script` to completion.
    ///
    /// Whatever ends the loop, every created worker is sent an EXIT and
    /// joined before this returns.
    pub fn run(&self, script: &Script) -> RunReport {
        let mut workers = BTreeMap::new();
        let mut report = RunReport::default();

        info!("Dispatching {} commands", script.len());
        let outcome = self.dispatch(script, &mut workers, &mut report);
        if let Err(ref e) = outcome {
            error!("{}", e);
        }

        report.workers = self.shutdown(workers);
        report.error = outcome.err();
        report
    }

    fn dispatch(
        &self,
        script: &Script,
        workers: &mut BTreeMap<WorkerId, WorkerHandle>,
        report: &mut RunReport,
    ) -> Result<(), DispatchError> {
        for command in script.commands() {
            metrics::COMMANDS_DISPATCHED
                .with_label_values(&[command.kind().as_str()])
                .inc();

            match command.worker() {
                None => {
                    self.sleep(command)?;
                    report.sleeps += 1;
                }
                Some(id) => self.route(id, command, workers)?,
            }
            report.commands_dispatched += 1;

            self.interrupt.sleep(self.settings.pacing)?;
        }
        Ok(())
    }

    /// Global pause: no worker receives anything meanwhile.
    fn sleep(&self, command: &Command) -> Result<(), DispatchError> {
        let duration = command.sleep_duration().unwrap_or_default();

        self.context.log.emit(command.to_string());
        self.interrupt.sleep(duration)?;
        self.context.log.emit(format!("({})", CommandKind::Sleep));

        metrics::SLEEPS.inc();
        Ok(())
    }

    fn route(
        &self,
        id: WorkerId,
        command: &Command,
        workers: &mut BTreeMap<WorkerId, WorkerHandle>,
    ) -> Result<(), DispatchError> {
        let worker = match workers.entry(id) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => {
                let handle = WorkerHandle::spawn(id, self.context.clone())
                    .map_err(|source| DispatchError::Spawn { worker: id, source })?;
                debug!("Created worker {}", id);
                entry.insert(handle)
            }
        };

        if let Err(gone) = worker.send(command.clone()) {
            warn!("{}", gone);
        }
        Ok(())
    }

    /// Best effort EXIT to every worker, then wait for all of them.
    fn shutdown(
        &self,
        workers: BTreeMap<WorkerId, WorkerHandle>,
    ) -> BTreeMap<WorkerId, WorkerExit> {
        info!("Shutting down {} workers", workers.len());

        for worker in workers.values() {
            if let Err(gone) = worker.send(Command::exit(worker.id())) {
                warn!("Shutdown: {}", gone);
            }
        }

        workers
            .into_iter()
            .map(|(id, worker)| (id, worker.join()))
            .collect()
    }
}
