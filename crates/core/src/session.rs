//! One complete inspection run: logger, dispatcher, shutdown.

use std::io::Write;
use std::sync::Arc;

use tracing::{error, info};

use crate::config::Config;
use crate::db::ConnectionProvider;
use crate::dispatcher::{DispatchError, DispatchSettings, Dispatcher, Interrupt, RunReport};
use crate::log::create_log_system;
use crate::script::Script;

/// Runs scripts against a database, printing the observational log to a sink.
pub struct Inspector {
    config: Config,
    provider: Arc<dyn ConnectionProvider>,
    interrupt: Interrupt,
}

impl Inspector {
    pub fn new(config: Config, provider: Arc<dyn ConnectionProvider>) -> Self {
        Self {
            config,
            provider,
            interrupt: Interrupt::new(),
        }
    }

    pub fn with_interrupt(mut self, interrupt: Interrupt) -> Self {
        self.interrupt = interrupt;
        self
    }

    /// Handle for cutting a run short from another thread.
    pub fn interrupt(&self) -> Interrupt {
        self.interrupt.clone()
    }

    /// Run `script` to completion.
    ///
    /// Returns after every worker has terminated and every logged line has
    /// been written to `sink`.
    pub fn run(&self, script: &Script, sink: Box<dyn Write + Send>) -> RunReport {
        let (log, writer) = create_log_system(sink, &self.config.log);
        let logger = match writer.start() {
            Ok(logger) => logger,
            Err(e) => {
                error!("Failed to start logger: {}", e);
                return RunReport {
                    error: Some(DispatchError::Logger(e)),
                    ..RunReport::default()
                };
            }
        };

        let dispatcher = Dispatcher::new(
            DispatchSettings::from(&self.config.dispatch),
            Arc::clone(&self.provider),
            self.config.database.clone(),
            log,
        )
        .with_interrupt(self.interrupt.clone());

        let mut report = dispatcher.run(script);
        drop(dispatcher);

        report.lines_logged = logger.stop();
        info!(
            "Run finished: {} commands, {} workers, {} lines",
            report.commands_dispatched,
            report.workers.len(),
            report.lines_logged
        );
        report
    }
}
