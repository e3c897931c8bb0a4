use std::io::{self, Write};
use std::thread::{self, JoinHandle};

use tokio::sync::mpsc;

use super::handle::{LogHandle, LogMessage, LogSignal};
use crate::config::LogConfig;

/// Consumer that prints log lines to the output sink, one per line, in
/// receipt order.
pub struct LogWriter {
    rx: mpsc::UnboundedReceiver<LogSignal>,
    tx: mpsc::UnboundedSender<LogSignal>,
    sink: Box<dyn Write + Send>,
    timestamps: bool,
    written: usize,
}

impl LogWriter {
    /// Spawn the consuming thread.
    pub fn start(self) -> io::Result<Logger> {
        let stop_tx = self.tx.clone();
        let thread = thread::Builder::new()
            .name("logger".to_string())
            .spawn(move || self.run())?;

        tracing::debug!("Logger started");
        Ok(Logger { stop_tx, thread })
    }

    /// Consume until told to stop, handing the writer back for the final drain.
    fn run(mut self) -> Self {
        while let Some(signal) = self.rx.blocking_recv() {
            match signal {
                LogSignal::Message(message) => self.write(&message),
                LogSignal::Stop => break,
            }
        }
        self
    }

    /// Print whatever is still buffered without blocking.
    fn drain(&mut self) {
        while let Ok(signal) = self.rx.try_recv() {
            if let LogSignal::Message(message) = signal {
                self.write(&message);
            }
        }
    }

    fn write(&mut self, message: &LogMessage) {
        let result = if self.timestamps {
            writeln!(
                self.sink,
                "{} {}",
                message.timestamp.format("%H:%M:%S%.3f"),
                message.text
            )
        } else {
            writeln!(self.sink, "{}", message.text)
        };

        match result.and_then(|()| self.sink.flush()) {
            Ok(()) => self.written += 1,
            Err(e) => tracing::error!("Failed to write log line: {}", e),
        }
    }
}

/// A running [`LogWriter`].
pub struct Logger {
    stop_tx: mpsc::UnboundedSender<LogSignal>,
    thread: JoinHandle<LogWriter>,
}

impl Logger {
    /// Stop the consuming loop, then print every line still buffered.
    ///
    /// Call only after all producers are done; lines emitted after this
    /// returns are dropped. Returns the number of lines written over the
    /// writer's lifetime.
    pub fn stop(self) -> usize {
        if self.stop_tx.send(LogSignal::Stop).is_err() {
            tracing::warn!("Logger channel already closed");
        }

        match self.thread.join() {
            Ok(mut writer) => {
                writer.drain();
                tracing::debug!("Logger stopped after {} lines", writer.written);
                writer.written
            }
            Err(_) => {
                tracing::error!("Logger thread panicked");
                0
            }
        }
    }
}

/// Create a complete log system
///
/// Returns:
/// - `LogHandle` - for emitting lines (clone this for each producer)
/// - `LogWriter` - start it with [`LogWriter::start`]; stop the returned
///   [`Logger`] once every producer has finished
pub fn create_log_system(
    sink: Box<dyn Write + Send>,
    config: &LogConfig,
) -> (LogHandle, LogWriter) {
    let (tx, rx) = mpsc::unbounded_channel();
    let handle = LogHandle::new(tx.clone());
    let writer = LogWriter {
        rx,
        tx,
        sink,
        timestamps: config.timestamps,
        written: 0,
    };
    (handle, writer)
}
