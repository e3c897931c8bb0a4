use chrono::{DateTime, Local};
use tokio::sync::mpsc;

/// One observational line with the moment it was produced.
#[derive(Debug, Clone)]
pub struct LogMessage {
    pub timestamp: DateTime<Local>,
    pub text: String,
}

/// What travels on the log channel.
#[derive(Debug)]
pub(crate) enum LogSignal {
    Message(LogMessage),
    /// Ends the writer's consuming loop; anything behind it is drained by `stop`.
    Stop,
}

/// Handle for emitting log lines
///
/// This is cheaply cloneable; the dispatcher and every worker hold one.
/// Lines from one handle are printed in the order they were emitted.
#[derive(Clone)]
pub struct LogHandle {
    tx: mpsc::UnboundedSender<LogSignal>,
}

impl LogHandle {
    pub(crate) fn new(tx: mpsc::UnboundedSender<LogSignal>) -> Self {
        Self { tx }
    }

    /// Enqueue one fully formatted line.
    ///
    /// Never blocks. If the writer is gone the line is reported through
    /// tracing and the caller carries on.
    pub fn emit(&self, text: impl Into<String>) {
        let message = LogMessage {
            timestamp: Local::now(),
            text: text.into(),
        };
        if let Err(e) = self.tx.send(LogSignal::Message(message)) {
            if let LogSignal::Message(lost) = e.0 {
                tracing::error!("Failed to emit log line {:?}: channel closed", lost.text);
            }
        }
    }
}
