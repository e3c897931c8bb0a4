//! The observational log stream.
//!
//! Every producer (the dispatcher and each worker) enqueues complete lines on
//! one unbounded channel; a single writer thread prints them.

mod handle;
mod writer;

pub use handle::{LogHandle, LogMessage};
pub use writer::{create_log_system, LogWriter, Logger};
