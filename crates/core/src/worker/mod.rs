//! Workers: one thread and one transactional connection per worker id.
//!
//! A worker echoes every command it receives, then applies it to its
//! connection. The first database error is logged as
//! `(<id>:<detail>)` followed by `<id>:ABORT` and ends the worker; commands
//! still queued behind it are never echoed.

mod format;
mod runner;

pub use format::{format_row, FIELD_WIDTH};
pub use runner::{WorkerContext, WorkerExit, WorkerGone, WorkerHandle};
