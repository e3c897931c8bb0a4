//! The dispatcher: reads a script in order, creates workers on first
//! reference, paces delivery, and shuts everything down deterministically.
//!
//! Global script order fixes the order commands are handed out, not the
//! order they finish: two workers may run their commands concurrently.

mod interrupt;
mod runner;
mod types;

pub use interrupt::{Interrupt, Interrupted};
pub use runner::Dispatcher;
pub use types::{DispatchError, DispatchSettings, RunReport};
