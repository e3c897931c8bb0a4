//! Script commands: the parsed unit of work routed to workers.

mod parse;
mod types;

pub use parse::CommandParseError;
pub use types::{Command, CommandKind, IsolationLevel, WorkerId};
