//! Script loading.
//!
//! A script is read completely before anything executes; one bad line
//! rejects the whole script.

mod loader;

pub use loader::{load_script, Script, ScriptError};
