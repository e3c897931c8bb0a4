pub mod command;
pub mod config;
pub mod db;
pub mod dispatcher;
pub mod log;
pub mod metrics;
pub mod script;
pub mod session;
pub mod testing;
pub mod worker;

pub use command::{Command, CommandKind, CommandParseError, IsolationLevel, WorkerId};
pub use config::{
    load_config, load_config_from_str, validate_config, Config, ConfigError, DatabaseConfig,
    DispatchConfig, LogConfig, SanitizedConfig,
};
pub use db::{Connection, ConnectionProvider, DbError, RowSink, SqliteProvider};
pub use dispatcher::{DispatchError, DispatchSettings, Dispatcher, Interrupt, RunReport};
pub use log::{create_log_system, LogHandle, Logger};
pub use script::{load_script, Script, ScriptError};
pub use session::Inspector;
pub use worker::{WorkerExit, WorkerHandle};
