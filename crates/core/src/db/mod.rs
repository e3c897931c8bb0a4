//! Database connection seam.
//!
//! Workers only see [`Connection`] and [`ConnectionProvider`]; the
//! concurrency under test lives in the database behind them.
//!
//! # Example
//!
//! ```ignore
//! use lockscope_core::db::{ConnectionProvider, SqliteProvider};
//! use lockscope_core::DatabaseConfig;
//!
//! let provider = SqliteProvider::new();
//! let mut conn = provider.connect(1, &DatabaseConfig::new("sqlite:lock.db"))?;
//! let count = conn.update("update t set x = 1", Duration::from_secs(5))?;
//! conn.commit()?;
//! ```

mod error;
mod sqlite;
mod traits;

pub use error::DbError;
pub use sqlite::SqliteProvider;
pub use traits::{Connection, ConnectionProvider, RowSink};
