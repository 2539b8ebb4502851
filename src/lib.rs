//! Data-access helper for MySQL, with an embedded SQLite backend.
//!
//! A [`Connection`] owns one database session and offers DDL from ordered
//! schemas, parameterized statements, lazy query cursors, and multi-row
//! inserts with a duplicate-key policy.
//!
//! ```
//! use mysql_utils::{row, Connection, DupKeyAction, Schema};
//!
//! let mut conn = Connection::open_in_memory()?;
//! let schema = Schema::new().column("col1", "INT PRIMARY KEY").column("col2", "TEXT");
//! conn.create_table("unittest", &schema, false)?;
//!
//! let rows = vec![row![10, "col1"], row![20, "col2"]];
//! let report = conn.bulk_insert("unittest", &["col1", "col2"], &rows, DupKeyAction::Default)?;
//! assert!(report.is_none());
//!
//! let names: Vec<_> = conn.query("SELECT col2 FROM unittest ORDER BY col1")?.collect::<Result<_, _>>()?;
//! assert_eq!(names, vec![row!["col1"], row!["col2"]]);
//! # Ok::<(), mysql_utils::DbError>(())
//! ```

// Core infrastructure modules
pub mod config;
pub mod core;

#[cfg(test)]
mod test_utils;

pub use crate::config::{load_config, Config, MySqlConfig, SqliteConfig};
pub use crate::core::db::{
    Connection, Dialect, Driver, DupKeyAction, Fetch, QueryIterator, RowStream, Schema,
    ServerWarning, StatementType, WarningReport,
};
pub use crate::core::{DbError, Result, Row, Value};
