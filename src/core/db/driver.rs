/// Driver Module
///
/// The boundary between the helper layer and a database client library.
/// A driver executes statements with positional parameters, opens forward
/// cursors, and reports the warnings attached to the last statement.
use crate::core::db::bulk::{DupKeyAction, InsertStatement};
use crate::core::{Result, Row, Value};
use serde::Serialize;

/// SQL dialect spoken by a driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    MySql,
    Sqlite,
}

impl Dialect {
    /// Maximum number of `?` placeholders in one prepared statement.
    pub fn max_placeholders(self) -> usize {
        match self {
            Dialect::MySql => 65_535,
            Dialect::Sqlite => 32_766,
        }
    }

    /// Identifier quote character.
    pub fn identifier_quote(self) -> char {
        match self {
            Dialect::MySql => '`',
            Dialect::Sqlite => '"',
        }
    }

    /// Leading keywords of an insert statement under the given policy.
    pub fn insert_verb(self, action: DupKeyAction) -> &'static str {
        match (self, action) {
            (_, DupKeyAction::Default) => "INSERT",
            (Dialect::MySql, DupKeyAction::Ignore) => "INSERT IGNORE",
            (Dialect::MySql, DupKeyAction::Replace) => "REPLACE",
            (Dialect::Sqlite, DupKeyAction::Ignore) => "INSERT OR IGNORE",
            (Dialect::Sqlite, DupKeyAction::Replace) => "INSERT OR REPLACE",
        }
    }

    /// Statement prefix that empties a table.
    pub fn truncate_prefix(self) -> &'static str {
        match self {
            Dialect::MySql => "TRUNCATE TABLE",
            Dialect::Sqlite => "DELETE FROM",
        }
    }

    /// Whether backslash starts an escape sequence inside string literals.
    pub fn backslash_escapes(self) -> bool {
        matches!(self, Dialect::MySql)
    }
}

/// A warning the server attached to the most recent statement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServerWarning {
    /// Severity ("Note", "Warning", "Error")
    pub level: String,
    /// Server warning code
    pub code: u32,
    /// Human-readable message
    pub message: String,
}

impl ServerWarning {
    pub fn new(level: impl Into<String>, code: u32, message: impl Into<String>) -> Self {
        ServerWarning {
            level: level.into(),
            code,
            message: message.into(),
        }
    }
}

/// Forward-only source of result rows produced by a driver.
pub trait RowStream {
    /// Result column names.
    fn columns(&self) -> &[String];

    /// Fetches the next row, `Ok(None)` once the result set is exhausted.
    fn next_row(&mut self) -> Result<Option<Row>>;

    /// Total number of rows, when known before iteration finishes.
    fn row_count(&self) -> Option<u64> {
        None
    }
}

/// Database client library adapter owned by a [`Connection`](super::Connection).
pub trait Driver: Send {
    fn dialect(&self) -> Dialect;

    /// Executes one statement, binding `params` positionally. Returns the
    /// affected-row count.
    fn execute(&mut self, sql: &str, params: &[Value]) -> Result<u64>;

    /// Executes a bulk insert statement.
    fn execute_insert(&mut self, insert: &InsertStatement) -> Result<u64> {
        self.execute(&insert.sql, &insert.params)
    }

    /// Runs a row-returning statement and opens a cursor over its result.
    fn query<'a>(&'a mut self, sql: &str, params: &[Value]) -> Result<Box<dyn RowStream + 'a>>;

    /// Warnings attached to the most recently executed statement.
    fn warnings(&mut self) -> Result<Vec<ServerWarning>>;

    /// Releases the session.
    fn close(self: Box<Self>) -> Result<()>;
}
