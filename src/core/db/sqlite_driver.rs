/// SQLite Driver Module
///
/// Embedded backend over `rusqlite`. Results are buffered client-side.
/// SQLite has no warning channel, so rows skipped by `INSERT OR IGNORE`
/// are reported as synthesized warnings, one per skipped row.
use crate::core::db::bulk::{DupKeyAction, InsertStatement};
use crate::core::db::{Dialect, Driver, RowStream, ServerWarning};
use crate::core::error::SQLITE_CONSTRAINT_UNIQUE;
use crate::core::{DbError, Result, Row, Value};
use rusqlite::types::{ToSql, ToSqlOutput, ValueRef};
use rusqlite::{params_from_iter, Connection, OpenFlags};
use std::collections::VecDeque;
use std::path::Path;
use tracing::debug;

impl ToSql for Value {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            Value::Null => ToSqlOutput::Owned(rusqlite::types::Value::Null),
            Value::Int(i) => ToSqlOutput::from(*i),
            Value::Float(f) => ToSqlOutput::from(*f),
            Value::Text(s) => ToSqlOutput::from(s.as_str()),
            Value::Blob(b) => ToSqlOutput::from(b.as_slice()),
            Value::Json(j) => ToSqlOutput::from(j.to_string()),
        })
    }
}

fn extended_code(err: &rusqlite::Error) -> Option<i32> {
    match err {
        rusqlite::Error::SqliteFailure(failure, _) => Some(failure.extended_code),
        _ => None,
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(err: rusqlite::Error) -> Self {
        match err {
            rusqlite::Error::SqliteFailure(failure, message) => DbError::Query {
                message: message.unwrap_or_else(|| failure.to_string()),
                code: Some(failure.extended_code),
                state: None,
            },
            other => DbError::query(other.to_string()),
        }
    }
}

/// Converts a SQLite value for the result row
fn convert_value(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::Int(i),
        ValueRef::Real(f) => Value::Float(f),
        ValueRef::Text(t) => Value::Text(String::from_utf8_lossy(t).into_owned()),
        ValueRef::Blob(b) => Value::Blob(b.to_vec()),
    }
}

/// Driver over a `rusqlite::Connection`.
#[derive(Debug)]
pub struct SqliteDriver {
    conn: Connection,
    pending_warnings: Vec<ServerWarning>,
}

impl SqliteDriver {
    /// Opens (creating if needed) the database file at `path`;
    /// `":memory:"` opens a private in-memory database.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_CREATE
                | OpenFlags::SQLITE_OPEN_URI
                | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(|e| DbError::Connection {
            message: format!("cannot open {}: {}", path.display(), e),
            code: extended_code(&e),
        })?;
        Self::from_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|e| DbError::connection(e.to_string()))?;
        Self::from_connection(conn)
    }

    /// Wraps an already opened connection.
    pub fn from_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        Ok(SqliteDriver {
            conn,
            pending_warnings: Vec::new(),
        })
    }
}

impl Driver for SqliteDriver {
    fn dialect(&self) -> Dialect {
        Dialect::Sqlite
    }

    fn execute(&mut self, sql: &str, params: &[Value]) -> Result<u64> {
        self.pending_warnings.clear();
        let mut stmt = self.conn.prepare(sql)?;
        if stmt.column_count() > 0 {
            // Row-returning statements (SELECT, most PRAGMAs) are stepped to completion
            let mut rows = stmt.query(params_from_iter(params.iter()))?;
            while rows.next()?.is_some() {}
            return Ok(0);
        }
        let changed = stmt.execute(params_from_iter(params.iter()))?;
        Ok(changed as u64)
    }

    fn execute_insert(&mut self, insert: &InsertStatement) -> Result<u64> {
        let inserted = self.execute(&insert.sql, &insert.params)?;
        if insert.action == DupKeyAction::Ignore {
            let skipped = (insert.row_count as u64).saturating_sub(inserted);
            if skipped > 0 {
                debug!(skipped, "INSERT OR IGNORE skipped rows");
            }
            self.pending_warnings = (0..skipped)
                .map(|_| {
                    ServerWarning::new(
                        "Warning",
                        SQLITE_CONSTRAINT_UNIQUE as u32,
                        "Row skipped by INSERT OR IGNORE: constraint conflict",
                    )
                })
                .collect();
        }
        Ok(inserted)
    }

    fn query<'a>(&'a mut self, sql: &str, params: &[Value]) -> Result<Box<dyn RowStream + 'a>> {
        self.pending_warnings.clear();
        let mut stmt = self.conn.prepare(sql)?;
        let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
        let column_count = columns.len();

        let mut rows = VecDeque::new();
        let mut cursor = stmt.query(params_from_iter(params.iter()))?;
        while let Some(row) = cursor.next()? {
            let mut values = Vec::with_capacity(column_count);
            for i in 0..column_count {
                values.push(convert_value(row.get_ref(i)?));
            }
            rows.push_back(Row::new(values));
        }

        let total = rows.len() as u64;
        Ok(Box::new(BufferedRows { columns, rows, total }))
    }

    fn warnings(&mut self) -> Result<Vec<ServerWarning>> {
        Ok(std::mem::take(&mut self.pending_warnings))
    }

    fn close(self: Box<Self>) -> Result<()> {
        self.conn
            .close()
            .map_err(|(_, e)| DbError::connection(format!("close failed: {}", e)))
    }
}

/// Fully fetched result set.
struct BufferedRows {
    columns: Vec<String>,
    rows: VecDeque<Row>,
    total: u64,
}

impl RowStream for BufferedRows {
    fn columns(&self) -> &[String] {
        &self.columns
    }

    fn next_row(&mut self) -> Result<Option<Row>> {
        Ok(self.rows.pop_front())
    }

    fn row_count(&self) -> Option<u64> {
        Some(self.total)
    }
}
