/// Error Module
///
/// This module defines the error type shared by every layer of the crate:
/// configuration, connection management, statement execution, schema
/// translation and bulk inserts. Server-originated failures keep the
/// original server code and message.
use thiserror::Error;

/// MySQL error code for a duplicate entry on a unique or primary key.
pub const ER_DUP_ENTRY: i32 = 1062;

/// SQLite extended result codes for unique and primary key violations.
pub const SQLITE_CONSTRAINT_PRIMARYKEY: i32 = 1555;
pub const SQLITE_CONSTRAINT_UNIQUE: i32 = 2067;

/// Error type for all database helper operations.
///
/// The variants follow the failure taxonomy of the helper layer:
/// - Bad or missing connection parameters (`Config`)
/// - Unreachable server, rejected credentials, broken session (`Connection`)
/// - Malformed or server-rejected statements (`Query`)
/// - Caller-provided rows that do not match the column list (`SchemaMismatch`)
/// - Operations on a connection that was already closed (`Closed`)
#[derive(Error, Debug)]
pub enum DbError {
    /// Configuration loading and validation errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Connection establishment and session errors
    #[error("Connection error: {message}")]
    Connection {
        message: String,
        code: Option<i32>,
    },

    /// Statement errors reported by the server or the client library
    #[error("Query error: {message}")]
    Query {
        message: String,
        code: Option<i32>,
        state: Option<String>,
    },

    /// Row arity does not match the column list of a bulk insert
    #[error("Schema mismatch: {0}")]
    SchemaMismatch(String),

    /// A value that cannot be written as a SQL literal
    #[error("Invalid value: {0}")]
    InvalidValue(String),

    /// The connection has been closed
    #[error("Connection is closed")]
    Closed,

    /// File system and I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encoding errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl DbError {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a connection error without a server code.
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::Connection {
            message: msg.into(),
            code: None,
        }
    }

    /// Create a query error without a server code.
    pub fn query(msg: impl Into<String>) -> Self {
        Self::Query {
            message: msg.into(),
            code: None,
            state: None,
        }
    }

    /// Create a schema mismatch error.
    pub fn schema_mismatch(msg: impl Into<String>) -> Self {
        Self::SchemaMismatch(msg.into())
    }

    /// The server error code attached to this error, if any.
    pub fn code(&self) -> Option<i32> {
        match self {
            Self::Connection { code, .. } | Self::Query { code, .. } => *code,
            _ => None,
        }
    }

    /// Whether this is a unique or primary key collision.
    pub fn is_duplicate_key(&self) -> bool {
        matches!(
            self,
            Self::Query {
                code: Some(ER_DUP_ENTRY | SQLITE_CONSTRAINT_PRIMARYKEY | SQLITE_CONSTRAINT_UNIQUE),
                ..
            }
        )
    }
}

/// Type alias for Result to use DbError as the error type.
pub type Result<T> = std::result::Result<T, DbError>;
