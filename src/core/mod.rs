/// Core Module
///
/// Shared infrastructure for the helper: the database layer, value types
/// and the error type.
pub mod db;
pub mod error;
pub mod value;

// Re-export commonly used types for convenience
pub use db::Connection;
pub use error::{DbError, Result};
pub use value::{Row, Value};
