/// Database Module
///
/// The data-access layer, organized into focused submodules:
///
/// - **Connection Management** (`connection.rs`): the owned session and every
///   helper operation on it
/// - **Schema Translation** (`schema.rs`): ordered column maps to DDL
/// - **Query Execution** (`query.rs`): lazy cursors over result sets
/// - **Bulk Insert** (`bulk.rs`): multi-row inserts and warning reports
/// - **Drivers** (`driver.rs`, `mysql_driver.rs`, `sqlite_driver.rs`): the
///   client-library boundary and its MySQL and SQLite backends
///
/// ## Error Handling
///
/// All operations return [`DbError`](crate::core::DbError); driver errors keep
/// the server's code and message.
pub mod bulk;
pub mod connection;
pub mod driver;
pub mod literal;
pub mod mysql_driver;
pub mod query;
pub mod schema;
pub mod sqlite_driver;

pub use bulk::{DupKeyAction, InsertStatement, ValuesMode, WarningReport};
pub use connection::Connection;
pub use driver::{Dialect, Driver, RowStream, ServerWarning};
pub use mysql_driver::MySqlDriver;
pub use query::{Fetch, QueryIterator, StatementType};
pub use schema::Schema;
pub use sqlite_driver::SqliteDriver;
