/// # Test Utilities Module
///
/// Shared fixtures for the crate's unit and integration tests:
/// - `DatabaseFixture`: an in-memory SQLite connection with the standard
///   `unittest` table
/// - `RecordingDriver`: a driver that records statements instead of running them
/// - Error assertion helpers
use crate::core::db::{Connection, Dialect, Driver, RowStream, Schema, ServerWarning};
use crate::core::{Result, Row, Value};
use crate::row;
use std::sync::{Arc, Mutex};

/// Name of the standard fixture table.
pub const TABLE: &str = "unittest";

/// `{col1: INT, col2: TEXT}`
pub fn standard_schema() -> Schema {
    Schema::new().column("col1", "INT").column("col2", "TEXT")
}

/// `{col1: INT PRIMARY KEY, col2: TEXT}`
pub fn keyed_schema() -> Schema {
    Schema::new().column("col1", "INT PRIMARY KEY").column("col2", "TEXT")
}

/// `(10,'col1'), (20,'col2'), (30,'col3')`
pub fn standard_rows() -> Vec<Row> {
    vec![row![10, "col1"], row![20, "col2"], row![30, "col3"]]
}

pub const STANDARD_COLUMNS: [&str; 2] = ["col1", "col2"];

/// Isolated database test fixture
pub struct DatabaseFixture {
    pub conn: Connection,
}

impl DatabaseFixture {
    /// Empty in-memory database
    pub fn new() -> Result<Self> {
        Ok(DatabaseFixture {
            conn: Connection::open_in_memory()?,
        })
    }

    /// `unittest` table created from `schema` with the three standard rows
    pub fn with_table(schema: &Schema) -> Result<Self> {
        let mut fixture = Self::new()?;
        fixture.conn.create_table(TABLE, schema, false)?;
        fixture
            .conn
            .bulk_insert(TABLE, &STANDARD_COLUMNS, &standard_rows(), Default::default())?;
        Ok(fixture)
    }

    /// Standard table with `col1` as primary key
    pub fn keyed() -> Result<Self> {
        Self::with_table(&keyed_schema())
    }

    /// All rows of `sql`, collected
    pub fn rows(&mut self, sql: &str) -> Result<Vec<Row>> {
        self.conn.query(sql)?.collect()
    }
}

/// What a [`RecordingDriver`] saw.
#[derive(Debug, Default)]
struct Recorded {
    statements: Vec<String>,
    warnings: Vec<ServerWarning>,
    closes: usize,
}

/// Handle for inspecting a [`RecordingDriver`] after it moved into a connection.
#[derive(Debug, Clone, Default)]
pub struct DriverLog(Arc<Mutex<Recorded>>);

impl DriverLog {
    pub fn statements(&self) -> Vec<String> {
        self.0.lock().unwrap().statements.clone()
    }

    pub fn closes(&self) -> usize {
        self.0.lock().unwrap().closes
    }

    /// Queues a warning for the next `warnings()` call.
    pub fn push_warning(&self, warning: ServerWarning) {
        self.0.lock().unwrap().warnings.push(warning);
    }
}

/// Driver that records every statement and returns empty results.
#[derive(Debug)]
pub struct RecordingDriver {
    dialect: Dialect,
    log: DriverLog,
}

impl RecordingDriver {
    pub fn new(dialect: Dialect) -> (Self, DriverLog) {
        let log = DriverLog::default();
        (
            RecordingDriver {
                dialect,
                log: log.clone(),
            },
            log,
        )
    }
}

struct NoRows {
    columns: Vec<String>,
}

impl RowStream for NoRows {
    fn columns(&self) -> &[String] {
        &self.columns
    }

    fn next_row(&mut self) -> Result<Option<Row>> {
        Ok(None)
    }
}

impl Driver for RecordingDriver {
    fn dialect(&self) -> Dialect {
        self.dialect
    }

    fn execute(&mut self, sql: &str, _params: &[Value]) -> Result<u64> {
        self.log.0.lock().unwrap().statements.push(sql.to_string());
        Ok(1)
    }

    fn query<'a>(&'a mut self, sql: &str, _params: &[Value]) -> Result<Box<dyn RowStream + 'a>> {
        self.log.0.lock().unwrap().statements.push(sql.to_string());
        Ok(Box::new(NoRows { columns: Vec::new() }))
    }

    fn warnings(&mut self) -> Result<Vec<ServerWarning>> {
        Ok(std::mem::take(&mut self.log.0.lock().unwrap().warnings))
    }

    fn close(self: Box<Self>) -> Result<()> {
        self.log.0.lock().unwrap().closes += 1;
        Ok(())
    }
}

/// Error testing utilities
pub mod error_testing {
    /// Assert that an error's message contains `fragment` (case-insensitive)
    pub fn assert_error_mentions<T, E>(result: &std::result::Result<T, E>, fragment: &str, context: &str)
    where
        E: std::fmt::Display,
    {
        match result {
            Ok(_) => panic!("Expected error but got Ok in {}", context),
            Err(e) => {
                let error_str = e.to_string();
                assert!(
                    error_str.to_lowercase().contains(&fragment.to_lowercase()),
                    "Expected '{}' in error message '{}', context: {}",
                    fragment,
                    error_str,
                    context
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixture_has_standard_rows() {
        let mut fixture = DatabaseFixture::with_table(&standard_schema()).unwrap();
        let rows = fixture.rows("SELECT col1, col2 FROM unittest").unwrap();
        assert_eq!(rows, standard_rows());
    }

    #[test]
    fn test_recording_driver_logs_statements() {
        let (mut driver, log) = RecordingDriver::new(Dialect::MySql);
        driver.execute("SELECT 1", &[]).unwrap();
        log.push_warning(ServerWarning::new("Note", 1051, "Unknown table"));
        assert_eq!(driver.warnings().unwrap().len(), 1);
        assert!(driver.warnings().unwrap().is_empty());
        Box::new(driver).close().unwrap();
        assert_eq!(log.statements(), vec!["SELECT 1".to_string()]);
        assert_eq!(log.closes(), 1);
    }
}
