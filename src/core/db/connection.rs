/// Connection Management Module
///
/// An owned database session. Every helper operation runs through a
/// [`Connection`]; dropping it releases the session.
use crate::config::{Config, MySqlConfig};
use crate::core::db::bulk::{build_insert, build_insert_with_mode, validate_rows, DupKeyAction, ValuesMode, WarningReport};
use crate::core::db::literal::{quote_identifier, quote_table};
use crate::core::db::schema::{create_table_sql, drop_table_sql, truncate_table_sql, Schema};
use crate::core::db::{Dialect, Driver, MySqlDriver, QueryIterator, SqliteDriver};
use crate::core::{DbError, Result, Row, Value};
use std::path::Path;
use tracing::{debug, info, warn};

/// Longest statement prefix written to the log.
const SQL_LOG_LIMIT: usize = 200;

fn sql_preview(sql: &str) -> &str {
    match sql.char_indices().nth(SQL_LOG_LIMIT) {
        Some((end, _)) => &sql[..end],
        None => sql,
    }
}

/// A session with one database server.
///
/// A `Connection` is `Send` but meant for a single worker at a time; the
/// [`QueryIterator`] returned by [`query`](Self::query) borrows it mutably
/// until dropped.
pub struct Connection {
    driver: Option<Box<dyn Driver>>,
    dialect: Dialect,
    endpoint: String,
}

impl Connection {
    /// Opens a MySQL session.
    ///
    /// # Errors
    ///
    /// `DbError::Config` when host, user or database is missing;
    /// `DbError::Connection` when the server is unreachable or rejects the login.
    pub fn connect_mysql(config: &MySqlConfig) -> Result<Self> {
        let driver = MySqlDriver::connect(config)?;
        let endpoint = format!(
            "mysql://{}@{}:{}/{}",
            config.user.as_deref().unwrap_or_default(),
            config.host.as_deref().unwrap_or_default(),
            config.port(),
            config.database.as_deref().unwrap_or_default()
        );
        Ok(Self::open(Box::new(driver), endpoint))
    }

    /// Opens (creating if needed) a SQLite database file.
    pub fn open_sqlite<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let driver = SqliteDriver::open(path)?;
        Ok(Self::open(Box::new(driver), format!("sqlite://{}", path.display())))
    }

    /// Opens a private in-memory SQLite database.
    pub fn open_in_memory() -> Result<Self> {
        let driver = SqliteDriver::open_in_memory()?;
        Ok(Self::open(Box::new(driver), "sqlite://:memory:".to_string()))
    }

    /// Opens the backend named by `config`: the `[mysql]` section if present,
    /// otherwise `[sqlite]`.
    pub fn from_config(config: &Config) -> Result<Self> {
        match (&config.mysql, &config.sqlite) {
            (Some(mysql), _) => Self::connect_mysql(mysql),
            (None, Some(sqlite)) => Self::open_sqlite(&sqlite.path),
            (None, None) => Err(DbError::config(
                "configuration names no database: expected a [mysql] or [sqlite] section",
            )),
        }
    }

    /// Wraps a custom driver.
    pub fn with_driver(driver: Box<dyn Driver>) -> Self {
        let endpoint = format!("{:?} driver", driver.dialect());
        Self::open(driver, endpoint)
    }

    fn open(driver: Box<dyn Driver>, endpoint: String) -> Self {
        let dialect = driver.dialect();
        info!(endpoint = %endpoint, "connection opened");
        Connection {
            driver: Some(driver),
            dialect,
            endpoint,
        }
    }

    fn driver(&mut self) -> Result<&mut Box<dyn Driver>> {
        self.driver.as_mut().ok_or(DbError::Closed)
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    pub fn is_closed(&self) -> bool {
        self.driver.is_none()
    }

    /// Releases the session. Closing an already closed connection is a no-op.
    pub fn close(&mut self) -> Result<()> {
        match self.driver.take() {
            Some(driver) => {
                info!(endpoint = %self.endpoint, "connection closed");
                driver.close()
            }
            None => {
                debug!(endpoint = %self.endpoint, "close on a closed connection ignored");
                Ok(())
            }
        }
    }

    /// Executes one statement without parameters and returns the
    /// affected-row count.
    pub fn execute(&mut self, sql: &str) -> Result<u64> {
        self.execute_params(sql, &[])
    }

    /// Executes one statement, binding `params` to its `?` placeholders.
    pub fn execute_params(&mut self, sql: &str, params: &[Value]) -> Result<u64> {
        let driver = self.driver()?;
        debug!(sql = sql_preview(sql), params = params.len(), "execute");
        driver.execute(sql, params)
    }

    /// Runs a row-returning statement and returns a lazy cursor over it.
    pub fn query(&mut self, sql: &str) -> Result<QueryIterator<'_>> {
        self.query_params(sql, &[])
    }

    /// Runs a row-returning statement with bound parameters.
    pub fn query_params(&mut self, sql: &str, params: &[Value]) -> Result<QueryIterator<'_>> {
        let driver = self.driver()?;
        debug!(sql = sql_preview(sql), params = params.len(), "query");
        let stream = driver.query(sql, params)?;
        Ok(QueryIterator::new(stream))
    }

    /// Creates `table` with the columns of `schema`, in schema order.
    pub fn create_table(&mut self, table: &str, schema: &Schema, temporary: bool) -> Result<()> {
        let sql = create_table_sql(self.dialect, table, schema, temporary);
        self.execute(&sql).map(|_| ())
    }

    /// Drops `table`; a missing table is not an error.
    pub fn drop_table(&mut self, table: &str) -> Result<()> {
        let sql = drop_table_sql(self.dialect, table);
        self.execute(&sql).map(|_| ())
    }

    /// Deletes every row of `table`.
    pub fn truncate_table(&mut self, table: &str) -> Result<()> {
        let sql = truncate_table_sql(self.dialect, table);
        self.execute(&sql).map(|_| ())
    }

    /// Inserts a single row given as ordered `(column, value)` pairs.
    pub fn insert<C: AsRef<str>>(&mut self, table: &str, values: &[(C, Value)]) -> Result<u64> {
        let columns: Vec<&str> = values.iter().map(|(c, _)| c.as_ref()).collect();
        let row: Row = values.iter().map(|(_, v)| v.clone()).collect();

        let stmt = build_insert_with_mode(
            self.dialect,
            table,
            &columns,
            &[row],
            DupKeyAction::Default,
            ValuesMode::Bound,
        )?;
        self.execute_params(&stmt.sql, &stmt.params)
    }

    /// `UPDATE <table> SET <column> = ?`, optionally restricted by a raw
    /// `WHERE` clause (without the keyword).
    pub fn update(
        &mut self,
        table: &str,
        column: &str,
        value: impl Into<Value>,
        where_clause: Option<&str>,
    ) -> Result<u64> {
        let mut sql = format!(
            "UPDATE {} SET {} = ?",
            quote_table(self.dialect, table),
            quote_identifier(self.dialect, column)
        );
        if let Some(condition) = where_clause.map(str::trim).filter(|c| !c.is_empty()) {
            sql.push_str(" WHERE ");
            sql.push_str(condition);
        }
        self.execute_params(&sql, &[value.into()])
    }

    /// Inserts all `rows` in one statement.
    ///
    /// Returns `None` when the server reported no warnings, otherwise the
    /// warnings in server order. An empty `rows` slice is a no-op returning
    /// `None`, whatever `columns` holds.
    ///
    /// # Errors
    ///
    /// `DbError::SchemaMismatch` if a row's length differs from
    /// `columns.len()`, before anything is sent. With
    /// [`DupKeyAction::Default`], a key collision fails the statement with
    /// `DbError::Query`.
    pub fn bulk_insert<C, R>(
        &mut self,
        table: &str,
        columns: &[C],
        rows: &[R],
        on_dup_key: DupKeyAction,
    ) -> Result<Option<WarningReport>>
    where
        C: AsRef<str>,
        R: AsRef<[Value]>,
    {
        let dialect = self.dialect;
        let driver = self.driver()?;
        if rows.is_empty() {
            debug!(table, "bulk insert of zero rows skipped");
            return Ok(None);
        }
        validate_rows(columns, rows)?;

        let stmt = build_insert(dialect, table, columns, rows, on_dup_key)?;
        debug!(
            table,
            rows = stmt.row_count,
            policy = ?on_dup_key,
            mode = ?stmt.mode,
            sql = sql_preview(&stmt.sql),
            "bulk insert"
        );
        driver.execute_insert(&stmt)?;

        let report = WarningReport::from_warnings(driver.warnings()?);
        if let Some(report) = &report {
            warn!(table, warnings = report.warnings().len(), "bulk insert produced warnings");
        }
        Ok(report)
    }

    /// Warnings attached to the most recent statement.
    ///
    /// Reading them through a bulk insert's report consumes them on drivers
    /// that do not keep a server-side diagnostics area.
    pub fn last_warnings(&mut self) -> Result<Option<WarningReport>> {
        let warnings = self.driver()?.warnings()?;
        Ok(WarningReport::from_warnings(warnings))
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        if let Some(driver) = self.driver.take() {
            debug!(endpoint = %self.endpoint, "closing connection on drop");
            if let Err(e) = driver.close() {
                warn!(endpoint = %self.endpoint, error = %e, "failed to close connection");
            }
        }
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("endpoint", &self.endpoint)
            .field("dialect", &self.dialect)
            .field("closed", &self.is_closed())
            .finish()
    }
}
