/// MySQL Driver Module
///
/// Backend over the synchronous `mysql` client. Query results are streamed:
/// each row is read off the socket when the caller pulls it. Statements
/// without parameters go over the text protocol; parameterized ones are
/// prepared and executed over the binary protocol.
use crate::config::MySqlConfig;
use crate::core::db::{Dialect, Driver, RowStream, ServerWarning};
use crate::core::{DbError, Result, Row, Value};
use mysql::consts::ColumnType;
use mysql::prelude::Queryable;
use mysql::{Conn, OptsBuilder, Params};
use tracing::debug;

/// Character set id MySQL reports for binary string columns.
const BINARY_CHARSET: u16 = 63;

impl From<mysql::Error> for DbError {
    fn from(err: mysql::Error) -> Self {
        match err {
            mysql::Error::MySqlError(e) => DbError::Query {
                message: e.message,
                code: Some(e.code.into()),
                state: Some(e.state),
            },
            mysql::Error::IoError(e) => DbError::Connection {
                message: e.to_string(),
                code: None,
            },
            mysql::Error::UrlError(e) => DbError::Config(e.to_string()),
            other => DbError::query(other.to_string()),
        }
    }
}

/// Errors raised while establishing the session are connection errors,
/// including server-side rejections such as bad credentials.
fn connect_error(err: mysql::Error) -> DbError {
    match err {
        mysql::Error::MySqlError(e) => DbError::Connection {
            message: e.message,
            code: Some(e.code.into()),
        },
        mysql::Error::UrlError(e) => DbError::Config(e.to_string()),
        other => DbError::connection(other.to_string()),
    }
}

fn to_mysql_value(value: &Value) -> mysql::Value {
    match value {
        Value::Null => mysql::Value::NULL,
        Value::Int(i) => mysql::Value::Int(*i),
        Value::Float(f) => mysql::Value::Double(*f),
        Value::Text(s) => mysql::Value::Bytes(s.as_bytes().to_vec()),
        Value::Blob(b) => mysql::Value::Bytes(b.clone()),
        Value::Json(j) => mysql::Value::Bytes(j.to_string().into_bytes()),
    }
}

fn positional(params: &[Value]) -> Params {
    Params::Positional(params.iter().map(to_mysql_value).collect())
}

fn format_date(column_type: ColumnType, date: (u16, u8, u8, u8, u8, u8, u32)) -> String {
    let (year, month, day, hour, minute, second, micros) = date;
    if column_type == ColumnType::MYSQL_TYPE_DATE {
        return format!("{:04}-{:02}-{:02}", year, month, day);
    }
    let mut out = format!(
        "{:04}-{:02}-{:02} {:02}:{:02}:{:02}",
        year, month, day, hour, minute, second
    );
    if micros > 0 {
        out.push_str(&format!(".{:06}", micros));
    }
    out
}

fn format_time(negative: bool, days: u32, hours: u8, minutes: u8, seconds: u8, micros: u32) -> String {
    let total_hours = u64::from(days) * 24 + u64::from(hours);
    let mut out = format!(
        "{}{:02}:{:02}:{:02}",
        if negative { "-" } else { "" },
        total_hours,
        minutes,
        seconds
    );
    if micros > 0 {
        out.push_str(&format!(".{:06}", micros));
    }
    out
}

fn text_or_blob(bytes: Vec<u8>) -> Value {
    String::from_utf8(bytes)
        .map(Value::Text)
        .unwrap_or_else(|e| Value::Blob(e.into_bytes()))
}

/// Decodes a value that arrived as raw bytes, using the column metadata.
fn decode_bytes(bytes: Vec<u8>, column_type: ColumnType, binary_charset: bool) -> Value {
    match column_type {
        ColumnType::MYSQL_TYPE_TINY
        | ColumnType::MYSQL_TYPE_SHORT
        | ColumnType::MYSQL_TYPE_LONG
        | ColumnType::MYSQL_TYPE_INT24
        | ColumnType::MYSQL_TYPE_LONGLONG
        | ColumnType::MYSQL_TYPE_YEAR => std::str::from_utf8(&bytes)
            .ok()
            .and_then(|s| s.parse::<i64>().ok())
            .map(Value::Int)
            .unwrap_or_else(|| text_or_blob(bytes)),
        ColumnType::MYSQL_TYPE_FLOAT | ColumnType::MYSQL_TYPE_DOUBLE => std::str::from_utf8(&bytes)
            .ok()
            .and_then(|s| s.parse::<f64>().ok())
            .map(Value::Float)
            .unwrap_or_else(|| text_or_blob(bytes)),
        ColumnType::MYSQL_TYPE_JSON => serde_json::from_slice(&bytes)
            .map(Value::Json)
            .unwrap_or_else(|_| text_or_blob(bytes)),
        ColumnType::MYSQL_TYPE_NULL => Value::Null,
        ColumnType::MYSQL_TYPE_BIT | ColumnType::MYSQL_TYPE_GEOMETRY => Value::Blob(bytes),
        ColumnType::MYSQL_TYPE_TINY_BLOB
        | ColumnType::MYSQL_TYPE_MEDIUM_BLOB
        | ColumnType::MYSQL_TYPE_LONG_BLOB
        | ColumnType::MYSQL_TYPE_BLOB
        | ColumnType::MYSQL_TYPE_VAR_STRING
        | ColumnType::MYSQL_TYPE_VARCHAR
        | ColumnType::MYSQL_TYPE_STRING
            if binary_charset =>
        {
            Value::Blob(bytes)
        }
        // DECIMAL, temporal types in text form, ENUM/SET and character strings
        _ => text_or_blob(bytes),
    }
}

fn convert_value(value: mysql::Value, column: &mysql::Column) -> Value {
    match value {
        mysql::Value::NULL => Value::Null,
        mysql::Value::Int(i) => Value::Int(i),
        mysql::Value::UInt(u) => i64::try_from(u)
            .map(Value::Int)
            .unwrap_or_else(|_| Value::Text(u.to_string())),
        mysql::Value::Float(f) => Value::Float(f.into()),
        mysql::Value::Double(d) => Value::Float(d),
        mysql::Value::Bytes(bytes) => decode_bytes(
            bytes,
            column.column_type(),
            column.character_set() == BINARY_CHARSET,
        ),
        mysql::Value::Date(y, mo, d, h, mi, s, us) => {
            Value::Text(format_date(column.column_type(), (y, mo, d, h, mi, s, us)))
        }
        mysql::Value::Time(neg, days, h, m, s, us) => Value::Text(format_time(neg, days, h, m, s, us)),
    }
}

fn convert_row(row: mysql::Row) -> Row {
    let columns = row.columns();
    mysql::Row::unwrap(row)
        .into_iter()
        .zip(columns.iter())
        .map(|(value, column)| convert_value(value, column))
        .collect()
}

/// Driver over a single `mysql::Conn`.
pub struct MySqlDriver {
    conn: Conn,
}

impl MySqlDriver {
    /// Validates the configuration and opens a session.
    ///
    /// # Errors
    ///
    /// `DbError::Config` for missing options, `DbError::Connection` when the
    /// server is unreachable or rejects the credentials.
    pub fn connect(config: &MySqlConfig) -> Result<Self> {
        config.validate()?;

        let opts = OptsBuilder::new()
            .ip_or_hostname(config.host.clone())
            .tcp_port(config.port())
            .user(config.user.clone())
            .pass(config.password.clone())
            .db_name(config.database.clone());

        let conn = Conn::new(opts).map_err(connect_error)?;
        debug!(connection_id = conn.connection_id(), "MySQL session established");
        Ok(MySqlDriver { conn })
    }
}

impl Driver for MySqlDriver {
    fn dialect(&self) -> Dialect {
        Dialect::MySql
    }

    fn execute(&mut self, sql: &str, params: &[Value]) -> Result<u64> {
        let affected = if params.is_empty() {
            let result = self.conn.query_iter(sql)?;
            result.affected_rows()
        } else {
            let result = self.conn.exec_iter(sql, positional(params))?;
            result.affected_rows()
        };
        Ok(affected)
    }

    fn query<'a>(&'a mut self, sql: &str, params: &[Value]) -> Result<Box<dyn RowStream + 'a>> {
        if params.is_empty() {
            let result = self.conn.query_iter(sql)?;
            let columns = column_names(result.columns().as_ref());
            Ok(Box::new(StreamedRows { inner: result, columns }))
        } else {
            let result = self.conn.exec_iter(sql, positional(params))?;
            let columns = column_names(result.columns().as_ref());
            Ok(Box::new(StreamedRows { inner: result, columns }))
        }
    }

    fn warnings(&mut self) -> Result<Vec<ServerWarning>> {
        let rows: Vec<(String, u32, String)> = self.conn.query("SHOW WARNINGS")?;
        Ok(rows
            .into_iter()
            .map(|(level, code, message)| ServerWarning::new(level, code, message))
            .collect())
    }

    fn close(self: Box<Self>) -> Result<()> {
        // Dropping the connection sends COM_QUIT
        drop(self.conn);
        Ok(())
    }
}

fn column_names(columns: &[mysql::Column]) -> Vec<String> {
    columns.iter().map(|c| c.name_str().into_owned()).collect()
}

/// Rows read off the wire one at a time.
struct StreamedRows<I> {
    inner: I,
    columns: Vec<String>,
}

impl<I> RowStream for StreamedRows<I>
where
    I: Iterator<Item = mysql::Result<mysql::Row>>,
{
    fn columns(&self) -> &[String] {
        &self.columns
    }

    fn next_row(&mut self) -> Result<Option<Row>> {
        match self.inner.next() {
            Some(row) => Ok(Some(convert_row(row?))),
            None => Ok(None),
        }
    }
}
