//! Identifier quoting and literal rendering.
//!
//! Identifiers are wrapped in the dialect's quote character with embedded
//! quote characters doubled (`` `my``col` `` for MySQL, `"my""col"` for
//! SQLite). Dotted table names are quoted part by part.
//!
//! Literal rules:
//! - strings are single-quoted, `'` becomes `''`
//! - MySQL additionally escapes backslash, NUL, LF, CR and Ctrl-Z with a
//!   backslash, since backslash is an escape character there
//! - blobs are hex literals `X'..'`
//! - JSON values are rendered as escaped strings of their compact text
//! - integers and floats are unquoted; non-finite floats are rejected

use crate::core::value::hex;
use crate::core::db::Dialect;
use crate::core::{DbError, Result, Value};

/// Quotes a single identifier (column name, unqualified table name).
///
/// The name is taken verbatim: surrounding whitespace and quote characters
/// are part of it and get quoted like any other character.
pub fn quote_identifier(dialect: Dialect, identifier: &str) -> String {
    let quote = dialect.identifier_quote();
    let mut quoted = String::with_capacity(identifier.len() + 2);
    quoted.push(quote);
    for c in identifier.chars() {
        if c == quote {
            quoted.push(quote);
        }
        quoted.push(c);
    }
    quoted.push(quote);
    quoted
}

/// Quotes a possibly schema-qualified table name (`db.table`).
pub fn quote_table(dialect: Dialect, table: &str) -> String {
    match table.split_once('.') {
        Some((schema, name)) if !schema.is_empty() && !name.is_empty() => format!(
            "{}.{}",
            quote_identifier(dialect, schema),
            quote_identifier(dialect, name)
        ),
        _ => quote_identifier(dialect, table),
    }
}

/// Renders a value as a SQL literal.
pub fn literal(dialect: Dialect, value: &Value) -> Result<String> {
    match value {
        Value::Null => Ok("NULL".to_string()),
        Value::Int(i) => Ok(i.to_string()),
        Value::Float(f) if f.is_finite() => Ok(format!("{:?}", f)),
        Value::Float(f) => Err(DbError::InvalidValue(format!(
            "{} has no SQL literal form",
            f
        ))),
        Value::Text(s) => Ok(string_literal(dialect, s)),
        Value::Blob(b) => Ok(format!("X'{}'", hex(b))),
        Value::Json(j) => Ok(string_literal(dialect, &j.to_string())),
    }
}

/// Quotes and escapes a string literal.
pub fn string_literal(dialect: Dialect, s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('\'');
    for c in s.chars() {
        match c {
            '\'' => out.push_str("''"),
            '\\' if dialect.backslash_escapes() => out.push_str("\\\\"),
            '\0' if dialect.backslash_escapes() => out.push_str("\\0"),
            '\n' if dialect.backslash_escapes() => out.push_str("\\n"),
            '\r' if dialect.backslash_escapes() => out.push_str("\\r"),
            '\x1a' if dialect.backslash_escapes() => out.push_str("\\Z"),
            _ => out.push(c),
        }
    }
    out.push('\'');
    out
}
