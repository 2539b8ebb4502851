//! Multi-row inserts with an explicit duplicate-key policy.
//!
//! A batch of N rows is sent as one `INSERT ... VALUES (..), (..)` statement.
//! Values are bound as positional parameters; a batch whose parameter count
//! exceeds the dialect's placeholder limit is rendered with escaped literals
//! instead (see [`literal`](super::literal)), still as a single statement.
//!
//! Warnings the server attaches to the statement are reduced into a
//! [`WarningReport`].

use crate::core::db::literal::{literal, quote_identifier, quote_table};
use crate::core::db::{Dialect, ServerWarning};
use crate::core::{DbError, Result, Value};
use serde::Serialize;
use std::fmt;

/// How the server should treat rows colliding on a unique or primary key.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum DupKeyAction {
    /// Statement is sent undecorated; a collision aborts it with a query error.
    #[default]
    Default,
    /// Colliding rows are skipped; the rest of the batch is inserted.
    Ignore,
    /// Colliding rows overwrite the existing record.
    Replace,
}

/// How row values are carried in the statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValuesMode {
    /// `?` placeholders with positional parameters
    Bound,
    /// Escaped literals in the statement text
    Literal,
}

/// A fully built bulk insert, ready for a driver.
#[derive(Debug, Clone, PartialEq)]
pub struct InsertStatement {
    pub sql: String,
    /// Positional parameters; empty in [`ValuesMode::Literal`].
    pub params: Vec<Value>,
    /// Number of rows the statement attempts to insert.
    pub row_count: usize,
    pub action: DupKeyAction,
    pub mode: ValuesMode,
}

/// Checks that every row has one value per column.
pub fn validate_rows<C, R>(columns: &[C], rows: &[R]) -> Result<()>
where
    C: AsRef<str>,
    R: AsRef<[Value]>,
{
    if columns.is_empty() {
        return Err(DbError::schema_mismatch("column list is empty"));
    }

    for (index, row) in rows.iter().enumerate() {
        let arity = row.as_ref().len();
        if arity != columns.len() {
            return Err(DbError::schema_mismatch(format!(
                "row {} has {} values but {} columns were named",
                index,
                arity,
                columns.len()
            )));
        }
    }
    Ok(())
}

/// Builds one statement inserting all `rows`, choosing the values mode from
/// the dialect's placeholder limit.
pub fn build_insert<C, R>(
    dialect: Dialect,
    table: &str,
    columns: &[C],
    rows: &[R],
    action: DupKeyAction,
) -> Result<InsertStatement>
where
    C: AsRef<str>,
    R: AsRef<[Value]>,
{
    let mode = if rows.len().saturating_mul(columns.len()) <= dialect.max_placeholders() {
        ValuesMode::Bound
    } else {
        ValuesMode::Literal
    };
    build_insert_with_mode(dialect, table, columns, rows, action, mode)
}

/// Builds one statement inserting all `rows` in the given values mode.
pub fn build_insert_with_mode<C, R>(
    dialect: Dialect,
    table: &str,
    columns: &[C],
    rows: &[R],
    action: DupKeyAction,
    mode: ValuesMode,
) -> Result<InsertStatement>
where
    C: AsRef<str>,
    R: AsRef<[Value]>,
{
    validate_rows(columns, rows)?;
    if rows.is_empty() {
        return Err(DbError::schema_mismatch("no rows to insert"));
    }

    let column_list = columns
        .iter()
        .map(|c| quote_identifier(dialect, c.as_ref()))
        .collect::<Vec<_>>()
        .join(", ");

    let mut sql = format!(
        "{} INTO {} ({}) VALUES ",
        dialect.insert_verb(action),
        quote_table(dialect, table),
        column_list
    );
    let mut params = Vec::new();

    match mode {
        ValuesMode::Bound => {
            let tuple = format!("({})", vec!["?"; columns.len()].join(", "));
            params.reserve(rows.len() * columns.len());
            for (index, row) in rows.iter().enumerate() {
                if index > 0 {
                    sql.push_str(", ");
                }
                sql.push_str(&tuple);
                params.extend(row.as_ref().iter().cloned());
            }
        }
        ValuesMode::Literal => {
            for (index, row) in rows.iter().enumerate() {
                if index > 0 {
                    sql.push_str(", ");
                }
                let values = row
                    .as_ref()
                    .iter()
                    .map(|v| literal(dialect, v))
                    .collect::<Result<Vec<_>>>()?;
                sql.push('(');
                sql.push_str(&values.join(", "));
                sql.push(')');
            }
        }
    }

    Ok(InsertStatement {
        sql,
        params,
        row_count: rows.len(),
        action,
        mode,
    })
}

/// Header-prefixed list of server warnings for one statement.
///
/// A report always holds at least one warning; [`WarningReport::from_warnings`]
/// returns `None` for an empty list. [`len`](Self::len) counts the header row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WarningReport {
    warnings: Vec<ServerWarning>,
}

impl WarningReport {
    /// Column names of the header row.
    pub const HEADER: [&'static str; 3] = ["Level", "Code", "Message"];

    pub fn from_warnings(warnings: Vec<ServerWarning>) -> Option<Self> {
        if warnings.is_empty() {
            None
        } else {
            Some(WarningReport { warnings })
        }
    }

    /// Number of rows including the header.
    pub fn len(&self) -> usize {
        self.warnings.len() + 1
    }

    /// Always `false`: the header row is always present.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// The server warnings, in the order the server reported them.
    pub fn warnings(&self) -> &[ServerWarning] {
        &self.warnings
    }

    /// All rows as `(level, code, message)` text triples, header first.
    pub fn rows(&self) -> impl Iterator<Item = (String, String, String)> + '_ {
        let [level, code, message] = Self::HEADER;
        std::iter::once((level.to_string(), code.to_string(), message.to_string())).chain(
            self.warnings
                .iter()
                .map(|w| (w.level.clone(), w.code.to_string(), w.message.clone())),
        )
    }

    /// Number of warnings carrying the given server code.
    pub fn count_code(&self, code: u32) -> usize {
        self.warnings.iter().filter(|w| w.code == code).count()
    }
}

impl fmt::Display for WarningReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, (level, code, message)) in self.rows().enumerate() {
            if index > 0 {
                writeln!(f)?;
            }
            write!(f, "{}\t{}\t{}", level, code, message)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::row;

    fn columns() -> Vec<&'static str> {
        vec!["col1", "col2"]
    }

    #[test]
    fn test_bound_statement_shape() {
        let rows = vec![row![10, "col1"], row![20, "col2"], row![30, "col3"]];
        let stmt = build_insert(Dialect::MySql, "unittest", &columns(), &rows, DupKeyAction::Default).unwrap();

        insta::assert_snapshot!(stmt.sql, @"INSERT INTO `unittest` (`col1`, `col2`) VALUES (?, ?), (?, ?), (?, ?)");
        assert_eq!(stmt.mode, ValuesMode::Bound);
        assert_eq!(stmt.row_count, 3);
        assert_eq!(stmt.params.len(), 6);
        assert_eq!(stmt.params[4], Value::Int(30));
        assert_eq!(stmt.params[5], Value::Text("col3".to_string()));
    }

    #[test]
    fn test_policy_decorates_statement() {
        let rows = vec![row![10, "newCol1"]];
        let ignore = build_insert(Dialect::MySql, "t", &columns(), &rows, DupKeyAction::Ignore).unwrap();
        assert!(ignore.sql.starts_with("INSERT IGNORE INTO `t`"));

        let replace = build_insert(Dialect::MySql, "t", &columns(), &rows, DupKeyAction::Replace).unwrap();
        assert!(replace.sql.starts_with("REPLACE INTO `t`"));

        let sqlite = build_insert(Dialect::Sqlite, "t", &columns(), &rows, DupKeyAction::Ignore).unwrap();
        assert_eq!(sqlite.sql, "INSERT OR IGNORE INTO \"t\" (\"col1\", \"col2\") VALUES (?, ?)");
    }

    #[test]
    fn test_literal_mode() {
        let rows = vec![row![1, "it's"], row![2, None::<String>]];
        let stmt = build_insert_with_mode(
            Dialect::MySql,
            "t",
            &columns(),
            &rows,
            DupKeyAction::Default,
            ValuesMode::Literal,
        )
        .unwrap();
        assert_eq!(
            stmt.sql,
            "INSERT INTO `t` (`col1`, `col2`) VALUES (1, 'it''s'), (2, NULL)"
        );
        assert!(stmt.params.is_empty());
    }

    #[test]
    fn test_mode_switches_past_placeholder_limit() {
        let rows: Vec<_> = (0..16_384).map(|i| row![i, "x"]).collect();
        let stmt = build_insert(Dialect::Sqlite, "t", &columns(), &rows, DupKeyAction::Default).unwrap();
        assert_eq!(stmt.mode, ValuesMode::Literal);
        assert_eq!(stmt.row_count, 16_384);

        let stmt = build_insert(Dialect::MySql, "t", &columns(), &rows, DupKeyAction::Default).unwrap();
        assert_eq!(stmt.mode, ValuesMode::Bound);
    }

    #[test]
    fn test_arity_mismatch_is_rejected() {
        let rows = vec![row![10, "ok"], row![20]];
        let err = build_insert(Dialect::MySql, "t", &columns(), &rows, DupKeyAction::Default).unwrap_err();
        match err {
            DbError::SchemaMismatch(msg) => assert!(msg.contains("row 1 has 1 values but 2 columns")),
            other => panic!("Expected SchemaMismatch, got {:?}", other),
        }

        let no_columns: Vec<&str> = Vec::new();
        assert!(matches!(
            validate_rows(&no_columns, &[row![]]),
            Err(DbError::SchemaMismatch(_))
        ));
    }

    #[test]
    fn test_warning_report() {
        assert!(WarningReport::from_warnings(Vec::new()).is_none());

        let report = WarningReport::from_warnings(vec![ServerWarning::new(
            "Warning",
            1062,
            "Duplicate entry '10' for key 'PRIMARY'",
        )])
        .unwrap();
        assert_eq!(report.len(), 2);
        assert_eq!(report.count_code(1062), 1);

        let rows: Vec<_> = report.rows().collect();
        assert_eq!(rows[0], ("Level".to_string(), "Code".to_string(), "Message".to_string()));
        assert_eq!(rows[1].1, "1062");

        assert_eq!(
            report.to_string(),
            "Level\tCode\tMessage\nWarning\t1062\tDuplicate entry '10' for key 'PRIMARY'"
        );
    }
}
