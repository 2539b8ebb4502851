/// Query Module
///
/// Lazy, forward-only iteration over query results. A [`QueryIterator`]
/// pulls rows from the driver one at a time; whether the driver streams
/// them off the wire or buffers the whole set is the driver's concern.
use crate::core::db::RowStream;
use crate::core::{Result, Row};
use std::iter::FusedIterator;

/// Outcome of one fetch from a [`QueryIterator`].
#[derive(Debug, Clone, PartialEq)]
pub enum Fetch {
    /// The next result row
    Row(Row),
    /// The result set is exhausted
    End,
}

/// Single-pass cursor over the rows of one query.
///
/// The iterator mutably borrows the connection that produced it, so no
/// other statement can run on that connection until it is dropped. Past
/// the last row it keeps reporting end-of-sequence. A second pass needs a
/// new query.
pub struct QueryIterator<'c> {
    stream: Box<dyn RowStream + 'c>,
    fetched: u64,
    finished: bool,
}

impl<'c> QueryIterator<'c> {
    pub(crate) fn new(stream: Box<dyn RowStream + 'c>) -> Self {
        QueryIterator {
            stream,
            fetched: 0,
            finished: false,
        }
    }

    /// Fetches the next row.
    ///
    /// # Errors
    ///
    /// Returns the driver's error if the row could not be read. The cursor
    /// is exhausted afterwards.
    pub fn fetch(&mut self) -> Result<Fetch> {
        if self.finished {
            return Ok(Fetch::End);
        }

        match self.stream.next_row() {
            Ok(Some(row)) => {
                self.fetched += 1;
                Ok(Fetch::Row(row))
            }
            Ok(None) => {
                self.finished = true;
                Ok(Fetch::End)
            }
            Err(e) => {
                self.finished = true;
                Err(e)
            }
        }
    }

    /// Column names of the result set.
    pub fn columns(&self) -> &[String] {
        self.stream.columns()
    }

    /// Rows yielded so far.
    pub fn rows_fetched(&self) -> u64 {
        self.fetched
    }

    /// Total rows in the result, if the driver knows it before the end.
    pub fn result_count(&self) -> Option<u64> {
        if self.finished {
            Some(self.fetched)
        } else {
            self.stream.row_count()
        }
    }

    pub fn is_exhausted(&self) -> bool {
        self.finished
    }
}

impl Iterator for QueryIterator<'_> {
    type Item = Result<Row>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.fetch() {
            Ok(Fetch::Row(row)) => Some(Ok(row)),
            Ok(Fetch::End) => None,
            Err(e) => Some(Err(e)),
        }
    }
}

impl FusedIterator for QueryIterator<'_> {}

impl std::fmt::Debug for QueryIterator<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryIterator")
            .field("columns", &self.columns())
            .field("fetched", &self.fetched)
            .field("finished", &self.finished)
            .finish()
    }
}

/// Represents different SQL statement types for introspection
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StatementType {
    /// SELECT or WITH ... SELECT
    Select,
    /// SHOW, DESCRIBE/DESC, EXPLAIN, PRAGMA
    Introspection,
    /// INSERT or REPLACE
    Insert,
    /// UPDATE statement
    Update,
    /// DELETE statement
    Delete,
    /// CREATE statement
    Create,
    /// DROP statement
    Drop,
    /// TRUNCATE statement
    Truncate,
    /// ALTER statement
    Alter,
    /// Other statement types
    Other,
}

impl StatementType {
    /// Determines the statement type from a SQL string
    pub fn from_sql(sql: &str) -> Self {
        let keyword = sql
            .trim_start()
            .split(|c: char| c.is_whitespace() || c == '(')
            .next()
            .unwrap_or("")
            .to_uppercase();

        match keyword.as_str() {
            "SELECT" | "WITH" | "VALUES" => StatementType::Select,
            "SHOW" | "DESC" | "DESCRIBE" | "EXPLAIN" | "PRAGMA" => StatementType::Introspection,
            "INSERT" | "REPLACE" => StatementType::Insert,
            "UPDATE" => StatementType::Update,
            "DELETE" => StatementType::Delete,
            "CREATE" => StatementType::Create,
            "DROP" => StatementType::Drop,
            "TRUNCATE" => StatementType::Truncate,
            "ALTER" => StatementType::Alter,
            _ => StatementType::Other,
        }
    }

    /// Whether statements of this type produce a result set.
    pub fn returns_rows(self) -> bool {
        matches!(self, StatementType::Select | StatementType::Introspection)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::DbError;
    use crate::row;
    use std::collections::VecDeque;

    struct ScriptedStream {
        columns: Vec<String>,
        script: VecDeque<Result<Option<Row>>>,
        pulls: usize,
    }

    impl RowStream for ScriptedStream {
        fn columns(&self) -> &[String] {
            &self.columns
        }

        fn next_row(&mut self) -> Result<Option<Row>> {
            self.pulls += 1;
            self.script.pop_front().unwrap_or(Ok(None))
        }
    }

    fn iterator(script: Vec<Result<Option<Row>>>) -> QueryIterator<'static> {
        QueryIterator::new(Box::new(ScriptedStream {
            columns: vec!["col1".to_string(), "col2".to_string()],
            script: script.into(),
            pulls: 0,
        }))
    }

    #[test]
    fn test_rows_then_end() {
        let mut it = iterator(vec![Ok(Some(row![10, "col1"])), Ok(Some(row![20, "col2"]))]);
        assert_eq!(it.columns(), &["col1".to_string(), "col2".to_string()]);
        assert_eq!(it.fetch().unwrap(), Fetch::Row(row![10, "col1"]));
        assert_eq!(it.rows_fetched(), 1);
        assert_eq!(it.result_count(), None);
        assert_eq!(it.next().unwrap().unwrap(), row![20, "col2"]);
        assert!(it.next().is_none());
        assert!(it.is_exhausted());
        assert_eq!(it.result_count(), Some(2));

        // Exhaustion is sticky
        assert_eq!(it.fetch().unwrap(), Fetch::End);
        assert!(it.next().is_none());
    }

    #[test]
    fn test_error_ends_iteration() {
        let mut it = iterator(vec![
            Ok(Some(row![1, "a"])),
            Err(DbError::query("lost connection during query")),
            Ok(Some(row![2, "b"])),
        ]);
        assert!(it.next().unwrap().is_ok());
        assert!(matches!(it.next(), Some(Err(DbError::Query { .. }))));
        assert!(it.next().is_none());
    }

    #[test]
    fn test_rows_are_pulled_lazily() {
        let mut stream = ScriptedStream {
            columns: Vec::new(),
            script: vec![Ok(Some(row![1])), Ok(Some(row![2])), Ok(Some(row![3]))].into(),
            pulls: 0,
        };
        {
            let mut it = QueryIterator::new(Box::new(&mut stream));
            assert_eq!(it.next().unwrap().unwrap(), row![1]);
        }
        assert_eq!(stream.pulls, 1);
        assert_eq!(stream.script.len(), 2);
    }

    impl RowStream for &mut ScriptedStream {
        fn columns(&self) -> &[String] {
            &self.columns
        }

        fn next_row(&mut self) -> Result<Option<Row>> {
            (**self).next_row()
        }
    }

    #[test]
    fn test_statement_type_classification() {
        assert_eq!(StatementType::from_sql("SELECT * FROM users"), StatementType::Select);
        assert_eq!(StatementType::from_sql("  select col1 from t"), StatementType::Select);
        assert_eq!(StatementType::from_sql("WITH x AS (SELECT 1) SELECT * FROM x"), StatementType::Select);
        assert_eq!(StatementType::from_sql("DESC myTbl"), StatementType::Introspection);
        assert_eq!(StatementType::from_sql("SHOW WARNINGS"), StatementType::Introspection);
        assert_eq!(StatementType::from_sql("INSERT INTO users VALUES (1, 'test')"), StatementType::Insert);
        assert_eq!(StatementType::from_sql("REPLACE INTO users VALUES (1, 'x')"), StatementType::Insert);
        assert_eq!(StatementType::from_sql("UPDATE users SET name = 'new'"), StatementType::Update);
        assert_eq!(StatementType::from_sql("TRUNCATE TABLE t"), StatementType::Truncate);
        assert_eq!(StatementType::from_sql("DROP TABLE test"), StatementType::Drop);
        assert_eq!(StatementType::from_sql("BEGIN"), StatementType::Other);
        assert!(StatementType::from_sql("PRAGMA table_info(t)").returns_rows());
        assert!(!StatementType::from_sql("CREATE TABLE t (a INT)").returns_rows());
    }
}
