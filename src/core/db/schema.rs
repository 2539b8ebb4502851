/// Schema Module
///
/// An ordered column-name to type-declaration mapping and its translation
/// into table-definition statements. Type strings are passed to the server
/// verbatim; an invalid type surfaces as a server-side query error.
use crate::core::db::literal::{quote_identifier, quote_table};
use crate::core::db::Dialect;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Ordered mapping from column name to type declaration (e.g. `"INT"`,
/// `"varchar(255)"`, `"INT PRIMARY KEY"`).
///
/// Iteration order is the table layout order. Inserting an existing column
/// name replaces its type and keeps its position.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Schema {
    columns: IndexMap<String, String>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a column, returning the previous type if the name
    /// was already present.
    pub fn insert(&mut self, name: impl Into<String>, type_decl: impl Into<String>) -> Option<String> {
        self.columns.insert(name.into(), type_decl.into())
    }

    /// Builder-style [`insert`](Self::insert).
    pub fn column(mut self, name: impl Into<String>, type_decl: impl Into<String>) -> Self {
        self.insert(name, type_decl);
        self
    }

    pub fn type_of(&self, name: &str) -> Option<&str> {
        self.columns.get(name).map(String::as_str)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.columns.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.columns.iter().map(|(n, t)| (n.as_str(), t.as_str()))
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Schema {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut schema = Schema::new();
        for (name, type_decl) in iter {
            schema.insert(name, type_decl);
        }
        schema
    }
}

impl<K: Into<String>, V: Into<String>, const N: usize> From<[(K, V); N]> for Schema {
    fn from(columns: [(K, V); N]) -> Self {
        columns.into_iter().collect()
    }
}

impl From<IndexMap<String, String>> for Schema {
    fn from(columns: IndexMap<String, String>) -> Self {
        Schema { columns }
    }
}

/// Layout follows the map's (unspecified) iteration order.
impl From<HashMap<String, String>> for Schema {
    fn from(columns: HashMap<String, String>) -> Self {
        columns.into_iter().collect()
    }
}

/// Layout follows key order.
impl From<BTreeMap<String, String>> for Schema {
    fn from(columns: BTreeMap<String, String>) -> Self {
        columns.into_iter().collect()
    }
}

/// Builds `CREATE [TEMPORARY] TABLE <table> (<col> <type>, ...)`.
pub fn create_table_sql(dialect: Dialect, table: &str, schema: &Schema, temporary: bool) -> String {
    let columns = schema
        .iter()
        .map(|(name, type_decl)| format!("{} {}", quote_identifier(dialect, name), type_decl))
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        "CREATE {}TABLE {} ({})",
        if temporary { "TEMPORARY " } else { "" },
        quote_table(dialect, table),
        columns
    )
}

pub fn drop_table_sql(dialect: Dialect, table: &str) -> String {
    format!("DROP TABLE IF EXISTS {}", quote_table(dialect, table))
}

pub fn truncate_table_sql(dialect: Dialect, table: &str) -> String {
    format!("{} {}", dialect.truncate_prefix(), quote_table(dialect, table))
}
