//! Database execution capability consumed by the query builder.
//!
//! The core never talks to a driver directly. It compiles SQL with named
//! `:placeholder` binds and hands both to an [`Executor`] implementation,
//! which is responsible for driver-level binding, error mapping, and any
//! retry or transaction discipline.

use crate::error::Result;
use crate::qb::BindMap;
use crate::value::Value;
use serde::Serialize;

/// A trait that unifies database clients and transactions.
///
/// Implementations must accept named placeholders of the form `:identifier`
/// and bind the values from the [`BindMap`] by name. Driver failures surface
/// as [`crate::Error::Execution`] carrying the driver's code and message.
pub trait Executor: Send + Sync {
    /// Execute a query and return all rows.
    fn query(
        &self,
        sql: &str,
        binds: &BindMap,
    ) -> impl std::future::Future<Output = Result<Vec<Row>>> + Send;

    /// Execute a statement and return the number of affected rows.
    fn execute(
        &self,
        sql: &str,
        binds: &BindMap,
    ) -> impl std::future::Future<Output = Result<u64>> + Send;
}

/// A materialized result row: ordered `column -> value` pairs.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Row {
    columns: Vec<(String, Value)>,
}

impl Row {
    /// Build a row from `(column, value)` pairs, preserving order.
    pub fn from_pairs(pairs: impl IntoIterator<Item = (String, Value)>) -> Self {
        Self {
            columns: pairs.into_iter().collect(),
        }
    }

    /// Get a column value by name.
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.columns
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value)
    }

    /// Get a column value by position.
    pub fn get_at(&self, index: usize) -> Option<&Value> {
        self.columns.get(index).map(|(_, value)| value)
    }

    /// Iterate over `(column, value)` pairs in result order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.columns.iter().map(|(name, value)| (name.as_str(), value))
    }

    /// Number of columns.
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// Check if the row has no columns.
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_lookup_by_name_and_position() {
        let row = Row::from_pairs([
            ("id".to_string(), Value::Int(7)),
            ("name".to_string(), Value::from("alice")),
        ]);
        assert_eq!(row.get("name"), Some(&Value::from("alice")));
        assert_eq!(row.get_at(0), Some(&Value::Int(7)));
        assert_eq!(row.get("missing"), None);
        assert_eq!(row.len(), 2);
    }
}
