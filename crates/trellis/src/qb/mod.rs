//! Query builder system.
//!
//! This module provides the fluent SELECT builder and the condition
//! compiler behind it:
//!
//! - **Typed condition tree**: AND/OR/NOT groups over `field op value`
//!   entries, with a map-literal adapter ([`db_and`] / [`db_or`]) for the
//!   classic associative-condition ergonomics.
//! - **Named placeholders**: compiled clauses bind values under
//!   deterministic `:name` placeholders with collision-free naming, scoped
//!   per builder instance.
//! - **Fixed clause order**: built statements always emit
//!   `SELECT → FROM → JOIN → WHERE → GROUP BY → HAVING → ORDER BY → LIMIT`.
//!
//! # Usage
//!
//! ```ignore
//! use trellis::qb;
//!
//! let mut query = qb::select("posts")
//!     .eq("status", "published")
//!     .where_cond(qb::db_or(vec![
//!         ("author_id", 7i64.into()),
//!         ("pinned", true.into()),
//!     ]))
//!     .order_by("created_at", qb::Direction::Desc)
//!     .limit(20);
//!
//! let rows = query.fetch_all(&client).await?;
//! ```

mod cond;
mod param;
mod select;

pub use cond::{Cond, Joiner, MapValue, Op, Operand, Wildcard, db_and, db_or};
pub use param::BindMap;
pub use select::{Aggregate, Direction, JoinKind, SelectQuery};

/// Create a SELECT query builder for the given table.
///
/// # Example
/// ```ignore
/// let query = trellis::qb::select("users").eq("id", 1i64);
/// ```
pub fn select(table: &str) -> SelectQuery {
    SelectQuery::new(table)
}

/// Create a SELECT query builder for a table under an explicit alias.
///
/// # Example
/// ```ignore
/// let query = trellis::qb::select_as("users", "u")
///     .join("orders", "o", "u.id = o.user_id");
/// ```
pub fn select_as(table: &str, alias: &str) -> SelectQuery {
    SelectQuery::with_alias(table, alias)
}

#[cfg(test)]
mod tests;
