//! SELECT query builder.
//!
//! Fluent mutators accumulate builder state without side effects; `build()`
//! assembles the statement in the fixed clause order
//! `SELECT → FROM → JOIN → WHERE → GROUP BY → HAVING → ORDER BY → LIMIT`
//! and caches the SQL text until the next mutation.
//!
//! Identifier failures do not panic and do not emit malformed SQL: the
//! offending mutator is skipped and the first failure is recorded, then
//! surfaced as a validation error by `build()` / `execute()`.

use crate::error::{Error, Result};
use crate::executor::{Executor, Row};
use crate::ident::{Ident, quote_on_clause};
use crate::qb::cond::{Cond, Joiner, Op, Operand};
use crate::qb::param::BindMap;
use crate::value::Value;
use tracing::debug;

/// Sort direction for ORDER BY.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

impl Direction {
    fn as_sql(self) -> &'static str {
        match self {
            Direction::Asc => "ASC",
            Direction::Desc => "DESC",
        }
    }
}

/// Join type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    Inner,
    Left,
    Right,
    Outer,
}

impl JoinKind {
    fn as_sql(self) -> &'static str {
        match self {
            JoinKind::Inner => "INNER",
            JoinKind::Left => "LEFT",
            JoinKind::Right => "RIGHT",
            JoinKind::Outer => "OUTER",
        }
    }
}

/// Aggregate function.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Aggregate {
    Count,
    Max,
    Min,
    Sum,
    Avg,
}

impl Aggregate {
    fn as_sql(self) -> &'static str {
        match self {
            Aggregate::Count => "COUNT",
            Aggregate::Max => "MAX",
            Aggregate::Min => "MIN",
            Aggregate::Sum => "SUM",
            Aggregate::Avg => "AVG",
        }
    }
}

/// One selected output column.
#[derive(Debug, Clone)]
enum Field {
    /// A quoted `source.column`, optionally aliased.
    Plain {
        source: String,
        column: String,
        out: Option<String>,
    },
    /// A raw SQL expression, optionally aliased. Bypasses quoting.
    Raw { expr: String, out: Option<String> },
}

#[derive(Debug, Clone)]
struct Join {
    table: String,
    alias: String,
    on: String,
    kind: JoinKind,
}

/// SELECT query builder with per-instance bind state.
#[derive(Debug, Clone, Default)]
pub struct SelectQuery {
    table: String,
    alias: String,
    fields: Vec<Field>,
    aggregates: Vec<(Aggregate, String, String)>,
    joins: Vec<Join>,
    where_blocks: Vec<Cond>,
    exists_clauses: Vec<(Joiner, String)>,
    pending: Option<Vec<Cond>>,
    group_by: Vec<String>,
    having_blocks: Vec<Cond>,
    order_by: Vec<(String, Direction)>,
    limit: Option<(Option<u64>, u64)>,
    cached: Option<String>,
    binds: BindMap,
    build_error: Option<String>,
}

impl SelectQuery {
    /// Create a builder for a table, aliased to itself.
    pub fn new(table: &str) -> Self {
        Self::with_alias(table, table)
    }

    /// Create a builder for a table under an explicit alias.
    pub fn with_alias(table: &str, alias: &str) -> Self {
        let mut qb = Self {
            table: table.to_string(),
            alias: alias.to_string(),
            ..Default::default()
        };
        if let Err(e) = Ident::parse(table) {
            qb.note_error(&e);
        } else if let Err(e) = Ident::parse(alias) {
            qb.note_error(&e);
        }
        qb
    }

    /// Record the first mutator failure; later ones are dropped.
    fn note_error(&mut self, err: &Error) {
        if self.build_error.is_none() {
            self.build_error = Some(err.to_string());
        }
    }

    fn touch(&mut self) {
        self.cached = None;
    }

    // ==================== Field selection ====================

    /// Select `alias.column` from the main table.
    pub fn field(self, column: &str) -> Self {
        let alias = self.alias.clone();
        self.field_from(&alias, column, None)
    }

    /// Select `alias.column AS out` from the main table.
    pub fn field_as(self, column: &str, out: &str) -> Self {
        let alias = self.alias.clone();
        self.field_from(&alias, column, Some(out))
    }

    /// Select several columns from the main table.
    pub fn fields(mut self, columns: &[&str]) -> Self {
        for column in columns {
            self = self.field(column);
        }
        self
    }

    /// Select a column from a joined source alias.
    pub fn field_from(mut self, source: &str, column: &str, out: Option<&str>) -> Self {
        self.touch();
        for part in [Some(source), Some(column), out].into_iter().flatten() {
            if part != "*" {
                if let Err(e) = Ident::parse(part) {
                    self.note_error(&e);
                    return self;
                }
            }
        }
        self.fields.push(Field::Plain {
            source: source.to_string(),
            column: column.to_string(),
            out: out.map(str::to_string),
        });
        self
    }

    /// Select a raw SQL expression. Bypasses identifier quoting.
    ///
    /// # Safety
    /// Be careful with SQL injection when selecting raw expressions.
    pub fn raw_field(mut self, expr: &str) -> Self {
        self.touch();
        self.fields.push(Field::Raw {
            expr: expr.to_string(),
            out: None,
        });
        self
    }

    /// Select a raw SQL expression under an output alias.
    ///
    /// # Safety
    /// Be careful with SQL injection when selecting raw expressions.
    pub fn raw_field_as(mut self, expr: &str, out: &str) -> Self {
        self.touch();
        if let Err(e) = Ident::parse(out) {
            self.note_error(&e);
            return self;
        }
        self.fields.push(Field::Raw {
            expr: expr.to_string(),
            out: Some(out.to_string()),
        });
        self
    }

    // ==================== Joins ====================

    fn push_join(mut self, table: &str, alias: &str, on: &str, kind: JoinKind) -> Self {
        self.touch();
        if let Err(e) = Ident::parse(table).and(Ident::parse(alias)) {
            self.note_error(&e);
            return self;
        }
        self.joins.push(Join {
            table: table.to_string(),
            alias: alias.to_string(),
            on: quote_on_clause(on),
            kind,
        });
        self
    }

    /// Add an INNER JOIN. Bare `table.column` tokens in `on` are quoted.
    pub fn join(self, table: &str, alias: &str, on: &str) -> Self {
        self.push_join(table, alias, on, JoinKind::Inner)
    }

    /// Add a LEFT JOIN.
    pub fn left_join(self, table: &str, alias: &str, on: &str) -> Self {
        self.push_join(table, alias, on, JoinKind::Left)
    }

    /// Add a RIGHT JOIN.
    pub fn right_join(self, table: &str, alias: &str, on: &str) -> Self {
        self.push_join(table, alias, on, JoinKind::Right)
    }

    /// Add an OUTER JOIN.
    pub fn outer_join(self, table: &str, alias: &str, on: &str) -> Self {
        self.push_join(table, alias, on, JoinKind::Outer)
    }

    /// Add a join of an explicit [`JoinKind`].
    pub fn join_kind(self, table: &str, alias: &str, on: &str, kind: JoinKind) -> Self {
        self.push_join(table, alias, on, kind)
    }

    // ==================== WHERE ====================

    /// Push one condition block.
    ///
    /// Every block joins to the others with AND, whatever its internal
    /// joiner; `or_where` only changes how the block's own top-level
    /// entries combine.
    pub fn where_cond(mut self, cond: Cond) -> Self {
        self.touch();
        self.where_blocks.push(cond);
        self
    }

    /// Alias for [`SelectQuery::where_cond`].
    pub fn and_where(self, cond: Cond) -> Self {
        self.where_cond(cond)
    }

    /// Push one condition block whose top-level entries join with OR.
    pub fn or_where(mut self, cond: Cond) -> Self {
        self.touch();
        self.where_blocks.push(retag(cond, Joiner::Or));
        self
    }

    /// `field = value` shorthand for a single-entry AND block.
    pub fn eq(self, field: &str, value: impl Into<Operand>) -> Self {
        self.where_cond(Cond::eq(field, value))
    }

    /// Accumulate one entry into the pending incremental block.
    ///
    /// The block is flushed by [`SelectQuery::end_condition`]. Asserting the
    /// same field twice within one block is fine; placeholders stay distinct.
    pub fn condition(mut self, field: &str, op: Op, value: impl Into<Operand>) -> Self {
        self.touch();
        self.pending
            .get_or_insert_with(Vec::new)
            .push(Cond::entry(field, op, value));
        self
    }

    /// Flush the pending incremental block as one WHERE block.
    pub fn end_condition(mut self, joiner: Joiner) -> Self {
        self.touch();
        if let Some(entries) = self.pending.take() {
            let block = match joiner {
                Joiner::And => Cond::And(entries),
                Joiner::Or => Cond::Or(entries),
            };
            self.where_blocks.push(block);
        }
        self
    }

    /// Append `EXISTS (subquery)` to the WHERE area with an AND connector.
    ///
    /// # Safety
    /// The subquery text is raw SQL; the caller must ensure safety.
    pub fn exists(mut self, subquery: &str) -> Self {
        self.touch();
        self.exists_clauses
            .push((Joiner::And, format!("EXISTS ({subquery})")));
        self
    }

    /// Append `NOT EXISTS (subquery)` with an AND connector.
    pub fn not_exists(mut self, subquery: &str) -> Self {
        self.touch();
        self.exists_clauses
            .push((Joiner::And, format!("NOT EXISTS ({subquery})")));
        self
    }

    /// Append `EXISTS (subquery)` with an OR connector.
    pub fn or_exists(mut self, subquery: &str) -> Self {
        self.touch();
        self.exists_clauses
            .push((Joiner::Or, format!("EXISTS ({subquery})")));
        self
    }

    /// Append `NOT EXISTS (subquery)` with an OR connector.
    pub fn or_not_exists(mut self, subquery: &str) -> Self {
        self.touch();
        self.exists_clauses
            .push((Joiner::Or, format!("NOT EXISTS ({subquery})")));
        self
    }

    // ==================== Aggregates ====================

    fn push_aggregate(mut self, func: Aggregate, field: &str, out: &str) -> Self {
        self.touch();
        if field != "*" {
            if let Err(e) = Ident::parse(field) {
                self.note_error(&e);
                return self;
            }
        }
        if let Err(e) = Ident::parse(out) {
            self.note_error(&e);
            return self;
        }
        self.aggregates
            .push((func, field.to_string(), out.to_string()));
        self
    }

    /// Add a `COUNT(field) AS out` column. `*` is allowed as the field.
    pub fn count(self, field: &str, out: &str) -> Self {
        self.push_aggregate(Aggregate::Count, field, out)
    }

    /// Add a `MAX(field) AS out` column.
    pub fn max(self, field: &str, out: &str) -> Self {
        self.push_aggregate(Aggregate::Max, field, out)
    }

    /// Add a `MIN(field) AS out` column.
    pub fn min(self, field: &str, out: &str) -> Self {
        self.push_aggregate(Aggregate::Min, field, out)
    }

    /// Add a `SUM(field) AS out` column.
    pub fn sum(self, field: &str, out: &str) -> Self {
        self.push_aggregate(Aggregate::Sum, field, out)
    }

    /// Add an `AVG(field) AS out` column.
    pub fn avg(self, field: &str, out: &str) -> Self {
        self.push_aggregate(Aggregate::Avg, field, out)
    }

    /// Add an aggregate column for an explicit [`Aggregate`] function.
    pub fn aggregate(self, func: Aggregate, field: &str, out: &str) -> Self {
        self.push_aggregate(func, field, out)
    }

    // ==================== Grouping / ordering / limits ====================

    /// Add a GROUP BY column.
    pub fn group_by(mut self, column: &str) -> Self {
        self.touch();
        match Ident::parse(column) {
            Ok(_) => self.group_by.push(column.to_string()),
            Err(e) => self.note_error(&e),
        }
        self
    }

    /// Push one HAVING condition block (blocks join with AND).
    pub fn having_cond(mut self, cond: Cond) -> Self {
        self.touch();
        self.having_blocks.push(cond);
        self
    }

    /// Alias for [`SelectQuery::having_cond`].
    pub fn and_having(self, cond: Cond) -> Self {
        self.having_cond(cond)
    }

    /// Push one HAVING block whose top-level entries join with OR.
    pub fn or_having(mut self, cond: Cond) -> Self {
        self.touch();
        self.having_blocks.push(retag(cond, Joiner::Or));
        self
    }

    /// Add an ORDER BY column.
    pub fn order_by(mut self, column: &str, direction: Direction) -> Self {
        self.touch();
        match Ident::parse(column) {
            Ok(_) => self.order_by.push((column.to_string(), direction)),
            Err(e) => self.note_error(&e),
        }
        self
    }

    /// Set a row-count LIMIT.
    pub fn limit(mut self, count: u64) -> Self {
        self.touch();
        self.limit = Some((None, count));
        self
    }

    /// Set an offset + row-count LIMIT.
    pub fn limit_offset(mut self, offset: u64, count: u64) -> Self {
        self.touch();
        self.limit = Some((Some(offset), count));
        self
    }

    // ==================== Build ====================

    /// Assemble the SQL text and bind values.
    ///
    /// Idempotent until the next mutation: repeated calls return the cached
    /// byte-identical text.
    pub fn build(&mut self) -> Result<String> {
        if let Some(ref err) = self.build_error {
            return Err(Error::Validation(err.clone()));
        }
        if let Some(ref sql) = self.cached {
            return Ok(sql.clone());
        }
        if self.table.is_empty() {
            return Err(Error::validation("No table set for SELECT"));
        }

        // Entries left open by condition() join with AND.
        if let Some(entries) = self.pending.take() {
            self.where_blocks.push(Cond::And(entries));
        }

        let mut binds = BindMap::new();

        let mut sql = String::from("SELECT ");
        sql.push_str(&self.render_select_list()?);

        sql.push_str(" FROM ");
        Ident::parse(&self.table)?.write_sql(&mut sql);
        if self.alias != self.table {
            sql.push_str(" AS ");
            Ident::parse(&self.alias)?.write_sql(&mut sql);
        }

        for join in &self.joins {
            sql.push(' ');
            sql.push_str(join.kind.as_sql());
            sql.push_str(" JOIN ");
            Ident::parse(&join.table)?.write_sql(&mut sql);
            if join.alias != join.table {
                sql.push_str(" AS ");
                Ident::parse(&join.alias)?.write_sql(&mut sql);
            }
            sql.push_str(" ON ");
            sql.push_str(&join.on);
        }

        let where_sql = self.render_condition_area(&self.where_blocks, &mut binds)?;
        if !where_sql.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&where_sql);
        }

        if !self.group_by.is_empty() {
            sql.push_str(" GROUP BY ");
            let cols: Result<Vec<String>> = self
                .group_by
                .iter()
                .map(|c| Ident::parse(c).map(|i| i.to_sql()))
                .collect();
            sql.push_str(&cols?.join(", "));
        }

        let having_sql = self.render_blocks(&self.having_blocks, &mut binds)?;
        if !having_sql.is_empty() {
            sql.push_str(" HAVING ");
            sql.push_str(&having_sql);
        }

        if !self.order_by.is_empty() {
            sql.push_str(" ORDER BY ");
            let mut parts = Vec::with_capacity(self.order_by.len());
            for (column, direction) in &self.order_by {
                parts.push(format!(
                    "{} {}",
                    Ident::parse(column)?.to_sql(),
                    direction.as_sql()
                ));
            }
            sql.push_str(&parts.join(", "));
        }

        if let Some((offset, count)) = self.limit {
            match offset {
                Some(o) => sql.push_str(&format!(" LIMIT {o}, {count}")),
                None => sql.push_str(&format!(" LIMIT {count}")),
            }
        }

        debug!(sql = %sql, binds = binds.len(), "built select statement");
        self.binds = binds;
        self.cached = Some(sql.clone());
        Ok(sql)
    }

    fn render_select_list(&self) -> Result<String> {
        let mut cols = Vec::with_capacity(self.fields.len() + self.aggregates.len());

        for field in &self.fields {
            match field {
                Field::Plain {
                    source,
                    column,
                    out,
                } => {
                    let mut rendered = if column == "*" {
                        format!("{}.*", Ident::parse(source)?.to_sql())
                    } else {
                        format!(
                            "{}.{}",
                            Ident::parse(source)?.to_sql(),
                            Ident::parse(column)?.to_sql()
                        )
                    };
                    if let Some(out) = out {
                        rendered.push_str(" AS ");
                        rendered.push_str(&Ident::parse(out)?.to_sql());
                    }
                    cols.push(rendered);
                }
                Field::Raw { expr, out } => {
                    let mut rendered = expr.clone();
                    if let Some(out) = out {
                        rendered.push_str(" AS ");
                        rendered.push_str(&Ident::parse(out)?.to_sql());
                    }
                    cols.push(rendered);
                }
            }
        }

        for (func, field, out) in &self.aggregates {
            let inner = if field == "*" {
                "*".to_string()
            } else {
                Ident::parse(field)?.to_sql()
            };
            cols.push(format!(
                "{}({inner}) AS {}",
                func.as_sql(),
                Ident::parse(out)?.to_sql()
            ));
        }

        if cols.is_empty() {
            return Ok(format!("{}.*", Ident::parse(&self.alias)?.to_sql()));
        }
        Ok(cols.join(", "))
    }

    /// Render condition blocks joined with AND; OR blocks parenthesized.
    fn render_blocks(&self, blocks: &[Cond], binds: &mut BindMap) -> Result<String> {
        let mut parts = Vec::with_capacity(blocks.len());
        for block in blocks {
            if block.is_empty() {
                continue;
            }
            let clause = block.compile_into(binds)?;
            if clause.is_empty() {
                continue;
            }
            if matches!(block, Cond::Or(entries) if entries.len() > 1) {
                parts.push(format!("({clause})"));
            } else {
                parts.push(clause);
            }
        }
        Ok(parts.join(" AND "))
    }

    /// Render the WHERE area: condition blocks plus EXISTS clauses.
    ///
    /// A leading connector on the first EXISTS clause is dropped when no
    /// condition block precedes it.
    fn render_condition_area(&self, blocks: &[Cond], binds: &mut BindMap) -> Result<String> {
        let mut out = self.render_blocks(blocks, binds)?;
        for (connector, clause) in &self.exists_clauses {
            if out.is_empty() {
                out.push_str(clause);
            } else {
                out.push_str(match connector {
                    Joiner::And => " AND ",
                    Joiner::Or => " OR ",
                });
                out.push_str(clause);
            }
        }
        Ok(out)
    }

    /// The bind values of the last `build()`.
    pub fn binds(&self) -> &BindMap {
        &self.binds
    }

    /// Substitute bound values back into the SQL text for inspection.
    ///
    /// Display and logging only; the output is not safe to execute.
    pub fn ready_sql(&mut self) -> Result<String> {
        let mut sql = self.build()?;
        // Longest names first so `:c` never clobbers `:c0`.
        let mut entries: Vec<(String, String)> = self
            .binds
            .iter()
            .map(|(name, value)| (name.to_string(), value.to_sql_literal()))
            .collect();
        entries.sort_by(|a, b| b.0.len().cmp(&a.0.len()));
        for (name, literal) in entries {
            sql = sql.replace(&format!(":{name}"), &literal);
        }
        Ok(sql)
    }

    // ==================== Execution ====================

    /// Build and execute, returning all rows.
    pub async fn execute(&mut self, conn: &impl Executor) -> Result<Vec<Row>> {
        let sql = self.build()?;
        conn.query(&sql, &self.binds).await
    }

    /// Fetch all rows.
    pub async fn fetch_all(&mut self, conn: &impl Executor) -> Result<Vec<Row>> {
        self.execute(conn).await
    }

    /// Fetch the first row, if any. Forces `LIMIT 1`.
    pub async fn fetch_opt(&mut self, conn: &impl Executor) -> Result<Option<Row>> {
        self.limit = Some((None, 1));
        self.cached = None;
        let rows = self.execute(conn).await?;
        Ok(rows.into_iter().next())
    }

    /// Fetch exactly one row. Forces `LIMIT 1`; errors when none match.
    pub async fn fetch_one(&mut self, conn: &impl Executor) -> Result<Row> {
        self.fetch_opt(conn)
            .await?
            .ok_or_else(|| Error::not_found("Expected 1 row, got 0"))
    }

    /// Fetch the first column of the first row. Forces `LIMIT 1`.
    pub async fn fetch_scalar(&mut self, conn: &impl Executor) -> Result<Option<Value>> {
        let row = self.fetch_opt(conn).await?;
        Ok(row.and_then(|r| r.get_at(0).cloned()))
    }

    /// Fetch a single column across all rows.
    pub async fn fetch_column(&mut self, conn: &impl Executor, column: &str) -> Result<Vec<Value>> {
        let rows = self.execute(conn).await?;
        Ok(rows
            .into_iter()
            .filter_map(|row| row.get(column).cloned())
            .collect())
    }
}

/// Re-tag a bare AND group so its top-level entries join with OR.
fn retag(cond: Cond, joiner: Joiner) -> Cond {
    match (cond, joiner) {
        (Cond::And(children), Joiner::Or) => Cond::Or(children),
        (other, _) => other,
    }
}
