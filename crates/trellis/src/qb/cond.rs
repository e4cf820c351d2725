//! Condition tree and compiler for WHERE/HAVING clauses.
//!
//! Conditions are a typed tree ([`Cond`]) of AND/OR/NOT groups over
//! `field op value` entries. Compilation produces a boolean clause with
//! named `:placeholder` binds accumulated into a caller-owned [`BindMap`],
//! so every statement keeps an isolated placeholder namespace.
//!
//! A thin map-literal adapter ([`db_and`] / [`db_or`]) keeps the classic
//! associative-condition ergonomics: keys may carry an operator suffix
//! (`"age >="`), and `$and` / `$or` / `$not` keys nest groups.

use crate::error::Result;
use crate::ident::Ident;
use crate::qb::param::BindMap;
use crate::value::Value;

/// Wildcard placement for LIKE-family operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wildcard {
    /// `%value%`
    Both,
    /// `value%`
    Suffix,
    /// `%value`
    Prefix,
}

/// Condition operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
    /// Set membership; equivalent to `Eq` over a list operand.
    In,
    Between,
    NotBetween,
    Like(Wildcard),
    NotLike(Wildcard),
}

impl Op {
    /// Parse an operator token from a condition-map key suffix.
    ///
    /// Returns `None` for unrecognized tokens; the caller falls back to `=`
    /// with the whole key as the field name.
    pub fn from_token(token: &str) -> Option<Op> {
        let t = token.to_ascii_lowercase();
        Some(match t.as_str() {
            "=" => Op::Eq,
            "!=" | "<>" => Op::Ne,
            ">" => Op::Gt,
            ">=" => Op::Gte,
            "<" => Op::Lt,
            "<=" => Op::Lte,
            "in" => Op::In,
            "between" => Op::Between,
            "nbetween" => Op::NotBetween,
            "like" | "like%%" => Op::Like(Wildcard::Both),
            "like%~" => Op::Like(Wildcard::Suffix),
            "like~%" => Op::Like(Wildcard::Prefix),
            "nlike" | "nlike%%" => Op::NotLike(Wildcard::Both),
            "nlike%~" => Op::NotLike(Wildcard::Suffix),
            "nlike~%" => Op::NotLike(Wildcard::Prefix),
            _ => return None,
        })
    }

    /// SQL comparator for plain scalar comparisons.
    fn comparator(&self) -> &'static str {
        match self {
            Op::Eq | Op::In | Op::Between | Op::NotBetween => "=",
            Op::Ne => "!=",
            Op::Gt => ">",
            Op::Gte => ">=",
            Op::Lt => "<",
            Op::Lte => "<=",
            Op::Like(_) => "LIKE",
            Op::NotLike(_) => "NOT LIKE",
        }
    }
}

/// Operand of a condition entry.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    /// A single scalar (including NULL).
    Value(Value),
    /// A list of scalars, for IN/BETWEEN families.
    List(Vec<Value>),
}

impl Operand {
    /// Build a list operand from anything convertible to values.
    pub fn list<I, T>(values: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Value>,
    {
        Operand::List(values.into_iter().map(Into::into).collect())
    }
}

impl From<Value> for Operand {
    fn from(v: Value) -> Self {
        Operand::Value(v)
    }
}

impl From<Vec<Value>> for Operand {
    fn from(v: Vec<Value>) -> Self {
        Operand::List(v)
    }
}

impl From<bool> for Operand {
    fn from(v: bool) -> Self {
        Operand::Value(v.into())
    }
}

impl From<i32> for Operand {
    fn from(v: i32) -> Self {
        Operand::Value(v.into())
    }
}

impl From<i64> for Operand {
    fn from(v: i64) -> Self {
        Operand::Value(v.into())
    }
}

impl From<f64> for Operand {
    fn from(v: f64) -> Self {
        Operand::Value(v.into())
    }
}

impl From<&str> for Operand {
    fn from(v: &str) -> Self {
        Operand::Value(v.into())
    }
}

impl From<String> for Operand {
    fn from(v: String) -> Self {
        Operand::Value(v.into())
    }
}

/// A boolean condition tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Cond {
    /// All children must hold.
    And(Vec<Cond>),
    /// At least one child must hold.
    Or(Vec<Cond>),
    /// Negate the inner condition.
    Not(Box<Cond>),
    /// `field op operand`
    Entry {
        field: String,
        op: Op,
        operand: Operand,
    },
    /// Raw SQL fragment (escape hatch, bypasses identifier quoting).
    ///
    /// # Safety
    /// Be careful with SQL injection when using raw conditions.
    Raw(String),
}

impl Cond {
    /// Create an AND group.
    pub fn all(children: Vec<Cond>) -> Self {
        Cond::And(children)
    }

    /// Create an OR group.
    pub fn any(children: Vec<Cond>) -> Self {
        Cond::Or(children)
    }

    /// Create a NOT condition.
    pub fn negate(inner: Cond) -> Self {
        Cond::Not(Box::new(inner))
    }

    /// Create a `field op operand` entry.
    pub fn entry(field: impl Into<String>, op: Op, operand: impl Into<Operand>) -> Self {
        Cond::Entry {
            field: field.into(),
            op,
            operand: operand.into(),
        }
    }

    /// `field = value`
    pub fn eq(field: impl Into<String>, value: impl Into<Operand>) -> Self {
        Self::entry(field, Op::Eq, value)
    }

    /// `field != value`
    pub fn ne(field: impl Into<String>, value: impl Into<Operand>) -> Self {
        Self::entry(field, Op::Ne, value)
    }

    /// `field > value`
    pub fn gt(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::entry(field, Op::Gt, Operand::Value(value.into()))
    }

    /// `field >= value`
    pub fn gte(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::entry(field, Op::Gte, Operand::Value(value.into()))
    }

    /// `field < value`
    pub fn lt(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::entry(field, Op::Lt, Operand::Value(value.into()))
    }

    /// `field <= value`
    pub fn lte(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::entry(field, Op::Lte, Operand::Value(value.into()))
    }

    /// `field IN (values...)`
    pub fn in_list<I, T>(field: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Value>,
    {
        Self::entry(field, Op::In, Operand::list(values))
    }

    /// `field BETWEEN from AND to`
    pub fn between(
        field: impl Into<String>,
        from: impl Into<Value>,
        to: impl Into<Value>,
    ) -> Self {
        Self::entry(
            field,
            Op::Between,
            Operand::List(vec![from.into(), to.into()]),
        )
    }

    /// `field LIKE <pattern with wildcards>`
    pub fn like(
        field: impl Into<String>,
        pattern: impl Into<Value>,
        wildcard: Wildcard,
    ) -> Self {
        Self::entry(field, Op::Like(wildcard), Operand::Value(pattern.into()))
    }

    /// `field NOT LIKE <pattern with wildcards>`
    pub fn not_like(
        field: impl Into<String>,
        pattern: impl Into<Value>,
        wildcard: Wildcard,
    ) -> Self {
        Self::entry(field, Op::NotLike(wildcard), Operand::Value(pattern.into()))
    }

    /// `field IS NULL`
    pub fn is_null(field: impl Into<String>) -> Self {
        Self::entry(field, Op::Eq, Operand::Value(Value::Null))
    }

    /// `field IS NOT NULL`
    pub fn is_not_null(field: impl Into<String>) -> Self {
        Self::entry(field, Op::Ne, Operand::Value(Value::Null))
    }

    /// Raw SQL fragment.
    ///
    /// # Safety
    /// Be careful with SQL injection when using raw conditions.
    pub fn raw(sql: impl Into<String>) -> Self {
        Cond::Raw(sql.into())
    }

    /// Check if this condition compiles to nothing.
    pub fn is_empty(&self) -> bool {
        match self {
            Cond::And(cs) | Cond::Or(cs) => cs.is_empty() || cs.iter().all(|c| c.is_empty()),
            Cond::Not(inner) => inner.is_empty(),
            _ => false,
        }
    }

    /// Compile to a clause string, returning the clause and its binds.
    pub fn compile(&self) -> Result<(String, BindMap)> {
        let mut binds = BindMap::new();
        let clause = self.compile_into(&mut binds)?;
        Ok((clause, binds))
    }

    /// Compile to a clause string, accumulating binds into `binds`.
    ///
    /// Placeholder names are allocated collision-free against everything
    /// already bound in `binds`.
    pub fn compile_into(&self, binds: &mut BindMap) -> Result<String> {
        match self {
            Cond::And(children) => compile_group(children, " AND ", binds),
            Cond::Or(children) => compile_group(children, " OR ", binds),
            Cond::Not(inner) => {
                let clause = inner.compile_into(binds)?;
                if clause.is_empty() {
                    Ok(String::new())
                } else {
                    Ok(format!("NOT ({clause})"))
                }
            }
            Cond::Entry { field, op, operand } => compile_entry(field, *op, operand, binds),
            Cond::Raw(sql) => Ok(sql.clone()),
        }
    }
}

fn compile_group(children: &[Cond], joiner: &str, binds: &mut BindMap) -> Result<String> {
    let mut parts = Vec::with_capacity(children.len());
    for child in children {
        if child.is_empty() {
            continue;
        }
        let clause = child.compile_into(binds)?;
        if clause.is_empty() {
            continue;
        }
        // Nested groups render parenthesized.
        if matches!(child, Cond::And(_) | Cond::Or(_)) {
            parts.push(format!("({clause})"));
        } else {
            parts.push(clause);
        }
    }
    Ok(parts.join(joiner))
}

fn compile_entry(field: &str, op: Op, operand: &Operand, binds: &mut BindMap) -> Result<String> {
    let col = Ident::parse(field)?.to_sql();

    // BETWEEN without a two-element list degrades to plain equality,
    // which in turn degrades to IN for list operands.
    let op = match (op, operand) {
        (Op::Between, Operand::List(vs)) if vs.len() == 2 => Op::Between,
        (Op::NotBetween, Operand::List(vs)) if vs.len() == 2 => Op::NotBetween,
        (Op::Between, _) => Op::Eq,
        (Op::NotBetween, _) => Op::Ne,
        (op, _) => op,
    };

    match (op, operand) {
        // NULL scalar with an equality operator compiles to IS [NOT] NULL.
        (Op::Eq | Op::In, Operand::Value(Value::Null)) => Ok(format!("{col} IS NULL")),
        (Op::Ne, Operand::Value(Value::Null)) => Ok(format!("{col} IS NOT NULL")),

        (Op::Between | Op::NotBetween, Operand::List(vs)) => {
            let from = binds.bind(field, vs[0].clone());
            let to = binds.bind(field, vs[1].clone());
            let keyword = if op == Op::Between {
                "BETWEEN"
            } else {
                "NOT BETWEEN"
            };
            Ok(format!("({col} {keyword} :{from} AND :{to})"))
        }

        // Any remaining list operand compiles as set membership; negated
        // operators produce NOT IN.
        (op, Operand::List(vs)) => {
            let negated = matches!(op, Op::Ne | Op::NotLike(_));
            if vs.is_empty() {
                // Empty IN list - always false / true.
                return Ok(if negated { "1=1" } else { "1=0" }.to_string());
            }
            let mut placeholders = Vec::with_capacity(vs.len());
            for (i, v) in vs.iter().enumerate() {
                let name = binds.bind(&format!("{field}{i}"), v.clone());
                placeholders.push(format!(":{name}"));
            }
            let keyword = if negated { "NOT IN" } else { "IN" };
            Ok(format!("{col} {keyword} ({})", placeholders.join(", ")))
        }

        (Op::Like(w) | Op::NotLike(w), Operand::Value(v)) => {
            let name = binds.bind(field, v.clone());
            let concat = match w {
                Wildcard::Both => format!("CONCAT('%', :{name}, '%')"),
                Wildcard::Suffix => format!("CONCAT(:{name}, '%')"),
                Wildcard::Prefix => format!("CONCAT('%', :{name})"),
            };
            Ok(format!("{col} {} {concat}", op.comparator()))
        }

        (op, Operand::Value(v)) => {
            let name = binds.bind(field, v.clone());
            Ok(format!("{col} {} :{name}", op.comparator()))
        }
    }
}

// ==================== Map-literal adapter ====================

/// Value side of a map-literal condition entry.
#[derive(Debug, Clone, PartialEq)]
pub enum MapValue {
    /// A single scalar.
    Scalar(Value),
    /// A list of scalars.
    List(Vec<Value>),
    /// A nested group, for `$and` / `$or` / `$not` keys.
    Group(Vec<(String, MapValue)>),
}

impl MapValue {
    /// Build a list from anything convertible to values.
    pub fn list<I, T>(values: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Value>,
    {
        MapValue::List(values.into_iter().map(Into::into).collect())
    }

    /// Build a nested group from `(key, value)` pairs.
    pub fn group(entries: Vec<(&str, MapValue)>) -> Self {
        MapValue::Group(
            entries
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect(),
        )
    }
}

impl From<Value> for MapValue {
    fn from(v: Value) -> Self {
        MapValue::Scalar(v)
    }
}

impl From<bool> for MapValue {
    fn from(v: bool) -> Self {
        MapValue::Scalar(v.into())
    }
}

impl From<i32> for MapValue {
    fn from(v: i32) -> Self {
        MapValue::Scalar(v.into())
    }
}

impl From<i64> for MapValue {
    fn from(v: i64) -> Self {
        MapValue::Scalar(v.into())
    }
}

impl From<f64> for MapValue {
    fn from(v: f64) -> Self {
        MapValue::Scalar(v.into())
    }
}

impl From<&str> for MapValue {
    fn from(v: &str) -> Self {
        MapValue::Scalar(v.into())
    }
}

impl From<Vec<Value>> for MapValue {
    fn from(v: Vec<Value>) -> Self {
        MapValue::List(v)
    }
}

/// Build an AND condition from map-literal entries.
///
/// Keys may carry an operator suffix separated by the last whitespace
/// (`"age >="`); an unrecognized suffix means the whole key is the field
/// name and the operator defaults to `=`. The keys `$and`, `$or` and `$not`
/// (case-insensitive) nest sub-groups.
pub fn db_and(entries: Vec<(&str, MapValue)>) -> Cond {
    group_to_cond(&to_owned_entries(entries), Joiner::And)
}

/// Build an OR condition from map-literal entries.
///
/// See [`db_and`] for key syntax.
pub fn db_or(entries: Vec<(&str, MapValue)>) -> Cond {
    group_to_cond(&to_owned_entries(entries), Joiner::Or)
}

/// Top-level joiner for a condition block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Joiner {
    And,
    Or,
}

fn to_owned_entries(entries: Vec<(&str, MapValue)>) -> Vec<(String, MapValue)> {
    entries
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect()
}

fn group_to_cond(entries: &[(String, MapValue)], joiner: Joiner) -> Cond {
    let mut children = Vec::with_capacity(entries.len());

    for (key, value) in entries {
        let key = key.trim();
        let lowered = key.to_ascii_lowercase();

        if let MapValue::Group(nested) = value {
            match lowered.as_str() {
                "$and" => {
                    children.push(group_to_cond(nested, Joiner::And));
                    continue;
                }
                "$or" => {
                    children.push(group_to_cond(nested, Joiner::Or));
                    continue;
                }
                "$not" => {
                    children.push(Cond::Not(Box::new(group_to_cond(nested, Joiner::And))));
                    continue;
                }
                // A nested group under an ordinary key joins with the
                // outer type, matching bare sub-array semantics.
                _ => {
                    children.push(group_to_cond(nested, joiner));
                    continue;
                }
            }
        }

        let (field, op) = parse_key(key);
        let operand = match value {
            MapValue::Scalar(v) => Operand::Value(v.clone()),
            MapValue::List(vs) => Operand::List(vs.clone()),
            MapValue::Group(_) => unreachable!("handled above"),
        };
        children.push(Cond::entry(field, op, operand));
    }

    match joiner {
        Joiner::And => Cond::And(children),
        Joiner::Or => Cond::Or(children),
    }
}

/// Split a map key into `(field, operator)` on the last whitespace.
fn parse_key(key: &str) -> (&str, Op) {
    if let Some(idx) = key.rfind(char::is_whitespace) {
        let token = key[idx..].trim();
        if let Some(op) = Op::from_token(token) {
            return (key[..idx].trim_end(), op);
        }
    }
    (key, Op::Eq)
}
