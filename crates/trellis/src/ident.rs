//! Safe SQL identifier handling.
//!
//! This module provides [`Ident`], a validated SQL identifier (table, alias,
//! or column) supporting dotted notation, rendered with backtick quoting.
//!
//! Parts are validated against `[A-Za-z0-9_]+`; anything else is rejected so
//! identifiers can never smuggle SQL into a compiled statement.

use crate::error::{Error, Result};
use regex::Regex;
use std::sync::LazyLock;

/// A SQL identifier (column, table, or alias name).
///
/// Supports dotted notation (e.g. `alias.column`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ident {
    parts: Vec<String>,
}

impl Ident {
    /// Parse an identifier string, supporting dotted form.
    pub fn parse(s: &str) -> Result<Self> {
        if s.is_empty() {
            return Err(Error::validation("Identifier cannot be empty"));
        }

        let mut parts = Vec::new();
        for part in s.split('.') {
            if part.is_empty() {
                return Err(Error::validation(format!(
                    "Empty segment in identifier '{s}'"
                )));
            }
            if !part.chars().all(|c| c == '_' || c.is_ascii_alphanumeric()) {
                return Err(Error::validation(format!(
                    "Invalid character in identifier '{s}'"
                )));
            }
            parts.push(part.to_string());
        }

        Ok(Self { parts })
    }

    /// Render the identifier as backtick-quoted SQL.
    pub fn to_sql(&self) -> String {
        let mut out = String::with_capacity(self.parts.iter().map(|p| p.len() + 3).sum());
        self.write_sql(&mut out);
        out
    }

    pub(crate) fn write_sql(&self, out: &mut String) {
        for (i, part) in self.parts.iter().enumerate() {
            if i > 0 {
                out.push('.');
            }
            out.push('`');
            out.push_str(part);
            out.push('`');
        }
    }
}

static ON_CLAUSE_IDENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b([A-Za-z_][A-Za-z0-9_]*)\.([A-Za-z_][A-Za-z0-9_]*)\b")
        .expect("static regex")
});

/// Quote bare `table.column` tokens inside a join ON condition.
///
/// The ON text is otherwise passed through unchanged, so comparison operators
/// and literals survive. Already-quoted identifiers are not expected here.
pub(crate) fn quote_on_clause(on: &str) -> String {
    ON_CLAUSE_IDENT
        .replace_all(on, "`$1`.`$2`")
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ident_simple() {
        let ident = Ident::parse("users").unwrap();
        assert_eq!(ident.to_sql(), "`users`");
    }

    #[test]
    fn ident_dotted() {
        let ident = Ident::parse("u.name").unwrap();
        assert_eq!(ident.to_sql(), "`u`.`name`");
    }

    #[test]
    fn ident_allows_leading_digit() {
        let ident = Ident::parse("2fa_codes").unwrap();
        assert_eq!(ident.to_sql(), "`2fa_codes`");
    }

    #[test]
    fn ident_rejects_empty() {
        assert!(Ident::parse("").is_err());
    }

    #[test]
    fn ident_rejects_space() {
        assert!(Ident::parse("my table").is_err());
    }

    #[test]
    fn ident_rejects_backtick() {
        assert!(Ident::parse("users`; --").is_err());
    }

    #[test]
    fn ident_rejects_double_dot() {
        assert!(Ident::parse("a..b").is_err());
    }

    #[test]
    fn on_clause_quotes_both_sides() {
        assert_eq!(
            quote_on_clause("u.id = o.user_id"),
            "`u`.`id` = `o`.`user_id`"
        );
    }

    #[test]
    fn on_clause_leaves_literals_alone() {
        assert_eq!(
            quote_on_clause("u.kind = 'admin' AND u.id = m.id"),
            "`u`.`kind` = 'admin' AND `u`.`id` = `m`.`id`"
        );
    }
}
