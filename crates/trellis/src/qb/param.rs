//! Named bind-parameter storage with deterministic collision avoidance.

use crate::value::Value;

/// Insertion-ordered map from placeholder name to bound value.
///
/// Placeholder names derive from the field they bind: characters outside
/// `[A-Za-z0-9_]` are replaced with `_`, and when the same base name is
/// already bound a numeric suffix is appended, incrementing from the highest
/// suffix already present. Each builder owns its own `BindMap`, so two
/// statements never share a placeholder namespace.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BindMap {
    entries: Vec<(String, Value)>,
}

impl BindMap {
    /// Create an empty bind map.
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Number of bound values.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if no values are bound.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Check whether a placeholder name is already in use.
    pub fn contains(&self, name: &str) -> bool {
        self.entries.iter().any(|(n, _)| n == name)
    }

    /// Look up a bound value by placeholder name.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }

    /// Iterate over `(placeholder, value)` pairs in bind order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v))
    }

    /// Remove all bound values.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Bind a value under a collision-free placeholder derived from `field`.
    ///
    /// Returns the placeholder name actually used (without the `:` sigil).
    pub fn bind(&mut self, field: &str, value: Value) -> String {
        let name = self.alloc(field);
        self.entries.push((name.clone(), value));
        name
    }

    /// Compute the next free placeholder name for `field`.
    fn alloc(&self, field: &str) -> String {
        let base = sanitize(field);
        if !self.contains(&base) {
            return base;
        }

        // Highest numeric suffix already used for this base, then one more.
        let mut max: i64 = -1;
        for (name, _) in &self.entries {
            if let Some(rest) = name.strip_prefix(&base) {
                if rest.is_empty() {
                    continue;
                }
                if rest.chars().all(|c| c.is_ascii_digit()) {
                    if let Ok(n) = rest.parse::<i64>() {
                        max = max.max(n);
                    }
                }
            }
        }
        format!("{base}{}", max + 1)
    }
}

/// Replace characters outside `[A-Za-z0-9_]` with `_`.
fn sanitize(field: &str) -> String {
    field
        .chars()
        .map(|c| {
            if c == '_' || c.is_ascii_alphanumeric() {
                c
            } else {
                '_'
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_bind_uses_bare_name() {
        let mut binds = BindMap::new();
        assert_eq!(binds.bind("status", Value::from("open")), "status");
    }

    #[test]
    fn repeated_field_gets_numeric_suffix() {
        let mut binds = BindMap::new();
        assert_eq!(binds.bind("age", Value::Int(18)), "age");
        assert_eq!(binds.bind("age", Value::Int(65)), "age0");
        assert_eq!(binds.bind("age", Value::Int(99)), "age1");
    }

    #[test]
    fn suffix_continues_from_highest() {
        let mut binds = BindMap::new();
        binds.bind("id", Value::Int(1)); // id
        binds.bind("id5", Value::Int(2)); // id5
        assert_eq!(binds.bind("id", Value::Int(3)), "id6");
    }

    #[test]
    fn dotted_field_is_sanitized() {
        let mut binds = BindMap::new();
        assert_eq!(binds.bind("u.name", Value::from("x")), "u_name");
    }

    #[test]
    fn lookup_and_order() {
        let mut binds = BindMap::new();
        binds.bind("a", Value::Int(1));
        binds.bind("b", Value::Int(2));
        assert_eq!(binds.get("b"), Some(&Value::Int(2)));
        let names: Vec<&str> = binds.iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["a", "b"]);
    }
}
