//! Path template parsing and segment matching.
//!
//! A template is a `/`-separated sequence of segments. A segment is either
//! a literal or a composite `prefix{var}suffix` where the literal prefix
//! and suffix may be empty (`comment{cid}` extracts `cid` from
//! `comment4`).

use crate::error::{Error, Result};

/// One parsed template segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Segment {
    Literal(String),
    Var {
        prefix: String,
        name: String,
        suffix: String,
    },
}

impl Segment {
    /// Match a real path segment, returning the extracted variable if any.
    ///
    /// `None` means the segment does not match this template position.
    pub(crate) fn capture<'a>(&self, actual: &'a str) -> Option<Option<(&str, &'a str)>> {
        match self {
            Segment::Literal(lit) => (lit == actual).then_some(None),
            Segment::Var {
                prefix,
                name,
                suffix,
            } => {
                let value = actual.strip_prefix(prefix.as_str())?;
                let value = value.strip_suffix(suffix.as_str())?;
                if value.is_empty() {
                    return None;
                }
                Some(Some((name.as_str(), value)))
            }
        }
    }
}

/// Trim leading/trailing slashes and split a path into segments.
pub(crate) fn split_path(path: &str) -> Vec<&str> {
    path.trim_matches('/')
        .split('/')
        .filter(|s| !s.is_empty())
        .collect()
}

/// Parse a path template into segments.
pub(crate) fn parse_template(path: &str) -> Result<Vec<Segment>> {
    let mut segments = Vec::new();
    for raw in split_path(path) {
        segments.push(parse_segment(raw, path)?);
    }
    Ok(segments)
}

fn parse_segment(raw: &str, template: &str) -> Result<Segment> {
    let Some(open) = raw.find('{') else {
        if raw.contains('}') {
            return Err(Error::validation(format!(
                "Unmatched '}}' in route template '{template}'"
            )));
        }
        return Ok(Segment::Literal(raw.to_string()));
    };

    let Some(close) = raw[open..].find('}').map(|i| open + i) else {
        return Err(Error::validation(format!(
            "Unclosed '{{' in route template '{template}'"
        )));
    };

    let name = &raw[open + 1..close];
    if name.is_empty() {
        return Err(Error::validation(format!(
            "Empty variable name in route template '{template}'"
        )));
    }
    if !name
        .chars()
        .all(|c| c == '_' || c.is_ascii_alphanumeric())
        || name.chars().next().is_some_and(|c| c.is_ascii_digit())
    {
        return Err(Error::validation(format!(
            "Invalid variable name '{name}' in route template '{template}'"
        )));
    }

    let suffix = &raw[close + 1..];
    if suffix.contains('{') || suffix.contains('}') {
        return Err(Error::validation(format!(
            "At most one variable per segment in route template '{template}'"
        )));
    }

    Ok(Segment::Var {
        prefix: raw[..open].to_string(),
        name: name.to_string(),
        suffix: suffix.to_string(),
    })
}
