//! Path-pattern router.
//!
//! Routes register a named path template (segments are literals or
//! `prefix{var}suffix` composites), a target identifier, an allowed
//! HTTP-method set, and optional per-variable regex constraints. Matching
//! walks the registry in registration order — first structural match wins,
//! a documented contract rather than any specificity heuristic — then
//! arbitrates the HTTP method among all routes sharing the matched
//! template.
//!
//! Literal file-based routes take precedence: a [`FilesystemRoutes`]
//! collaborator reporting a file for the request path short-circuits
//! pattern matching so templates never shadow conventional pages.

mod template;

use crate::error::{Error, Result};
use regex::Regex;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::str::FromStr;
use template::{Segment, parse_template, split_path};
use tracing::{debug, trace};

/// HTTP request method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Method {
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Head,
    Options,
    Connect,
    Trace,
}

impl Method {
    fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
            Method::Head => "HEAD",
            Method::Options => "OPTIONS",
            Method::Connect => "CONNECT",
            Method::Trace => "TRACE",
        }
    }

    /// Normalize a list of method names into an allowed set.
    ///
    /// Unrecognized input degrades to `{GET}`, and `OPTIONS` is always
    /// implicitly included.
    pub fn parse_set<I, S>(names: I) -> HashSet<Method>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let parsed: HashSet<Method> = names
            .into_iter()
            .filter_map(|name| name.as_ref().parse().ok())
            .collect();
        Self::normalize_set(parsed)
    }

    fn normalize_set(mut set: HashSet<Method>) -> HashSet<Method> {
        if set.is_empty() {
            set.insert(Method::Get);
        }
        set.insert(Method::Options);
        set
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Method {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(Method::Get),
            "POST" => Ok(Method::Post),
            "PUT" => Ok(Method::Put),
            "PATCH" => Ok(Method::Patch),
            "DELETE" => Ok(Method::Delete),
            "HEAD" => Ok(Method::Head),
            "OPTIONS" => Ok(Method::Options),
            "CONNECT" => Ok(Method::Connect),
            "TRACE" => Ok(Method::Trace),
            other => Err(Error::validation(format!("Unknown HTTP method '{other}'"))),
        }
    }
}

/// Reports literal file-based routes for precedence arbitration.
pub trait FilesystemRoutes {
    /// The methods a file-based route supports for `path`, if one exists.
    fn supported_methods(&self, path: &str) -> Option<HashSet<Method>>;
}

/// A [`FilesystemRoutes`] that never resolves anything.
///
/// Useful for pattern-only routing and tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoFilesystemRoutes;

impl FilesystemRoutes for NoFilesystemRoutes {
    fn supported_methods(&self, _path: &str) -> Option<HashSet<Method>> {
        None
    }
}

/// A variable constraint: the pattern as declared, and its anchored form.
///
/// The declared text is what error messages report.
#[derive(Debug, Clone)]
struct Constraint {
    declared: String,
    regex: Regex,
}

/// A registered route.
#[derive(Debug, Clone)]
struct Route {
    name: String,
    /// Normalized template text, used to group routes sharing one shape.
    template: String,
    segments: Vec<Segment>,
    target: String,
    methods: HashSet<Method>,
    patterns: HashMap<String, Constraint>,
}

/// A successful pattern match.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RouteMatch {
    /// Name of the winning route.
    pub name: String,
    /// Resolved target identifier.
    pub target: String,
    /// Extracted variable bindings, published into the request parameters
    /// by the caller.
    pub params: HashMap<String, String>,
}

/// Resolution outcome for one request path.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Outcome {
    /// A pattern route matched.
    Route(RouteMatch),
    /// A literal file-based route takes precedence; no pattern applies.
    Filesystem,
    /// Nothing matched; the caller falls back to filesystem resolution.
    NoMatch,
}

/// Ordered route registry.
#[derive(Debug, Clone, Default)]
pub struct Router {
    routes: Vec<Route>,
}

impl Router {
    /// Create an empty router.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of registered routes.
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    /// Check if no routes are registered.
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Register a named route.
    ///
    /// `methods` normalizes like [`Method::parse_set`]: an empty list
    /// degrades to `{GET}`, and `OPTIONS` is always allowed.
    /// `patterns` maps variable names to regex constraints, anchored to the
    /// whole extracted value.
    ///
    /// Two routes may share one path template when their method sets
    /// differ; arbitration happens at match time. Route names are unique.
    pub fn add(
        &mut self,
        name: &str,
        path: &str,
        target: &str,
        methods: &[Method],
        patterns: &[(&str, &str)],
    ) -> Result<()> {
        if name.is_empty() {
            return Err(Error::validation("Route name cannot be empty"));
        }
        if self.routes.iter().any(|r| r.name == name) {
            return Err(Error::validation(format!("Duplicate route name '{name}'")));
        }

        let segments = parse_template(path)?;
        if segments.is_empty() {
            return Err(Error::validation(format!(
                "Route '{name}' has an empty path template"
            )));
        }

        let var_names: HashSet<&str> = segments
            .iter()
            .filter_map(|s| match s {
                Segment::Var { name, .. } => Some(name.as_str()),
                Segment::Literal(_) => None,
            })
            .collect();

        let mut compiled = HashMap::with_capacity(patterns.len());
        for (var, pattern) in patterns {
            if !var_names.contains(var) {
                return Err(Error::validation(format!(
                    "Route '{name}' constrains unknown variable '{var}'"
                )));
            }
            let regex = Regex::new(&format!("^(?:{pattern})$")).map_err(|e| {
                Error::validation(format!(
                    "Route '{name}': invalid pattern for '{var}': {e}"
                ))
            })?;
            compiled.insert(
                var.to_string(),
                Constraint {
                    declared: pattern.to_string(),
                    regex,
                },
            );
        }

        let methods = Method::normalize_set(methods.iter().copied().collect());

        debug!(route = name, path, target, "registered route");
        self.routes.push(Route {
            name: name.to_string(),
            template: split_path(path).join("/"),
            segments,
            target: target.to_string(),
            methods,
            patterns: compiled,
        });
        Ok(())
    }

    /// Match one request against the registry.
    ///
    /// `path` is the normalized request path (decoded, base prefix
    /// stripped); leading and trailing slashes are ignored.
    pub fn resolve(
        &self,
        method: Method,
        path: &str,
        fs: &impl FilesystemRoutes,
    ) -> Result<Outcome> {
        let normalized = split_path(path).join("/");

        // Literal file-based routes win over patterns.
        if let Some(supported) = fs.supported_methods(&normalized) {
            if supported.contains(&method) {
                trace!(path = %normalized, "filesystem route takes precedence");
                return Ok(Outcome::Filesystem);
            }
        }

        let segments = split_path(path);
        for route in &self.routes {
            let Some(params) = self.try_match(route, &segments)? else {
                continue;
            };

            // Method arbitration across every route sharing this template.
            let winner = self
                .routes
                .iter()
                .filter(|r| r.template == route.template)
                .find(|r| r.methods.contains(&method));
            let Some(winner) = winner else {
                return Err(Error::MethodNotAllowed {
                    method,
                    route: route.name.clone(),
                });
            };

            debug!(route = %winner.name, target = %winner.target, "route matched");
            return Ok(Outcome::Route(RouteMatch {
                name: winner.name.clone(),
                target: winner.target.clone(),
                params,
            }));
        }

        Ok(Outcome::NoMatch)
    }

    /// Structural match of one route against the path segments.
    ///
    /// Returns the variable bindings on success. A binding that violates
    /// the route's declared pattern is an error, not a non-match.
    fn try_match(
        &self,
        route: &Route,
        segments: &[&str],
    ) -> Result<Option<HashMap<String, String>>> {
        if segments.len() != route.segments.len() {
            return Ok(None);
        }

        let mut params = HashMap::new();
        for (template_seg, actual) in route.segments.iter().zip(segments) {
            let Some(binding) = template_seg.capture(actual) else {
                return Ok(None);
            };
            if let Some((var, value)) = binding {
                if let Some(constraint) = route.patterns.get(var) {
                    if !constraint.regex.is_match(value) {
                        return Err(Error::InvalidArgument {
                            value: value.to_string(),
                            pattern: constraint.declared.clone(),
                        });
                    }
                }
                params.insert(var.to_string(), value.to_string());
            }
        }
        Ok(Some(params))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct StaticFiles {
        paths: HashMap<String, HashSet<Method>>,
    }

    impl StaticFiles {
        fn with(path: &str, methods: &[Method]) -> Self {
            let mut paths = HashMap::new();
            paths.insert(
                path.to_string(),
                Method::normalize_set(methods.iter().copied().collect()),
            );
            Self { paths }
        }
    }

    impl FilesystemRoutes for StaticFiles {
        fn supported_methods(&self, path: &str) -> Option<HashSet<Method>> {
            self.paths.get(path).cloned()
        }
    }

    fn router_with(entries: &[(&str, &str, &str)]) -> Router {
        let mut router = Router::new();
        for (name, path, target) in entries {
            router.add(name, path, target, &[Method::Get], &[]).unwrap();
        }
        router
    }

    #[test]
    fn matches_template_and_extracts_variable() {
        let router = router_with(&[("post_edit", "/post/{id}/edit", "/post/edit")]);
        let outcome = router
            .resolve(Method::Get, "post/2/edit", &NoFilesystemRoutes)
            .unwrap();
        let Outcome::Route(m) = outcome else {
            panic!("expected a route match");
        };
        assert_eq!(m.target, "/post/edit");
        assert_eq!(m.params.get("id").map(String::as_str), Some("2"));
    }

    #[test]
    fn segment_count_mismatch_skips_template() {
        let router = router_with(&[("post_edit", "/post/{id}/edit", "/post/edit")]);
        let outcome = router
            .resolve(Method::Get, "post/2", &NoFilesystemRoutes)
            .unwrap();
        assert_eq!(outcome, Outcome::NoMatch);
    }

    #[test]
    fn pattern_violation_is_invalid_argument() {
        let mut router = Router::new();
        router
            .add(
                "blog",
                "/blog/{id}/{slug}",
                "/blog/view",
                &[Method::Get],
                &[("id", r"\d+")],
            )
            .unwrap();
        let err = router
            .resolve(Method::Get, "blog/1a/hello", &NoFilesystemRoutes)
            .unwrap_err();
        let Error::InvalidArgument { value, pattern } = err else {
            panic!("expected InvalidArgument, got {err:?}");
        };
        assert_eq!(value, "1a");
        assert_eq!(pattern, r"\d+");
    }

    #[test]
    fn pattern_pass_binds_both_variables() {
        let mut router = Router::new();
        router
            .add(
                "blog",
                "/blog/{id}/{slug}",
                "/blog/view",
                &[Method::Get],
                &[("id", r"\d+")],
            )
            .unwrap();
        let Outcome::Route(m) = router
            .resolve(Method::Get, "blog/12/hello-world", &NoFilesystemRoutes)
            .unwrap()
        else {
            panic!("expected a route match");
        };
        assert_eq!(m.params.get("id").map(String::as_str), Some("12"));
        assert_eq!(m.params.get("slug").map(String::as_str), Some("hello-world"));
    }

    #[test]
    fn wrong_method_is_method_not_allowed() {
        let mut router = Router::new();
        router
            .add("submit", "/form/submit", "/form/submit", &[Method::Post], &[])
            .unwrap();
        let err = router
            .resolve(Method::Get, "form/submit", &NoFilesystemRoutes)
            .unwrap_err();
        assert!(err.is_method_not_allowed());
    }

    #[test]
    fn options_is_always_allowed() {
        let mut router = Router::new();
        router
            .add("submit", "/form/submit", "/form/submit", &[Method::Post], &[])
            .unwrap();
        let outcome = router
            .resolve(Method::Options, "form/submit", &NoFilesystemRoutes)
            .unwrap();
        assert!(matches!(outcome, Outcome::Route(_)));
    }

    #[test]
    fn disjoint_method_sets_share_one_template() {
        let mut router = Router::new();
        router
            .add("item_view", "/item/{id}", "/item/view", &[Method::Get], &[])
            .unwrap();
        router
            .add("item_update", "/item/{id}", "/item/update", &[Method::Post], &[])
            .unwrap();

        let Outcome::Route(get) = router
            .resolve(Method::Get, "item/5", &NoFilesystemRoutes)
            .unwrap()
        else {
            panic!("expected GET match");
        };
        assert_eq!(get.target, "/item/view");

        let Outcome::Route(post) = router
            .resolve(Method::Post, "item/5", &NoFilesystemRoutes)
            .unwrap()
        else {
            panic!("expected POST match");
        };
        assert_eq!(post.target, "/item/update");
        assert_eq!(post.params.get("id").map(String::as_str), Some("5"));
    }

    #[test]
    fn composite_segment_extracts_variable() {
        let router = router_with(&[("comment", "/thread/{tid}/comment{cid}", "/comment/view")]);
        let Outcome::Route(m) = router
            .resolve(Method::Get, "thread/9/comment4", &NoFilesystemRoutes)
            .unwrap()
        else {
            panic!("expected a route match");
        };
        assert_eq!(m.params.get("cid").map(String::as_str), Some("4"));
        assert_eq!(m.params.get("tid").map(String::as_str), Some("9"));
    }

    #[test]
    fn first_registered_template_wins() {
        let mut router = Router::new();
        router
            .add("first", "/page/{a}", "/first", &[Method::Get], &[])
            .unwrap();
        router
            .add("second", "/page/{b}", "/second", &[Method::Get], &[])
            .unwrap();
        let Outcome::Route(m) = router
            .resolve(Method::Get, "page/x", &NoFilesystemRoutes)
            .unwrap()
        else {
            panic!("expected a route match");
        };
        assert_eq!(m.target, "/first");
    }

    #[test]
    fn filesystem_route_takes_precedence() {
        let router = router_with(&[("about", "/about", "/pattern/about")]);
        let fs = StaticFiles::with("about", &[Method::Get]);
        let outcome = router.resolve(Method::Get, "about", &fs).unwrap();
        assert_eq!(outcome, Outcome::Filesystem);
    }

    #[test]
    fn filesystem_route_denied_method_falls_through_to_patterns() {
        let mut router = Router::new();
        router
            .add("about_post", "/about", "/pattern/about", &[Method::Post], &[])
            .unwrap();
        let fs = StaticFiles::with("about", &[Method::Get]);
        let outcome = router.resolve(Method::Post, "about", &fs).unwrap();
        assert!(matches!(outcome, Outcome::Route(_)));
    }

    #[test]
    fn no_match_returns_nomatch() {
        let router = router_with(&[("post_edit", "/post/{id}/edit", "/post/edit")]);
        let outcome = router
            .resolve(Method::Get, "user/profile", &NoFilesystemRoutes)
            .unwrap();
        assert_eq!(outcome, Outcome::NoMatch);
    }

    #[test]
    fn duplicate_route_name_is_rejected() {
        let mut router = Router::new();
        router.add("a", "/x", "/x", &[Method::Get], &[]).unwrap();
        let err = router.add("a", "/y", "/y", &[Method::Get], &[]).unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn unknown_constraint_variable_is_rejected() {
        let mut router = Router::new();
        let err = router
            .add("a", "/post/{id}", "/x", &[Method::Get], &[("slug", r"\w+")])
            .unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn empty_method_list_defaults_to_get() {
        let mut router = Router::new();
        router.add("a", "/x", "/x", &[], &[]).unwrap();
        assert!(matches!(
            router.resolve(Method::Get, "x", &NoFilesystemRoutes).unwrap(),
            Outcome::Route(_)
        ));
        assert!(
            router
                .resolve(Method::Post, "x", &NoFilesystemRoutes)
                .is_err()
        );
    }

    #[test]
    fn parse_set_degrades_unrecognized_to_get() {
        let set = Method::parse_set(["BOGUS"]);
        assert!(set.contains(&Method::Get));
        assert!(set.contains(&Method::Options));
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn parse_set_is_case_insensitive() {
        let set = Method::parse_set(["post", "Delete"]);
        assert!(set.contains(&Method::Post));
        assert!(set.contains(&Method::Delete));
        assert!(set.contains(&Method::Options));
    }

    #[test]
    fn trailing_slashes_are_ignored() {
        let router = router_with(&[("post_edit", "/post/{id}/edit", "/post/edit")]);
        let outcome = router
            .resolve(Method::Get, "/post/2/edit/", &NoFilesystemRoutes)
            .unwrap();
        assert!(matches!(outcome, Outcome::Route(_)));
    }
}
