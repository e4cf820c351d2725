//! # trellis
//!
//! Query building and request routing for database-backed web applications.
//!
//! ## Features
//!
//! - **SQL explicit**: the builder emits readable statements with named
//!   `:placeholder` binds; nothing is hidden behind a schema layer
//! - **Typed conditions**: AND/OR/NOT condition trees compile to
//!   parameterized WHERE clauses, with a map-literal adapter for the
//!   associative-condition style
//! - **Fixed clause order**: statements always render
//!   `SELECT → FROM → JOIN → WHERE → GROUP BY → HAVING → ORDER BY → LIMIT`,
//!   regardless of mutator call order
//! - **Safe defaults**: identifiers are validated and quoted, values only
//!   ever travel through binds, raw SQL requires an explicit escape hatch
//! - **Pattern routing**: named path templates with `{var}` extraction,
//!   per-variable regex constraints, and HTTP-method arbitration
//!
//! ## Query Builder (qb)
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
//!
//! ## Router
//!
//! ```ignore
//! use trellis::router::{Method, NoFilesystemRoutes, Outcome, Router};
//!
//! let mut router = Router::new();
//! router.add("post_edit", "/post/{id}/edit", "/post/edit", &[Method::Get], &[])?;
//!
//! match router.resolve(Method::Get, "/post/2/edit", &NoFilesystemRoutes)? {
//!     Outcome::Route(m) => println!("{} -> {:?}", m.target, m.params),
//!     Outcome::Filesystem => { /* serve the file-based page */ }
//!     Outcome::NoMatch => { /* fall back to filesystem resolution */ }
//! }
//! ```

pub mod error;
pub mod executor;
pub mod ident;
pub mod qb;
pub mod router;
pub mod value;

pub use error::{Error, Result};
pub use executor::{Executor, Row};
pub use ident::Ident;
pub use qb::{
    Aggregate, BindMap, Cond, Direction, JoinKind, Joiner, MapValue, Op, Operand, SelectQuery,
    Wildcard, db_and, db_or, select, select_as,
};
pub use router::{
    FilesystemRoutes, Method, NoFilesystemRoutes, Outcome, RouteMatch, Router,
};
pub use value::Value;
