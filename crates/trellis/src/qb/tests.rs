//! Cross-cutting query builder tests.

use super::*;
use crate::error::Result;
use crate::executor::{Executor, Row};
use crate::value::Value;
use std::sync::Mutex;

#[test]
fn default_selection_is_alias_star() {
    let mut q = select("users");
    assert_eq!(q.build().unwrap(), "SELECT `users`.* FROM `users`");
}

#[test]
fn aliased_table() {
    let mut q = select_as("users", "u");
    assert_eq!(q.build().unwrap(), "SELECT `u`.* FROM `users` AS `u`");
}

#[test]
fn explicit_fields_and_output_alias() {
    let mut q = select("users")
        .field("id")
        .field_as("name", "user_name");
    assert_eq!(
        q.build().unwrap(),
        "SELECT `users`.`id`, `users`.`name` AS `user_name` FROM `users`"
    );
}

#[test]
fn raw_field_bypasses_quoting() {
    let mut q = select("posts").raw_field_as("DATE_FORMAT(created_at, '%Y-%m')", "month");
    assert_eq!(
        q.build().unwrap(),
        "SELECT DATE_FORMAT(created_at, '%Y-%m') AS `month` FROM `posts`"
    );
}

#[test]
fn join_quotes_on_clause() {
    let mut q = select_as("users", "u")
        .left_join("orders", "o", "u.id = o.user_id");
    assert_eq!(
        q.build().unwrap(),
        "SELECT `u`.* FROM `users` AS `u` LEFT JOIN `orders` AS `o` ON `u`.`id` = `o`.`user_id`"
    );
}

#[test]
fn clause_order_is_fixed_regardless_of_call_order() {
    // Mutators invoked back to front; emitted clause order must not change.
    let mut q = select_as("orders", "o")
        .limit_offset(20, 10)
        .order_by("total", Direction::Desc)
        .having_cond(Cond::gt("cnt", 5i64))
        .group_by("user_id")
        .where_cond(Cond::eq("status", "paid"))
        .join("users", "u", "u.id = o.user_id")
        .count("*", "cnt");
    let sql = q.build().unwrap();
    assert_eq!(
        sql,
        "SELECT COUNT(*) AS `cnt` FROM `orders` AS `o` \
         INNER JOIN `users` AS `u` ON `u`.`id` = `o`.`user_id` \
         WHERE `status` = :status \
         GROUP BY `user_id` \
         HAVING `cnt` > :cnt \
         ORDER BY `total` DESC \
         LIMIT 20, 10"
    );
}

#[test]
fn build_is_idempotent() {
    let mut q = select("users")
        .eq("status", "active")
        .where_cond(Cond::gte("age", 18i64));
    let first = q.build().unwrap();
    let second = q.build().unwrap();
    assert_eq!(first, second);
}

#[test]
fn mutation_invalidates_cache() {
    let mut q = select("users").eq("status", "active");
    let first = q.build().unwrap();
    let mut q = q.limit(5);
    let second = q.build().unwrap();
    assert_ne!(first, second);
    assert!(second.ends_with("LIMIT 5"));
}

#[test]
fn where_blocks_join_with_and_even_when_or_tagged() {
    let mut q = select("posts")
        .where_cond(Cond::eq("status", "published"))
        .or_where(db_and(vec![
            ("author_id", 7i64.into()),
            ("pinned", true.into()),
        ]));
    assert_eq!(
        q.build().unwrap(),
        "SELECT `posts`.* FROM `posts` WHERE `status` = :status \
         AND (`author_id` = :author_id OR `pinned` = :pinned)"
    );
}

#[test]
fn placeholders_stay_distinct_across_blocks() {
    let mut q = select("users")
        .where_cond(Cond::gte("age", 18i64))
        .where_cond(Cond::lte("age", 65i64));
    let sql = q.build().unwrap();
    assert_eq!(
        sql,
        "SELECT `users`.* FROM `users` WHERE `age` >= :age AND `age` <= :age0"
    );
    assert_eq!(q.binds().get("age"), Some(&Value::Int(18)));
    assert_eq!(q.binds().get("age0"), Some(&Value::Int(65)));
}

#[test]
fn condition_escape_hatch_builds_one_or_block() {
    let mut q = select("tickets")
        .condition("state", Op::Eq, "open")
        .condition("state", Op::Eq, "pending")
        .end_condition(Joiner::Or);
    assert_eq!(
        q.build().unwrap(),
        "SELECT `tickets`.* FROM `tickets` WHERE (`state` = :state OR `state` = :state0)"
    );
}

#[test]
fn exists_without_where_drops_connector() {
    let mut q = select("users").exists("SELECT 1 FROM bans b WHERE b.user_id = users.id");
    assert_eq!(
        q.build().unwrap(),
        "SELECT `users`.* FROM `users` WHERE EXISTS (SELECT 1 FROM bans b WHERE b.user_id = users.id)"
    );
}

#[test]
fn exists_after_where_keeps_connector() {
    let mut q = select("users")
        .eq("status", "active")
        .not_exists("SELECT 1 FROM bans b WHERE b.user_id = users.id");
    let sql = q.build().unwrap();
    assert!(sql.contains("WHERE `status` = :status AND NOT EXISTS ("));
}

#[test]
fn join_kind_selects_the_join_type() {
    let mut q = select_as("users", "u")
        .join_kind("orders", "o", "u.id = o.user_id", JoinKind::Right);
    assert_eq!(
        q.build().unwrap(),
        "SELECT `u`.* FROM `users` AS `u` RIGHT JOIN `orders` AS `o` ON `u`.`id` = `o`.`user_id`"
    );
}

#[test]
fn aggregate_entry_point_takes_the_function() {
    let mut q = select("orders").aggregate(Aggregate::Avg, "total", "avg_total");
    assert_eq!(
        q.build().unwrap(),
        "SELECT AVG(`total`) AS `avg_total` FROM `orders`"
    );
}

#[test]
fn aggregates_accumulate() {
    let mut q = select("orders")
        .count("*", "cnt")
        .sum("total", "sum_total")
        .max("total", "max_total");
    assert_eq!(
        q.build().unwrap(),
        "SELECT COUNT(*) AS `cnt`, SUM(`total`) AS `sum_total`, MAX(`total`) AS `max_total` FROM `orders`"
    );
}

#[test]
fn limit_forms() {
    let mut q = select("users").limit(10);
    assert!(q.build().unwrap().ends_with("LIMIT 10"));

    let mut q = select("users").limit_offset(30, 10);
    assert!(q.build().unwrap().ends_with("LIMIT 30, 10"));
}

#[test]
fn invalid_identifier_surfaces_at_build() {
    let mut q = select("users").field("name; DROP TABLE users");
    let err = q.build().unwrap_err();
    assert!(err.is_validation());
}

#[test]
fn invalid_table_surfaces_at_build() {
    let mut q = select("users; --");
    assert!(q.build().unwrap_err().is_validation());
}

#[test]
fn ready_sql_substitutes_bound_values() {
    let mut q = select("t").where_cond(db_and(vec![
        ("a", 1i64.into()),
        ("b", 2i64.into()),
        (
            "$or",
            MapValue::group(vec![
                ("c", MapValue::list([1i64, 2, 3])),
                ("c >=", 10i64.into()),
            ]),
        ),
    ]));
    let ready = q.ready_sql().unwrap();
    assert_eq!(
        ready,
        "SELECT `t`.* FROM `t` WHERE `a` = 1 AND `b` = 2 AND (`c` IN (1, 2, 3) OR `c` >= 10)"
    );
}

#[test]
fn ready_sql_quotes_text_values() {
    let mut q = select("users").eq("name", "o'hara");
    let ready = q.ready_sql().unwrap();
    assert!(ready.ends_with("WHERE `name` = 'o''hara'"));
}

// ==================== Execution ====================

struct MockExecutor {
    rows: Vec<Row>,
    calls: Mutex<Vec<(String, BindMap)>>,
}

impl MockExecutor {
    fn new(rows: Vec<Row>) -> Self {
        Self {
            rows,
            calls: Mutex::new(Vec::new()),
        }
    }

    fn last_call(&self) -> (String, BindMap) {
        self.calls.lock().unwrap().last().cloned().unwrap()
    }
}

impl Executor for MockExecutor {
    async fn query(&self, sql: &str, binds: &BindMap) -> Result<Vec<Row>> {
        self.calls
            .lock()
            .unwrap()
            .push((sql.to_string(), binds.clone()));
        Ok(self.rows.clone())
    }

    async fn execute(&self, sql: &str, binds: &BindMap) -> Result<u64> {
        self.calls
            .lock()
            .unwrap()
            .push((sql.to_string(), binds.clone()));
        Ok(self.rows.len() as u64)
    }
}

fn sample_rows() -> Vec<Row> {
    vec![
        Row::from_pairs([
            ("id".to_string(), Value::Int(1)),
            ("name".to_string(), Value::from("alice")),
        ]),
        Row::from_pairs([
            ("id".to_string(), Value::Int(2)),
            ("name".to_string(), Value::from("bob")),
        ]),
    ]
}

#[tokio::test]
async fn execute_passes_sql_and_binds() {
    let conn = MockExecutor::new(sample_rows());
    let mut q = select("users").eq("status", "active");
    let rows = q.execute(&conn).await.unwrap();
    assert_eq!(rows.len(), 2);

    let (sql, binds) = conn.last_call();
    assert_eq!(sql, "SELECT `users`.* FROM `users` WHERE `status` = :status");
    assert_eq!(binds.get("status"), Some(&Value::from("active")));
}

#[tokio::test]
async fn fetch_opt_forces_limit_one() {
    let conn = MockExecutor::new(sample_rows());
    let mut q = select("users");
    let row = q.fetch_opt(&conn).await.unwrap().unwrap();
    assert_eq!(row.get("id"), Some(&Value::Int(1)));

    let (sql, _) = conn.last_call();
    assert!(sql.ends_with("LIMIT 1"));
}

#[tokio::test]
async fn fetch_one_errors_on_empty() {
    let conn = MockExecutor::new(Vec::new());
    let mut q = select("users").eq("id", 999i64);
    let err = q.fetch_one(&conn).await.unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn fetch_scalar_returns_first_column() {
    let conn = MockExecutor::new(sample_rows());
    let mut q = select("users").count("*", "cnt");
    let value = q.fetch_scalar(&conn).await.unwrap();
    assert_eq!(value, Some(Value::Int(1)));
}

#[tokio::test]
async fn fetch_column_collects_values() {
    let conn = MockExecutor::new(sample_rows());
    let mut q = select("users");
    let names = q.fetch_column(&conn, "name").await.unwrap();
    assert_eq!(names, vec![Value::from("alice"), Value::from("bob")]);
}
