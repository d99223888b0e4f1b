use super::*;
use crate::client::Connection;
use crate::condition::Match;
use crate::error::{OrmError, OrmResult};
use crate::value::{ExecResult, Row, Value};

/// Records statements and returns canned results.
#[derive(Default)]
struct RecordingConn {
    statements: Vec<(String, Vec<Value>)>,
}

impl Connection for RecordingConn {
    async fn query(&mut self, sql: &str, params: &[Value]) -> OrmResult<Vec<Row>> {
        self.statements.push((sql.to_string(), params.to_vec()));
        Ok(vec![Row::from_pairs([("id", 1)])])
    }

    async fn execute(&mut self, sql: &str, params: &[Value]) -> OrmResult<ExecResult> {
        self.statements.push((sql.to_string(), params.to_vec()));
        Ok(ExecResult {
            rows_affected: 1,
            last_insert_id: 42,
        })
    }

    async fn close(self) -> OrmResult<()> {
        Ok(())
    }
}

#[tokio::test]
async fn fetch_all_submits_built_query() {
    let mut conn = RecordingConn::default();
    let rows = select("users")
        .where_match("name", "alice")
        .fetch_all(&mut conn)
        .await
        .unwrap();

    assert_eq!(rows[0].get("id"), Some(&Value::Int(1)));
    assert_eq!(
        conn.statements,
        vec![(
            "SELECT * FROM `users` WHERE `name` = ?".to_string(),
            vec![Value::from("alice")]
        )]
    );
}

#[tokio::test]
async fn execute_validates_before_submitting() {
    let mut conn = RecordingConn::default();
    let err = update("users")
        .where_match("id", 1)
        .execute(&mut conn)
        .await
        .unwrap_err();

    assert!(matches!(err, OrmError::Validation(_)));
    assert!(conn.statements.is_empty());
}

#[tokio::test]
async fn insert_reports_last_insert_id() {
    let mut conn = RecordingConn::default();
    let res = insert("users")
        .set("name", "bob")
        .execute(&mut conn)
        .await
        .unwrap();
    assert_eq!(res.last_insert_id, 42);
}

#[test]
fn builders_are_independent_values() {
    let base = select("users").where_match("active", true);
    let admins = base.clone().where_match("role", "admin").limit(1);

    assert_eq!(base.to_sql(), "SELECT * FROM `users` WHERE `active` = ?");
    assert_eq!(
        admins.to_sql(),
        "SELECT * FROM `users` WHERE `active` = ? AND `role` = ? LIMIT 1"
    );
}

#[test]
fn nested_or_inside_and() {
    let q = remove("sessions")
        .where_match("user_id", 3)
        .and_expr(Expr::or(vec![
            Expr::from_match("expires_at", Match::lt("2024-01-01")),
            Expr::from_match("revoked", Match::eq(true)),
        ]))
        .build();
    assert_eq!(
        q.sql,
        "DELETE FROM `sessions` WHERE `user_id` = ? AND (`expires_at` < ? OR `revoked` = ?)"
    );
    assert_eq!(q.params.len(), 3);
}
