use hybrid_dao::DaoError;
use hybrid_dao::config::Config;
use hybrid_dao::db::GatewayHandle;
use serde_json::{Value, json};

fn memory_config() -> Config {
    Config::default().with_database_url("sqlite::memory:")
}

#[tokio::test]
async fn cells_decode_by_dynamic_type() {
    let gateway = GatewayHandle::spawn(&memory_config()).await.unwrap();
    gateway
        .execute("CREATE TABLE t (a, b, c, d, e, f)", Vec::new())
        .await
        .unwrap();
    gateway
        .execute(
            "INSERT INTO t (a, b, c, d, e, f) VALUES (?, ?, ?, ?, ?, x'0102')",
            vec![json!(42), json!(2.5), json!("text"), Value::Null, json!(true)],
        )
        .await
        .unwrap();

    let rows = gateway.fetch("SELECT * FROM t", Vec::new()).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(
        Value::Object(rows[0].clone()),
        json!({"a": 42, "b": 2.5, "c": "text", "d": null, "e": 1, "f": "AQI="})
    );
    gateway.close().await.unwrap();
}

#[tokio::test]
async fn nested_values_are_bound_as_json_text() {
    let gateway = GatewayHandle::spawn(&memory_config()).await.unwrap();
    gateway
        .execute("CREATE TABLE t (v TEXT)", Vec::new())
        .await
        .unwrap();
    gateway
        .execute(
            "INSERT INTO t (v) VALUES (?), (?)",
            vec![json!({"k": [1, 2]}), json!(["a"])],
        )
        .await
        .unwrap();

    let rows = gateway
        .fetch("SELECT v FROM t ORDER BY rowid", Vec::new())
        .await
        .unwrap();
    let first: Value = serde_json::from_str(rows[0]["v"].as_str().unwrap()).unwrap();
    assert_eq!(first, json!({"k": [1, 2]}));
    assert_eq!(rows[1]["v"], json!(r#"["a"]"#));
}

#[tokio::test]
async fn execute_reports_rows_affected() {
    let gateway = GatewayHandle::spawn(&memory_config()).await.unwrap();
    gateway
        .execute("CREATE TABLE t (id TEXT UNIQUE)", Vec::new())
        .await
        .unwrap();
    for id in ["a", "b", "c"] {
        gateway
            .execute("INSERT INTO t (id) VALUES (?)", vec![json!(id)])
            .await
            .unwrap();
    }

    let deleted = gateway
        .execute("DELETE FROM t WHERE id <> ?", vec![json!("a")])
        .await
        .unwrap();
    assert_eq!(deleted, 2);
    let none = gateway
        .execute("DELETE FROM t WHERE id = ?", vec![json!("zzz")])
        .await
        .unwrap();
    assert_eq!(none, 0);
}

#[tokio::test]
async fn unique_violation_maps_to_constraint_error() {
    let gateway = GatewayHandle::spawn(&memory_config()).await.unwrap();
    gateway
        .execute("CREATE TABLE t (id TEXT UNIQUE)", Vec::new())
        .await
        .unwrap();
    gateway
        .execute("INSERT INTO t (id) VALUES ('a')", Vec::new())
        .await
        .unwrap();
    let err = gateway
        .execute("INSERT INTO t (id) VALUES ('a')", Vec::new())
        .await
        .unwrap_err();
    assert!(matches!(err, DaoError::ConstraintViolation(_)), "unexpected error: {err}");
}

#[tokio::test]
async fn bad_sql_is_a_database_error() {
    let gateway = GatewayHandle::spawn(&memory_config()).await.unwrap();
    let err = gateway
        .fetch("SELECT * FROM missing_table", Vec::new())
        .await
        .unwrap_err();
    assert!(matches!(err, DaoError::Database(_)), "unexpected error: {err}");
}

#[tokio::test]
async fn invalid_url_is_store_unavailable() {
    let cfg = Config::default().with_database_url("postgres://nope");
    let err = GatewayHandle::spawn(&cfg).await.err().expect("spawn must fail");
    assert!(matches!(err, DaoError::StoreUnavailable(_)));
}
