//! Integration tests against live databases.
//!
//! Each test is skipped unless its environment variable is set:
//! - TEST_MYSQL_HOST (plus optional TEST_MYSQL_USER/PASSWORD/DATABASE)
//! - TEST_REDIS_URL, e.g. redis://localhost:6379/15
//! - TEST_MONGODB_URL, e.g. mongodb://localhost:27017/db_mcp_test

use db_mcp::db::ConnectorRegistry;
use db_mcp::error::DbError;
use db_mcp::security::{AccessPolicy, SecurityMode};
use db_mcp::tools::{
    MongoConnectInput, MongoDeleteInput, MongoFilterInput, MongoInsertManyInput,
    MongoToolHandler, MySqlConnectInput, MySqlQueryInput, MySqlToolHandler, RedisConnectInput,
    RedisKeyInput, RedisSetInput, RedisToolHandler,
};
use serde_json::json;
use std::sync::Arc;

fn shared(mode: SecurityMode) -> (Arc<ConnectorRegistry>, Arc<AccessPolicy>) {
    (
        Arc::new(ConnectorRegistry::new()),
        Arc::new(AccessPolicy::new(mode)),
    )
}

#[tokio::test]
async fn test_mysql_query_and_write() {
    let host = match std::env::var("TEST_MYSQL_HOST") {
        Ok(host) => host,
        Err(_) => {
            eprintln!("Skipping test: TEST_MYSQL_HOST not set");
            return;
        }
    };

    let (registry, policy) = shared(SecurityMode::Restricted);
    let handler = MySqlToolHandler::new(registry.clone(), policy);
    let input: MySqlConnectInput = serde_json::from_value(json!({
        "host": host,
        "user": std::env::var("TEST_MYSQL_USER").unwrap_or_else(|_| "root".to_string()),
        "password": std::env::var("TEST_MYSQL_PASSWORD").unwrap_or_default(),
        "database": std::env::var("TEST_MYSQL_DATABASE").unwrap_or_else(|_| "test".to_string()),
    }))
    .unwrap();
    handler.connect(input).await.expect("connect");

    let output = handler
        .query(MySqlQueryInput {
            sql: "SELECT ? AS greeting, 42 AS answer".to_string(),
            params: serde_json::from_value(json!(["hello"])).unwrap(),
        })
        .await
        .expect("select");
    assert_eq!(output.row_count, 1);
    assert_eq!(output.rows[0]["greeting"], "hello");
    assert_eq!(output.rows[0]["answer"], 42);

    handler
        .query(MySqlQueryInput {
            sql: "CREATE TEMPORARY TABLE db_mcp_tmp (id INT AUTO_INCREMENT PRIMARY KEY, v INT)"
                .to_string(),
            params: vec![],
        })
        .await
        .expect("create");
    let insert = handler
        .query(MySqlQueryInput {
            sql: "INSERT INTO db_mcp_tmp (v) VALUES (1), (2)".to_string(),
            params: vec![],
        })
        .await
        .expect("insert");
    assert_eq!(insert.affected_rows, 2);
    assert!(insert.last_insert_id.is_some());

    assert!(handler.disconnect().await.unwrap().disconnected);
    registry.close_all().await;
}

#[tokio::test]
async fn test_redis_round_trip() {
    let url = match std::env::var("TEST_REDIS_URL") {
        Ok(url) => url,
        Err(_) => {
            eprintln!("Skipping test: TEST_REDIS_URL not set");
            return;
        }
    };

    let (registry, policy) = shared(SecurityMode::FullAccess);
    let handler = RedisToolHandler::new(registry.clone(), policy.clone());
    let input: RedisConnectInput = serde_json::from_value(json!({ "url": url })).unwrap();
    handler.connect(input).await.expect("connect");

    handler
        .set(RedisSetInput {
            key: "db_mcp:test".to_string(),
            value: "v1".to_string(),
            ttl: Some(30),
        })
        .await
        .expect("set");
    let got = handler
        .get(RedisKeyInput {
            key: "db_mcp:test".to_string(),
        })
        .await
        .expect("get");
    assert_eq!(got.value.as_deref(), Some("v1"));

    // Dropping to read_only blocks the cleanup until the mode is restored
    policy.set_mode(SecurityMode::ReadOnly);
    let denied = handler
        .del(RedisKeyInput {
            key: "db_mcp:test".to_string(),
        })
        .await;
    assert!(matches!(denied, Err(DbError::PermissionDenied { .. })));

    policy.set_mode(SecurityMode::FullAccess);
    let deleted = handler
        .del(RedisKeyInput {
            key: "db_mcp:test".to_string(),
        })
        .await
        .expect("del");
    assert_eq!(deleted.deleted, 1);

    registry.close_all().await;
}

#[tokio::test]
async fn test_mongodb_round_trip() {
    let url = match std::env::var("TEST_MONGODB_URL") {
        Ok(url) => url,
        Err(_) => {
            eprintln!("Skipping test: TEST_MONGODB_URL not set");
            return;
        }
    };

    let (registry, policy) = shared(SecurityMode::FullAccess);
    let handler = MongoToolHandler::new(registry.clone(), policy);
    handler
        .connect(MongoConnectInput {
            url,
            database: None,
        })
        .await
        .expect("connect");

    let collection = "db_mcp_test".to_string();
    let inserted = handler
        .insert_many(MongoInsertManyInput {
            collection: collection.clone(),
            documents: vec![json!({"n": 1}), json!({"n": 2})],
        })
        .await
        .expect("insert_many");
    assert_eq!(inserted.inserted_count, 2);

    let count = handler
        .count(MongoFilterInput {
            collection: collection.clone(),
            filter: Some(json!({"n": {"$gte": 1}})),
        })
        .await
        .expect("count");
    assert!(count.count >= 2);

    handler
        .delete_many(MongoDeleteInput {
            collection,
            filter: json!({}),
        })
        .await
        .expect("cleanup");

    registry.close_all().await;
}
