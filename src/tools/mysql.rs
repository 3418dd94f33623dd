//! MySQL tools.
//!
//! This module implements `mysql_connect`, `mysql_query`, `mysql_disconnect`
//! and `mysql_pool_status`. Only `mysql_query` is gated; its SQL text goes
//! through the policy's SQL rules before any connector is looked up.

use crate::db::{ConnectorRegistry, MySqlConnector, PoolStatus};
use crate::error::DbResult;
use crate::models::connection::DEFAULT_MYSQL_USER;
use crate::models::{MySqlConfig, PoolSettings, QueryParam};
use crate::security::AccessPolicy;
use crate::tools::DisconnectOutput;
use crate::tools::guard::ensure_sql_allowed;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::sync::Arc;
use tracing::info;

fn default_user() -> String {
    DEFAULT_MYSQL_USER.to_string()
}

/// Input for the mysql_connect tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct MySqlConnectInput {
    /// MySQL host address
    pub host: String,
    /// MySQL port. Default: 3306
    #[serde(default)]
    pub port: Option<u16>,
    /// MySQL user name. Default: root
    #[serde(default = "default_user")]
    pub user: String,
    /// MySQL password
    #[serde(default)]
    pub password: String,
    /// Default database (optional)
    #[serde(default)]
    pub database: Option<String>,
    /// Use a connection pool. Only honored together with `pool`.
    #[serde(default)]
    pub use_pool: bool,
    /// Pool settings: min (default 2), max (default 10), idle_timeout in ms (default 60000)
    #[serde(default)]
    pub pool: Option<PoolSettings>,
}

impl MySqlConnectInput {
    fn into_config(self) -> (MySqlConfig, bool) {
        let config = MySqlConfig {
            host: self.host,
            port: self.port,
            user: self.user,
            password: self.password,
            database: self.database,
            pool: self.pool,
        };
        (config, self.use_pool)
    }
}

/// Output from the mysql_connect tool.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct MySqlConnectOutput {
    /// "host:port" of the server
    pub target: String,
    /// Selected database, if any
    pub database: Option<String>,
    /// Whether a connection pool is in use
    pub pooled: bool,
    pub message: String,
}

/// Input for the mysql_query tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct MySqlQueryInput {
    /// SQL statement to execute. The active security mode decides which statements may run.
    pub sql: String,
    /// Positional parameters for `?` placeholders (string, number, boolean or null)
    #[serde(default)]
    pub params: Vec<QueryParam>,
}

/// Output from the mysql_query tool.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct MySqlQueryOutput {
    /// Rows returned by the statement, keyed by column name
    pub rows: Vec<serde_json::Map<String, JsonValue>>,
    pub row_count: usize,
    /// Rows changed by a write statement
    pub affected_rows: u64,
    /// AUTO_INCREMENT id generated by an INSERT
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_insert_id: Option<u64>,
    pub execution_time_ms: u64,
}

/// Output from the mysql_pool_status tool.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct PoolStatusOutput {
    /// Whether the connection uses a pool
    pub pooled: bool,
    /// Pool statistics, present only when pooled
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<PoolStatus>,
}

pub struct MySqlToolHandler {
    registry: Arc<ConnectorRegistry>,
    policy: Arc<AccessPolicy>,
}

impl MySqlToolHandler {
    pub fn new(registry: Arc<ConnectorRegistry>, policy: Arc<AccessPolicy>) -> Self {
        Self { registry, policy }
    }

    pub async fn connect(&self, input: MySqlConnectInput) -> DbResult<MySqlConnectOutput> {
        let (config, use_pool) = input.into_config();
        let settings = self.registry.settings();
        let connector = MySqlConnector::connect(
            &config,
            use_pool,
            settings.connect_timeout,
            settings.query_timeout,
        )
        .await?;

        let output = MySqlConnectOutput {
            target: connector.target().to_string(),
            database: config.database.clone(),
            pooled: connector.is_pooled(),
            message: format!("Connected to MySQL at {}", connector.target()),
        };
        self.registry.mysql.replace(connector).await;
        Ok(output)
    }

    pub async fn query(&self, input: MySqlQueryInput) -> DbResult<MySqlQueryOutput> {
        ensure_sql_allowed(&self.policy, &input.sql)?;

        let connector = self.registry.mysql.get().await?;
        let outcome = connector.query(&input.sql, &input.params).await?;

        info!(
            tool = "mysql_query",
            rows = outcome.rows.len(),
            affected_rows = outcome.rows_affected,
            execution_time_ms = outcome.execution_time_ms,
            "MySQL statement executed"
        );

        Ok(MySqlQueryOutput {
            row_count: outcome.rows.len(),
            rows: outcome.rows,
            affected_rows: outcome.rows_affected,
            last_insert_id: outcome.last_insert_id,
            execution_time_ms: outcome.execution_time_ms,
        })
    }

    pub async fn disconnect(&self) -> DbResult<DisconnectOutput> {
        let disconnected = self.registry.mysql.disconnect().await;
        Ok(DisconnectOutput {
            disconnected,
            message: if disconnected {
                "MySQL connection closed".to_string()
            } else {
                "MySQL was not connected".to_string()
            },
        })
    }

    pub async fn pool_status(&self) -> DbResult<PoolStatusOutput> {
        let connector = self.registry.mysql.get().await?;
        let status = connector.pool_status();
        Ok(PoolStatusOutput {
            pooled: status.is_some(),
            status,
        })
    }
}
