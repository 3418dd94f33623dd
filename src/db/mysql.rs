//! MySQL connector.
//!
//! Wraps a sqlx `MySqlPool`. A connection opened without pool settings is a
//! pool capped at one connection, so both cases share one code path.

use crate::db::Connector;
use crate::db::types::row_to_json;
use crate::error::{DbError, DbResult};
use crate::models::{Backend, MySqlConfig, QueryParam};
use futures_util::TryStreamExt;
use schemars::JsonSchema;
use serde::Serialize;
use sqlx::mysql::{MySqlArguments, MySqlConnectOptions, MySqlPoolOptions};
use sqlx::{Either, Executor, MySql, MySqlPool};
use std::time::{Duration, Instant};
use tokio::time::timeout;
use tracing::{debug, info};

/// Pool statistics reported by mysql_pool_status.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct PoolStatus {
    /// Configured maximum number of connections
    pub total_connections: u32,
    /// Connections currently checked out
    pub active_connections: u32,
    /// Open connections waiting in the pool
    pub idle_connections: u32,
}

/// Everything a statement produced.
#[derive(Debug, Default)]
pub struct StatementOutcome {
    pub rows: Vec<serde_json::Map<String, serde_json::Value>>,
    pub rows_affected: u64,
    pub last_insert_id: Option<u64>,
    pub execution_time_ms: u64,
}

pub struct MySqlConnector {
    pool: MySqlPool,
    pooled: bool,
    max_connections: u32,
    target: String,
    query_timeout: Duration,
}

impl MySqlConnector {
    /// Open a connection. `use_pool` only takes effect when `config.pool` is set.
    pub async fn connect(
        config: &MySqlConfig,
        use_pool: bool,
        connect_timeout: Duration,
        query_timeout: Duration,
    ) -> DbResult<Self> {
        let pool_settings = config.pool.as_ref().filter(|_| use_pool);
        if let Some(settings) = pool_settings {
            settings.validate().map_err(DbError::invalid_input)?;
        }

        let mut options = MySqlConnectOptions::new()
            .host(&config.host)
            .port(config.port_or_default())
            .username(&config.user)
            .password(&config.password);
        if let Some(database) = config.database.as_deref().filter(|d| !d.is_empty()) {
            options = options.database(database);
        }

        let (pool_options, max_connections) = match pool_settings {
            Some(settings) => (
                MySqlPoolOptions::new()
                    .max_connections(settings.max_or_default())
                    .min_connections(settings.min_or_default())
                    .idle_timeout(Duration::from_millis(settings.idle_timeout_ms_or_default())),
                settings.max_or_default(),
            ),
            None => (MySqlPoolOptions::new().max_connections(1), 1),
        };

        let pool = pool_options
            .acquire_timeout(connect_timeout)
            .connect_with(options)
            .await
            .map_err(|e| match DbError::from(e) {
                DbError::Connection { message, .. } => DbError::connection(
                    format!("MySQL connection to {} failed: {}", config.target(), message),
                    "Check the MySQL host, port and credentials",
                ),
                other => other,
            })?;

        info!(
            target_addr = %config.target(),
            pooled = pool_settings.is_some(),
            max_connections,
            "MySQL connected"
        );

        Ok(Self {
            pool,
            pooled: pool_settings.is_some(),
            max_connections,
            target: config.target(),
            query_timeout,
        })
    }

    /// "host:port" of the server.
    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn is_pooled(&self) -> bool {
        self.pooled
    }

    /// Pool statistics, or `None` for a single-connection setup.
    pub fn pool_status(&self) -> Option<PoolStatus> {
        if !self.pooled {
            return None;
        }
        let open = self.pool.size();
        let idle = self.pool.num_idle() as u32;
        Some(PoolStatus {
            total_connections: self.max_connections,
            active_connections: open.saturating_sub(idle),
            idle_connections: idle,
        })
    }

    /// Run one statement and collect both its rows and its write summary.
    pub async fn query(&self, sql: &str, params: &[QueryParam]) -> DbResult<StatementOutcome> {
        let start = Instant::now();
        debug!(params = params.len(), "Executing MySQL statement");

        let mut query = sqlx::query(sql);
        for param in params {
            query = bind_mysql_param(query, param);
        }

        let run = async {
            let mut outcome = StatementOutcome::default();
            let mut stream = (&self.pool).fetch_many(query);
            while let Some(item) = stream.try_next().await? {
                match item {
                    Either::Left(result) => {
                        outcome.rows_affected += result.rows_affected();
                        if result.last_insert_id() > 0 {
                            outcome.last_insert_id = Some(result.last_insert_id());
                        }
                    }
                    Either::Right(row) => outcome.rows.push(row_to_json(&row)),
                }
            }
            Ok::<_, sqlx::Error>(outcome)
        };

        let mut outcome = timeout(self.query_timeout, run)
            .await
            .map_err(|_| DbError::timeout("MySQL query", self.query_timeout.as_secs()))??;
        outcome.execution_time_ms = start.elapsed().as_millis() as u64;

        debug!(
            rows = outcome.rows.len(),
            rows_affected = outcome.rows_affected,
            execution_time_ms = outcome.execution_time_ms,
            "MySQL statement finished"
        );
        Ok(outcome)
    }
}

impl Connector for MySqlConnector {
    fn backend(&self) -> Backend {
        Backend::MySql
    }

    async fn close(&self) {
        self.pool.close().await;
        info!(target_addr = %self.target, "MySQL disconnected");
    }
}

/// Bind a parameter to a MySQL query.
fn bind_mysql_param<'q>(
    query: sqlx::query::Query<'q, MySql, MySqlArguments>,
    param: &'q QueryParam,
) -> sqlx::query::Query<'q, MySql, MySqlArguments> {
    match param {
        QueryParam::Null => query.bind(None::<String>),
        QueryParam::Bool(v) => query.bind(*v),
        QueryParam::Int(v) => query.bind(*v),
        QueryParam::Float(v) => query.bind(*v),
        QueryParam::String(v) => query.bind(v.as_str()),
    }
}
