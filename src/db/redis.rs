//! Redis connector.

use crate::db::Connector;
use crate::error::{DbError, DbResult};
use crate::models::{Backend, RedisConfig};
use ::redis::AsyncCommands;
use ::redis::aio::MultiplexedConnection;
use std::collections::BTreeMap;
use std::time::Duration;
use tokio::time::timeout;
use tracing::info;

/// A multiplexed Redis connection. Cloning the inner handle is cheap, so every
/// command takes its own clone instead of locking.
pub struct RedisConnector {
    connection: MultiplexedConnection,
    target: String,
}

impl RedisConnector {
    pub async fn connect(config: &RedisConfig, connect_timeout: Duration) -> DbResult<Self> {
        let url = config.connection_url().map_err(DbError::invalid_input)?;
        let client = ::redis::Client::open(url.as_str())
            .map_err(|e| DbError::invalid_input(format!("Invalid Redis settings: {}", e)))?;

        let connection = timeout(connect_timeout, client.get_multiplexed_async_connection())
            .await
            .map_err(|_| DbError::timeout("Redis connect", connect_timeout.as_secs()))?
            .map_err(|e| {
                DbError::connection(
                    format!("Redis connection to {} failed: {}", config.target(), e),
                    "Check the Redis host, port and password",
                )
            })?;

        info!(target_addr = %config.target(), "Redis connected");
        Ok(Self {
            connection,
            target: config.target(),
        })
    }

    /// "host:port" of the server.
    pub fn target(&self) -> &str {
        &self.target
    }

    pub async fn get(&self, key: &str) -> DbResult<Option<String>> {
        let mut conn = self.connection.clone();
        Ok(conn.get(key).await?)
    }

    /// SET, or SETEX when a positive TTL is given.
    pub async fn set(&self, key: &str, value: &str, ttl_secs: Option<u64>) -> DbResult<()> {
        let mut conn = self.connection.clone();
        match ttl_secs.filter(|ttl| *ttl > 0) {
            Some(ttl) => conn.set_ex::<_, _, ()>(key, value, ttl).await?,
            None => conn.set::<_, _, ()>(key, value).await?,
        }
        Ok(())
    }

    /// Number of keys removed.
    pub async fn del(&self, key: &str) -> DbResult<u64> {
        let mut conn = self.connection.clone();
        Ok(conn.del(key).await?)
    }

    pub async fn keys(&self, pattern: &str) -> DbResult<Vec<String>> {
        let mut conn = self.connection.clone();
        let mut keys: Vec<String> = conn.keys(pattern).await?;
        keys.sort();
        Ok(keys)
    }

    pub async fn exists(&self, key: &str) -> DbResult<bool> {
        let mut conn = self.connection.clone();
        let count: u64 = conn.exists(key).await?;
        Ok(count > 0)
    }

    pub async fn hget(&self, key: &str, field: &str) -> DbResult<Option<String>> {
        let mut conn = self.connection.clone();
        Ok(conn.hget(key, field).await?)
    }

    pub async fn hgetall(&self, key: &str) -> DbResult<BTreeMap<String, String>> {
        let mut conn = self.connection.clone();
        Ok(conn.hgetall(key).await?)
    }
}

impl Connector for RedisConnector {
    fn backend(&self) -> Backend {
        Backend::Redis
    }

    async fn close(&self) {
        // The multiplexed connection shuts down once the last handle is dropped
        info!(target_addr = %self.target, "Redis disconnected");
    }
}
