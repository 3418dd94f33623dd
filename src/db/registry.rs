//! Live connector registry.
//!
//! Holds at most one connector per backend. Connecting replaces (and closes)
//! the previous connector; tools fetch a cheap `Arc` clone for each call.

use crate::config::DatabasesConfig;
use crate::db::Connector;
use crate::db::mongodb::MongoConnector;
use crate::db::mysql::MySqlConnector;
use crate::db::redis::RedisConnector;
use crate::error::{DbError, DbResult};
use crate::models::Backend;
use crate::models::query::DEFAULT_QUERY_TIMEOUT_SECS;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{info, warn};

pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

/// One backend's connector, if connected.
pub struct ConnectorSlot<T> {
    backend: Backend,
    inner: RwLock<Option<Arc<T>>>,
}

impl<T: Connector> ConnectorSlot<T> {
    pub fn new(backend: Backend) -> Self {
        Self {
            backend,
            inner: RwLock::new(None),
        }
    }

    /// The live connector, or `NotConnected`.
    pub async fn get(&self) -> DbResult<Arc<T>> {
        self.inner
            .read()
            .await
            .clone()
            .ok_or_else(|| DbError::not_connected(self.backend.display_name()))
    }

    pub async fn is_connected(&self) -> bool {
        self.inner.read().await.is_some()
    }

    /// Install a new connector and close the one it replaces.
    pub async fn replace(&self, connector: T) {
        let previous = self.inner.write().await.replace(Arc::new(connector));
        if let Some(previous) = previous {
            info!(backend = %self.backend, "Replacing existing connection");
            previous.close().await;
        }
    }

    /// Close and remove the connector. Returns false if none was connected.
    pub async fn disconnect(&self) -> bool {
        let previous = self.inner.write().await.take();
        match previous {
            Some(previous) => {
                previous.close().await;
                true
            }
            None => false,
        }
    }
}

/// Timeouts applied to connectors created through the registry.
#[derive(Debug, Clone, Copy)]
pub struct ConnectSettings {
    pub connect_timeout: Duration,
    pub query_timeout: Duration,
}

impl Default for ConnectSettings {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
            query_timeout: Duration::from_secs(DEFAULT_QUERY_TIMEOUT_SECS),
        }
    }
}

pub struct ConnectorRegistry {
    pub mysql: ConnectorSlot<MySqlConnector>,
    pub redis: ConnectorSlot<RedisConnector>,
    pub mongodb: ConnectorSlot<MongoConnector>,
    settings: ConnectSettings,
}

impl ConnectorRegistry {
    pub fn new() -> Self {
        Self::with_settings(ConnectSettings::default())
    }

    pub fn with_settings(settings: ConnectSettings) -> Self {
        Self {
            mysql: ConnectorSlot::new(Backend::MySql),
            redis: ConnectorSlot::new(Backend::Redis),
            mongodb: ConnectorSlot::new(Backend::MongoDb),
            settings,
        }
    }

    pub fn settings(&self) -> ConnectSettings {
        self.settings
    }

    /// Connect every backend present in the configuration.
    ///
    /// A failing backend is logged and skipped; the others still connect.
    pub async fn connect_configured(&self, databases: &DatabasesConfig) -> usize {
        let mut connected = 0;

        if let Some(config) = &databases.mysql {
            // A preconfigured MySQL section with pool settings always uses the pool
            let use_pool = config.pool.is_some();
            match MySqlConnector::connect(
                config,
                use_pool,
                self.settings.connect_timeout,
                self.settings.query_timeout,
            )
            .await
            {
                Ok(connector) => {
                    self.mysql.replace(connector).await;
                    connected += 1;
                }
                Err(e) => warn!(backend = "MySQL", error = %e, "Preconfigured connection failed"),
            }
        }

        if let Some(config) = &databases.redis {
            match RedisConnector::connect(config, self.settings.connect_timeout).await {
                Ok(connector) => {
                    self.redis.replace(connector).await;
                    connected += 1;
                }
                Err(e) => warn!(backend = "Redis", error = %e, "Preconfigured connection failed"),
            }
        }

        if let Some(config) = &databases.mongodb {
            match MongoConnector::connect(config, self.settings.connect_timeout).await {
                Ok(connector) => {
                    self.mongodb.replace(connector).await;
                    connected += 1;
                }
                Err(e) => {
                    warn!(backend = "MongoDB", error = %e, "Preconfigured connection failed")
                }
            }
        }

        connected
    }

    /// Close all live connectors.
    pub async fn close_all(&self) {
        self.mysql.disconnect().await;
        self.redis.disconnect().await;
        self.mongodb.disconnect().await;
    }
}

impl Default for ConnectorRegistry {
    fn default() -> Self {
        Self::new()
    }
}
