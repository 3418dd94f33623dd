//! Redis tools.
//!
//! Every data tool maps to one operation kind: get/hget/hgetall → `get`,
//! set → `set`, keys → `keys`, exists → `exists`, del → `delete`.

use crate::db::{ConnectorRegistry, RedisConnector};
use crate::error::DbResult;
use crate::models::RedisConfig;
use crate::models::connection::DEFAULT_REDIS_HOST;
use crate::security::{AccessPolicy, OperationKind};
use crate::tools::guard::ensure_operation_allowed;
use crate::tools::DisconnectOutput;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::info;

fn default_host() -> String {
    DEFAULT_REDIS_HOST.to_string()
}

/// Input for the redis_connect tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct RedisConnectInput {
    /// Redis connection URL, e.g. redis://:password@host:6379/0. Other fields are ignored when set.
    #[serde(default)]
    pub url: Option<String>,
    /// Redis host. Default: localhost
    #[serde(default = "default_host")]
    pub host: String,
    /// Redis port. Default: 6379
    #[serde(default)]
    pub port: Option<u16>,
    /// Redis password (optional)
    #[serde(default)]
    pub password: Option<String>,
    /// Redis database number. Default: 0
    #[serde(default)]
    pub db: Option<i64>,
}

impl From<RedisConnectInput> for RedisConfig {
    fn from(input: RedisConnectInput) -> Self {
        Self {
            host: input.host,
            port: input.port,
            password: input.password,
            db: input.db,
            url: input.url,
        }
    }
}

#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct RedisConnectOutput {
    /// "host:port" of the server
    pub target: String,
    pub message: String,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct RedisKeyInput {
    /// Key name
    pub key: String,
}

#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct RedisGetOutput {
    pub key: String,
    /// Whether the key exists
    pub exists: bool,
    /// Stored value, absent when the key does not exist
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct RedisSetInput {
    /// Key name
    pub key: String,
    /// Value to store
    pub value: String,
    /// Expiry in seconds (optional, 0 means no expiry)
    #[serde(default)]
    pub ttl: Option<u64>,
}

#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct RedisSetOutput {
    pub key: String,
    /// Expiry applied, in seconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ttl: Option<u64>,
    pub message: String,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct RedisKeysInput {
    /// Glob-style pattern, e.g. "user:*". Default: *
    #[serde(default = "default_pattern")]
    pub pattern: String,
}

fn default_pattern() -> String {
    "*".to_string()
}

#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct RedisKeysOutput {
    pub keys: Vec<String>,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct RedisExistsOutput {
    pub key: String,
    pub exists: bool,
}

#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct RedisDelOutput {
    pub key: String,
    /// Number of keys removed (0 or 1)
    pub deleted: u64,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct RedisHGetInput {
    /// Hash key
    pub key: String,
    /// Field inside the hash
    pub field: String,
}

#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct RedisHGetOutput {
    pub key: String,
    pub field: String,
    pub exists: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct RedisHGetAllOutput {
    pub key: String,
    /// All fields of the hash; empty when the key does not exist
    pub fields: BTreeMap<String, String>,
}

pub struct RedisToolHandler {
    registry: Arc<ConnectorRegistry>,
    policy: Arc<AccessPolicy>,
}

impl RedisToolHandler {
    pub fn new(registry: Arc<ConnectorRegistry>, policy: Arc<AccessPolicy>) -> Self {
        Self { registry, policy }
    }

    /// Check the policy, then fetch the live connector.
    async fn authorize(&self, kind: OperationKind) -> DbResult<Arc<RedisConnector>> {
        ensure_operation_allowed(&self.policy, kind)?;
        self.registry.redis.get().await
    }

    pub async fn connect(&self, input: RedisConnectInput) -> DbResult<RedisConnectOutput> {
        let config = RedisConfig::from(input);
        let connector =
            RedisConnector::connect(&config, self.registry.settings().connect_timeout).await?;
        let target = connector.target().to_string();
        self.registry.redis.replace(connector).await;
        Ok(RedisConnectOutput {
            message: format!("Connected to Redis at {}", target),
            target,
        })
    }

    pub async fn get(&self, input: RedisKeyInput) -> DbResult<RedisGetOutput> {
        let connector = self.authorize(OperationKind::Get).await?;
        let value = connector.get(&input.key).await?;
        Ok(RedisGetOutput {
            key: input.key,
            exists: value.is_some(),
            value,
        })
    }

    pub async fn set(&self, input: RedisSetInput) -> DbResult<RedisSetOutput> {
        let connector = self.authorize(OperationKind::Set).await?;
        let ttl = input.ttl.filter(|ttl| *ttl > 0);
        connector.set(&input.key, &input.value, ttl).await?;
        info!(tool = "redis_set", key = %input.key, ttl = ?ttl, "Redis key set");
        Ok(RedisSetOutput {
            message: format!("Key {} set", input.key),
            key: input.key,
            ttl,
        })
    }

    pub async fn keys(&self, input: RedisKeysInput) -> DbResult<RedisKeysOutput> {
        let connector = self.authorize(OperationKind::Keys).await?;
        let keys = connector.keys(&input.pattern).await?;
        Ok(RedisKeysOutput {
            count: keys.len(),
            keys,
        })
    }

    pub async fn exists(&self, input: RedisKeyInput) -> DbResult<RedisExistsOutput> {
        let connector = self.authorize(OperationKind::Exists).await?;
        let exists = connector.exists(&input.key).await?;
        Ok(RedisExistsOutput {
            key: input.key,
            exists,
        })
    }

    pub async fn del(&self, input: RedisKeyInput) -> DbResult<RedisDelOutput> {
        let connector = self.authorize(OperationKind::Delete).await?;
        let deleted = connector.del(&input.key).await?;
        info!(tool = "redis_del", key = %input.key, deleted, "Redis key deleted");
        Ok(RedisDelOutput {
            key: input.key,
            deleted,
        })
    }

    pub async fn hget(&self, input: RedisHGetInput) -> DbResult<RedisHGetOutput> {
        let connector = self.authorize(OperationKind::Get).await?;
        let value = connector.hget(&input.key, &input.field).await?;
        Ok(RedisHGetOutput {
            key: input.key,
            field: input.field,
            exists: value.is_some(),
            value,
        })
    }

    pub async fn hgetall(&self, input: RedisKeyInput) -> DbResult<RedisHGetAllOutput> {
        let connector = self.authorize(OperationKind::Get).await?;
        let fields = connector.hgetall(&input.key).await?;
        Ok(RedisHGetAllOutput {
            key: input.key,
            fields,
        })
    }

    pub async fn disconnect(&self) -> DbResult<DisconnectOutput> {
        let disconnected = self.registry.redis.disconnect().await;
        Ok(DisconnectOutput {
            disconnected,
            message: if disconnected {
                "Redis connection closed".to_string()
            } else {
                "Redis was not connected".to_string()
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DbError;
    use crate::security::SecurityMode;

    fn handler(mode: SecurityMode) -> RedisToolHandler {
        RedisToolHandler::new(
            Arc::new(ConnectorRegistry::new()),
            Arc::new(AccessPolicy::new(mode)),
        )
    }

    fn key(k: &str) -> RedisKeyInput {
        RedisKeyInput { key: k.to_string() }
    }

    #[tokio::test]
    async fn test_set_denied_in_read_only() {
        let err = handler(SecurityMode::ReadOnly)
            .set(RedisSetInput {
                key: "k".to_string(),
                value: "v".to_string(),
                ttl: None,
            })
            .await
            .unwrap_err();
        assert!(err.to_string().starts_with(
            "Current security mode (read_only) does not allow SET operations."
        ));
    }

    #[tokio::test]
    async fn test_del_denied_in_restricted() {
        let err = handler(SecurityMode::Restricted)
            .del(key("k"))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::PermissionDenied { .. }));
    }

    #[tokio::test]
    async fn test_get_allowed_but_not_connected() {
        let err = handler(SecurityMode::ReadOnly)
            .get(key("k"))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::NotConnected { .. }));
    }

    #[test]
    fn test_connect_input_defaults() {
        let input: RedisConnectInput = serde_json::from_str("{}").unwrap();
        let config = RedisConfig::from(input);
        assert_eq!(config.host, "localhost");
        assert_eq!(config.target(), "localhost:6379");
    }

    #[test]
    fn test_keys_input_default_pattern() {
        let input: RedisKeysInput = serde_json::from_str("{}").unwrap();
        assert_eq!(input.pattern, "*");
    }
}
