//! Connection-related data models.
//!
//! This module defines the connection settings for each supported backend.
//! The same types are read from the config file, the environment, and the
//! `*_connect` tool inputs.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use url::Url;

pub const DEFAULT_MYSQL_PORT: u16 = 3306;
pub const DEFAULT_MYSQL_USER: &str = "root";
pub const DEFAULT_REDIS_HOST: &str = "localhost";
pub const DEFAULT_REDIS_PORT: u16 = 6379;
pub const DEFAULT_MONGODB_DATABASE: &str = "test";

pub const DEFAULT_POOL_MIN: u32 = 2;
pub const DEFAULT_POOL_MAX: u32 = 10;
pub const DEFAULT_POOL_IDLE_TIMEOUT_MS: u64 = 60_000;

/// Supported backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    MySql,
    Redis,
    MongoDb,
}

impl Backend {
    /// Get the display name for this backend.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::MySql => "MySQL",
            Self::Redis => "Redis",
            Self::MongoDb => "MongoDB",
        }
    }

    pub fn default_port(&self) -> u16 {
        match self {
            Self::MySql => DEFAULT_MYSQL_PORT,
            Self::Redis => DEFAULT_REDIS_PORT,
            Self::MongoDb => 27017,
        }
    }
}

impl std::fmt::Display for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// MySQL connection pool settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct PoolSettings {
    /// Minimum open connections. Default: 2
    #[serde(default)]
    pub min: Option<u32>,
    /// Maximum open connections. Default: 10
    #[serde(default)]
    pub max: Option<u32>,
    /// Idle timeout in milliseconds. Default: 60000
    #[serde(default, alias = "idleTimeout")]
    pub idle_timeout: Option<u64>,
}

impl PoolSettings {
    pub fn min_or_default(&self) -> u32 {
        self.min.unwrap_or(DEFAULT_POOL_MIN)
    }

    pub fn max_or_default(&self) -> u32 {
        self.max.unwrap_or(DEFAULT_POOL_MAX)
    }

    pub fn idle_timeout_ms_or_default(&self) -> u64 {
        self.idle_timeout.unwrap_or(DEFAULT_POOL_IDLE_TIMEOUT_MS)
    }

    /// Validate pool settings and return an error message if invalid.
    pub fn validate(&self) -> Result<(), String> {
        if self.max == Some(0) {
            return Err("pool max must be greater than 0".to_string());
        }
        let (min, max) = (self.min_or_default(), self.max_or_default());
        if self.min.is_some() && min > max {
            return Err(format!("pool min ({}) cannot exceed pool max ({})", min, max));
        }
        Ok(())
    }
}

/// MySQL connection settings.
#[derive(Clone, Serialize, Deserialize, JsonSchema)]
pub struct MySqlConfig {
    /// MySQL host address
    pub host: String,
    /// MySQL port. Default: 3306
    #[serde(default)]
    pub port: Option<u16>,
    /// MySQL user name
    #[serde(default = "default_mysql_user")]
    pub user: String,
    /// MySQL password
    #[serde(default, skip_serializing)]
    pub password: String,
    /// Default database (optional)
    #[serde(default)]
    pub database: Option<String>,
    /// Pool settings. A preconfigured connection with this section uses a pool.
    #[serde(default)]
    pub pool: Option<PoolSettings>,
}

fn default_mysql_user() -> String {
    DEFAULT_MYSQL_USER.to_string()
}

impl MySqlConfig {
    pub fn port_or_default(&self) -> u16 {
        self.port.unwrap_or(DEFAULT_MYSQL_PORT)
    }

    /// "host:port" for messages (no credentials).
    pub fn target(&self) -> String {
        format!("{}:{}", self.host, self.port_or_default())
    }
}

impl std::fmt::Debug for MySqlConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MySqlConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &"***")
            .field("database", &self.database)
            .field("pool", &self.pool)
            .finish()
    }
}

/// Redis connection settings. `url`, when present, wins over the other fields.
#[derive(Clone, Serialize, Deserialize, JsonSchema)]
pub struct RedisConfig {
    /// Redis host address. Default: localhost
    #[serde(default = "default_redis_host")]
    pub host: String,
    /// Redis port. Default: 6379
    #[serde(default)]
    pub port: Option<u16>,
    /// Redis password (optional)
    #[serde(default, skip_serializing)]
    pub password: Option<String>,
    /// Redis database number. Default: 0
    #[serde(default)]
    pub db: Option<i64>,
    /// Redis connection URL (optional). Other fields are ignored when set.
    #[serde(default, skip_serializing)]
    pub url: Option<String>,
}

fn default_redis_host() -> String {
    DEFAULT_REDIS_HOST.to_string()
}

impl RedisConfig {
    /// Build the connection URL handed to the Redis client.
    pub fn connection_url(&self) -> Result<String, String> {
        if let Some(url) = &self.url {
            return Ok(url.clone());
        }

        let mut url = Url::parse(&format!(
            "redis://{}:{}",
            self.host,
            self.port.unwrap_or(DEFAULT_REDIS_PORT)
        ))
        .map_err(|e| format!("Invalid Redis host: {e}"))?;

        if let Some(password) = self.password.as_deref().filter(|p| !p.is_empty()) {
            url.set_password(Some(password))
                .map_err(|_| "Cannot set password on Redis URL".to_string())?;
        }
        url.set_path(&format!("/{}", self.db.unwrap_or(0)));
        Ok(url.to_string())
    }

    /// "host:port" for messages, taken from the URL when one is given.
    pub fn target(&self) -> String {
        match self.url.as_deref().and_then(|u| Url::parse(u).ok()) {
            Some(url) => format!(
                "{}:{}",
                url.host_str().unwrap_or_default(),
                url.port().unwrap_or(DEFAULT_REDIS_PORT)
            ),
            None => format!("{}:{}", self.host, self.port.unwrap_or(DEFAULT_REDIS_PORT)),
        }
    }
}

impl std::fmt::Debug for RedisConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .field("db", &self.db)
            .field("url", &self.url.as_ref().map(|_| "***"))
            .finish()
    }
}

/// MongoDB connection settings.
#[derive(Clone, Serialize, Deserialize, JsonSchema)]
pub struct MongoConfig {
    /// MongoDB connection URL, e.g. mongodb://localhost:27017
    #[serde(skip_serializing)]
    pub url: String,
    /// Database name (optional, otherwise taken from the URL path)
    #[serde(default)]
    pub database: Option<String>,
}

impl MongoConfig {
    /// Explicit database name, ignoring an empty string.
    pub fn explicit_database(&self) -> Option<&str> {
        self.database.as_deref().filter(|d| !d.is_empty())
    }

    /// Explicit database, else the URL path, else "test".
    pub fn database_name(&self) -> String {
        self.explicit_database()
            .map(str::to_string)
            .or_else(|| self.url_database())
            .unwrap_or_else(|| DEFAULT_MONGODB_DATABASE.to_string())
    }

    /// Database named in the URL path, if any.
    pub fn url_database(&self) -> Option<String> {
        let (_, _, tail) = split_mongo_uri(&self.url)?;
        let path = tail.strip_prefix('/')?;
        let name = path.split('?').next().unwrap_or_default();
        (!name.is_empty()).then(|| name.to_string())
    }

    /// URL with credentials masked.
    pub fn masked_url(&self) -> String {
        let Some((scheme, authority, tail)) = split_mongo_uri(&self.url) else {
            return "<invalid url>".to_string();
        };
        match authority.rsplit_once('@') {
            Some((userinfo, hosts)) => match userinfo.split_once(':') {
                Some((user, _)) => format!("{scheme}://{user}:***@{hosts}{tail}"),
                None => self.url.clone(),
            },
            None => self.url.clone(),
        }
    }
}

/// Split `scheme://[userinfo@]hosts[/path][?options]` into scheme, authority
/// and the remainder. The host list is not validated since it may name
/// several servers (`h1:27017,h2:27017`), which `url::Url` rejects.
fn split_mongo_uri(url: &str) -> Option<(&str, &str, &str)> {
    let (scheme, rest) = url.split_once("://")?;
    if scheme.is_empty() {
        return None;
    }
    let end = rest.find(['/', '?']).unwrap_or(rest.len());
    Some((scheme, &rest[..end], &rest[end..]))
}

impl std::fmt::Debug for MongoConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MongoConfig")
            .field("url", &self.masked_url())
            .field("database", &self.database)
            .finish()
    }
}
