//! Configuration handling for the DB MCP Server.
//!
//! Three layers feed the server:
//! - CLI arguments and environment variables (`Config`, via clap)
//! - A JSON config file (`AppConfig`) with database sections and a security mode
//! - Per-database environment variables, which replace the file's section
//!   for the backend they describe

use crate::error::{DbError, DbResult};
use crate::models::connection::DEFAULT_REDIS_HOST;
use crate::models::{MongoConfig, MySqlConfig, PoolSettings, RedisConfig};
use crate::security::SecurityMode;
use clap::{Parser, ValueEnum};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, warn};

pub const DEFAULT_CONFIG_PATH: &str = "./config.json";
pub const DEFAULT_HTTP_HOST: &str = "127.0.0.1";
pub const DEFAULT_HTTP_PORT: u16 = 8080;
pub const DEFAULT_MCP_ENDPOINT: &str = "/";
pub const DEFAULT_QUERY_TIMEOUT_SECS: u64 = crate::models::DEFAULT_QUERY_TIMEOUT_SECS;
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = crate::db::registry::DEFAULT_CONNECT_TIMEOUT_SECS;

/// Environment variable holding the fallback security mode.
pub const SECURITY_MODE_ENV: &str = "DB_MCP_SECURITY_MODE";

/// Transport mode for the MCP server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum TransportMode {
    /// Standard input/output (for CLI integration)
    #[default]
    Stdio,
    /// Streamable HTTP (for web clients)
    Http,
}

impl std::fmt::Display for TransportMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Stdio => write!(f, "stdio"),
            Self::Http => write!(f, "http"),
        }
    }
}

/// Configuration for the DB MCP Server.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "db-mcp",
    about = "MCP server giving AI assistants policy-gated access to MySQL, Redis and MongoDB",
    version,
    author
)]
pub struct Config {
    /// Path of the JSON config file. A missing file means no preconfigured databases.
    #[arg(
        short,
        long = "config",
        value_name = "PATH",
        default_value = DEFAULT_CONFIG_PATH,
        env = "DB_MCP_CONFIG_PATH"
    )]
    pub config_path: PathBuf,

    /// Initial security mode (read_only, restricted, full_access).
    /// Overrides the config file and DB_MCP_SECURITY_MODE.
    #[arg(long, value_name = "MODE")]
    pub security_mode: Option<String>,

    /// Transport mode (stdio or http)
    #[arg(
        short,
        long,
        value_enum,
        default_value = "stdio",
        env = "MCP_TRANSPORT"
    )]
    pub transport: TransportMode,

    /// HTTP host to bind to (only used with http transport)
    #[arg(
        long,
        default_value = DEFAULT_HTTP_HOST,
        env = "MCP_HTTP_HOST"
    )]
    pub http_host: String,

    /// HTTP port to bind to (only used with http transport)
    #[arg(
        long,
        default_value_t = DEFAULT_HTTP_PORT,
        env = "MCP_HTTP_PORT"
    )]
    pub http_port: u16,

    /// MCP endpoint path (only used with http transport)
    #[arg(
        long,
        default_value = DEFAULT_MCP_ENDPOINT,
        env = "MCP_ENDPOINT"
    )]
    pub mcp_endpoint: String,

    /// Query timeout in seconds
    #[arg(
        long,
        default_value_t = DEFAULT_QUERY_TIMEOUT_SECS,
        env = "MCP_QUERY_TIMEOUT"
    )]
    pub query_timeout: u64,

    /// Connection timeout in seconds
    #[arg(
        long,
        default_value_t = DEFAULT_CONNECT_TIMEOUT_SECS,
        env = "MCP_CONNECT_TIMEOUT"
    )]
    pub connect_timeout: u64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", env = "MCP_LOG_LEVEL")]
    pub log_level: String,

    /// Enable JSON logging format
    #[arg(long, env = "MCP_JSON_LOGS")]
    pub json_logs: bool,

    /// Authentication tokens for HTTP transport.
    /// Can be specified multiple times or as comma-separated values.
    /// When set, all HTTP requests must include a valid Bearer token.
    #[arg(
        long = "auth-token",
        value_name = "TOKEN",
        env = "MCP_AUTH_TOKENS",
        value_delimiter = ','
    )]
    pub auth_tokens: Vec<String>,
}

impl Config {
    /// Parse configuration from command line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Create a default configuration (useful for testing).
    pub fn default_config() -> Self {
        Self {
            config_path: PathBuf::from(DEFAULT_CONFIG_PATH),
            security_mode: None,
            transport: TransportMode::Stdio,
            http_host: DEFAULT_HTTP_HOST.to_string(),
            http_port: DEFAULT_HTTP_PORT,
            mcp_endpoint: DEFAULT_MCP_ENDPOINT.to_string(),
            query_timeout: DEFAULT_QUERY_TIMEOUT_SECS,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT_SECS,
            log_level: "info".to_string(),
            json_logs: false,
            auth_tokens: Vec::new(),
        }
    }

    /// Get the HTTP bind address.
    pub fn http_bind_addr(&self) -> String {
        format!("{}:{}", self.http_host, self.http_port)
    }

    /// Get the query timeout as a Duration.
    pub fn query_timeout_duration(&self) -> Duration {
        Duration::from_secs(self.query_timeout)
    }

    /// Get the connection timeout as a Duration.
    pub fn connect_timeout_duration(&self) -> Duration {
        Duration::from_secs(self.connect_timeout)
    }

    /// Load the config file and apply the process environment on top of it.
    pub async fn load_app_config(&self) -> DbResult<AppConfig> {
        let file = AppConfig::load_from_file(&self.config_path).await?;
        let env = DatabasesConfig::from_env(|key| std::env::var(key).ok())?;
        Ok(file.with_env_overrides(env))
    }

    /// Initial security mode from the flag, the file, and the environment.
    pub fn initial_security_mode(&self, app: &AppConfig) -> SecurityMode {
        resolve_security_mode(
            self.security_mode.as_deref(),
            app.security.mode.as_deref(),
            std::env::var(SECURITY_MODE_ENV).ok().as_deref(),
        )
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::default_config()
    }
}

/// Contents of the JSON config file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub databases: DatabasesConfig,
    #[serde(default)]
    pub security: SecurityConfig,
}

/// Preconfigured database sections. Each present section is connected at startup.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DatabasesConfig {
    #[serde(default)]
    pub mysql: Option<MySqlConfig>,
    #[serde(default)]
    pub redis: Option<RedisConfig>,
    #[serde(default)]
    pub mongodb: Option<MongoConfig>,
}

/// Security section of the config file.
///
/// The mode is kept as a raw string so an invalid value can be skipped with a
/// warning instead of failing the whole file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SecurityConfig {
    #[serde(default)]
    pub mode: Option<String>,
}

impl AppConfig {
    /// Read and parse the config file. A missing file is an empty config.
    pub async fn load_from_file(path: &Path) -> DbResult<Self> {
        let contents = match tokio::fs::read_to_string(path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "No config file, using defaults");
                return Ok(Self::default());
            }
            Err(e) => {
                return Err(DbError::config(format!(
                    "Cannot read config file {}: {}",
                    path.display(),
                    e
                )));
            }
        };
        Self::parse_json(&contents)
            .map_err(|e| DbError::config(format!("{} ({})", e, path.display())))
    }

    /// Parse config file contents.
    pub fn parse_json(contents: &str) -> DbResult<Self> {
        serde_json::from_str(contents)
            .map_err(|e| DbError::config(format!("Invalid config file: {}", e)))
    }

    /// Replace each database section the environment provides.
    pub fn with_env_overrides(mut self, env: DatabasesConfig) -> Self {
        if env.mysql.is_some() {
            self.databases.mysql = env.mysql;
        }
        if env.redis.is_some() {
            self.databases.redis = env.redis;
        }
        if env.mongodb.is_some() {
            self.databases.mongodb = env.mongodb;
        }
        self
    }
}

impl DatabasesConfig {
    /// Build database sections from environment variables.
    ///
    /// A section exists only when its anchor variable is set: `MYSQL_HOST`,
    /// `REDIS_HOST` or `REDIS_URL`, and `MONGODB_URL`. An env MySQL section is
    /// always pooled; unset `MYSQL_POOL_*` values fall back to the defaults.
    pub fn from_env<F>(lookup: F) -> DbResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.is_empty());

        let mysql = match var("MYSQL_HOST") {
            Some(host) => {
                let pool = PoolSettings {
                    min: parse_env(&var, "MYSQL_POOL_MIN")?,
                    max: parse_env(&var, "MYSQL_POOL_MAX")?,
                    idle_timeout: parse_env(&var, "MYSQL_POOL_IDLE_TIMEOUT")?,
                };
                Some(MySqlConfig {
                    host,
                    port: parse_env(&var, "MYSQL_PORT")?,
                    user: var("MYSQL_USER")
                        .unwrap_or_else(|| crate::models::connection::DEFAULT_MYSQL_USER.to_string()),
                    password: var("MYSQL_PASSWORD").unwrap_or_default(),
                    database: var("MYSQL_DATABASE"),
                    pool: Some(pool),
                })
            }
            None => None,
        };

        let redis_url = var("REDIS_URL");
        let redis_host = var("REDIS_HOST");
        let redis = if redis_url.is_some() || redis_host.is_some() {
            Some(RedisConfig {
                host: redis_host.unwrap_or_else(|| DEFAULT_REDIS_HOST.to_string()),
                port: parse_env(&var, "REDIS_PORT")?,
                password: var("REDIS_PASSWORD"),
                db: parse_env(&var, "REDIS_DB")?,
                url: redis_url,
            })
        } else {
            None
        };

        let mongodb = var("MONGODB_URL").map(|url| MongoConfig {
            url,
            database: var("MONGODB_DATABASE"),
        });

        Ok(Self {
            mysql,
            redis,
            mongodb,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.mysql.is_none() && self.redis.is_none() && self.mongodb.is_none()
    }
}

fn parse_env<T, F>(var: &F, key: &str) -> DbResult<Option<T>>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    var(key)
        .map(|raw| {
            raw.trim()
                .parse()
                .map_err(|_| DbError::config(format!("{} has an invalid value: {}", key, raw)))
        })
        .transpose()
}

/// Pick the initial security mode.
///
/// Precedence: CLI flag, then config file, then environment, then read_only.
/// An invalid value at any level is logged and skipped.
pub fn resolve_security_mode(
    cli: Option<&str>,
    file: Option<&str>,
    env: Option<&str>,
) -> SecurityMode {
    [("--security-mode", cli), ("config file", file), (SECURITY_MODE_ENV, env)]
        .into_iter()
        .filter_map(|(source, value)| value.map(|v| (source, v.trim())))
        .filter(|(_, value)| !value.is_empty())
        .find_map(|(source, value)| match value.parse::<SecurityMode>() {
            Ok(mode) => Some(mode),
            Err(e) => {
                warn!(source, error = %e, "Ignoring invalid security mode");
                None
            }
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.transport, TransportMode::Stdio);
        assert_eq!(config.http_host, DEFAULT_HTTP_HOST);
        assert_eq!(config.http_port, DEFAULT_HTTP_PORT);
        assert_eq!(config.config_path, PathBuf::from("./config.json"));
        assert!(config.security_mode.is_none());
    }

    #[test]
    fn test_http_bind_addr() {
        let config = Config {
            http_host: "0.0.0.0".to_string(),
            http_port: 3000,
            ..Config::default()
        };
        assert_eq!(config.http_bind_addr(), "0.0.0.0:3000");
    }

    #[test]
    fn test_timeout_durations() {
        let config = Config {
            query_timeout: 60,
            connect_timeout: 15,
            ..Config::default()
        };
        assert_eq!(config.query_timeout_duration(), Duration::from_secs(60));
        assert_eq!(config.connect_timeout_duration(), Duration::from_secs(15));
    }

    #[test]
    fn test_cli_parses_security_mode_and_config() {
        let config = Config::try_parse_from([
            "db-mcp",
            "--config",
            "/etc/db-mcp.json",
            "--security-mode",
            "restricted",
        ])
        .unwrap();
        assert_eq!(config.config_path, PathBuf::from("/etc/db-mcp.json"));
        assert_eq!(config.security_mode.as_deref(), Some("restricted"));
    }

    // =========================================================================
    // Security mode precedence
    // =========================================================================

    #[test]
    fn test_mode_defaults_to_read_only() {
        assert_eq!(resolve_security_mode(None, None, None), SecurityMode::ReadOnly);
    }

    #[test]
    fn test_mode_cli_wins() {
        let mode = resolve_security_mode(Some("full_access"), Some("restricted"), Some("read_only"));
        assert_eq!(mode, SecurityMode::FullAccess);
    }

    #[test]
    fn test_mode_file_beats_env() {
        let mode = resolve_security_mode(None, Some("restricted"), Some("full_access"));
        assert_eq!(mode, SecurityMode::Restricted);
    }

    #[test]
    fn test_mode_env_fallback() {
        let mode = resolve_security_mode(None, None, Some("full_access"));
        assert_eq!(mode, SecurityMode::FullAccess);
    }

    #[test]
    fn test_mode_invalid_values_are_skipped() {
        let mode = resolve_security_mode(Some("admin"), Some("FULL_ACCESS"), Some("restricted"));
        assert_eq!(mode, SecurityMode::Restricted);

        let mode = resolve_security_mode(Some(""), Some("bogus"), None);
        assert_eq!(mode, SecurityMode::ReadOnly);
    }

    // =========================================================================
    // Config file
    // =========================================================================

    #[test]
    fn test_parse_full_config_file() {
        let app = AppConfig::parse_json(
            r#"{
                "databases": {
                    "mysql": {"host": "db", "user": "app", "password": "pw",
                              "pool": {"min": 1, "max": 5, "idleTimeout": 30000}},
                    "redis": {"host": "cache", "db": 2},
                    "mongodb": {"url": "mongodb://localhost:27017/shop"}
                },
                "security": {"mode": "restricted"}
            }"#,
        )
        .unwrap();

        let mysql = app.databases.mysql.unwrap();
        assert_eq!(mysql.host, "db");
        assert_eq!(mysql.port_or_default(), 3306);
        let pool = mysql.pool.unwrap();
        assert_eq!(pool.max, Some(5));
        assert_eq!(pool.idle_timeout, Some(30000));

        let redis = app.databases.redis.unwrap();
        assert_eq!(redis.host, "cache");
        assert_eq!(redis.db, Some(2));

        assert_eq!(app.databases.mongodb.unwrap().database_name(), "shop");
        assert_eq!(app.security.mode.as_deref(), Some("restricted"));
    }

    #[test]
    fn test_parse_empty_object() {
        let app = AppConfig::parse_json("{}").unwrap();
        assert!(app.databases.is_empty());
        assert!(app.security.mode.is_none());
    }

    #[test]
    fn test_parse_invalid_json_is_config_error() {
        let err = AppConfig::parse_json("{ not json").unwrap_err();
        assert!(matches!(err, DbError::Config { .. }));
    }

    // =========================================================================
    // Environment overrides
    // =========================================================================

    #[test]
    fn test_env_without_anchors_is_empty() {
        let env = DatabasesConfig::from_env(env_of(&[("MYSQL_PORT", "3307")])).unwrap();
        assert!(env.is_empty());
    }

    #[test]
    fn test_env_mysql_section() {
        let env = DatabasesConfig::from_env(env_of(&[
            ("MYSQL_HOST", "10.0.0.5"),
            ("MYSQL_PORT", "3307"),
            ("MYSQL_PASSWORD", "secret"),
            ("MYSQL_POOL_MAX", "20"),
        ]))
        .unwrap();
        let mysql = env.mysql.unwrap();
        assert_eq!(mysql.host, "10.0.0.5");
        assert_eq!(mysql.port, Some(3307));
        assert_eq!(mysql.user, "root");
        assert_eq!(mysql.password, "secret");
        let pool = mysql.pool.unwrap();
        assert_eq!(pool.max, Some(20));
        assert_eq!(pool.min_or_default(), 2);
    }

    #[test]
    fn test_env_mysql_without_pool_vars_uses_default_pool() {
        let env = DatabasesConfig::from_env(env_of(&[("MYSQL_HOST", "db")])).unwrap();
        let pool = env.mysql.unwrap().pool.unwrap();
        assert_eq!(pool.min_or_default(), 2);
        assert_eq!(pool.max_or_default(), 10);
        assert_eq!(pool.idle_timeout_ms_or_default(), 60_000);
    }

    #[test]
    fn test_env_redis_by_url() {
        let env = DatabasesConfig::from_env(env_of(&[("REDIS_URL", "redis://cache:6380/1")]))
            .unwrap();
        let redis = env.redis.unwrap();
        assert_eq!(redis.host, "localhost");
        assert_eq!(redis.target(), "cache:6380");
    }

    #[test]
    fn test_env_mongodb_section() {
        let env = DatabasesConfig::from_env(env_of(&[
            ("MONGODB_URL", "mongodb://localhost:27017"),
            ("MONGODB_DATABASE", "analytics"),
        ]))
        .unwrap();
        assert_eq!(env.mongodb.unwrap().database_name(), "analytics");
    }

    #[test]
    fn test_env_invalid_number_is_config_error() {
        let err = DatabasesConfig::from_env(env_of(&[
            ("MYSQL_HOST", "db"),
            ("MYSQL_PORT", "not-a-port"),
        ]))
        .unwrap_err();
        assert!(matches!(err, DbError::Config { .. }));
        assert!(err.to_string().contains("MYSQL_PORT"));
    }

    #[test]
    fn test_env_section_replaces_file_section() {
        let file = AppConfig::parse_json(
            r#"{"databases": {
                "mysql": {"host": "file-host", "database": "file_db"},
                "redis": {"host": "file-cache"}
            }}"#,
        )
        .unwrap();
        let env = DatabasesConfig::from_env(env_of(&[("MYSQL_HOST", "env-host")])).unwrap();

        let merged = file.with_env_overrides(env);
        let mysql = merged.databases.mysql.unwrap();
        assert_eq!(mysql.host, "env-host");
        // Whole section is replaced, not merged field by field
        assert!(mysql.database.is_none());
        assert_eq!(merged.databases.redis.unwrap().host, "file-cache");
    }
}
