//! Error types for the DB MCP server.
//!
//! This module defines all error types using `thiserror`. Each variant carries
//! enough context for an AI assistant to understand why a call failed and what
//! to do next.

use crate::security::SecurityMode;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Connection failed: {message}")]
    Connection { message: String, suggestion: String },

    #[error("Database error: {message}")]
    Database {
        message: String,
        /// e.g., "42S02" for an unknown table
        sql_state: Option<String>,
        suggestion: String,
    },

    /// The active security mode rejected the request.
    #[error("{reason} Allowed operations: {description}")]
    PermissionDenied {
        mode: SecurityMode,
        reason: String,
        description: String,
    },

    #[error("{backend} is not connected. Call {}_connect first.", .backend.to_lowercase())]
    NotConnected { backend: String },

    /// `elapsed_secs` is `None` when the driver reports a timeout without its limit.
    #[error(
        "Timeout: {operation} {}",
        .elapsed_secs.map_or_else(|| "timed out".to_string(), |s| format!("exceeded {s}s"))
    )]
    Timeout {
        operation: String,
        elapsed_secs: Option<u64>,
    },

    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl DbError {
    /// Create a connection error with a helpful suggestion.
    pub fn connection(message: impl Into<String>, suggestion: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
            suggestion: suggestion.into(),
        }
    }

    /// Create a database error with optional SQL state.
    pub fn database(
        message: impl Into<String>,
        sql_state: Option<String>,
        suggestion: impl Into<String>,
    ) -> Self {
        Self::Database {
            message: message.into(),
            sql_state,
            suggestion: suggestion.into(),
        }
    }

    /// Create a denial for the given mode.
    pub fn permission_denied(
        mode: SecurityMode,
        reason: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self::PermissionDenied {
            mode,
            reason: reason.into(),
            description: description.into(),
        }
    }

    pub fn not_connected(backend: impl Into<String>) -> Self {
        Self::NotConnected {
            backend: backend.into(),
        }
    }

    pub fn timeout(operation: impl Into<String>, elapsed_secs: u64) -> Self {
        Self::Timeout {
            operation: operation.into(),
            elapsed_secs: Some(elapsed_secs),
        }
    }

    /// Timeout whose limit is owned by the driver and not known here.
    pub fn timed_out(operation: impl Into<String>) -> Self {
        Self::Timeout {
            operation: operation.into(),
            elapsed_secs: None,
        }
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Get the suggestion for this error, if available.
    pub fn suggestion(&self) -> Option<&str> {
        match self {
            Self::Connection { suggestion, .. } => Some(suggestion),
            Self::Database { suggestion, .. } => Some(suggestion),
            Self::PermissionDenied { .. } => {
                Some("Ask the operator to change the security mode with set_security_mode")
            }
            Self::Timeout { .. } => {
                Some("Consider increasing the timeout or optimizing the operation")
            }
            _ => None,
        }
    }

    /// Check if this error is retryable. Denials are final until the mode changes.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Connection { .. } | Self::Timeout { .. })
    }
}

/// Convert sqlx errors to DbError.
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Configuration(msg) => DbError::connection(
                msg.to_string(),
                "Check the MySQL host, port and credentials",
            ),
            sqlx::Error::Database(db_err) => {
                let code = db_err.code().map(|c| c.to_string());
                DbError::database(
                    db_err.message(),
                    code,
                    "Check the SQL syntax and referenced objects",
                )
            }
            sqlx::Error::RowNotFound => DbError::database(
                "No rows returned",
                None,
                "Verify the query conditions match existing data",
            ),
            sqlx::Error::PoolTimedOut => DbError::timed_out("connection pool acquire"),
            sqlx::Error::PoolClosed => {
                DbError::connection("Connection pool is closed", "Call mysql_connect again")
            }
            sqlx::Error::Io(io_err) => DbError::connection(
                format!("I/O error: {}", io_err),
                "Check network connectivity and database server status",
            ),
            sqlx::Error::Tls(tls_err) => DbError::connection(
                format!("TLS error: {}", tls_err),
                "Verify TLS configuration and certificates",
            ),
            sqlx::Error::Protocol(msg) => DbError::connection(
                format!("Protocol error: {}", msg),
                "Check database server compatibility",
            ),
            sqlx::Error::ColumnDecode { index, source } => {
                DbError::internal(format!("Failed to decode column {}: {}", index, source))
            }
            sqlx::Error::Decode(source) => DbError::internal(format!("Decode error: {}", source)),
            sqlx::Error::WorkerCrashed => DbError::internal("Database worker crashed"),
            _ => DbError::internal(format!("Unknown database error: {}", err)),
        }
    }
}

impl From<redis::RedisError> for DbError {
    fn from(err: redis::RedisError) -> Self {
        if err.is_connection_refusal() || err.is_connection_dropped() || err.is_io_error() {
            DbError::connection(
                format!("Redis error: {}", err),
                "Check that the Redis server is reachable and call redis_connect again",
            )
        } else if err.is_timeout() {
            DbError::timed_out("redis command")
        } else {
            DbError::database(
                err.to_string(),
                err.code().map(String::from),
                "Check the key type and command arguments",
            )
        }
    }
}

impl From<mongodb::error::Error> for DbError {
    fn from(err: mongodb::error::Error) -> Self {
        use mongodb::error::ErrorKind;

        match err.kind.as_ref() {
            ErrorKind::ServerSelection { .. } | ErrorKind::Io(_) => DbError::connection(
                format!("MongoDB error: {}", err),
                "Check that the MongoDB server is reachable and call mongodb_connect again",
            ),
            ErrorKind::InvalidArgument { .. } => {
                DbError::invalid_input(format!("MongoDB rejected the request: {}", err))
            }
            _ => DbError::database(
                err.to_string(),
                None,
                "Check the filter, update and document shapes",
            ),
        }
    }
}

/// Result type alias for database operations.
pub type DbResult<T> = Result<T, DbError>;

/// Build suggestion data as JSON value.
fn suggestion_data(suggestion: Option<&str>) -> Option<serde_json::Value> {
    suggestion.map(|s| serde_json::json!({ "suggestion": s }))
}

/// Convert DbError to MCP ErrorData for semantic error categorization.
/// Includes the suggestion field in the `data` object when available.
impl From<DbError> for rmcp::ErrorData {
    fn from(err: DbError) -> Self {
        let data = suggestion_data(err.suggestion());
        match &err {
            DbError::PermissionDenied { .. } | DbError::InvalidInput { .. } => {
                rmcp::ErrorData::invalid_params(err.to_string(), data)
            }

            DbError::NotConnected { .. } => {
                rmcp::ErrorData::resource_not_found(err.to_string(), data)
            }

            // Database errors -> invalid_params with sql_state in message
            DbError::Database {
                message, sql_state, ..
            } => {
                let msg = match sql_state {
                    Some(code) => format!("{} (SQLSTATE: {})", message, code),
                    None => message.clone(),
                };
                rmcp::ErrorData::invalid_params(msg, data)
            }

            DbError::Connection { .. }
            | DbError::Timeout { .. }
            | DbError::Config { .. }
            | DbError::Internal { .. } => rmcp::ErrorData::internal_error(err.to_string(), data),
        }
    }
}
