//! Connection settings for each backend and the parameter type bound into
//! SQL statements.

pub mod connection;
pub mod query;

pub use connection::{Backend, MongoConfig, MySqlConfig, PoolSettings, RedisConfig};
pub use query::{DEFAULT_QUERY_TIMEOUT_SECS, QueryParam};
