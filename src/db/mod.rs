//! Database access layer.
//!
//! This module provides database access functionality:
//! - One connector per backend (MySQL, Redis, MongoDB)
//! - A registry holding the live connector of each backend
//! - Value conversions between driver types and JSON

pub mod mongodb;
pub mod mysql;
pub mod redis;
pub mod registry;
pub mod types;

use crate::models::Backend;
use std::future::Future;

pub use self::mongodb::{FindOptions, MongoConnector};
pub use self::mysql::{MySqlConnector, PoolStatus, StatementOutcome};
pub use self::redis::RedisConnector;
pub use registry::{ConnectSettings, ConnectorRegistry, ConnectorSlot};

/// A live connection to one backend.
pub trait Connector: Send + Sync + 'static {
    fn backend(&self) -> Backend;

    /// Release the underlying connection(s).
    fn close(&self) -> impl Future<Output = ()> + Send;
}
