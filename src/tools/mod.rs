//! MCP tool implementations.
//!
//! This module contains all tool handlers:
//! - `mysql`: connect, query, disconnect, pool status
//! - `redis`: connect, key/hash reads, set, del, disconnect
//! - `mongodb`: connect, find, insert, update, delete, count, list collections
//! - `security`: read and change the active security mode
//! - `guard`: turns policy denials into errors

pub mod guard;
pub mod mongodb;
pub mod mysql;
pub mod redis;
pub mod security;

use schemars::JsonSchema;
use serde::Serialize;

pub use self::mongodb::{
    MongoConnectInput, MongoConnectOutput, MongoCountOutput, MongoDeleteInput, MongoDeleteOutput,
    MongoFilterInput, MongoFindInput, MongoFindOneOutput, MongoFindOutput, MongoInsertManyInput,
    MongoInsertManyOutput, MongoInsertOneInput, MongoInsertOneOutput, MongoListCollectionsOutput,
    MongoToolHandler, MongoUpdateInput, MongoUpdateOutput,
};
pub use self::mysql::{
    MySqlConnectInput, MySqlConnectOutput, MySqlQueryInput, MySqlQueryOutput, MySqlToolHandler,
    PoolStatusOutput,
};
pub use self::redis::{
    RedisConnectInput, RedisConnectOutput, RedisDelOutput, RedisExistsOutput, RedisGetOutput,
    RedisHGetAllOutput, RedisHGetInput, RedisHGetOutput, RedisKeyInput, RedisKeysInput,
    RedisKeysOutput, RedisSetInput, RedisSetOutput, RedisToolHandler,
};
pub use security::{
    SecurityModeOutput, SecurityToolHandler, SetSecurityModeInput, SetSecurityModeOutput,
};

/// Output shared by the `*_disconnect` tools.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct DisconnectOutput {
    /// False when there was no connection to close
    pub disconnected: bool,
    pub message: String,
}
