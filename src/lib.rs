//! DB MCP Server Library
//!
//! This library provides MCP (Model Context Protocol) tools for AI assistants
//! to work with MySQL, Redis and MongoDB. Every data operation passes through
//! an [`AccessPolicy`] whose security mode (read_only, restricted, full_access)
//! decides what may run.

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod mcp;
pub mod models;
pub mod security;
pub mod tools;
pub mod transport;

pub use config::Config;
pub use error::{DbError, DbResult};
pub use mcp::DbService;
pub use security::{AccessPolicy, OperationKind, SecurityMode};
