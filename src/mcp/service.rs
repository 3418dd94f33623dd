//! MCP service implementation using rmcp.
//!
//! This module defines the DbService struct with all database tools
//! exposed via the MCP protocol using the rmcp framework's macros.
//! Tool names carry the backend prefix (`mysql_`, `redis_`, `mongodb_`).

use crate::db::ConnectorRegistry;
use crate::security::AccessPolicy;
use crate::tools::{
    DisconnectOutput, MongoConnectInput, MongoConnectOutput, MongoCountOutput, MongoDeleteInput,
    MongoDeleteOutput, MongoFilterInput, MongoFindInput, MongoFindOneOutput, MongoFindOutput,
    MongoInsertManyInput, MongoInsertManyOutput, MongoInsertOneInput, MongoInsertOneOutput,
    MongoListCollectionsOutput, MongoToolHandler, MongoUpdateInput, MongoUpdateOutput,
    MySqlConnectInput, MySqlConnectOutput, MySqlQueryInput, MySqlQueryOutput, MySqlToolHandler,
    PoolStatusOutput, RedisConnectInput, RedisConnectOutput, RedisDelOutput, RedisExistsOutput,
    RedisGetOutput, RedisHGetAllOutput, RedisHGetInput, RedisHGetOutput, RedisKeyInput,
    RedisKeysInput, RedisKeysOutput, RedisSetInput, RedisSetOutput, RedisToolHandler,
    SecurityModeOutput, SecurityToolHandler, SetSecurityModeInput, SetSecurityModeOutput,
};
use rmcp::Json;
use rmcp::{
    ErrorData as McpError, ServerHandler,
    handler::server::tool::ToolRouter,
    handler::server::wrapper::Parameters,
    model::{Implementation, ProtocolVersion, ServerCapabilities, ServerInfo},
    tool, tool_handler, tool_router,
};
use std::sync::Arc;

#[derive(Clone)]
pub struct DbService {
    /// Shared live connectors, one per backend
    registry: Arc<ConnectorRegistry>,
    /// Shared access policy; a mode change is visible to every session
    policy: Arc<AccessPolicy>,
    mysql: Arc<MySqlToolHandler>,
    redis: Arc<RedisToolHandler>,
    mongodb: Arc<MongoToolHandler>,
    security: Arc<SecurityToolHandler>,
    /// Tool router for MCP tool dispatch (auto-generated)
    tool_router: ToolRouter<Self>,
}

impl DbService {
    /// Create a new DbService instance.
    ///
    /// # Arguments
    ///
    /// * `registry` - Shared connector registry
    /// * `policy` - Shared access policy consulted by every data tool
    pub fn new(registry: Arc<ConnectorRegistry>, policy: Arc<AccessPolicy>) -> Self {
        Self {
            mysql: Arc::new(MySqlToolHandler::new(registry.clone(), policy.clone())),
            redis: Arc::new(RedisToolHandler::new(registry.clone(), policy.clone())),
            mongodb: Arc::new(MongoToolHandler::new(registry.clone(), policy.clone())),
            security: Arc::new(SecurityToolHandler::new(policy.clone())),
            registry,
            policy,
            tool_router: Self::tool_router(),
        }
    }

    pub fn registry(&self) -> &Arc<ConnectorRegistry> {
        &self.registry
    }

    pub fn policy(&self) -> &Arc<AccessPolicy> {
        &self.policy
    }
}

#[tool_router]
impl DbService {
    // =========================================================================
    // MySQL
    // =========================================================================

    #[tool(
        description = "Connect to a MySQL server. Replaces any existing MySQL connection.\nSet use_pool with pool settings {min, max, idle_timeout} to use a connection pool."
    )]
    async fn mysql_connect(
        &self,
        Parameters(input): Parameters<MySqlConnectInput>,
    ) -> Result<Json<MySqlConnectOutput>, McpError> {
        self.mysql.connect(input).await.map(Json).map_err(McpError::from)
    }

    #[tool(
        description = "Execute a SQL statement with optional positional parameters (? placeholders).\nread_only mode allows SELECT/SHOW/DESCRIBE/EXPLAIN only; restricted mode blocks DROP, TRUNCATE, ALTER TABLE and DELETE without WHERE."
    )]
    async fn mysql_query(
        &self,
        Parameters(input): Parameters<MySqlQueryInput>,
    ) -> Result<Json<MySqlQueryOutput>, McpError> {
        self.mysql.query(input).await.map(Json).map_err(McpError::from)
    }

    #[tool(description = "Close the MySQL connection.")]
    async fn mysql_disconnect(&self) -> Result<Json<DisconnectOutput>, McpError> {
        self.mysql.disconnect().await.map(Json).map_err(McpError::from)
    }

    #[tool(description = "Show MySQL connection pool statistics (total, active, idle).")]
    async fn mysql_pool_status(&self) -> Result<Json<PoolStatusOutput>, McpError> {
        self.mysql.pool_status().await.map(Json).map_err(McpError::from)
    }

    // =========================================================================
    // Redis
    // =========================================================================

    #[tool(
        description = "Connect to a Redis server by url, or by host/port/password/db. Replaces any existing Redis connection."
    )]
    async fn redis_connect(
        &self,
        Parameters(input): Parameters<RedisConnectInput>,
    ) -> Result<Json<RedisConnectOutput>, McpError> {
        self.redis.connect(input).await.map(Json).map_err(McpError::from)
    }

    #[tool(description = "Get the string value of a Redis key.")]
    async fn redis_get(
        &self,
        Parameters(input): Parameters<RedisKeyInput>,
    ) -> Result<Json<RedisGetOutput>, McpError> {
        self.redis.get(input).await.map(Json).map_err(McpError::from)
    }

    #[tool(description = "Set a Redis key, with an optional TTL in seconds.")]
    async fn redis_set(
        &self,
        Parameters(input): Parameters<RedisSetInput>,
    ) -> Result<Json<RedisSetOutput>, McpError> {
        self.redis.set(input).await.map(Json).map_err(McpError::from)
    }

    #[tool(description = "List Redis keys matching a glob pattern (default *).")]
    async fn redis_keys(
        &self,
        Parameters(input): Parameters<RedisKeysInput>,
    ) -> Result<Json<RedisKeysOutput>, McpError> {
        self.redis.keys(input).await.map(Json).map_err(McpError::from)
    }

    #[tool(description = "Check whether a Redis key exists.")]
    async fn redis_exists(
        &self,
        Parameters(input): Parameters<RedisKeyInput>,
    ) -> Result<Json<RedisExistsOutput>, McpError> {
        self.redis.exists(input).await.map(Json).map_err(McpError::from)
    }

    #[tool(description = "Delete a Redis key. Requires full_access mode.")]
    async fn redis_del(
        &self,
        Parameters(input): Parameters<RedisKeyInput>,
    ) -> Result<Json<RedisDelOutput>, McpError> {
        self.redis.del(input).await.map(Json).map_err(McpError::from)
    }

    #[tool(description = "Get one field of a Redis hash.")]
    async fn redis_hget(
        &self,
        Parameters(input): Parameters<RedisHGetInput>,
    ) -> Result<Json<RedisHGetOutput>, McpError> {
        self.redis.hget(input).await.map(Json).map_err(McpError::from)
    }

    #[tool(description = "Get all fields of a Redis hash.")]
    async fn redis_hgetall(
        &self,
        Parameters(input): Parameters<RedisKeyInput>,
    ) -> Result<Json<RedisHGetAllOutput>, McpError> {
        self.redis.hgetall(input).await.map(Json).map_err(McpError::from)
    }

    #[tool(description = "Close the Redis connection.")]
    async fn redis_disconnect(&self) -> Result<Json<DisconnectOutput>, McpError> {
        self.redis.disconnect().await.map(Json).map_err(McpError::from)
    }

    // =========================================================================
    // MongoDB
    // =========================================================================

    #[tool(
        description = "Connect to MongoDB. The database comes from `database`, else the URL path, else \"test\". Replaces any existing MongoDB connection."
    )]
    async fn mongodb_connect(
        &self,
        Parameters(input): Parameters<MongoConnectInput>,
    ) -> Result<Json<MongoConnectOutput>, McpError> {
        self.mongodb.connect(input).await.map(Json).map_err(McpError::from)
    }

    #[tool(description = "Find documents in a collection with optional filter, limit, skip and sort.")]
    async fn mongodb_find(
        &self,
        Parameters(input): Parameters<MongoFindInput>,
    ) -> Result<Json<MongoFindOutput>, McpError> {
        self.mongodb.find(input).await.map(Json).map_err(McpError::from)
    }

    #[tool(description = "Find the first document matching a filter.")]
    async fn mongodb_find_one(
        &self,
        Parameters(input): Parameters<MongoFilterInput>,
    ) -> Result<Json<MongoFindOneOutput>, McpError> {
        self.mongodb.find_one(input).await.map(Json).map_err(McpError::from)
    }

    #[tool(description = "Insert one document. Requires restricted or full_access mode.")]
    async fn mongodb_insert_one(
        &self,
        Parameters(input): Parameters<MongoInsertOneInput>,
    ) -> Result<Json<MongoInsertOneOutput>, McpError> {
        self.mongodb.insert_one(input).await.map(Json).map_err(McpError::from)
    }

    #[tool(description = "Insert several documents. Requires restricted or full_access mode.")]
    async fn mongodb_insert_many(
        &self,
        Parameters(input): Parameters<MongoInsertManyInput>,
    ) -> Result<Json<MongoInsertManyOutput>, McpError> {
        self.mongodb.insert_many(input).await.map(Json).map_err(McpError::from)
    }

    #[tool(
        description = "Update the first document matching a filter with update operators such as $set."
    )]
    async fn mongodb_update_one(
        &self,
        Parameters(input): Parameters<MongoUpdateInput>,
    ) -> Result<Json<MongoUpdateOutput>, McpError> {
        self.mongodb.update_one(input).await.map(Json).map_err(McpError::from)
    }

    #[tool(description = "Update every document matching a filter.")]
    async fn mongodb_update_many(
        &self,
        Parameters(input): Parameters<MongoUpdateInput>,
    ) -> Result<Json<MongoUpdateOutput>, McpError> {
        self.mongodb.update_many(input).await.map(Json).map_err(McpError::from)
    }

    #[tool(description = "Delete the first document matching a filter. Requires full_access mode.")]
    async fn mongodb_delete_one(
        &self,
        Parameters(input): Parameters<MongoDeleteInput>,
    ) -> Result<Json<MongoDeleteOutput>, McpError> {
        self.mongodb.delete_one(input).await.map(Json).map_err(McpError::from)
    }

    #[tool(description = "Delete every document matching a filter. Requires full_access mode.")]
    async fn mongodb_delete_many(
        &self,
        Parameters(input): Parameters<MongoDeleteInput>,
    ) -> Result<Json<MongoDeleteOutput>, McpError> {
        self.mongodb.delete_many(input).await.map(Json).map_err(McpError::from)
    }

    #[tool(description = "Count documents matching a filter.")]
    async fn mongodb_count(
        &self,
        Parameters(input): Parameters<MongoFilterInput>,
    ) -> Result<Json<MongoCountOutput>, McpError> {
        self.mongodb.count(input).await.map(Json).map_err(McpError::from)
    }

    #[tool(description = "List the collections of the connected database.")]
    async fn mongodb_list_collections(
        &self,
    ) -> Result<Json<MongoListCollectionsOutput>, McpError> {
        self.mongodb.list_collections().await.map(Json).map_err(McpError::from)
    }

    #[tool(description = "Close the MongoDB connection.")]
    async fn mongodb_disconnect(&self) -> Result<Json<DisconnectOutput>, McpError> {
        self.mongodb.disconnect().await.map(Json).map_err(McpError::from)
    }

    // =========================================================================
    // Security mode
    // =========================================================================

    #[tool(description = "Show the active security mode and what it allows.")]
    async fn get_security_mode(&self) -> Json<SecurityModeOutput> {
        Json(self.security.get_mode())
    }

    #[tool(
        description = "Change the security mode: read_only, restricted or full_access.\nThe change applies to every subsequent call on this server."
    )]
    async fn set_security_mode(
        &self,
        Parameters(input): Parameters<SetSecurityModeInput>,
    ) -> Result<Json<SetSecurityModeOutput>, McpError> {
        self.security.set_mode(input).map(Json).map_err(McpError::from)
    }
}

#[tool_handler]
impl ServerHandler for DbService {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2025_03_26,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "db-mcp".to_owned(),
                title: Some("DB MCP Server".to_owned()),
                version: env!("CARGO_PKG_VERSION").to_owned(),
                icons: None,
                website_url: None,
            },
            instructions: Some(format!(
                "Database tools for MySQL, Redis and MongoDB.\n\
                \n\
                ## Workflow\n\
                1. Connect with `mysql_connect`, `redis_connect` or `mongodb_connect` \
                   (preconfigured databases are already connected)\n\
                2. Use the backend's tools; each backend has one active connection\n\
                3. Call `get_security_mode` to see which operations are allowed\n\
                \n\
                ## Security Modes\n\
                - **read_only**: queries only (SELECT/SHOW/DESCRIBE/EXPLAIN, get, find, keys, count)\n\
                - **restricted**: queries plus insert, update and set; DROP, TRUNCATE, ALTER TABLE \
                  and DELETE without WHERE are blocked\n\
                - **full_access**: everything\n\
                \n\
                Current mode: {}",
                self.policy.mode()
            )),
        }
    }
}
