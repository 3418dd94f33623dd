//! HTTP transport with Streamable HTTP support for the MCP server.
//!
//! This transport uses HTTP with SSE streaming responses,
//! which is suitable for web-based MCP integrations. Every session gets its
//! own `DbService`, but all of them share the same registry and policy.

use crate::auth::{AuthConfig, auth_middleware};
use crate::db::ConnectorRegistry;
use crate::error::{DbError, DbResult};
use crate::mcp::DbService;
use crate::security::AccessPolicy;
use crate::transport::{Transport, wait_for_signal};
use rmcp::transport::streamable_http_server::{
    StreamableHttpService, session::local::LocalSessionManager,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

/// HTTP transport implementation with Streamable HTTP support.
///
/// This transport provides:
/// - HTTP endpoints for MCP protocol messages
/// - Server-Sent Events for streaming responses
/// - Optional bearer-token authentication
pub struct HttpTransport {
    registry: Arc<ConnectorRegistry>,
    policy: Arc<AccessPolicy>,
    auth: Arc<AuthConfig>,
    /// Host to bind to
    host: String,
    /// Port to bind to
    port: u16,
    /// MCP endpoint path
    endpoint: String,
}

impl HttpTransport {
    /// Create a new HTTP transport.
    ///
    /// # Arguments
    ///
    /// * `registry` - Shared connector registry
    /// * `policy` - Shared access policy
    /// * `host` - Host address to bind to
    /// * `port` - Port to bind to
    /// * `endpoint` - MCP endpoint path (e.g., "/mcp")
    pub fn new(
        registry: Arc<ConnectorRegistry>,
        policy: Arc<AccessPolicy>,
        host: impl Into<String>,
        port: u16,
        endpoint: impl Into<String>,
    ) -> Self {
        Self {
            registry,
            policy,
            auth: Arc::new(AuthConfig::disabled()),
            host: host.into(),
            port,
            endpoint: endpoint.into(),
        }
    }

    /// Require bearer tokens on every request.
    pub fn with_auth(mut self, auth: AuthConfig) -> Self {
        self.auth = Arc::new(auth);
        self
    }

    /// Get the bind address.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Get the MCP endpoint path.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn auth_enabled(&self) -> bool {
        self.auth.is_enabled()
    }

    fn router(&self) -> axum::Router {
        let registry = self.registry.clone();
        let policy = self.policy.clone();

        let service = StreamableHttpService::new(
            move || Ok(DbService::new(registry.clone(), policy.clone())),
            LocalSessionManager::default().into(),
            Default::default(),
        );

        // nest_service doesn't support the root path
        let app = if self.endpoint == "/" {
            axum::Router::new().fallback_service(service)
        } else {
            axum::Router::new().nest_service(&self.endpoint, service)
        };

        if self.auth.is_enabled() {
            app.layer(axum::middleware::from_fn_with_state(
                self.auth.clone(),
                auth_middleware,
            ))
        } else {
            app
        }
    }
}

impl Transport for HttpTransport {
    async fn run(&self) -> DbResult<()> {
        let bind_addr = self.bind_addr();
        info!(
            mode = %self.policy.mode(),
            auth = self.auth.is_enabled(),
            "Starting MCP server with HTTP transport on {}",
            bind_addr
        );

        let app = self.router();

        let listener = TcpListener::bind(&bind_addr).await.map_err(|e| {
            DbError::connection(
                format!("Failed to bind to {}: {}", bind_addr, e),
                "Check that the port is available",
            )
        })?;

        info!(endpoint = %self.endpoint, "MCP endpoint ready");

        // SSE connections may keep the server alive indefinitely
        const GRACEFUL_TIMEOUT: Duration = Duration::from_secs(30);

        let shutdown_notify = Arc::new(tokio::sync::Notify::new());
        let shutdown_notify_clone = shutdown_notify.clone();

        let shutdown_signal = async move {
            wait_for_signal().await;
            shutdown_notify_clone.notify_one();
        };

        let server = axum::serve(listener, app).with_graceful_shutdown(shutdown_signal);

        tokio::select! {
            result = server => {
                match result {
                    Ok(()) => info!("HTTP server stopped"),
                    Err(e) => {
                        error!(error = %e, "HTTP server error");
                        self.registry.close_all().await;
                        return Err(DbError::internal(format!("HTTP server error: {}", e)));
                    }
                }
            }
            _ = async {
                shutdown_notify.notified().await;
                info!(
                    timeout_secs = GRACEFUL_TIMEOUT.as_secs(),
                    "Waiting for connections to close (send signal again to force exit)..."
                );

                tokio::select! {
                    _ = tokio::time::sleep(GRACEFUL_TIMEOUT) => {
                        warn!("Graceful shutdown timeout, forcing exit");
                    }
                    _ = wait_for_signal() => {
                        warn!("Received second signal, forcing immediate exit");
                    }
                }
            } => {}
        }

        info!("Closing database connections");
        self.registry.close_all().await;

        Ok(())
    }

    fn name(&self) -> &'static str {
        "http"
    }
}
