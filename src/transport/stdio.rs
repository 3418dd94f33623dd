//! Stdio transport for the MCP server.
//!
//! This transport uses standard input/output for communication,
//! which is the standard mode for CLI-based MCP integrations.

use crate::db::ConnectorRegistry;
use crate::error::{DbError, DbResult};
use crate::mcp::DbService;
use crate::security::AccessPolicy;
use crate::transport::{Transport, wait_for_signal};
use rmcp::{ServiceExt, transport::stdio};
use std::sync::Arc;
use tracing::{info, warn};

/// Stdio transport implementation.
///
/// This transport reads JSON-RPC messages from stdin and writes
/// responses to stdout, following the MCP protocol specification.
pub struct StdioTransport {
    registry: Arc<ConnectorRegistry>,
    policy: Arc<AccessPolicy>,
}

impl StdioTransport {
    pub fn new(registry: Arc<ConnectorRegistry>, policy: Arc<AccessPolicy>) -> Self {
        Self { registry, policy }
    }
}

impl Transport for StdioTransport {
    async fn run(&self) -> DbResult<()> {
        info!(mode = %self.policy.mode(), "Starting MCP server with stdio transport");

        let service = DbService::new(self.registry.clone(), self.policy.clone());

        let running_service = service
            .serve(stdio())
            .await
            .map_err(|e| DbError::internal(format!("Failed to start stdio transport: {}", e)))?;

        let shutdown_requested = tokio::select! {
            result = running_service.waiting() => {
                match result {
                    Ok(_quit_reason) => {
                        info!("Stdio transport completed normally");
                    }
                    Err(e) => {
                        warn!(error = %e, "Stdio transport error");
                        self.registry.close_all().await;
                        return Err(DbError::internal(format!("Stdio transport error: {}", e)));
                    }
                }
                false
            }
            _ = wait_for_signal() => {
                info!("Shutdown signal received (send again to force exit)");
                true
            }
        };

        if shutdown_requested {
            tokio::spawn(async {
                wait_for_signal().await;
                warn!("Received second signal, forcing immediate exit");
                std::process::exit(1);
            });
        }

        info!("Closing all database connections");
        self.registry.close_all().await;

        if shutdown_requested {
            // stdin reads block and cannot be interrupted by select!
            info!("Exiting process");
            std::process::exit(0);
        }

        Ok(())
    }

    fn name(&self) -> &'static str {
        "stdio"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stdio_transport_creation() {
        let transport = StdioTransport::new(
            Arc::new(ConnectorRegistry::new()),
            Arc::new(AccessPolicy::default()),
        );
        assert_eq!(transport.name(), "stdio");
    }
}
