//! DB MCP Server - Main entry point.
//!
//! This server provides MCP (Model Context Protocol) tools for AI assistants
//! to work with MySQL, Redis and MongoDB under a security mode policy.

use db_mcp::auth::AuthConfig;
use db_mcp::config::{Config, TransportMode};
use db_mcp::db::{ConnectSettings, ConnectorRegistry};
use db_mcp::security::AccessPolicy;
use db_mcp::transport::{HttpTransport, StdioTransport, Transport};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Initialize the tracing subscriber for logging.
///
/// Logs always go to stderr; stdout carries the stdio transport.
fn init_tracing(config: &Config) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let subscriber = tracing_subscriber::registry().with(filter);

    if config.json_logs {
        subscriber
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        subscriber
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(true)
                    .with_thread_ids(false),
            )
            .init();
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::parse_args();

    init_tracing(&config);

    info!(
        transport = %config.transport,
        "Starting DB MCP Server v{}",
        env!("CARGO_PKG_VERSION")
    );

    let app_config = config.load_app_config().await.inspect_err(|e| {
        error!(error = %e, path = %config.config_path.display(), "Failed to load configuration");
    })?;

    let policy = Arc::new(AccessPolicy::new(config.initial_security_mode(&app_config)));

    let registry = Arc::new(ConnectorRegistry::with_settings(ConnectSettings {
        connect_timeout: config.connect_timeout_duration(),
        query_timeout: config.query_timeout_duration(),
    }));

    if !app_config.databases.is_empty() {
        let connected = registry.connect_configured(&app_config.databases).await;
        info!(connected, "Preconfigured databases connected");
    }

    let result = match config.transport {
        TransportMode::Stdio => {
            let transport = StdioTransport::new(registry, policy);
            transport.run().await
        }
        TransportMode::Http => {
            let auth = AuthConfig::from_tokens(config.auth_tokens.clone())?;
            info!(
                host = %config.http_host,
                port = config.http_port,
                endpoint = %config.mcp_endpoint,
                auth_tokens = auth.token_count(),
                "Using HTTP transport"
            );
            let transport = HttpTransport::new(
                registry,
                policy,
                &config.http_host,
                config.http_port,
                &config.mcp_endpoint,
            )
            .with_auth(auth);
            transport.run().await
        }
    };

    if let Err(e) = result {
        error!(error = %e, "Server error");
        return Err(e.into());
    }

    info!("Server shutdown complete");
    Ok(())
}
