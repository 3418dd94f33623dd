//! Transport layer for the MCP server.
//!
//! This module provides different transport implementations for the MCP protocol:
//! - Stdio: Standard input/output for CLI integration
//! - HTTP: Streamable HTTP for web clients, optionally behind bearer auth
//!
//! Both transports share one connector registry and one access policy, and
//! close every connector on shutdown.

pub mod http;
pub mod stdio;

pub use http::HttpTransport;
pub use stdio::StdioTransport;

use crate::error::DbResult;
use std::future::Future;
use tokio::signal;
use tracing::{info, warn};

/// Trait for MCP transport implementations.
///
/// Transports handle the low-level communication between the MCP server
/// and clients, abstracting away the protocol details.
pub trait Transport: Send + Sync {
    /// Start the transport and begin handling requests.
    ///
    /// This method should block until the transport is shut down.
    fn run(&self) -> impl Future<Output = DbResult<()>> + Send;

    /// Get the name of this transport for logging.
    fn name(&self) -> &'static str;
}

/// Wait for a shutdown signal (SIGINT or SIGTERM).
pub(crate) async fn wait_for_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received SIGINT"),
        _ = terminate => info!("Received SIGTERM"),
    }
}
