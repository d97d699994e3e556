//! MCP liveness checks: send `initialize` and judge the response.

mod http;
mod protocol;
mod stdio;

use std::time::Duration;

use futures::future::join_all;

use crate::app_config::Config;
use crate::error::AppError;
use crate::mcp::McpServer;

pub use http::check_http_server;
pub use protocol::{
    initialize_request, interpret_response, HealthStatus, CLIENT_NAME, CLIENT_VERSION,
    DEFAULT_TIMEOUT, PROTOCOL_VERSION,
};
pub use stdio::check_stdio_server;

/// Check one server over its own transport.
pub async fn check_server(server: &McpServer, timeout: Duration) -> HealthStatus {
    match server {
        McpServer::Stdio(_) => check_stdio_server(server, timeout).await,
        McpServer::Http(_) => check_http_server(server, timeout).await,
    }
}

/// Check every server concurrently; results follow config order.
pub async fn check_servers(config: &Config, timeout: Duration) -> Vec<HealthStatus> {
    join_all(
        config
            .servers
            .values()
            .map(|server| check_server(server, timeout)),
    )
    .await
}

/// [`check_server`] for callers outside an async runtime.
///
/// Returns `AppError::InvalidInput` when called from inside a tokio runtime;
/// async callers should await [`check_server`] instead.
pub fn check_server_blocking(
    server: &McpServer,
    timeout: Duration,
) -> Result<HealthStatus, AppError> {
    if tokio::runtime::Handle::try_current().is_ok() {
        return Err(AppError::InvalidInput(
            "check_server_blocking cannot run inside an async runtime; await check_server"
                .to_string(),
        ));
    }
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| AppError::IoContext {
            context: "failed to start async runtime".to_string(),
            source: e,
        })?;
    Ok(runtime.block_on(check_server(server, timeout)))
}
