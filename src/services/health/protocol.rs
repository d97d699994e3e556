use std::time::Duration;

use serde_json::{json, Value};

pub const PROTOCOL_VERSION: &str = "2024-11-05";
pub const CLIENT_NAME: &str = "mcpx";
pub const CLIENT_VERSION: &str = env!("CARGO_PKG_VERSION");

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Longest slice of captured output quoted in a failure message.
pub(super) const OUTPUT_EXCERPT_CHARS: usize = 200;

/// Outcome of one liveness check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HealthStatus {
    pub server_name: String,
    pub healthy: bool,
    pub message: String,
}

impl HealthStatus {
    pub(super) fn healthy(server_name: &str, message: String) -> Self {
        Self {
            server_name: server_name.to_string(),
            healthy: true,
            message,
        }
    }

    pub(super) fn failed(server_name: &str, message: String) -> Self {
        Self {
            server_name: server_name.to_string(),
            healthy: false,
            message,
        }
    }
}

/// The JSON-RPC `initialize` request sent over every transport.
pub fn initialize_request() -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": 1,
        "method": "initialize",
        "params": {
            "protocolVersion": PROTOCOL_VERSION,
            "capabilities": {},
            "clientInfo": {
                "name": CLIENT_NAME,
                "version": CLIENT_VERSION
            }
        }
    })
}

pub(super) fn excerpt(text: &str) -> String {
    text.chars().take(OUTPUT_EXCERPT_CHARS).collect()
}

pub(super) fn format_timeout(timeout: Duration) -> String {
    if timeout.subsec_nanos() == 0 {
        timeout.as_secs().to_string()
    } else {
        format!("{:.1}", timeout.as_secs_f64())
    }
}

pub(super) fn timed_out(server_name: &str, timeout: Duration) -> HealthStatus {
    HealthStatus::failed(
        server_name,
        format!(
            "Server '{server_name}' timed out after {} seconds",
            format_timeout(timeout)
        ),
    )
}

/// Judge an `initialize` response.
pub fn interpret_response(server_name: &str, response: &Value) -> HealthStatus {
    let fail = |message: String| HealthStatus::failed(server_name, message);

    let Some(version) = response.get("jsonrpc") else {
        return fail(format!(
            "Server '{server_name}' response missing 'jsonrpc' field"
        ));
    };
    if version.as_str() != Some("2.0") {
        return fail(format!(
            "Server '{server_name}' has invalid JSON-RPC version: {version}"
        ));
    }

    if let Some(error) = response.get("error") {
        let message = error
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| error.to_string());
        return fail(format!("Server '{server_name}' returned error: {message}"));
    }

    let Some(result) = response.get("result") else {
        return fail(format!(
            "Server '{server_name}' response missing 'result' or 'error' field"
        ));
    };
    let info = result.get("serverInfo");
    let field = |key: &str| {
        info.and_then(|i| i.get(key))
            .and_then(Value::as_str)
            .unwrap_or("unknown")
            .to_string()
    };
    HealthStatus::healthy(
        server_name,
        format!(
            "Server '{server_name}' healthy (server: {} v{})",
            field("name"),
            field("version")
        ),
    )
}
