use std::time::Duration;

use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::Client;
use serde_json::Value;

use crate::mcp::McpServer;

use super::protocol::{excerpt, initialize_request, interpret_response, timed_out, HealthStatus};

/// Pull the JSON payload out of a response body. Streamable HTTP servers may
/// answer with an SSE stream, in which case the first `data:` line holding
/// an object is used.
fn json_payload(body: &str) -> Option<&str> {
    let trimmed = body.trim();
    if trimmed.starts_with('{') {
        return Some(trimmed);
    }
    trimmed.lines().find_map(|line| {
        let data = line.trim().strip_prefix("data:")?.trim();
        data.starts_with('{').then_some(data)
    })
}

fn request_failure(name: &str, err: &reqwest::Error, timeout: Duration) -> HealthStatus {
    if err.is_timeout() {
        timed_out(name, timeout)
    } else if err.is_connect() {
        HealthStatus::failed(name, format!("Server '{name}' connection failed: {err}"))
    } else {
        HealthStatus::failed(name, format!("Server '{name}' request failed: {err}"))
    }
}

/// POST `initialize` to the server URL and judge the reply.
pub async fn check_http_server(server: &McpServer, timeout: Duration) -> HealthStatus {
    let name = server.name().to_string();
    let McpServer::Http(spec) = server.expanded() else {
        return HealthStatus::failed(
            &name,
            format!("Server '{name}' is not an HTTP server (type: stdio)"),
        );
    };
    if spec.url.trim().is_empty() {
        return HealthStatus::failed(&name, format!("Server '{name}' has no URL specified"));
    }

    let client = match Client::builder().timeout(timeout).build() {
        Ok(c) => c,
        Err(e) => {
            return HealthStatus::failed(
                &name,
                format!("Server '{name}': failed to create HTTP client: {e}"),
            )
        }
    };

    let mut request = client
        .post(&spec.url)
        .header(CONTENT_TYPE, "application/json")
        .header(ACCEPT, "application/json, text/event-stream")
        .body(initialize_request().to_string());
    for (key, value) in &spec.headers {
        request = request.header(key.as_str(), value.as_str());
    }

    let response = match request.send().await {
        Ok(r) => r,
        Err(e) => return request_failure(&name, &e, timeout),
    };

    let status = response.status();
    if !status.is_success() {
        return HealthStatus::failed(
            &name,
            format!("Server '{name}' returned HTTP {}", status.as_u16()),
        );
    }

    let body = match response.text().await {
        Ok(b) => b,
        Err(e) => return request_failure(&name, &e, timeout),
    };
    if body.trim().is_empty() {
        return HealthStatus::failed(&name, format!("Server '{name}' returned empty response"));
    }

    let Some(payload) = json_payload(&body) else {
        return HealthStatus::failed(
            &name,
            format!("Server '{name}' returned non-JSON response: {}", excerpt(&body)),
        );
    };
    match serde_json::from_str::<Value>(payload) {
        Ok(value) => interpret_response(&name, &value),
        Err(e) => HealthStatus::failed(&name, format!("Server '{name}' returned invalid JSON: {e}")),
    }
}
