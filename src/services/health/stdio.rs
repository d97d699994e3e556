use std::io::ErrorKind;
use std::process::Stdio;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, Command};

use crate::mcp::{resolve_command, McpServer};

use super::protocol::{excerpt, initialize_request, interpret_response, timed_out, HealthStatus};

/// How long a server gets to exit on its own once stdin is closed.
const EXIT_GRACE: Duration = Duration::from_secs(1);

enum Reply {
    /// First stdout line that looks like JSON.
    Json(String),
    /// Output ended without a JSON line.
    Text(String),
    /// No stdout at all.
    Empty,
}

/// Spawn the server, send `initialize`, and judge the first JSON line it
/// prints. The child is always reaped before returning.
pub async fn check_stdio_server(server: &McpServer, timeout: Duration) -> HealthStatus {
    let name = server.name().to_string();
    let McpServer::Stdio(spec) = server.expanded() else {
        return HealthStatus::failed(
            &name,
            format!("Server '{name}' is not a stdio server (type: http)"),
        );
    };

    let Some(program) = resolve_command(&spec.command) else {
        return HealthStatus::failed(
            &name,
            format!("Server '{name}': Command not found: {}", spec.command),
        );
    };

    let mut command = Command::new(&program);
    command
        .args(&spec.args)
        .envs(&spec.env)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let mut child = match command.spawn() {
        Ok(child) => child,
        Err(e) => {
            let message = match e.kind() {
                ErrorKind::NotFound => {
                    format!("Server '{name}': command not found: {}", spec.command)
                }
                ErrorKind::PermissionDenied => format!(
                    "Server '{name}': permission denied executing: {}",
                    spec.command
                ),
                _ => format!("Server '{name}': OS error: {e}"),
            };
            return HealthStatus::failed(&name, message);
        }
    };
    log::debug!("Started '{name}' ({}) for health check", program.display());

    let stderr_task = child.stderr.take().map(|mut stderr| {
        tokio::spawn(async move {
            let mut buf = Vec::new();
            let _ = stderr.read_to_end(&mut buf).await;
            String::from_utf8_lossy(&buf).into_owned()
        })
    });

    let outcome = tokio::time::timeout(timeout, exchange(&mut child)).await;
    terminate(&mut child, &name).await;

    // A grandchild may still hold stderr open; the read is bounded.
    let stderr = match (&outcome, stderr_task) {
        (Ok(Ok(Reply::Empty)), Some(mut task)) => {
            let collected = tokio::time::timeout(EXIT_GRACE, &mut task).await;
            task.abort();
            match collected {
                Ok(Ok(text)) => text,
                _ => String::new(),
            }
        }
        (_, Some(task)) => {
            task.abort();
            String::new()
        }
        (_, None) => String::new(),
    };

    match outcome {
        Err(_) => timed_out(&name, timeout),
        Ok(Err(e)) => HealthStatus::failed(&name, format!("Server '{name}': OS error: {e}")),
        Ok(Ok(Reply::Empty)) => {
            let stderr = stderr.trim();
            let message = if stderr.is_empty() {
                format!("Server '{name}' returned no response")
            } else {
                format!(
                    "Server '{name}' returned no response. stderr: {}",
                    excerpt(stderr)
                )
            };
            HealthStatus::failed(&name, message)
        }
        Ok(Ok(Reply::Text(text))) => HealthStatus::failed(
            &name,
            format!("Server '{name}' returned non-JSON response: {}", excerpt(&text)),
        ),
        Ok(Ok(Reply::Json(line))) => match serde_json::from_str(&line) {
            Ok(value) => interpret_response(&name, &value),
            Err(e) => HealthStatus::failed(
                &name,
                format!("Server '{name}' returned invalid JSON: {e}"),
            ),
        },
    }
}

async fn exchange(child: &mut Child) -> std::io::Result<Reply> {
    if let Some(mut stdin) = child.stdin.take() {
        let line = format!("{}\n", initialize_request());
        match stdin.write_all(line.as_bytes()).await {
            // Server exited before reading; its output still tells us why.
            Err(e) if e.kind() == ErrorKind::BrokenPipe => {}
            Err(e) => return Err(e),
            Ok(()) => {
                let _ = stdin.flush().await;
            }
        }
        // Dropping stdin closes the pipe.
    }

    let mut other = Vec::new();
    if let Some(stdout) = child.stdout.take() {
        let mut lines = BufReader::new(stdout).lines();
        while let Some(line) = lines.next_line().await? {
            let trimmed = line.trim();
            if trimmed.starts_with('{') {
                return Ok(Reply::Json(trimmed.to_string()));
            }
            if !trimmed.is_empty() {
                other.push(trimmed.to_string());
            }
        }
    }

    if other.is_empty() {
        Ok(Reply::Empty)
    } else {
        Ok(Reply::Text(other.join("\n")))
    }
}

/// Wait briefly for a clean exit, then kill.
///
/// The only shutdown request a server gets is stdin closing, which happens
/// right after `initialize` is written. A server that is still running here
/// (including one that timed out) gets no further notice before
/// `start_kill`.
async fn terminate(child: &mut Child, name: &str) {
    if let Ok(Ok(status)) = tokio::time::timeout(EXIT_GRACE, child.wait()).await {
        log::debug!("Health check process for '{name}' exited with {status}");
        return;
    }
    if let Err(e) = child.start_kill() {
        log::debug!("Failed to kill health check process for '{name}': {e}");
    }
    if let Err(e) = child.wait().await {
        log::warn!("Failed to reap health check process for '{name}': {e}");
    }
}
