use std::fmt;
use std::path::{Path, PathBuf};

use url::Url;

use crate::app_config::Config;

use super::env::unset_vars;
use super::server::McpServer;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Blocks a sync.
    Error,
    /// Reported, never blocking.
    Warning,
}

/// One finding about one server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationIssue {
    pub server_name: String,
    pub message: String,
    pub severity: Severity,
}

impl ValidationIssue {
    fn error(message: String) -> Self {
        Self {
            server_name: String::new(),
            message,
            severity: Severity::Error,
        }
    }

    fn for_server(self, name: &str) -> Self {
        Self {
            server_name: name.to_string(),
            ..self
        }
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Server '{}': {}", self.server_name, self.message)
    }
}

/// Locate `command` the way a shell would.
///
/// Anything containing a path separator is checked as a path; bare names are
/// searched in `PATH` (with `PATHEXT` suffixes on Windows).
pub fn resolve_command(command: &str) -> Option<PathBuf> {
    let command = command.trim();
    if command.is_empty() {
        return None;
    }

    let as_path = Path::new(command);
    if as_path.components().count() > 1 || as_path.is_absolute() {
        return executable_candidates(as_path).into_iter().find(|p| is_executable(p));
    }

    let search = std::env::var_os("PATH")?;
    std::env::split_paths(&search)
        .filter(|dir| !dir.as_os_str().is_empty())
        .flat_map(|dir| executable_candidates(&dir.join(command)))
        .find(|p| is_executable(p))
}

#[cfg(windows)]
fn executable_candidates(base: &Path) -> Vec<PathBuf> {
    let mut out = vec![base.to_path_buf()];
    if base.extension().is_none() {
        let pathext = std::env::var("PATHEXT").unwrap_or_else(|_| ".COM;.EXE;.BAT;.CMD".into());
        for ext in pathext.split(';').filter(|e| !e.is_empty()) {
            let mut name = base.as_os_str().to_os_string();
            name.push(ext);
            out.push(PathBuf::from(name));
        }
    }
    out
}

#[cfg(not(windows))]
fn executable_candidates(base: &Path) -> Vec<PathBuf> {
    vec![base.to_path_buf()]
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    std::fs::metadata(path)
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

pub fn validate_command_exists(command: &str) -> Option<ValidationIssue> {
    match resolve_command(command) {
        Some(_) => None,
        None => Some(ValidationIssue::error(format!(
            "Command not found: {command}"
        ))),
    }
}

pub fn validate_url(url: &str) -> Option<ValidationIssue> {
    let parsed = match Url::parse(url) {
        Ok(u) => u,
        Err(url::ParseError::EmptyHost) => {
            return Some(ValidationIssue::error(format!("URL missing host/domain: {url}")))
        }
        Err(e) => {
            return Some(ValidationIssue::error(format!(
                "Invalid URL format '{url}': {e}"
            )))
        }
    };
    if !matches!(parsed.scheme(), "http" | "https") {
        return Some(ValidationIssue::error(format!(
            "URL must use HTTP or HTTPS scheme: {url}"
        )));
    }
    if parsed.host_str().map_or(true, str::is_empty) {
        return Some(ValidationIssue::error(format!("URL missing host/domain: {url}")));
    }
    None
}

fn unset_var_warnings(name: &str, value: &str, field: &str, out: &mut Vec<ValidationIssue>) {
    for var in unset_vars(value) {
        out.push(ValidationIssue {
            server_name: name.to_string(),
            message: format!("Environment variable '${{{var}}}' not set (referenced in {field})"),
            severity: Severity::Warning,
        });
    }
}

/// Check one server: errors for things that prevent it from running,
/// warnings for `${VAR}` references whose variable is unset.
pub fn validate_server(server: &McpServer) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();
    match server {
        McpServer::Stdio(s) => {
            if let Some(issue) = validate_command_exists(&s.command) {
                issues.push(issue.for_server(&s.name));
            }
            unset_var_warnings(&s.name, &s.command, "command", &mut issues);
            for arg in &s.args {
                unset_var_warnings(&s.name, arg, "args", &mut issues);
            }
            for (key, value) in &s.env {
                unset_var_warnings(&s.name, value, &format!("env.{key}"), &mut issues);
            }
        }
        McpServer::Http(h) => {
            if let Some(issue) = validate_url(&h.url) {
                issues.push(issue.for_server(&h.name));
            }
            unset_var_warnings(&h.name, &h.url, "url", &mut issues);
            for (key, value) in &h.headers {
                unset_var_warnings(&h.name, value, &format!("headers.{key}"), &mut issues);
            }
        }
    }
    issues
}

/// Issues for every server, in config order.
pub fn validate_config(config: &Config) -> Vec<ValidationIssue> {
    config.servers.values().flat_map(validate_server).collect()
}

pub fn has_blocking_errors(issues: &[ValidationIssue]) -> bool {
    issues.iter().any(ValidationIssue::is_error)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_checks() {
        assert!(validate_url("https://api.example.com/mcp").is_none());
        assert!(validate_url("http://localhost:8080").is_none());

        let ftp = validate_url("ftp://files.example.com").expect("scheme error");
        assert_eq!(
            ftp.message,
            "URL must use HTTP or HTTPS scheme: ftp://files.example.com"
        );
        assert!(ftp.is_error());

        let garbage = validate_url("not a url").expect("parse error");
        assert!(garbage.message.starts_with("Invalid URL format"));
    }

    #[test]
    fn missing_host_is_reported() {
        let issue = validate_url("http://").expect("missing host");
        assert!(issue.message.contains("missing host"), "{}", issue.message);
    }

    #[test]
    fn unknown_command_is_a_single_error() {
        let server = McpServer::stdio("x", "not_a_real_cmd_xyz");
        let issues = validate_server(&server);
        assert_eq!(issues.len(), 1);
        assert!(issues[0].is_error());
        assert!(issues[0].message.contains("not_a_real_cmd_xyz"));
        assert_eq!(issues[0].to_string(), "Server 'x': Command not found: not_a_real_cmd_xyz");
    }

    #[test]
    fn clean_server_has_no_issues() {
        let exe = std::env::current_exe().expect("test binary path");
        let server = McpServer::stdio("self", exe.to_string_lossy()).with_args(["--help"]);
        assert!(validate_server(&server).is_empty());
    }

    #[cfg(unix)]
    #[test]
    #[serial_test::serial]
    fn unset_variable_in_args_is_one_warning() {
        std::env::remove_var("MCPX_UNSET");
        let server = McpServer::stdio("echoer", "echo").with_args(["${MCPX_UNSET}"]);
        let issues = validate_server(&server);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].severity, Severity::Warning);
        assert_eq!(
            issues[0].message,
            "Environment variable '${MCPX_UNSET}' not set (referenced in args)"
        );
    }

    #[test]
    #[serial_test::serial]
    fn http_placeholders_name_their_field() {
        std::env::remove_var("MCPX_TEST_MISSING_TOKEN");
        let server = McpServer::http("api", "https://api.example.com")
            .with_headers([("X-Token", "${MCPX_TEST_MISSING_TOKEN}")]);
        let issues = validate_server(&server);
        assert_eq!(issues.len(), 1);
        assert!(issues[0].message.ends_with("(referenced in headers.X-Token)"));
    }

    #[cfg(unix)]
    #[test]
    fn resolves_absolute_and_path_commands() {
        assert!(resolve_command("/bin/sh").is_some());
        assert!(resolve_command("sh").is_some());
        assert!(resolve_command("/definitely/not/here").is_none());
        assert!(resolve_command("").is_none());
    }

    #[test]
    fn blocking_only_for_errors() {
        let warning = ValidationIssue {
            server_name: "a".into(),
            message: "w".into(),
            severity: Severity::Warning,
        };
        assert!(!has_blocking_errors(&[warning.clone()]));
        let error = ValidationIssue {
            severity: Severity::Error,
            ..warning.clone()
        };
        assert!(has_blocking_errors(&[warning, error]));
    }
}
