use std::path::Path;

use serde_json::{json, Map, Value};

use crate::config::{read_json_value, write_json_value};
use crate::error::AppError;
use crate::mcp::server::{servers_from_json_map, McpServer, ServerMap};

use super::SaveSummary;

/// Fields mcpx rewrites inside a server entry. Anything else already present
/// on disk (`disabled`, `alwaysAllow`, `timeout`, ...) is carried over.
const OWNED_KEYS: [&str; 7] = ["type", "command", "args", "env", "url", "httpUrl", "headers"];

/// How one tool spells server entries in its JSON file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JsonDialect {
    /// Top-level key holding the server map.
    pub servers_key: &'static str,
    /// Whether entries carry an explicit `"type"`.
    pub write_type: bool,
    /// Key used for the URL of an HTTP server.
    pub http_url_key: &'static str,
    /// Add `disabled: false` and `alwaysAllow: []` when absent.
    pub vscode_defaults: bool,
}

impl JsonDialect {
    pub const CLAUDE: JsonDialect = JsonDialect {
        servers_key: "mcpServers",
        write_type: true,
        http_url_key: "url",
        vscode_defaults: false,
    };

    pub const GEMINI: JsonDialect = JsonDialect {
        servers_key: "mcpServers",
        write_type: false,
        http_url_key: "httpUrl",
        vscode_defaults: false,
    };

    pub const VSCODE_EXTENSION: JsonDialect = JsonDialect {
        servers_key: "mcpServers",
        write_type: true,
        http_url_key: "url",
        vscode_defaults: true,
    };

    /// Bring a tool entry into the shape `McpServer::from_json_spec` reads.
    fn normalize_entry(&self, entry: &Value) -> Value {
        let Some(obj) = entry.as_object() else {
            return entry.clone();
        };
        let mut obj = obj.clone();
        if let Some(http_url) = obj.remove("httpUrl") {
            obj.entry("url").or_insert(http_url);
            obj.entry("type").or_insert(json!("http"));
        }
        if !obj.contains_key("type") && obj.contains_key("url") && !obj.contains_key("command") {
            obj.insert("type".into(), json!("http"));
        }
        Value::Object(obj)
    }

    /// The server an on-disk entry describes, if mcpx can read it.
    fn decode_entry(&self, name: &str, entry: &Value) -> Option<McpServer> {
        McpServer::from_json_spec(name, &self.normalize_entry(entry)).ok()
    }

    fn entry_to_json(&self, server: &McpServer, existing: Option<&Value>) -> Map<String, Value> {
        let mut entry = existing
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default();
        for key in OWNED_KEYS {
            entry.remove(key);
        }

        if self.write_type {
            entry.insert("type".into(), json!(server.kind().as_str()));
        }
        match server {
            McpServer::Stdio(s) => {
                entry.insert("command".into(), json!(s.command));
                entry.insert("args".into(), json!(s.args));
                if !s.env.is_empty() {
                    entry.insert("env".into(), json!(s.env));
                }
            }
            McpServer::Http(h) => {
                entry.insert(self.http_url_key.into(), json!(h.url));
                if !h.headers.is_empty() {
                    entry.insert("headers".into(), json!(h.headers));
                }
            }
        }
        if self.vscode_defaults {
            entry.entry("disabled").or_insert(json!(false));
            entry.entry("alwaysAllow").or_insert(json!([]));
        }
        entry
    }
}

fn read_root(path: &Path) -> Result<Map<String, Value>, AppError> {
    match read_json_value(path)? {
        Value::Object(map) => Ok(map),
        _ => Err(AppError::InvalidInput(format!(
            "{}: top-level JSON value must be an object",
            path.display()
        ))),
    }
}

/// Servers in the file's section. A missing file yields an empty map.
pub(crate) fn load_servers(path: &Path, dialect: &JsonDialect) -> Result<ServerMap, AppError> {
    if !path.exists() {
        return Ok(ServerMap::new());
    }
    let root = read_root(path)?;
    let Some(section) = root.get(dialect.servers_key) else {
        return Ok(ServerMap::new());
    };
    let Some(entries) = section.as_object() else {
        log::warn!(
            "'{}' in {} is not an object, treating as empty",
            dialect.servers_key,
            path.display()
        );
        return Ok(ServerMap::new());
    };

    let normalized: Map<String, Value> = entries
        .iter()
        .map(|(name, entry)| (name.clone(), dialect.normalize_entry(entry)))
        .collect();
    let source = path.display().to_string();
    Ok(servers_from_json_map(&normalized, &source))
}

/// Replace the section with `servers` and write the file back. Other
/// top-level keys are untouched.
///
/// Entries already on disk that describe the same server are written back
/// as they were. Entries mcpx cannot decode are carried through unless
/// `servers` holds the same name.
pub(crate) fn save_servers(
    path: &Path,
    dialect: &JsonDialect,
    servers: &ServerMap,
) -> Result<SaveSummary, AppError> {
    let mut root = read_root(path)?;
    let previous = root
        .get(dialect.servers_key)
        .and_then(Value::as_object)
        .cloned()
        .unwrap_or_default();

    let mut section = Map::new();
    for (name, server) in servers {
        let existing = previous.get(name);
        let entry = match existing {
            Some(raw) if dialect.decode_entry(name, raw).as_ref() == Some(server) => raw.clone(),
            _ => Value::Object(dialect.entry_to_json(server, existing)),
        };
        section.insert(name.clone(), entry);
    }
    for (name, raw) in &previous {
        if !section.contains_key(name) && dialect.decode_entry(name, raw).is_none() {
            log::info!(
                "Keeping unrecognised MCP server '{name}' in {}",
                path.display()
            );
            section.insert(name.clone(), raw.clone());
        }
    }
    root.insert(dialect.servers_key.to_string(), Value::Object(section));

    write_json_value(path, &Value::Object(root))?;
    log::debug!("Wrote {} MCP servers to {}", servers.len(), path.display());
    Ok(SaveSummary {
        written: servers.len(),
        dropped: Vec::new(),
    })
}
