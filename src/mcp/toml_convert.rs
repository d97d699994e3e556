use serde_json::{json, Map, Value};
use toml_edit::{Array, InlineTable, Item, Table};

use crate::error::AppError;

use super::server::{McpServer, StdioServer};

/// Keys this crate owns inside a `[mcp_servers.<name>]` table. Anything else
/// (timeouts, `cwd`, tool filters) belongs to the user and is kept on save.
const OWNED_KEYS: [&str; 4] = ["type", "command", "args", "env"];

/// TOML scalar to JSON, for the parts of an entry we read.
fn toml_scalar_to_json(value: &toml::Value) -> Option<Value> {
    match value {
        toml::Value::String(s) => Some(json!(s)),
        toml::Value::Integer(i) => Some(json!(i)),
        toml::Value::Float(f) => Some(json!(f)),
        toml::Value::Boolean(b) => Some(json!(b)),
        _ => None,
    }
}

/// Decode one `[mcp_servers.<name>]` table.
///
/// Entries that describe an HTTP server (a `url` and no `command`) are
/// rejected: the format is read as stdio-only.
pub fn toml_entry_to_server(name: &str, entry: &toml::Value) -> Result<McpServer, AppError> {
    let tbl = entry.as_table().ok_or_else(|| {
        AppError::McpValidation(format!("Server '{name}' must be a TOML table"))
    })?;

    if tbl.contains_key("url") && !tbl.contains_key("command") {
        return Err(AppError::McpValidation(format!(
            "Server '{name}' is a URL-based server; only stdio servers are read from TOML"
        )));
    }

    let mut spec = Map::new();
    spec.insert("type".into(), json!("stdio"));
    if let Some(cmd) = tbl.get("command") {
        if let Some(v) = toml_scalar_to_json(cmd) {
            spec.insert("command".into(), v);
        }
    }
    if let Some(args) = tbl.get("args") {
        let arr = args.as_array().ok_or_else(|| {
            AppError::McpValidation(format!("Server '{name}': 'args' must be an array"))
        })?;
        let values = arr
            .iter()
            .map(|a| {
                toml_scalar_to_json(a).ok_or_else(|| {
                    AppError::McpValidation(format!("Server '{name}': unsupported 'args' item"))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        spec.insert("args".into(), Value::Array(values));
    }
    if let Some(env) = tbl.get("env") {
        let env_tbl = env.as_table().ok_or_else(|| {
            AppError::McpValidation(format!("Server '{name}': 'env' must be a table"))
        })?;
        let mut env_json = Map::new();
        for (k, v) in env_tbl {
            match toml_scalar_to_json(v) {
                Some(jv) => {
                    env_json.insert(k.clone(), jv);
                }
                None => log::debug!("Skipping non-scalar env '{k}' of Codex server '{name}'"),
            }
        }
        spec.insert("env".into(), Value::Object(env_json));
    }

    McpServer::from_json_spec(name, &Value::Object(spec))
}

/// Build the TOML table for a stdio server.
///
/// When `base` is the table already on disk for the same name, its
/// user-owned keys are carried over and only the owned keys are replaced.
pub fn stdio_server_to_toml_table(server: &StdioServer, base: Option<&Table>) -> Table {
    let mut t = match base {
        Some(existing) => {
            let mut kept = existing.clone();
            for key in OWNED_KEYS {
                kept.remove(key);
            }
            kept
        }
        None => Table::new(),
    };

    t["command"] = toml_edit::value(server.command.as_str());

    let mut args = Array::default();
    for a in &server.args {
        args.push(a.as_str());
    }
    t["args"] = Item::Value(toml_edit::Value::Array(args));

    if !server.env.is_empty() {
        let mut env = InlineTable::new();
        for (k, v) in &server.env {
            env.insert(k.as_str(), v.as_str().into());
        }
        t["env"] = Item::Value(toml_edit::Value::InlineTable(env));
    }

    t
}
