use std::collections::BTreeSet;
use std::fs;
use std::path::PathBuf;

use toml_edit::{DocumentMut, Item, Table};

use crate::config::{write_text_file, McpxPaths};
use crate::error::AppError;
use crate::mcp::server::{McpServer, ServerMap};
use crate::mcp::toml_convert::{stdio_server_to_toml_table, toml_entry_to_server};

use super::{PlatformAdapter, PlatformLocation, SaveSummary};

/// Codex CLI: `[mcp_servers.<name>]` tables in `$CODEX_HOME/config.toml`.
///
/// Only stdio servers are written. Edits go through `toml_edit` so comments
/// and unrelated tables (model, profiles, ...) stay as the user wrote them.
/// Entries found under the legacy `[mcp.servers]` table are read and then
/// removed on the next save.
#[derive(Debug, Clone)]
pub struct CodexAdapter {
    location: PlatformLocation,
}

impl CodexAdapter {
    pub fn new(paths: &McpxPaths) -> Self {
        Self {
            location: PlatformLocation::new(
                paths.codex_home.join("config.toml"),
                paths.codex_home.clone(),
            ),
        }
    }

    pub fn with_path(file: impl Into<PathBuf>) -> Self {
        Self {
            location: PlatformLocation::from_file(file),
        }
    }

    fn read_text(&self) -> Result<String, AppError> {
        let path = &self.location.file;
        if !path.exists() {
            return Ok(String::new());
        }
        fs::read_to_string(path).map_err(|e| AppError::io(path, e))
    }
}

fn load_table(servers: &mut ServerMap, tbl: &toml::Table, source: &str) {
    for (name, entry) in tbl {
        match toml_entry_to_server(name, entry) {
            Ok(server) => {
                servers.insert(name.clone(), server);
            }
            Err(e) => log::warn!("Skipping MCP server '{name}' in {source}: {e}"),
        }
    }
}

impl PlatformAdapter for CodexAdapter {
    fn name(&self) -> &str {
        "Codex CLI"
    }

    fn backup_prefix(&self) -> &str {
        "codex"
    }

    fn config_path(&self) -> Option<PathBuf> {
        self.location.config_path()
    }

    fn load(&self) -> Result<ServerMap, AppError> {
        let path = &self.location.file;
        let text = self.read_text()?;
        if text.trim().is_empty() {
            return Ok(ServerMap::new());
        }
        let root: toml::Table =
            toml::from_str(&text).map_err(|e| AppError::toml(path, e))?;
        let source = path.display().to_string();

        let mut servers = ServerMap::new();
        if let Some(legacy) = root
            .get("mcp")
            .and_then(|v| v.as_table())
            .and_then(|t| t.get("servers"))
            .and_then(|v| v.as_table())
        {
            load_table(&mut servers, legacy, &source);
        }
        if let Some(tbl) = root.get("mcp_servers").and_then(|v| v.as_table()) {
            load_table(&mut servers, tbl, &source);
        }
        Ok(servers)
    }

    fn save(&self, servers: &ServerMap) -> Result<SaveSummary, AppError> {
        let path = &self.location.file;
        let base_text = self.read_text()?;

        // Invalid TOML is an error; the file is left untouched.
        let (mut doc, parsed) = if base_text.trim().is_empty() {
            (DocumentMut::default(), toml::Table::new())
        } else {
            let doc = base_text
                .parse::<DocumentMut>()
                .map_err(|e| AppError::toml(path, e))?;
            let parsed: toml::Table =
                toml::from_str(&base_text).map_err(|e| AppError::toml(path, e))?;
            (doc, parsed)
        };
        let unreadable = unreadable_entries(parsed.get("mcp_servers"));
        let unreadable_legacy = unreadable_entries(
            parsed
                .get("mcp")
                .and_then(|v| v.as_table())
                .and_then(|t| t.get("servers")),
        );

        let previous = doc
            .get("mcp_servers")
            .and_then(Item::as_table)
            .cloned()
            .unwrap_or_default();

        let mut names: Vec<&String> = servers.keys().collect();
        names.sort();

        let mut section = Table::new();
        section.set_implicit(true);
        let mut dropped = Vec::new();
        for name in names {
            match &servers[name.as_str()] {
                McpServer::Stdio(s) => {
                    let base = previous.get(name).and_then(Item::as_table);
                    section[name.as_str()] = Item::Table(stdio_server_to_toml_table(s, base));
                }
                McpServer::Http(_) => {
                    log::info!("Codex CLI cannot express HTTP server '{name}', skipping");
                    dropped.push(name.clone());
                }
            }
        }
        let written = section.len();

        for (name, item) in previous.iter() {
            if !section.contains_key(name) && unreadable.contains(name) {
                log::info!(
                    "Keeping unrecognised MCP server '{name}' in {}",
                    path.display()
                );
                section.insert(name, item.clone());
            }
        }

        if let Some(mcp) = doc.get_mut("mcp").and_then(Item::as_table_like_mut) {
            if let Some(legacy) = mcp.get_mut("servers").and_then(Item::as_table_like_mut) {
                let migrated: Vec<String> = legacy
                    .iter()
                    .map(|(name, _)| name.to_string())
                    .filter(|name| {
                        section.contains_key(name) || !unreadable_legacy.contains(name)
                    })
                    .collect();
                if !migrated.is_empty() {
                    log::warn!(
                        "Migrating legacy [mcp.servers] entries in {} to [mcp_servers]",
                        path.display()
                    );
                }
                for name in &migrated {
                    legacy.remove(name);
                }
            }
            if mcp
                .get("servers")
                .and_then(Item::as_table_like)
                .is_some_and(|t| t.is_empty())
            {
                mcp.remove("servers");
            }
        }
        if doc
            .get("mcp")
            .and_then(Item::as_table_like)
            .is_some_and(|t| t.is_empty())
        {
            doc.as_table_mut().remove("mcp");
        }

        if section.is_empty() {
            doc.as_table_mut().remove("mcp_servers");
        } else {
            doc["mcp_servers"] = Item::Table(section);
        }

        write_text_file(path, &doc.to_string())?;
        log::debug!("Wrote {written} MCP servers to {}", path.display());
        Ok(SaveSummary { written, dropped })
    }
}

/// Names of entries in a server table that do not decode as stdio servers.
fn unreadable_entries(tbl: Option<&toml::Value>) -> BTreeSet<String> {
    let Some(tbl) = tbl.and_then(|v| v.as_table()) else {
        return BTreeSet::new();
    };
    tbl.iter()
        .filter(|(name, entry)| toml_entry_to_server(name, entry).is_err())
        .map(|(name, _)| name.clone())
        .collect()
}
