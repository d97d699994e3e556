use std::path::{Path, PathBuf};

use crate::config::McpxPaths;
use crate::error::AppError;
use crate::mcp::server::ServerMap;

use super::json_file::{load_servers, save_servers};
use super::{JsonDialect, PlatformAdapter, PlatformLocation, SaveSummary};

/// Project-scoped server file written at the project root.
pub const CLAUDE_PROJECT_FILE: &str = ".mcp.json";

/// Claude Code: `mcpServers` in `~/.claude.json`.
///
/// The file also holds per-project state (`projects`, history, auth); only
/// the top-level server map is touched.
#[derive(Debug, Clone)]
pub struct ClaudeAdapter {
    location: PlatformLocation,
}

impl ClaudeAdapter {
    pub fn new(paths: &McpxPaths) -> Self {
        Self {
            location: PlatformLocation::new(
                paths.home.join(".claude.json"),
                paths.home.join(".claude"),
            ),
        }
    }

    pub fn with_path(file: impl Into<PathBuf>) -> Self {
        Self {
            location: PlatformLocation::from_file(file),
        }
    }
}

impl PlatformAdapter for ClaudeAdapter {
    fn name(&self) -> &str {
        "Claude Code"
    }

    fn backup_prefix(&self) -> &str {
        "claude"
    }

    fn config_path(&self) -> Option<PathBuf> {
        self.location.config_path()
    }

    fn load(&self) -> Result<ServerMap, AppError> {
        load_servers(&self.location.file, &JsonDialect::CLAUDE)
    }

    fn save(&self, servers: &ServerMap) -> Result<SaveSummary, AppError> {
        save_servers(&self.location.file, &JsonDialect::CLAUDE, servers)
    }

    fn save_project(&self, servers: &ServerMap, project_dir: &Path) -> Result<PathBuf, AppError> {
        let path = project_dir.join(CLAUDE_PROJECT_FILE);
        save_servers(&path, &JsonDialect::CLAUDE, servers)?;
        Ok(path)
    }
}
