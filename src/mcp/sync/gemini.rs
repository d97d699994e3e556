use std::path::PathBuf;

use crate::config::McpxPaths;
use crate::error::AppError;
use crate::mcp::server::ServerMap;

use super::json_file::{load_servers, save_servers};
use super::{JsonDialect, PlatformAdapter, PlatformLocation, SaveSummary};

/// Gemini CLI: `mcpServers` in `~/.gemini/settings.json`.
///
/// Gemini infers the transport from the field names, so entries carry no
/// `type` and HTTP endpoints are written as `httpUrl`.
#[derive(Debug, Clone)]
pub struct GeminiAdapter {
    location: PlatformLocation,
}

impl GeminiAdapter {
    pub fn new(paths: &McpxPaths) -> Self {
        let dir = paths.home.join(".gemini");
        Self {
            location: PlatformLocation::new(dir.join("settings.json"), dir),
        }
    }

    pub fn with_path(file: impl Into<PathBuf>) -> Self {
        Self {
            location: PlatformLocation::from_file(file),
        }
    }
}

impl PlatformAdapter for GeminiAdapter {
    fn name(&self) -> &str {
        "Gemini CLI"
    }

    fn backup_prefix(&self) -> &str {
        "gemini"
    }

    fn config_path(&self) -> Option<PathBuf> {
        self.location.config_path()
    }

    fn load(&self) -> Result<ServerMap, AppError> {
        load_servers(&self.location.file, &JsonDialect::GEMINI)
    }

    fn save(&self, servers: &ServerMap) -> Result<SaveSummary, AppError> {
        save_servers(&self.location.file, &JsonDialect::GEMINI, servers)
    }
}
