use std::path::PathBuf;

use crate::config::McpxPaths;
use crate::error::AppError;
use crate::mcp::server::ServerMap;

use super::json_file::{load_servers, save_servers};
use super::{vscode, JsonDialect, PlatformAdapter, PlatformLocation, SaveSummary};

const EXTENSION_ID: &str = "saoudrizwan.claude-dev";
const SETTINGS_FILES: [&str; 1] = ["cline_mcp_settings.json"];

/// Cline VS Code extension.
#[derive(Debug, Clone)]
pub struct ClineAdapter {
    location: PlatformLocation,
}

impl ClineAdapter {
    pub fn new(paths: &McpxPaths) -> Self {
        Self {
            location: vscode::locate(&paths.vscode_base, EXTENSION_ID, &SETTINGS_FILES),
        }
    }

    pub fn with_path(file: impl Into<PathBuf>) -> Self {
        Self {
            location: PlatformLocation::from_file(file),
        }
    }
}

impl PlatformAdapter for ClineAdapter {
    fn name(&self) -> &str {
        "Cline"
    }

    fn backup_prefix(&self) -> &str {
        "cline"
    }

    fn config_path(&self) -> Option<PathBuf> {
        self.location.config_path()
    }

    fn load(&self) -> Result<ServerMap, AppError> {
        load_servers(&self.location.file, &JsonDialect::VSCODE_EXTENSION)
    }

    fn save(&self, servers: &ServerMap) -> Result<SaveSummary, AppError> {
        save_servers(&self.location.file, &JsonDialect::VSCODE_EXTENSION, servers)
    }
}
