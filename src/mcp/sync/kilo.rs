use std::path::{Path, PathBuf};

use crate::config::McpxPaths;
use crate::error::AppError;
use crate::mcp::server::ServerMap;

use super::json_file::{load_servers, save_servers};
use super::{vscode, JsonDialect, PlatformAdapter, PlatformLocation, SaveSummary};

const EXTENSION_ID: &str = "kilocode.kilocode";
const SETTINGS_FILES: [&str; 1] = ["mcp_settings.json"];

/// Kilo Code VS Code extension. Project servers go to `.kilocode/mcp.json`.
#[derive(Debug, Clone)]
pub struct KiloAdapter {
    location: PlatformLocation,
}

impl KiloAdapter {
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

impl PlatformAdapter for KiloAdapter {
    fn name(&self) -> &str {
        "Kilo Code"
    }

    fn backup_prefix(&self) -> &str {
        "kilo"
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

    fn save_project(&self, servers: &ServerMap, project_dir: &Path) -> Result<PathBuf, AppError> {
        let path = project_dir.join(".kilocode").join("mcp.json");
        save_servers(&path, &JsonDialect::VSCODE_EXTENSION, servers)?;
        Ok(path)
    }
}
