// ============================================================================
// Platform adapters: one per tool that reads MCP server definitions
// ============================================================================

mod claude;
mod cline;
mod codex;
mod gemini;
mod json_file;
mod kilo;
mod roo;
mod vscode;

pub use claude::ClaudeAdapter;
pub use cline::ClineAdapter;
pub use codex::CodexAdapter;
pub use gemini::GeminiAdapter;
pub use json_file::JsonDialect;
pub use kilo::KiloAdapter;
pub use roo::RooAdapter;

use std::path::{Path, PathBuf};

use crate::config::McpxPaths;
use crate::error::AppError;

use super::server::ServerMap;

/// Outcome of writing one platform file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SaveSummary {
    /// Servers written to the file.
    pub written: usize,
    /// Servers left out because the format cannot express them.
    pub dropped: Vec<String>,
}

/// Read/write access to one tool's MCP server section.
pub trait PlatformAdapter: Send + Sync {
    /// Display name, used in reports.
    fn name(&self) -> &str;

    /// Stable key for backup file names.
    fn backup_prefix(&self) -> &str;

    /// `None` when the tool does not appear to be installed.
    fn config_path(&self) -> Option<PathBuf>;

    /// Servers currently on disk. Entries that fail to decode are skipped.
    fn load(&self) -> Result<ServerMap, AppError>;

    /// Replace the server section, keeping everything else in the file.
    fn save(&self, servers: &ServerMap) -> Result<SaveSummary, AppError>;

    /// Write a project-scoped config under `project_dir`.
    fn save_project(&self, servers: &ServerMap, project_dir: &Path) -> Result<PathBuf, AppError> {
        let _ = (servers, project_dir);
        Err(AppError::ProjectConfigUnsupported {
            platform: self.name().to_string(),
        })
    }
}

/// Where a tool keeps its config, and the directory that shows it is
/// installed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformLocation {
    pub file: PathBuf,
    pub install_dir: PathBuf,
}

impl PlatformLocation {
    pub fn new(file: PathBuf, install_dir: PathBuf) -> Self {
        Self { file, install_dir }
    }

    /// A bare file path; its parent directory serves as the install marker.
    pub fn from_file(file: impl Into<PathBuf>) -> Self {
        let file = file.into();
        let install_dir = file
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        Self { file, install_dir }
    }

    pub fn config_path(&self) -> Option<PathBuf> {
        if self.file.exists() || self.install_dir.is_dir() {
            Some(self.file.clone())
        } else {
            None
        }
    }
}

/// Every supported platform, in sync order.
pub fn all_platforms(paths: &McpxPaths) -> Vec<Box<dyn PlatformAdapter>> {
    vec![
        Box::new(ClaudeAdapter::new(paths)),
        Box::new(GeminiAdapter::new(paths)),
        Box::new(CodexAdapter::new(paths)),
        Box::new(ClineAdapter::new(paths)),
        Box::new(RooAdapter::new(paths)),
        Box::new(KiloAdapter::new(paths)),
    ]
}
