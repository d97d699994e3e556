use std::fmt::Display;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Crate-wide error type.
///
/// Configuration and validation failures are fatal for a sync run; every
/// other variant is caught at the platform boundary and turned into a report
/// entry by the sync service.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    Config(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("I/O error at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{context}: {source}")]
    IoContext {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid JSON in {path}: {source}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to serialize JSON: {source}")]
    JsonSerialize {
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid TOML in {path}: {message}")]
    Toml { path: String, message: String },

    #[error("{0}")]
    McpValidation(String),

    #[error("{platform} doesn't support project-level MCP configs")]
    ProjectConfigUnsupported { platform: String },

    #[error("source file not found: {}", .0.display())]
    BackupSourceMissing(PathBuf),

    #[error("server '{0}' already exists in config")]
    ServerExists(String),

    #[error("unable to determine the user's home directory")]
    HomeDirUnavailable,
}

impl AppError {
    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().display().to_string(),
            source,
        }
    }

    pub fn json(path: impl AsRef<Path>, source: serde_json::Error) -> Self {
        Self::Json {
            path: path.as_ref().display().to_string(),
            source,
        }
    }

    pub fn toml(path: impl AsRef<Path>, message: impl Display) -> Self {
        Self::Toml {
            path: path.as_ref().display().to_string(),
            message: message.to_string(),
        }
    }

    /// True for the expected "no project-level config" signal, which callers
    /// report as skipped rather than failed.
    pub fn is_project_unsupported(&self) -> bool {
        matches!(self, Self::ProjectConfigUnsupported { .. })
    }
}
