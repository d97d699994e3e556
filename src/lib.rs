//! Keep MCP server definitions in sync across the developer tools that
//! consume them.
//!
//! One canonical list lives in `~/.mcpx/config.json`. [`SyncService`] pushes
//! it to every installed tool, merging with whatever servers the user added
//! there by hand.

pub mod app_config;
pub mod backup;
pub mod config;
mod error;
pub mod mcp;
pub mod services;

pub use app_config::{
    add_server_to_config, load_project_selection, remove_server_from_config,
    save_project_selection, select_servers, Config, ProjectSelection, CONFIG_VERSION,
};
pub use backup::{cleanup_old_backups, create_backup, create_backup_with_prefix, list_backups};
pub use config::McpxPaths;
pub use error::AppError;
pub use mcp::{
    all_platforms, expand_env_vars, validate_config, validate_server, HttpServer, McpServer,
    PlatformAdapter, SaveSummary, ServerMap, Severity, StdioServer, ValidationIssue,
};
pub use services::{
    check_server, check_server_blocking, check_servers, merge_servers, ExitStatus, HealthStatus,
    SyncReport, SyncService,
};
