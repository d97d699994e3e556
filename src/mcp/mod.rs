// ============================================================================
// MCP Module - server model, validation and per-platform file adapters
// ============================================================================

pub mod env;
pub mod server;
pub mod sync;
mod toml_convert;
pub mod validation;

pub use env::{expand_env_vars, expand_env_vars_with, referenced_vars, Expansion};
pub use server::{HttpServer, McpServer, ServerKind, ServerMap, StdioServer};
pub use sync::{
    all_platforms, ClaudeAdapter, ClineAdapter, CodexAdapter, GeminiAdapter, KiloAdapter,
    PlatformAdapter, PlatformLocation, RooAdapter, SaveSummary,
};
pub use validation::{
    has_blocking_errors, resolve_command, validate_command_exists, validate_config,
    validate_server, validate_url, Severity, ValidationIssue,
};
