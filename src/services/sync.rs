use std::path::{Path, PathBuf};

use indexmap::IndexMap;

use crate::app_config::{Config, CONFIG_VERSION};
use crate::backup::{create_backup_with_prefix, DEFAULT_BACKUPS_PER_PLATFORM};
use crate::config::McpxPaths;
use crate::error::AppError;
use crate::mcp::{
    all_platforms, validate_config, PlatformAdapter, ServerMap, Severity,
};

/// Process exit status for a sync-style command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitStatus {
    Success = 0,
    Partial = 1,
    ConfigError = 2,
    Fatal = 3,
}

impl ExitStatus {
    pub fn code(self) -> i32 {
        self as i32
    }
}

/// Result of one sync run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub platforms_synced: usize,
    pub platforms_total: usize,
    /// Servers written per attempted platform (0 on failure).
    pub servers_synced: IndexMap<String, usize>,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    /// Set when validation blocked the run before any file was touched.
    pub validation_failed: bool,
}

impl SyncReport {
    fn new(platforms_total: usize) -> Self {
        Self {
            platforms_total,
            ..Self::default()
        }
    }

    fn add_platform_result(&mut self, platform: &str, count: usize) {
        if count > 0 {
            self.platforms_synced += 1;
        }
        self.servers_synced.insert(platform.to_string(), count);
    }

    fn add_error(&mut self, message: String) {
        log::warn!("{message}");
        self.errors.push(message);
    }

    pub fn is_clean(&self) -> bool {
        self.errors.is_empty() && !self.validation_failed
    }

    pub fn exit_status(&self) -> ExitStatus {
        if self.validation_failed {
            ExitStatus::ConfigError
        } else if !self.errors.is_empty() {
            ExitStatus::Partial
        } else {
            ExitStatus::Success
        }
    }

    pub fn exit_code(&self) -> i32 {
        self.exit_status().code()
    }
}

/// Servers found on each platform during first-run discovery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FirstRunReport {
    /// Distinct server names written to the new config.
    pub server_count: usize,
    pub platforms_scanned: IndexMap<String, usize>,
    pub config_path: PathBuf,
}

/// Result of writing project-scoped configs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProjectSyncReport {
    /// Platform name → file written.
    pub synced: IndexMap<String, PathBuf>,
    /// Platforms without project-level support.
    pub skipped: Vec<String>,
    pub errors: Vec<String>,
}

/// Canonical servers plus every on-disk server whose name the canonical set
/// does not use. Canonical entries win on a name clash.
pub fn merge_servers(managed: &ServerMap, existing: &ServerMap) -> ServerMap {
    let mut merged = managed.clone();
    for (name, server) in existing {
        if !managed.contains_key(name) {
            merged.insert(name.clone(), server.clone());
        }
    }
    merged
}

fn sync_one(
    adapter: &dyn PlatformAdapter,
    path: &Path,
    managed: &ServerMap,
    backup_dir: &Path,
) -> Result<(usize, Vec<String>), AppError> {
    if path.exists() {
        create_backup_with_prefix(
            path,
            backup_dir,
            adapter.backup_prefix(),
            DEFAULT_BACKUPS_PER_PLATFORM,
        )?;
    }
    let existing = adapter.load()?;
    let merged = merge_servers(managed, &existing);
    let summary = adapter.save(&merged)?;
    Ok((summary.written, summary.dropped))
}

/// Push `config` to every adapter.
///
/// Validation errors stop the run before any platform is touched. After
/// that each platform is handled on its own: a failure is recorded and the
/// next platform is still attempted.
pub fn sync_all(
    config: &Config,
    adapters: &[Box<dyn PlatformAdapter>],
    backup_dir: &Path,
) -> SyncReport {
    let mut report = SyncReport::new(adapters.len());

    let issues = validate_config(config);
    for issue in &issues {
        match issue.severity {
            Severity::Error => report.add_error(issue.to_string()),
            Severity::Warning => report.warnings.push(issue.to_string()),
        }
    }
    if !report.errors.is_empty() {
        report.validation_failed = true;
        log::error!(
            "Config validation failed with {} error(s); nothing synced",
            report.errors.len()
        );
        return report;
    }

    for adapter in adapters {
        let name = adapter.name();
        let Some(path) = adapter.config_path() else {
            report.add_error(format!(
                "{name}: config path not found (platform not installed?)"
            ));
            report.add_platform_result(name, 0);
            continue;
        };

        match sync_one(adapter.as_ref(), &path, &config.servers, backup_dir) {
            Ok((written, dropped)) => {
                for server in dropped {
                    report.warnings.push(format!(
                        "{name}: server '{server}' skipped (transport not supported)"
                    ));
                }
                log::info!("{name}: synced {written} server(s) to {}", path.display());
                report.add_platform_result(name, written);
            }
            Err(e) => {
                report.add_error(format!("{name}: {e}"));
                report.add_platform_result(name, 0);
            }
        }
    }

    report
}

/// Build the canonical config from whatever the installed tools already
/// have. Later platforms win on a name clash. Refuses to overwrite an
/// existing config.
pub fn first_run_init(
    paths: &McpxPaths,
    adapters: &[Box<dyn PlatformAdapter>],
) -> Result<FirstRunReport, AppError> {
    let config_path = paths.config_file();
    if config_path.exists() {
        return Err(AppError::Config(format!(
            "Config already exists: {}",
            config_path.display()
        )));
    }
    paths.ensure_config_dir()?;

    let mut discovered = ServerMap::new();
    let mut platforms_scanned = IndexMap::new();
    for adapter in adapters {
        if adapter.config_path().is_none() {
            continue;
        }
        match adapter.load() {
            Ok(servers) => {
                if servers.is_empty() {
                    continue;
                }
                platforms_scanned.insert(adapter.name().to_string(), servers.len());
                discovered.extend(servers);
            }
            Err(e) => log::warn!("Skipping {} during discovery: {e}", adapter.name()),
        }
    }

    let config = Config {
        version: CONFIG_VERSION.to_string(),
        servers: discovered,
    };
    config.save(&config_path)?;
    log::info!(
        "Created {} with {} server(s)",
        config_path.display(),
        config.servers.len()
    );

    Ok(FirstRunReport {
        server_count: config.servers.len(),
        platforms_scanned,
        config_path,
    })
}

/// Write `servers` into each platform's project-level file under
/// `project_dir`.
pub fn sync_project(
    servers: &ServerMap,
    project_dir: &Path,
    adapters: &[Box<dyn PlatformAdapter>],
) -> ProjectSyncReport {
    let mut report = ProjectSyncReport::default();
    for adapter in adapters {
        match adapter.save_project(servers, project_dir) {
            Ok(path) => {
                report.synced.insert(adapter.name().to_string(), path);
            }
            Err(e) if e.is_project_unsupported() => {
                log::debug!("{e}");
                report.skipped.push(adapter.name().to_string());
            }
            Err(e) => report.errors.push(format!("{}: {e}", adapter.name())),
        }
    }
    report
}

/// `Some(remaining)` when the server was present and has been removed.
fn remove_one(
    adapter: &dyn PlatformAdapter,
    path: &Path,
    name: &str,
    backup_dir: &Path,
) -> Result<Option<usize>, AppError> {
    let mut servers = adapter.load()?;
    if servers.shift_remove(name).is_none() {
        return Ok(None);
    }
    if path.exists() {
        create_backup_with_prefix(
            path,
            backup_dir,
            adapter.backup_prefix(),
            DEFAULT_BACKUPS_PER_PLATFORM,
        )?;
    }
    Ok(Some(adapter.save(&servers)?.written))
}

/// Delete server `name` from every installed platform file that has it.
///
/// Sync keeps orphans, so a server dropped from the canonical config stays
/// on disk until it is removed here. `servers_synced` holds the number of
/// servers left in each touched file.
pub fn remove_from_platforms(
    name: &str,
    adapters: &[Box<dyn PlatformAdapter>],
    backup_dir: &Path,
) -> SyncReport {
    let mut report = SyncReport::new(adapters.len());
    for adapter in adapters {
        let platform = adapter.name();
        let Some(path) = adapter.config_path() else {
            continue;
        };
        match remove_one(adapter.as_ref(), &path, name, backup_dir) {
            Ok(Some(remaining)) => {
                log::info!("{platform}: removed server '{name}'");
                report.platforms_synced += 1;
                report.servers_synced.insert(platform.to_string(), remaining);
            }
            Ok(None) => {}
            Err(e) => report.add_error(format!("{platform}: {e}")),
        }
    }
    report
}

/// Sync operations bound to one set of paths and adapters.
pub struct SyncService {
    paths: McpxPaths,
    adapters: Vec<Box<dyn PlatformAdapter>>,
}

impl SyncService {
    /// All supported platforms at their default locations.
    pub fn new(paths: McpxPaths) -> Self {
        let adapters = all_platforms(&paths);
        Self { paths, adapters }
    }

    pub fn with_adapters(paths: McpxPaths, adapters: Vec<Box<dyn PlatformAdapter>>) -> Self {
        Self { paths, adapters }
    }

    pub fn paths(&self) -> &McpxPaths {
        &self.paths
    }

    pub fn adapters(&self) -> &[Box<dyn PlatformAdapter>] {
        &self.adapters
    }

    /// Load the canonical config (placeholders expanded).
    pub fn load_config(&self) -> Result<Config, AppError> {
        Config::load(&self.paths.config_file())
    }

    pub fn sync_all(&self, config: &Config) -> SyncReport {
        sync_all(config, &self.adapters, &self.paths.backup_dir())
    }

    pub fn first_run_init(&self) -> Result<FirstRunReport, AppError> {
        first_run_init(&self.paths, &self.adapters)
    }

    pub fn sync_project(&self, servers: &ServerMap, project_dir: &Path) -> ProjectSyncReport {
        sync_project(servers, project_dir, &self.adapters)
    }

    pub fn remove_from_platforms(&self, name: &str) -> SyncReport {
        remove_from_platforms(name, &self.adapters, &self.paths.backup_dir())
    }
}
