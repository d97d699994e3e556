use std::fs;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::{read_json_value, write_json_file};
use crate::error::AppError;
use crate::mcp::{McpServer, ServerMap};

/// Version string written into newly created config files.
pub const CONFIG_VERSION: &str = "1.0";

/// Per-project selection file name.
pub const PROJECT_SELECTION_FILE: &str = ".mcpx.json";

/// The canonical server list (`~/.mcpx/config.json`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub version: String,
    pub servers: ServerMap,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION.to_string(),
            servers: ServerMap::new(),
        }
    }
}

#[derive(Deserialize)]
struct RawFile {
    mcpx: Option<RawHeader>,
    servers: Option<IndexMap<String, Value>>,
}

#[derive(Deserialize)]
struct RawHeader {
    version: Option<Value>,
}

#[derive(Serialize)]
struct FileOut<'a> {
    mcpx: HeaderOut<'a>,
    servers: IndexMap<&'a str, crate::mcp::server::SpecRef<'a>>,
}

#[derive(Serialize)]
struct HeaderOut<'a> {
    version: &'a str,
}

impl Config {
    /// Load the config and expand `${VAR}` placeholders in every server.
    pub fn load(path: &Path) -> Result<Self, AppError> {
        let raw = Self::read_raw(path)?;
        Ok(raw.expanded())
    }

    /// Load the config exactly as written, placeholders intact.
    pub fn read_raw(path: &Path) -> Result<Self, AppError> {
        if !path.exists() {
            return Err(AppError::Config(format!(
                "Config file not found: {}",
                path.display()
            )));
        }
        let content = fs::read_to_string(path).map_err(|e| AppError::io(path, e))?;
        Self::from_json(&content).map_err(|e| match e {
            AppError::Config(msg) => AppError::Config(format!("{}: {msg}", path.display())),
            other => other,
        })
    }

    /// Parse config text. Fails on the first structural problem.
    pub fn from_json(content: &str) -> Result<Self, AppError> {
        let raw: RawFile = serde_json::from_str(content)
            .map_err(|e| AppError::Config(format!("Invalid config JSON: {e}")))?;

        let header = raw
            .mcpx
            .ok_or_else(|| AppError::Config("Missing required 'mcpx' section in config".into()))?;
        let version = match header.version {
            Some(Value::String(s)) => s,
            Some(Value::Null) | None => {
                return Err(AppError::Config(
                    "Missing required 'version' field in 'mcpx' section".into(),
                ))
            }
            Some(other) => other.to_string(),
        };
        let entries = raw
            .servers
            .ok_or_else(|| AppError::Config("Missing required 'servers' section in config".into()))?;

        let mut servers = ServerMap::new();
        for (name, spec) in entries {
            if spec.get("type").map_or(true, Value::is_null) {
                return Err(AppError::Config(format!(
                    "Server '{name}' missing required 'type' field"
                )));
            }
            let server = McpServer::from_json_spec(&name, &spec).map_err(|e| match e {
                AppError::McpValidation(msg) => AppError::Config(msg),
                other => other,
            })?;
            servers.insert(name, server);
        }

        Ok(Self { version, servers })
    }

    /// A copy with placeholders expanded from the process environment.
    pub fn expanded(&self) -> Self {
        Self {
            version: self.version.clone(),
            servers: self
                .servers
                .iter()
                .map(|(name, server)| (name.clone(), server.expanded()))
                .collect(),
        }
    }

    /// Write the config, servers in insertion order.
    pub fn save(&self, path: &Path) -> Result<(), AppError> {
        let out = FileOut {
            mcpx: HeaderOut {
                version: &self.version,
            },
            servers: self
                .servers
                .iter()
                .map(|(name, server)| (name.as_str(), server.spec_ref()))
                .collect(),
        };
        write_json_file(path, &out)
    }
}

/// Add `server` to the config file at `path`, creating the file if needed.
///
/// Works on the unexpanded file so secrets pulled from the environment are
/// never written back. Returns whether an existing entry was replaced; with
/// `replace == false` an existing name is an error instead.
pub fn add_server_to_config(
    path: &Path,
    server: McpServer,
    replace: bool,
) -> Result<bool, AppError> {
    let mut config = if path.exists() {
        Config::read_raw(path)?
    } else {
        Config::default()
    };

    let name = server.name().to_string();
    let existed = config.servers.contains_key(&name);
    if existed && !replace {
        return Err(AppError::ServerExists(name));
    }
    config.servers.insert(name.clone(), server.with_name(name.as_str()));
    config.save(path)?;

    if existed {
        log::info!("Replaced server '{name}' in {}", path.display());
    } else {
        log::info!("Added server '{name}' to {}", path.display());
    }
    Ok(existed)
}

/// Remove a server by name. Returns `false` when it was not present.
pub fn remove_server_from_config(path: &Path, name: &str) -> Result<bool, AppError> {
    let mut config = Config::read_raw(path)?;
    if config.servers.shift_remove(name).is_none() {
        return Ok(false);
    }
    config.save(path)?;
    log::info!("Removed server '{name}' from {}", path.display());
    Ok(true)
}

#[derive(Debug, Serialize, Deserialize)]
struct ProjectSelectionFile {
    mcpx: ProjectSelection,
}

/// Servers enabled for one project, stored in `.mcpx.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectSelection {
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default)]
    pub servers: Vec<String>,
}

fn default_version() -> String {
    CONFIG_VERSION.to_string()
}

pub fn project_selection_path(project_dir: &Path) -> PathBuf {
    project_dir.join(PROJECT_SELECTION_FILE)
}

/// Read `.mcpx.json`. `None` when the file is absent or unreadable.
pub fn load_project_selection(project_dir: &Path) -> Option<ProjectSelection> {
    let path = project_selection_path(project_dir);
    if !path.exists() {
        return None;
    }
    let value = match read_json_value(&path) {
        Ok(v) => v,
        Err(e) => {
            log::warn!("Ignoring unreadable project selection: {e}");
            return None;
        }
    };
    match serde_json::from_value::<ProjectSelectionFile>(value) {
        Ok(file) => Some(file.mcpx),
        Err(e) => {
            log::warn!("Ignoring malformed {}: {e}", path.display());
            None
        }
    }
}

pub fn save_project_selection(project_dir: &Path, names: &[String]) -> Result<PathBuf, AppError> {
    let path = project_selection_path(project_dir);
    let file = ProjectSelectionFile {
        mcpx: ProjectSelection {
            version: CONFIG_VERSION.to_string(),
            servers: names.to_vec(),
        },
    };
    write_json_file(&path, &file)?;
    Ok(path)
}

/// The servers of `config` named in `names`, in selection order. Unknown
/// names are skipped.
pub fn select_servers(config: &Config, names: &[String]) -> ServerMap {
    let mut selected = ServerMap::new();
    for name in names {
        match config.servers.get(name) {
            Some(server) => {
                selected.insert(name.clone(), server.clone());
            }
            None => log::warn!("Project selects unknown server '{name}', skipping"),
        }
    }
    selected
}
