use serde::Serialize;
use serde_json::{Map, Value};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::AppError;

/// Name of the mcpx directory inside the user's home.
pub const MCPX_DIR_NAME: &str = ".mcpx";

/// Every filesystem location mcpx touches, resolved once and passed down.
///
/// Adapters, the backup manager and the sync service all take this struct
/// instead of asking for the home directory themselves, so a test can point
/// the whole system at a temporary directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct McpxPaths {
    pub home: PathBuf,
    /// `~/.mcpx`, or `$MCPX_HOME`
    pub mcpx_dir: PathBuf,
    /// `~/.codex`, or `$CODEX_HOME`
    pub codex_home: PathBuf,
    /// Parent of the VS Code user-data directories (`Code/`, `Code - Insiders/`)
    pub vscode_base: PathBuf,
}

impl McpxPaths {
    /// Resolve paths for the current user, honouring `MCPX_HOME`, `CODEX_HOME`
    /// and (on Windows) `APPDATA`.
    pub fn detect() -> Result<Self, AppError> {
        let home = dirs::home_dir().ok_or(AppError::HomeDirUnavailable)?;
        let mut paths = Self::from_home(&home);

        if let Some(dir) = env_dir("MCPX_HOME") {
            paths.mcpx_dir = dir;
        }
        if let Some(dir) = env_dir("CODEX_HOME") {
            paths.codex_home = dir;
        }
        if cfg!(windows) {
            if let Some(dir) = env_dir("APPDATA") {
                paths.vscode_base = dir;
            }
        }
        Ok(paths)
    }

    /// Derive every location from a single home directory, ignoring the
    /// environment.
    pub fn from_home(home: impl Into<PathBuf>) -> Self {
        let home = home.into();
        Self {
            mcpx_dir: home.join(MCPX_DIR_NAME),
            codex_home: home.join(".codex"),
            vscode_base: default_vscode_base(&home),
            home,
        }
    }

    /// Canonical config file (`~/.mcpx/config.json`)
    pub fn config_file(&self) -> PathBuf {
        self.mcpx_dir.join("config.json")
    }

    /// Backup directory (`~/.mcpx/backups`)
    pub fn backup_dir(&self) -> PathBuf {
        self.mcpx_dir.join("backups")
    }

    /// Create the mcpx directory if missing.
    pub fn ensure_config_dir(&self) -> Result<&Path, AppError> {
        fs::create_dir_all(&self.mcpx_dir).map_err(|e| AppError::io(&self.mcpx_dir, e))?;
        Ok(&self.mcpx_dir)
    }
}

fn default_vscode_base(home: &Path) -> PathBuf {
    if cfg!(target_os = "macos") {
        home.join("Library").join("Application Support")
    } else if cfg!(windows) {
        home.join("AppData").join("Roaming")
    } else {
        home.join(".config")
    }
}

fn env_dir(key: &str) -> Option<PathBuf> {
    std::env::var_os(key)
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
}

/// Read a JSON document, returning an empty object when the file is absent
/// or blank.
pub fn read_json_value(path: &Path) -> Result<Value, AppError> {
    if !path.exists() {
        return Ok(Value::Object(Map::new()));
    }
    let content = fs::read_to_string(path).map_err(|e| AppError::io(path, e))?;
    if content.trim().is_empty() {
        return Ok(Value::Object(Map::new()));
    }
    serde_json::from_str(&content).map_err(|e| AppError::json(path, e))
}

/// Write a JSON document atomically: 2-space indentation, keys sorted,
/// trailing newline.
pub fn write_json_value(path: &Path, value: &Value) -> Result<(), AppError> {
    let sorted = sort_keys(value.clone());
    write_json_file(path, &sorted)
}

/// Serialize `data` as pretty JSON (field order as declared) and write it
/// atomically with a trailing newline.
pub fn write_json_file<T: Serialize>(path: &Path, data: &T) -> Result<(), AppError> {
    let mut json =
        serde_json::to_string_pretty(data).map_err(|e| AppError::JsonSerialize { source: e })?;
    json.push('\n');
    atomic_write(path, json.as_bytes())
}

/// Atomic write for TOML and other plain text.
pub fn write_text_file(path: &Path, data: &str) -> Result<(), AppError> {
    atomic_write(path, data.as_bytes())
}

/// Rebuild every object with its keys in sorted order.
///
/// serde_json keeps insertion order whenever `preserve_order` is enabled
/// anywhere in the dependency graph, so sorting is done explicitly.
pub fn sort_keys(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(String, Value)> = map.into_iter().collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            Value::Object(
                entries
                    .into_iter()
                    .map(|(k, v)| (k, sort_keys(v)))
                    .collect(),
            )
        }
        Value::Array(items) => Value::Array(items.into_iter().map(sort_keys).collect()),
        other => other,
    }
}

/// Write to a sibling temp file, then rename over the target so readers never
/// see a half-written file. Existing permissions are carried over.
pub fn atomic_write(path: &Path, data: &[u8]) -> Result<(), AppError> {
    let parent = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));
    fs::create_dir_all(&parent).map_err(|e| AppError::io(&parent, e))?;

    let file_name = path
        .file_name()
        .ok_or_else(|| AppError::InvalidInput(format!("invalid file name: {}", path.display())))?
        .to_string_lossy()
        .to_string();
    let ts = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    let tmp = parent.join(format!("{file_name}.tmp.{ts}"));

    {
        let mut f = fs::File::create(&tmp).map_err(|e| AppError::io(&tmp, e))?;
        f.write_all(data).map_err(|e| AppError::io(&tmp, e))?;
        f.flush().map_err(|e| AppError::io(&tmp, e))?;
    }

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        if let Ok(meta) = fs::metadata(path) {
            let perm = meta.permissions().mode();
            let _ = fs::set_permissions(&tmp, fs::Permissions::from_mode(perm));
        }
    }

    #[cfg(windows)]
    {
        // rename fails on Windows when the target exists
        if path.exists() {
            let _ = fs::remove_file(path);
        }
    }

    fs::rename(&tmp, path).map_err(|e| {
        let _ = fs::remove_file(&tmp);
        AppError::IoContext {
            context: format!("atomic replace failed: {} -> {}", tmp.display(), path.display()),
            source: e,
        }
    })
}
