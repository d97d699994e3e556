use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use mcpx::{AppError, McpServer, McpxPaths, PlatformAdapter, SaveSummary, ServerMap};
use serde_json::Value;
use tempfile::TempDir;

/// Isolated home directory; removed when dropped.
pub fn temp_home() -> (TempDir, McpxPaths) {
    let dir = TempDir::new().expect("create temp home");
    let paths = McpxPaths::from_home(dir.path());
    (dir, paths)
}

/// A stdio command that exists on every platform the tests run on.
pub fn existing_command() -> String {
    std::env::current_exe()
        .expect("current test binary")
        .to_string_lossy()
        .into_owned()
}

pub fn stdio(name: &str) -> McpServer {
    McpServer::stdio(name, existing_command())
}

pub fn http(name: &str) -> McpServer {
    McpServer::http(name, format!("https://{name}.example.com/mcp"))
}

pub fn server_map(servers: impl IntoIterator<Item = McpServer>) -> ServerMap {
    servers
        .into_iter()
        .map(|s| (s.name().to_string(), s))
        .collect()
}

pub fn write_json(path: &Path, value: &Value) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).expect("create parent dir");
    }
    let text = serde_json::to_string_pretty(value).expect("serialize json");
    std::fs::write(path, text).expect("write json");
}

pub fn read_json(path: &Path) -> Value {
    let text = std::fs::read_to_string(path).expect("read json");
    serde_json::from_str(&text).expect("parse json")
}

/// In-memory platform used to drive the sync engine without touching a
/// real tool's file layout.
#[derive(Clone)]
pub struct MemoryAdapter {
    pub name: String,
    pub path: Option<PathBuf>,
    pub servers: Arc<Mutex<ServerMap>>,
    pub saves: Arc<AtomicUsize>,
    pub fail_save: bool,
}

impl MemoryAdapter {
    pub fn new(name: &str, path: Option<PathBuf>) -> Self {
        Self {
            name: name.to_string(),
            path,
            servers: Arc::new(Mutex::new(ServerMap::new())),
            saves: Arc::new(AtomicUsize::new(0)),
            fail_save: false,
        }
    }

    pub fn with_servers(self, servers: ServerMap) -> Self {
        *self.servers.lock().expect("lock servers") = servers;
        self
    }

    pub fn failing(mut self) -> Self {
        self.fail_save = true;
        self
    }

    pub fn snapshot(&self) -> ServerMap {
        self.servers.lock().expect("lock servers").clone()
    }

    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }
}

impl PlatformAdapter for MemoryAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    fn backup_prefix(&self) -> &str {
        "memory"
    }

    fn config_path(&self) -> Option<PathBuf> {
        self.path.clone()
    }

    fn load(&self) -> Result<ServerMap, AppError> {
        Ok(self.snapshot())
    }

    fn save(&self, servers: &ServerMap) -> Result<SaveSummary, AppError> {
        self.saves.fetch_add(1, Ordering::SeqCst);
        if self.fail_save {
            return Err(AppError::InvalidInput("disk full".to_string()));
        }
        *self.servers.lock().expect("lock servers") = servers.clone();
        Ok(SaveSummary {
            written: servers.len(),
            dropped: Vec::new(),
        })
    }
}
