use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::AppError;

/// Backups kept per prefix unless the caller asks otherwise.
pub const DEFAULT_BACKUPS_PER_PLATFORM: usize = 5;

const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// `{prefix}_{YYYYMMDD}_{HHMMSS}.{ext}`
static BACKUP_NAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(.+?)_(\d{8}_\d{6})\.(.+)$").unwrap_or_else(|e| panic!("backup regex: {e}"))
});

/// A backup file recognised in the backup directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupEntry {
    pub prefix: String,
    /// `YYYYMMDD_HHMMSS`; sorts chronologically as a string.
    pub timestamp: String,
    pub path: PathBuf,
}

/// Prefix derived from a file name: leading dots are skipped, then
/// everything up to the first `.` or `_`.
///
/// `.claude.json` → `claude`, `cline_mcp_settings.json` → `cline`.
pub fn backup_prefix_for(source: &Path) -> String {
    let name = source
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    let trimmed = name.trim_start_matches('.');
    let prefix = trimmed
        .split(['.', '_'])
        .next()
        .filter(|p| !p.is_empty())
        .unwrap_or("backup");
    prefix.to_string()
}

fn backup_extension(source: &Path) -> String {
    source
        .extension()
        .map(|e| e.to_string_lossy().to_string())
        .filter(|e| !e.is_empty())
        .unwrap_or_else(|| "bak".to_string())
}

/// Copy `source` into `backup_dir` under a timestamped name, then prune old
/// backups for the same prefix.
pub fn create_backup(source: &Path, backup_dir: &Path) -> Result<PathBuf, AppError> {
    create_backup_with_prefix(
        source,
        backup_dir,
        &backup_prefix_for(source),
        DEFAULT_BACKUPS_PER_PLATFORM,
    )
}

/// [`create_backup`] with an explicit prefix and retention count.
pub fn create_backup_with_prefix(
    source: &Path,
    backup_dir: &Path,
    prefix: &str,
    keep: usize,
) -> Result<PathBuf, AppError> {
    if !source.is_file() {
        return Err(AppError::BackupSourceMissing(source.to_path_buf()));
    }
    fs::create_dir_all(backup_dir).map_err(|e| AppError::io(backup_dir, e))?;

    let timestamp = chrono::Local::now().format(TIMESTAMP_FORMAT);
    let backup_path = backup_dir.join(format!(
        "{prefix}_{timestamp}.{}",
        backup_extension(source)
    ));

    // Same-second backups share a name; the earliest snapshot is the one kept.
    if backup_path.exists() {
        log::info!(
            "Backup {} already exists, keeping the earlier snapshot of {}",
            backup_path.display(),
            source.display()
        );
        return Ok(backup_path);
    }

    fs::copy(source, &backup_path).map_err(|e| AppError::IoContext {
        context: format!(
            "failed to back up {} to {}",
            source.display(),
            backup_path.display()
        ),
        source: e,
    })?;
    preserve_mtime(source, &backup_path);
    log::info!("Backed up {} to {}", source.display(), backup_path.display());

    cleanup_old_backups(backup_dir, keep);
    Ok(backup_path)
}

fn preserve_mtime(source: &Path, target: &Path) {
    let modified = match fs::metadata(source).and_then(|m| m.modified()) {
        Ok(t) => t,
        Err(_) => return,
    };
    let result = fs::OpenOptions::new()
        .write(true)
        .open(target)
        .and_then(|f| f.set_modified(modified));
    if let Err(e) = result {
        log::debug!("Could not copy mtime to {}: {e}", target.display());
    }
}

/// Recognised backups in `backup_dir`, newest first.
pub fn list_backups(backup_dir: &Path) -> Vec<BackupEntry> {
    let Ok(entries) = fs::read_dir(backup_dir) else {
        return Vec::new();
    };

    let mut backups: Vec<BackupEntry> = entries
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().map(|t| t.is_file()).unwrap_or(false))
        .filter_map(|entry| {
            let name = entry.file_name().to_string_lossy().to_string();
            let caps = BACKUP_NAME.captures(&name)?;
            Some(BackupEntry {
                prefix: caps[1].to_string(),
                timestamp: caps[2].to_string(),
                path: entry.path(),
            })
        })
        .collect();
    backups.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then(b.path.cmp(&a.path)));
    backups
}

/// Keep the newest `max_per_platform` backups of every prefix and delete the
/// rest. Files that do not look like backups are never touched. Returns the
/// deleted paths; deletion failures are logged and skipped.
pub fn cleanup_old_backups(backup_dir: &Path, max_per_platform: usize) -> Vec<PathBuf> {
    let mut groups: BTreeMap<String, Vec<BackupEntry>> = BTreeMap::new();
    for backup in list_backups(backup_dir) {
        groups.entry(backup.prefix.clone()).or_default().push(backup);
    }

    let mut deleted = Vec::new();
    for (prefix, backups) in groups {
        for old in backups.into_iter().skip(max_per_platform) {
            match fs::remove_file(&old.path) {
                Ok(()) => {
                    log::debug!("Deleted old {prefix} backup {}", old.path.display());
                    deleted.push(old.path);
                }
                Err(e) => {
                    log::warn!("Failed to delete old backup {}: {e}", old.path.display());
                }
            }
        }
    }
    deleted
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn prefix_rules() {
        assert_eq!(backup_prefix_for(Path::new("/h/.claude.json")), "claude");
        assert_eq!(backup_prefix_for(Path::new("settings.json")), "settings");
        assert_eq!(
            backup_prefix_for(Path::new("cline_mcp_settings.json")),
            "cline"
        );
        assert_eq!(backup_prefix_for(Path::new("config.toml")), "config");
    }

    #[test]
    fn missing_source_is_reported() {
        let dir = TempDir::new().expect("tempdir");
        let err = create_backup(&dir.path().join("nope.json"), &dir.path().join("b"))
            .expect_err("missing source");
        assert!(matches!(err, AppError::BackupSourceMissing(_)));
    }

    #[test]
    fn same_second_backup_keeps_first_snapshot() {
        let dir = TempDir::new().expect("tempdir");
        let source = dir.path().join("settings.json");
        let backups = dir.path().join("backups");

        for attempt in 0..5 {
            let prefix = format!("gemini{attempt}");
            fs::write(&source, "before").expect("seed");
            let first = create_backup_with_prefix(&source, &backups, &prefix, 20).expect("first");
            fs::write(&source, "after").expect("update");
            let second =
                create_backup_with_prefix(&source, &backups, &prefix, 20).expect("second");
            if first == second {
                assert_eq!(fs::read_to_string(&second).expect("read"), "before");
                return;
            }
        }
        panic!("no two backups landed in the same second");
    }

    #[test]
    fn backup_copies_content_with_expected_name() {
        let dir = TempDir::new().expect("tempdir");
        let source = dir.path().join(".claude.json");
        fs::write(&source, "{\"a\": 1}").expect("seed");

        let backup = create_backup(&source, &dir.path().join("backups")).expect("backup");
        let name = backup
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        assert!(BACKUP_NAME.is_match(&name), "bad name: {name}");
        assert!(name.starts_with("claude_") && name.ends_with(".json"));
        assert_eq!(fs::read_to_string(&backup).expect("read"), "{\"a\": 1}");
    }

    #[test]
    fn retention_keeps_newest_per_prefix() {
        let dir = TempDir::new().expect("tempdir");
        for i in 0..8 {
            let name = format!("claude_20260101_00000{i}.json");
            fs::write(dir.path().join(name), "{}").expect("seed");
        }
        for i in 0..2 {
            fs::write(dir.path().join(format!("gemini_20260101_00000{i}.json")), "{}")
                .expect("seed");
        }
        fs::write(dir.path().join("notes.txt"), "keep me").expect("seed");
        fs::create_dir(dir.path().join("claude_20200101_000000.d")).expect("dir");

        let deleted = cleanup_old_backups(dir.path(), 5);
        assert_eq!(deleted.len(), 3);

        let remaining: Vec<_> = list_backups(dir.path())
            .into_iter()
            .filter(|b| b.prefix == "claude")
            .map(|b| b.timestamp)
            .collect();
        assert_eq!(
            remaining,
            vec![
                "20260101_000007",
                "20260101_000006",
                "20260101_000005",
                "20260101_000004",
                "20260101_000003"
            ]
        );
        assert!(dir.path().join("notes.txt").exists());
        assert!(dir.path().join("claude_20200101_000000.d").is_dir());
        assert_eq!(
            list_backups(dir.path())
                .iter()
                .filter(|b| b.prefix == "gemini")
                .count(),
            2
        );
    }
}
