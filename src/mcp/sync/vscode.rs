use std::path::{Path, PathBuf};

use super::PlatformLocation;

/// VS Code user-data directories, searched in order.
const VARIANTS: [&str; 2] = ["Code", "Code - Insiders"];

fn extension_dir(base: &Path, variant: &str, extension_id: &str) -> PathBuf {
    base.join(variant)
        .join("User")
        .join("globalStorage")
        .join(extension_id)
}

/// Locate an extension's settings file under VS Code global storage.
///
/// The first variant with an existing file wins, then the first variant
/// where the extension has a storage directory, then plain `Code` with the
/// first candidate file name.
pub(super) fn locate(base: &Path, extension_id: &str, files: &[&str]) -> PlatformLocation {
    for variant in VARIANTS {
        let settings = extension_dir(base, variant, extension_id).join("settings");
        for file in files {
            let candidate = settings.join(file);
            if candidate.is_file() {
                return PlatformLocation::new(
                    candidate,
                    extension_dir(base, variant, extension_id),
                );
            }
        }
    }

    let primary = files.first().copied().unwrap_or("mcp_settings.json");
    let variant = VARIANTS
        .into_iter()
        .find(|v| extension_dir(base, v, extension_id).is_dir())
        .unwrap_or(VARIANTS[0]);
    let ext_dir = extension_dir(base, variant, extension_id);
    PlatformLocation::new(ext_dir.join("settings").join(primary), ext_dir)
}
