//! Where the `k8sh` configuration file lives
//!
//! `K8S_HANDLER_CONFIG` names the file outright; otherwise it is `config.yaml` in
//! the platform config directory for `k8sh` (`~/.config/k8sh` on Linux).

use directories::ProjectDirs;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// Environment variable holding an explicit config file path
pub const CONFIG_ENV: &str = "K8S_HANDLER_CONFIG";

const CONFIG_FILE: &str = "config.yaml";

/// Platform config directory for `k8sh`, if a home directory is known
pub fn config_dir() -> Option<PathBuf> {
    ProjectDirs::from("", "", "k8sh").map(|dirs| dirs.config_dir().to_path_buf())
}

/// Path of the configuration file
pub fn root_config_path() -> PathBuf {
    resolve_config_path(std::env::var_os(CONFIG_ENV), config_dir())
}

fn resolve_config_path(explicit: Option<OsString>, dir: Option<PathBuf>) -> PathBuf {
    match explicit.filter(|path| !path.is_empty()) {
        Some(path) => PathBuf::from(path),
        None => dir.unwrap_or_default().join(CONFIG_FILE),
    }
}

/// Ensure a directory exists, creating it if necessary
pub fn ensure_dir(path: &Path) -> std::io::Result<()> {
    if !path.exists() {
        std::fs::create_dir_all(path)?;
    }
    Ok(())
}
