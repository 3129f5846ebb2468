//! Utility functions and helpers

use std::ffi::OsStr;
use std::path::{Path, PathBuf};

/// Environment variable holding extra module search directories
pub const NODE_PATH: &str = "NODE_PATH";

/// Split a platform path list, dropping empty entries
pub fn split_node_paths(value: &OsStr) -> Vec<PathBuf> {
    std::env::split_paths(value)
        .filter(|path| !path.as_os_str().is_empty())
        .collect()
}

/// Module search directories from `NODE_PATH`
pub fn node_paths_from_env() -> Vec<PathBuf> {
    std::env::var_os(NODE_PATH)
        .map(|value| split_node_paths(&value))
        .unwrap_or_default()
}

/// Expand a leading `~` to the home directory
pub fn expand_home(path: &str) -> PathBuf {
    match (path.strip_prefix('~'), dirs::home_dir()) {
        (Some(rest), Some(home)) => home.join(rest.trim_start_matches(['/', '\\'])),
        _ => PathBuf::from(path),
    }
}

pub(crate) async fn is_file(path: &Path) -> bool {
    tokio::fs::metadata(path)
        .await
        .map(|meta| meta.is_file())
        .unwrap_or(false)
}

/// Format duration as human-readable string
pub fn format_duration(duration: std::time::Duration) -> String {
    let secs = duration.as_secs_f64();

    if secs >= 60.0 {
        let mins = (secs / 60.0).floor() as u64;
        let remaining_secs = secs - (mins as f64 * 60.0);
        format!("{}m {:.2}s", mins, remaining_secs)
    } else if secs >= 1.0 {
        format!("{:.2}s", secs)
    } else {
        format!("{:.0}ms", secs * 1000.0)
    }
}
