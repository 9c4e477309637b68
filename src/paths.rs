//! Data directory layout.
//!
//! All launcher state lives under `~/.launchpad`:
//! - `config.json` — installed-version records and the default pointer
//! - `versions/` — one directory per installed version
//! - `logs/` — diagnostic log files

use std::path::{Path, PathBuf};

/// Returns the launcher data directory.
#[must_use]
pub fn launchpad_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".launchpad")
}

/// Returns the config file path under the given root.
#[must_use]
pub fn config_path(root: &Path) -> PathBuf {
    root.join("config.json")
}

/// Returns the installed-versions directory under the given root.
#[must_use]
pub fn versions_dir(root: &Path) -> PathBuf {
    root.join("versions")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_launchpad_dir() {
        let dir = launchpad_dir();
        assert!(dir.to_string_lossy().contains(".launchpad"));
    }

    #[test]
    fn test_layout_under_root() {
        let root = PathBuf::from("/tmp/lp");
        assert_eq!(config_path(&root), PathBuf::from("/tmp/lp/config.json"));
        assert_eq!(versions_dir(&root), PathBuf::from("/tmp/lp/versions"));
    }
}
