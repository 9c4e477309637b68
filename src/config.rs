//! Persistent launcher configuration.
//!
//! The config file records every installed version, which one is the
//! default to launch, and the install-id allocator. It is loaded once per
//! run and saved after each mutation that must survive a crash.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::version::Version;

/// Current config schema version.
pub const CONFIG_VERSION: u32 = 1;

/// Errors that can occur while loading or saving the config.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// File I/O error.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON parse or serialization error.
    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// The persisted schema version has no migration path.
    #[error("unrecognized config schema version {0}")]
    UnrecognizedSchema(u32),
}

/// A successfully installed application version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstalledVersion {
    /// Unique id, allocated once and never reused.
    pub install_id: u64,
    /// Rendered version string (`v1.2.3` / `dev-v1.2.3`).
    pub version: String,
    /// Directory holding the installed payload.
    pub path: PathBuf,
}

/// Persisted launcher state.
///
/// `default_install_id` is a weak reference by id; it may point at nothing
/// after an uninstall and is cleared when its target is removed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Schema tag for forward migrations.
    pub config_version: u32,
    /// Id of the install to launch, if any.
    #[serde(default)]
    pub default_install_id: Option<u64>,
    /// Installed versions in insertion order.
    #[serde(default)]
    pub installed: Vec<InstalledVersion>,
    /// Next id handed out by [`Config::allocate_install_id`].
    #[serde(default)]
    pub next_install_id: u64,
}

impl Default for Config {
    fn default() -> Self {
        // Fresh state starts at schema 0 and goes through the same
        // migration path as a legacy file.
        Self {
            config_version: 0,
            default_install_id: None,
            installed: Vec::new(),
            next_install_id: 0,
        }
    }
}

impl Config {
    /// Loads the config from `path`, creating fresh defaults when absent.
    ///
    /// Schema migrations are applied before returning; a schema version
    /// this build does not know is a fatal [`ConfigError::UnrecognizedSchema`].
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let mut config = if path.is_file() {
            let content = fs::read_to_string(path)?;
            serde_json::from_str::<Self>(&content)?
        } else {
            Self::default()
        };

        config.migrate()?;
        Ok(config)
    }

    /// Applies schema migrations in place.
    fn migrate(&mut self) -> Result<(), ConfigError> {
        if self.config_version == 0 {
            self.config_version = 1;
            self.default_install_id = None;
            self.installed = Vec::new();
            self.next_install_id = 1;
        }

        if self.config_version != CONFIG_VERSION {
            return Err(ConfigError::UnrecognizedSchema(self.config_version));
        }

        Ok(())
    }

    /// Saves the config to `path`.
    ///
    /// Writes to a sibling temp file first and renames it over the target
    /// so a crash never leaves truncated state behind.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        let temp_path = path.with_extension("tmp");

        {
            let mut file = fs::File::create(&temp_path)?;
            file.write_all(content.as_bytes())?;
            file.flush()?;
        }

        fs::rename(&temp_path, path)?;

        tracing::debug!("Config saved to {:?}", path);
        Ok(())
    }

    /// Hands out the next install id.
    ///
    /// Must be called exactly once per install, before the install does any
    /// I/O, and the config saved right after, so a crash mid-install cannot
    /// reuse the id.
    pub fn allocate_install_id(&mut self) -> u64 {
        let id = self.next_install_id;
        self.next_install_id += 1;
        id
    }

    /// Appends a new installed-version record. The caller persists.
    pub fn register_installed(&mut self, record: InstalledVersion) {
        self.installed.push(record);
    }

    /// Removes an installed-version record by id. The caller persists.
    ///
    /// Clears the default pointer when it referenced the removed install.
    pub fn remove_installed(&mut self, install_id: u64) -> Option<InstalledVersion> {
        let index = self
            .installed
            .iter()
            .position(|i| i.install_id == install_id)?;
        let removed = self.installed.remove(index);

        if self.default_install_id == Some(install_id) {
            self.default_install_id = None;
        }

        Some(removed)
    }

    /// Looks up an installed version by id.
    #[must_use]
    pub fn get_installed(&self, install_id: u64) -> Option<&InstalledVersion> {
        self.installed.iter().find(|i| i.install_id == install_id)
    }

    /// Parses every record's version string, skipping ones that no longer
    /// parse (they stay installed, they just cannot inform resolution).
    #[must_use]
    pub fn installed_versions(&self) -> Vec<Version> {
        self.installed
            .iter()
            .filter_map(|record| match Version::parse(&record.version) {
                Ok(version) => Some(version),
                Err(e) => {
                    tracing::warn!(
                        "Skipping unparseable installed version {:?}: {}",
                        record.version,
                        e
                    );
                    None
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sample_record(id: u64, version: &str) -> InstalledVersion {
        InstalledVersion {
            install_id: id,
            version: version.to_string(),
            path: PathBuf::from(format!("/tmp/versions/{}", version)),
        }
    }

    #[test]
    fn test_load_missing_file_migrates_to_v1() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(&dir.path().join("config.json")).unwrap();

        assert_eq!(config.config_version, 1);
        assert_eq!(config.default_install_id, None);
        assert!(config.installed.is_empty());
        assert_eq!(config.next_install_id, 1);
    }

    #[test]
    fn test_load_legacy_schema_zero() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"config_version": 0}"#).unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.config_version, 1);
        assert_eq!(config.next_install_id, 1);
    }

    #[test]
    fn test_load_unknown_schema_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"config_version": 99}"#).unwrap();

        let err = Config::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::UnrecognizedSchema(99)));
    }

    #[test]
    fn test_save_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");

        let mut config = Config::load(&path).unwrap();
        let id = config.allocate_install_id();
        config.register_installed(sample_record(id, "dev-v1.0.0"));
        config.default_install_id = Some(id);
        config.save(&path).unwrap();

        let reloaded = Config::load(&path).unwrap();
        assert_eq!(reloaded.default_install_id, Some(id));
        assert_eq!(reloaded.installed, config.installed);
        assert_eq!(reloaded.next_install_id, config.next_install_id);
    }

    #[test]
    fn test_save_leaves_no_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");

        Config::load(&path).unwrap().save(&path).unwrap();

        assert!(path.is_file());
        assert!(!path.with_extension("tmp").exists());
    }

    #[test]
    fn test_allocate_install_id_is_monotonic() {
        let mut config = Config::load(Path::new("/nonexistent/config.json")).unwrap();

        let first = config.allocate_install_id();
        let second = config.allocate_install_id();

        assert_eq!(first, 1);
        assert_eq!(second, 2);
        assert_eq!(config.next_install_id, 3);
    }

    #[test]
    fn test_remove_installed_clears_default_pointer() {
        let mut config = Config::default();
        config.migrate().unwrap();

        let id = config.allocate_install_id();
        config.register_installed(sample_record(id, "v1.0.0"));
        config.default_install_id = Some(id);

        let removed = config.remove_installed(id).unwrap();
        assert_eq!(removed.install_id, id);
        assert_eq!(config.default_install_id, None);
        assert!(config.installed.is_empty());

        assert!(config.remove_installed(id).is_none(), "already removed");
    }

    #[test]
    fn test_remove_other_install_keeps_default() {
        let mut config = Config::default();
        config.migrate().unwrap();

        let keep = config.allocate_install_id();
        let old = config.allocate_install_id();
        config.register_installed(sample_record(keep, "dev-v1.1.0"));
        config.register_installed(sample_record(old, "dev-v1.0.0"));
        config.default_install_id = Some(keep);

        config.remove_installed(old).unwrap();
        assert_eq!(config.default_install_id, Some(keep));
        assert_eq!(config.installed.len(), 1);
    }

    #[test]
    fn test_installed_versions_skips_bad_records() {
        let mut config = Config::default();
        config.migrate().unwrap();
        config.register_installed(sample_record(1, "dev-v1.0.0"));
        config.register_installed(sample_record(2, "not-a-version"));

        let versions = config.installed_versions();
        assert_eq!(versions.len(), 1);
        assert_eq!(versions[0].to_string(), "dev-v1.0.0");
    }
}
