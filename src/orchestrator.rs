//! Top-level launcher control flow.
//!
//! One run walks a fixed sequence: load the config, launch the current
//! default install (or print the first-run notice), check the release
//! feed, perform at most one install, persist the new default, then prune
//! every install that is no longer the default. Partial failures are
//! reported and never escalate into a nonzero exit.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use thiserror::Error;

use crate::config::{Config, ConfigError};
use crate::install::{InstallProcess, default_install_path};
use crate::launcher;
use crate::paths;
use crate::release::{FeedError, ReleaseClient};
use crate::resolver::select_update;

/// Delay between install status polls.
const POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Errors that can occur while uninstalling one version.
///
/// Each failure is reported for its own install and never stops the
/// remaining uninstalls.
#[derive(Debug, Error)]
pub enum UninstallError {
    /// No record with this id exists.
    #[error("install {0} is not registered")]
    UnknownInstall(u64),

    /// The application executable was not found under the install tree.
    #[error("executable {name:?} not found under {path:?}")]
    ExecutableNotFound { name: String, path: PathBuf },

    /// Filesystem error while deleting the install.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// The config could not be persisted after the removal.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// The launcher's orchestrator.
pub struct Orchestrator {
    /// GitHub repository publishing the application's releases.
    repository: String,
    /// Base name of the application executable.
    executable: String,
    /// Data directory holding config, installs, and logs.
    root: PathBuf,
}

impl Orchestrator {
    /// Creates an orchestrator over the default data directory.
    #[must_use]
    pub fn new(repository: &str, executable: &str) -> Self {
        Self::with_root(repository, executable, paths::launchpad_dir())
    }

    /// Creates an orchestrator over an explicit data directory.
    #[must_use]
    pub fn with_root(repository: &str, executable: &str, root: PathBuf) -> Self {
        Self {
            repository: repository.to_string(),
            executable: executable.to_string(),
            root,
        }
    }

    /// Performs one full launcher run.
    pub fn run(&self) {
        let config_path = paths::config_path(&self.root);

        let mut config = match Config::load(&config_path) {
            Ok(config) => config,
            Err(e) => {
                println!("Cannot load launcher state: {}", e);
                tracing::error!("Config load failed: {}", e);
                return;
            }
        };

        match config.default_install_id {
            Some(install_id) => self.launch_default(&config, install_id),
            None => println!(
                "Performing first time install. \
                 You'll need to run the launcher again after it completes."
            ),
        }

        println!("Checking for updates");
        if let Err(e) = self.check_and_install(&mut config, &config_path) {
            println!("Failed to check for new versions");
            println!("{}", e);
            tracing::warn!("Update check failed: {}", e);
        }

        println!("Uninstalling old versions");
        self.prune_old(&mut config);
    }

    /// Launches the default install, fire-and-forget.
    fn launch_default(&self, config: &Config, install_id: u64) {
        let Some(record) = config.get_installed(install_id) else {
            tracing::warn!("Default install {} has no record", install_id);
            println!("The selected install is missing; a fresh one will be set up.");
            return;
        };

        let name = launcher::executable_name(&self.executable);
        let Some(exe) = launcher::find_executable(&record.path, &name) else {
            println!("No {} executable found under {}", name, record.path.display());
            return;
        };

        println!("Launching {} ({})", record.version, exe.display());
        if let Err(e) = launcher::launch_detached(&exe) {
            println!("Failed to launch {}: {}", record.version, e);
            tracing::warn!("Launch failed: {}", e);
        }
    }

    /// Runs the update check and performs at most one install.
    fn check_and_install(
        &self,
        config: &mut Config,
        config_path: &Path,
    ) -> Result<(), FeedError> {
        let client = ReleaseClient::new(&self.repository);
        let releases = client.fetch_releases()?;

        let installed = config.installed_versions();
        let Some(candidate) = select_update(&releases, &installed) else {
            tracing::info!("No update candidate; {} versions installed", installed.len());
            return Ok(());
        };

        // Reserve the id and persist it before any install I/O starts, so
        // a crash mid-install cannot hand the same id out twice.
        let install_id = config.allocate_install_id();
        if let Err(e) = config.save(config_path) {
            tracing::warn!("Could not persist allocated install id: {}", e);
        }

        let install_path =
            default_install_path(&paths::versions_dir(&self.root), &candidate.version);

        println!("Installing {}", candidate.version);
        tracing::info!(
            "Installing {} from {} (asset updated {})",
            candidate.version,
            candidate.download_url,
            candidate.updated_at
        );

        let install = InstallProcess::begin(
            install_id,
            candidate.version.clone(),
            candidate.download_url.clone(),
            install_path,
        );

        while !install.is_done() {
            let snapshot = install.snapshot();
            match snapshot.progress {
                Some(fraction) => println!("{} {:.2}%", snapshot.action, fraction * 100.0),
                None => println!("{}", snapshot.action),
            }
            thread::sleep(POLL_INTERVAL);
        }

        if install.failed() {
            println!("Failed to install version {}", install.version());
            if let Some(error) = install.snapshot().error {
                println!("{}", error);
            }
        } else if let Some(record) = install.take_result() {
            config.register_installed(record);
            config.default_install_id = Some(install_id);
        }

        // Persists the new default on success, and the consumed id either way.
        if let Err(e) = config.save(config_path) {
            tracing::warn!("Could not persist config after install: {}", e);
        }

        Ok(())
    }

    /// Uninstalls every install that is not the current default.
    pub fn prune_old(&self, config: &mut Config) {
        let config_path = paths::config_path(&self.root);

        let stale: Vec<u64> = config
            .installed
            .iter()
            .map(|record| record.install_id)
            .filter(|id| Some(*id) != config.default_install_id)
            .collect();

        for install_id in stale {
            if let Err(e) = self.uninstall_version(config, &config_path, install_id) {
                println!("Uninstallation failed");
                println!("{}", e);
                tracing::warn!("Uninstall of {} failed: {}", install_id, e);
            }
        }
    }

    /// Removes one installed version: executable first, then the record,
    /// then the directory tree.
    fn uninstall_version(
        &self,
        config: &mut Config,
        config_path: &Path,
        install_id: u64,
    ) -> Result<(), UninstallError> {
        let record = config
            .get_installed(install_id)
            .cloned()
            .ok_or(UninstallError::UnknownInstall(install_id))?;

        println!("Uninstalling version {}", record.version);

        // Deleting the executable first fails early while the application
        // is still running, leaving the install untouched.
        let name = launcher::executable_name(&self.executable);
        let exe = launcher::find_executable(&record.path, &name).ok_or_else(|| {
            UninstallError::ExecutableNotFound {
                name: name.clone(),
                path: record.path.clone(),
            }
        })?;
        fs::remove_file(&exe)?;

        config.remove_installed(install_id);
        config.save(config_path)?;

        fs::remove_dir_all(&record.path)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::InstalledVersion;

    fn fake_install(root: &Path, name: &str, executable: &str) -> PathBuf {
        let path = paths::versions_dir(root).join(name);
        fs::create_dir_all(path.join("bin")).unwrap();
        fs::write(path.join("bin").join(executable), b"app").unwrap();
        path
    }

    #[test]
    fn test_prune_old_keeps_only_default() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().to_path_buf();
        let exe = launcher::executable_name("orbit");

        let mut config = Config::load(&paths::config_path(&root)).unwrap();

        let old_id = config.allocate_install_id();
        let old_path = fake_install(&root, "dev-v1.0.0", &exe);
        config.register_installed(InstalledVersion {
            install_id: old_id,
            version: "dev-v1.0.0".to_string(),
            path: old_path.clone(),
        });

        let new_id = config.allocate_install_id();
        let new_path = fake_install(&root, "dev-v1.1.0", &exe);
        config.register_installed(InstalledVersion {
            install_id: new_id,
            version: "dev-v1.1.0".to_string(),
            path: new_path.clone(),
        });

        config.default_install_id = Some(new_id);

        let orchestrator = Orchestrator::with_root("example/orbit", "orbit", root.clone());
        orchestrator.prune_old(&mut config);

        assert!(!old_path.exists(), "stale install removed from disk");
        assert!(new_path.exists(), "default install left intact");
        assert_eq!(config.installed.len(), 1);
        assert_eq!(config.installed[0].install_id, new_id);
        assert_eq!(config.default_install_id, Some(new_id));

        // The on-disk config reflects the removal.
        let reloaded = Config::load(&paths::config_path(&root)).unwrap();
        assert_eq!(reloaded.installed.len(), 1);
    }

    #[test]
    fn test_prune_old_survives_broken_install() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().to_path_buf();
        let exe = launcher::executable_name("orbit");

        let mut config = Config::load(&paths::config_path(&root)).unwrap();

        // A record whose tree is gone: the uninstall fails, the rest proceed.
        let broken_id = config.allocate_install_id();
        config.register_installed(InstalledVersion {
            install_id: broken_id,
            version: "dev-v0.9.0".to_string(),
            path: paths::versions_dir(&root).join("dev-v0.9.0"),
        });

        let stale_id = config.allocate_install_id();
        let stale_path = fake_install(&root, "dev-v1.0.0", &exe);
        config.register_installed(InstalledVersion {
            install_id: stale_id,
            version: "dev-v1.0.0".to_string(),
            path: stale_path.clone(),
        });

        let orchestrator = Orchestrator::with_root("example/orbit", "orbit", root);
        orchestrator.prune_old(&mut config);

        assert!(!stale_path.exists(), "healthy stale install still pruned");
        assert_eq!(config.installed.len(), 1, "broken record is left behind");
        assert_eq!(config.installed[0].install_id, broken_id);
    }
}
