//! Background install process.
//!
//! One install is a single-flight unit of work: download the release
//! archive, extract it into a staging area, then atomically move the
//! extracted tree to its final directory. The work runs on a worker
//! thread; the caller polls a snapshot of the current phase and progress.

use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

use thiserror::Error;

use crate::config::InstalledVersion;
use crate::version::Version;

/// Download chunk size; progress is reported once per chunk.
const DOWNLOAD_CHUNK_BYTES: usize = 64 * 1024;

/// Archive file name inside the staging directory.
const ARCHIVE_NAME: &str = "bundle.zip";

/// Errors terminating an install. The phase is part of the message so the
/// failure report names how far the install got.
#[derive(Debug, Clone, Error)]
pub enum InstallError {
    /// The archive download failed.
    #[error("download failed: {0}")]
    Download(String),

    /// The downloaded archive could not be extracted.
    #[error("extraction failed: {0}")]
    Extract(String),

    /// Moving the extracted tree into its final directory failed.
    #[error("install move failed: {0}")]
    InstallMove(String),

    /// The staging directory could not be prepared.
    #[error("staging area error: {0}")]
    Staging(String),
}

/// Phase an install is currently in.
///
/// Transitions run Queued → Downloading → Extracting → Installing → Done;
/// Failed is reachable from any non-terminal phase. Done and Failed are
/// terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallAction {
    /// Worker not started yet.
    Queued,
    /// Fetching the release archive.
    Downloading,
    /// Unpacking into the staging area.
    Extracting,
    /// Moving the extracted tree into place.
    Installing,
    /// Finished successfully.
    Done,
    /// Terminated with an error.
    Failed,
}

impl InstallAction {
    /// Returns true for the two terminal phases.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }
}

impl std::fmt::Display for InstallAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Queued => "Queued",
            Self::Downloading => "Downloading",
            Self::Extracting => "Extracting",
            Self::Installing => "Installing",
            Self::Done => "Done",
            Self::Failed => "Failed",
        };
        write!(f, "{}", name)
    }
}

/// Point-in-time view of an install, safe to read while the worker runs.
#[derive(Debug, Clone)]
pub struct InstallSnapshot {
    /// Current phase.
    pub action: InstallAction,
    /// Fraction in [0, 1]; `None` while indeterminate.
    pub progress: Option<f64>,
    /// Failure description, present once the action is Failed.
    pub error: Option<String>,
}

/// Worker-owned mutable state, snapshot-read by the poller.
struct StatusInner {
    action: InstallAction,
    progress: Option<f64>,
    error: Option<String>,
    result: Option<InstalledVersion>,
}

/// A running (or finished) background install.
pub struct InstallProcess {
    /// Id reserved from the config allocator before any I/O started.
    install_id: u64,
    /// Version being installed.
    version: Version,
    /// Shared status slot; the worker is the only writer.
    status: Arc<Mutex<StatusInner>>,
    /// Worker thread handle; the process is observed by polling, not join.
    _worker: JoinHandle<()>,
}

impl InstallProcess {
    /// Starts the install on a background thread.
    ///
    /// `install_id` must already be allocated (and persisted) by the
    /// caller. `install_path` must not exist; it only appears through the
    /// final atomic rename.
    #[must_use]
    pub fn begin(
        install_id: u64,
        version: Version,
        download_url: String,
        install_path: PathBuf,
    ) -> Self {
        let status = Arc::new(Mutex::new(StatusInner {
            action: InstallAction::Queued,
            progress: None,
            error: None,
            result: None,
        }));

        let worker_status = Arc::clone(&status);
        let worker_version = version.clone();

        let worker = thread::spawn(move || {
            let outcome = run_install(
                install_id,
                &worker_version,
                &download_url,
                &install_path,
                &worker_status,
            );

            if let Ok(mut inner) = worker_status.lock() {
                match outcome {
                    Ok(record) => {
                        inner.result = Some(record);
                        inner.progress = None;
                        inner.action = InstallAction::Done;
                    }
                    Err(e) => {
                        tracing::warn!("Install {} failed: {}", install_id, e);
                        inner.error = Some(e.to_string());
                        inner.progress = None;
                        inner.action = InstallAction::Failed;
                    }
                }
            }
        });

        Self {
            install_id,
            version,
            status,
            _worker: worker,
        }
    }

    /// Returns the reserved install id.
    #[must_use]
    pub fn install_id(&self) -> u64 {
        self.install_id
    }

    /// Returns the version being installed.
    #[must_use]
    pub fn version(&self) -> &Version {
        &self.version
    }

    /// Returns the current phase, progress, and error.
    #[must_use]
    pub fn snapshot(&self) -> InstallSnapshot {
        self.status
            .lock()
            .map(|inner| InstallSnapshot {
                action: inner.action,
                progress: inner.progress,
                error: inner.error.clone(),
            })
            .unwrap_or(InstallSnapshot {
                action: InstallAction::Failed,
                progress: None,
                error: Some("install status lock poisoned".to_string()),
            })
    }

    /// Returns true once the install reached Done or Failed.
    #[must_use]
    pub fn is_done(&self) -> bool {
        self.snapshot().action.is_terminal()
    }

    /// Returns true if the install terminated with an error.
    #[must_use]
    pub fn failed(&self) -> bool {
        self.snapshot().action == InstallAction::Failed
    }

    /// Takes the produced record after a successful install.
    ///
    /// The record has not been persisted; registering it in the config is
    /// the caller's responsibility.
    #[must_use]
    pub fn take_result(&self) -> Option<InstalledVersion> {
        self.status.lock().ok().and_then(|mut inner| inner.result.take())
    }
}

/// Picks a non-existing install directory for a version.
///
/// Candidate is `base_dir/<version>`, then `-1`, `-2`, ... suffixes until a
/// free path is found. Called synchronously before the install starts, so
/// two sequential installs never collide.
#[must_use]
pub fn default_install_path(base_dir: &Path, version: &Version) -> PathBuf {
    let candidate = base_dir.join(version.to_string());
    if !candidate.exists() {
        return candidate;
    }

    let mut suffix = 1u32;
    loop {
        let path = base_dir.join(format!("{}-{}", version, suffix));
        if !path.exists() {
            return path;
        }
        suffix += 1;
    }
}

/// Runs the three install phases, returning the new record on success.
fn run_install(
    install_id: u64,
    version: &Version,
    download_url: &str,
    install_path: &Path,
    status: &Arc<Mutex<StatusInner>>,
) -> Result<InstalledVersion, InstallError> {
    let staging_root = install_path
        .parent()
        .ok_or_else(|| InstallError::Staging("install path has no parent".to_string()))?;
    fs::create_dir_all(staging_root).map_err(|e| InstallError::Staging(e.to_string()))?;

    // Staged next to the final destination so the rename below never
    // crosses filesystems. Dropped (and deleted) on every exit path.
    let staging = tempfile::Builder::new()
        .prefix(".staging-")
        .tempdir_in(staging_root)
        .map_err(|e| InstallError::Staging(e.to_string()))?;

    tracing::info!(
        "Install {} of {} staging in {:?}",
        install_id,
        version,
        staging.path()
    );

    set_action(status, InstallAction::Downloading);
    let archive = staging.path().join(ARCHIVE_NAME);
    download_archive(download_url, &archive, |received, total| {
        let progress = total
            .filter(|t| *t > 0)
            .map(|t| received.min(t) as f64 / t as f64);
        if let Ok(mut inner) = status.lock() {
            inner.progress = progress;
        }
    })?;

    set_action(status, InstallAction::Extracting);
    let contents = staging.path().join("contents");
    extract_archive(&archive, &contents)?;

    set_action(status, InstallAction::Installing);
    fs::rename(&contents, install_path).map_err(|e| InstallError::InstallMove(e.to_string()))?;

    Ok(InstalledVersion {
        install_id,
        version: version.to_string(),
        path: install_path.to_path_buf(),
    })
}

/// Updates the shared action and resets progress to indeterminate.
fn set_action(status: &Arc<Mutex<StatusInner>>, action: InstallAction) {
    if let Ok(mut inner) = status.lock() {
        inner.action = action;
        inner.progress = None;
    }
}

/// Downloads `url` to `dest`, reporting `(bytes_so_far, total_bytes)`.
fn download_archive(
    url: &str,
    dest: &Path,
    mut report: impl FnMut(u64, Option<u64>),
) -> Result<(), InstallError> {
    // No request timeout: archive downloads may legitimately run longer
    // than the client's default; the transport's own limits still apply.
    let client = reqwest::blocking::Client::builder()
        .user_agent(concat!("launchpad/", env!("CARGO_PKG_VERSION")))
        .timeout(None)
        .build()
        .map_err(|e| InstallError::Download(e.to_string()))?;

    let mut response = client
        .get(url)
        .send()
        .map_err(|e| InstallError::Download(e.to_string()))?;

    let http_status = response.status();
    if !http_status.is_success() {
        return Err(InstallError::Download(format!(
            "server returned {}",
            http_status
        )));
    }

    let total = response.content_length();
    let mut file = fs::File::create(dest).map_err(|e| InstallError::Download(e.to_string()))?;

    let mut received: u64 = 0;
    let mut buffer = [0u8; DOWNLOAD_CHUNK_BYTES];
    loop {
        let read = response
            .read(&mut buffer)
            .map_err(|e| InstallError::Download(e.to_string()))?;
        if read == 0 {
            break;
        }
        file.write_all(&buffer[..read])
            .map_err(|e| InstallError::Download(e.to_string()))?;
        received += read as u64;
        report(received, total);
    }

    file.flush()
        .map_err(|e| InstallError::Download(e.to_string()))?;
    Ok(())
}

/// Extracts a zip archive into `dest`.
fn extract_archive(archive: &Path, dest: &Path) -> Result<(), InstallError> {
    let file = fs::File::open(archive).map_err(|e| InstallError::Extract(e.to_string()))?;
    let mut zip =
        zip::ZipArchive::new(file).map_err(|e| InstallError::Extract(e.to_string()))?;

    fs::create_dir_all(dest).map_err(|e| InstallError::Extract(e.to_string()))?;

    for index in 0..zip.len() {
        let mut entry = zip
            .by_index(index)
            .map_err(|e| InstallError::Extract(e.to_string()))?;

        // Entries escaping the destination are dropped.
        let Some(relative) = entry.enclosed_name() else {
            tracing::warn!("Skipping archive entry with unsafe path {:?}", entry.name());
            continue;
        };
        let outpath = dest.join(relative);

        if entry.is_dir() {
            fs::create_dir_all(&outpath).map_err(|e| InstallError::Extract(e.to_string()))?;
        } else {
            if let Some(parent) = outpath.parent() {
                fs::create_dir_all(parent).map_err(|e| InstallError::Extract(e.to_string()))?;
            }
            let mut outfile =
                fs::File::create(&outpath).map_err(|e| InstallError::Extract(e.to_string()))?;
            io::copy(&mut entry, &mut outfile).map_err(|e| InstallError::Extract(e.to_string()))?;
        }
    }

    Ok(())
}
