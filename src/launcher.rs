//! Application launch collaborator.
//!
//! Locates the companion application's executable inside an install tree
//! and starts it detached, with the executable's directory as its working
//! directory.

use std::ffi::OsStr;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};

use thiserror::Error;
use walkdir::WalkDir;

/// Errors that can occur while launching an install.
#[derive(Debug, Error)]
pub enum LaunchError {
    /// No file with the expected executable name exists under the install.
    #[error("executable {name:?} not found under {root:?}")]
    ExecutableNotFound { name: String, root: PathBuf },

    /// The process could not be spawned.
    #[error("failed to start {exe:?}: {source}")]
    Spawn {
        exe: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Returns the platform-specific executable file name.
#[must_use]
pub fn executable_name(base: &str) -> String {
    if cfg!(target_os = "windows") {
        format!("{}.exe", base)
    } else {
        base.to_string()
    }
}

/// Searches an install tree for the first file with the given name.
#[must_use]
pub fn find_executable(root: &Path, name: &str) -> Option<PathBuf> {
    WalkDir::new(root)
        .into_iter()
        .filter_map(Result::ok)
        .find(|entry| entry.file_type().is_file() && entry.file_name() == OsStr::new(name))
        .map(|entry| entry.into_path())
}

/// Starts the executable detached (fire-and-forget, never awaited).
pub fn launch_detached(exe: &Path) -> Result<Child, LaunchError> {
    let workdir = exe.parent().unwrap_or_else(|| Path::new("."));

    Command::new(exe)
        .current_dir(workdir)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .map_err(|source| LaunchError::Spawn {
            exe: exe.to_path_buf(),
            source,
        })
}

/// Locates and launches an install's executable in one step.
pub fn launch_install(root: &Path, name: &str) -> Result<(Child, PathBuf), LaunchError> {
    let exe = find_executable(root, name).ok_or_else(|| LaunchError::ExecutableNotFound {
        name: name.to_string(),
        root: root.to_path_buf(),
    })?;

    let child = launch_detached(&exe)?;
    Ok((child, exe))
}
