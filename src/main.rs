//! Launchpad - Main entry point.
//!
//! A single run launches the current install, checks for updates, performs
//! at most one install, and prunes old versions. No flags or arguments;
//! `RUST_LOG` tunes diagnostic verbosity. The exit code is always success,
//! even when individual steps fail.

use launchpad::Orchestrator;
use launchpad::logging;
use launchpad::paths;

/// GitHub repository publishing the application's releases.
const RELEASE_REPOSITORY: &str = "launchpad-dev/orbit";

/// Base name of the application executable inside an install.
const APP_EXECUTABLE: &str = "orbit";

fn main() {
    let root = paths::launchpad_dir();

    // Diagnostics are best-effort; a read-only disk must not stop a launch.
    if let Err(e) = logging::init(&root) {
        eprintln!("Warning: file logging unavailable: {}", e);
    }

    tracing::info!("launchpad v{} starting", env!("CARGO_PKG_VERSION"));

    Orchestrator::with_root(RELEASE_REPOSITORY, APP_EXECUTABLE, root).run();
}
