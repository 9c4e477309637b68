//! Launchpad
//!
//! A self-updating launcher for the Orbit desktop application: checks the
//! remote release feed, installs new versions in the background, launches
//! the currently selected install, and prunes stale ones.
//!
//! # Architecture
//!
//! - **Version Module**: channel-aware version parsing and ordering
//! - **Config Module**: persisted install records with schema migration
//! - **Install Module**: background download/extract/install worker
//! - **Resolver Module**: update candidate selection from the release feed
//! - **Orchestrator Module**: the load → launch → update → prune run

// Clippy configuration - allow common patterns
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::doc_markdown)]

pub mod config;
pub mod install;
pub mod launcher;
pub mod logging;
pub mod orchestrator;
pub mod paths;
pub mod release;
pub mod resolver;
pub mod version;

// Re-export main types
pub use config::{Config, InstalledVersion};
pub use install::{InstallAction, InstallProcess};
pub use orchestrator::Orchestrator;
pub use release::{Release, ReleaseClient};
pub use resolver::{UpdateCandidate, select_update};
pub use version::{Channel, Version};
