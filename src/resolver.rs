//! Update candidate selection.
//!
//! Walks the remote release feed against the currently installed versions
//! and decides which release, if any, should be installed this run.

use chrono::{DateTime, Utc};

use crate::release::Release;
use crate::version::{Channel, Version};

/// A release the launcher should install.
#[derive(Debug, Clone)]
pub struct UpdateCandidate {
    /// Parsed version of the release.
    pub version: Version,
    /// Download URL of the release's install archive.
    pub download_url: String,
    /// Upload timestamp of that archive.
    pub updated_at: DateTime<Utc>,
}

/// Selects the release to install, if any.
///
/// Releases are considered in feed order (newest first). A release
/// qualifies when it parses, carries an asset, and is strictly newer than
/// the latest installed version of its channel. Release-channel entries
/// are never auto-installed; only the dev channel updates itself. At most
/// one candidate is returned per pass.
#[must_use]
pub fn select_update(releases: &[Release], installed: &[Version]) -> Option<UpdateCandidate> {
    let latest_dev = Version::latest_installed(installed, Channel::Dev);
    let latest_release = Version::latest_installed(installed, Channel::Release);

    let mut candidate = None;

    for release in releases {
        let version = match Version::from_release(&release.tag_name, &release.body) {
            Ok(version) => version,
            Err(e) => {
                tracing::warn!("Skipping release {:?}: {}", release.tag_name, e);
                continue;
            }
        };

        let Some(asset) = release.primary_asset() else {
            tracing::warn!("Skipping release {} with no assets", version);
            continue;
        };

        let latest_installed = match version.channel() {
            Channel::Dev => latest_dev,
            Channel::Release => latest_release,
        };

        if let Some(latest) = latest_installed {
            if version.compare(latest).is_ok_and(|ord| ord.is_le()) {
                tracing::debug!("Release {} is not newer than {}", version, latest);
                continue;
            }
        }

        if version.channel() == Channel::Release {
            // Release-channel builds are listed but never auto-installed.
            tracing::debug!("Ignoring release-channel candidate {}", version);
            continue;
        }

        if candidate.is_none() {
            candidate = Some(UpdateCandidate {
                version,
                download_url: asset.browser_download_url.clone(),
                updated_at: asset.updated_at,
            });
        }
    }

    candidate
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::release::ReleaseAsset;

    fn asset(url: &str) -> ReleaseAsset {
        ReleaseAsset {
            browser_download_url: url.to_string(),
            updated_at: "2024-03-01T12:00:00Z".parse().unwrap(),
        }
    }

    fn release(tag: &str, body: &str, assets: Vec<ReleaseAsset>) -> Release {
        Release {
            tag_name: tag.to_string(),
            body: body.to_string(),
            assets,
        }
    }

    fn installed(versions: &[&str]) -> Vec<Version> {
        versions.iter().map(|v| Version::parse(v).unwrap()).collect()
    }

    #[test]
    fn test_selects_newer_dev_release() {
        let feed = vec![
            release("Dev", "nightly v1.1.0", vec![asset("https://example.com/dev.zip")]),
            release("v2.0.0", "", vec![asset("https://example.com/rel.zip")]),
        ];

        let candidate = select_update(&feed, &installed(&["dev-v1.0.0"])).unwrap();
        assert_eq!(candidate.version.to_string(), "dev-v1.1.0");
        assert_eq!(candidate.download_url, "https://example.com/dev.zip");
    }

    #[test]
    fn test_release_channel_is_never_auto_installed() {
        let feed = vec![release(
            "v2.0.0",
            "",
            vec![asset("https://example.com/rel.zip")],
        )];

        assert!(select_update(&feed, &installed(&[])).is_none());
        assert!(select_update(&feed, &installed(&["v1.0.0"])).is_none());
    }

    #[test]
    fn test_up_to_date_selects_nothing() {
        let feed = vec![
            release("Dev", "nightly v1.1.0", vec![asset("https://example.com/dev.zip")]),
            release("v2.0.0", "", vec![asset("https://example.com/rel.zip")]),
        ];

        assert!(select_update(&feed, &installed(&["dev-v1.1.0"])).is_none());
        assert!(select_update(&feed, &installed(&["dev-v1.2.0"])).is_none());
    }

    #[test]
    fn test_first_qualifying_release_wins() {
        let feed = vec![
            release("Dev", "nightly v1.3.0", vec![asset("https://example.com/a.zip")]),
            release("Dev", "nightly v1.2.0", vec![asset("https://example.com/b.zip")]),
        ];

        let candidate = select_update(&feed, &installed(&["dev-v1.0.0"])).unwrap();
        assert_eq!(candidate.version.to_string(), "dev-v1.3.0");
    }

    #[test]
    fn test_unparseable_release_is_skipped() {
        let feed = vec![
            release("weird-tag", "", vec![asset("https://example.com/x.zip")]),
            release("Dev", "no version here", vec![asset("https://example.com/y.zip")]),
            release("Dev", "build v0.9", vec![asset("https://example.com/z.zip")]),
        ];

        let candidate = select_update(&feed, &installed(&[])).unwrap();
        assert_eq!(candidate.version.to_string(), "dev-v0.9");
    }

    #[test]
    fn test_release_without_assets_is_skipped() {
        let feed = vec![
            release("Dev", "nightly v2.0.0", Vec::new()),
            release("Dev", "nightly v1.5.0", vec![asset("https://example.com/ok.zip")]),
        ];

        let candidate = select_update(&feed, &installed(&[])).unwrap();
        assert_eq!(candidate.version.to_string(), "dev-v1.5.0");
    }
}
