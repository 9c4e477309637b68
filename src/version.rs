//! Application version identifiers.
//!
//! A version belongs to either the release or the dev channel and carries
//! a dot-separated sequence of components. Ordering is only defined within
//! a single channel; the two channels move independently.

use std::cmp::Ordering;
use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

/// Pattern locating a version number inside free-text release notes.
static DEV_VERSION_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"v[0-9.]+(\s|$)").expect("hard-coded pattern compiles"));

/// Errors produced while parsing or comparing versions.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VersionError {
    /// The version string does not follow the `v1.2.3` / `dev-v1.2.3` shape.
    #[error("malformed version string: {0:?}")]
    MalformedVersion(String),

    /// A dev release carried no version number in its notes.
    #[error("no version number found in release notes")]
    NoVersionFound,

    /// Release and dev versions are not ordered against each other.
    #[error("cannot compare versions across channels")]
    CrossChannelComparison,
}

/// Update channel a version belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    /// Stable releases, tagged `v1.2.3`.
    Release,
    /// Development builds, rendered `dev-v1.2.3`.
    Dev,
}

/// A parsed application version.
///
/// Immutable once constructed. Components are kept as raw tokens so that
/// unusual tags survive a parse/render round trip; comparison treats a pair
/// of numeric tokens numerically and falls back to string order otherwise.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Version {
    channel: Channel,
    sequence: Vec<String>,
}

impl Version {
    /// Parses a rendered version string (`v1.2.3` or `dev-v1.2.3`).
    pub fn parse(text: &str) -> Result<Self, VersionError> {
        let (channel, rest) = match text.strip_prefix("dev-") {
            Some(rest) => (Channel::Dev, rest),
            None => (Channel::Release, text),
        };

        let rest = rest
            .strip_prefix('v')
            .ok_or_else(|| VersionError::MalformedVersion(text.to_string()))?;

        Ok(Self {
            channel,
            sequence: rest.split('.').map(str::to_string).collect(),
        })
    }

    /// Builds a version from a remote release descriptor.
    ///
    /// A tag of `Dev` (after stripping an optional leading `v`) marks the
    /// dev channel; its version number is pulled from the first
    /// `v<digits...>` match in the release notes. Any other tag is a
    /// release-channel version and must be fully numeric.
    pub fn from_release(tag: &str, body: &str) -> Result<Self, VersionError> {
        let tag = tag.strip_prefix('v').unwrap_or(tag);

        if tag == "Dev" {
            let found = DEV_VERSION_PATTERN
                .find(body)
                .ok_or(VersionError::NoVersionFound)?;
            let number = found.as_str().trim_end().trim_start_matches('v');

            return Ok(Self {
                channel: Channel::Dev,
                sequence: number.split('.').map(str::to_string).collect(),
            });
        }

        let sequence = tag
            .split('.')
            .map(|part| {
                part.parse::<u64>()
                    .map(|n| n.to_string())
                    .map_err(|_| VersionError::MalformedVersion(tag.to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            channel: Channel::Release,
            sequence,
        })
    }

    /// Returns the channel this version belongs to.
    #[must_use]
    pub fn channel(&self) -> Channel {
        self.channel
    }

    /// Returns true for dev-channel versions.
    #[must_use]
    pub fn is_dev(&self) -> bool {
        self.channel == Channel::Dev
    }

    /// Three-way comparison within a channel.
    ///
    /// Comparing across channels is a logic error and is reported as
    /// [`VersionError::CrossChannelComparison`].
    pub fn compare(&self, other: &Self) -> Result<Ordering, VersionError> {
        if self.channel != other.channel {
            return Err(VersionError::CrossChannelComparison);
        }

        for (a, b) in self.sequence.iter().zip(&other.sequence) {
            let ord = match (a.parse::<u64>(), b.parse::<u64>()) {
                (Ok(x), Ok(y)) => x.cmp(&y),
                _ => a.cmp(b),
            };
            if ord != Ordering::Equal {
                return Ok(ord);
            }
        }

        // Shared prefix is equal; the longer sequence wins.
        Ok(self.sequence.len().cmp(&other.sequence.len()))
    }

    /// Returns the greatest of a set of same-channel versions.
    ///
    /// Versions on a different channel than the current best are ignored;
    /// callers are expected to filter per channel first.
    #[must_use]
    pub fn max_of<'a, I>(versions: I) -> Option<&'a Version>
    where
        I: IntoIterator<Item = &'a Version>,
    {
        let mut best: Option<&Version> = None;
        for version in versions {
            best = match best {
                None => Some(version),
                Some(current) => match version.compare(current) {
                    Ok(Ordering::Greater) => Some(version),
                    _ => Some(current),
                },
            };
        }
        best
    }

    /// Returns the latest version of the given channel, if any.
    #[must_use]
    pub fn latest_installed(versions: &[Version], channel: Channel) -> Option<&Version> {
        Self::max_of(versions.iter().filter(|v| v.channel == channel))
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.channel == Channel::Dev {
            write!(f, "dev-")?;
        }
        write!(f, "v{}", self.sequence.join("."))
    }
}
