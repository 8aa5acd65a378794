//! Core types shared across the pipeline

use std::time::Duration;

/// File extensions the pipeline recognizes as downloadable media
///
/// Used both for direct-link URL matching and for seeding dedup state from
/// files already on disk.
pub const MEDIA_EXTENSIONS: &[&str] = &[".jpg", ".png", ".gif", ".mp4", ".webm"];

/// One content submission as supplied by the source platform
///
/// Immutable as seen by the pipeline; produced by a [`SourceAdapter`](crate::source::SourceAdapter).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Post {
    /// Origin location of the submission's content
    pub url: String,
    /// Platform permalink for the submission (diagnostics only)
    pub permalink: String,
    /// Submitting author, when the platform reports one
    pub author: Option<String>,
    /// Community the submission was posted to, when applicable
    pub community: Option<String>,
}

impl Post {
    /// Convenience constructor for a post with only a URL and permalink
    pub fn new(url: impl Into<String>, permalink: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            permalink: permalink.into(),
            author: None,
            community: None,
        }
    }
}

/// Whether an identity is a user account or a community feed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentityKind {
    /// A user account
    User,
    /// A community feed
    Community,
}

/// A user or community being harvested
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    /// The exact platform name of the identity
    pub name: String,
    /// User or community
    pub kind: IdentityKind,
}

impl Identity {
    /// Create a user identity
    pub fn user(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: IdentityKind::User,
        }
    }

    /// Create a community identity
    pub fn community(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: IdentityKind::Community,
        }
    }

    /// Filesystem-safe directory name for this identity
    ///
    /// Underscores are replaced with hyphens because some filesystems
    /// disallow underscores in folder names. The exact original name is
    /// preserved separately via a crumb file when it matters.
    #[must_use]
    pub fn dir_name(&self) -> String {
        self.name.replace('_', "-")
    }

    /// Whether the true name needs a crumb file to be recoverable from the
    /// folder name alone
    #[must_use]
    pub fn needs_crumb(&self) -> bool {
        self.name.contains('-') || self.name.contains('_')
    }
}

/// Outcome of one asset's trip through the fetch-dedup-persist stage
///
/// Only [`Written`](PersistOutcome::Written) produces a file; the skip
/// variants are counted by callers, never treated as errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersistOutcome {
    /// New file written to disk
    Written,
    /// Original filename already known for this identity
    SkippedKnownName,
    /// Same bytes already stored under a different filename
    SkippedKnownHash,
    /// Payload below the configured size threshold (placeholder/error body)
    SkippedTooSmall,
}

/// Aggregate result of one batch run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchSummary {
    /// Number of posts handed to workers
    pub attempted: usize,
    /// Net new files in the target directory (post-run count minus pre-run)
    pub written: usize,
    /// Wall-clock duration of the fan-out
    pub elapsed: Duration,
}

impl BatchSummary {
    /// Summary for a run that had nothing to do
    #[must_use]
    pub fn empty() -> Self {
        Self {
            attempted: 0,
            written: 0,
            elapsed: Duration::ZERO,
        }
    }
}
