//! # media-dl
//!
//! Concurrent media-harvesting pipeline for content-platform feeds.
//!
//! Given an identity (a user or a community feed), media-dl enumerates its
//! recent posts, resolves each post's URL into zero or more fetchable asset
//! URLs through an ordered chain of host rules, downloads the bytes across a
//! bounded worker pool, deduplicates by content hash and by original
//! filename, and persists new files into a per-identity directory. Re-runs
//! are idempotent: dedup state is reconstructed from the directory listing
//! itself on every run.
//!
//! ## Quick Start
//!
//! ```no_run
//! use media_dl::{Config, Identity, MediaHarvester, RedditJsonSource};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::default();
//!     let source = Arc::new(RedditJsonSource::new(reqwest::Client::new()));
//!     let harvester = MediaHarvester::new(config, source)?;
//!
//!     let summary = harvester.harvest(&Identity::user("someone"), Some(50), None).await?;
//!     println!("wrote {} files in {:?}", summary.written, summary.elapsed);
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Bulk re-run over a directory of harvested identities
pub mod bulk;
/// Configuration types
pub mod config;
/// Per-identity dedup state seeded from disk
pub mod dedup;
/// Error types
pub mod error;
/// Per-identity orchestration
pub mod harvester;
/// URL resolution rule chain
pub mod resolver;
/// Submission batch runner
pub mod runner;
/// Word segmentation over a frequency dictionary
pub mod segmenter;
/// Source adapter capability
pub mod source;
/// Fetch-dedup-persist stage
pub mod store;
/// Core types
pub mod types;

// Re-export commonly used types
pub use config::Config;
pub use dedup::DedupState;
pub use error::{Error, Result};
pub use harvester::MediaHarvester;
pub use resolver::{Resolver, UrlRule};
pub use runner::BatchRunner;
pub use segmenter::LanguageModel;
pub use source::{RedditJsonSource, SourceAdapter};
pub use types::{
    BatchSummary, Identity, IdentityKind, MEDIA_EXTENSIONS, PersistOutcome, Post,
};
