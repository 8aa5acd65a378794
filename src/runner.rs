//! Submission batch runner: fans posts out across a bounded worker set
//!
//! One pool per run, joined before the summary is reported — there are no
//! persistent background workers. Posts execute in parallel with no ordering
//! guarantee across them; within one post, resolution fully precedes the
//! persist calls and the post's assets are persisted sequentially in
//! resolver-returned order.

use crate::dedup::DedupState;
use crate::error::{Error, Result};
use crate::resolver::Resolver;
use crate::store;
use crate::types::{BatchSummary, Identity, Post};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

/// Drives resolver and persist stage for one identity's post list
pub struct BatchRunner {
    resolver: Arc<Resolver>,
    http: reqwest::Client,
    min_bytes: u64,
}

impl BatchRunner {
    /// Build a runner over a shared resolver and HTTP client
    pub fn new(resolver: Arc<Resolver>, http: reqwest::Client, min_bytes: u64) -> Self {
        Self {
            resolver,
            http,
            min_bytes,
        }
    }

    /// Process every post for `identity`, reporting aggregate throughput
    ///
    /// Per-post failures are isolated and logged; they never abort the batch.
    /// The `written` count is the directory-entry delta across the run, an
    /// accepted approximation when something else modifies the directory
    /// concurrently.
    pub async fn run(
        &self,
        identity: &Identity,
        posts: Vec<Post>,
        base_path: &Path,
        dedup: Arc<DedupState>,
    ) -> Result<BatchSummary> {
        let attempted = posts.len();
        if posts.is_empty() {
            tracing::info!("No submissions found, nothing to process");
            clean_empty_dir(base_path).await?;
            return Ok(BatchSummary::empty());
        }

        if identity.needs_crumb() {
            // The folder name escapes delimiters; the crumb preserves the
            // exact original name for later bulk re-runs.
            let crumb = base_path.join(format!("{}.crumb", identity.name));
            tokio::fs::write(&crumb, b"").await?;
        }

        let workers = worker_count(attempted);
        tracing::info!(
            submissions = attempted,
            workers,
            "Processing submissions with worker pool"
        );

        let start_entries = dir_entry_count(base_path).await?;
        let start = Instant::now();

        let semaphore = Arc::new(Semaphore::new(workers));
        let mut pool = JoinSet::new();
        for post in posts {
            let permit = semaphore
                .clone()
                .acquire_owned()
                .await
                .map_err(|_| Error::Other("worker pool semaphore closed".to_string()))?;
            let resolver = self.resolver.clone();
            let http = self.http.clone();
            let dedup = dedup.clone();
            let base: PathBuf = base_path.to_path_buf();
            let min_bytes = self.min_bytes;
            pool.spawn(async move {
                let _permit = permit;
                if let Err(e) = process_post(&resolver, &http, &post, &dedup, &base, min_bytes).await
                {
                    tracing::warn!(
                        url = %post.url,
                        permalink = %post.permalink,
                        error = %e,
                        "Post failed"
                    );
                }
            });
        }
        while let Some(joined) = pool.join_next().await {
            if let Err(e) = joined {
                tracing::warn!(error = %e, "Worker task aborted");
            }
        }

        let elapsed = start.elapsed();
        let end_entries = dir_entry_count(base_path).await?;
        let written = end_entries.saturating_sub(start_entries);
        tracing::info!(
            written,
            seconds = elapsed.as_secs(),
            "Batch complete"
        );

        clean_empty_dir(base_path).await?;

        Ok(BatchSummary {
            attempted,
            written,
            elapsed,
        })
    }
}

/// Resolve one post and persist each of its assets in order
async fn process_post(
    resolver: &Resolver,
    http: &reqwest::Client,
    post: &Post,
    dedup: &DedupState,
    base_path: &Path,
    min_bytes: u64,
) -> Result<()> {
    let assets = resolver.resolve(post).await?;
    for asset_url in assets {
        let outcome = store::persist(http, &asset_url, post, dedup, base_path, min_bytes).await?;
        tracing::debug!(url = %asset_url, ?outcome, "Asset processed");
    }
    Ok(())
}

/// Never more workers than posts, never more than host parallelism
fn worker_count(posts: usize) -> usize {
    let parallelism = std::thread::available_parallelism()
        .map(std::num::NonZeroUsize::get)
        .unwrap_or(1);
    parallelism.min(posts).max(1)
}

async fn dir_entry_count(path: &Path) -> Result<usize> {
    let mut entries = tokio::fs::read_dir(path).await?;
    let mut count = 0;
    while entries.next_entry().await?.is_some() {
        count += 1;
    }
    Ok(count)
}

/// Remove the identity directory when a run leaves it empty
pub(crate) async fn clean_empty_dir(path: &Path) -> Result<()> {
    if !path.is_dir() {
        return Ok(());
    }
    if dir_entry_count(path).await? == 0 {
        tokio::fs::remove_dir(path).await?;
        tracing::debug!(path = %path.display(), "Removed empty identity directory");
    }
    Ok(())
}
