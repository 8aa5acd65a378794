//! Per-identity orchestration: directory state, post listing, batch run

use crate::config::Config;
use crate::dedup::DedupState;
use crate::error::Result;
use crate::resolver::Resolver;
use crate::runner::{BatchRunner, clean_empty_dir};
use crate::segmenter::LanguageModel;
use crate::source::SourceAdapter;
use crate::types::{BatchSummary, Identity, IdentityKind, MEDIA_EXTENSIONS};
use std::path::PathBuf;
use std::sync::Arc;

/// Harvests one identity at a time: list posts, resolve, fetch, dedup, persist
///
/// Cheap to share: construction builds the HTTP client, loads the word
/// segmentation model once, and assembles the URL rule chain; every
/// [`harvest`](MediaHarvester::harvest) call reuses them.
pub struct MediaHarvester {
    config: Arc<Config>,
    source: Arc<dyn SourceAdapter>,
    runner: BatchRunner,
}

impl MediaHarvester {
    /// Build a harvester from configuration and a source adapter
    pub fn new(config: Config, source: Arc<dyn SourceAdapter>) -> Result<Self> {
        let model = match &config.word_model_path {
            Some(path) => LanguageModel::from_file(path)?,
            None => LanguageModel::empty(),
        };
        let http = reqwest::Client::builder().build()?;
        let resolver = Arc::new(Resolver::with_default_rules(
            http.clone(),
            &config,
            Arc::new(model),
        ));
        let runner = BatchRunner::new(resolver, http, config.file_size_threshold);
        Ok(Self {
            config: Arc::new(config),
            source,
            runner,
        })
    }

    /// Target directory for an identity under the configured download root
    #[must_use]
    pub fn base_path(&self, identity: &Identity) -> PathBuf {
        self.config.download_dir.join(identity.dir_name())
    }

    /// Run the full pipeline for one identity
    ///
    /// `search` filters community feeds; user feeds always list newest posts.
    /// When the identity does not exist on the platform, the (empty) target
    /// directory is cleaned up and the error propagates so bulk callers can
    /// move on.
    pub async fn harvest(
        &self,
        identity: &Identity,
        limit: Option<u32>,
        search: Option<&str>,
    ) -> Result<BatchSummary> {
        let base_path = self.base_path(identity);
        let dedup = Arc::new(DedupState::initialize(&base_path, MEDIA_EXTENSIONS).await?);

        let listing = match (identity.kind, search) {
            (IdentityKind::Community, Some(query)) => {
                self.source.search_posts(identity, query, limit).await
            }
            _ => self.source.list_new_posts(identity, limit).await,
        };

        let posts = match listing {
            Ok(posts) => posts,
            Err(e) if e.is_identity_not_found() => {
                tracing::warn!(identity = %identity.name, "Could not find identity");
                clean_empty_dir(&base_path).await?;
                return Err(e);
            }
            Err(e) => return Err(e),
        };

        self.runner.run(identity, posts, &base_path, dedup).await
    }
}
