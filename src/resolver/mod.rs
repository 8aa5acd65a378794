//! URL resolution: mapping one post's heterogeneous URL to fetchable assets
//!
//! Dispatch is a strict ordered rule chain — the first rule whose
//! [`matches`](UrlRule::matches) returns `true` wins and produces the full
//! asset list for the post. Adding support for a new host means adding a new
//! rule, never editing existing ones.

mod rules;

pub use rules::{
    DirectFileRule, GalleryRule, GfycatRule, ImgurAlbumRule, ImgurImageRule, SlugTriggerRule,
};

use crate::config::Config;
use crate::error::Result;
use crate::segmenter::LanguageModel;
use crate::types::Post;
use async_trait::async_trait;
use std::sync::Arc;

/// One host-specific recognition/transform rule
#[async_trait]
pub trait UrlRule: Send + Sync {
    /// Short rule name for diagnostics
    fn name(&self) -> &'static str;

    /// Whether this rule recognizes the post's URL
    fn matches(&self, post: &Post) -> bool;

    /// Produce the concrete asset URLs for a recognized post
    ///
    /// Rules that need a network call (gallery pages, album listings) let
    /// failures propagate; per-post isolation is the batch runner's job.
    async fn resolve(&self, post: &Post, http: &reqwest::Client) -> Result<Vec<String>>;
}

/// Ordered rule chain applied to every post
pub struct Resolver {
    rules: Vec<Box<dyn UrlRule>>,
    http: reqwest::Client,
}

impl Resolver {
    /// Build a resolver from an explicit rule chain
    pub fn new(rules: Vec<Box<dyn UrlRule>>, http: reqwest::Client) -> Self {
        Self { rules, http }
    }

    /// Build the standard rule chain
    ///
    /// Order matters and mirrors the recognition precedence: direct file
    /// links, platform galleries, third-party albums, third-party single
    /// images, the configurable slug-trigger rule (only when a trigger is
    /// configured), then the gfycat slug rule.
    pub fn with_default_rules(
        http: reqwest::Client,
        config: &Config,
        model: Arc<LanguageModel>,
    ) -> Self {
        let mut rules: Vec<Box<dyn UrlRule>> = vec![
            Box::new(DirectFileRule::default()),
            Box::new(GalleryRule::new()),
            Box::new(ImgurAlbumRule::new()),
            Box::new(ImgurImageRule),
        ];
        if let Some(trigger) = &config.wordninja_trigger {
            rules.push(Box::new(SlugTriggerRule::new(
                trigger.clone(),
                config.wordninja_download_url.clone(),
                model.clone(),
            )));
        }
        rules.push(Box::new(GfycatRule::new(model)));
        Self::new(rules, http)
    }

    /// Resolve one post into zero or more fetchable asset URLs
    ///
    /// Walks the chain and applies the first matching rule. A post no rule
    /// recognizes resolves to an empty list, with a diagnostic carrying the
    /// URL and permalink.
    pub async fn resolve(&self, post: &Post) -> Result<Vec<String>> {
        for rule in &self.rules {
            if rule.matches(post) {
                tracing::debug!(rule = rule.name(), url = %post.url, "URL rule matched");
                return rule.resolve(post, &self.http).await;
            }
        }
        tracing::debug!(
            url = %post.url,
            permalink = %post.permalink,
            "No match triggered for this URL"
        );
        Ok(Vec::new())
    }
}
