//! The built-in host rules

use super::UrlRule;
use crate::error::{Error, Result};
use crate::segmenter::LanguageModel;
use crate::store::BROWSER_USER_AGENT;
use crate::types::{MEDIA_EXTENSIONS, Post};
use async_trait::async_trait;
use regex::Regex;
use scraper::{Html, Selector};
use serde::Deserialize;
use std::sync::Arc;

/// Last path segment of a URL (the host slug or album identifier)
fn last_segment(url: &str) -> &str {
    url.trim_end_matches('/').rsplit('/').next().unwrap_or(url)
}

/// Rule 1: the URL is itself a direct media file link
pub struct DirectFileRule {
    extensions: Vec<&'static str>,
}

impl Default for DirectFileRule {
    fn default() -> Self {
        Self {
            extensions: MEDIA_EXTENSIONS.to_vec(),
        }
    }
}

#[async_trait]
impl UrlRule for DirectFileRule {
    fn name(&self) -> &'static str {
        "direct-file"
    }

    fn matches(&self, post: &Post) -> bool {
        self.extensions.iter().any(|ext| post.url.ends_with(ext))
    }

    async fn resolve(&self, post: &Post, _http: &reqwest::Client) -> Result<Vec<String>> {
        Ok(vec![post.url.clone()])
    }
}

/// Rule 2: platform-native paginated gallery
///
/// Fetches the gallery page and keeps every anchor that opens in a new tab
/// and points at a preview asset.
pub struct GalleryRule {
    preview_href: Regex,
}

impl GalleryRule {
    /// Build the rule with the standard preview-asset pattern
    pub fn new() -> Self {
        // Anchors on gallery pages link previews through this host.
        #[allow(clippy::expect_used)]
        let preview_href = Regex::new(r"preview\.redd\.it").expect("static pattern");
        Self { preview_href }
    }

    fn extract_links(&self, html: &str) -> Result<Vec<String>> {
        let selector = Selector::parse(r#"a[target="_blank"]"#)
            .map_err(|e| Error::Resolve(format!("gallery selector: {e}")))?;
        let document = Html::parse_document(html);
        Ok(document
            .select(&selector)
            .filter_map(|anchor| anchor.value().attr("href"))
            .filter(|href| self.preview_href.is_match(href))
            .map(str::to_string)
            .collect())
    }
}

impl Default for GalleryRule {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl UrlRule for GalleryRule {
    fn name(&self) -> &'static str {
        "gallery"
    }

    fn matches(&self, post: &Post) -> bool {
        post.url.contains("reddit.com/gallery")
    }

    async fn resolve(&self, post: &Post, http: &reqwest::Client) -> Result<Vec<String>> {
        let body = http
            .get(&post.url)
            .header(reqwest::header::USER_AGENT, BROWSER_USER_AGENT)
            .send()
            .await?
            .text()
            .await?;
        // Parsing happens outside any await so the non-Send DOM never
        // crosses a suspension point.
        self.extract_links(&body)
    }
}

#[derive(Deserialize)]
struct AlbumResponse {
    #[serde(default)]
    data: AlbumData,
}

#[derive(Deserialize, Default)]
struct AlbumData {
    #[serde(default)]
    images: Vec<AlbumImage>,
}

#[derive(Deserialize)]
struct AlbumImage {
    hash: String,
    ext: String,
}

/// Rule 3: third-party multi-image album
///
/// Extracts the album identifier, asks the host's album-listing endpoint for
/// the image list, and builds one CDN URL per image.
pub struct ImgurAlbumRule {
    api_base: String,
}

impl ImgurAlbumRule {
    /// Build the rule against the production album-listing endpoint
    pub fn new() -> Self {
        Self::with_api_base("https://imgur.com")
    }

    /// Build the rule against an alternate endpoint (test seam)
    pub fn with_api_base(api_base: impl Into<String>) -> Self {
        Self {
            api_base: api_base.into(),
        }
    }
}

impl Default for ImgurAlbumRule {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl UrlRule for ImgurAlbumRule {
    fn name(&self) -> &'static str {
        "imgur-album"
    }

    fn matches(&self, post: &Post) -> bool {
        post.url.contains("imgur.com/a/")
    }

    async fn resolve(&self, post: &Post, http: &reqwest::Client) -> Result<Vec<String>> {
        let album_id = last_segment(&post.url);
        let listing = format!("{}/ajaxalbums/getimages/{album_id}", self.api_base);
        let response: AlbumResponse = http
            .get(&listing)
            .header(reqwest::header::USER_AGENT, BROWSER_USER_AGENT)
            .send()
            .await?
            .json()
            .await?;
        Ok(response
            .data
            .images
            .into_iter()
            .map(|image| format!("https://i.imgur.com/{}{}", image.hash, image.ext))
            .collect())
    }
}

/// Rule 4: third-party single image behind a pageview URL
///
/// The CDN serves the raw image at the same identifier with a fixed `.jpg`
/// extension.
pub struct ImgurImageRule;

#[async_trait]
impl UrlRule for ImgurImageRule {
    fn name(&self) -> &'static str {
        "imgur-image"
    }

    fn matches(&self, post: &Post) -> bool {
        post.url.contains("imgur.com/")
    }

    async fn resolve(&self, post: &Post, _http: &reqwest::Client) -> Result<Vec<String>> {
        let image_id = last_segment(&post.url);
        Ok(vec![format!("https://i.imgur.com/{image_id}.jpg")])
    }
}

/// Rule 5: configurable title-derived rule
///
/// Active when a configured trigger substring appears in the URL. The
/// trailing slug is segmented into words, camel-cased, and combined with the
/// configured prefix into a single `.mp4` asset URL.
pub struct SlugTriggerRule {
    trigger: String,
    prefix: String,
    model: Arc<LanguageModel>,
}

impl SlugTriggerRule {
    /// Build the rule for one trigger/prefix pair
    pub fn new(trigger: String, prefix: String, model: Arc<LanguageModel>) -> Self {
        Self {
            trigger,
            prefix,
            model,
        }
    }
}

#[async_trait]
impl UrlRule for SlugTriggerRule {
    fn name(&self) -> &'static str {
        "slug-trigger"
    }

    fn matches(&self, post: &Post) -> bool {
        post.url.contains(&self.trigger)
    }

    async fn resolve(&self, post: &Post, _http: &reqwest::Client) -> Result<Vec<String>> {
        let slug = self.model.camel_slug(last_segment(&post.url));
        Ok(vec![format!("{}{slug}.mp4", self.prefix)])
    }
}

/// Rule 6: short-form video host addressed by a concatenated-word slug
pub struct GfycatRule {
    model: Arc<LanguageModel>,
}

impl GfycatRule {
    /// Build the rule with the segmentation model it needs
    pub fn new(model: Arc<LanguageModel>) -> Self {
        Self { model }
    }
}

#[async_trait]
impl UrlRule for GfycatRule {
    fn name(&self) -> &'static str {
        "gfycat"
    }

    fn matches(&self, post: &Post) -> bool {
        post.url.contains("gfycat.com/")
    }

    async fn resolve(&self, post: &Post, _http: &reqwest::Client) -> Result<Vec<String>> {
        let slug = self.model.camel_slug(last_segment(&post.url));
        Ok(vec![format!("https://giant.gfycat.com/{slug}.webm")])
    }
}
