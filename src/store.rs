//! Fetch-dedup-persist stage: one asset URL in, at most one file out
//!
//! The steps run in a fixed short-circuit order: cheap filename pre-check,
//! fetch, content hash, atomic dedup claims, size threshold, write, optional
//! provenance stamping. Claims happen before the size check on purpose — a
//! persistently-too-small placeholder response is recorded as seen so it is
//! never fetched again within or across runs of the same process.

use crate::dedup::DedupState;
use crate::error::{Error, Result};
use crate::types::{PersistOutcome, Post};
use little_exif::exif_tag::ExifTag;
use little_exif::metadata::Metadata;
use std::path::Path;

/// Browser identification sent with every asset fetch
///
/// Some hosts reject requests carrying a default HTTP-library user agent.
pub const BROWSER_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:85.0) Gecko/20100101 Firefox/85.0";

/// Last path segment of an asset URL with any query string and trailing
/// slashes stripped
///
/// This is the "original filename" identity of a stored asset. Scheme-less
/// URLs (as some sources emit) fall back to plain string splitting.
#[must_use]
pub fn original_filename(asset_url: &str) -> String {
    let trimmed = asset_url.trim_end_matches('/');
    if let Ok(parsed) = url::Url::parse(trimmed)
        && let Some(mut segments) = parsed.path_segments()
        && let Some(last) = segments.next_back()
        && !last.is_empty()
    {
        return last.to_string();
    }
    let last = trimmed.rsplit('/').next().unwrap_or(trimmed);
    let last = last.split('?').next().unwrap_or(last);
    last.to_string()
}

/// Whether a filename refers to a still image that can carry EXIF provenance
///
/// Video and animation containers (and PNG, which has no EXIF block worth
/// writing here) are left untouched.
fn is_still_image(name: &str) -> bool {
    let lower = name.to_lowercase();
    lower.ends_with(".jpg") || lower.ends_with(".jpeg")
}

/// Download one asset and persist it under `base_path` if it is new
///
/// Returns which outcome applied; only a failed fetch is an error. The file
/// is written as `<content_hash>_<original_filename>` so dedup state can be
/// reconstructed from the directory listing on the next run.
pub async fn persist(
    http: &reqwest::Client,
    asset_url: &str,
    post: &Post,
    dedup: &DedupState,
    base_path: &Path,
    min_bytes: u64,
) -> Result<PersistOutcome> {
    let original = original_filename(asset_url);

    // Known filename: skip before spending any bandwidth.
    if dedup.contains_filename(&original) {
        return Ok(PersistOutcome::SkippedKnownName);
    }

    let response = http
        .get(asset_url)
        .header(reqwest::header::USER_AGENT, BROWSER_USER_AGENT)
        .send()
        .await?;
    let bytes = response.bytes().await?;

    let content_hash = format!("{:x}", md5::compute(&bytes));

    // Atomic insert-if-absent on both key spaces. The first claimant owns
    // the write; racers observe the claim and skip.
    if !dedup.try_claim_hash(&content_hash) {
        return Ok(PersistOutcome::SkippedKnownHash);
    }
    if !dedup.try_claim_filename(&original) {
        // A racer took the name after our pre-check. Nothing was written for
        // these bytes, so the hash claim must not outlive this attempt.
        dedup.release_hash(&content_hash);
        return Ok(PersistOutcome::SkippedKnownName);
    }

    if (bytes.len() as u64) < min_bytes {
        tracing::debug!(
            url = asset_url,
            size = bytes.len(),
            threshold = min_bytes,
            "Skipping undersized payload"
        );
        return Ok(PersistOutcome::SkippedTooSmall);
    }

    let target = base_path.join(format!("{content_hash}_{original}"));
    tokio::fs::write(&target, &bytes).await?;

    if is_still_image(&original)
        && let Err(e) = embed_provenance(&target, post)
    {
        // Non-fatal: the media file on disk is already valid.
        tracing::debug!(
            file = %target.display(),
            error = %e,
            "Failed to write provenance metadata"
        );
    }

    Ok(PersistOutcome::Written)
}

/// Stamp author and source-community identity into a still image's EXIF
/// descriptive fields, rewriting the file in place
fn embed_provenance(path: &Path, post: &Post) -> Result<()> {
    if post.author.is_none() && post.community.is_none() {
        return Ok(());
    }

    let mut metadata = Metadata::new();
    if let Some(author) = &post.author {
        metadata.set_tag(ExifTag::Artist(author.clone()));
    }
    if let Some(community) = &post.community {
        metadata.set_tag(ExifTag::ImageDescription(community.clone()));
    }
    metadata
        .write_to_file(path)
        .map_err(|e| Error::Provenance(format!("{}: {}", path.display(), e)))?;
    Ok(())
}

#[allow(clippy::unwrap_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::MEDIA_EXTENSIONS;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn post() -> Post {
        Post::new("", "")
    }

    async fn serve(body: &[u8], route: &str) -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(route.to_string()))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(body.to_vec()))
            .mount(&server)
            .await;
        server
    }

    #[test]
    fn original_filename_is_last_segment_without_query() {
        assert_eq!(original_filename("https://h.example/a/b/cat.jpg"), "cat.jpg");
        assert_eq!(
            original_filename("https://h.example/cat.jpg?width=640&crop=smart"),
            "cat.jpg"
        );
        assert_eq!(original_filename("cat.jpg"), "cat.jpg");
    }

    #[test]
    fn original_filename_ignores_trailing_slashes() {
        assert_eq!(original_filename("https://h.example/a/cat.jpg/"), "cat.jpg");
        assert_eq!(original_filename("https://h.example/a/b//"), "b");
    }

    #[tokio::test]
    async fn persist_writes_new_asset_with_hash_prefix() {
        let body = vec![7u8; 64];
        let server = serve(&body, "/media/cat.gif").await;
        let dir = tempfile::tempdir().unwrap();
        let dedup = DedupState::initialize(dir.path(), MEDIA_EXTENSIONS)
            .await
            .unwrap();

        let url = format!("{}/media/cat.gif", server.uri());
        let outcome = persist(
            &reqwest::Client::new(),
            &url,
            &post(),
            &dedup,
            dir.path(),
            16,
        )
        .await
        .unwrap();

        assert_eq!(outcome, PersistOutcome::Written);
        let expected = format!("{:x}_cat.gif", md5::compute(&body));
        assert!(dir.path().join(&expected).is_file());
    }

    #[tokio::test]
    async fn known_filename_skips_without_fetching() {
        let server = MockServer::start().await;
        // No mounted mock: any request would 404, but none must be made.
        let dedup = DedupState::default();
        assert!(dedup.try_claim_filename("cat.jpg"));
        let dir = tempfile::tempdir().unwrap();

        let url = format!("{}/cat.jpg", server.uri());
        let outcome = persist(
            &reqwest::Client::new(),
            &url,
            &post(),
            &dedup,
            dir.path(),
            1,
        )
        .await
        .unwrap();

        assert_eq!(outcome, PersistOutcome::SkippedKnownName);
        assert_eq!(server.received_requests().await.unwrap().len(), 0);
    }

    #[tokio::test]
    async fn same_bytes_under_new_name_skip_as_known_hash() {
        let body = vec![3u8; 128];
        let server = MockServer::start().await;
        for route in ["/one.gif", "/two.gif"] {
            Mock::given(method("GET"))
                .and(path(route))
                .respond_with(ResponseTemplate::new(200).set_body_bytes(body.clone()))
                .mount(&server)
                .await;
        }
        let dir = tempfile::tempdir().unwrap();
        let dedup = DedupState::default();
        let http = reqwest::Client::new();

        let first = persist(
            &http,
            &format!("{}/one.gif", server.uri()),
            &post(),
            &dedup,
            dir.path(),
            1,
        )
        .await
        .unwrap();
        let second = persist(
            &http,
            &format!("{}/two.gif", server.uri()),
            &post(),
            &dedup,
            dir.path(),
            1,
        )
        .await
        .unwrap();

        assert_eq!(first, PersistOutcome::Written);
        assert_eq!(second, PersistOutcome::SkippedKnownHash);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[tokio::test]
    async fn size_threshold_boundary() {
        let body = vec![9u8; 100];
        let dir = tempfile::tempdir().unwrap();
        let http = reqwest::Client::new();

        // Exactly at the threshold: written.
        let server = serve(&body, "/a.gif").await;
        let dedup = DedupState::default();
        let outcome = persist(
            &http,
            &format!("{}/a.gif", server.uri()),
            &post(),
            &dedup,
            dir.path(),
            100,
        )
        .await
        .unwrap();
        assert_eq!(outcome, PersistOutcome::Written);

        // One under the threshold: skipped, nothing new written.
        let server = serve(&body, "/b.gif").await;
        let dedup = DedupState::default();
        let outcome = persist(
            &http,
            &format!("{}/b.gif", server.uri()),
            &post(),
            &dedup,
            dir.path(),
            101,
        )
        .await
        .unwrap();
        assert_eq!(outcome, PersistOutcome::SkippedTooSmall);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[tokio::test]
    async fn too_small_asset_is_never_refetched() {
        let body = vec![1u8; 4];
        let server = serve(&body, "/tiny.gif").await;
        let dir = tempfile::tempdir().unwrap();
        let dedup = DedupState::default();
        let http = reqwest::Client::new();
        let url = format!("{}/tiny.gif", server.uri());

        let first = persist(&http, &url, &post(), &dedup, dir.path(), 100)
            .await
            .unwrap();
        let second = persist(&http, &url, &post(), &dedup, dir.path(), 100)
            .await
            .unwrap();

        assert_eq!(first, PersistOutcome::SkippedTooSmall);
        // The claim made during the first attempt short-circuits the retry
        // before any network call.
        assert_eq!(second, PersistOutcome::SkippedKnownName);
        assert_eq!(server.received_requests().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn losing_the_filename_race_releases_the_hash_claim() {
        let body = vec![6u8; 64];
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/cat.gif"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_bytes(body.clone())
                    .set_delay(std::time::Duration::from_millis(500)),
            )
            .mount(&server)
            .await;
        let dir = tempfile::tempdir().unwrap();
        let dedup = std::sync::Arc::new(DedupState::default());
        let url = format!("{}/cat.gif", server.uri());

        let attempt = {
            let dedup = dedup.clone();
            let base = dir.path().to_path_buf();
            let url = url.clone();
            tokio::spawn(async move {
                persist(&reqwest::Client::new(), &url, &Post::new("", ""), &dedup, &base, 1).await
            })
        };
        // Take the filename while the fetch is still in flight, after the
        // attempt has passed its pre-check.
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;
        assert!(dedup.try_claim_filename("cat.gif"));

        let outcome = attempt.await.unwrap().unwrap();
        assert_eq!(outcome, PersistOutcome::SkippedKnownName);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
        // The bytes stay persistable under another name.
        assert!(dedup.try_claim_hash(&format!("{:x}", md5::compute(&body))));
    }

    #[tokio::test]
    async fn concurrent_persists_of_same_asset_write_once() {
        let body = vec![5u8; 256];
        let server = serve(&body, "/race.gif").await;
        let dir = tempfile::tempdir().unwrap();
        let dedup = std::sync::Arc::new(DedupState::default());
        let http = reqwest::Client::new();
        let url = format!("{}/race.gif", server.uri());
        let base = dir.path().to_path_buf();

        let mut handles = Vec::new();
        for _ in 0..8 {
            let http = http.clone();
            let url = url.clone();
            let dedup = dedup.clone();
            let base = base.clone();
            handles.push(tokio::spawn(async move {
                persist(&http, &url, &Post::new("", ""), &dedup, &base, 1).await
            }));
        }

        let mut written = 0;
        for handle in handles {
            if handle.await.unwrap().unwrap() == PersistOutcome::Written {
                written += 1;
            }
        }
        assert_eq!(written, 1, "exactly one racer may write");
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }
}
