//! Source adapter capability: supplies the ordered post list for an identity
//!
//! The pipeline consumes this as a capability interface. Adapters must make
//! "identity not found" distinguishable from transient failures so callers
//! can clean up an empty target directory instead of retrying.

use crate::error::{Error, Result};
use crate::store::BROWSER_USER_AGENT;
use crate::types::{Identity, IdentityKind, Post};
use async_trait::async_trait;
use serde::Deserialize;

/// Supplies posts for an identity
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    /// List the identity's newest posts, up to `limit`
    async fn list_new_posts(&self, identity: &Identity, limit: Option<u32>) -> Result<Vec<Post>>;

    /// List the identity's posts matching `query`, newest first, up to `limit`
    async fn search_posts(
        &self,
        identity: &Identity,
        query: &str,
        limit: Option<u32>,
    ) -> Result<Vec<Post>>;
}

#[derive(Deserialize)]
struct Listing {
    data: ListingData,
}

#[derive(Deserialize)]
struct ListingData {
    #[serde(default)]
    children: Vec<ListingChild>,
}

#[derive(Deserialize)]
struct ListingChild {
    data: SubmissionData,
}

#[derive(Deserialize)]
struct SubmissionData {
    #[serde(default)]
    url: String,
    #[serde(default)]
    permalink: String,
    #[serde(default)]
    author: Option<String>,
    #[serde(default)]
    subreddit: Option<String>,
}

/// Source adapter over the platform's public JSON listing endpoints
///
/// Reads `/user/<name>/submitted.json` and `/r/<name>/new.json` style feeds.
/// No session handling: whatever access the endpoints grant anonymously (or
/// via ambient client configuration) is what the adapter sees.
pub struct RedditJsonSource {
    http: reqwest::Client,
    base_url: String,
}

impl RedditJsonSource {
    /// Adapter against the production endpoints
    pub fn new(http: reqwest::Client) -> Self {
        Self::with_base_url(http, "https://www.reddit.com")
    }

    /// Adapter against an alternate endpoint root (test seam)
    pub fn with_base_url(http: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into(),
        }
    }

    async fn fetch_listing(&self, identity: &Identity, url: String) -> Result<Vec<Post>> {
        let response = self
            .http
            .get(&url)
            .header(reqwest::header::USER_AGENT, BROWSER_USER_AGENT)
            .send()
            .await?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(Error::IdentityNotFound(identity.name.clone()));
        }
        if !response.status().is_success() {
            return Err(Error::Source(format!(
                "listing request for '{}' failed with status {}",
                identity.name,
                response.status()
            )));
        }

        let listing: Listing = response.json().await?;
        Ok(listing
            .data
            .children
            .into_iter()
            .map(|child| Post {
                url: child.data.url,
                permalink: child.data.permalink,
                author: child.data.author,
                community: child.data.subreddit,
            })
            .collect())
    }
}

fn limit_param(limit: Option<u32>) -> u32 {
    // The platform caps a single listing page at 100 entries.
    limit.unwrap_or(100).min(100)
}

#[async_trait]
impl SourceAdapter for RedditJsonSource {
    async fn list_new_posts(&self, identity: &Identity, limit: Option<u32>) -> Result<Vec<Post>> {
        let url = match identity.kind {
            IdentityKind::User => format!(
                "{}/user/{}/submitted.json?sort=new&limit={}",
                self.base_url,
                identity.name,
                limit_param(limit)
            ),
            IdentityKind::Community => format!(
                "{}/r/{}/new.json?limit={}",
                self.base_url,
                identity.name,
                limit_param(limit)
            ),
        };
        tracing::info!(identity = %identity.name, "Retrieving submission list");
        self.fetch_listing(identity, url).await
    }

    async fn search_posts(
        &self,
        identity: &Identity,
        query: &str,
        limit: Option<u32>,
    ) -> Result<Vec<Post>> {
        let url = format!(
            "{}/r/{}/search.json?q={}&restrict_sr=1&sort=new&limit={}",
            self.base_url,
            identity.name,
            urlencoding::encode(query),
            limit_param(limit)
        );
        tracing::info!(identity = %identity.name, query, "Retrieving filtered submission list");
        self.fetch_listing(identity, url).await
    }
}

#[allow(clippy::unwrap_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const LISTING_BODY: &str = r#"{"data":{"children":[
        {"data":{"url":"https://i.redd.it/a.jpg","permalink":"/r/pics/1",
                 "author":"alice","subreddit":"pics"}},
        {"data":{"url":"https://imgur.com/xyz","permalink":"/r/pics/2",
                 "author":"bob","subreddit":"pics"}}
    ]}}"#;

    #[tokio::test]
    async fn user_listing_parses_posts_in_order() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/user/alice/submitted.json"))
            .respond_with(ResponseTemplate::new(200).set_body_string(LISTING_BODY))
            .mount(&server)
            .await;

        let source = RedditJsonSource::with_base_url(reqwest::Client::new(), server.uri());
        let posts = source
            .list_new_posts(&Identity::user("alice"), Some(10))
            .await
            .unwrap();

        assert_eq!(posts.len(), 2);
        assert_eq!(posts[0].url, "https://i.redd.it/a.jpg");
        assert_eq!(posts[0].author.as_deref(), Some("alice"));
        assert_eq!(posts[0].community.as_deref(), Some("pics"));
        assert_eq!(posts[1].permalink, "/r/pics/2");
    }

    #[tokio::test]
    async fn community_search_hits_the_search_endpoint() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/r/pics/search.json"))
            .and(query_param("q", "sunset photo"))
            .and(query_param("restrict_sr", "1"))
            .and(query_param("sort", "new"))
            .respond_with(ResponseTemplate::new(200).set_body_string(LISTING_BODY))
            .mount(&server)
            .await;

        let source = RedditJsonSource::with_base_url(reqwest::Client::new(), server.uri());
        let posts = source
            .search_posts(&Identity::community("pics"), "sunset photo", None)
            .await
            .unwrap();
        assert_eq!(posts.len(), 2);
    }

    #[tokio::test]
    async fn missing_identity_is_distinguishable() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/user/ghost/submitted.json"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let source = RedditJsonSource::with_base_url(reqwest::Client::new(), server.uri());
        let result = source
            .list_new_posts(&Identity::user("ghost"), None)
            .await;

        assert!(matches!(result, Err(Error::IdentityNotFound(name)) if name == "ghost"));
    }

    #[tokio::test]
    async fn server_error_is_not_identity_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/r/pics/new.json"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let source = RedditJsonSource::with_base_url(reqwest::Client::new(), server.uri());
        let result = source
            .list_new_posts(&Identity::community("pics"), None)
            .await;

        match result {
            Err(e) => assert!(!e.is_identity_not_found()),
            Ok(_) => panic!("expected an error for a 503 listing response"),
        }
    }
}
