//! Client for the catalog API.
//!
//! Every call is reduced to a [`Fetched`]: the record, a definite "does not
//! exist", or a transient failure whose cause is for the logs only.

use std::time::Duration;

use platify::models::{Product, ProductList, Recipe, RecipeResponse};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;

/// Upper bound on a whole upstream exchange, body included.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Outcome of fetching one resource.
#[derive(Debug)]
pub enum Fetched<T> {
    Found(T),
    NotFound,
    TransientError(FetchError),
}

impl<T> Fetched<T> {
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Fetched<U> {
        match self {
            Fetched::Found(value) => Fetched::Found(f(value)),
            Fetched::NotFound => Fetched::NotFound,
            Fetched::TransientError(err) => Fetched::TransientError(err),
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum FetchError {
    #[error("timed out")]
    Timeout,
    #[error("transport error: {0}")]
    Transport(#[source] reqwest::Error),
    #[error("unexpected status {0}")]
    UnexpectedStatus(StatusCode),
    #[error("reading response body: {0}")]
    Body(#[source] reqwest::Error),
    #[error("decode failure: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("reading fixture: {0}")]
    Fixture(#[from] std::io::Error),
}

impl FetchError {
    fn from_reqwest(err: reqwest::Error, reading_body: bool) -> Self {
        if err.is_timeout() {
            FetchError::Timeout
        } else if reading_body {
            FetchError::Body(err)
        } else {
            FetchError::Transport(err)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum ResourceKind {
    Recipe,
    Product,
    ProductList,
}

/// Build `{base}/{collection}/{id}` with the id escaped as a single path segment.
///
/// Returns `None` when the id cannot stand for one segment: URL parsers
/// resolve `.` and `..` (escaped or not) as relative references.
pub fn resource_url(base: &str, collection: &str, id: &str) -> Option<String> {
    let is_dot_segment = matches!(id.to_ascii_lowercase().as_str(), "." | ".." | "%2e" | "%2e%2e" | ".%2e" | "%2e.");
    if id.is_empty() || is_dot_segment {
        return None;
    }
    Some(format!(
        "{}/{}/{}",
        base.trim_end_matches('/'),
        collection,
        url_escape::encode_component(id)
    ))
}

#[derive(Clone, Debug)]
pub struct UpstreamClient {
    http: reqwest::Client,
    base_url: String,
}

impl UpstreamClient {
    pub fn new(base_url: &str) -> reqwest::Result<Self> {
        Self::with_timeout(base_url, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(base_url: &str, timeout: Duration) -> reqwest::Result<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn fetch_recipe(&self, id: &str) -> Fetched<Recipe> {
        match resource_url(&self.base_url, "recipes", id) {
            Some(url) => self.get_json::<RecipeResponse>(&url).await.map(|r| r.recipe),
            None => Fetched::NotFound,
        }
    }

    pub async fn fetch_product(&self, id: &str) -> Fetched<Product> {
        match resource_url(&self.base_url, "products", id) {
            Some(url) => self.get_json(&url).await,
            None => Fetched::NotFound,
        }
    }

    pub async fn fetch_products(&self) -> Fetched<Vec<Product>> {
        let url = format!("{}/products", self.base_url);
        self.get_json::<ProductList>(&url).await.map(Vec::<Product>::from)
    }

    /// One GET, classified. Never retried.
    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Fetched<T> {
        tracing::debug!(url, "fetching from upstream");
        let response = match self.http.get(url).send().await {
            Ok(response) => response,
            Err(err) => return Fetched::TransientError(FetchError::from_reqwest(err, false)),
        };
        match response.status() {
            StatusCode::OK => {}
            // The body of a 404 is never looked at
            StatusCode::NOT_FOUND => return Fetched::NotFound,
            status => return Fetched::TransientError(FetchError::UnexpectedStatus(status)),
        }
        let body = match response.bytes().await {
            Ok(body) => body,
            Err(err) => return Fetched::TransientError(FetchError::from_reqwest(err, true)),
        };
        match serde_json::from_slice(&body) {
            Ok(value) => Fetched::Found(value),
            Err(err) => Fetched::TransientError(FetchError::Decode(err)),
        }
    }
}
