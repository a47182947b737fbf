//! HTTP page source for Confluence-style wiki REST APIs.
//!
//! Fetches page bodies via
//! `{api_base}/rest/api/content/{id}?expand=body.storage` and maps HTTP
//! status codes onto the [`FetchError`] taxonomy. Transient failures are
//! retried here with exponential backoff; callers never retry.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use super::{FetchError, PageSource};

/// Retry attempts for transient failures (network, 5xx, 429)
const MAX_RETRIES: u32 = 2;

/// Base backoff between retries, doubled each attempt
const RETRY_BACKOFF: Duration = Duration::from_millis(500);

/// Per-request timeout
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, Deserialize)]
struct PageBody {
    storage: StorageBody,
}

#[derive(Debug, Deserialize)]
struct StorageBody {
    value: String,
}

#[derive(Debug, Deserialize)]
struct PageResponse {
    body: PageBody,
}

/// [`PageSource`] backed by a Confluence REST endpoint.
pub struct HttpPageSource {
    client: reqwest::Client,
    api_base: String,
    bearer_token: Option<String>,
}

impl HttpPageSource {
    /// Create a source for the given API base, e.g.
    /// `https://co.atlassian.net/wiki`.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client cannot be built.
    pub fn new(api_base: impl Into<String>) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            client,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            bearer_token: None,
        })
    }

    /// Attach a bearer token for authenticated wikis.
    #[must_use]
    pub fn with_bearer_token(mut self, token: impl Into<String>) -> Self {
        self.bearer_token = Some(token.into());
        self
    }

    fn page_url(&self, page_id: &str) -> String {
        format!(
            "{}/rest/api/content/{page_id}?expand=body.storage",
            self.api_base
        )
    }

    async fn fetch_once(&self, page_id: &str) -> Result<String, FetchError> {
        let url = self.page_url(page_id);
        let mut request = self.client.get(&url);
        if let Some(token) = &self.bearer_token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| FetchError::Network(format!("{url}: {e}")))?;

        let status = response.status();
        if status.is_success() {
            let page: PageResponse = response
                .json()
                .await
                .map_err(|e| FetchError::Server(format!("malformed page payload: {e}")))?;
            return Ok(page.body.storage.value);
        }

        Err(match status.as_u16() {
            401 | 403 => FetchError::Auth(format!("{status} for page {page_id}")),
            404 => FetchError::NotFound(format!("page {page_id}")),
            429 => FetchError::RateLimit(format!("page {page_id}")),
            s if s >= 500 => FetchError::Server(format!("{status} for page {page_id}")),
            _ => FetchError::Server(format!("unexpected {status} for page {page_id}")),
        })
    }
}

#[async_trait]
impl PageSource for HttpPageSource {
    async fn fetch_page(&self, page_id: &str) -> Result<String, FetchError> {
        let mut backoff = RETRY_BACKOFF;
        let mut attempt = 0;
        loop {
            match self.fetch_once(page_id).await {
                Ok(content) => return Ok(content),
                Err(err) if err.is_transient() && attempt < MAX_RETRIES => {
                    attempt += 1;
                    log::debug!(
                        "transient {} fetching page {page_id}, retry {attempt}/{MAX_RETRIES} in {backoff:?}",
                        err.kind()
                    );
                    tokio::time::sleep(backoff).await;
                    backoff *= 2;
                }
                Err(err) => return Err(err),
            }
        }
    }
}
