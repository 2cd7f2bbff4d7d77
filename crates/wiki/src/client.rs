//! MediaWiki action API client.

use std::time::Duration;

use async_trait::async_trait;
use exn::ResultExt;
use reqwest::{Client, StatusCode, Url};
use serde::de::DeserializeOwned;
use tracing::instrument;

use crate::error::{ErrorKind, Result};
use crate::models::{self, PageResponse, SearchHit, SearchResponse};
use crate::source::PageSource;

pub const DEFAULT_API_URL: &str = "https://www.theiphonewiki.com/w/api.php";
pub const DEFAULT_USER_AGENT: &str = concat!("betas/", env!("CARGO_PKG_VERSION"));

/// Retry delays stop doubling after this many retries.
const MAX_BACKOFF_EXPONENT: u32 = 6;

#[derive(Debug, Clone)]
pub struct ClientOptions {
    pub api_url: String,
    pub user_agent: String,
    pub timeout: Duration,
    /// Attempts made after the first one fails with a retryable error.
    pub max_retries: u32,
    /// Delay before the first retry; doubles for each one after.
    pub retry_delay: Duration,
}
impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout: Duration::from_secs(30),
            max_retries: 3,
            retry_delay: Duration::from_millis(500),
        }
    }
}

/// [`PageSource`] backed by a MediaWiki `api.php` endpoint.
#[derive(Debug, Clone)]
pub struct MediaWikiClient {
    http: Client,
    endpoint: Url,
    options: ClientOptions,
}
impl MediaWikiClient {
    pub fn new(options: ClientOptions) -> Result<Self> {
        let endpoint =
            Url::parse(&options.api_url).or_raise(|| ErrorKind::InvalidEndpoint(options.api_url.clone()))?;
        let http = Client::builder()
            .user_agent(&options.user_agent)
            .timeout(options.timeout)
            .build()
            .or_raise(|| ErrorKind::Network("failed to build HTTP client".to_string()))?;
        Ok(Self { http, endpoint, options })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Runs one API query, retrying retryable failures with exponential backoff.
    async fn query<T: DeserializeOwned>(&self, params: &[(&str, String)]) -> Result<T> {
        let mut attempt = 0;
        loop {
            match self.request(params).await {
                Ok(body) => return Ok(body),
                Err(err) if err.is_retryable() && attempt < self.options.max_retries => {
                    let delay = self.options.retry_delay * 2u32.pow(attempt.min(MAX_BACKOFF_EXPONENT));
                    tracing::warn!(attempt, ?delay, error = %err, "Retrying wiki request");
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                },
                Err(err) => return Err(err),
            }
        }
    }

    async fn request<T: DeserializeOwned>(&self, params: &[(&str, String)]) -> Result<T> {
        let response = self
            .http
            .get(self.endpoint.clone())
            .query(&[("format", "json"), ("formatversion", "2")])
            .query(params)
            .send()
            .await
            .or_raise(|| ErrorKind::Network(format!("request to {} failed", self.endpoint)))?;
        let status = response.status();
        if is_retryable_status(status) {
            exn::bail!(ErrorKind::Network(format!("HTTP {status}")));
        }
        if !status.is_success() {
            exn::bail!(ErrorKind::Api { code: status.as_u16().to_string(), info: status.to_string() });
        }
        let body = response
            .text()
            .await
            .or_raise(|| ErrorKind::Network(format!("failed to read response from {}", self.endpoint)))?;
        models::decode(&body)
    }
}

fn is_retryable_status(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

#[async_trait]
impl PageSource for MediaWikiClient {
    #[instrument(skip(self), fields(hits))]
    async fn search(&self, prefix: &str) -> Result<Vec<SearchHit>> {
        let mut hits = Vec::new();
        let mut continuation: Option<(u64, String)> = None;
        loop {
            let mut params = vec![
                ("action", "query".to_string()),
                ("list", "search".to_string()),
                ("srsearch", prefix.to_string()),
                ("srlimit", "max".to_string()),
                ("srprop", String::new()),
            ];
            if let Some((offset, token)) = &continuation {
                params.push(("sroffset", offset.to_string()));
                params.push(("continue", token.clone()));
            }
            let response: SearchResponse = self.query(&params).await?;
            hits.extend(response.query.search);
            match response.continuation {
                Some(next) => continuation = Some((next.sroffset, next.token)),
                None => break,
            }
        }
        tracing::Span::current().record("hits", hits.len());
        Ok(hits)
    }

    #[instrument(skip(self), fields(size))]
    async fn fetch(&self, title: &str) -> Result<String> {
        let params = [
            ("action", "query".to_string()),
            ("prop", "revisions".to_string()),
            ("rvprop", "content".to_string()),
            ("rvslots", "main".to_string()),
            ("titles", title.to_string()),
        ];
        let response: PageResponse = self.query(&params).await?;
        let content = response.into_content(title)?;
        tracing::Span::current().record("size", content.len());
        Ok(content)
    }
}
