//! HTTP client for the catalog API.
//!
//! [`CatalogClient`] issues authenticated GET requests, decodes JSON bodies
//! into DTOs, and retries transient failures with a bounded
//! [`RetryPolicy`]. A parseable `Retry-After` header on a 429 response takes
//! precedence over the computed backoff delay.

use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::{AUTHORIZATION, RETRY_AFTER};
use serde::de::DeserializeOwned;
use tracing::{debug, instrument, warn};
use url::Url;

use super::dto::Page;
use super::error::CatalogError;
use super::paginator::{CollectionPaginator, PageSource, PaginationCursor};
use crate::download::constants::{CONNECT_TIMEOUT_SECS, READ_TIMEOUT_SECS};
use crate::download::{RateGate, RetryDecision, RetryPolicy};
use crate::session::AuthenticatedSession;
use crate::user_agent;

/// Default catalog API base URL.
pub const DEFAULT_BASE_URL: &str = "https://api.spotify.com/v1";

/// Default market used for track relinking.
pub const DEFAULT_MARKET: &str = "from_token";

/// Catalog API client.
///
/// Cheap to clone; clones share the connection pool, session and rate gate.
#[derive(Clone)]
pub struct CatalogClient {
    http: Client,
    base_url: String,
    market: String,
    session: Arc<dyn AuthenticatedSession>,
    retry: RetryPolicy,
    rate_gate: Option<Arc<RateGate>>,
}

impl CatalogClient {
    /// Creates a client for the public catalog API.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Network`] if the HTTP client cannot be built.
    pub fn new(session: Arc<dyn AuthenticatedSession>) -> Result<Self, CatalogError> {
        Self::with_base_url(session, DEFAULT_BASE_URL)
    }

    /// Creates a client with a custom base URL (for testing with wiremock).
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Network`] if the HTTP client cannot be built.
    pub fn with_base_url(
        session: Arc<dyn AuthenticatedSession>,
        base_url: impl Into<String>,
    ) -> Result<Self, CatalogError> {
        Self::with_timeouts(session, base_url, CONNECT_TIMEOUT_SECS, READ_TIMEOUT_SECS)
    }

    /// Creates a client with explicit timeouts.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Network`] if the HTTP client cannot be built.
    pub fn with_timeouts(
        session: Arc<dyn AuthenticatedSession>,
        base_url: impl Into<String>,
        connect_timeout_secs: u64,
        read_timeout_secs: u64,
    ) -> Result<Self, CatalogError> {
        let base_url = base_url.into();
        let http = Client::builder()
            .connect_timeout(Duration::from_secs(connect_timeout_secs))
            .timeout(Duration::from_secs(read_timeout_secs))
            .gzip(true)
            .user_agent(user_agent::default_catalog_user_agent())
            .build()
            .map_err(|e| CatalogError::network(base_url.clone(), e))?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            market: DEFAULT_MARKET.to_string(),
            session,
            retry: RetryPolicy::with_max_attempts(10),
            rate_gate: None,
        })
    }

    /// Sets the retry policy for every request.
    #[must_use]
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Sets the market used for relinking.
    #[must_use]
    pub fn with_market(mut self, market: impl Into<String>) -> Self {
        self.market = market.into();
        self
    }

    /// Reports server backoff to a shared rate gate.
    #[must_use]
    pub fn with_rate_gate(mut self, rate_gate: Arc<RateGate>) -> Self {
        self.rate_gate = Some(rate_gate);
        self
    }

    /// Market sent with track and episode lookups.
    #[must_use]
    pub fn market(&self) -> &str {
        &self.market
    }

    /// Session backing this client.
    #[must_use]
    pub fn session(&self) -> &Arc<dyn AuthenticatedSession> {
        &self.session
    }

    /// Builds an absolute endpoint URL with query parameters.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::HttpStatus`] with status 0 if the URL is malformed.
    pub fn endpoint_url(&self, path: &str, query: &[(&str, &str)]) -> Result<Url, CatalogError> {
        let raw = format!("{}/{}", self.base_url, path.trim_start_matches('/'));
        let mut url = Url::parse(&raw).map_err(|_| CatalogError::HttpStatus {
            url: raw.clone(),
            status: 0,
            retry_after: None,
        })?;
        if !query.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in query {
                pairs.append_pair(key, value);
            }
        }
        Ok(url)
    }

    /// GETs an endpoint and decodes its JSON body, retrying transient failures.
    ///
    /// # Errors
    ///
    /// Returns the last [`CatalogError`] once the retry budget is exhausted or
    /// the failure is not retryable.
    #[instrument(skip(self, query))]
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T, CatalogError> {
        let url = self.endpoint_url(path, query)?;
        let mut attempt = 1;
        loop {
            let error = match self.send_once(&url).await {
                Ok(value) => return Ok(value),
                Err(error) => error,
            };

            match self.retry.should_retry(error.failure_type(), attempt) {
                RetryDecision::Retry {
                    delay,
                    attempt: next,
                } => {
                    let delay = match error.retry_after() {
                        Some(server_delay) => {
                            if let Some(gate) = &self.rate_gate {
                                gate.record_server_backoff(server_delay);
                            }
                            server_delay
                        }
                        None => delay,
                    };
                    warn!(
                        url = %url,
                        attempt,
                        delay_ms = delay.as_millis(),
                        error = %error,
                        "catalog request failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt = next;
                }
                RetryDecision::DoNotRetry { reason } => {
                    debug!(url = %url, attempt, reason = %reason, "catalog request not retried");
                    return Err(error);
                }
            }
        }
    }

    /// Downloads raw bytes from an absolute URL without catalog credentials.
    ///
    /// Used for cover artwork hosted on the image CDN.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError`] on network failure or non-success status.
    #[instrument(skip(self))]
    pub async fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>, CatalogError> {
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| CatalogError::network(url, e))?;
        let status = response.status();
        if !status.is_success() {
            return Err(CatalogError::from_status(url, status.as_u16(), None));
        }
        let bytes = response
            .bytes()
            .await
            .map_err(|e| CatalogError::network(url, e))?;
        debug!(bytes = bytes.len(), "fetched binary resource");
        Ok(bytes.to_vec())
    }

    /// Starts a paginated traversal of `path`.
    #[must_use]
    pub fn paginate<T>(&self, path: impl Into<String>, limit: u32) -> CollectionPaginator<T>
    where
        T: DeserializeOwned + Send + 'static,
    {
        self.paginate_with_query(path, Vec::new(), limit)
    }

    /// Starts a paginated traversal of `path` with extra query parameters.
    #[must_use]
    pub fn paginate_with_query<T>(
        &self,
        path: impl Into<String>,
        query: Vec<(String, String)>,
        limit: u32,
    ) -> CollectionPaginator<T>
    where
        T: DeserializeOwned + Send + 'static,
    {
        CollectionPaginator::new(
            EndpointPages {
                client: self.clone(),
                path: path.into(),
                query,
                _item: PhantomData,
            },
            limit,
        )
    }

    async fn send_once<T: DeserializeOwned>(&self, url: &Url) -> Result<T, CatalogError> {
        let token = self
            .session
            .access_token()
            .await
            .map_err(|source| CatalogError::Session { source })?;

        let response = self
            .http
            .get(url.clone())
            .header(AUTHORIZATION, format!("Bearer {token}"))
            .send()
            .await
            .map_err(|e| CatalogError::network(url.as_str(), e))?;

        let status = response.status();
        if !status.is_success() {
            let retry_after = response
                .headers()
                .get(RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .map(ToString::to_string);
            return Err(CatalogError::from_status(
                url.as_str(),
                status.as_u16(),
                retry_after,
            ));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| CatalogError::network(url.as_str(), e))?;
        serde_json::from_slice(&body).map_err(|e| CatalogError::decode(url.as_str(), e))
    }
}

impl std::fmt::Debug for CatalogClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CatalogClient")
            .field("base_url", &self.base_url)
            .field("market", &self.market)
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}

/// Page source backed by a catalog endpoint returning [`Page`] bodies.
struct EndpointPages<T> {
    client: CatalogClient,
    path: String,
    query: Vec<(String, String)>,
    _item: PhantomData<fn() -> T>,
}

#[async_trait]
impl<T> PageSource<T> for EndpointPages<T>
where
    T: DeserializeOwned + Send + 'static,
{
    fn describe(&self) -> String {
        self.path.clone()
    }

    async fn fetch_page(&self, cursor: PaginationCursor) -> Result<Vec<T>, CatalogError> {
        let offset = cursor.offset.to_string();
        let limit = cursor.limit.to_string();
        let mut query: Vec<(&str, &str)> = self
            .query
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();
        query.push(("offset", &offset));
        query.push(("limit", &limit));

        let page: Page<T> = self.client.get_json(&self.path, &query).await?;
        Ok(page.items)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::session::{AccountTier, StaticTokenSession};

    fn client(base: &str) -> CatalogClient {
        let session = Arc::new(StaticTokenSession::new("t", AccountTier::Free).unwrap());
        CatalogClient::with_base_url(session, base).unwrap()
    }

    #[test]
    fn test_endpoint_url_joins_and_encodes() {
        let client = client("https://api.example.com/v1/");
        let url = client
            .endpoint_url("/search", &[("q", "daft punk & co"), ("limit", "5")])
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://api.example.com/v1/search?q=daft+punk+%26+co&limit=5"
        );
    }

    #[test]
    fn test_debug_omits_session() {
        let client = client("https://api.example.com/v1");
        let debug = format!("{client:?}");
        assert!(debug.contains("api.example.com"));
        assert!(!debug.contains("session"));
    }
}
