use crate::catalog::{CatalogEnvelope, CatalogPage, PageRequest};
use crate::error::{Result, ScanError};
use reqwest::header::{COOKIE, HeaderMap, HeaderValue};
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

pub const DEFAULT_CATALOG_BASE: &str = "https://t.cnki.net/rbook-api/v1/book";
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;
pub const DEFAULT_RETRY_INTERVAL: Duration = Duration::from_millis(1000);
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_USER_AGENT: &str = "Lexis/0.1 (https://github.com/trapdoorsec/lexis)";

/// Fixed-interval retry: the same pause after every failed attempt, none after the last.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Attempts including the first one.
    pub max_attempts: u32,
    pub interval: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, interval: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            interval,
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ATTEMPTS, DEFAULT_RETRY_INTERVAL)
    }
}

/// Anything that can hand out one page of a parent's children.
///
/// [`CatalogClient`] is the HTTP implementation; the pager and walker only
/// depend on this trait.
#[allow(async_fn_in_trait)]
pub trait PageSource {
    async fn fetch_page(&self, request: &PageRequest) -> Result<CatalogPage>;
}

/// Settings for the underlying reqwest client.
#[derive(Debug, Clone)]
pub struct HttpOptions {
    pub timeout_secs: u64,
    pub user_agent: String,
    /// Raw `Cookie` header carried over from a browser session.
    pub cookie: Option<String>,
}

impl Default for HttpOptions {
    fn default() -> Self {
        Self {
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            cookie: None,
        }
    }
}

pub fn build_http_client(options: &HttpOptions) -> Result<Client> {
    let mut headers = HeaderMap::new();
    if let Some(cookie) = options.cookie.as_deref().filter(|c| !c.trim().is_empty()) {
        let value = HeaderValue::from_str(cookie.trim())
            .map_err(|e| ScanError::Other(format!("Invalid cookie header: {}", e)))?;
        headers.insert(COOKIE, value);
    }

    let client = Client::builder()
        .user_agent(options.user_agent.as_str())
        .default_headers(headers)
        .timeout(Duration::from_secs(options.timeout_secs))
        .connect_timeout(Duration::from_secs((options.timeout_secs / 2).max(1)))
        .cookie_store(true)
        .redirect(reqwest::redirect::Policy::limited(5))
        .build()?;

    Ok(client)
}

/// Client for one book's catalog endpoint: `{base}/{book_id}/catalog`.
pub struct CatalogClient {
    client: Client,
    catalog_url: Url,
    retry: RetryPolicy,
}

impl CatalogClient {
    pub fn new(base_url: &str, book_id: &str) -> Result<Self> {
        let client = build_http_client(&HttpOptions::default())?;
        Self::with_client(client, base_url, book_id)
    }

    pub fn with_client(client: Client, base_url: &str, book_id: &str) -> Result<Self> {
        Ok(Self {
            client,
            catalog_url: catalog_url(base_url, book_id)?,
            retry: RetryPolicy::default(),
        })
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// GET `url` with `params`, decoding the body as JSON.
    ///
    /// Non-200 statuses, transport errors and undecodable bodies all count as
    /// a failed attempt. After the last attempt the failure is returned as
    /// [`ScanError::RetriesExhausted`] wrapping the last error.
    pub async fn fetch_with_retry<T: DeserializeOwned>(
        &self,
        url: &Url,
        params: &[(&str, String)],
    ) -> Result<T> {
        let max_attempts = self.retry.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            match self.fetch_once(url, params).await {
                Ok(value) => return Ok(value),
                Err(e) => {
                    warn!("Attempt {} failed: {}", attempt, e);
                    if attempt >= max_attempts {
                        return Err(ScanError::RetriesExhausted {
                            attempts: attempt,
                            source: Box::new(e),
                        });
                    }
                    tokio::time::sleep(self.retry.interval).await;
                    attempt += 1;
                }
            }
        }
    }

    async fn fetch_once<T: DeserializeOwned>(
        &self,
        url: &Url,
        params: &[(&str, String)],
    ) -> Result<T> {
        let response = self.client.get(url.clone()).query(params).send().await?;
        let status = response.status();
        let final_url = response.url().to_string();

        if status != StatusCode::OK {
            return Err(ScanError::Status {
                url: final_url,
                status: status.as_u16(),
            });
        }

        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| ScanError::MalformedResponse {
            url: final_url,
            message: e.to_string(),
        })
    }
}

impl PageSource for CatalogClient {
    async fn fetch_page(&self, request: &PageRequest) -> Result<CatalogPage> {
        debug!(
            "Fetching children of '{}' (start={}, size={})",
            request.parent, request.offset, request.page_size
        );
        let envelope: CatalogEnvelope = self
            .fetch_with_retry(&self.catalog_url, &request.query())
            .await?;
        Ok(envelope.into())
    }
}

fn catalog_url(base_url: &str, book_id: &str) -> Result<Url> {
    if book_id.is_empty() {
        return Err(ScanError::InvalidUrl("book id is empty".to_string()));
    }
    let raw = format!("{}/{}/catalog", base_url.trim_end_matches('/'), book_id);
    Url::parse(&raw).map_err(|e| ScanError::InvalidUrl(format!("{}: {}", raw, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{method, path, query_param},
    };

    fn fast_retry() -> RetryPolicy {
        RetryPolicy::new(DEFAULT_MAX_ATTEMPTS, Duration::from_millis(10))
    }

    fn client_for(server: &MockServer) -> CatalogClient {
        CatalogClient::new(&format!("{}/book", server.uri()), "R123")
            .unwrap()
            .with_retry_policy(fast_retry())
    }

    fn page_body() -> serde_json::Value {
        json!({
            "data": {
                "total": 1,
                "data": [{"no": "7", "title": "apple", "hasChild": "Y"}]
            }
        })
    }

    #[test]
    fn test_catalog_url_layout() {
        let url = catalog_url("https://t.cnki.net/rbook-api/v1/book/", "R42").unwrap();
        assert_eq!(url.as_str(), "https://t.cnki.net/rbook-api/v1/book/R42/catalog");
    }

    #[test]
    fn test_catalog_url_rejects_empty_book() {
        assert!(matches!(
            catalog_url(DEFAULT_CATALOG_BASE, ""),
            Err(ScanError::InvalidUrl(_))
        ));
    }

    #[test]
    fn test_retry_policy_needs_one_attempt() {
        assert_eq!(RetryPolicy::new(0, Duration::ZERO).max_attempts, 1);
        assert_eq!(RetryPolicy::default().max_attempts, 5);
        assert_eq!(RetryPolicy::default().interval, Duration::from_millis(1000));
    }

    #[test]
    fn test_invalid_cookie_is_rejected() {
        let options = HttpOptions {
            cookie: Some("bad\nvalue".to_string()),
            ..HttpOptions::default()
        };
        assert!(build_http_client(&options).is_err());
    }

    #[tokio::test]
    async fn test_fetch_page_sends_paging_parameters() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/book/R123/catalog"))
            .and(query_param("start", "1"))
            .and(query_param("size", "500"))
            .and(query_param("code", "abc"))
            .respond_with(ResponseTemplate::new(200).set_body_json(page_body()))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let page = client
            .fetch_page(&PageRequest::first("abc", 500))
            .await
            .unwrap();

        assert_eq!(page.total, 1);
        assert_eq!(page.nodes[0].title, "apple");
    }

    #[tokio::test]
    async fn test_transient_failures_then_success() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/book/R123/catalog"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(4)
            .with_priority(1)
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/book/R123/catalog"))
            .respond_with(ResponseTemplate::new(200).set_body_json(page_body()))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let page = client
            .fetch_page(&PageRequest::first("", 500))
            .await
            .expect("fifth attempt should succeed");

        assert_eq!(page.nodes.len(), 1);
        assert_eq!(server.received_requests().await.unwrap().len(), 5);
    }

    #[tokio::test]
    async fn test_retries_exhausted_after_five_attempts() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/book/R123/catalog"))
            .respond_with(ResponseTemplate::new(500))
            .expect(5)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let err = client
            .fetch_page(&PageRequest::first("", 500))
            .await
            .unwrap_err();

        match &err {
            ScanError::RetriesExhausted { attempts, source } => {
                assert_eq!(*attempts, 5);
                assert!(matches!(**source, ScanError::Status { status: 500, .. }));
            }
            other => panic!("expected exhaustion, got {:?}", other),
        }
        assert_eq!(err.status(), Some(500));
    }

    #[tokio::test]
    async fn test_malformed_body_is_retried_like_network_error() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>login</html>"))
            .expect(2)
            .mount(&server)
            .await;

        let client = client_for(&server)
            .with_retry_policy(RetryPolicy::new(2, Duration::from_millis(5)));
        let err = client
            .fetch_page(&PageRequest::first("", 500))
            .await
            .unwrap_err();

        match err {
            ScanError::RetriesExhausted { attempts, source } => {
                assert_eq!(attempts, 2);
                assert!(matches!(*source, ScanError::MalformedResponse { .. }));
            }
            other => panic!("expected exhaustion, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_non_200_success_status_counts_as_failure() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server)
            .with_retry_policy(RetryPolicy::new(1, Duration::from_millis(5)));
        let err = client
            .fetch_page(&PageRequest::first("", 500))
            .await
            .unwrap_err();

        assert_eq!(err.status(), Some(204));
    }

    #[tokio::test]
    async fn test_cookie_header_is_forwarded() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(wiremock::matchers::header("cookie", "SID=abc"))
            .respond_with(ResponseTemplate::new(200).set_body_json(page_body()))
            .expect(1)
            .mount(&server)
            .await;

        let http = build_http_client(&HttpOptions {
            cookie: Some("SID=abc".to_string()),
            ..HttpOptions::default()
        })
        .unwrap();
        let client = CatalogClient::with_client(http, &format!("{}/book", server.uri()), "R1")
            .unwrap()
            .with_retry_policy(RetryPolicy::new(1, Duration::from_millis(5)));

        assert!(client.fetch_page(&PageRequest::first("", 500)).await.is_ok());
    }
}
