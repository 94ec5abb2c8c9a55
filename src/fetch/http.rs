//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests made by fetch-type pages:
//! - Building the shared HTTP client with timeouts and user agent
//! - Applying per-page headers to each request
//! - Classifying failures into task failure values

use crate::fetch::{FetchKind, FetchRequest, Fetcher, Headers};
use crate::pool::{Payload, TaskFailure, TaskOutcome};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::Client;
use std::time::Duration;

/// User agent sent when the plan does not configure one
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/101.0.4951.67 Safari/537.36";

/// HTTP client settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpConfig {
    /// Total time allowed for one request
    pub timeout: Duration,

    /// Time allowed to establish a connection
    pub connect_timeout: Duration,

    /// Client-level user agent; a `User-Agent` request header overrides it
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `config` - Timeouts and user agent
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
pub fn build_http_client(config: &HttpConfig) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.user_agent.clone())
        .timeout(config.timeout)
        .connect_timeout(config.connect_timeout)
        .gzip(true)
        .brotli(true)
        .build()
}

/// Fetcher issuing GET requests through a shared reqwest client
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(config: &HttpConfig) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: build_http_client(config)?,
        })
    }

    pub fn from_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, request: FetchRequest) -> TaskOutcome {
        let response = self
            .client
            .get(&request.url)
            .headers(to_header_map(&request.headers))
            .send()
            .await
            .map_err(classify_error)?;

        let status = response.status();
        if !status.is_success() {
            tracing::debug!("GET {} returned {}", request.url, status);
            return Err(TaskFailure::Http {
                status: status.as_u16(),
            });
        }

        match request.kind {
            FetchKind::Text => response
                .text()
                .await
                .map(Payload::Text)
                .map_err(classify_error),
            FetchKind::Bytes => response
                .bytes()
                .await
                .map(|bytes| Payload::Bytes(bytes.to_vec()))
                .map_err(classify_error),
        }
    }
}

/// Converts headers, dropping any name or value reqwest rejects
fn to_header_map(headers: &Headers) -> HeaderMap {
    let mut map = HeaderMap::new();
    for (name, value) in headers {
        match (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            (Ok(name), Ok(value)) => {
                map.insert(name, value);
            }
            _ => tracing::warn!("Skipping invalid header {}: {}", name, value),
        }
    }
    map
}

fn classify_error(e: reqwest::Error) -> TaskFailure {
    if e.is_timeout() {
        TaskFailure::Network("Request timeout".to_string())
    } else if e.is_connect() {
        TaskFailure::Network("Connection refused".to_string())
    } else if let Some(status) = e.status() {
        TaskFailure::Http {
            status: status.as_u16(),
        }
    } else {
        TaskFailure::Network(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_build_http_client() {
        let client = build_http_client(&HttpConfig::default());
        assert!(client.is_ok());
    }

    #[test]
    fn test_invalid_headers_are_skipped() {
        let mut headers = Headers::new();
        headers.insert("Accept".to_string(), "text/html".to_string());
        headers.insert("Bad Header".to_string(), "x".to_string());

        let map = to_header_map(&headers);
        assert_eq!(map.len(), 1);
        assert_eq!(map.get("accept").unwrap(), "text/html");
    }

    #[tokio::test]
    async fn test_fetch_text_with_headers() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/page"))
            .and(header("x-token", "abc"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<p>hi</p>"))
            .mount(&server)
            .await;

        let fetcher = HttpFetcher::new(&HttpConfig::default()).unwrap();
        let mut headers = Headers::new();
        headers.insert("x-token".to_string(), "abc".to_string());

        let outcome = fetcher
            .fetch(FetchRequest::text(format!("{}/page", server.uri()), headers))
            .await;
        assert_eq!(outcome, Ok(Payload::Text("<p>hi</p>".to_string())));
    }

    #[tokio::test]
    async fn test_fetch_bytes() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/img.png"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0u8, 159, 146, 150]))
            .mount(&server)
            .await;

        let fetcher = HttpFetcher::new(&HttpConfig::default()).unwrap();
        let outcome = fetcher
            .fetch(FetchRequest::bytes(
                format!("{}/img.png", server.uri()),
                Headers::new(),
            ))
            .await;
        assert_eq!(outcome, Ok(Payload::Bytes(vec![0u8, 159, 146, 150])));
    }

    #[tokio::test]
    async fn test_non_success_status_is_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let fetcher = HttpFetcher::new(&HttpConfig::default()).unwrap();
        let outcome = fetcher
            .fetch(FetchRequest::text(
                format!("{}/missing", server.uri()),
                Headers::new(),
            ))
            .await;
        assert_eq!(outcome, Err(TaskFailure::Http { status: 404 }));
    }

    #[tokio::test]
    async fn test_connection_failure_is_network_error() {
        let fetcher = HttpFetcher::new(&HttpConfig {
            connect_timeout: Duration::from_millis(500),
            timeout: Duration::from_secs(2),
            ..HttpConfig::default()
        })
        .unwrap();

        let outcome = fetcher
            .fetch(FetchRequest::text("http://127.0.0.1:1/", Headers::new()))
            .await;
        assert!(matches!(outcome, Err(TaskFailure::Network(_))));
    }
}
