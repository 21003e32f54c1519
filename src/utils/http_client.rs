use async_trait::async_trait;
use bytes::Bytes;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, info};

use crate::config::FetchConfig;
use crate::errors::FetchError;
use crate::utils::url::UrlUtils;

/// Retrieves the raw bytes of a source. Implementations must not retry.
#[async_trait]
pub trait SourceFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<Bytes, FetchError>;
}

/// reqwest-backed fetcher with a per-request timeout
pub struct HttpFetcher {
    client: Client,
    timeout: Duration,
}

impl HttpFetcher {
    pub fn new(config: &FetchConfig) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| FetchError::Client {
                message: e.to_string(),
            })?;

        Ok(Self {
            client,
            timeout: config.timeout,
        })
    }

    fn classify(&self, url: &str, error: reqwest::Error) -> FetchError {
        let url = UrlUtils::obfuscate_credentials(url);
        if error.is_timeout() {
            FetchError::Timeout {
                url,
                timeout_secs: self.timeout.as_secs(),
            }
        } else {
            let message = UrlUtils::obfuscate_credentials(&error.to_string());
            FetchError::transport(url, message)
        }
    }
}

#[async_trait]
impl SourceFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<Bytes, FetchError> {
        info!("Fetching {}", UrlUtils::obfuscate_credentials(url));

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| self.classify(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: UrlUtils::obfuscate_credentials(url),
                status: status.as_u16(),
                reason: status.canonical_reason().unwrap_or("Unknown").to_string(),
            });
        }

        let bytes = response.bytes().await.map_err(|e| {
            if e.is_timeout() {
                self.classify(url, e)
            } else {
                FetchError::Body {
                    url: UrlUtils::obfuscate_credentials(url),
                    message: e.to_string(),
                }
            }
        })?;

        debug!("Fetched {} bytes of raw content", bytes.len());
        Ok(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn fetcher(timeout: Duration) -> HttpFetcher {
        HttpFetcher::new(&FetchConfig {
            timeout,
            ..FetchConfig::default()
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_fetch_returns_body_bytes() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/guide.xml"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"<tv/>".to_vec()))
            .mount(&server)
            .await;

        let body = fetcher(Duration::from_secs(5))
            .fetch(&format!("{}/guide.xml", server.uri()))
            .await
            .unwrap();
        assert_eq!(body.as_ref(), b"<tv/>");
    }

    #[tokio::test]
    async fn test_non_success_status_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .expect(1)
            .mount(&server)
            .await;

        let err = fetcher(Duration::from_secs(5))
            .fetch(&format!("{}/missing.xml", server.uri()))
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Status { status: 404, .. }));
    }

    #[tokio::test]
    async fn test_slow_response_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string("<tv/>")
                    .set_delay(Duration::from_secs(3)),
            )
            .mount(&server)
            .await;

        let err = fetcher(Duration::from_millis(200))
            .fetch(&server.uri())
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Timeout { .. }));
    }

    #[tokio::test]
    async fn test_connection_refused_is_a_transport_error() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let err = fetcher(Duration::from_secs(5))
            .fetch(&format!("http://{addr}/guide.xml"))
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Transport { .. }));
    }
}
