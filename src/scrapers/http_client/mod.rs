//! HTTP fetch with retry and browser-mimicking headers.
//!
//! The plain-HTTP scrape path goes through here. Unlike browser
//! navigation, a failed fetch is retried with exponential backoff and
//! the last error is raised to the caller once retries are exhausted.

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::Client;
use thiserror::Error;
use tracing::debug;

/// Retries after the initial attempt.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// User agent for plain HTTP fetches.
const HTTP_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

/// Errors from a fetch after all retries are spent.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP {status}: {reason}")]
    Status { status: u16, reason: String },

    #[error("Request failed: {0}")]
    Network(#[from] reqwest::Error),
}

fn default_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        "Accept",
        HeaderValue::from_static(
            "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8",
        ),
    );
    headers.insert(
        "Accept-Language",
        HeaderValue::from_static("en-US,en;q=0.5"),
    );
    headers.insert("Connection", HeaderValue::from_static("keep-alive"));
    headers.insert("Upgrade-Insecure-Requests", HeaderValue::from_static("1"));
    headers
}

fn backoff_delay(attempt: u32) -> Duration {
    Duration::from_millis(1000 * 2u64.pow(attempt))
}

/// HTTP client that retries failed requests with exponential backoff.
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
    max_retries: u32,
}

impl HttpClient {
    pub fn new(max_retries: u32) -> Result<Self, FetchError> {
        let client = Client::builder()
            .user_agent(HTTP_USER_AGENT)
            .default_headers(default_headers())
            .timeout(REQUEST_TIMEOUT)
            .gzip(true)
            .brotli(true)
            .build()?;

        Ok(Self {
            client,
            max_retries,
        })
    }

    /// GET a URL, retrying on non-success status or network error.
    /// Backoff doubles per attempt starting at one second.
    pub async fn fetch_with_retry(&self, url: &str) -> Result<reqwest::Response, FetchError> {
        let mut attempt = 0;

        loop {
            let error = match self.client.get(url).send().await {
                Ok(response) if response.status().is_success() => return Ok(response),
                Ok(response) => {
                    let status = response.status();
                    FetchError::Status {
                        status: status.as_u16(),
                        reason: status.canonical_reason().unwrap_or("Unknown").to_string(),
                    }
                }
                Err(e) => FetchError::Network(e),
            };

            if attempt >= self.max_retries {
                return Err(error);
            }

            let delay = backoff_delay(attempt);
            debug!(
                "Fetch attempt {} for {} failed ({}), retrying in {}ms",
                attempt + 1,
                url,
                error,
                delay.as_millis()
            );
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }

    /// GET a URL and return the body as text.
    pub async fn get_text(&self, url: &str) -> Result<String, FetchError> {
        let response = self.fetch_with_retry(url).await?;
        Ok(response.text().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles_per_attempt() {
        assert_eq!(backoff_delay(0), Duration::from_millis(1000));
        assert_eq!(backoff_delay(1), Duration::from_millis(2000));
        assert_eq!(backoff_delay(2), Duration::from_millis(4000));
        assert_eq!(backoff_delay(3), Duration::from_millis(8000));
    }

    #[test]
    fn status_error_formats_like_http_line() {
        let err = FetchError::Status {
            status: 404,
            reason: "Not Found".to_string(),
        };
        assert_eq!(err.to_string(), "HTTP 404: Not Found");
    }

    #[test]
    fn default_headers_mimic_a_browser() {
        let headers = default_headers();
        assert!(headers.get("Accept").is_some());
        assert_eq!(
            headers.get("Upgrade-Insecure-Requests"),
            Some(&HeaderValue::from_static("1"))
        );
    }
}
