//! Rate-limited, resumable HTTP downloads with SHA-256 content hashing.

pub mod rate_limiter;

use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use reqwest::cookie::Jar;
use reqwest::{Client, Url};
use serde::de::DeserializeOwned;
use sha2::{Digest, Sha256};
use thiserror::Error;

pub use rate_limiter::RateLimiter;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("http {0} from {1}")]
    HttpStatus(u16, String),
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("unexpected content type {0:?} for {1}")]
    UnexpectedContentType(Option<String>, String),
    #[error("response exceeded max file size of {0} bytes")]
    SizeExceeded(u64),
    #[error("disk io error: {0}")]
    DiskIo(#[from] std::io::Error),
    #[error("response body was not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Successfully downloaded content, hashed as it streamed in.
#[derive(Debug, Clone)]
pub struct DownloadedFile {
    pub bytes: Vec<u8>,
    pub content_type: String,
    pub sha256: String,
}

/// Streaming HTTP client with per-source rate limiting and retry/backoff.
#[derive(Clone)]
pub struct HttpFetcher {
    client: Client,
    rate_limiter: RateLimiter,
    max_retries: u32,
    backoff_factor: f64,
    max_file_size: u64,
}

impl HttpFetcher {
    pub fn new(
        user_agent: &str,
        timeout: Duration,
        max_retries: u32,
        backoff_factor: f64,
        max_file_size: u64,
    ) -> Self {
        // The DOJ document library gates access behind an age-verification
        // cookie; setting it up front avoids an extra redirect round trip.
        let jar = Jar::default();
        if let Ok(doj_url) = "https://www.justice.gov".parse::<Url>() {
            jar.add_cookie_str("justiceGovAgeVerified=true", &doj_url);
        }

        let client = Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .gzip(true)
            .brotli(true)
            .cookie_provider(Arc::new(jar))
            .build()
            .expect("failed to build http client");

        Self {
            client,
            rate_limiter: RateLimiter::new(),
            max_retries,
            backoff_factor,
            max_file_size,
        }
    }

    pub fn rate_limiter(&self) -> &RateLimiter {
        &self.rate_limiter
    }

    /// Fetch a URL and parse its body as JSON. Rate-limited, not retried:
    /// API discovery calls fail fast so an adapter can fall back or skip.
    pub async fn fetch_json<T: DeserializeOwned>(
        &self,
        source: &str,
        url: &str,
        rate_limit: f64,
    ) -> Result<T, FetchError> {
        self.rate_limiter.wait(source, rate_limit).await;
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::HttpStatus(status.as_u16(), url.to_string()));
        }
        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Fetch a URL and parse its body as JSON, with a bearer token attached.
    /// Used by adapters whose API requires authentication (courtlistener).
    pub async fn fetch_json_authenticated<T: DeserializeOwned>(
        &self,
        source: &str,
        url: &str,
        rate_limit: f64,
        bearer_token: &str,
    ) -> Result<T, FetchError> {
        self.rate_limiter.wait(source, rate_limit).await;
        let response = self
            .client
            .get(url)
            .header(reqwest::header::AUTHORIZATION, format!("Token {}", bearer_token))
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::HttpStatus(status.as_u16(), url.to_string()));
        }
        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Fetch a URL and return its body as text. Rate-limited, not retried.
    pub async fn fetch_text(&self, source: &str, url: &str, rate_limit: f64) -> Result<String, FetchError> {
        self.rate_limiter.wait(source, rate_limit).await;
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::HttpStatus(status.as_u16(), url.to_string()));
        }
        Ok(response.text().await?)
    }

    /// Download a file, streaming its body in 64 KiB chunks while
    /// computing a running SHA-256 hash. Retries transient failures with
    /// exponential backoff; the last error is propagated once retries are
    /// exhausted, so callers see the real cause rather than a generic one.
    pub async fn download(
        &self,
        source: &str,
        url: &str,
        rate_limit: f64,
        expect_binary: bool,
    ) -> Result<DownloadedFile, FetchError> {
        let mut attempt = 0;
        loop {
            self.rate_limiter.wait(source, rate_limit).await;
            match self.try_download_once(url, expect_binary).await {
                Ok(file) => return Ok(file),
                Err(e) if attempt < self.max_retries && Self::is_retryable(&e) => {
                    let delay = Duration::from_secs_f64(self.backoff_factor.powi(attempt as i32));
                    tracing::warn!(
                        "download of {} failed ({}), retrying in {:?} (attempt {}/{})",
                        url,
                        e,
                        delay,
                        attempt + 1,
                        self.max_retries
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn is_retryable(error: &FetchError) -> bool {
        matches!(
            error,
            FetchError::Transport(_) | FetchError::HttpStatus(_, _)
        )
    }

    async fn try_download_once(&self, url: &str, expect_binary: bool) -> Result<DownloadedFile, FetchError> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::HttpStatus(status.as_u16(), url.to_string()));
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.split(';').next().unwrap_or(s).trim().to_string())
            .unwrap_or_default();

        if expect_binary && content_type.starts_with("text/html") {
            return Err(FetchError::UnexpectedContentType(
                Some(content_type),
                url.to_string(),
            ));
        }

        if let Some(len) = response.content_length() {
            if len > self.max_file_size {
                return Err(FetchError::SizeExceeded(self.max_file_size));
            }
        }

        let mut hasher = Sha256::new();
        let mut bytes = Vec::new();
        let mut stream = response.bytes_stream();

        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            bytes.extend_from_slice(&chunk);
            hasher.update(&chunk);

            if bytes.len() as u64 > self.max_file_size {
                return Err(FetchError::SizeExceeded(self.max_file_size));
            }
        }

        Ok(DownloadedFile {
            bytes,
            content_type,
            sha256: hex::encode(hasher.finalize()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_retryable() {
        assert!(HttpFetcher::is_retryable(&FetchError::HttpStatus(
            503,
            "http://x".to_string()
        )));
        assert!(!HttpFetcher::is_retryable(&FetchError::SizeExceeded(100)));
    }
}
