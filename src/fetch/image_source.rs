use std::sync::Arc;

use async_trait::async_trait;
use log::debug;
use reqwest::redirect::Policy;
use thiserror::Error;

use crate::storage::collection_storage::ImageReference;
use crate::utils::rate_limiter::RateLimiter;
use crate::utils::utils::cache_buster;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("HTTP status: {0}")]
    Status(reqwest::StatusCode),
    #[error("image service returned an empty url")]
    EmptyUrl,
    #[error("fetch quota exceeded")]
    RateLimited,
}

impl FetchError {
    pub fn code(&self) -> &'static str {
        match self {
            FetchError::RateLimited => "rate-limited",
            _ => "fetch-failure",
        }
    }
}

#[async_trait]
pub trait ImageSource: Send + Sync {
    async fn fetch(&self) -> Result<ImageReference, FetchError>;
}

/// Random placeholder images from a picsum-style endpoint.
pub struct PicsumSource {
    client: reqwest::Client,
    base_url: String,
    width: u32,
    height: u32,
}

impl PicsumSource {
    pub fn new(base_url: &str, width: u32, height: u32) -> Result<Self, FetchError> {
        let client = Self::client_builder().build()?;
        Ok(Self::with_client(client, base_url, width, height))
    }

    pub fn client_builder() -> reqwest::ClientBuilder {
        reqwest::Client::builder()
            .redirect(Policy::limited(10))
            .user_agent(concat!("imgcollect/", env!("CARGO_PKG_VERSION")))
    }

    pub fn with_client(client: reqwest::Client, base_url: &str, width: u32, height: u32) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            width,
            height,
        }
    }

    pub fn request_url(&self, cache_buster: &str) -> String {
        format!(
            "{}/{}/{}?random={}",
            self.base_url, self.width, self.height, cache_buster
        )
    }
}

#[async_trait]
impl ImageSource for PicsumSource {
    async fn fetch(&self) -> Result<ImageReference, FetchError> {
        let url = self.request_url(&cache_buster());
        debug!("fetching image from {}", url);

        let response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(FetchError::Status(response.status()));
        }

        // the redirect target is the stable reference for this image
        ImageReference::new(response.url().as_str()).map_err(|_| FetchError::EmptyUrl)
    }
}

/// Applies the per-peer fetch quota before delegating.
pub struct RateLimitedSource {
    inner: Arc<dyn ImageSource>,
    limiter: Arc<RateLimiter>,
    peer: String,
}

impl RateLimitedSource {
    pub fn new(inner: Arc<dyn ImageSource>, limiter: Arc<RateLimiter>, peer: String) -> Self {
        Self {
            inner,
            limiter,
            peer,
        }
    }
}

#[async_trait]
impl ImageSource for RateLimitedSource {
    async fn fetch(&self) -> Result<ImageReference, FetchError> {
        if !self.limiter.check_fetch_limit(&self.peer) {
            return Err(FetchError::RateLimited);
        }
        self.inner.fetch().await
    }
}

#[cfg(test)]
mod tests {
    use std::net::SocketAddr;
    use std::num::NonZeroU32;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    use super::*;

    struct CountingSource {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl ImageSource for CountingSource {
        async fn fetch(&self) -> Result<ImageReference, FetchError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(ImageReference::new(format!("https://img.test/{n}")).unwrap())
        }
    }

    #[test]
    fn request_url_has_size_and_cache_buster() {
        let source = PicsumSource::new("https://picsum.photos/", 620, 320).unwrap();
        assert_eq!(
            source.request_url("12345"),
            "https://picsum.photos/620/320?random=12345"
        );
    }

    #[test]
    fn fetch_errors_map_to_wire_codes() {
        assert_eq!(FetchError::RateLimited.code(), "rate-limited");
        assert_eq!(FetchError::EmptyUrl.code(), "fetch-failure");
        assert_eq!(
            FetchError::Status(reqwest::StatusCode::BAD_GATEWAY).code(),
            "fetch-failure"
        );
    }

    #[tokio::test]
    async fn rate_limited_source_stops_delegating() {
        let inner = Arc::new(CountingSource {
            calls: AtomicUsize::new(0),
        });
        let limiter = Arc::new(RateLimiter::new(NonZeroU32::new(2).unwrap()));
        let source = RateLimitedSource::new(inner.clone(), limiter, "peer".to_string());

        assert_eq!(source.fetch().await.unwrap().as_str(), "https://img.test/0");
        assert_eq!(source.fetch().await.unwrap().as_str(), "https://img.test/1");
        assert!(matches!(source.fetch().await, Err(FetchError::RateLimited)));
        assert_eq!(inner.calls.load(Ordering::SeqCst), 2);
    }

    /// Minimal HTTP/1.1 responder: one response per connection, chosen by path.
    async fn serve_stub(respond: fn(&str) -> String) -> SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            while let Ok((mut stream, _)) = listener.accept().await {
                let mut request = Vec::new();
                let mut buffer = [0; 1024];
                while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                    match stream.read(&mut buffer).await {
                        Ok(0) | Err(_) => break,
                        Ok(n) => request.extend_from_slice(&buffer[..n]),
                    }
                }
                let request = String::from_utf8_lossy(&request);
                let path = request.split_whitespace().nth(1).unwrap_or("/").to_string();
                let _ = stream.write_all(respond(&path).as_bytes()).await;
                let _ = stream.shutdown().await;
            }
        });
        addr
    }

    fn stub_source(addr: SocketAddr) -> PicsumSource {
        let client = PicsumSource::client_builder().no_proxy().build().unwrap();
        PicsumSource::with_client(client, &format!("http://{}", addr), 620, 320)
    }

    #[tokio::test]
    async fn fetch_returns_url_after_redirect() {
        let addr = serve_stub(|path| {
            if path.starts_with("/620/320?random=") {
                "HTTP/1.1 302 Found\r\nLocation: /id/7/620/320\r\nContent-Length: 0\r\nConnection: close\r\n\r\n".to_string()
            } else if path == "/id/7/620/320" {
                "HTTP/1.1 200 OK\r\nContent-Type: image/jpeg\r\nContent-Length: 3\r\nConnection: close\r\n\r\njpg".to_string()
            } else {
                "HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\nConnection: close\r\n\r\n".to_string()
            }
        })
        .await;

        let image = stub_source(addr).fetch().await.unwrap();
        assert_eq!(image.as_str(), format!("http://{}/id/7/620/320", addr));
    }

    #[tokio::test]
    async fn fetch_reports_non_success_status() {
        let addr = serve_stub(|_| {
            "HTTP/1.1 502 Bad Gateway\r\nContent-Length: 0\r\nConnection: close\r\n\r\n".to_string()
        })
        .await;

        let error = stub_source(addr).fetch().await.unwrap_err();
        assert!(matches!(
            error,
            FetchError::Status(status) if status == reqwest::StatusCode::BAD_GATEWAY
        ));
        assert_eq!(error.code(), "fetch-failure");
    }

    #[tokio::test]
    async fn fetch_reports_connection_failure() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let error = stub_source(addr).fetch().await.unwrap_err();
        assert!(matches!(error, FetchError::Request(_)));
        assert_eq!(error.code(), "fetch-failure");
    }
}
