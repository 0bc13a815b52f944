pub mod http_fetcher;

#[cfg(test)]
pub mod stub;

use async_trait::async_trait;

use crate::app::Result;

/// Per-request knobs an adapter may need upstream.
#[derive(Debug, Clone, Default)]
pub struct FetchOptions {
    /// Raw `Cookie` header value
    pub cookie: Option<String>,
    /// Return 3xx responses as-is instead of following them
    pub no_redirect: bool,
}

impl FetchOptions {
    pub fn with_cookie(cookie: Option<&str>) -> Self {
        Self {
            cookie: cookie.map(String::from),
            ..Default::default()
        }
    }
}

/// Upstream response. Non-2xx statuses are data, not errors: adapters
/// decide what a 302 or 404 means for their source.
#[derive(Debug, Clone)]
pub struct FetchResponse {
    pub status: u16,
    pub body: String,
}

#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, url: &str, options: &FetchOptions) -> Result<FetchResponse>;

    async fn get(&self, url: &str) -> Result<FetchResponse> {
        self.fetch(url, &FetchOptions::default()).await
    }
}
