use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, COOKIE};
use reqwest::redirect::Policy;
use reqwest::Client;

use crate::app::Result;
use crate::config::HttpConfig;
use crate::fetcher::{FetchOptions, FetchResponse, Fetcher};

pub struct HttpFetcher {
    client: Client,
    no_redirect: Client,
}

impl HttpFetcher {
    pub fn new(config: &HttpConfig) -> Result<Self> {
        let build = |policy: Policy| {
            Client::builder()
                .timeout(Duration::from_secs(config.timeout_secs))
                .gzip(true)
                .brotli(true)
                .user_agent(config.user_agent.as_str())
                .redirect(policy)
                .build()
        };

        Ok(Self {
            client: build(Policy::limited(10))?,
            no_redirect: build(Policy::none())?,
        })
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str, options: &FetchOptions) -> Result<FetchResponse> {
        let mut headers = HeaderMap::new();

        if let Some(cookie) = options.cookie.as_deref() {
            if let Ok(value) = HeaderValue::from_str(cookie) {
                headers.insert(COOKIE, value);
            }
        }

        let client = if options.no_redirect {
            &self.no_redirect
        } else {
            &self.client
        };

        tracing::debug!("GET {}", url);
        let response = client.get(url).headers(headers).send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;

        Ok(FetchResponse { status, body })
    }
}
