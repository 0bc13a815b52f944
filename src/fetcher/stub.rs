//! Canned upstream for adapter tests.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::app::{GenError, Result};
use crate::fetcher::{FetchOptions, FetchResponse, Fetcher};

#[derive(Default)]
pub struct StubFetcher {
    routes: HashMap<String, FetchResponse>,
    calls: Mutex<Vec<(String, FetchOptions)>>,
}

impl StubFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn route(mut self, url: &str, status: u16, body: &str) -> Self {
        self.routes.insert(
            url.to_string(),
            FetchResponse {
                status,
                body: body.to_string(),
            },
        );
        self
    }

    pub fn calls(&self) -> Vec<(String, FetchOptions)> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl Fetcher for StubFetcher {
    async fn fetch(&self, url: &str, options: &FetchOptions) -> Result<FetchResponse> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push((url.to_string(), options.clone()));
        }
        self.routes
            .get(url)
            .cloned()
            .ok_or_else(|| GenError::Other(format!("no stub route for {}", url)))
    }
}
