// src/ingest/fetch.rs
use anyhow::{Context, Result};
use std::sync::Mutex;
use std::time::Duration;

#[async_trait::async_trait]
pub trait FeedFetcher: Send + Sync {
    /// Return the raw feed body at `url`.
    async fn fetch(&self, url: &str) -> Result<String>;
}

#[derive(Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(format!("feedcast/{}", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .context("building feed http client")?;
        Ok(Self { client })
    }
}

#[async_trait::async_trait]
impl FeedFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<String> {
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .with_context(|| format!("feed http get {url}"))?
            .error_for_status()
            .context("feed non-2xx")?;
        resp.text().await.context("feed http .text()")
    }
}

// --- Test helper ---
/// Serves a swappable canned body and records every requested URL.
pub struct MockFetcher {
    pub body: Mutex<Result<String, String>>,
    pub calls: Mutex<Vec<String>>,
}

impl MockFetcher {
    pub fn new(body: impl Into<String>) -> Self {
        Self {
            body: Mutex::new(Ok(body.into())),
            calls: Mutex::new(vec![]),
        }
    }

    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            body: Mutex::new(Err(message.into())),
            calls: Mutex::new(vec![]),
        }
    }

    pub fn set_body(&self, body: impl Into<String>) {
        *self.body.lock().unwrap() = Ok(body.into());
    }

    pub fn set_error(&self, message: impl Into<String>) {
        *self.body.lock().unwrap() = Err(message.into());
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait::async_trait]
impl FeedFetcher for MockFetcher {
    async fn fetch(&self, url: &str) -> Result<String> {
        self.calls.lock().unwrap().push(url.to_string());
        match &*self.body.lock().unwrap() {
            Ok(body) => Ok(body.clone()),
            Err(msg) => Err(anyhow::anyhow!("{msg}")),
        }
    }
}
