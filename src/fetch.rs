//! Live page retrieval for extraction. Best effort: no retries, failures become "".

use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use crate::config::FetchSettings;
use crate::error::Result;

#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Raw markup of `url`, or an empty string on any failure.
    async fn fetch(&self, url: &str) -> String;
}

pub struct HttpPageFetcher {
    client: reqwest::Client,
}

impl HttpPageFetcher {
    pub fn new(settings: &FetchSettings) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .user_agent(settings.user_agent.clone())
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()?;
        Ok(Self { client })
    }

    async fn try_fetch(&self, url: &str) -> Result<Option<String>> {
        let response = self.client.get(url).send().await?;
        if response.status() != reqwest::StatusCode::OK {
            debug!(url, status = %response.status(), "page fetch not OK");
            return Ok(None);
        }
        Ok(Some(response.text().await?))
    }
}

#[async_trait]
impl PageFetcher for HttpPageFetcher {
    async fn fetch(&self, url: &str) -> String {
        match self.try_fetch(url).await {
            Ok(body) => body.unwrap_or_default(),
            Err(e) => {
                debug!(url, error = %e, "page fetch failed");
                String::new()
            }
        }
    }
}
