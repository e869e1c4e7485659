//! The core surface consumed by the CLI (and any future API layer).

use std::sync::Arc;
use std::time::Instant;

use tracing::info;

use crate::config::Settings;
use crate::db::SqliteStore;
use crate::error::{Error, Result};
use crate::extract::{Analyzer, ExtractionResult};
use crate::fetch::PageFetcher;
use crate::ingest::ingest;
use crate::provider::SourceProvider;

pub struct JobService {
    settings: Settings,
    store: Arc<SqliteStore>,
    provider: Option<Arc<dyn SourceProvider>>,
    analyzer: Analyzer,
}

impl JobService {
    pub fn new(
        settings: Settings,
        store: Arc<SqliteStore>,
        fetcher: Arc<dyn PageFetcher>,
    ) -> Result<Self> {
        let analyzer = Analyzer::new(&settings, fetcher)?;
        Ok(Self {
            settings,
            store,
            provider: None,
            analyzer,
        })
    }

    pub fn with_provider(mut self, provider: Arc<dyn SourceProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn store(&self) -> &SqliteStore {
        &self.store
    }

    /// Search the provider for every configured title and persist what is new.
    /// `days` defaults to `search.default_days`.
    pub async fn run_ingestion_cycle(&self, city: Option<&str>, days: Option<u32>) -> Result<usize> {
        let provider = self
            .provider
            .as_ref()
            .ok_or(Error::NoProvider)?;
        let days = days.unwrap_or(self.settings.search.default_days);
        let start = Instant::now();

        let records = provider
            .search(&self.settings.search.titles, city, days)
            .await?;
        let added = ingest(self.store.as_ref(), &records)?;

        info!(
            source = provider.name(),
            city = city.unwrap_or("(all)"),
            days,
            fetched = records.len(),
            added,
            "ingestion cycle done in {:.1}s",
            start.elapsed().as_secs_f64()
        );
        Ok(added)
    }

    pub async fn analyze_posting(
        &self,
        text: &str,
        url: Option<&str>,
        skills: &[String],
    ) -> ExtractionResult {
        self.analyzer.analyze(text, skills, url).await
    }

    /// Analyze a stored posting; `None` if the id is unknown.
    pub async fn analyze_stored(
        &self,
        id: i64,
        skills: &[String],
    ) -> Result<Option<ExtractionResult>> {
        let Some(posting) = self.store.get_posting(id)? else {
            return Ok(None);
        };
        let record = &posting.record;
        let text = match record.description.as_deref().filter(|d| !d.trim().is_empty()) {
            Some(d) => d.to_string(),
            None => format!(
                "{} at {}",
                record.title.as_deref().unwrap_or_default(),
                record.company.as_deref().unwrap_or_default()
            ),
        };
        let url = Some(record.url.as_str()).filter(|u| !u.is_empty());
        Ok(Some(self.analyze_posting(&text, url, skills).await))
    }
}
