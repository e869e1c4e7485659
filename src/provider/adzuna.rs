use std::collections::HashSet;
use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::{debug, info, warn};

use super::{city_filter, city_of, SourceProvider};
use crate::config::ProviderSettings;
use crate::error::{Error, Result};
use crate::extract::{detect_work_mode, NOT_MENTIONED};
use crate::model::RawCandidateRecord;
use crate::text::normalize;

const SOURCE: &str = "adzuna";
const BASE_BACKOFF_MS: u64 = 1000;
const MAX_BACKOFF_MS: u64 = 8000;

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<AdzunaJob>,
}

#[derive(Debug, Deserialize)]
struct AdzunaJob {
    id: Option<serde_json::Value>,
    title: Option<String>,
    company: Option<Named>,
    location: Option<Named>,
    redirect_url: Option<String>,
    description: Option<String>,
    created: Option<serde_json::Value>,
    salary_min: Option<f64>,
    salary_max: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct Named {
    display_name: Option<String>,
}

pub struct AdzunaProvider {
    client: reqwest::Client,
    settings: ProviderSettings,
    app_id: String,
    app_key: String,
}

impl AdzunaProvider {
    pub fn new(settings: &ProviderSettings) -> Result<Self> {
        let app_id = settings
            .app_id
            .clone()
            .ok_or(Error::MissingSetting("provider.app_id"))?;
        let app_key = settings
            .app_key
            .clone()
            .ok_or(Error::MissingSetting("provider.app_key"))?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            settings: settings.clone(),
            app_id,
            app_key,
        })
    }

    async fn fetch_with_retry(&self, params: &[(&str, String)]) -> Result<SearchResponse> {
        with_retry(self.settings.max_attempts, || self.fetch_once(params)).await
    }

    async fn fetch_once(&self, params: &[(&str, String)]) -> Result<SearchResponse> {
        let response = self
            .client
            .get(&self.settings.endpoint)
            .query(params)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::ProviderStatus {
                status: status.as_u16(),
                url: self.settings.endpoint.clone(),
            });
        }
        let body = response.text().await?;
        Ok(serde_json::from_str(&body)?)
    }
}

#[async_trait]
impl SourceProvider for AdzunaProvider {
    fn name(&self) -> &str {
        SOURCE
    }

    async fn search(
        &self,
        titles: &[String],
        city: Option<&str>,
        days: u32,
    ) -> Result<Vec<RawCandidateRecord>> {
        let since = Utc::now() - chrono::Duration::days(i64::from(days));
        let where_val = city_filter(city);
        let mut seen_ids = HashSet::new();
        let mut records = Vec::new();

        for title in titles {
            let mut params = vec![
                ("app_id", self.app_id.clone()),
                ("app_key", self.app_key.clone()),
                ("what", title.clone()),
                ("results_per_page", self.settings.results_per_page.to_string()),
                ("sort_by", "date".to_string()),
                ("content-type", "application/json".to_string()),
            ];
            if let Some(w) = where_val {
                params.push(("where", w.to_string()));
            }

            let response = self.fetch_with_retry(&params).await?;
            let before = records.len();
            for job in response.results {
                if let Some(record) = into_record(job, since, &mut seen_ids) {
                    records.push(record);
                }
            }
            debug!(title = %title, added = records.len() - before, "provider page");
        }

        info!("Fetched {} postings from {}", records.len(), SOURCE);
        Ok(records)
    }
}

/// Run `op` until it succeeds, fails with a non-retryable error, or
/// `max_attempts` is used up.
async fn with_retry<T, F, Fut>(max_attempts: u32, mut op: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let max = max_attempts.max(1);
    let mut attempt = 1;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_retryable() && attempt < max => {
                let backoff = backoff_delay(attempt);
                warn!(
                    "Provider request failed (attempt {}/{}): {}, backing off {:.1}s",
                    attempt,
                    max,
                    e,
                    backoff.as_secs_f64()
                );
                tokio::time::sleep(backoff).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

/// Wait after failed attempt `attempt` (1-based): 1s, 2s, 4s, then 8s from there on.
fn backoff_delay(attempt: u32) -> Duration {
    let factor = 2u64.saturating_pow(attempt.saturating_sub(1));
    Duration::from_millis(BASE_BACKOFF_MS.saturating_mul(factor).min(MAX_BACKOFF_MS))
}

/// Convert one listing. Repeated ids and postings older than `since` are dropped.
fn into_record(
    job: AdzunaJob,
    since: DateTime<Utc>,
    seen_ids: &mut HashSet<String>,
) -> Option<RawCandidateRecord> {
    let id = match job.id? {
        serde_json::Value::String(s) => s,
        serde_json::Value::Number(n) => n.to_string(),
        _ => return None,
    };
    if !seen_ids.insert(id.clone()) {
        return None;
    }

    let posted_at = job.created.as_ref().and_then(parse_created);
    if posted_at.is_some_and(|t| t < since) {
        return None;
    }

    let description = job.description.unwrap_or_default();
    let location = job.location.and_then(|l| l.display_name);
    let work_mode = match detect_work_mode(&normalize(&description)) {
        m if m == NOT_MENTIONED => "unknown".to_string(),
        m => m,
    };

    Some(RawCandidateRecord {
        source: SOURCE.to_string(),
        source_job_id: id,
        title: job.title,
        company: job.company.and_then(|c| c.display_name),
        city: city_of(location.as_deref()),
        location,
        country: "CA".to_string(),
        url: job.redirect_url.unwrap_or_default(),
        description: Some(description),
        posted_at,
        work_mode,
        salary_min: job.salary_min,
        salary_max: job.salary_max,
        currency: Some("CAD".to_string()),
    })
}

/// Unix seconds or an RFC 3339 string.
fn parse_created(value: &serde_json::Value) -> Option<DateTime<Utc>> {
    match value {
        serde_json::Value::Number(n) => {
            let secs = n.as_f64()?;
            DateTime::from_timestamp(secs as i64, 0)
        }
        serde_json::Value::String(s) => DateTime::parse_from_rfc3339(s)
            .ok()
            .map(|t| t.with_timezone(&Utc)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Mutex;
    use tokio::time::Instant;

    fn job(value: serde_json::Value) -> AdzunaJob {
        serde_json::from_value(value).unwrap()
    }

    fn since() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2024-05-01T00:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    #[test]
    fn converts_listing() {
        let mut seen = HashSet::new();
        let r = into_record(
            job(json!({
                "id": "4711",
                "title": "Rust Developer",
                "company": {"display_name": "Acme"},
                "location": {"display_name": "Toronto, Ontario"},
                "redirect_url": "https://example.com/4711",
                "description": "Hybrid &amp; flexible",
                "created": "2024-05-02T10:00:00Z",
                "salary_min": 90000.0
            })),
            since(),
            &mut seen,
        )
        .unwrap();
        assert_eq!(r.source, "adzuna");
        assert_eq!(r.source_job_id, "4711");
        assert_eq!(r.city.as_deref(), Some("Toronto"));
        assert_eq!(r.work_mode, "hybrid");
        assert_eq!(r.currency.as_deref(), Some("CAD"));
        assert_eq!(r.salary_min, Some(90000.0));
        assert!(r.posted_at.is_some());
    }

    #[test]
    fn numeric_ids_and_timestamps() {
        let mut seen = HashSet::new();
        let r = into_record(
            job(json!({"id": 12, "created": 1_714_600_000, "description": null})),
            since(),
            &mut seen,
        )
        .unwrap();
        assert_eq!(r.source_job_id, "12");
        assert_eq!(r.work_mode, "unknown");
        assert_eq!(r.url, "");
    }

    #[test]
    fn drops_repeats_and_stale_listings() {
        let mut seen = HashSet::new();
        assert!(into_record(job(json!({"id": "1"})), since(), &mut seen).is_some());
        assert!(into_record(job(json!({"id": "1"})), since(), &mut seen).is_none());
        let stale = job(json!({"id": "2", "created": "2024-04-01T00:00:00Z"}));
        assert!(into_record(stale, since(), &mut seen).is_none());
        assert!(into_record(job(json!({"title": "no id"})), since(), &mut seen).is_none());
    }

    #[test]
    fn missing_credentials_rejected() {
        let settings = ProviderSettings::default();
        assert!(matches!(
            AdzunaProvider::new(&settings),
            Err(Error::MissingSetting("provider.app_id"))
        ));
    }

    fn unavailable() -> Error {
        Error::ProviderStatus {
            status: 503,
            url: "https://provider.test".into(),
        }
    }

    #[test]
    fn backoff_doubles_then_caps() {
        let delays: Vec<u64> = (1..=6).map(|a| backoff_delay(a).as_secs()).collect();
        assert_eq!(delays, vec![1, 2, 4, 8, 8, 8]);
        assert_eq!(backoff_delay(200), Duration::from_secs(8));
        assert_eq!(backoff_delay(u32::MAX), Duration::from_secs(8));
    }

    #[tokio::test(start_paused = true)]
    async fn transient_failures_are_retried_with_backoff() {
        let calls = Mutex::new(Vec::new());
        let started = Instant::now();
        let result = with_retry(3, || {
            let mut seen = calls.lock().unwrap();
            seen.push(started.elapsed());
            let n = seen.len();
            async move {
                if n < 3 {
                    Err(unavailable())
                } else {
                    Ok(n)
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), 3);
        let offsets: Vec<u64> = calls.lock().unwrap().iter().map(|d| d.as_secs()).collect();
        assert_eq!(offsets, vec![0, 1, 3]);
    }

    #[tokio::test(start_paused = true)]
    async fn gives_up_after_max_attempts() {
        let calls = Mutex::new(0u32);
        let started = Instant::now();
        let result: Result<()> = with_retry(5, || {
            *calls.lock().unwrap() += 1;
            async { Err(unavailable()) }
        })
        .await;

        assert!(matches!(result, Err(Error::ProviderStatus { status: 503, .. })));
        assert_eq!(*calls.lock().unwrap(), 5);
        // 1 + 2 + 4 + 8
        assert_eq!(started.elapsed().as_secs(), 15);
    }

    #[tokio::test(start_paused = true)]
    async fn permanent_failures_return_immediately() {
        let calls = Mutex::new(0u32);
        let started = Instant::now();
        let result: Result<()> = with_retry(3, || {
            *calls.lock().unwrap() += 1;
            async {
                let bad = serde_json::from_str::<u32>("not json").unwrap_err();
                Err(Error::Provider(bad))
            }
        })
        .await;

        assert!(matches!(result, Err(Error::Provider(_))));
        assert_eq!(*calls.lock().unwrap(), 1);
        assert_eq!(started.elapsed(), Duration::ZERO);

        let not_found: Result<()> = with_retry(3, || async {
            Err(Error::ProviderStatus {
                status: 404,
                url: "https://provider.test".into(),
            })
        })
        .await;
        assert!(matches!(not_found, Err(Error::ProviderStatus { status: 404, .. })));
    }

    #[test]
    fn unparseable_created_is_none() {
        assert_eq!(parse_created(&json!("yesterday")), None);
        assert_eq!(parse_created(&json!(true)), None);
    }
}
