use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// One posting as returned by a source provider, before dedup.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawCandidateRecord {
    pub source: String,
    pub source_job_id: String,
    pub title: Option<String>,
    pub company: Option<String>,
    pub location: Option<String>,
    pub city: Option<String>,
    pub country: String,
    pub url: String,
    pub description: Option<String>,
    pub posted_at: Option<DateTime<Utc>>,
    pub work_mode: String,
    pub salary_min: Option<f64>,
    pub salary_max: Option<f64>,
    pub currency: Option<String>,
}

impl RawCandidateRecord {
    pub fn source_key(&self) -> SourceKey {
        SourceKey {
            source: self.source.clone(),
            source_job_id: self.source_job_id.clone(),
        }
    }

    pub fn fingerprint(&self) -> Fingerprint {
        Fingerprint::of(
            self.title.as_deref(),
            self.company.as_deref(),
            self.city.as_deref(),
        )
    }
}

/// Identity of a posting within its provider.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SourceKey {
    pub source: String,
    pub source_job_id: String,
}

/// Fallback identity: SHA-256 over lower-cased `title|company|city`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Fingerprint(String);

impl Fingerprint {
    pub fn of(title: Option<&str>, company: Option<&str>, city: Option<&str>) -> Self {
        let joined = format!(
            "{}|{}|{}",
            title.unwrap_or_default().to_lowercase(),
            company.unwrap_or_default().to_lowercase(),
            city.unwrap_or_default().to_lowercase(),
        );
        let mut hasher = Sha256::new();
        hasher.update(joined.as_bytes());
        Fingerprint(hex::encode(hasher.finalize()))
    }

    pub fn from_hex(hex: String) -> Self {
        Fingerprint(hex)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A record accepted by the pipeline and ready to be written.
#[derive(Debug, Clone)]
pub struct NewPosting {
    pub record: RawCandidateRecord,
    pub fingerprint: Fingerprint,
}

/// A stored posting. Never updated after insertion.
#[derive(Debug, Clone, Serialize)]
pub struct PersistedPosting {
    pub id: i64,
    #[serde(flatten)]
    pub record: RawCandidateRecord,
    pub fingerprint: Fingerprint,
    pub created_at: String,
}
