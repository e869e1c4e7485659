pub mod adzuna;

use async_trait::async_trait;

use crate::error::Result;
use crate::model::RawCandidateRecord;

pub use adzuna::AdzunaProvider;

/// A listings source. Retries for transient failures are the implementation's concern.
#[async_trait]
pub trait SourceProvider: Send + Sync {
    fn name(&self) -> &str;

    async fn search(
        &self,
        titles: &[String],
        city: Option<&str>,
        days: u32,
    ) -> Result<Vec<RawCandidateRecord>>;
}

/// `None` for the nationwide pseudo-city ("Canada (All)") or a blank value.
pub fn city_filter(city: Option<&str>) -> Option<&str> {
    city.map(str::trim)
        .filter(|c| !c.is_empty() && !c.starts_with("Canada"))
}

/// "Toronto, ON" -> "Toronto".
pub fn city_of(location: Option<&str>) -> Option<String> {
    location
        .and_then(|loc| loc.split(',').next())
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(str::to_string)
}
