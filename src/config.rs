//! Immutable settings, loaded once and handed to the pipeline and the engine.
//!
//! Sources, lowest precedence first: built-in defaults, `jobscan.toml` in the
//! working directory (optional), then `JOBSCAN_*` environment variables with
//! `__` between nested keys, e.g. `JOBSCAN_PROVIDER__APP_ID`.

use std::path::PathBuf;

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::extract::skills::DEFAULT_VOCABULARY;

const CONFIG_FILE: &str = "jobscan";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub database: DatabaseSettings,
    pub provider: ProviderSettings,
    pub search: SearchSettings,
    pub fetch: FetchSettings,
    pub extraction: ExtractionSettings,
    pub selector: SelectorSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseSettings {
    pub path: PathBuf,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            path: PathBuf::from("data/jobs.sqlite"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderSettings {
    pub app_id: Option<String>,
    pub app_key: Option<String>,
    pub endpoint: String,
    pub results_per_page: u32,
    pub timeout_secs: u64,
    pub max_attempts: u32,
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            app_id: None,
            app_key: None,
            endpoint: "https://api.adzuna.com/v1/api/jobs/ca/search/1".to_string(),
            results_per_page: 50,
            timeout_secs: 30,
            max_attempts: 3,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchSettings {
    pub titles: Vec<String>,
    pub cities: Vec<String>,
    pub default_days: u32,
}

impl Default for SearchSettings {
    fn default() -> Self {
        let titles = [
            "full stack developer",
            "software engineer",
            "frontend developer",
            "backend developer",
            "java developer",
            "react developer",
        ];
        let cities = [
            "Canada (All)",
            "Toronto, ON",
            "Vancouver, BC",
            "Montréal, QC",
            "Calgary, AB",
            "Ottawa, ON",
            "Edmonton, AB",
            "Winnipeg, MB",
            "Québec City, QC",
            "Hamilton, ON",
            "Kitchener, ON",
            "Victoria, BC",
            "Halifax, NS",
        ];
        Self {
            titles: titles.iter().map(|s| s.to_string()).collect(),
            cities: cities.iter().map(|s| s.to_string()).collect(),
            default_days: 3,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchSettings {
    pub timeout_secs: u64,
    pub user_agent: String,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            timeout_secs: 7,
            user_agent: "Mozilla/5.0".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionSettings {
    pub skill_limit: usize,
    pub vocabulary: Vec<String>,
}

impl Default for ExtractionSettings {
    fn default() -> Self {
        Self {
            skill_limit: 8,
            vocabulary: DEFAULT_VOCABULARY.iter().map(|s| s.to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectorSettings {
    /// Container elements scanned per page.
    pub max_candidates: usize,
    /// Blocks at or under this many characters are boilerplate.
    pub min_chars: usize,
    pub top_k: usize,
    pub max_chars: usize,
}

impl Default for SelectorSettings {
    fn default() -> Self {
        Self {
            max_candidates: 80,
            min_chars: 200,
            top_k: 3,
            max_chars: 20_000,
        }
    }
}

impl Settings {
    pub fn load() -> Result<Self> {
        let defaults = Config::try_from(&Settings::default())?;
        let settings: Settings = Config::builder()
            .add_source(defaults)
            .add_source(File::with_name(CONFIG_FILE).required(false))
            .add_source(
                Environment::with_prefix("JOBSCAN")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("search.titles")
                    .with_list_parse_key("search.cities")
                    .with_list_parse_key("extraction.vocabulary"),
            )
            .build()?
            .try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<()> {
        if self.search.titles.is_empty() {
            return Err(Error::MissingSetting("search.titles"));
        }
        if self.provider.max_attempts == 0 {
            return Err(Error::MissingSetting("provider.max_attempts"));
        }
        Ok(())
    }
}
