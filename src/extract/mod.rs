//! Heuristic attribute extraction over posting text.
//!
//! Each sub-extractor is a pure function over normalized text. Faults are
//! only caught in [`Analyzer::analyze`], which must never fail its caller.

pub mod salary;
pub mod skills;
pub mod work_mode;
pub mod years;

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::{SelectorSettings, Settings};
use crate::error::Result;
use crate::fetch::PageFetcher;
use crate::text::{normalize, select_main_text};

pub use salary::extract_salary;
pub use skills::{extract_skills, Vocabulary};
pub use work_mode::detect_work_mode;
pub use years::extract_years;

/// Value of any attribute no rule matched.
pub const NOT_MENTIONED: &str = "not mentioned";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionResult {
    pub skills: Vec<String>,
    pub years_experience_required: String,
    #[serde(rename = "type")]
    pub work_mode: String,
    pub salary: String,
}

impl Default for ExtractionResult {
    fn default() -> Self {
        Self {
            skills: Vec::new(),
            years_experience_required: NOT_MENTIONED.to_string(),
            work_mode: NOT_MENTIONED.to_string(),
            salary: NOT_MENTIONED.to_string(),
        }
    }
}

/// Run all four extractors over already-normalized text.
pub fn extract_all(text: &str, vocab: &Vocabulary, skill_limit: usize) -> ExtractionResult {
    ExtractionResult {
        skills: extract_skills(text, vocab, skill_limit),
        years_experience_required: extract_years(text),
        work_mode: detect_work_mode(text),
        salary: extract_salary(text),
    }
}

pub struct Analyzer {
    vocabulary: Vocabulary,
    skill_limit: usize,
    selector: SelectorSettings,
    fetcher: Arc<dyn PageFetcher>,
}

impl Analyzer {
    pub fn new(settings: &Settings, fetcher: Arc<dyn PageFetcher>) -> Result<Self> {
        Ok(Self {
            vocabulary: Vocabulary::new(&settings.extraction.vocabulary)?,
            skill_limit: settings.extraction.skill_limit,
            selector: settings.selector.clone(),
            fetcher,
        })
    }

    /// Extract attributes from a posting.
    ///
    /// With a `url`, the live page's main text is preferred over `text` when
    /// it is non-empty. `known_skills` extend the vocabulary for this call.
    /// Any failure yields [`ExtractionResult::default`].
    pub async fn analyze(
        &self,
        text: &str,
        known_skills: &[String],
        url: Option<&str>,
    ) -> ExtractionResult {
        let markup = match url.map(str::trim).filter(|u| !u.is_empty()) {
            Some(u) => self.fetcher.fetch(u).await,
            None => String::new(),
        };

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| -> Result<ExtractionResult> {
            let page_text = select_main_text(&markup, &self.selector);
            let base = if page_text.is_empty() {
                normalize(text)
            } else {
                debug!(chars = page_text.len(), "using live page text");
                page_text
            };
            let vocab = if known_skills.is_empty() {
                self.vocabulary.clone()
            } else {
                self.vocabulary.extended(known_skills)?
            };
            Ok(extract_all(&base, &vocab, self.skill_limit))
        }));

        match outcome {
            Ok(Ok(result)) => result,
            Ok(Err(e)) => {
                warn!(error = %e, "extraction failed, returning empty result");
                ExtractionResult::default()
            }
            Err(_) => {
                warn!("extraction panicked, returning empty result");
                ExtractionResult::default()
            }
        }
    }
}
