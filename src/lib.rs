pub mod config;
pub mod db;
pub mod error;
pub mod extract;
pub mod fetch;
pub mod ingest;
pub mod model;
pub mod provider;
pub mod service;
pub mod text;

pub use config::Settings;
pub use db::{ListFilter, SqliteStore, Stats};
pub use error::{Error, Result};
pub use extract::{Analyzer, ExtractionResult, NOT_MENTIONED};
pub use fetch::{HttpPageFetcher, PageFetcher};
pub use ingest::{ingest, PostingStore};
pub use model::{Fingerprint, PersistedPosting, RawCandidateRecord};
pub use provider::{AdzunaProvider, SourceProvider};
pub use service::JobService;
