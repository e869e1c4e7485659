//! Dedup and ingestion: raw provider records in, newly persisted count out.

use std::collections::HashSet;
use std::sync::MutexGuard;

use tracing::{debug, info, warn};

use crate::error::Result;
use crate::model::{Fingerprint, NewPosting, RawCandidateRecord, SourceKey};

const CHUNK: usize = 500;

/// Durable posting storage. Uniqueness on source identity and on fingerprint
/// must be enforced by the store itself as a backstop.
pub trait PostingStore: Send + Sync {
    /// Held by a writer for its whole check-then-insert sequence.
    fn lock_writer(&self) -> MutexGuard<'_, ()>;

    fn existing_source_keys(&self, keys: &[SourceKey]) -> Result<HashSet<SourceKey>>;

    fn fingerprint_exists(&self, fingerprint: &Fingerprint) -> Result<bool>;

    /// All or nothing. Rows rejected by a uniqueness constraint are skipped
    /// and not counted.
    fn insert_postings(&self, postings: &[NewPosting]) -> Result<usize>;
}

/// First occurrence of each (source, source_job_id) wins; order is kept.
/// Records without a source or source id are dropped.
pub fn dedup_batch(batch: &[RawCandidateRecord]) -> Vec<&RawCandidateRecord> {
    let mut seen = HashSet::new();
    let mut out = Vec::with_capacity(batch.len());
    let mut malformed = 0;
    for record in batch {
        if record.source.is_empty() || record.source_job_id.is_empty() {
            malformed += 1;
            continue;
        }
        if seen.insert(record.source_key()) {
            out.push(record);
        }
    }
    if malformed > 0 {
        warn!("Skipped {} records without a source identity", malformed);
    }
    out
}

/// Persist the records not already stored. Returns the number inserted.
pub fn ingest(store: &dyn PostingStore, batch: &[RawCandidateRecord]) -> Result<usize> {
    let unique = dedup_batch(batch);
    if unique.is_empty() {
        return Ok(0);
    }

    let _writer = store.lock_writer();

    let mut existing = HashSet::new();
    let keys: Vec<SourceKey> = unique.iter().map(|r| r.source_key()).collect();
    for chunk in keys.chunks(CHUNK) {
        existing.extend(store.existing_source_keys(chunk)?);
    }

    let mut accepted_fps = HashSet::new();
    let mut postings = Vec::new();
    let mut fp_dupes = 0;
    for record in unique {
        if existing.contains(&record.source_key()) {
            continue;
        }
        let fingerprint = record.fingerprint();
        if accepted_fps.contains(&fingerprint) || store.fingerprint_exists(&fingerprint)? {
            fp_dupes += 1;
            continue;
        }
        accepted_fps.insert(fingerprint.clone());
        postings.push(NewPosting {
            record: record.clone(),
            fingerprint,
        });
    }

    debug!(
        known = existing.len(),
        fingerprint_dupes = fp_dupes,
        candidates = postings.len(),
        "dedup done"
    );

    if postings.is_empty() {
        return Ok(0);
    }
    let inserted = store.insert_postings(&postings)?;
    info!("Inserted {} of {} records", inserted, batch.len());
    Ok(inserted)
}
