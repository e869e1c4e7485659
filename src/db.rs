use std::collections::HashSet;
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::types::ToSql;
use rusqlite::{params_from_iter, Connection, Row};
use serde::Serialize;
use tracing::debug;

use crate::error::Result;
use crate::ingest::PostingStore;
use crate::model::{Fingerprint, NewPosting, PersistedPosting, RawCandidateRecord, SourceKey};
use crate::provider::{city_filter, city_of};

pub const MAX_PAGE_SIZE: usize = 100;

const POSTING_COLUMNS: &str = "id, source, source_job_id, title, company, location, city,
    country, url, description, posted_at, work_mode, salary_min, salary_max, currency,
    fingerprint, created_at";

pub struct SqliteStore {
    conn: Mutex<Connection>,
    writer: Mutex<()>,
}

/// Filters for `list_postings`. `page` is 1-based. `country` defaults to `CA`.
#[derive(Debug, Clone)]
pub struct ListFilter {
    pub country: Option<String>,
    pub days: Option<u32>,
    pub city: Option<String>,
    pub work_mode: Option<String>,
    pub keyword: Option<String>,
    pub page: usize,
    pub page_size: usize,
}

impl Default for ListFilter {
    fn default() -> Self {
        Self {
            country: Some("CA".to_string()),
            days: None,
            city: None,
            work_mode: None,
            keyword: None,
            page: 1,
            page_size: 20,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct Stats {
    pub total: usize,
    pub by_source: Vec<(String, usize)>,
    pub by_work_mode: Vec<(String, usize)>,
}

impl SqliteStore {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            // Let `Connection::open` report the real failure if this doesn't work.
            let _ = std::fs::create_dir_all(parent);
        }
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
        Self::with_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
            writer: Mutex::new(()),
        })
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Newest first. Returns the requested page and the total match count.
    pub fn list_postings(&self, filter: &ListFilter) -> Result<(Vec<PersistedPosting>, usize)> {
        let mut conditions = Vec::new();
        let mut params: Vec<Box<dyn ToSql>> = Vec::new();

        if let Some(country) = filter.country.as_deref().filter(|c| !c.is_empty()) {
            conditions.push(format!("country = ?{}", params.len() + 1));
            params.push(Box::new(country.to_uppercase()));
        }
        if let Some(days) = filter.days {
            let since = Utc::now() - chrono::Duration::days(i64::from(days));
            conditions.push(format!(
                "(posted_at IS NULL OR posted_at >= ?{})",
                params.len() + 1
            ));
            params.push(Box::new(timestamp(&since)));
        }
        if let Some(city) = city_of(city_filter(filter.city.as_deref())) {
            conditions.push(format!("LOWER(city) = LOWER(?{})", params.len() + 1));
            params.push(Box::new(city));
        }
        if let Some(mode) = filter.work_mode.as_deref().filter(|m| !m.is_empty()) {
            conditions.push(format!("work_mode = ?{}", params.len() + 1));
            params.push(Box::new(mode.to_lowercase()));
        }
        if let Some(q) = filter.keyword.as_deref().map(str::trim).filter(|q| !q.is_empty()) {
            let n = params.len() + 1;
            conditions.push(format!(
                "(title LIKE ?{n} OR company LIKE ?{n} OR city LIKE ?{n} OR description LIKE ?{n})"
            ));
            params.push(Box::new(format!("%{q}%")));
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", conditions.join(" AND "))
        };

        let page_size = filter.page_size.clamp(1, MAX_PAGE_SIZE);
        let offset = (filter.page.max(1) - 1) * page_size;
        let param_refs: Vec<&dyn ToSql> = params.iter().map(|p| p.as_ref()).collect();

        let conn = self.conn();
        let total: usize = conn.query_row(
            &format!("SELECT COUNT(*) FROM jobs{where_clause}"),
            param_refs.as_slice(),
            |r| r.get(0),
        )?;

        let sql = format!(
            "SELECT {POSTING_COLUMNS} FROM jobs{where_clause}
             ORDER BY created_at DESC, id DESC
             LIMIT {page_size} OFFSET {offset}"
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(param_refs.as_slice(), posting_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok((rows, total))
    }

    pub fn get_posting(&self, id: i64) -> Result<Option<PersistedPosting>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!("SELECT {POSTING_COLUMNS} FROM jobs WHERE id = ?1"))?;
        let mut rows = stmt.query_map([id], posting_from_row)?;
        Ok(rows.next().transpose()?)
    }

    pub fn stats(&self) -> Result<Stats> {
        let conn = self.conn();
        let total: usize = conn.query_row("SELECT COUNT(*) FROM jobs", [], |r| r.get(0))?;
        let grouped = |column: &str| -> Result<Vec<(String, usize)>> {
            let mut stmt = conn.prepare(&format!(
                "SELECT {column}, COUNT(*) FROM jobs GROUP BY {column} ORDER BY COUNT(*) DESC, {column}"
            ))?;
            let rows = stmt
                .query_map([], |r| Ok((r.get(0)?, r.get(1)?)))?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        };
        Ok(Stats {
            total,
            by_source: grouped("source")?,
            by_work_mode: grouped("work_mode")?,
        })
    }
}

impl PostingStore for SqliteStore {
    fn lock_writer(&self) -> MutexGuard<'_, ()> {
        self.writer.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn existing_source_keys(&self, keys: &[SourceKey]) -> Result<HashSet<SourceKey>> {
        if keys.is_empty() {
            return Ok(HashSet::new());
        }
        let placeholders = vec!["(?, ?)"; keys.len()].join(", ");
        let sql = format!(
            "SELECT source, source_job_id FROM jobs
             WHERE (source, source_job_id) IN (VALUES {placeholders})"
        );
        let conn = self.conn();
        let mut stmt = conn.prepare(&sql)?;
        let params = keys
            .iter()
            .flat_map(|k| [k.source.as_str(), k.source_job_id.as_str()]);
        let found = stmt
            .query_map(params_from_iter(params), |r| {
                Ok(SourceKey {
                    source: r.get(0)?,
                    source_job_id: r.get(1)?,
                })
            })?
            .collect::<std::result::Result<HashSet<_>, _>>()?;
        Ok(found)
    }

    fn fingerprint_exists(&self, fingerprint: &Fingerprint) -> Result<bool> {
        let conn = self.conn();
        let exists = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM jobs WHERE fingerprint = ?1)",
            [fingerprint.as_str()],
            |r| r.get(0),
        )?;
        Ok(exists)
    }

    fn insert_postings(&self, postings: &[NewPosting]) -> Result<usize> {
        let conn = self.conn();
        let tx = conn.unchecked_transaction()?;
        let mut count = 0;
        {
            let mut stmt = tx.prepare(
                "INSERT OR IGNORE INTO jobs (source, source_job_id, title, company, location,
                     city, country, url, description, posted_at, work_mode, salary_min,
                     salary_max, currency, fingerprint)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)",
            )?;
            for p in postings {
                let r = &p.record;
                count += stmt.execute(rusqlite::params![
                    r.source,
                    r.source_job_id,
                    r.title,
                    r.company,
                    r.location,
                    r.city,
                    r.country,
                    r.url,
                    r.description,
                    r.posted_at.as_ref().map(timestamp),
                    r.work_mode,
                    r.salary_min,
                    r.salary_max,
                    r.currency,
                    p.fingerprint.as_str(),
                ])?;
            }
        }
        tx.commit()?;
        debug!(inserted = count, offered = postings.len(), "insert committed");
        Ok(count)
    }
}

fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS jobs (
            id            INTEGER PRIMARY KEY,
            source        TEXT NOT NULL,
            source_job_id TEXT NOT NULL,
            title         TEXT,
            company       TEXT,
            location      TEXT,
            city          TEXT,
            country       TEXT NOT NULL DEFAULT 'CA',
            url           TEXT NOT NULL,
            description   TEXT,
            posted_at     TEXT,
            work_mode     TEXT NOT NULL DEFAULT 'unknown',
            salary_min    REAL,
            salary_max    REAL,
            currency      TEXT,
            fingerprint   TEXT NOT NULL,
            created_at    TEXT NOT NULL DEFAULT (datetime('now')),
            UNIQUE(source, source_job_id)
        );
        CREATE UNIQUE INDEX IF NOT EXISTS idx_jobs_fingerprint ON jobs(fingerprint);
        CREATE INDEX IF NOT EXISTS idx_jobs_created ON jobs(created_at);
        CREATE INDEX IF NOT EXISTS idx_jobs_city ON jobs(city);
        ",
    )?;
    Ok(())
}

fn timestamp(t: &DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn posting_from_row(row: &Row<'_>) -> rusqlite::Result<PersistedPosting> {
    let posted_at: Option<String> = row.get(10)?;
    Ok(PersistedPosting {
        id: row.get(0)?,
        record: RawCandidateRecord {
            source: row.get(1)?,
            source_job_id: row.get(2)?,
            title: row.get(3)?,
            company: row.get(4)?,
            location: row.get(5)?,
            city: row.get(6)?,
            country: row.get(7)?,
            url: row.get(8)?,
            description: row.get(9)?,
            posted_at: posted_at
                .and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
                .map(|t| t.with_timezone(&Utc)),
            work_mode: row.get(11)?,
            salary_min: row.get(12)?,
            salary_max: row.get(13)?,
            currency: row.get(14)?,
        },
        fingerprint: Fingerprint::from_hex(row.get(15)?),
        created_at: row.get(16)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    fn posting(id: &str, title: &str, city: &str, mode: &str) -> NewPosting {
        let record = RawCandidateRecord {
            source: "adzuna".into(),
            source_job_id: id.into(),
            title: Some(title.into()),
            company: Some("Acme".into()),
            city: Some(city.into()),
            country: "CA".into(),
            url: format!("https://example.com/{id}"),
            description: Some(format!("{title} role working with Rust")),
            work_mode: mode.into(),
            ..Default::default()
        };
        let fingerprint = record.fingerprint();
        NewPosting { record, fingerprint }
    }

    fn seeded() -> SqliteStore {
        let store = SqliteStore::open_in_memory().unwrap();
        let mut old = posting("3", "Old Role", "Ottawa", "onsite");
        old.record.posted_at = Some(Utc::now() - chrono::Duration::days(30));
        store
            .insert_postings(&[
                posting("1", "Backend Developer", "Toronto", "remote"),
                posting("2", "Frontend Developer", "Vancouver", "hybrid"),
                old,
            ])
            .unwrap();
        store
    }

    #[test]
    fn insert_ignores_unique_conflicts() {
        let store = SqliteStore::open_in_memory().unwrap();
        let a = posting("1", "Dev", "Toronto", "remote");
        assert_eq!(store.insert_postings(&[a.clone()]).unwrap(), 1);
        assert_eq!(store.insert_postings(&[a]).unwrap(), 0);
        let same_fp = posting("2", "Dev", "Toronto", "remote");
        assert_eq!(store.insert_postings(&[same_fp]).unwrap(), 0);
    }

    #[test]
    fn failed_insert_rolls_back_batch() {
        let store = SqliteStore::open_in_memory().unwrap();
        store
            .conn()
            .execute_batch(
                "CREATE TRIGGER reject_boom BEFORE INSERT ON jobs WHEN NEW.title = 'boom'
                 BEGIN SELECT RAISE(ABORT, 'rejected'); END;",
            )
            .unwrap();
        let batch = [posting("1", "fine", "Toronto", "remote"), posting("2", "boom", "Toronto", "remote")];
        assert!(matches!(store.insert_postings(&batch), Err(Error::Persistence(_))));
        assert_eq!(store.stats().unwrap().total, 0);
    }

    #[test]
    fn existing_keys_and_fingerprints() {
        let store = seeded();
        let keys = vec![
            SourceKey { source: "adzuna".into(), source_job_id: "1".into() },
            SourceKey { source: "adzuna".into(), source_job_id: "404".into() },
            SourceKey { source: "other".into(), source_job_id: "2".into() },
        ];
        let found = store.existing_source_keys(&keys).unwrap();
        assert_eq!(found.len(), 1);
        assert!(found.contains(&keys[0]));

        let fp = Fingerprint::of(Some("backend developer"), Some("ACME"), Some("toronto"));
        assert!(store.fingerprint_exists(&fp).unwrap());
        let other = Fingerprint::of(Some("Backend Developer"), Some("Acme"), Some("Calgary"));
        assert!(!store.fingerprint_exists(&other).unwrap());
    }

    #[test]
    fn list_filters() {
        let store = seeded();

        let (_, total) = store.list_postings(&ListFilter::default()).unwrap();
        assert_eq!(total, 3);

        let recent = ListFilter { days: Some(3), ..Default::default() };
        assert_eq!(store.list_postings(&recent).unwrap().1, 2);

        let city = ListFilter { city: Some("toronto, ON".into()), ..Default::default() };
        let (rows, total) = store.list_postings(&city).unwrap();
        assert_eq!(total, 1);
        assert_eq!(rows[0].record.title.as_deref(), Some("Backend Developer"));

        let nationwide = ListFilter { city: Some("Canada (All)".into()), ..Default::default() };
        assert_eq!(store.list_postings(&nationwide).unwrap().1, 3);

        let mode = ListFilter { work_mode: Some("Hybrid".into()), ..Default::default() };
        assert_eq!(store.list_postings(&mode).unwrap().1, 1);

        let keyword = ListFilter { keyword: Some("DEVELOPER".into()), ..Default::default() };
        assert_eq!(store.list_postings(&keyword).unwrap().1, 2);
    }

    #[test]
    fn list_defaults_to_canadian_postings() {
        let store = seeded();
        let mut abroad = posting("4", "Remote Developer", "Seattle", "remote");
        abroad.record.country = "US".into();
        store.insert_postings(&[abroad]).unwrap();

        assert_eq!(store.list_postings(&ListFilter::default()).unwrap().1, 3);

        let us = ListFilter { country: Some("us".into()), ..Default::default() };
        let (rows, total) = store.list_postings(&us).unwrap();
        assert_eq!(total, 1);
        assert_eq!(rows[0].record.city.as_deref(), Some("Seattle"));

        let any = ListFilter { country: None, ..Default::default() };
        assert_eq!(store.list_postings(&any).unwrap().1, 4);
    }

    #[test]
    fn list_pages_newest_first() {
        let store = seeded();
        let page = ListFilter { page: 2, page_size: 2, ..Default::default() };
        let (rows, total) = store.list_postings(&page).unwrap();
        assert_eq!(total, 3);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].record.source_job_id, "1");

        let huge = ListFilter { page_size: 10_000, ..Default::default() };
        assert_eq!(store.list_postings(&huge).unwrap().0.len(), 3);
    }

    #[test]
    fn get_and_stats() {
        let store = seeded();
        let first = store.get_posting(1).unwrap().unwrap();
        assert_eq!(first.record.source_job_id, "1");
        assert_eq!(first.fingerprint, first.record.fingerprint());
        assert!(store.get_posting(999).unwrap().is_none());

        let stats = store.stats().unwrap();
        assert_eq!(stats.total, 3);
        assert_eq!(stats.by_source, vec![("adzuna".to_string(), 3)]);
        assert_eq!(stats.by_work_mode.len(), 3);
    }

    #[test]
    fn posted_at_round_trips_to_the_second() {
        let store = SqliteStore::open_in_memory().unwrap();
        let mut p = posting("1", "Dev", "Toronto", "remote");
        let at = DateTime::parse_from_rfc3339("2024-05-02T10:00:00Z").unwrap().with_timezone(&Utc);
        p.record.posted_at = Some(at);
        store.insert_postings(&[p]).unwrap();
        assert_eq!(store.get_posting(1).unwrap().unwrap().record.posted_at, Some(at));
    }
}
