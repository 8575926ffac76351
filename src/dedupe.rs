// src/dedupe.rs
//! Durable record of emitted canonical URLs, plus the per-run session that
//! decides accept / repost / duplicate.
//!
//! Key is `(canonical_url, platform, profile)`. News items are stored with an
//! empty profile so a URL seen from any outlet counts as seen.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use tracing::info;

use crate::canonical::CanonicalUrl;
use crate::error::Result;
use crate::ingest::types::Platform;

const BUSY_TIMEOUT: Duration = Duration::from_secs(10);

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS seen_items (
    canonical_url  TEXT NOT NULL,
    platform       TEXT NOT NULL,
    profile        TEXT NOT NULL DEFAULT '',
    post_url       TEXT NOT NULL,
    first_seen_at  TEXT NOT NULL,
    PRIMARY KEY (canonical_url, platform, profile)
);";

const INSERT: &str = "INSERT OR IGNORE INTO seen_items
    (canonical_url, platform, profile, post_url, first_seen_at)
    VALUES (?1, ?2, ?3, ?4, ?5)";

/// Profile component of the key: empty for News.
pub fn key_profile(platform: Platform, profile: &str) -> &str {
    match platform {
        Platform::News => "",
        _ => profile,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeenRecord {
    pub canonical: CanonicalUrl,
    pub platform: Platform,
    pub profile: String,
    pub post_url: String,
    pub first_seen_at: DateTime<Utc>,
}

impl SeenRecord {
    pub fn new(platform: Platform, canonical: CanonicalUrl, profile: &str, post_url: &str) -> Self {
        Self {
            profile: key_profile(platform, profile).to_string(),
            canonical,
            platform,
            post_url: post_url.to_string(),
            first_seen_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DedupeDecision {
    Accept,
    Repost,
    Duplicate,
}

impl DedupeDecision {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Accept => "accept",
            Self::Repost => "repost",
            Self::Duplicate => "duplicate",
        }
    }
}

pub struct DedupeStore {
    conn: Connection,
    path: Option<PathBuf>,
}

impl DedupeStore {
    /// Open (or create) the store file.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;",
        )?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn,
            path: Some(path.to_path_buf()),
        })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn, path: None })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Seen on this platform under any profile.
    pub fn has_seen(&self, platform: Platform, canonical: &CanonicalUrl) -> Result<bool> {
        let hit = self
            .conn
            .query_row(
                "SELECT 1 FROM seen_items WHERE canonical_url = ?1 AND platform = ?2 LIMIT 1",
                params![canonical.as_str(), platform.as_str()],
                |_| Ok(()),
            )
            .optional()?;
        Ok(hit.is_some())
    }

    pub fn has_seen_for_profile(
        &self,
        platform: Platform,
        canonical: &CanonicalUrl,
        profile: &str,
    ) -> Result<bool> {
        Ok(self.first_seen(platform, canonical, profile)?.is_some())
    }

    /// Returns false when the key was already present.
    pub fn mark_seen(&self, rec: &SeenRecord) -> Result<bool> {
        Ok(insert(&self.conn, rec)? == 1)
    }

    pub fn len(&self) -> Result<usize> {
        let n: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM seen_items", [], |row| row.get(0))?;
        Ok(n as usize)
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// When the key was first emitted, as stored.
    pub fn first_seen(
        &self,
        platform: Platform,
        canonical: &CanonicalUrl,
        profile: &str,
    ) -> Result<Option<String>> {
        let ts = self
            .conn
            .query_row(
                "SELECT first_seen_at FROM seen_items
                 WHERE canonical_url = ?1 AND platform = ?2 AND profile = ?3",
                params![
                    canonical.as_str(),
                    platform.as_str(),
                    key_profile(platform, profile)
                ],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(ts)
    }

    /// Archive the store file as `<name>.<timestamp>.bak` and start empty.
    /// Returns the fresh store and the archive path, if a file existed.
    pub fn reset(self) -> Result<(DedupeStore, Option<PathBuf>)> {
        let Some(path) = self.path.clone() else {
            return Ok((DedupeStore::open_in_memory()?, None));
        };

        self.conn
            .query_row("PRAGMA wal_checkpoint(TRUNCATE)", [], |_| Ok(()))?;
        self.conn.close().map_err(|(_, e)| e)?;

        let archived = if path.exists() {
            let target = archive_path(&path);
            fs::rename(&path, &target)?;
            Some(target)
        } else {
            None
        };
        for suffix in ["-wal", "-shm"] {
            let mut side = path.clone().into_os_string();
            side.push(suffix);
            match fs::remove_file(PathBuf::from(side)) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }

        info!(target: "intake", store = %path.display(), archived = ?archived, "dedupe store reset");
        Ok((DedupeStore::open(&path)?, archived))
    }

    pub fn session(&mut self) -> DedupeSession<'_> {
        DedupeSession::new(self)
    }
}

fn insert(conn: &Connection, rec: &SeenRecord) -> rusqlite::Result<usize> {
    conn.execute(
        INSERT,
        params![
            rec.canonical.as_str(),
            rec.platform.as_str(),
            key_profile(rec.platform, &rec.profile),
            rec.post_url,
            rec.first_seen_at.to_rfc3339(),
        ],
    )
}

fn archive_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "dedupe.db".to_string());
    let stamp = Utc::now().format("%Y%m%dT%H%M%SZ");
    let mut candidate = path.with_file_name(format!("{name}.{stamp}.bak"));
    let mut n = 1;
    while candidate.exists() {
        candidate = path.with_file_name(format!("{name}.{stamp}.{n}.bak"));
        n += 1;
    }
    candidate
}

/// Per-run view over the store. Decisions see both durable records and
/// items accepted earlier in the same run; nothing is written until
/// [`DedupeSession::commit`].
pub struct DedupeSession<'a> {
    store: &'a mut DedupeStore,
    staged: Vec<SeenRecord>,
    ledger: HashMap<(Platform, CanonicalUrl), HashSet<String>>,
}

impl<'a> DedupeSession<'a> {
    pub fn new(store: &'a mut DedupeStore) -> Self {
        Self {
            store,
            staged: Vec::new(),
            ledger: HashMap::new(),
        }
    }

    pub fn decide(
        &self,
        platform: Platform,
        canonical: &CanonicalUrl,
        profile: &str,
    ) -> Result<DedupeDecision> {
        let profile = key_profile(platform, profile);
        let staged = self.ledger.get(&(platform, canonical.clone()));

        let same_profile = staged.is_some_and(|p| p.contains(profile))
            || self.store.has_seen_for_profile(platform, canonical, profile)?;
        if same_profile {
            return Ok(DedupeDecision::Duplicate);
        }

        let any_profile = staged.is_some_and(|p| !p.is_empty())
            || self.store.has_seen(platform, canonical)?;
        Ok(match (platform, any_profile) {
            (_, false) => DedupeDecision::Accept,
            (Platform::News, true) => DedupeDecision::Duplicate,
            (_, true) => DedupeDecision::Repost,
        })
    }

    /// Stage an accepted item.
    pub fn record(&mut self, rec: SeenRecord) {
        self.ledger
            .entry((rec.platform, rec.canonical.clone()))
            .or_default()
            .insert(rec.profile.clone());
        self.staged.push(rec);
    }

    pub fn staged(&self) -> &[SeenRecord] {
        &self.staged
    }

    /// Write staged records in one transaction; returns rows inserted.
    pub fn commit(self) -> Result<usize> {
        let tx = self.store.conn.transaction()?;
        let mut inserted = 0;
        for rec in &self.staged {
            inserted += insert(&tx, rec)?;
        }
        tx.commit()?;
        Ok(inserted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canonical::canonicalize;

    fn url(s: &str) -> CanonicalUrl {
        canonicalize(s).unwrap()
    }

    #[test]
    fn mark_seen_is_idempotent() {
        let store = DedupeStore::open_in_memory().unwrap();
        let rec = SeenRecord::new(Platform::Reddit, url("https://a.com/x"), "u/a", "https://a.com/x");
        assert!(store.mark_seen(&rec).unwrap());
        assert!(!store.mark_seen(&rec).unwrap());
        assert_eq!(store.len().unwrap(), 1);
        assert!(store.has_seen(Platform::Reddit, &rec.canonical).unwrap());
        assert!(store.has_seen_for_profile(Platform::Reddit, &rec.canonical, "u/a").unwrap());
        assert!(!store.has_seen_for_profile(Platform::Reddit, &rec.canonical, "u/b").unwrap());
        // scoped by platform
        assert!(!store.has_seen(Platform::X, &rec.canonical).unwrap());
    }

    #[test]
    fn news_profile_is_ignored() {
        let store = DedupeStore::open_in_memory().unwrap();
        let rec = SeenRecord::new(Platform::News, url("https://n.com/a"), "Reuters", "https://n.com/a");
        assert_eq!(rec.profile, "");
        store.mark_seen(&rec).unwrap();
        assert!(store
            .has_seen_for_profile(Platform::News, &rec.canonical, "AP")
            .unwrap());
        assert!(store
            .first_seen(Platform::News, &rec.canonical, "anything")
            .unwrap()
            .is_some());
    }

    #[test]
    fn session_decisions_against_store() {
        let mut store = DedupeStore::open_in_memory().unwrap();
        let c = url("https://a.com/x");
        store
            .mark_seen(&SeenRecord::new(Platform::X, c.clone(), "@a", "https://a.com/x"))
            .unwrap();
        let session = store.session();
        assert_eq!(session.decide(Platform::X, &c, "@a").unwrap(), DedupeDecision::Duplicate);
        assert_eq!(session.decide(Platform::X, &c, "@b").unwrap(), DedupeDecision::Repost);
        assert_eq!(session.decide(Platform::Reddit, &c, "u/a").unwrap(), DedupeDecision::Accept);
    }

    #[test]
    fn session_ledger_uses_same_key_logic() {
        let mut store = DedupeStore::open_in_memory().unwrap();
        let c = url("https://a.com/x");
        let mut session = store.session();
        assert_eq!(session.decide(Platform::Reddit, &c, "u/a").unwrap(), DedupeDecision::Accept);
        session.record(SeenRecord::new(Platform::Reddit, c.clone(), "u/a", c.as_str()));
        assert_eq!(session.decide(Platform::Reddit, &c, "u/a").unwrap(), DedupeDecision::Duplicate);
        assert_eq!(session.decide(Platform::Reddit, &c, "u/b").unwrap(), DedupeDecision::Repost);

        session.record(SeenRecord::new(Platform::News, c.clone(), "Reuters", c.as_str()));
        assert_eq!(session.decide(Platform::News, &c, "AP").unwrap(), DedupeDecision::Duplicate);

        assert_eq!(session.commit().unwrap(), 2);
        assert_eq!(store.len().unwrap(), 2);
    }

    #[test]
    fn dropped_session_writes_nothing() {
        let mut store = DedupeStore::open_in_memory().unwrap();
        {
            let mut session = store.session();
            session.record(SeenRecord::new(Platform::X, url("https://a.com/1"), "@a", "https://a.com/1"));
            assert_eq!(session.staged().len(), 1);
        }
        assert!(store.is_empty().unwrap());
    }

    #[test]
    fn reset_archives_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("seen.db");
        let store = DedupeStore::open(&path).unwrap();
        store
            .mark_seen(&SeenRecord::new(Platform::X, url("https://a.com/1"), "@a", "https://a.com/1"))
            .unwrap();

        let (fresh, archived) = store.reset().unwrap();
        assert!(fresh.is_empty().unwrap());
        let archived = archived.unwrap();
        assert!(archived.exists());
        let name = archived.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("seen.db.") && name.ends_with(".bak"), "{name}");

        let old = DedupeStore::open(&archived).unwrap();
        assert_eq!(old.len().unwrap(), 1);
    }

    #[test]
    fn reset_in_memory() {
        let store = DedupeStore::open_in_memory().unwrap();
        let (fresh, archived) = store.reset().unwrap();
        assert!(archived.is_none());
        assert!(fresh.path().is_none());
    }
}
