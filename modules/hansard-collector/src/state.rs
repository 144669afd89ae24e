// Crawl state that outlives a process: checkpoint, persisted dedup keys,
// per-day sitting-index cache and the failed-unit log.
//
// Each is an explicit object owned by the crawler; nothing here is global.

use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDate, Utc};
use hansard_common::{ClassifiedQuote, DedupKey};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tempfile::NamedTempFile;
use tracing::{debug, warn};

use crate::assembler::Deduplicator;
use crate::error::{Result, StoreError};

pub const CHECKPOINT_FILE: &str = "checkpoint.json";
pub const DEDUP_KEYS_FILE: &str = "dedup_keys.txt";
pub const FAILED_UNITS_FILE: &str = "failed_units.jsonl";
pub const SITTING_CACHE_DIR: &str = "cache/sittings";

/// Write `bytes` to `path` via a sibling temp file and rename.
fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(dir).map_err(StoreError::io(dir))?;
    let mut tmp = NamedTempFile::new_in(dir).map_err(StoreError::io(dir))?;
    tmp.write_all(bytes)
        .and_then(|_| tmp.as_file().sync_all())
        .map_err(StoreError::io(path))?;
    tmp.persist(path).map_err(|source| StoreError::Persist {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(())
}

// --- Checkpoint ---

#[derive(Debug, Serialize, Deserialize)]
struct CheckpointFile {
    last_completed: NaiveDate,
}

/// Last fully processed day. Written only after a whole day commits.
pub struct Checkpoint {
    path: PathBuf,
}

impl Checkpoint {
    pub fn new(dir: &Path) -> Self {
        Self {
            path: dir.join(CHECKPOINT_FILE),
        }
    }

    pub fn load(&self) -> Result<Option<NaiveDate>> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(StoreError::io(&self.path)(e)),
        };
        let file: CheckpointFile =
            serde_json::from_slice(&bytes).map_err(|source| StoreError::Record {
                path: self.path.clone(),
                line: 1,
                source,
            })?;
        Ok(Some(file.last_completed))
    }

    pub fn save(&self, last_completed: NaiveDate) -> Result<()> {
        let json = serde_json::to_vec(&CheckpointFile { last_completed })?;
        write_atomic(&self.path, &json)
    }
}

// --- Dedup keys ---

/// Persisted set of dedup fingerprints, one hex digest per line.
pub struct DedupStore {
    path: PathBuf,
    file: File,
    seen: Deduplicator,
}

impl DedupStore {
    /// Load the key file and union it with keys derived from `existing`
    /// records, so a crash between the record write and the key write
    /// never lets a quote through twice.
    pub fn open(dir: &Path, existing: &[ClassifiedQuote]) -> Result<Self> {
        fs::create_dir_all(dir).map_err(StoreError::io(dir))?;
        let path = dir.join(DEDUP_KEYS_FILE);

        let mut fingerprints = Vec::new();
        match File::open(&path) {
            Ok(file) => {
                for line in BufReader::new(file).lines() {
                    let line = line.map_err(StoreError::io(&path))?;
                    let line = line.trim();
                    if !line.is_empty() {
                        fingerprints.push(line.to_string());
                    }
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(StoreError::io(&path)(e)),
        }
        let from_file = fingerprints.len();
        fingerprints.extend(existing.iter().map(|q| q.dedup_key().fingerprint()));

        let seen = Deduplicator::from_fingerprints(fingerprints);
        debug!(from_file, total = seen.len(), "Loaded dedup keys");

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(StoreError::io(&path))?;
        Ok(Self { path, file, seen })
    }

    pub fn contains(&self, key: &DedupKey) -> bool {
        self.seen.contains(key)
    }

    /// Record a key. Returns false if it was already present.
    pub fn insert(&mut self, key: &DedupKey) -> Result<bool> {
        if !self.seen.check_and_insert(key) {
            return Ok(false);
        }
        writeln!(self.file, "{}", key.fingerprint())
            .and_then(|_| self.file.sync_data())
            .map_err(StoreError::io(&self.path))?;
        Ok(true)
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}

// --- Sitting-index cache ---

/// Raw sitting-index bodies keyed by date, so a re-run does not refetch them.
pub struct IndexCache {
    dir: PathBuf,
}

impl IndexCache {
    pub fn new(output_dir: &Path) -> Self {
        Self {
            dir: output_dir.join(SITTING_CACHE_DIR),
        }
    }

    fn path_for(&self, date: NaiveDate) -> PathBuf {
        self.dir.join(format!("{}.json", date.format("%Y-%m-%d")))
    }

    /// Cached body, if present and readable. A corrupt entry is a miss.
    pub fn get(&self, date: NaiveDate) -> Option<Value> {
        let path = self.path_for(date);
        let bytes = fs::read(&path).ok()?;
        match serde_json::from_slice(&bytes) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Ignoring corrupt cache entry");
                None
            }
        }
    }

    pub fn put(&self, date: NaiveDate, index: &Value) -> Result<()> {
        let json = serde_json::to_vec(index)?;
        write_atomic(&self.path_for(date), &json)
    }
}

// --- Failed units ---

/// A day or debate whose retry budget ran out. `href` is `None` for a whole day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedUnit {
    pub date: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub href: Option<String>,
    pub reason: String,
    pub recorded_at: DateTime<Utc>,
}

impl FailedUnit {
    pub fn day(date: NaiveDate, reason: impl Into<String>) -> Self {
        Self {
            date,
            href: None,
            reason: reason.into(),
            recorded_at: Utc::now(),
        }
    }

    pub fn debate(date: NaiveDate, href: &str, reason: impl Into<String>) -> Self {
        Self {
            date,
            href: Some(href.to_string()),
            reason: reason.into(),
            recorded_at: Utc::now(),
        }
    }
}

pub struct FailureLog {
    path: PathBuf,
}

impl FailureLog {
    pub fn new(dir: &Path) -> Self {
        Self {
            path: dir.join(FAILED_UNITS_FILE),
        }
    }

    pub fn record(&self, unit: &FailedUnit) -> Result<()> {
        let mut line = serde_json::to_string(unit)?;
        line.push('\n');
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .and_then(|mut f| f.write_all(line.as_bytes()).and_then(|_| f.sync_data()))
            .map_err(StoreError::io(&self.path))
    }

    pub fn read_all(&self) -> Result<Vec<FailedUnit>> {
        let file = match File::open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(StoreError::io(&self.path)(e)),
        };
        let mut units = Vec::new();
        for (n, line) in BufReader::new(file).lines().enumerate() {
            let line = line.map_err(StoreError::io(&self.path))?;
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str(&line) {
                Ok(unit) => units.push(unit),
                Err(e) => warn!(path = %self.path.display(), line = n + 1, error = %e, "Skipping unreadable failure entry"),
            }
        }
        Ok(units)
    }
}
