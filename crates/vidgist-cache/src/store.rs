//! JSON file store with a self-healing index.

use crate::error::{CacheError, CacheResult};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};
use vidgist_core::CacheRecord;

const INDEX_FILE: &str = "index.json";
const RECORDS_DIR: &str = "records";

/// Where a fingerprint's record lives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexEntry {
    pub video_id: String,
    pub file: String,
}

type Index = BTreeMap<String, IndexEntry>;

/// Cache of processed videos keyed by fingerprint.
pub struct ContentCache {
    index_path: PathBuf,
    records_dir: PathBuf,
    lock: Mutex<()>,
}

impl ContentCache {
    /// Open (or create) a cache rooted at `dir`.
    pub fn open<P: AsRef<Path>>(dir: P) -> CacheResult<Self> {
        let dir = dir.as_ref();
        let records_dir = dir.join(RECORDS_DIR);
        fs::create_dir_all(&records_dir)?;

        info!("Opening cache at: {}", dir.display());

        Ok(Self {
            index_path: dir.join(INDEX_FILE),
            records_dir,
            lock: Mutex::new(()),
        })
    }

    /// File name for a fingerprint: hex SHA-256 of the fingerprint.
    pub fn file_name_for(fingerprint: &str) -> String {
        let digest = Sha256::digest(fingerprint.as_bytes());
        let hex: String = digest.iter().map(|b| format!("{:02x}", b)).collect();
        format!("{}.json", hex)
    }

    /// Look up a record. Missing or unreadable records are a miss.
    ///
    /// An index entry whose file has disappeared is dropped from the index.
    pub fn get(&self, fingerprint: &str) -> Option<CacheRecord> {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        let mut index = self.load_index();

        let entry = index.get(fingerprint)?.clone();
        let path = self.records_dir.join(&entry.file);

        if !path.exists() {
            warn!(
                "Cache index points at missing file {} for {}, dropping entry",
                entry.file, fingerprint
            );
            index.remove(fingerprint);
            if let Err(e) = self.write_index(&index) {
                warn!("Failed to persist healed cache index: {}", e);
            }
            return None;
        }

        let contents = match fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(e) => {
                warn!("Failed to read cache record {}: {}", path.display(), e);
                return None;
            }
        };

        match serde_json::from_str(&contents) {
            Ok(record) => {
                debug!("Cache hit for {}", fingerprint);
                Some(record)
            }
            Err(e) => {
                warn!("Corrupt cache record {}: {}", path.display(), e);
                None
            }
        }
    }

    /// Store a record, replacing any previous one. Returns whether it committed.
    pub fn put(&self, fingerprint: &str, record: &CacheRecord) -> bool {
        match self.try_put(fingerprint, record) {
            Ok(()) => true,
            Err(e) => {
                warn!("Failed to cache {}: {}", fingerprint, e);
                false
            }
        }
    }

    /// Store a record, reporting why it failed.
    pub fn try_put(&self, fingerprint: &str, record: &CacheRecord) -> CacheResult<()> {
        let file = Self::file_name_for(fingerprint);
        let bytes = serde_json::to_vec_pretty(record)?;

        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        self.write_atomic(&self.records_dir.join(&file), &bytes)?;

        let mut index = self.load_index();
        index.insert(
            fingerprint.to_string(),
            IndexEntry {
                video_id: record.video_id.clone(),
                file,
            },
        );
        self.write_index(&index)?;

        debug!("Cached {}", fingerprint);
        Ok(())
    }

    /// Remove one record, or everything when `fingerprint` is `None`.
    pub fn clear(&self, fingerprint: Option<&str>) -> bool {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());

        let result = match fingerprint {
            Some(fingerprint) => self.clear_one(fingerprint),
            None => self.clear_all(),
        };

        match result {
            Ok(()) => true,
            Err(e) => {
                warn!("Failed to clear cache: {}", e);
                false
            }
        }
    }

    fn clear_one(&self, fingerprint: &str) -> CacheResult<()> {
        let mut index = self.load_index();
        let file = index
            .remove(fingerprint)
            .map(|entry| entry.file)
            .unwrap_or_else(|| Self::file_name_for(fingerprint));

        let path = self.records_dir.join(file);
        if path.exists() {
            fs::remove_file(&path)?;
        }
        self.write_index(&index)?;
        info!("Cleared cache entry {}", fingerprint);
        Ok(())
    }

    fn clear_all(&self) -> CacheResult<()> {
        let mut removed = 0;
        for entry in fs::read_dir(&self.records_dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) == Some("json") {
                fs::remove_file(&path)?;
                removed += 1;
            }
        }
        self.write_index(&Index::new())?;
        info!("Cleared {} cache records", removed);
        Ok(())
    }

    /// All index entries, sorted by fingerprint.
    pub fn entries(&self) -> Vec<(String, IndexEntry)> {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        self.load_index().into_iter().collect()
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn load_index(&self) -> Index {
        if !self.index_path.exists() {
            return Index::new();
        }

        match fs::read_to_string(&self.index_path)
            .map_err(CacheError::from)
            .and_then(|s| serde_json::from_str(&s).map_err(CacheError::from))
        {
            Ok(index) => index,
            Err(e) => {
                warn!("Cache index unreadable, starting empty: {}", e);
                Index::new()
            }
        }
    }

    fn write_index(&self, index: &Index) -> CacheResult<()> {
        let bytes = serde_json::to_vec_pretty(index)?;
        self.write_atomic(&self.index_path, &bytes)
    }

    /// Write to a sibling temp file, then rename over `path`.
    fn write_atomic(&self, path: &Path, bytes: &[u8]) -> CacheResult<()> {
        let dir = path.parent().unwrap_or_else(|| Path::new("."));
        let mut tmp = NamedTempFile::new_in(dir)?;
        tmp.write_all(bytes)?;
        tmp.as_file().sync_all()?;
        tmp.persist(path).map_err(|e| CacheError::Persist {
            path: path.display().to_string(),
            source: e.error,
        })?;
        Ok(())
    }
}
