// src/store.rs
//! Fingerprint stores: the dedup memory of a pipeline.
//!
//! - `MemoryStore` lives for the process lifetime and starts empty.
//! - `DurableStore` wraps the same set and rewrites a JSON array file after
//!   every insertion, so a restart only forgets what was added after the last
//!   successful write.

use anyhow::{Context, Result};
use metrics::counter;
use std::collections::HashSet;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::fingerprint::Fingerprint;

pub trait FingerprintStore: Send {
    fn contains(&self, fp: &Fingerprint) -> bool;
    fn add(&mut self, fp: Fingerprint);
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    seen: HashSet<Fingerprint>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_set(seen: HashSet<Fingerprint>) -> Self {
        Self { seen }
    }

    fn sorted(&self) -> Vec<&Fingerprint> {
        let mut v: Vec<&Fingerprint> = self.seen.iter().collect();
        v.sort();
        v
    }
}

impl FingerprintStore for MemoryStore {
    fn contains(&self, fp: &Fingerprint) -> bool {
        self.seen.contains(fp)
    }

    fn add(&mut self, fp: Fingerprint) {
        self.seen.insert(fp);
    }

    fn len(&self) -> usize {
        self.seen.len()
    }
}

#[derive(Debug)]
pub struct DurableStore {
    mem: MemoryStore,
    path: PathBuf,
}

impl DurableStore {
    /// Open the store at `path`, loading whatever was persisted before.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let seen = load(&path);
        tracing::info!(path = %path.display(), loaded = seen.len(), "durable fingerprint store opened");
        Self {
            mem: MemoryStore::from_set(seen),
            path,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Overwrite the backing file with the full set (temp file + rename).
    pub fn persist(&self) -> Result<()> {
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)
                .with_context(|| format!("creating store dir {}", dir.display()))?;
        }
        let json = serde_json::to_vec(&self.mem.sorted()).context("serializing fingerprints")?;
        let tmp = self.path.with_extension("json.tmp");
        let mut f = fs::File::create(&tmp)
            .with_context(|| format!("creating {}", tmp.display()))?;
        f.write_all(&json)
            .with_context(|| format!("writing {}", tmp.display()))?;
        f.sync_all()
            .with_context(|| format!("syncing {}", tmp.display()))?;
        fs::rename(&tmp, &self.path)
            .with_context(|| format!("renaming into {}", self.path.display()))?;
        Ok(())
    }
}

impl FingerprintStore for DurableStore {
    fn contains(&self, fp: &Fingerprint) -> bool {
        self.mem.contains(fp)
    }

    fn add(&mut self, fp: Fingerprint) {
        self.mem.add(fp);
        if let Err(e) = self.persist() {
            // Keep serving from memory; the next insertion retries the write.
            tracing::error!(error = ?e, path = %self.path.display(), "fingerprint store persist failed");
            counter!("notifier_store_persist_errors_total").increment(1);
        }
    }

    fn len(&self) -> usize {
        self.mem.len()
    }
}

/// Read a persisted fingerprint set. Missing or corrupt files yield an empty set.
pub fn load(path: &Path) -> HashSet<Fingerprint> {
    let raw = match fs::read_to_string(path) {
        Ok(s) => s,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return HashSet::new(),
        Err(e) => {
            tracing::warn!(error = ?e, path = %path.display(), "cannot read fingerprint store, starting empty");
            return HashSet::new();
        }
    };
    match serde_json::from_str::<Vec<Fingerprint>>(&raw) {
        Ok(v) => v.into_iter().collect(),
        Err(e) => {
            tracing::warn!(error = ?e, path = %path.display(), "corrupt fingerprint store, starting empty");
            HashSet::new()
        }
    }
}
