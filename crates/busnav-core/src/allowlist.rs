//! Persisted allow-list of poster methods.
//!
//! The allow-list is a set of fully-qualified method names (`Owner.method`)
//! designated as event posters. It is stored as a plain text file, one name
//! per line, joined with `\n` and without a trailing terminator.
//!
//! # Lifecycle
//!
//! - Loaded lazily on first use and cached for the lifetime of the store
//! - The built-in defaults are always present; file entries are added to them
//! - Every mutation rewrites the whole file synchronously
//!
//! The cached set and every write go through one mutex, so concurrent first
//! use from several threads reads the file once.

use std::collections::BTreeSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use thiserror::Error;
use tracing::{debug, info};

/// File name of the allow-list inside the configuration directory.
pub const POSTER_FILE_NAME: &str = "post-methods";

/// Errors reading or writing the allow-list.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The allow-list file exists but could not be read.
    #[error("failed to read allow-list {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The allow-list file could not be written.
    #[error("failed to write allow-list {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Result type for allow-list operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Lazily loaded, write-through allow-list.
#[derive(Debug)]
pub struct AllowListStore {
    path: PathBuf,
    defaults: BTreeSet<String>,
    entries: Mutex<Option<BTreeSet<String>>>,
}

impl AllowListStore {
    /// Create a store backed by `path`, seeded with `defaults`. Nothing is
    /// read until first use.
    pub fn new<I, S>(path: impl Into<PathBuf>, defaults: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        AllowListStore {
            path: path.into(),
            defaults: defaults.into_iter().map(Into::into).collect(),
            entries: Mutex::new(None),
        }
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Built-in entries, present whether or not the file exists.
    pub fn defaults(&self) -> &BTreeSet<String> {
        &self.defaults
    }

    /// Whether the set has been read yet.
    pub fn is_loaded(&self) -> bool {
        self.lock().is_some()
    }

    /// Snapshot of the current entries, loading them on first use.
    pub fn load(&self) -> StoreResult<BTreeSet<String>> {
        let mut slot = self.lock();
        Ok(self.loaded(&mut slot)?.clone())
    }

    /// Discard the cached set and read the file again.
    pub fn reload(&self) -> StoreResult<BTreeSet<String>> {
        let mut slot = self.lock();
        *slot = None;
        Ok(self.loaded(&mut slot)?.clone())
    }

    /// Whether `name` is an allow-listed poster.
    pub fn contains(&self, name: &str) -> StoreResult<bool> {
        let mut slot = self.lock();
        Ok(self.loaded(&mut slot)?.contains(name))
    }

    /// Add `name` and persist the full set.
    ///
    /// Returns `true` if the name was not present before. The file is
    /// rewritten either way. A failed write leaves the cached set unchanged.
    pub fn add(&self, name: &str) -> StoreResult<bool> {
        let mut slot = self.lock();
        let entries = self.loaded(&mut slot)?;
        let inserted = entries.insert(name.to_string());
        if let Err(err) = self.persist(entries) {
            if inserted {
                entries.remove(name);
            }
            return Err(err);
        }
        info!(
            poster = name,
            inserted,
            path = %self.path.display(),
            "persisted poster allow-list"
        );
        Ok(inserted)
    }

    fn lock(&self) -> MutexGuard<'_, Option<BTreeSet<String>>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn loaded<'a>(
        &self,
        slot: &'a mut Option<BTreeSet<String>>,
    ) -> StoreResult<&'a mut BTreeSet<String>> {
        let entries = match slot.take() {
            Some(entries) => entries,
            None => self.read_from_disk()?,
        };
        Ok(slot.insert(entries))
    }

    fn read_from_disk(&self) -> StoreResult<BTreeSet<String>> {
        match fs::read_to_string(&self.path) {
            Ok(content) => {
                let mut entries = self.defaults.clone();
                entries.extend(
                    content
                        .lines()
                        .map(str::trim)
                        .filter(|line| !line.is_empty())
                        .map(str::to_string),
                );
                debug!(
                    count = entries.len(),
                    path = %self.path.display(),
                    "loaded poster allow-list"
                );
                Ok(entries)
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "no allow-list file, using defaults");
                Ok(self.defaults.clone())
            }
            Err(source) => Err(StoreError::Read {
                path: self.path.clone(),
                source,
            }),
        }
    }

    fn persist(&self, entries: &BTreeSet<String>) -> StoreResult<()> {
        let write_err = |source| StoreError::Write {
            path: self.path.clone(),
            source,
        };
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(write_err)?;
        }
        let content = entries
            .iter()
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join("\n");
        fs::write(&self.path, content).map_err(write_err)
    }
}

// ============================================================================
// Tests
// ============================================================================
