//! Compilation cache.
//!
//! Minified output is stored by the fingerprint of its source, one file per
//! entry, in a directory namespaced by compressor backend:
//!
//! ```text
//! <app-dir>/cache/
//! ├── closure/
//! │   └── <fingerprint>
//! └── uglifyjs/
//!     └── <fingerprint>
//! ```
//!
//! Entries are never evicted. Since keys are content-derived, rewriting an
//! existing key stores identical bytes.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::debug;

use crate::util::hash::Fingerprint;

#[derive(Debug, Error)]
pub enum CacheError {
  #[error("failed to create cache directory {}: {source}", path.display())]
  CreateDir {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("no cache entry for fingerprint {fingerprint}")]
  Miss { fingerprint: Fingerprint },

  #[error("failed to read cache entry {}: {source}", path.display())]
  Read {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("failed to write cache entry {}: {source}", path.display())]
  Write {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("fingerprint '{0}' cannot be used as a cache key")]
  InvalidKey(Fingerprint),
}

/// Fingerprint-keyed store of minified bytes for one backend.
#[derive(Debug, Clone)]
pub struct CacheStore {
  dir: PathBuf,
}

impl CacheStore {
  /// Open (creating if needed) the cache namespace at `dir`.
  pub fn open(dir: impl Into<PathBuf>) -> Result<Self, CacheError> {
    let dir = dir.into();
    fs::create_dir_all(&dir).map_err(|source| CacheError::CreateDir {
      path: dir.clone(),
      source,
    })?;
    debug!(dir = %dir.display(), "opened cache");
    Ok(Self { dir })
  }

  pub fn dir(&self) -> &Path {
    &self.dir
  }

  /// Path of the entry for `fingerprint`, whether or not it exists.
  pub fn entry_path(&self, fingerprint: &Fingerprint) -> PathBuf {
    self.dir.join(fingerprint.as_str())
  }

  pub fn has(&self, fingerprint: &Fingerprint) -> bool {
    fingerprint.is_filename_safe() && self.entry_path(fingerprint).is_file()
  }

  pub fn get(&self, fingerprint: &Fingerprint) -> Result<Vec<u8>, CacheError> {
    let path = self.entry_path(fingerprint);
    fs::read(&path).map_err(|source| {
      if source.kind() == io::ErrorKind::NotFound {
        CacheError::Miss {
          fingerprint: fingerprint.clone(),
        }
      } else {
        CacheError::Read { path, source }
      }
    })
  }

  /// Store `bytes` under `fingerprint`.
  ///
  /// The bytes go to a temporary file in the cache directory first and are
  /// renamed into place, so readers never observe a partial entry.
  pub fn put(&self, fingerprint: &Fingerprint, bytes: &[u8]) -> Result<(), CacheError> {
    if !fingerprint.is_filename_safe() {
      return Err(CacheError::InvalidKey(fingerprint.clone()));
    }

    let path = self.entry_path(fingerprint);
    let write_err = |source| CacheError::Write { path: path.clone(), source };

    let mut tmp = NamedTempFile::new_in(&self.dir).map_err(write_err)?;
    tmp.write_all(bytes).map_err(write_err)?;
    tmp.flush().map_err(write_err)?;
    tmp.persist(&path).map_err(|e| write_err(e.error))?;

    debug!(fingerprint = %fingerprint, bytes = bytes.len(), "cached entry");
    Ok(())
  }
}
