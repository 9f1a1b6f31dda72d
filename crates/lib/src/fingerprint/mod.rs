//! Content fingerprinting.
//!
//! A [`Fingerprinter`] maps file paths to content fingerprints. The planner asks
//! for one directory at a time rather than one file at a time, because the
//! external provider is far cheaper per batch than per invocation. Directories
//! are fingerprinted concurrently by [`fingerprint_directories`] and merged by a
//! single collecting loop.

mod shasum;

use std::collections::HashMap;
use std::future::Future;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, warn};

pub use shasum::ShasumFingerprinter;

pub use crate::util::hash::Fingerprint;
use crate::process::ProcessError;
use crate::util::hash::hash_file;

/// Normalized source path to its content fingerprint.
pub type FingerprintTable = HashMap<PathBuf, Fingerprint>;

#[derive(Debug, Error)]
pub enum FingerprintError {
  #[error("failed to list directory {}: {source}", path.display())]
  ReadDir {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("failed to read {}: {source}", path.display())]
  ReadFile {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("'{command}' exited with code {code:?}: {diagnostics}")]
  Tool {
    command: String,
    code: Option<i32>,
    diagnostics: String,
  },

  #[error("unexpected fingerprint output line: '{line}'")]
  Malformed { line: String },

  #[error(transparent)]
  Process(#[from] ProcessError),

  #[error("fingerprint task failed: {0}")]
  Task(String),
}

/// Computes content fingerprints for files.
pub trait Fingerprinter: Send + Sync {
  /// Fingerprint each of `files`. The returned table is keyed by the paths as given.
  fn fingerprint_files(
    &self,
    files: &[PathBuf],
  ) -> impl Future<Output = Result<FingerprintTable, FingerprintError>> + Send;

  /// Fingerprint every regular file physically present directly in `dir`.
  ///
  /// A missing directory, a path that is not a directory, or one without
  /// regular files yields an empty table and the provider is not invoked.
  fn fingerprint_dir(&self, dir: &Path) -> impl Future<Output = Result<FingerprintTable, FingerprintError>> + Send {
    async move {
      let files = list_files(dir).await?;
      if files.is_empty() {
        debug!(dir = %dir.display(), "no files to fingerprint");
        return Ok(FingerprintTable::new());
      }
      self.fingerprint_files(&files).await
    }
  }
}

/// In-process SHA-256 fingerprints.
#[derive(Debug, Clone, Copy, Default)]
pub struct Sha256Fingerprinter;

impl Sha256Fingerprinter {
  /// Hash `files` on the blocking pool.
  ///
  /// With `skip_unreadable`, a file that cannot be read is logged and left out
  /// of the table instead of failing the whole batch.
  async fn hash_all(files: Vec<PathBuf>, skip_unreadable: bool) -> Result<FingerprintTable, FingerprintError> {
    tokio::task::spawn_blocking(move || {
      let mut table = FingerprintTable::new();
      for path in files {
        match hash_file(&path) {
          Ok(hash) => {
            table.insert(path, hash);
          }
          Err(e) if skip_unreadable => {
            warn!(path = %path.display(), error = %e, "skipping unreadable file");
          }
          Err(source) => return Err(FingerprintError::ReadFile { path, source }),
        }
      }
      Ok(table)
    })
    .await
    .map_err(|e| FingerprintError::Task(e.to_string()))?
  }
}

impl Fingerprinter for Sha256Fingerprinter {
  async fn fingerprint_files(&self, files: &[PathBuf]) -> Result<FingerprintTable, FingerprintError> {
    Self::hash_all(files.to_vec(), false).await
  }

  /// Scans tolerate unreadable siblings; only a referenced file missing from
  /// the table fails the run, and the planner reports that.
  async fn fingerprint_dir(&self, dir: &Path) -> Result<FingerprintTable, FingerprintError> {
    let files = list_files(dir).await?;
    if files.is_empty() {
      debug!(dir = %dir.display(), "no files to fingerprint");
      return Ok(FingerprintTable::new());
    }
    Self::hash_all(files, true).await
  }
}

/// Regular files directly inside `dir`, sorted. Symlinks to files count as files.
async fn list_files(dir: &Path) -> Result<Vec<PathBuf>, FingerprintError> {
  let read_dir_err = |source| FingerprintError::ReadDir {
    path: dir.to_path_buf(),
    source,
  };

  let mut entries = match tokio::fs::read_dir(dir).await {
    Ok(entries) => entries,
    Err(e) if matches!(e.kind(), io::ErrorKind::NotFound | io::ErrorKind::NotADirectory) => {
      debug!(dir = %dir.display(), error = %e, "no such directory");
      return Ok(Vec::new());
    }
    Err(e) => return Err(read_dir_err(e)),
  };
  let mut files = Vec::new();

  while let Some(entry) = entries.next_entry().await.map_err(read_dir_err)? {
    let path = entry.path();
    match tokio::fs::metadata(&path).await {
      Ok(meta) if meta.is_file() => files.push(path),
      Ok(_) => {}
      Err(e) => warn!(path = %path.display(), error = %e, "skipping unreadable directory entry"),
    }
  }

  files.sort();
  Ok(files)
}

/// Fingerprint all files in each of `dirs`, at most `parallelism` directories at a time.
///
/// Each directory runs as its own task; the loop collecting finished tasks is
/// the only writer of the merged table. The first failure aborts the rest.
pub async fn fingerprint_directories<F, I>(
  provider: &Arc<F>,
  dirs: I,
  parallelism: usize,
) -> Result<FingerprintTable, FingerprintError>
where
  F: Fingerprinter + 'static,
  I: IntoIterator<Item = PathBuf>,
{
  let semaphore = Arc::new(Semaphore::new(parallelism.clamp(1, Semaphore::MAX_PERMITS)));
  let mut join_set = JoinSet::new();

  for dir in dirs {
    let provider = Arc::clone(provider);
    let semaphore = Arc::clone(&semaphore);

    join_set.spawn(async move {
      let _permit = semaphore
        .acquire_owned()
        .await
        .map_err(|e| FingerprintError::Task(e.to_string()))?;

      let table = provider.fingerprint_dir(&dir).await?;
      debug!(dir = %dir.display(), files = table.len(), "fingerprinted directory");
      Ok::<_, FingerprintError>(table)
    });
  }

  let mut merged = FingerprintTable::new();
  while let Some(joined) = join_set.join_next().await {
    let table = joined.map_err(|e| FingerprintError::Task(e.to_string()))??;
    merged.extend(table);
  }

  Ok(merged)
}
