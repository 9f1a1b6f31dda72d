//! Compilation planning.
//!
//! Decides which referenced source files have no cached output yet. The
//! result is a [`CompilationBatch`]: an ordered list whose positions are the
//! indices the minifier will use in its `// Input <N>` markers.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use crate::cache::CacheStore;
use crate::fingerprint::FingerprintTable;
use crate::manifest::Manifest;
use crate::util::hash::Fingerprint;

#[derive(Debug, Error)]
pub enum PlanError {
  #[error(
    "file listed in manifest {} does not exist: {}",
    manifest.display(),
    path.display()
  )]
  UnresolvedFile { manifest: PathBuf, path: PathBuf },
}

/// A source file scheduled for compilation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchEntry {
  pub path: PathBuf,
  pub fingerprint: Fingerprint,
}

/// Cache misses in the order they are handed to the compiler.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompilationBatch {
  entries: Vec<BatchEntry>,
}

impl CompilationBatch {
  pub fn new(entries: Vec<BatchEntry>) -> Self {
    Self { entries }
  }

  pub fn entries(&self) -> &[BatchEntry] {
    &self.entries
  }

  pub fn get(&self, index: usize) -> Option<&BatchEntry> {
    self.entries.get(index)
  }

  pub fn paths(&self) -> impl Iterator<Item = &PathBuf> {
    self.entries.iter().map(|e| &e.path)
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }
}

/// Outcome of planning: what to compile, plus counts for reporting.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PlanSummary {
  /// References across all manifests, duplicates included.
  pub referenced: usize,
  /// Distinct source paths.
  pub unique_files: usize,
  /// Distinct fingerprints already cached.
  pub cache_hits: usize,
  /// Distinct fingerprints to compile.
  pub cache_misses: usize,
}

#[derive(Debug, Clone, Default)]
pub struct CompilationPlan {
  pub batch: CompilationBatch,
  pub summary: PlanSummary,
}

/// Distinct directories containing any referenced file, sorted.
pub fn referenced_directories(manifests: &[Manifest]) -> BTreeSet<PathBuf> {
  manifests
    .iter()
    .flat_map(|m| m.files.iter())
    .filter_map(|file| file.parent().map(PathBuf::from))
    .collect()
}

/// Look up the fingerprint of every referenced file and collect the cache misses.
///
/// Every reference must be present in `fingerprints`; a missing one means the
/// file does not exist on disk and fails the run. Misses are deduplicated by
/// fingerprint, so identical content is compiled once however many paths or
/// manifests refer to it. The batch is sorted by path.
pub fn plan_compilation(
  manifests: &[Manifest],
  fingerprints: &FingerprintTable,
  cache: &CacheStore,
) -> Result<CompilationPlan, PlanError> {
  let mut summary = PlanSummary::default();
  let mut unique: BTreeMap<&PathBuf, &Fingerprint> = BTreeMap::new();

  for manifest in manifests {
    for file in &manifest.files {
      summary.referenced += 1;
      let fingerprint = fingerprints.get(file).ok_or_else(|| PlanError::UnresolvedFile {
        manifest: manifest.path.clone(),
        path: file.clone(),
      })?;
      unique.insert(file, fingerprint);
    }
  }
  summary.unique_files = unique.len();

  let mut seen: HashSet<&Fingerprint> = HashSet::new();
  let mut entries = Vec::new();

  for (path, fingerprint) in unique {
    if !seen.insert(fingerprint) {
      continue;
    }
    if cache.has(fingerprint) {
      summary.cache_hits += 1;
      continue;
    }
    debug!(path = %path.display(), fingerprint = %fingerprint, "cache miss");
    entries.push(BatchEntry {
      path: path.clone(),
      fingerprint: fingerprint.clone(),
    });
  }
  summary.cache_misses = entries.len();

  Ok(CompilationPlan {
    batch: CompilationBatch::new(entries),
    summary,
  })
}
