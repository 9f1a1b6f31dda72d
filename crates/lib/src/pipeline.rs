//! The bundling pipeline.
//!
//! One run is a strictly sequential chain of stages:
//!
//! 1. resolve manifests into ordered file lists
//! 2. fingerprint every directory holding a referenced file (concurrently)
//! 3. plan: find files whose fingerprint has no cache entry
//! 4. compile the whole miss set with a single minifier invocation
//! 5. split the combined output into per-file cache entries
//! 6. assemble one bundle per manifest from the cache
//! 7. optionally rename bundles with a digest of their own content
//!
//! Any error aborts the run.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info};

use crate::bundle::{AssembleError, Bundle, apply_generated_digests, assemble_bundles};
use crate::cache::{CacheError, CacheStore};
use crate::compile::{CompileError, compile_batch};
use crate::config::{BundleConfig, ConfigError};
use crate::demux::{DemuxError, demultiplex};
use crate::fingerprint::{FingerprintError, Fingerprinter, fingerprint_directories};
use crate::manifest::{ManifestError, resolve_manifests};
use crate::plan::{PlanError, PlanSummary, plan_compilation, referenced_directories};
use crate::process::ProcessRunner;

/// A failed run, tagged with the stage that failed.
#[derive(Debug, Error)]
pub enum PipelineError {
  #[error("configuration: {0}")]
  Config(#[from] ConfigError),

  #[error("resolve manifests: {0}")]
  Manifest(#[from] ManifestError),

  #[error("fingerprint sources: {0}")]
  Fingerprint(#[from] FingerprintError),

  #[error("open cache: {0}")]
  Cache(#[from] CacheError),

  #[error("plan compilation: {0}")]
  Plan(#[from] PlanError),

  #[error("compile: {0}")]
  Compile(#[from] CompileError),

  #[error("split compiler output: {0}")]
  Demux(#[from] DemuxError),

  #[error("assemble bundles: {0}")]
  Assemble(#[from] AssembleError),
}

impl PipelineError {
  /// Name of the stage that failed.
  pub fn stage(&self) -> &'static str {
    match self {
      PipelineError::Config(_) => "config",
      PipelineError::Manifest(_) => "manifest",
      PipelineError::Fingerprint(_) => "fingerprint",
      PipelineError::Cache(_) => "cache",
      PipelineError::Plan(_) => "plan",
      PipelineError::Compile(_) => "compile",
      PipelineError::Demux(_) => "demux",
      PipelineError::Assemble(_) => "assemble",
    }
  }
}

/// Summary of a successful run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
  pub manifests: usize,
  pub plan: PlanSummary,
  /// Files handed to the minifier, in batch order. Empty when everything was cached.
  pub compiled: Vec<PathBuf>,
  pub bundles: Vec<Bundle>,
  pub elapsed_ms: u64,
}

/// Run the whole pipeline for `manifest_paths`.
pub async fn run_pipeline<R, F>(
  config: &BundleConfig,
  manifest_paths: &[PathBuf],
  runner: &R,
  fingerprinter: &Arc<F>,
) -> Result<RunReport, PipelineError>
where
  R: ProcessRunner,
  F: Fingerprinter + 'static,
{
  let start = Instant::now();
  config.validate()?;

  let manifests = resolve_manifests(manifest_paths, config)?;
  info!(
    manifests = manifests.len(),
    files = manifests.iter().map(|m| m.files.len()).sum::<usize>(),
    "resolved manifests"
  );

  let dirs = referenced_directories(&manifests);
  debug!(dirs = dirs.len(), "fingerprinting directories");
  let fingerprints = fingerprint_directories(fingerprinter, dirs, config.parallelism).await?;
  info!(files = fingerprints.len(), "fingerprinted sources");

  let cache = CacheStore::open(config.cache_dir())?;
  let plan = plan_compilation(&manifests, &fingerprints, &cache)?;
  info!(
    unique = plan.summary.unique_files,
    hits = plan.summary.cache_hits,
    misses = plan.summary.cache_misses,
    "planned compilation"
  );

  if plan.batch.is_empty() {
    info!("all sources cached, skipping compilation");
  } else {
    let output = compile_batch(runner, config, &plan.batch).await?;
    demultiplex(&output, &plan.batch, &cache)?;
  }

  let mut bundles = assemble_bundles(&manifests, &fingerprints, &cache, config)?;
  if config.wants_generated_digest() {
    apply_generated_digests(&mut bundles, fingerprinter.as_ref()).await?;
  }

  Ok(RunReport {
    manifests: manifests.len(),
    plan: plan.summary,
    compiled: plan.batch.paths().cloned().collect(),
    bundles,
    elapsed_ms: start.elapsed().as_millis() as u64,
  })
}
