//! Implementation of the bundling run.
//!
//! Resolves the given manifests, compiles whatever is not cached yet, and
//! writes one bundle per manifest.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::debug;

use wortels_lib::fingerprint::{Sha256Fingerprinter, ShasumFingerprinter};
use wortels_lib::process::TokioProcessRunner;
use wortels_lib::{BundleConfig, FingerprintSource, run_pipeline};

use crate::output::{OutputFormat, print_report, print_warning};

/// Run the pipeline for `manifests` and print a summary.
pub fn cmd_bundle(
  config: &BundleConfig,
  fingerprint: FingerprintSource,
  manifests: &[PathBuf],
  output: OutputFormat,
) -> Result<()> {
  if config.generate_digest && config.explicit_digest().is_some() {
    print_warning("--digest given; --generate-digest is ignored");
  }

  debug!(?config, ?manifests, %fingerprint, "starting run");

  let rt = tokio::runtime::Runtime::new().context("Failed to create async runtime")?;
  let runner = TokioProcessRunner;

  let report = match fingerprint {
    FingerprintSource::Sha256 => rt.block_on(run_pipeline(config, manifests, &runner, &Arc::new(Sha256Fingerprinter))),
    FingerprintSource::Shasum => rt.block_on(run_pipeline(
      config,
      manifests,
      &runner,
      &Arc::new(ShasumFingerprinter::new(TokioProcessRunner)),
    )),
  }?;

  print_report(&report, output, config.verbose)
}
