//! Run configuration.
//!
//! A [`BundleConfig`] is built once at startup and handed by reference to every
//! pipeline stage. Nothing in the crate keeps configuration in global state.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::Serialize;
use thiserror::Error;

use crate::consts::DEFAULT_OUTDIR;
use crate::platform::paths;
use crate::util::hash::Fingerprint;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
  #[error("unknown javascript compressor '{0}' (expected one of: closure, uglifyjs)")]
  UnknownCompressor(String),

  #[error("unknown fingerprint source '{0}' (expected one of: sha256, shasum)")]
  UnknownFingerprintSource(String),

  #[error("invalid digest '{0}' (expected letters and digits only)")]
  InvalidDigest(String),
}

/// External minifier backend. Cache entries are namespaced by [`Compressor::as_str`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Compressor {
  #[default]
  Closure,
  Uglifyjs,
}

impl Compressor {
  pub fn as_str(&self) -> &'static str {
    match self {
      Compressor::Closure => "closure",
      Compressor::Uglifyjs => "uglifyjs",
    }
  }
}

impl fmt::Display for Compressor {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.as_str())
  }
}

impl FromStr for Compressor {
  type Err = ConfigError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.trim().to_lowercase().as_str() {
      "closure" => Ok(Compressor::Closure),
      "uglifyjs" => Ok(Compressor::Uglifyjs),
      _ => Err(ConfigError::UnknownCompressor(s.to_string())),
    }
  }
}

/// Where content fingerprints come from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FingerprintSource {
  /// In-process SHA-256.
  #[default]
  Sha256,
  /// The external `shasum` tool (SHA-1).
  Shasum,
}

impl FingerprintSource {
  pub fn as_str(&self) -> &'static str {
    match self {
      FingerprintSource::Sha256 => "sha256",
      FingerprintSource::Shasum => "shasum",
    }
  }
}

impl fmt::Display for FingerprintSource {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.as_str())
  }
}

impl FromStr for FingerprintSource {
  type Err = ConfigError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.trim().to_lowercase().as_str() {
      "sha256" => Ok(FingerprintSource::Sha256),
      "shasum" | "sha1" => Ok(FingerprintSource::Shasum),
      _ => Err(ConfigError::UnknownFingerprintSource(s.to_string())),
    }
  }
}

/// Immutable settings for one bundling run.
#[derive(Debug, Clone)]
pub struct BundleConfig {
  /// Directory bundles are written to.
  pub outdir: PathBuf,

  /// Prefix joined onto manifest paths and the references inside them.
  pub asset_root: Option<PathBuf>,

  /// Explicit digest injected into every bundle name.
  pub digest: Option<String>,

  /// Rename bundles with a fingerprint of their own content.
  /// Ignored when `digest` is set.
  pub generate_digest: bool,

  pub compressor: Compressor,

  /// Application directory holding `cache/` and the Closure compiler.
  pub app_dir: PathBuf,

  /// Maximum number of directories fingerprinted concurrently.
  pub parallelism: usize,

  pub verbose: bool,
}

impl Default for BundleConfig {
  fn default() -> Self {
    Self {
      outdir: PathBuf::from(DEFAULT_OUTDIR),
      asset_root: None,
      digest: None,
      generate_digest: false,
      compressor: Compressor::default(),
      app_dir: paths::app_dir(),
      parallelism: num_cpus(),
      verbose: false,
    }
  }
}

impl BundleConfig {
  /// Cache directory for the configured backend: `<app-dir>/cache/<backend>`.
  pub fn cache_dir(&self) -> PathBuf {
    paths::cache_root(&self.app_dir).join(self.compressor.as_str())
  }

  /// Resolve a manifest-relative reference against the asset root.
  pub fn asset_path(&self, reference: &Path) -> PathBuf {
    match &self.asset_root {
      Some(root) => root.join(reference),
      None => reference.to_path_buf(),
    }
  }

  /// The explicit digest, if one was supplied and is non-empty.
  pub fn explicit_digest(&self) -> Option<&str> {
    self.digest.as_deref().filter(|d| !d.is_empty())
  }

  /// Reject settings that would only fail later, mid-run.
  pub fn validate(&self) -> Result<(), ConfigError> {
    if let Some(digest) = self.explicit_digest()
      && !Fingerprint(digest.to_string()).is_filename_safe()
    {
      return Err(ConfigError::InvalidDigest(digest.to_string()));
    }
    Ok(())
  }

  /// Whether bundles get renamed with a self-computed digest after writing.
  pub fn wants_generated_digest(&self) -> bool {
    self.generate_digest && self.explicit_digest().is_none()
  }
}

/// Get the number of CPUs for default parallelism.
fn num_cpus() -> usize {
  std::thread::available_parallelism().map(|p| p.get()).unwrap_or(4)
}
