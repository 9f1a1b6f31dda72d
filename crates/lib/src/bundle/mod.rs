//! Bundle assembly.
//!
//! Each manifest becomes one bundle: the cached minified output of its files,
//! concatenated in manifest order, written to `<outdir>/<manifest-basename>`.
//! A digest can be injected into the file name, either supplied up front or
//! computed from the finished bundle.

use std::collections::HashMap;
use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info};

use crate::cache::{CacheError, CacheStore};
use crate::config::BundleConfig;
use crate::fingerprint::{FingerprintError, FingerprintTable, Fingerprinter};
use crate::manifest::Manifest;

#[derive(Debug, Error)]
pub enum AssembleError {
  #[error("failed to create output directory {}: {source}", path.display())]
  CreateDir {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("manifest path has no file name: {}", path.display())]
  InvalidManifestName { path: PathBuf },

  #[error(
    "manifests {} and {} would both write {}",
    first.display(),
    second.display(),
    path.display()
  )]
  DuplicateOutput {
    path: PathBuf,
    first: PathBuf,
    second: PathBuf,
  },

  #[error("no fingerprint for {}", path.display())]
  Unfingerprinted { path: PathBuf },

  #[error(transparent)]
  Cache(#[from] CacheError),

  #[error("failed to write bundle {}: {source}", path.display())]
  Write {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("failed to rename {} to {}: {source}", from.display(), to.display())]
  Rename {
    from: PathBuf,
    to: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error(transparent)]
  Fingerprint(#[from] FingerprintError),
}

/// A written bundle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Bundle {
  /// Manifest the bundle was built from.
  pub manifest: PathBuf,
  /// Where the bundle currently lives.
  pub path: PathBuf,
  pub bytes: usize,
  /// Digest injected into the file name, if any.
  pub digest: Option<String>,
}

/// Insert `-<digest>` before the extension of the file name in `path`.
///
/// `public/assets/app.js` with `abc123` becomes `public/assets/app-abc123.js`.
/// Only the file name is touched; a name without an extension gets the digest
/// appended.
pub fn inject_digest(path: &Path, digest: &str) -> PathBuf {
  let Some(stem) = path.file_stem() else {
    return path.to_path_buf();
  };

  let mut name = OsString::from(stem);
  name.push("-");
  name.push(digest);
  if let Some(ext) = path.extension() {
    name.push(".");
    name.push(ext);
  }
  path.with_file_name(name)
}

/// Output path of the bundle for `manifest`, with the digest injected when given.
pub fn bundle_path(outdir: &Path, manifest: &Path, digest: Option<&str>) -> Result<PathBuf, AssembleError> {
  let name = manifest.file_name().ok_or_else(|| AssembleError::InvalidManifestName {
    path: manifest.to_path_buf(),
  })?;
  let path = outdir.join(name);
  Ok(match digest {
    Some(digest) => inject_digest(&path, digest),
    None => path,
  })
}

/// Concatenate and write one bundle per manifest.
///
/// All bundles are assembled in memory before the first one is written, so a
/// missing cache entry or a name clash leaves the output directory untouched.
pub fn assemble_bundles(
  manifests: &[Manifest],
  fingerprints: &FingerprintTable,
  cache: &CacheStore,
  config: &BundleConfig,
) -> Result<Vec<Bundle>, AssembleError> {
  let digest = config.explicit_digest();
  let mut owners: HashMap<PathBuf, &Path> = HashMap::new();
  let mut pending = Vec::with_capacity(manifests.len());

  for manifest in manifests {
    let path = bundle_path(&config.outdir, &manifest.path, digest)?;
    if let Some(first) = owners.insert(path.clone(), &manifest.path) {
      return Err(AssembleError::DuplicateOutput {
        path,
        first: first.to_path_buf(),
        second: manifest.path.clone(),
      });
    }

    let mut content = Vec::new();
    for file in &manifest.files {
      let fingerprint = fingerprints
        .get(file)
        .ok_or_else(|| AssembleError::Unfingerprinted { path: file.clone() })?;
      content.extend_from_slice(&cache.get(fingerprint)?);
    }
    pending.push((manifest, path, content));
  }

  fs::create_dir_all(&config.outdir).map_err(|source| AssembleError::CreateDir {
    path: config.outdir.clone(),
    source,
  })?;

  let mut bundles = Vec::with_capacity(pending.len());
  for (manifest, path, content) in pending {
    fs::write(&path, &content).map_err(|source| AssembleError::Write {
      path: path.clone(),
      source,
    })?;
    info!(bundle = %path.display(), files = manifest.files.len(), bytes = content.len(), "wrote bundle");

    bundles.push(Bundle {
      manifest: manifest.path.clone(),
      path,
      bytes: content.len(),
      digest: digest.map(str::to_string),
    });
  }

  Ok(bundles)
}

/// Rename every bundle to include a fingerprint of its own content.
pub async fn apply_generated_digests<F: Fingerprinter>(
  bundles: &mut [Bundle],
  provider: &F,
) -> Result<(), AssembleError> {
  let paths: Vec<PathBuf> = bundles.iter().map(|b| b.path.clone()).collect();
  let digests = provider.fingerprint_files(&paths).await?;

  for bundle in bundles.iter_mut() {
    let digest = digests.get(&bundle.path).ok_or_else(|| AssembleError::Unfingerprinted {
      path: bundle.path.clone(),
    })?;
    let renamed = inject_digest(&bundle.path, digest.as_str());

    fs::rename(&bundle.path, &renamed).map_err(|source| AssembleError::Rename {
      from: bundle.path.clone(),
      to: renamed.clone(),
      source,
    })?;
    debug!(from = %bundle.path.display(), to = %renamed.display(), "renamed bundle");

    bundle.path = renamed;
    bundle.digest = Some(digest.to_string());
  }

  Ok(())
}
