//! Manifest resolution.
//!
//! A manifest is a text file listing, one per line, the scripts that make up a
//! bundle. Blank lines are ignored, Sprockets `//= require name` directives are
//! rewritten to `name.js`, and any other line starting with `//` is a comment.
//! Every remaining reference is joined onto the asset root and normalized.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

use crate::config::BundleConfig;
use crate::consts::SPROCKETS_REQUIRE;
use crate::platform::paths::normalize;

#[derive(Debug, Error)]
pub enum ManifestError {
  #[error("failed to read manifest {}: {source}", path.display())]
  Read {
    path: PathBuf,
    #[source]
    source: io::Error,
  },
}

/// One manifest and the source files it lists, in bundle order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Manifest {
  /// The manifest path as given on the command line.
  pub path: PathBuf,

  /// Normalized absolute source paths. Order is bundle byte order.
  pub files: Vec<PathBuf>,
}

impl Manifest {
  /// File name of the manifest, which is also the bundle's file name.
  pub fn basename(&self) -> Option<&std::ffi::OsStr> {
    self.path.file_name()
  }
}

/// Interpret a single manifest line.
///
/// Returns the file reference it names, or `None` for blank lines and comments.
pub fn parse_reference(line: &str) -> Option<String> {
  let line = line.trim();
  if line.is_empty() {
    return None;
  }

  let reference = match line.strip_prefix(SPROCKETS_REQUIRE) {
    Some(required) => {
      let required = required.trim();
      if required.is_empty() {
        return None;
      }
      if required.ends_with(".js") {
        required.to_string()
      } else {
        format!("{}.js", required)
      }
    }
    None => line.to_string(),
  };

  if reference.starts_with("//") {
    return None;
  }

  Some(reference)
}

/// Parse manifest text into resolved source paths.
pub fn parse_manifest(text: &str, config: &BundleConfig) -> Vec<PathBuf> {
  text
    .lines()
    .filter_map(parse_reference)
    .map(|reference| normalize(&config.asset_path(Path::new(&reference))))
    .collect()
}

/// Read and resolve every manifest, preserving the order they were given in.
///
/// Manifest locations are themselves resolved against the asset root.
pub fn resolve_manifests(manifests: &[PathBuf], config: &BundleConfig) -> Result<Vec<Manifest>, ManifestError> {
  manifests
    .iter()
    .map(|manifest| {
      let location = config.asset_path(manifest);
      let text = fs::read_to_string(&location).map_err(|source| ManifestError::Read {
        path: location.clone(),
        source,
      })?;

      let files = parse_manifest(&text, config);
      debug!(manifest = %manifest.display(), files = files.len(), "resolved manifest");

      Ok(Manifest {
        path: manifest.clone(),
        files,
      })
    })
    .collect()
}
