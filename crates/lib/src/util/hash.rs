//! Content hashing.
//!
//! This module provides:
//! - `Fingerprint`: a content-derived identifier used as a cache key and bundle digest
//! - `hash_file()`: Single file hashing
//! - `hash_bytes()`: Arbitrary byte hashing

use std::fs;
use std::io::{self, Read};
use std::path::Path;

use serde::Serialize;
use sha2::{Digest, Sha256};

/// A content fingerprint.
///
/// The value is opaque to the pipeline, but every provider produces a
/// lowercase hexadecimal string so it is safe to use as a file name.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Fingerprint(pub String);

impl Fingerprint {
  pub fn as_str(&self) -> &str {
    &self.0
  }

  /// Whether the value can be used verbatim as a file name.
  pub fn is_filename_safe(&self) -> bool {
    !self.0.is_empty() && self.0.chars().all(|c| c.is_ascii_alphanumeric())
  }
}

impl std::fmt::Display for Fingerprint {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}", self.0)
  }
}

/// Hash a file's contents.
///
/// Returns the full 64-character SHA256 hash of the file.
pub fn hash_file(path: &Path) -> io::Result<Fingerprint> {
  let mut file = fs::File::open(path)?;

  let mut hasher = Sha256::new();
  let mut buffer = [0u8; 8192];

  loop {
    let bytes_read = file.read(&mut buffer)?;
    if bytes_read == 0 {
      break;
    }
    hasher.update(&buffer[..bytes_read]);
  }

  Ok(Fingerprint(format!("{:x}", hasher.finalize())))
}

/// Hash arbitrary bytes.
///
/// Returns the full 64-character SHA256 hash.
pub fn hash_bytes(data: &[u8]) -> Fingerprint {
  let mut hasher = Sha256::new();
  hasher.update(data);
  Fingerprint(format!("{:x}", hasher.finalize()))
}
