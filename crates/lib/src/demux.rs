//! Output demultiplexing.
//!
//! Splits the minifier's combined output back into one segment per batch
//! entry using the `// Input <N>` boundary lines, then commits each segment to
//! the cache under that entry's fingerprint.
//!
//! The protocol is positional, so it is checked strictly: markers must arrive
//! as 0, 1, 2, ... with one per batch entry. The whole stream is validated
//! before anything is written to the cache.

use std::path::PathBuf;

use thiserror::Error;
use tracing::debug;

use crate::cache::{CacheError, CacheStore};
use crate::consts::INPUT_MARKER;
use crate::plan::CompilationBatch;

#[derive(Debug, Error)]
pub enum DemuxError {
  #[error("compiler output has content before the first input marker: '{line}'")]
  ContentBeforeMarker { line: String },

  #[error("malformed input marker: '{line}'")]
  InvalidMarker { line: String },

  #[error("input marker {index} out of range for a batch of {len} file(s)")]
  IndexOutOfRange { index: usize, len: usize },

  #[error("input marker {found} arrived where {expected} was expected")]
  OutOfOrder { expected: usize, found: usize },

  #[error("compiler output has no section for input {index} ({})", path.display())]
  MissingOutput { index: usize, path: PathBuf },

  #[error(transparent)]
  Cache(#[from] CacheError),
}

/// Split `output` into per-input segments, indexed by batch position.
///
/// Content lines keep their original terminators; the final line gets no
/// newline it did not have.
pub fn split_output(output: &[u8], batch: &CompilationBatch) -> Result<Vec<Vec<u8>>, DemuxError> {
  let mut segments: Vec<Vec<u8>> = Vec::with_capacity(batch.len());

  for line in output.split_inclusive(|b| *b == b'\n') {
    if let Some(index) = parse_marker(line)? {
      let expected = segments.len();
      if index >= batch.len() {
        return Err(DemuxError::IndexOutOfRange { index, len: batch.len() });
      }
      if index != expected {
        return Err(DemuxError::OutOfOrder { expected, found: index });
      }
      segments.push(Vec::new());
      continue;
    }

    match segments.last_mut() {
      Some(segment) => segment.extend_from_slice(line),
      None => {
        return Err(DemuxError::ContentBeforeMarker {
          line: String::from_utf8_lossy(strip_eol(line)).into_owned(),
        });
      }
    }
  }

  if segments.len() < batch.len() {
    let index = segments.len();
    let path = batch.get(index).map(|e| e.path.clone()).unwrap_or_default();
    return Err(DemuxError::MissingOutput { index, path });
  }

  Ok(segments)
}

/// Split `output` and store each segment in `cache` under its entry's fingerprint.
pub fn demultiplex(output: &[u8], batch: &CompilationBatch, cache: &CacheStore) -> Result<(), DemuxError> {
  let segments = split_output(output, batch)?;

  for (entry, segment) in batch.entries().iter().zip(segments) {
    debug!(path = %entry.path.display(), fingerprint = %entry.fingerprint, bytes = segment.len(), "committing compiled output");
    cache.put(&entry.fingerprint, &segment)?;
  }

  Ok(())
}

/// `Some(index)` if `line` is a boundary marker.
fn parse_marker(line: &[u8]) -> Result<Option<usize>, DemuxError> {
  let Some(rest) = strip_eol(line).strip_prefix(INPUT_MARKER.as_bytes()) else {
    return Ok(None);
  };

  std::str::from_utf8(rest)
    .ok()
    .and_then(|s| s.trim().parse::<usize>().ok())
    .map(Some)
    .ok_or_else(|| DemuxError::InvalidMarker {
      line: String::from_utf8_lossy(strip_eol(line)).into_owned(),
    })
}

fn strip_eol(line: &[u8]) -> &[u8] {
  let line = line.strip_suffix(b"\n").unwrap_or(line);
  line.strip_suffix(b"\r").unwrap_or(line)
}
