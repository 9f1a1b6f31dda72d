//! Fingerprints from the external `shasum` tool.

use std::collections::HashMap;
use std::path::PathBuf;

use tracing::debug;

use super::{Fingerprint, FingerprintError, FingerprintTable, Fingerprinter};
use crate::platform::paths::portable;
use crate::process::{CommandSpec, ProcessRunner};

const SHASUM: &str = "shasum";

/// SHA-1 fingerprints computed by `shasum`.
///
/// The tool is always given an explicit list of regular files, so a nonzero
/// exit status is a genuine failure rather than a complaint about a directory
/// matched by a glob.
#[derive(Debug, Clone)]
pub struct ShasumFingerprinter<R> {
  runner: R,
}

impl<R: ProcessRunner> ShasumFingerprinter<R> {
  pub fn new(runner: R) -> Self {
    Self { runner }
  }
}

impl<R: ProcessRunner> Fingerprinter for ShasumFingerprinter<R> {
  async fn fingerprint_files(&self, files: &[PathBuf]) -> Result<FingerprintTable, FingerprintError> {
    if files.is_empty() {
      return Ok(FingerprintTable::new());
    }

    let by_name: HashMap<String, &PathBuf> = files.iter().map(|p| (portable(p), p)).collect();
    let command = CommandSpec::new(SHASUM).args(files.iter().map(|p| portable(p)));
    debug!(command = %command, "running shasum");

    let output = self.runner.run(&command).await?;
    if !output.success() {
      return Err(FingerprintError::Tool {
        command: SHASUM.to_string(),
        code: output.code,
        diagnostics: output.diagnostics(),
      });
    }

    let mut table = FingerprintTable::new();
    for (hash, name) in parse_shasum_output(&String::from_utf8_lossy(&output.stdout))? {
      let path = by_name
        .get(name)
        .ok_or_else(|| FingerprintError::Malformed { line: name.to_string() })?;
      table.insert((*path).clone(), hash);
    }
    Ok(table)
  }
}

/// Parse `shasum` output lines of the form `<hex>  <path>` (text mode) or
/// `<hex> *<path>` (binary mode, the default on Windows).
fn parse_shasum_output(output: &str) -> Result<Vec<(Fingerprint, &str)>, FingerprintError> {
  output
    .lines()
    .map(|line| line.trim_end_matches('\r'))
    .filter(|line| !line.is_empty())
    .map(|line| {
      let malformed = || FingerprintError::Malformed { line: line.to_string() };

      let (hash, rest) = line.split_once(' ').ok_or_else(malformed)?;
      let name = rest
        .strip_prefix(' ')
        .or_else(|| rest.strip_prefix('*'))
        .ok_or_else(malformed)?;

      if hash.is_empty() || !hash.chars().all(|c| c.is_ascii_hexdigit()) || name.is_empty() {
        return Err(malformed());
      }

      Ok((Fingerprint(hash.to_ascii_lowercase()), name))
    })
    .collect()
}
