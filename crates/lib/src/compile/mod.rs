//! Batch compiler adapter.
//!
//! The configured minifier is invoked once over the whole [`CompilationBatch`].
//! It writes the minified output of every input to stdout, each preceded by a
//! `// Input <N>` line where `N` is the input's position in the batch.

use std::path::Path;
use std::time::Instant;

use thiserror::Error;
use tracing::{debug, info};

use crate::config::{BundleConfig, Compressor};
use crate::plan::CompilationBatch;
use crate::platform::paths::{closure_jar, portable};
use crate::process::{CommandSpec, ProcessError, ProcessRunner};

#[derive(Debug, Error)]
pub enum CompileError {
  #[error("{backend} exited with code {code:?}:\n{diagnostics}")]
  Failed {
    backend: Compressor,
    code: Option<i32>,
    diagnostics: String,
  },

  #[error(transparent)]
  Process(#[from] ProcessError),
}

/// Build the minifier command line for `batch`.
pub fn compile_command(compressor: Compressor, app_dir: &Path, batch: &CompilationBatch) -> CommandSpec {
  let inputs = batch.paths().map(|p| portable(p));

  match compressor {
    Compressor::Closure => CommandSpec::new("java")
      .arg("-jar")
      .arg(portable(&closure_jar(app_dir)))
      .args(["--warning_level", "QUIET"])
      .args(["--compilation_level", "SIMPLE_OPTIMIZATIONS"])
      .args(["--formatting", "print_input_delimiter"])
      .args(inputs.flat_map(|input| ["--js".to_string(), input])),
    Compressor::Uglifyjs => CommandSpec::new("uglifyjs").args(inputs),
  }
}

/// Run the minifier once over `batch` and return its combined stdout.
pub async fn compile_batch<R: ProcessRunner>(
  runner: &R,
  config: &BundleConfig,
  batch: &CompilationBatch,
) -> Result<Vec<u8>, CompileError> {
  let start = Instant::now();
  let command = compile_command(config.compressor, &config.app_dir, batch);
  info!(backend = %config.compressor, files = batch.len(), "compiling");
  debug!(command = %command, "compiler command");

  let output = runner.run(&command).await?;

  if !output.success() {
    return Err(CompileError::Failed {
      backend: config.compressor,
      code: output.code,
      diagnostics: output.diagnostics(),
    });
  }

  if !output.stderr.is_empty() {
    debug!(stderr = %String::from_utf8_lossy(&output.stderr), "compiler diagnostics");
  }
  info!(elapsed_ms = start.elapsed().as_millis() as u64, bytes = output.stdout.len(), "compiled");

  Ok(output.stdout)
}
