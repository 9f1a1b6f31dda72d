//! External process invocation.
//!
//! Every external tool (the minifier, `shasum`) is reached through
//! [`ProcessRunner`], so the pipeline can be driven by a fake runner in tests.

use std::fmt;
use std::future::Future;
use std::io;

use thiserror::Error;
use tokio::process::Command;
use tracing::debug;

#[derive(Debug, Error)]
pub enum ProcessError {
  /// The program could not be started at all (missing binary, permissions).
  #[error("failed to run '{program}': {source}")]
  Spawn {
    program: String,
    #[source]
    source: io::Error,
  },
}

/// A program and its arguments. No shell is involved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
  pub program: String,
  pub args: Vec<String>,
}

impl CommandSpec {
  pub fn new(program: impl Into<String>) -> Self {
    Self {
      program: program.into(),
      args: Vec::new(),
    }
  }

  pub fn arg(mut self, arg: impl Into<String>) -> Self {
    self.args.push(arg.into());
    self
  }

  pub fn args<I, S>(mut self, args: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    self.args.extend(args.into_iter().map(Into::into));
    self
  }
}

impl fmt::Display for CommandSpec {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.program)?;
    for arg in &self.args {
      write!(f, " {}", arg)?;
    }
    Ok(())
  }
}

/// Captured result of a finished process.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessOutput {
  /// Exit code; `None` when the process was killed by a signal.
  pub code: Option<i32>,
  pub stdout: Vec<u8>,
  pub stderr: Vec<u8>,
}

impl ProcessOutput {
  pub fn success(&self) -> bool {
    self.code == Some(0)
  }

  /// Text to show a user when the process failed: stderr, or stdout if stderr is empty.
  pub fn diagnostics(&self) -> String {
    let stderr = String::from_utf8_lossy(&self.stderr);
    if stderr.trim().is_empty() {
      String::from_utf8_lossy(&self.stdout).trim().to_string()
    } else {
      stderr.trim().to_string()
    }
  }
}

/// Runs a command to completion and captures its output.
pub trait ProcessRunner: Send + Sync {
  fn run(&self, command: &CommandSpec) -> impl Future<Output = Result<ProcessOutput, ProcessError>> + Send;
}

/// [`ProcessRunner`] backed by `tokio::process`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioProcessRunner;

impl ProcessRunner for TokioProcessRunner {
  async fn run(&self, command: &CommandSpec) -> Result<ProcessOutput, ProcessError> {
    debug!(command = %command, "spawning process");

    let output = Command::new(&command.program)
      .args(&command.args)
      .kill_on_drop(true)
      .output()
      .await
      .map_err(|source| ProcessError::Spawn {
        program: command.program.clone(),
        source,
      })?;

    let result = ProcessOutput {
      code: output.status.code(),
      stdout: output.stdout,
      stderr: output.stderr,
    };

    if !result.success() {
      debug!(code = ?result.code, stderr = %String::from_utf8_lossy(&result.stderr), "process failed");
    }

    Ok(result)
  }
}
