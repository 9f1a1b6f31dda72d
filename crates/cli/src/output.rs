//! Terminal output for a bundling run.
//!
//! Status lines carry a colored symbol; colors are dropped automatically when
//! the stream is not a terminal.

use std::fmt::Write as _;

use anyhow::Context;
use clap::ValueEnum;
use owo_colors::{OwoColorize, Stream};

use wortels_lib::RunReport;
use wortels_lib::platform::paths::portable;

#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
  #[default]
  Text,
  Json,
}

impl OutputFormat {
  pub fn is_json(self) -> bool {
    matches!(self, OutputFormat::Json)
  }
}

pub mod symbols {
  pub const SUCCESS: &str = "✓";
  pub const ERROR: &str = "✗";
  pub const WARNING: &str = "⚠";
  pub const INFO: &str = "•";
  pub const ARROW: &str = "→";
}

/// Bundle sizes: bytes below 1 KiB, one decimal above.
pub fn format_size(bytes: usize) -> String {
  const KIB: f64 = 1024.0;

  let b = bytes as f64;
  if b >= KIB * KIB {
    format!("{:.1} MiB", b / (KIB * KIB))
  } else if b >= KIB {
    format!("{:.1} KiB", b / KIB)
  } else {
    format!("{} B", bytes)
  }
}

pub fn format_elapsed(ms: u64) -> String {
  match ms {
    0..1_000 => format!("{}ms", ms),
    1_000..60_000 => format!("{:.2}s", ms as f64 / 1000.0),
    _ => format!("{}m {}s", ms / 60_000, (ms % 60_000) / 1000),
  }
}

/// Human-readable summary of `report`. Compiled files are listed only when `verbose`.
pub fn render_report(report: &RunReport, verbose: bool) -> String {
  let mut out = String::new();
  let info = symbols::INFO.if_supports_color(Stream::Stdout, |s| s.blue());

  if report.compiled.is_empty() {
    let _ = writeln!(out, "{} All sources cached, nothing to compile", info);
  } else if verbose {
    let _ = writeln!(out, "{} Compiled {} file(s):", info, report.compiled.len());
    for path in &report.compiled {
      let _ = writeln!(out, "    {}", portable(path));
    }
  }

  let _ = writeln!(
    out,
    "{} Bundled {} manifest(s)",
    symbols::SUCCESS.if_supports_color(Stream::Stdout, |s| s.green()),
    report.manifests
  );

  let stats = [
    ("Files referenced", report.plan.referenced.to_string()),
    ("Compiled", report.plan.cache_misses.to_string()),
    ("Cache hits", report.plan.cache_hits.to_string()),
  ];
  for (label, value) in stats {
    let _ = writeln!(out, "  {}: {}", label.if_supports_color(Stream::Stdout, |s| s.dimmed()), value);
  }

  for bundle in &report.bundles {
    let _ = writeln!(
      out,
      "  {} {} ({})",
      symbols::ARROW,
      portable(&bundle.path),
      format_size(bundle.bytes)
    );
  }

  let _ = writeln!(out, "  Took {}", format_elapsed(report.elapsed_ms));
  out
}

/// Print `report` to stdout in the chosen format.
pub fn print_report(report: &RunReport, format: OutputFormat, verbose: bool) -> anyhow::Result<()> {
  if format.is_json() {
    let json = serde_json::to_string_pretty(report).context("Failed to serialize run report")?;
    println!("{}", json);
  } else {
    print!("{}", render_report(report, verbose));
  }
  Ok(())
}

pub fn print_error(message: &str) {
  eprintln!(
    "{} {}",
    symbols::ERROR.if_supports_color(Stream::Stderr, |s| s.red()),
    message.if_supports_color(Stream::Stderr, |s| s.red())
  );
}

pub fn print_warning(message: &str) {
  eprintln!(
    "{} {}",
    symbols::WARNING.if_supports_color(Stream::Stderr, |s| s.yellow()),
    message.if_supports_color(Stream::Stderr, |s| s.yellow())
  );
}
