mod cmd;
mod output;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use wortels_lib::consts::DEFAULT_OUTDIR;
use wortels_lib::platform::paths::app_dir;
use wortels_lib::{BundleConfig, Compressor, FingerprintSource};

use crate::cmd::cmd_bundle;
use crate::output::{OutputFormat, print_error};

/// wortels - content-addressed JavaScript bundler
///
/// Minifies the scripts listed in each manifest, caching output by content
/// fingerprint, and writes one concatenated bundle per manifest.
#[derive(Parser)]
#[command(name = "wortels")]
#[command(author, version, about, long_about = None)]
struct Cli {
  /// Folder where to put packaged files
  #[arg(long, default_value = DEFAULT_OUTDIR)]
  outdir: PathBuf,

  /// Enable verbose output
  #[arg(short, long)]
  verbose: bool,

  /// Inject this digest into output file names
  #[arg(long)]
  digest: Option<String>,

  /// Rename bundles with a digest of their own content
  #[arg(long, visible_alias = "generatedigest")]
  generate_digest: bool,

  /// Prefix for manifest paths and the references inside them
  #[arg(long = "assetpath", visible_alias = "asset-path")]
  asset_path: Option<PathBuf>,

  /// Javascript compressor: closure or uglifyjs
  #[arg(long = "jscompressor", default_value = "closure")]
  compressor: Compressor,

  /// Content fingerprint source: sha256 or shasum
  #[arg(long, default_value = "sha256")]
  fingerprint: FingerprintSource,

  /// Number of directories fingerprinted in parallel
  #[arg(short, long)]
  jobs: Option<usize>,

  /// Output format
  #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
  output: OutputFormat,

  /// Manifest files, one bundle per manifest
  #[arg(required = true)]
  manifests: Vec<PathBuf>,
}

impl Cli {
  fn config(&self) -> BundleConfig {
    let defaults = BundleConfig::default();
    BundleConfig {
      outdir: self.outdir.clone(),
      asset_root: self.asset_path.clone(),
      digest: self.digest.clone(),
      generate_digest: self.generate_digest,
      compressor: self.compressor,
      app_dir: app_dir(),
      parallelism: self.jobs.filter(|j| *j > 0).unwrap_or(defaults.parallelism),
      verbose: self.verbose,
    }
  }
}

fn main() -> ExitCode {
  let cli = Cli::parse();

  // RUST_LOG wins over --verbose
  let default_level = if cli.verbose { "debug" } else { "warn" };
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(std::io::stderr)
    .without_time()
    .init();

  let config = cli.config();

  match cmd_bundle(&config, cli.fingerprint, &cli.manifests, cli.output) {
    Ok(()) => ExitCode::SUCCESS,
    Err(err) => {
      debug!(error = ?err, "run failed");
      print_error(&err.to_string());
      ExitCode::FAILURE
    }
  }
}
