//! wortels-lib: content-addressed JavaScript bundling.
//!
//! The pipeline reads manifests listing script files, minifies every file whose
//! content has not been seen before with one external compressor invocation,
//! caches the result by content fingerprint, and concatenates cached output
//! into one bundle per manifest.
//!
//! - [`manifest`]: manifest parsing and Sprockets directive rewriting
//! - [`fingerprint`]: content fingerprint providers and per-directory fan-out
//! - [`cache`]: the fingerprint-keyed store of minified output
//! - [`plan`]: which files need compiling
//! - [`compile`]: the batched minifier invocation
//! - [`demux`]: splitting combined minifier output back into cache entries
//! - [`bundle`]: bundle concatenation and digest naming
//! - [`pipeline`]: the end-to-end run

pub mod bundle;
pub mod cache;
pub mod compile;
pub mod config;
pub mod consts;
pub mod demux;
pub mod fingerprint;
pub mod manifest;
pub mod pipeline;
pub mod plan;
pub mod platform;
pub mod process;
pub mod util;

pub use config::{BundleConfig, Compressor, FingerprintSource};
pub use pipeline::{PipelineError, RunReport, run_pipeline};
