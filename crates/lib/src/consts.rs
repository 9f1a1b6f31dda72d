/// Application name used for data directories.
pub const APP_NAME: &str = "wortels";

/// Sprockets directive that pulls another script into a manifest.
pub const SPROCKETS_REQUIRE: &str = "//= require ";

/// Boundary line the minifier writes before each input's output.
pub const INPUT_MARKER: &str = "// Input ";

/// Default directory bundles are written to.
pub const DEFAULT_OUTDIR: &str = "public/assets";

/// Environment variable overriding the application data directory.
pub const HOME_ENV: &str = "WORTELS_HOME";

/// Environment variable overriding the Closure compiler jar location.
pub const CLOSURE_JAR_ENV: &str = "WORTELS_CLOSURE_JAR";
