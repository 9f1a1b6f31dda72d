use std::path::{Component, Path, PathBuf};

use crate::consts::{APP_NAME, CLOSURE_JAR_ENV, HOME_ENV};

/// Returns the user's home directory
#[cfg(windows)]
pub fn home_dir() -> PathBuf {
  std::env::var("USERPROFILE").map(PathBuf::from).unwrap_or_default()
}

/// Returns the user's home directory
#[cfg(not(windows))]
pub fn home_dir() -> PathBuf {
  std::env::var("HOME").map(PathBuf::from).unwrap_or_default()
}

/// Returns the directory for data files for the application
#[cfg(windows)]
pub fn data_dir() -> PathBuf {
  std::env::var("APPDATA")
    .map(PathBuf::from)
    .unwrap_or_else(|_| home_dir().join("AppData").join("Roaming"))
    .join(APP_NAME)
}

/// Returns the directory for data files for the application
#[cfg(not(windows))]
pub fn data_dir() -> PathBuf {
  let data_home = std::env::var("XDG_DATA_HOME")
    .map(PathBuf::from)
    .unwrap_or_else(|_| home_dir().join(".local").join("share"));
  data_home.join(APP_NAME)
}

/// Returns the application directory holding the cache and compiler downloads.
///
/// `WORTELS_HOME` takes precedence over the platform data directory.
pub fn app_dir() -> PathBuf {
  if let Ok(path) = std::env::var(HOME_ENV) {
    return PathBuf::from(path);
  }
  data_dir()
}

/// Root of the compilation cache; one subdirectory per compressor backend lives below it.
pub fn cache_root(app_dir: &Path) -> PathBuf {
  app_dir.join("cache")
}

/// Location of the Closure compiler jar.
pub fn closure_jar(app_dir: &Path) -> PathBuf {
  if let Ok(path) = std::env::var(CLOSURE_JAR_ENV) {
    return PathBuf::from(path);
  }
  app_dir.join("compiler-latest").join("compiler.jar")
}

/// Turn `path` into an absolute path with `.` and `..` removed lexically.
///
/// Symlinks are not resolved: the result must match the names produced by
/// joining a directory with its own entries.
pub fn normalize(path: &Path) -> PathBuf {
  let absolute = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());

  let mut out = PathBuf::new();
  for component in absolute.components() {
    match component {
      Component::CurDir => {}
      Component::ParentDir => {
        out.pop();
      }
      other => out.push(other.as_os_str()),
    }
  }
  dunce::simplified(&out).to_path_buf()
}

/// Render a path with forward slashes for command lines and logs.
pub fn portable(path: &Path) -> String {
  path.to_string_lossy().replace('\\', "/")
}
