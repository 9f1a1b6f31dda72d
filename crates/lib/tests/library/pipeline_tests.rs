use tracing_test::traced_test;

use wortels_lib::util::hash::hash_bytes;
use wortels_lib::{BundleConfig, Compressor, PipelineError};

use super::common::{FakeMinifier, TestEnv, minified};

fn app_env() -> TestEnv {
  let env = TestEnv::new();
  env.write_asset("a.js", "var a = 1;");
  env.write_asset("b.js", "var b = 2;");
  env.write_asset("lib/c.js", "var c = 3;");
  env.write_asset("app.js", "//= require a\n// vendor code below\nb.js\n\nlib/c.js\n");
  env
}

#[tokio::test]
async fn builds_bundle_in_manifest_order() {
  let env = TestEnv::new();
  env.write_asset("a.js", "A");
  env.write_asset("b.js", "B");
  env.write_asset("c.js", "C");
  env.write_asset("app.js", "c.js\na.js\nb.js\n");
  let minifier = FakeMinifier::default();

  let report = env.run(&minifier, &["app.js"]).await.unwrap();

  // The batch is compiled sorted by path, the bundle follows the manifest.
  assert_eq!(minifier.call_count(), 1);
  let inputs = minifier.inputs(0);
  assert!(inputs[0].ends_with("a.js") && inputs[1].ends_with("b.js") && inputs[2].ends_with("c.js"));
  assert_eq!(
    env.read_bundle("app.js"),
    format!("{}{}{}", minified("C"), minified("A"), minified("B"))
  );
  assert_eq!(report.bundles.len(), 1);
  assert_eq!(report.compiled.len(), 3);
}

#[tokio::test]
async fn sprockets_directives_and_comments() {
  let env = app_env();
  let minifier = FakeMinifier::default();

  env.run(&minifier, &["app.js"]).await.unwrap();

  assert_eq!(
    env.read_bundle("app.js"),
    format!(
      "{}{}{}",
      minified("var a = 1;"),
      minified("var b = 2;"),
      minified("var c = 3;")
    )
  );
}

#[tokio::test]
#[traced_test]
async fn second_run_is_all_cache_hits() {
  let env = app_env();
  let minifier = FakeMinifier::default();

  let first = env.run(&minifier, &["app.js"]).await.unwrap();
  let first_bytes = std::fs::read(env.bundle("app.js")).unwrap();
  let second = env.run(&minifier, &["app.js"]).await.unwrap();

  assert_eq!(minifier.call_count(), 1);
  assert_eq!(first.plan.cache_misses, 3);
  assert_eq!(second.plan.cache_misses, 0);
  assert_eq!(second.plan.cache_hits, 3);
  assert!(second.compiled.is_empty());
  assert_eq!(std::fs::read(env.bundle("app.js")).unwrap(), first_bytes);
  assert!(logs_contain("skipping compilation"));
}

#[tokio::test]
async fn changed_file_is_recompiled_alone() {
  let env = app_env();
  let minifier = FakeMinifier::default();
  env.run(&minifier, &["app.js"]).await.unwrap();

  env.write_asset("b.js", "var b = 42;");
  let report = env.run(&minifier, &["app.js"]).await.unwrap();

  assert_eq!(minifier.call_count(), 2);
  assert_eq!(minifier.inputs(1).len(), 1);
  assert!(minifier.inputs(1)[0].ends_with("b.js"));
  assert_eq!(report.plan.cache_hits, 2);
  assert!(env.read_bundle("app.js").contains("var b = 42;"));
  assert_eq!(env.cache_entries(), 4);
}

#[tokio::test]
async fn identical_content_compiles_once_across_manifests() {
  let env = TestEnv::new();
  env.write_asset("one/shared.js", "shared()");
  env.write_asset("two/copy.js", "shared()");
  env.write_asset("x.js", "x()");
  env.write_asset("first.js", "one/shared.js\nx.js\n");
  env.write_asset("second.js", "two/copy.js\none/shared.js\n");
  let minifier = FakeMinifier::default();

  let report = env.run(&minifier, &["first.js", "second.js"]).await.unwrap();

  assert_eq!(minifier.call_count(), 1);
  assert_eq!(minifier.inputs(0).len(), 2);
  assert_eq!(report.plan.unique_files, 3);
  assert_eq!(env.cache_entries(), 2);
  assert_eq!(
    env.read_bundle("second.js"),
    format!("{}{}", minified("shared()"), minified("shared()"))
  );
  assert_eq!(
    env.read_bundle("first.js"),
    format!("{}{}", minified("shared()"), minified("x()"))
  );
}

#[tokio::test]
async fn missing_file_fails_and_writes_no_bundle() {
  let env = TestEnv::new();
  env.write_asset("a.js", "A");
  env.write_asset("app.js", "a.js\nmissing.js\n");
  let minifier = FakeMinifier::default();

  let err = env.run(&minifier, &["app.js"]).await.unwrap_err();

  assert!(matches!(err, PipelineError::Plan(_)));
  assert!(err.to_string().contains("missing.js"));
  assert_eq!(minifier.call_count(), 0);
  assert!(!env.bundle("app.js").exists());
}

#[tokio::test]
async fn missing_directory_is_reported_as_missing_file() {
  let env = TestEnv::new();
  env.write_asset("app.js", "nowhere/a.js\n");

  let err = env.run(&FakeMinifier::default(), &["app.js"]).await.unwrap_err();

  assert!(matches!(err, PipelineError::Plan(_)));
  assert!(err.to_string().contains("a.js"));
}

#[tokio::test]
async fn reference_below_a_file_is_reported_as_missing_file() {
  let env = TestEnv::new();
  env.write_asset("a.js", "A");
  env.write_asset("app.js", "a.js\na.js/x.js\n");
  let minifier = FakeMinifier::default();

  let err = env.run(&minifier, &["app.js"]).await.unwrap_err();

  assert_eq!(err.stage(), "plan");
  assert!(err.to_string().contains("a.js/x.js"), "got: {}", err);
  assert_eq!(minifier.call_count(), 0);
  assert!(!env.bundle("app.js").exists());
}

#[cfg(unix)]
#[tokio::test]
async fn unreadable_unreferenced_sibling_is_ignored() {
  use std::os::unix::fs::PermissionsExt;

  let env = TestEnv::new();
  env.write_asset("a.js", "A");
  env.write_asset("secret.key", "hunter2");
  env.write_asset("app.js", "a.js\n");
  let secret = env.assets().join("secret.key");
  std::fs::set_permissions(&secret, std::fs::Permissions::from_mode(0o000)).unwrap();
  if std::fs::File::open(&secret).is_ok() {
    // permissions are not enforced for this user (e.g. root)
    return;
  }

  env.run(&FakeMinifier::default(), &["app.js"]).await.unwrap();

  assert_eq!(env.read_bundle("app.js"), minified("A"));
}

#[tokio::test]
async fn unsafe_digest_is_rejected_before_any_work() {
  let env = app_env();
  let config = BundleConfig {
    digest: Some("a/b".to_string()),
    ..env.config.clone()
  };
  let minifier = FakeMinifier::default();

  let err = env.run_with(&config, &minifier, &["app.js"]).await.unwrap_err();

  assert_eq!(err.stage(), "config");
  assert!(err.to_string().contains("a/b"));
  assert_eq!(minifier.call_count(), 0);
  assert_eq!(env.cache_entries(), 0);
  assert!(!env.config.outdir.exists());
}

#[tokio::test]
async fn missing_manifest_fails() {
  let env = TestEnv::new();

  let err = env.run(&FakeMinifier::default(), &["nope.js"]).await.unwrap_err();

  assert_eq!(err.stage(), "manifest");
  assert!(err.to_string().contains("nope.js"));
}

#[tokio::test]
async fn compiler_failure_aborts_run() {
  let env = app_env();
  let minifier = FakeMinifier::failing(1, "SyntaxError: Unexpected token");

  let err = env.run(&minifier, &["app.js"]).await.unwrap_err();

  assert_eq!(err.stage(), "compile");
  assert!(err.to_string().contains("Unexpected token"));
  assert_eq!(env.cache_entries(), 0);
  assert!(!env.bundle("app.js").exists());
}

#[tokio::test]
async fn explicit_digest_is_injected_and_wins() {
  let env = app_env();
  let config = BundleConfig {
    digest: Some("abc123".to_string()),
    generate_digest: true,
    ..env.config.clone()
  };

  let report = env.run_with(&config, &FakeMinifier::default(), &["app.js"]).await.unwrap();

  assert_eq!(report.bundles[0].path, env.bundle("app-abc123.js"));
  assert!(env.bundle("app-abc123.js").exists());
  assert!(!env.bundle("app.js").exists());
}

#[tokio::test]
async fn generated_digest_renames_bundle() {
  let env = app_env();
  let config = BundleConfig {
    generate_digest: true,
    ..env.config.clone()
  };

  let report = env.run_with(&config, &FakeMinifier::default(), &["app.js"]).await.unwrap();

  let content = std::fs::read(&report.bundles[0].path).unwrap();
  let expected = env.bundle(&format!("app-{}.js", hash_bytes(&content)));
  assert_eq!(report.bundles[0].path, expected);
  assert!(!env.bundle("app.js").exists());
}

#[tokio::test]
async fn cache_is_namespaced_per_compressor() {
  let env = app_env();
  let minifier = FakeMinifier::default();
  env.run(&minifier, &["app.js"]).await.unwrap();

  let closure = BundleConfig {
    compressor: Compressor::Closure,
    ..env.config.clone()
  };
  env.run_with(&closure, &minifier, &["app.js"]).await.unwrap();

  assert_eq!(minifier.call_count(), 2);
  assert_eq!(minifier.calls.lock().unwrap()[1].program, "java");
  assert!(env.config.app_dir.join("cache").join("closure").is_dir());
  assert!(env.config.app_dir.join("cache").join("uglifyjs").is_dir());
}

#[tokio::test]
async fn empty_manifest_writes_empty_bundle() {
  let env = TestEnv::new();
  env.write_asset("empty.js", "// nothing here\n\n");
  let minifier = FakeMinifier::default();

  env.run(&minifier, &["empty.js"]).await.unwrap();

  assert_eq!(minifier.call_count(), 0);
  assert_eq!(env.read_bundle("empty.js"), "");
}
