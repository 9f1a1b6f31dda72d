//! End-to-end bundling through the binary.

#![cfg(unix)]

use predicates::prelude::*;

use super::common::TestEnv;

fn app_fixture(env: &TestEnv) {
  env.write_asset("js/a.js", "var a = 1;\n");
  env.write_asset("js/b.js", "var b = 2;\n");
  env.write_asset("app.js", "js/a.js\n//= require js/b\n");
}

#[test]
fn bundles_manifest_in_order() {
  let env = TestEnv::with_fake_minifier();
  app_fixture(&env);

  env
    .wortels_cmd()
    .arg("app.js")
    .assert()
    .success()
    .stdout(predicate::str::contains("Bundled 1 manifest(s)"));

  let bundle = env.read_output("app.js");
  let a = bundle.find("var a = 1;").expect("a.js in bundle");
  let b = bundle.find("var b = 2;").expect("b.js in bundle");
  assert!(a < b);
  assert!(!bundle.contains("// Input"));
  assert_eq!(env.invocations(), 1);
}

#[test]
fn second_run_skips_the_minifier() {
  let env = TestEnv::with_fake_minifier();
  app_fixture(&env);

  env.wortels_cmd().arg("app.js").assert().success();
  let first = env.read_output("app.js");

  env
    .wortels_cmd()
    .arg("app.js")
    .assert()
    .success()
    .stdout(predicate::str::contains("All sources cached"));

  assert_eq!(env.invocations(), 1);
  assert_eq!(env.read_output("app.js"), first);
}

#[test]
fn shared_files_compile_once_across_manifests() {
  let env = TestEnv::with_fake_minifier();
  app_fixture(&env);
  env.write_asset("admin.js", "js/b.js\n");

  env.wortels_cmd().args(["app.js", "admin.js"]).assert().success();

  assert_eq!(env.invocations(), 1);
  assert_eq!(env.read_output("admin.js"), "var b = 2;\n");
  assert_eq!(env.outputs(), vec!["admin.js", "app.js"]);
}

#[test]
fn explicit_digest_is_injected() {
  let env = TestEnv::with_fake_minifier();
  app_fixture(&env);

  env.wortels_cmd().args(["--digest", "abc123", "app.js"]).assert().success();

  assert_eq!(env.outputs(), vec!["app-abc123.js"]);
}

#[test]
fn generated_digest_renames_bundle() {
  let env = TestEnv::with_fake_minifier();
  app_fixture(&env);

  env.wortels_cmd().args(["--generate-digest", "app.js"]).assert().success();

  let outputs = env.outputs();
  assert_eq!(outputs.len(), 1);
  assert!(outputs[0].starts_with("app-"), "got {:?}", outputs);
  assert!(outputs[0].ends_with(".js"));
}

#[test]
fn json_report_is_parseable() {
  let env = TestEnv::with_fake_minifier();
  app_fixture(&env);

  let output = env.wortels_cmd().args(["--output", "json", "app.js"]).output().unwrap();
  assert!(output.status.success());

  let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
  assert_eq!(report["manifests"], 1);
  assert_eq!(report["plan"]["cache_misses"], 2);
  assert_eq!(report["bundles"].as_array().unwrap().len(), 1);
}

#[test]
fn shasum_fingerprints_drive_the_cache() {
  let env = TestEnv::with_fake_minifier();
  env.install_fake_shasum();
  app_fixture(&env);

  env.wortels_cmd().args(["--fingerprint", "shasum", "app.js"]).assert().success();
  let first = env.read_output("app.js");
  assert!(env.shasum_invocations() >= 1);
  assert_eq!(env.invocations(), 1);

  env
    .wortels_cmd()
    .args(["--fingerprint", "shasum", "app.js"])
    .assert()
    .success()
    .stdout(predicate::str::contains("All sources cached"));

  assert_eq!(env.invocations(), 1);
  assert_eq!(env.read_output("app.js"), first);
}

#[test]
fn minifier_failure_is_fatal() {
  let env = TestEnv::with_failing_minifier();
  app_fixture(&env);

  env
    .wortels_cmd()
    .arg("app.js")
    .assert()
    .failure()
    .stderr(predicate::str::contains("compile"))
    .stderr(predicate::str::contains("Parse error"));

  assert!(env.outputs().is_empty());
}
