use predicates::prelude::*;
use serde_json::json;

use super::common::TestEnv;

fn populated() -> TestEnv {
  let env = TestEnv::with_targets(json!([{ "id": "demo", "subdirectory": "demo" }]));
  env.write_workspace_file("demo/CMakeLists.txt", "project(demo)");
  env.write_workspace_file("demo/build/bin/demo", "binary");
  env
}

#[test]
fn clean_force_removes_the_root() {
  let env = populated();

  env
    .wb_cmd()
    .args(["clean", "--force"])
    .assert()
    .success()
    .stdout(predicate::str::contains("Removed"));

  assert!(!env.root_path().exists());
}

#[test]
fn clean_without_force_refuses_when_not_interactive() {
  let env = populated();

  env
    .wb_cmd()
    .arg("clean")
    .assert()
    .failure()
    .code(1)
    .stderr(predicate::str::contains("--force"));

  assert!(env.root_path().join("demo/build/bin/demo").exists());
}

#[test]
fn clean_json_reports_removed_entries() {
  let env = populated();

  let (code, report) = env.run_json(&["clean", "--force"]);

  assert_eq!(code, 0);
  assert_eq!(report["existed"], true);
  // root, demo, demo/build, demo/build/bin and two files
  assert_eq!(report["removed"], 6);
}

#[test]
fn clean_then_run_fetches_again() {
  let env = TestEnv::new();
  let upstream = env.upstream_repo("demo");
  env.write_targets(json!([{ "id": "demo", "repository": upstream, "subdirectory": "demo" }]));

  let (_, first) = env.run_json(&["run", "demo"]);
  assert_eq!(first["results"][0]["fetch"]["outcome"], "cloned");

  env.wb_cmd().args(["clean", "--force"]).assert().success();

  let (_, again) = env.run_json(&["run", "demo"]);
  assert_eq!(again["results"][0]["fetch"]["outcome"], "cloned");
}
