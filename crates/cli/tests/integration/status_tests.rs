use predicates::prelude::*;
use serde_json::json;

use super::common::TestEnv;

#[test]
fn status_reports_present_and_missing_targets() {
  let env = TestEnv::with_targets(json!([
    { "id": "alpha", "subdirectory": "alpha" },
    { "id": "beta", "subdirectory": "beta" }
  ]));
  env.write_workspace_file("beta/README.md", "beta");

  let (code, state) = env.run_json(&["status"]);

  assert_eq!(code, 0);
  assert_eq!(state["targets"][0]["id"], "alpha");
  assert_eq!(state["targets"][0]["present"], false);
  assert_eq!(state["targets"][1]["present"], true);
  assert_eq!(state["targets"][1]["last_build"], "never_built");
}

#[test]
fn status_shows_cloned_revision() {
  let env = TestEnv::new();
  let upstream = env.upstream_repo("demo");
  std::fs::write(upstream.join("README.md"), "demo\n").unwrap();
  for args in [
    vec!["add", "README.md"],
    vec!["-c", "user.name=wb", "-c", "user.email=wb@example.com", "commit", "--quiet", "-m", "initial"],
  ] {
    let status = std::process::Command::new("git")
      .args(&args)
      .current_dir(&upstream)
      .status()
      .unwrap();
    assert!(status.success());
  }
  env.write_targets(json!([{ "id": "demo", "repository": upstream, "subdirectory": "demo" }]));

  env.wb_cmd().args(["run", "demo"]).assert().success();

  let (_, state) = env.run_json(&["status"]);
  let revision = state["targets"][0]["revision"].as_str().unwrap();
  assert_eq!(revision.len(), 40);

  env
    .wb_cmd()
    .arg("status")
    .assert()
    .success()
    .stdout(predicate::str::contains(&revision[..12]));
}
