use predicates::prelude::*;
use serde_json::json;

use super::common::TestEnv;

#[test]
fn demo_target_fails_at_compile() {
  let env = TestEnv::new();
  let upstream = env.upstream_repo("demo");
  env.write_targets(json!([{
    "id": "demo",
    "repository": upstream,
    "subdirectory": "demo",
    "configure": [["true"]],
    "build": [["false"]]
  }]));

  env
    .wb_cmd()
    .args(["run", "demo"])
    .assert()
    .failure()
    .code(1)
    .stderr(predicate::str::contains("demo failed at build, exit code 1"));

  assert!(env.root_path().join("demo/.git").is_dir());
  assert!(env.root_path().join("demo/build").is_dir());
}

#[test]
fn batch_reports_every_target() {
  let env = TestEnv::with_targets(json!([
    { "id": "first", "subdirectory": "first", "configure": [["true"]], "build": [["true"]] },
    { "id": "second", "subdirectory": "second", "configure": [["false"]], "build": [["true"]] },
    { "id": "third", "subdirectory": "third", "configure": [["true"]], "build": [["true"]] }
  ]));

  let (code, report) = env.run_json(&["run", "all"]);

  assert_eq!(code, 1);
  let results = report["results"].as_array().unwrap();
  let states: Vec<(&str, &str, &str)> = results
    .iter()
    .map(|r| {
      (
        r["target"].as_str().unwrap(),
        r["state"].as_str().unwrap(),
        r["stage"].as_str().unwrap(),
      )
    })
    .collect();
  assert_eq!(
    states,
    vec![
      ("first", "succeeded", "build"),
      ("second", "failed", "configure"),
      ("third", "succeeded", "build"),
    ]
  );
  assert_eq!(results[1]["exit_code"], 1);
  assert_eq!(results[0]["fetch"]["outcome"], "not_required");
  assert_eq!(report["interrupted"], false);
}

#[test]
fn second_run_reuses_the_clone() {
  let env = TestEnv::new();
  let upstream = env.upstream_repo("demo");
  env.write_targets(json!([{
    "id": "demo",
    "repository": upstream,
    "subdirectory": "demo",
    "build": [["true"]]
  }]));

  let (code, first) = env.run_json(&["run", "demo"]);
  assert_eq!(code, 0);
  assert_eq!(first["results"][0]["fetch"]["outcome"], "cloned");

  let (code, second) = env.run_json(&["run", "demo"]);
  assert_eq!(code, 0);
  assert_eq!(second["results"][0]["fetch"]["outcome"], "already_present");
}

#[test]
fn failed_clone_reports_git_output() {
  let env = TestEnv::new();
  let missing = env.temp.path().join("no-such-repo");
  env.write_targets(json!([{
    "id": "broken",
    "repository": missing,
    "subdirectory": "broken",
    "build": [["true"]]
  }]));

  let (code, report) = env.run_json(&["run", "broken"]);

  assert_eq!(code, 1);
  let result = &report["results"][0];
  assert_eq!(result["state"], "fetch_failed");
  assert_eq!(result["stage"], "fetch");
  let reason = result["fetch"]["reason"].as_str().unwrap();
  assert!(reason.contains("no-such-repo"), "reason: {reason}");
}

#[test]
fn unknown_program_counts_as_127() {
  let env = TestEnv::with_targets(json!([
    { "id": "tool", "subdirectory": "tool", "configure": [["workbench-missing-tool-xyz"]] }
  ]));

  env
    .wb_cmd()
    .args(["run", "tool"])
    .assert()
    .failure()
    .code(1)
    .stderr(predicate::str::contains("tool failed at configure, exit code 127"))
    .stderr(predicate::str::contains("workbench-missing-tool-xyz"));
}

#[test]
fn child_output_is_streamed() {
  let env = TestEnv::with_targets(json!([
    { "id": "echo", "subdirectory": "echo", "build": [["echo", "hello from $${build}"]] }
  ]));

  let expected = format!("hello from {}", env.root_path().join("echo/build").display());
  env
    .wb_cmd()
    .args(["run", "echo"])
    .assert()
    .success()
    .stdout(predicate::str::contains(expected))
    .stdout(predicate::str::contains("Succeeded"));
}

#[test]
fn missing_outputs_warn_but_succeed() {
  let env = TestEnv::with_targets(json!([
    { "id": "lib", "subdirectory": "lib", "build": [["true"]], "outputs": ["lib/libfoo.so"] }
  ]));

  env
    .wb_cmd()
    .args(["run", "lib"])
    .assert()
    .success()
    .stderr(predicate::str::contains("declared outputs missing: lib/libfoo.so"));
}

#[test]
fn dry_run_lists_commands_without_running_them() {
  let env = TestEnv::with_targets(json!([
    { "id": "demo", "repository": "/srv/git/demo", "subdirectory": "demo",
      "configure": [["cmake", "-S$${source}", "-B$${build}"]], "build": [["false"]] }
  ]));

  let (code, report) = env.run_json(&["run", "demo", "--dry-run"]);

  assert_eq!(code, 0);
  assert_eq!(report["dry_run"], true);
  let planned = &report["planned"][0];
  assert_eq!(planned["fetch"]["program"], "git");
  assert_eq!(planned["configure"][0]["args"][0], format!("-S{}", env.root_path().join("demo").display()));
  assert!(!env.root_path().exists());
}
