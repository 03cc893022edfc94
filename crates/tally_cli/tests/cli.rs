use std::path::PathBuf;

use assert_cmd::Command;
use predicates::prelude::*;

fn demo() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../demos/contest.json")
}

fn tally() -> Command {
    Command::cargo_bin("tally").unwrap()
}

#[test]
fn replays_demo_and_writes_snapshot() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("snapshot.json");
    tally()
        .arg("--scenario")
        .arg(demo())
        .arg("--out")
        .arg(&out)
        .assert()
        .success()
        .stdout(predicate::str::contains("\"applied_events\":8"))
        .stdout(predicate::str::contains("SNAP:"));

    let snapshot: serde_json::Value = serde_json::from_slice(&std::fs::read(&out).unwrap()).unwrap();
    let results = snapshot["end_results"].as_array().unwrap();
    assert_eq!(results.len(), 3);
    assert!(results.iter().all(|r| r["progress"]["phase"] == "finalized"));
}

#[test]
fn replay_is_deterministic() {
    let run = || tally().arg("--scenario").arg(demo()).output().unwrap().stdout;
    assert_eq!(run(), run());
}

#[test]
fn validate_only_does_not_replay() {
    tally()
        .arg("--scenario")
        .arg(demo())
        .arg("--validate-only")
        .assert()
        .success()
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("scenario OK"));
}

#[test]
fn manual_distribution_blocks_finalization() {
    tally()
        .arg("--scenario")
        .arg(demo())
        .arg("--manual-distribution")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("event 7 (finalized)"));
}

#[test]
fn malformed_and_missing_inputs() {
    let dir = tempfile::tempdir().unwrap();
    let bad = dir.path().join("bad.json");
    std::fs::write(&bad, r#"{ "political_businesses": [], "surprise": 1 }"#).unwrap();
    tally().arg("--scenario").arg(&bad).assert().code(2);

    tally()
        .arg("--scenario")
        .arg(dir.path().join("missing.json"))
        .assert()
        .code(2)
        .stderr(predicate::str::contains("file not found"));

    tally().args(["--scenario", "https://example.org/s.json"]).assert().code(2);
}

#[test]
fn over_retraction_exits_with_invariant_code() {
    let dir = tempfile::tempdir().unwrap();
    let scenario = dir.path().join("s.json");
    std::fs::write(
        &scenario,
        r#"{
          "political_businesses": [
            { "kind": "vote", "id": "v-1", "total_count_of_counting_circles": 1, "ballots": ["b-1"] } ],
          "events": [
            { "type": "counting_circle_result_applied", "political_business_id": "v-1",
              "counting_circle_id": "cc-1", "factor": -1, "done_state_changed": false,
              "result": { "kind": "vote", "ballots": { "b-1": { "yes": 1 } } } } ]
        }"#,
    )
    .unwrap();
    tally().arg("--scenario").arg(&scenario).arg("--quiet").assert().code(3);
}
