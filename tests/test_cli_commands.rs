mod common;

use common::{fixture_arg, spawn_command, stdout_json};

// ============================================================================
// evaluate command
// ============================================================================

#[test]
fn evaluate_json_report() {
    let output = spawn_command(&[
        "evaluate",
        "--rubric",
        &fixture_arg("rubrics/fast_castle_boom.json"),
        "--game-data",
        &fixture_arg("games/standard_game.json"),
        "--format",
        "json",
    ]);
    assert!(
        output.status.success(),
        "evaluate should exit 0: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let report = stdout_json(&output);
    assert_eq!(report["rubric_id"], "fast_castle_boom");
    assert_eq!(report["predicate_registry_version"], 1);
    assert_eq!(report["phases"].as_array().unwrap().len(), 3);
    assert_eq!(report["benchmarks"][0]["name"], "feudal_age");
    assert_eq!(report["benchmarks"][0]["status"], "on_pace");
    assert_eq!(report["decision_points"][0]["outcome"], "followed_adaptation");
}

#[test]
fn evaluate_resolves_library_ids() {
    let output = spawn_command(&[
        "evaluate",
        "-r",
        "fast_castle",
        "-g",
        &fixture_arg("games/standard_game.json"),
        "--library",
        &fixture_arg("rubrics"),
        "-f",
        "json",
    ]);
    assert!(
        output.status.success(),
        "partial library id should resolve: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    assert_eq!(stdout_json(&output)["rubric_id"], "fast_castle_boom");
}

#[test]
fn evaluate_human_report() {
    let output = spawn_command(&[
        "evaluate",
        "-r",
        &fixture_arg("rubrics/fast_castle_boom.json"),
        "-g",
        &fixture_arg("games/late_feudal.json"),
    ]);
    assert!(
        output.status.success(),
        "a poor game still exits 0: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Fast Castle into Two-TC Boom"), "{stdout}");
    assert!(stdout.contains("Critical violations"), "{stdout}");
    assert!(stdout.contains("significantly_behind"), "{stdout}");
    assert!(stdout.contains("Findings"), "{stdout}");
}

#[test]
fn evaluate_writes_output_file() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("report.json");
    let output = spawn_command(&[
        "evaluate",
        "-r",
        &fixture_arg("rubrics/fast_castle_boom.json"),
        "-g",
        &fixture_arg("games/summary_export.json"),
        "-f",
        "json",
        "-o",
        out.to_str().unwrap(),
    ]);
    assert!(
        output.status.success(),
        "evaluate -o should exit 0: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    assert!(output.stdout.is_empty(), "report should not go to stdout");

    let written: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&out).unwrap()).unwrap();
    assert_eq!(written["benchmarks"][0]["actual"], 312.0);
    assert_eq!(written["game"]["game_id"], "182257348");
    assert_eq!(written["game"]["opponent"]["civilization"], "mongols");
}

#[test]
fn evaluate_missing_phases_fails_without_report() {
    let output = spawn_command(&[
        "evaluate",
        "-r",
        &fixture_arg("rubrics/missing_phases.json"),
        "-g",
        &fixture_arg("games/standard_game.json"),
        "-f",
        "json",
    ]);
    assert_eq!(output.status.code(), Some(2));
    assert!(output.stdout.is_empty(), "no report on schema failure");

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("phases"), "error should name phases: {stderr}");
}

#[test]
fn evaluate_without_anchor_events_fails() {
    let output = spawn_command(&[
        "evaluate",
        "-r",
        &fixture_arg("rubrics/fast_castle_boom.json"),
        "-g",
        &fixture_arg("games/no_anchor.json"),
    ]);
    assert_eq!(output.status.code(), Some(4));
    assert!(output.stdout.is_empty());
}

#[test]
fn evaluate_unknown_rubric_suggests() {
    let output = spawn_command(&[
        "evaluate",
        "-r",
        "scout_rushh",
        "-g",
        &fixture_arg("games/standard_game.json"),
        "--library",
        &fixture_arg("rubrics"),
    ]);
    assert_eq!(output.status.code(), Some(3));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("scout_rush"), "expected suggestion: {stderr}");
}

#[test]
fn evaluate_rejects_inverted_pace_windows() {
    let output = spawn_command(&[
        "evaluate",
        "-r",
        &fixture_arg("rubrics/fast_castle_boom.json"),
        "-g",
        &fixture_arg("games/standard_game.json"),
        "--on-pace-window",
        "30",
        "--slight-window",
        "10",
    ]);
    assert_eq!(output.status.code(), Some(64));
}

// ============================================================================
// validate command
// ============================================================================

#[test]
fn validate_valid_rubrics() {
    let output = spawn_command(&[
        "validate",
        &fixture_arg("rubrics/fast_castle_boom.json"),
        &fixture_arg("rubrics/scout_rush.yaml"),
    ]);
    assert!(
        output.status.success(),
        "validate should succeed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("scout_rush"), "{stdout}");
    assert!(stdout.contains("idle_tc_over"), "warning should suggest: {stdout}");
}

#[test]
fn validate_strict_rejects_warnings() {
    let output = spawn_command(&["validate", "--strict", &fixture_arg("rubrics/scout_rush.yaml")]);
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn validate_invalid_rubric() {
    let output = spawn_command(&["validate", &fixture_arg("rubrics/missing_phases.json")]);
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn validate_json_output() {
    let output = spawn_command(&[
        "validate",
        "--format",
        "json",
        &fixture_arg("rubrics/scout_rush.yaml"),
    ]);
    assert!(output.status.success());
    let parsed = stdout_json(&output);
    assert_eq!(parsed[0]["id"], "scout_rush");
    assert_eq!(parsed[0]["warnings"].as_array().unwrap().len(), 2);
}

#[test]
fn validate_missing_file() {
    let output = spawn_command(&["validate", "/tmp/nonexistent_rubricate_rubric.json"]);
    assert_eq!(output.status.code(), Some(3));
}

// ============================================================================
// predicates / version / completions
// ============================================================================

#[test]
fn predicates_json() {
    let output = spawn_command(&["predicates", "--format", "json"]);
    assert!(output.status.success());
    let parsed = stdout_json(&output);
    assert_eq!(parsed["version"], 1);
    let ids: Vec<&str> = parsed["predicates"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|p| p["id"].as_str())
        .collect();
    assert_eq!(ids.len(), 13);
    assert!(ids.contains(&"villager_gap_under"));
}

#[test]
fn version_human() {
    let output = spawn_command(&["version"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("rubricate"), "{stdout}");
    assert!(stdout.contains('.'), "{stdout}");
}

#[test]
fn version_json() {
    let output = spawn_command(&["version", "--format", "json"]);
    assert!(output.status.success());
    let parsed = stdout_json(&output);
    assert_eq!(parsed["name"], "rubricate");
    assert!(parsed.get("version").is_some());
}

#[test]
fn completions_bash() {
    let output = spawn_command(&["completions", "bash"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("rubricate"), "{stdout}");
}

#[test]
fn invalid_subcommand_fails() {
    let output = spawn_command(&["nonexistent-command"]);
    assert!(!output.status.success());
}
