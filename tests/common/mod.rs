//! Shared integration-test harness for running the `rubricate` binary and
//! locating fixtures.

#![allow(dead_code)]

use std::path::PathBuf;
use std::process::{Command, Output};

/// Returns the path to a test fixture.
#[must_use]
pub fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name)
}

/// Returns a fixture path as a `String` for use in argument lists.
#[must_use]
pub fn fixture_arg(name: &str) -> String {
    fixture_path(name)
        .to_str()
        .expect("non-UTF-8 fixture path")
        .to_string()
}

/// Runs the binary to completion with logging silenced.
#[allow(clippy::missing_panics_doc)]
pub fn spawn_command(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_rubricate"))
        .args(args)
        .env_remove("RUBRICATE_LOG_LEVEL")
        .env_remove("RUBRICATE_LIBRARY")
        .env_remove("RUBRICATE_ON_PACE_WINDOW")
        .env_remove("RUBRICATE_SLIGHT_WINDOW")
        .env("NO_COLOR", "1")
        .output()
        .expect("failed to spawn rubricate")
}

/// Parses stdout as JSON, panicking with the raw output on failure.
#[allow(clippy::missing_panics_doc)]
pub fn stdout_json(output: &Output) -> serde_json::Value {
    let stdout = String::from_utf8_lossy(&output.stdout);
    serde_json::from_str(&stdout)
        .unwrap_or_else(|e| panic!("stdout is not JSON: {e}\nstdout: {stdout}"))
}
