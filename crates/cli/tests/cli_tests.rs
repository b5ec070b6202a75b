//! CLI integration tests

use std::process::{Command, Output};

fn carbon(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_carbon"))
        .args(args)
        .env("HOME", "/nonexistent-carbon-home")
        .env_remove("CARBON_API_URL")
        .output()
        .expect("Failed to execute command")
}

/// Test that the CLI shows help
#[test]
fn test_cli_help() {
    let output = carbon(&["--help"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "CLI help should succeed");
    assert!(
        stdout.contains("Carbon Region Advisor"),
        "Should show app name"
    );
    for command in ["regions", "summary", "forecast", "advise", "estimate", "refresh"] {
        assert!(stdout.contains(command), "Should show {} command", command);
    }
}

/// Test that the CLI shows version
#[test]
fn test_cli_version() {
    let output = carbon(&["--version"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "CLI version should succeed");
    assert!(stdout.contains("carbon"), "Should show binary name");
}

/// Test format and api-url options
#[test]
fn test_global_options() {
    let output = carbon(&["--help"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(stdout.contains("--format"), "Should show format option");
    assert!(stdout.contains("table"), "Should show table format");
    assert!(stdout.contains("json"), "Should show json format");
    assert!(stdout.contains("--api-url"), "Should show api-url option");
    assert!(stdout.contains("CARBON_API_URL"), "Should show env var");
}

/// Test advise subcommand help
#[test]
fn test_advise_help() {
    let output = carbon(&["advise", "--help"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "Advise help should succeed");
    assert!(stdout.contains("--region"), "Should show region option");
}

/// Test estimate subcommand help
#[test]
fn test_estimate_help() {
    let output = carbon(&["estimate", "--help"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "Estimate help should succeed");
    for option in ["--vcpus", "--memory-gb", "--minutes", "--provider", "--intensity", "--region"] {
        assert!(stdout.contains(option), "Should show {} option", option);
    }
}

/// Local estimates need no agent
#[test]
fn test_local_estimate_json() {
    let output = carbon(&[
        "--format",
        "json",
        "estimate",
        "--vcpus",
        "2",
        "--memory-gb",
        "4",
        "--minutes",
        "60",
        "--intensity",
        "100",
    ]);

    assert!(output.status.success(), "Local estimate should succeed");
    let estimate: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let total = estimate["total_grams_co2"].as_f64().unwrap();
    assert!((total - 7.447968).abs() < 1e-9, "total {}", total);
}

/// Test that --intensity and --region are exclusive
#[test]
fn test_estimate_intensity_conflicts_with_region() {
    let output = carbon(&[
        "estimate",
        "--vcpus",
        "1",
        "--memory-gb",
        "1",
        "--minutes",
        "10",
        "--intensity",
        "50",
        "--region",
        "eu-west-2",
    ]);

    assert!(!output.status.success(), "Conflicting options should fail");
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("cannot be used with"), "{}", stderr);
}

/// Test invalid command error handling
#[test]
fn test_invalid_command() {
    let output = carbon(&["invalid-command"]);

    assert!(!output.status.success(), "Invalid command should fail");

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("error") || stderr.contains("invalid"),
        "Should show error message"
    );
}

/// Test missing required argument error handling
#[test]
fn test_missing_argument() {
    let output = carbon(&["estimate", "--vcpus", "2"]);

    assert!(!output.status.success(), "Missing argument should fail");

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("required") || stderr.contains("error"),
        "Should show error about missing argument"
    );
}

/// Unreachable agent surfaces an error instead of panicking
#[test]
fn test_unreachable_agent() {
    let output = carbon(&["--api-url", "http://127.0.0.1:9", "regions"]);

    assert!(!output.status.success(), "Unreachable agent should fail");
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Failed to send request"), "{}", stderr);
}
