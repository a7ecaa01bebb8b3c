//! CLI integration tests

use std::process::{Command, Output};

fn scribe_capture_bin() -> Command {
    Command::new(env!("CARGO_BIN_EXE_scribe-capture"))
}

/// Run with config and data dirs pointed into `home`
fn run_isolated(home: &std::path::Path, args: &[&str]) -> Output {
    scribe_capture_bin()
        .args(args)
        .env("XDG_CONFIG_HOME", home.join("config"))
        .env("XDG_DATA_HOME", home.join("data"))
        .env("HOME", home)
        .env_remove("SCRIBE_CAPTURE_DEVICE")
        .env_remove("SCRIBE_CAPTURE_LOG")
        .output()
        .expect("Failed to execute command")
}

#[test]
fn help_output() {
    let output = scribe_capture_bin()
        .arg("--help")
        .output()
        .expect("Failed to execute command");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("devices"));
    assert!(stdout.contains("record"));
    assert!(stdout.contains("listen"));
    assert!(stdout.contains("config"));
    assert!(stdout.contains("--verbose"));
}

#[test]
fn record_help_lists_options() {
    let output = scribe_capture_bin()
        .args(["record", "--help"])
        .output()
        .expect("Failed to execute command");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("--device"));
    assert!(stdout.contains("--bitrate"));
    assert!(stdout.contains("--duration"));
    assert!(stdout.contains("--output"));
    assert!(stdout.contains("SCRIBE_CAPTURE_DEVICE"));
}

#[test]
fn version_output() {
    let output = scribe_capture_bin()
        .arg("--version")
        .output()
        .expect("Failed to execute command");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("scribe-capture"));
    assert!(stdout.contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn missing_subcommand_is_usage_error() {
    let output = scribe_capture_bin().output().expect("Failed to execute command");
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn config_path_command() {
    let home = tempfile::tempdir().unwrap();
    let output = run_isolated(home.path(), &["config", "path"]);

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("scribe-capture"));
    assert!(stdout.contains("config.toml"));
}

#[test]
fn config_set_get_unset() {
    let home = tempfile::tempdir().unwrap();

    let output = run_isolated(home.path(), &["config", "set", "bitrate_kbps", "128k"]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let output = run_isolated(home.path(), &["config", "get", "bitrate_kbps"]);
    assert!(output.status.success());
    assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "128");

    let output = run_isolated(home.path(), &["config", "unset", "bitrate_kbps"]);
    assert!(output.status.success());

    let output = run_isolated(home.path(), &["config", "get", "bitrate_kbps"]);
    assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "(not set)");
}

#[test]
fn config_init_then_list() {
    let home = tempfile::tempdir().unwrap();

    let output = run_isolated(home.path(), &["config", "init"]);
    assert!(output.status.success());
    assert!(home
        .path()
        .join("config")
        .join("scribe-capture")
        .join("config.toml")
        .exists());

    let output = run_isolated(home.path(), &["config", "list"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("bitrate_kbps"));
    assert!(stdout.contains("256"));
    assert!(stdout.contains("vad.redemption_ms"));

    let output = run_isolated(home.path(), &["config", "init"]);
    assert!(!output.status.success());
}
