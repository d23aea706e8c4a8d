use assert_cmd::Command;
use predicates::prelude::*;
use std::path::PathBuf;

#[allow(deprecated)]
fn get_kestrel_bin() -> PathBuf {
    assert_cmd::cargo::cargo_bin("kestrel")
}

#[test]
fn test_top_level_help_lists_commands() {
    let mut cmd = Command::new(get_kestrel_bin());
    cmd.arg("--help");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("browser session manager"))
        .stdout(predicate::str::contains("open"))
        .stdout(predicate::str::contains("discover"))
        .stdout(predicate::str::contains("probe"));
}

#[test]
fn test_open_command_help() {
    let mut cmd = Command::new(get_kestrel_bin());
    cmd.arg("open").arg("--help");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("--cdp-url"))
        .stdout(predicate::str::contains("--wss-url"))
        .stdout(predicate::str::contains("--executable"))
        .stdout(predicate::str::contains("--keep-alive"))
        .stdout(predicate::str::contains("--allowed-domain"))
        .stdout(predicate::str::contains("--window-size"));
}

#[test]
fn test_open_rejects_conflicting_attach_urls() {
    let mut cmd = Command::new(get_kestrel_bin());
    cmd.arg("open")
        .arg("--cdp-url")
        .arg("http://localhost:9222")
        .arg("--wss-url")
        .arg("ws://localhost:9222/session");

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("cannot be used with"));
}

#[test]
fn test_open_rejects_malformed_window_size() {
    let mut cmd = Command::new(get_kestrel_bin());
    cmd.arg("open")
        .arg("--window-size")
        .arg("huge")
        .arg("--cdp-url")
        .arg("http://localhost:1");

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("invalid window size"));
}

#[test]
fn test_screenshot_requires_url() {
    let mut cmd = Command::new(get_kestrel_bin());
    cmd.arg("open").arg("--screenshot").arg("shot.png");

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("--url"));
}

#[test]
fn test_discover_json_emits_an_array() {
    let mut cmd = Command::new(get_kestrel_bin());
    cmd.arg("discover").arg("--json");

    cmd.assert()
        .success()
        .stdout(predicate::str::starts_with("["));
}

#[test]
fn test_probe_fails_on_dead_port() {
    // Port 1 is reserved and virtually never bound.
    let mut cmd = Command::new(get_kestrel_bin());
    cmd.arg("probe").arg("--port").arg("1");

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("no debug endpoint responding"));
}
