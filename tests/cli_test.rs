//! End-to-end tests of the `dexpoll` binary surface.

use std::io::Write;

use assert_cmd::Command;
use predicates::prelude::*;

fn dexpoll() -> Command {
    let mut cmd = Command::cargo_bin("dexpoll").expect("binary built");
    cmd.env_remove("DEXPOLL_USERNAME")
        .env_remove("DEXPOLL_PASSWORD")
        .env_remove("DEXPOLL_LOG")
        .env_remove("DEXPOLL_LOG_FORMAT");
    cmd
}

fn config_file(contents: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().expect("tempfile");
    file.write_all(contents.as_bytes()).expect("write config");
    file
}

#[test]
fn help_describes_the_tool() {
    dexpoll()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Dexcom Share polling client"));
}

#[test]
fn missing_credentials_fail_with_config_exit_code() {
    let config = config_file("update_secs = 300\n");
    dexpoll()
        .arg("fetch")
        .arg("--config")
        .arg(config.path())
        .assert()
        .code(2)
        .stderr(predicate::str::contains("username"));
}

#[test]
fn unknown_region_fails_with_config_exit_code() {
    let config = config_file("username = \"alice\"\npassword = \"s3cret\"\n");
    dexpoll()
        .arg("fetch")
        .arg("--config")
        .arg(config.path())
        .arg("--region")
        .arg("mars")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("region"));
}

#[test]
fn unreachable_server_reports_transport_error_and_fetch_exit_code() {
    let config = config_file("username = \"alice\"\npassword = \"s3cret\"\n");
    // Nothing listens on this port; retries burn ~3 s of backoff then report
    // the terminal transport error as JSON on stdout.
    dexpoll()
        .arg("fetch")
        .arg("--config")
        .arg(config.path())
        .arg("--server-url")
        .arg("127.0.0.1:59997")
        .assert()
        .code(3)
        .stdout(predicate::str::contains("\"statusCode\":-1"));
}
