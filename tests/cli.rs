use std::io::Write;
use std::process::{Command, Output};

use tempfile::NamedTempFile;

fn source_file(text: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(text.as_bytes()).unwrap();
    file
}

fn strata(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_strata"))
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .unwrap()
}

#[test]
fn parse_prints_generic_form() {
    let file = source_file("%c = arith.constant 7 : i32\n");
    let output = strata(&["parse", file.path().to_str().unwrap()]);
    assert!(output.status.success());
    assert_eq!(
        String::from_utf8_lossy(&output.stdout),
        "%0 = \"arith.constant\"() {value = 7 : i32} : () -> i32\n"
    );
}

#[test]
fn check_reports_diagnostics_with_positions() {
    let file = source_file("\"test.use\"(%x) : (i32) -> ()\n");
    let path = file.path().to_str().unwrap();

    let output = strata(&["check", path]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("operation being parsed with an unregistered dialect"));

    let output = strata(&["check", "--allow-unknown-dialects", path]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains(&format!("{path}:1:12: error: use of undeclared SSA value name")));
}

#[test]
fn config_file_sets_parser_options() {
    let file = source_file("\"test.op\"() : () -> ()\n");
    let config = source_file(r#"{ "allow_unknown_dialects": true }"#);
    let output = strata(&[
        "check",
        "--config",
        config.path().to_str().unwrap(),
        file.path().to_str().unwrap(),
    ]);
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).ends_with(": ok\n"));
}

#[test]
fn missing_file_fails() {
    let output = strata(&["check", "/nonexistent/input.ir"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).starts_with("cannot read /nonexistent/input.ir"));
}
