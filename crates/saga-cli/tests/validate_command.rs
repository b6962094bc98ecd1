use std::fs;

use predicates::str::contains;
use tempfile::TempDir;

fn manifest_dir(content: &str) -> TempDir {
    let dir = TempDir::new().expect("create temp dir");
    fs::write(dir.path().join("saga.toml"), content).expect("write manifest");
    dir
}

#[test]
fn validate_lists_steps_and_compensations() {
    let dir = manifest_dir(
        r#"
[actions.reserve]
program = "reserve-hotel"

[actions.cancel]
program = "cancel-hotel"

[actions.confirm]
program = "confirm-hotel"

[saga]
name = "hotel"
timeout-ms = 60000

[[saga.steps]]
name = "reserve_hotel"
action = "reserve"
compensation = "cancel"
output-key = "ReserveHotelResult"

[[saga.steps]]
name = "confirm_hotel"
action = "confirm"
output-key = "ConfirmHotelResult"
"#,
    );

    assert_cmd::cargo::cargo_bin_cmd!("saga")
        .arg("validate")
        .arg(dir.path().join("saga.toml"))
        .assert()
        .success()
        .stdout(contains("Saga 'hotel' is valid: 2 step(s), timeout 60s"))
        .stdout(contains("0. reserve_hotel -> ReserveHotelResult (undo reserve_hotel via cancel)"))
        .stdout(contains("1. confirm_hotel -> ConfirmHotelResult (nothing to undo for confirm_hotel)"));
}

#[test]
fn validate_fails_on_undeclared_action() {
    let dir = manifest_dir(
        r#"
[actions.reserve]
program = "reserve-hotel"

[saga]
name = "hotel"

[[saga.steps]]
name = "reserve_hotel"
action = "reserve"
compensation = "cancel"
output-key = "ReserveHotelResult"
"#,
    );

    assert_cmd::cargo::cargo_bin_cmd!("saga")
        .arg("validate")
        .arg(dir.path().join("saga.toml"))
        .assert()
        .failure()
        .stderr(contains("error: saga definition rejected"))
        .stderr(contains(
            "caused by: step 'reserve_hotel' refers to unknown capability 'cancel'",
        ));
}

#[test]
fn validate_fails_on_duplicate_output_key() {
    let dir = manifest_dir(
        r#"
[actions.noop]
program = "true"

[saga]
name = "dupes"

[[saga.steps]]
name = "first"
action = "noop"
output-key = "Result"

[[saga.steps]]
name = "second"
action = "noop"
output-key = "Result"
"#,
    );

    assert_cmd::cargo::cargo_bin_cmd!("saga")
        .arg("validate")
        .arg(dir.path().join("saga.toml"))
        .assert()
        .failure()
        .stderr(contains("error: manifest error"))
        .stderr(contains("caused by: invalid saga definition"))
        .stderr(contains("'Result' is declared by both 'first' and 'second'"));
}

#[test]
fn validate_reports_parse_errors_with_path() {
    let dir = manifest_dir("[saga\nname = ");

    assert_cmd::cargo::cargo_bin_cmd!("saga")
        .arg("validate")
        .arg(dir.path().join("saga.toml"))
        .assert()
        .failure()
        .stderr(contains("failed to parse manifest at"));
}
