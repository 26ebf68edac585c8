mod setup;

use predicates::boolean::PredicateBooleanExt;
use predicates::str::contains;
use setup::{DEFAULT_TIMEOUT, make_cli};

#[test]
fn test_help_lists_subcommands() {
    let mut cmd = make_cli();

    cmd.timeout(DEFAULT_TIMEOUT)
        .arg("--help")
        .assert()
        .success()
        .stdout(
            contains("find")
                .and(contains("insert"))
                .and(contains("upsert"))
                .and(contains("remove")),
        );
}

#[test]
/// Without credentials the connection can't be built.
fn test_missing_credentials() {
    let mut cmd = make_cli();

    cmd.timeout(DEFAULT_TIMEOUT)
        .args(["--spreadsheet", "Contacts", "headers"])
        .assert()
        .failure()
        .stderr(contains("ERROR:").and(contains("GOOGLE_USER")));
}

#[test]
fn test_missing_password() {
    let mut cmd = make_cli();

    cmd.timeout(DEFAULT_TIMEOUT)
        .env("GOOGLE_USER", "ann@example.com")
        .args(["--spreadsheet", "Contacts", "headers"])
        .assert()
        .failure()
        .stderr(contains("GOOGLE_PASSWORD"));
}

#[test]
fn test_remove_requires_filter_or_all() {
    let mut cmd = make_cli();

    cmd.timeout(DEFAULT_TIMEOUT)
        .args(["-s", "Contacts", "remove"])
        .assert()
        .failure()
        .stderr(contains("--all"));
}

#[test]
fn test_field_syntax_is_checked() {
    let mut cmd = make_cli();

    cmd.timeout(DEFAULT_TIMEOUT)
        .args(["-s", "Contacts", "insert", "name"])
        .assert()
        .failure()
        .stderr(contains("expected `field=value`"));
}

#[test]
fn test_query_conflicts_with_filters() {
    let mut cmd = make_cli();

    cmd.timeout(DEFAULT_TIMEOUT)
        .args(["-s", "Contacts", "find", "--query", "age > 3", "name=Ann"])
        .assert()
        .failure()
        .stderr(contains("cannot be used with"));
}

#[test]
fn test_upsert_requires_key() {
    let mut cmd = make_cli();

    cmd.timeout(DEFAULT_TIMEOUT)
        .args(["-s", "Contacts", "upsert", "name=Ann"])
        .assert()
        .failure()
        .stderr(contains("--key"));
}
