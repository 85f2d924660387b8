use assert_cmd::Command;
use predicates::str::contains;

#[test]
fn checkmate_help_works() {
    Command::cargo_bin("checkmate")
        .expect("binary")
        .arg("--help")
        .assert()
        .success()
        .stdout(contains("todo.txt"));
}

#[test]
fn subcommand_help_works() {
    let subcommands = [
        "add", "list", "edit", "complete", "reopen", "rm", "contexts", "projects", "sort",
    ];

    for cmd in subcommands {
        Command::cargo_bin("checkmate")
            .expect("binary")
            .arg(cmd)
            .arg("--help")
            .assert()
            .success();
    }
}

#[test]
fn missing_subcommand_is_a_usage_error() {
    Command::cargo_bin("checkmate")
        .expect("binary")
        .assert()
        .failure()
        .stderr(contains("Usage"));
}
