use assert_cmd::Command;
use assert_fs::{prelude::FileWriteStr, NamedTempFile};
use predicates::prelude::{predicate, PredicateBooleanExt};

fn check(instance: &str, logging_level: &str) -> assert_cmd::assert::Assert {
    let file = NamedTempFile::new("instance.cnf").unwrap();
    file.write_str(instance).unwrap();
    let mut cmd = Command::cargo_bin("satbridge").unwrap();
    cmd.arg("check")
        .arg("-f")
        .arg(file.path())
        .arg("--logging-level")
        .arg(logging_level);
    let assert = cmd.assert();
    file.close().unwrap();
    assert
}

#[test]
fn test_check_ok() {
    check("c foo\np cnf 3 2\n1 -2 0\n2 3 0\n", "info")
        .success()
        .stdout(predicate::str::contains(
            "the formula has 3 variable(s) and 2 clause(s)",
        ));
}

#[test]
fn test_check_clause_count_warning() {
    check("p cnf 3 3\n1 -2 0\n2 3 0\n", "warn")
        .success()
        .stdout(
            predicate::str::contains("the preamble announces 3 clause(s), but 2 were found")
                .and(predicate::str::contains("WARN")),
        );
}

#[test]
fn test_check_out_of_range() {
    check("p cnf 2 1\n1 -3 0\n", "error")
        .failure()
        .code(1)
        .stdout(predicate::str::contains("undeclared variable"));
}

#[test]
fn test_check_missing_file() {
    let mut cmd = Command::cargo_bin("satbridge").unwrap();
    cmd.arg("check")
        .arg("-f")
        .arg("/path/to/a/missing/file.cnf")
        .arg("--logging-level")
        .arg("off");
    cmd.assert().failure().code(1);
}
