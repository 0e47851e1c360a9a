use assert_cmd::Command;
use predicates::prelude::*;

fn cagnotte(data_dir: &std::path::Path) -> Command {
    let mut cmd = Command::cargo_bin("cagnotte").unwrap();
    cmd.env("CAGNOTTE_DATA_DIR", data_dir);
    cmd
}

#[test]
fn test_init_demo_and_reports() {
    let dir = tempfile::tempdir().unwrap();

    cagnotte(dir.path())
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("Initialized cagnotte database"));

    cagnotte(dir.path())
        .arg("demo")
        .assert()
        .success()
        .stdout(predicate::str::contains("Loaded demo data"));

    cagnotte(dir.path())
        .args(["savings", "monthly", "--months", "3"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Monthly savings"));

    cagnotte(dir.path())
        .args(["goal", "suggest", "Japon", "--json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"suggested_goal\""));
}

#[test]
fn test_demo_refuses_non_empty_ledger() {
    let dir = tempfile::tempdir().unwrap();
    cagnotte(dir.path()).arg("demo").assert().success();
    cagnotte(dir.path())
        .arg("demo")
        .assert()
        .failure()
        .stderr(predicate::str::contains("already has accounts"));
}

#[test]
fn test_allocation_roundtrip_via_cli() {
    let dir = tempfile::tempdir().unwrap();
    cagnotte(dir.path()).arg("init").assert().success();
    cagnotte(dir.path())
        .args(["project", "add", "Japon", "--budget", "6000"])
        .assert()
        .success();

    cagnotte(dir.path())
        .args(["alloc", "set", "Japon", "--month", "2024-04", "--amount", "500"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Allocated"));

    cagnotte(dir.path())
        .args(["alloc", "list", "--month", "2024-04", "--json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("500"));

    cagnotte(dir.path())
        .args(["alloc", "set", "Japon", "--month", "2024-04", "--amount", "0"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Removed allocation"));
}

#[test]
fn test_savings_month_range() {
    let dir = tempfile::tempdir().unwrap();
    cagnotte(dir.path()).arg("init").assert().success();

    cagnotte(dir.path())
        .args(["savings", "monthly", "--from", "2024-01", "--to", "2024-03", "--json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"month\": \"2024-01\""))
        .stdout(predicate::str::contains("\"month\": \"2024-03\""));

    cagnotte(dir.path())
        .args(["savings", "monthly", "--from", "2024-03", "--to", "2024-01"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("before"));
}

#[test]
fn test_manual_transaction_roundtrip_via_cli() {
    let dir = tempfile::tempdir().unwrap();
    cagnotte(dir.path()).arg("init").assert().success();
    cagnotte(dir.path())
        .args(["project", "add", "Japon", "--budget", "6000"])
        .assert()
        .success();

    cagnotte(dir.path())
        .args([
            "manual", "add", "--amount", "150", "--label", "Vente vélo",
            "--project", "Japon", "--date", "2024-04-20",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("Recorded"));

    cagnotte(dir.path())
        .args(["manual", "list", "--month", "2024-04", "--json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Vente vélo"));

    cagnotte(dir.path())
        .args(["manual", "remove", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Removed manual transaction"));
}

#[test]
fn test_invalid_month_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    cagnotte(dir.path()).arg("init").assert().success();
    cagnotte(dir.path())
        .args(["alloc", "list", "--month", "2024-13"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid month"));
}

#[test]
fn test_unknown_project_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    cagnotte(dir.path()).arg("init").assert().success();
    cagnotte(dir.path())
        .args(["goal", "history", "Nope"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown project"));
}
