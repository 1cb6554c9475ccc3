use assert_cmd::Command;
use predicates::prelude::*;

#[test]
fn test_cli_help() {
    let mut cmd = Command::cargo_bin("mirai-sync").unwrap();
    cmd.arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("migration pipeline for Miraimusic"));
}

#[test]
fn test_cli_migrate_help() {
    let mut cmd = Command::cargo_bin("mirai-sync").unwrap();
    cmd.arg("migrate").arg("--help").assert().success().stdout(predicate::str::contains("dry-run"));
}

#[test]
fn test_sync_requires_database_url() {
    let mut cmd = Command::cargo_bin("mirai-sync").unwrap();
    cmd.env_remove("DATABASE_URL")
        .env_remove("MONGODB_URI")
        .arg("sync")
        .assert()
        .failure()
        .stderr(predicate::str::contains("DATABASE_URL"));
}

#[test]
fn test_migrate_requires_mongodb_uri() {
    let mut cmd = Command::cargo_bin("mirai-sync").unwrap();
    cmd.env("DATABASE_URL", "postgres://localhost/miraimusic")
        .env_remove("MONGODB_URI")
        .arg("migrate")
        .arg("--dry-run")
        .assert()
        .failure()
        .stderr(predicate::str::contains("MONGODB_URI"));
}

#[test]
fn test_backfill_progress_requires_database_url() {
    let mut cmd = Command::cargo_bin("mirai-sync").unwrap();
    cmd.env_remove("DATABASE_URL")
        .arg("backfill-progress")
        .assert()
        .failure()
        .stderr(predicate::str::contains("DATABASE_URL"));
}
