//! End-to-end tests of the `kiln` binary.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

fn kiln(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("kiln").unwrap();
    cmd.current_dir(dir.path()).env("NO_COLOR", "1").env_remove("RUST_LOG");
    cmd
}

fn project() -> TempDir {
    let temp = TempDir::new().unwrap();
    let src = temp.path().join("src");
    fs::create_dir_all(&src).unwrap();
    fs::write(src.join("card.css"), ".card { margin: 0 }").unwrap();
    fs::write(src.join("main.mjs"), "export const main = () => 1;").unwrap();
    temp
}

#[test]
fn test_help() {
    Command::cargo_bin("kiln")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("build"))
        .stdout(predicate::str::contains("cache"));
}

#[test]
fn test_build_reports_summary() {
    let temp = project();

    kiln(&temp)
        .args(["build", "src"])
        .assert()
        .success()
        .stderr(predicate::str::contains("Compiled 2 files into build"));

    assert!(temp.path().join("build/card.css").exists());
    assert!(temp.path().join("build/card.css.js").exists());
    assert!(temp.path().join("build/main.mjs").exists());
}

#[test]
fn test_piped_output_is_not_colored() {
    let temp = project();

    Command::cargo_bin("kiln")
        .unwrap()
        .current_dir(temp.path())
        .env_remove("NO_COLOR")
        .env_remove("FORCE_COLOR")
        .args(["build", "src"])
        .assert()
        .success()
        .stderr(predicate::str::contains("Compiled 2 files"))
        .stderr(predicate::str::contains("\u{1b}[").not());
}

#[test]
fn test_force_color_colors_piped_output() {
    let temp = project();

    Command::cargo_bin("kiln")
        .unwrap()
        .current_dir(temp.path())
        .env_remove("NO_COLOR")
        .env("FORCE_COLOR", "1")
        .args(["build", "src"])
        .assert()
        .success()
        .stderr(predicate::str::contains("\u{1b}["));
}

#[test]
fn test_quiet_build_prints_nothing() {
    let temp = project();

    kiln(&temp)
        .args(["--quiet", "build", "src"])
        .assert()
        .success()
        .stderr(predicate::str::is_empty());
}

#[test]
fn test_config_file_sets_out_dir() {
    let temp = project();
    fs::write(temp.path().join("kiln.config.json"), r#"{ "outDir": "dist" }"#).unwrap();

    kiln(&temp).args(["build", "src"]).assert().success();

    assert!(temp.path().join("dist/card.css").exists());
}

#[test]
fn test_continue_on_error_reports_failed_file() {
    let temp = project();
    fs::write(temp.path().join("src/broken.js"), "let = ;").unwrap();

    kiln(&temp)
        .args(["build", "src", "--continue-on-error"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("ERROR: Could not compile"))
        .stderr(predicate::str::contains("broken.js"))
        .stderr(predicate::str::contains("1 of 3 files could not be compiled"));

    assert!(temp.path().join("build/main.mjs").exists());
}

#[test]
fn test_failure_without_continue_on_error() {
    let temp = project();
    fs::write(temp.path().join("src/broken.js"), "let = ;").unwrap();

    kiln(&temp)
        .args(["build", "src"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("broken.js"))
        .stderr(predicate::str::contains("ERROR: Could not compile").not());
}

#[test]
fn test_missing_path() {
    let temp = TempDir::new().unwrap();

    kiln(&temp)
        .args(["build", "does-not-exist"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("File not found"));
}

#[test]
fn test_cache_stats_and_clear() {
    let temp = project();

    kiln(&temp).args(["build", "src"]).assert().success();

    kiln(&temp)
        .args(["cache", "stats"])
        .assert()
        .success()
        .stdout(predicate::str::contains("css: 1 entries"))
        .stdout(predicate::str::contains("js-transform: 1 entries"));

    kiln(&temp)
        .args(["cache", "clear"])
        .assert()
        .success()
        .stderr(predicate::str::contains("Removed 2 cache entries"));

    kiln(&temp)
        .args(["cache", "stats"])
        .assert()
        .success()
        .stdout(predicate::str::contains("css: 0 entries"));
}

#[test]
fn test_cache_dir_override() {
    let temp = project();

    kiln(&temp)
        .args(["build", "src", "--cache-dir", "tmp-cache"])
        .assert()
        .success();

    assert!(temp.path().join("tmp-cache/css").is_dir());
    assert!(!temp.path().join(".kiln-cache").exists());
}
