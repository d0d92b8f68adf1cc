use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::tempdir;

fn mhcevo() -> Command {
    Command::cargo_bin("mhcevo").unwrap()
}

#[test]
fn test_init_writes_config() {
    let temp = tempdir().unwrap();
    let path = temp.path().join("config.json");

    mhcevo()
        .arg("init")
        .arg("--output")
        .arg(&path)
        .arg("--hosts")
        .arg("30")
        .arg("--seed")
        .arg("5")
        .assert()
        .success()
        .stdout(predicate::str::contains("Population size: 30"))
        .stdout(predicate::str::contains("Configuration written to"));

    let json: serde_json::Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(json["host"]["population_size"], 30);
    assert_eq!(json["execution"]["seed"], 5);
}

#[test]
fn test_init_refuses_to_overwrite() {
    let temp = tempdir().unwrap();
    let path = temp.path().join("config.json");
    fs::write(&path, "{}").unwrap();

    mhcevo()
        .arg("init")
        .arg("--output")
        .arg(&path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));

    mhcevo()
        .arg("init")
        .arg("--output")
        .arg(&path)
        .arg("--force")
        .assert()
        .success();
}

#[test]
fn test_init_rejects_bad_alleles() {
    let temp = tempdir().unwrap();
    mhcevo()
        .arg("init")
        .arg("--output")
        .arg(temp.path().join("config.json"))
        .arg("--alleles")
        .arg("1")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid --alleles"));
}

#[test]
fn test_validate_accepts_init_output() {
    let temp = tempdir().unwrap();
    let path = temp.path().join("config.json");
    mhcevo()
        .arg("init")
        .arg("--output")
        .arg(&path)
        .assert()
        .success();

    mhcevo()
        .arg("validate")
        .arg("--config")
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("✓ Consistent"));
}

#[test]
fn test_validate_reports_inconsistency() {
    let temp = tempdir().unwrap();
    let path = temp.path().join("config.json");
    fs::write(
        &path,
        r#"{
            "execution": { "total_generations": 5 },
            "host": { "population_size": 10, "alleles": 16, "chromosome_length": 2 },
            "pathogen": { "population_size": 20, "species": 2, "antigen_length": 2 }
        }"#,
    )
    .unwrap();

    mhcevo()
        .arg("validate")
        .arg("--config")
        .arg(&path)
        .assert()
        .failure()
        .stdout(predicate::str::contains("Configuration inconsistent"));
}

#[test]
fn test_validate_missing_file() {
    mhcevo()
        .arg("validate")
        .arg("--config")
        .arg("/nonexistent/mhcevo.json")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to read configuration"));
}

#[test]
fn test_run_streams_summaries() {
    let temp = tempdir().unwrap();
    let path = temp.path().join("config.json");
    mhcevo()
        .arg("init")
        .arg("--output")
        .arg(&path)
        .arg("--hosts")
        .arg("20")
        .arg("--pathogens")
        .arg("20")
        .arg("--species")
        .arg("2")
        .arg("--seed")
        .arg("1")
        .assert()
        .success();

    let output = mhcevo()
        .arg("--threads")
        .arg("2")
        .arg("run")
        .arg("--config")
        .arg(&path)
        .arg("--generations")
        .arg("3")
        .output()
        .unwrap();
    assert!(output.status.success());

    let stdout = String::from_utf8(output.stdout).unwrap();
    let lines: Vec<serde_json::Value> = stdout
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();
    assert_eq!(lines.len(), 3);
    for (i, summary) in lines.iter().enumerate() {
        assert_eq!(summary["generation"], i as u64 + 1);
        assert_eq!(summary["host_count"], 20);
    }
}

#[test]
fn test_run_last_only_is_deterministic() {
    let temp = tempdir().unwrap();
    let path = temp.path().join("config.json");
    mhcevo()
        .arg("init")
        .arg("--output")
        .arg(&path)
        .arg("--hosts")
        .arg("16")
        .arg("--pathogens")
        .arg("16")
        .assert()
        .success();

    let run = || {
        mhcevo()
            .arg("run")
            .arg("--config")
            .arg(&path)
            .arg("--generations")
            .arg("4")
            .arg("--seed")
            .arg("99")
            .arg("--last-only")
            .output()
            .unwrap()
            .stdout
    };
    let first = run();
    assert_eq!(String::from_utf8_lossy(&first).lines().count(), 1);
    assert_eq!(first, run());
}
