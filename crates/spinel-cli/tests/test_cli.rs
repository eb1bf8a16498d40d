use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};

/// Write a small kinship-style dataset into `dir/data`.
fn write_dataset(dir: &Path) -> PathBuf {
    let data = dir.join("data");
    fs::create_dir_all(&data).unwrap();
    fs::write(
        data.join("train.txt"),
        "arthur\tfather\tbart\n\
         arthur\tfather\tcleo\n\
         bea\tmother\tbart\n\
         bea\tmother\tcleo\n\
         bart\tsibling\tcleo\n\
         cleo\tsibling\tbart\n",
    )
    .unwrap();
    fs::write(data.join("valid.txt"), "arthur\tfather\tbart\n").unwrap();
    fs::write(data.join("test.txt"), "bea\tmother\tcleo\n").unwrap();
    data
}

fn write_config(dir: &Path, data: &Path) -> PathBuf {
    let config = dir.join("run.yaml");
    fs::write(
        &config,
        format!(
            "dataset: {}\n\
             model: distmult\n\
             embedding_dim: 8\n\
             epochs: 2\n\
             batch_size: 8\n\
             lr: 0.05\n\
             eval_interval: 2\n\
             out_dir: {}\n",
            data.display(),
            dir.join("runs").display()
        ),
    )
    .unwrap();
    config
}

#[test]
fn test_train_writes_log_and_checkpoint() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let data = write_dataset(dir.path());
    let config = write_config(dir.path(), &data);

    let mut cmd = Command::cargo_bin("spinel")?;
    cmd.arg("train").arg("--config").arg(&config);
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("dev_evaluation"))
        .stdout(predicate::str::contains("test_evaluation"))
        .stdout(predicate::str::contains("Mean reciprocal rank:"));

    let run_dir = dir.path().join("runs").join("data_distmult");
    let log = fs::read_to_string(run_dir.join("log.txt"))?;
    assert!(log.contains("Hits @10:"));
    assert!(log.contains("epoch 0: loss ="));
    assert!(run_dir.join("best.ckpt").exists());

    Ok(())
}

#[test]
fn test_unknown_model_fails_fast() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let data = write_dataset(dir.path());
    let config = write_config(dir.path(), &data);

    let mut cmd = Command::cargo_bin("spinel")?;
    cmd.arg("train")
        .arg("--config")
        .arg(&config)
        .arg("--model")
        .arg("gcn_complex");
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("unknown model type"))
        .stderr(predicate::str::contains("gcn_complex"));

    Ok(())
}

#[test]
fn test_unknown_device_fails_fast() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let data = write_dataset(dir.path());
    let config = write_config(dir.path(), &data);

    let mut cmd = Command::cargo_bin("spinel")?;
    cmd.arg("train")
        .arg("--config")
        .arg(&config)
        .arg("--device")
        .arg("cuda");
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("unknown device"));

    Ok(())
}

#[test]
fn test_train_then_evaluate_checkpoint() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let data = write_dataset(dir.path());
    let config = write_config(dir.path(), &data);

    Command::cargo_bin("spinel")?
        .arg("train")
        .arg("--config")
        .arg(&config)
        .assert()
        .success();

    let checkpoint = dir
        .path()
        .join("runs")
        .join("data_distmult")
        .join("best.ckpt");
    assert!(checkpoint.exists());

    let mut cmd = Command::cargo_bin("spinel")?;
    cmd.arg("evaluate")
        .arg("--config")
        .arg(&config)
        .arg("--checkpoint")
        .arg(&checkpoint)
        .arg("--split")
        .arg("valid");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("dev_evaluation"))
        .stdout(predicate::str::contains("Mean reciprocal rank:"));

    Ok(())
}

#[test]
fn test_missing_dataset_reports_path() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let config = dir.path().join("run.yaml");
    fs::write(&config, "dataset: /nonexistent/kinship\n")?;

    let mut cmd = Command::cargo_bin("spinel")?;
    cmd.arg("train").arg("--config").arg(&config);
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("/nonexistent/kinship"));

    Ok(())
}
