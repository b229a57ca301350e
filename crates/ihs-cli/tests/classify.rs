use assert_cmd::cargo::cargo_bin_cmd;
use serde_json::Value;
use std::{error::Error, path::PathBuf};

fn run_json(args: &[&str]) -> Result<Value, Box<dyn Error>> {
    let mut cmd = cargo_bin_cmd!("ihs");
    cmd.args(args);
    let output = cmd.assert().success().get_output().stdout.clone();
    Ok(serde_json::from_slice(&output)?)
}

#[test]
fn classify_uses_default_threshold() -> Result<(), Box<dyn Error>> {
    let json = run_json(&["classify", "--baseline", "-0.5", "--drug", "-4"])?;
    assert_eq!(json["delta"].as_f64(), Some(-3.5));
    assert_eq!(json["response"], "responsive");

    let json = run_json(&["classify", "--baseline", "-0.5", "--drug", "-1.5"])?;
    assert_eq!(json["response"], "non-responsive");
    Ok(())
}

#[test]
fn classify_threshold_is_strict() -> Result<(), Box<dyn Error>> {
    let json = run_json(&[
        "classify",
        "--baseline",
        "0",
        "--drug",
        "-2",
        "--threshold",
        "-2",
    ])?;
    assert_eq!(json["response"], "non-responsive");
    Ok(())
}

#[test]
fn ttest_matches_reference() -> Result<(), Box<dyn Error>> {
    let data = workspace_root().join("test_data");
    let json = run_json(&[
        "ttest",
        "--a",
        data.join("ttest_a.txt").to_str().expect("utf8 path"),
        "--b",
        data.join("ttest_b.txt").to_str().expect("utf8 path"),
    ])?;
    assert_eq!(json["df"], 4);
    assert!((json["t"].as_f64().unwrap() + 4.242640687).abs() < 1e-6);
    assert!((json["p_value"].as_f64().unwrap() - 0.0132356).abs() < 1e-6);
    assert_eq!(json["a"]["mean"].as_f64(), Some(3.0));
    assert_eq!(json["b"]["n"], 5);
    Ok(())
}

fn workspace_root() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .parent()
        .and_then(|p| p.parent())
        .expect("workspace root")
        .to_path_buf()
}
