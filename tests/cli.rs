use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

fn tv5_binary() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // remove test binary name
    path.pop(); // remove deps/
    path.push("tv5");
    path
}

fn setup_test_env() -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();

    let config_dir = root.join("config");
    fs::create_dir_all(&config_dir).unwrap();

    fs::write(
        root.join("corpus.json"),
        r#"{
  "texts": [
    {"cts_urn": "urn:cts:latinLit:phi0917.phi001", "author": "lucan",
     "title": "bellum civile", "language": "latin", "is_prose": false,
     "year": 65, "path": "/la/lucan.bellum_civile.tess"},
    {"cts_urn": "urn:cts:latinLit:phi0474.phi037", "author": "cicero",
     "title": "de oratore", "language": "latin", "is_prose": true,
     "year": -55, "path": "/la/cicero.de_oratore.tess"}
  ],
  "units": [
    {"cts_urn": "urn:cts:latinLit:phi0917.phi001:1.1",
     "text": "/la/lucan.bellum_civile.tess", "unit_type": "lines"},
    {"cts_urn": "urn:cts:latinLit:phi0917.phi001:1.2",
     "text": "/la/lucan.bellum_civile.tess", "unit_type": "lines"}
  ],
  "stopword_lists": [{"name": "latin", "stopwords": ["et", "in"]}]
}"#,
    )
    .unwrap();

    fs::write(
        root.join("bad_units.json"),
        r#"{
  "units": [
    {"cts_urn": "urn:cts:latinLit:phi0690.phi003:1.1",
     "text": "/la/lucan.bellum_civile.tess", "unit_type": "lines"}
  ]
}"#,
    )
    .unwrap();

    let config_content = format!(
        r#"[db]
path = "{}/data/tv5.sqlite"

[server]
bind = "127.0.0.1:7341"
"#,
        root.display()
    );

    let config_path = config_dir.join("tv5.toml");
    fs::write(&config_path, config_content).unwrap();

    (tmp, config_path)
}

fn run_tv5(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let binary = tv5_binary();
    let output = Command::new(&binary)
        .arg("--config")
        .arg(config_path.to_str().unwrap())
        .args(args)
        .output()
        .unwrap_or_else(|e| panic!("Failed to run tv5 binary at {:?}: {}", binary, e));

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let success = output.status.success();
    (stdout, stderr, success)
}

#[test]
fn test_init_creates_database() {
    let (tmp, config) = setup_test_env();
    let (stdout, _, success) = run_tv5(&config, &["init"]);
    assert!(success);
    assert!(stdout.contains("initialized"));
    assert!(tmp.path().join("data/tv5.sqlite").exists());
}

#[test]
fn test_init_idempotent() {
    let (_tmp, config) = setup_test_env();
    assert!(run_tv5(&config, &["init"]).2);
    assert!(run_tv5(&config, &["init"]).2);
}

#[test]
fn test_load_and_reload() {
    let (tmp, config) = setup_test_env();
    let corpus = tmp.path().join("corpus.json");
    let corpus = corpus.to_str().unwrap();

    let (stdout, stderr, success) = run_tv5(&config, &["load", corpus]);
    assert!(success, "load failed: {}", stderr);
    assert!(stdout.contains("2 inserted, 0 already present"));
    assert!(stdout.contains("units:          2"));

    let (stdout, _, success) = run_tv5(&config, &["load", corpus]);
    assert!(success);
    assert!(stdout.contains("0 inserted, 2 already present"));
}

#[test]
fn test_load_rejects_foreign_units() {
    let (tmp, config) = setup_test_env();
    let corpus = tmp.path().join("corpus.json");
    assert!(run_tv5(&config, &["load", corpus.to_str().unwrap()]).2);

    let bad = tmp.path().join("bad_units.json");
    let (_, stderr, success) = run_tv5(&config, &["load", bad.to_str().unwrap()]);
    assert!(!success);
    assert!(stderr.contains("does not belong"));
}

#[test]
fn test_get_text() {
    let (tmp, config) = setup_test_env();
    let corpus = tmp.path().join("corpus.json");
    assert!(run_tv5(&config, &["load", corpus.to_str().unwrap()]).2);

    let (stdout, _, success) = run_tv5(&config, &["get", "urn:cts:latinLit:phi0917.phi001"]);
    assert!(success);
    let text: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(text["author"], "lucan");
    assert_eq!(text["year"], 65);
}

#[test]
fn test_get_too_specific_prints_work() {
    let (tmp, config) = setup_test_env();
    let corpus = tmp.path().join("corpus.json");
    assert!(run_tv5(&config, &["load", corpus.to_str().unwrap()]).2);

    let (stdout, _, success) =
        run_tv5(&config, &["get", "urn:cts:latinLit:phi0917.phi001:1.1"]);
    assert!(success);
    assert!(stdout.contains("tv5 get urn:cts:latinLit:phi0917.phi001"));
}

#[test]
fn test_get_missing_text() {
    let (tmp, config) = setup_test_env();
    let corpus = tmp.path().join("corpus.json");
    assert!(run_tv5(&config, &["load", corpus.to_str().unwrap()]).2);

    let (_, stderr, success) = run_tv5(&config, &["get", "urn:cts:latinLit:phi9999.phi001"]);
    assert!(!success);
    assert!(stderr.contains("no text"));
}

#[test]
fn test_stats() {
    let (tmp, config) = setup_test_env();
    let corpus = tmp.path().join("corpus.json");
    assert!(run_tv5(&config, &["load", corpus.to_str().unwrap()]).2);

    let (stdout, _, success) = run_tv5(&config, &["stats"]);
    assert!(success);
    assert!(stdout.contains("Texts:       2"));
    assert!(stdout.contains("Units:       2"));
    assert!(stdout.contains("lines"));
}

#[test]
fn test_missing_config_fails() {
    let tmp = TempDir::new().unwrap();
    let (_, stderr, success) = run_tv5(&tmp.path().join("nope.toml"), &["init"]);
    assert!(!success);
    assert!(stderr.contains("Failed to read config file"));
}
