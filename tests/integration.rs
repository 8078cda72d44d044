use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

fn rtier_binary() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_rtier"))
}

/// 20 untagged CURRENT jobs ("Role 00".."Role 19"), a tagged course, a
/// legacy tool, and an inactive job.
fn fixture_records() -> String {
    let mut records = Vec::new();
    for i in 0..20 {
        let (company, location) = match i {
            16 => ("Shopify", "Lahore"),
            17 => ("Local Co", "Remote"),
            _ => ("Local Co", "Karachi"),
        };
        records.push(serde_json::json!({
            "id": format!("job-{:02}", i),
            "metadata": {
                "title": format!("Role {:02}", i),
                "type": "job",
                "created_at": 1_700_000_000 + i * 3600
            },
            "content": { "company": company, "location": location },
            "visibility": { "status": "active" }
        }));
    }
    records.push(serde_json::json!({
        "id": "course-pro",
        "metadata": { "title": "Advanced Rust", "type": "course" },
        "visibility": { "access_level": "pro", "status": "active" }
    }));
    records.push(serde_json::json!({
        "id": "tool-legacy",
        "title": "VS Code",
        "type": "tool",
        "company": "Microsoft",
        "location": "Desktop",
        "status": "active"
    }));
    records.push(serde_json::json!({
        "id": "job-closed",
        "title": "Closed Role",
        "type": "job",
        "status": "inactive"
    }));
    serde_json::to_string_pretty(&records).unwrap()
}

fn setup_test_env() -> (TempDir, PathBuf, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();

    let config_dir = root.join("config");
    fs::create_dir_all(&config_dir).unwrap();

    let config_content = format!(
        r#"[db]
path = "{}/data/rtier.sqlite"

[plans.free]
job_cap = 10
course_cap = 15
tool_cap = 15
max_tier = "free"

[plans.pro]
job_cap = 80
course_cap = 60
tool_cap = 60
max_tier = "pro"
"#,
        root.display()
    );
    let config_path = config_dir.join("rtier.toml");
    fs::write(&config_path, config_content).unwrap();

    let data_path = root.join("resources.json");
    fs::write(&data_path, fixture_records()).unwrap();

    (tmp, config_path, data_path)
}

fn run_rtier(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let binary = rtier_binary();
    let output = Command::new(&binary)
        .arg("--config")
        .arg(config_path.to_str().unwrap())
        .args(args)
        .env("RUST_LOG", "warn")
        .output()
        .unwrap_or_else(|e| panic!("Failed to run rtier binary at {:?}: {}", binary, e));

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    (stdout, stderr, output.status.success())
}

fn loaded_env() -> (TempDir, PathBuf) {
    let (tmp, config_path, data_path) = setup_test_env();
    let (_, stderr, ok) = run_rtier(&config_path, &["init"]);
    assert!(ok, "init failed: {}", stderr);
    let (stdout, stderr, ok) = run_rtier(&config_path, &["load", data_path.to_str().unwrap()]);
    assert!(ok, "load failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("upserted records: 23"));
    (tmp, config_path)
}

#[test]
fn test_init_idempotent() {
    let (_tmp, config_path, _) = setup_test_env();

    let (stdout, _, ok1) = run_rtier(&config_path, &["init"]);
    assert!(ok1, "First init failed");
    assert!(stdout.contains("initialized"));

    let (_, _, ok2) = run_rtier(&config_path, &["init"]);
    assert!(ok2, "Second init failed (not idempotent)");
}

#[test]
fn test_load_counts_shapes() {
    let (_tmp, config_path, data_path) = setup_test_env();
    run_rtier(&config_path, &["init"]);

    let (stdout, _, ok) = run_rtier(&config_path, &["load", data_path.to_str().unwrap(), "--dry-run"]);
    assert!(ok);
    assert!(stdout.contains("records found: 23"));
    assert!(stdout.contains("legacy: 2"));
    assert!(stdout.contains("current: 21"));
}

#[test]
fn test_migrate_then_rerun_is_noop() {
    let (_tmp, config_path) = loaded_env();

    let (stdout, stderr, ok) = run_rtier(&config_path, &["migrate"]);
    assert!(ok, "migrate failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("updated: 20"), "{}", stdout);
    assert!(stdout.contains("skipped: 3"));
    assert!(stdout.contains("total: 23"));

    let (stdout, _, ok) = run_rtier(&config_path, &["migrate"]);
    assert!(ok);
    assert!(stdout.contains("updated: 0"));
    assert!(stdout.contains("no updates needed"));
}

#[test]
fn test_migrate_dry_run_writes_nothing() {
    let (_tmp, config_path) = loaded_env();

    let (stdout, _, ok) = run_rtier(&config_path, &["migrate", "--dry-run"]);
    assert!(ok);
    assert!(stdout.contains("dry-run"));
    assert!(stdout.contains("updated: 20"));

    let (stats, _, _) = run_rtier(&config_path, &["stats", "--json"]);
    let v: serde_json::Value = serde_json::from_str(&stats).unwrap();
    assert_eq!(v["unassigned"], 20);
}

#[test]
fn test_stats_after_migration() {
    let (_tmp, config_path) = loaded_env();
    run_rtier(&config_path, &["migrate"]);

    let (stdout, _, ok) = run_rtier(&config_path, &["stats", "--json"]);
    assert!(ok);
    let v: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(v["total"], 23);
    assert_eq!(v["unassigned"], 0);
    assert_eq!(v["shapes"]["legacy"], 2);
    assert_eq!(v["statuses"]["inactive"], 1);
    assert_eq!(v["types"]["jobs"], 21);
    // 20 backfilled: ranks 16 and 17 pick up a quality signal, rank 19 is enterprise.
    assert_eq!(v["tiers"]["pro"], 3);
    assert_eq!(v["tiers"]["enterprise"], 1);
    assert_eq!(v["tiers"]["free"], 19);
}

#[test]
fn test_list_free_plan_caps_jobs() {
    let (_tmp, config_path) = loaded_env();

    let (stdout, stderr, ok) = run_rtier(&config_path, &["list", "--plan", "free", "--json"]);
    assert!(ok, "list failed: {}", stderr);
    let v: serde_json::Value = serde_json::from_str(&stdout).unwrap();

    let jobs = v["jobs"].as_array().unwrap();
    assert_eq!(jobs.len(), 10);
    assert_eq!(v["available"]["jobs"], 20);
    // Newest first.
    assert_eq!(jobs[0]["id"], "job-19");
    assert_eq!(jobs[9]["id"], "job-10");
    assert!(jobs.iter().all(|j| j["id"] != "job-closed"));
    assert_eq!(v["courses"].as_array().unwrap().len(), 1);
    assert_eq!(v["tools"].as_array().unwrap().len(), 1);
}

#[test]
fn test_list_unknown_plan_falls_back() {
    let (_tmp, config_path) = loaded_env();

    let (stdout, _, ok) = run_rtier(&config_path, &["list", "--plan", "platinum"]);
    assert!(ok);
    assert!(stdout.contains("unknown, using free"));
    assert!(stdout.contains("jobs: 10 of 20"));
}

#[test]
fn test_list_gate_hides_higher_tiers() {
    let (_tmp, config_path) = loaded_env();
    run_rtier(&config_path, &["migrate"]);

    let (stdout, _, ok) = run_rtier(&config_path, &["list", "--plan", "free", "--gate", "--json"]);
    assert!(ok);
    let v: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert!(v["courses"].as_array().unwrap().is_empty());
    assert_eq!(v["available"]["jobs"], 17);
}

#[test]
fn test_migrate_rejected_batch_reports_zero() {
    let (tmp, config_path) = loaded_env();
    let small = format!(
        "[db]\npath = \"{}/data/rtier.sqlite\"\nmax_batch_writes = 5\n",
        tmp.path().display()
    );
    fs::write(&config_path, small).unwrap();

    let (stdout, stderr, ok) = run_rtier(&config_path, &["migrate"]);
    assert!(!ok);
    assert!(stdout.contains("updated: 0"));
    assert!(stderr.contains("exceeds limit"), "{}", stderr);

    let (stats, _, _) = run_rtier(&config_path, &["stats", "--json"]);
    let v: serde_json::Value = serde_json::from_str(&stats).unwrap();
    assert_eq!(v["unassigned"], 20);
}

#[test]
fn test_strict_load_rejects_incomplete() {
    let (tmp, config_path, _) = setup_test_env();
    run_rtier(&config_path, &["init"]);
    let bad = tmp.path().join("bad.json");
    fs::write(&bad, r#"[{"id": "x", "type": "job"}]"#).unwrap();

    let (_, stderr, ok) = run_rtier(&config_path, &["load", bad.to_str().unwrap(), "--strict"]);
    assert!(!ok);
    assert!(stderr.contains("missing title"), "{}", stderr);
}
