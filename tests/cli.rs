use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn project(files: &[(&str, &str)]) -> TempDir {
    let temp_dir = TempDir::new().unwrap();
    for (name, contents) in files {
        let path = temp_dir.path().join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, contents).unwrap();
    }
    temp_dir
}

fn debtbomb(dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("debtbomb").unwrap();
    cmd.current_dir(dir);
    cmd
}

const EXPIRED: &str = "// @debtbomb(expire=2020-01-01, owner=alice, reason=legacy shim)\nfn shim() {}\n";
const FUTURE: &str = "# @debtbomb(expire=2999-01-01, owner=bob)\nx = 1\n";

#[test]
fn test_list_json() {
    let dir = project(&[("src/shim.rs", EXPIRED), ("tools/gen.py", FUTURE)]);

    let output = debtbomb(dir.path())
        .args(["list", ".", "-f", "json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let items: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let items = items.as_array().unwrap();
    assert_eq!(items.len(), 2);
    assert_eq!(items[0]["expire"], "2020-01-01");
    assert_eq!(items[0]["owner"], "alice");
    assert_eq!(items[0]["snippet"], "fn shim() {}");
    assert_eq!(items[1]["is_expired"], false);
}

#[test]
fn test_list_filters() {
    let dir = project(&[("src/shim.rs", EXPIRED), ("tools/gen.py", FUTURE)]);

    debtbomb(dir.path())
        .args(["list", "--owner", "BOB", "-f", "markdown"])
        .assert()
        .success()
        .stdout(predicate::str::contains("tools/gen.py"))
        .stdout(predicate::str::contains("src/shim.rs").not());

    debtbomb(dir.path())
        .args(["list", "--expired", "-f", "markdown"])
        .assert()
        .success()
        .stdout(predicate::str::contains("legacy shim"))
        .stdout(predicate::str::contains("tools/gen.py").not());
}

#[test]
fn test_check_fails_on_expired() {
    let dir = project(&[("src/shim.rs", EXPIRED)]);

    debtbomb(dir.path())
        .arg("check")
        .assert()
        .code(1)
        .stdout(predicate::str::contains("1 expired debt bomb(s)"));
}

#[test]
fn test_check_passes_without_expired() {
    let dir = project(&[("tools/gen.py", FUTURE), ("README.md", "nothing here\n")]);

    debtbomb(dir.path())
        .args(["check", "--json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"expired\": []"));
}

#[test]
fn test_report_json() {
    let dir = project(&[("src/shim.rs", EXPIRED), ("tools/gen.py", FUTURE)]);

    let output = debtbomb(dir.path())
        .args(["report", "-f", "json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["total_count"], 2);
    assert_eq!(report["by_urgency"]["expired"], 1);
    assert_eq!(report["by_urgency"]["more_than_90_days"], 1);
}

#[test]
fn test_notify_without_destinations_clears_stale_state() {
    let dir = project(&[
        ("src/lib.rs", "fn clean() {}\n"),
        (".debtbomb/jira-map.json", "{\"gone\": \"OPS-1\"}"),
    ]);

    debtbomb(dir.path())
        .args(["notify", "--expired"])
        .env_remove("JIRA_BASE_URL")
        .env_remove("JIRA_EMAIL")
        .env_remove("JIRA_API_TOKEN")
        .assert()
        .success()
        .stdout(predicate::str::contains("Closed: 1"));

    let state = fs::read_to_string(dir.path().join(".debtbomb/jira-map.json")).unwrap();
    let state: serde_json::Value = serde_json::from_str(&state).unwrap();
    assert_eq!(state, serde_json::json!({}));
}

#[test]
fn test_notify_rejects_corrupt_state() {
    let dir = project(&[(".debtbomb/jira-map.json", "not json")]);

    debtbomb(dir.path())
        .arg("notify")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Failed to parse ticket state"));
}

#[test]
fn test_missing_root_fails() {
    let dir = TempDir::new().unwrap();

    debtbomb(dir.path())
        .args(["list", "does-not-exist"])
        .assert()
        .failure();
}
