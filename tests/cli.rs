use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

fn shelf_binary() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_shelf"))
}

fn setup_test_env() -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();

    let config_dir = root.join("config");
    fs::create_dir_all(&config_dir).unwrap();

    let config_content = format!(
        r#"data_dir = "{root}/data"

[db]
path = "{root}/internal/shelf.sqlite"

[search]
enabled = false
"#,
        root = root.display()
    );

    let config_path = config_dir.join("shelf.toml");
    fs::write(&config_path, config_content).unwrap();

    (tmp, config_path)
}

fn run_shelf(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let binary = shelf_binary();
    let output = Command::new(&binary)
        .arg("--config")
        .arg(config_path)
        .args(args)
        .output()
        .unwrap_or_else(|e| panic!("Failed to run shelf binary at {:?}: {}", binary, e));

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    (stdout, stderr, output.status.success())
}

#[test]
fn test_init_creates_database() {
    let (tmp, config_path) = setup_test_env();

    let (stdout, stderr, success) = run_shelf(&config_path, &["init"]);
    assert!(success, "init failed: {}", stderr);
    assert!(stdout.contains("Initialized database"));
    assert!(tmp.path().join("internal").join("shelf.sqlite").exists());
    assert!(tmp.path().join("data").is_dir());

    // Idempotent.
    let (_, stderr, success) = run_shelf(&config_path, &["init"]);
    assert!(success, "second init failed: {}", stderr);
}

#[test]
fn test_new_show_edit_delete() {
    let (tmp, config_path) = setup_test_env();
    run_shelf(&config_path, &["init"]);

    let (stdout, stderr, success) = run_shelf(
        &config_path,
        &["new", "note", "Meeting Notes", "--body", "Discuss roadmap", "--tag", "work"],
    );
    assert!(success, "new failed: {}", stderr);
    assert!(stdout.contains("Created #1"));
    let note = tmp.path().join("data").join("notes").join("1.md");
    assert!(note.exists());

    let (stdout, _, success) = run_shelf(&config_path, &["show", "1"]);
    assert!(success);
    assert!(stdout.contains("#1 [note] Meeting Notes"));
    assert!(stdout.contains("tags:    work"));
    assert!(stdout.contains("Discuss roadmap"));

    let (_, stderr, success) = run_shelf(&config_path, &["edit", "1", "--title", "Standup"]);
    assert!(success, "edit failed: {}", stderr);
    let (stdout, _, _) = run_shelf(&config_path, &["list"]);
    assert!(stdout.contains("Standup"));
    assert!(!stdout.contains("Meeting Notes"));

    let (_, stderr, success) = run_shelf(&config_path, &["delete", "1"]);
    assert!(success, "delete failed: {}", stderr);
    assert!(!note.exists());

    let (_, stderr, success) = run_shelf(&config_path, &["show", "1"]);
    assert!(!success);
    assert!(stderr.contains("not found"));
}

#[test]
fn test_bookmark_lands_in_its_own_directory() {
    let (tmp, config_path) = setup_test_env();

    let (_, stderr, success) = run_shelf(
        &config_path,
        &["new", "bookmark", "Rust", "--url", "https://www.rust-lang.org"],
    );
    assert!(success, "new bookmark failed: {}", stderr);
    assert!(tmp.path().join("data").join("bookmarks").join("1.md").exists());
}

#[test]
fn test_search_and_reindex_require_search() {
    let (_tmp, config_path) = setup_test_env();

    for command in ["reindex", "search"] {
        let mut args = vec![command];
        if command == "search" {
            args.push("roadmap");
        }
        let (stdout, _, success) = run_shelf(&config_path, &args);
        assert!(success);
        assert!(stdout.contains("Search must be enabled for this command."));
    }
}

#[test]
fn test_health_when_disabled() {
    let (_tmp, config_path) = setup_test_env();
    let (stdout, _, success) = run_shelf(&config_path, &["health"]);
    assert!(success);
    assert!(stdout.contains("search: disabled"));
}

#[test]
fn test_create_admin_rejects_short_password() {
    let (_tmp, config_path) = setup_test_env();

    let (_, stderr, success) = run_shelf(
        &config_path,
        &["create-admin", "root", "--password", "short"],
    );
    assert!(!success);
    assert!(stderr.contains("at least 8 characters"));

    let (stdout, stderr, success) = run_shelf(
        &config_path,
        &["create-admin", "root", "--password", "long enough"],
    );
    assert!(success, "create-admin failed: {}", stderr);
    assert!(stdout.contains("Created admin 'root'"));
}

#[test]
fn test_missing_config_fails() {
    let tmp = TempDir::new().unwrap();
    let (_, stderr, success) = run_shelf(&tmp.path().join("nope.toml"), &["list"]);
    assert!(!success);
    assert!(stderr.contains("Failed to read config file"));
}
