//! CLI integration tests for onpoints admin commands.
//!
//! Each test uses an isolated temp directory for the database, ensuring tests
//! can run in parallel safely.

#![allow(deprecated)] // Command::cargo_bin deprecation only affects custom build dirs

use std::path::Path;

use assert_cmd::Command;
use assert_fs::TempDir;
use onpoints::store::{SqliteStore, Store};
use predicates::prelude::*;
use serde_json::Value;

struct TestContext {
    temp_dir: TempDir,
}

impl TestContext {
    fn new() -> Self {
        Self {
            temp_dir: TempDir::new().expect("failed to create temp dir"),
        }
    }

    fn data_dir(&self) -> &Path {
        self.temp_dir.path()
    }

    fn data_dir_str(&self) -> String {
        self.data_dir().to_string_lossy().to_string()
    }

    fn cmd(&self) -> Command {
        let mut cmd = Command::cargo_bin("onpoints").expect("failed to find binary");
        cmd.env("NO_COLOR", "1");
        cmd
    }

    fn init(&self) -> assert_cmd::assert::Assert {
        self.cmd()
            .args(["admin", "init", "--data-dir", &self.data_dir_str()])
            .assert()
    }

    fn admin(&self, args: &[&str]) -> assert_cmd::assert::Assert {
        let data_dir = self.data_dir_str();
        let mut full: Vec<&str> = vec!["admin"];
        full.extend_from_slice(args);
        full.extend_from_slice(&["--data-dir", &data_dir]);
        self.cmd().args(full).assert()
    }

    fn store(&self) -> SqliteStore {
        SqliteStore::new(self.data_dir().join("onpoints.db")).expect("open database")
    }

    fn tenants_json(&self) -> Vec<Value> {
        let output = self
            .cmd()
            .args([
                "admin",
                "tenant",
                "list",
                "--json",
                "--data-dir",
                &self.data_dir_str(),
            ])
            .output()
            .expect("run tenant list");
        assert!(output.status.success());
        serde_json::from_slice(&output.stdout).expect("parse tenant list")
    }
}

#[test]
fn test_init_writes_admin_token_once() {
    let ctx = TestContext::new();
    ctx.init()
        .success()
        .stdout(predicate::str::contains("onpoints_"));

    let token_file = ctx.data_dir().join(".admin_token");
    let token = std::fs::read_to_string(&token_file).unwrap();
    assert!(token.starts_with("onpoints_"));

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mode = std::fs::metadata(&token_file).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    ctx.init()
        .failure()
        .stderr(predicate::str::contains("already initialized"));
}

#[test]
fn test_commands_require_init() {
    let ctx = TestContext::new();
    ctx.admin(&["tenant", "list"])
        .failure()
        .stderr(predicate::str::contains("onpoints admin init"));
}

#[test]
fn test_tenant_add_and_list() {
    let ctx = TestContext::new();
    ctx.init().success();

    ctx.admin(&[
        "tenant",
        "add",
        "--name",
        "Acme Corp",
        "--slug",
        "acme",
        "--custom-domain",
        "Support.Acme.io",
        "--custom-domain-verified",
    ])
    .success()
    .stdout(predicate::str::contains("Created tenant 'acme'"));

    ctx.admin(&["tenant", "add", "--name", "Globex", "--slug", "globex"])
        .success();

    let tenants = ctx.tenants_json();
    assert_eq!(tenants.len(), 2);
    let acme = tenants.iter().find(|t| t["slug"] == "acme").unwrap();
    assert_eq!(acme["name"], "Acme Corp");
    assert_eq!(acme["custom_domain"], "support.acme.io");
    assert_eq!(acme["custom_domain_verified"], true);
    assert_eq!(acme["sync_enabled"], false);

    let found = ctx
        .store()
        .find_tenant_by_verified_domain("support.acme.io")
        .unwrap()
        .unwrap();
    assert_eq!(found.slug, "acme");
}

#[test]
fn test_tenant_add_rejects_bad_input() {
    let ctx = TestContext::new();
    ctx.init().success();

    ctx.admin(&["tenant", "add", "--name", "Acme", "--slug", "Acme Corp"])
        .failure()
        .stderr(predicate::str::contains("Slug"));

    ctx.admin(&["tenant", "add", "--name", "Acme", "--slug", "acme"])
        .success();
    ctx.admin(&["tenant", "add", "--name", "Acme 2", "--slug", "acme"])
        .failure()
        .stderr(predicate::str::contains("already exists"));

    ctx.admin(&[
        "tenant",
        "add",
        "--name",
        "Bad",
        "--slug",
        "bad",
        "--custom-domain",
        "not_a_domain",
    ])
    .failure();
}

#[test]
fn test_user_add_with_token() {
    let ctx = TestContext::new();
    ctx.init().success();
    ctx.admin(&["tenant", "add", "--name", "Acme", "--slug", "acme"])
        .success();

    ctx.admin(&[
        "user",
        "add",
        "--tenant",
        "acme",
        "--email",
        "boss@acme.com",
        "--name",
        "The Boss",
        "--role",
        "tenant_admin",
        "--create-token",
    ])
    .success()
    .stdout(predicate::str::contains("Created tenant_admin 'boss@acme.com'"))
    .stdout(predicate::str::contains("onpoints_"));

    let store = ctx.store();
    let tenant = store.get_tenant_by_slug("acme").unwrap().unwrap();
    let user = store
        .get_user_by_email(&tenant.id, "BOSS@acme.com")
        .unwrap()
        .unwrap();
    assert_eq!(user.name, "The Boss");

    ctx.admin(&[
        "user",
        "add",
        "--tenant",
        "acme",
        "--email",
        "boss@acme.com",
        "--name",
        "Again",
    ])
    .failure()
    .stderr(predicate::str::contains("already exists"));
}

#[test]
fn test_user_add_validation() {
    let ctx = TestContext::new();
    ctx.init().success();
    ctx.admin(&["tenant", "add", "--name", "Acme", "--slug", "acme"])
        .success();

    ctx.admin(&[
        "user", "add", "--tenant", "nobody", "--email", "a@b.com", "--name", "A",
    ])
    .failure()
    .stderr(predicate::str::contains("not found"));

    ctx.admin(&[
        "user", "add", "--tenant", "acme", "--email", "a@b.com", "--name", "A", "--role",
        "superuser",
    ])
    .failure()
    .stderr(predicate::str::contains("unknown role"));
}

#[test]
fn test_agent_test_reports_missing_config() {
    let ctx = TestContext::new();
    let config = ctx.data_dir().join("agent.toml");

    ctx.cmd()
        .args(["agent", "test", "--config"])
        .arg(&config)
        .assert()
        .failure()
        .stderr(predicate::str::contains("agent.toml"));

    std::fs::write(&config, "[directory]\n[platform]\n").unwrap();
    ctx.cmd()
        .args(["agent", "test", "--config"])
        .arg(&config)
        .assert()
        .failure()
        .stderr(predicate::str::contains("directory.bind_dn is required"));
}
