//! Integration tests for the synchronizer binary
//!
//! These tests run the built binary with a cleared environment so nothing
//! from the host (proxies, a real cluster) leaks into the run.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

/// Get the path to the synchronizer binary
fn synchronizer_binary() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // Remove test executable name
    path.pop(); // Remove deps directory

    path.push("synchronizer");

    if cfg!(windows) {
        path.set_extension("exe");
    }

    path
}

/// Run the synchronizer with exactly the given environment
fn run_synchronizer(args: &[&str], env: &[(&str, String)]) -> std::process::Output {
    let mut command = Command::new(synchronizer_binary());
    command.env_clear().args(args);
    for (key, value) in env {
        command.env(key, value);
    }
    command.output().expect("Failed to execute synchronizer")
}

/// Pod filesystem with a namespace file and a service account token
struct PodFixture {
    dir: TempDir,
}

impl PodFixture {
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("namespace"), "payments\n").unwrap();
        fs::write(dir.path().join("sa-token"), "sa-token\n").unwrap();
        Self { dir }
    }

    fn path(&self, name: &str) -> String {
        self.dir.path().join(name).display().to_string()
    }

    fn root(&self) -> &Path {
        self.dir.path()
    }

    /// Environment pointing at an API server nobody listens on
    fn env(&self, secrets: &str) -> Vec<(&'static str, String)> {
        vec![
            ("VAULT_TOKEN_PATH", self.path("vault-token")),
            ("VAULT_SECRETS", secrets.to_string()),
            ("POD_NAMESPACE_PATH", self.path("namespace")),
            ("VAULT_ADDR", "http://127.0.0.1:9".to_string()),
            ("KUBE_API_URL", "http://127.0.0.1:9".to_string()),
            ("KUBE_TOKEN_PATH", self.path("sa-token")),
            ("KUBE_CA_CERT", self.path("ca.crt")),
            ("KUBE_CLIENT_TIMEOUT", "5".to_string()),
        ]
    }
}

fn stderr(output: &std::process::Output) -> String {
    String::from_utf8_lossy(&output.stderr).to_string()
}

#[test]
fn test_synchronizer_version() {
    let output = run_synchronizer(&["--version"], &[]);

    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("synchronizer"));
}

#[test]
fn test_synchronizer_help() {
    let output = run_synchronizer(&["--help"], &[]);

    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Usage:"));
    assert!(stdout.contains("VAULT_SECRETS"));
    assert!(stdout.contains("VAULT_TOKEN_PATH"));
}

#[test]
fn test_missing_token_path_fails() {
    let pod = PodFixture::new();
    let env: Vec<_> = pod
        .env("secret/data/db")
        .into_iter()
        .filter(|(key, _)| *key != "VAULT_TOKEN_PATH")
        .collect();

    let output = run_synchronizer(&[], &env);

    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("failed to get config: missing VAULT_TOKEN_PATH"));
}

#[test]
fn test_empty_secret_list_fails() {
    let pod = PodFixture::new();

    let output = run_synchronizer(&[], &pod.env(" , "));

    assert!(!output.status.success());
    assert!(stderr(&output).contains("no secrets to synchronize"));
}

#[test]
fn test_invalid_vault_address_fails() {
    let pod = PodFixture::new();
    let mut env = pod.env("secret/data/db");
    env.push(("VAULT_ADDR", "vault.internal:8200".to_string()));

    let output = run_synchronizer(&[], &env);

    assert!(!output.status.success());
    assert!(stderr(&output).contains("VAULT_ADDR"));
}

#[test]
fn test_unreadable_namespace_fails() {
    let pod = PodFixture::new();
    fs::remove_file(pod.root().join("namespace")).unwrap();

    let output = run_synchronizer(&[], &pod.env("secret/data/db"));

    assert!(!output.status.success());
    assert!(stderr(&output).contains("failed to get config: could not read namespace"));
}

#[test]
fn test_degraded_mode_reports_missing_secret() {
    let pod = PodFixture::new();

    // No vault token and no reachable API server: the lookup of the only
    // requested secret fails, which counts as missing.
    let output = run_synchronizer(&[], &pod.env("secret/data/db:app-db"));

    assert_eq!(output.status.code(), Some(1));
    let stderr = stderr(&output);
    assert!(stderr.contains("secret app-db does not exist"));
    assert!(!stderr.contains("failed to"));
}

#[test]
fn test_duration_timeouts_are_accepted() {
    let pod = PodFixture::new();
    let mut env = pod.env("secret/data/db:app-db");
    env.push(("VAULT_CLIENT_TIMEOUT", "30s".to_string()));
    env.push(("KUBE_CLIENT_TIMEOUT", "5s".to_string()));

    let output = run_synchronizer(&[], &env);

    // Parsing succeeds and the run reaches the existence check.
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("secret app-db does not exist"));
}

#[test]
fn test_invalid_timeout_is_rejected() {
    let pod = PodFixture::new();
    let mut env = pod.env("secret/data/db");
    env.push(("VAULT_CLIENT_TIMEOUT", "soon".to_string()));

    let output = run_synchronizer(&[], &env);

    assert_eq!(output.status.code(), Some(2));
    assert!(stderr(&output).contains("invalid duration"));
}

#[test]
fn test_flags_override_environment() {
    let pod = PodFixture::new();
    let namespace = pod.path("missing-namespace");

    let output = run_synchronizer(
        &["--namespace-path", &namespace],
        &pod.env("secret/data/db"),
    );

    assert!(!output.status.success());
    assert!(stderr(&output).contains("missing-namespace"));
}
