//! Shared fixtures for driving the git-cloner binary

use assert_cmd::Command;
use assert_fs::prelude::*;
use assert_fs::TempDir;
use serde_json::json;
use std::path::Path;

/// Isolated root and config file for one test run
pub struct TestEnvironment {
    pub temp_dir: TempDir,
}

impl TestEnvironment {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        temp_dir
            .child("config.yml")
            .write_str("github:\n  api_url: \"http://127.0.0.1:9\"\n  request_timeout: 1\n")
            .expect("Failed to write config");
        Self { temp_dir }
    }

    pub fn root(&self) -> std::path::PathBuf {
        self.temp_dir.path().join("repos")
    }

    /// Command with the config and root pinned to this environment
    pub fn command(&self) -> Command {
        let mut cmd = Command::cargo_bin("git-cloner").expect("binary should build");
        cmd.env_remove("REPOS_BASE_DIR")
            .env_remove("GITHUB_TOKEN")
            .env_remove("RUST_LOG")
            .arg("--config")
            .arg(self.temp_dir.path().join("config.yml"))
            .arg("--base-dir")
            .arg(self.root());
        cmd
    }

    /// Write raw index content under the root
    pub fn write_index(&self, content: &str) {
        std::fs::create_dir_all(self.root()).expect("Failed to create root");
        std::fs::write(self.root().join("repos.jsonl"), content).expect("Failed to write index");
    }

    pub fn read_index(&self) -> String {
        std::fs::read_to_string(self.root().join("repos.jsonl")).expect("Failed to read index")
    }
}

/// One serialized index line for `example.com/acme/<repo>` at `local_path`
pub fn index_line(repo: &str, local_path: &Path) -> String {
    json!({
        "url": format!("https://example.com/acme/{repo}.git"),
        "local_path": local_path,
        "host": "example.com",
        "org": "acme",
        "repo": repo,
        "branch": "main",
        "last_hash": "0123456789abcdef0123456789abcdef01234567",
        "last_pull": "2024-01-01T00:00:00.000000Z",
    })
    .to_string()
}
