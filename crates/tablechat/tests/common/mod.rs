//! Common test utilities for tablechat integration tests
#![allow(dead_code)]

use assert_cmd::Command;
use std::path::PathBuf;
use tempfile::{tempdir, TempDir};

const ENV_OVERRIDES: &[&str] = &[
    "OPENROUTER_API_KEY",
    "OPENAI_API_KEY",
    "AIRTABLE_API_KEY",
    "AIRTABLE_BASE_ID",
    "TABLECHAT_MODEL",
    "TABLECHAT_PORT",
];

/// Isolated home directory for one test
pub struct TestEnv {
    pub temp_dir: TempDir,
    pub data_dir: PathBuf,
}

impl TestEnv {
    pub fn new() -> anyhow::Result<Self> {
        let temp_dir = tempdir()?;
        let data_dir = temp_dir.path().join(".tablechat");

        Ok(Self { temp_dir, data_dir })
    }

    pub fn config_file(&self) -> PathBuf {
        self.data_dir.join("config.json")
    }

    /// Command with HOME pointed at the temp dir and no credential env vars
    pub fn command(&self) -> Command {
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_tablechat"));
        cmd.env("HOME", self.temp_dir.path());
        for key in ENV_OVERRIDES {
            cmd.env_remove(key);
        }
        cmd
    }

    pub fn write_config(&self, json: &str) -> anyhow::Result<()> {
        std::fs::create_dir_all(&self.data_dir)?;
        std::fs::write(self.config_file(), json)?;
        Ok(())
    }

    /// Config with model and Airtable credentials that point nowhere useful
    pub fn create_config(&self) -> anyhow::Result<()> {
        let store = self.temp_dir.path().join("state");
        self.write_config(&format!(
            r#"{{
  "providers": {{ "openrouter": {{ "api_key": "sk-or-test" }} }},
  "agent": {{ "defaults": {{ "model": "test/model" }} }},
  "airtable": {{ "api_key": "pat-test", "base_id": "appTEST" }},
  "store": {{ "dir": "{}" }}
}}"#,
            store.display()
        ))
    }
}

impl Default for TestEnv {
    fn default() -> Self {
        Self::new().expect("Failed to create test environment")
    }
}
