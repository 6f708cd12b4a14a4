// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Script runner with content-addressed replay suppression.
//!
//! A script executes at most once per agent, keyed by the sha256 of its
//! content alone: re-uploading identical content under a new script id is
//! still suppressed. Executed hashes are persisted as a flat JSON map so
//! suppression survives reconnects and restarts.

use chrono::Utc;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::io::Write;
use std::os::unix::fs::PermissionsExt;
use std::path::PathBuf;
use tokio::process::Command;
use tokio::sync::Mutex;
use tracing::debug;

use vigil_proto::ScriptResult;

const STATE_FILE_NAME: &str = ".vigil-scripts.json";

#[derive(Debug, thiserror::Error)]
pub enum ExecutorError {
    #[error("hash mismatch: expected {expected}, got {actual}")]
    HashMismatch { expected: String, actual: String },

    #[error("script io: {0}")]
    Io(#[from] std::io::Error),

    #[error("replay log: {0}")]
    State(String),
}

pub struct ScriptExecutor {
    state_file: PathBuf,
    executed: Mutex<HashMap<String, bool>>,
}

impl ScriptExecutor {
    /// Executor with the replay log at `$HOME/.vigil-scripts.json`, falling
    /// back to the system temp directory when no home is available.
    pub fn new() -> Result<Self, ExecutorError> {
        let home = std::env::var_os("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(std::env::temp_dir);
        Self::with_state_file(home.join(STATE_FILE_NAME))
    }

    /// Executor with an explicit replay-log path.
    pub fn with_state_file(state_file: PathBuf) -> Result<Self, ExecutorError> {
        let executed = load_state(&state_file)?;
        Ok(Self {
            state_file,
            executed: Mutex::new(executed),
        })
    }

    /// Whether this content hash has already run here.
    pub async fn has_executed(&self, sha256_hash: &str) -> bool {
        self.executed
            .lock()
            .await
            .get(sha256_hash)
            .copied()
            .unwrap_or(false)
    }

    /// Verify, run and record one script. The hash is recorded (and the
    /// replay log flushed) after any successful invocation, including a
    /// non-zero exit; it is not recorded when verification or the
    /// invocation itself fails.
    pub async fn execute(
        &self,
        script_id: &str,
        content: &str,
        expected_hash: &str,
    ) -> Result<ScriptResult, ExecutorError> {
        let actual = hex::encode(Sha256::digest(content.as_bytes()));
        if actual != expected_hash {
            return Err(ExecutorError::HashMismatch {
                expected: expected_hash.to_string(),
                actual,
            });
        }

        let mut file = tempfile::Builder::new()
            .prefix("vigil-script-")
            .suffix(".sh")
            .tempfile()?;
        file.write_all(content.as_bytes())?;
        file.as_file()
            .set_permissions(std::fs::Permissions::from_mode(0o700))?;

        // Close the handle before handing the path to the interpreter; the
        // file itself is removed when `path` drops.
        let path = file.into_temp_path();

        let executed_at = Utc::now().timestamp();
        let output = Command::new("/bin/sh").arg(path.as_os_str()).output().await?;
        let exit_code = output.status.code().unwrap_or(-1);

        {
            let mut executed = self.executed.lock().await;
            executed.insert(expected_hash.to_string(), true);
            self.save_state(&executed)?;
        }

        let _ = path.close();
        debug!(script_id, exit_code, "Script run complete");

        Ok(ScriptResult {
            script_id: script_id.to_string(),
            sha256_hash: expected_hash.to_string(),
            exit_code,
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            executed_at,
        })
    }

    /// Full-file replace with owner-only permissions.
    fn save_state(&self, executed: &HashMap<String, bool>) -> Result<(), ExecutorError> {
        let data = serde_json::to_vec(executed).map_err(|e| ExecutorError::State(e.to_string()))?;
        std::fs::write(&self.state_file, data)?;
        std::fs::set_permissions(&self.state_file, std::fs::Permissions::from_mode(0o600))?;
        Ok(())
    }
}

fn load_state(path: &PathBuf) -> Result<HashMap<String, bool>, ExecutorError> {
    match std::fs::read(path) {
        Ok(data) => serde_json::from_slice(&data).map_err(|e| ExecutorError::State(e.to_string())),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(HashMap::new()),
        Err(e) => Err(ExecutorError::Io(e)),
    }
}
