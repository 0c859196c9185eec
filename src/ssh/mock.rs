// Copyright 2025 Lablup Inc. and Jeongkyu Shin
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Scripted in-memory device for exercising operations without hardware.
//!
//! [`ScriptedShell`] models the one piece of device state the maintenance
//! protocol depends on, the root mount mode, and records every call so tests
//! can assert exactly which commands were issued and in what order.

use async_trait::async_trait;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use super::session::{CommandOutput, RemoteShell};
use crate::error::DeviceError;
use crate::guard::{MOUNT_TABLE_ROOT, REMOUNT_RO, REMOUNT_RW};

/// One interaction with the scripted device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellCall {
    Run(String),
    Upload { local: PathBuf, remote: String },
    Exists(String),
    Close,
}

#[derive(Debug, Clone)]
struct Rule {
    prefix: String,
    output: CommandOutput,
}

#[derive(Debug, Default)]
struct DeviceState {
    writable: bool,
    files: HashSet<String>,
    closed: bool,
}

/// In-memory [`RemoteShell`] whose responses are scripted per command prefix.
///
/// Unscripted commands succeed with empty output. The remount and mount-table
/// commands are simulated from the tracked mount mode unless a rule overrides
/// them.
#[derive(Debug, Default)]
pub struct ScriptedShell {
    rules: Vec<Rule>,
    ignore_read_only_remount: bool,
    reject_uploads_to: HashSet<String>,
    state: Mutex<DeviceState>,
    calls: Mutex<Vec<ShellCall>>,
}

impl ScriptedShell {
    /// A device with a read-only root and no scripted failures.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make commands starting with `prefix` write `stderr`.
    pub fn fail(mut self, prefix: impl Into<String>, stderr: impl Into<String>) -> Self {
        self.rules.push(Rule {
            prefix: prefix.into(),
            output: CommandOutput::new("", stderr),
        });
        self
    }

    /// Make commands starting with `prefix` print `stdout`.
    pub fn respond(mut self, prefix: impl Into<String>, stdout: impl Into<String>) -> Self {
        self.rules.push(Rule {
            prefix: prefix.into(),
            output: CommandOutput::new(stdout, ""),
        });
        self
    }

    /// The read-only remount reports success but the root stays writable.
    pub fn ignoring_read_only_remount(mut self) -> Self {
        self.ignore_read_only_remount = true;
        self
    }

    /// Uploads to `remote` fail as if the path were not writable.
    pub fn rejecting_uploads_to(mut self, remote: impl Into<String>) -> Self {
        self.reject_uploads_to.insert(remote.into());
        self
    }

    /// Every call made so far.
    pub fn calls(&self) -> Vec<ShellCall> {
        self.calls
            .lock()
            .map(|calls| calls.clone())
            .unwrap_or_default()
    }

    /// Only the commands passed to `run`, in order.
    pub fn commands(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                ShellCall::Run(cmd) => Some(cmd),
                _ => None,
            })
            .collect()
    }

    /// Number of `run` calls whose command equals `command`.
    pub fn count(&self, command: &str) -> usize {
        self.commands().iter().filter(|c| *c == command).count()
    }

    /// Whether any upload was attempted.
    pub fn uploaded(&self) -> bool {
        self.calls()
            .iter()
            .any(|call| matches!(call, ShellCall::Upload { .. }))
    }

    pub fn is_writable(&self) -> bool {
        self.lock_state().writable
    }

    pub fn has_file(&self, remote: &str) -> bool {
        self.lock_state().files.contains(remote)
    }

    pub fn is_closed(&self) -> bool {
        self.lock_state().closed
    }

    fn record(&self, call: ShellCall) {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(call);
        }
    }

    fn lock_state(&self) -> std::sync::MutexGuard<'_, DeviceState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn scripted(&self, command: &str) -> Option<CommandOutput> {
        self.rules
            .iter()
            .find(|rule| command.starts_with(&rule.prefix))
            .map(|rule| rule.output.clone())
    }
}

#[async_trait]
impl RemoteShell for ScriptedShell {
    async fn run(&self, command: &str) -> Result<CommandOutput, DeviceError> {
        self.record(ShellCall::Run(command.to_string()));

        if self.lock_state().closed {
            return Err(DeviceError::execution(command, "session closed"));
        }

        if let Some(output) = self.scripted(command) {
            return Ok(output);
        }

        let mut state = self.lock_state();
        let output = match command {
            REMOUNT_RW => {
                state.writable = true;
                CommandOutput::default()
            }
            REMOUNT_RO => {
                if !self.ignore_read_only_remount {
                    state.writable = false;
                }
                CommandOutput::default()
            }
            MOUNT_TABLE_ROOT => {
                let opts = if state.writable { "rw" } else { "ro" };
                CommandOutput::new(
                    format!("/dev/mmcblk2p2 on / type ext4 ({opts},relatime,data=ordered)\n"),
                    "",
                )
            }
            _ => CommandOutput::default(),
        };
        Ok(output)
    }

    async fn upload(&self, local_path: &Path, remote_path: &str) -> Result<(), DeviceError> {
        self.record(ShellCall::Upload {
            local: local_path.to_path_buf(),
            remote: remote_path.to_string(),
        });

        if let Err(e) = tokio::fs::metadata(local_path).await {
            return Err(DeviceError::transfer(local_path, remote_path, e));
        }

        let mut state = self.lock_state();
        if self.reject_uploads_to.contains(remote_path) {
            return Err(DeviceError::transfer(
                local_path,
                remote_path,
                "permission denied",
            ));
        }
        if !state.writable {
            return Err(DeviceError::transfer(
                local_path,
                remote_path,
                "read-only file system",
            ));
        }
        state.files.insert(remote_path.to_string());
        Ok(())
    }

    async fn exists(&self, remote_path: &str) -> bool {
        self.record(ShellCall::Exists(remote_path.to_string()));
        self.lock_state().files.contains(remote_path)
    }

    fn is_alive(&self) -> bool {
        !self.lock_state().closed
    }

    async fn close(&mut self) {
        self.record(ShellCall::Close);
        self.lock_state().closed = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_tracks_mount_mode() {
        let shell = ScriptedShell::new();
        assert!(!shell.is_writable());

        shell.run(REMOUNT_RW).await.unwrap();
        assert!(shell.is_writable());
        let table = shell.run(MOUNT_TABLE_ROOT).await.unwrap();
        assert!(table.stdout.contains("(rw,"));

        shell.run(REMOUNT_RO).await.unwrap();
        let table = shell.run(MOUNT_TABLE_ROOT).await.unwrap();
        assert!(table.stdout.contains("(ro,"));
    }

    #[tokio::test]
    async fn test_rules_override_simulation() {
        let shell = ScriptedShell::new().fail(REMOUNT_RW, "mount: permission denied\n");
        let output = shell.run(REMOUNT_RW).await.unwrap();
        assert!(output.failed());
        assert!(!shell.is_writable());
    }

    #[tokio::test]
    async fn test_closed_shell_rejects_commands() {
        let mut shell = ScriptedShell::new();
        assert!(shell.is_alive());
        assert!(!shell.exists("/usr/share/remarkable/suspended.png").await);

        shell.close().await;
        assert!(shell.is_closed());
        assert!(!shell.is_alive());
        assert!(shell.run("date").await.is_err());
    }

    #[tokio::test]
    async fn test_upload_requires_readable_source_and_writable_root() {
        let dir = tempfile::tempdir().unwrap();
        let local = dir.path().join("a.ttf");
        tokio::fs::write(&local, b"font").await.unwrap();

        let shell = ScriptedShell::new();
        assert!(shell.upload(&local, "/usr/share/a.ttf").await.is_err());

        shell.run(REMOUNT_RW).await.unwrap();
        shell.upload(&local, "/usr/share/a.ttf").await.unwrap();
        assert!(shell.exists("/usr/share/a.ttf").await);

        let missing = dir.path().join("missing.ttf");
        assert!(matches!(
            shell.upload(&missing, "/usr/share/b.ttf").await,
            Err(DeviceError::Transfer { .. })
        ));
    }
}
