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

//! Device session: one authenticated SSH connection and the primitives the
//! maintenance operations are written against.
//!
//! Everything above this module talks to [`RemoteShell`], so operations can
//! be exercised against [`super::mock::ScriptedShell`] without a device.

use async_trait::async_trait;
use std::path::Path;
use std::time::Duration;

use super::tokio_client::{AuthMethod, Client, ServerCheckMethod};
use crate::error::DeviceError;
use crate::lifecycle::ConnectionTarget;

/// Login used on the device. The firmware only provisions `root`.
pub const DEVICE_USER: &str = "root";

/// Captured output of one remote command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_status: Option<u32>,
}

impl CommandOutput {
    pub fn new(stdout: impl Into<String>, stderr: impl Into<String>) -> Self {
        Self {
            stdout: stdout.into(),
            stderr: stderr.into(),
            exit_status: None,
        }
    }

    /// Whether the command failed.
    ///
    /// Device shells report both diagnostics and errors on stderr and do not
    /// set reliable exit codes, so any stderr text counts as failure and the
    /// exit status is ignored.
    pub fn failed(&self) -> bool {
        !self.stderr.is_empty()
    }

    /// Convert into stdout, or an execution error carrying stderr.
    pub fn into_result(self, command: &str) -> Result<String, DeviceError> {
        if self.failed() {
            Err(DeviceError::execution(command, self.stderr))
        } else {
            Ok(self.stdout)
        }
    }
}

/// Command execution and file transfer against a single device.
#[async_trait]
pub trait RemoteShell: Send + Sync {
    /// Run a command and capture its output.
    ///
    /// Transport failures are folded into `Err(DeviceError::Execution)`; a
    /// command that ran but wrote to stderr is returned as `Ok` and must be
    /// judged by the caller with [`CommandOutput::failed`].
    async fn run(&self, command: &str) -> Result<CommandOutput, DeviceError>;

    /// Copy a local file to `remote_path`, replacing any existing file.
    async fn upload(&self, local_path: &Path, remote_path: &str) -> Result<(), DeviceError>;

    /// Whether `remote_path` exists. Transport errors are reported as `false`.
    async fn exists(&self, remote_path: &str) -> bool;

    /// Whether the underlying channel still looks usable.
    fn is_alive(&self) -> bool {
        true
    }

    /// Release the channel. Calling it more than once is harmless.
    async fn close(&mut self);
}

/// A live SSH session to one device.
#[derive(Debug)]
pub struct DeviceSession {
    client: Option<Client>,
    host: String,
}

impl DeviceSession {
    /// Authenticate as `root` against `target`.
    pub async fn open(
        target: &ConnectionTarget,
        server_check: ServerCheckMethod,
        connect_timeout: Option<Duration>,
    ) -> Result<Self, DeviceError> {
        tracing::info!("Connecting to {} ({})", target.host(), target.kind());
        let client = Client::connect(
            target.host(),
            target.port(),
            DEVICE_USER,
            AuthMethod::with_password(target.credential()),
            server_check,
            connect_timeout,
        )
        .await
        .map_err(|e| {
            tracing::error!("SSH connection to {} failed: {}", target.host(), e);
            if e.is_auth_rejected() {
                DeviceError::auth_rejected(target.host(), e)
            } else {
                DeviceError::connectivity(target.host(), e)
            }
        })?;

        tracing::info!(
            "Connected to {} as {}",
            client.get_connection_address(),
            client.get_connection_username()
        );
        Ok(Self {
            client: Some(client),
            host: target.host().to_string(),
        })
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    fn client(&self) -> Result<&Client, DeviceError> {
        self.client
            .as_ref()
            .ok_or_else(|| DeviceError::connectivity(&self.host, "session already closed"))
    }
}

#[async_trait]
impl RemoteShell for DeviceSession {
    async fn run(&self, command: &str) -> Result<CommandOutput, DeviceError> {
        let client = self
            .client()
            .map_err(|e| DeviceError::execution(command, e.to_string()))?;
        tracing::debug!("Executing on {}: {}", self.host, command);

        match client.execute(command).await {
            Ok(result) => Ok(CommandOutput {
                stdout: result.stdout,
                stderr: result.stderr,
                exit_status: result.exit_status,
            }),
            Err(e) => {
                tracing::error!("Executing '{}' failed: {}", command, e);
                Err(DeviceError::execution(command, e.to_string()))
            }
        }
    }

    async fn upload(&self, local_path: &Path, remote_path: &str) -> Result<(), DeviceError> {
        let client = self
            .client()
            .map_err(|e| DeviceError::transfer(local_path, remote_path, e))?;

        client
            .upload_file(local_path, remote_path)
            .await
            .map_err(|e| DeviceError::transfer(local_path, remote_path, e))?;

        tracing::info!("Uploaded {:?} -> {}", local_path, remote_path);
        Ok(())
    }

    async fn exists(&self, remote_path: &str) -> bool {
        let Ok(client) = self.client() else {
            return false;
        };
        match client.file_exists(remote_path).await {
            Ok(exists) => exists,
            Err(e) => {
                tracing::debug!("Stat of {} failed, treating as absent: {}", remote_path, e);
                false
            }
        }
    }

    fn is_alive(&self) -> bool {
        self.client.as_ref().is_some_and(|c| !c.is_closed())
    }

    async fn close(&mut self) {
        if let Some(client) = self.client.take() {
            if let Err(e) = client.disconnect().await {
                tracing::debug!("Disconnect from {} reported: {}", self.host, e);
            }
            tracing::info!("Closed session to {}", self.host);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stderr_means_failure_regardless_of_status() {
        let output = CommandOutput {
            stdout: String::new(),
            stderr: "mount: / is busy\n".to_string(),
            exit_status: Some(0),
        };
        assert!(output.failed());

        let output = CommandOutput {
            stdout: "done\n".to_string(),
            stderr: String::new(),
            exit_status: Some(1),
        };
        assert!(!output.failed());
    }

    #[test]
    fn test_into_result() {
        let ok = CommandOutput::new("Sat Jun  1 12:00:00 UTC 2024\n", "");
        assert_eq!(
            ok.into_result("date").unwrap(),
            "Sat Jun  1 12:00:00 UTC 2024\n"
        );

        let err = CommandOutput::new("", "date: invalid date\n")
            .into_result("date -s \"x\"")
            .unwrap_err();
        assert_eq!(
            err,
            DeviceError::execution("date -s \"x\"", "date: invalid date\n")
        );
    }

    #[tokio::test]
    async fn test_closed_session_is_safe() {
        let mut session = DeviceSession {
            client: None,
            host: "10.11.99.1".to_string(),
        };
        assert!(!session.is_alive());
        assert!(!session.exists("/etc/hostname").await);
        assert!(matches!(
            session.run("true").await,
            Err(DeviceError::Execution { .. })
        ));

        // Closing twice is a no-op.
        session.close().await;
        session.close().await;
    }
}
