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

//! Read-only/read-write bracket around every mutation of the device root.
//!
//! ```text
//! ReadOnly --acquire--> Writable --release--> ReadOnly
//!                           \--release fails--> Unknown
//! ```
//!
//! [`run_guarded`] is the only way operations obtain write access. The work
//! future is not polled until the remount to read-write succeeded, and the
//! remount to read-only plus its verification run exactly once afterwards,
//! whatever the work returned.

use std::fmt;
use std::future::Future;

use crate::error::DeviceError;
use crate::ssh::RemoteShell;

pub const REMOUNT_RW: &str = "mount -o remount,rw /";
pub const REMOUNT_RO: &str = "mount -o remount,ro /";
pub const MOUNT_TABLE_ROOT: &str = "mount | grep ' / '";

/// Substring the mount table must show for a read-only root.
pub const READ_ONLY_MARKER: &str = "ro,";

/// Mode of the device root filesystem as last observed by the guard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FsMode {
    ReadOnly,
    Writable,
    /// Release was attempted but could not be confirmed. The device needs a
    /// manual check.
    Unknown,
}

impl fmt::Display for FsMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ReadOnly => f.write_str("read-only"),
            Self::Writable => f.write_str("read-write"),
            Self::Unknown => f.write_str("unknown"),
        }
    }
}

/// Remount the root read-write. No retry.
pub async fn acquire<S: RemoteShell + ?Sized>(shell: &S) -> Result<(), DeviceError> {
    tracing::info!("Switching root filesystem to read-write");
    let output = shell.run(REMOUNT_RW).await?;
    if output.failed() {
        tracing::error!("Switching to read-write failed: {}", output.stderr.trim());
        return Err(DeviceError::execution(REMOUNT_RW, output.stderr));
    }
    Ok(())
}

/// Remount the root read-only and confirm it from the live mount table.
///
/// The mount table is queried exactly once per call and is the only source
/// of truth: a remount that printed nothing while the table still shows a
/// writable root is a failure, and so is a table without the read-only marker
/// for any other reason.
pub async fn release<S: RemoteShell + ?Sized>(shell: &S) -> Result<(), DeviceError> {
    tracing::info!("Switching root filesystem back to read-only");
    let remount_error = match shell.run(REMOUNT_RO).await {
        Ok(output) if output.failed() => Some(output.stderr),
        Ok(_) => None,
        Err(e) => Some(e.to_string()),
    };
    if let Some(ref stderr) = remount_error {
        tracing::warn!("Read-only remount reported: {}", stderr.trim());
    }

    let table = match shell.run(MOUNT_TABLE_ROOT).await {
        Ok(output) => output.stdout,
        Err(e) => {
            tracing::error!("Could not read mount table: {}", e);
            String::new()
        }
    };

    if root_is_read_only(&table) {
        tracing::info!("Root filesystem confirmed read-only");
        return Ok(());
    }

    let message = match remount_error {
        Some(stderr) => format!(
            "root filesystem is not read-only after remount ({})",
            stderr.trim()
        ),
        None => format!(
            "remount reported success but mount table shows: {}",
            table.trim()
        ),
    };
    tracing::error!("{}", message);
    Err(DeviceError::verification(message))
}

/// Whether a `mount | grep ' / '` capture shows the root mounted read-only.
///
/// Requires the read-only marker and, when the option list is parenthesised,
/// a literal `ro` option so `errors=remount-ro,` alone does not count.
pub fn root_is_read_only(mount_table: &str) -> bool {
    mount_table.lines().any(|line| {
        line.contains(READ_ONLY_MARKER)
            && mount_options(line).is_none_or(|opts| opts.split(',').any(|opt| opt == "ro"))
    })
}

fn mount_options(line: &str) -> Option<&str> {
    let start = line.rfind('(')?;
    let end = line[start..].find(')')? + start;
    Some(&line[start + 1..end])
}

/// Outcome of a bracketed mutation.
#[derive(Debug)]
pub struct Guarded<T> {
    /// Result of the work, or of `acquire` if it never ran.
    pub result: Result<T, DeviceError>,
    /// Mode after the bracket closed.
    pub mode: FsMode,
    /// Set when release could not be confirmed. Never replaces `result`.
    pub release_error: Option<DeviceError>,
}

impl<T> Guarded<T> {
    pub fn is_success(&self) -> bool {
        self.result.is_ok() && self.release_error.is_none()
    }
}

/// Run `work` with the root writable.
///
/// If `acquire` fails, `work` is dropped without being polled and `release`
/// is skipped. Otherwise `release` runs once after `work` completes, whether
/// it succeeded or not.
pub async fn run_guarded<S, F, T>(shell: &S, work: F) -> Guarded<T>
where
    S: RemoteShell + ?Sized,
    F: Future<Output = Result<T, DeviceError>>,
{
    if let Err(e) = acquire(shell).await {
        return Guarded {
            result: Err(e),
            mode: FsMode::ReadOnly,
            release_error: None,
        };
    }

    let result = work.await;
    if let Err(ref e) = result {
        tracing::warn!("Mutation failed while writable ({}): {}", e.kind(), e);
    }

    match release(shell).await {
        Ok(()) => Guarded {
            result,
            mode: FsMode::ReadOnly,
            release_error: None,
        },
        Err(e) => {
            tracing::warn!("Device left in unknown filesystem mode, inspect it manually");
            Guarded {
                result,
                mode: FsMode::Unknown,
                release_error: Some(e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ssh::mock::{ScriptedShell, ShellCall};

    #[test]
    fn test_root_is_read_only() {
        assert!(root_is_read_only(
            "/dev/mmcblk2p2 on / type ext4 (ro,relatime,data=ordered)\n"
        ));
        assert!(!root_is_read_only(
            "/dev/mmcblk2p2 on / type ext4 (rw,relatime,data=ordered)\n"
        ));
        assert!(!root_is_read_only(
            "/dev/sda1 on / type ext4 (rw,errors=remount-ro,relatime)\n"
        ));
        assert!(root_is_read_only("/dev/root on / ro,noatime"));
        assert!(!root_is_read_only(""));
    }

    #[tokio::test]
    async fn test_release_verifies_exactly_once() {
        let shell = ScriptedShell::new();
        acquire(&shell).await.unwrap();
        release(&shell).await.unwrap();

        assert_eq!(shell.count(MOUNT_TABLE_ROOT), 1);
        assert_eq!(
            shell.commands(),
            vec![REMOUNT_RW, REMOUNT_RO, MOUNT_TABLE_ROOT]
        );
    }

    #[tokio::test]
    async fn test_release_detects_silent_remount_failure() {
        let shell = ScriptedShell::new().ignoring_read_only_remount();
        acquire(&shell).await.unwrap();

        let err = release(&shell).await.unwrap_err();
        assert!(matches!(err, DeviceError::Verification(_)));
        assert_eq!(shell.count(MOUNT_TABLE_ROOT), 1);
    }

    #[tokio::test]
    async fn test_release_trusts_table_over_remount_noise() {
        let shell = ScriptedShell::new().fail(REMOUNT_RO, "mount: / is busy\n");
        // Root was never made writable, so the table still shows ro.
        release(&shell).await.unwrap();
        assert_eq!(shell.count(MOUNT_TABLE_ROOT), 1);
    }

    #[tokio::test]
    async fn test_release_failure_when_table_lacks_marker() {
        let shell = ScriptedShell::new().respond(MOUNT_TABLE_ROOT, "");
        let err = release(&shell).await.unwrap_err();
        assert!(matches!(err, DeviceError::Verification(_)));
    }

    #[tokio::test]
    async fn test_failed_acquire_short_circuits() {
        let shell = ScriptedShell::new().fail(REMOUNT_RW, "mount: permission denied\n");

        let guarded = run_guarded(&shell, async {
            shell.run("touch /etc/should-not-run").await?;
            Ok(())
        })
        .await;

        assert!(matches!(
            guarded.result,
            Err(DeviceError::Execution { ref command, .. }) if command == REMOUNT_RW
        ));
        assert_eq!(guarded.mode, FsMode::ReadOnly);
        assert!(guarded.release_error.is_none());
        assert_eq!(shell.commands(), vec![REMOUNT_RW]);
    }

    #[tokio::test]
    async fn test_release_runs_after_failed_work() {
        let shell = ScriptedShell::new();

        let guarded: Guarded<()> = run_guarded(&shell, async {
            Err(DeviceError::execution("cp a b", "cp: no space left"))
        })
        .await;

        assert!(guarded.result.is_err());
        assert_eq!(guarded.mode, FsMode::ReadOnly);
        assert!(!shell.is_writable());
        assert_eq!(shell.count(REMOUNT_RO), 1);
    }

    #[tokio::test]
    async fn test_release_failure_reports_unknown_without_masking_result() {
        let shell = ScriptedShell::new().ignoring_read_only_remount();

        let guarded = run_guarded(&shell, async { Ok(42) }).await;

        assert_eq!(guarded.result, Ok(42));
        assert_eq!(guarded.mode, FsMode::Unknown);
        assert!(matches!(
            guarded.release_error,
            Some(DeviceError::Verification(_))
        ));
        assert!(!guarded.is_success());
        assert!(!shell
            .calls()
            .iter()
            .any(|c| matches!(c, ShellCall::Upload { .. })));
    }
}
