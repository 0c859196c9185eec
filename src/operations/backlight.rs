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

//! Linear front-light mapping, applied now and on every boot.
//!
//! `/etc` is an overlay on these devices, so the unit file is written to the
//! underlying root after the overlay is lazily unmounted. The overlay comes
//! back on the next boot.

use super::{OperationReport, Steps};
use crate::guard::{run_guarded, REMOUNT_RW};
use crate::ssh::RemoteShell;

pub const FRONTLIGHT_UNIT: &str = "tweak-brightness-slider.service";
pub const FRONTLIGHT_UNIT_PATH: &str = "/etc/systemd/system/tweak-brightness-slider.service";

const FRONTLIGHT_DIR: &str = "/sys/class/backlight/rm_frontlight";

const UNIT_CONTENT: &str = "\
[Unit]
Description=Set linear_mapping to 'yes' for backlight
After=multi-user.target

[Service]
Type=oneshot
ExecStart=/bin/sh -c 'echo yes > /sys/class/backlight/rm_frontlight/linear_mapping'
ExecStartPost=/bin/sh -c 'cat /sys/class/backlight/rm_frontlight/max_brightness > /sys/class/backlight/rm_frontlight/brightness'

[Install]
WantedBy=multi-user.target
";

/// Commands in execution order, paired with their step names.
fn plan() -> Vec<(&'static str, String)> {
    vec![
        (
            "maximise brightness",
            format!("cat {FRONTLIGHT_DIR}/max_brightness > {FRONTLIGHT_DIR}/brightness"),
        ),
        (
            "enable linear mapping",
            format!("echo yes > {FRONTLIGHT_DIR}/linear_mapping"),
        ),
        ("unmount /etc overlay", "umount -l /etc".to_string()),
        ("remount root read-write", REMOUNT_RW.to_string()),
        (
            "write unit file",
            format!("tee {FRONTLIGHT_UNIT_PATH} > /dev/null <<EOF\n{UNIT_CONTENT}EOF"),
        ),
        ("reload systemd", "systemctl daemon-reload".to_string()),
        (
            "enable unit",
            format!("systemctl enable --now {FRONTLIGHT_UNIT}"),
        ),
    ]
}

/// Apply the linear mapping and install a unit that reapplies it at boot.
///
/// Stops at the first step that writes to stderr; the remaining steps are
/// reported as skipped and the root is released once.
pub async fn persist_linear_frontlight<S: RemoteShell + ?Sized>(shell: &S) -> OperationReport {
    let mut steps = Steps::new();
    let guarded = run_guarded(shell, async {
        let mut plan = plan().into_iter();
        while let Some((name, command)) = plan.next() {
            if let Err(e) = steps.run(shell, name, &command).await {
                for (skipped, _) in plan.by_ref() {
                    steps.skipped(skipped, "previous step failed");
                }
                return Err(e);
            }
        }
        Ok(())
    })
    .await;

    OperationReport::guarded("linear front-light", steps, guarded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DeviceError;
    use crate::guard::{FsMode, MOUNT_TABLE_ROOT, REMOUNT_RO};
    use crate::operations::StepStatus;
    use crate::ssh::mock::ScriptedShell;

    #[tokio::test]
    async fn test_full_sequence() {
        let shell = ScriptedShell::new();
        let report = persist_linear_frontlight(&shell).await;

        assert!(report.is_success(), "{report:?}");
        let commands = shell.commands();
        assert_eq!(commands.len(), 1 + 7 + 2);
        assert_eq!(commands[0], REMOUNT_RW);
        assert_eq!(
            commands[1],
            "cat /sys/class/backlight/rm_frontlight/max_brightness > /sys/class/backlight/rm_frontlight/brightness"
        );
        assert_eq!(commands[3], "umount -l /etc");
        assert_eq!(commands[4], REMOUNT_RW);
        assert!(commands[5].starts_with(
            "tee /etc/systemd/system/tweak-brightness-slider.service > /dev/null <<EOF\n[Unit]"
        ));
        assert!(commands[5].ends_with("WantedBy=multi-user.target\nEOF"));
        assert_eq!(
            commands[7],
            "systemctl enable --now tweak-brightness-slider.service"
        );
        assert_eq!(commands[8..], [REMOUNT_RO, MOUNT_TABLE_ROOT]);
    }

    #[tokio::test]
    async fn test_first_error_aborts_and_releases_once() {
        let shell = ScriptedShell::new().fail("umount -l /etc", "umount: /etc: not mounted\n");
        let report = persist_linear_frontlight(&shell).await;

        assert!(matches!(
            report.outcome,
            Err(DeviceError::Execution { ref command, .. }) if command == "umount -l /etc"
        ));
        assert_eq!(report.fs_mode, Some(FsMode::ReadOnly));
        assert_eq!(shell.count("systemctl daemon-reload"), 0);
        assert_eq!(shell.count(REMOUNT_RO), 1);
        assert_eq!(shell.count(MOUNT_TABLE_ROOT), 1);

        let skipped: Vec<_> = report
            .steps
            .iter()
            .filter(|s| s.status == StepStatus::Skipped)
            .map(|s| s.name.as_str())
            .collect();
        assert_eq!(
            skipped,
            vec![
                "remount root read-write",
                "write unit file",
                "reload systemd",
                "enable unit"
            ]
        );
    }

    #[tokio::test]
    async fn test_runtime_write_failure_stops_before_etc() {
        let shell = ScriptedShell::new().fail(
            "echo yes >",
            "sh: can't create /sys/class/backlight/rm_frontlight/linear_mapping: nonexistent directory\n",
        );
        let report = persist_linear_frontlight(&shell).await;

        assert!(!report.is_success());
        assert_eq!(shell.count("umount -l /etc"), 0);
        assert!(!shell.is_writable());
    }
}
