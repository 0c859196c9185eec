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

//! Maintenance operations.
//!
//! Every mutating operation has the same shape: stage locally if needed,
//! enter the writable window through [`crate::guard::run_guarded`], issue its
//! commands, verify, and hand back an [`OperationReport`] describing each
//! step, the final filesystem mode and any release warning.

pub mod assets;
pub mod backlight;
pub mod clock;
pub mod reboot;
pub mod ssh_enable;

pub use assets::{change_wallpaper, upload_font, AssetKind, MaintenanceAsset};
pub use backlight::{persist_linear_frontlight, FRONTLIGHT_UNIT, FRONTLIGHT_UNIT_PATH};
pub use clock::{
    local_time, resolve_clock_method, set_ntp, set_timezone, show_device_time, sync_clock,
    TimeAction, TIME_FORMAT,
};
pub use reboot::{reboot, RebootOutcome, REBOOT};
pub use ssh_enable::{enable_network_ssh, resolve_ssh_enable_method};

use std::fmt;

use crate::error::DeviceError;
use crate::guard::{FsMode, Guarded};
use crate::ssh::RemoteShell;

/// Entries of the main menu.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    TransferFonts,
    ChangeWallpaper,
    ManageTime,
    Reboot,
    EnableSsh,
    LinearFrontlight,
    SwitchMode,
    Exit,
}

impl Operation {
    /// Menu order.
    pub const ALL: [Operation; 8] = [
        Self::TransferFonts,
        Self::ChangeWallpaper,
        Self::ManageTime,
        Self::Reboot,
        Self::EnableSsh,
        Self::LinearFrontlight,
        Self::SwitchMode,
        Self::Exit,
    ];

    pub fn key(self) -> &'static str {
        match self {
            Self::TransferFonts => "1",
            Self::ChangeWallpaper => "2",
            Self::ManageTime => "3",
            Self::Reboot => "4",
            Self::EnableSsh => "5",
            Self::LinearFrontlight => "6",
            Self::SwitchMode => "7",
            Self::Exit => "0",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::TransferFonts => "Transfer font files",
            Self::ChangeWallpaper => "Change wallpaper",
            Self::ManageTime => "Manage device time",
            Self::Reboot => "Reboot device",
            Self::EnableSsh => "Enable SSH over network",
            Self::LinearFrontlight => "Linear front-light persistence",
            Self::SwitchMode => "Switch connection mode",
            Self::Exit => "Exit",
        }
    }

    pub fn from_choice(choice: &str) -> Option<Self> {
        let choice = choice.trim();
        Self::ALL.into_iter().find(|op| op.key() == choice)
    }

    /// Whether the operation talks to the device.
    pub fn needs_session(self) -> bool {
        !matches!(self, Self::SwitchMode | Self::Exit)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepStatus {
    Done,
    Failed,
    Skipped,
}

impl fmt::Display for StepStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Done => f.write_str("done"),
            Self::Failed => f.write_str("failed"),
            Self::Skipped => f.write_str("skipped"),
        }
    }
}

/// One reported sub-step of an operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    pub name: String,
    pub status: StepStatus,
    pub detail: Option<String>,
}

/// Ordered step log filled in while an operation runs.
#[derive(Debug, Default)]
pub struct Steps(Vec<Step>);

impl Steps {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `command`, record the step, and return its stdout.
    pub async fn run<S: RemoteShell + ?Sized>(
        &mut self,
        shell: &S,
        name: &str,
        command: &str,
    ) -> Result<String, DeviceError> {
        match shell
            .run(command)
            .await
            .and_then(|output| output.into_result(command))
        {
            Ok(stdout) => {
                self.done(name, None);
                Ok(stdout)
            }
            Err(e) => {
                self.failed(name, &e);
                Err(e)
            }
        }
    }

    pub fn done(&mut self, name: &str, detail: Option<String>) {
        tracing::info!("{}: done", name);
        self.push(name, StepStatus::Done, detail);
    }

    pub fn failed(&mut self, name: &str, error: &DeviceError) {
        tracing::error!("{}: {}", name, error);
        self.push(name, StepStatus::Failed, Some(error.to_string()));
    }

    pub fn skipped(&mut self, name: &str, reason: &str) {
        tracing::warn!("{}: skipped ({})", name, reason);
        self.push(name, StepStatus::Skipped, Some(reason.to_string()));
    }

    fn push(&mut self, name: &str, status: StepStatus, detail: Option<String>) {
        self.0.push(Step {
            name: name.to_string(),
            status,
            detail,
        });
    }
}

/// What an operation did and how it ended.
#[derive(Debug)]
pub struct OperationReport {
    pub operation: &'static str,
    pub steps: Vec<Step>,
    pub outcome: Result<(), DeviceError>,
    /// Filesystem mode after the writable window, `None` for read-only
    /// operations or when the window was never entered.
    pub fs_mode: Option<FsMode>,
    /// Release could not be confirmed; the device needs manual inspection.
    pub release_error: Option<DeviceError>,
    /// Raw command output shown to the user.
    pub output: Option<String>,
}

impl OperationReport {
    pub fn unguarded(
        operation: &'static str,
        steps: Steps,
        outcome: Result<(), DeviceError>,
    ) -> Self {
        Self {
            operation,
            steps: steps.0,
            outcome,
            fs_mode: None,
            release_error: None,
            output: None,
        }
    }

    pub fn guarded(operation: &'static str, steps: Steps, guarded: Guarded<()>) -> Self {
        Self {
            operation,
            steps: steps.0,
            outcome: guarded.result,
            fs_mode: Some(guarded.mode),
            release_error: guarded.release_error,
            output: None,
        }
    }

    pub fn with_output(mut self, output: impl Into<String>) -> Self {
        self.output = Some(output.into());
        self
    }

    pub fn is_success(&self) -> bool {
        self.outcome.is_ok() && self.release_error.is_none()
    }

    /// Device may still be writable.
    pub fn needs_inspection(&self) -> bool {
        self.fs_mode == Some(FsMode::Unknown)
    }

    pub fn step(&self, name: &str) -> Option<&Step> {
        self.steps.iter().find(|step| step.name == name)
    }
}
