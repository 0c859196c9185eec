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

//! Device clock and timezone.

use chrono::NaiveDateTime;

use super::{OperationReport, Steps};
use crate::config::ClockMethod;
use crate::error::DeviceError;
use crate::guard::run_guarded;
use crate::ssh::RemoteShell;
use crate::utils::quote_arg;

pub const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const PROBE_TIMEDATECTL: &str = "command -v timedatectl";
const HWCLOCK_WRITE: &str = "hwclock -w";
const NTP_OFF: &str = "timedatectl set-ntp 0";
const NTP_ON: &str = "timedatectl set-ntp 1";

const STEP_NTP_OFF: &str = "disable network time";
const STEP_SET_TIME: &str = "set system time";
const STEP_HWCLOCK: &str = "write hardware clock";

/// Entries of the time submenu.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeAction {
    SyncFromLocal,
    Show,
    SetTimezone,
    EnableNtp,
    DisableNtp,
    Back,
}

impl TimeAction {
    pub const ALL: [TimeAction; 6] = [
        Self::SyncFromLocal,
        Self::Show,
        Self::SetTimezone,
        Self::EnableNtp,
        Self::DisableNtp,
        Self::Back,
    ];

    pub fn key(self) -> &'static str {
        match self {
            Self::SyncFromLocal => "1",
            Self::Show => "2",
            Self::SetTimezone => "3",
            Self::EnableNtp => "4",
            Self::DisableNtp => "5",
            Self::Back => "0",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::SyncFromLocal => "Sync device time from this computer",
            Self::Show => "Show device time",
            Self::SetTimezone => "Set timezone",
            Self::EnableNtp => "Enable automatic network time",
            Self::DisableNtp => "Disable automatic network time",
            Self::Back => "Back",
        }
    }

    pub fn from_choice(choice: &str) -> Option<Self> {
        let choice = choice.trim();
        Self::ALL.into_iter().find(|action| action.key() == choice)
    }
}

/// The controller's local wall-clock time, second precision.
pub fn local_time() -> NaiveDateTime {
    chrono::Local::now().naive_local()
}

/// Replace `Auto` with the method the device supports.
pub async fn resolve_clock_method<S: RemoteShell + ?Sized>(
    shell: &S,
    method: ClockMethod,
) -> ClockMethod {
    if method != ClockMethod::Auto {
        return method;
    }
    let resolved = match shell.run(PROBE_TIMEDATECTL).await {
        Ok(output) if !output.failed() && !output.stdout.trim().is_empty() => {
            ClockMethod::Timedatectl
        }
        _ => ClockMethod::Date,
    };
    tracing::debug!("Clock method resolved to {:?}", resolved);
    resolved
}

/// Set the system clock to `at`, then copy it to the hardware clock.
///
/// With `timedatectl`, network time is switched off first; if that toggle
/// fails the remaining steps are skipped. A failed system-time step skips the
/// hardware clock write. The operation succeeds only if no step failed.
pub async fn sync_clock<S: RemoteShell + ?Sized>(
    shell: &S,
    method: ClockMethod,
    at: NaiveDateTime,
) -> OperationReport {
    let method = resolve_clock_method(shell, method).await;
    let time = at.format(TIME_FORMAT).to_string();
    tracing::info!("Setting device time to {} via {:?}", time, method);

    let mut steps = Steps::new();
    let guarded = run_guarded(shell, async {
        if method == ClockMethod::Timedatectl {
            if let Err(e) = steps.run(shell, STEP_NTP_OFF, NTP_OFF).await {
                steps.skipped(STEP_SET_TIME, "network time toggle unavailable");
                steps.skipped(STEP_HWCLOCK, "network time toggle unavailable");
                return Err(e);
            }
        }

        let set_time = match method {
            ClockMethod::Timedatectl => format!("timedatectl set-time '{time}'"),
            _ => format!("date -s \"{time}\""),
        };
        if let Err(e) = steps.run(shell, STEP_SET_TIME, &set_time).await {
            steps.skipped(STEP_HWCLOCK, "system time not set");
            return Err(e);
        }

        steps.run(shell, STEP_HWCLOCK, HWCLOCK_WRITE).await.map(|_| ())
    })
    .await;

    OperationReport::guarded("sync time", steps, guarded).with_output(time)
}

/// Query system time, hardware clock and timedatectl status.
///
/// Read-only, so it runs outside the writable window. Each query is reported
/// on its own and a failure does not stop the others.
pub async fn show_device_time<S: RemoteShell + ?Sized>(shell: &S) -> OperationReport {
    let mut steps = Steps::new();
    let mut first_error: Option<DeviceError> = None;
    let mut output = String::new();

    for (name, command) in [
        ("system time", "date"),
        ("hardware clock", "hwclock -r"),
        ("time settings", "timedatectl"),
    ] {
        match steps.run(shell, name, command).await {
            Ok(stdout) => {
                output.push_str(&format!("{name}:\n{}\n", stdout.trim_end()));
            }
            Err(e) => {
                first_error.get_or_insert(e);
            }
        }
    }

    let outcome = match first_error {
        Some(e) => Err(e),
        None => Ok(()),
    };
    OperationReport::unguarded("show time", steps, outcome).with_output(output)
}

pub async fn set_timezone<S: RemoteShell + ?Sized>(shell: &S, timezone: &str) -> OperationReport {
    let mut steps = Steps::new();
    let command = format!("timedatectl set-timezone {}", quote_arg(timezone));
    let guarded = run_guarded(shell, async {
        steps.run(shell, "set timezone", &command).await.map(|_| ())
    })
    .await;
    OperationReport::guarded("set timezone", steps, guarded)
}

pub async fn set_ntp<S: RemoteShell + ?Sized>(shell: &S, enabled: bool) -> OperationReport {
    let mut steps = Steps::new();
    let command = if enabled { NTP_ON } else { NTP_OFF };
    let guarded = run_guarded(shell, async {
        steps.run(shell, "toggle network time", command).await.map(|_| ())
    })
    .await;
    OperationReport::guarded("network time", steps, guarded)
}
