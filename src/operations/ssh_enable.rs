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

use super::{OperationReport, Steps};
use crate::config::SshEnableMethod;
use crate::guard::run_guarded;
use crate::ssh::RemoteShell;

const PROBE_VENDOR_SCRIPT: &str = "command -v rm-ssh-over-wlan";
const VENDOR_SCRIPT_ON: &str = "rm-ssh-over-wlan on";
const SYSTEMD_ENABLE: &str = "systemctl enable --now ssh";

/// Replace `Auto` with the surface the device offers.
pub async fn resolve_ssh_enable_method<S: RemoteShell + ?Sized>(
    shell: &S,
    method: SshEnableMethod,
) -> SshEnableMethod {
    if method != SshEnableMethod::Auto {
        return method;
    }
    match shell.run(PROBE_VENDOR_SCRIPT).await {
        Ok(output) if !output.failed() && !output.stdout.trim().is_empty() => {
            SshEnableMethod::VendorScript
        }
        _ => SshEnableMethod::Systemd,
    }
}

/// Turn on SSH over the wireless interface and return the command's raw
/// output in the report.
pub async fn enable_network_ssh<S: RemoteShell + ?Sized>(
    shell: &S,
    method: SshEnableMethod,
) -> OperationReport {
    let method = resolve_ssh_enable_method(shell, method).await;
    let command = match method {
        SshEnableMethod::VendorScript => VENDOR_SCRIPT_ON,
        _ => SYSTEMD_ENABLE,
    };
    tracing::info!("Enabling network SSH with `{}`", command);

    let mut steps = Steps::new();
    let mut output = String::new();
    let guarded = run_guarded(shell, async {
        output = steps.run(shell, "enable network SSH", command).await?;
        Ok(())
    })
    .await;

    OperationReport::guarded("enable SSH", steps, guarded).with_output(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DeviceError;
    use crate::guard::REMOUNT_RW;
    use crate::ssh::mock::ScriptedShell;

    #[tokio::test]
    async fn test_auto_uses_vendor_script_when_installed() {
        let shell = ScriptedShell::new()
            .respond(PROBE_VENDOR_SCRIPT, "/usr/bin/rm-ssh-over-wlan\n")
            .respond(VENDOR_SCRIPT_ON, "SSH over WLAN enabled\n");

        let report = enable_network_ssh(&shell, SshEnableMethod::Auto).await;

        assert!(report.is_success());
        assert_eq!(report.output.as_deref(), Some("SSH over WLAN enabled\n"));
        assert_eq!(shell.count(VENDOR_SCRIPT_ON), 1);
        assert_eq!(shell.count(SYSTEMD_ENABLE), 0);
    }

    #[tokio::test]
    async fn test_auto_falls_back_to_systemd() {
        let shell = ScriptedShell::new();
        let report = enable_network_ssh(&shell, SshEnableMethod::Auto).await;

        assert!(report.is_success());
        assert_eq!(
            shell.commands()[..2],
            [PROBE_VENDOR_SCRIPT.to_string(), REMOUNT_RW.to_string()]
        );
        assert_eq!(shell.count(SYSTEMD_ENABLE), 1);
    }

    #[tokio::test]
    async fn test_explicit_method_skips_probe() {
        let shell = ScriptedShell::new().fail(
            SYSTEMD_ENABLE,
            "Failed to enable unit: Unit file ssh.service does not exist.\n",
        );
        let report = enable_network_ssh(&shell, SshEnableMethod::Systemd).await;

        assert!(matches!(report.outcome, Err(DeviceError::Execution { .. })));
        assert_eq!(shell.count(PROBE_VENDOR_SCRIPT), 0);
    }
}
