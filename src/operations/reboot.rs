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

use crate::error::DeviceError;
use crate::ssh::RemoteShell;

pub const REBOOT: &str = "reboot";

#[derive(Debug, PartialEq, Eq)]
pub enum RebootOutcome {
    /// Not confirmed; nothing was sent.
    Declined,
    /// The device accepted the command. The session is now unusable.
    Issued,
    Failed(DeviceError),
}

/// Reboot the device if `confirmed`.
///
/// On [`RebootOutcome::Issued`] the caller must discard its session.
pub async fn reboot<S: RemoteShell + ?Sized>(shell: &S, confirmed: bool) -> RebootOutcome {
    if !confirmed {
        tracing::info!("Reboot declined");
        return RebootOutcome::Declined;
    }

    match shell
        .run(REBOOT)
        .await
        .and_then(|output| output.into_result(REBOOT))
    {
        Ok(_) => {
            tracing::info!("Reboot command sent");
            RebootOutcome::Issued
        }
        Err(e) => {
            tracing::error!("Reboot failed: {}", e);
            RebootOutcome::Failed(e)
        }
    }
}
