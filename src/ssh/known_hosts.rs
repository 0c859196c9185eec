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

//! Host key trust policy.
//!
//! Devices are reached over a link-local USB address or a DHCP address and
//! are never fingerprint-confirmed interactively. Both policies below trust a
//! previously unseen device automatically; this is weaker than pinning and is
//! accepted on purpose.

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::tokio_client::ServerCheckMethod;

/// Mode for host key checking
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StrictHostKeyChecking {
    /// Never verify host keys (accept all)
    No,
    /// Verify known hosts, add new ones automatically (TOFU)
    #[default]
    AcceptNew,
}

/// Default location of the tool's own known_hosts file.
///
/// Kept apart from `~/.ssh/known_hosts` because the USB address is shared by
/// every device of the same model.
pub fn get_default_known_hosts_path() -> Option<PathBuf> {
    ProjectDirs::from("", "", "rmtool").map(|dirs| dirs.config_dir().join("known_hosts"))
}

/// Create a ServerCheckMethod based on the host key checking mode
pub fn get_check_method(
    strict_mode: StrictHostKeyChecking,
    known_hosts: Option<&Path>,
) -> ServerCheckMethod {
    match strict_mode {
        StrictHostKeyChecking::No => {
            tracing::debug!("Host key checking disabled (strict mode = no)");
            ServerCheckMethod::NoCheck
        }
        StrictHostKeyChecking::AcceptNew => {
            let path = known_hosts
                .map(Path::to_path_buf)
                .or_else(get_default_known_hosts_path);
            match path {
                Some(path) => {
                    if let Some(dir) = path.parent() {
                        if let Err(e) = std::fs::create_dir_all(dir) {
                            tracing::warn!(
                                "Cannot create {:?} ({}), host keys will not be recorded",
                                dir,
                                e
                            );
                            return ServerCheckMethod::NoCheck;
                        }
                    }
                    tracing::debug!("Using known_hosts file: {:?} (accept-new mode)", path);
                    ServerCheckMethod::AcceptNew(path)
                }
                None => {
                    tracing::warn!("Could not determine known_hosts path, using NoCheck");
                    ServerCheckMethod::NoCheck
                }
            }
        }
    }
}
