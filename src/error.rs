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

//! Error kinds reported by device operations.
//!
//! - [`DeviceError::Connectivity`]: the device could not be reached or
//!   refused authentication
//! - [`DeviceError::Execution`]: a remote command wrote diagnostics to stderr
//! - [`DeviceError::Transfer`]: a local read or remote write failed during upload
//! - [`DeviceError::Verification`]: a post-condition did not hold although the
//!   command itself reported no error

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeviceError {
    /// `auth_rejected` is set when the device answered but refused the
    /// password, so a cached credential should be dropped.
    #[error("cannot reach device at {host}: {reason}")]
    Connectivity {
        host: String,
        reason: String,
        auth_rejected: bool,
    },

    #[error("`{command}` failed: {}", .stderr.trim())]
    Execution { command: String, stderr: String },

    #[error("failed to upload {} to {remote}: {reason}", .local.display())]
    Transfer {
        local: PathBuf,
        remote: String,
        reason: String,
    },

    #[error("verification failed: {0}")]
    Verification(String),
}

impl DeviceError {
    pub fn connectivity(host: impl Into<String>, reason: impl ToString) -> Self {
        Self::Connectivity {
            host: host.into(),
            reason: reason.to_string(),
            auth_rejected: false,
        }
    }

    pub fn auth_rejected(host: impl Into<String>, reason: impl ToString) -> Self {
        Self::Connectivity {
            host: host.into(),
            reason: reason.to_string(),
            auth_rejected: true,
        }
    }

    pub fn execution(command: impl Into<String>, stderr: impl Into<String>) -> Self {
        Self::Execution {
            command: command.into(),
            stderr: stderr.into(),
        }
    }

    pub fn transfer(
        local: impl Into<PathBuf>,
        remote: impl Into<String>,
        reason: impl ToString,
    ) -> Self {
        Self::Transfer {
            local: local.into(),
            remote: remote.into(),
            reason: reason.to_string(),
        }
    }

    pub fn verification(message: impl Into<String>) -> Self {
        Self::Verification(message.into())
    }

    pub fn is_auth_rejected(&self) -> bool {
        matches!(
            self,
            Self::Connectivity {
                auth_rejected: true,
                ..
            }
        )
    }

    /// Short label for logs and summaries.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Connectivity { .. } => "connectivity",
            Self::Execution { .. } => "execution",
            Self::Transfer { .. } => "transfer",
            Self::Verification(_) => "verification",
        }
    }
}
