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

//! Transport-level errors raised by the russh client wrapper.

use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error("Address could not be resolved: {0}")]
    AddressInvalid(io::Error),
    #[error("Connection attempt to {0} timed out")]
    ConnectTimeout(String),
    #[error("The host key of the server could not be verified")]
    ServerCheckFailed,
    #[error(
        "Host key for {host} changed (known_hosts line {line}); remove the stale entry to trust the device again"
    )]
    HostKeyChanged { host: String, line: usize },
    #[error("Password authentication rejected for user {0}")]
    PasswordWrong(String),
    #[error("Command rejected before execution: {0}")]
    CommandValidationFailed(String),
    #[error("SSH error: {0}")]
    SshError(#[from] russh::Error),
    #[error("SFTP error: {0}")]
    SftpError(#[from] russh_sftp::client::error::Error),
    #[error("Local I/O error: {0}")]
    IoError(#[from] io::Error),
}

impl Error {
    /// The device answered but refused the credential.
    pub fn is_auth_rejected(&self) -> bool {
        matches!(self, Self::PasswordWrong(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_wrong_password_is_auth_rejection() {
        assert!(Error::PasswordWrong("root".to_string()).is_auth_rejected());
        assert!(!Error::ConnectTimeout("10.11.99.1:22".to_string()).is_auth_rejected());
        assert!(!Error::ServerCheckFailed.is_auth_rejected());
        assert!(!Error::HostKeyChanged {
            host: "10.11.99.1".to_string(),
            line: 3
        }
        .is_auth_rejected());
    }

    #[test]
    fn test_host_key_changed_message_names_line() {
        let err = Error::HostKeyChanged {
            host: "remarkable".to_string(),
            line: 7,
        };
        let msg = err.to_string();
        assert!(msg.contains("remarkable"));
        assert!(msg.contains("line 7"));
    }
}
