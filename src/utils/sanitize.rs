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

use anyhow::{bail, Result};
use std::net::Ipv6Addr;
use tracing::warn;

/// Validate a command before it is sent to the device.
///
/// Rejects empty, oversized and NUL-containing commands. Patterns that are
/// unusual for maintenance commands are logged but allowed through.
pub fn sanitize_command(command: &str) -> Result<String> {
    if command.trim().is_empty() {
        bail!("Empty command not allowed");
    }

    const MAX_COMMAND_LENGTH: usize = 16384;
    if command.len() > MAX_COMMAND_LENGTH {
        bail!(
            "Command too long: {} bytes (max: {} bytes)",
            command.len(),
            MAX_COMMAND_LENGTH
        );
    }

    if command.contains('\0') {
        bail!("Command contains null bytes");
    }

    let unusual_patterns = [
        ("$(", "command substitution"),
        ("`", "backtick command substitution"),
        ("\n&", "background process after newline"),
        (":(){ :|:& };:", "fork bomb"),
    ];

    for (pattern, description) in &unusual_patterns {
        if command.contains(pattern) {
            warn!(
                "Potentially dangerous pattern detected in command: {} ({})",
                pattern, description
            );
        }
    }

    Ok(command.to_string())
}

/// Validate a user-entered device address.
///
/// IPv6 literals are accepted with or without brackets and returned bare,
/// the form address resolution expects.
pub fn sanitize_hostname(hostname: &str) -> Result<String> {
    let hostname = hostname.trim();
    if hostname.is_empty() {
        bail!("Empty hostname not allowed");
    }

    const MAX_HOSTNAME_LENGTH: usize = 253;
    if hostname.len() > MAX_HOSTNAME_LENGTH {
        bail!(
            "Hostname too long: {} bytes (max: {} bytes)",
            hostname.len(),
            MAX_HOSTNAME_LENGTH
        );
    }

    let unbracketed = hostname
        .strip_prefix('[')
        .and_then(|rest| rest.strip_suffix(']'));
    if let Some(inner) = unbracketed {
        return match inner.parse::<Ipv6Addr>() {
            Ok(addr) => Ok(addr.to_string()),
            Err(_) => bail!("Invalid IPv6 address format: {}", hostname),
        };
    }
    if hostname.contains(':') {
        return match hostname.parse::<Ipv6Addr>() {
            Ok(addr) => Ok(addr.to_string()),
            Err(_) => bail!("Invalid IPv6 address format: {}", hostname),
        };
    }

    let valid_chars = |c: char| c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_';

    if !hostname.chars().all(valid_chars) {
        bail!("Invalid characters in hostname: {}", hostname);
    }

    if hostname.contains("..") {
        bail!("Double dots not allowed in hostname");
    }

    for segment in hostname.split('.') {
        if segment.starts_with('-') || segment.ends_with('-') {
            bail!("Hostname segments cannot start or end with hyphen");
        }
    }

    Ok(hostname.to_string())
}

/// Single-quote `arg` for a POSIX shell.
pub fn quote_arg(arg: &str) -> String {
    format!("'{}'", arg.replace('\'', r"'\''"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_command_valid() {
        assert!(sanitize_command("mount -o remount,rw /").is_ok());
        assert!(sanitize_command("mount | grep ' / '").is_ok());
        assert!(sanitize_command("date -s \"2024-06-01 12:00:00\"").is_ok());
    }

    #[test]
    fn test_sanitize_command_empty() {
        assert!(sanitize_command("").is_err());
        assert!(sanitize_command("   ").is_err());
    }

    #[test]
    fn test_sanitize_command_null_bytes() {
        assert!(sanitize_command("echo\0test").is_err());
    }

    #[test]
    fn test_sanitize_command_too_long() {
        let long = "x".repeat(16385);
        assert!(sanitize_command(&long).is_err());
    }

    #[test]
    fn test_sanitize_hostname_valid() {
        assert_eq!(sanitize_hostname("10.11.99.1").unwrap(), "10.11.99.1");
        assert_eq!(sanitize_hostname(" 192.168.1.50\n").unwrap(), "192.168.1.50");
        assert!(sanitize_hostname("remarkable.local").is_ok());
    }

    #[test]
    fn test_sanitize_hostname_ipv6_is_returned_bare() {
        assert_eq!(sanitize_hostname("[fe80::1]").unwrap(), "fe80::1");
        assert_eq!(sanitize_hostname("fe80::1").unwrap(), "fe80::1");
        assert_eq!(sanitize_hostname(" [::1] ").unwrap(), "::1");
        assert!(sanitize_hostname("[]").is_err());
        assert!(sanitize_hostname("[10.11.99.1]").is_err());
        assert!(sanitize_hostname("fe80::1]").is_err());
    }

    #[test]
    fn test_sanitize_hostname_invalid() {
        assert!(sanitize_hostname("").is_err());
        assert!(sanitize_hostname("host;rm -rf /").is_err());
        assert!(sanitize_hostname("host..local").is_err());
        assert!(sanitize_hostname("-host.local").is_err());
        assert!(sanitize_hostname("[fe80::zz]").is_err());
    }

    #[test]
    fn test_quote_arg() {
        assert_eq!(
            quote_arg("/usr/share/fonts/ttf/noto/"),
            "'/usr/share/fonts/ttf/noto/'"
        );
        assert_eq!(quote_arg("it's"), r"'it'\''s'");
    }
}
