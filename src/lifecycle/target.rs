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

//! Connection target selection and per-mode credential caching.

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use zeroize::Zeroizing;

use crate::config::{Config, Endpoint, DEFAULT_USB_HOST};
use crate::utils::sanitize_hostname;

pub const DEFAULT_SSH_PORT: u16 = 22;

/// How the device is reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConnectionKind {
    /// Fixed link-local address over the USB cable.
    #[serde(rename = "usb")]
    Usb,
    /// User-supplied address on the local network.
    #[serde(rename = "wifi")]
    Network,
}

impl fmt::Display for ConnectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Usb => f.write_str("USB"),
            Self::Network => f.write_str("WiFi"),
        }
    }
}

/// One reachable device endpoint. Replaced wholesale on a mode switch.
#[derive(Clone, PartialEq, Eq)]
pub struct ConnectionTarget {
    kind: ConnectionKind,
    host: String,
    port: u16,
    credential: Zeroizing<String>,
}

impl ConnectionTarget {
    pub fn new(kind: ConnectionKind, host: impl Into<String>, credential: &str) -> Self {
        Self {
            kind,
            host: host.into(),
            port: DEFAULT_SSH_PORT,
            credential: Zeroizing::new(credential.to_string()),
        }
    }

    pub fn kind(&self) -> ConnectionKind {
        self.kind
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn credential(&self) -> &str {
        &self.credential
    }
}

impl fmt::Debug for ConnectionTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionTarget")
            .field("kind", &self.kind)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("credential", &"<redacted>")
            .finish()
    }
}

/// Interactive source of whatever the configuration lacks.
pub trait CredentialPrompt {
    /// Root password for `host`.
    fn password(&mut self, kind: ConnectionKind, host: &str) -> Result<String>;
    /// Address of the device on the network.
    fn network_host(&mut self) -> Result<String>;
    /// Whether to reuse the saved network endpoint at `host`.
    fn reuse_saved(&mut self, host: &str) -> Result<bool>;
    /// Show why the last attempt failed and whether to ask again.
    fn retry(&mut self, error: &anyhow::Error) -> Result<bool>;
}

/// A resolved target plus whether the configuration gained new values that
/// should be persisted.
#[derive(Debug)]
pub struct ResolvedTarget {
    pub target: ConnectionTarget,
    pub updated: bool,
}

/// Build the target for `kind`, prompting only for what is not cached.
///
/// USB always uses the configured (or default) link-local address and asks
/// for the password once. Network offers the saved endpoint when both host
/// and password are known and otherwise asks for both.
pub fn resolve_target(
    config: &mut Config,
    kind: ConnectionKind,
    prompt: &mut dyn CredentialPrompt,
) -> Result<ResolvedTarget> {
    match kind {
        ConnectionKind::Usb => resolve_usb(&mut config.usb, prompt),
        ConnectionKind::Network => resolve_network(&mut config.wifi, prompt),
    }
}

/// [`resolve_target`] that asks again after a rejected answer.
///
/// Returns `None` when the user declines to retry.
pub fn resolve_target_retrying(
    config: &mut Config,
    kind: ConnectionKind,
    prompt: &mut dyn CredentialPrompt,
) -> Result<Option<ResolvedTarget>> {
    loop {
        match resolve_target(config, kind, prompt) {
            Ok(resolved) => return Ok(Some(resolved)),
            Err(e) => {
                tracing::warn!("Could not set up {} connection: {:#}", kind, e);
                if !prompt.retry(&e)? {
                    return Ok(None);
                }
            }
        }
    }
}

/// Drop the cached password for `kind` after the device refused it, so the
/// next [`resolve_target`] asks for it again.
pub fn forget_password(config: &mut Config, kind: ConnectionKind) {
    let endpoint = match kind {
        ConnectionKind::Usb => &mut config.usb,
        ConnectionKind::Network => &mut config.wifi,
    };
    if endpoint.password.take().is_some() {
        tracing::info!("Forgot cached {} password", kind);
    }
}

fn resolve_usb(
    endpoint: &mut Endpoint,
    prompt: &mut dyn CredentialPrompt,
) -> Result<ResolvedTarget> {
    let host = endpoint
        .host
        .clone()
        .filter(|h| !h.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_USB_HOST.to_string());

    let mut updated = false;
    let password = match endpoint.password.clone().filter(|p| !p.is_empty()) {
        Some(password) => password,
        None => {
            let password = non_empty_password(prompt.password(ConnectionKind::Usb, &host)?)?;
            endpoint.password = Some(password.clone());
            updated = true;
            password
        }
    };
    let password = Zeroizing::new(password);

    tracing::info!("Using USB connection to {}", host);
    Ok(ResolvedTarget {
        target: ConnectionTarget::new(ConnectionKind::Usb, host, &password),
        updated,
    })
}

fn resolve_network(
    endpoint: &mut Endpoint,
    prompt: &mut dyn CredentialPrompt,
) -> Result<ResolvedTarget> {
    if endpoint.is_complete() {
        if let (Some(host), Some(password)) = (endpoint.host.clone(), endpoint.password.clone()) {
            let password = Zeroizing::new(password);
            if prompt.reuse_saved(&host)? {
                tracing::info!("Reusing saved WiFi connection to {}", host);
                return Ok(ResolvedTarget {
                    target: ConnectionTarget::new(ConnectionKind::Network, host, &password),
                    updated: false,
                });
            }
        }
    }

    let host = sanitize_hostname(&prompt.network_host()?)?;
    let password = Zeroizing::new(non_empty_password(
        prompt.password(ConnectionKind::Network, &host)?,
    )?);
    endpoint.host = Some(host.clone());
    endpoint.password = Some(password.to_string());

    tracing::info!("Using WiFi connection to {}", host);
    Ok(ResolvedTarget {
        target: ConnectionTarget::new(ConnectionKind::Network, host, &password),
        updated: true,
    })
}

fn non_empty_password(password: String) -> Result<String> {
    if password.is_empty() {
        bail!("Empty password not allowed");
    }
    Ok(password)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    #[derive(Default)]
    struct Answers {
        passwords: VecDeque<String>,
        hosts: VecDeque<String>,
        reuse: bool,
        retries: VecDeque<bool>,
        asked: Vec<&'static str>,
    }

    impl CredentialPrompt for Answers {
        fn password(&mut self, _kind: ConnectionKind, _host: &str) -> Result<String> {
            self.asked.push("password");
            Ok(self.passwords.pop_front().unwrap_or_default())
        }

        fn network_host(&mut self) -> Result<String> {
            self.asked.push("host");
            Ok(self.hosts.pop_front().unwrap_or_default())
        }

        fn reuse_saved(&mut self, _host: &str) -> Result<bool> {
            self.asked.push("reuse");
            Ok(self.reuse)
        }

        fn retry(&mut self, _error: &anyhow::Error) -> Result<bool> {
            self.asked.push("retry");
            Ok(self.retries.pop_front().unwrap_or(false))
        }
    }

    #[test]
    fn test_usb_prompts_once_and_caches() {
        let mut config = Config::default();
        let mut prompt = Answers {
            passwords: VecDeque::from(["usbpass".to_string()]),
            ..Default::default()
        };

        let first = resolve_target(&mut config, ConnectionKind::Usb, &mut prompt).unwrap();
        assert!(first.updated);
        assert_eq!(first.target.host(), "10.11.99.1");
        assert_eq!(first.target.port(), 22);
        assert_eq!(first.target.credential(), "usbpass");

        let second = resolve_target(&mut config, ConnectionKind::Usb, &mut prompt).unwrap();
        assert!(!second.updated);
        assert_eq!(second.target, first.target);
        assert_eq!(prompt.asked, vec!["password"]);
    }

    #[test]
    fn test_network_reuses_saved_endpoint() {
        let mut config = Config::default();
        config.wifi = Endpoint {
            host: Some("192.168.1.50".to_string()),
            password: Some("wifipass".to_string()),
        };
        let mut prompt = Answers {
            reuse: true,
            ..Default::default()
        };

        let resolved = resolve_target(&mut config, ConnectionKind::Network, &mut prompt).unwrap();
        assert!(!resolved.updated);
        assert_eq!(resolved.target.kind(), ConnectionKind::Network);
        assert_eq!(resolved.target.host(), "192.168.1.50");
        assert_eq!(prompt.asked, vec!["reuse"]);
    }

    #[test]
    fn test_network_declined_reuse_asks_again() {
        let mut config = Config::default();
        config.wifi = Endpoint {
            host: Some("192.168.1.50".to_string()),
            password: Some("old".to_string()),
        };
        let mut prompt = Answers {
            hosts: VecDeque::from([" 192.168.1.77 ".to_string()]),
            passwords: VecDeque::from(["new".to_string()]),
            ..Default::default()
        };

        let resolved = resolve_target(&mut config, ConnectionKind::Network, &mut prompt).unwrap();
        assert!(resolved.updated);
        assert_eq!(resolved.target.host(), "192.168.1.77");
        assert_eq!(config.wifi.host.as_deref(), Some("192.168.1.77"));
        assert_eq!(config.wifi.password.as_deref(), Some("new"));
        assert_eq!(prompt.asked, vec!["reuse", "host", "password"]);
    }

    #[test]
    fn test_network_rejects_bad_host() {
        let mut config = Config::default();
        let mut prompt = Answers {
            hosts: VecDeque::from(["10.0.0.1; reboot".to_string()]),
            ..Default::default()
        };

        assert!(resolve_target(&mut config, ConnectionKind::Network, &mut prompt).is_err());
        assert_eq!(config.wifi, Endpoint::default());
    }

    #[test]
    fn test_network_ipv6_host_is_stored_unbracketed() {
        let mut config = Config::default();
        let mut prompt = Answers {
            hosts: VecDeque::from(["[fe80::1]".to_string()]),
            passwords: VecDeque::from(["wifipass".to_string()]),
            ..Default::default()
        };

        let resolved = resolve_target(&mut config, ConnectionKind::Network, &mut prompt).unwrap();
        assert_eq!(resolved.target.host(), "fe80::1");
        assert_eq!(config.wifi.host.as_deref(), Some("fe80::1"));
    }

    #[test]
    fn test_empty_password_is_not_cached() {
        let mut config = Config::default();
        let mut prompt = Answers::default();

        assert!(resolve_target(&mut config, ConnectionKind::Usb, &mut prompt).is_err());
        assert_eq!(config.usb.password, None);
    }

    #[test]
    fn test_retrying_asks_again_after_empty_password() {
        let mut config = Config::default();
        let mut prompt = Answers {
            passwords: VecDeque::from([String::new(), "usbpass".to_string()]),
            retries: VecDeque::from([true]),
            ..Default::default()
        };

        let resolved = resolve_target_retrying(&mut config, ConnectionKind::Usb, &mut prompt)
            .unwrap()
            .unwrap();
        assert_eq!(resolved.target.credential(), "usbpass");
        assert_eq!(prompt.asked, vec!["password", "retry", "password"]);
    }

    #[test]
    fn test_retrying_gives_up_when_declined() {
        let mut config = Config::default();
        let mut prompt = Answers {
            hosts: VecDeque::from(["10.0.0.1; reboot".to_string()]),
            ..Default::default()
        };

        let resolved =
            resolve_target_retrying(&mut config, ConnectionKind::Network, &mut prompt).unwrap();
        assert!(resolved.is_none());
        assert_eq!(prompt.asked, vec!["host", "retry"]);
    }

    #[test]
    fn test_forgotten_usb_password_is_asked_again() {
        let mut config = Config::default();
        config.usb.password = Some("wrong".to_string());
        let mut prompt = Answers {
            passwords: VecDeque::from(["right".to_string()]),
            ..Default::default()
        };

        forget_password(&mut config, ConnectionKind::Usb);
        assert_eq!(config.usb.password, None);
        assert_eq!(config.usb.host.as_deref(), Some("10.11.99.1"));

        let resolved = resolve_target(&mut config, ConnectionKind::Usb, &mut prompt).unwrap();
        assert!(resolved.updated);
        assert_eq!(resolved.target.credential(), "right");
        assert_eq!(config.usb.password.as_deref(), Some("right"));
    }

    #[test]
    fn test_debug_redacts_credential() {
        let target = ConnectionTarget::new(ConnectionKind::Usb, "10.11.99.1", "hunter2");
        let debug = format!("{target:?}");
        assert!(!debug.contains("hunter2"));
        assert!(debug.contains("<redacted>"));
    }

    #[test]
    fn test_kind_serde_names() {
        assert_eq!(
            serde_json::to_string(&ConnectionKind::Network).unwrap(),
            "\"wifi\""
        );
        assert_eq!(ConnectionKind::Usb.to_string(), "USB");
    }
}
