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

use anyhow::Result;
use tempfile::tempdir;

use rmtool::config::{Config, SshEnableMethod};
use rmtool::lifecycle::{resolve_target, ConnectionKind, CredentialPrompt};

struct FixedPrompt {
    password: &'static str,
    host: &'static str,
}

impl CredentialPrompt for FixedPrompt {
    fn password(&mut self, _kind: ConnectionKind, _host: &str) -> Result<String> {
        Ok(self.password.to_string())
    }

    fn network_host(&mut self) -> Result<String> {
        Ok(self.host.to_string())
    }

    fn reuse_saved(&mut self, _host: &str) -> Result<bool> {
        Ok(true)
    }

    fn retry(&mut self, _error: &anyhow::Error) -> Result<bool> {
        Ok(false)
    }
}

#[tokio::test]
async fn test_legacy_config_file_loads() -> Result<(), Box<dyn std::error::Error>> {
    let temp_dir = tempdir()?;
    let config_path = temp_dir.path().join("config.json");
    tokio::fs::write(
        &config_path,
        r#"{
    "usb": {"host": "10.11.99.1", "password": "usbpass"},
    "wifi": {"host": null, "password": null},
    "FONT_PATH": "/usr/share/fonts/ttf/noto/",
    "WALLPAPER_PATH": "/usr/share/remarkable/suspended.png"
}"#,
    )
    .await?;

    let config = Config::load(&config_path).await?;
    assert_eq!(config.usb.password.as_deref(), Some("usbpass"));
    assert_eq!(config.wifi.host, None);
    assert_eq!(config.ssh_enable, SshEnableMethod::Auto);

    Ok(())
}

#[tokio::test]
async fn test_prompted_credentials_persist_across_runs() -> Result<(), Box<dyn std::error::Error>>
{
    let temp_dir = tempdir()?;
    let config_path = temp_dir.path().join("config.json");

    let mut config = Config::load(&config_path).await?;
    let mut prompt = FixedPrompt {
        password: "wifipass",
        host: "192.168.1.50",
    };
    let resolved = resolve_target(&mut config, ConnectionKind::Network, &mut prompt)?;
    assert!(resolved.updated);
    config.save(&config_path).await?;

    let mut reloaded = Config::load(&config_path).await?;
    let again = resolve_target(&mut reloaded, ConnectionKind::Network, &mut prompt)?;
    assert!(!again.updated);
    assert_eq!(again.target.host(), "192.168.1.50");
    assert_eq!(again.target.credential(), "wifipass");

    let raw = tokio::fs::read_to_string(&config_path).await?;
    assert!(raw.contains("\"FONT_PATH\""));
    assert!(raw.contains("\"wifi\""));

    Ok(())
}
