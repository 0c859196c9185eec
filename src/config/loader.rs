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

//! Configuration loading and saving.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;

use super::types::Config;
use super::utils::expand_tilde;
use crate::ssh::known_hosts::get_check_method;
use crate::ssh::tokio_client::ServerCheckMethod;

impl Config {
    /// Load configuration from a file. A missing file yields defaults.
    pub async fn load(path: &Path) -> Result<Self> {
        let expanded_path = expand_tilde(path);

        if !expanded_path.exists() {
            tracing::debug!(
                "Config file not found at {:?}, using defaults",
                expanded_path
            );
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&expanded_path)
            .await
            .with_context(|| {
                format!(
                    "Failed to read configuration file at {}. \
                     Please check file permissions and ensure the file is accessible.",
                    expanded_path.display()
                )
            })?;

        let config: Config = serde_json::from_str(&content).with_context(|| {
            format!(
                "Failed to parse JSON configuration file at {}. Please check the JSON syntax is valid.",
                expanded_path.display()
            )
        })?;

        tracing::debug!("Loaded configuration from {:?}", expanded_path);
        Ok(config)
    }

    /// Save the configuration to a file, creating parent directories.
    pub async fn save(&self, path: &Path) -> Result<()> {
        let expanded_path = expand_tilde(path);

        if let Some(parent) = expanded_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .await
                    .with_context(|| format!("Failed to create directory {parent:?}"))?;
            }
        }

        let json = serde_json::to_string_pretty(self)
            .context("Failed to serialize configuration to JSON")?;

        fs::write(&expanded_path, json)
            .await
            .with_context(|| format!("Failed to write configuration to {expanded_path:?}"))?;

        tracing::debug!("Saved configuration to {:?}", expanded_path);
        Ok(())
    }

    /// Host-key policy for new sessions.
    pub fn server_check(&self) -> ServerCheckMethod {
        let known_hosts: Option<PathBuf> = self.known_hosts.as_deref().map(expand_tilde);
        get_check_method(self.host_key_checking, known_hosts.as_deref())
    }

    pub fn connect_timeout(&self) -> Option<Duration> {
        self.connect_timeout_secs
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
    }

    /// Local staging directory for renamed fonts.
    pub fn font_staging_dir(&self) -> PathBuf {
        expand_tilde(&self.font_dir).join("temp")
    }
}
