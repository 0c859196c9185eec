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

//! Configuration type definitions.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::ssh::known_hosts::StrictHostKeyChecking;

pub const DEFAULT_USB_HOST: &str = "10.11.99.1";
pub const DEFAULT_FONT_PATH: &str = "/usr/share/fonts/ttf/noto/";
pub const DEFAULT_WALLPAPER_PATH: &str = "/usr/share/remarkable/suspended.png";
pub const DEFAULT_TIMEZONE: &str = "Asia/Shanghai";
pub const DEFAULT_FONT_RENAME: &str = "zwzt.ttf";

/// Main configuration structure.
///
/// The four legacy keys keep their on-disk names so existing
/// `config.json` files load unchanged.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Config {
    #[serde(default = "Endpoint::usb_default")]
    pub usb: Endpoint,

    #[serde(default)]
    pub wifi: Endpoint,

    #[serde(rename = "FONT_PATH", default = "default_font_path")]
    pub font_path: String,

    #[serde(rename = "WALLPAPER_PATH", default = "default_wallpaper_path")]
    pub wallpaper_path: String,

    #[serde(default = "default_timezone")]
    pub timezone: String,

    #[serde(default)]
    pub ssh_enable: SshEnableMethod,

    #[serde(default)]
    pub clock_method: ClockMethod,

    #[serde(default = "default_font_dir")]
    pub font_dir: PathBuf,

    #[serde(default = "default_wallpaper_dir")]
    pub wallpaper_dir: PathBuf,

    #[serde(default = "default_font_rename")]
    pub font_rename: String,

    #[serde(default)]
    pub host_key_checking: StrictHostKeyChecking,

    /// Overrides the per-user known_hosts file used in `accept-new` mode.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub known_hosts: Option<PathBuf>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connect_timeout_secs: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            usb: Endpoint::usb_default(),
            wifi: Endpoint::default(),
            font_path: default_font_path(),
            wallpaper_path: default_wallpaper_path(),
            timezone: default_timezone(),
            ssh_enable: SshEnableMethod::default(),
            clock_method: ClockMethod::default(),
            font_dir: default_font_dir(),
            wallpaper_dir: default_wallpaper_dir(),
            font_rename: default_font_rename(),
            host_key_checking: StrictHostKeyChecking::default(),
            known_hosts: None,
            connect_timeout_secs: None,
        }
    }
}

/// Address and cached root password for one connection mode.
#[derive(Debug, Serialize, Deserialize, Default, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub host: Option<String>,
    pub password: Option<String>,
}

impl Endpoint {
    fn usb_default() -> Self {
        Self {
            host: Some(DEFAULT_USB_HOST.to_string()),
            password: None,
        }
    }

    /// Both host and password are known.
    pub fn is_complete(&self) -> bool {
        self.host.as_deref().is_some_and(|h| !h.is_empty())
            && self.password.as_deref().is_some_and(|p| !p.is_empty())
    }
}

/// How network SSH is switched on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SshEnableMethod {
    /// Use the vendor script when the device has it, systemd otherwise.
    #[default]
    Auto,
    Systemd,
    VendorScript,
}


/// How the system clock is set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ClockMethod {
    /// Use timedatectl when the device has it, `date -s` otherwise.
    #[default]
    Auto,
    Date,
    Timedatectl,
}


fn default_font_path() -> String {
    DEFAULT_FONT_PATH.to_string()
}

fn default_wallpaper_path() -> String {
    DEFAULT_WALLPAPER_PATH.to_string()
}

fn default_timezone() -> String {
    DEFAULT_TIMEZONE.to_string()
}

fn default_font_dir() -> PathBuf {
    PathBuf::from("fonts")
}

fn default_wallpaper_dir() -> PathBuf {
    PathBuf::from("wallpaper")
}

fn default_font_rename() -> String {
    DEFAULT_FONT_RENAME.to_string()
}
