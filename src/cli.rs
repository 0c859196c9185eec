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

use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use std::time::Duration;

use crate::lifecycle::ConnectionKind;

#[derive(Parser, Debug)]
#[command(
    name = "rmtool",
    version,
    about = "Protected remote maintenance for reMarkable tablets over SSH",
    long_about = "rmtool connects to a reMarkable tablet as root over SSH, over the USB cable or the\nlocal network, and performs maintenance tasks: installing fonts, replacing the sleep\nscreen wallpaper, setting the clock and timezone, enabling SSH over WiFi, persisting a\nlinear front-light mapping and rebooting.\nEvery change remounts the root filesystem read-write only for the duration of the change\nand confirms it is read-only again afterwards.",
    after_help = "EXAMPLES:\n  Start over USB:             rmtool --mode usb\n  Start over WiFi, verbose:   rmtool --mode wifi -vv\n  Use another config file:    rmtool --config ~/rm/config.json\n  Fail fast on bad networks:  rmtool --connect-timeout 10"
)]
pub struct Cli {
    #[arg(
        long,
        env = "RMTOOL_CONFIG",
        default_value = "config.json",
        help = "Configuration file path\nHolds device addresses, cached passwords and remote paths; created on first save"
    )]
    pub config: PathBuf,

    #[arg(
        short = 'v',
        long,
        action = clap::ArgAction::Count,
        help = "Increase verbosity (-v, -vv, -vvv)"
    )]
    pub verbose: u8,

    #[arg(
        short = 'm',
        long,
        value_enum,
        help = "Connection mode; asked interactively when omitted"
    )]
    pub mode: Option<ModeArg>,

    #[arg(
        long,
        default_value = "rmtool.log",
        help = "File receiving a timestamped log of every operation"
    )]
    pub log_file: PathBuf,

    #[arg(long, help = "Do not write a log file", conflicts_with = "log_file")]
    pub no_log_file: bool,

    #[arg(
        long,
        value_name = "SECS",
        help = "Give up connecting after SECS seconds (overrides connect_timeout_secs in the config)"
    )]
    pub connect_timeout: Option<u64>,
}

impl Cli {
    pub fn log_file(&self) -> Option<&PathBuf> {
        (!self.no_log_file).then_some(&self.log_file)
    }

    pub fn connect_timeout(&self) -> Option<Duration> {
        self.connect_timeout
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ModeArg {
    Usb,
    Wifi,
}

impl From<ModeArg> for ConnectionKind {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Usb => ConnectionKind::Usb,
            ModeArg::Wifi => ConnectionKind::Network,
        }
    }
}
