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

//! Command-line flag parsing.

use clap::Parser;
use std::path::PathBuf;
use std::process::Command;
use std::time::Duration;

use rmtool::cli::{Cli, ModeArg};
use rmtool::ConnectionKind;

#[test]
fn test_defaults() {
    let cli = Cli::try_parse_from(["rmtool"]).unwrap();
    assert_eq!(cli.config, PathBuf::from("config.json"));
    assert_eq!(cli.verbose, 0);
    assert_eq!(cli.mode, None);
    assert_eq!(cli.log_file(), Some(&PathBuf::from("rmtool.log")));
    assert_eq!(cli.connect_timeout(), None);
}

#[test]
fn test_mode_and_verbosity() {
    let cli = Cli::try_parse_from(["rmtool", "--mode", "wifi", "-vv"]).unwrap();
    assert_eq!(cli.mode, Some(ModeArg::Wifi));
    assert_eq!(ConnectionKind::from(ModeArg::Wifi), ConnectionKind::Network);
    assert_eq!(cli.verbose, 2);

    assert!(Cli::try_parse_from(["rmtool", "--mode", "bluetooth"]).is_err());
}

#[test]
fn test_log_file_can_be_disabled() {
    let cli = Cli::try_parse_from(["rmtool", "--no-log-file"]).unwrap();
    assert_eq!(cli.log_file(), None);

    let cli = Cli::try_parse_from(["rmtool", "--log-file", "/tmp/rm.log"]).unwrap();
    assert_eq!(cli.log_file(), Some(&PathBuf::from("/tmp/rm.log")));
}

#[test]
fn test_connect_timeout() {
    let cli = Cli::try_parse_from(["rmtool", "--connect-timeout", "10"]).unwrap();
    assert_eq!(cli.connect_timeout(), Some(Duration::from_secs(10)));

    let cli = Cli::try_parse_from(["rmtool", "--connect-timeout", "0"]).unwrap();
    assert_eq!(cli.connect_timeout(), None);

    assert!(Cli::try_parse_from(["rmtool", "--connect-timeout", "soon"]).is_err());
}

#[test]
fn test_help_lists_flags() {
    let output = Command::new(env!("CARGO_BIN_EXE_rmtool"))
        .arg("--help")
        .output()
        .expect("Failed to execute rmtool");

    assert!(output.status.success());
    let help_text = String::from_utf8_lossy(&output.stdout);
    for flag in ["--config", "--mode", "--log-file", "--no-log-file", "--connect-timeout"] {
        assert!(help_text.contains(flag), "help should mention {flag}");
    }
}
