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

use anyhow::{Context, Result};
use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;
use tracing_subscriber::{filter::LevelFilter, fmt, prelude::*, EnvFilter};

/// Create an environment filter based on verbosity level
pub fn create_env_filter(verbosity: u8) -> EnvFilter {
    if std::env::var("RUST_LOG").is_ok() {
        // Use RUST_LOG if set (allows debugging russh and other dependencies)
        EnvFilter::from_default_env()
    } else {
        match verbosity {
            0 => EnvFilter::new("rmtool=warn"),
            1 => EnvFilter::new("rmtool=info"),
            // -vv: Include russh debug logs for SSH troubleshooting
            2 => EnvFilter::new("rmtool=debug,russh=debug"),
            _ => EnvFilter::new("rmtool=trace,russh=trace,russh_sftp=debug"),
        }
    }
}

/// Initialize logging.
///
/// The console layer follows `verbosity`. When `log_file` is given, every
/// `info` and higher event from this crate is also appended to it with a
/// timestamp, so operations leave an audit trail even at default verbosity.
pub fn init_logging(verbosity: u8, log_file: Option<&Path>) -> Result<()> {
    let console = fmt::layer()
        .with_target(true)
        .with_writer(std::io::stderr)
        .with_filter(create_env_filter(verbosity));

    let file_layer = match log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            Some(
                fmt::layer()
                    .with_ansi(false)
                    .with_target(false)
                    .with_writer(Mutex::new(file))
                    .with_filter(file_filter()),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(console)
        .with(file_layer)
        .try_init()
        .context("Failed to install tracing subscriber")?;

    Ok(())
}

fn file_filter() -> EnvFilter {
    EnvFilter::builder()
        .with_default_directive(LevelFilter::WARN.into())
        .parse_lossy("rmtool=info")
}
