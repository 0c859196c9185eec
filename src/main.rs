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
use clap::Parser;

use rmtool::{
    cli::Cli, config::Config, lifecycle::SshConnector, menu::Menu, utils::init_logging,
};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose, cli.log_file().map(|p| p.as_path()))?;
    tracing::info!("rmtool {} starting", env!("CARGO_PKG_VERSION"));

    let config = Config::load(&cli.config)
        .await
        .with_context(|| format!("Failed to load configuration from {}", cli.config.display()))?;

    let connect_timeout = cli.connect_timeout().or_else(|| config.connect_timeout());
    let connector = SshConnector::new(config.server_check(), connect_timeout);

    let menu = Menu::start(
        config,
        cli.config.clone(),
        cli.mode.map(Into::into),
        connector,
    )
    .await?;

    if let Some(menu) = menu {
        menu.run().await?;
    }

    tracing::info!("rmtool finished");
    Ok(())
}
