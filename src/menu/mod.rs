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

//! Interactive numbered menu.

mod prompt;
mod render;

pub use prompt::{is_yes, parse_connection_kind, parse_selection, Selection, Terminal};

use anyhow::Result;
use owo_colors::OwoColorize;
use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::error::DeviceError;
use crate::lifecycle::{
    forget_password, resolve_target_retrying, ConnectionKind, Connector, SessionManager,
};
use crate::operations::{
    self, change_wallpaper, enable_network_ssh, persist_linear_frontlight, reboot, set_ntp,
    set_timezone, show_device_time, sync_clock, upload_font, AssetKind, MaintenanceAsset,
    Operation, RebootOutcome, TimeAction,
};
use crate::ssh::RemoteShell;
use crate::utils::list_files_with_extension;

/// The interactive session: configuration, terminal and the one device
/// session.
pub struct Menu<C: Connector> {
    config: Config,
    config_path: PathBuf,
    term: Terminal,
    manager: SessionManager<C>,
}

impl<C: Connector> Menu<C> {
    /// Resolve the first target, prompting for what the configuration lacks.
    ///
    /// Returns `None` when the user closes input or gives up before a target
    /// is resolved.
    pub async fn start(
        mut config: Config,
        config_path: PathBuf,
        mode: Option<ConnectionKind>,
        connector: C,
    ) -> Result<Option<Self>> {
        let mut term = Terminal::new()?;
        let kind = match mode {
            Some(kind) => kind,
            None => match term.connection_kind()? {
                Some(kind) => kind,
                None => return Ok(None),
            },
        };

        let Some(resolved) = resolve_target_retrying(&mut config, kind, &mut term)? else {
            return Ok(None);
        };
        if resolved.updated {
            save_config(&config, &config_path).await;
        }

        Ok(Some(Self {
            config,
            config_path,
            term,
            manager: SessionManager::new(connector, resolved.target),
        }))
    }

    pub async fn run(mut self) -> Result<()> {
        loop {
            let target = self.manager.target();
            print!(
                "{}",
                render::main_menu(&format!("{} ({})", target.kind(), target.host()))
            );
            let Some(choice) = self.term.line("Select an action (0-7): ")? else {
                break;
            };
            let Some(op) = Operation::from_choice(&choice) else {
                println!("Invalid choice, please try again.");
                continue;
            };
            tracing::info!("Menu action: {}", op.label());

            if !self.dispatch(op).await? {
                break;
            }
        }

        self.manager.close().await;
        println!("Goodbye!");
        Ok(())
    }

    /// Run one menu action. Returns `false` on exit.
    async fn dispatch(&mut self, op: Operation) -> Result<bool> {
        if !op.needs_session() {
            if op == Operation::SwitchMode {
                self.switch_mode().await?;
            }
            return Ok(op != Operation::Exit);
        }

        let session = match self.manager.session().await {
            Ok(session) => session,
            Err(e) => {
                self.connection_failed(e).await?;
                return Ok(true);
            }
        };
        let config = &self.config;
        let term = &mut self.term;

        match op {
            Operation::TransferFonts => transfer_fonts(session, config, term).await?,
            Operation::ChangeWallpaper => {
                let picked = select_file(term, AssetKind::Wallpaper, &config.wallpaper_dir)?;
                if let Some(local) = picked {
                    let asset = MaintenanceAsset::wallpaper(local, &config.wallpaper_path);
                    print!("{}", render::report(&change_wallpaper(session, &asset).await));
                }
            }
            Operation::ManageTime => manage_time(session, config, term).await?,
            Operation::Reboot => {
                let confirmed =
                    term.confirm("Reboot the device now? The connection will be lost.")?;
                let outcome = reboot(session, confirmed).await;
                println!("{}", render::reboot_outcome(&outcome));
                if outcome == RebootOutcome::Issued {
                    self.manager.invalidate().await;
                }
            }
            Operation::EnableSsh => {
                let report = enable_network_ssh(session, config.ssh_enable).await;
                print!("{}", render::report(&report));
            }
            Operation::LinearFrontlight => {
                print!("{}", render::report(&persist_linear_frontlight(session).await));
            }
            Operation::SwitchMode | Operation::Exit => {}
        }
        Ok(true)
    }

    async fn switch_mode(&mut self) -> Result<()> {
        let Some(kind) = self.term.connection_kind()? else {
            return Ok(());
        };
        self.connect_to(kind).await
    }

    /// Resolve a target for `kind` and connect to it.
    async fn connect_to(&mut self, kind: ConnectionKind) -> Result<()> {
        let Some(resolved) = resolve_target_retrying(&mut self.config, kind, &mut self.term)?
        else {
            return Ok(());
        };
        if resolved.updated {
            save_config(&self.config, &self.config_path).await;
        }
        if let Err(e) = self.manager.switch_target(resolved.target).await {
            report_connection_error(&e);
        }
        Ok(())
    }

    /// Report a failed connect. A refused password is forgotten and asked
    /// for again.
    async fn connection_failed(&mut self, error: DeviceError) -> Result<()> {
        report_connection_error(&error);
        if !error.is_auth_rejected() {
            return Ok(());
        }
        let kind = self.manager.target().kind();
        forget_password(&mut self.config, kind);
        save_config(&self.config, &self.config_path).await;
        self.connect_to(kind).await
    }
}

fn report_connection_error(error: &DeviceError) {
    println!("{} {}", "●".red(), error.to_string().red());
}

async fn transfer_fonts<S: RemoteShell + ?Sized>(
    session: &S,
    config: &Config,
    term: &mut Terminal,
) -> Result<()> {
    loop {
        let Some(local) = select_file(term, AssetKind::Font, &config.font_dir)? else {
            return Ok(());
        };
        let rename = term.confirm(&format!("Rename the font to {}?", config.font_rename))?;
        let asset = match MaintenanceAsset::font(
            local,
            &config.font_path,
            rename.then_some(config.font_rename.as_str()),
        ) {
            Ok(asset) => asset,
            Err(e) => {
                println!("{} {}", "●".red(), e.to_string().red());
                return Ok(());
            }
        };

        let report = upload_font(session, &asset, &config.font_staging_dir()).await;
        print!("{}", render::report(&report));

        if !term.confirm("Transfer more fonts?")? {
            return Ok(());
        }
    }
}

async fn manage_time<S: RemoteShell + ?Sized>(
    session: &S,
    config: &Config,
    term: &mut Terminal,
) -> Result<()> {
    loop {
        print!("{}", render::time_menu());
        let Some(choice) = term.line("Select an action: ")? else {
            return Ok(());
        };
        let Some(action) = TimeAction::from_choice(&choice) else {
            println!("Invalid choice, please try again.");
            continue;
        };

        let report = match action {
            TimeAction::SyncFromLocal => {
                let report =
                    sync_clock(session, config.clock_method, operations::local_time()).await;
                print!("{}", render::report(&report));
                if !report.is_success() {
                    continue;
                }
                show_device_time(session).await
            }
            TimeAction::Show => show_device_time(session).await,
            TimeAction::SetTimezone => set_timezone(session, &config.timezone).await,
            TimeAction::EnableNtp => set_ntp(session, true).await,
            TimeAction::DisableNtp => set_ntp(session, false).await,
            TimeAction::Back => return Ok(()),
        };
        print!("{}", render::report(&report));
    }
}

/// Let the user pick a local asset file. `None` when there is nothing to pick
/// or the user cancels.
fn select_file(term: &mut Terminal, kind: AssetKind, dir: &Path) -> Result<Option<PathBuf>> {
    let dir = crate::config::expand_tilde(dir);
    let files = match list_files_with_extension(&dir, kind.extension()) {
        Ok(files) => files,
        Err(e) => {
            tracing::warn!("{:#}", e);
            Vec::new()
        }
    };
    if files.is_empty() {
        println!(
            "No .{} {kind} files found in {}",
            kind.extension(),
            dir.display()
        );
        return Ok(None);
    }

    print!("{}", render::file_list(&kind.to_string(), &files));
    loop {
        let Some(answer) = term.line(&format!("Select a {kind} file (Enter to cancel): "))? else {
            return Ok(None);
        };
        match parse_selection(&answer, files.len()) {
            Selection::Index(i) => {
                tracing::info!("Selected {:?}", files[i]);
                return Ok(Some(files[i].clone()));
            }
            Selection::Cancel => return Ok(None),
            Selection::Invalid => println!("Invalid choice, please try again."),
        }
    }
}

async fn save_config(config: &Config, path: &Path) {
    if let Err(e) = config.save(path).await {
        tracing::error!("{:#}", e);
        println!("{} {}", "Warning:".yellow(), format!("{e:#}").yellow());
    }
}
