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

//! Font and wallpaper upload.

use std::fmt;
use std::path::{Path, PathBuf};

use super::{OperationReport, Steps};
use crate::error::DeviceError;
use crate::guard::run_guarded;
use crate::ssh::RemoteShell;
use crate::utils::{format_bytes, quote_arg};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetKind {
    Font,
    Wallpaper,
}

impl AssetKind {
    /// Local file extension offered for selection.
    pub fn extension(self) -> &'static str {
        match self {
            Self::Font => "ttf",
            Self::Wallpaper => "png",
        }
    }
}

impl fmt::Display for AssetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Font => f.write_str("font"),
            Self::Wallpaper => f.write_str("wallpaper"),
        }
    }
}

/// A local file and where it goes on the device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaintenanceAsset {
    pub kind: AssetKind,
    pub local_path: PathBuf,
    pub remote_dir: String,
    pub remote_name: String,
}

impl MaintenanceAsset {
    /// A font for `remote_dir`, optionally renamed on the device.
    pub fn font(
        local_path: impl Into<PathBuf>,
        remote_dir: &str,
        rename_to: Option<&str>,
    ) -> Result<Self, DeviceError> {
        let local_path = local_path.into();
        let remote_name = match rename_to {
            Some(name) => name.to_string(),
            None => file_name(&local_path)?,
        };
        Ok(Self {
            kind: AssetKind::Font,
            local_path,
            remote_dir: remote_dir.to_string(),
            remote_name,
        })
    }

    /// A wallpaper replacing the file at `remote_path`.
    pub fn wallpaper(local_path: impl Into<PathBuf>, remote_path: &str) -> Self {
        let (dir, name) = match remote_path.rsplit_once('/') {
            Some(("", name)) => ("/", name),
            Some((dir, name)) => (dir, name),
            None => (".", remote_path),
        };
        Self {
            kind: AssetKind::Wallpaper,
            local_path: local_path.into(),
            remote_dir: dir.to_string(),
            remote_name: name.to_string(),
        }
    }

    pub fn remote_path(&self) -> String {
        format!(
            "{}/{}",
            self.remote_dir.trim_end_matches('/'),
            self.remote_name
        )
    }

    /// The remote name differs from the local one, so a renamed copy is
    /// uploaded instead of the original.
    pub fn needs_staging(&self) -> bool {
        self.local_path
            .file_name()
            .and_then(|n| n.to_str())
            .is_none_or(|name| name != self.remote_name)
    }
}

fn file_name(path: &Path) -> Result<String, DeviceError> {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(str::to_string)
        .ok_or_else(|| DeviceError::transfer(path, "", "local path has no file name"))
}

/// Upload a font, creating the remote directory first.
///
/// A rename is done by copying into `staging_dir` and uploading the copy,
/// which is deleted afterwards whatever the outcome.
pub async fn upload_font<S: RemoteShell + ?Sized>(
    shell: &S,
    asset: &MaintenanceAsset,
    staging_dir: &Path,
) -> OperationReport {
    const OPERATION: &str = "transfer font";
    let mut steps = Steps::new();

    let source = if asset.needs_staging() {
        match stage(asset, staging_dir).await {
            Ok(staged) => {
                steps.done("stage renamed copy", Some(staged.display().to_string()));
                Some(staged)
            }
            Err(e) => {
                steps.failed("stage renamed copy", &e);
                return OperationReport::unguarded(OPERATION, steps, Err(e));
            }
        }
    } else {
        None
    };
    let upload_from = source.as_deref().unwrap_or(&asset.local_path);
    let remote_path = asset.remote_path();

    let guarded = run_guarded(shell, async {
        let mkdir = format!("mkdir -p {}", quote_arg(&asset.remote_dir));
        steps.run(shell, "create font directory", &mkdir).await?;
        upload_and_verify(shell, &mut steps, upload_from, &remote_path).await
    })
    .await;

    if let Some(staged) = source {
        match tokio::fs::remove_file(&staged).await {
            Ok(()) => steps.done("remove staged copy", None),
            Err(e) => {
                tracing::warn!("Could not remove staged file {:?}: {}", staged, e);
                steps.skipped("remove staged copy", &e.to_string());
            }
        }
    }

    OperationReport::guarded(OPERATION, steps, guarded)
}

/// Replace the device wallpaper, keeping a `.backup` of the current one.
///
/// The backup is best effort: its failure is reported but does not stop the
/// upload.
pub async fn change_wallpaper<S: RemoteShell + ?Sized>(
    shell: &S,
    asset: &MaintenanceAsset,
) -> OperationReport {
    let mut steps = Steps::new();
    let remote_path = asset.remote_path();

    let guarded = run_guarded(shell, async {
        let backup = format!(
            "cp {} {}",
            quote_arg(&remote_path),
            quote_arg(&format!("{remote_path}.backup"))
        );
        if let Err(e) = steps.run(shell, "back up current wallpaper", &backup).await {
            tracing::warn!("Continuing without wallpaper backup: {}", e);
        }
        upload_and_verify(shell, &mut steps, &asset.local_path, &remote_path).await
    })
    .await;

    OperationReport::guarded("change wallpaper", steps, guarded)
}

async fn upload_and_verify<S: RemoteShell + ?Sized>(
    shell: &S,
    steps: &mut Steps,
    local: &Path,
    remote: &str,
) -> Result<(), DeviceError> {
    if let Ok(meta) = tokio::fs::metadata(local).await {
        tracing::info!("Uploading {:?} to {} ({})", local, remote, format_bytes(meta.len()));
    }
    if let Err(e) = shell.upload(local, remote).await {
        steps.failed("upload", &e);
        return Err(e);
    }
    steps.done("upload", Some(remote.to_string()));

    if !shell.exists(remote).await {
        let e = DeviceError::verification(format!("{remote} not found after upload"));
        steps.failed("verify upload", &e);
        return Err(e);
    }
    steps.done("verify upload", None);
    Ok(())
}

async fn stage(asset: &MaintenanceAsset, staging_dir: &Path) -> Result<PathBuf, DeviceError> {
    let staged = staging_dir.join(&asset.remote_name);
    tokio::fs::create_dir_all(staging_dir)
        .await
        .map_err(|e| DeviceError::transfer(&asset.local_path, asset.remote_path(), e))?;
    tokio::fs::copy(&asset.local_path, &staged)
        .await
        .map_err(|e| DeviceError::transfer(&asset.local_path, asset.remote_path(), e))?;
    tracing::debug!("Staged {:?} as {:?}", asset.local_path, staged);
    Ok(staged)
}
