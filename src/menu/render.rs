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

use owo_colors::OwoColorize;
use std::fmt::Write;
use std::path::Path;

use crate::guard::FsMode;
use crate::operations::{Operation, OperationReport, RebootOutcome, StepStatus, TimeAction};

pub fn main_menu(target: &str) -> String {
    let mut out = format!("\n{}\n", "reMarkable maintenance".bold());
    let _ = writeln!(out, "Connected via {target}");
    out.push_str("====================\n");
    for op in Operation::ALL {
        let _ = writeln!(out, "{}. {}", op.key(), op.label());
    }
    out
}

pub fn time_menu() -> String {
    let mut out = format!("\n{}\n", "Device time".bold());
    out.push_str("====================\n");
    for action in TimeAction::ALL {
        let _ = writeln!(out, "{}. {}", action.key(), action.label());
    }
    out
}

/// Numbered list of local files for selection.
pub fn file_list(kind: &str, files: &[impl AsRef<Path>]) -> String {
    let mut out = format!("\nAvailable {kind} files:\n");
    for (i, file) in files.iter().enumerate() {
        let name = file
            .as_ref()
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let _ = writeln!(out, "{}: {}", i + 1, name);
    }
    out
}

pub fn report(report: &OperationReport) -> String {
    let mut out = String::new();
    for step in &report.steps {
        let marker = match step.status {
            StepStatus::Done => "✓".green().to_string(),
            StepStatus::Failed => "×".red().to_string(),
            StepStatus::Skipped => "-".dimmed().to_string(),
        };
        let _ = write!(out, "{marker} {}", step.name);
        match (step.status, &step.detail) {
            (StepStatus::Done, Some(detail)) => {
                let _ = write!(out, ": {detail}");
            }
            (StepStatus::Failed, Some(detail)) => {
                let _ = write!(out, ": {}", detail.red());
            }
            (StepStatus::Skipped, Some(detail)) => {
                let _ = write!(out, " ({})", detail.dimmed());
            }
            _ => {}
        }
        out.push('\n');
    }

    if let Some(output) = report.output.as_deref().filter(|o| !o.trim().is_empty()) {
        let _ = writeln!(out, "{}", output.trim_end());
    }

    match &report.outcome {
        Ok(()) => {
            let _ = writeln!(
                out,
                "{} {}",
                "●".green(),
                format!("{} completed", report.operation).green()
            );
        }
        Err(e) => {
            let _ = writeln!(
                out,
                "{} {}",
                "●".red(),
                format!("{} failed ({}): {e}", report.operation, e.kind()).red()
            );
        }
    }

    if let Some(err) = &report.release_error {
        let _ = writeln!(
            out,
            "{} {}",
            "Warning:".yellow().bold(),
            format!(
                "could not confirm the root filesystem is read-only, \
                 inspect the device manually ({err})"
            )
            .yellow()
        );
    } else if report.fs_mode == Some(FsMode::ReadOnly) {
        let _ = writeln!(out, "{}", "Root filesystem is read-only again".dimmed());
    }
    out
}

pub fn reboot_outcome(outcome: &RebootOutcome) -> String {
    match outcome {
        RebootOutcome::Declined => "Reboot cancelled".to_string(),
        RebootOutcome::Issued => format!(
            "{} {}",
            "●".green(),
            "Reboot command sent. Wait for the device to restart; the next action reconnects."
                .green()
        ),
        RebootOutcome::Failed(e) => {
            format!("{} {}", "●".red(), format!("Reboot failed: {e}").red())
        }
    }
}
