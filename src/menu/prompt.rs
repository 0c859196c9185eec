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
use owo_colors::OwoColorize;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

use crate::lifecycle::{ConnectionKind, CredentialPrompt};

/// Line input, yes/no gates and hidden password entry.
pub struct Terminal {
    editor: DefaultEditor,
}

impl Terminal {
    pub fn new() -> Result<Self> {
        let editor = DefaultEditor::new().context("Failed to initialise line editor")?;
        Ok(Self { editor })
    }

    /// Read one line. `None` on Ctrl-D; Ctrl-C yields an empty line.
    pub fn line(&mut self, prompt: &str) -> Result<Option<String>> {
        match self.editor.readline(prompt) {
            Ok(line) => Ok(Some(line.trim().to_string())),
            Err(ReadlineError::Interrupted) => {
                println!("^C");
                Ok(Some(String::new()))
            }
            Err(ReadlineError::Eof) => Ok(None),
            Err(err) => Err(err).context("Failed to read input"),
        }
    }

    /// Yes/no gate; anything but an explicit yes is a no.
    pub fn confirm(&mut self, prompt: &str) -> Result<bool> {
        let answer = self.line(&format!("{prompt} (y/N): "))?;
        Ok(answer.as_deref().is_some_and(is_yes))
    }

    pub fn secret(&mut self, prompt: &str) -> Result<String> {
        rpassword::prompt_password(prompt).with_context(|| "Failed to read password")
    }

    /// Ask until the user picks USB or WiFi.
    pub fn connection_kind(&mut self) -> Result<Option<ConnectionKind>> {
        loop {
            let Some(answer) = self.line("Select connection (1: USB, 2: WiFi): ")? else {
                return Ok(None);
            };
            match parse_connection_kind(&answer) {
                Some(kind) => return Ok(Some(kind)),
                None => println!("Invalid choice, please try again."),
            }
        }
    }
}

impl CredentialPrompt for Terminal {
    fn password(&mut self, kind: ConnectionKind, host: &str) -> Result<String> {
        self.secret(&format!("Root password for {host} ({kind}): "))
    }

    fn network_host(&mut self) -> Result<String> {
        self.line("Device IP address: ")?
            .context("No address entered")
    }

    fn reuse_saved(&mut self, host: &str) -> Result<bool> {
        self.confirm(&format!("Use saved WiFi connection to {host}?"))
    }

    fn retry(&mut self, error: &anyhow::Error) -> Result<bool> {
        println!("{} {}", "●".red(), format!("{error:#}").red());
        self.confirm("Try again?")
    }
}

pub fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
}

pub fn parse_connection_kind(answer: &str) -> Option<ConnectionKind> {
    match answer.trim().to_lowercase().as_str() {
        "1" | "usb" => Some(ConnectionKind::Usb),
        "2" | "wifi" => Some(ConnectionKind::Network),
        _ => None,
    }
}

/// Parse a 1-based pick from a list of `len` entries. Empty input cancels.
pub fn parse_selection(answer: &str, len: usize) -> Selection {
    let answer = answer.trim();
    if answer.is_empty() {
        return Selection::Cancel;
    }
    match answer.parse::<usize>() {
        Ok(n) if (1..=len).contains(&n) => Selection::Index(n - 1),
        _ => Selection::Invalid,
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum Selection {
    Index(usize),
    Cancel,
    Invalid,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_yes() {
        assert!(is_yes("y"));
        assert!(is_yes(" YES "));
        assert!(!is_yes("n"));
        assert!(!is_yes(""));
        assert!(!is_yes("yep"));
    }

    #[test]
    fn test_parse_connection_kind() {
        assert_eq!(parse_connection_kind("1"), Some(ConnectionKind::Usb));
        assert_eq!(parse_connection_kind("WiFi"), Some(ConnectionKind::Network));
        assert_eq!(parse_connection_kind("3"), None);
    }

    #[test]
    fn test_parse_selection() {
        assert_eq!(parse_selection("", 3), Selection::Cancel);
        assert_eq!(parse_selection("1", 3), Selection::Index(0));
        assert_eq!(parse_selection(" 3 ", 3), Selection::Index(2));
        assert_eq!(parse_selection("0", 3), Selection::Invalid);
        assert_eq!(parse_selection("4", 3), Selection::Invalid);
        assert_eq!(parse_selection("two", 3), Selection::Invalid);
    }
}
