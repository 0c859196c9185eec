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

//! Session and credential lifecycle.
//!
//! A run works against one [`ConnectionTarget`] at a time. The
//! [`SessionManager`] owns the only session; switching mode or rebooting the
//! device closes it, and the next operation opens a fresh one.

mod manager;
mod target;

pub use manager::{Connector, SessionManager, SshConnector};
pub use target::{
    forget_password, resolve_target, resolve_target_retrying, ConnectionKind, ConnectionTarget,
    CredentialPrompt, ResolvedTarget, DEFAULT_SSH_PORT,
};
