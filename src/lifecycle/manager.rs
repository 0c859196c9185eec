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

//! Ownership of the single device session.

use async_trait::async_trait;
use std::time::Duration;

use super::target::ConnectionTarget;
use crate::error::DeviceError;
use crate::ssh::tokio_client::ServerCheckMethod;
use crate::ssh::{DeviceSession, RemoteShell};

/// Opens sessions to a target.
#[async_trait]
pub trait Connector: Send + Sync {
    type Session: RemoteShell;

    async fn open(&self, target: &ConnectionTarget) -> Result<Self::Session, DeviceError>;
}

/// Opens real SSH sessions.
#[derive(Debug, Clone)]
pub struct SshConnector {
    server_check: ServerCheckMethod,
    connect_timeout: Option<Duration>,
}

impl SshConnector {
    pub fn new(server_check: ServerCheckMethod, connect_timeout: Option<Duration>) -> Self {
        Self {
            server_check,
            connect_timeout,
        }
    }
}

#[async_trait]
impl Connector for SshConnector {
    type Session = DeviceSession;

    async fn open(&self, target: &ConnectionTarget) -> Result<DeviceSession, DeviceError> {
        DeviceSession::open(target, self.server_check.clone(), self.connect_timeout).await
    }
}

/// Holds at most one open session and the target it belongs to.
///
/// The session is opened lazily on first use and reopened after
/// [`invalidate`](Self::invalidate) or when the transport reports it dead.
/// Any existing session is closed before a new one is opened.
pub struct SessionManager<C: Connector> {
    connector: C,
    target: ConnectionTarget,
    session: Option<C::Session>,
}

impl<C: Connector> SessionManager<C> {
    pub fn new(connector: C, target: ConnectionTarget) -> Self {
        Self {
            connector,
            target,
            session: None,
        }
    }

    pub fn target(&self) -> &ConnectionTarget {
        &self.target
    }

    pub fn is_open(&self) -> bool {
        self.session.is_some()
    }

    /// The live session, opening one if needed.
    pub async fn session(&mut self) -> Result<&C::Session, DeviceError> {
        let stale = self.session.as_ref().is_some_and(|s| !s.is_alive());
        if stale {
            tracing::warn!(
                "Session to {} is no longer alive, reconnecting",
                self.target.host()
            );
            self.close().await;
        }

        if self.session.is_none() {
            let session = self.connector.open(&self.target).await?;
            self.session = Some(session);
        }

        self.session
            .as_ref()
            .ok_or_else(|| DeviceError::connectivity(self.target.host(), "no session"))
    }

    /// Close the current session and connect to `target` instead.
    ///
    /// The new target is kept even if connecting fails, so the next
    /// [`session`](Self::session) call retries against it.
    pub async fn switch_target(&mut self, target: ConnectionTarget) -> Result<(), DeviceError> {
        tracing::info!(
            "Switching connection from {} ({}) to {} ({})",
            self.target.host(),
            self.target.kind(),
            target.host(),
            target.kind()
        );
        self.close().await;
        self.target = target;
        self.session().await.map(|_| ())
    }

    /// Drop the session after the device was rebooted. The next use reconnects.
    pub async fn invalidate(&mut self) {
        tracing::info!("Discarding session to {}", self.target.host());
        self.close().await;
    }

    pub async fn close(&mut self) {
        if let Some(mut session) = self.session.take() {
            session.close().await;
        }
    }
}
